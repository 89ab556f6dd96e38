//! Common imports from external crates.

pub use anyhow::{ensure, format_err, Context, Error, Result};
pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use log::{debug, info, warn};
pub use once_cell::sync::Lazy;
pub use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
pub use std::{
    convert::TryFrom,
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
pub use strum::{AsRefStr, EnumIter, IntoEnumIterator};
