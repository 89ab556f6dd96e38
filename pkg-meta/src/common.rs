//! Common imports from external crates.

pub use anyhow::{ensure, format_err, Context, Result};
pub use chrono::{DateTime, Local};
pub use log::{debug, info};
pub use once_cell::sync::Lazy;
pub use regex::Regex;
pub use serde::{Deserialize, Serialize};
pub use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};
