//! Build descriptors for the custom native operators of the detection toolbox.
//!
//! An [OperatorSpec] lists the always-compiled and the GPU-only sources of
//! one operator. The [ExtensionBuilder] turns it into a self-contained
//! [BuildTarget], picking the CUDA or the CPU-only path from a
//! [GpuCapability]. The [Toolchain] hands targets to the host C++ compiler
//! and `nvcc` through the `cc` crate.

mod common;
pub mod builder;
pub mod capability;
pub mod config;
pub mod env;
pub mod ops;
pub mod spec;
pub mod target;
pub mod toolchain;

pub use builder::{ExtensionBuilder, ExtensionBuilderInit};
pub use capability::{CudaToolkitProbe, GpuCapability, GpuProbe};
pub use config::{BuildConfig, CudaArch, ToolchainConfig};
pub use ops::{find_operator, OPERATORS};
pub use spec::{OperatorSpec, OperatorSpecInit};
pub use target::{BuildTarget, CompileFlags, CompilePhase, Define, GPU_DEFINE};
pub use toolchain::{CompiledTarget, Toolchain, ToolchainInit};
