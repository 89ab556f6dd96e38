//! Compiles build targets with the `cc` crate.

use crate::{
    common::*,
    config::ToolchainConfig,
    target::{BuildTarget, CompilePhase},
};

const HOST_TRIPLE: &str = env!("TCH_EXT_HOST_TRIPLE");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainInit {
    pub out_dir: PathBuf,
    pub opt_level: u32,
    pub libtorch: Option<PathBuf>,
    pub libtorch_cxx11_abi: bool,
    pub cuda_home: Option<PathBuf>,
    pub probe_python: bool,
    pub emit_cargo_metadata: bool,
}

impl ToolchainInit {
    pub fn from_config(config: &ToolchainConfig) -> Self {
        let ToolchainConfig {
            libtorch,
            libtorch_cxx11_abi,
            cuda_home,
            out_dir,
            opt_level,
            probe_python,
            emit_cargo_metadata,
        } = config.clone();

        Self {
            out_dir,
            opt_level,
            libtorch,
            libtorch_cxx11_abi,
            cuda_home,
            probe_python,
            emit_cargo_metadata,
        }
    }

    pub fn build(self) -> Result<Toolchain> {
        let Self {
            out_dir,
            opt_level,
            libtorch,
            libtorch_cxx11_abi,
            cuda_home,
            probe_python,
            emit_cargo_metadata,
        } = self;

        ensure!(
            opt_level <= 3,
            "opt_level must be in range 0..=3, but get {}",
            opt_level
        );

        let mut include_dirs = vec![];

        // libtorch headers
        let libtorch_cxx11_abi = match &libtorch {
            Some(libtorch) => {
                ensure!(
                    libtorch.is_dir(),
                    "libtorch directory '{}' does not exist",
                    libtorch.display()
                );
                let include = libtorch.join("include");
                include_dirs.push(
                    include
                        .join("torch")
                        .join("csrc")
                        .join("api")
                        .join("include"),
                );
                include_dirs.push(include);
                Some(libtorch_cxx11_abi)
            }
            None => {
                warn!("libtorch is not set, framework headers must be found by the compiler");
                None
            }
        };

        // find python3
        if probe_python {
            match pkg_config::Config::new()
                .cargo_metadata(false)
                .probe("python3")
            {
                Ok(python3_lib) => include_dirs.extend(python3_lib.include_paths),
                Err(err) => warn!("unable to find python3 with pkg-config: {}", err),
            }
        }

        // CUDA runtime headers, included by the host sources of CUDA targets
        let cuda_include_dir = match &cuda_home {
            Some(cuda_home) => Some(cuda_home.join("include")),
            None => {
                warn!("CUDA toolkit is not set, CUDA headers must be found by the compiler");
                None
            }
        };

        let triple = std::env::var("TARGET").unwrap_or_else(|_| HOST_TRIPLE.to_owned());

        Ok(Toolchain {
            out_dir,
            opt_level,
            include_dirs,
            cuda_include_dir,
            libtorch_cxx11_abi,
            emit_cargo_metadata,
            triple,
        })
    }
}

/// Hands [BuildTarget]s to the host C++ compiler and `nvcc`.
///
/// Each target is compiled into its own directory under `out_dir`, so
/// targets do not share any build state.
#[derive(Debug, Clone)]
pub struct Toolchain {
    out_dir: PathBuf,
    opt_level: u32,
    include_dirs: Vec<PathBuf>,
    cuda_include_dir: Option<PathBuf>,
    libtorch_cxx11_abi: Option<bool>,
    emit_cargo_metadata: bool,
    triple: String,
}

/// The archives produced for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledTarget {
    pub qualified_name: String,
    pub out_dir: PathBuf,
    pub archives: Vec<String>,
}

impl Toolchain {
    /// Include directories for the sources of a target. CUDA targets also
    /// get the toolkit headers.
    pub fn include_dirs(&self, target: &BuildTarget) -> Vec<PathBuf> {
        let cuda_include_dir = self
            .cuda_include_dir
            .as_ref()
            .filter(|_| target.is_gpu_enabled());
        self.include_dirs
            .iter()
            .chain(cuda_include_dir)
            .cloned()
            .collect()
    }

    pub fn compile(&self, target: &BuildTarget) -> Result<CompiledTarget> {
        let lib_name = target.lib_name();
        let out_dir = self.out_dir.join(&lib_name);
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create directory '{}'", out_dir.display()))?;

        let host_sources: Vec<_> = target.host_sources().collect();
        let device_sources: Vec<_> = target.device_sources().collect();
        let mut archives = vec![];

        if !host_sources.is_empty() {
            let mut build = self.new_build(target, &out_dir);
            build.cpp(true);
            target.compile_flags.cxx.iter().for_each(|flag| {
                build.flag(flag);
            });
            host_sources.iter().for_each(|path| {
                build.file(path);
            });
            build.try_compile(&lib_name).with_context(|| {
                format!(
                    "failed to compile host sources of '{}'",
                    target.qualified_name
                )
            })?;
            archives.push(lib_name.clone());
        }

        if !device_sources.is_empty() {
            let nvcc_flags = target
                .compile_flags
                .get(CompilePhase::Nvcc)
                .ok_or_else(|| {
                    format_err!(
                        "'{}' has device sources but no {} flags",
                        target.qualified_name,
                        CompilePhase::Nvcc.as_ref()
                    )
                })?;
            let archive = format!("{}_cuda", lib_name);

            let mut build = self.new_build(target, &out_dir);
            build.cuda(true).cudart("shared");
            nvcc_flags.iter().for_each(|flag| {
                build.flag(flag);
            });
            device_sources.iter().for_each(|path| {
                build.file(path);
            });
            build.try_compile(&archive).with_context(|| {
                format!(
                    "failed to compile device sources of '{}'",
                    target.qualified_name
                )
            })?;
            archives.push(archive);
        }

        if self.emit_cargo_metadata {
            target.resolved_sources.iter().for_each(|path| {
                println!("cargo:rerun-if-changed={}", path.display());
            });
        }

        info!(
            "compiled '{}' into {}",
            target.qualified_name,
            archives.iter().join(", ")
        );

        Ok(CompiledTarget {
            qualified_name: target.qualified_name.clone(),
            out_dir,
            archives,
        })
    }

    fn new_build(&self, target: &BuildTarget, out_dir: &Path) -> cc::Build {
        let mut build = cc::Build::new();
        build
            .out_dir(out_dir)
            .target(&self.triple)
            .host(&self.triple)
            .opt_level(self.opt_level)
            .debug(false)
            .pic(true)
            .warnings(false)
            .cargo_metadata(self.emit_cargo_metadata)
            .define("TORCH_API_INCLUDE_EXTENSION_H", None)
            .define("TORCH_EXTENSION_NAME", target.lib_name().as_str());

        if let Some(abi) = self.libtorch_cxx11_abi {
            build.define("_GLIBCXX_USE_CXX11_ABI", if abi { "1" } else { "0" });
        }
        target.defines.iter().for_each(|define| {
            build.define(&define.name, define.value.as_deref());
        });
        self.include_dirs(target).iter().for_each(|dir| {
            build.include(dir);
        });

        build
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_bad_opt_level() {
        let init = ToolchainInit {
            opt_level: 4,
            probe_python: false,
            ..ToolchainInit::from_config(&Default::default())
        };
        assert!(init.build().is_err());
    }

    #[test]
    fn reject_missing_libtorch() {
        let init = ToolchainInit {
            libtorch: Some("/nonexistent/libtorch".into()),
            probe_python: false,
            ..ToolchainInit::from_config(&Default::default())
        };
        assert!(init.build().is_err());
    }

    fn target(with_cuda: bool) -> BuildTarget {
        let spec = crate::ops::find_operator(&crate::OPERATORS, "nms_ext").unwrap();
        crate::ExtensionBuilderInit::default()
            .build()
            .unwrap()
            .build_target(spec, crate::GpuCapability::new(with_cuda, false))
    }

    #[test]
    fn libtorch_include_dirs() -> Result<()> {
        let libtorch = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let toolchain = ToolchainInit {
            libtorch: Some(libtorch.clone()),
            probe_python: false,
            ..ToolchainInit::from_config(&Default::default())
        }
        .build()?;
        assert_eq!(
            toolchain.include_dirs(&target(false)),
            [
                libtorch.join("include/torch/csrc/api/include"),
                libtorch.join("include"),
            ]
        );
        Ok(())
    }

    #[test]
    fn cuda_headers_only_for_cuda_targets() -> Result<()> {
        let toolchain = ToolchainInit {
            cuda_home: Some("/opt/cuda".into()),
            probe_python: false,
            ..ToolchainInit::from_config(&Default::default())
        }
        .build()?;

        let gpu_target = target(true);
        assert!(gpu_target
            .host_sources()
            .any(|path| path.ends_with("src/cuda/nms_cuda.cpp")));
        assert_eq!(
            toolchain.include_dirs(&gpu_target),
            [PathBuf::from("/opt/cuda/include")]
        );
        assert!(toolchain.include_dirs(&target(false)).is_empty());
        Ok(())
    }
}
