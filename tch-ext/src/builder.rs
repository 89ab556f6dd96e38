//! Maps operator specs to build targets.

use crate::{
    capability::GpuCapability,
    common::*,
    config::{BuildConfig, CudaArch},
    spec::OperatorSpec,
    target::{BuildTarget, CompileFlags, Define, GPU_DEFINE},
};

/// `nvcc` flags disabling the half-precision operator overloads of the CUDA
/// headers, which conflict with the ones of the framework's half type.
pub const HALF_PRECISION_FLAGS: [&str; 3] = [
    "-D__CUDA_NO_HALF_OPERATORS__",
    "-D__CUDA_NO_HALF_CONVERSIONS__",
    "-D__CUDA_NO_HALF2_OPERATORS__",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionBuilderInit {
    pub cxx_std: String,
    pub cuda_arch_list: Vec<CudaArch>,
    pub package_root: Option<PathBuf>,
}

impl Default for ExtensionBuilderInit {
    fn default() -> Self {
        Self {
            cxx_std: "c++14".into(),
            cuda_arch_list: vec![],
            package_root: None,
        }
    }
}

impl ExtensionBuilderInit {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            cxx_std: config.cxx_std.clone(),
            cuda_arch_list: config.cuda_arch_list.clone(),
            package_root: config.package_root.clone(),
        }
    }

    pub fn build(self) -> Result<ExtensionBuilder> {
        let Self {
            cxx_std,
            cuda_arch_list,
            package_root,
        } = self;

        ensure!(
            !cxx_std.is_empty() && !cxx_std.contains(char::is_whitespace),
            "invalid C++ standard '{}'",
            cxx_std
        );

        let cxx_flags = vec![format!("-std={}", cxx_std)];
        let nvcc_flags: Vec<String> = HALF_PRECISION_FLAGS
            .iter()
            .map(|&flag| flag.to_owned())
            .chain(cuda_arch_list.iter().flat_map(CudaArch::gencode_flags))
            .collect();

        Ok(ExtensionBuilder {
            cxx_flags,
            nvcc_flags,
            package_root,
        })
    }
}

/// Resolves [OperatorSpec]s into [BuildTarget]s.
///
/// Resolution only transforms data. Missing source files are not detected
/// here and surface as compile errors of the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionBuilder {
    cxx_flags: Vec<String>,
    nvcc_flags: Vec<String>,
    package_root: Option<PathBuf>,
}

impl ExtensionBuilder {
    pub fn build_target(&self, spec: &OperatorSpec, capability: GpuCapability) -> BuildTarget {
        let with_cuda = capability.enabled();
        if !with_cuda {
            warn!("Compiling {} without CUDA", spec.name());
        }

        let module_dir = match &self.package_root {
            Some(root) => root.join(spec.module_dir()),
            None => spec.module_dir(),
        };

        let gpu_sources = if with_cuda { spec.gpu_sources() } else { &[] };
        let resolved_sources: Vec<PathBuf> = spec
            .sources()
            .iter()
            .chain(gpu_sources)
            .map(|path| module_dir.join(path))
            .collect();

        let defines: IndexSet<Define> = with_cuda
            .then(|| Define::new(GPU_DEFINE))
            .into_iter()
            .collect();

        let compile_flags = CompileFlags {
            cxx: self.cxx_flags.clone(),
            nvcc: with_cuda.then(|| self.nvcc_flags.clone()),
        };

        BuildTarget {
            qualified_name: spec.qualified_name(),
            resolved_sources,
            defines,
            compile_flags,
        }
    }

    /// Resolves each spec independently, keeping the order.
    pub fn build_all<'a, I>(&self, specs: I, capability: GpuCapability) -> Vec<BuildTarget>
    where
        I: IntoIterator<Item = &'a OperatorSpec>,
    {
        specs
            .into_iter()
            .map(|spec| self.build_target(spec, capability))
            .collect()
    }
}
