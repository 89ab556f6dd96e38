//! Resolved build descriptors.

use crate::common::*;

/// The preprocessor macro that marks a CUDA-enabled build.
pub const GPU_DEFINE: &str = "WITH_CUDA";

/// The compiler phases a target passes flags to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumIter,
)]
pub enum CompilePhase {
    /// The host C++ compiler.
    #[serde(rename = "cxx")]
    #[strum(serialize = "cxx")]
    Cxx,
    /// The CUDA device compiler.
    #[serde(rename = "nvcc")]
    #[strum(serialize = "nvcc")]
    Nvcc,
}

/// A preprocessor macro with an optional value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "-D{}={}", self.name, value),
            None => write!(f, "-D{}", self.name),
        }
    }
}

/// Extra compiler flags per compiler phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompileFlags {
    pub cxx: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nvcc: Option<Vec<String>>,
}

impl CompileFlags {
    /// Returns the flags of a phase, or `None` if the phase is absent.
    pub fn get(&self, phase: CompilePhase) -> Option<&[String]> {
        match phase {
            CompilePhase::Cxx => Some(&self.cxx),
            CompilePhase::Nvcc => self.nvcc.as_deref(),
        }
    }

    /// Iterates over the present phases.
    pub fn phases(&self) -> impl Iterator<Item = (CompilePhase, &[String])> {
        CompilePhase::iter().filter_map(move |phase| Some((phase, self.get(phase)?)))
    }
}

/// What to compile for one operator and with which flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub qualified_name: String,
    pub resolved_sources: Vec<PathBuf>,
    pub defines: IndexSet<Define>,
    pub compile_flags: CompileFlags,
}

impl BuildTarget {
    pub fn has_define(&self, name: &str) -> bool {
        self.defines.iter().any(|define| define.name == name)
    }

    pub fn is_gpu_enabled(&self) -> bool {
        self.has_define(GPU_DEFINE)
    }

    /// The archive name, i.e. the qualified name with dots replaced by underscores.
    pub fn lib_name(&self) -> String {
        self.qualified_name.replace('.', "_")
    }

    /// Sources for the host compiler.
    pub fn host_sources(&self) -> impl Iterator<Item = &Path> {
        self.resolved_sources
            .iter()
            .map(PathBuf::as_path)
            .filter(|path| !is_device_source(path))
    }

    /// Sources for the device compiler.
    pub fn device_sources(&self) -> impl Iterator<Item = &Path> {
        self.resolved_sources
            .iter()
            .map(PathBuf::as_path)
            .filter(|path| is_device_source(path))
    }
}

fn is_device_source(path: &Path) -> bool {
    matches!(path.extension().and_then(|ext| ext.to_str()), Some("cu" | "cuh"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_flag_format() {
        assert_eq!(Define::new(GPU_DEFINE).to_string(), "-DWITH_CUDA");
        assert_eq!(
            Define::with_value("_GLIBCXX_USE_CXX11_ABI", "1").to_string(),
            "-D_GLIBCXX_USE_CXX11_ABI=1"
        );
    }

    #[test]
    fn compile_flags_phases() {
        let flags = CompileFlags {
            cxx: vec!["-std=c++14".into()],
            nvcc: None,
        };
        let phases: Vec<_> = flags.phases().map(|(phase, _)| phase).collect();
        assert_eq!(phases, [CompilePhase::Cxx]);
        assert!(flags.get(CompilePhase::Nvcc).is_none());
        assert_eq!(CompilePhase::Nvcc.as_ref(), "nvcc");
    }

    #[test]
    fn split_host_and_device_sources() {
        let target = BuildTarget {
            qualified_name: "pkg.ops.carafe.carafe_ext".into(),
            resolved_sources: vec![
                "pkg/ops/carafe/src/carafe_ext.cpp".into(),
                "pkg/ops/carafe/src/cuda/carafe_cuda.cpp".into(),
                "pkg/ops/carafe/src/cuda/carafe_cuda_kernel.cu".into(),
            ],
            defines: IndexSet::new(),
            compile_flags: CompileFlags {
                cxx: vec![],
                nvcc: None,
            },
        };
        assert_eq!(target.lib_name(), "pkg_ops_carafe_carafe_ext");
        assert_eq!(target.host_sources().count(), 2);
        assert_eq!(
            target.device_sources().collect::<Vec<_>>(),
            [Path::new("pkg/ops/carafe/src/cuda/carafe_cuda_kernel.cu")]
        );
        assert!(!target.is_gpu_enabled());
    }
}
