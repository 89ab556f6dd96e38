//! GPU capability detection.

use crate::{
    common::*,
    env::{CudaEnv, ExtEnv},
};

/// Reports whether a CUDA build is possible on this machine.
pub trait GpuProbe {
    fn probe(&self) -> bool;
}

/// Looks for the `nvcc` compiler and the NVIDIA driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CudaToolkitProbe {
    pub toolkit_dirs: Vec<PathBuf>,
    pub search_path: bool,
    pub driver_node: Option<PathBuf>,
}

impl CudaToolkitProbe {
    pub fn from_env(env: &CudaEnv) -> Self {
        let toolkit_dirs: Vec<_> = env
            .cuda_home
            .iter()
            .chain(&env.cuda_path)
            .cloned()
            .chain([PathBuf::from("/usr/local/cuda")])
            .collect();
        let driver_node = cfg!(target_os = "linux").then(|| PathBuf::from("/dev/nvidiactl"));

        Self {
            toolkit_dirs,
            search_path: true,
            driver_node,
        }
    }

    /// Returns the path to `nvcc` if found.
    pub fn find_nvcc(&self) -> Option<PathBuf> {
        let nvcc = if cfg!(windows) { "nvcc.exe" } else { "nvcc" };

        let from_toolkit = self
            .toolkit_dirs
            .iter()
            .map(|dir| dir.join("bin").join(nvcc))
            .find(|path| path.is_file());

        from_toolkit.or_else(|| {
            if !self.search_path {
                return None;
            }
            let paths = std::env::var_os("PATH")?;
            std::env::split_paths(&paths)
                .map(|dir| dir.join(nvcc))
                .find(|path| path.is_file())
        })
    }

    /// The toolkit installation containing `bin/nvcc`.
    pub fn find_toolkit_root(&self) -> Option<PathBuf> {
        let nvcc = self.find_nvcc()?;
        Some(nvcc.parent()?.parent()?.to_owned())
    }
}

impl GpuProbe for CudaToolkitProbe {
    fn probe(&self) -> bool {
        let nvcc = match self.find_nvcc() {
            Some(nvcc) => nvcc,
            None => {
                debug!("nvcc is not found");
                return false;
            }
        };
        debug!("found nvcc at '{}'", nvcc.display());

        match &self.driver_node {
            Some(node) if !node.exists() => {
                debug!("driver node '{}' does not exist", node.display());
                false
            }
            _ => true,
        }
    }
}

/// The two independent signals that enable the CUDA path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GpuCapability {
    /// Outcome of the hardware and driver probe.
    pub probe: bool,
    /// The explicit force-enable override.
    pub force: bool,
}

impl GpuCapability {
    pub fn new(probe: bool, force: bool) -> Self {
        Self { probe, force }
    }

    pub fn from_probe<P>(probe: &P, force: bool) -> Self
    where
        P: GpuProbe + ?Sized,
    {
        Self {
            probe: probe.probe(),
            force,
        }
    }

    /// Reads `FORCE_CUDA` and `EXT_CUDA_PROBE`, and probes the CUDA toolkit
    /// unless the probe is overridden.
    pub fn detect() -> Result<Self> {
        let cuda_env = CudaEnv::from_env()?;
        let ext_env = ExtEnv::from_env()?;

        let probe = match ext_env.cuda_probe {
            Some(probe) => probe,
            None => CudaToolkitProbe::from_env(&cuda_env).probe(),
        };
        let capability = Self::new(probe, cuda_env.force_cuda);
        info!(
            "GPU probe: {}, forced: {}",
            capability.probe, capability.force
        );
        Ok(capability)
    }

    /// Either signal alone selects the CUDA path.
    pub fn enabled(&self) -> bool {
        self.probe || self.force
    }
}
