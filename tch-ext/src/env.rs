//! Environment variables consumed at build time.

use crate::common::*;

/// The CUDA related variables shared with other extension build tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CudaEnv {
    /// `FORCE_CUDA=1` selects the CUDA path regardless of the probe. Any
    /// other value leaves the choice to the probe.
    #[serde(default, deserialize_with = "deserialize_force_flag")]
    pub force_cuda: bool,
    pub cuda_home: Option<PathBuf>,
    pub cuda_path: Option<PathBuf>,
}

impl CudaEnv {
    pub fn from_env() -> Result<Self> {
        envy::from_env().with_context(|| "failed to read CUDA environment variables")
    }

    pub fn from_iter<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter(vars)?)
    }
}

/// Variables with the `EXT_` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtEnv {
    /// Overrides the outcome of the GPU probe.
    #[serde(default, deserialize_with = "deserialize_zero_one_opt_bool")]
    pub cuda_probe: Option<bool>,
    /// GPU architectures, e.g. `7.0;8.0;8.6+PTX`.
    pub cuda_arch_list: Option<String>,
    pub libtorch: Option<PathBuf>,
    #[serde(default, deserialize_with = "deserialize_zero_one_opt_bool")]
    pub libtorch_cxx11_abi: Option<bool>,
}

impl ExtEnv {
    pub const PREFIX: &'static str = "EXT_";

    pub fn from_env() -> Result<Self> {
        envy::prefixed(Self::PREFIX)
            .from_env()
            .with_context(|| format!("failed to read {}* environment variables", Self::PREFIX))
    }

    pub fn from_iter<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(Self::PREFIX).from_iter(vars)?)
    }
}

fn zero_one(value: usize) -> Result<bool, String> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(format!("expect 0 or 1, but get {}", value)),
    }
}

fn deserialize_force_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref() == Some("1"))
}

fn deserialize_zero_one_opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<usize>::deserialize(deserializer)?
        .map(zero_one)
        .transpose()
        .map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|&(key, value)| (key.to_owned(), value.to_owned()))
            .collect()
    }

    #[test]
    fn force_cuda_defaults_to_false() -> Result<()> {
        let env = CudaEnv::from_iter(vars(&[("PATH", "/usr/bin")]))?;
        assert!(!env.force_cuda);
        assert_eq!(env.cuda_home, None);
        Ok(())
    }

    #[test]
    fn only_exact_one_forces_cuda() -> Result<()> {
        assert!(CudaEnv::from_iter(vars(&[("FORCE_CUDA", "1")]))?.force_cuda);
        ["0", "01", "2", "true", " 1", ""]
            .iter()
            .try_for_each(|&value| -> Result<_> {
                let env = CudaEnv::from_iter(vars(&[("FORCE_CUDA", value)]))?;
                assert!(!env.force_cuda, "FORCE_CUDA='{}' should not force", value);
                Ok(())
            })?;
        Ok(())
    }

    #[test]
    fn prefixed_variables() -> Result<()> {
        let env = ExtEnv::from_iter(vars(&[
            ("EXT_CUDA_PROBE", "0"),
            ("EXT_CUDA_ARCH_LIST", "7.0;8.6+PTX"),
            ("EXT_LIBTORCH", "/opt/libtorch"),
            ("CUDA_PROBE", "1"),
        ]))?;
        assert_eq!(env.cuda_probe, Some(false));
        assert_eq!(env.cuda_arch_list.as_deref(), Some("7.0;8.6+PTX"));
        assert_eq!(env.libtorch, Some(PathBuf::from("/opt/libtorch")));
        assert_eq!(env.libtorch_cxx11_abi, None);
        Ok(())
    }
}
