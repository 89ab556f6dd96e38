//! Build configuration format.

use crate::{common::*, env::ExtEnv, ops::OPERATORS, spec::OperatorSpec};

/// The extension build configuration.
///
/// Every field has a default, so an empty JSON5 object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// The C++ language standard passed to the host compiler.
    #[serde(default = "default_cxx_std")]
    pub cxx_std: String,
    /// GPU architectures to generate device code for. If empty, the device
    /// compiler picks its default architecture.
    #[serde(default)]
    pub cuda_arch_list: Vec<CudaArch>,
    /// The directory the module directories are relative to.
    #[serde(default)]
    pub package_root: Option<PathBuf>,
    /// Replaces the built-in operator table if set.
    #[serde(default)]
    pub operators: Option<Vec<OperatorSpec>>,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cxx_std: default_cxx_std(),
            cuda_arch_list: vec![],
            package_root: None,
            operators: None,
            toolchain: Default::default(),
        }
    }
}

impl BuildConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// Lets `EXT_*` variables take precedence over the file.
    pub fn apply_env(&mut self, env: &ExtEnv) -> Result<()> {
        if let Some(list) = &env.cuda_arch_list {
            self.cuda_arch_list = CudaArch::parse_list(list)
                .with_context(|| format!("invalid architecture list '{}'", list))?;
        }
        if let Some(libtorch) = &env.libtorch {
            self.toolchain.libtorch = Some(libtorch.clone());
        }
        if let Some(abi) = env.libtorch_cxx11_abi {
            self.toolchain.libtorch_cxx11_abi = abi;
        }
        Ok(())
    }

    /// The configured operators, or the built-in table.
    pub fn operators(&self) -> &[OperatorSpec] {
        self.operators.as_deref().unwrap_or(OPERATORS.as_slice())
    }
}

/// Options for the native toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// The libtorch installation providing the headers.
    #[serde(default)]
    pub libtorch: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub libtorch_cxx11_abi: bool,
    /// The CUDA toolkit whose headers the host sources of CUDA targets include.
    /// Found with the toolkit probe if unset.
    #[serde(default)]
    pub cuda_home: Option<PathBuf>,
    /// The directory to store compiled archives.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_opt_level")]
    pub opt_level: u32,
    /// Adds python3 include paths found by pkg-config.
    #[serde(default = "default_true")]
    pub probe_python: bool,
    /// Prints `cargo:` directives. Set it when running inside a build script.
    #[serde(default)]
    pub emit_cargo_metadata: bool,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            libtorch: None,
            libtorch_cxx11_abi: true,
            cuda_home: None,
            out_dir: default_out_dir(),
            opt_level: default_opt_level(),
            probe_python: true,
            emit_cargo_metadata: false,
        }
    }
}

/// A GPU compute capability, written as `8.6` or `8.6+PTX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CudaArch {
    pub major: u32,
    pub minor: u32,
    /// Also embeds PTX for forward compatibility.
    pub ptx: bool,
}

impl CudaArch {
    /// Parses a list separated by semicolons, commas or whitespace.
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        text.split(|ch: char| ch == ';' || ch == ',' || ch.is_whitespace())
            .filter(|item| !item.is_empty())
            .map(Self::from_str)
            .collect()
    }

    fn code(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }

    /// The `-gencode` flags for `nvcc`.
    pub fn gencode_flags(&self) -> Vec<String> {
        let code = self.code();
        let mut flags = vec![format!("-gencode=arch=compute_{0},code=sm_{0}", code)];
        if self.ptx {
            flags.push(format!("-gencode=arch=compute_{0},code=compute_{0}", code));
        }
        flags
    }
}

impl FromStr for CudaArch {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (version, ptx) = match text.strip_suffix("+PTX") {
            Some(version) => (version, true),
            None => (text, false),
        };
        let (major, minor) = version
            .split_once('.')
            .ok_or_else(|| format_err!("expect 'major.minor', but get '{}'", text))?;
        let major: u32 = major
            .parse()
            .with_context(|| format!("invalid major version in '{}'", text))?;
        let minor: u32 = minor
            .parse()
            .with_context(|| format!("invalid minor version in '{}'", text))?;
        ensure!(minor < 10, "invalid minor version in '{}'", text);

        Ok(Self { major, minor, ptx })
    }
}

impl Display for CudaArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.ptx {
            write!(f, "+PTX")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for CudaArch {
    type Error = Error;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<CudaArch> for String {
    fn from(arch: CudaArch) -> Self {
        arch.to_string()
    }
}

fn default_cxx_std() -> String {
    "c++14".into()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("target").join("ext")
}

fn default_opt_level() -> u32 {
    2
}

fn default_true() -> bool {
    true
}
