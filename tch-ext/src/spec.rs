//! Operator source listings.

use crate::common::*;

/// The sources of one custom operator.
///
/// Source paths are relative to the operator's module directory, which is
/// the dotted module path with `.` replaced by the path separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OperatorSpecInit", into = "OperatorSpecInit")]
pub struct OperatorSpec {
    name: String,
    module: String,
    sources: Vec<PathBuf>,
    gpu_sources: Vec<PathBuf>,
}

impl OperatorSpec {
    /// Creates a spec without validation. Only used for the built-in table.
    pub(crate) fn new_unchecked(
        name: &str,
        module: &str,
        sources: &[&str],
        gpu_sources: &[&str],
    ) -> Self {
        Self {
            name: name.to_owned(),
            module: module.to_owned(),
            sources: sources.iter().map(PathBuf::from).collect(),
            gpu_sources: gpu_sources.iter().map(PathBuf::from).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Sources compiled on both the CPU and the GPU path.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Sources compiled on the GPU path only.
    pub fn gpu_sources(&self) -> &[PathBuf] {
        &self.gpu_sources
    }

    /// The module path and the operator name joined by a dot.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    /// The directory the source paths are relative to.
    pub fn module_dir(&self) -> PathBuf {
        self.module.split('.').collect()
    }
}

/// The unvalidated form of [OperatorSpec].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSpecInit {
    pub name: String,
    pub module: String,
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub gpu_sources: Vec<PathBuf>,
}

impl OperatorSpecInit {
    pub fn build(self) -> Result<OperatorSpec> {
        let Self {
            name,
            module,
            sources,
            gpu_sources,
        } = self;

        ensure!(is_identifier(&name), "invalid operator name '{}'", name);
        ensure!(
            module.split('.').all(is_identifier),
            "invalid module path '{}' of operator '{}'",
            module,
            name
        );
        ensure!(!sources.is_empty(), "operator '{}' has no sources", name);
        sources.iter().chain(&gpu_sources).try_for_each(|path| {
            ensure!(
                path.is_relative() && path.file_name().is_some(),
                "source path '{}' of operator '{}' must be a relative file path",
                path.display(),
                name
            );
            Ok(())
        })?;

        Ok(OperatorSpec {
            name,
            module,
            sources,
            gpu_sources,
        })
    }
}

impl TryFrom<OperatorSpecInit> for OperatorSpec {
    type Error = Error;

    fn try_from(init: OperatorSpecInit) -> Result<Self, Self::Error> {
        init.build()
    }
}

impl From<OperatorSpec> for OperatorSpecInit {
    fn from(spec: OperatorSpec) -> Self {
        let OperatorSpec {
            name,
            module,
            sources,
            gpu_sources,
        } = spec;
        Self {
            name,
            module,
            sources,
            gpu_sources,
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}
