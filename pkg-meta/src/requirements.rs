//! Requirements file parsing.
//!
//! Version specifiers are split off at the first `>=`, `==` or `>`, so that
//! the package names can be listed with or without their versions.

use crate::common::*;

static VERSION_OP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(>=|==|>)").unwrap());

/// One item of a requirements file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    /// The original line.
    pub line: String,
    pub package: String,
    /// The comparison operator and the version.
    pub version: Option<(String, String)>,
    /// Environment markers after `;`.
    pub platform_deps: Option<String>,
}

impl Requirement {
    /// Parses a line that is neither blank, a comment nor an include.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();

        if let Some(editable) = line.strip_prefix("-e ") {
            let (_, package) = editable
                .split_once("#egg=")
                .ok_or_else(|| format_err!("editable requirement '{}' has no #egg= name", line))?;
            return Ok(Self {
                line: line.to_owned(),
                package: package.trim().to_owned(),
                version: None,
                platform_deps: None,
            });
        }

        let (package, version, platform_deps) = match VERSION_OP_REGEX.find(line) {
            Some(op) => {
                let package = line[..op.start()].trim();
                let rest = line[op.end()..].trim();
                let (version, platform_deps) = match rest.split_once(';') {
                    Some((version, platform_deps)) => {
                        (version.trim(), Some(platform_deps.trim().to_owned()))
                    }
                    None => (rest, None),
                };
                (
                    package,
                    Some((op.as_str().to_owned(), version.to_owned())),
                    platform_deps,
                )
            }
            None => (line, None, None),
        };
        ensure!(!package.is_empty(), "requirement '{}' has no package name", line);

        Ok(Self {
            line: line.to_owned(),
            package: package.to_owned(),
            version,
            platform_deps,
        })
    }

    /// Renders the item as `package[op version][;platform_deps]`.
    pub fn render(&self, with_version: bool) -> String {
        let mut text = self.package.clone();
        if with_version {
            if let Some((op, version)) = &self.version {
                text.push_str(op);
                text.push_str(version);
            }
        }
        if let Some(platform_deps) = &self.platform_deps {
            text.push(';');
            text.push_str(platform_deps);
        }
        text
    }
}

/// Parses a requirements file, following `-r` includes.
///
/// Included paths are relative to the directory of the including file.
pub fn parse_requirement_file(path: impl AsRef<Path>) -> Result<Vec<Requirement>> {
    let mut stack = vec![];
    parse_recursive(path.as_ref(), &mut stack)
}

fn parse_recursive(path: &Path, stack: &mut Vec<PathBuf>) -> Result<Vec<Requirement>> {
    let canonical = fs::canonicalize(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    ensure!(
        !stack.contains(&canonical),
        "requirements file '{}' includes itself",
        path.display()
    );
    let text = fs::read_to_string(&canonical)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    stack.push(canonical);
    let mut requirements = vec![];

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.strip_prefix("-r ") {
            Some(include) => {
                let include = base_dir.join(include.trim());
                requirements.extend(parse_recursive(&include, stack)?);
            }
            None => {
                let requirement = Requirement::parse(line)
                    .with_context(|| format!("in requirements file '{}'", path.display()))?;
                requirements.push(requirement);
            }
        }
    }

    stack.pop();
    Ok(requirements)
}

/// Lists the rendered requirements of a file, or nothing if it is absent.
pub fn parse_requirements(path: impl AsRef<Path>, with_version: bool) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("requirements file '{}' does not exist", path.display());
        return Ok(vec![]);
    }

    let items = parse_requirement_file(path)?
        .iter()
        .map(|requirement| requirement.render(with_version))
        .collect();
    Ok(items)
}
