//! The generated version file.

use crate::common::*;

/// The hash used when no revision can be determined.
pub const UNKNOWN_HASH: &str = "unknown";

static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^__version__\s*=\s*['"]([^'"]*)['"]"#).unwrap());

/// Runs `git rev-parse HEAD` in `repo_dir` with a minimal environment.
///
/// Returns [UNKNOWN_HASH] if git cannot be run or fails.
pub fn git_hash(repo_dir: impl AsRef<Path>) -> String {
    let mut command = Command::new("git");
    command
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_dir)
        .env_clear();
    ["SYSTEMROOT", "PATH", "HOME"].iter().for_each(|&key| {
        if let Some(value) = std::env::var_os(key) {
            command.env(key, value);
        }
    });
    // LANGUAGE is used on win32
    command
        .env("LANGUAGE", "C")
        .env("LANG", "C")
        .env("LC_ALL", "C");

    match command.output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_owned()
        }
        Ok(output) => {
            debug!("git exited with {}", output.status);
            UNKNOWN_HASH.to_owned()
        }
        Err(err) => {
            debug!("unable to run git: {}", err);
            UNKNOWN_HASH.to_owned()
        }
    }
}

/// The short revision hash of the package.
///
/// Uses git if `repo_dir` is a checkout, otherwise the local part of the
/// version recorded in an earlier generated `version_file`.
pub fn short_hash(repo_dir: impl AsRef<Path>, version_file: impl AsRef<Path>) -> Result<String> {
    let repo_dir = repo_dir.as_ref();
    let version_file = version_file.as_ref();

    let sha = if repo_dir.join(".git").exists() {
        git_hash(repo_dir).chars().take(7).collect()
    } else if version_file.exists() {
        let version = read_version(version_file).with_context(|| "unable to get git version")?;
        match version.rsplit_once('+') {
            Some((_, sha)) => sha.to_owned(),
            None => version,
        }
    } else {
        UNKNOWN_HASH.to_owned()
    };

    Ok(sha)
}

/// Reads `__version__` from a generated version file.
pub fn read_version(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let captures = VERSION_REGEX
        .captures(&text)
        .ok_or_else(|| format_err!("'{}' does not define __version__", path.display()))?;
    Ok(captures[1].to_owned())
}

/// Writes the version file and returns the full version.
pub fn write_version_file(
    path: impl AsRef<Path>,
    info: &VersionInfo,
    time: &DateTime<Local>,
) -> Result<String> {
    let path = path.as_ref();
    fs::write(path, info.render(time))
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    let version = info.version();
    info!("wrote version {} to '{}'", version, path.display());
    Ok(version)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionInfo {
    pub short_version: String,
    pub sha: String,
}

impl VersionInfo {
    pub fn new(short_version: impl Into<String>, sha: impl Into<String>) -> Result<Self> {
        let short_version = short_version.into();
        let sha = sha.into();

        ensure!(
            !short_version.is_empty()
                && short_version
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '.'),
            "invalid short version '{}'",
            short_version
        );
        ensure!(
            !sha.contains(|ch: char| ch.is_whitespace() || ch == '+' || ch == '\''),
            "invalid revision hash '{}'",
            sha
        );

        Ok(Self { short_version, sha })
    }

    /// Loads the short version from a plain text file, e.g. `VERSION`.
    pub fn from_short_version_file(path: impl AsRef<Path>, sha: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Self::new(text.trim(), sha)
    }

    /// The short version with the hash as the local part.
    pub fn version(&self) -> String {
        format!("{}+{}", self.short_version, self.sha)
    }

    /// The comma separated components of the short version.
    pub fn version_info(&self) -> String {
        self.short_version.split('.').collect::<Vec<_>>().join(", ")
    }

    pub fn render(&self, time: &DateTime<Local>) -> String {
        format!(
            "# GENERATED VERSION FILE
# TIME: {}

__version__ = '{}'
short_version = '{}'
version_info = ({})
",
            time.format("%a %b %e %H:%M:%S %Y"),
            self.version(),
            self.short_version,
            self.version_info()
        )
    }
}
