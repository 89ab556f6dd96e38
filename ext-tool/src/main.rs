use anyhow::{format_err, Context, Result};
use clap::{Args, Parser};
use log::info;
use pkg_meta::VersionInfo;
use prettytable::{cell, row, Table};
use std::path::{Path, PathBuf};
use tch_ext::{
    env::{CudaEnv, ExtEnv},
    find_operator, BuildConfig, BuildTarget, CudaToolkitProbe, ExtensionBuilderInit,
    GpuCapability, OperatorSpec, ToolchainInit,
};

#[derive(Debug, Clone, Parser)]
/// Build the custom operator extensions of the detection toolbox.
enum Opts {
    /// List the registered operators
    List {
        #[clap(long)]
        /// build configuration file
        config: Option<PathBuf>,
    },
    /// Print the resolved build targets in JSON
    Plan {
        #[clap(flatten)]
        target_opts: TargetOpts,
    },
    /// Compile the build targets
    Build {
        #[clap(flatten)]
        target_opts: TargetOpts,
    },
    /// Generate the version file of the package
    WriteVersion {
        #[clap(long, default_value = ".")]
        /// repository directory
        repo_dir: PathBuf,
        #[clap(long, default_value = "mmdet/VERSION")]
        /// file containing the short version
        short_version_file: PathBuf,
        #[clap(long, default_value = "mmdet/version.py")]
        /// output version file
        output_file: PathBuf,
    },
    /// Print the items of a requirements file
    Requirements {
        /// requirements file
        file: PathBuf,
        #[clap(long)]
        /// strip version specifiers
        no_version: bool,
    },
}

#[derive(Debug, Clone, Args)]
struct TargetOpts {
    #[clap(long)]
    /// build configuration file
    config: Option<PathBuf>,
    #[clap(long)]
    /// select the CUDA path even if no GPU is found
    force_cuda: bool,
    #[clap(long)]
    /// only handle these operators, by name or qualified name
    operator: Vec<String>,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::List { config } => list(config)?,
        Opts::Plan { target_opts } => plan(target_opts)?,
        Opts::Build { target_opts } => build(target_opts)?,
        Opts::WriteVersion {
            repo_dir,
            short_version_file,
            output_file,
        } => write_version(repo_dir, short_version_file, output_file)?,
        Opts::Requirements { file, no_version } => requirements(file, !no_version)?,
    }

    Ok(())
}

fn load_config(config_file: Option<&Path>) -> Result<BuildConfig> {
    let mut config = match config_file {
        Some(path) => BuildConfig::open(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        None => BuildConfig::default(),
    };
    config.apply_env(&ExtEnv::from_env()?)?;
    Ok(config)
}

fn list(config_file: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_file.as_deref())?;

    let mut table = Table::new();
    table.add_row(row!["qualified name", "sources", "gpu sources"]);
    config.operators().iter().for_each(|spec| {
        table.add_row(row![
            spec.qualified_name(),
            join_paths(spec.sources()),
            join_paths(spec.gpu_sources())
        ]);
    });
    table.printstd();

    Ok(())
}

fn plan(target_opts: TargetOpts) -> Result<()> {
    let (_, targets) = resolve_targets(&target_opts)?;
    println!("{}", serde_json::to_string_pretty(&targets)?);
    Ok(())
}

fn build(target_opts: TargetOpts) -> Result<()> {
    let (config, targets) = resolve_targets(&target_opts)?;
    let cuda_home = match &config.toolchain.cuda_home {
        Some(cuda_home) => Some(cuda_home.clone()),
        None => CudaToolkitProbe::from_env(&CudaEnv::from_env()?).find_toolkit_root(),
    };
    let toolchain = ToolchainInit {
        cuda_home,
        ..ToolchainInit::from_config(&config.toolchain)
    }
    .build()?;

    let mut table = Table::new();
    table.add_row(row!["qualified name", "cuda", "archives"]);
    for target in &targets {
        let compiled = toolchain.compile(target)?;
        table.add_row(row![
            compiled.qualified_name,
            target.is_gpu_enabled(),
            compiled.archives.join(", ")
        ]);
    }
    table.printstd();

    Ok(())
}

fn resolve_targets(target_opts: &TargetOpts) -> Result<(BuildConfig, Vec<BuildTarget>)> {
    let TargetOpts {
        config,
        force_cuda,
        operator,
    } = target_opts;

    let config = load_config(config.as_deref())?;
    let detected = GpuCapability::detect()?;
    let capability = GpuCapability::new(detected.probe, detected.force || *force_cuda);
    let builder = ExtensionBuilderInit::from_config(&config).build()?;

    let operators = config.operators();
    let selected: Vec<&OperatorSpec> = if operator.is_empty() {
        operators.iter().collect()
    } else {
        operator
            .iter()
            .map(|name| {
                find_operator(operators, name)
                    .ok_or_else(|| format_err!("operator '{}' is not registered", name))
            })
            .collect::<Result<_>>()?
    };

    let targets = builder.build_all(selected, capability);
    info!("resolved {} build targets", targets.len());
    Ok((config, targets))
}

fn write_version(
    repo_dir: impl AsRef<Path>,
    short_version_file: impl AsRef<Path>,
    output_file: impl AsRef<Path>,
) -> Result<()> {
    let output_file = output_file.as_ref();
    let sha = pkg_meta::short_hash(repo_dir, output_file)?;
    let info = VersionInfo::from_short_version_file(short_version_file, sha)?;
    let version = pkg_meta::write_version_file(output_file, &info, &chrono::Local::now())?;
    println!("{}", version);
    Ok(())
}

fn requirements(file: impl AsRef<Path>, with_version: bool) -> Result<()> {
    pkg_meta::parse_requirements(file, with_version)?
        .iter()
        .for_each(|item| println!("{}", item));
    Ok(())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
