use anyhow::Result;
use std::path::PathBuf;
use tch_ext::{ExtensionBuilderInit, GpuCapability, OperatorSpecInit, ToolchainInit};

#[test]
fn missing_source_fails_with_target_name() -> Result<()> {
    let out_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("missing-source");
    let package_root = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("no-such-package");

    let spec = OperatorSpecInit {
        name: "missing_ext".into(),
        module: "pkg.ops.missing".into(),
        sources: vec!["src/missing_ext.cpp".into()],
        gpu_sources: vec![],
    }
    .build()?;
    let builder = ExtensionBuilderInit {
        package_root: Some(package_root),
        ..Default::default()
    }
    .build()?;
    let target = builder.build_target(&spec, GpuCapability::default());

    let toolchain = ToolchainInit {
        out_dir: out_dir.clone(),
        opt_level: 0,
        libtorch: None,
        libtorch_cxx11_abi: true,
        cuda_home: None,
        probe_python: false,
        emit_cargo_metadata: false,
    }
    .build()?;

    let err = toolchain.compile(&target).unwrap_err();
    assert!(err.to_string().contains("pkg.ops.missing.missing_ext"));
    assert!(out_dir.join("pkg_ops_missing_missing_ext").is_dir());
    Ok(())
}
