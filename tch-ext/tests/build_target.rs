use anyhow::Result;
use std::path::PathBuf;
use tch_ext::{
    CompilePhase, ExtensionBuilder, ExtensionBuilderInit, GpuCapability, OperatorSpecInit,
    GPU_DEFINE, OPERATORS,
};

const ALL_CAPABILITIES: [GpuCapability; 4] = [
    GpuCapability {
        probe: false,
        force: false,
    },
    GpuCapability {
        probe: true,
        force: false,
    },
    GpuCapability {
        probe: false,
        force: true,
    },
    GpuCapability {
        probe: true,
        force: true,
    },
];

fn builder() -> ExtensionBuilder {
    ExtensionBuilderInit::default().build().unwrap()
}

#[test]
fn source_count_follows_capability() {
    let builder = builder();

    OPERATORS.iter().for_each(|spec| {
        ALL_CAPABILITIES.iter().for_each(|&capability| {
            let target = builder.build_target(spec, capability);
            let expect = if capability.enabled() {
                spec.sources().len() + spec.gpu_sources().len()
            } else {
                spec.sources().len()
            };
            assert_eq!(target.resolved_sources.len(), expect);
        });
    });
}

#[test]
fn qualified_name_has_single_delimiter() {
    let builder = builder();

    OPERATORS.iter().for_each(|spec| {
        let target = builder.build_target(spec, GpuCapability::default());
        assert_eq!(
            target.qualified_name,
            format!("{}.{}", spec.module(), spec.name())
        );
        assert!(!target.qualified_name.contains(".."));
    });
}

#[test]
fn force_override_dominates_probe() {
    let builder = builder();

    OPERATORS.iter().for_each(|spec| {
        let forced = builder.build_target(spec, GpuCapability::new(false, true));
        let probed = builder.build_target(spec, GpuCapability::new(true, false));
        assert!(forced.is_gpu_enabled());
        assert_eq!(forced, probed);
    });
}

#[test]
fn cpu_only_has_no_gpu_marker_or_nvcc_flags() {
    let builder = builder();

    OPERATORS.iter().for_each(|spec| {
        let target = builder.build_target(spec, GpuCapability::new(false, false));
        assert!(!target.has_define(GPU_DEFINE));
        assert!(target.compile_flags.get(CompilePhase::Nvcc).is_none());
        assert!(target.compile_flags.get(CompilePhase::Cxx).is_some());
        assert_eq!(target.device_sources().count(), 0);
    });
}

#[test]
fn resolution_is_idempotent() {
    let builder = builder();

    ALL_CAPABILITIES.iter().for_each(|&capability| {
        let first = builder.build_all(OPERATORS.iter(), capability);
        let second = builder.build_all(OPERATORS.iter(), capability);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    });
}

#[test]
fn nms_example_scenario() -> Result<()> {
    let spec = OperatorSpecInit {
        name: "nms_ext".into(),
        module: "pkg.ops.nms".into(),
        sources: vec!["nms_ext.cpp".into(), "cpu/nms_cpu.cpp".into()],
        gpu_sources: vec!["cuda/nms_cuda.cpp".into(), "cuda/nms_kernel.cu".into()],
    }
    .build()?;

    let target = builder().build_target(&spec, GpuCapability::new(true, false));
    let expect: Vec<PathBuf> = [
        "pkg/ops/nms/nms_ext.cpp",
        "pkg/ops/nms/cpu/nms_cpu.cpp",
        "pkg/ops/nms/cuda/nms_cuda.cpp",
        "pkg/ops/nms/cuda/nms_kernel.cu",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    assert_eq!(target.resolved_sources, expect);
    assert!(target.has_define(GPU_DEFINE));
    Ok(())
}

#[test]
fn plan_json_layout() -> Result<()> {
    let spec = OPERATORS
        .iter()
        .find(|spec| spec.name() == "roi_pool_ext")
        .unwrap();

    let cpu = serde_json::to_value(builder().build_target(spec, GpuCapability::default()))?;
    assert_eq!(cpu["qualified_name"], "mmdet.ops.roi_pool.roi_pool_ext");
    assert_eq!(cpu["compile_flags"]["cxx"][0], "-std=c++14");
    assert!(cpu["compile_flags"].get("nvcc").is_none());

    let gpu = serde_json::to_value(builder().build_target(spec, GpuCapability::new(true, true)))?;
    assert_eq!(gpu["defines"][0]["name"], GPU_DEFINE);
    assert_eq!(gpu["compile_flags"]["nvcc"].as_array().map(Vec::len), Some(3));
    Ok(())
}
