use anyhow::Result;
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::sync::Mutex;
use tch_ext::{find_operator, ExtensionBuilderInit, GpuCapability, OPERATORS};

static RECORDS: Lazy<Mutex<Vec<(Level, String)>>> = Lazy::new(|| Mutex::new(vec![]));

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = RECORDS.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

fn take_records() -> Vec<(Level, String)> {
    std::mem::take(&mut *RECORDS.lock().unwrap())
}

// The logger is process wide, so both paths are checked in one test.
#[test]
fn notice_only_on_cpu_path() -> Result<()> {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let builder = ExtensionBuilderInit::default().build()?;
    let spec = find_operator(&OPERATORS, "roi_pool_ext").unwrap();
    let notice = "Compiling roi_pool_ext without CUDA";

    take_records();
    let target = builder.build_target(spec, GpuCapability::new(false, false));
    assert!(!target.is_gpu_enabled());
    let records = take_records();
    assert!(
        records
            .iter()
            .any(|(level, message)| *level == Level::Warn && message == notice),
        "missing CPU notice in {:?}",
        records
    );

    [
        GpuCapability::new(true, false),
        GpuCapability::new(false, true),
    ]
    .into_iter()
    .for_each(|capability| {
        let target = builder.build_target(spec, capability);
        assert!(target.is_gpu_enabled());
        let records = take_records();
        assert!(
            records
                .iter()
                .all(|(_, message)| !message.contains("without CUDA")),
            "unexpected CPU notice in {:?}",
            records
        );
    });

    Ok(())
}
