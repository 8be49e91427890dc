use std::ffi::CString;
use std::fs;

use dxf2geo::diagnostics::GdalDiagnostics;
use dxf2geo::logging::RunLog;
use gdal_sys::{CPLErr, CPLError};
use tracing::level_filters::LevelFilter;

fn raise(class: CPLErr::Type, number: i32, message: &str) {
    let msg = CString::new(message).unwrap();
    unsafe {
        CPLError(class, number, msg.as_ptr());
    }
}

#[test]
fn test_gdal_diagnostics_reach_run_log() {
    // GDAL has one process-wide handler, so every scenario runs in this test
    let dir = tempfile::tempdir().unwrap();
    let log = RunLog::create(dir.path(), LevelFilter::INFO, false).unwrap();

    {
        let _guard = GdalDiagnostics::install(
            log.dispatch().clone(),
            vec!["Block ".to_string(), "DXF: Skipping".to_string()],
        );
        raise(CPLErr::CE_Warning, 1, "Block *Paper_Space not found");
        raise(CPLErr::CE_Warning, 1, "DXF: Skipping HATCH");
        raise(CPLErr::CE_Warning, 6, "Field EntityHandle truncated");
        raise(CPLErr::CE_Failure, 42, "cannot write feature");
    }
    // handler removed; this one goes to GDAL's default channel
    raise(CPLErr::CE_Warning, 1, "after the guard");

    let path = log.path().to_path_buf();
    drop(log);
    let text = fs::read_to_string(path).unwrap();

    assert!(text.contains("GDAL warning: Field EntityHandle truncated"));
    assert!(text.contains("GDAL error (42): cannot write feature"));
    assert!(!text.contains("Paper_Space"));
    assert!(!text.contains("HATCH"));
    assert!(!text.contains("after the guard"));

    suppressed_warnings_visible_at_debug();
}

fn suppressed_warnings_visible_at_debug() {
    let dir = tempfile::tempdir().unwrap();
    let log = RunLog::create(dir.path(), LevelFilter::DEBUG, false).unwrap();
    {
        let _guard = GdalDiagnostics::install(log.dispatch().clone(), vec!["Block ".to_string()]);
        raise(CPLErr::CE_Warning, 1, "Block *Model_Space not found");
    }
    let path = log.path().to_path_buf();
    drop(log);

    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("Suppressed GDAL warning: Block *Model_Space not found"));
}
