use std::io::Write;
use std::path::PathBuf;

use pgconf_audit::config::load_config;
use pgconf_audit::engine::*;
use pgconf_audit::error::AssessmentError;
use pgconf_audit::host::{HostProfile, StorageType};
use pgconf_audit::rules::CATALOG;
use pgconf_audit::snapshot::{read_snapshot, ParameterSnapshot};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture(name: &str) -> ParameterSnapshot {
    read_snapshot(&fixture_path(name)).expect("Failed to read fixture")
}

fn big_host() -> HostProfile {
    HostProfile::with_memory_gb(32, 128)
}

fn verdict(results: &ResultSet, parameter: &str) -> (Status, Priority) {
    let result = results
        .get(parameter)
        .unwrap_or_else(|| panic!("no result for {}", parameter));
    (result.status, result.priority)
}

#[test]
fn test_every_rule_reports_once_in_catalog_order() {
    let engine = AssessmentEngine::with_defaults();
    let results = engine.run(&fixture("untuned_settings.json"), &big_host()).unwrap();

    assert_eq!(results.len(), CATALOG.len());
    let names: Vec<_> = results.iter().map(|r| r.parameter.as_str()).collect();
    let expected: Vec<_> = CATALOG.iter().map(|r| r.parameter).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_empty_snapshot_still_reports_every_rule() {
    let engine = AssessmentEngine::with_defaults();
    let results = engine.run(&ParameterSnapshot::new(), &big_host()).unwrap();

    assert_eq!(results.len(), CATALOG.len());
    // required inputs missing -> FAILED/HIGH; optional ones fall back to off
    assert_eq!(verdict(&results, "shared_buffers"), (Status::Failed, Priority::High));
    assert_eq!(verdict(&results, "statement_timeout"), (Status::Failed, Priority::Low));
    assert_eq!(verdict(&results, "track_io_timing"), (Status::Failed, Priority::Low));
}

#[test]
fn test_untuned_defaults() {
    let engine = AssessmentEngine::with_defaults();
    let results = engine.run(&fixture("untuned_settings.json"), &big_host()).unwrap();

    assert_eq!(
        verdict(&results, "random_page_cost/seq_page_cost"),
        (Status::Failed, Priority::Medium)
    );
    assert_eq!(verdict(&results, "shared_buffers"), (Status::Failed, Priority::Low));
    assert_eq!(verdict(&results, "checkpoint_timeout"), (Status::Passed, Priority::Low));
    assert_eq!(verdict(&results, "max_connections"), (Status::Passed, Priority::Low));
    assert_eq!(
        verdict(&results, "maintenance_work_mem"),
        (Status::Passed, Priority::Medium)
    );
    assert_eq!(verdict(&results, "work_mem"), (Status::Passed, Priority::Low));
    assert_eq!(
        verdict(&results, "autovacuum_max_workers"),
        (Status::Failed, Priority::Medium)
    );
    assert_eq!(
        results.get("autovacuum_max_workers").unwrap().note,
        "Current: 3, Recommended: 6 for 32 CPUs"
    );
    assert_eq!(
        results.get("max_parallel_maintenance_workers").unwrap().note,
        "Current: 2, Recommended: 4 for 32 CPUs"
    );
    assert_eq!(verdict(&results, "log_temp_files"), (Status::Failed, Priority::Low));

    let summary = results.summary();
    assert_eq!(summary.failed_high, 0);
    assert_eq!(summary.total, 18);
}

#[test]
fn test_tuned_snapshot_passes() {
    let engine = AssessmentEngine::with_defaults();
    let results = engine.run(&fixture("tuned_settings.json"), &big_host()).unwrap();

    let failures: Vec<_> = results
        .without_passed()
        .iter()
        .map(|r| format!("{}: {}", r.parameter, r.note))
        .collect();
    assert!(failures.is_empty(), "unexpected failures: {:?}", failures);
}

#[test]
fn test_row_and_object_snapshots_agree() {
    let engine = AssessmentEngine::with_defaults();
    let host = big_host();

    let from_object = engine.run(&fixture("untuned_settings.json"), &host).unwrap();
    let from_rows = engine.run(&fixture("untuned_settings_rows.json"), &host).unwrap();
    assert_eq!(from_object, from_rows);
}

#[test]
fn test_runs_are_idempotent() {
    let engine = AssessmentEngine::with_defaults();
    let snapshot = fixture("untuned_settings.json");
    let host = big_host().rto_minutes(3.0);

    assert_eq!(
        engine.run(&snapshot, &host).unwrap(),
        engine.run(&snapshot, &host).unwrap()
    );
}

#[test]
fn test_work_mem_budget_literal() {
    let engine = AssessmentEngine::with_defaults();
    let snapshot = fixture("untuned_settings.json").with("work_mem", "512MB");
    let results = engine.run(&snapshot, &big_host()).unwrap();

    let work_mem = results.get("work_mem").unwrap();
    assert_eq!(work_mem.status, Status::Failed);
    assert_eq!(work_mem.priority, Priority::High);
    assert_eq!(
        work_mem.note,
        "Potential usage (51200MB) exceeds 25% limit (32736MB). Reduce work_mem or connections."
    );
}

#[test]
fn test_timeouts_zero_vs_set() {
    let engine = AssessmentEngine::with_defaults();
    let host = big_host();

    for parameter in [
        "idle_in_transaction_session_timeout",
        "idle_session_timeout",
        "statement_timeout",
    ] {
        let results = engine
            .run(&fixture("untuned_settings.json").with(parameter, "0"), &host)
            .unwrap();
        assert_eq!(verdict(&results, parameter), (Status::Failed, Priority::Low));

        let results = engine
            .run(&fixture("untuned_settings.json").with(parameter, "30000"), &host)
            .unwrap();
        assert_eq!(verdict(&results, parameter), (Status::Passed, Priority::Low));
    }
}

#[test]
fn test_ssd_page_cost_gap() {
    let engine = AssessmentEngine::with_defaults();
    let host = big_host().storage(StorageType::Ssd);
    let base = fixture("untuned_settings.json").with("seq_page_cost", 1.0);

    let results = engine.run(&base.clone().with("random_page_cost", 1.1), &host).unwrap();
    assert_eq!(
        verdict(&results, "random_page_cost/seq_page_cost"),
        (Status::Passed, Priority::Low)
    );

    let results = engine.run(&base.with("random_page_cost", 4.0), &host).unwrap();
    assert_eq!(
        verdict(&results, "random_page_cost/seq_page_cost"),
        (Status::Failed, Priority::Medium)
    );
}

#[test]
fn test_checkpoint_timeout_against_rto() {
    let engine = AssessmentEngine::with_defaults();
    let host = big_host().rto_minutes(1.0);

    let results = engine
        .run(&fixture("untuned_settings.json").with("checkpoint_timeout", "5min"), &host)
        .unwrap();
    let checkpoint = results.get("checkpoint_timeout").unwrap();
    assert_eq!(checkpoint.status, Status::Failed);
    assert_eq!(checkpoint.priority, Priority::Medium);
    assert_eq!(
        checkpoint.note,
        "Exceeds RTO (5.0min > 1min). Reduce to meet recovery objectives."
    );

    let results = engine
        .run(&fixture("untuned_settings.json").with("checkpoint_timeout", "0.5min"), &host)
        .unwrap();
    assert_eq!(verdict(&results, "checkpoint_timeout"), (Status::Passed, Priority::Low));
}

#[test]
fn test_malformed_value_is_contained() {
    let engine = AssessmentEngine::with_defaults();
    let snapshot = fixture("untuned_settings.json").with("work_mem", "abc");
    let results = engine.run(&snapshot, &big_host()).unwrap();

    assert_eq!(results.len(), CATALOG.len());
    let work_mem = results.get("work_mem").unwrap();
    assert_eq!((work_mem.status, work_mem.priority), (Status::Failed, Priority::High));
    assert!(work_mem.note.contains("work_mem") && work_mem.note.contains("abc"));

    // rules that do not read work_mem are unaffected
    assert_eq!(verdict(&results, "shared_buffers"), (Status::Failed, Priority::Low));
    assert_eq!(verdict(&results, "max_wal_size"), (Status::Passed, Priority::Low));
}

#[test]
fn test_high_filter_is_ordered_subsequence() {
    let engine = AssessmentEngine::with_defaults();
    let snapshot = fixture("untuned_settings.json")
        .with("work_mem", "512MB")
        .with("shared_buffers", "96GB");
    let results = engine.run(&snapshot, &big_host()).unwrap();

    let high = results.filter_by_priority(Priority::High);
    assert!(!high.is_empty());
    assert!(high.iter().all(|r| r.priority == Priority::High));

    let mut positions = high.iter().map(|h| {
        results
            .iter()
            .position(|r| r == h)
            .expect("filtered result must come from the full set")
    });
    let mut last = positions.next().unwrap();
    for pos in positions {
        assert!(pos > last);
        last = pos;
    }
}

#[test]
fn test_invalid_host_fails_fast() {
    let engine = AssessmentEngine::with_defaults();
    let snapshot = fixture("untuned_settings.json");

    let err = engine.run(&snapshot, &HostProfile::new(0, 1 << 30)).unwrap_err();
    assert!(matches!(err, AssessmentError::InvalidHostProfile(_)));

    let err = engine
        .run(&snapshot, &HostProfile::with_memory_gb(4, 16).rto_minutes(-1.0))
        .unwrap_err();
    assert!(matches!(err, AssessmentError::InvalidHostProfile(_)));
}

#[test]
fn test_custom_thresholds_change_verdicts() {
    let defaults = include_str!("../config/thresholds.toml");
    let custom = defaults.replace("divisor = 5.0", "divisor = 10.0");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(custom.as_bytes()).unwrap();

    let engine = AssessmentEngine::new(load_config(file.path()).unwrap()).unwrap();
    let results = engine.run(&fixture("untuned_settings.json"), &big_host()).unwrap();

    // 32 / 10 = 3 workers recommended, which the default setting meets
    assert_eq!(
        verdict(&results, "autovacuum_max_workers"),
        (Status::Passed, Priority::Medium)
    );
}

#[test]
fn test_results_serialize_with_stable_field_names() {
    let engine = AssessmentEngine::with_defaults();
    let results = engine.run(&fixture("untuned_settings.json"), &big_host()).unwrap();

    let json = serde_json::to_value(&results).unwrap();
    let first = &json[0];
    for field in [
        "parameter",
        "status",
        "priority",
        "note",
        "current_value",
        "recommended_value",
    ] {
        assert!(first.get(field).is_some(), "missing field {}", field);
    }
    assert_eq!(first["status"], "FAILED");
    assert_eq!(first["priority"], "MEDIUM");
}

#[test]
fn test_unreadable_value_fails_only_its_rule() {
    let json = r#"{
        "shared_buffers": { "setting": 4194304, "unit": "8kB" },
        "statement_timeout": ["30s"],
        "work_mem": "4MB"
    }"#;
    let snapshot = ParameterSnapshot::from_json(json).unwrap();
    let results = AssessmentEngine::with_defaults()
        .run(&snapshot, &big_host())
        .unwrap();

    assert_eq!(results.len(), CATALOG.len());
    let timeout = results.get("statement_timeout").unwrap();
    assert_eq!((timeout.status, timeout.priority), (Status::Failed, Priority::High));
    assert!(timeout.note.contains("statement_timeout"));

    // 4194304 pages of 8kB = 32GB, 25% of 128GB
    assert_eq!(verdict(&results, "shared_buffers"), (Status::Passed, Priority::Low));
}
