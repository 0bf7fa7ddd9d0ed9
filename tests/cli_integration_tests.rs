//! CLI smoke tests: every subcommand against the sample fixture, JSON mode.

mod common;

use serde_json::Value;

fn sample() -> String {
    common::fixture("sample.json").to_string_lossy().into_owned()
}

fn json_line(stdout: &str) -> Value {
    let line = stdout.lines().next().expect("at least one output line");
    serde_json::from_str(line).expect("stdout line is JSON")
}

fn case_numbers(payload: &Value) -> Vec<String> {
    payload["rows"]
        .as_array()
        .expect("rows array")
        .iter()
        .map(|r| r["fields"]["CaseNumber"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn run_cases(case: &str, extra: &[&str], envs: &[(&str, &str)]) -> Value {
    let home = tempfile::tempdir().unwrap();
    let source = sample();
    let mut args = vec!["--json", "cases", "--source", source.as_str()];
    args.extend_from_slice(extra);
    let result = common::run_cli_case(case, home.path(), &args, envs);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    json_line(&result.stdout)
}

#[test]
fn help_command_prints_usage() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case("help_command_prints_usage", home.path(), &["--help"], &[]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(
        result.stdout.contains("Usage: slad [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn summary_counts_active_stopped_and_completed() {
    let home = tempfile::tempdir().unwrap();
    let source = sample();
    let result = common::run_cli_case(
        "summary_counts",
        home.path(),
        &["--json", "summary", "--source", &source],
        &[],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = json_line(&result.stdout);
    assert_eq!(payload["command"], "summary");
    assert_eq!(payload["alerting"], true);

    let counters = payload["counters"].as_array().unwrap();
    assert_eq!(counters.len(), 4);
    let rt = &counters[0];
    assert_eq!(rt["full_label"], "Response Time (RT)");
    assert_eq!(rt["count"], 3);
    assert_eq!(rt["stopped_count"], 1);
    assert_eq!(rt["alerting"], true);
    let fx = &counters[3];
    assert_eq!(fx["count"], 1);
    assert_eq!(fx["completed"], 1);
}

#[test]
fn summary_priority_mode_counts_one_milestone_per_case() {
    let home = tempfile::tempdir().unwrap();
    let source = sample();
    let result = common::run_cli_case(
        "summary_priority_mode",
        home.path(),
        &["--json", "summary", "--source", &source, "--priority-mode"],
        &[],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = json_line(&result.stdout);
    assert_eq!(payload["priority_mode"], true);
    let counters = payload["counters"].as_array().unwrap();
    assert_eq!(counters[0]["count"], 3);
    // Case c3's fix-resolution milestone loses to its more urgent response time.
    assert_eq!(counters[3]["count"], 0);
}

#[test]
fn cases_default_to_sla_order() {
    let payload = run_cases("cases_default_order", &["-m", "RT"], &[]);
    assert_eq!(payload["title"], "Response Time Overview");
    assert_eq!(payload["partition"], "active");
    assert_eq!(case_numbers(&payload), vec!["001", "003", "002"]);
    assert_eq!(payload["more_available"], false);
    assert_eq!(payload["search_placeholder"], "Filter 3 cases...");
    assert!(payload["column_fallback"].is_null());

    let sorted: Vec<&str> = payload["columns"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| !c["sort_icon"].is_null())
        .map(|c| c["field_name"].as_str().unwrap())
        .collect();
    assert_eq!(sorted, vec!["RT_Remaining"]);
}

#[test]
fn cases_stopped_partition() {
    let payload = run_cases("cases_stopped", &["-m", "Response Time", "--stopped"], &[]);
    assert_eq!(case_numbers(&payload), vec!["005"]);
}

#[test]
fn cases_quick_filters() {
    let by_priority = run_cases("cases_priority", &["-m", "RT", "--priority", "High,Urgent"], &[]);
    assert_eq!(case_numbers(&by_priority), vec!["001", "003"]);

    let with_jira = run_cases("cases_jira", &["-m", "RT", "--has-jira"], &[]);
    assert_eq!(case_numbers(&with_jira), vec!["001"]);

    let searched = run_cases("cases_search", &["-m", "RT", "--search", "login"], &[]);
    assert_eq!(case_numbers(&searched), vec!["002"]);
}

#[test]
fn cases_paging_and_descending_sort() {
    let envs = [("SLAD_TABLE_PAGE_SIZE", "2")];
    let first = run_cases("cases_page_one", &["-m", "RT", "--sort", "CaseNumber"], &envs);
    assert_eq!(case_numbers(&first), vec!["001", "002"]);
    assert_eq!(first["more_available"], true);
    assert_eq!(first["search_placeholder"], "Filter 2+ cases...");

    let both = run_cases(
        "cases_page_two",
        &["-m", "RT", "--sort", "CaseNumber", "--pages", "2"],
        &envs,
    );
    assert_eq!(case_numbers(&both), vec!["001", "002", "003"]);
    assert_eq!(both["more_available"], false);

    let desc = run_cases("cases_desc", &["-m", "RT", "--sort", "CaseNumber", "--desc"], &[]);
    assert_eq!(case_numbers(&desc), vec!["003", "002", "001"]);
}

#[test]
fn malformed_column_spec_falls_back() {
    let payload = run_cases("cases_bad_columns", &["-m", "RT", "--columns", "Subject:wide"], &[]);
    assert!(payload["column_fallback"].is_string());
    let fields: Vec<&str> = payload["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["field_name"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["CaseNumber", "Subject"]);
}

#[test]
fn unknown_milestone_is_user_error() {
    let home = tempfile::tempdir().unwrap();
    let source = sample();
    let result = common::run_cli_case(
        "unknown_milestone",
        home.path(),
        &["cases", "--source", &source, "-m", "Lunch"],
        &[],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("unknown milestone type"));
}

#[test]
fn missing_source_is_runtime_error() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "missing_source",
        home.path(),
        &["summary", "--source", "/nonexistent/slad.json"],
        &[],
    );
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
}

#[test]
fn export_writes_selected_fields() {
    let home = tempfile::tempdir().unwrap();
    let out = home.path().join("rt.csv");
    let out_arg = out.to_string_lossy().into_owned();
    let source = sample();
    let result = common::run_cli_case(
        "export_selected",
        home.path(),
        &[
            "--json", "export", "--source", &source, "-m", "RT", "--fields", "CaseNumber,Subject",
            "--out", &out_arg,
        ],
        &[],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(json_line(&result.stdout)["path"], out_arg.as_str());

    let csv = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#""CaseNumber","Subject""#,
            r#""001","Engine failure""#,
            r#""003","Report export""#,
            r#""002","Login slow""#,
        ]
    );
}

#[test]
fn export_into_directory_includes_ticket_fields() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("exports");
    std::fs::create_dir(&dir).unwrap();
    let dir_arg = dir.to_string_lossy().into_owned();
    let source = sample();
    let result = common::run_cli_case(
        "export_directory",
        home.path(),
        &["export", "--source", &source, "-m", "RT", "--has-jira", "--out", &dir_arg],
        &[("SLAD_OUTPUT_FORMAT", "human")],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Exported to"));

    let csv = std::fs::read_to_string(dir.join("SLA_Export.csv")).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().contains("\"Jira Key\""));
    let row = lines.next().unwrap();
    assert!(row.contains("\"AVB-101\""));
    assert!(lines.next().is_none());
}

#[test]
fn export_rejects_unknown_field() {
    let home = tempfile::tempdir().unwrap();
    let source = sample();
    let result = common::run_cli_case(
        "export_unknown_field",
        home.path(),
        &["export", "--source", &source, "-m", "RT", "--fields", "Nope"],
        &[],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("unknown export field"));
}

#[test]
fn watch_stops_after_tick_limit() {
    let home = tempfile::tempdir().unwrap();
    let source = sample();
    let result = common::run_cli_case(
        "watch_ticks",
        home.path(),
        &["--json", "watch", "--source", &source, "--ticks", "1"],
        &[],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let lines: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let payload: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(payload["command"], "watch");
    assert_eq!(payload["counters"][0]["count"], 3);
}

#[test]
fn config_path_defaults_under_home() {
    let home = tempfile::tempdir().unwrap();
    let result = common::run_cli_case("config_path", home.path(), &["--json", "config", "path"], &[]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = json_line(&result.stdout);
    assert_eq!(payload["exists"], false);
    let path = payload["path"].as_str().unwrap();
    assert!(path.starts_with(&*home.path().to_string_lossy()));
    assert!(path.ends_with("config.toml"));
}

#[test]
fn config_validate_reports_bad_thresholds() {
    let home = tempfile::tempdir().unwrap();
    let cfg = home.path().join("slad.toml");
    std::fs::write(
        &cfg,
        "[thresholds]\ngreen_min_hours = 1.0\nyellow_min_hours = 12.0\norange_min_hours = 0.5\n",
    )
    .unwrap();
    let cfg_arg = cfg.to_string_lossy().into_owned();
    let result = common::run_cli_case(
        "config_validate_bad",
        home.path(),
        &["--json", "--config", &cfg_arg, "config", "validate"],
        &[],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    let payload = json_line(&result.stdout);
    assert_eq!(payload["valid"], false);
}

#[test]
fn verbose_run_writes_activity_log() {
    let home = tempfile::tempdir().unwrap();
    let source = sample();
    let result = common::run_cli_case(
        "verbose_activity_log",
        home.path(),
        &["--json", "-v", "cases", "--source", &source, "-m", "RT"],
        &[],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let log = home
        .path()
        .join(".local")
        .join("share")
        .join("slad")
        .join("activity.jsonl");
    let contents = std::fs::read_to_string(log).unwrap();
    assert!(contents.contains("drill_down_opened"));
    assert!(contents.contains("page_loaded"));
}
