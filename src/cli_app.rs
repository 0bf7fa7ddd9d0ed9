//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use sla_dashboard::core::config::Config;
use sla_dashboard::core::errors::SlaError;
use sla_dashboard::dashboard::model::{DashboardSettings, NotificationLevel};
use sla_dashboard::dashboard::runtime::{DashboardRuntime, RuntimeEvent};
use sla_dashboard::dashboard::update::DashboardMsg;
use sla_dashboard::dashboard::view::{DashboardViewModel, DrillDownView};
use sla_dashboard::logger::ActivityLogger;
use sla_dashboard::milestone::aggregator::Aggregation;
use sla_dashboard::milestone::model::{MilestoneType, Priority, SeverityBucket};
use sla_dashboard::source::FixtureSource;
use sla_dashboard::table::columns::DOT_SEP;
use sla_dashboard::table::export::EXPORT_FILE_NAME;
use sla_dashboard::table::sequencer::Partition;

/// SLA dashboard: milestone counters, drill-down case tables and CSV export.
#[derive(Debug, Parser)]
#[command(
    name = "slad",
    author,
    version,
    about = "SLA milestone dashboard",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Log informational activity too.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print the per-milestone counters.
    Summary(SummaryArgs),
    /// Print the drill-down case table of one milestone type.
    Cases(CasesArgs),
    /// Export the drill-down cases of one milestone type as CSV.
    Export(ExportArgs),
    /// Poll the source and print the counters after every refresh.
    Watch(WatchArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
struct SourceArgs {
    /// JSON fixture emulating the remote data source.
    #[arg(long, value_name = "FILE")]
    source: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct SummaryArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Count one representative milestone per case.
    #[arg(long)]
    priority_mode: bool,
}

#[derive(Debug, Clone, Args)]
struct FilterArgs {
    /// Milestone type: full name, short label or SLA field.
    #[arg(long, short = 'm', value_name = "NAME")]
    milestone: String,
    /// Free-text filter on case number and subject.
    #[arg(long)]
    search: Option<String>,
    /// Priority quick filters.
    #[arg(long, value_delimiter = ',', value_name = "P,...")]
    priority: Vec<String>,
    /// Only cases with at least one Jira ticket.
    #[arg(long)]
    has_jira: bool,
    /// Count one representative milestone per case.
    #[arg(long)]
    priority_mode: bool,
}

#[derive(Debug, Clone, Args)]
struct CasesArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    filters: FilterArgs,
    /// Column specification, overriding the configured one.
    #[arg(long, value_name = "SPEC")]
    columns: Option<String>,
    /// Sort field (defaults to the milestone's SLA column).
    #[arg(long)]
    sort: Option<String>,
    /// Sort descending.
    #[arg(long)]
    desc: bool,
    /// Number of pages to load.
    #[arg(long, default_value_t = 1)]
    pages: usize,
    /// Show the stopped partition instead of the active one.
    #[arg(long)]
    stopped: bool,
}

#[derive(Debug, Clone, Args)]
struct ExportArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    filters: FilterArgs,
    /// Fields to export; defaults to every offered field.
    #[arg(long, value_delimiter = ',', value_name = "F,...")]
    fields: Vec<String>,
    /// Output file or directory.
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct WatchArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Stop after this many refreshes.
    #[arg(long)]
    ticks: Option<usize>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<SlaError> for CliError {
    fn from(err: SlaError) -> Self {
        match err {
            SlaError::InvalidConfig { .. }
            | SlaError::MissingConfig { .. }
            | SlaError::ConfigParse { .. }
            | SlaError::ColumnSpec { .. } => Self::User(err.to_string()),
            SlaError::Serialization { .. } => Self::Internal(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

type Runtime = DashboardRuntime<FixtureSource, ActivityLogger>;

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Summary(args) => run_summary(cli, args),
        Command::Cases(args) => run_cases(cli, args),
        Command::Export(args) => run_export(cli, args),
        Command::Watch(args) => run_watch(cli, args),
        Command::Config(args) => run_config(cli, args),
    }
}

// ──────────────────── shared plumbing ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.verbose = true;
    }
    Ok(config)
}

fn open_runtime(config: &Config, settings: DashboardSettings, source: &SourceArgs) -> Result<Runtime, CliError> {
    let fixture = FixtureSource::load(&source.source)?;
    let logger = ActivityLogger::open(config.jsonl_path(), config.logging.verbose);
    Ok(DashboardRuntime::new(settings, fixture, logger, Utc::now()))
}

/// Accepts `Response Time`, `RT` or `RT_Remaining`.
fn parse_milestone(raw: &str) -> Result<MilestoneType, CliError> {
    let raw = raw.trim();
    MilestoneType::from_name(raw)
        .or_else(|| MilestoneType::from_sla_field(raw))
        .or_else(|| {
            MilestoneType::ALL
                .into_iter()
                .find(|t| t.short_label().eq_ignore_ascii_case(raw))
        })
        .ok_or_else(|| {
            let known: Vec<&str> = MilestoneType::ALL.iter().map(|t| t.name()).collect();
            CliError::User(format!(
                "unknown milestone type {raw:?}; expected one of {}",
                known.join(", ")
            ))
        })
}

fn parse_priorities(raw: &[String]) -> Result<Vec<Priority>, CliError> {
    raw.iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            Priority::from_label(p.trim())
                .ok_or_else(|| CliError::User(format!("unknown priority {p:?}")))
        })
        .collect()
}

/// Dotted paths as typed by the user become flattened field names.
fn field_key(raw: &str) -> String {
    raw.trim().replace('.', DOT_SEP)
}

/// Export field names may be typed dotted or flattened.
fn same_field(api_name: &str, typed: &str) -> bool {
    api_name == typed || api_name == field_key(typed)
}

/// Open the drill-down and apply the filters, in the order a user would.
fn open_filtered(rt: &mut Runtime, filters: &FilterArgs) -> Result<MilestoneType, CliError> {
    let milestone_type = parse_milestone(&filters.milestone)?;
    let priorities = parse_priorities(&filters.priority)?;
    rt.dispatch(DashboardMsg::Started);
    if filters.priority_mode {
        rt.dispatch(DashboardMsg::TogglePriorityMode);
    }
    rt.dispatch(DashboardMsg::OpenDrillDown(milestone_type));
    if let Some(term) = &filters.search {
        rt.dispatch(DashboardMsg::Search(term.clone()));
    }
    for priority in priorities {
        rt.dispatch(DashboardMsg::TogglePriority(priority));
    }
    if filters.has_jira {
        rt.dispatch(DashboardMsg::ToggleHasJira);
    }
    Ok(milestone_type)
}

/// Surface error notifications on stderr; the dashboard itself never aborts.
fn report_notifications(view: &DashboardViewModel) {
    for n in &view.notifications {
        match n.level {
            NotificationLevel::Error | NotificationLevel::Warning => {
                eprintln!("{} {}: {}", "warning:".yellow().bold(), n.title, n.message);
            }
            NotificationLevel::Info | NotificationLevel::Success => {}
        }
    }
}

fn bucket_text(bucket: SeverityBucket, text: &str) -> colored::ColoredString {
    match bucket {
        SeverityBucket::Green => text.green(),
        SeverityBucket::Yellow => text.yellow(),
        SeverityBucket::Orange => text.truecolor(255, 165, 0),
        SeverityBucket::Red => text.red().bold(),
    }
}

// ──────────────────── summary / watch ────────────────────

fn summary_json(view: &DashboardViewModel, aggregation: &Aggregation) -> Result<Value, CliError> {
    Ok(json!({
        "priority_mode": view.priority_mode,
        "alerting": view.alerting,
        "last_refresh": view.last_refresh,
        "counters": serde_json::to_value(&view.counters)?,
        "active": serde_json::to_value(&aggregation.active)?,
        "stopped": serde_json::to_value(&aggregation.stopped)?,
    }))
}

fn print_summary_human(view: &DashboardViewModel, aggregation: &Aggregation) {
    let mode = if view.priority_mode { "one per case" } else { "all milestones" };
    println!("{} ({mode})", "SLA milestones".bold());
    for counter in &view.counters {
        let stats = aggregation.active_stats(counter.milestone_type);
        let buckets: Vec<String> = SeverityBucket::ALL
            .iter()
            .map(|b| {
                let label = format!("{}:{}", &b.label()[..1].to_uppercase(), stats.bucket_counts.get(*b));
                bucket_text(*b, &label).to_string()
            })
            .collect();
        let count = if counter.alerting {
            counter.count.to_string().red().bold().to_string()
        } else {
            counter.count.to_string()
        };
        println!(
            "  {:<32} {:>5}  {}  [{}]  stopped: {}  completed: {}",
            counter.full_label,
            count,
            buckets.join(" "),
            counter.tooltip,
            counter.stopped_count,
            counter.completed,
        );
    }
}

fn emit_summary(cli: &Cli, command: &str, rt: &Runtime) -> Result<(), CliError> {
    let view = rt.view();
    report_notifications(&view);
    match output_mode(cli) {
        OutputMode::Human => print_summary_human(&view, &rt.model().aggregation),
        OutputMode::Json => {
            let mut payload = summary_json(&view, &rt.model().aggregation)?;
            payload["command"] = json!(command);
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_summary(cli: &Cli, args: &SummaryArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let mut rt = open_runtime(&config, DashboardSettings::from_config(&config), &args.source)?;
    rt.dispatch(DashboardMsg::Started);
    if args.priority_mode {
        rt.dispatch(DashboardMsg::TogglePriorityMode);
    }
    let result = emit_summary(cli, "summary", &rt);
    rt.shutdown();
    result
}

fn run_watch(cli: &Cli, args: &WatchArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let mut rt = open_runtime(&config, DashboardSettings::from_config(&config), &args.source)?;
    // Keep the sender alive: a dropped sender ends the run.
    let (_events, receiver) = crossbeam_channel::unbounded::<RuntimeEvent>();
    let mode = output_mode(cli);
    let mut failure = None;
    rt.run_observed(&receiver, args.ticks, |view, aggregation| {
        if failure.is_some() {
            return;
        }
        report_notifications(view);
        let outcome = match mode {
            OutputMode::Human => {
                print_summary_human(view, aggregation);
                Ok(())
            }
            OutputMode::Json => summary_json(view, aggregation).and_then(|mut payload| {
                payload["command"] = json!("watch");
                write_json_line(&payload)
            }),
        };
        failure = outcome.err();
    });
    failure.map_or(Ok(()), Err)
}

// ──────────────────── cases ────────────────────

fn print_table_human(drill: &DrillDownView, partition: Partition) {
    const MAX_WIDTH: usize = 40;
    let table = match partition {
        Partition::Active => &drill.active,
        Partition::Stopped => &drill.stopped,
    };
    println!("{}", drill.title.bold());
    let widths: Vec<usize> = drill
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            table
                .rows
                .iter()
                .filter_map(|r| r.cells.get(i))
                .map(|cell| cell.value.chars().count())
                .chain(std::iter::once(c.label.chars().count() + 2))
                .max()
                .unwrap_or(0)
                .min(MAX_WIDTH)
        })
        .collect();

    let header: Vec<String> = drill
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| {
            let arrow = match c.sort_icon {
                Some(icon) if icon.ends_with("arrowdown") => " v",
                Some(_) => " ^",
                None => "",
            };
            format!("{:<w$}", format!("{}{arrow}", c.label), w = *w)
        })
        .collect();
    println!("{}", header.join("  ").bold());

    for row in &table.rows {
        let cells: Vec<String> = drill
            .columns
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (column, w))| {
                let value = row.cells.get(i).map_or("", |c| c.value.as_str());
                let value: String = value.chars().take(*w).collect();
                let padded = format!("{value:<w$}", w = *w);
                if row.degraded.is_some() {
                    return padded.dimmed().to_string();
                }
                match MilestoneType::from_sla_field(&column.field_name).and_then(|t| row.sla.severity(t)) {
                    Some(bucket) => bucket_text(bucket, &padded).to_string(),
                    None => padded,
                }
            })
            .collect();
        println!("{}", cells.join("  "));
    }

    let more = if table.more_available { " (more available)" } else { "" };
    println!("{} rows{more}", table.rows.len());
}

fn run_cases(cli: &Cli, args: &CasesArgs) -> Result<(), CliError> {
    if args.pages == 0 {
        return Err(CliError::User("--pages must be at least 1".to_string()));
    }
    let config = load_config(cli)?;
    let mut settings = DashboardSettings::from_config(&config);
    if let Some(spec) = &args.columns {
        settings.column_spec.clone_from(spec);
    }
    let mut rt = open_runtime(&config, settings, &args.source)?;
    let milestone_type = open_filtered(&mut rt, &args.filters)?;

    let sort_field = args
        .sort
        .as_deref()
        .map_or_else(|| milestone_type.sla_field().to_string(), field_key);
    let current = rt
        .model()
        .drill_down
        .as_ref()
        .and_then(|d| d.sort.field.clone());
    if current.as_deref() != Some(sort_field.as_str()) {
        rt.dispatch(DashboardMsg::SortBy(sort_field.clone()));
        let applied = rt
            .model()
            .drill_down
            .as_ref()
            .and_then(|d| d.sort.field.clone());
        if applied.as_deref() != Some(sort_field.as_str()) {
            return Err(CliError::User(format!("cannot sort by {sort_field:?}")));
        }
    }
    if args.desc {
        rt.dispatch(DashboardMsg::SortBy(sort_field));
    }

    let partition = if args.stopped {
        Partition::Stopped
    } else {
        Partition::Active
    };
    for _ in 1..args.pages {
        rt.dispatch(DashboardMsg::ScrolledNearBottom {
            partition,
            remaining_px: 0,
        });
    }

    let view = rt.view();
    report_notifications(&view);
    let drill = view
        .drill_down
        .ok_or_else(|| CliError::Internal("drill-down closed unexpectedly".to_string()))?;
    match output_mode(cli) {
        OutputMode::Human => print_table_human(&drill, partition),
        OutputMode::Json => {
            let table = match partition {
                Partition::Active => &drill.active,
                Partition::Stopped => &drill.stopped,
            };
            let payload = json!({
                "command": "cases",
                "milestone": milestone_type.name(),
                "title": drill.title,
                "partition": if args.stopped { "stopped" } else { "active" },
                "columns": serde_json::to_value(&drill.columns)?,
                "column_fallback": drill.column_fallback,
                "rows": serde_json::to_value(&table.rows)?,
                "more_available": table.more_available,
                "search_placeholder": drill.search_placeholder,
            });
            write_json_line(&payload)?;
        }
    }
    rt.shutdown();
    Ok(())
}

// ──────────────────── export ────────────────────

fn run_export(cli: &Cli, args: &ExportArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let mut settings = DashboardSettings::from_config(&config);
    settings.export_path = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
    let mut rt = open_runtime(&config, settings, &args.source)?;
    open_filtered(&mut rt, &args.filters)?;
    rt.dispatch(DashboardMsg::OpenExportDialog);

    if !args.fields.is_empty() {
        let wanted: Vec<&str> = args.fields.iter().map(|f| f.trim()).collect();
        let offered: Vec<String> = rt
            .model()
            .drill_down
            .as_ref()
            .and_then(|d| d.export.as_ref())
            .map(|e| e.fields.iter().map(|f| f.api_name.clone()).collect())
            .unwrap_or_default();
        if let Some(unknown) = wanted
            .iter()
            .find(|w| !offered.iter().any(|o| same_field(o, w)))
        {
            return Err(CliError::User(format!(
                "unknown export field {unknown:?}; offered: {}",
                offered.join(", ")
            )));
        }
        for api_name in offered {
            let selected = wanted.iter().any(|w| same_field(&api_name, w));
            rt.dispatch(DashboardMsg::ToggleExportField { api_name, selected });
        }
    }

    rt.dispatch(DashboardMsg::ConfirmExport);
    let view = rt.view();
    let Some(path) = rt.exports().last().cloned() else {
        let reason = view
            .notifications
            .last()
            .map_or_else(|| "export produced no file".to_string(), |n| n.message.clone());
        rt.shutdown();
        return Err(CliError::Runtime(format!("export failed: {reason}")));
    };
    rt.shutdown();

    match output_mode(cli) {
        OutputMode::Human => println!("Exported to {}", path.display()),
        OutputMode::Json => write_json_line(&json!({
            "command": "export",
            "path": path.to_string_lossy(),
        }))?,
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();
            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "config path",
                    "path": path.to_string_lossy(),
                    "exists": exists,
                }))?,
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "config show",
                    "config": serde_json::to_value(&config)?,
                }))?,
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match load_config(cli) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "valid": true,
                        "path": config.paths.config_file.to_string_lossy(),
                        "hash": hash,
                    }))?,
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "valid": false,
                        "error": e.to_string(),
                    }))?,
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SLAD_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_before_and_after_subcommand() {
        let before = Cli::try_parse_from([
            "slad",
            "--config",
            "/tmp/slad.toml",
            "--json",
            "--no-color",
            "-v",
            "summary",
            "--source",
            "f.json",
        ]);
        assert!(before.is_ok());

        let after = Cli::try_parse_from(["slad", "summary", "--source", "f.json", "--json", "-v"]);
        assert!(after.is_ok());
    }

    #[test]
    fn parses_subcommands() {
        let cases = [
            vec!["slad", "summary", "--source", "f.json", "--priority-mode"],
            vec!["slad", "cases", "--source", "f.json", "-m", "RT", "--priority", "High,Urgent"],
            vec![
                "slad", "cases", "--source", "f.json", "--milestone", "Fix Resolution", "--sort",
                "Subject", "--desc", "--pages", "3", "--has-jira", "--stopped",
            ],
            vec!["slad", "export", "--source", "f.json", "-m", "RT", "--fields", "CaseNumber,Jira.Key"],
            vec!["slad", "watch", "--source", "f.json", "--ticks", "2"],
            vec!["slad", "config", "path"],
            vec!["slad", "config", "validate"],
        ];
        for case in cases {
            let parsed = Cli::try_parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse case: {case:?}");
        }
    }

    #[test]
    fn cases_requires_source_and_milestone() {
        assert!(Cli::try_parse_from(["slad", "cases", "--source", "f.json"]).is_err());
        assert!(Cli::try_parse_from(["slad", "cases", "-m", "RT"]).is_err());
    }

    #[test]
    fn milestone_names_are_flexible() {
        assert_eq!(parse_milestone("RT").unwrap(), MilestoneType::ResponseTime);
        assert_eq!(parse_milestone("fix resolution").unwrap(), MilestoneType::FixResolution);
        assert_eq!(parse_milestone("UoW_Remaining").unwrap(), MilestoneType::UpdateOrWorkaround);
        let err = parse_milestone("Lunch").unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn priorities_parse_or_fail_as_user_error() {
        let parsed = parse_priorities(&["High".to_string(), " low ".to_string()]).unwrap();
        assert_eq!(parsed, vec![Priority::High, Priority::Low]);
        assert_eq!(parse_priorities(&["Meh".to_string()]).unwrap_err().exit_code(), 1);
    }

    #[test]
    fn dotted_fields_are_flattened() {
        assert_eq!(field_key("Account.Name"), format!("Account{DOT_SEP}Name"));
        assert_eq!(field_key("Subject"), "Subject");
    }

    #[test]
    fn output_mode_resolution() {
        assert_eq!(resolve_output_mode(true, Some("human"), true), OutputMode::Json);
        assert_eq!(resolve_output_mode(false, Some("JSON"), true), OutputMode::Json);
        assert_eq!(resolve_output_mode(false, Some("human"), false), OutputMode::Human);
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
        assert_eq!(resolve_output_mode(false, Some("auto"), true), OutputMode::Human);
    }

    #[test]
    fn config_errors_map_to_user_exit_code() {
        let err: CliError = SlaError::InvalidConfig {
            details: "bad".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 1);
        let err: CliError = SlaError::source("fetch_summary", "down").into();
        assert_eq!(err.exit_code(), 2);
    }
}
