// Entry point and interactive console flow.
//
// The binary stands in for the dashboard page:
// - Option [1] fetches the sheet export and normalizes it.
// - Options [2]-[5] edit the session's filters.
// - Option [6] renders KPI cards, indicator rates, breakdowns and records.
// - Option [7] exports the filtered records as CSV.
// Data older than the configured refresh interval is fetched again before
// rendering or exporting; the chosen filters survive every refresh.
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, ValueEnum};
use monitoring_report::config::DashboardConfig;
use monitoring_report::filter::{filter_options, ComplianceFilter, FilterSpec};
use monitoring_report::loader::{self, LoadReport};
use monitoring_report::source::{CsvSource, DataSource};
use monitoring_report::types::Dataset;
use monitoring_report::{output, reports, util};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    College,
    Actions,
}

#[derive(Debug, Parser)]
#[command(name = "monitoring_report", about = "Survey compliance dashboard in the terminal")]
struct Cli {
    /// Response sheet exported as CSV
    #[arg(long, default_value = "responses.csv")]
    data: PathBuf,
    /// Dashboard config (TOML); overrides --preset
    #[arg(long)]
    config: Option<PathBuf>,
    /// Built-in dashboard layout
    #[arg(long, value_enum, default_value_t = Preset::Actions)]
    preset: Preset,
    /// Where option [7] writes the filtered CSV (defaults to the config's export_file)
    #[arg(long)]
    export: Option<PathBuf>,
    /// Also write the rendered view as JSON
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Detail rows shown in the console preview
    #[arg(long, default_value_t = 20)]
    rows: usize,
    /// Render once, export, and exit without the menu
    #[arg(long)]
    once: bool,
}

struct Session {
    config: DashboardConfig,
    source: CsvSource,
    data: Option<Dataset>,
    loaded_at: Option<DateTime<Local>>,
    filters: FilterSpec,
    export_path: PathBuf,
    summary_path: Option<PathBuf>,
    preview_rows: usize,
}

impl Session {
    fn is_stale(&self, now: DateTime<Local>) -> bool {
        refresh_due(self.loaded_at, now, self.config.refresh_secs)
    }
}

/// Whether data loaded at `loaded_at` must be fetched again at `now`.
///
/// A zero interval disables auto-refresh; intervals beyond `i64::MAX`
/// seconds never come due.
fn refresh_due(loaded_at: Option<DateTime<Local>>, now: DateTime<Local>, refresh_secs: u64) -> bool {
    match loaded_at {
        None => true,
        Some(_) if refresh_secs == 0 => false,
        Some(at) => {
            let interval = i64::try_from(refresh_secs).unwrap_or(i64::MAX);
            (now - at).num_seconds() >= interval
        }
    }
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn print_load_report(report: &LoadReport, rows: usize) {
    println!(
        "Processing dataset... ({} rows loaded, {} columns)",
        util::format_int(report.total_rows),
        util::format_int(rows)
    );
    if report.merged_groups > 0 {
        println!(
            "Note: merged {} duplicated column group(s).",
            util::format_int(report.merged_groups)
        );
    }
    if !report.added_columns.is_empty() {
        println!("Note: columns not in the sheet: {}", report.added_columns.join(", "));
    }
    if report.unparsed_numbers > 0 {
        println!(
            "Note: {} non-numeric cells treated as blank.",
            util::format_int(report.unparsed_numbers)
        );
    }
    println!();
}

/// Handle option [1]: fetch and normalize the sheet.
///
/// A failed fetch or an empty sheet drops the previous data so nothing
/// stale gets rendered.
fn handle_load(session: &mut Session) {
    let result = session
        .source
        .fetch()
        .and_then(|raw| loader::normalize(&raw, &session.config));
    match result {
        Ok((data, report)) => {
            print_load_report(&report, data.columns.len());
            info!(rows = data.len(), source = %session.source.describe(), "data loaded");
            session.data = Some(data);
            session.loaded_at = Some(Local::now());
        }
        Err(e) => {
            error!(error = %e, "load failed");
            eprintln!("Failed to load data: {}\n", e);
            session.data = None;
            session.loaded_at = None;
        }
    }
}

fn ensure_fresh(session: &mut Session) -> bool {
    if session.is_stale(Local::now()) {
        handle_load(session);
    }
    if session.data.is_none() {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
        return false;
    }
    true
}

/// Handle option [2]: pick accepted values for one filter column.
fn handle_select(session: &mut Session) {
    let Some(data) = session.data.as_ref() else {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
        return;
    };
    if session.config.filter_columns.is_empty() {
        println!("This dashboard has no filter columns.\n");
        return;
    }
    for (i, col) in session.config.filter_columns.iter().enumerate() {
        println!("[{}] {}", i + 1, col);
    }
    let Some(column) = read_line("Filter column: ")
        .parse::<usize>()
        .ok()
        .and_then(|n| session.config.filter_columns.get(n.wrapping_sub(1)))
        .cloned()
    else {
        println!("Invalid choice.\n");
        return;
    };

    let custom = session
        .config
        .custom_filter_options
        .get(&column)
        .map(Vec::as_slice);
    let options = filter_options(data, &column, custom);
    for (i, opt) in options.iter().enumerate() {
        println!("[{}] {}", i + 1, opt);
    }
    let picked: Vec<String> = read_line("Values (comma separated numbers): ")
        .split(',')
        .filter_map(|s| s.trim().parse::<usize>().ok())
        .filter_map(|n| options.get(n.wrapping_sub(1)).cloned())
        .collect();
    if picked.is_empty() {
        println!("No valid values chosen; filter unchanged.\n");
        return;
    }
    session.filters.select(&column, picked);
    println!();
}

/// Handle option [3]: free text search across all columns.
///
/// The text is kept as typed, surrounding spaces included.
fn handle_search(session: &mut Session) {
    print!("Search text (empty to clear): ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    let needle = buf.trim_end_matches(['\r', '\n']).to_string();
    session.filters.search = if needle.is_empty() { None } else { Some(needle) };
    println!();
}

/// Handle option [4]: compliance range around the configured threshold.
fn handle_compliance(session: &mut Session) {
    let t = session.config.compliance_threshold;
    println!("[1] All");
    println!("[2] <= {}%", t);
    println!("[3] > {}%", t);
    session.filters.compliance = match read_line("Enter choice: ").as_str() {
        "2" => Some(ComplianceFilter::AtMost(t)),
        "3" => Some(ComplianceFilter::Above(t)),
        _ => None,
    };
    println!();
}

fn print_filters(filters: &FilterSpec) {
    if filters.is_unrestricted() {
        println!("Filters: none");
        return;
    }
    for (col, values) in &filters.categorical {
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        println!("Filter {}: {}", col, values.join(", "));
    }
    if let Some(s) = &filters.search {
        println!("Search: {}", s);
    }
    if let Some(c) = &filters.compliance {
        println!("Compliance: {}", c);
    }
}

/// Handle option [6]: render the dashboard for the current filters.
fn handle_show(session: &mut Session) {
    if !ensure_fresh(session) {
        return;
    }
    let Some(data) = session.data.as_ref() else {
        return;
    };
    match reports::build_view(data, &session.filters, &session.config) {
        Ok(view) => {
            if let Some(at) = session.loaded_at {
                println!("Last refreshed {}", at.format("%Y-%m-%d %H:%M:%S"));
            }
            print_filters(&session.filters);
            println!();
            output::print_view(&view, session.preview_rows);
            if let Some(path) = &session.summary_path {
                if let Err(e) = output::write_json(path, &view) {
                    warn!(error = %e, path = %path.display(), "summary not written");
                }
            }
        }
        Err(e) => eprintln!("Failed to build dashboard: {}\n", e),
    }
}

/// Handle option [7]: write the filtered, display-trimmed records.
fn handle_export(session: &mut Session) {
    if !ensure_fresh(session) {
        return;
    }
    let Some(data) = session.data.as_ref() else {
        return;
    };
    let result = reports::build_view(data, &session.filters, &session.config)
        .and_then(|view| output::write_csv(&session.export_path, &view.table).map(|_| view));
    match result {
        Ok(view) => println!(
            "Exported {} rows to {}\n",
            util::format_int(view.table.rows.len()),
            session.export_path.display()
        ),
        Err(e) => eprintln!("Export failed: {}\n", e),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("loading dashboard config {}", path.display()))?,
        None => match cli.preset {
            Preset::College => DashboardConfig::college_facility(),
            Preset::Actions => DashboardConfig::action_report(),
        },
    };
    let export_path = cli
        .export
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.export_file));

    let mut session = Session {
        config,
        source: CsvSource::new(&cli.data),
        data: None,
        loaded_at: None,
        filters: FilterSpec::default(),
        export_path,
        summary_path: cli.summary.clone(),
        preview_rows: cli.rows,
    };

    if cli.once {
        handle_load(&mut session);
        let data = session
            .data
            .as_ref()
            .context("no data available from the source")?;
        let view = reports::build_view(data, &session.filters, &session.config)?;
        output::print_view(&view, session.preview_rows);
        output::write_csv(&session.export_path, &view.table)?;
        if let Some(path) = &session.summary_path {
            output::write_json(path, &view)?;
        }
        return Ok(());
    }

    loop {
        println!("{}", session.config.title);
        println!("[1] Load / refresh data");
        println!("[2] Set a filter");
        println!("[3] Search");
        println!("[4] Compliance filter");
        println!("[5] Clear filters");
        println!("[6] Show dashboard");
        println!("[7] Export filtered CSV");
        println!("[0] Exit\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_load(&mut session),
            "2" => handle_select(&mut session),
            "3" => handle_search(&mut session),
            "4" => handle_compliance(&mut session),
            "5" => {
                session.filters.clear();
                println!("Filters cleared.\n");
            }
            "6" => handle_show(&mut session),
            "7" => handle_export(&mut session),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-7.\n"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn unloaded_data_is_always_due() {
        assert!(refresh_due(None, Local::now(), 300));
    }

    #[test]
    fn refresh_comes_due_after_interval() {
        let now = Local::now();
        assert!(!refresh_due(Some(now - Duration::seconds(299)), now, 300));
        assert!(refresh_due(Some(now - Duration::seconds(300)), now, 300));
        assert!(!refresh_due(Some(now - Duration::days(365)), now, 0));
    }

    #[test]
    fn huge_interval_never_comes_due() {
        let now = Local::now();
        assert!(!refresh_due(Some(now - Duration::seconds(10)), now, u64::MAX));
        assert!(!refresh_due(Some(now), now, i64::MAX as u64 + 1));
    }
}
