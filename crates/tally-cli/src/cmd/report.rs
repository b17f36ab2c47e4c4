//! `tally report` — cohort contribution metrics over a report window.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail, ensure};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use serde::Serialize;

use tally_core::config::MetricsConfig;
use tally_core::error::MetricsError;
use tally_core::metrics::{GlobalMetrics, ReportRequest};
use tally_core::replica::SqliteReplica;
use tally_core::window::ReportWindow;

use crate::output::{CliError, OutputMode, pretty_section, render_error, render_mode};

/// Arguments for `tally report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Project (replica database name) to report on. Repeatable.
    #[arg(long = "project", value_name = "NAME", required = true)]
    pub projects: Vec<String>,

    /// Cohort member to report on. Repeatable; combined with --cohort-file.
    #[arg(long = "user", value_name = "NAME")]
    pub users: Vec<String>,

    /// File with one cohort member per line. Blank lines and `#` comments
    /// are skipped.
    #[arg(long, value_name = "FILE")]
    pub cohort_file: Option<PathBuf>,

    /// Inclusive window start (RFC 3339 or YYYY-MM-DD, UTC).
    #[arg(long, value_name = "WHEN")]
    pub start: String,

    /// Inclusive window end (RFC 3339 or YYYY-MM-DD, UTC).
    #[arg(long, value_name = "WHEN")]
    pub end: String,

    /// Directory holding one `<project>.db` replica per project.
    #[arg(long, value_name = "DIR", default_value = "replicas")]
    pub replica_dir: PathBuf,

    /// Path to the TOML config file.
    #[arg(long, value_name = "FILE", default_value = "tally.toml")]
    pub config: PathBuf,
}

/// Report payload: the window echo plus the six metric tables.
#[derive(Debug, Serialize)]
struct ReportPayload {
    start: String,
    end: String,
    lookback_start: String,
    projects: Vec<String>,
    #[serde(flatten)]
    metrics: GlobalMetrics,
}

/// Execute `tally report`.
pub fn run_report(args: &ReportArgs, output: OutputMode) -> Result<()> {
    let cohort = load_cohort(args)?;
    if cohort.is_empty() {
        render_error(
            output,
            &CliError::with_details(
                "the cohort is empty",
                "pass at least one --user or a non-empty --cohort-file",
                "empty_cohort",
            ),
        )?;
        bail!("empty cohort");
    }

    let config = MetricsConfig::load(&args.config)?;
    let start = parse_instant(&args.start).context("--start")?;
    let end = parse_instant(&args.end).context("--end")?;
    ensure!(start <= end, "--start must not be after --end");

    let window = ReportWindow::new(start, end, config.lookback_days);
    let replica = SqliteReplica::open(&args.replica_dir)?;
    let request = ReportRequest {
        cohort,
        projects: args.projects.clone(),
        window,
        config,
    };

    let metrics = match GlobalMetrics::compute(&replica, &request) {
        Ok(metrics) => metrics,
        Err(err) => {
            if let Some(MetricsError::InvalidIdentity { user, project }) =
                err.downcast_ref::<MetricsError>()
            {
                render_error(
                    output,
                    &CliError::with_details(
                        format!("'{user}' has no account on '{project}'"),
                        "check the cohort for typos; every member must exist on every project",
                        "invalid_identity",
                    ),
                )?;
                bail!("invalid identity in cohort");
            }
            return Err(err);
        }
    };

    let payload = ReportPayload {
        start: window.start_ts(),
        end: window.end_ts(),
        lookback_start: window.lookback_ts(),
        projects: request.projects,
        metrics,
    };

    render_mode(output, &payload, render_report_text, render_report_pretty)
}

fn load_cohort(args: &ReportArgs) -> Result<Vec<String>> {
    let mut cohort = args.users.clone();
    if let Some(path) = &args.cohort_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read cohort file {}", path.display()))?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            cohort.push(line.to_string());
        }
    }
    Ok(cohort)
}

/// Parse an instant as RFC 3339, or as a bare date at midnight UTC.
fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid instant '{raw}': expected RFC 3339 or YYYY-MM-DD"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid instant '{raw}'"))?;
    Ok(midnight.and_utc())
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Tab-separated rows for pipes: one row per `(project, user)`, then one
/// `upload` row per retained file title.
fn render_report_text(payload: &ReportPayload, w: &mut dyn Write) -> std::io::Result<()> {
    for (project, users) in payload.metrics.absolute_bytes.iter() {
        for (user, bytes) in users {
            let edits = payload
                .metrics
                .edit_counts
                .get(project, user)
                .copied()
                .unwrap_or_default();
            let active = payload
                .metrics
                .active_editors
                .get(project, user)
                .copied()
                .unwrap_or_default();
            let newly = payload
                .metrics
                .newly_registered
                .get(project, user)
                .copied()
                .unwrap_or_default();
            let articles = payload
                .metrics
                .edited_articles
                .get(project, user)
                .map(|titles| titles.join(","))
                .unwrap_or_default();
            writeln!(
                w,
                "{project}\t{user}\t{bytes}\t{edits}\t{}\t{}\t{articles}",
                yes_no(active),
                yes_no(newly)
            )?;
        }
    }
    for (user, files) in &payload.metrics.uploaded_media {
        for file in files {
            writeln!(w, "upload\t{user}\t{file}")?;
        }
    }
    Ok(())
}

fn render_report_pretty(payload: &ReportPayload, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!("Contribution report {} .. {}", payload.start, payload.end),
    )?;

    for (project, users) in payload.metrics.absolute_bytes.iter() {
        writeln!(w, "\n{project}")?;
        for (user, bytes) in users {
            let edits = payload
                .metrics
                .edit_counts
                .get(project, user)
                .copied()
                .unwrap_or_default();
            let active = payload
                .metrics
                .active_editors
                .get(project, user)
                .copied()
                .unwrap_or_default();
            let newly = payload
                .metrics
                .newly_registered
                .get(project, user)
                .copied()
                .unwrap_or_default();
            writeln!(
                w,
                "  {user:<20} bytes {bytes:>8}  edits {edits:>5}  active {}  new {}",
                yes_no(active),
                yes_no(newly)
            )?;
            if let Some(titles) = payload.metrics.edited_articles.get(project, user) {
                if !titles.is_empty() {
                    writeln!(w, "    articles: {}", titles.join(", "))?;
                }
            }
        }
    }

    writeln!(w, "\nUploads")?;
    for (user, files) in &payload.metrics.uploaded_media {
        if files.is_empty() {
            writeln!(w, "  {user}: none")?;
        } else {
            writeln!(w, "  {user}: {}", files.join(", "))?;
        }
    }
    Ok(())
}
