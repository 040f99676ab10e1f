use super::InputError;
use crate::credentials::Credentials;
use crate::jira::JiraClient;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use anyhow::Result;
use clap::Args;
use hoist_core::config::{ConfigOverrides, ImportTarget, ProjectConfig, load_project_config};
use hoist_core::error::ErrorCode;
use hoist_core::{
    Catalog, ImportEvent, ImportOutcome, ImportReport, ItemLevel, OutcomeResult, ProgressObserver,
    run_import_with_progress,
};
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Longest summary shown on a progress line.
const SUMMARY_WIDTH: usize = 50;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Catalog file (.toml or .json) listing the epics and their stories.
    #[arg(long, value_name = "FILE")]
    pub catalog: PathBuf,

    /// Project config file. Defaults to ./hoist.toml when present.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Jira project key, e.g. CP.
    #[arg(long, value_name = "KEY")]
    pub project: Option<String>,

    /// Issue type id used for epics.
    #[arg(long, value_name = "ID")]
    pub epic_type: Option<String>,

    /// Issue type id used for stories.
    #[arg(long, value_name = "ID")]
    pub story_type: Option<String>,

    /// Custom field that stores story points, e.g. customfield_10016.
    #[arg(long, value_name = "FIELD")]
    pub points_field: Option<String>,

    /// Jira site root, e.g. https://example.atlassian.net.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Show what would be created without contacting Jira.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the delays between requests.
    #[arg(long)]
    pub no_pacing: bool,

    /// Retry rate-limited requests (HTTP 429/503) up to N times.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

impl ImportArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            project_key: self.project.clone(),
            epic_type_id: self.epic_type.clone(),
            story_type_id: self.story_type.clone(),
            points_field: self.points_field.clone(),
            max_retries: self.retries,
            no_pacing: self.no_pacing,
        }
    }
}

/// Final JSON document for a completed run.
#[derive(Debug, Serialize)]
struct ImportSummary<'a> {
    project: &'a str,
    board_url: String,
    #[serde(flatten)]
    report: &'a ImportReport,
}

#[derive(Debug, Serialize)]
struct PlannedEpic {
    title: String,
    summary: String,
    labels: Vec<String>,
    stories: usize,
    points: u64,
}

#[derive(Debug, Serialize)]
struct ImportPlan {
    dry_run: bool,
    project: String,
    base_url: String,
    board_url: String,
    epics: usize,
    stories: usize,
    planned_points: u64,
    items: Vec<PlannedEpic>,
}

impl ImportPlan {
    fn new(catalog: &Catalog, target: &ImportTarget) -> Self {
        Self {
            dry_run: true,
            project: target.project_key.clone(),
            base_url: target.base_url.clone(),
            board_url: target.board_url(),
            epics: catalog.parent_count(),
            stories: catalog.child_count(),
            planned_points: catalog.planned_points(),
            items: catalog
                .items()
                .iter()
                .map(|epic| PlannedEpic {
                    title: epic.title.clone(),
                    summary: epic.summary.clone(),
                    labels: epic.labels.clone(),
                    stories: epic.children.len(),
                    points: epic.planned_points(),
                })
                .collect(),
        }
    }
}

/// Load `hoist.toml` (or `--config`), layer the flags on top, and resolve.
fn load_target(args: &ImportArgs, project_root: &Path) -> Result<(ProjectConfig, ImportTarget)> {
    let mut config = load_project_config(args.config.as_deref(), project_root)
        .map_err(|err| InputError::new(ErrorCode::ConfigParseError, err))?;
    config.apply_overrides(args.overrides());
    let target = config.resolve()?;
    Ok((config, target))
}

pub fn run_import(args: &ImportArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let catalog = super::load_catalog(&args.catalog)?;

    if args.dry_run {
        let (_, target) = load_target(args, project_root)?;
        let plan = ImportPlan::new(&catalog, &target);
        return render_mode(output, &plan, render_plan_text, render_plan_pretty);
    }

    // Missing credentials are reported ahead of missing project settings.
    let credentials = Credentials::from_env()?;
    let (config, target) = load_target(args, project_root)?;
    info!(
        project = %target.project_key,
        base_url = %target.base_url,
        user = credentials.email(),
        "starting import"
    );

    let mut client = JiraClient::new(target.clone(), &credentials);
    let pacing = config.pacing.to_policy();

    let report = if output.is_json() {
        hoist_core::run_import(&catalog, &mut client, pacing)
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_header(&mut out, output, &catalog, &target)?;
        let mut printer = ProgressPrinter::new(out);
        run_import_with_progress(&catalog, &mut client, pacing, &mut printer)
    };
    debug!(requests = client.request_count(), "import requests sent");

    let summary = ImportSummary {
        project: &target.project_key,
        board_url: target.board_url(),
        report: &report,
    };
    render_mode(output, &summary, render_summary_text, render_summary_pretty)
}

fn write_header(
    w: &mut dyn Write,
    output: OutputMode,
    catalog: &Catalog,
    target: &ImportTarget,
) -> io::Result<()> {
    if output == OutputMode::Pretty {
        pretty_section(w, "IMPORT")?;
        pretty_kv(w, "Project", &target.project_key)?;
        pretty_kv(w, "Site", &target.base_url)?;
        pretty_kv(w, "Epics", catalog.parent_count().to_string())?;
        pretty_kv(w, "Stories", catalog.child_count().to_string())?;
        pretty_kv(w, "Points", catalog.planned_points().to_string())?;
        pretty_rule(w)
    } else {
        writeln!(
            w,
            "import project={} epics={} stories={} points={}",
            target.project_key,
            catalog.parent_count(),
            catalog.child_count(),
            catalog.planned_points()
        )
    }
}

/// Prints one line per event as the run progresses.
struct ProgressPrinter<W> {
    out: W,
}

impl<W: Write> ProgressPrinter<W> {
    const fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(err) = self.out.write_fmt(args).and_then(|()| self.out.write_all(b"\n")) {
            debug!(error = %err, "progress line not written");
        }
    }
}

impl<W: Write> ProgressObserver for ProgressPrinter<W> {
    fn on_event(&mut self, event: &ImportEvent<'_>) {
        match event {
            ImportEvent::ParentStarted { index, total, spec } => {
                self.line(format_args!(
                    "\n[{}/{total}] Creating epic: {}",
                    index + 1,
                    spec.summary
                ));
            }
            ImportEvent::ParentFinished { outcome } => match outcome.remote() {
                Some(remote) => {
                    self.line(format_args!("  [OK] {remote} - {}", clip(&outcome.summary)));
                }
                None => self.line(format_args!("  [FAIL] {}", tagged_reason(outcome))),
            },
            ImportEvent::ChildFinished { total, outcome } => {
                let position = outcome.child_index.map_or(0, |i| i + 1);
                match outcome.remote() {
                    Some(remote) => self.line(format_args!(
                        "    [{position}/{total}] [OK] {remote} ({}pts) - {}",
                        outcome.weight,
                        clip(&outcome.summary)
                    )),
                    None => self.line(format_args!(
                        "    [{position}/{total}] [FAIL] {} - {}",
                        clip(&outcome.summary),
                        tagged_reason(outcome)
                    )),
                }
            }
            ImportEvent::ChildSkipped { outcome } => {
                if let (OutcomeResult::Skipped { cause }, Some(code)) =
                    (&outcome.result, outcome.result.code())
                {
                    self.line(format_args!(
                        "    [SKIP] {} ({cause}) [{code}]",
                        clip(&outcome.summary)
                    ));
                }
            }
        }
    }
}

fn clip(summary: &str) -> String {
    if summary.chars().count() <= SUMMARY_WIDTH {
        return summary.to_string();
    }
    let mut clipped: String = summary.chars().take(SUMMARY_WIDTH).collect();
    clipped.push_str("...");
    clipped
}

const fn level_name(level: ItemLevel) -> &'static str {
    match level {
        ItemLevel::Parent => "epic",
        ItemLevel::Child => "story",
    }
}

fn follow_up_reason(outcome: &ImportOutcome) -> Option<String> {
    match &outcome.result {
        OutcomeResult::Created { .. } => None,
        OutcomeResult::Failed { reason, .. } => Some(reason.clone()),
        OutcomeResult::Skipped { cause } => Some(cause.to_string()),
    }
}

/// Failure reason followed by its error code, e.g. `HTTP 400 [E3001]`.
fn tagged_reason(outcome: &ImportOutcome) -> String {
    match (follow_up_reason(outcome), outcome.result.code()) {
        (Some(reason), Some(code)) => format!("{reason} [{code}]"),
        (reason, _) => reason.unwrap_or_default(),
    }
}

fn render_summary_pretty(summary: &ImportSummary<'_>, w: &mut dyn Write) -> io::Result<()> {
    let report = summary.report;
    writeln!(w)?;
    pretty_section(w, "IMPORT COMPLETE")?;
    pretty_kv(
        w,
        "Epics",
        format!(
            "{}/{} created, {} failed",
            report.parents.created, report.parents.total, report.parents.failed
        ),
    )?;
    pretty_kv(
        w,
        "Stories",
        format!(
            "{}/{} created, {} failed, {} skipped",
            report.children.created,
            report.children.total,
            report.children.failed,
            report.children.skipped
        ),
    )?;
    pretty_kv(w, "Points", report.points_created.to_string())?;
    pretty_kv(w, "Board", &summary.board_url)?;

    let follow_up: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| Some((o, o.result.code()?, follow_up_reason(o)?)))
        .collect();
    if follow_up.is_empty() {
        return Ok(());
    }

    writeln!(w)?;
    writeln!(w, "Needs follow-up ({}):", follow_up.len())?;
    let mut codes: Vec<ErrorCode> = Vec::new();
    for (outcome, code, reason) in &follow_up {
        let marker = if outcome.result.is_skipped() { "SKIP" } else { "FAIL" };
        writeln!(
            w,
            "  [{marker}] {code} {:<5} {} ({reason})",
            level_name(outcome.level),
            clip(&outcome.summary)
        )?;
        if !codes.contains(code) {
            codes.push(*code);
        }
    }

    writeln!(w)?;
    for code in codes {
        writeln!(w, "  {code}  {}", code.message())?;
        if let Some(hint) = code.hint() {
            writeln!(w, "         {hint}")?;
        }
    }
    Ok(())
}

fn render_summary_text(summary: &ImportSummary<'_>, w: &mut dyn Write) -> io::Result<()> {
    let report = summary.report;
    writeln!(
        w,
        "epics total={} created={} failed={}",
        report.parents.total, report.parents.created, report.parents.failed
    )?;
    writeln!(
        w,
        "stories total={} created={} failed={} skipped={}",
        report.children.total,
        report.children.created,
        report.children.failed,
        report.children.skipped
    )?;
    writeln!(w, "points {}", report.points_created)?;
    writeln!(w, "board {}", summary.board_url)?;
    for outcome in &report.outcomes {
        if let (Some(code), Some(reason)) = (outcome.result.code(), follow_up_reason(outcome)) {
            let marker = if outcome.result.is_skipped() { "skip" } else { "fail" };
            writeln!(
                w,
                "{marker} {code} {} \"{}\" {reason}",
                level_name(outcome.level),
                outcome.summary
            )?;
        }
    }
    Ok(())
}

fn render_plan_pretty(plan: &ImportPlan, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "DRY RUN")?;
    pretty_kv(w, "Project", &plan.project)?;
    pretty_kv(w, "Site", &plan.base_url)?;
    pretty_kv(w, "Epics", plan.epics.to_string())?;
    pretty_kv(w, "Stories", plan.stories.to_string())?;
    pretty_kv(w, "Points", plan.planned_points.to_string())?;
    pretty_rule(w)?;
    for (index, epic) in plan.items.iter().enumerate() {
        writeln!(
            w,
            "{:>3}. {} ({} stories, {} pts)",
            index + 1,
            epic.summary,
            epic.stories,
            epic.points
        )?;
    }
    writeln!(w)?;
    writeln!(w, "Nothing was sent. Re-run without --dry-run to import.")
}

fn render_plan_text(plan: &ImportPlan, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "dry-run project={} epics={} stories={} points={}",
        plan.project, plan.epics, plan.stories, plan.planned_points
    )?;
    for epic in &plan.items {
        writeln!(
            w,
            "epic \"{}\" stories={} points={}",
            epic.summary, epic.stories, epic.points
        )?;
    }
    Ok(())
}
