use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use anyhow::Result;
use clap::Args;
use hoist_core::Catalog;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Catalog file (.toml or .json) to check.
    #[arg(long, value_name = "FILE")]
    pub catalog: PathBuf,
}

#[derive(Debug, Serialize)]
struct CatalogStats {
    valid: bool,
    path: String,
    epics: usize,
    stories: usize,
    planned_points: u64,
    empty_epics: Vec<String>,
}

impl CatalogStats {
    fn new(path: String, catalog: &Catalog) -> Self {
        Self {
            valid: true,
            path,
            epics: catalog.parent_count(),
            stories: catalog.child_count(),
            planned_points: catalog.planned_points(),
            empty_epics: catalog
                .items()
                .iter()
                .filter(|epic| epic.children.is_empty())
                .map(|epic| epic.title.clone())
                .collect(),
        }
    }
}

/// Parse and check a catalog. Never reads credentials or touches the network.
pub fn run_validate(args: &ValidateArgs, output: OutputMode) -> Result<()> {
    let catalog = super::load_catalog(&args.catalog)?;
    let stats = CatalogStats::new(args.catalog.display().to_string(), &catalog);
    render_mode(output, &stats, render_text, render_pretty)
}

fn render_pretty(stats: &CatalogStats, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "CATALOG OK")?;
    pretty_kv(w, "File", &stats.path)?;
    pretty_kv(w, "Epics", stats.epics.to_string())?;
    pretty_kv(w, "Stories", stats.stories.to_string())?;
    pretty_kv(w, "Points", stats.planned_points.to_string())?;
    if !stats.empty_epics.is_empty() {
        pretty_kv(w, "No stories", stats.empty_epics.join(", "))?;
    }
    Ok(())
}

fn render_text(stats: &CatalogStats, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "ok epics={} stories={} points={}",
        stats.epics, stats.stories, stats.planned_points
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_core::{ChildItemSpec, ParentItemSpec};

    #[test]
    fn stats_count_items_and_points() {
        let catalog = Catalog::new(vec![
            ParentItemSpec::new("Foundation", "Foundation")
                .with_child(ChildItemSpec::new("Init", "", 3))
                .with_child(ChildItemSpec::new("Build", "", 5)),
            ParentItemSpec::new("Later", "Later"),
        ])
        .expect("valid");

        let stats = CatalogStats::new("catalog.toml".to_string(), &catalog);
        assert_eq!(stats.epics, 2);
        assert_eq!(stats.stories, 2);
        assert_eq!(stats.planned_points, 8);
        assert_eq!(stats.empty_epics, vec!["Later".to_string()]);

        let mut buf = Vec::new();
        render_text(&stats, &mut buf).expect("render");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "ok epics=2 stories=2 points=8\n"
        );
    }
}
