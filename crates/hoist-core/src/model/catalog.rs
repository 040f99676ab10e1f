//! The static epic/story hierarchy to import.
//!
//! A [`Catalog`] is validated once at construction and never mutated
//! afterwards, so a malformed entry is reported before the first remote
//! call instead of surfacing as a remote-side error halfway through a run.

use crate::error::ErrorCode;
use crate::model::item::ParentItemSpec;
use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::path::Path;

/// Validation failures detected while building a [`Catalog`].
///
/// Positions are 1-based to match how operators count entries in a file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("epic #{position} has an empty title")]
    EmptyTitle { position: usize },

    #[error("epic #{position} ({title}) has an empty summary")]
    EmptySummary { position: usize, title: String },

    #[error("story #{child} of epic #{parent} ({title}) has an empty summary")]
    EmptyChildSummary {
        parent: usize,
        child: usize,
        title: String,
    },
}

impl CatalogError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::CatalogInvalid
    }
}

/// Ordered, validated sequence of parent items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<ParentItemSpec>,
}

impl Catalog {
    /// Validate `items` and build a catalog.
    ///
    /// Labels are trimmed, blanks dropped, and repeats collapsed so each
    /// parent carries a label set in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found, in catalog order.
    pub fn new(items: Vec<ParentItemSpec>) -> Result<Self, CatalogError> {
        let mut validated = Vec::with_capacity(items.len());

        for (index, mut parent) in items.into_iter().enumerate() {
            let position = index + 1;
            if parent.title.trim().is_empty() {
                return Err(CatalogError::EmptyTitle { position });
            }
            if parent.summary.trim().is_empty() {
                return Err(CatalogError::EmptySummary {
                    position,
                    title: parent.title,
                });
            }
            if let Some(child) = parent
                .children
                .iter()
                .position(|child| child.summary.trim().is_empty())
            {
                return Err(CatalogError::EmptyChildSummary {
                    parent: position,
                    child: child + 1,
                    title: parent.title,
                });
            }

            parent.labels = normalize_labels(parent.labels);
            validated.push(parent);
        }

        Ok(Self { items: validated })
    }

    /// Parents in import order.
    #[must_use]
    pub fn items(&self) -> &[ParentItemSpec] {
        &self.items
    }

    #[must_use]
    pub fn parent_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.items.iter().map(|parent| parent.children.len()).sum()
    }

    /// Points the catalog would add if every child were created.
    #[must_use]
    pub fn planned_points(&self) -> u64 {
        self.items.iter().map(ParentItemSpec::planned_points).sum()
    }
}

fn normalize_labels(labels: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let trimmed = label.trim();
        if trimmed.is_empty() || normalized.iter().any(|seen| seen == trimmed) {
            continue;
        }
        normalized.push(trimmed.to_string());
    }
    normalized
}

/// On-disk catalog layout shared by the TOML and JSON formats.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    epics: Vec<ParentItemSpec>,
}

/// Parse and validate a catalog from TOML text.
///
/// # Errors
///
/// Fails on malformed TOML or an invalid catalog entry.
pub fn parse_toml_catalog(content: &str) -> Result<Catalog> {
    let file: CatalogFile = toml::from_str(content).context("invalid TOML catalog")?;
    Ok(Catalog::new(file.epics)?)
}

/// Parse and validate a catalog from JSON text.
///
/// # Errors
///
/// Fails on malformed JSON or an invalid catalog entry.
pub fn parse_json_catalog(content: &str) -> Result<Catalog> {
    let file: CatalogFile = serde_json::from_str(content).context("invalid JSON catalog")?;
    Ok(Catalog::new(file.epics)?)
}

/// Load a catalog file, picking the format from its extension.
///
/// # Errors
///
/// Fails when the file cannot be read, has an unsupported extension, or
/// does not describe a valid catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let parse: fn(&str) -> Result<Catalog> = match extension.as_deref() {
        Some("toml") => parse_toml_catalog,
        Some("json") => parse_json_catalog,
        _ => anyhow::bail!(
            "unsupported catalog format for {}: expected a .toml or .json file",
            path.display()
        ),
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let catalog =
        parse(&content).with_context(|| format!("Failed to load catalog {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        epics = catalog.parent_count(),
        stories = catalog.child_count(),
        "catalog loaded"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::ChildItemSpec;

    fn epic(title: &str) -> ParentItemSpec {
        ParentItemSpec::new(title, format!("[Dashboard] {title}"))
    }

    #[test]
    fn rejects_empty_title() {
        let err = Catalog::new(vec![epic("Foundation"), epic("  ")]).expect_err("must fail");
        assert_eq!(err, CatalogError::EmptyTitle { position: 2 });
    }

    #[test]
    fn rejects_empty_summary() {
        let err = Catalog::new(vec![ParentItemSpec::new("Auth", "")]).expect_err("must fail");
        assert!(matches!(err, CatalogError::EmptySummary { position: 1, .. }));
    }

    #[test]
    fn rejects_empty_child_summary() {
        let parent = epic("Auth")
            .with_child(ChildItemSpec::new("Login", "", 3))
            .with_child(ChildItemSpec::new("", "", 1));
        let err = Catalog::new(vec![parent]).expect_err("must fail");
        assert_eq!(
            err,
            CatalogError::EmptyChildSummary {
                parent: 1,
                child: 2,
                title: "Auth".to_string(),
            }
        );
        assert_eq!(err.code(), ErrorCode::CatalogInvalid);
    }

    #[test]
    fn counts_and_planned_points() {
        let catalog = Catalog::new(vec![
            epic("Foundation")
                .with_child(ChildItemSpec::new("Init", "", 3))
                .with_child(ChildItemSpec::new("Vite", "", 2)),
            epic("Docs").with_child(ChildItemSpec::new("Readme", "", 1)),
            epic("Empty"),
        ])
        .expect("valid");

        assert_eq!(catalog.parent_count(), 3);
        assert_eq!(catalog.child_count(), 3);
        assert_eq!(catalog.planned_points(), 6);
        assert_eq!(catalog.items()[1].title, "Docs");
    }

    #[test]
    fn labels_are_normalized() {
        let mut parent = epic("Auth");
        parent.labels = vec![
            " dashboard ".to_string(),
            String::new(),
            "auth".to_string(),
            "dashboard".to_string(),
        ];
        let catalog = Catalog::new(vec![parent]).expect("valid");
        assert_eq!(catalog.items()[0].labels, vec!["dashboard", "auth"]);
    }

    #[test]
    fn parses_toml_catalog() {
        let catalog = parse_toml_catalog(
            r#"
[[epics]]
name = "Foundation"
summary = "[Dashboard] Foundation"
labels = ["dashboard", "p0"]

  [[epics.stories]]
  summary = "Initialize package"
  description = "Create package.json"
  points = 3

  [[epics.stories]]
  summary = "Configure Vite"
"#,
        )
        .expect("valid TOML");

        assert_eq!(catalog.parent_count(), 1);
        let parent = &catalog.items()[0];
        assert_eq!(parent.title, "Foundation");
        assert_eq!(parent.description, "");
        assert_eq!(parent.children[0].weight, 3);
        assert_eq!(parent.children[1].weight, 0);
    }

    #[test]
    fn parses_json_catalog() {
        let catalog = parse_json_catalog(
            r#"{"epics":[{"title":"Auth","summary":"[P0] Auth","children":[{"summary":"Login","weight":5}]}]}"#,
        )
        .expect("valid JSON");
        assert_eq!(catalog.planned_points(), 5);
    }

    #[test]
    fn invalid_entry_in_file_surfaces_catalog_error() {
        let err = parse_json_catalog(r#"{"epics":[{"title":"","summary":"x"}]}"#)
            .expect_err("must fail");
        assert!(err.downcast_ref::<CatalogError>().is_some());
    }

    #[test]
    fn load_catalog_rejects_unknown_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plan.yaml");
        std::fs::write(&path, "epics: []").expect("write");
        let err = load_catalog(&path).expect_err("must fail");
        assert!(err.to_string().contains("unsupported catalog format"));
    }

    #[test]
    fn load_catalog_reads_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plan.toml");
        std::fs::write(
            &path,
            "[[epics]]\ntitle = \"Ops\"\nsummary = \"Ops\"\n[[epics.stories]]\nsummary = \"Deploy\"\npoints = 2\n",
        )
        .expect("write");
        let catalog = load_catalog(&path).expect("load");
        assert_eq!(catalog.child_count(), 1);
    }
}
