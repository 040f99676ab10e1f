use serde::{Deserialize, Serialize};
use std::fmt;

/// Which level of the hierarchy an item sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemLevel {
    Parent,
    Child,
}

impl ItemLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }
}

impl fmt::Display for ItemLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A story to create under its owning epic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildItemSpec {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    /// Story points. Catalog files spell this `points`.
    #[serde(default, alias = "points")]
    pub weight: u32,
}

impl ChildItemSpec {
    #[must_use]
    pub fn new(summary: impl Into<String>, description: impl Into<String>, weight: u32) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
            weight,
        }
    }
}

/// An epic to create, together with the stories it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentItemSpec {
    #[serde(alias = "name")]
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, alias = "stories")]
    pub children: Vec<ChildItemSpec>,
}

impl ParentItemSpec {
    #[must_use]
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            description: String::new(),
            labels: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a label, keeping the first occurrence when repeated.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: ChildItemSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Sum of the weights of every child, created or not.
    #[must_use]
    pub fn planned_points(&self) -> u64 {
        self.children.iter().map(|child| u64::from(child.weight)).sum()
    }
}

/// Identifier pair the remote tracker assigns on creation.
///
/// Opaque to the engine: it is only handed back to the client when
/// creating children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteId {
    pub key: String,
    pub id: String,
}

impl RemoteId {
    #[must_use]
    pub fn new(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
