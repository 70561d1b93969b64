//! Output variants
//!
//! What a cell's output pane currently shows. The variant is a closed sum
//! type; the orthogonal `fetching` flag lives on [`OutputResource`] so that a
//! page-in of a dataset or chart keeps the stale content visible under a
//! loading overlay.

use indexmap::IndexMap;
use serde_json::Value;
use vizier_resource::{ChartView, DatasetHandle, Module, OutputEntry, Timestamps};

/// Output type tags understood by the client
pub mod kind {
    /// HTML fragment
    pub const HTML: &str = "text/html";
    /// Markdown source
    pub const MARKDOWN: &str = "text/markdown";
    /// Script, rendered like HTML
    pub const JAVASCRIPT: &str = "text/javascript";
    /// Chart view payload
    pub const CHART: &str = "chart/view";
    /// Dataset view payload
    pub const DATASET: &str = "dataset/view";
}

/// Discriminator of [`OutputVariant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputTag {
    /// Chart
    Chart,
    /// Dataset
    Dataset,
    /// Error
    Error,
    /// Hidden
    Hidden,
    /// HTML
    Html,
    /// Markdown
    Markdown,
    /// Plain text
    Text,
    /// Timestamps
    Timestamps,
    /// Multiple
    Multiple,
}

impl std::fmt::Display for OutputTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Chart => "chart",
            Self::Dataset => "dataset",
            Self::Error => "error",
            Self::Hidden => "hidden",
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Timestamps => "timestamps",
            Self::Multiple => "multiple",
        };
        f.pad(name)
    }
}

/// One grouped part of a [`OutputVariant::Multiple`] output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputPart {
    /// Newline-joined text entries of one type
    Text(String),
    /// Dataset view (last one of its type)
    Dataset(DatasetHandle),
    /// Chart view (last one of its type)
    Chart(ChartView),
    /// Any other non-text payload (last one of its type)
    Raw(Value),
}

/// Content of a cell's output pane
#[derive(Debug, Clone, PartialEq)]
pub enum OutputVariant {
    /// Chart with its data series
    Chart {
        /// Chart name
        name: String,
        /// Data series
        dataset: Value,
    },
    /// Dataset page
    Dataset(DatasetHandle),
    /// Failure to produce or fetch the output
    Error {
        /// Short title
        title: String,
        /// Detail message
        message: String,
    },
    /// Output collapsed by the user
    Hidden,
    /// HTML fragment
    Html(String),
    /// Markdown source
    Markdown(String),
    /// Plain text lines
    Text(Vec<OutputEntry>),
    /// Execution timestamps of the module
    Timestamps(Timestamps),
    /// Several entries grouped by type, in first-seen order
    Multiple(IndexMap<String, OutputPart>),
}

impl OutputVariant {
    /// Uniform discriminator
    #[must_use]
    pub fn tag(&self) -> OutputTag {
        match self {
            Self::Chart { .. } => OutputTag::Chart,
            Self::Dataset(_) => OutputTag::Dataset,
            Self::Error { .. } => OutputTag::Error,
            Self::Hidden => OutputTag::Hidden,
            Self::Html(_) => OutputTag::Html,
            Self::Markdown(_) => OutputTag::Markdown,
            Self::Text(_) => OutputTag::Text,
            Self::Timestamps(_) => OutputTag::Timestamps,
            Self::Multiple(_) => OutputTag::Multiple,
        }
    }

    /// Error output
    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Output of a module as produced by its standard output
    #[inline]
    #[must_use]
    pub fn for_module(module: &Module) -> Self {
        derive_output(&module.stdout)
    }
}

fn text_of(entry: &OutputEntry) -> String {
    match &entry.value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Derive the output variant from captured standard-output entries
///
/// - no entry: empty text
/// - one entry: dispatch on its type
/// - several: grouped by type, see [`OutputVariant::Multiple`]
#[must_use]
pub fn derive_output(stdout: &[OutputEntry]) -> OutputVariant {
    match stdout {
        [] => OutputVariant::Text(Vec::new()),
        [entry] => match entry.kind.as_str() {
            kind::HTML | kind::JAVASCRIPT => OutputVariant::Html(text_of(entry)),
            kind::MARKDOWN => OutputVariant::Markdown(text_of(entry)),
            kind::CHART => {
                let view = ChartView::from_wire(&entry.value);
                OutputVariant::Chart {
                    name: view.name,
                    dataset: view.data,
                }
            }
            kind::DATASET => OutputVariant::Dataset(DatasetHandle::from_wire(&entry.value)),
            _ => OutputVariant::Text(vec![entry.clone()]),
        },
        entries => OutputVariant::Multiple(group_entries(entries)),
    }
}

// TODO: several dataset/chart entries of the same type collapse to the last
// one; keep all of them once the expected display is settled.
fn group_entries(entries: &[OutputEntry]) -> IndexMap<String, OutputPart> {
    let mut groups: IndexMap<String, OutputPart> = IndexMap::new();
    for entry in entries {
        let part = match entry.kind.as_str() {
            kind::DATASET => OutputPart::Dataset(DatasetHandle::from_wire(&entry.value)),
            kind::CHART => OutputPart::Chart(ChartView::from_wire(&entry.value)),
            _ if entry.value.is_string() || entry.value.is_null() => {
                let text = text_of(entry);
                match groups.get_mut(&entry.kind) {
                    Some(OutputPart::Text(existing)) => {
                        existing.push('\n');
                        existing.push_str(&text);
                        continue;
                    }
                    _ => OutputPart::Text(text),
                }
            }
            _ => OutputPart::Raw(entry.value.clone()),
        };
        groups.insert(entry.kind.clone(), part);
    }
    groups
}

/// Output variant plus the fetching flag
#[derive(Debug, Clone, PartialEq)]
pub struct OutputResource {
    variant: OutputVariant,
    fetching: bool,
}

impl OutputResource {
    /// Settled output
    #[inline]
    #[must_use]
    pub fn new(variant: OutputVariant) -> Self {
        Self {
            variant,
            fetching: false,
        }
    }

    /// Current variant
    #[inline]
    #[must_use]
    pub fn variant(&self) -> &OutputVariant {
        &self.variant
    }

    /// Discriminator of the current variant
    #[inline]
    #[must_use]
    pub fn tag(&self) -> OutputTag {
        self.variant.tag()
    }

    /// Whether a sub-resource is being paged in
    #[inline]
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    /// Same variant, flagged as fetching
    #[must_use]
    pub fn set_fetching(&self) -> Self {
        Self {
            variant: self.variant.clone(),
            fetching: true,
        }
    }
}

impl From<OutputVariant> for OutputResource {
    fn from(variant: OutputVariant) -> Self {
        Self::new(variant)
    }
}
