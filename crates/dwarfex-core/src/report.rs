//! Diagnostics accumulated over one extraction run.
//!
//! Nothing in here is fatal. Every stage takes `&mut Report` and appends what
//! it noticed; the caller decides how to surface it (the CLI logs it).

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::classify::DataType;

/// A non-fatal condition found while selecting, normalizing or validating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning
{
    /// `ByName` selection found no top-level entry with this name.
    #[error("name not found: {0}")]
    NameNotFound(String),

    /// `ByName` selection found several entries; the first one is exported.
    #[error("found {count} entries named '{name}', exporting the first")]
    AmbiguousName
    {
        name: String,
        count: usize,
    },

    /// A source file is newer than the binary, so comments may not match.
    #[error("source file {} was modified after the binary was built", .0.display())]
    StaleSource(PathBuf),

    /// A source file could not be read; its comments are skipped.
    #[error("cannot read source file {}: {reason}", .path.display())]
    UnreadableSource
    {
        path: PathBuf,
        reason: String,
    },

    /// Several root-level records share a name.
    #[error("{count} descriptions share the name '{name}'")]
    DuplicateName
    {
        name: String,
        count: usize,
    },

    /// A record holds an explicit `null`.
    #[error("entry {} has a null value at {path}", .entry.as_deref().unwrap_or("<unnamed>"))]
    NullProperty
    {
        entry: Option<String>,
        path: String,
    },

    /// A `mapping` names a record that is not exported.
    #[error("mapping '{0}' is referenced but not exported")]
    DanglingMapping(String),
}

/// Counters describing what each stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats
{
    /// Entries picked by the selection filter.
    pub selected: usize,
    /// Root-level dependencies added by the closure.
    pub dependencies_added: usize,
    /// Reachable dependencies kept inline because of their class.
    pub dependencies_excluded_by_class: usize,
    /// References whose target could not be resolved (dangling offset,
    /// unknown tag, or uncompletable declaration).
    pub unresolved_references: usize,
    pub declarations_completed: usize,
    pub declarations_dropped: usize,
    /// Declarations whose completion was already a root.
    pub declarations_already_exported: usize,
    pub unnamed_suppressed: usize,
    pub anonymous_promoted: usize,
    pub redundant_typedefs: usize,
    pub typedefs_bypassed: usize,
    pub duplicate_roots_merged: usize,
    /// Rendered records dropped because an identical record came first.
    pub records_deduplicated: usize,
    pub exported: BTreeMap<DataType, usize>,
}

/// Warnings and statistics of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report
{
    pub warnings: Vec<Warning>,
    pub stats: Stats,
}

impl Report
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning)
    {
        tracing::debug!(%warning, "recorded warning");
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool
    {
        !self.warnings.is_empty()
    }

    /// Emit statistics at `info` and every warning at `warn`.
    pub fn log_summary(&self)
    {
        let stats = &self.stats;
        tracing::info!(selected = stats.selected, "selected entries");
        if stats.dependencies_added > 0 {
            tracing::info!("included {} additional dependencies", stats.dependencies_added);
        }
        if stats.dependencies_excluded_by_class > 0 {
            tracing::info!(
                "{} dependencies are not included because of their class",
                stats.dependencies_excluded_by_class
            );
        }
        if stats.declarations_completed > 0 {
            tracing::info!("replaced {} declarations with their completion", stats.declarations_completed);
        }
        if stats.declarations_dropped > 0 {
            tracing::info!(
                "removed {} non-defining declarations without a replacement",
                stats.declarations_dropped
            );
        }
        if stats.declarations_already_exported > 0 {
            tracing::info!(
                "removed {} declarations where the completion is already exported",
                stats.declarations_already_exported
            );
        }
        if stats.unnamed_suppressed > 0 {
            tracing::info!("removed {} types that have no name", stats.unnamed_suppressed);
        }
        if stats.anonymous_promoted > 0 {
            tracing::info!("named {} anonymous types after their typedef", stats.anonymous_promoted);
        }
        if stats.redundant_typedefs > 0 {
            tracing::info!(
                "removed {} typedefs as the type they refer to will be exported",
                stats.redundant_typedefs
            );
        }
        if stats.typedefs_bypassed > 0 {
            tracing::debug!("bypassed {} typedefs", stats.typedefs_bypassed);
        }
        if stats.duplicate_roots_merged > 0 {
            tracing::debug!("merged {} duplicate roots", stats.duplicate_roots_merged);
        }
        if stats.unresolved_references > 0 {
            tracing::info!("{} references could not be resolved", stats.unresolved_references);
        }
        if stats.records_deduplicated > 0 {
            tracing::info!("removed {} duplicate type descriptions", stats.records_deduplicated);
        }

        let total: usize = stats.exported.values().sum();
        tracing::info!("exported {total} types");
        for (data_type, count) in &stats.exported {
            tracing::info!("{count:>6} {data_type}");
        }

        for warning in &self.warnings {
            tracing::warn!("{warning}");
        }
    }
}
