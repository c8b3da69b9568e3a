//! # Export Pipeline
//!
//! Runs every stage over a decoded [`DebugInfo`]:
//!
//! ```text
//! index -> select -> closure -> normalize -> comments -> emit -> validate
//! ```
//!
//! The pipeline does not fail. Whatever it cannot honour ends up as a
//! [`Warning`](crate::report::Warning) in the returned [`Report`].
//!
//! ## Example
//!
//! ```rust
//! use dwarfex_core::comments::LocalSources;
//! use dwarfex_core::entry::{CompileUnit, DebugEntry, DebugInfo};
//! use dwarfex_core::export::{ExportOptions, Exporter};
//! use gimli::constants;
//!
//! let info = DebugInfo::from_units(vec![CompileUnit::new(vec![
//!     DebugEntry::new(0x10, constants::DW_TAG_base_type)
//!         .with_name("int")
//!         .with_byte_size(4)
//!         .with_encoding(constants::DW_ATE_signed),
//! ])]);
//! let export = Exporter::new(&info, ExportOptions::default()).run(&LocalSources);
//! assert_eq!(export.records.len(), 1);
//! ```

use serde_json::Value;

use crate::comments::{attach_comments, CommentCorrelator, PathSubstitution, SourceProvider};
use crate::emit::render;
use crate::entry::DebugInfo;
use crate::graph::closure::build_closure;
use crate::index::EntryIndex;
use crate::normalize::normalize;
use crate::report::Report;
use crate::select::{select, SelectionMode};
use crate::validate::validate;

/// User-facing knobs of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions
{
    pub mode: SelectionMode,
    /// Keep unnamed root types instead of suppressing them.
    pub include_unnamed: bool,
    /// Correlate source comments with exported declarations.
    pub export_comments: bool,
    /// Let a name that selects a typedef of a named composite select the
    /// composite.
    pub unwrap_typedefs: bool,
    /// Prefix rewrites applied to source paths before reading them.
    pub path_substitutions: Vec<PathSubstitution>,
}

impl Default for ExportOptions
{
    fn default() -> Self
    {
        Self {
            mode: SelectionMode::default(),
            include_unnamed: false,
            export_comments: false,
            unwrap_typedefs: true,
            path_substitutions: Vec::new(),
        }
    }
}

/// Records and diagnostics of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct Export
{
    pub records: Vec<Value>,
    pub report: Report,
}

impl Export
{
    /// The records as one pretty-printed JSON array.
    pub fn to_json(&self) -> serde_json::Result<String>
    {
        serde_json::to_string_pretty(&self.records)
    }
}

pub struct Exporter<'a>
{
    info: &'a DebugInfo,
    options: ExportOptions,
}

impl<'a> Exporter<'a>
{
    pub fn new(info: &'a DebugInfo, options: ExportOptions) -> Self
    {
        Self { info, options }
    }

    pub fn options(&self) -> &ExportOptions
    {
        &self.options
    }

    /// Run the pipeline. `sources` is only read when comments are exported.
    pub fn run(&self, sources: &dyn SourceProvider) -> Export
    {
        let mut report = Report::new();
        let index = EntryIndex::new(self.info);

        let selected = select(&index, &self.options.mode, self.options.unwrap_typedefs, &mut report);
        tracing::debug!(selected = selected.len(), mode = ?self.options.mode, "selected root entries");

        let closure = build_closure(&index, &selected, &mut report);
        tracing::debug!(nodes = closure.graph.len(), roots = closure.roots.len(), "built dependency closure");

        let mut normalized = normalize(closure, &index, self.options.include_unnamed, &mut report);
        tracing::debug!(roots = normalized.roots.len(), "normalized graph");

        if self.options.export_comments {
            let mut correlator =
                CommentCorrelator::new(sources, self.options.path_substitutions.clone(), self.info.build_time);
            attach_comments(&mut normalized.graph, &normalized.roots, &mut correlator, &mut report);
        }

        let records: Vec<Value> = render(&normalized, self.info, &mut report)
            .iter()
            .filter_map(|record| match serde_json::to_value(record) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::error!(error = %err, name = ?record.name, "failed to serialize record");
                    None
                }
            })
            .collect();

        for warning in validate(&records) {
            report.warn(warning);
        }

        Export { records, report }
    }
}
