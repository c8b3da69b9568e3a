//! Common module for library exports

pub use crate::classify::{BaseEncoding, DataType, ExportClass, Kind};
pub use crate::comments::{LocalSources, PathSubstitution, SourceProvider};
pub use crate::dwarf::{load_debug_info, DecodeOptions};
pub use crate::entry::{CompileUnit, DebugEntry, DebugInfo};
pub use crate::error::{DwarfexError, DwarfexResult};
pub use crate::export::{Export, ExportOptions, Exporter};
pub use crate::report::{Report, Stats, Warning};
pub use crate::select::SelectionMode;
pub use crate::types::{EntryOffset, SourceLocation};
