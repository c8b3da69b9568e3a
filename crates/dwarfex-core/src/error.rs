//! # Error Types
//!
//! Fatal errors of an extraction run.
//!
//! Only the decoding layer can fail: reading the ELF file, parsing its object
//! format, or walking malformed DWARF. Everything the graph stages detect
//! (unresolved references, missing names, stale sources, schema anomalies) is
//! collected as a [`Warning`](crate::report::Warning) in the
//! [`Report`](crate::report::Report) instead.
//!
//! We use `thiserror` to derive the `Error` implementations and messages.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for dwarfex operations
#[derive(Error, Debug)]
pub enum DwarfexError
{
    /// The file could not be parsed as an object file
    ///
    /// This happens when the input is not an ELF (or other format supported
    /// by `object`), or when its headers are truncated.
    #[error("Failed to parse {path}: {source}")]
    Object
    {
        /// Path of the offending file
        path: PathBuf,
        /// Underlying parse error
        source: object::Error,
    },

    /// The DWARF data is malformed
    ///
    /// `context` names the decoding step that failed, e.g.
    /// `"reading .debug_info unit header"`.
    #[error("{context}: {source}")]
    Dwarf
    {
        /// What the decoder was doing
        context: String,
        /// Underlying gimli error
        source: gimli::Error,
    },

    /// The binary carries no `.debug_info` content
    ///
    /// Usually the binary was built without `-g` or has been stripped.
    #[error("No DWARF debug information found in {}", .0.display())]
    MissingDebugInfo(PathBuf),

    /// Invalid argument passed to an extraction function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, DwarfexError>`
///
/// ```rust
/// use dwarfex_core::error::DwarfexResult;
/// fn foo() -> DwarfexResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type DwarfexResult<T> = std::result::Result<T, DwarfexError>;

/// Attach decoding context to a gimli error.
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> DwarfexError
{
    DwarfexError::Dwarf {
        context: context.to_string(),
        source: err,
    }
}
