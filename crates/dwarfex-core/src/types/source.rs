//! Source locations and load segments.

use std::fmt;
use std::path::PathBuf;

/// Declaration position recorded by `DW_AT_decl_file` / `DW_AT_decl_line`.
///
/// Lines and columns are 1-based. A missing column means "first
/// non-whitespace character of the line".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation
{
    /// Path as recorded in the debug info (compile directory joined with the
    /// line-program include directory and file name).
    pub file: PathBuf,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, when the compiler emitted one.
    pub column: Option<u32>,
}

impl SourceLocation
{
    /// Location without column information.
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self
    {
        Self {
            file: file.into(),
            line,
            column: None,
        }
    }

    /// Same location with an explicit column.
    #[must_use]
    pub fn with_column(mut self, column: u32) -> Self
    {
        self.column = Some(column);
        self
    }
}

impl fmt::Display for SourceLocation
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.column {
            Some(column) => write!(f, "{}:{}:{}", self.file.display(), self.line, column),
            None => write!(f, "{}:{}", self.file.display(), self.line),
        }
    }
}

/// One `PT_LOAD` program header of the binary.
///
/// Used to translate a variable's virtual address into the address it is
/// loaded from (e.g. `.data` initialisers stored in flash).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment
{
    pub virtual_address: u64,
    pub physical_address: u64,
    pub size: u64,
}

impl LoadSegment
{
    /// Physical address for `address`, if this segment maps it.
    pub fn translate(&self, address: u64) -> Option<u64>
    {
        let delta = address.checked_sub(self.virtual_address)?;
        if delta < self.size {
            self.physical_address.checked_add(delta)
        } else {
            None
        }
    }
}
