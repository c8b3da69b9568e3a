//! Debug-info entry identity.

use std::fmt;

/// Stable offset of a debugging information entry within `.debug_info`
///
/// This wrapper around `u64` is the identity of a [`DebugEntry`](crate::entry::DebugEntry)
/// and the key of every graph built on top of it. Offsets are absolute
/// section offsets, so entries from different compile units never collide.
///
/// ## Example
///
/// ```rust
/// use dwarfex_core::types::EntryOffset;
///
/// let offset = EntryOffset::from(0x2d);
/// assert_eq!(offset.value(), 0x2d);
/// assert_eq!(offset.to_string(), "<0x0000002d>");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryOffset(u64);

impl EntryOffset
{
    /// Create an offset from a raw `u64` value
    ///
    /// Equivalent to `EntryOffset::from(value)` but usable in const contexts.
    pub const fn new(value: u64) -> Self
    {
        EntryOffset(value)
    }

    /// Get the raw section offset
    pub const fn value(self) -> u64
    {
        self.0
    }
}

impl From<u64> for EntryOffset
{
    fn from(value: u64) -> Self
    {
        EntryOffset(value)
    }
}

impl From<EntryOffset> for u64
{
    fn from(offset: EntryOffset) -> Self
    {
        offset.0
    }
}

impl From<gimli::DebugInfoOffset<usize>> for EntryOffset
{
    fn from(offset: gimli::DebugInfoOffset<usize>) -> Self
    {
        EntryOffset(offset.0 as u64)
    }
}

impl fmt::Display for EntryOffset
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "<0x{:08x}>", self.0)
    }
}
