//! # Entry Model
//!
//! Owned, decoder-independent representation of debugging information
//! entries. The [`dwarf`](crate::dwarf) module produces it from an ELF file;
//! every later stage consumes it read-only.
//!
//! Tags and base-type encodings keep their DWARF identity (`gimli::DwTag`,
//! `gimli::DwAte`). Attributes are reduced to the handful the exporter reads,
//! already resolved to plain values: strings are decoded, type references are
//! absolute [`EntryOffset`]s and location expressions are folded into a
//! single address.
//!
//! ## Building entries by hand
//!
//! ```rust
//! use dwarfex_core::entry::DebugEntry;
//! use gimli::constants;
//!
//! let int = DebugEntry::new(0x10, constants::DW_TAG_base_type)
//!     .with_name("int")
//!     .with_byte_size(4)
//!     .with_encoding(constants::DW_ATE_signed);
//! let point = DebugEntry::new(0x20, constants::DW_TAG_structure_type)
//!     .with_name("Point")
//!     .with_child(DebugEntry::new(0x28, constants::DW_TAG_member).with_name("x").with_type(0x10));
//! assert_eq!(point.children.len(), 1);
//! assert_eq!(int.attrs.byte_size, Some(4));
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use gimli::{DwAte, DwTag};

use crate::types::{EntryOffset, LoadSegment, SourceLocation};

/// Attribute values of one entry, as far as the exporter needs them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes
{
    pub name: Option<String>,
    pub byte_size: Option<u64>,
    pub bit_size: Option<u64>,
    /// `DW_AT_data_member_location` folded to a constant byte offset.
    pub data_member_location: Option<u64>,
    /// `DW_AT_data_bit_offset` (DWARF 4+, counted from the containing struct).
    pub data_bit_offset: Option<u64>,
    /// `DW_AT_bit_offset` (DWARF 2/3, counted within the storage unit).
    pub bit_offset: Option<u64>,
    pub encoding: Option<DwAte>,
    pub type_ref: Option<EntryOffset>,
    pub specification: Option<EntryOffset>,
    pub declaration: bool,
    pub external: bool,
    /// `DW_AT_location` when it is a single `DW_OP_addr`.
    pub location: Option<u64>,
    pub const_value: Option<i64>,
    pub count: Option<u64>,
    pub lower_bound: Option<i64>,
    pub upper_bound: Option<i64>,
    pub byte_stride: Option<u64>,
    pub decl: Option<SourceLocation>,
}

/// One decoded debugging information entry and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry
{
    pub offset: EntryOffset,
    pub tag: DwTag,
    pub attrs: Attributes,
    pub children: Vec<DebugEntry>,
}

impl DebugEntry
{
    /// Entry with no attributes and no children.
    pub fn new(offset: u64, tag: DwTag) -> Self
    {
        Self {
            offset: EntryOffset::new(offset),
            tag,
            attrs: Attributes::default(),
            children: Vec::new(),
        }
    }

    /// `DW_AT_name`, if present.
    pub fn name(&self) -> Option<&str>
    {
        self.attrs.name.as_deref()
    }

    /// Whether the entry carries `DW_AT_declaration`.
    pub fn is_declaration(&self) -> bool
    {
        self.attrs.declaration
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self
    {
        self.attrs.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_byte_size(mut self, size: u64) -> Self
    {
        self.attrs.byte_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_bit_size(mut self, bits: u64) -> Self
    {
        self.attrs.bit_size = Some(bits);
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: DwAte) -> Self
    {
        self.attrs.encoding = Some(encoding);
        self
    }

    #[must_use]
    pub fn with_type(mut self, target: u64) -> Self
    {
        self.attrs.type_ref = Some(EntryOffset::new(target));
        self
    }

    #[must_use]
    pub fn with_specification(mut self, target: u64) -> Self
    {
        self.attrs.specification = Some(EntryOffset::new(target));
        self
    }

    #[must_use]
    pub fn with_member_location(mut self, offset: u64) -> Self
    {
        self.attrs.data_member_location = Some(offset);
        self
    }

    #[must_use]
    pub fn with_data_bit_offset(mut self, bits: u64) -> Self
    {
        self.attrs.data_bit_offset = Some(bits);
        self
    }

    #[must_use]
    pub fn with_bit_offset(mut self, bits: u64) -> Self
    {
        self.attrs.bit_offset = Some(bits);
        self
    }

    #[must_use]
    pub fn with_location(mut self, address: u64) -> Self
    {
        self.attrs.location = Some(address);
        self
    }

    #[must_use]
    pub fn with_const_value(mut self, value: i64) -> Self
    {
        self.attrs.const_value = Some(value);
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u64) -> Self
    {
        self.attrs.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, lower: Option<i64>, upper: Option<i64>) -> Self
    {
        self.attrs.lower_bound = lower;
        self.attrs.upper_bound = upper;
        self
    }

    #[must_use]
    pub fn with_byte_stride(mut self, stride: u64) -> Self
    {
        self.attrs.byte_stride = Some(stride);
        self
    }

    #[must_use]
    pub fn with_decl(mut self, decl: SourceLocation) -> Self
    {
        self.attrs.decl = Some(decl);
        self
    }

    /// Mark as a non-defining declaration.
    #[must_use]
    pub fn declaration(mut self) -> Self
    {
        self.attrs.declaration = true;
        self
    }

    #[must_use]
    pub fn external(mut self) -> Self
    {
        self.attrs.external = true;
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: DebugEntry) -> Self
    {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = DebugEntry>) -> Self
    {
        self.children.extend(children);
        self
    }
}

/// Top-level entries of one compile unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileUnit
{
    /// `DW_AT_name` of the unit DIE (usually the primary source file).
    pub name: Option<String>,
    pub comp_dir: Option<PathBuf>,
    /// Children of the unit DIE, in section order.
    pub entries: Vec<DebugEntry>,
}

impl CompileUnit
{
    pub fn new(entries: Vec<DebugEntry>) -> Self
    {
        Self {
            entries,
            ..Self::default()
        }
    }
}

/// The decoded debug-info forest of one binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfo
{
    pub units: Vec<CompileUnit>,
    /// Modification time of the binary, used to flag stale source files.
    pub build_time: Option<DateTime<Utc>>,
    /// `PT_LOAD` segments, for physical address translation.
    pub segments: Vec<LoadSegment>,
}

impl DebugInfo
{
    /// Forest made of the given units, without build time or segments.
    pub fn from_units(units: Vec<CompileUnit>) -> Self
    {
        Self {
            units,
            ..Self::default()
        }
    }

    /// Physical load address of `address`, if a segment maps it elsewhere.
    pub fn physical_address(&self, address: u64) -> Option<u64>
    {
        self.segments
            .iter()
            .find_map(|segment| segment.translate(address))
            .filter(|physical| *physical != address)
    }

    /// Total number of entries, children included.
    pub fn entry_count(&self) -> usize
    {
        fn count(entry: &DebugEntry) -> usize
        {
            1 + entry.children.iter().map(count).sum::<usize>()
        }
        self.units
            .iter()
            .flat_map(|unit| unit.entries.iter())
            .map(count)
            .sum()
    }
}
