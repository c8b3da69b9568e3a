//! DIE tree to [`DebugEntry`] conversion.

use std::path::{Path, PathBuf};

use gimli::{
    constants, AttributeValue, DebuggingInformationEntry, EntriesTreeNode, Expression, Operation, Reader, Unit,
};

use super::{BinaryImage, OwnedDwarf, OwnedReader};
use crate::entry::{Attributes, CompileUnit, DebugEntry, DebugInfo};
use crate::error::{map_dwarf_error, DwarfexError, DwarfexResult};
use crate::types::{EntryOffset, SourceLocation};

/// Knobs for [`Decoder::decode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions
{
    /// Log and skip entries (with their subtree) that fail to decode instead
    /// of aborting.
    pub skip_errors: bool,
}

/// Open `path` and decode its whole `.debug_info`.
pub fn load_debug_info(path: impl AsRef<Path>, options: &DecodeOptions) -> DwarfexResult<DebugInfo>
{
    let image = BinaryImage::open(path)?;
    Decoder::decode(&image, options)
}

/// Walks every compile unit of a [`BinaryImage`].
pub struct Decoder<'a>
{
    dwarf: &'a OwnedDwarf,
    options: DecodeOptions,
    skipped: usize,
}

impl<'a> Decoder<'a>
{
    pub fn decode(image: &'a BinaryImage, options: &DecodeOptions) -> DwarfexResult<DebugInfo>
    {
        if !image.has_debug_info() {
            return Err(DwarfexError::MissingDebugInfo(image.path().to_path_buf()));
        }

        let dwarf = image.dwarf()?;
        let mut decoder = Decoder {
            dwarf,
            options: *options,
            skipped: 0,
        };

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            let unit = dwarf
                .unit(header)
                .map_err(|err| map_dwarf_error("parsing compilation unit", err));
            let Some(unit) = decoder.recover(unit)? else {
                continue;
            };
            let decoded = decoder.unit(&unit);
            if let Some(decoded) = decoder.recover(decoded)? {
                units.push(decoded);
            }
        }

        if decoder.skipped > 0 {
            tracing::warn!(skipped = decoder.skipped, "skipped entries that failed to decode");
        }

        let info = DebugInfo {
            units,
            build_time: image.build_time(),
            segments: image.segments().to_vec(),
        };
        tracing::info!(
            units = info.units.len(),
            entries = info.entry_count(),
            "decoded debug information"
        );
        Ok(info)
    }

    /// Swallow `result`'s error when errors are skipped.
    fn recover<T>(&mut self, result: DwarfexResult<T>) -> DwarfexResult<Option<T>>
    {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.options.skip_errors => {
                tracing::warn!(error = %err, "skipping undecodable entry");
                self.skipped += 1;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn unit(&mut self, unit: &Unit<OwnedReader>) -> DwarfexResult<CompileUnit>
    {
        let mut tree = unit
            .entries_tree(None)
            .map_err(|err| map_dwarf_error("building unit tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;

        let name = match root
            .entry()
            .attr_value(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading unit name", err))?
        {
            Some(value) => Some(self.attr_to_string(unit, value)?),
            None => None,
        };
        let comp_dir = match &unit.comp_dir {
            Some(dir) => Some(PathBuf::from(reader_to_string(dir)?)),
            None => None,
        };
        tracing::trace!(unit = name.as_deref().unwrap_or("<unnamed>"), "decoding unit");

        let entries = self.children(unit, root)?;
        Ok(CompileUnit {
            name,
            comp_dir,
            entries,
        })
    }

    fn children(&mut self, unit: &Unit<OwnedReader>, node: EntriesTreeNode<'_, '_, '_, OwnedReader>) -> DwarfexResult<Vec<DebugEntry>>
    {
        let mut entries = Vec::new();
        let mut children = node.children();
        loop {
            let next = children
                .next()
                .map_err(|err| map_dwarf_error("iterating entry children", err));
            let Some(child) = self.recover(next)? else {
                break;
            };
            let Some(child) = child else {
                break;
            };

            let decoded = self.entry(unit, child.entry());
            let Some(mut entry) = self.recover(decoded)? else {
                continue;
            };
            entry.children = self.children(unit, child)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn entry(&self, unit: &Unit<OwnedReader>, die: &DebuggingInformationEntry<'_, '_, OwnedReader>) -> DwarfexResult<DebugEntry>
    {
        let offset = die
            .offset()
            .to_debug_info_offset(&unit.header)
            .map(EntryOffset::from)
            .ok_or_else(|| DwarfexError::InvalidArgument(format!("entry {:#x} is outside .debug_info", die.offset().0)))?;
        let mut entry = DebugEntry::new(offset.value(), die.tag());

        let mut decl_file = None;
        let mut decl_line = None;
        let mut decl_column = None;

        let attrs: &mut Attributes = &mut entry.attrs;
        let mut iter = die.attrs();
        while let Some(attr) = iter
            .next()
            .map_err(|err| map_dwarf_error("reading entry attributes", err))?
        {
            let value = attr.value();
            match attr.name() {
                constants::DW_AT_name => attrs.name = Some(self.attr_to_string(unit, value)?),
                constants::DW_AT_byte_size => attrs.byte_size = attr.udata_value(),
                constants::DW_AT_bit_size => attrs.bit_size = attr.udata_value(),
                constants::DW_AT_data_member_location => attrs.data_member_location = member_location(unit, value)?,
                constants::DW_AT_data_bit_offset => attrs.data_bit_offset = attr.udata_value(),
                constants::DW_AT_bit_offset => attrs.bit_offset = attr.udata_value(),
                constants::DW_AT_encoding => {
                    if let AttributeValue::Encoding(encoding) = value {
                        attrs.encoding = Some(encoding);
                    }
                }
                constants::DW_AT_type => attrs.type_ref = reference(unit, value),
                constants::DW_AT_specification => attrs.specification = reference(unit, value),
                constants::DW_AT_declaration => attrs.declaration = flag(&value),
                constants::DW_AT_external => attrs.external = flag(&value),
                constants::DW_AT_location => attrs.location = self.single_address(unit, value)?,
                constants::DW_AT_const_value => attrs.const_value = signed(&value),
                constants::DW_AT_count => attrs.count = attr.udata_value(),
                constants::DW_AT_lower_bound => attrs.lower_bound = signed(&value),
                constants::DW_AT_upper_bound => attrs.upper_bound = signed(&value),
                constants::DW_AT_byte_stride => attrs.byte_stride = attr.udata_value(),
                constants::DW_AT_decl_file => decl_file = Some(value),
                constants::DW_AT_decl_line => decl_line = attr.udata_value(),
                constants::DW_AT_decl_column => decl_column = attr.udata_value(),
                _ => {}
            }
        }

        if attrs.byte_size.is_none()
            && matches!(
                die.tag(),
                constants::DW_TAG_pointer_type
                    | constants::DW_TAG_reference_type
                    | constants::DW_TAG_rvalue_reference_type
                    | constants::DW_TAG_ptr_to_member_type
            )
        {
            attrs.byte_size = Some(u64::from(unit.header.address_size()));
        }

        if let (Some(file), Some(line)) = (decl_file, decl_line) {
            if let (Some(path), Ok(line)) = (self.decl_file(unit, file)?, u32::try_from(line)) {
                let mut location = SourceLocation::new(path, line);
                location.column = decl_column.and_then(|column| u32::try_from(column).ok()).filter(|column| *column > 0);
                attrs.decl = Some(location);
            }
        }

        Ok(entry)
    }

    /// `DW_AT_location` folded to one address: a lone `DW_OP_addr` or
    /// `DW_OP_addrx`. Anything else is not a static location.
    fn single_address(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> DwarfexResult<Option<u64>>
    {
        let Some(expression) = expression(value) else {
            return Ok(None);
        };
        let mut operations = expression.operations(unit.encoding());
        let first = operations
            .next()
            .map_err(|err| map_dwarf_error("evaluating DW_AT_location", err))?;
        let second = operations
            .next()
            .map_err(|err| map_dwarf_error("evaluating DW_AT_location", err))?;

        match (first, second) {
            (Some(Operation::Address { address }), None) => Ok(Some(address)),
            (Some(Operation::AddressIndex { index }), None) => self
                .dwarf
                .address(unit, index)
                .map(Some)
                .map_err(|err| map_dwarf_error("resolving DW_OP_addrx", err)),
            _ => Ok(None),
        }
    }

    /// Path of a `DW_AT_decl_file` index: compile directory, include
    /// directory and file name joined through the unit's line program.
    fn decl_file(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> DwarfexResult<Option<PathBuf>>
    {
        let index = match value {
            AttributeValue::FileIndex(index) => index,
            other => match other.udata_value() {
                Some(index) => index,
                None => return Ok(None),
            },
        };
        let Some(program) = unit.line_program.as_ref() else {
            return Ok(None);
        };
        let header = program.header();
        let Some(file) = header.file(index) else {
            return Ok(None);
        };

        let mut path = match &unit.comp_dir {
            Some(dir) => PathBuf::from(reader_to_string(dir)?),
            None => PathBuf::new(),
        };
        if let Some(directory) = file.directory(header) {
            path.push(self.attr_to_string(unit, directory)?);
        }
        path.push(self.attr_to_string(unit, file.path_name())?);
        Ok(Some(path))
    }

    fn attr_to_string(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> DwarfexResult<String>
    {
        let reader = self
            .dwarf
            .attr_string(unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        reader_to_string(&reader)
    }
}

fn reader_to_string(reader: &OwnedReader) -> DwarfexResult<String>
{
    let owned = match reader.to_string() {
        Ok(cow) => cow.into_owned(),
        Err(_) => reader
            .to_string_lossy()
            .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
            .into_owned(),
    };
    Ok(owned)
}

/// Absolute offset of a reference attribute. Type-unit signatures are not
/// followed.
fn reference(unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> Option<EntryOffset>
{
    match value {
        AttributeValue::UnitRef(offset) => offset.to_debug_info_offset(&unit.header).map(EntryOffset::from),
        AttributeValue::DebugInfoRef(offset) => Some(EntryOffset::from(offset)),
        AttributeValue::DebugTypesRef(signature) => {
            tracing::debug!(signature = signature.0, "type unit references are not followed");
            None
        }
        _ => None,
    }
}

fn flag(value: &AttributeValue<OwnedReader>) -> bool
{
    matches!(value, AttributeValue::Flag(true))
}

/// Signed constant. `DW_FORM_dataN` carries no signedness and reads as
/// unsigned.
fn signed(value: &AttributeValue<OwnedReader>) -> Option<i64>
{
    match value {
        AttributeValue::Sdata(value) => Some(*value),
        other => other.udata_value().and_then(|value| i64::try_from(value).ok()),
    }
}

fn expression(value: AttributeValue<OwnedReader>) -> Option<Expression<OwnedReader>>
{
    match value {
        AttributeValue::Exprloc(expression) => Some(expression),
        AttributeValue::Block(bytes) => Some(Expression(bytes)),
        _ => None,
    }
}

/// `DW_AT_data_member_location` as a byte offset: a constant, or an
/// expression made of `DW_OP_plus_uconst` / `DW_OP_constu`.
fn member_location(unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> DwarfexResult<Option<u64>>
{
    if let Some(offset) = value.udata_value() {
        return Ok(Some(offset));
    }
    let Some(expression) = expression(value) else {
        return Ok(None);
    };

    let mut offset = None;
    let mut operations = expression.operations(unit.encoding());
    while let Some(operation) = operations
        .next()
        .map_err(|err| map_dwarf_error("evaluating DW_AT_data_member_location", err))?
    {
        offset = match operation {
            Operation::PlusConstant { value } => Some(offset.unwrap_or(0u64).wrapping_add(value)),
            Operation::UnsignedConstant { value } => Some(value),
            _ => return Ok(None),
        };
    }
    Ok(offset)
}
