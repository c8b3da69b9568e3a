//! Synthetic debug-info builders shared by the integration tests.

#![allow(dead_code)]

use dwarfex_core::comments::LocalSources;
use dwarfex_core::entry::{CompileUnit, DebugEntry, DebugInfo};
use dwarfex_core::export::{Export, ExportOptions, Exporter};
use dwarfex_core::select::SelectionMode;
use gimli::constants;

pub fn info(entries: Vec<DebugEntry>) -> DebugInfo
{
    DebugInfo::from_units(vec![CompileUnit::new(entries)])
}

pub fn info_units(units: Vec<Vec<DebugEntry>>) -> DebugInfo
{
    DebugInfo::from_units(units.into_iter().map(CompileUnit::new).collect())
}

pub fn int(offset: u64) -> DebugEntry
{
    DebugEntry::new(offset, constants::DW_TAG_base_type)
        .with_name("int")
        .with_byte_size(4)
        .with_encoding(constants::DW_ATE_signed)
}

pub fn structure(offset: u64, name: Option<&str>, size: u64) -> DebugEntry
{
    let entry = DebugEntry::new(offset, constants::DW_TAG_structure_type).with_byte_size(size);
    match name {
        Some(name) => entry.with_name(name),
        None => entry,
    }
}

pub fn member(offset: u64, name: &str, ty: u64, location: u64) -> DebugEntry
{
    DebugEntry::new(offset, constants::DW_TAG_member)
        .with_name(name)
        .with_type(ty)
        .with_member_location(location)
}

pub fn pointer(offset: u64, target: u64) -> DebugEntry
{
    DebugEntry::new(offset, constants::DW_TAG_pointer_type)
        .with_byte_size(8)
        .with_type(target)
}

pub fn typedef(offset: u64, name: &str, target: u64) -> DebugEntry
{
    DebugEntry::new(offset, constants::DW_TAG_typedef).with_name(name).with_type(target)
}

pub fn variable(offset: u64, name: &str, ty: u64) -> DebugEntry
{
    DebugEntry::new(offset, constants::DW_TAG_variable)
        .with_name(name)
        .with_type(ty)
        .external()
}

/// `struct Point { int x; int y; }` at 0x20 with `int` at 0x10.
pub fn point() -> Vec<DebugEntry>
{
    vec![
        int(0x10),
        structure(0x20, Some("Point"), 8)
            .with_child(member(0x28, "x", 0x10, 0))
            .with_child(member(0x30, "y", 0x10, 4)),
    ]
}

pub fn export(info: &DebugInfo, options: ExportOptions) -> Export
{
    Exporter::new(info, options).run(&LocalSources)
}

pub fn export_default(info: &DebugInfo) -> Export
{
    export(info, ExportOptions::default())
}

pub fn export_mode(info: &DebugInfo, mode: SelectionMode) -> Export
{
    export(
        info,
        ExportOptions {
            mode,
            ..ExportOptions::default()
        },
    )
}
