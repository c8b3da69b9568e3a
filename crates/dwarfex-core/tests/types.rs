//! Tests for shared value types

use dwarfex_core::entry::{CompileUnit, DebugEntry, DebugInfo};
use dwarfex_core::types::{EntryOffset, LoadSegment, SourceLocation};
use gimli::constants;

#[test]
fn test_entry_offset_from_u64()
{
    let offset = EntryOffset::from(0x2d);
    assert_eq!(offset.value(), 0x2d);
}

#[test]
fn test_entry_offset_to_u64()
{
    let value: u64 = EntryOffset::new(0x40).into();
    assert_eq!(value, 0x40);
}

#[test]
fn test_entry_offset_display()
{
    assert_eq!(EntryOffset::new(0xb).to_string(), "<0x0000000b>");
}

#[test]
fn test_source_location_display()
{
    let location = SourceLocation::new("/src/app/main.c", 12);
    assert_eq!(location.to_string(), "/src/app/main.c:12");
    assert_eq!(location.with_column(5).to_string(), "/src/app/main.c:12:5");
}

#[test]
fn test_load_segment_translate()
{
    let segment = LoadSegment {
        virtual_address: 0x2000_0000,
        physical_address: 0x0800_4000,
        size: 0x100,
    };
    assert_eq!(segment.translate(0x2000_0010), Some(0x0800_4010));
    assert_eq!(segment.translate(0x2000_0100), None);
    assert_eq!(segment.translate(0x1fff_ffff), None);
}

#[test]
fn test_physical_address_only_when_relocated()
{
    let mut info = DebugInfo::default();
    info.segments = vec![
        LoadSegment {
            virtual_address: 0x0800_0000,
            physical_address: 0x0800_0000,
            size: 0x1000,
        },
        LoadSegment {
            virtual_address: 0x2000_0000,
            physical_address: 0x0800_1000,
            size: 0x100,
        },
    ];
    assert_eq!(info.physical_address(0x0800_0010), None);
    assert_eq!(info.physical_address(0x2000_0004), Some(0x0800_1004));
    assert_eq!(info.physical_address(0x3000_0000), None);
}

#[test]
fn test_entry_count_includes_children()
{
    let info = DebugInfo::from_units(vec![CompileUnit::new(vec![DebugEntry::new(0x10, constants::DW_TAG_structure_type)
        .with_name("S")
        .with_child(DebugEntry::new(0x18, constants::DW_TAG_member).with_name("a"))
        .with_child(DebugEntry::new(0x20, constants::DW_TAG_member).with_name("b"))])]);
    assert_eq!(info.entry_count(), 3);
}
