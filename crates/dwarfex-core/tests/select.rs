//! Tests for root selection

mod common;

use common::*;
use dwarfex_core::classify::ExportClass;
use dwarfex_core::entry::DebugEntry;
use dwarfex_core::index::EntryIndex;
use dwarfex_core::report::{Report, Warning};
use dwarfex_core::select::{select, SelectionMode};
use dwarfex_core::types::EntryOffset;
use gimli::constants;
use pretty_assertions::assert_eq;

fn offsets(values: &[u64]) -> Vec<EntryOffset>
{
    values.iter().copied().map(EntryOffset::new).collect()
}

fn sample() -> Vec<DebugEntry>
{
    let mut entries = point();
    entries.push(typedef(0x40, "point_t", 0x20));
    entries.push(variable(0x50, "origin", 0x20));
    entries.push(
        DebugEntry::new(0x60, constants::DW_TAG_namespace)
            .with_name("geo")
            .with_child(structure(0x68, Some("Line"), 16)),
    );
    entries
}

#[test]
fn test_default_mode_selects_default_classes_in_order()
{
    let info = info(sample());
    let index = EntryIndex::new(&info);
    let mut report = Report::new();

    let selected = select(&index, &SelectionMode::default(), true, &mut report);
    assert_eq!(selected, offsets(&[0x20, 0x50, 0x68]));
    assert_eq!(report.stats.selected, 3);
}

#[test]
fn test_all_mode_includes_base_types_and_typedefs()
{
    let info = info(sample());
    let index = EntryIndex::new(&info);

    let selected = select(&index, &SelectionMode::All, true, &mut Report::new());
    assert_eq!(selected, offsets(&[0x10, 0x20, 0x40, 0x50, 0x68]));
}

#[test]
fn test_class_mode()
{
    let info = info(sample());
    let index = EntryIndex::new(&info);

    let mode = SelectionMode::ByClass(vec![ExportClass::TypeDefType, ExportClass::BaseType]);
    let selected = select(&index, &mode, true, &mut Report::new());
    assert_eq!(selected, offsets(&[0x10, 0x40]));
}

#[test]
fn test_name_mode_keeps_request_order_and_scoped_names()
{
    let info = info(sample());
    let index = EntryIndex::new(&info);
    let mut report = Report::new();

    let mode = SelectionMode::ByName(vec!["geo::Line".to_string(), "origin".to_string(), "Missing".to_string()]);
    let selected = select(&index, &mode, true, &mut report);
    assert_eq!(selected, offsets(&[0x68, 0x50]));
    assert_eq!(report.warnings, vec![Warning::NameNotFound("Missing".to_string())]);
}

#[test]
fn test_typedef_name_unwraps_to_struct()
{
    let info = info(sample());
    let index = EntryIndex::new(&info);
    let mode = SelectionMode::ByName(vec!["point_t".to_string()]);

    assert_eq!(select(&index, &mode, true, &mut Report::new()), offsets(&[0x20]));
    assert_eq!(select(&index, &mode, false, &mut Report::new()), offsets(&[0x40]));
}

#[test]
fn test_ambiguous_name_exports_first()
{
    let info = info_units(vec![point(), vec![structure(0x120, Some("Point"), 4)]]);
    let index = EntryIndex::new(&info);
    let mut report = Report::new();

    let mode = SelectionMode::ByName(vec!["Point".to_string()]);
    assert_eq!(select(&index, &mode, true, &mut report), offsets(&[0x20]));
    assert_eq!(
        report.warnings,
        vec![Warning::AmbiguousName {
            name: "Point".to_string(),
            count: 2,
        }]
    );
}
