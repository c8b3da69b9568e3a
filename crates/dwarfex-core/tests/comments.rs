//! Tests for source comment correlation through the export pipeline

mod common;

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use common::*;
use dwarfex_core::comments::PathSubstitution;
use dwarfex_core::entry::DebugEntry;
use dwarfex_core::export::ExportOptions;
use dwarfex_core::report::Warning;
use dwarfex_core::types::SourceLocation;
use gimli::constants;
use pretty_assertions::assert_eq;
use serde_json::json;

fn with_comments() -> ExportOptions
{
    ExportOptions {
        export_comments: true,
        ..ExportOptions::default()
    }
}

#[test]
fn test_comment_above_variable()
{
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("counter.c");
    fs::write(&source, "// counter\nint x;\n").unwrap();

    let info = info(vec![
        int(0x10),
        variable(0x20, "x", 0x10).with_decl(SourceLocation::new(&source, 2)),
    ]);
    let export = export(&info, with_comments());

    assert_eq!(
        export.records,
        vec![json!({
            "datatype": "variable",
            "name": "x",
            "type": {"datatype": "int", "datawidth": 4},
            "comment": "counter"
        })]
    );
    assert!(export.report.warnings.is_empty());
}

#[test]
fn test_struct_and_member_comments()
{
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("point.h");
    fs::write(
        &source,
        "/* A 2D point */\nstruct Point {\n    int x; // horizontal\n    int y; // vertical\n};\n",
    )
    .unwrap();

    let info = info(vec![
        int(0x10),
        structure(0x20, Some("Point"), 8)
            .with_decl(SourceLocation::new(&source, 2))
            .with_child(member(0x28, "x", 0x10, 0).with_decl(SourceLocation::new(&source, 3)))
            .with_child(member(0x30, "y", 0x10, 4).with_decl(SourceLocation::new(&source, 4))),
    ]);
    let export = export(&info, with_comments());

    assert_eq!(export.records[0]["comment"], json!("A 2D point"));
    assert_eq!(export.records[0]["members"][0]["comment"], json!("horizontal"));
    assert_eq!(export.records[0]["members"][1]["comment"], json!("vertical"));
}

#[test]
fn test_enumerator_comments_without_locations()
{
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("mode.h");
    fs::write(&source, "enum Mode {\n    IDLE, // waiting\n    RUN   // working\n};\n").unwrap();

    let info = info(vec![
        DebugEntry::new(0x20, constants::DW_TAG_enumeration_type)
            .with_name("Mode")
            .with_byte_size(4)
            .with_encoding(constants::DW_ATE_unsigned)
            .with_decl(SourceLocation::new(&source, 1))
            .with_child(DebugEntry::new(0x28, constants::DW_TAG_enumerator).with_name("IDLE").with_const_value(0))
            .with_child(DebugEntry::new(0x2c, constants::DW_TAG_enumerator).with_name("RUN").with_const_value(1)),
    ]);
    let export = export(&info, with_comments());

    assert_eq!(
        export.records[0]["enumerators"],
        json!([
            {"value": 0, "representation": "IDLE", "comment": "waiting"},
            {"value": 1, "representation": "RUN", "comment": "working"}
        ])
    );
}

#[test]
fn test_path_substitution_and_unreadable_source()
{
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("flag.c"), "int flag; /* set on boot */\n").unwrap();

    let info = info(vec![
        int(0x10),
        variable(0x20, "flag", 0x10).with_decl(SourceLocation::new("/build/src/flag.c", 1)),
        variable(0x30, "lost", 0x10).with_decl(SourceLocation::new("/elsewhere/lost.c", 1)),
    ]);
    let options = ExportOptions {
        path_substitutions: vec![PathSubstitution::new("/build/src", dir.path().to_string_lossy())],
        ..with_comments()
    };
    let export = export(&info, options);

    assert_eq!(export.records[0]["comment"], json!("set on boot"));
    assert!(export.records[1].get("comment").is_none());
    assert!(matches!(
        &export.report.warnings[..],
        [Warning::UnreadableSource { path, .. }] if path == Path::new("/elsewhere/lost.c")
    ));
}

#[test]
fn test_stale_source_warns_once_and_keeps_comments()
{
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("state.c");
    fs::write(&source, "int a; // first\nint b; // second\n").unwrap();

    let mut info = info(vec![
        int(0x10),
        variable(0x20, "a", 0x10).with_decl(SourceLocation::new(&source, 1)),
        variable(0x30, "b", 0x10).with_decl(SourceLocation::new(&source, 2)),
    ]);
    info.build_time = Some(DateTime::<Utc>::UNIX_EPOCH);
    let export = export(&info, with_comments());

    assert_eq!(export.report.warnings, vec![Warning::StaleSource(source.clone())]);
    assert_eq!(export.records[0]["comment"], json!("first"));
    assert_eq!(export.records[1]["comment"], json!("second"));
}

#[test]
fn test_column_inside_multibyte_character()
{
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("accent.c");
    fs::write(&source, "\u{e9} x; // note\n").unwrap();

    let info = info(vec![
        int(0x10),
        variable(0x20, "x", 0x10).with_decl(SourceLocation::new(&source, 1).with_column(2)),
    ]);
    let export = export(&info, with_comments());

    assert_eq!(export.records[0]["comment"], json!("note"));
    assert!(export.report.warnings.is_empty());
}

#[test]
fn test_member_comments_without_container_location()
{
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("pair.h");
    fs::write(&source, "struct Pair {\n    int left; // first half\n};\n").unwrap();

    let info = info(vec![
        int(0x10),
        structure(0x20, Some("Pair"), 4)
            .with_child(member(0x28, "left", 0x10, 0).with_decl(SourceLocation::new(&source, 2))),
    ]);
    let export = export(&info, with_comments());

    assert!(export.records[0].get("comment").is_none());
    assert_eq!(export.records[0]["members"][0]["comment"], json!("first half"));
}

#[test]
fn test_comments_are_off_by_default()
{
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("counter.c");
    fs::write(&source, "// counter\nint x;\n").unwrap();

    let info = info(vec![
        int(0x10),
        variable(0x20, "x", 0x10).with_decl(SourceLocation::new(&source, 2)),
    ]);
    let export = export_default(&info);
    assert!(export.records[0].get("comment").is_none());
}
