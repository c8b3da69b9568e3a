//! Tests for error handling

use std::path::PathBuf;

use dwarfex_core::dwarf::{load_debug_info, DecodeOptions};
use dwarfex_core::error::{DwarfexError, DwarfexResult};

#[test]
fn test_missing_debug_info_display()
{
    let error = DwarfexError::MissingDebugInfo(PathBuf::from("/tmp/stripped.elf"));
    let message = format!("{}", error);
    assert!(message.contains("No DWARF debug information"));
    assert!(message.contains("/tmp/stripped.elf"));
}

#[test]
fn test_invalid_argument_display()
{
    let error = DwarfexError::InvalidArgument("test arg".to_string());
    let message = format!("{}", error);
    assert!(message.contains("Invalid argument"));
    assert!(message.contains("test arg"));
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error: DwarfexError = io.into();
    match error {
        DwarfexError::Io(inner) => assert_eq!(inner.kind(), std::io::ErrorKind::NotFound),
        other => panic!("Expected Io variant, got {other:?}"),
    }
}

#[test]
fn test_missing_file_is_io_error()
{
    let dir = tempfile::tempdir().unwrap();
    let result = load_debug_info(dir.path().join("nope.elf"), &DecodeOptions::default());
    assert!(matches!(result, Err(DwarfexError::Io(_))));
}

#[test]
fn test_non_object_file_is_rejected()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "plain text, not an ELF image").unwrap();

    match load_debug_info(&path, &DecodeOptions::default()) {
        Err(DwarfexError::Object { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected Object error, got {other:?}"),
    }
}

#[test]
fn test_result_type()
{
    let _result: DwarfexResult<()> = Ok(());
    let _error_result: DwarfexResult<()> = Err(DwarfexError::InvalidArgument("x".to_string()));
}
