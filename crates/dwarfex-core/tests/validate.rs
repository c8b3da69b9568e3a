//! Tests for the post-hoc record checks

use dwarfex_core::report::Warning;
use dwarfex_core::validate::validate;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_duplicate_names_are_reported_once_per_name()
{
    let records = vec![
        json!({"datatype": "struct", "name": "Point", "datawidth": 8}),
        json!({"datatype": "struct", "name": "Point", "datawidth": 16}),
        json!({"datatype": "variable", "name": "origin", "type": {"datatype": "struct", "mapping": "Point"}}),
    ];
    assert_eq!(
        validate(&records),
        vec![Warning::DuplicateName {
            name: "Point".to_string(),
            count: 2,
        }]
    );
}

#[test]
fn test_dangling_mapping()
{
    let records = vec![
        json!({"datatype": "variable", "name": "a", "type": {"datatype": "pointer", "mapping": "Hidden"}}),
        json!({"datatype": "variable", "name": "b", "type": {"datatype": "pointer", "mapping": "Hidden"}}),
    ];
    assert_eq!(validate(&records), vec![Warning::DanglingMapping("Hidden".to_string())]);
}

#[test]
fn test_null_at_top_level()
{
    let records = vec![json!({"datatype": "variable", "name": "v", "location": null})];
    let warnings = validate(&records);
    assert_eq!(
        warnings,
        vec![Warning::NullProperty {
            entry: Some("v".to_string()),
            path: "location".to_string(),
        }]
    );
    assert_eq!(warnings[0].to_string(), "entry v has a null value at location");
}

#[test]
fn test_validation_does_not_touch_records()
{
    let records = vec![
        json!({"datatype": "struct", "name": "Grid", "members": [{"identifier": "cells", "dimensions": [null]}]}),
        json!({"datatype": "struct", "name": "Grid"}),
    ];
    let before = records.clone();

    let first = validate(&records);
    let second = validate(&records);
    assert_eq!(records, before);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}
