//! Post-hoc checks over the final JSON records.
//!
//! Validation reads the records exactly as they will be written and never
//! changes them. Every finding is a [`Warning`]; none of them stops the export.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::report::Warning;

/// Check for shared names, explicit `null`s and `mapping`s that name no
/// exported record.
pub fn validate(records: &[Value]) -> Vec<Warning>
{
    let mut warnings = Vec::new();

    let mut names: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        if let Some(name) = record.get("name").and_then(Value::as_str) {
            *names.entry(name).or_default() += 1;
        }
    }
    for (name, count) in &names {
        if *count > 1 {
            warnings.push(Warning::DuplicateName {
                name: (*name).to_string(),
                count: *count,
            });
        }
    }

    for record in records {
        let entry = record.get("name").and_then(Value::as_str).map(str::to_string);
        let mut paths = Vec::new();
        collect_nulls(record, &mut Vec::new(), &mut paths);
        for path in paths {
            warnings.push(Warning::NullProperty {
                entry: entry.clone(),
                path,
            });
        }
    }

    let exported: HashSet<&str> = names.keys().copied().collect();
    let mut dangling: Vec<&str> = Vec::new();
    for record in records {
        collect_mappings(record, &mut dangling);
    }
    let mut reported = HashSet::new();
    dangling.retain(|mapping| !exported.contains(mapping) && reported.insert(*mapping));
    dangling.sort_unstable();
    warnings.extend(dangling.into_iter().map(|mapping| Warning::DanglingMapping(mapping.to_string())));

    warnings
}

/// Rendered as `members[1] -> type -> dimensions[0]`.
fn format_path(segments: &[String]) -> String
{
    segments.join(" -> ")
}

fn collect_nulls(value: &Value, path: &mut Vec<String>, found: &mut Vec<String>)
{
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::Null => {
                        path.push(key.clone());
                        found.push(format_path(path));
                        path.pop();
                    }
                    Value::Array(items) => {
                        for (index, item) in items.iter().enumerate() {
                            path.push(format!("{key}[{index}]"));
                            if item.is_null() {
                                found.push(format_path(path));
                            } else {
                                collect_nulls(item, path, found);
                            }
                            path.pop();
                        }
                    }
                    Value::Object(_) => {
                        path.push(key.clone());
                        collect_nulls(child, path, found);
                        path.pop();
                    }
                    _ => {}
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_nulls(item, path, found);
            }
        }
        _ => {}
    }
}

fn collect_mappings<'v>(value: &'v Value, found: &mut Vec<&'v str>)
{
    match value {
        Value::Object(map) => {
            if let Some(mapping) = map.get("mapping").and_then(Value::as_str) {
                found.push(mapping);
            }
            map.values().for_each(|child| collect_mappings(child, found));
        }
        Value::Array(items) => items.iter().for_each(|item| collect_mappings(item, found)),
        _ => {}
    }
}
