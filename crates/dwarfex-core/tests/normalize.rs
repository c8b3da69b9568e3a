//! Tests for the closure builder and the normalizer passes

mod common;

use common::*;
use dwarfex_core::entry::{DebugEntry, DebugInfo};
use dwarfex_core::graph::{build_closure, Closure, NodeBody};
use dwarfex_core::index::EntryIndex;
use dwarfex_core::normalize::{complete_declarations, normalize, Normalized};
use dwarfex_core::report::Report;
use dwarfex_core::types::EntryOffset;
use gimli::constants;
use pretty_assertions::assert_eq;

fn closure(info: &DebugInfo, roots: &[u64], report: &mut Report) -> Closure
{
    let index = EntryIndex::new(info);
    let roots: Vec<EntryOffset> = roots.iter().copied().map(EntryOffset::new).collect();
    build_closure(&index, &roots, report)
}

fn normalized(info: &DebugInfo, roots: &[u64]) -> (Normalized, Report)
{
    let index = EntryIndex::new(info);
    let mut report = Report::new();
    let roots: Vec<EntryOffset> = roots.iter().copied().map(EntryOffset::new).collect();
    let closure = build_closure(&index, &roots, &mut report);
    let normalized = normalize(closure, &index, false, &mut report);
    (normalized, report)
}

fn root_offsets(normalized: &Normalized) -> Vec<u64>
{
    normalized
        .roots
        .iter()
        .map(|id| normalized.graph.node(*id).source_offset.value())
        .collect()
}

#[test]
fn test_closure_looks_through_qualifiers()
{
    let info = info(vec![
        int(0x10),
        DebugEntry::new(0x18, constants::DW_TAG_const_type).with_type(0x10),
        DebugEntry::new(0x1c, constants::DW_TAG_volatile_type).with_type(0x18),
        variable(0x20, "limit", 0x1c),
    ]);
    let mut report = Report::new();
    let closure = closure(&info, &[0x20], &mut report);

    assert_eq!(closure.graph.len(), 2);
    let variable = closure.graph.node(closure.roots[0]);
    let NodeBody::Variable { ty: Some(ty), .. } = variable.body else {
        panic!("variable has no type");
    };
    assert_eq!(closure.graph.node(ty).source_offset, EntryOffset::new(0x10));
}

#[test]
fn test_closure_counts_dangling_references()
{
    let info = info(vec![variable(0x20, "ghost", 0x999)]);
    let mut report = Report::new();
    let closure = closure(&info, &[0x20], &mut report);

    assert_eq!(closure.graph.len(), 1);
    assert_eq!(report.stats.unresolved_references, 1);
}

#[test]
fn test_closure_promotes_default_class_dependencies()
{
    let mut entries = point();
    entries.push(variable(0x40, "origin", 0x20));
    let info = info(entries);
    let mut report = Report::new();
    let closure = closure(&info, &[0x40], &mut report);

    let candidates: Vec<u64> = closure
        .roots
        .iter()
        .map(|id| closure.graph.node(*id).source_offset.value())
        .collect();
    assert_eq!(candidates, vec![0x40, 0x20]);
    assert_eq!(report.stats.dependencies_added, 1);
    assert_eq!(report.stats.dependencies_excluded_by_class, 1);
}

#[test]
fn test_completion_is_idempotent()
{
    let info = info_units(vec![
        vec![structure(0x20, Some("Point"), 0).declaration(), variable(0x40, "p", 0x20)],
        vec![
            int(0x110),
            structure(0x120, Some("Point"), 8).with_child(member(0x128, "x", 0x110, 0)),
        ],
    ]);

    let mut report = Report::new();
    let Closure { mut graph, mut roots } = closure(&info, &[0x20, 0x40], &mut report);
    complete_declarations(&mut graph, &mut roots, &mut report);
    let (once_graph, once_roots, once_stats) = (graph.clone(), roots.clone(), report.stats.clone());

    complete_declarations(&mut graph, &mut roots, &mut report);
    assert_eq!(graph, once_graph);
    assert_eq!(roots, once_roots);
    assert_eq!(report.stats, once_stats);
}

#[test]
fn test_declaration_without_completion_is_dropped()
{
    let info = info(vec![
        structure(0x20, Some("Opaque"), 0).declaration(),
        pointer(0x30, 0x20),
        variable(0x40, "handle", 0x30),
    ]);
    let (normalized, report) = normalized(&info, &[0x20, 0x40]);

    assert_eq!(root_offsets(&normalized), vec![0x40]);
    assert_eq!(report.stats.declarations_dropped, 1);
    assert_eq!(report.stats.unresolved_references, 1);
}

#[test]
fn test_declaration_root_gives_way_to_definition()
{
    let info = info_units(vec![
        vec![structure(0x20, Some("Point"), 0).declaration()],
        vec![
            int(0x110),
            structure(0x120, Some("Point"), 8).with_child(member(0x128, "x", 0x110, 0)),
        ],
    ]);
    let (normalized, report) = normalized(&info, &[0x20]);

    assert_eq!(root_offsets(&normalized), vec![0x120]);
    assert_eq!(report.stats.declarations_already_exported, 1);
    assert_eq!(report.stats.declarations_dropped, 0);
}

#[test]
fn test_repeated_selection_yields_one_root()
{
    let info = info(point());
    let (normalized, _) = normalized(&info, &[0x20, 0x20]);
    assert_eq!(root_offsets(&normalized), vec![0x20]);
}
