//! # Normalizer
//!
//! Rewrites the closure graph into the final set of root-level nodes. The
//! passes run in a fixed order, each one seeing the result of the previous:
//!
//! 1. completeness substitution
//! 2. unnamed-entry suppression
//! 3. anonymous promotion, redundant typedef removal, typedef bypass
//! 4. root deduplication and the [`RenderPlan`]
//!
//! Nodes are never removed from the arena. A node that drops out of the
//! export simply stops being a root and stops being referenced.

use std::collections::{HashMap, HashSet};

use crate::classify::Kind;
use crate::entry::DebugEntry;
use crate::graph::{Closure, ExportGraph, NodeBody, NodeId};
use crate::index::EntryIndex;
use crate::report::Report;

/// Rendering decision for every edge, frozen once the roots are final.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPlan
{
    mapped: HashMap<NodeId, String>,
}

impl RenderPlan
{
    /// Name to reference `id` by, when it is a named root. Edges to any other
    /// node render the node inline.
    pub fn mapping(&self, id: NodeId) -> Option<&str>
    {
        self.mapped.get(&id).map(String::as_str)
    }

    pub fn is_mapped(&self, id: NodeId) -> bool
    {
        self.mapped.contains_key(&id)
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone)]
pub struct Normalized
{
    pub graph: ExportGraph,
    /// Final root-level nodes, in export order, without duplicates.
    pub roots: Vec<NodeId>,
    pub plan: RenderPlan,
}

/// Run every pass over `closure`.
pub fn normalize(closure: Closure, index: &EntryIndex<'_>, include_unnamed: bool, report: &mut Report) -> Normalized
{
    let Closure { mut graph, mut roots } = closure;

    complete_declarations(&mut graph, &mut roots, report);

    let candidates = roots.clone();
    let suppressed = if include_unnamed {
        HashSet::new()
    } else {
        suppress_unnamed(&graph, &mut roots, report)
    };

    promote_anonymous(&mut graph, index, &candidates, &suppressed, &mut roots, report);
    remove_redundant_typedefs(&graph, &mut roots, report);
    bypass_typedefs(&mut graph, &roots, report);

    let before = roots.len();
    let mut seen = HashSet::new();
    roots.retain(|id| seen.insert(*id));
    report.stats.duplicate_roots_merged += before - roots.len();

    let mapped = roots
        .iter()
        .filter_map(|id| graph.node(*id).name.clone().map(|name| (*id, name)))
        .collect();

    tracing::debug!(roots = roots.len(), "normalized export graph");
    Normalized {
        graph,
        roots,
        plan: RenderPlan { mapped },
    }
}

/// Pass 1: point every reference to a declaration at its completion, and
/// replace declarations in `roots` the same way. A declaration without a
/// completion is dropped; references to it become void.
///
/// Running the pass a second time changes nothing.
pub fn complete_declarations(graph: &mut ExportGraph, roots: &mut Vec<NodeId>, report: &mut Report)
{
    let redirect: HashMap<NodeId, Option<NodeId>> = graph
        .iter()
        .filter(|(_, node)| node.incomplete)
        .map(|(id, _)| (id, resolve_completion(graph, id)))
        .collect();
    if redirect.is_empty() {
        return;
    }

    let cut = graph.rewrite_edges(|target| redirect.get(&target).copied().unwrap_or(Some(target)));
    report.stats.unresolved_references += cut;

    let original: HashSet<NodeId> = roots.iter().copied().collect();
    let stats = &mut report.stats;
    let mut rewritten = Vec::with_capacity(roots.len());
    for root in roots.drain(..) {
        match redirect.get(&root) {
            None => rewritten.push(root),
            Some(Some(completion)) if original.contains(completion) => stats.declarations_already_exported += 1,
            Some(Some(completion)) => {
                stats.declarations_completed += 1;
                rewritten.push(*completion);
            }
            Some(None) => stats.declarations_dropped += 1,
        }
    }
    *roots = rewritten;
}

fn resolve_completion(graph: &ExportGraph, id: NodeId) -> Option<NodeId>
{
    let mut current = id;
    let mut seen = HashSet::new();
    while graph.node(current).incomplete {
        if !seen.insert(current) {
            return None;
        }
        current = graph.node(current).completion?;
    }
    Some(current)
}

/// Pass 2. Returns the suppressed nodes.
fn suppress_unnamed(graph: &ExportGraph, roots: &mut Vec<NodeId>, report: &mut Report) -> HashSet<NodeId>
{
    let mut suppressed = HashSet::new();
    roots.retain(|id| {
        if graph.node(*id).name.is_some() {
            return true;
        }
        suppressed.insert(*id);
        false
    });
    report.stats.unnamed_suppressed += suppressed.len();
    suppressed
}

/// Pass 3a: name an anonymous struct/union/class/enumeration after its only
/// typedef and collapse the typedef into it.
///
/// Applies when the typedef is a root (the node takes the typedef's place) or
/// when the node itself was a root candidate before suppression. With two or
/// more typedefs, or none, the node keeps no name.
fn promote_anonymous(
    graph: &mut ExportGraph,
    index: &EntryIndex<'_>,
    candidates: &[NodeId],
    suppressed: &HashSet<NodeId>,
    roots: &mut Vec<NodeId>,
    report: &mut Report,
)
{
    let root_set: HashSet<NodeId> = roots.iter().copied().collect();
    let candidate_set: HashSet<NodeId> = candidates.iter().copied().collect();
    let mut replaced: HashMap<NodeId, NodeId> = HashMap::new();
    let mut restored: HashSet<NodeId> = HashSet::new();

    for id in graph.ids().collect::<Vec<_>>() {
        let node = graph.node(id);
        let promotable = node.kind.is_composite() || node.kind == Kind::Enumeration;
        if !promotable || node.name.is_some() || node.incomplete {
            continue;
        }
        let [typedef_offset] = index.typedefs_of(node.source_offset) else {
            continue;
        };
        let Some(name) = index.get(*typedef_offset).and_then(DebugEntry::name) else {
            continue;
        };

        let typedef = graph.id_of(*typedef_offset);
        let typedef_is_root = typedef.is_some_and(|typedef| root_set.contains(&typedef));
        if !typedef_is_root {
            if !candidate_set.contains(&id) {
                continue;
            }
            if suppressed.contains(&id) {
                restored.insert(id);
            }
        }

        tracing::trace!(node = %id, name, "promoting anonymous type");
        graph.node_mut(id).name = Some(name.to_string());
        if let Some(typedef) = typedef {
            replaced.insert(typedef, id);
        }
        report.stats.anonymous_promoted += 1;
    }

    if replaced.is_empty() && restored.is_empty() {
        return;
    }

    graph.rewrite_edges(|target| Some(replaced.get(&target).copied().unwrap_or(target)));

    let mut seen = HashSet::new();
    *roots = candidates
        .iter()
        .filter(|id| root_set.contains(id) || restored.contains(id))
        .map(|id| replaced.get(id).copied().unwrap_or(*id))
        .filter(|id| seen.insert(*id))
        .collect();
}

/// Pass 3b: a root typedef whose direct target is also a root adds nothing.
fn remove_redundant_typedefs(graph: &ExportGraph, roots: &mut Vec<NodeId>, report: &mut Report)
{
    let snapshot: HashSet<NodeId> = roots.iter().copied().collect();
    let before = roots.len();
    roots.retain(|id| match graph.node(*id).body {
        NodeBody::Typedef { target: Some(target) } => target == *id || !snapshot.contains(&target),
        _ => true,
    });
    report.stats.redundant_typedefs += before - roots.len();
}

/// Pass 3c: rewrite every reference to a non-root typedef to the first
/// non-typedef (or root typedef) at the end of its chain.
fn bypass_typedefs(graph: &mut ExportGraph, roots: &[NodeId], report: &mut Report)
{
    let root_set: HashSet<NodeId> = roots.iter().copied().collect();
    let resolved: HashMap<NodeId, Option<NodeId>> = graph
        .iter()
        .filter(|(id, node)| node.kind == Kind::Typedef && !root_set.contains(id))
        .map(|(id, _)| (id, resolve_typedef(graph, id, &root_set)))
        .collect();

    let mut bypassed = 0;
    let live = |id: NodeId| !resolved.contains_key(&id);
    let cut = graph.rewrite_edges_where(live, |target| match resolved.get(&target) {
        Some(resolution) => {
            bypassed += 1;
            *resolution
        }
        None => Some(target),
    });
    report.stats.typedefs_bypassed += bypassed;
    report.stats.unresolved_references += cut;
}

fn resolve_typedef(graph: &ExportGraph, id: NodeId, roots: &HashSet<NodeId>) -> Option<NodeId>
{
    let mut current = id;
    let mut seen = HashSet::new();
    loop {
        let node = graph.node(current);
        if node.kind != Kind::Typedef || (current != id && roots.contains(&current)) {
            return Some(current);
        }
        if !seen.insert(current) {
            tracing::debug!(typedef = %id, "typedef cycle");
            return None;
        }
        match node.body {
            NodeBody::Typedef { target } => current = target?,
            _ => return Some(current),
        }
    }
}

#[cfg(test)]
mod tests
{
    use gimli::constants::*;

    use super::*;
    use crate::entry::{CompileUnit, DebugInfo};
    use crate::graph::build_closure;
    use crate::types::EntryOffset;

    fn int(offset: u64) -> DebugEntry
    {
        DebugEntry::new(offset, DW_TAG_base_type)
            .with_name("int")
            .with_byte_size(4)
            .with_encoding(DW_ATE_signed)
    }

    fn run(info: &DebugInfo, roots: &[u64], include_unnamed: bool) -> (Normalized, Report)
    {
        let index = EntryIndex::new(info);
        let mut report = Report::new();
        let roots: Vec<EntryOffset> = roots.iter().copied().map(EntryOffset::new).collect();
        let closure = build_closure(&index, &roots, &mut report);
        let normalized = normalize(closure, &index, include_unnamed, &mut report);
        (normalized, report)
    }

    fn root_names(normalized: &Normalized) -> Vec<Option<&str>>
    {
        normalized
            .roots
            .iter()
            .map(|id| normalized.graph.node(*id).name.as_deref())
            .collect()
    }

    #[test]
    fn test_unnamed_root_is_suppressed()
    {
        let info = DebugInfo::from_units(vec![CompileUnit::new(vec![
            int(0x10),
            DebugEntry::new(0x20, DW_TAG_structure_type)
                .with_byte_size(4)
                .with_child(DebugEntry::new(0x21, DW_TAG_member).with_name("a").with_type(0x10)),
        ])]);

        let (normalized, report) = run(&info, &[0x20], false);
        assert!(normalized.roots.is_empty());
        assert_eq!(report.stats.unnamed_suppressed, 1);

        let (normalized, _) = run(&info, &[0x20], true);
        assert_eq!(normalized.roots.len(), 1);
        assert!(!normalized.plan.is_mapped(normalized.roots[0]));
    }

    #[test]
    fn test_root_typedef_of_root_is_redundant()
    {
        let info = DebugInfo::from_units(vec![CompileUnit::new(vec![
            int(0x10),
            DebugEntry::new(0x20, DW_TAG_structure_type)
                .with_name("Point")
                .with_byte_size(4)
                .with_child(DebugEntry::new(0x21, DW_TAG_member).with_name("x").with_type(0x10)),
            DebugEntry::new(0x30, DW_TAG_typedef).with_name("point_t").with_type(0x20),
        ])]);

        let (normalized, report) = run(&info, &[0x20, 0x30], false);
        assert_eq!(root_names(&normalized), vec![Some("Point")]);
        assert_eq!(report.stats.redundant_typedefs, 1);
    }

    #[test]
    fn test_typedef_cycle_resolves_to_void()
    {
        let info = DebugInfo::from_units(vec![CompileUnit::new(vec![
            DebugEntry::new(0x10, DW_TAG_typedef).with_name("a_t").with_type(0x20),
            DebugEntry::new(0x20, DW_TAG_typedef).with_name("b_t").with_type(0x10),
            DebugEntry::new(0x30, DW_TAG_variable)
                .with_name("v")
                .with_type(0x10),
        ])]);

        let (normalized, report) = run(&info, &[0x30], false);
        let variable = normalized.graph.node(normalized.roots[0]);
        assert_eq!(variable.body, NodeBody::Variable { ty: None, location: None });
        assert_eq!(report.stats.unresolved_references, 1);
    }
}
