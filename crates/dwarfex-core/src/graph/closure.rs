//! # Dependency Closure Builder
//!
//! Breadth-first exploration from the selected roots. Every entry reachable
//! through a member, parameter, return, pointee, element, underlying or
//! typedef edge becomes exactly one [`ExportNode`]. Nodes are keyed by entry
//! offset: a reference to an offset that already has a node closes the edge
//! without expanding it again, which is what terminates cyclic graphs.
//!
//! Qualifiers are looked through while resolving an edge and never become
//! nodes. Forward declarations also pull in their completion so that the
//! completing definition's dependencies are part of the closure.

use std::collections::{HashSet, VecDeque};

use gimli::constants;

use crate::classify::{classify, BaseEncoding, ExportClass, Kind};
use crate::entry::{Attributes, DebugEntry};
use crate::graph::{Enumerator, ExportGraph, ExportNode, Member, NodeBody, NodeId, Parameter};
use crate::index::EntryIndex;
use crate::report::Report;
use crate::types::EntryOffset;

/// Longest qualifier chain followed before giving up.
const MAX_QUALIFIER_DEPTH: usize = 32;

/// Result of the closure walk.
#[derive(Debug, Clone)]
pub struct Closure
{
    pub graph: ExportGraph,
    /// Root candidates: the selected entries first, then every discovered
    /// node of a default root class, in discovery order.
    pub roots: Vec<NodeId>,
}

/// Build the closure of `roots` over the indexed debug info.
pub fn build_closure(index: &EntryIndex<'_>, roots: &[EntryOffset], report: &mut Report) -> Closure
{
    let mut builder = ClosureBuilder {
        index,
        graph: ExportGraph::new(),
        queue: VecDeque::new(),
        unresolved: 0,
    };

    let mut selected = Vec::new();
    for offset in roots {
        let Some(entry) = index.get(*offset) else {
            tracing::warn!(%offset, "selected entry is not in the debug info");
            continue;
        };
        if ExportClass::of(classify(entry)).is_none() {
            tracing::debug!(%offset, tag = %entry.tag, "selected entry is not exportable");
            continue;
        }
        let id = builder.intern(entry);
        if !selected.contains(&id) {
            selected.push(id);
        }
    }

    while let Some(id) = builder.queue.pop_front() {
        builder.expand(id);
    }

    let ClosureBuilder { graph, unresolved, .. } = builder;

    let mut candidates = selected.clone();
    let mut seen: HashSet<NodeId> = selected.iter().copied().collect();
    let mut excluded = 0;
    for (id, node) in graph.iter() {
        if seen.contains(&id) {
            continue;
        }
        if node.kind.is_default_root() {
            seen.insert(id);
            candidates.push(id);
        } else if ExportClass::of(node.kind).is_some() {
            excluded += 1;
        }
    }

    let stats = &mut report.stats;
    stats.dependencies_added += candidates.len() - selected.len();
    stats.dependencies_excluded_by_class += excluded;
    stats.unresolved_references += unresolved;
    tracing::debug!(
        nodes = graph.len(),
        candidates = candidates.len(),
        unresolved,
        "built dependency closure"
    );

    Closure {
        graph,
        roots: candidates,
    }
}

struct ClosureBuilder<'i, 'a>
{
    index: &'i EntryIndex<'a>,
    graph: ExportGraph,
    queue: VecDeque<NodeId>,
    unresolved: usize,
}

impl<'a> ClosureBuilder<'_, 'a>
{
    /// Node for `entry`, allocating and queueing it on first sight.
    fn intern(&mut self, entry: &'a DebugEntry) -> NodeId
    {
        if let Some(id) = self.graph.id_of(entry.offset) {
            return id;
        }

        let kind = classify(entry);
        let mut node = ExportNode::new(kind, entry.offset);
        node.name = self.index.effective_name(entry).map(str::to_string);
        node.byte_width = entry_width(&entry.attrs);
        node.decl = entry.attrs.decl.clone().or_else(|| {
            entry
                .attrs
                .specification
                .and_then(|declaration| self.index.get(declaration))
                .and_then(|declaration| declaration.attrs.decl.clone())
        });
        node.incomplete = kind.is_completable() && entry.is_declaration();

        let id = self.graph.insert(node);
        self.queue.push_back(id);
        id
    }

    /// Resolve a type reference, looking through qualifiers. `None` input is
    /// void; a dangling offset or an unknown tag counts as unresolved.
    fn reference(&mut self, target: Option<EntryOffset>) -> Option<NodeId>
    {
        let mut offset = target?;
        for _ in 0..MAX_QUALIFIER_DEPTH {
            let Some(entry) = self.index.get(offset) else {
                tracing::debug!(%offset, "dangling type reference");
                self.unresolved += 1;
                return None;
            };
            match classify(entry) {
                Kind::Qualifier => offset = entry.attrs.type_ref?,
                Kind::Unknown => {
                    tracing::debug!(%offset, tag = %entry.tag, "reference to unsupported entry");
                    self.unresolved += 1;
                    return None;
                }
                _ => return Some(self.intern(entry)),
            }
        }
        self.unresolved += 1;
        None
    }

    fn expand(&mut self, id: NodeId)
    {
        let node = self.graph.node(id);
        let (kind, offset, incomplete) = (node.kind, node.source_offset, node.incomplete);
        let Some(entry) = self.index.get(offset) else {
            return;
        };

        let body = match kind {
            Kind::Base(_) => NodeBody::Base,
            Kind::Typedef => NodeBody::Typedef {
                target: self.reference(entry.attrs.type_ref),
            },
            Kind::Structure | Kind::Union | Kind::Class => NodeBody::Composite {
                members: self.members(entry),
            },
            Kind::Enumeration => NodeBody::Enumeration {
                encoding: entry.attrs.encoding.and_then(BaseEncoding::from_dwarf),
                underlying: self.reference(entry.attrs.type_ref),
                enumerators: enumerators(entry),
            },
            Kind::Pointer | Kind::Reference => NodeBody::Pointer {
                target: self.reference(entry.attrs.type_ref),
            },
            Kind::Array => NodeBody::Array {
                dimensions: dimensions(entry),
                stride: entry.attrs.byte_stride.or_else(|| {
                    subranges(entry).find_map(|subrange| subrange.attrs.byte_stride)
                }),
                element: self.reference(entry.attrs.type_ref),
            },
            Kind::Subroutine => NodeBody::Subroutine {
                ret: self.reference(entry.attrs.type_ref),
                parameters: self.parameters(entry),
            },
            Kind::Variable => {
                let specification = entry.attrs.specification.and_then(|declaration| self.index.get(declaration));
                let type_ref = entry
                    .attrs
                    .type_ref
                    .or_else(|| specification.and_then(|declaration| declaration.attrs.type_ref));
                NodeBody::Variable {
                    ty: self.reference(type_ref),
                    location: entry.attrs.location,
                }
            }
            Kind::Unspecified | Kind::Qualifier | Kind::Unknown => NodeBody::Unspecified,
        };

        let completion = if incomplete {
            self.index
                .completion_of(entry)
                .and_then(|definition| self.index.get(definition))
                .map(|definition| self.intern(definition))
        } else {
            None
        };

        let node = self.graph.node_mut(id);
        node.body = body;
        node.completion = completion;
    }

    fn members(&mut self, entry: &'a DebugEntry) -> Vec<Member>
    {
        entry
            .children
            .iter()
            .filter(|child| child.tag == constants::DW_TAG_member && !child.is_declaration())
            .map(|child| {
                let (byte_offset, bit_offset) = member_offsets(&child.attrs);
                Member {
                    identifier: child.name().map(str::to_string),
                    ty: self.reference(child.attrs.type_ref),
                    byte_size: entry_width(&child.attrs),
                    bit_size: child.attrs.bit_size,
                    byte_offset,
                    bit_offset,
                    decl: child.attrs.decl.clone(),
                    comments: Default::default(),
                }
            })
            .collect()
    }

    fn parameters(&mut self, entry: &'a DebugEntry) -> Vec<Parameter>
    {
        entry
            .children
            .iter()
            .filter(|child| child.tag == constants::DW_TAG_formal_parameter)
            .map(|child| Parameter {
                name: child.name().map(str::to_string),
                ty: self.reference(child.attrs.type_ref),
            })
            .collect()
    }
}

/// Byte size from `DW_AT_byte_size`, else `DW_AT_bit_size` rounded up.
fn entry_width(attrs: &Attributes) -> Option<u64>
{
    attrs.byte_size.or_else(|| attrs.bit_size.map(|bits| bits.div_ceil(8)))
}

/// Byte offset and non-zero bit offset of a member.
fn member_offsets(attrs: &Attributes) -> (Option<u64>, Option<u64>)
{
    match (attrs.data_member_location, attrs.data_bit_offset) {
        (Some(location), _) => (Some(location), attrs.bit_offset.filter(|bits| *bits != 0)),
        (None, Some(bits)) => (Some(bits / 8), Some(bits % 8).filter(|bits| *bits != 0)),
        (None, None) => (None, None),
    }
}

fn enumerators(entry: &DebugEntry) -> Vec<Enumerator>
{
    entry
        .children
        .iter()
        .filter(|child| child.tag == constants::DW_TAG_enumerator)
        .map(|child| Enumerator {
            name: child.name().unwrap_or_default().to_string(),
            value: child.attrs.const_value.unwrap_or_default(),
            decl: child.attrs.decl.clone(),
            comments: Default::default(),
        })
        .collect()
}

fn subranges(entry: &DebugEntry) -> impl Iterator<Item = &DebugEntry>
{
    entry
        .children
        .iter()
        .filter(|child| child.tag == constants::DW_TAG_subrange_type)
}

/// Element count per dimension: `DW_AT_count`, else `upper - lower + 1`
/// with a default lower bound of zero.
fn dimensions(entry: &DebugEntry) -> Vec<Option<u64>>
{
    subranges(entry)
        .map(|subrange| {
            if let Some(count) = subrange.attrs.count {
                return Some(count);
            }
            let upper = subrange.attrs.upper_bound?;
            let lower = subrange.attrs.lower_bound.unwrap_or(0);
            upper
                .checked_sub(lower)
                .and_then(|span| span.checked_add(1))
                .and_then(|count| u64::try_from(count).ok())
        })
        .collect()
}
