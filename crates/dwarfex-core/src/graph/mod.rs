//! # Export Graph
//!
//! Arena of [`ExportNode`]s keyed by the offset of the entry each one was
//! built from. Edges are [`NodeId`] indices into the arena, so cyclic type
//! graphs (a list node pointing at its own type) are plain index cycles and
//! never owning ones.
//!
//! The graph is built by the [`closure`] builder, rewritten in place by the
//! [`normalize`](crate::normalize) passes and finally read by the emitter.
//! Whether an edge renders inline or as a `mapping` is not stored on the edge:
//! it is decided by the [`RenderPlan`](crate::normalize::RenderPlan) once the
//! root set is frozen.

pub mod closure;

use std::collections::HashMap;
use std::fmt;

use crate::classify::{BaseEncoding, Kind};
use crate::comments::Comments;
use crate::types::{EntryOffset, SourceLocation};

pub use closure::{build_closure, Closure};

/// Index of a node in an [`ExportGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId
{
    pub const fn index(self) -> usize
    {
        self.0
    }
}

impl fmt::Display for NodeId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "#{}", self.0)
    }
}

/// A struct/union/class member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Member
{
    pub identifier: Option<String>,
    pub ty: Option<NodeId>,
    /// Size of the member itself (`DW_AT_byte_size` or rounded-up `DW_AT_bit_size`).
    pub byte_size: Option<u64>,
    pub bit_size: Option<u64>,
    pub byte_offset: Option<u64>,
    /// Omitted when zero.
    pub bit_offset: Option<u64>,
    pub decl: Option<SourceLocation>,
    pub comments: Comments,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumerator
{
    pub name: String,
    pub value: i64,
    pub decl: Option<SourceLocation>,
    pub comments: Comments,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter
{
    pub name: Option<String>,
    pub ty: Option<NodeId>,
}

/// Kind-specific content of a node. `None` edges are void or unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody
{
    Base,
    Unspecified,
    Typedef
    {
        target: Option<NodeId>,
    },
    /// Struct, union or class.
    Composite
    {
        members: Vec<Member>,
    },
    Enumeration
    {
        encoding: Option<BaseEncoding>,
        underlying: Option<NodeId>,
        enumerators: Vec<Enumerator>,
    },
    /// Pointer or reference.
    Pointer
    {
        target: Option<NodeId>,
    },
    Array
    {
        dimensions: Vec<Option<u64>>,
        stride: Option<u64>,
        element: Option<NodeId>,
    },
    Subroutine
    {
        ret: Option<NodeId>,
        parameters: Vec<Parameter>,
    },
    Variable
    {
        ty: Option<NodeId>,
        location: Option<u64>,
    },
}

impl NodeBody
{
    /// Body of a node that has not been expanded yet.
    pub fn empty(kind: Kind) -> Self
    {
        match kind {
            Kind::Base(_) => NodeBody::Base,
            Kind::Typedef => NodeBody::Typedef { target: None },
            Kind::Structure | Kind::Union | Kind::Class => NodeBody::Composite { members: Vec::new() },
            Kind::Enumeration => NodeBody::Enumeration {
                encoding: None,
                underlying: None,
                enumerators: Vec::new(),
            },
            Kind::Pointer | Kind::Reference => NodeBody::Pointer { target: None },
            Kind::Array => NodeBody::Array {
                dimensions: Vec::new(),
                stride: None,
                element: None,
            },
            Kind::Subroutine => NodeBody::Subroutine {
                ret: None,
                parameters: Vec::new(),
            },
            Kind::Variable => NodeBody::Variable { ty: None, location: None },
            Kind::Unspecified | Kind::Qualifier | Kind::Unknown => NodeBody::Unspecified,
        }
    }

    /// Visit every outgoing edge slot.
    pub fn for_each_edge_mut(&mut self, mut f: impl FnMut(&mut Option<NodeId>))
    {
        match self {
            NodeBody::Base | NodeBody::Unspecified => {}
            NodeBody::Typedef { target } | NodeBody::Pointer { target } => f(target),
            NodeBody::Composite { members } => members.iter_mut().for_each(|member| f(&mut member.ty)),
            NodeBody::Enumeration { underlying, .. } => f(underlying),
            NodeBody::Array { element, .. } => f(element),
            NodeBody::Subroutine { ret, parameters } => {
                f(ret);
                parameters.iter_mut().for_each(|parameter| f(&mut parameter.ty));
            }
            NodeBody::Variable { ty, .. } => f(ty),
        }
    }

    /// Outgoing edges that point somewhere.
    pub fn edges(&self) -> Vec<NodeId>
    {
        let slots: Vec<Option<NodeId>> = match self {
            NodeBody::Base | NodeBody::Unspecified => Vec::new(),
            NodeBody::Typedef { target } | NodeBody::Pointer { target } => vec![*target],
            NodeBody::Composite { members } => members.iter().map(|member| member.ty).collect(),
            NodeBody::Enumeration { underlying, .. } => vec![*underlying],
            NodeBody::Array { element, .. } => vec![*element],
            NodeBody::Subroutine { ret, parameters } => std::iter::once(*ret)
                .chain(parameters.iter().map(|parameter| parameter.ty))
                .collect(),
            NodeBody::Variable { ty, .. } => vec![*ty],
        };
        slots.into_iter().flatten().collect()
    }
}

/// One type or variable candidate for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportNode
{
    pub kind: Kind,
    /// Assigned from the entry, or later by anonymous promotion.
    pub name: Option<String>,
    pub byte_width: Option<u64>,
    pub source_offset: EntryOffset,
    pub decl: Option<SourceLocation>,
    pub body: NodeBody,
    /// A forward declaration (`DW_AT_declaration`).
    pub incomplete: bool,
    /// The defining node, for incomplete nodes that have one.
    pub completion: Option<NodeId>,
    pub comments: Comments,
}

impl ExportNode
{
    pub fn new(kind: Kind, source_offset: EntryOffset) -> Self
    {
        Self {
            kind,
            name: None,
            byte_width: None,
            source_offset,
            decl: None,
            body: NodeBody::empty(kind),
            incomplete: false,
            completion: None,
            comments: Comments::default(),
        }
    }
}

/// Offset-keyed arena of export nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportGraph
{
    nodes: Vec<ExportNode>,
    by_offset: HashMap<EntryOffset, NodeId>,
}

impl ExportGraph
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add a node. A node for the same offset must not exist yet.
    pub fn insert(&mut self, node: ExportNode) -> NodeId
    {
        let id = NodeId(self.nodes.len());
        self.by_offset.insert(node.source_offset, id);
        self.nodes.push(node);
        id
    }

    pub fn id_of(&self, offset: EntryOffset) -> Option<NodeId>
    {
        self.by_offset.get(&offset).copied()
    }

    pub fn node(&self, id: NodeId) -> &ExportNode
    {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ExportNode
    {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize
    {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.nodes.is_empty()
    }

    /// Nodes in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ExportNode)>
    {
        self.nodes.iter().enumerate().map(|(index, node)| (NodeId(index), node))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId>
    {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Rewrite every edge in the graph. Returns how many edges `f` cut
    /// (mapped a target to `None`).
    pub fn rewrite_edges(&mut self, f: impl FnMut(NodeId) -> Option<NodeId>) -> usize
    {
        self.rewrite_edges_where(|_| true, f)
    }

    /// Like [`rewrite_edges`](Self::rewrite_edges), limited to the outgoing
    /// edges of nodes accepted by `source`.
    pub fn rewrite_edges_where(
        &mut self,
        mut source: impl FnMut(NodeId) -> bool,
        mut f: impl FnMut(NodeId) -> Option<NodeId>,
    ) -> usize
    {
        let mut cut = 0;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if !source(NodeId(index)) {
                continue;
            }
            node.body.for_each_edge_mut(|edge| {
                if let Some(target) = *edge {
                    *edge = f(target);
                    if edge.is_none() {
                        cut += 1;
                    }
                }
            });
        }
        cut
    }

    /// Size in bytes of a node, derived through typedefs, arrays and
    /// enumeration underlying types when the node has no size of its own.
    pub fn width_of(&self, id: NodeId) -> Option<u64>
    {
        self.width_bounded(id, 0)
    }

    fn width_bounded(&self, id: NodeId, depth: usize) -> Option<u64>
    {
        if depth > MAX_WIDTH_DEPTH {
            return None;
        }
        let node = self.node(id);
        if let Some(width) = node.byte_width {
            return Some(width);
        }
        match &node.body {
            NodeBody::Typedef { target } => self.width_bounded((*target)?, depth + 1),
            NodeBody::Enumeration { underlying, .. } => self.width_bounded((*underlying)?, depth + 1),
            NodeBody::Array {
                dimensions,
                stride,
                element,
            } => {
                let count = dimensions.iter().try_fold(1u64, |acc, dimension| acc.checked_mul((*dimension)?))?;
                let element_width = match stride {
                    Some(stride) => *stride,
                    None => self.width_bounded((*element)?, depth + 1)?,
                };
                count.checked_mul(element_width)
            }
            _ => None,
        }
    }
}

const MAX_WIDTH_DEPTH: usize = 32;
