//! # Output Records
//!
//! Renders the normalized graph into the JSON schema consumed downstream.
//! Every edge either nests the target's record inline or, when the target is
//! a named root, refers to it by name through `mapping`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::{BaseEncoding, DataType};
use crate::comments::Comments;
use crate::entry::DebugInfo;
use crate::graph::{ExportGraph, ExportNode, Member, NodeBody, NodeId, Parameter};
use crate::normalize::{Normalized, RenderPlan};
use crate::report::Report;

/// One exported type description. Absent fields are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record
{
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Absent only on members that refer to their type through `mapping`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datawidth: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<BaseEncoding>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<Box<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumerators: Option<Vec<EnumeratorRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<Option<u64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_location: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, rename = "commentBefore", skip_serializing_if = "Option::is_none")]
    pub comment_before: Option<String>,
    #[serde(default, rename = "commentAfter", skip_serializing_if = "Option::is_none")]
    pub comment_after: Option<String>,
}

impl Record
{
    fn new(datatype: DataType) -> Self
    {
        Self {
            datatype: Some(datatype),
            ..Self::default()
        }
    }

    /// Set `comment`, or `commentBefore`/`commentAfter` when both exist.
    pub fn set_comments(&mut self, comments: &Comments)
    {
        match (&comments.before, &comments.after) {
            (Some(before), Some(after)) => {
                self.comment_before = Some(before.clone());
                self.comment_after = Some(after.clone());
            }
            (Some(only), None) | (None, Some(only)) => self.comment = Some(only.clone()),
            (None, None) => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumeratorRecord
{
    pub value: i64,
    pub representation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, rename = "commentBefore", skip_serializing_if = "Option::is_none")]
    pub comment_before: Option<String>,
    #[serde(default, rename = "commentAfter", skip_serializing_if = "Option::is_none")]
    pub comment_after: Option<String>,
}

/// Render every root of `normalized`, dropping records identical to an
/// earlier one.
pub fn render(normalized: &Normalized, info: &DebugInfo, report: &mut Report) -> Vec<Record>
{
    let mut renderer = Renderer {
        graph: &normalized.graph,
        plan: &normalized.plan,
        info,
        stack: Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(normalized.roots.len());
    for root in &normalized.roots {
        let record = renderer.root(*root);
        if seen.contains(&record) {
            report.stats.records_deduplicated += 1;
            continue;
        }
        seen.insert(record.clone());
        records.push(record);
    }

    for record in &records {
        if let Some(datatype) = record.datatype {
            *report.stats.exported.entry(datatype).or_default() += 1;
        }
    }
    records
}

struct Renderer<'g>
{
    graph: &'g ExportGraph,
    plan: &'g RenderPlan,
    info: &'g DebugInfo,
    /// Nodes being rendered inline, to cut cycles of unnamed types.
    stack: Vec<NodeId>,
}

impl Renderer<'_>
{
    fn root(&mut self, id: NodeId) -> Record
    {
        let graph = self.graph;
        let node = graph.node(id);
        let mut record = self.full(id, true);
        record.set_comments(&node.comments);
        record
    }

    /// Record for an edge nested under `type`.
    fn nested(&mut self, id: NodeId) -> Record
    {
        match self.plan.mapping(id) {
            Some(name) => self.stub(id, Some(name)),
            None => self.inline(id),
        }
    }

    fn inline(&mut self, id: NodeId) -> Record
    {
        if self.stack.contains(&id) {
            let name = self.graph.node(id).name.as_deref();
            return self.stub(id, name);
        }
        self.stack.push(id);
        let record = self.full(id, false);
        self.stack.pop();
        record
    }

    /// Reference to a record rendered elsewhere.
    fn stub(&self, id: NodeId, mapping: Option<&str>) -> Record
    {
        let node = self.graph.node(id);
        Record {
            datatype: node.kind.data_type(),
            datawidth: self.graph.width_of(id),
            mapping: mapping.map(str::to_string),
            ..Record::default()
        }
    }

    /// `mapping` when the target is a named root, else an inline `type`.
    fn hoist(&mut self, record: &mut Record, target: Option<NodeId>)
    {
        let Some(target) = target else {
            return;
        };
        match self.plan.mapping(target) {
            Some(name) => record.mapping = Some(name.to_string()),
            None => record.ty = Some(Box::new(self.inline(target))),
        }
    }

    fn full(&mut self, id: NodeId, is_root: bool) -> Record
    {
        let graph = self.graph;
        let node: &ExportNode = graph.node(id);
        let Some(datatype) = node.kind.data_type() else {
            return Record::default();
        };
        let mut record = Record::new(datatype);

        match &node.body {
            NodeBody::Base => {
                if is_root {
                    record.name.clone_from(&node.name);
                }
                record.datawidth = node.byte_width;
            }
            NodeBody::Unspecified => record.name.clone_from(&node.name),
            NodeBody::Typedef { target } => {
                record.name.clone_from(&node.name);
                self.hoist(&mut record, *target);
            }
            NodeBody::Composite { members } => {
                record.name.clone_from(&node.name);
                record.datawidth = node.byte_width;
                record.members = Some(members.iter().map(|member| self.member(member)).collect());
            }
            NodeBody::Enumeration {
                encoding,
                underlying,
                enumerators,
            } => {
                record.name.clone_from(&node.name);
                record.datawidth = node.byte_width;
                record.encoding = *encoding;
                if record.datawidth.is_none() || record.encoding.is_none() {
                    record.ty = underlying.map(|underlying| Box::new(self.nested(underlying)));
                }
                record.enumerators = Some(
                    enumerators
                        .iter()
                        .map(|enumerator| {
                            let mut rendered = Record::default();
                            rendered.set_comments(&enumerator.comments);
                            EnumeratorRecord {
                                value: enumerator.value,
                                representation: enumerator.name.clone(),
                                comment: rendered.comment,
                                comment_before: rendered.comment_before,
                                comment_after: rendered.comment_after,
                            }
                        })
                        .collect(),
                );
            }
            NodeBody::Pointer { target } => {
                record.datawidth = node.byte_width;
                self.hoist(&mut record, *target);
            }
            NodeBody::Array {
                dimensions,
                stride,
                element,
            } => {
                record.dimensions = Some(dimensions.clone());
                record.stride = stride.filter(|stride| *stride != 0);
                record.ty = element.map(|element| Box::new(self.nested(element)));
            }
            NodeBody::Subroutine { ret, parameters } => {
                record.name.clone_from(&node.name);
                record.ty = ret.map(|ret| Box::new(self.nested(ret)));
                record.parameters = Some(parameters.iter().map(|parameter| self.parameter(parameter)).collect());
            }
            NodeBody::Variable { ty, location } => {
                record.name.clone_from(&node.name);
                record.ty = ty.map(|ty| Box::new(self.nested(ty)));
                record.location = *location;
                record.physical_location = location.and_then(|address| self.info.physical_address(address));
            }
        }
        record
    }

    fn member(&mut self, member: &Member) -> Record
    {
        let mut record = match member.ty {
            Some(ty) => match self.plan.mapping(ty) {
                Some(name) => Record {
                    mapping: Some(name.to_string()),
                    ..Record::default()
                },
                None => self.inline(ty),
            },
            None => Record::default(),
        };

        record.identifier.clone_from(&member.identifier);
        record.datawidth = member.byte_size.or_else(|| member.ty.and_then(|ty| self.graph.width_of(ty)));
        record.bit_size = member.bit_size.filter(|bits| *bits != 0);
        record.byte_offset = member.byte_offset;
        record.bit_offset = member.bit_offset.filter(|bits| *bits != 0);
        record.set_comments(&member.comments);
        record
    }

    fn parameter(&mut self, parameter: &Parameter) -> Record
    {
        Record {
            name: parameter.name.clone(),
            ty: parameter.ty.map(|ty| Box::new(self.nested(ty))),
            ..Record::default()
        }
    }
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_record_skips_absent_fields()
    {
        let record = Record {
            identifier: Some("x".to_string()),
            datatype: Some(DataType::Base(BaseEncoding::Int)),
            datawidth: Some(4),
            ..Record::default()
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"identifier": "x", "datatype": "int", "datawidth": 4})
        );
    }

    #[test]
    fn test_both_comments_use_distinct_fields()
    {
        let mut record = Record::default();
        record.set_comments(&Comments {
            before: Some("above".to_string()),
            after: Some("beside".to_string()),
        });
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"commentBefore": "above", "commentAfter": "beside"})
        );

        let mut record = Record::default();
        record.set_comments(&Comments {
            before: None,
            after: Some("beside".to_string()),
        });
        assert_eq!(record.comment.as_deref(), Some("beside"));
    }

    #[test]
    fn test_array_dimensions_keep_unknown_counts()
    {
        let record = Record {
            datatype: Some(DataType::Array),
            dimensions: Some(vec![Some(4), None]),
            ..Record::default()
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"datatype": "array", "dimensions": [4, null]})
        );
    }
}
