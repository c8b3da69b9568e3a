//! Lookups over the whole debug-info forest.
//!
//! The index is built once and answers the questions later stages ask about
//! entries outside the selected set: what lives at an offset, which entry
//! completes a forward declaration, and which typedefs name an anonymous type.

use std::collections::HashMap;

use gimli::constants;

use crate::classify::{classify, Kind};
use crate::entry::{DebugEntry, DebugInfo};
use crate::types::EntryOffset;

/// Separator between namespace components in scoped names.
pub const SCOPE_SEPARATOR: &str = "::";

/// An entry reachable as a top-level declaration.
#[derive(Debug, Clone)]
pub struct TopLevel<'a>
{
    pub entry: &'a DebugEntry,
    pub kind: Kind,
    /// Name qualified with enclosing namespaces, e.g. `net::Packet`.
    pub scoped_name: Option<String>,
}

/// Offset-keyed view of a [`DebugInfo`].
#[derive(Debug)]
pub struct EntryIndex<'a>
{
    entries: HashMap<EntryOffset, &'a DebugEntry>,
    top_level: Vec<TopLevel<'a>>,
    completions: HashMap<(Kind, &'a str), EntryOffset>,
    typedef_referrers: HashMap<EntryOffset, Vec<EntryOffset>>,
    definitions: HashMap<EntryOffset, EntryOffset>,
}

impl<'a> EntryIndex<'a>
{
    pub fn new(info: &'a DebugInfo) -> Self
    {
        let mut index = Self {
            entries: HashMap::new(),
            top_level: Vec::new(),
            completions: HashMap::new(),
            typedef_referrers: HashMap::new(),
            definitions: HashMap::new(),
        };

        for unit in &info.units {
            for entry in &unit.entries {
                index.insert_recursive(entry);
            }
        }
        for unit in &info.units {
            index.collect_top_level(&unit.entries, &mut Vec::new());
        }
        index.collect_completions();

        tracing::debug!(
            entries = index.entries.len(),
            top_level = index.top_level.len(),
            "indexed debug info"
        );
        index
    }

    fn insert_recursive(&mut self, entry: &'a DebugEntry)
    {
        self.entries.insert(entry.offset, entry);
        if entry.tag == constants::DW_TAG_typedef {
            if let Some(target) = entry.attrs.type_ref {
                self.typedef_referrers.entry(target).or_default().push(entry.offset);
            }
        }
        if let Some(declaration) = entry.attrs.specification {
            self.definitions.entry(declaration).or_insert(entry.offset);
        }
        for child in &entry.children {
            self.insert_recursive(child);
        }
    }

    fn collect_top_level(&mut self, entries: &'a [DebugEntry], scope: &mut Vec<&'a str>)
    {
        for entry in entries {
            if entry.tag == constants::DW_TAG_namespace {
                scope.push(entry.name().unwrap_or_default());
                self.collect_top_level(&entry.children, scope);
                scope.pop();
                continue;
            }

            let kind = classify(entry);
            let scoped_name = self.effective_name(entry).map(|name| {
                if scope.is_empty() {
                    name.to_string()
                } else {
                    format!("{}{SCOPE_SEPARATOR}{name}", scope.join(SCOPE_SEPARATOR))
                }
            });
            self.top_level.push(TopLevel {
                entry,
                kind,
                scoped_name,
            });
        }
    }

    fn collect_completions(&mut self)
    {
        let mut completions = HashMap::new();
        for top in &self.top_level {
            if !top.kind.is_completable() || top.entry.is_declaration() {
                continue;
            }
            let Some(name) = self.effective_name(top.entry) else {
                continue;
            };
            completions.entry((top.kind, name)).or_insert(top.entry.offset);
        }
        self.completions = completions;
    }

    /// Entry at `offset`.
    pub fn get(&self, offset: EntryOffset) -> Option<&'a DebugEntry>
    {
        self.entries.get(&offset).copied()
    }

    /// Top-level entries in traversal order, namespaces flattened.
    pub fn top_level(&self) -> &[TopLevel<'a>]
    {
        &self.top_level
    }

    /// `DW_AT_name`, falling back to the name of the `DW_AT_specification`
    /// target.
    pub fn effective_name(&self, entry: &'a DebugEntry) -> Option<&'a str>
    {
        entry.name().or_else(|| {
            entry
                .attrs
                .specification
                .and_then(|declaration| self.get(declaration))
                .and_then(DebugEntry::name)
        })
    }

    /// Defining entry for a declaration: the entry whose `DW_AT_specification`
    /// points at it, else the first top-level definition with the same kind
    /// and name.
    pub fn completion_of(&self, entry: &'a DebugEntry) -> Option<EntryOffset>
    {
        let kind = classify(entry);
        if let Some(definition) = self.definitions.get(&entry.offset) {
            return Some(*definition);
        }
        let name = self.effective_name(entry)?;
        self.completions
            .get(&(kind, name))
            .copied()
            .filter(|offset| *offset != entry.offset)
    }

    /// Typedefs whose `DW_AT_type` is `target`, in section order.
    pub fn typedefs_of(&self, target: EntryOffset) -> &[EntryOffset]
    {
        self.typedef_referrers.get(&target).map_or(&[], Vec::as_slice)
    }

    /// Follow qualifiers until a non-qualifier entry. `None` means void, a
    /// dangling reference or a qualifier loop.
    pub fn strip_qualifiers(&self, offset: EntryOffset) -> Option<&'a DebugEntry>
    {
        let mut current = self.get(offset)?;
        let mut hops = 0;
        while classify(current) == Kind::Qualifier {
            hops += 1;
            if hops > self.entries.len() {
                return None;
            }
            current = self.get(current.attrs.type_ref?)?;
        }
        Some(current)
    }

    /// Name an unnamed struct/union/class/enumeration would take from its
    /// only typedef.
    pub fn unique_typedef_name(&self, entry: &'a DebugEntry) -> Option<&'a str>
    {
        match self.typedefs_of(entry.offset) {
            [only] => self.get(*only).and_then(DebugEntry::name),
            _ => None,
        }
    }
}
