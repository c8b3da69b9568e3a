//! # Selection Filter
//!
//! Turns the user's request into the ordered list of root offsets the closure
//! starts from.

use std::collections::HashSet;

use crate::classify::{classify, ExportClass, Kind};
use crate::index::{EntryIndex, TopLevel};
use crate::report::{Report, Warning};
use crate::types::EntryOffset;

/// What to export. Exactly one mode is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode
{
    /// Every top-level base, unspecified, enumeration, struct/union/class,
    /// subroutine, typedef and variable entry.
    All,
    /// Every top-level entry whose class is listed.
    ByClass(Vec<ExportClass>),
    /// The first top-level entry matching each name.
    ByName(Vec<String>),
}

impl Default for SelectionMode
{
    fn default() -> Self
    {
        SelectionMode::ByClass(ExportClass::DEFAULT.to_vec())
    }
}

/// Pick the root entries for `mode`, in traversal order for `All`/`ByClass`
/// and request order for `ByName`. Missing names are reported, not fatal.
///
/// With `unwrap_typedefs`, a name that selects a typedef of a named
/// struct/union/class selects that type instead.
pub fn select(index: &EntryIndex<'_>, mode: &SelectionMode, unwrap_typedefs: bool, report: &mut Report) -> Vec<EntryOffset>
{
    let mut selected = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |offset: EntryOffset| {
        if seen.insert(offset) {
            selected.push(offset);
        }
    };

    match mode {
        SelectionMode::All => {
            for top in index.top_level() {
                if ExportClass::of(top.kind).is_some() {
                    push(top.entry.offset);
                }
            }
        }
        SelectionMode::ByClass(classes) => {
            for top in index.top_level() {
                if ExportClass::of(top.kind).is_some_and(|class| classes.contains(&class)) {
                    push(top.entry.offset);
                }
            }
        }
        SelectionMode::ByName(names) => {
            for name in names {
                let matches: Vec<&TopLevel<'_>> = index
                    .top_level()
                    .iter()
                    .filter(|top| ExportClass::of(top.kind).is_some() && matches_name(index, top, name))
                    .collect();

                let Some(first) = matches.first() else {
                    report.warn(Warning::NameNotFound(name.clone()));
                    continue;
                };
                if matches.len() > 1 {
                    report.warn(Warning::AmbiguousName {
                        name: name.clone(),
                        count: matches.len(),
                    });
                }

                let offset = if unwrap_typedefs {
                    unwrap_typedef(index, first.entry.offset).unwrap_or(first.entry.offset)
                } else {
                    first.entry.offset
                };
                push(offset);
            }
        }
    }

    tracing::debug!(count = selected.len(), "selected root entries");
    report.stats.selected = selected.len();
    selected
}

fn matches_name(index: &EntryIndex<'_>, top: &TopLevel<'_>, wanted: &str) -> bool
{
    if top.scoped_name.as_deref() == Some(wanted) {
        return true;
    }
    index.effective_name(top.entry) == Some(wanted)
}

/// Follow a typedef chain to a struct/union/class that has a name of its own
/// or a unique typedef naming it.
fn unwrap_typedef(index: &EntryIndex<'_>, offset: EntryOffset) -> Option<EntryOffset>
{
    let mut current = index.get(offset)?;
    if classify(current) != Kind::Typedef {
        return None;
    }

    let mut visited = HashSet::new();
    while classify(current) == Kind::Typedef {
        if !visited.insert(current.offset) {
            return None;
        }
        current = index.strip_qualifiers(current.attrs.type_ref?)?;
    }

    let kind = classify(current);
    let named = current.name().is_some() || index.unique_typedef_name(current).is_some();
    (kind.is_composite() && named).then_some(current.offset)
}
