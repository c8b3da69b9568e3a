//! # Comment Correlator
//!
//! Attaches the source comment written next to a declaration to the exported
//! node, member or enumerator. Source files are read through a
//! [`SourceProvider`] so that the core never touches the filesystem directly;
//! the CLI passes [`LocalSources`].
//!
//! A comment is taken from before the declaration when nothing but
//! whitespace separates the two and the comment starts its own line (or sits
//! on the declaration's line with no earlier declaration to its left). A
//! comment is taken from after the declaration when it follows on the same
//! line, or starts the next line, and only whitespace follows the
//! declaration's delimiter.

pub mod scanner;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::classify::Kind;
use crate::graph::{ExportGraph, NodeBody, NodeId};
use crate::report::{Report, Warning};
use crate::types::SourceLocation;

pub use scanner::{CommentSpan, ScannedSource};

/// Characters that end a declaration.
const DELIMITERS: [char; 4] = [',', ';', '{', '}'];

/// Comments found around one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments
{
    pub before: Option<String>,
    pub after: Option<String>,
}

impl Comments
{
    pub fn is_empty(&self) -> bool
    {
        self.before.is_none() && self.after.is_none()
    }
}

/// Contents of a source file and its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText
{
    pub text: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Random access to source files by path.
pub trait SourceProvider
{
    fn read_source(&self, path: &Path) -> io::Result<SourceText>;
}

/// Reads sources from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSources;

impl SourceProvider for LocalSources
{
    fn read_source(&self, path: &Path) -> io::Result<SourceText>
    {
        let text = fs::read_to_string(path)?;
        let modified = fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(SourceText { text, modified })
    }
}

/// Rewrites a path prefix recorded in the debug info, e.g. a build
/// machine's checkout directory, to where the sources live locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSubstitution
{
    pub from: String,
    pub to: String,
}

impl PathSubstitution
{
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self
    {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The substituted path, if `path` starts with `from`.
    pub fn apply(&self, path: &Path) -> Option<PathBuf>
    {
        let path = path.to_string_lossy();
        path.strip_prefix(self.from.as_str())
            .map(|rest| PathBuf::from(format!("{}{rest}", self.to)))
    }
}

/// Apply the first matching rule, once.
pub fn substitute_path(rules: &[PathSubstitution], path: &Path) -> PathBuf
{
    rules
        .iter()
        .find_map(|rule| rule.apply(path))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Looks up comments for declarations, caching scanned files.
pub struct CommentCorrelator<'s>
{
    sources: &'s dyn SourceProvider,
    substitutions: Vec<PathSubstitution>,
    build_time: Option<DateTime<Utc>>,
    files: HashMap<PathBuf, Option<Rc<ScannedSource>>>,
}

impl<'s> CommentCorrelator<'s>
{
    pub fn new(
        sources: &'s dyn SourceProvider,
        substitutions: Vec<PathSubstitution>,
        build_time: Option<DateTime<Utc>>,
    ) -> Self
    {
        Self {
            sources,
            substitutions,
            build_time,
            files: HashMap::new(),
        }
    }

    /// Comments around the declaration at `location`.
    pub fn comments_at(&mut self, location: &SourceLocation, kind: Kind, report: &mut Report) -> Comments
    {
        let Some(source) = self.source(&location.file, report) else {
            return Comments::default();
        };
        match source.position(location.line, location.column) {
            Some(position) => correlate(&source, position, keywords(kind)),
            None => {
                tracing::debug!(%location, "declaration line is outside the source file");
                Comments::default()
            }
        }
    }

    /// Comments around the first occurrence of `identifier` after the
    /// declaration of its containing type. Used for members and enumerators
    /// without a location of their own.
    pub fn comments_within(&mut self, container: &SourceLocation, identifier: &str, report: &mut Report) -> Comments
    {
        let Some(source) = self.source(&container.file, report) else {
            return Comments::default();
        };
        source
            .position(container.line, container.column)
            .and_then(|start| source.find_word(identifier, start))
            .map(|position| correlate(&source, position, &[]))
            .unwrap_or_default()
    }

    fn source(&mut self, recorded: &Path, report: &mut Report) -> Option<Rc<ScannedSource>>
    {
        let path = substitute_path(&self.substitutions, recorded);
        if let Some(cached) = self.files.get(&path) {
            return cached.clone();
        }

        let scanned = match self.sources.read_source(&path) {
            Ok(source) => {
                if let (Some(modified), Some(built)) = (source.modified, self.build_time) {
                    if modified > built {
                        report.warn(Warning::StaleSource(path.clone()));
                    }
                }
                tracing::debug!(path = %path.display(), "scanning source file for comments");
                Some(Rc::new(ScannedSource::new(source.text)))
            }
            Err(err) => {
                report.warn(Warning::UnreadableSource {
                    path: path.clone(),
                    reason: err.to_string(),
                });
                None
            }
        };
        self.files.insert(path, scanned.clone());
        scanned
    }
}

/// Keywords that may stand alone on the line between a comment and the
/// declaration it documents.
fn keywords(kind: Kind) -> &'static [&'static str]
{
    match kind {
        Kind::Structure => &["struct", "typedef"],
        Kind::Union => &["union", "typedef"],
        Kind::Class => &["class", "typedef"],
        Kind::Enumeration => &["enum", "typedef"],
        Kind::Typedef => &["typedef"],
        _ => &[],
    }
}

fn is_blank(text: &str) -> bool
{
    text.chars().all(char::is_whitespace)
}

fn correlate(source: &ScannedSource, position: usize, keywords: &[&str]) -> Comments
{
    Comments {
        before: comment_before(source, position, keywords),
        after: comment_after(source, position),
    }
}

fn comment_before(source: &ScannedSource, position: usize, keywords: &[&str]) -> Option<String>
{
    let comment = source.comment_before(position)?;
    let text = source.text();
    let mut between = text.get(comment.end.min(position)..position)?;

    // A line holding only the declaration's keyword, such as `typedef struct`
    // above the name, is skipped.
    if !keywords.is_empty() {
        let trimmed = between.trim_end();
        let (rest, last_line) = trimmed.rsplit_once('\n').unwrap_or(("", trimmed));
        let has_keyword = last_line
            .split(|c: char| c.is_whitespace() || "(){}[]/*".contains(c))
            .any(|word| keywords.contains(&word));
        if has_keyword {
            between = rest;
        }
    }

    let left_of_declaration = match between.rsplit_once('\n') {
        Some((above, left)) => {
            let line_start = source.line_start(comment.start);
            if !is_blank(above) || !is_blank(&text[line_start..comment.start]) {
                return None;
            }
            left
        }
        None => between,
    };
    if left_of_declaration.contains([',', ';']) {
        return None;
    }
    Some(comment.text.clone())
}

fn comment_after(source: &ScannedSource, position: usize) -> Option<String>
{
    let comment = source.comment_after(position)?;
    let between = &source.text()[position..comment.start];

    let valid = match between.find(DELIMITERS) {
        Some(delimiter) => {
            let rest = &between[delimiter + 1..];
            rest.is_empty() || (is_blank(rest) && rest.matches('\n').count() <= 1)
        }
        None => {
            let mut lines = between.split('\n').skip(1);
            match (lines.next(), lines.next()) {
                (None, _) => true,
                (Some(next_line), None) => is_blank(next_line),
                _ => false,
            }
        }
    };
    valid.then(|| comment.text.clone())
}

/// Attach comments to every root node and to the members and enumerators of
/// every node reachable from the roots.
pub fn attach_comments(graph: &mut ExportGraph, roots: &[NodeId], correlator: &mut CommentCorrelator<'_>, report: &mut Report)
{
    let root_set: HashSet<NodeId> = roots.iter().copied().collect();
    let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();
    let mut visited: HashSet<NodeId> = root_set.clone();
    let mut attached = 0;

    while let Some(id) = queue.pop_front() {
        for target in graph.node(id).body.edges() {
            if visited.insert(target) {
                queue.push_back(target);
            }
        }

        let node = graph.node_mut(id);
        let decl = node.decl.clone();
        if let (true, Some(decl)) = (root_set.contains(&id), &decl) {
            node.comments = correlator.comments_at(decl, node.kind, report);
            attached += usize::from(!node.comments.is_empty());
        }

        // Without a container location only self-located fields can be matched.
        match &mut node.body {
            NodeBody::Composite { members } => {
                for member in members {
                    member.comments = match (&member.decl, &member.identifier, &decl) {
                        (Some(location), _, _) => correlator.comments_at(location, Kind::Unknown, report),
                        (None, Some(identifier), Some(container)) => {
                            correlator.comments_within(container, identifier, report)
                        }
                        _ => continue,
                    };
                    attached += usize::from(!member.comments.is_empty());
                }
            }
            NodeBody::Enumeration { enumerators, .. } => {
                for enumerator in enumerators {
                    enumerator.comments = match (&enumerator.decl, &decl) {
                        (Some(location), _) => correlator.comments_at(location, Kind::Unknown, report),
                        (None, Some(container)) => correlator.comments_within(container, &enumerator.name, report),
                        (None, None) => continue,
                    };
                    attached += usize::from(!enumerator.comments.is_empty());
                }
            }
            _ => {}
        }
    }

    tracing::debug!(attached, "attached source comments");
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn scanned(text: &str) -> ScannedSource
    {
        ScannedSource::new(text.to_string())
    }

    fn at(source: &ScannedSource, line: u32) -> usize
    {
        source.position(line, None).unwrap()
    }

    #[test]
    fn test_line_comment_above_is_before()
    {
        let source = scanned("// counter\nint x;\n");
        let comments = correlate(&source, at(&source, 2), &[]);
        assert_eq!(comments.before.as_deref(), Some("counter"));
        assert_eq!(comments.after, None);
    }

    #[test]
    fn test_code_between_rejects_before()
    {
        let source = scanned("// counter\nint y;\nint x;\n");
        assert_eq!(correlate(&source, at(&source, 3), &[]).before, None);
    }

    #[test]
    fn test_comment_after_code_on_its_line_rejects_before()
    {
        let source = scanned("int y; // about y\nint x;\n");
        let comments = correlate(&source, at(&source, 2), &[]);
        assert_eq!(comments.before, None);
    }

    #[test]
    fn test_trailing_comment_is_after()
    {
        let source = scanned("struct P {\n    int x; // horizontal\n    int y;\n};\n");
        let comments = correlate(&source, at(&source, 2), &[]);
        assert_eq!(comments.after.as_deref(), Some("horizontal"));
        assert_eq!(correlate(&source, at(&source, 3), &[]).before, None);
    }

    #[test]
    fn test_trailing_comment_belongs_to_last_declarator()
    {
        let source = scanned("int a, b; // only b\n");
        let a = source.text().find('a').unwrap();
        let b = source.text().find('b').unwrap();
        assert_eq!(comment_after(&source, a), None);
        assert_eq!(comment_after(&source, b).as_deref(), Some("only b"));
    }

    #[test]
    fn test_keyword_line_is_skipped()
    {
        let source = scanned("/* A point. */\ntypedef struct\nPoint {\n    int x;\n} Point;\n");
        let comments = correlate(&source, at(&source, 3), keywords(Kind::Structure));
        assert_eq!(comments.before.as_deref(), Some("A point."));
    }

    #[test]
    fn test_column_inside_multibyte_character()
    {
        let source = scanned("\u{e9} x; // note\n");
        let position = source.position(1, Some(2)).unwrap();
        assert_eq!(correlate(&source, position, &[]).after.as_deref(), Some("note"));
    }

    #[test]
    fn test_path_substitution_first_match_wins()
    {
        let rules = vec![
            PathSubstitution::new("/build/src", "/home/me/src"),
            PathSubstitution::new("/build", "/other"),
        ];
        assert_eq!(
            substitute_path(&rules, Path::new("/build/src/main.c")),
            PathBuf::from("/home/me/src/main.c")
        );
        assert_eq!(substitute_path(&rules, Path::new("/opt/x.c")), PathBuf::from("/opt/x.c"));
    }
}
