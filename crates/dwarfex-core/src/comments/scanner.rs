//! C/C++ comment scanner.
//!
//! Finds `//` and `/* */` comments in a source text, skipping string and
//! character literals, and answers positional questions about them.

/// One comment in a source file. `start..end` is the byte range of the
/// whole comment including its delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSpan
{
    pub start: usize,
    pub end: usize,
    /// Text with delimiters and decoration removed.
    pub text: String,
}

/// A scanned source file.
#[derive(Debug, Clone)]
pub struct ScannedSource
{
    text: String,
    line_starts: Vec<usize>,
    comments: Vec<CommentSpan>,
}

impl ScannedSource
{
    pub fn new(text: String) -> Self
    {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        let comments = scan(&text);
        Self {
            text,
            line_starts,
            comments,
        }
    }

    pub fn text(&self) -> &str
    {
        &self.text
    }

    pub fn comments(&self) -> &[CommentSpan]
    {
        &self.comments
    }

    /// Byte position of a 1-based line and column. Without a column, the
    /// first non-whitespace character of the line.
    pub fn position(&self, line: u32, column: Option<u32>) -> Option<usize>
    {
        let line_index = usize::try_from(line).ok()?.checked_sub(1)?;
        let start = *self.line_starts.get(line_index)?;
        let end = self.line_starts.get(line_index + 1).map_or(self.text.len(), |next| next - 1);
        let line_text = &self.text[start..end];

        let offset = match column {
            Some(column) => usize::try_from(column).ok()?.saturating_sub(1).min(line_text.len()),
            None => line_text.len() - line_text.trim_start().len(),
        };
        // Columns may count characters, or the file may have changed since the build.
        Some(start + floor_char_boundary(line_text, offset))
    }

    /// Start of the line containing `position`.
    pub fn line_start(&self, position: usize) -> usize
    {
        match self.line_starts.binary_search(&position) {
            Ok(index) => self.line_starts[index],
            Err(index) => self.line_starts[index.saturating_sub(1)],
        }
    }

    /// The comment starting closest before `position`.
    pub fn comment_before(&self, position: usize) -> Option<&CommentSpan>
    {
        let index = self.comments.partition_point(|comment| comment.start < position);
        index.checked_sub(1).map(|index| &self.comments[index])
    }

    /// The first comment starting at or after `position`.
    pub fn comment_after(&self, position: usize) -> Option<&CommentSpan>
    {
        let index = self.comments.partition_point(|comment| comment.start < position);
        self.comments.get(index)
    }

    /// Whether any byte of `start..end` lies inside a comment.
    pub fn in_comment(&self, start: usize, end: usize) -> bool
    {
        self.comments
            .iter()
            .any(|comment| comment.start < end && start < comment.end)
    }

    /// First whole-word occurrence of `word` at or after `from` that is not
    /// inside a comment.
    pub fn find_word(&self, word: &str, from: usize) -> Option<usize>
    {
        if word.is_empty() || from > self.text.len() {
            return None;
        }
        let from = floor_char_boundary(&self.text, from);
        let bytes = self.text.as_bytes();
        let is_word = |byte: u8| byte.is_ascii_alphanumeric() || byte == b'_';

        self.text[from..]
            .match_indices(word)
            .map(|(index, _)| from + index)
            .find(|&start| {
                let end = start + word.len();
                let bounded_left = start == 0 || !is_word(bytes[start - 1]);
                let bounded_right = end == bytes.len() || !is_word(bytes[end]);
                bounded_left && bounded_right && !self.in_comment(start, end)
            })
    }
}

/// Largest char boundary of `text` at or below `index`.
fn floor_char_boundary(text: &str, index: usize) -> usize
{
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State
{
    Code,
    String,
    Char,
    Line(usize),
    Block(usize),
}

/// Every comment in `text`, in order of appearance.
pub fn scan(text: &str) -> Vec<CommentSpan>
{
    let bytes = text.as_bytes();
    let mut comments = Vec::new();
    let mut state = State::Code;
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        let next = bytes.get(index + 1).copied();
        match state {
            State::Code => match (byte, next) {
                (b'/', Some(b'/')) => {
                    state = State::Line(index);
                    index += 1;
                }
                (b'/', Some(b'*')) => {
                    state = State::Block(index);
                    index += 1;
                }
                (b'"', _) => state = State::String,
                // A quote after a digit is a C++14 digit separator.
                (b'\'', _) if index == 0 || !bytes[index - 1].is_ascii_alphanumeric() => state = State::Char,
                _ => {}
            },
            State::String | State::Char => {
                let quote = if state == State::String { b'"' } else { b'\'' };
                if byte == b'\\' {
                    index += 1;
                } else if byte == quote || byte == b'\n' {
                    state = State::Code;
                }
            }
            State::Line(start) => {
                if byte == b'\n' {
                    comments.push(CommentSpan {
                        start,
                        end: index,
                        text: clean_line(&text[start..index]),
                    });
                    state = State::Code;
                }
            }
            State::Block(start) => {
                if byte == b'*' && next == Some(b'/') {
                    let end = index + 2;
                    comments.push(CommentSpan {
                        start,
                        end,
                        text: clean_block(&text[start..end]),
                    });
                    state = State::Code;
                    index += 1;
                }
            }
        }
        index += 1;
    }

    match state {
        State::Line(start) => comments.push(CommentSpan {
            start,
            end: text.len(),
            text: clean_line(&text[start..]),
        }),
        State::Block(start) => tracing::debug!(start, "unterminated block comment"),
        _ => {}
    }
    comments
}

fn clean_line(raw: &str) -> String
{
    raw.trim_start_matches('/').trim().to_string()
}

fn clean_block(raw: &str) -> String
{
    let inner = raw.strip_prefix('/').unwrap_or(raw);
    let inner = inner.strip_suffix("*/").unwrap_or(inner).trim_start_matches('*');

    let mut lines = inner.lines();
    let mut cleaned: Vec<&str> = lines.next().map(str::trim).into_iter().collect();
    for line in lines {
        let line = line.trim_start();
        cleaned.push(line.strip_prefix('*').unwrap_or(line).trim());
    }
    cleaned.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_scan_line_and_block_comments()
    {
        let text = "int a; // first\n/* second */ int b;\n";
        let comments = scan(text);
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "first");
        assert_eq!(&text[comments[0].start..comments[0].end], "// first");
        assert_eq!(comments[1].text, "second");
        assert_eq!(&text[comments[1].start..comments[1].end], "/* second */");
    }

    #[test]
    fn test_scan_skips_literals()
    {
        let text = "const char *s = \"// not a comment\";\nchar c = '/'; int n = 1'000; // real\n";
        let comments = scan(text);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "real");
    }

    #[test]
    fn test_block_comment_decoration_is_removed()
    {
        let comments = scan("/**\n * Packet header.\n * Network order.\n */\n");
        assert_eq!(comments[0].text, "Packet header.\nNetwork order.");
    }

    #[test]
    fn test_empty_block_comments()
    {
        let comments = scan("/**/ int x;\n/***/\n");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "");
        assert_eq!(comments[1].text, "");
    }

    #[test]
    fn test_position_inside_multibyte_character()
    {
        let source = ScannedSource::new("\u{e9} x; // note\n".to_string());
        assert_eq!(source.position(1, Some(2)), Some(0));
        assert_eq!(source.position(1, Some(3)), Some(2));
        assert_eq!(source.find_word("x", 1), Some(3));
    }

    #[test]
    fn test_position_defaults_to_first_non_whitespace()
    {
        let source = ScannedSource::new("struct A {\n    int x;\n};\n".to_string());
        assert_eq!(source.position(2, None), Some(15));
        assert_eq!(source.position(2, Some(9)), Some(19));
        assert_eq!(source.position(9, None), None);
    }

    #[test]
    fn test_find_word_skips_comments_and_substrings()
    {
        let source = ScannedSource::new("struct A {\n  // count of x\n  int xs;\n  int x;\n};\n".to_string());
        let found = source.find_word("x", 0);
        assert_eq!(found.map(|position| &source.text()[position..position + 2]), Some("x;"));
    }
}
