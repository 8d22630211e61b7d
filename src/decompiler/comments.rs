/*!
# Comment scanner

Tokenizes the source text once and produces a position-sorted list of
comment records. Consecutive single-line comments are kept separate; the
attacher decides later whether they form one group.
*/

use crate::core::position::TextSpan;
use logos::Logos;
use serde::Serialize;

use super::nodes::StatementId;

/// Comment text that the editor inserts into empty templates and which is
/// dropped instead of being turned into a block comment.
pub const ON_START_COMMENT: &str = "on start";
pub const HANDLER_COMMENT: &str = "code goes here";

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
enum CommentToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    #[regex(r"`([^`\\]|\\.)*`")]
    StringLiteral,

    #[token("\n")]
    Newline,

    #[token("/")]
    Slash,

    #[regex(r#"[^\s/"'`]+"#)]
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentKind {
    SingleLine,
    MultiLine,
}

/// Где оказался комментарий после привязки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentOwner {
    Statement(StatementId),
    /// Индекс группы комментариев рабочей области
    Workspace(usize),
    /// Остался в исходном тексте серого блока
    Verbatim,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub kind: CommentKind,
    /// Очищенные строки комментария, без `//`, `/*`, `*` и `*/`
    pub lines: Vec<String>,
    pub span: TextSpan,
    pub has_trailing_newline: bool,
    pub followed_by_empty_line: bool,
    /// На той же строке перед комментарием есть код
    pub is_trailing_comment: bool,
    pub owner: Option<CommentOwner>,
}

impl Comment {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_multi_line(&self) -> bool {
        self.kind == CommentKind::MultiLine
    }

    pub fn is_unowned(&self) -> bool {
        self.owner.is_none()
    }
}

/// Scans `text` and returns every comment in source order.
pub fn scan_comments(text: &str) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut lexer = CommentToken::lexer(text);
    let mut line_has_code = false;

    while let Some(token) = lexer.next() {
        let range = lexer.span();
        let span = TextSpan::new(range.start, range.end);
        match token {
            Ok(CommentToken::Newline) => line_has_code = false,
            Ok(CommentToken::LineComment) => {
                comments.push(Comment {
                    kind: CommentKind::SingleLine,
                    lines: vec![single_line_text(lexer.slice())],
                    span,
                    has_trailing_newline: newline_follows(text, span.end),
                    followed_by_empty_line: followed_by_empty_line(text, span.end),
                    is_trailing_comment: line_has_code,
                    owner: None,
                });
            }
            Ok(CommentToken::BlockComment) => {
                let slice = lexer.slice();
                comments.push(Comment {
                    kind: CommentKind::MultiLine,
                    lines: multi_line_text(slice),
                    span,
                    has_trailing_newline: newline_follows(text, span.end),
                    followed_by_empty_line: followed_by_empty_line(text, span.end),
                    is_trailing_comment: line_has_code,
                    owner: None,
                });
                if slice.contains('\n') {
                    line_has_code = false;
                }
            }
            Ok(CommentToken::StringLiteral)
            | Ok(CommentToken::Slash)
            | Ok(CommentToken::Code)
            | Err(()) => line_has_code = true,
        }
    }

    tracing::trace!("scanned {} comment(s)", comments.len());
    comments
}

fn single_line_text(slice: &str) -> String {
    slice
        .trim_start()
        .trim_start_matches("//")
        .trim()
        .to_string()
}

/// Strips `/*`, `/**`, a leading `*` and a closing `*/` from each line and
/// drops blank lines at both ends.
fn multi_line_text(slice: &str) -> Vec<String> {
    let mut lines: Vec<String> = slice.split('\n').map(clean_comment_line).collect();
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn clean_comment_line(line: &str) -> String {
    let mut rest = line.trim();
    if let Some(stripped) = rest.strip_prefix("/**") {
        if !stripped.starts_with('/') {
            rest = stripped;
        }
    } else if let Some(stripped) = rest.strip_prefix("/*") {
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('*') {
        if !stripped.starts_with('/') {
            rest = stripped;
        }
    }
    let rest = rest.trim_start();
    let rest = rest
        .strip_suffix("**/")
        .or_else(|| rest.strip_suffix("*/"))
        .unwrap_or(rest);
    rest.trim().to_string()
}

fn newline_follows(text: &str, end: usize) -> bool {
    let rest = text.get(end..).unwrap_or("");
    rest.trim_start_matches([' ', '\t', '\r']).starts_with('\n')
}

fn followed_by_empty_line(text: &str, end: usize) -> bool {
    let rest = text.get(end..).unwrap_or("");
    let Some(newline) = rest.find('\n') else {
        return false;
    };
    let next_line_start = end + newline + 1;
    if next_line_start >= text.len() {
        return false;
    }
    text[next_line_start..]
        .split('\n')
        .next()
        .is_some_and(|line| line.trim().is_empty())
}

/// Joins comments into the text of one block or workspace comment,
/// dropping the editor's template placeholders.
pub fn format_comments<'c>(comments: impl IntoIterator<Item = &'c Comment>) -> Option<String> {
    let parts: Vec<String> = comments
        .into_iter()
        .map(Comment::text)
        .filter(|text| text != ON_START_COMMENT && text != HANDLER_COMMENT)
        .collect();
    let joined = parts.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trailing_and_leading_comments() {
        let text = "// leading\nlet x = 1; // trailing\n\nfoo();\n";
        let comments = scan_comments(text);
        assert_eq!(comments.len(), 2);

        assert_eq!(comments[0].lines, vec!["leading"]);
        assert!(!comments[0].is_trailing_comment);
        assert!(!comments[0].followed_by_empty_line);
        assert!(comments[0].has_trailing_newline);

        assert_eq!(comments[1].lines, vec!["trailing"]);
        assert!(comments[1].is_trailing_comment);
        assert!(comments[1].followed_by_empty_line);
    }

    #[test]
    fn test_multi_line_comment_lines() {
        let text = "/**\n * first line\n * second line\n */\nfoo();";
        let comments = scan_comments(text);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].kind, CommentKind::MultiLine);
        assert_eq!(comments[0].lines, vec!["first line", "second line"]);
        assert!(!comments[0].is_trailing_comment);
    }

    #[test]
    fn test_comment_markers_inside_strings_are_ignored() {
        let text = "let url = \"http://example.com\"; let s = '/* no */';\n";
        assert!(scan_comments(text).is_empty());
    }

    #[test]
    fn test_single_line_comments_are_not_merged() {
        let text = "// one\n// two\nfoo();";
        let comments = scan_comments(text);
        assert_eq!(comments.len(), 2);
        assert_eq!(format_comments(&comments), Some("one\ntwo".to_string()));
    }

    #[test]
    fn test_placeholder_comments_are_dropped() {
        let comments = scan_comments("// code goes here\n");
        assert_eq!(format_comments(&comments), None);
    }

    #[test]
    fn test_comment_at_end_of_file() {
        let comments = scan_comments("foo(); // done");
        assert_eq!(comments.len(), 1);
        assert!(comments[0].is_trailing_comment);
        assert!(!comments[0].has_trailing_newline);
        assert!(!comments[0].followed_by_empty_line);
    }
}
