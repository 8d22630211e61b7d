/*!
# Comment attacher

Assigns scanned comments to the statement blocks they annotate, or to free
workspace comments at the top level. Runs once per produced statement,
after the statement's children, so a parent only sees what its children
left unowned. Trailing comments are the exception: a comment on the first
or last line of a statement is taken from whichever child owned it.
*/

use std::collections::HashMap;

use crate::core::position::{LineIndex, TextSpan};

use super::comments::{format_comments, Comment, CommentOwner};
use super::ids::IdGenerator;
use super::nodes::StatementId;

/// Свободный комментарий рабочей области
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceComment {
    pub id: String,
    /// `None` если группа состояла только из заглушек редактора
    pub text: Option<String>,
}

impl WorkspaceComment {
    /// Width and height of the comment bubble, derived from its text.
    pub fn size(&self) -> (usize, usize) {
        let text = self.text.as_deref().unwrap_or("");
        let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        let lines = text.lines().count().max(1);
        let width = (longest * 10).clamp(MIN_COMMENT_WIDTH, MAX_COMMENT_WIDTH);
        let height = (lines * 40).clamp(MIN_COMMENT_HEIGHT, MAX_COMMENT_HEIGHT);
        (width, height)
    }
}

const MIN_COMMENT_WIDTH: usize = 160;
const MAX_COMMENT_WIDTH: usize = 480;
const MIN_COMMENT_HEIGHT: usize = 120;
const MAX_COMMENT_HEIGHT: usize = 360;

pub struct CommentAttacher {
    comments: Vec<Comment>,
    lines: LineIndex,
    workspace: Vec<WorkspaceComment>,
}

impl CommentAttacher {
    pub fn new(comments: Vec<Comment>, lines: LineIndex) -> Self {
        Self {
            comments,
            lines,
            workspace: Vec::new(),
        }
    }

    /// Attaches comments to the statement `owner` spanning `span`. Leading
    /// comments are searched from `lead_start`. At the top level leading
    /// comments may be split off into workspace comments; their ids are
    /// returned so the statement can reference them.
    pub fn attach(
        &mut self,
        owner: StatementId,
        span: TextSpan,
        lead_start: usize,
        top_level: bool,
        ids: &mut IdGenerator,
    ) -> Vec<String> {
        let start_line = self.lines.line_of(span.start);
        let end_line = self.lines.line_of(span.end.saturating_sub(1).max(span.start));

        for comment in self.comments.iter_mut() {
            if !comment.is_trailing_comment || comment.span.start < span.start {
                continue;
            }
            if matches!(
                comment.owner,
                Some(CommentOwner::Workspace(_)) | Some(CommentOwner::Verbatim)
            ) {
                continue;
            }
            let line = self.lines.line_of(comment.span.start);
            if line == start_line || line == end_line {
                comment.owner = Some(CommentOwner::Statement(owner));
            }
        }

        let leading: Vec<usize> = self
            .comments
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.is_unowned()
                    && !c.is_trailing_comment
                    && c.span.start >= lead_start
                    && c.span.end <= span.start
            })
            .map(|(i, _)| i)
            .collect();

        let mut refs = Vec::new();
        let leftovers = if top_level {
            self.split_workspace_groups(&leading, false, ids, &mut refs)
        } else {
            leading
        };
        for index in leftovers {
            self.comments[index].owner = Some(CommentOwner::Statement(owner));
        }

        for comment in self.comments.iter_mut() {
            if comment.is_unowned() && span.contains_span(comment.span) {
                comment.owner = Some(CommentOwner::Statement(owner));
            }
        }
        refs
    }

    /// Turns every comment after the last top-level statement into
    /// workspace comments.
    pub fn flush_trailing(&mut self, from: usize, ids: &mut IdGenerator) {
        let rest: Vec<usize> = self
            .comments
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_unowned() && c.span.start >= from)
            .map(|(i, _)| i)
            .collect();
        let mut refs = Vec::new();
        self.split_workspace_groups(&rest, true, ids, &mut refs);
    }

    /// Splits `indices` into workspace groups. A group ends after a
    /// single-line comment followed by a blank line, or after a multi-line
    /// comment followed by a blank line or by more comments. Returns the
    /// comments of the unfinished last group unless `flush_rest` is set.
    fn split_workspace_groups(
        &mut self,
        indices: &[usize],
        flush_rest: bool,
        ids: &mut IdGenerator,
        refs: &mut Vec<String>,
    ) -> Vec<usize> {
        let mut group = Vec::new();
        for (position, &index) in indices.iter().enumerate() {
            group.push(index);
            let comment = &self.comments[index];
            let more_follow = position + 1 < indices.len();
            let ends_group = if comment.is_multi_line() {
                comment.followed_by_empty_line || more_follow
            } else {
                comment.followed_by_empty_line
            };
            if ends_group {
                if let Some(id) = self.flush_group(std::mem::take(&mut group), ids) {
                    refs.push(id);
                }
            }
        }
        if flush_rest && !group.is_empty() {
            if let Some(id) = self.flush_group(std::mem::take(&mut group), ids) {
                refs.push(id);
            }
        }
        group
    }

    fn flush_group(&mut self, group: Vec<usize>, ids: &mut IdGenerator) -> Option<String> {
        let workspace_index = self.workspace.len();
        for &index in &group {
            self.comments[index].owner = Some(CommentOwner::Workspace(workspace_index));
        }
        let text = format_comments(group.iter().map(|&i| &self.comments[i]));
        let id = ids.new_id("ws");
        let has_text = text.is_some();
        self.workspace.push(WorkspaceComment {
            id: id.clone(),
            text,
        });
        has_text.then_some(id)
    }

    /// Marks comments inside `span` as part of an opaque block's source
    /// text so they are not emitted twice.
    pub fn keep_verbatim(&mut self, span: TextSpan) {
        for comment in self.comments.iter_mut() {
            if span.contains_span(comment.span)
                && !matches!(comment.owner, Some(CommentOwner::Workspace(_)))
            {
                comment.owner = Some(CommentOwner::Verbatim);
            }
        }
    }

    /// Drops ownership for statements that were discarded by a fallback.
    pub fn release_from(&mut self, first_discarded: StatementId) {
        for comment in self.comments.iter_mut() {
            if let Some(CommentOwner::Statement(id)) = comment.owner {
                if id >= first_discarded {
                    comment.owner = None;
                }
            }
        }
    }

    /// Comment text of each statement that owns at least one comment.
    pub fn statement_comments(&self) -> HashMap<StatementId, String> {
        let mut grouped: HashMap<StatementId, Vec<&Comment>> = HashMap::new();
        for comment in &self.comments {
            if let Some(CommentOwner::Statement(id)) = comment.owner {
                grouped.entry(id).or_default().push(comment);
            }
        }
        grouped
            .into_iter()
            .filter_map(|(id, comments)| format_comments(comments).map(|text| (id, text)))
            .collect()
    }

    pub fn workspace_comments(&self) -> Vec<WorkspaceComment> {
        self.workspace
            .iter()
            .filter(|c| c.text.is_some())
            .cloned()
            .collect()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompiler::comments::scan_comments;

    fn attacher(text: &str) -> CommentAttacher {
        CommentAttacher::new(scan_comments(text), LineIndex::new(text))
    }

    fn span_of(text: &str, snippet: &str) -> TextSpan {
        let start = text.find(snippet).unwrap();
        TextSpan::new(start, start + snippet.len())
    }

    #[test]
    fn test_blank_line_makes_workspace_comment() {
        let text = "// note\n\nfoo();\n";
        let mut attacher = attacher(text);
        let mut ids = IdGenerator::new();
        let refs = attacher.attach(StatementId(0), span_of(text, "foo();"), 0, true, &mut ids);

        assert_eq!(refs.len(), 1);
        assert!(attacher.statement_comments().is_empty());
        let workspace = attacher.workspace_comments();
        assert_eq!(workspace.len(), 1);
        assert_eq!(workspace[0].text.as_deref(), Some("note"));
    }

    #[test]
    fn test_adjacent_comment_attaches_to_statement() {
        let text = "// note\nfoo();\n";
        let mut attacher = attacher(text);
        let mut ids = IdGenerator::new();
        let refs = attacher.attach(StatementId(0), span_of(text, "foo();"), 0, true, &mut ids);

        assert!(refs.is_empty());
        assert!(attacher.workspace_comments().is_empty());
        assert_eq!(
            attacher.statement_comments().get(&StatementId(0)).map(String::as_str),
            Some("note")
        );
    }

    #[test]
    fn test_trailing_comment_is_stolen_by_parent() {
        let text = "if (a) { foo(); } // done\n";
        let mut attacher = attacher(text);
        let mut ids = IdGenerator::new();
        attacher.attach(StatementId(0), span_of(text, "foo();"), 8, false, &mut ids);
        attacher.attach(StatementId(1), span_of(text, "if (a) { foo(); }"), 0, true, &mut ids);

        let comments = attacher.statement_comments();
        assert!(!comments.contains_key(&StatementId(0)));
        assert_eq!(comments.get(&StatementId(1)).map(String::as_str), Some("done"));
    }

    #[test]
    fn test_multi_line_comment_followed_by_comment_is_split() {
        let text = "/* header */\n// about foo\nfoo();\n";
        let mut attacher = attacher(text);
        let mut ids = IdGenerator::new();
        let refs = attacher.attach(StatementId(0), span_of(text, "foo();"), 0, true, &mut ids);

        assert_eq!(refs.len(), 1);
        assert_eq!(attacher.workspace_comments()[0].text.as_deref(), Some("header"));
        assert_eq!(
            attacher.statement_comments().get(&StatementId(0)).map(String::as_str),
            Some("about foo")
        );
    }

    #[test]
    fn test_workspace_comment_size_is_clamped() {
        let short = WorkspaceComment {
            id: "ws_1".to_string(),
            text: Some("hi".to_string()),
        };
        assert_eq!(short.size(), (160, 120));
        let long = WorkspaceComment {
            id: "ws_2".to_string(),
            text: Some("x".repeat(100)),
        };
        assert_eq!(long.size().0, 480);
    }
}
