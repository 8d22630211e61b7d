/*!
# Rename resolver

Block variables are global while source variables are lexically scoped.
Every local declaration whose name is already taken gets a fresh name, and an
edit is recorded for each occurrence of the declared identifier.
*/

use crate::core::position::TextSpan;
use crate::syntax::{walk_statements, Identifier, NodeRef, SourceFile, VisitControl, Visitor};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Замена одного вхождения идентификатора
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameEdit {
    pub name: String,
    /// `name.len() - old.len()`
    pub diff: isize,
    pub span: TextSpan,
}

/// Отсортированный по `span.start` список непересекающихся замен
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenameMap {
    edits: Vec<RenameEdit>,
}

impl RenameMap {
    pub fn new(mut edits: Vec<RenameEdit>) -> Self {
        edits.sort_by_key(|e| (e.span.start, e.span.end));
        edits.dedup_by_key(|e| e.span);
        Self { edits }
    }

    pub fn edits(&self) -> &[RenameEdit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Edit whose span starts at `position`.
    pub fn edit_at(&self, position: usize) -> Option<&RenameEdit> {
        self.edits
            .binary_search_by_key(&position, |e| e.span.start)
            .ok()
            .map(|i| &self.edits[i])
    }

    /// Name of `identifier` after renaming.
    pub fn name_of<'a>(&'a self, identifier: &'a Identifier) -> &'a str {
        match self.edit_at(identifier.span.start) {
            Some(edit) if edit.span == identifier.span => &edit.name,
            _ => &identifier.name,
        }
    }

    /// Edits fully inside `range`.
    pub fn edits_in(&self, range: TextSpan) -> &[RenameEdit] {
        let from = self.edits.partition_point(|e| e.span.start < range.start);
        let to = self.edits.partition_point(|e| e.span.start < range.end);
        let slice = &self.edits[from..to];
        let inside = slice
            .iter()
            .take_while(|e| e.span.end <= range.end)
            .count();
        &slice[..inside]
    }

    /// Source text of `range` with every edit inside it applied.
    pub fn apply(&self, text: &str, range: TextSpan) -> String {
        let mut out = String::with_capacity(range.len());
        let mut cursor = range.start;
        for edit in self.edits_in(range) {
            out.push_str(TextSpan::new(cursor, edit.span.start).slice(text));
            out.push_str(&edit.name);
            cursor = edit.span.end;
        }
        out.push_str(TextSpan::new(cursor, range.end).slice(text));
        out
    }
}

/// Множество занятых имён, переносимое между файлами
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TakenNames {
    names: BTreeSet<String>,
}

impl TakenNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TakenNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// "Find all references" service for a declared identifier.
pub trait ReferenceFinder {
    /// Spans of every occurrence of the variable declared by `declaration`,
    /// the declaration itself included.
    fn find_references(&self, declaration: &Identifier) -> Vec<TextSpan>;
}

/// Finds references through the binding ids assigned by the host.
pub struct BindingReferenceFinder<'a> {
    file: &'a SourceFile,
}

impl<'a> BindingReferenceFinder<'a> {
    pub fn new(file: &'a SourceFile) -> Self {
        Self { file }
    }
}

impl ReferenceFinder for BindingReferenceFinder<'_> {
    fn find_references(&self, declaration: &Identifier) -> Vec<TextSpan> {
        let Some(binding) = declaration.binding else {
            return vec![declaration.span];
        };
        struct Collector {
            binding: u32,
            spans: Vec<TextSpan>,
        }
        impl<'a> Visitor<'a> for Collector {
            fn enter(&mut self, node: NodeRef<'a>) -> VisitControl {
                if let NodeRef::Identifier(identifier) = node {
                    if identifier.binding == Some(self.binding) {
                        self.spans.push(identifier.span);
                    }
                }
                VisitControl::Continue
            }
        }
        let mut collector = Collector {
            binding,
            spans: Vec::new(),
        };
        walk_statements(&self.file.statements, &mut collector);
        if !collector.spans.contains(&declaration.span) {
            collector.spans.push(declaration.span);
        }
        collector.spans
    }
}

/// Replacement-name policy for colliding declarations.
#[derive(Debug, Clone)]
pub struct RenamePolicy {
    skip_letters: HashSet<char>,
}

impl Default for RenamePolicy {
    fn default() -> Self {
        Self::new(['x', 'y', 'z'])
    }
}

impl RenamePolicy {
    pub fn new(skip_letters: impl IntoIterator<Item = char>) -> Self {
        Self {
            skip_letters: skip_letters.into_iter().collect(),
        }
    }

    /// First free name for `name`: the next letters of the alphabet for a
    /// single lowercase letter outside the skip list, then numeric suffixes.
    pub fn fresh_name(&self, name: &str, taken: &TakenNames) -> String {
        let mut chars = name.chars();
        if let (Some(letter), None) = (chars.next(), chars.next()) {
            if letter.is_ascii_lowercase() && !self.skip_letters.contains(&letter) {
                let offset = letter as u8 - b'a';
                for i in 1..26u8 {
                    let candidate = (b'a' + (offset + i) % 26) as char;
                    if self.skip_letters.contains(&candidate) {
                        continue;
                    }
                    let candidate = candidate.to_string();
                    if !taken.contains(&candidate) {
                        return candidate;
                    }
                }
            }
        }
        (2usize..)
            .map(|n| format!("{}{}", name, n))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| format!("{}_", name))
    }
}

/// Collects local variable declarations depth-first and renames collisions.
/// `taken` is updated in place with every name now in use.
pub fn resolve_renames(
    file: &SourceFile,
    taken: &mut TakenNames,
    finder: &dyn ReferenceFinder,
    policy: &RenamePolicy,
) -> RenameMap {
    struct Declarations<'a> {
        found: Vec<&'a Identifier>,
    }
    impl<'a> Visitor<'a> for Declarations<'a> {
        fn enter(&mut self, node: NodeRef<'a>) -> VisitControl {
            if let NodeRef::Declaration(decl) = node {
                if let Some(identifier) = decl.name.identifier() {
                    self.found.push(identifier);
                }
            }
            VisitControl::Continue
        }
    }

    let mut declarations = Declarations { found: Vec::new() };
    walk_statements(&file.statements, &mut declarations);

    let mut edits = Vec::new();
    let mut seen_bindings = HashSet::new();
    for identifier in declarations.found {
        // `var` redeclarations of the same binding are one variable
        if let Some(binding) = identifier.binding {
            if !seen_bindings.insert(binding) {
                continue;
            }
        }
        if taken.contains(&identifier.name) {
            let new_name = policy.fresh_name(&identifier.name, taken);
            let diff = new_name.len() as isize - identifier.name.len() as isize;
            tracing::debug!("renaming {} to {}", identifier.name, new_name);
            for span in finder.find_references(identifier) {
                edits.push(RenameEdit {
                    name: new_name.clone(),
                    diff,
                    span,
                });
            }
            taken.insert(new_name);
        } else {
            // без коллизии имя не меняется, но следующий файл проекта его не займёт
            taken.insert(identifier.name.clone());
        }
    }
    RenameMap::new(edits)
}
