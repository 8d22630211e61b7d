/*!
# Tree builder

Single recursive walk over the syntax tree that turns accepted syntax into
[`StatementNode`]s. Each statement is checked first; a rejected statement,
or one whose sub-expressions turn out to be unsupported while building,
is replaced by an opaque block carrying its source text. Expressions fall
back locally the same way.

The walk owns all per-file bookkeeping: the block counter, deferred
auto-declarations, comment ownership and the optional source map.
*/

mod calls;
mod expressions;
mod statements;

use std::collections::{HashMap, HashSet};

use crate::core::errors::{BuildResult, DecompileError};
use crate::core::position::{LineIndex, TextSpan};
use crate::core::results::SourceMapEntry;
use crate::diagnostics::{codes, Diagnostic, DiagnosticSeverity, Location};
use crate::metadata::SymbolMetadataTable;
use crate::syntax::{
    BindingId, Expression, ExpressionKind, Identifier, SourceFile, Statement, StatementKind,
    VariableDeclaration,
};

use super::attach::{CommentAttacher, WorkspaceComment};
use super::comments::Comment;
use super::declarations::{ArgumentInfo, FileDeclarations};
use super::feasibility::{Feasibility, Scope};
use super::ids::{BlockGuard, IdGenerator, ON_START_ID};
use super::nodes::{link_chain, ExpressionNode, Mutation, StatementId, StatementNode};
use super::options::DecompileOptions;
use super::rename::RenameMap;

/// Block type of the synthetic "on start" wrapper.
pub const ON_START_TYPE: &str = "pxt-on-start";
/// Opaque fallback blocks.
pub const TS_STATEMENT_TYPE: &str = "typescript_statement";
pub const TS_OUTPUT_TYPE: &str = "typescript_expression";

/// Переменная в секции `<variables>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    pub name: String,
    pub type_name: Option<String>,
}

/// Результат построения дерева одного файла
#[derive(Debug, Default)]
pub struct BuildOutput {
    /// Блоки верхнего уровня в порядке вывода
    pub blocks: Vec<StatementNode>,
    pub statement_comments: HashMap<StatementId, String>,
    pub workspace_comments: Vec<WorkspaceComment>,
    pub variables: Vec<VariableEntry>,
    pub source_map: Vec<SourceMapEntry>,
    /// Предупреждения о серых блоках
    pub diagnostics: Vec<Diagnostic>,
    pub block_count: usize,
}

struct AutoDeclaration<'a> {
    name: String,
    declaration: &'a VariableDeclaration,
    span: TextSpan,
}

/// Параметры функции, тело которой сейчас строится
struct FunctionScope {
    arguments: Vec<(Option<BindingId>, ArgumentInfo)>,
}

impl FunctionScope {
    fn argument(&self, name: &str, binding: Option<BindingId>) -> Option<&ArgumentInfo> {
        self.arguments
            .iter()
            .find(|(arg_binding, info)| match (binding, arg_binding) {
                (Some(b), Some(a)) => a == &b,
                _ => info.name == name,
            })
            .map(|(_, info)| info)
    }
}

/// Состояние, откатываемое при замене оператора серым блоком
struct Snapshot {
    blocks: usize,
    statement: usize,
    auto_declarations: usize,
    source_map: usize,
    diagnostics: usize,
}

pub struct DecompilerContext<'a> {
    file: &'a SourceFile,
    metadata: &'a SymbolMetadataTable,
    options: &'a DecompileOptions,
    declarations: &'a FileDeclarations,
    checker: Feasibility<'a>,
    renames: &'a RenameMap,
    comments: CommentAttacher,
    lines: LineIndex,
    guard: BlockGuard,
    ids: IdGenerator,
    next_statement: usize,
    used_variables: HashSet<String>,
    auto_declarations: Vec<AutoDeclaration<'a>>,
    function: Option<FunctionScope>,
    source_map: Vec<SourceMapEntry>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> DecompilerContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file: &'a SourceFile,
        metadata: &'a SymbolMetadataTable,
        options: &'a DecompileOptions,
        declarations: &'a FileDeclarations,
        renames: &'a RenameMap,
        comments: Vec<Comment>,
        lines: LineIndex,
        ids: IdGenerator,
    ) -> Self {
        Self {
            file,
            metadata,
            options,
            declarations,
            checker: Feasibility::new(metadata, options, declarations),
            renames,
            comments: CommentAttacher::new(comments, lines.clone()),
            lines,
            guard: BlockGuard::new(options.max_blocks),
            ids,
            next_statement: 0,
            used_variables: HashSet::new(),
            auto_declarations: Vec::new(),
            function: None,
            source_map: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Builds every top-level statement. Events and function definitions
    /// become separate top-level blocks; everything else goes into "on start".
    pub fn build(mut self) -> BuildResult<BuildOutput> {
        let file = self.file;
        let mut separate = Vec::new();
        let mut on_start = Vec::new();
        let mut lead_start = 0;

        for stmt in &file.statements {
            let nodes = self.build_statement(stmt, Scope::top_level(), lead_start)?;
            if nodes.is_empty() {
                continue;
            }
            lead_start = stmt.span.end;
            let stands_alone = nodes.len() == 1
                && nodes[0].block_type() != TS_STATEMENT_TYPE
                && is_top_level_block(stmt);
            if stands_alone {
                separate.extend(nodes);
            } else {
                on_start.extend(nodes);
            }
        }
        self.comments.flush_trailing(lead_start, &mut self.ids);

        let mut declared = self.unused_auto_declarations()?;
        declared.append(&mut on_start);
        let on_start = declared;

        let mut blocks = separate;
        if self.options.snippet_mode {
            blocks.extend(link_chain(on_start));
        } else if !on_start.is_empty() || self.options.always_emit_on_start {
            let mut wrapper = self.new_statement(ON_START_TYPE, None)?;
            wrapper.block_id = Some(ON_START_ID.to_string());
            wrapper.handler("HANDLER", link_chain(on_start));
            blocks.push(wrapper);
        }

        let variables = self.declared_variables();
        tracing::debug!(
            "built {} top-level block(s), {} block(s) total",
            blocks.len(),
            self.guard.count()
        );
        Ok(BuildOutput {
            blocks,
            statement_comments: self.comments.statement_comments(),
            workspace_comments: self.comments.workspace_comments(),
            variables,
            source_map: self.source_map,
            diagnostics: self.diagnostics,
            block_count: self.guard.count(),
        })
    }

    /// Auto-declared variables nobody referenced, as `variables_set` blocks.
    fn unused_auto_declarations(&mut self) -> BuildResult<Vec<StatementNode>> {
        let pending = std::mem::take(&mut self.auto_declarations);
        let mut nodes = Vec::new();
        for auto in pending {
            if self.used_variables.contains(&auto.name) {
                continue;
            }
            let Some(init) = &auto.declaration.initializer else {
                continue;
            };
            let mut node = self.new_statement("variables_set", Some(auto.span))?;
            node.block.field("VAR", auto.name.clone());
            // `null` has no block; the empty slot keeps its default
            if !matches!(init.skip_parentheses().kind, ExpressionKind::Null) {
                let value = self.value_input("VALUE", init, Some(super::nodes::NUMBER_SHADOW))?;
                node.block.inputs.push(value);
            }
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn declared_variables(&self) -> Vec<VariableEntry> {
        let mut variables = Vec::new();
        for name in &self.declarations.order {
            if let Some(user_enum) = self.declarations.enums.get(name) {
                variables.extend(user_enum.members.iter().map(|(member, value)| VariableEntry {
                    name: format!("{}{}", value, member),
                    type_name: Some(user_enum.info.name.clone()),
                }));
            } else if let Some(kind) = self.declarations.kinds.get(name) {
                variables.extend(kind.members.iter().map(|member| VariableEntry {
                    name: member.clone(),
                    type_name: Some(format!("KIND_{}", kind.info.name)),
                }));
            }
        }
        variables
    }

    /// New statement block, counted against the ceiling. Statements with a
    /// span get a source-map entry when the map is enabled.
    fn new_statement(&mut self, block_type: &str, span: Option<TextSpan>) -> BuildResult<StatementNode> {
        self.guard.count_block()?;
        let id = StatementId(self.next_statement);
        self.next_statement += 1;
        let mut node = StatementNode::new(id, block_type);
        node.span = span;
        if let (true, Some(span)) = (self.options.generate_source_map, span) {
            let block_id = self.ids.source_map_id();
            self.source_map.push(SourceMapEntry {
                id: block_id.clone(),
                start_pos: span.start,
                end_pos: span.end,
            });
            node.block_id = Some(block_id);
        }
        Ok(node)
    }

    fn new_expression(&mut self, block_type: &str) -> BuildResult<ExpressionNode> {
        self.guard.count_block()?;
        Ok(ExpressionNode::new(block_type))
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            blocks: self.guard.count(),
            statement: self.next_statement,
            auto_declarations: self.auto_declarations.len(),
            source_map: self.source_map.len(),
            diagnostics: self.diagnostics.len(),
        }
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.guard.restore(snapshot.blocks);
        self.comments.release_from(StatementId(snapshot.statement));
        self.auto_declarations.truncate(snapshot.auto_declarations);
        self.source_map.truncate(snapshot.source_map);
        self.diagnostics.truncate(snapshot.diagnostics);
    }

    /// Name of a variable identifier after renaming; records the usage.
    fn variable_name(&mut self, identifier: &'a Identifier) -> String {
        let name = self.renames.name_of(identifier).to_string();
        self.used_variables.insert(name.clone());
        name
    }

    /// Reports a fallback, or fails when grey blocks are not allowed.
    fn report_grey(&mut self, reason: &str, span: TextSpan) -> BuildResult<()> {
        if self.options.error_on_grey_blocks {
            return Err(DecompileError::GreyBlock {
                reason: reason.to_string(),
                span,
            });
        }
        tracing::debug!("grey block at {}..{}: {}", span.start, span.end, reason);
        let location = Location::from_span(self.file.file_name.clone(), span, &self.lines);
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticSeverity::Warning,
                location,
                codes::UNSUPPORTED_SYNTAX,
                reason,
            )
            .with_found(self.file.text_of(span).lines().next().unwrap_or("").trim()),
        );
        Ok(())
    }

    /// Opaque statement block with the renamed source text, one mutation
    /// attribute per line.
    fn grey_statement(&mut self, stmt: &'a Statement, reason: &str) -> BuildResult<StatementNode> {
        let declared: Vec<String> = match &stmt.kind {
            StatementKind::Variable { declarations } => declarations
                .iter()
                .filter_map(|d| d.name.identifier())
                .map(|ident| self.renames.name_of(ident).to_string())
                .collect(),
            _ => Vec::new(),
        };
        self.grey_source(stmt.span, crate::syntax::collect_identifiers(stmt), declared, reason)
    }

    fn grey_source(
        &mut self,
        span: TextSpan,
        identifiers: Vec<&'a Identifier>,
        declared: Vec<String>,
        reason: &str,
    ) -> BuildResult<StatementNode> {
        self.report_grey(reason, span)?;
        let mut node = self.new_statement(TS_STATEMENT_TYPE, Some(span))?;

        // текст серого блока тоже ссылается на переменные
        for identifier in identifiers {
            let name = self.renames.name_of(identifier).to_string();
            self.used_variables.insert(name);
        }

        let text = self.renames.apply(&self.file.text, span);
        let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();

        let mut mutation = Mutation::new();
        if !declared.is_empty() {
            mutation.set("declaredvars", declared.join(","));
        }
        mutation.set("numlines", lines.len().to_string());
        for (i, line) in lines.iter().enumerate() {
            mutation.set(format!("line{}", i), *line);
        }
        if self.options.include_grey_block_messages {
            mutation.set("error", reason);
        }
        node.block.mutation = Some(mutation);
        self.comments.keep_verbatim(span);
        Ok(node)
    }

    fn grey_expression(&mut self, expr: &'a Expression, reason: &str) -> BuildResult<ExpressionNode> {
        self.report_grey(reason, expr.span)?;
        for identifier in crate::syntax::collect_expression_identifiers(expr) {
            let name = self.renames.name_of(identifier).to_string();
            self.used_variables.insert(name);
        }
        let text = self.renames.apply(&self.file.text, expr.span);
        Ok(self
            .new_expression(TS_OUTPUT_TYPE)?
            .with_field("EXPRESSION", text))
    }

    fn attach_comments(&mut self, node: &mut StatementNode, span: TextSpan, lead_start: usize, scope: Scope) {
        let refs = self
            .comments
            .attach(node.id, span, lead_start, scope.top_level, &mut self.ids);
        if !refs.is_empty() {
            node.data = Some(refs.join(";"));
        }
    }
}

/// Statements that become their own top-level block: function definitions
/// and event registrations with a callback.
fn is_top_level_block(stmt: &Statement) -> bool {
    match &stmt.kind {
        StatementKind::Function { .. } => true,
        StatementKind::Expression { expression } => match &expression.skip_parentheses().kind {
            ExpressionKind::Call { arguments, .. } => arguments.iter().any(|a| {
                matches!(
                    a.skip_parentheses().kind,
                    ExpressionKind::Arrow { .. } | ExpressionKind::FunctionExpression { .. }
                )
            }),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompiler::decompile;
    use crate::syntax::{AssignmentOperator, SyntaxFactory, Type};

    fn compact_markup(f: &SyntaxFactory, statements: Vec<Statement>) -> String {
        let result = decompile(&f.file(statements), &SymbolMetadataTable::new(), DecompileOptions::default());
        assert!(result.success, "{:?}", result.diagnostics);
        result
            .output_text()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .collect()
    }

    #[test]
    fn test_unused_auto_declaration_is_emitted() {
        let f = SyntaxFactory::new("main.ts", "let count = 0;\n");
        let xml = compact_markup(&f, vec![f.let_stmt("count", 0, f.num("0", 0))]);
        assert!(xml.contains(concat!(
            r#"<block type="variables_set"><field name="VAR">count</field>"#,
            r#"<value name="VALUE"><shadow type="math_number"><field name="NUM">0</field></shadow></value>"#,
        )));
    }

    #[test]
    fn test_referenced_auto_declaration_is_dropped() {
        let f = SyntaxFactory::new("main.ts", "let count = 0;\ncount += 1;\n");
        let declaration = f.let_stmt("count", 0, f.num("0", 0));
        let update = f.expr_stmt(f.assign(
            f.ident("count", 1, Type::Number),
            AssignmentOperator::AddAssign,
            f.num("1", 0),
        ));
        let xml = compact_markup(&f, vec![declaration, update]);
        assert!(!xml.contains("variables_set"));
        assert!(xml.contains(r#"<block type="variables_change"><field name="VAR">count</field>"#));
    }

    #[test]
    fn test_null_auto_declaration_has_empty_slot() {
        let f = SyntaxFactory::new("main.ts", "let sprite = null;\n");
        let declaration = f.declaration(f.declare("sprite", 0), Some(f.null(0)));
        let xml = compact_markup(&f, vec![f.var_stmt(vec![declaration])]);
        assert!(xml.contains(r#"<block type="variables_set"><field name="VAR">sprite</field></block>"#));
    }

    #[test]
    fn test_top_level_block_detection() {
        let f = SyntaxFactory::new("main.ts", "function go() {}\ngo();\n");
        let function = f.function("go", 0, Vec::new(), f.empty_block(0));
        let call = f.expr_stmt(f.call(f.ident("go", 1, Type::Unknown), Vec::new(), None, Type::Void));
        assert!(is_top_level_block(&function));
        assert!(!is_top_level_block(&call));
    }
}
