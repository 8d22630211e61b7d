/*!
# Syntax factory

Hand construction of syntax trees for tests, available to other crates with
the `test-support` feature. Spans are located by searching the source text, so every
constructor receives the child nodes and derives its own span from them and
the surrounding keywords and delimiters.

Identifiers that are declared through [`SyntaxFactory::declare`] receive a
fresh binding id; later references through [`SyntaxFactory::ident`] resolve
to the most recent declaration of the same name.
*/

use super::ast::*;
use crate::core::position::TextSpan;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub struct SyntaxFactory {
    file_name: String,
    text: String,
    next_binding: Cell<BindingId>,
    scopes: RefCell<HashMap<String, BindingId>>,
}

impl SyntaxFactory {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
            next_binding: Cell::new(1),
            scopes: RefCell::new(HashMap::new()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file(&self, statements: Vec<Statement>) -> SourceFile {
        SourceFile::new(self.file_name.clone(), self.text.clone(), statements)
    }

    // ----- поиск в тексте -----

    /// Span of the `nth` (zero-based) occurrence of `snippet`.
    pub fn span_nth(&self, snippet: &str, nth: usize) -> TextSpan {
        let mut from = 0;
        let mut seen = 0;
        while let Some(pos) = self.text.get(from..).and_then(|rest| rest.find(snippet)) {
            let start = from + pos;
            if seen == nth {
                return TextSpan::new(start, start + snippet.len());
            }
            seen += 1;
            from = start + snippet.len().max(1);
        }
        self.missing(snippet)
    }

    pub fn span(&self, snippet: &str) -> TextSpan {
        self.span_nth(snippet, 0)
    }

    /// Span of the `nth` whole-word occurrence of `word`.
    pub fn word_nth(&self, word: &str, nth: usize) -> TextSpan {
        let bytes = self.text.as_bytes();
        let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'$';
        let mut from = 0;
        let mut seen = 0;
        while let Some(pos) = self.text.get(from..).and_then(|rest| rest.find(word)) {
            let start = from + pos;
            let end = start + word.len();
            let before_ok = start == 0 || !is_word(bytes[start - 1]);
            let after_ok = end >= bytes.len() || !is_word(bytes[end]);
            if before_ok && after_ok {
                if seen == nth {
                    return TextSpan::new(start, end);
                }
                seen += 1;
            }
            from = end.max(start + 1);
        }
        self.missing(word)
    }

    fn missing(&self, snippet: &str) -> TextSpan {
        tracing::warn!("snippet {:?} not found in {}", snippet, self.file_name);
        TextSpan::new(self.text.len(), self.text.len())
    }

    fn find_from(&self, needle: &str, from: usize) -> Option<usize> {
        self.text.get(from..)?.find(needle).map(|p| p + from)
    }

    fn rfind_before(&self, needle: &str, before: usize) -> Option<usize> {
        self.text.get(..before)?.rfind(needle)
    }

    /// Extends `end` over trailing spaces and a `;` if one follows.
    fn with_semicolon(&self, end: usize) -> usize {
        let rest = self.text.get(end..).unwrap_or("");
        let trimmed = rest.trim_start_matches([' ', '\t']);
        if trimmed.starts_with(';') {
            end + (rest.len() - trimmed.len()) + 1
        } else {
            end
        }
    }

    fn keyword_start(&self, keyword: &str, before: usize) -> usize {
        self.rfind_before(keyword, before).unwrap_or(before)
    }

    fn closing_after(&self, delimiter: &str, from: usize) -> usize {
        self.find_from(delimiter, from)
            .map(|p| p + delimiter.len())
            .unwrap_or(from)
    }

    // ----- идентификаторы -----

    /// Declares `name` at its `nth` whole-word occurrence with a fresh binding.
    pub fn declare(&self, name: &str, nth: usize) -> Identifier {
        let binding = self.next_binding.get();
        self.next_binding.set(binding + 1);
        self.scopes.borrow_mut().insert(name.to_string(), binding);
        Identifier::new(name, self.word_nth(name, nth)).with_binding(binding)
    }

    /// Reference to the latest declaration of `name`.
    pub fn reference(&self, name: &str, nth: usize) -> Identifier {
        let identifier = Identifier::new(name, self.word_nth(name, nth));
        match self.scopes.borrow().get(name) {
            Some(binding) => identifier.with_binding(*binding),
            None => identifier,
        }
    }

    // ----- выражения -----

    pub fn ident(&self, name: &str, nth: usize, ty: Type) -> Expression {
        let identifier = self.reference(name, nth);
        let span = identifier.span;
        Expression::new(ExpressionKind::Identifier { identifier }, span, ty)
    }

    pub fn num(&self, text: &str, nth: usize) -> Expression {
        Expression::new(
            ExpressionKind::Numeric {
                text: text.to_string(),
            },
            self.word_nth(text, nth),
            Type::Number,
        )
    }

    /// String literal; `value` is located together with its quotes.
    pub fn string(&self, value: &str, nth: usize) -> Expression {
        let double = format!("\"{}\"", value);
        let single = format!("'{}'", value);
        let span = if self.text.contains(&double) {
            self.span_nth(&double, nth)
        } else {
            self.span_nth(&single, nth)
        };
        Expression::new(
            ExpressionKind::String {
                value: value.to_string(),
            },
            span,
            Type::String,
        )
    }

    pub fn boolean(&self, value: bool, nth: usize) -> Expression {
        let (kind, word) = if value {
            (ExpressionKind::True, "true")
        } else {
            (ExpressionKind::False, "false")
        };
        Expression::new(kind, self.word_nth(word, nth), Type::Boolean)
    }

    pub fn null(&self, nth: usize) -> Expression {
        Expression::new(ExpressionKind::Null, self.word_nth("null", nth), Type::Any)
    }

    pub fn binary(&self, left: Expression, operator: BinaryOperator, right: Expression, ty: Type) -> Expression {
        let span = TextSpan::new(left.span.start, right.span.end);
        Expression::new(
            ExpressionKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            span,
            ty,
        )
    }

    pub fn paren(&self, inner: Expression) -> Expression {
        let start = self.keyword_start("(", inner.span.start);
        let end = self.closing_after(")", inner.span.end);
        let ty = inner.ty.clone();
        Expression::new(
            ExpressionKind::Parenthesized {
                expression: Box::new(inner),
            },
            TextSpan::new(start, end),
            ty,
        )
    }

    pub fn prefix(&self, operator: UnaryOperator, operand: Expression) -> Expression {
        let token = match operator {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::Increment => "++",
            UnaryOperator::Decrement => "--",
        };
        let span = TextSpan::new(self.keyword_start(token, operand.span.start), operand.span.end);
        let ty = if operator == UnaryOperator::Not {
            Type::Boolean
        } else {
            operand.ty.clone()
        };
        Expression::new(
            ExpressionKind::PrefixUnary {
                operator,
                operand: Box::new(operand),
            },
            span,
            ty,
        )
    }

    pub fn postfix(&self, operand: Expression, operator: UnaryOperator) -> Expression {
        let span = TextSpan::new(operand.span.start, operand.span.end + 2);
        let ty = operand.ty.clone();
        Expression::new(
            ExpressionKind::PostfixUnary {
                operator,
                operand: Box::new(operand),
            },
            span,
            ty,
        )
    }

    pub fn assign(&self, target: Expression, operator: AssignmentOperator, value: Expression) -> Expression {
        let span = TextSpan::new(target.span.start, value.span.end);
        let ty = value.ty.clone();
        Expression::new(
            ExpressionKind::Assignment {
                target: Box::new(target),
                operator,
                value: Box::new(value),
            },
            span,
            ty,
        )
    }

    /// `object.name`; the name is the first whole word after the object.
    pub fn property(&self, object: Expression, name: &str, symbol: Option<&str>, ty: Type) -> Expression {
        let name_start = self
            .find_from(name, object.span.end)
            .unwrap_or(object.span.end);
        let name_span = TextSpan::new(name_start, name_start + name.len());
        Expression::new(
            ExpressionKind::PropertyAccess {
                object: Box::new(object.clone()),
                name: Identifier::new(name, name_span),
                symbol: symbol.map(str::to_string),
            },
            TextSpan::new(object.span.start, name_span.end),
            ty,
        )
    }

    /// Dotted path such as `basic.showNumber` as identifier plus property accesses.
    pub fn path(&self, dotted: &str, nth: usize, symbol: Option<&str>, ty: Type) -> Expression {
        let whole = self.span_nth(dotted, nth);
        let mut parts = dotted.split('.');
        let first = parts.next().unwrap_or_default();
        let first_span = TextSpan::new(whole.start, whole.start + first.len());
        let mut expr = Expression::new(
            ExpressionKind::Identifier {
                identifier: Identifier::new(first, first_span),
            },
            first_span,
            Type::Unknown,
        );
        let rest: Vec<&str> = parts.collect();
        for (i, part) in rest.iter().enumerate() {
            let last = i + 1 == rest.len();
            let name_start = expr.span.end + 1;
            let name_span = TextSpan::new(name_start, name_start + part.len());
            expr = Expression::new(
                ExpressionKind::PropertyAccess {
                    object: Box::new(expr),
                    name: Identifier::new(*part, name_span),
                    symbol: if last { symbol.map(str::to_string) } else { None },
                },
                TextSpan::new(whole.start, name_span.end),
                if last { ty.clone() } else { Type::Unknown },
            );
        }
        expr
    }

    pub fn element(&self, object: Expression, index: Expression, ty: Type) -> Expression {
        let end = self.closing_after("]", index.span.end);
        let span = TextSpan::new(object.span.start, end);
        Expression::new(
            ExpressionKind::ElementAccess {
                object: Box::new(object),
                index: Box::new(index),
            },
            span,
            ty,
        )
    }

    /// Array literal; `nth` selects the `[` that opens it.
    pub fn array(&self, elements: Vec<Expression>, nth: usize, ty: Type) -> Expression {
        let open = self.span_nth("[", nth).start;
        let from = elements.last().map(|e| e.span.end).unwrap_or(open);
        let end = self.closing_after("]", from);
        Expression::new(
            ExpressionKind::ArrayLiteral { elements },
            TextSpan::new(open, end),
            ty,
        )
    }

    pub fn call(&self, callee: Expression, arguments: Vec<Expression>, symbol: Option<&str>, ty: Type) -> Expression {
        let from = arguments
            .last()
            .map(|a| a.span.end)
            .unwrap_or(callee.span.end);
        let end = self.closing_after(")", from);
        let span = TextSpan::new(callee.span.start, end);
        Expression::new(
            ExpressionKind::Call {
                callee: Box::new(callee),
                arguments,
                symbol: symbol.map(str::to_string),
            },
            span,
            ty,
        )
    }

    pub fn param(&self, name: &str, nth: usize, ty: Type) -> Parameter {
        let identifier = self.declare(name, nth);
        let mut span = identifier.span;
        let rest = self.text.get(span.end..).unwrap_or("");
        if let Some(colon) = rest.strip_prefix(':') {
            let type_len = colon
                .find([',', ')', '='])
                .unwrap_or(colon.len());
            span.end += 1 + colon[..type_len].trim_end().len();
        }
        Parameter {
            name: BindingName::Identifier { identifier },
            ty,
            initializer: None,
            optional: false,
            rest: false,
            span,
        }
    }

    /// Arrow function with a block body.
    pub fn arrow(&self, parameters: Vec<Parameter>, body: Statement) -> Expression {
        let arrow_at = self.keyword_start("=>", body.span.start);
        let start = match parameters.first() {
            Some(first) => self.rfind_before("(", first.span.start).unwrap_or(first.span.start),
            None => self.keyword_start("(", arrow_at),
        };
        let span = TextSpan::new(start, body.span.end);
        Expression::new(
            ExpressionKind::Arrow {
                parameters,
                body: ArrowBody::Block {
                    block: Box::new(body),
                },
            },
            span,
            Type::Named {
                name: "function".to_string(),
            },
        )
    }

    pub fn tagged_template(&self, tag: &str, template: &str, symbol: &str) -> Expression {
        let tag_span = self.word_nth(tag, 0);
        let end = self
            .find_from("`", tag_span.end)
            .and_then(|open| self.find_from("`", open + 1))
            .map(|close| close + 1)
            .unwrap_or(tag_span.end);
        Expression::new(
            ExpressionKind::TaggedTemplate {
                tag: Box::new(Expression::new(
                    ExpressionKind::Identifier {
                        identifier: Identifier::new(tag, tag_span),
                    },
                    tag_span,
                    Type::Unknown,
                )),
                template: template.to_string(),
                has_substitutions: false,
                symbol: Some(symbol.to_string()),
            },
            TextSpan::new(tag_span.start, end),
            Type::Named {
                name: "Image".to_string(),
            },
        )
    }

    pub fn typed(&self, mut expr: Expression, ty: Type) -> Expression {
        expr.ty = ty;
        expr
    }

    // ----- операторы -----

    pub fn expr_stmt(&self, expression: Expression) -> Statement {
        let span = TextSpan::new(expression.span.start, self.with_semicolon(expression.span.end));
        Statement::new(StatementKind::Expression { expression }, span)
    }

    pub fn declaration(&self, name: Identifier, initializer: Option<Expression>) -> VariableDeclaration {
        let end = initializer.as_ref().map(|i| i.span.end).unwrap_or(name.span.end);
        let span = TextSpan::new(name.span.start, end);
        VariableDeclaration {
            name: BindingName::Identifier { identifier: name },
            initializer,
            span,
        }
    }

    /// `let|const|var` statement.
    pub fn var_stmt(&self, declarations: Vec<VariableDeclaration>) -> Statement {
        let first = declarations.first().map(|d| d.span.start).unwrap_or(0);
        let last = declarations.last().map(|d| d.span.end).unwrap_or(first);
        let start = ["let", "const", "var"]
            .iter()
            .filter_map(|kw| self.rfind_before(kw, first))
            .max()
            .unwrap_or(first);
        Statement::new(
            StatementKind::Variable { declarations },
            TextSpan::new(start, self.with_semicolon(last)),
        )
    }

    /// Shorthand for `let name = initializer;` declaring `name` at its `nth` occurrence.
    pub fn let_stmt(&self, name: &str, nth: usize, initializer: Expression) -> Statement {
        let identifier = self.declare(name, nth);
        let decl = self.declaration(identifier, Some(initializer));
        self.var_stmt(vec![decl])
    }

    /// `{ ... }` around non-empty `statements`.
    pub fn block(&self, statements: Vec<Statement>) -> Statement {
        let first = statements.first().map(|s| s.span.start).unwrap_or(0);
        let last = statements.last().map(|s| s.span.end).unwrap_or(first);
        let start = self.keyword_start("{", first);
        let end = self.closing_after("}", last);
        Statement::new(StatementKind::Block { statements }, TextSpan::new(start, end))
    }

    /// Empty `{}` block at the `nth` occurrence of `{`.
    pub fn empty_block(&self, nth: usize) -> Statement {
        let open = self.span_nth("{", nth).start;
        let end = self.closing_after("}", open);
        Statement::new(
            StatementKind::Block {
                statements: Vec::new(),
            },
            TextSpan::new(open, end),
        )
    }

    pub fn if_stmt(&self, condition: Expression, then_branch: Statement, else_branch: Option<Statement>) -> Statement {
        let start = self.keyword_start("if", condition.span.start);
        let end = else_branch
            .as_ref()
            .map(|e| e.span.end)
            .unwrap_or(then_branch.span.end);
        Statement::new(
            StatementKind::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch: else_branch.map(Box::new),
            },
            TextSpan::new(start, end),
        )
    }

    pub fn while_stmt(&self, condition: Expression, body: Statement) -> Statement {
        let start = self.keyword_start("while", condition.span.start);
        let end = body.span.end;
        Statement::new(
            StatementKind::While {
                condition,
                body: Box::new(body),
            },
            TextSpan::new(start, end),
        )
    }

    pub fn for_stmt(
        &self,
        initializer: VariableDeclaration,
        condition: Expression,
        incrementor: Expression,
        body: Statement,
    ) -> Statement {
        let start = self.keyword_start("for", initializer.span.start);
        let end = body.span.end;
        Statement::new(
            StatementKind::For {
                initializer: Some(ForInitializer::Declarations {
                    declarations: vec![initializer],
                }),
                condition: Some(condition),
                incrementor: Some(incrementor),
                body: Box::new(body),
            },
            TextSpan::new(start, end),
        )
    }

    pub fn for_of(&self, variable: Identifier, iterable: Expression, body: Statement) -> Statement {
        let start = self.keyword_start("for", variable.span.start);
        let end = body.span.end;
        let decl = self.declaration(variable, None);
        Statement::new(
            StatementKind::ForOf {
                initializer: ForInitializer::Declarations {
                    declarations: vec![decl],
                },
                iterable,
                body: Box::new(body),
            },
            TextSpan::new(start, end),
        )
    }

    pub fn function(&self, name: &str, nth: usize, parameters: Vec<Parameter>, body: Statement) -> Statement {
        let identifier = Identifier::new(name, self.word_nth(name, nth));
        let start = self.keyword_start("function", identifier.span.start);
        let span = TextSpan::new(start, body.span.end);
        Statement::new(
            StatementKind::Function {
                declaration: FunctionDeclaration {
                    name: Some(identifier),
                    parameters,
                    body: Some(Box::new(body)),
                    span,
                },
            },
            span,
        )
    }

    pub fn return_stmt(&self, value: Expression) -> Statement {
        let start = self.keyword_start("return", value.span.start);
        let end = self.with_semicolon(value.span.end);
        Statement::new(StatementKind::Return { value: Some(value) }, TextSpan::new(start, end))
    }

    /// `break;`, `continue;`, `debugger;` or a bare `return;`
    pub fn keyword_stmt(&self, keyword: &str, nth: usize) -> Statement {
        let span = self.word_nth(keyword, nth);
        let span = TextSpan::new(span.start, self.with_semicolon(span.end));
        let kind = match keyword {
            "break" => StatementKind::Break { label: None },
            "continue" => StatementKind::Continue { label: None },
            "return" => StatementKind::Return { value: None },
            "debugger" => StatementKind::Debugger,
            _ => StatementKind::Empty,
        };
        Statement::new(kind, span)
    }

    /// Statement of a kind the factory has no dedicated constructor for,
    /// spanning the `nth` occurrence of `snippet`.
    pub fn raw_stmt(&self, kind: StatementKind, snippet: &str, nth: usize) -> Statement {
        Statement::new(kind, self.span_nth(snippet, nth))
    }

    pub fn enum_decl(&self, name: &str, members: Vec<(&str, Option<Expression>)>) -> Statement {
        let name_ident = Identifier::new(name, self.word_nth(name, 0));
        let start = self.keyword_start("enum", name_ident.span.start);
        let mut cursor = name_ident.span.end;
        let mut built = Vec::new();
        for (member, initializer) in members {
            let member_start = self.find_from(member, cursor).unwrap_or(cursor);
            let member_span = TextSpan::new(member_start, member_start + member.len());
            let end = initializer.as_ref().map(|i| i.span.end).unwrap_or(member_span.end);
            cursor = end;
            built.push(EnumMember {
                name: Identifier::new(member, member_span),
                initializer,
                span: TextSpan::new(member_start, end),
            });
        }
        let end = self.closing_after("}", cursor);
        Statement::new(
            StatementKind::Enum {
                declaration: EnumDeclaration {
                    name: name_ident,
                    members: built,
                },
            },
            TextSpan::new(start, end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_spans_follow_text() {
        let f = SyntaxFactory::new("main.ts", "let x = 5;\nx += 1;\n");
        let decl = f.let_stmt("x", 0, f.num("5", 0));
        assert_eq!(decl.span, TextSpan::new(0, 10));
        let update = f.expr_stmt(f.assign(
            f.ident("x", 1, Type::Number),
            AssignmentOperator::AddAssign,
            f.num("1", 0),
        ));
        assert_eq!(f.text_of(update.span), "x += 1;");
    }

    #[test]
    fn test_references_share_binding() {
        let f = SyntaxFactory::new("main.ts", "let i = 0; i;");
        let declared = f.declare("i", 0);
        let referenced = f.reference("i", 1);
        assert_eq!(declared.binding, referenced.binding);
        assert!(declared.binding.is_some());
    }

    #[test]
    fn test_call_span_covers_arguments() {
        let f = SyntaxFactory::new("main.ts", "basic.showNumber(5);");
        let call = f.call(
            f.path("basic.showNumber", 0, Some("basic.showNumber"), Type::Void),
            vec![f.num("5", 0)],
            Some("basic.showNumber"),
            Type::Void,
        );
        assert_eq!(call.span, TextSpan::new(0, 19));
        assert_eq!(f.expr_stmt(call).span, TextSpan::new(0, 20));
    }

    impl SyntaxFactory {
        fn text_of(&self, span: TextSpan) -> &str {
            span.slice(&self.text)
        }
    }
}
