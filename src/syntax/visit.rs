//! Обход дерева (enter/leave) по образцу визитора арены.

use super::ast::*;

/// Контроль обхода.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitControl {
    Continue,
    SkipChildren,
    Stop,
}

/// Ссылка на посещаемый узел
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Statement(&'a Statement),
    Expression(&'a Expression),
    Declaration(&'a VariableDeclaration),
    Identifier(&'a Identifier),
}

/// Visitor API (enter/leave). Возвращаем VisitControl из enter.
pub trait Visitor<'a> {
    fn enter(&mut self, _node: NodeRef<'a>) -> VisitControl {
        VisitControl::Continue
    }
    fn leave(&mut self, _node: NodeRef<'a>) {}
}

/// Обход списка операторов в порядке исходного текста. Возвращает true если не прерван.
pub fn walk_statements<'a, V: Visitor<'a>>(statements: &'a [Statement], visitor: &mut V) -> bool {
    statements.iter().all(|s| walk_statement(s, visitor))
}

pub fn walk_statement<'a, V: Visitor<'a>>(stmt: &'a Statement, visitor: &mut V) -> bool {
    inner(NodeRef::Statement(stmt), visitor).is_some()
}

pub fn walk_expression<'a, V: Visitor<'a>>(expr: &'a Expression, visitor: &mut V) -> bool {
    inner(NodeRef::Expression(expr), visitor).is_some()
}

fn inner<'a, V: Visitor<'a>>(node: NodeRef<'a>, vis: &mut V) -> Option<()> {
    match vis.enter(node) {
        VisitControl::Continue => children(node, vis)?,
        VisitControl::SkipChildren => {}
        VisitControl::Stop => return None,
    }
    vis.leave(node);
    Some(())
}

fn children<'a, V: Visitor<'a>>(node: NodeRef<'a>, vis: &mut V) -> Option<()> {
    match node {
        NodeRef::Statement(stmt) => statement_children(stmt, vis),
        NodeRef::Expression(expr) => expression_children(expr, vis),
        NodeRef::Declaration(decl) => {
            binding_name(&decl.name, vis)?;
            opt_expr(decl.initializer.as_ref(), vis)
        }
        NodeRef::Identifier(_) => Some(()),
    }
}

fn stmt<'a, V: Visitor<'a>>(s: &'a Statement, vis: &mut V) -> Option<()> {
    inner(NodeRef::Statement(s), vis)
}

fn expr<'a, V: Visitor<'a>>(e: &'a Expression, vis: &mut V) -> Option<()> {
    inner(NodeRef::Expression(e), vis)
}

fn opt_expr<'a, V: Visitor<'a>>(e: Option<&'a Expression>, vis: &mut V) -> Option<()> {
    match e {
        Some(e) => expr(e, vis),
        None => Some(()),
    }
}

fn ident<'a, V: Visitor<'a>>(i: &'a Identifier, vis: &mut V) -> Option<()> {
    inner(NodeRef::Identifier(i), vis)
}

fn binding_name<'a, V: Visitor<'a>>(name: &'a BindingName, vis: &mut V) -> Option<()> {
    match name {
        BindingName::Identifier { identifier } => ident(identifier, vis),
        BindingName::ObjectPattern { elements, .. } | BindingName::ArrayPattern { elements, .. } => {
            for element in elements {
                binding_name(&element.name, vis)?;
            }
            Some(())
        }
    }
}

fn declarations<'a, V: Visitor<'a>>(decls: &'a [VariableDeclaration], vis: &mut V) -> Option<()> {
    for decl in decls {
        inner(NodeRef::Declaration(decl), vis)?;
    }
    Some(())
}

fn for_initializer<'a, V: Visitor<'a>>(init: &'a ForInitializer, vis: &mut V) -> Option<()> {
    match init {
        ForInitializer::Declarations { declarations: decls } => declarations(decls, vis),
        ForInitializer::Expression { expression } => expr(expression, vis),
    }
}

fn parameters<'a, V: Visitor<'a>>(params: &'a [Parameter], vis: &mut V) -> Option<()> {
    for param in params {
        binding_name(&param.name, vis)?;
        opt_expr(param.initializer.as_ref(), vis)?;
    }
    Some(())
}

fn function<'a, V: Visitor<'a>>(decl: &'a FunctionDeclaration, vis: &mut V) -> Option<()> {
    if let Some(name) = &decl.name {
        ident(name, vis)?;
    }
    parameters(&decl.parameters, vis)?;
    match &decl.body {
        Some(body) => stmt(body, vis),
        None => Some(()),
    }
}

fn statement_children<'a, V: Visitor<'a>>(s: &'a Statement, vis: &mut V) -> Option<()> {
    match &s.kind {
        StatementKind::Block { statements } => {
            for child in statements {
                stmt(child, vis)?;
            }
        }
        StatementKind::Expression { expression } => expr(expression, vis)?,
        StatementKind::Variable { declarations: decls } => declarations(decls, vis)?,
        StatementKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            expr(condition, vis)?;
            stmt(then_branch, vis)?;
            if let Some(else_branch) = else_branch {
                stmt(else_branch, vis)?;
            }
        }
        StatementKind::While { condition, body } => {
            expr(condition, vis)?;
            stmt(body, vis)?;
        }
        StatementKind::DoWhile { body, condition } => {
            stmt(body, vis)?;
            expr(condition, vis)?;
        }
        StatementKind::For {
            initializer,
            condition,
            incrementor,
            body,
        } => {
            if let Some(init) = initializer {
                for_initializer(init, vis)?;
            }
            opt_expr(condition.as_ref(), vis)?;
            opt_expr(incrementor.as_ref(), vis)?;
            stmt(body, vis)?;
        }
        StatementKind::ForOf {
            initializer,
            iterable,
            body,
        } => {
            for_initializer(initializer, vis)?;
            expr(iterable, vis)?;
            stmt(body, vis)?;
        }
        StatementKind::ForIn {
            initializer,
            object,
            body,
        } => {
            for_initializer(initializer, vis)?;
            expr(object, vis)?;
            stmt(body, vis)?;
        }
        StatementKind::Function { declaration } => function(declaration, vis)?,
        StatementKind::Return { value } => opt_expr(value.as_ref(), vis)?,
        StatementKind::Enum { declaration } => {
            ident(&declaration.name, vis)?;
            for member in &declaration.members {
                ident(&member.name, vis)?;
                opt_expr(member.initializer.as_ref(), vis)?;
            }
        }
        StatementKind::Namespace { name, body } => {
            ident(name, vis)?;
            for child in body {
                stmt(child, vis)?;
            }
        }
        StatementKind::Switch {
            discriminant,
            clauses,
        } => {
            expr(discriminant, vis)?;
            for clause in clauses {
                opt_expr(clause.test.as_ref(), vis)?;
                for child in &clause.body {
                    stmt(child, vis)?;
                }
            }
        }
        StatementKind::Try {
            block,
            catch_clause,
            finally_block,
        } => {
            stmt(block, vis)?;
            if let Some(clause) = catch_clause {
                if let Some(param) = &clause.parameter {
                    ident(param, vis)?;
                }
                stmt(&clause.block, vis)?;
            }
            if let Some(finally_block) = finally_block {
                stmt(finally_block, vis)?;
            }
        }
        StatementKind::Throw { expression } => expr(expression, vis)?,
        StatementKind::Labeled { body, .. } => stmt(body, vis)?,
        StatementKind::Break { .. }
        | StatementKind::Continue { .. }
        | StatementKind::Debugger
        | StatementKind::Class { .. }
        | StatementKind::Interface { .. }
        | StatementKind::TypeAlias { .. }
        | StatementKind::Import
        | StatementKind::Empty => {}
    }
    Some(())
}

fn expression_children<'a, V: Visitor<'a>>(e: &'a Expression, vis: &mut V) -> Option<()> {
    match &e.kind {
        ExpressionKind::Identifier { identifier } => ident(identifier, vis)?,
        ExpressionKind::Template { spans, .. } => {
            for span in spans {
                expr(&span.expression, vis)?;
            }
        }
        ExpressionKind::TaggedTemplate { tag, .. } => expr(tag, vis)?,
        ExpressionKind::Parenthesized { expression } => expr(expression, vis)?,
        ExpressionKind::Binary { left, right, .. } => {
            expr(left, vis)?;
            expr(right, vis)?;
        }
        ExpressionKind::Assignment { target, value, .. } => {
            expr(target, vis)?;
            expr(value, vis)?;
        }
        ExpressionKind::PrefixUnary { operand, .. } | ExpressionKind::PostfixUnary { operand, .. } => {
            expr(operand, vis)?
        }
        // имя свойства не является ссылкой на переменную
        ExpressionKind::PropertyAccess { object, .. } => expr(object, vis)?,
        ExpressionKind::ElementAccess { object, index } => {
            expr(object, vis)?;
            expr(index, vis)?;
        }
        ExpressionKind::Call {
            callee, arguments, ..
        }
        | ExpressionKind::New { callee, arguments } => {
            expr(callee, vis)?;
            for arg in arguments {
                expr(arg, vis)?;
            }
        }
        ExpressionKind::ArrayLiteral { elements } => {
            for element in elements {
                expr(element, vis)?;
            }
        }
        ExpressionKind::ObjectLiteral { properties } => {
            for property in properties {
                match &property.value {
                    Some(value) => expr(value, vis)?,
                    // сокращённая запись `{ a }` ссылается на переменную `a`
                    None => ident(&property.name, vis)?,
                }
            }
        }
        ExpressionKind::Arrow {
            parameters: params,
            body,
        } => {
            parameters(params, vis)?;
            match body {
                ArrowBody::Block { block } => stmt(block, vis)?,
                ArrowBody::Expression { expression } => expr(expression, vis)?,
            }
        }
        ExpressionKind::FunctionExpression { declaration } => function(declaration, vis)?,
        ExpressionKind::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            expr(condition, vis)?;
            expr(when_true, vis)?;
            expr(when_false, vis)?;
        }
        ExpressionKind::As { expression, .. } => expr(expression, vis)?,
        ExpressionKind::Numeric { .. }
        | ExpressionKind::String { .. }
        | ExpressionKind::NoSubstitutionTemplate { .. }
        | ExpressionKind::True
        | ExpressionKind::False
        | ExpressionKind::Null
        | ExpressionKind::This => {}
    }
    Some(())
}

/// Собирает все идентификаторы-ссылки внутри оператора
pub fn collect_identifiers(stmt: &Statement) -> Vec<&Identifier> {
    collect(NodeRef::Statement(stmt))
}

/// То же для выражения
pub fn collect_expression_identifiers(expr: &Expression) -> Vec<&Identifier> {
    collect(NodeRef::Expression(expr))
}

fn collect(node: NodeRef<'_>) -> Vec<&Identifier> {
    struct Collector<'a> {
        found: Vec<&'a Identifier>,
    }
    impl<'a> Visitor<'a> for Collector<'a> {
        fn enter(&mut self, node: NodeRef<'a>) -> VisitControl {
            if let NodeRef::Identifier(identifier) = node {
                self.found.push(identifier);
            }
            VisitControl::Continue
        }
    }
    let mut collector = Collector { found: Vec::new() };
    inner(node, &mut collector);
    collector.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::TextSpan;

    fn ident_expr(name: &str, start: usize) -> Expression {
        let span = TextSpan::new(start, start + name.len());
        Expression::new(
            ExpressionKind::Identifier {
                identifier: Identifier::new(name, span),
            },
            span,
            Type::Number,
        )
    }

    #[test]
    fn test_collect_identifiers_skips_property_names() {
        // a.b + c
        let access = Expression::new(
            ExpressionKind::PropertyAccess {
                object: Box::new(ident_expr("a", 0)),
                name: Identifier::new("b", TextSpan::new(2, 3)),
                symbol: None,
            },
            TextSpan::new(0, 3),
            Type::Number,
        );
        let sum = Expression::new(
            ExpressionKind::Binary {
                left: Box::new(access),
                operator: BinaryOperator::Add,
                right: Box::new(ident_expr("c", 6)),
            },
            TextSpan::new(0, 7),
            Type::Number,
        );
        let stmt = Statement::new(StatementKind::Expression { expression: sum }, TextSpan::new(0, 8));
        let names: Vec<_> = collect_identifiers(&stmt).iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    struct StopAtFirst {
        seen: usize,
    }
    impl<'a> Visitor<'a> for StopAtFirst {
        fn enter(&mut self, node: NodeRef<'a>) -> VisitControl {
            if let NodeRef::Identifier(_) = node {
                self.seen += 1;
                return VisitControl::Stop;
            }
            VisitControl::Continue
        }
    }

    #[test]
    fn test_walk_stops() {
        let stmt = Statement::new(
            StatementKind::Expression {
                expression: ident_expr("a", 0),
            },
            TextSpan::new(0, 2),
        );
        let mut v = StopAtFirst { seen: 0 };
        assert!(!walk_statement(&stmt, &mut v));
        assert_eq!(v.seen, 1);
    }
}
