//! Statement dispatch: control flow, variables, functions and keywords.

use crate::core::errors::{BuildResult, DecompileError};
use crate::core::position::TextSpan;
use crate::syntax::{
    collect_identifiers, AssignmentOperator, BinaryOperator, Expression, ExpressionKind,
    ForInitializer, FunctionDeclaration, Statement, StatementKind, UnaryOperator,
    VariableDeclaration,
};

use super::super::declarations::shadow_for_type;
use super::super::feasibility::{is_auto_declaration, Scope};
use super::super::nodes::{
    link_chain, MutationChild, OutputNode, StatementNode, ValueNode, BOOLEAN_SHADOW,
    NUMBER_SHADOW,
};
use super::{AutoDeclaration, DecompilerContext, FunctionScope};

impl<'a> DecompilerContext<'a> {
    /// Builds one statement into zero or more blocks and attaches its
    /// comments. Unsupported statements become a single opaque block.
    pub(super) fn build_statement(
        &mut self,
        stmt: &'a Statement,
        scope: Scope,
        lead_start: usize,
    ) -> BuildResult<Vec<StatementNode>> {
        let snapshot = self.snapshot();
        let result = match self.checker.check_statement(stmt, scope) {
            Ok(()) => self.build_statement_kind(stmt, scope),
            Err(reason) => Err(DecompileError::unsupported(reason, stmt.span)),
        };
        let mut nodes = match result {
            Ok(nodes) => nodes,
            Err(DecompileError::Unsupported { reason, .. }) => {
                self.restore(&snapshot);
                vec![self.grey_statement(stmt, &reason)?]
            }
            Err(err) => return Err(err),
        };

        // дочерние операторы блока уже получили свои комментарии
        if !matches!(stmt.kind, StatementKind::Block { .. }) {
            if let Some(head) = nodes.first_mut() {
                self.attach_comments(head, stmt.span, lead_start, scope);
            }
        }
        Ok(nodes)
    }

    fn build_statement_kind(&mut self, stmt: &'a Statement, scope: Scope) -> BuildResult<Vec<StatementNode>> {
        let span = stmt.span;
        let node = match &stmt.kind {
            StatementKind::Block { statements } => {
                return self.build_statements(statements, scope.nested(), span.start);
            }
            StatementKind::Expression { expression } => {
                self.build_expression_statement(expression, span, scope)?
            }
            StatementKind::Variable { declarations } => {
                let mut nodes = Vec::new();
                for declaration in declarations {
                    nodes.extend(self.build_variable_declaration(declaration)?);
                }
                return Ok(nodes);
            }
            StatementKind::If { .. } => self.build_if(stmt, scope)?,
            StatementKind::While { condition, body } => {
                let mut node = self.new_statement("device_while", Some(span))?;
                let cond = self.value_input("COND", condition, Some(BOOLEAN_SHADOW))?;
                node.block.inputs.push(cond);
                let body = self.build_body(body, scope.nested())?;
                node.handler("DO", body);
                node
            }
            StatementKind::For {
                initializer: Some(initializer),
                condition: Some(condition),
                body,
                ..
            } => self.build_for(span, initializer, condition, body, scope)?,
            StatementKind::ForOf {
                initializer,
                iterable,
                body,
            } => self.build_for_of(span, initializer, iterable, body, scope)?,
            StatementKind::Function { declaration } => self.build_function(span, declaration)?,
            StatementKind::Return { value } => {
                let mut node = self.new_statement("function_return", Some(span))?;
                match value {
                    Some(value) => {
                        let input = self.value_input("RETURN_VALUE", value, shadow_for_type(&value.ty))?;
                        node.block.inputs.push(input);
                    }
                    None => node.block.mutation_mut().set("no_return_value", "true"),
                }
                node
            }
            StatementKind::Break { .. } => self.new_statement("break_keyword", Some(span))?,
            StatementKind::Continue { .. } => self.new_statement("continue_keyword", Some(span))?,
            StatementKind::Debugger => self.new_statement("debugger_keyword", Some(span))?,
            // объявления без собственных блоков
            StatementKind::Enum { .. } | StatementKind::Namespace { .. } | StatementKind::Empty => {
                return Ok(Vec::new());
            }
            other => {
                return Err(DecompileError::unsupported(
                    format!("Unsupported statement in block: {}", other.kind_name()),
                    span,
                ))
            }
        };
        Ok(vec![node])
    }

    /// Builds a statement list; each statement's leading comments are
    /// searched from the end of the previous one.
    pub(super) fn build_statements(
        &mut self,
        statements: &'a [Statement],
        scope: Scope,
        mut lead_start: usize,
    ) -> BuildResult<Vec<StatementNode>> {
        let mut nodes = Vec::new();
        for stmt in statements {
            let built = self.build_statement(stmt, scope, lead_start)?;
            if !built.is_empty() {
                lead_start = stmt.span.end;
            }
            nodes.extend(built);
        }
        Ok(nodes)
    }

    /// Body of a loop, branch or handler as one linked chain.
    pub(super) fn build_body(&mut self, body: &'a Statement, scope: Scope) -> BuildResult<Option<StatementNode>> {
        let nodes = self.build_statement(body, scope, body.span.start)?;
        Ok(link_chain(nodes))
    }

    pub(super) fn build_expression_statement(
        &mut self,
        expression: &'a Expression,
        span: TextSpan,
        scope: Scope,
    ) -> BuildResult<StatementNode> {
        let expression = expression.skip_parentheses();
        match &expression.kind {
            ExpressionKind::Call { .. } => self.build_call_statement(expression, span, scope),
            ExpressionKind::Assignment {
                target,
                operator,
                value,
            } => self.build_assignment(span, target, *operator, value),
            ExpressionKind::PrefixUnary { operator, operand }
            | ExpressionKind::PostfixUnary { operator, operand } => {
                let Some(identifier) = operand.skip_parentheses().as_identifier() else {
                    return Err(DecompileError::unsupported(
                        "-- and ++ may only be used on an identifier",
                        span,
                    ));
                };
                let delta = match operator {
                    UnaryOperator::Increment => "1",
                    UnaryOperator::Decrement => "-1",
                    _ => {
                        return Err(DecompileError::unsupported(
                            "Only ++ and -- supported as prefix or postfix unary operators in a statement",
                            span,
                        ))
                    }
                };
                let mut node = self.new_statement("variables_change", Some(span))?;
                let name = self.variable_name(identifier);
                node.block.field("VAR", name);
                let value = self.number_literal(delta)?;
                node.block.inputs.push(ValueNode::new(
                    "VALUE",
                    OutputNode::Expression(value),
                    Some(NUMBER_SHADOW),
                ));
                Ok(node)
            }
            other => Err(DecompileError::unsupported(
                format!("Unsupported statement in block: {}", other.kind_name()),
                span,
            )),
        }
    }

    fn build_assignment(
        &mut self,
        span: TextSpan,
        target: &'a Expression,
        operator: AssignmentOperator,
        value: &'a Expression,
    ) -> BuildResult<StatementNode> {
        let target = target.skip_parentheses();
        match &target.kind {
            ExpressionKind::Identifier { identifier } => {
                let block_type = match operator {
                    AssignmentOperator::Assign => "variables_set",
                    AssignmentOperator::AddAssign | AssignmentOperator::SubtractAssign => {
                        "variables_change"
                    }
                    other => {
                        return Err(DecompileError::unsupported(
                            format!("Unsupported operator token in statement {}", other.token()),
                            span,
                        ))
                    }
                };
                let mut node = self.new_statement(block_type, Some(span))?;
                let name = self.variable_name(identifier);
                node.block.field("VAR", name);
                let input = if operator == AssignmentOperator::SubtractAssign {
                    let negated = self.negated(value)?;
                    ValueNode::new("VALUE", OutputNode::Expression(negated), Some(NUMBER_SHADOW))
                } else {
                    self.value_input("VALUE", value, Some(NUMBER_SHADOW))?
                };
                node.block.inputs.push(input);
                Ok(node)
            }
            ExpressionKind::ElementAccess { object, index } => {
                let mut node = self.new_statement("lists_index_set", Some(span))?;
                let list = self.value_input("LIST", object, None)?;
                let index = self.value_input("INDEX", index, Some(NUMBER_SHADOW))?;
                let value = self.value_input("VALUE", value, shadow_for_type(&value.ty))?;
                node.block.inputs.extend([list, index, value]);
                Ok(node)
            }
            ExpressionKind::PropertyAccess { object, symbol, .. } => {
                let info = symbol
                    .as_deref()
                    .and_then(|s| self.metadata.lookup(s))
                    .ok_or_else(|| DecompileError::unsupported("No call info found", span))?;
                let block_id = match operator {
                    AssignmentOperator::Assign => info.attributes.property_setter.as_ref(),
                    AssignmentOperator::AddAssign => info.attributes.property_updater.as_ref(),
                    _ => None,
                }
                .ok_or_else(|| {
                    DecompileError::unsupported("Property has no block for this assignment", span)
                })?;
                let mut node = self.new_statement(block_id, Some(span))?;
                node.block.field("property", info.qualified_name.clone());
                let receiver = self.value_input("obj", object, None)?;
                let value = self.value_input("value", value, shadow_for_type(&value.ty))?;
                node.block.inputs.extend([receiver, value]);
                Ok(node)
            }
            _ => Err(DecompileError::unsupported(
                "Only variable names may be assigned to",
                span,
            )),
        }
    }

    /// `let a = value` becomes `variables_set`; auto-declarations are
    /// deferred and only emitted if nothing references the variable.
    fn build_variable_declaration(
        &mut self,
        declaration: &'a VariableDeclaration,
    ) -> BuildResult<Option<StatementNode>> {
        let Some(identifier) = declaration.name.identifier() else {
            return Err(DecompileError::unsupported(
                "Variable declarations may not use binding patterns",
                declaration.span,
            ));
        };
        let Some(init) = &declaration.initializer else {
            return Err(DecompileError::unsupported(
                "Variable declarations must have an initializer",
                declaration.span,
            ));
        };
        let name = self.renames.name_of(identifier).to_string();
        if is_auto_declaration(declaration, self.metadata) {
            tracing::trace!("deferring auto declaration of {}", name);
            self.auto_declarations.push(AutoDeclaration {
                name,
                declaration,
                span: declaration.span,
            });
            return Ok(None);
        }
        self.used_variables.insert(name.clone());
        let mut node = self.new_statement("variables_set", Some(declaration.span))?;
        node.block.field("VAR", name);
        let value = self.value_input("VALUE", init, Some(NUMBER_SHADOW))?;
        node.block.inputs.push(value);
        Ok(Some(node))
    }

    /// `if / else if / else` chain as one `controls_if`.
    fn build_if(&mut self, stmt: &'a Statement, scope: Scope) -> BuildResult<StatementNode> {
        let mut branches = Vec::new();
        let mut else_branch = None;
        let mut current = stmt;
        loop {
            let StatementKind::If {
                condition,
                then_branch,
                else_branch: next,
            } = &current.kind
            else {
                else_branch = Some(current);
                break;
            };
            branches.push((condition, then_branch.as_ref()));
            match next {
                Some(next) => current = &**next,
                None => break,
            }
        }

        let mut node = self.new_statement("controls_if", Some(stmt.span))?;
        let mutation = node.block.mutation_mut();
        mutation.set("elseif", (branches.len() - 1).to_string());
        mutation.set("else", if else_branch.is_some() { "1" } else { "0" });

        for (i, (condition, body)) in branches.into_iter().enumerate() {
            let input = self.value_input(format!("IF{}", i), condition, Some(BOOLEAN_SHADOW))?;
            node.block.inputs.push(input);
            let body = self.build_body(body, scope.nested())?;
            node.handler(format!("DO{}", i), body);
        }
        if let Some(else_branch) = else_branch {
            let body = self.build_body(else_branch, scope.nested())?;
            node.handler("ELSE", body);
        }
        Ok(node)
    }

    /// Canonical counting loop. The index must not appear in the body for
    /// the loop to become `controls_repeat_ext`.
    fn build_for(
        &mut self,
        span: TextSpan,
        initializer: &'a ForInitializer,
        condition: &'a Expression,
        body: &'a Statement,
        scope: Scope,
    ) -> BuildResult<StatementNode> {
        let index = match initializer {
            ForInitializer::Declarations { declarations } => {
                declarations.first().and_then(|d| d.name.identifier())
            }
            ForInitializer::Expression { .. } => None,
        };
        let ExpressionKind::Binary {
            operator, right, ..
        } = &condition.skip_parentheses().kind
        else {
            return Err(DecompileError::unsupported(
                "for loop conditionals must be binary comparison operations",
                span,
            ));
        };
        let Some(index) = index else {
            return Err(DecompileError::unsupported(
                "only variable declarations are permitted in for loop initializers",
                span,
            ));
        };

        let index_name = self.renames.name_of(index).to_string();
        let index_used = collect_identifiers(body)
            .into_iter()
            .any(|ident| self.renames.name_of(ident) == index_name);

        if *operator == BinaryOperator::Less && !index_used {
            let mut node = self.new_statement("controls_repeat_ext", Some(span))?;
            let times = self.value_input("TIMES", right, Some(NUMBER_SHADOW))?;
            node.block.inputs.push(times);
            let body = self.build_body(body, scope.nested())?;
            node.handler("DO", body);
            return Ok(node);
        }

        let mut node = self.new_statement("pxt_controls_for", Some(span))?;
        self.used_variables.insert(index_name.clone());
        let mut reporter = self.new_expression("variables_get_reporter")?;
        reporter.block.field("VAR", index_name);
        reporter.is_shadow = true;
        node.block
            .inputs
            .push(ValueNode::new("VAR", OutputNode::Expression(reporter), None));

        let to = if *operator == BinaryOperator::Less {
            self.bound_minus_one(right)?
        } else {
            self.build_expression(right)?
        };
        node.block
            .inputs
            .push(ValueNode::new("TO", OutputNode::Expression(to), Some(NUMBER_SHADOW)));
        let body = self.build_body(body, scope.nested())?;
        node.handler("DO", body);
        Ok(node)
    }

    fn build_for_of(
        &mut self,
        span: TextSpan,
        initializer: &'a ForInitializer,
        iterable: &'a Expression,
        body: &'a Statement,
        scope: Scope,
    ) -> BuildResult<StatementNode> {
        let variable = match initializer {
            ForInitializer::Declarations { declarations } if declarations.len() == 1 => {
                declarations[0].name.identifier()
            }
            _ => None,
        }
        .ok_or_else(|| {
            DecompileError::unsupported(
                "only variable declarations are permitted in for of loop initializers",
                span,
            )
        })?;

        let mut node = self.new_statement("pxt_controls_for_of", Some(span))?;
        let name = self.variable_name(variable);
        let mut reporter = self.new_expression("variables_get_reporter")?;
        reporter.block.field("VAR", name);
        reporter.is_shadow = true;
        node.block
            .inputs
            .push(ValueNode::new("VAR", OutputNode::Expression(reporter), None));
        let list = self.value_input("LIST", iterable, None)?;
        node.block.inputs.push(list);
        let body = self.build_body(body, scope.nested())?;
        node.handler("DO", body);
        Ok(node)
    }

    fn build_function(&mut self, span: TextSpan, declaration: &'a FunctionDeclaration) -> BuildResult<StatementNode> {
        let (Some(name), Some(body)) = (&declaration.name, &declaration.body) else {
            return Err(DecompileError::unsupported(
                "Function declarations must have a name and a body",
                span,
            ));
        };
        let info = self
            .declarations
            .function(&name.name)
            .ok_or_else(|| {
                DecompileError::unsupported(format!("Function {} is not declared at top level", name.name), span)
            })?;

        let mut node = self.new_statement("function_definition", Some(span))?;
        node.block.field("function_name", info.name.clone());
        let mutation = node.block.mutation_mut();
        mutation.set("name", info.name.clone());
        mutation.set("functionid", info.id.clone());
        for argument in &info.arguments {
            mutation.children.push(MutationChild {
                tag: "arg".to_string(),
                attributes: vec![
                    ("name".to_string(), argument.name.clone()),
                    ("id".to_string(), argument.id.clone()),
                    ("type".to_string(), argument.type_name.clone()),
                ],
            });
        }

        let arguments = declaration
            .parameters
            .iter()
            .filter_map(|p| p.name.identifier())
            .zip(info.arguments.iter())
            .map(|(ident, argument)| (ident.binding, argument.clone()))
            .collect();
        let outer = self.function.replace(FunctionScope { arguments });
        let body = self.build_body(body, Scope::function_body());
        self.function = outer;
        node.handler("STACK", body?);
        Ok(node)
    }
}
