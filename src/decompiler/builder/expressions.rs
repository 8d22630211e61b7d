//! Output (value) blocks.

use crate::core::errors::{BuildResult, DecompileError};
use crate::metadata::{SymbolInfo, SymbolKind};
use crate::syntax::{BinaryOperator, Expression, ExpressionKind, Type, UnaryOperator};

use super::super::declarations::{argument_reporter_type, integer_value, shadow_for_type};
use super::super::feasibility::binary_block;
use super::super::nodes::{
    ExpressionNode, OutputNode, ValueNode, BOOLEAN_SHADOW, NUMBER_SHADOW, STRING_SHADOW,
};
use super::DecompilerContext;

impl<'a> DecompilerContext<'a> {
    /// Value input `name` holding `expr`, with `shadow` as the slot default.
    pub(super) fn value_input(
        &mut self,
        name: impl Into<String>,
        expr: &'a Expression,
        shadow: Option<&str>,
    ) -> BuildResult<ValueNode> {
        let value = self.build_expression(expr)?;
        Ok(ValueNode::new(name, OutputNode::Expression(value), shadow))
    }

    /// Builds an output block, replacing it with an opaque expression block
    /// when it has no faithful representation.
    pub(super) fn build_expression(&mut self, expr: &'a Expression) -> BuildResult<ExpressionNode> {
        let blocks = self.guard.count();
        let diagnostics = self.diagnostics.len();
        let result = match self.checker.check_expression(expr) {
            Ok(()) => self.build_expression_kind(expr),
            Err(reason) => Err(DecompileError::unsupported(reason, expr.span)),
        };
        match result {
            Err(DecompileError::Unsupported { reason, .. }) => {
                self.guard.restore(blocks);
                self.diagnostics.truncate(diagnostics);
                self.grey_expression(expr, &reason)
            }
            other => other,
        }
    }

    fn build_expression_kind(&mut self, expr: &'a Expression) -> BuildResult<ExpressionNode> {
        match &expr.kind {
            ExpressionKind::Parenthesized { expression } => self.build_expression(expression),
            ExpressionKind::Numeric { text } => self.number_literal(text),
            ExpressionKind::String { value } | ExpressionKind::NoSubstitutionTemplate { value } => {
                Ok(self.new_expression(STRING_SHADOW)?.with_field("TEXT", value.clone()))
            }
            ExpressionKind::True => self.boolean_literal(true),
            ExpressionKind::False => self.boolean_literal(false),
            ExpressionKind::Identifier { identifier } => {
                let argument = self
                    .function
                    .as_ref()
                    .and_then(|scope| scope.argument(&identifier.name, identifier.binding))
                    .cloned();
                if let Some(argument) = argument {
                    let reporter = argument_reporter_type(&argument.type_name);
                    return Ok(self.new_expression(reporter)?.with_field("VALUE", argument.name));
                }
                let name = self.variable_name(identifier);
                Ok(self.new_expression("variables_get")?.with_field("VAR", name))
            }
            ExpressionKind::Binary {
                left,
                operator,
                right,
            } => {
                if *operator == BinaryOperator::Add && is_string_concat(expr) {
                    return self.build_text_join(expr);
                }
                let (block_type, op) = binary_block(*operator).ok_or_else(|| {
                    DecompileError::unsupported(format!("Could not find operator {}", operator), expr.span)
                })?;
                let mut node = self.new_expression(block_type)?;
                if let Some(op) = op {
                    node.block.field("OP", op);
                }
                let shadow = match operator {
                    BinaryOperator::And | BinaryOperator::Or => BOOLEAN_SHADOW,
                    _ => NUMBER_SHADOW,
                };
                let (left_name, right_name) = match block_type {
                    "math_modulo" => ("DIVIDEND", "DIVISOR"),
                    _ => ("A", "B"),
                };
                let left = self.value_input(left_name, left, Some(shadow))?;
                let right = self.value_input(right_name, right, Some(shadow))?;
                node.block.inputs.extend([left, right]);
                Ok(node)
            }
            ExpressionKind::PrefixUnary { operator, operand } => match operator {
                UnaryOperator::Not => {
                    let mut node = self.new_expression("logic_negate")?;
                    let input = self.value_input("BOOL", operand, Some(BOOLEAN_SHADOW))?;
                    node.block.inputs.push(input);
                    Ok(node)
                }
                UnaryOperator::Plus => self.build_expression(operand),
                UnaryOperator::Minus => self.negated(operand),
                other => Err(DecompileError::unsupported(
                    format!("Unsupported prefix unary operator {:?}", other),
                    expr.span,
                )),
            },
            ExpressionKind::PropertyAccess { .. } => match self.build_property_access(expr, None)? {
                OutputNode::Expression(node) => Ok(node),
                OutputNode::RawText(_) => Err(DecompileError::unsupported(
                    "Enum value without a corresponding block",
                    expr.span,
                )),
            },
            ExpressionKind::ElementAccess { object, index } => {
                let mut node = self.new_expression("lists_index_get")?;
                let list = self.value_input("LIST", object, None)?;
                let index = self.value_input("INDEX", index, Some(NUMBER_SHADOW))?;
                node.block.inputs.extend([list, index]);
                Ok(node)
            }
            ExpressionKind::ArrayLiteral { elements } => {
                let mut node = self.new_expression("lists_create_with")?;
                node.block
                    .mutation_mut()
                    .set("items", elements.len().to_string());
                for (i, element) in elements.iter().enumerate() {
                    let input = self.value_input(format!("ADD{}", i), element, shadow_for_type(&element.ty))?;
                    node.block.inputs.push(input);
                }
                Ok(node)
            }
            ExpressionKind::Call { .. } => self.build_call_expression(expr),
            ExpressionKind::TaggedTemplate {
                template, symbol, ..
            } => {
                let info = symbol
                    .as_deref()
                    .and_then(|s| self.metadata.lookup(s))
                    .ok_or_else(|| DecompileError::unsupported("Tagged template has no block", expr.span))?;
                let block_id = info
                    .block_id
                    .as_deref()
                    .ok_or_else(|| DecompileError::unsupported("Tagged template has no block", expr.span))?;
                let field = info
                    .template_parameters()
                    .into_iter()
                    .next()
                    .map(|p| p.name)
                    .or_else(|| info.parameters.first().map(|p| p.name.clone()))
                    .unwrap_or_else(|| "value".to_string());
                Ok(self.new_expression(block_id)?.with_field(field, template.clone()))
            }
            other => Err(DecompileError::unsupported(
                format!(
                    "Unsupported syntax kind for output expression block: {}",
                    other.kind_name()
                ),
                expr.span,
            )),
        }
    }

    pub(super) fn number_literal(&mut self, text: &str) -> BuildResult<ExpressionNode> {
        Ok(self.new_expression(NUMBER_SHADOW)?.with_field("NUM", text))
    }

    fn boolean_literal(&mut self, value: bool) -> BuildResult<ExpressionNode> {
        let text = if value { "TRUE" } else { "FALSE" };
        Ok(self.new_expression(BOOLEAN_SHADOW)?.with_field("BOOL", text))
    }

    /// `-operand`: a numeric literal keeps its sign in the field, anything
    /// else becomes `0 - operand`.
    pub(super) fn negated(&mut self, operand: &'a Expression) -> BuildResult<ExpressionNode> {
        if let ExpressionKind::Numeric { text } = &operand.skip_parentheses().kind {
            return self.number_literal(&format!("-{}", text));
        }
        let mut node = self.new_expression("math_arithmetic")?;
        node.block.field("OP", "MINUS");
        let zero = self.number_literal("0")?;
        node.block
            .inputs
            .push(ValueNode::new("A", OutputNode::Expression(zero), Some(NUMBER_SHADOW)));
        let right = self.value_input("B", operand, Some(NUMBER_SHADOW))?;
        node.block.inputs.push(right);
        Ok(node)
    }

    /// Upper bound of `i < bound` as an inclusive value.
    pub(super) fn bound_minus_one(&mut self, bound: &'a Expression) -> BuildResult<ExpressionNode> {
        if let Some(value) = integer_value(bound) {
            return self.number_literal(&(value - 1).to_string());
        }
        let mut node = self.new_expression("math_arithmetic")?;
        node.block.field("OP", "MINUS");
        let left = self.value_input("A", bound, Some(NUMBER_SHADOW))?;
        let one = self.number_literal("1")?;
        node.block.inputs.push(left);
        node.block
            .inputs
            .push(ValueNode::new("B", OutputNode::Expression(one), Some(NUMBER_SHADOW)));
        Ok(node)
    }

    fn build_text_join(&mut self, expr: &'a Expression) -> BuildResult<ExpressionNode> {
        let mut parts = Vec::new();
        collect_concat_operands(expr, &mut parts);
        if parts.len() > 1 && parts[0].skip_parentheses().string_value() == Some("") {
            parts.remove(0);
        }

        let mut node = self.new_expression("text_join")?;
        node.block.mutation_mut().set("items", parts.len().to_string());
        for (i, part) in parts.into_iter().enumerate() {
            let input = self.value_input(format!("ADD{}", i), part, Some(STRING_SHADOW))?;
            node.block.inputs.push(input);
        }
        Ok(node)
    }

    /// Property access as a value. Enum members without a block of their own
    /// come back as raw field text; `parent` is the API the value is passed
    /// to, if any.
    pub(super) fn build_property_access(
        &mut self,
        expr: &'a Expression,
        parent: Option<&SymbolInfo>,
    ) -> BuildResult<OutputNode> {
        let ExpressionKind::PropertyAccess {
            object,
            name,
            symbol,
        } = &expr.skip_parentheses().kind
        else {
            return Err(DecompileError::unsupported("No call info found", expr.span));
        };

        if name.name == "length" && object.ty.is_array() {
            let mut node = self.new_expression("lists_length")?;
            let list = self.value_input("VALUE", object, None)?;
            node.block.inputs.push(list);
            return Ok(OutputNode::Expression(node));
        }

        if let Some(owner) = object.skip_parentheses().as_identifier() {
            let declarations = self.declarations;
            if let Some(user_enum) = declarations.enums.get(&owner.name) {
                let variable = user_enum.variable_name(&name.name).ok_or_else(|| {
                    DecompileError::unsupported(
                        format!("Unknown enum member {}.{}", owner.name, name.name),
                        expr.span,
                    )
                })?;
                let node = self
                    .new_expression(&user_enum.info.block_id)?
                    .with_field("MEMBER", variable);
                return Ok(OutputNode::Expression(node));
            }
            if let Some(kind) = declarations.kinds.get(&owner.name) {
                let node = self
                    .new_expression(&kind.info.block_id)?
                    .with_field("MEMBER", name.name.clone());
                return Ok(OutputNode::Expression(node));
            }
        }

        let metadata = self.metadata;
        let info = symbol
            .as_deref()
            .and_then(|s| metadata.lookup(s))
            .ok_or_else(|| DecompileError::unsupported("No call info found", expr.span))?;
        let attributes = &info.attributes;

        if let Some(identity) = &attributes.block_identity {
            let identity_info = metadata.lookup(identity).ok_or_else(|| {
                DecompileError::unsupported(format!("Unknown block identity {}", identity), expr.span)
            })?;
            let block_id = identity_info.block_id.as_deref().ok_or_else(|| {
                DecompileError::unsupported(format!("Block identity {} has no block", identity), expr.span)
            })?;
            let field = identity_info
                .template_parameters()
                .into_iter()
                .next()
                .map(|p| p.name)
                .or_else(|| identity_info.parameters.first().map(|p| p.name.clone()))
                .ok_or_else(|| {
                    DecompileError::unsupported(format!("Block identity {} has no field", identity), expr.span)
                })?;
            let mut node = self
                .new_expression(block_id)?
                .with_field(field, enum_member_value(info, parent));
            node.is_shadow = true;
            return Ok(OutputNode::Expression(node));
        }

        if info.block_id.as_deref() == Some("lists_length") {
            let mut node = self.new_expression("lists_length")?;
            let list = self.value_input("VALUE", object, None)?;
            node.block.inputs.push(list);
            return Ok(OutputNode::Expression(node));
        }

        if info.kind == SymbolKind::EnumMember {
            return Ok(OutputNode::RawText(enum_member_value(info, parent)));
        }

        if let Some(getter) = &attributes.property_getter {
            let mut node = self.new_expression(getter)?;
            node.block.field("property", info.qualified_name.clone());
            let receiver = self.value_input("obj", object, None)?;
            node.block.inputs.push(receiver);
            return Ok(OutputNode::Expression(node));
        }

        match &info.block_id {
            Some(block_id) if attributes.fixed_instance || info.kind == SymbolKind::Variable => {
                Ok(OutputNode::Expression(self.new_expression(block_id)?))
            }
            _ => Err(DecompileError::unsupported("No call info found", expr.span)),
        }
    }
}

/// Field text selecting an enum member in a dropdown.
pub(super) fn enum_member_value(member: &SymbolInfo, parent: Option<&SymbolInfo>) -> String {
    let use_enum_value = parent.is_some_and(|p| p.attributes.use_enum_value);
    match (&member.attributes.enum_value, use_enum_value) {
        (Some(value), true) => value.clone(),
        _ => member
            .block_id
            .clone()
            .unwrap_or_else(|| member.qualified_name.clone()),
    }
}

fn is_string_concat(expr: &Expression) -> bool {
    match &expr.kind {
        ExpressionKind::Binary {
            left,
            operator: BinaryOperator::Add,
            right,
        } => expr.ty == Type::String || left.ty == Type::String || right.ty == Type::String,
        _ => false,
    }
}

/// Operands of a left-leaning `+` chain of strings, left to right.
fn collect_concat_operands<'e>(expr: &'e Expression, out: &mut Vec<&'e Expression>) {
    match &expr.kind {
        ExpressionKind::Binary { left, right, .. } if is_string_concat(expr) => {
            collect_concat_operands(left, out);
            collect_concat_operands(right, out);
        }
        _ => out.push(expr),
    }
}
