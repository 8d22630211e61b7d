/*!
# Feasibility checker

Decides node by node whether syntax has a faithful block representation.
`Ok(())` means "decompile directly", `Err(reason)` carries the text shown in
the grey block and in debug diagnostics. The rules are closed over the
supported subset: every syntax kind without an explicit rule is rejected.

Expression checks are shallow. The builder checks each sub-expression it
emits and falls back to an opaque expression block locally.
*/

use once_cell::sync::Lazy;
use regex::Regex;

use crate::metadata::{SymbolInfo, SymbolKind, SymbolMetadataTable};
use crate::syntax::{
    ArrowBody, AssignmentOperator, BinaryOperator, BindingName, Expression, ExpressionKind,
    ForInitializer, FunctionDeclaration, NodeRef, Parameter, Statement, StatementKind, Type,
    UnaryOperator, VariableDeclaration,
};

use super::builtins::{builtin, BuiltinBlock};
use super::declarations::{FileDeclarations, FunctionInfo};
use super::options::DecompileOptions;

pub type CheckResult = Result<(), String>;

/// Строки, которые текстовое поле блока может показать
static VALID_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\f\n\r\t\v\x{00a0}\x{1680}\x{180e}\x{2000}-\x{200a}\x{2028}\x{2029}\x{202f}\x{205f}\x{3000}\x{feff}]*$")
        .expect("valid string literal regex")
});

/// Где находится проверяемый оператор
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub top_level: bool,
    pub in_function: bool,
}

impl Scope {
    pub fn top_level() -> Self {
        Self {
            top_level: true,
            in_function: false,
        }
    }

    pub fn nested(self) -> Self {
        Self {
            top_level: false,
            ..self
        }
    }

    pub fn function_body() -> Self {
        Self {
            top_level: false,
            in_function: true,
        }
    }
}

/// Цель вызова
#[derive(Debug, Clone, Copy)]
pub enum CallTarget<'a> {
    UserFunction(&'a FunctionInfo),
    Builtin(BuiltinBlock),
    Api(&'a SymbolInfo),
}

/// Fully-qualified symbol the host resolved for a call, property access or
/// tagged template.
pub fn expression_symbol(expr: &Expression) -> Option<&str> {
    match &expr.skip_parentheses().kind {
        ExpressionKind::PropertyAccess { symbol, .. }
        | ExpressionKind::Call { symbol, .. }
        | ExpressionKind::TaggedTemplate { symbol, .. } => symbol.as_deref(),
        _ => None,
    }
}

/// Auto-declared variables start from a default value and are only emitted
/// when nothing else references them.
pub fn is_auto_declaration(declaration: &VariableDeclaration, metadata: &SymbolMetadataTable) -> bool {
    let Some(init) = &declaration.initializer else {
        return false;
    };
    match &init.skip_parentheses().kind {
        ExpressionKind::Null | ExpressionKind::False => true,
        ExpressionKind::Numeric { text } => text == "0",
        ExpressionKind::String { value } | ExpressionKind::NoSubstitutionTemplate { value } => {
            value.is_empty()
        }
        ExpressionKind::Call {
            symbol: Some(symbol),
            ..
        } => metadata
            .lookup(symbol)
            .is_some_and(|info| info.attributes.is_auto_create),
        _ => false,
    }
}

/// Literal argument: number, string, boolean or a signed number.
pub fn is_literal_node(expr: &Expression) -> bool {
    let expr = expr.skip_parentheses();
    match &expr.kind {
        ExpressionKind::PrefixUnary {
            operator: UnaryOperator::Minus | UnaryOperator::Plus,
            operand,
        } => is_literal_node(operand),
        _ => expr.is_literal(),
    }
}

/// Block type and field value for a binary operator.
pub fn binary_block(operator: BinaryOperator) -> Option<(&'static str, Option<&'static str>)> {
    use BinaryOperator::*;
    let entry = match operator {
        Add => ("math_arithmetic", Some("ADD")),
        Subtract => ("math_arithmetic", Some("MINUS")),
        Multiply => ("math_arithmetic", Some("MULTIPLY")),
        Divide => ("math_arithmetic", Some("DIVIDE")),
        Modulo => ("math_modulo", None),
        Less => ("logic_compare", Some("LT")),
        LessEqual => ("logic_compare", Some("LTE")),
        Greater => ("logic_compare", Some("GT")),
        GreaterEqual => ("logic_compare", Some("GTE")),
        Equal | StrictEqual => ("logic_compare", Some("EQ")),
        NotEqual | StrictNotEqual => ("logic_compare", Some("NEQ")),
        And => ("logic_operation", Some("AND")),
        Or => ("logic_operation", Some("OR")),
        _ => return None,
    };
    Some(entry)
}

fn is_condition_operator(operator: BinaryOperator) -> bool {
    matches!(
        binary_block(operator),
        Some(("logic_compare", _)) | Some(("logic_operation", _))
    )
}

/// Контекст проверки одного файла
pub struct Feasibility<'a> {
    pub metadata: &'a SymbolMetadataTable,
    pub options: &'a DecompileOptions,
    pub declarations: &'a FileDeclarations,
}

impl<'a> Feasibility<'a> {
    pub fn new(
        metadata: &'a SymbolMetadataTable,
        options: &'a DecompileOptions,
        declarations: &'a FileDeclarations,
    ) -> Self {
        Self {
            metadata,
            options,
            declarations,
        }
    }

    /// `None` when `node` can be decompiled directly, otherwise the reason.
    pub fn check(&self, node: NodeRef<'_>, as_expression: bool, top_level: bool) -> Option<String> {
        let scope = Scope {
            top_level,
            in_function: false,
        };
        let result = match node {
            NodeRef::Statement(stmt) => self.check_statement(stmt, scope),
            NodeRef::Expression(expr) if as_expression => self.check_expression(expr),
            NodeRef::Expression(expr) => self.check_expression_statement(expr, scope),
            NodeRef::Declaration(decl) => self.check_variable_declaration(decl),
            NodeRef::Identifier(identifier) => self.check_identifier(&identifier.name, identifier.binding),
        };
        result.err()
    }

    pub fn check_statement(&self, stmt: &Statement, scope: Scope) -> CheckResult {
        match &stmt.kind {
            StatementKind::Block { .. } | StatementKind::Empty | StatementKind::Debugger => Ok(()),
            StatementKind::Expression { expression } => {
                self.check_expression_statement(expression, scope)
            }
            StatementKind::Variable { declarations } => declarations
                .iter()
                .try_for_each(|decl| self.check_variable_declaration(decl)),
            StatementKind::If {
                condition,
                else_branch,
                ..
            } => {
                self.check_condition(condition)?;
                // else-if цепочка становится одним блоком
                let mut next = else_branch.as_deref();
                while let Some(Statement {
                    kind:
                        StatementKind::If {
                            condition,
                            else_branch,
                            ..
                        },
                    ..
                }) = next
                {
                    self.check_condition(condition)?;
                    next = else_branch.as_deref();
                }
                Ok(())
            }
            StatementKind::While { condition, .. } => self.check_condition(condition),
            StatementKind::For {
                initializer,
                condition,
                incrementor,
                ..
            } => self.check_for(initializer.as_ref(), condition.as_ref(), incrementor.as_ref()),
            StatementKind::ForOf { initializer, .. } => match initializer {
                ForInitializer::Declarations { declarations }
                    if declarations.len() == 1 && declarations[0].name.identifier().is_some() =>
                {
                    Ok(())
                }
                _ => Err("only variable declarations are permitted in for of loop initializers".into()),
            },
            StatementKind::Function { declaration } => {
                self.check_function_declaration(declaration, scope)
            }
            StatementKind::Return { value } => {
                if !scope.in_function {
                    return Err("Return statements are only supported inside functions".into());
                }
                match value {
                    Some(value) => self.check_expression(value),
                    None => Ok(()),
                }
            }
            StatementKind::Break { label } | StatementKind::Continue { label } => match label {
                Some(_) => Err("Labeled break and continue are not supported in blocks".into()),
                None => Ok(()),
            },
            StatementKind::Enum { declaration } => {
                if scope.top_level && self.declarations.enums.contains_key(&declaration.name.name) {
                    Ok(())
                } else {
                    Err(format!("Enum {} has no blocks", declaration.name.name))
                }
            }
            StatementKind::Namespace { name, .. } => {
                if scope.top_level && self.declarations.kinds.contains_key(&name.name) {
                    Ok(())
                } else {
                    Err(format!("Unsupported statement in block: {}", stmt.kind.kind_name()))
                }
            }
            other => Err(format!("Unsupported statement in block: {}", other.kind_name())),
        }
    }

    pub fn check_expression_statement(&self, expr: &Expression, scope: Scope) -> CheckResult {
        let expr = expr.skip_parentheses();
        match &expr.kind {
            ExpressionKind::Call { .. } => self.check_call(expr, false, scope.top_level),
            ExpressionKind::Assignment {
                target,
                operator,
                value,
            } => self.check_assignment(target, *operator, value),
            ExpressionKind::PrefixUnary { operator, operand }
            | ExpressionKind::PostfixUnary { operator, operand } => {
                if operand.skip_parentheses().as_identifier().is_none() {
                    return Err("-- and ++ may only be used on an identifier".into());
                }
                match operator {
                    UnaryOperator::Increment | UnaryOperator::Decrement => Ok(()),
                    _ => Err(
                        "Only ++ and -- supported as prefix or postfix unary operators in a statement"
                            .into(),
                    ),
                }
            }
            other => Err(format!("Unsupported statement in block: {}", other.kind_name())),
        }
    }

    fn check_assignment(
        &self,
        target: &Expression,
        operator: AssignmentOperator,
        value: &Expression,
    ) -> CheckResult {
        let target = target.skip_parentheses();
        match &target.kind {
            ExpressionKind::Identifier { .. } => match operator {
                AssignmentOperator::Assign
                | AssignmentOperator::AddAssign
                | AssignmentOperator::SubtractAssign => self.check_expression(value),
                other => Err(format!(
                    "Unsupported operator token in statement {}",
                    other.token()
                )),
            },
            ExpressionKind::ElementAccess { .. } => match operator {
                AssignmentOperator::Assign => Ok(()),
                _ => Err(
                    "Element access expressions may only be assigned to using the equals operator"
                        .into(),
                ),
            },
            ExpressionKind::PropertyAccess { symbol, .. } => {
                let attributes = symbol
                    .as_deref()
                    .and_then(|s| self.metadata.lookup(s))
                    .map(|info| &info.attributes);
                match (operator, attributes) {
                    (AssignmentOperator::Assign, Some(attrs)) if attrs.property_setter.is_some() => {
                        Ok(())
                    }
                    (AssignmentOperator::AddAssign, Some(attrs))
                        if attrs.property_updater.is_some() =>
                    {
                        Ok(())
                    }
                    (AssignmentOperator::Assign | AssignmentOperator::AddAssign, _) => {
                        Err("Property has no block for this assignment".into())
                    }
                    _ => Err(
                        "Property access expressions may only be assigned to using = or +=".into(),
                    ),
                }
            }
            _ => Err("Only variable names may be assigned to".into()),
        }
    }

    pub fn check_variable_declaration(&self, decl: &VariableDeclaration) -> CheckResult {
        if decl.name.identifier().is_none() {
            return Err("Variable declarations may not use binding patterns".into());
        }
        let Some(init) = &decl.initializer else {
            return Err("Variable declarations must have an initializer".into());
        };
        if is_auto_declaration(decl, self.metadata) {
            return Ok(());
        }
        self.check_expression(init)
    }

    fn check_for(
        &self,
        initializer: Option<&ForInitializer>,
        condition: Option<&Expression>,
        incrementor: Option<&Expression>,
    ) -> CheckResult {
        let (Some(initializer), Some(condition), Some(incrementor)) =
            (initializer, condition, incrementor)
        else {
            return Err("for loops must have an initializer, incrementor, and condition".into());
        };
        let ForInitializer::Declarations { declarations } = initializer else {
            return Err("only variable declarations are permitted in for loop initializers".into());
        };
        if declarations.len() != 1 {
            return Err("for loop with multiple variables not supported".into());
        }
        let declaration = &declarations[0];
        let Some(index) = declaration.name.identifier() else {
            return Err("for loop with out-of-scope variables not supported".into());
        };
        let starts_at_zero = matches!(
            declaration.initializer.as_ref().map(|e| &e.kind),
            Some(ExpressionKind::Numeric { text }) if text == "0"
        );
        if !starts_at_zero {
            return Err("for loop initializers must be initialized to 0".into());
        }

        let increments_index = match &incrementor.skip_parentheses().kind {
            ExpressionKind::PostfixUnary {
                operator: UnaryOperator::Increment,
                operand,
            }
            | ExpressionKind::PrefixUnary {
                operator: UnaryOperator::Increment,
                operand,
            } => operand
                .as_identifier()
                .is_some_and(|ident| ident.name == index.name),
            _ => false,
        };
        if !increments_index {
            return Err(
                "for loop incrementors may only increment the variable declared in the initializer"
                    .into(),
            );
        }

        let ExpressionKind::Binary { left, operator, .. } = &condition.skip_parentheses().kind else {
            return Err("for loop conditionals must be binary comparison operations".into());
        };
        if !left.as_identifier().is_some_and(|ident| ident.name == index.name) {
            return Err(
                "left side of for loop conditional must be the variable declared in the initializer"
                    .into(),
            );
        }
        match operator {
            BinaryOperator::Less | BinaryOperator::LessEqual => Ok(()),
            _ => Err("for loop conditional operator must be either < or <=".into()),
        }
    }

    fn check_function_declaration(&self, declaration: &FunctionDeclaration, scope: Scope) -> CheckResult {
        if !scope.top_level {
            return Err("Function declarations must be top level".into());
        }
        if declaration.name.is_none() {
            return Err("Function declarations must have a name".into());
        }
        if declaration.body.is_none() {
            return Err("Function declarations must have a body".into());
        }
        declaration
            .parameters
            .iter()
            .try_for_each(|p| self.check_function_parameter(p))
    }

    fn check_function_parameter(&self, parameter: &Parameter) -> CheckResult {
        if parameter.name.identifier().is_none() {
            return Err("Function parameters may not use binding patterns".into());
        }
        if parameter.rest || parameter.optional || parameter.initializer.is_some() {
            return Err("Functions with rest, optional or default parameters are not supported in blocks".into());
        }
        let type_name = parameter.ty.type_name();
        if !self.options.is_argument_type_allowed(&type_name) {
            return Err(format!(
                "Only types that can be added in blocks can be used for function arguments, found {}",
                type_name
            ));
        }
        Ok(())
    }

    /// Conditions of `if` and `while`.
    pub fn check_condition(&self, condition: &Expression) -> CheckResult {
        match &condition.kind {
            ExpressionKind::True | ExpressionKind::False | ExpressionKind::ElementAccess { .. } => {
                Ok(())
            }
            ExpressionKind::Identifier { identifier } => {
                self.check_identifier(&identifier.name, identifier.binding)
            }
            ExpressionKind::Parenthesized { expression } => self.check_condition(expression),
            ExpressionKind::Binary { operator, .. } if is_condition_operator(*operator) => Ok(()),
            ExpressionKind::PrefixUnary {
                operator: UnaryOperator::Not,
                ..
            } => Ok(()),
            ExpressionKind::Call { .. } if condition.ty == Type::Boolean => {
                self.check_call(condition, true, false)
            }
            other => Err(format!(
                "Unsupported expression in a condition: {}",
                other.kind_name()
            )),
        }
    }

    fn check_identifier(&self, name: &str, binding: Option<u32>) -> CheckResult {
        if name == "undefined" {
            return Err("Undefined is not supported in blocks".into());
        }
        if binding.is_none() && self.metadata.is_global(name) {
            return Err(format!("{} is not a variable and cannot be used in blocks", name));
        }
        Ok(())
    }

    pub fn check_expression(&self, expr: &Expression) -> CheckResult {
        match &expr.kind {
            ExpressionKind::Numeric { .. }
            | ExpressionKind::True
            | ExpressionKind::False
            | ExpressionKind::ArrayLiteral { .. }
            | ExpressionKind::ElementAccess { .. } => Ok(()),
            ExpressionKind::Parenthesized { expression } => self.check_expression(expression),
            ExpressionKind::String { value } | ExpressionKind::NoSubstitutionTemplate { value } => {
                check_string_literal(value)
            }
            ExpressionKind::Identifier { identifier } => {
                self.check_identifier(&identifier.name, identifier.binding)
            }
            ExpressionKind::Binary { operator, .. } => match binary_block(*operator) {
                Some(_) => Ok(()),
                None => Err(format!("Could not find operator {}", operator)),
            },
            ExpressionKind::PrefixUnary { operator, .. } => match operator {
                UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::Not => Ok(()),
                other => Err(format!("Unsupported prefix unary operator {:?}", other)),
            },
            ExpressionKind::PropertyAccess { .. } => self.check_property_access(expr),
            ExpressionKind::Call { .. } => self.check_call(expr, true, false),
            ExpressionKind::TaggedTemplate {
                has_substitutions,
                symbol,
                ..
            } => {
                if *has_substitutions {
                    return Err("Tagged templates with substitutions are not supported in blocks".into());
                }
                match symbol.as_deref().and_then(|s| self.metadata.lookup(s)) {
                    Some(info) if info.block_id.is_some() => Ok(()),
                    _ => Err("Tagged template has no block".into()),
                }
            }
            other => Err(format!(
                "Unsupported syntax kind for output expression block: {}",
                other.kind_name()
            )),
        }
    }

    fn check_property_access(&self, expr: &Expression) -> CheckResult {
        let ExpressionKind::PropertyAccess { object, name, symbol } = &expr.kind else {
            return Err("No call info found".into());
        };
        if name.name == "length" && object.ty.is_array() {
            return Ok(());
        }
        if let Some(object_name) = object.skip_parentheses().as_identifier() {
            if let Some(user_enum) = self.declarations.enums.get(&object_name.name) {
                return match user_enum.value_of(&name.name) {
                    Some(_) => Ok(()),
                    None => Err(format!("Unknown enum member {}.{}", object_name.name, name.name)),
                };
            }
            if let Some(kind) = self.declarations.kinds.get(&object_name.name) {
                return match kind.members.contains(&name.name) {
                    true => Ok(()),
                    false => Err(format!("Unknown kind member {}.{}", object_name.name, name.name)),
                };
            }
        }
        let Some(info) = symbol.as_deref().and_then(|s| self.metadata.lookup(s)) else {
            return Err("No call info found".into());
        };
        let attrs = &info.attributes;
        if attrs.block_identity.is_some() || info.block_id.as_deref() == Some("lists_length") {
            return Ok(());
        }
        if info.kind == SymbolKind::EnumMember {
            return Err("Enum value without a corresponding block".into());
        }
        if attrs.property_getter.is_some() {
            return Ok(());
        }
        if info.block_id.is_some() && (attrs.fixed_instance || info.kind == SymbolKind::Variable) {
            return Ok(());
        }
        Err("No call info found".into())
    }

    /// Resolves what a call invokes: an in-file function, a built-in or an
    /// API with a block.
    pub fn call_target(&self, call: &Expression) -> Option<CallTarget<'a>> {
        let ExpressionKind::Call { callee, symbol, .. } = &call.skip_parentheses().kind else {
            return None;
        };
        if let Some(ident) = callee.skip_parentheses().as_identifier() {
            if let Some(function) = self.declarations.function(&ident.name) {
                if symbol.as_deref().map_or(true, |s| s == ident.name) {
                    return Some(CallTarget::UserFunction(function));
                }
            }
        }
        let symbol = symbol.as_deref()?;
        if let Some(info) = self.metadata.lookup(symbol) {
            if info.block_id.is_some() {
                return Some(CallTarget::Api(info));
            }
        }
        builtin(symbol).map(CallTarget::Builtin)
    }

    pub fn check_call(&self, call: &Expression, as_expression: bool, top_level: bool) -> CheckResult {
        let ExpressionKind::Call { callee, arguments, .. } = &call.skip_parentheses().kind else {
            return Err("Function call not supported in the blocks".into());
        };
        let Some(target) = self.call_target(call) else {
            return Err("Function call not supported in the blocks".into());
        };

        let info = match target {
            CallTarget::UserFunction(function) => {
                if arguments.len() != function.arguments.len() {
                    return Err(format!(
                        "Function {} expects {} argument(s), found {}",
                        function.name,
                        function.arguments.len(),
                        arguments.len()
                    ));
                }
                if as_expression && !function.returns_value {
                    return Err(format!("Function {} does not return a value", function.name));
                }
                return Ok(());
            }
            CallTarget::Builtin(block) => {
                if !as_expression {
                    return Err("No output expressions as statements".into());
                }
                if arguments.len() != block.arity() {
                    return Err("Function call has more arguments than are supported by its block".into());
                }
                return Ok(());
            }
            CallTarget::Api(info) => info,
        };

        if !as_expression && info.is_expression() && info.attributes.alias_block_id.is_none() {
            return Err("No output expressions as statements".into());
        }
        let callback = arguments.iter().position(is_callback);
        if callback.is_some() && !top_level {
            return Err("Events must be top level".into());
        }

        let receiver = if info.has_receiver() {
            match &callee.skip_parentheses().kind {
                ExpressionKind::PropertyAccess { object, .. } => Some(object.as_ref()),
                _ => None,
            }
        } else {
            None
        };
        let visible = arguments.len() + usize::from(receiver.is_some());

        if let Some(columns) = info.attributes.image_literal {
            if visible > expected_argument_count(info) + 1 {
                return Err("Function call has more arguments than are supported by its block".into());
            }
            let Some(pattern) = arguments.first().and_then(|a| a.skip_parentheses().string_value())
            else {
                return Err("Only string literals supported for image literals".into());
            };
            let leds = pattern.chars().filter(|c| !c.is_whitespace()).count();
            if leds != columns * 5 * 5 {
                return Err("Invalid image pattern".into());
            }
            return Ok(());
        }

        let expected = expected_argument_count(info);
        if visible > expected {
            if visible - expected > 1 || callback.is_none() {
                return Err("Function call has more arguments than are supported by its block".into());
            }
        }

        for (argument, parameter) in arguments.iter().zip(info.parameters.iter()) {
            let argument = argument.skip_parentheses();
            if parameter.is_enum {
                let is_member_access = match &argument.kind {
                    ExpressionKind::PropertyAccess { object, .. } => object
                        .skip_parentheses()
                        .as_identifier()
                        .is_some_and(|enum_name| enum_name.name == parameter.ty),
                    _ => false,
                };
                if !is_member_access {
                    return Err("Enum arguments may only be literal property access expressions".into());
                }
            } else if is_literal_node(argument)
                && parameter.field_editor.is_some()
                && !parameter.decompile_literals
            {
                return Err("Field editor does not support literal arguments".into());
            }
        }

        if let Some(index) = callback {
            self.check_callback(&arguments[index], info)?;
        }

        if let Some(receiver) = receiver {
            let namespace_has_fixed_instances = self
                .metadata
                .lookup(&info.namespace)
                .is_some_and(|ns| ns.attributes.fixed_instances);
            if namespace_has_fixed_instances {
                let receiver_is_fixed = expression_symbol(receiver)
                    .and_then(|s| self.metadata.lookup(s))
                    .is_some_and(|r| r.attributes.fixed_instance);
                if !receiver_is_fixed {
                    return Err(
                        "Fixed instance APIs can only be called directly from the fixed instance".into(),
                    );
                }
            }
        }

        Ok(())
    }

    fn check_callback(&self, callback: &Expression, info: &SymbolInfo) -> CheckResult {
        let (parameters, body_is_block) = match &callback.skip_parentheses().kind {
            ExpressionKind::Arrow { parameters, body } => {
                (parameters, matches!(body, ArrowBody::Block { .. }))
            }
            ExpressionKind::FunctionExpression { declaration } => {
                (&declaration.parameters, declaration.body.is_some())
            }
            _ => return Ok(()),
        };
        if !body_is_block && matches!(callback.kind, ExpressionKind::FunctionExpression { .. }) {
            return Err("Event handlers must have a body".into());
        }
        let single_pattern = parameters.len() == 1
            && matches!(parameters[0].name, BindingName::ObjectPattern { .. });
        let draggable = info.attributes.draggable_parameters.is_some()
            && parameters.iter().all(|p| p.name.identifier().is_some());
        if parameters.is_empty() || single_pattern || draggable {
            Ok(())
        } else {
            Err("Unsupported parameters in event handler".into())
        }
    }
}

fn is_callback(argument: &Expression) -> bool {
    matches!(
        argument.skip_parentheses().kind,
        ExpressionKind::Arrow { .. } | ExpressionKind::FunctionExpression { .. }
    )
}

/// Visible arguments a block shows: template parameters plus the implicit
/// receiver when the block hides it behind a default instance.
fn expected_argument_count(info: &SymbolInfo) -> usize {
    let template = info.template_parameters();
    let count = if info.block.is_some() {
        template.len()
    } else {
        info.parameters.iter().filter(|p| !p.is_handler()).count()
            + usize::from(info.has_receiver())
    };
    count + usize::from(info.attributes.default_instance.is_some())
}

pub fn check_string_literal(value: &str) -> CheckResult {
    if VALID_STRING.is_match(value) {
        Ok(())
    } else {
        Err("Only whitespace character allowed in string literals is space".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompiler::ids::IdGenerator;
    use crate::metadata::{BlockAttributes, ParameterInfo};
    use crate::syntax::{SourceFile, SyntaxFactory};

    fn metadata() -> SymbolMetadataTable {
        SymbolMetadataTable::new()
            .with_symbol(
                SymbolInfo::new("basic.showNumber", SymbolKind::Function)
                    .with_block("device_show_number", "show number %number")
                    .with_parameter(ParameterInfo::new("number", "number")),
            )
            .with_symbol(
                SymbolInfo::new("Math.randomRange", SymbolKind::Function)
                    .with_block("device_random", "pick random %min|to %limit")
                    .with_return_type("number"),
            )
            .with_global("basic")
    }

    fn check_first(file: &SourceFile, metadata: &SymbolMetadataTable) -> CheckResult {
        let options = DecompileOptions::default();
        let declarations =
            FileDeclarations::collect(file, metadata, &mut IdGenerator::new()).unwrap();
        let checker = Feasibility::new(metadata, &options, &declarations);
        checker.check_statement(&file.statements[0], Scope::top_level())
    }

    #[test]
    fn test_valid_string_literals() {
        assert!(check_string_literal("hello world").is_ok());
        assert!(check_string_literal("tab\there").is_err());
        assert!(check_string_literal("nbsp\u{00a0}").is_err());
    }

    #[test]
    fn test_known_call_is_feasible() {
        let f = SyntaxFactory::new("main.ts", "basic.showNumber(5);");
        let call = f.call(
            f.path("basic.showNumber", 0, Some("basic.showNumber"), Type::Void),
            vec![f.num("5", 0)],
            Some("basic.showNumber"),
            Type::Void,
        );
        let file = f.file(vec![f.expr_stmt(call)]);
        assert_eq!(check_first(&file, &metadata()), Ok(()));
    }

    #[test]
    fn test_output_call_as_statement_is_rejected() {
        let f = SyntaxFactory::new("main.ts", "Math.randomRange(0, 5);");
        let call = f.call(
            f.path("Math.randomRange", 0, Some("Math.randomRange"), Type::Number),
            vec![f.num("0", 0), f.num("5", 0)],
            Some("Math.randomRange"),
            Type::Number,
        );
        let file = f.file(vec![f.expr_stmt(call)]);
        assert_eq!(
            check_first(&file, &metadata()),
            Err("No output expressions as statements".to_string())
        );
    }

    #[test]
    fn test_for_loop_must_start_at_zero() {
        let f = SyntaxFactory::new("main.ts", "for (let i = 1; i < 5; i++) {}");
        let i = f.declare("i", 0);
        let stmt = f.for_stmt(
            f.declaration(i, Some(f.num("1", 0))),
            f.binary(f.ident("i", 1, Type::Number), BinaryOperator::Less, f.num("5", 0), Type::Boolean),
            f.postfix(f.ident("i", 2, Type::Number), UnaryOperator::Increment),
            f.empty_block(0),
        );
        let file = f.file(vec![stmt]);
        assert_eq!(
            check_first(&file, &metadata()),
            Err("for loop initializers must be initialized to 0".to_string())
        );
    }

    #[test]
    fn test_unsupported_statement_kind() {
        let f = SyntaxFactory::new("main.ts", "class Foo {}");
        let stmt = f.raw_stmt(
            StatementKind::Class { name: None },
            "class Foo {}",
            0,
        );
        let file = f.file(vec![stmt]);
        assert_eq!(
            check_first(&file, &metadata()),
            Err("Unsupported statement in block: ClassDeclaration".to_string())
        );
    }

    #[test]
    fn test_global_identifier_is_rejected() {
        let f = SyntaxFactory::new("main.ts", "let a = basic;");
        // `basic` is never declared, so it has no binding
        let stmt = f.let_stmt("a", 0, f.ident("basic", 0, Type::Any));
        let file = f.file(vec![stmt]);
        assert!(check_first(&file, &metadata()).is_err());
    }

    #[test]
    fn test_field_editor_rejects_literals() {
        let mut parameter = ParameterInfo::new("note", "number");
        parameter.field_editor = Some("note".to_string());
        let metadata = SymbolMetadataTable::new().with_symbol(
            SymbolInfo::new("music.playTone", SymbolKind::Function)
                .with_block("music_play_note", "play %note")
                .with_parameter(parameter)
                .with_attributes(BlockAttributes::default()),
        );
        let f = SyntaxFactory::new("main.ts", "music.playTone(262);");
        let call = f.call(
            f.path("music.playTone", 0, Some("music.playTone"), Type::Void),
            vec![f.num("262", 0)],
            Some("music.playTone"),
            Type::Void,
        );
        let file = f.file(vec![f.expr_stmt(call)]);
        assert_eq!(
            check_first(&file, &metadata),
            Err("Field editor does not support literal arguments".to_string())
        );
    }
}
