//! Call blocks: API calls with their argument slots, built-ins, calls to
//! functions declared in the file, and event handlers.

use std::collections::BTreeMap;

use crate::core::errors::{BuildResult, DecompileError};
use crate::core::position::TextSpan;
use crate::metadata::{DraggableParameters, ParameterInfo, SymbolInfo, SymbolKind};
use crate::syntax::{
    collect_expression_identifiers, ArrowBody, BindingName, Expression, ExpressionKind, Parameter,
    Statement, UnaryOperator,
};

use super::super::builtins::{BuiltinBlock, BuiltinForm};
use super::super::declarations::{
    argument_reporter_type, shadow_for_type, shadow_for_type_name, ArgumentInfo, FunctionInfo,
};
use super::super::feasibility::{is_literal_node, CallTarget, Scope};
use super::super::nodes::{
    BlockCore, ExpressionNode, MutationChild, OutputNode, StatementNode, ValueNode, NUMBER_SHADOW,
};
use super::{DecompilerContext, FunctionScope};

/// Блок вызова вместе с вложенными обработчиками
struct CallBlock {
    block: BlockCore,
    handlers: Vec<(String, Option<StatementNode>)>,
}

impl CallBlock {
    fn new(block: BlockCore) -> Self {
        Self {
            block,
            handlers: Vec::new(),
        }
    }
}

impl<'a> DecompilerContext<'a> {
    pub(super) fn build_call_statement(
        &mut self,
        call: &'a Expression,
        span: TextSpan,
        scope: Scope,
    ) -> BuildResult<StatementNode> {
        let mut node = self.new_statement("", Some(span))?;
        let built = self.call_block(call, true, scope)?;
        node.block = built.block;
        for (name, handler) in built.handlers {
            node.handler(name, handler);
        }
        Ok(node)
    }

    pub(super) fn build_call_expression(&mut self, call: &'a Expression) -> BuildResult<ExpressionNode> {
        let mut node = self.new_expression("")?;
        let built = self.call_block(call, false, Scope::default())?;
        if !built.handlers.is_empty() {
            return Err(DecompileError::unsupported("Events must be top level", call.span));
        }
        node.block = built.block;
        Ok(node)
    }

    fn call_block(&mut self, call: &'a Expression, as_statement: bool, scope: Scope) -> BuildResult<CallBlock> {
        let call = call.skip_parentheses();
        let ExpressionKind::Call {
            callee, arguments, ..
        } = &call.kind
        else {
            return Err(DecompileError::unsupported(
                "Function call not supported in the blocks",
                call.span,
            ));
        };
        let target = self.checker.call_target(call).ok_or_else(|| {
            DecompileError::unsupported("Function call not supported in the blocks", call.span)
        })?;
        match target {
            CallTarget::UserFunction(function) => self.user_function_call(function, arguments, as_statement),
            CallTarget::Builtin(builtin) => self.builtin_call(builtin, arguments),
            CallTarget::Api(info) => {
                if info.attributes.image_literal.is_some() {
                    return self.image_literal_call(info, arguments, call.span);
                }
                self.api_call(info, callee, arguments, as_statement, scope, call.span)
            }
        }
    }

    fn user_function_call(
        &mut self,
        function: &'a FunctionInfo,
        arguments: &'a [Expression],
        as_statement: bool,
    ) -> BuildResult<CallBlock> {
        let block_type = if as_statement {
            "function_call"
        } else {
            "function_call_output"
        };
        let mut block = BlockCore::new(block_type);
        let mutation = block.mutation_mut();
        mutation.set("name", function.name.clone());
        mutation.set("functionid", function.id.clone());
        mutation
            .children
            .extend(function.arguments.iter().map(argument_child));

        for (argument, info) in arguments.iter().zip(function.arguments.iter()) {
            let input = self.value_input(info.id.clone(), argument, shadow_for_type_name(&info.type_name))?;
            block.inputs.push(input);
        }
        Ok(CallBlock::new(block))
    }

    fn builtin_call(&mut self, builtin: BuiltinBlock, arguments: &'a [Expression]) -> BuildResult<CallBlock> {
        let mut block = BlockCore::new(builtin.block_id);
        match builtin.form {
            BuiltinForm::Absolute => {}
            BuiltinForm::MinMax => block.field("op", builtin.op),
            BuiltinForm::JsUnary | BuiltinForm::JsBinary => {
                let op_type = if builtin.form == BuiltinForm::JsUnary {
                    "unary"
                } else {
                    "binary"
                };
                block.mutation_mut().set("op-type", op_type);
                block.field("OP", builtin.op);
            }
        }
        for (name, argument) in builtin.input_names().iter().zip(arguments) {
            let input = self.value_input(*name, argument, Some(NUMBER_SHADOW))?;
            block.inputs.push(input);
        }
        Ok(CallBlock::new(block))
    }

    /// Image literal: the pattern string becomes one boolean field per LED,
    /// rows outermost.
    fn image_literal_call(
        &mut self,
        info: &'a SymbolInfo,
        arguments: &'a [Expression],
        span: TextSpan,
    ) -> BuildResult<CallBlock> {
        let block_id = info
            .block_id
            .as_deref()
            .ok_or_else(|| DecompileError::unsupported("Image literal has no block", span))?;
        let columns = info.attributes.image_literal.unwrap_or(1) * 5;
        let pattern = arguments
            .first()
            .and_then(|a| a.skip_parentheses().string_value())
            .ok_or_else(|| {
                DecompileError::unsupported("Only string literals supported for image literals", span)
            })?;
        let leds: Vec<char> = pattern.chars().filter(|c| !c.is_whitespace()).collect();
        if leds.len() != columns * 5 {
            return Err(DecompileError::unsupported("Invalid image pattern", span));
        }

        let mut block = BlockCore::new(block_id);
        for row in 0..5 {
            for column in 0..columns {
                let on = matches!(leds[row * columns + column], '#' | '*' | '1');
                block.field(
                    format!("LED{}{}", column, row),
                    if on { "TRUE" } else { "FALSE" },
                );
            }
        }
        Ok(CallBlock::new(block))
    }

    fn api_call(
        &mut self,
        info: &'a SymbolInfo,
        callee: &'a Expression,
        arguments: &'a [Expression],
        as_statement: bool,
        scope: Scope,
        span: TextSpan,
    ) -> BuildResult<CallBlock> {
        let alias = if as_statement && info.is_expression() {
            info.attributes.alias_block_id.as_deref()
        } else {
            None
        };
        let block_id = alias
            .or(info.block_id.as_deref())
            .ok_or_else(|| DecompileError::unsupported("Function call not supported in the blocks", span))?;
        let mut call = CallBlock::new(BlockCore::new(block_id));

        let receiver = match &callee.skip_parentheses().kind {
            ExpressionKind::PropertyAccess { object, .. } if info.has_receiver() => Some(object.as_ref()),
            _ => None,
        };
        let mut visible: Vec<(&'a Expression, Option<&'a ParameterInfo>)> = Vec::new();
        if let Some(receiver) = receiver {
            visible.push((receiver, None));
        }
        visible.extend(
            arguments
                .iter()
                .enumerate()
                .map(|(i, argument)| (argument, info.parameters.get(i))),
        );

        let slots = argument_slots(info);
        // обработчик не занимает слот шаблона
        let mut next_slot = 0;
        for (argument, parameter) in visible {
            if is_callback(argument) {
                let handler = self.build_callback(argument, info, &mut call.block, scope)?;
                call.handlers.push(("HANDLER".to_string(), handler));
                continue;
            }
            let i = next_slot;
            next_slot += 1;
            let Some(slot) = slots.get(i) else {
                return Err(DecompileError::unsupported(
                    "Function call has more arguments than are supported by its block",
                    argument.span,
                ));
            };

            if i == 0 {
                if let Some(instance) = &info.attributes.default_instance {
                    if self.file.text_of(argument.span).trim() == instance {
                        continue;
                    }
                    call.block.mutation_mut().set("showing", "true");
                }
            }

            self.argument_slot(&mut call.block, info, slot, argument, parameter)?;
        }
        Ok(call)
    }

    /// Puts one visible argument into its slot: a dropdown field, a literal
    /// shadow or a value input.
    fn argument_slot(
        &mut self,
        block: &mut BlockCore,
        info: &'a SymbolInfo,
        slot: &Slot,
        argument: &'a Expression,
        parameter: Option<&'a ParameterInfo>,
    ) -> BuildResult<()> {
        let argument = argument.skip_parentheses();

        if let ExpressionKind::PropertyAccess { object, symbol, .. } = &argument.kind {
            let owner_is_user_enum = object
                .skip_parentheses()
                .as_identifier()
                .is_some_and(|owner| self.declarations.enums.contains_key(&owner.name));
            let member = symbol.as_deref().and_then(|s| self.metadata.lookup(s));
            let is_dropdown = member.is_some_and(|m| m.attributes.block_identity.is_some());
            let is_enum_field = !owner_is_user_enum
                && !is_dropdown
                && (parameter.is_some_and(|p| p.is_enum)
                    || member.is_some_and(|m| m.kind == SymbolKind::EnumMember));
            if is_enum_field || is_dropdown {
                match self.build_property_access(argument, Some(info))? {
                    OutputNode::RawText(value) => block.field(slot.name.clone(), value),
                    value => block.inputs.push(ValueNode::new(slot.name.clone(), value, None)),
                }
                return Ok(());
            }
        }

        let shadow_id = slot
            .shadow_block_id
            .clone()
            .or_else(|| parameter.and_then(|p| p.shadow_block_id.clone()));

        if is_literal_node(argument) {
            let shadow_info = shadow_id
                .as_deref()
                .and_then(|id| self.metadata.shadow_block(id))
                .filter(|s| s.decompile_literals);
            if let (Some(shadow_info), Some(text)) = (shadow_info, literal_text(argument)) {
                let mut shadow = self.new_expression(&shadow_info.block_id)?;
                shadow.block.field(shadow_info.field_name.clone(), text);
                shadow.is_shadow = true;
                block.inputs.push(ValueNode::new(
                    slot.name.clone(),
                    OutputNode::Expression(shadow),
                    Some(&shadow_info.block_id),
                ));
                return Ok(());
            }
        }

        let shadow = shadow_id
            .as_deref()
            .or_else(|| parameter.and_then(|p| shadow_for_type_name(&p.ty)))
            .or_else(|| shadow_for_type(&argument.ty));
        let input = self.value_input(slot.name.clone(), argument, shadow)?;
        block.inputs.push(input);
        Ok(())
    }

    /// Handler chain of an event callback. Destructured parameters and
    /// draggable parameters are recorded on the event block.
    fn build_callback(
        &mut self,
        callback: &'a Expression,
        info: &'a SymbolInfo,
        block: &mut BlockCore,
        scope: Scope,
    ) -> BuildResult<Option<StatementNode>> {
        let (parameters, body) = match &callback.skip_parentheses().kind {
            ExpressionKind::Arrow { parameters, body } => (parameters, CallbackBody::Arrow(body)),
            ExpressionKind::FunctionExpression { declaration } => match &declaration.body {
                Some(body) => (&declaration.parameters, CallbackBody::Block(body)),
                None => {
                    return Err(DecompileError::unsupported(
                        "Event handlers must have a body",
                        callback.span,
                    ))
                }
            },
            _ => return Ok(None),
        };

        let mut reporters = None;
        if let [Parameter {
            name: BindingName::ObjectPattern { elements, .. },
            ..
        }] = parameters.as_slice()
        {
            let mut renames = BTreeMap::new();
            let mut properties = Vec::with_capacity(elements.len());
            for element in elements {
                let name = element.name.identifier().ok_or_else(|| {
                    DecompileError::unsupported(
                        "Only identifiers may be used for variable names in object destructuring patterns",
                        element.span,
                    )
                })?;
                match &element.property_name {
                    Some(property) => {
                        renames.insert(property.name.clone(), name.name.clone());
                        properties.push(property.name.clone());
                    }
                    None => properties.push(name.name.clone()),
                }
            }
            let renamemap = serde_json::to_string(&renames)
                .map_err(|e| DecompileError::Internal(format!("rename map: {}", e)))?;
            let mutation = block.mutation_mut();
            mutation.set("callbackproperties", properties.join(","));
            mutation.set("renamemap", renamemap);
        } else if let Some(mode) = info.attributes.draggable_parameters {
            let mut arguments = Vec::new();
            for parameter in parameters {
                let Some(identifier) = parameter.name.identifier() else {
                    return Err(DecompileError::unsupported(
                        "Unsupported parameters in event handler",
                        parameter.span,
                    ));
                };
                let type_name = handler_parameter_type(info, parameter, &identifier.name);
                let mut reporter = match mode {
                    DraggableParameters::Variable => {
                        self.used_variables.insert(identifier.name.clone());
                        self.new_expression("variables_get_reporter")?
                            .with_field("VAR", identifier.name.clone())
                    }
                    DraggableParameters::Reporter => self
                        .new_expression(argument_reporter_type(&type_name))?
                        .with_field("VALUE", identifier.name.clone()),
                };
                reporter.is_shadow = true;
                block.inputs.push(ValueNode::new(
                    format!("HANDLER_DRAG_PARAM_{}", identifier.name),
                    OutputNode::Expression(reporter),
                    None,
                ));
                arguments.push((
                    identifier.binding,
                    ArgumentInfo {
                        name: identifier.name.clone(),
                        id: String::new(),
                        type_name,
                    },
                ));
            }
            if mode == DraggableParameters::Reporter {
                reporters = Some(FunctionScope { arguments });
            }
        }

        let handler_scope = Scope {
            top_level: false,
            in_function: scope.in_function,
        };
        let outer = match reporters {
            Some(reporters) => self.function.replace(reporters),
            None => self.function.take(),
        };
        let chain = match body {
            CallbackBody::Block(body) => self.build_body(body, handler_scope),
            CallbackBody::Arrow(ArrowBody::Block { block }) => self.build_body(block, handler_scope),
            CallbackBody::Arrow(ArrowBody::Expression { expression }) => self
                .build_expression_body(expression, handler_scope)
                .map(Some),
        };
        self.function = outer;
        chain
    }

    /// Expression-bodied arrow `() => doIt()` as a one-statement handler.
    fn build_expression_body(&mut self, expression: &'a Expression, scope: Scope) -> BuildResult<StatementNode> {
        let span = expression.span;
        let snapshot = self.snapshot();
        let result = match self.checker.check_expression_statement(expression, scope) {
            Ok(()) => self.build_expression_statement(expression, span, scope),
            Err(reason) => Err(DecompileError::unsupported(reason, span)),
        };
        let mut node = match result {
            Err(DecompileError::Unsupported { reason, .. }) => {
                self.restore(&snapshot);
                let identifiers = collect_expression_identifiers(expression);
                self.grey_source(span, identifiers, Vec::new(), &reason)?
            }
            other => other?,
        };
        self.attach_comments(&mut node, span, span.start, scope);
        Ok(node)
    }
}

enum CallbackBody<'a> {
    Arrow(&'a ArrowBody),
    Block(&'a Statement),
}

/// Имя и теневой блок слота блока
struct Slot {
    name: String,
    shadow_block_id: Option<String>,
}

/// Slot names in visible-argument order: the template parameters, after an
/// implicit instance slot when the block hides its receiver.
fn argument_slots(info: &SymbolInfo) -> Vec<Slot> {
    let mut slots = Vec::new();
    if info.attributes.default_instance.is_some() {
        slots.push(Slot {
            name: "__instance__".to_string(),
            shadow_block_id: None,
        });
    }
    if info.block.is_some() {
        slots.extend(info.template_parameters().into_iter().map(|p| Slot {
            name: p.name,
            shadow_block_id: p.shadow_block_id,
        }));
    } else {
        if info.has_receiver() {
            slots.push(Slot {
                name: "this".to_string(),
                shadow_block_id: None,
            });
        }
        slots.extend(info.parameters.iter().filter(|p| !p.is_handler()).map(|p| Slot {
            name: p.name.clone(),
            shadow_block_id: p.shadow_block_id.clone(),
        }));
    }
    slots
}

fn is_callback(argument: &Expression) -> bool {
    matches!(
        argument.skip_parentheses().kind,
        ExpressionKind::Arrow { .. } | ExpressionKind::FunctionExpression { .. }
    )
}

fn argument_child(argument: &ArgumentInfo) -> MutationChild {
    MutationChild {
        tag: "arg".to_string(),
        attributes: vec![
            ("name".to_string(), argument.name.clone()),
            ("id".to_string(), argument.id.clone()),
            ("type".to_string(), argument.type_name.clone()),
        ],
    }
}

/// Type of a handler parameter: declared by the API when known, otherwise
/// the type the host inferred.
fn handler_parameter_type(info: &SymbolInfo, parameter: &Parameter, name: &str) -> String {
    info.parameters
        .iter()
        .flat_map(|p| p.handler_parameters.iter())
        .find(|h| h.name == name)
        .map(|h| h.ty.clone())
        .unwrap_or_else(|| parameter.ty.type_name())
}

/// Field text of a literal argument.
fn literal_text(expr: &Expression) -> Option<String> {
    let expr = expr.skip_parentheses();
    match &expr.kind {
        ExpressionKind::Numeric { text } => Some(text.clone()),
        ExpressionKind::String { value } | ExpressionKind::NoSubstitutionTemplate { value } => {
            Some(value.clone())
        }
        ExpressionKind::True => Some("TRUE".to_string()),
        ExpressionKind::False => Some("FALSE".to_string()),
        ExpressionKind::PrefixUnary {
            operator: UnaryOperator::Minus,
            operand,
        } => literal_text(operand).map(|text| format!("-{}", text)),
        ExpressionKind::PrefixUnary {
            operator: UnaryOperator::Plus,
            operand,
        } => literal_text(operand),
        _ => None,
    }
}
