//! Top-level declarations collected before building: user functions, enums
//! registered with blocks, and kind namespaces.

use std::collections::HashMap;

use crate::core::errors::{BuildResult, DecompileError};
use crate::metadata::{EnumInfo, KindInfo, SymbolMetadataTable};
use crate::syntax::{
    walk_statement, BinaryOperator, Expression, ExpressionKind, NodeRef, SourceFile, Statement,
    StatementKind, Type, UnaryOperator, VisitControl, Visitor,
};

use super::ids::IdGenerator;

/// Параметр пользовательской функции
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentInfo {
    pub name: String,
    pub id: String,
    pub type_name: String,
}

/// Пользовательская функция, объявленная в файле
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub id: String,
    pub arguments: Vec<ArgumentInfo>,
    pub returns_value: bool,
}

#[derive(Debug, Clone)]
pub struct UserEnum {
    pub info: EnumInfo,
    /// (член, значение) в порядке объявления
    pub members: Vec<(String, i64)>,
}

impl UserEnum {
    pub fn value_of(&self, member: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, value)| *value)
    }

    /// Имя переменной блоков для члена перечисления
    pub fn variable_name(&self, member: &str) -> Option<String> {
        self.value_of(member).map(|value| format!("{}{}", value, member))
    }
}

#[derive(Debug, Clone)]
pub struct UserKind {
    pub info: KindInfo,
    pub members: Vec<String>,
}

/// Объявления верхнего уровня одного файла
#[derive(Debug, Clone, Default)]
pub struct FileDeclarations {
    pub functions: HashMap<String, FunctionInfo>,
    pub enums: HashMap<String, UserEnum>,
    pub kinds: HashMap<String, UserKind>,
    /// Порядок объявления перечислений и kind для `<variables>`
    pub order: Vec<String>,
}

impl FileDeclarations {
    pub fn collect(
        file: &SourceFile,
        metadata: &SymbolMetadataTable,
        ids: &mut IdGenerator,
    ) -> BuildResult<Self> {
        let mut declarations = Self::default();
        for stmt in &file.statements {
            match &stmt.kind {
                StatementKind::Function { declaration } => {
                    let Some(name) = &declaration.name else {
                        continue;
                    };
                    let arguments = declaration
                        .parameters
                        .iter()
                        .filter_map(|p| {
                            p.name.identifier().map(|ident| ArgumentInfo {
                                name: ident.name.clone(),
                                id: ids.new_id("arg"),
                                type_name: p.ty.type_name(),
                            })
                        })
                        .collect();
                    let returns_value = declaration
                        .body
                        .as_deref()
                        .map(returns_value)
                        .unwrap_or(false);
                    declarations.functions.insert(
                        name.name.clone(),
                        FunctionInfo {
                            name: name.name.clone(),
                            id: ids.new_id("func"),
                            arguments,
                            returns_value,
                        },
                    );
                }
                StatementKind::Enum { declaration } => {
                    let Some(info) = metadata.enum_info(&declaration.name.name) else {
                        continue;
                    };
                    let members = enum_member_values(declaration, info)?;
                    declarations.order.push(declaration.name.name.clone());
                    declarations.enums.insert(
                        declaration.name.name.clone(),
                        UserEnum {
                            info: info.clone(),
                            members,
                        },
                    );
                }
                StatementKind::Namespace { name, body } => {
                    let Some(info) = metadata.kind_info(&name.name) else {
                        continue;
                    };
                    let members = kind_members(body, info, stmt)?;
                    declarations.order.push(name.name.clone());
                    declarations.kinds.insert(
                        name.name.clone(),
                        UserKind {
                            info: info.clone(),
                            members,
                        },
                    );
                }
                _ => {}
            }
        }
        Ok(declarations)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }
}

fn returns_value(body: &Statement) -> bool {
    struct Finder {
        found: bool,
    }
    impl<'a> Visitor<'a> for Finder {
        fn enter(&mut self, node: NodeRef<'a>) -> VisitControl {
            match node {
                NodeRef::Statement(stmt) => {
                    if let StatementKind::Return { value: Some(_) } = stmt.kind {
                        self.found = true;
                        return VisitControl::Stop;
                    }
                    VisitControl::Continue
                }
                // вложенные функции возвращают своё
                NodeRef::Expression(expr) => match expr.kind {
                    ExpressionKind::Arrow { .. } | ExpressionKind::FunctionExpression { .. } => {
                        VisitControl::SkipChildren
                    }
                    _ => VisitControl::Continue,
                },
                _ => VisitControl::Continue,
            }
        }
    }
    let mut finder = Finder { found: false };
    walk_statement(body, &mut finder);
    finder.found
}

fn enum_member_values(
    declaration: &crate::syntax::EnumDeclaration,
    info: &EnumInfo,
) -> BuildResult<Vec<(String, i64)>> {
    let mut members = Vec::with_capacity(declaration.members.len());
    let mut previous: Option<i64> = None;
    for (index, member) in declaration.members.iter().enumerate() {
        let value = match &member.initializer {
            Some(init) => integer_value(init).ok_or_else(|| {
                DecompileError::structural(
                    format!(
                        "Enum member {}.{} must be initialized with an integer literal",
                        declaration.name.name, member.name.name
                    ),
                    member.span,
                )
            })?,
            None => {
                let next = match previous {
                    Some(prev) if info.is_bit_mask && prev > 0 => prev.checked_mul(2),
                    _ if info.is_bit_mask => Some(1 << index.min(62)),
                    Some(prev) => prev.checked_add(1),
                    None => Some(info.first_value),
                };
                next.ok_or_else(|| {
                    DecompileError::structural(
                        format!(
                            "Enum member {}.{} value is out of range",
                            declaration.name.name, member.name.name
                        ),
                        member.span,
                    )
                })?
            }
        };
        previous = Some(value);
        members.push((member.name.name.clone(), value));
    }
    Ok(members)
}

/// Integer value of `5`, `-5`, `0x10` or `1 << 3`.
pub(crate) fn integer_value(expr: &Expression) -> Option<i64> {
    match &expr.skip_parentheses().kind {
        ExpressionKind::Numeric { text } => parse_integer(text),
        ExpressionKind::PrefixUnary {
            operator: UnaryOperator::Minus,
            operand,
        } => integer_value(operand)?.checked_neg(),
        ExpressionKind::Binary {
            left,
            operator: BinaryOperator::ShiftLeft,
            right,
        } => {
            let shift = integer_value(right)?;
            if !(0..63).contains(&shift) {
                return None;
            }
            integer_value(left).map(|v| v << shift)
        }
        _ => None,
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let text = text.replace('_', "");
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).ok();
    }
    text.parse().ok()
}

fn kind_members(body: &[Statement], info: &KindInfo, namespace: &Statement) -> BuildResult<Vec<String>> {
    let create = format!("{}.{}", info.name, info.create_function_name);
    let mut members = Vec::new();
    for stmt in body {
        let malformed = || {
            DecompileError::structural(
                format!(
                    "Kind declarations in {} may only contain `export const X = {}()`",
                    info.name, create
                ),
                if stmt.span.is_empty() { namespace.span } else { stmt.span },
            )
        };
        let StatementKind::Variable { declarations } = &stmt.kind else {
            return Err(malformed());
        };
        for decl in declarations {
            let name = decl.name.identifier().ok_or_else(malformed)?;
            let is_create_call = matches!(
                decl.initializer.as_ref().map(|e| &e.skip_parentheses().kind),
                Some(ExpressionKind::Call { symbol: Some(symbol), arguments, .. })
                    if *symbol == create && arguments.is_empty()
            );
            if !is_create_call {
                return Err(malformed());
            }
            members.push(name.name.clone());
        }
    }
    Ok(members)
}

/// Тип выражения для аргументов пользовательских функций
pub(crate) fn argument_reporter_type(type_name: &str) -> &'static str {
    match type_name {
        "number" => "argument_reporter_number",
        "boolean" => "argument_reporter_boolean",
        "string" => "argument_reporter_string",
        name if name.ends_with("[]") => "argument_reporter_array",
        _ => "argument_reporter_custom",
    }
}

/// Shadow type for a value of `ty` passed into a slot of that type.
pub(crate) fn shadow_for_type(ty: &Type) -> Option<&'static str> {
    match ty {
        Type::Number => Some(super::nodes::NUMBER_SHADOW),
        Type::Boolean => Some(super::nodes::BOOLEAN_SHADOW),
        Type::String => Some(super::nodes::STRING_SHADOW),
        _ => None,
    }
}

/// Same as [`shadow_for_type`] for a type written as a metadata name.
pub(crate) fn shadow_for_type_name(type_name: &str) -> Option<&'static str> {
    match type_name {
        "number" => Some(super::nodes::NUMBER_SHADOW),
        "boolean" => Some(super::nodes::BOOLEAN_SHADOW),
        "string" => Some(super::nodes::STRING_SHADOW),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SyntaxFactory;

    fn direction_metadata() -> SymbolMetadataTable {
        SymbolMetadataTable::new().with_enum(EnumInfo {
            name: "Direction".to_string(),
            block_id: "direction_enum".to_string(),
            first_value: 1,
            ..Default::default()
        })
    }

    #[test]
    fn test_enum_member_values_increment() {
        let f = SyntaxFactory::new("main.ts", "enum Direction { Left, Right = 5, Up }");
        let stmt = f.enum_decl(
            "Direction",
            vec![("Left", None), ("Right", Some(f.num("5", 0))), ("Up", None)],
        );
        let file = f.file(vec![stmt]);
        let decls =
            FileDeclarations::collect(&file, &direction_metadata(), &mut IdGenerator::new()).unwrap();
        let direction = &decls.enums["Direction"];
        assert_eq!(
            direction.members,
            vec![("Left".to_string(), 1), ("Right".to_string(), 5), ("Up".to_string(), 6)]
        );
        assert_eq!(direction.variable_name("Up"), Some("6Up".to_string()));
    }

    #[test]
    fn test_malformed_enum_is_structural_error() {
        let f = SyntaxFactory::new("main.ts", "enum Direction { Left = \"a\" }");
        let stmt = f.enum_decl("Direction", vec![("Left", Some(f.string("a", 0)))]);
        let file = f.file(vec![stmt]);
        let err = FileDeclarations::collect(&file, &direction_metadata(), &mut IdGenerator::new())
            .unwrap_err();
        assert!(matches!(err, DecompileError::Structural { .. }));
    }

    #[test]
    fn test_enum_auto_value_overflow_is_structural_error() {
        let f = SyntaxFactory::new("main.ts", "enum Direction { Left = 0x7fffffffffffffff, Right }");
        let stmt = f.enum_decl(
            "Direction",
            vec![("Left", Some(f.num("0x7fffffffffffffff", 0))), ("Right", None)],
        );
        let file = f.file(vec![stmt]);
        let err = FileDeclarations::collect(&file, &direction_metadata(), &mut IdGenerator::new())
            .unwrap_err();
        assert!(matches!(err, DecompileError::Structural { .. }));
        assert!(err.to_string().contains("Direction.Right"));
    }

    #[test]
    fn test_integer_values() {
        let f = SyntaxFactory::new("main.ts", "0x10 1 << 3");
        assert_eq!(integer_value(&f.num("0x10", 0)), Some(16));
        let shift = f.binary(f.num("1", 0), BinaryOperator::ShiftLeft, f.num("3", 0), Type::Number);
        assert_eq!(integer_value(&shift), Some(8));
    }

    #[test]
    fn test_kind_namespace_members() {
        let text = "namespace SpriteKind {\n    export const Player = SpriteKind.create();\n}";
        let f = SyntaxFactory::new("main.ts", text);
        let create = f.call(
            f.path("SpriteKind.create", 0, Some("SpriteKind.create"), Type::Number),
            Vec::new(),
            Some("SpriteKind.create"),
            Type::Number,
        );
        let member = f.var_stmt(vec![f.declaration(f.declare("Player", 0), Some(create))]);
        let namespace = f.raw_stmt(
            StatementKind::Namespace {
                name: crate::syntax::Identifier::new("SpriteKind", f.word_nth("SpriteKind", 0)),
                body: vec![member],
            },
            text,
            0,
        );
        let metadata = SymbolMetadataTable::new().with_kind(KindInfo {
            name: "SpriteKind".to_string(),
            block_id: "spritekind".to_string(),
            create_function_name: "create".to_string(),
        });

        let decls = FileDeclarations::collect(&f.file(vec![namespace]), &metadata, &mut IdGenerator::new())
            .unwrap();
        assert_eq!(decls.kinds["SpriteKind"].members, vec!["Player".to_string()]);
        assert_eq!(decls.order, vec!["SpriteKind".to_string()]);
    }
}
