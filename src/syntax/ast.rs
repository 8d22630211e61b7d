//! AST структуры входного дерева
//!
//! Дерево строится и типизируется хост-компилятором; декомпилятор только
//! читает его. Каждый узел хранит байтовый `TextSpan` в исходном тексте.

use crate::core::position::TextSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор привязки (объявления), назначенный хостом
pub type BindingId = u32;

/// Корневой узел: один исходный файл
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub file_name: String,
    pub text: String,
    pub statements: Vec<Statement>,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
            statements,
        }
    }

    /// Исходный текст узла
    pub fn text_of(&self, span: TextSpan) -> &str {
        span.slice(&self.text)
    }
}

/// Идентификатор с привязкой к объявлению
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: TextSpan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingId>,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: TextSpan) -> Self {
        Self {
            name: name.into(),
            span,
            binding: None,
        }
    }

    pub fn with_binding(mut self, binding: BindingId) -> Self {
        self.binding = Some(binding);
        self
    }
}

/// Тип выражения, вычисленный хостом
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Type {
    Number,
    Boolean,
    String,
    Void,
    Any,
    Array { element: Box<Type> },
    Enum { name: String },
    Named { name: String },
    #[default]
    Unknown,
}

impl Type {
    pub fn array_of(element: Type) -> Self {
        Type::Array {
            element: Box::new(element),
        }
    }

    /// Имя типа в виде, принятом в метаданных блоков
    pub fn type_name(&self) -> String {
        match self {
            Type::Number => "number".to_string(),
            Type::Boolean => "boolean".to_string(),
            Type::String => "string".to_string(),
            Type::Void => "void".to_string(),
            Type::Any => "any".to_string(),
            Type::Array { element } => format!("{}[]", element.type_name()),
            Type::Enum { name } | Type::Named { name } => name.clone(),
            Type::Unknown => "unknown".to_string(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }
}

/// Оператор
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(flatten)]
    pub kind: StatementKind,
    pub span: TextSpan,
}

impl Statement {
    pub fn new(kind: StatementKind, span: TextSpan) -> Self {
        Self { kind, span }
    }
}

/// Виды операторов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StatementKind {
    Block {
        statements: Vec<Statement>,
    },
    Expression {
        expression: Expression,
    },
    Variable {
        declarations: Vec<VariableDeclaration>,
    },
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        #[serde(default)]
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expression,
    },
    For {
        #[serde(default)]
        initializer: Option<ForInitializer>,
        #[serde(default)]
        condition: Option<Expression>,
        #[serde(default)]
        incrementor: Option<Expression>,
        body: Box<Statement>,
    },
    ForOf {
        initializer: ForInitializer,
        iterable: Expression,
        body: Box<Statement>,
    },
    ForIn {
        initializer: ForInitializer,
        object: Expression,
        body: Box<Statement>,
    },
    Function {
        declaration: FunctionDeclaration,
    },
    Return {
        #[serde(default)]
        value: Option<Expression>,
    },
    Break {
        #[serde(default)]
        label: Option<Identifier>,
    },
    Continue {
        #[serde(default)]
        label: Option<Identifier>,
    },
    Debugger,
    Enum {
        declaration: EnumDeclaration,
    },
    Namespace {
        name: Identifier,
        body: Vec<Statement>,
    },
    Switch {
        discriminant: Expression,
        clauses: Vec<SwitchClause>,
    },
    Try {
        block: Box<Statement>,
        #[serde(default)]
        catch_clause: Option<CatchClause>,
        #[serde(default)]
        finally_block: Option<Box<Statement>>,
    },
    Throw {
        expression: Expression,
    },
    Labeled {
        label: Identifier,
        body: Box<Statement>,
    },
    Class {
        #[serde(default)]
        name: Option<Identifier>,
    },
    Interface {
        name: Identifier,
    },
    TypeAlias {
        name: Identifier,
    },
    Import,
    Empty,
}

impl StatementKind {
    /// Имя вида узла для сообщений о неподдерживаемом синтаксисе
    pub fn kind_name(&self) -> &'static str {
        match self {
            StatementKind::Block { .. } => "Block",
            StatementKind::Expression { .. } => "ExpressionStatement",
            StatementKind::Variable { .. } => "VariableStatement",
            StatementKind::If { .. } => "IfStatement",
            StatementKind::While { .. } => "WhileStatement",
            StatementKind::DoWhile { .. } => "DoStatement",
            StatementKind::For { .. } => "ForStatement",
            StatementKind::ForOf { .. } => "ForOfStatement",
            StatementKind::ForIn { .. } => "ForInStatement",
            StatementKind::Function { .. } => "FunctionDeclaration",
            StatementKind::Return { .. } => "ReturnStatement",
            StatementKind::Break { .. } => "BreakStatement",
            StatementKind::Continue { .. } => "ContinueStatement",
            StatementKind::Debugger => "DebuggerStatement",
            StatementKind::Enum { .. } => "EnumDeclaration",
            StatementKind::Namespace { .. } => "ModuleDeclaration",
            StatementKind::Switch { .. } => "SwitchStatement",
            StatementKind::Try { .. } => "TryStatement",
            StatementKind::Throw { .. } => "ThrowStatement",
            StatementKind::Labeled { .. } => "LabeledStatement",
            StatementKind::Class { .. } => "ClassDeclaration",
            StatementKind::Interface { .. } => "InterfaceDeclaration",
            StatementKind::TypeAlias { .. } => "TypeAliasDeclaration",
            StatementKind::Import => "ImportDeclaration",
            StatementKind::Empty => "EmptyStatement",
        }
    }
}

/// Инициализатор `for`/`for-of`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ForInitializer {
    Declarations { declarations: Vec<VariableDeclaration> },
    Expression { expression: Expression },
}

/// Имя в объявлении: идентификатор или деструктуризация
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BindingName {
    Identifier { identifier: Identifier },
    ObjectPattern { elements: Vec<BindingElement>, span: TextSpan },
    ArrayPattern { elements: Vec<BindingElement>, span: TextSpan },
}

impl BindingName {
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            BindingName::Identifier { identifier } => Some(identifier),
            _ => None,
        }
    }

    pub fn span(&self) -> TextSpan {
        match self {
            BindingName::Identifier { identifier } => identifier.span,
            BindingName::ObjectPattern { span, .. } | BindingName::ArrayPattern { span, .. } => *span,
        }
    }
}

/// Элемент деструктуризации `{ property: name }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingElement {
    #[serde(default)]
    pub property_name: Option<Identifier>,
    pub name: BindingName,
    pub span: TextSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: BindingName,
    #[serde(default)]
    pub initializer: Option<Expression>,
    pub span: TextSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: BindingName,
    /// Объявленный или выведенный тип параметра
    #[serde(default)]
    pub ty: Type,
    #[serde(default)]
    pub initializer: Option<Expression>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub rest: bool,
    pub span: TextSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    #[serde(default)]
    pub name: Option<Identifier>,
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub body: Option<Box<Statement>>,
    pub span: TextSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDeclaration {
    pub name: Identifier,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: Identifier,
    #[serde(default)]
    pub initializer: Option<Expression>,
    pub span: TextSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchClause {
    /// `None` для `default:`
    #[serde(default)]
    pub test: Option<Expression>,
    pub body: Vec<Statement>,
    pub span: TextSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    #[serde(default)]
    pub parameter: Option<Identifier>,
    pub block: Box<Statement>,
}

/// Выражение
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(flatten)]
    pub kind: ExpressionKind,
    pub span: TextSpan,
    #[serde(default, rename = "type")]
    pub ty: Type,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: TextSpan, ty: Type) -> Self {
        Self { kind, span, ty }
    }

    /// Снимает скобки `(expr)`
    pub fn skip_parentheses(&self) -> &Expression {
        let mut current = self;
        while let ExpressionKind::Parenthesized { expression } = &current.kind {
            current = expression;
        }
        current
    }

    pub fn as_identifier(&self) -> Option<&Identifier> {
        match &self.kind {
            ExpressionKind::Identifier { identifier } => Some(identifier),
            _ => None,
        }
    }

    /// Строковое значение литерала `"..."` или `` `...` `` без подстановок
    pub fn string_value(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::String { value } | ExpressionKind::NoSubstitutionTemplate { value } => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Numeric { .. }
                | ExpressionKind::String { .. }
                | ExpressionKind::NoSubstitutionTemplate { .. }
                | ExpressionKind::True
                | ExpressionKind::False
        )
    }
}

/// Виды выражений
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExpressionKind {
    Numeric {
        text: String,
    },
    String {
        value: String,
    },
    NoSubstitutionTemplate {
        value: String,
    },
    Template {
        head: String,
        spans: Vec<TemplateSpan>,
    },
    TaggedTemplate {
        tag: Box<Expression>,
        /// Сырой текст шаблона без обратных кавычек
        template: String,
        #[serde(default)]
        has_substitutions: bool,
        #[serde(default)]
        symbol: Option<String>,
    },
    True,
    False,
    Null,
    Identifier {
        identifier: Identifier,
    },
    Parenthesized {
        expression: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    Assignment {
        target: Box<Expression>,
        operator: AssignmentOperator,
        value: Box<Expression>,
    },
    PrefixUnary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    PostfixUnary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    PropertyAccess {
        object: Box<Expression>,
        name: Identifier,
        #[serde(default)]
        symbol: Option<String>,
    },
    ElementAccess {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        #[serde(default)]
        symbol: Option<String>,
    },
    New {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    ArrayLiteral {
        elements: Vec<Expression>,
    },
    ObjectLiteral {
        properties: Vec<ObjectProperty>,
    },
    Arrow {
        parameters: Vec<Parameter>,
        body: ArrowBody,
    },
    FunctionExpression {
        declaration: FunctionDeclaration,
    },
    Conditional {
        condition: Box<Expression>,
        when_true: Box<Expression>,
        when_false: Box<Expression>,
    },
    As {
        expression: Box<Expression>,
        target: Type,
    },
    This,
}

impl ExpressionKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExpressionKind::Numeric { .. } => "NumericLiteral",
            ExpressionKind::String { .. } => "StringLiteral",
            ExpressionKind::NoSubstitutionTemplate { .. } => "NoSubstitutionTemplateLiteral",
            ExpressionKind::Template { .. } => "TemplateExpression",
            ExpressionKind::TaggedTemplate { .. } => "TaggedTemplateExpression",
            ExpressionKind::True => "TrueKeyword",
            ExpressionKind::False => "FalseKeyword",
            ExpressionKind::Null => "NullKeyword",
            ExpressionKind::Identifier { .. } => "Identifier",
            ExpressionKind::Parenthesized { .. } => "ParenthesizedExpression",
            ExpressionKind::Binary { .. } => "BinaryExpression",
            ExpressionKind::Assignment { .. } => "AssignmentExpression",
            ExpressionKind::PrefixUnary { .. } => "PrefixUnaryExpression",
            ExpressionKind::PostfixUnary { .. } => "PostfixUnaryExpression",
            ExpressionKind::PropertyAccess { .. } => "PropertyAccessExpression",
            ExpressionKind::ElementAccess { .. } => "ElementAccessExpression",
            ExpressionKind::Call { .. } => "CallExpression",
            ExpressionKind::New { .. } => "NewExpression",
            ExpressionKind::ArrayLiteral { .. } => "ArrayLiteralExpression",
            ExpressionKind::ObjectLiteral { .. } => "ObjectLiteralExpression",
            ExpressionKind::Arrow { .. } => "ArrowFunction",
            ExpressionKind::FunctionExpression { .. } => "FunctionExpression",
            ExpressionKind::Conditional { .. } => "ConditionalExpression",
            ExpressionKind::As { .. } => "AsExpression",
            ExpressionKind::This => "ThisKeyword",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpan {
    pub expression: Expression,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub name: Identifier,
    #[serde(default)]
    pub value: Option<Expression>,
}

/// Тело стрелочной функции
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ArrowBody {
    Block { block: Box<Statement> },
    Expression { expression: Box<Expression> },
}

/// Бинарные операторы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
    #[serde(rename = "%")]
    Modulo,
    #[serde(rename = "**")]
    Exponent,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "===")]
    StrictEqual,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "!==")]
    StrictNotEqual,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "??")]
    Coalesce,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    ShiftLeft,
    #[serde(rename = ">>")]
    ShiftRight,
    #[serde(rename = ">>>")]
    UnsignedShiftRight,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "instanceof")]
    InstanceOf,
    #[serde(rename = ",")]
    Comma,
}

impl BinaryOperator {
    pub fn token(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Exponent => "**",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::StrictEqual => "===",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::StrictNotEqual => "!==",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Coalesce => "??",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::UnsignedShiftRight => ">>>",
            BinaryOperator::In => "in",
            BinaryOperator::InstanceOf => "instanceof",
            BinaryOperator::Comma => ",",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Операторы присваивания
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentOperator {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubtractAssign,
    #[serde(rename = "*=")]
    MultiplyAssign,
    #[serde(rename = "/=")]
    DivideAssign,
    #[serde(rename = "%=")]
    ModuloAssign,
    /// Побитовые и прочие составные присваивания
    #[serde(rename = "other")]
    Other,
}

impl AssignmentOperator {
    pub fn token(&self) -> &'static str {
        match self {
            AssignmentOperator::Assign => "=",
            AssignmentOperator::AddAssign => "+=",
            AssignmentOperator::SubtractAssign => "-=",
            AssignmentOperator::MultiplyAssign => "*=",
            AssignmentOperator::DivideAssign => "/=",
            AssignmentOperator::ModuloAssign => "%=",
            AssignmentOperator::Other => "op=",
        }
    }
}

/// Унарные операторы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_json_shape() {
        let json = r#"{
            "kind": "expression",
            "span": {"start": 0, "end": 6},
            "expression": {
                "kind": "call",
                "span": {"start": 0, "end": 5},
                "type": {"kind": "void"},
                "callee": {
                    "kind": "identifier",
                    "span": {"start": 0, "end": 3},
                    "identifier": {"name": "doX", "span": {"start": 0, "end": 3}}
                },
                "arguments": [],
                "symbol": "doX"
            }
        }"#;
        let stmt: Statement = serde_json::from_str(json).unwrap();
        assert_eq!(stmt.span, TextSpan::new(0, 6));
        match &stmt.kind {
            StatementKind::Expression { expression } => {
                assert_eq!(expression.ty, Type::Void);
                assert!(matches!(expression.kind, ExpressionKind::Call { .. }));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Type::array_of(Type::Number).type_name(), "number[]");
        assert_eq!(Type::Enum { name: "Direction".into() }.type_name(), "Direction");
        assert_eq!(BinaryOperator::StrictNotEqual.token(), "!==");
    }
}
