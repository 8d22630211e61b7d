//! Промежуточное дерево блоков между построителем и сериализатором.
//!
//! Голова цепочки операторов владеет всей цепочкой (`next`) и вложенными
//! обработчиками; разделяемых узлов и циклов нет.

use crate::core::position::TextSpan;
use serde::Serialize;

/// Идентификатор оператора внутри одного вызова декомпиляции
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StatementId(pub usize);

/// Тип теневого блока по умолчанию для числового слота
pub const NUMBER_SHADOW: &str = "math_number";
pub const BOOLEAN_SHADOW: &str = "logic_boolean";
pub const STRING_SHADOW: &str = "text";

/// Поле блока с литеральным значением
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldNode {
    pub name: String,
    pub value: String,
}

impl FieldNode {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Атрибуты мутации в порядке добавления
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mutation {
    pub attributes: Vec<(String, String)>,
    /// Дочерние элементы мутации, например `<arg name id type/>`
    pub children: Vec<MutationChild>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, keeping the position of an existing key.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationChild {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

/// Общая часть блоков-операторов и блоков-выражений
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockCore {
    pub block_type: String,
    pub fields: Vec<FieldNode>,
    pub inputs: Vec<ValueNode>,
    pub mutation: Option<Mutation>,
}

impl BlockCore {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            ..Default::default()
        }
    }

    pub fn field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(FieldNode::new(name, value));
    }

    pub fn mutation_mut(&mut self) -> &mut Mutation {
        self.mutation.get_or_insert_with(Mutation::new)
    }
}

/// Блок-выражение
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionNode {
    pub block: BlockCore,
    /// Выводить сам блок как теневой
    pub is_shadow: bool,
}

impl ExpressionNode {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block: BlockCore::new(block_type),
            is_shadow: false,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.block.field(name, value);
        self
    }

    pub fn block_type(&self) -> &str {
        &self.block.block_type
    }
}

/// Содержимое входа-значения
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OutputNode {
    Expression(ExpressionNode),
    /// Сырой текст (например значение поля перечисления)
    RawText(String),
}

/// Вход-значение блока
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueNode {
    pub name: String,
    pub value: OutputNode,
    /// Теневой блок по умолчанию для этого слота
    pub shadow_type: Option<String>,
}

impl ValueNode {
    pub fn new(name: impl Into<String>, value: OutputNode, shadow_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value,
            shadow_type: shadow_type.map(str::to_string),
        }
    }

    pub fn expression(&self) -> Option<&ExpressionNode> {
        match &self.value {
            OutputNode::Expression(e) => Some(e),
            OutputNode::RawText(_) => None,
        }
    }
}

/// Именованная вложенная цепочка (тело цикла, ветка, обработчик)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Handler {
    pub name: String,
    pub statement: Option<Box<StatementNode>>,
}

/// Блок-оператор
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementNode {
    pub id: StatementId,
    pub block: BlockCore,
    pub handlers: Vec<Handler>,
    pub next: Option<Box<StatementNode>>,
    /// Ссылки на группы комментариев рабочей области перед блоком
    pub data: Option<String>,
    /// Идентификатор блока для карты исходников
    pub block_id: Option<String>,
    pub span: Option<TextSpan>,
}

impl StatementNode {
    pub fn new(id: StatementId, block_type: impl Into<String>) -> Self {
        Self {
            id,
            block: BlockCore::new(block_type),
            handlers: Vec::new(),
            next: None,
            data: None,
            block_id: None,
            span: None,
        }
    }

    pub fn block_type(&self) -> &str {
        &self.block.block_type
    }

    pub fn handler(&mut self, name: impl Into<String>, statement: Option<StatementNode>) {
        self.handlers.push(Handler {
            name: name.into(),
            statement: statement.map(Box::new),
        });
    }

    /// Итератор по цепочке `next`, начиная с этого блока
    pub fn chain(&self) -> ChainIter<'_> {
        ChainIter {
            current: Some(self),
        }
    }
}

pub struct ChainIter<'a> {
    current: Option<&'a StatementNode>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a StatementNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.next.as_deref();
        Some(node)
    }
}

/// Links `nodes` into one `next` chain and returns its head.
pub fn link_chain(nodes: Vec<StatementNode>) -> Option<StatementNode> {
    nodes.into_iter().rev().fold(None, |next, mut node| {
        if let Some(next) = next {
            // блок, развёрнутый в несколько, уже может иметь хвост
            let tail = last_in_chain(&mut node);
            tail.next = Some(Box::new(next));
        }
        Some(node)
    })
}

fn last_in_chain(node: &mut StatementNode) -> &mut StatementNode {
    match node.next {
        Some(ref mut next) => last_in_chain(next),
        None => node,
    }
}
