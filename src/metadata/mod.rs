/*!
# Symbol metadata

Read-only table that maps fully-qualified API names to their block identity.
It is populated by the host's compiler front-end (usually from JSON) and is
looked up by qualified name throughout tree building.
*/

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Вид символа API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    #[default]
    Function,
    Method,
    Property,
    EnumMember,
    Variable,
    Module,
}

/// Как обработчик события отдаёт свои параметры в блоки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraggableParameters {
    /// `variables_get_reporter` с именем переменной
    Variable,
    /// `argument_reporter_*` по типу параметра
    Reporter,
}

/// Параметр обработчика события (стрелочной функции-аргумента)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Описание параметра API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub is_enum: bool,
    pub shadow_block_id: Option<String>,
    pub field_editor: Option<String>,
    pub decompile_literals: bool,
    pub handler_parameters: Vec<HandlerParameter>,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            ..Default::default()
        }
    }

    pub fn is_handler(&self) -> bool {
        self.ty == "() => void" || self.ty.contains("=>")
    }
}

/// Атрибуты блока из комментариев `//%` объявления API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockAttributes {
    /// Теневой блок-выпадающий список для членов перечисления
    pub block_identity: Option<String>,
    pub enum_value: Option<String>,
    pub use_enum_value: bool,
    /// Экземпляр, который блок подразумевает и не показывает
    pub default_instance: Option<String>,
    pub fixed_instance: bool,
    pub fixed_instances: bool,
    /// Ширина картинки в кадрах по 5 столбцов
    pub image_literal: Option<usize>,
    /// Блок-оператор для функции, возвращающей значение
    pub alias_block_id: Option<String>,
    pub draggable_parameters: Option<DraggableParameters>,
    pub is_auto_create: bool,
    pub property_getter: Option<String>,
    pub property_setter: Option<String>,
    pub property_updater: Option<String>,
}

/// Описание символа API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymbolInfo {
    pub qualified_name: String,
    pub namespace: String,
    pub kind: SymbolKind,
    pub block_id: Option<String>,
    /// Шаблон блока: `"show number %number"`, `%name=shadowId` задаёт теневой блок
    pub block: Option<String>,
    pub return_type: String,
    pub parameters: Vec<ParameterInfo>,
    pub attributes: BlockAttributes,
}

impl SymbolInfo {
    pub fn new(qualified_name: impl Into<String>, kind: SymbolKind) -> Self {
        let qualified_name = qualified_name.into();
        let namespace = qualified_name
            .rsplit_once('.')
            .map(|(ns, _)| ns.to_string())
            .unwrap_or_default();
        Self {
            qualified_name,
            namespace,
            kind,
            return_type: "void".to_string(),
            ..Default::default()
        }
    }

    pub fn with_block(mut self, block_id: impl Into<String>, template: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self.block = Some(template.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterInfo) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    pub fn with_attributes(mut self, attributes: BlockAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Вызов возвращает значение
    pub fn is_expression(&self) -> bool {
        !self.return_type.is_empty() && self.return_type != "void"
    }

    /// Первый видимый аргумент блока - получатель вызова
    pub fn has_receiver(&self) -> bool {
        matches!(self.kind, SymbolKind::Method | SymbolKind::Property)
    }

    pub fn template_parameters(&self) -> Vec<TemplateParameter> {
        self.block
            .as_deref()
            .map(parse_block_template)
            .unwrap_or_default()
    }
}

/// Перечисление API с блочным представлением
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnumInfo {
    pub name: String,
    pub block_id: String,
    pub is_bit_mask: bool,
    pub first_value: i64,
}

/// "Kind": пространство имён, члены которого создаются вызовом `create`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KindInfo {
    pub name: String,
    pub block_id: String,
    pub create_function_name: String,
}

/// Теневой блок, в который литерал аргумента попадает как поле
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShadowBlockInfo {
    pub block_id: String,
    pub field_name: String,
    pub decompile_literals: bool,
}

/// Параметр шаблона блока
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameter {
    pub name: String,
    pub shadow_block_id: Option<String>,
}

static TEMPLATE_PARAMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[%$]([A-Za-z_]\w*)(?:=([\w.]+))?").expect("valid template regex"));

/// Разбирает параметры шаблона блока в порядке появления
pub fn parse_block_template(template: &str) -> Vec<TemplateParameter> {
    TEMPLATE_PARAMETER
        .captures_iter(template)
        .map(|caps| TemplateParameter {
            name: caps[1].to_string(),
            shadow_block_id: caps.get(2).map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// Таблица метаданных символов
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymbolMetadataTable {
    pub symbols: HashMap<String, SymbolInfo>,
    pub enums: HashMap<String, EnumInfo>,
    pub kinds: HashMap<String, KindInfo>,
    pub shadow_blocks: HashMap<String, ShadowBlockInfo>,
    /// Имена, уже занятые глобальными символами хоста
    pub globals: HashSet<String>,
}

impl SymbolMetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, info: SymbolInfo) -> Self {
        self.symbols.insert(info.qualified_name.clone(), info);
        self
    }

    pub fn with_enum(mut self, info: EnumInfo) -> Self {
        self.enums.insert(info.name.clone(), info);
        self
    }

    pub fn with_kind(mut self, info: KindInfo) -> Self {
        self.kinds.insert(info.name.clone(), info);
        self
    }

    pub fn with_shadow_block(mut self, info: ShadowBlockInfo) -> Self {
        self.shadow_blocks.insert(info.block_id.clone(), info);
        self
    }

    pub fn with_global(mut self, name: impl Into<String>) -> Self {
        self.globals.insert(name.into());
        self
    }

    pub fn lookup(&self, qualified_name: &str) -> Option<&SymbolInfo> {
        self.symbols.get(qualified_name)
    }

    pub fn enum_info(&self, name: &str) -> Option<&EnumInfo> {
        self.enums.get(name)
    }

    pub fn kind_info(&self, name: &str) -> Option<&KindInfo> {
        self.kinds.get(name)
    }

    pub fn shadow_block(&self, block_id: &str) -> Option<&ShadowBlockInfo> {
        self.shadow_blocks.get(block_id)
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    /// Parse a table from JSON, filling qualified names from map keys
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut table: Self =
            serde_json::from_str(json).context("Failed to parse symbol metadata JSON")?;
        table.normalize();
        Ok(table)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = crate::core::read_text_file(path.as_ref()).with_context(|| {
            format!(
                "Failed to read symbol metadata from {}",
                path.as_ref().display()
            )
        })?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid symbol metadata in {}", path.as_ref().display()))
    }

    fn normalize(&mut self) {
        for (key, info) in self.symbols.iter_mut() {
            if info.qualified_name.is_empty() {
                info.qualified_name = key.clone();
            }
            if info.namespace.is_empty() {
                if let Some((ns, _)) = key.rsplit_once('.') {
                    info.namespace = ns.to_string();
                }
            }
            if info.return_type.is_empty() {
                info.return_type = "void".to_string();
            }
        }
        for (key, info) in self.enums.iter_mut() {
            if info.name.is_empty() {
                info.name = key.clone();
            }
        }
        for (key, info) in self.kinds.iter_mut() {
            if info.name.is_empty() {
                info.name = key.clone();
            }
        }
        for (key, info) in self.shadow_blocks.iter_mut() {
            if info.block_id.is_empty() {
                info.block_id = key.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_block_template() {
        let params = parse_block_template("show number %number=math_number at %x|%y");
        assert_eq!(
            params,
            vec![
                TemplateParameter {
                    name: "number".to_string(),
                    shadow_block_id: Some("math_number".to_string()),
                },
                TemplateParameter {
                    name: "x".to_string(),
                    shadow_block_id: None,
                },
                TemplateParameter {
                    name: "y".to_string(),
                    shadow_block_id: None,
                },
            ]
        );
    }

    #[test]
    fn test_from_json_fills_keys() {
        let json = r#"{
            "symbols": {
                "basic.showNumber": {
                    "blockId": "device_show_number",
                    "block": "show|number %number",
                    "parameters": [{"name": "number", "type": "number"}]
                }
            },
            "enums": {"Direction": {"blockId": "direction_enum"}},
            "globals": ["basic"]
        }"#;
        let table = SymbolMetadataTable::from_json_str(json).unwrap();
        let info = table.lookup("basic.showNumber").unwrap();
        assert_eq!(info.qualified_name, "basic.showNumber");
        assert_eq!(info.namespace, "basic");
        assert!(!info.is_expression());
        assert_eq!(table.enum_info("Direction").unwrap().name, "Direction");
        assert!(table.is_global("basic"));
    }

    #[test]
    fn test_host_only_keys_are_ignored() {
        let json = r#"{
            "symbols": {
                "basic.pause": {
                    "blockId": "device_pause",
                    "block": "pause %ms",
                    "parameters": [{"name": "ms", "type": "number", "defaultValue": "100"}]
                }
            },
            "enums": {"Sound": {"blockId": "sound_enum", "isHash": true, "firstValue": 1}}
        }"#;
        let table = SymbolMetadataTable::from_json_str(json).unwrap();
        assert_eq!(
            table.lookup("basic.pause").unwrap().parameters,
            vec![ParameterInfo::new("ms", "number")]
        );
        assert_eq!(table.enum_info("Sound").unwrap().first_value, 1);
    }

    #[test]
    fn test_symbol_builder() {
        let info = SymbolInfo::new("Math.randomRange", SymbolKind::Function)
            .with_block("device_random", "pick random %min|to %limit")
            .with_return_type("number");
        assert!(info.is_expression());
        assert_eq!(info.template_parameters().len(), 2);
        assert_eq!(info.namespace, "Math");
    }
}
