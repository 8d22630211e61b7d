/*!
# Blockly XML serializer

Depth-first emission of the built block tree. Value slots get their
default shadow injected unless the connected block already is that shadow;
statement comments and workspace comment references are written last in
each statement element.
*/

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::core::errors::{BuildResult, DecompileError};

use super::attach::WorkspaceComment;
use super::builder::{BuildOutput, VariableEntry};
use super::nodes::{
    BlockCore, ExpressionNode, Mutation, OutputNode, StatementId, StatementNode, ValueNode,
    BOOLEAN_SHADOW, NUMBER_SHADOW, STRING_SHADOW,
};

/// Пространство имён корневого элемента
pub const BLOCKLY_XMLNS: &str = "https://developers.google.com/blockly/xml";

/// Serializes a built file into Blockly XML.
pub fn serialize(output: &BuildOutput) -> BuildResult<String> {
    let mut serializer = XmlSerializer::new(&output.statement_comments);
    serializer.document(output)?;
    serializer.finish()
}

struct XmlSerializer<'o> {
    writer: Writer<Vec<u8>>,
    comments: &'o HashMap<StatementId, String>,
}

impl<'o> XmlSerializer<'o> {
    fn new(comments: &'o HashMap<StatementId, String>) -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
            comments,
        }
    }

    fn finish(self) -> BuildResult<String> {
        let bytes = self.writer.into_inner();
        String::from_utf8(bytes).map_err(|e| DecompileError::Internal(format!("serialized markup is not UTF-8: {}", e)))
    }

    fn document(&mut self, output: &BuildOutput) -> BuildResult<()> {
        self.start("xml", &[("xmlns", BLOCKLY_XMLNS)])?;
        if !output.variables.is_empty() {
            self.variables(&output.variables)?;
        }
        for block in &output.blocks {
            self.statement(block)?;
        }
        for comment in &output.workspace_comments {
            self.workspace_comment(comment)?;
        }
        self.end("xml")
    }

    fn variables(&mut self, variables: &[VariableEntry]) -> BuildResult<()> {
        self.start("variables", &[])?;
        for variable in variables {
            match &variable.type_name {
                Some(type_name) => self.text_element("variable", &[("type", type_name.as_str())], &variable.name)?,
                None => self.text_element("variable", &[], &variable.name)?,
            }
        }
        self.end("variables")
    }

    fn workspace_comment(&mut self, comment: &WorkspaceComment) -> BuildResult<()> {
        let Some(text) = &comment.text else {
            return Ok(());
        };
        let (width, height) = comment.size();
        let (width, height) = (width.to_string(), height.to_string());
        self.text_element(
            "comment",
            &[("h", height.as_str()), ("w", width.as_str()), ("data", comment.id.as_str())],
            text,
        )
    }

    fn statement(&mut self, node: &StatementNode) -> BuildResult<()> {
        match &node.block_id {
            Some(id) => self.start("block", &[("type", node.block_type()), ("id", id.as_str())])?,
            None => self.start("block", &[("type", node.block_type())])?,
        }
        self.block_core(&node.block)?;

        for handler in &node.handlers {
            self.start("statement", &[("name", handler.name.as_str())])?;
            if let Some(statement) = &handler.statement {
                self.statement(statement)?;
            }
            self.end("statement")?;
        }
        if let Some(next) = &node.next {
            self.start("next", &[])?;
            self.statement(next)?;
            self.end("next")?;
        }
        if let Some(comment) = self.comments.get(&node.id) {
            self.text_element("comment", &[("pinned", "false")], comment)?;
        }
        if let Some(data) = &node.data {
            self.text_element("data", &[], data)?;
        }
        self.end("block")
    }

    fn block_core(&mut self, block: &BlockCore) -> BuildResult<()> {
        if let Some(mutation) = &block.mutation {
            self.mutation(mutation)?;
        }
        for field in &block.fields {
            self.text_element("field", &[("name", field.name.as_str())], &field.value)?;
        }
        for input in &block.inputs {
            self.value(input)?;
        }
        Ok(())
    }

    fn mutation(&mut self, mutation: &Mutation) -> BuildResult<()> {
        let attributes: Vec<(&str, &str)> = mutation
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if mutation.children.is_empty() {
            return self.empty("mutation", &attributes);
        }
        self.start("mutation", &attributes)?;
        for child in &mutation.children {
            let child_attributes: Vec<(&str, &str)> = child
                .attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            self.empty(&child.tag, &child_attributes)?;
        }
        self.end("mutation")
    }

    /// Value slot. A connected block that already is the slot's shadow (or a
    /// plain literal) is written once as the shadow; anything else is
    /// preceded by the default shadow so removing it restores the default.
    fn value(&mut self, input: &ValueNode) -> BuildResult<()> {
        self.start("value", &[("name", input.name.as_str())])?;
        match &input.value {
            OutputNode::RawText(text) => self.text(text)?,
            OutputNode::Expression(expression) => {
                if is_shadow_only(input, expression) {
                    self.expression(expression, true)?;
                } else {
                    if let Some(shadow_type) = &input.shadow_type {
                        self.default_shadow(shadow_type)?;
                    }
                    self.expression(expression, false)?;
                }
            }
        }
        self.end("value")
    }

    fn default_shadow(&mut self, shadow_type: &str) -> BuildResult<()> {
        self.start("shadow", &[("type", shadow_type)])?;
        match shadow_type {
            NUMBER_SHADOW => self.text_element("field", &[("name", "NUM")], "0")?,
            BOOLEAN_SHADOW => self.text_element("field", &[("name", "BOOL")], "TRUE")?,
            STRING_SHADOW => self.text_element("field", &[("name", "TEXT")], "")?,
            _ => {}
        }
        self.end("shadow")
    }

    fn expression(&mut self, node: &ExpressionNode, shadow: bool) -> BuildResult<()> {
        let tag = if shadow || node.is_shadow { "shadow" } else { "block" };
        self.start(tag, &[("type", node.block_type())])?;
        self.block_core(&node.block)?;
        self.end(tag)
    }

    fn start(&mut self, tag: &str, attributes: &[(&str, &str)]) -> BuildResult<()> {
        let element = BytesStart::new(tag).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    fn empty(&mut self, tag: &str, attributes: &[(&str, &str)]) -> BuildResult<()> {
        let element = BytesStart::new(tag).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn end(&mut self, tag: &str) -> BuildResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> BuildResult<()> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// `<tag>text</tag>` on one line, also for empty text.
    fn text_element(&mut self, tag: &str, attributes: &[(&str, &str)], text: &str) -> BuildResult<()> {
        self.start(tag, attributes)?;
        self.text(text)?;
        self.end(tag)
    }
}

fn is_shadow_only(input: &ValueNode, expression: &ExpressionNode) -> bool {
    expression.is_shadow
        || input.shadow_type.as_deref() == Some(expression.block_type())
        || matches!(
            expression.block_type(),
            NUMBER_SHADOW | BOOLEAN_SHADOW | STRING_SHADOW
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompiler::nodes::{FieldNode, StatementNode};
    use pretty_assertions::assert_eq;

    fn number(value: &str) -> ExpressionNode {
        ExpressionNode::new(NUMBER_SHADOW).with_field("NUM", value)
    }

    fn output_with(blocks: Vec<StatementNode>) -> BuildOutput {
        BuildOutput {
            blocks,
            ..BuildOutput::default()
        }
    }

    #[test]
    fn test_literal_in_matching_slot_is_written_once_as_shadow() {
        let mut node = StatementNode::new(StatementId(0), "device_pause");
        node.block.inputs.push(ValueNode::new(
            "pause",
            OutputNode::Expression(number("100")),
            Some(NUMBER_SHADOW),
        ));
        let xml = serialize(&output_with(vec![node])).unwrap();

        assert_eq!(xml.matches("math_number").count(), 1);
        assert!(xml.contains(r#"<shadow type="math_number">"#));
        assert!(!xml.contains(r#"<block type="math_number">"#));
    }

    #[test]
    fn test_non_literal_value_gets_default_shadow() {
        let mut node = StatementNode::new(StatementId(0), "device_pause");
        let reporter = ExpressionNode::new("variables_get").with_field("VAR", "delay");
        node.block.inputs.push(ValueNode::new(
            "pause",
            OutputNode::Expression(reporter),
            Some(NUMBER_SHADOW),
        ));
        let xml = serialize(&output_with(vec![node])).unwrap();

        let shadow = xml.find(r#"<shadow type="math_number">"#).unwrap();
        let block = xml.find(r#"<block type="variables_get">"#).unwrap();
        assert!(shadow < block);
        assert!(xml.contains(r#"<field name="NUM">0</field>"#));
    }

    #[test]
    fn test_statement_layout() {
        let mut node = StatementNode::new(StatementId(0), "controls_if");
        node.block.mutation_mut().set("elseif", "0");
        node.block.mutation_mut().set("else", "0");
        node.block.fields.push(FieldNode::new("NAME", "a<b"));
        node.handler("DO0", Some(StatementNode::new(StatementId(1), "break_keyword")));
        node.data = Some("ws_1".to_string());
        let mut output = output_with(vec![node]);
        output.statement_comments.insert(StatementId(0), "check".to_string());
        let xml = serialize(&output).unwrap();

        let expected = r#"<xml xmlns="https://developers.google.com/blockly/xml">
  <block type="controls_if">
    <mutation elseif="0" else="0"/>
    <field name="NAME">a&lt;b</field>
    <statement name="DO0">
      <block type="break_keyword">
      </block>
    </statement>
    <comment pinned="false">check</comment>
    <data>ws_1</data>
  </block>
</xml>"#;
        let lines: Vec<&str> = xml.lines().map(str::trim).collect();
        let expected: Vec<&str> = expected.lines().map(str::trim).collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_variables_and_workspace_comments() {
        let mut output = output_with(Vec::new());
        output.variables.push(VariableEntry {
            name: "0Red".to_string(),
            type_name: Some("Color".to_string()),
        });
        output.workspace_comments.push(WorkspaceComment {
            id: "ws_1".to_string(),
            text: Some("note".to_string()),
        });
        let xml = serialize(&output).unwrap();

        let variables = xml.find("<variables>").unwrap();
        let comment = xml.find(r#"<comment h="120" w="160" data="ws_1">note</comment>"#).unwrap();
        assert!(variables < comment);
        assert!(xml.contains(r#"<variable type="Color">0Red</variable>"#));
    }
}
