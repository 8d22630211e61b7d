//! Built-in math calls that have blocks without symbol metadata.

/// Форма блока встроенной функции
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinForm {
    /// `math_op3`, один вход `x`
    Absolute,
    /// `math_op2` с полем `op` и входами `x`, `y`
    MinMax,
    /// `math_js_op` с мутацией `op-type="unary"` и входом `ARG0`
    JsUnary,
    /// `math_js_op` с мутацией `op-type="binary"` и входами `ARG0`, `ARG1`
    JsBinary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinBlock {
    pub block_id: &'static str,
    pub form: BuiltinForm,
    /// Значение поля операции (`min`, `sqrt`, ...)
    pub op: &'static str,
}

impl BuiltinBlock {
    pub fn arity(&self) -> usize {
        match self.form {
            BuiltinForm::Absolute | BuiltinForm::JsUnary => 1,
            BuiltinForm::MinMax | BuiltinForm::JsBinary => 2,
        }
    }

    /// Names of the value inputs, in argument order.
    pub fn input_names(&self) -> &'static [&'static str] {
        match self.form {
            BuiltinForm::Absolute => &["x"],
            BuiltinForm::MinMax => &["x", "y"],
            BuiltinForm::JsUnary => &["ARG0"],
            BuiltinForm::JsBinary => &["ARG0", "ARG1"],
        }
    }
}

const fn block(block_id: &'static str, form: BuiltinForm, op: &'static str) -> BuiltinBlock {
    BuiltinBlock { block_id, form, op }
}

static BUILTINS: &[(&str, BuiltinBlock)] = &[
    ("Math.abs", block("math_op3", BuiltinForm::Absolute, "")),
    ("Math.min", block("math_op2", BuiltinForm::MinMax, "min")),
    ("Math.max", block("math_op2", BuiltinForm::MinMax, "max")),
    ("Math.sqrt", block("math_js_op", BuiltinForm::JsUnary, "sqrt")),
    ("Math.sin", block("math_js_op", BuiltinForm::JsUnary, "sin")),
    ("Math.cos", block("math_js_op", BuiltinForm::JsUnary, "cos")),
    ("Math.tan", block("math_js_op", BuiltinForm::JsUnary, "tan")),
    ("Math.atan2", block("math_js_op", BuiltinForm::JsBinary, "atan2")),
    ("Math.idiv", block("math_js_op", BuiltinForm::JsBinary, "idiv")),
    ("Math.imul", block("math_js_op", BuiltinForm::JsBinary, "imul")),
];

pub fn builtin(qualified_name: &str) -> Option<BuiltinBlock> {
    BUILTINS
        .iter()
        .find(|(name, _)| *name == qualified_name)
        .map(|(_, block)| *block)
}
