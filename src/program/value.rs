use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::types::{SymType, CLASS_CLASS};

/// A compile-time constant operand.
///
/// Floating point constants compare and hash by their bit pattern so constants can be used
/// as map keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Constant {
    /// `null`
    Null,
    /// `boolean` literal
    Bool(bool),
    /// `byte` literal
    Byte(i8),
    /// `char` literal, as a UTF-16 code unit
    Char(u16),
    /// `short` literal
    Short(i16),
    /// `int` literal
    Int(i32),
    /// `long` literal
    Long(i64),
    /// `float` literal
    Float(f32),
    /// `double` literal
    Double(f64),
    /// String literal
    String(String),
    /// Class literal (`Foo.class`)
    Class(SymType),
}

impl Constant {
    /// Type of the constant.
    #[must_use]
    pub fn ty(&self) -> SymType {
        match self {
            Constant::Null => SymType::Null,
            Constant::Bool(_) => SymType::Bool,
            Constant::Byte(_) => SymType::Byte,
            Constant::Char(_) => SymType::Char,
            Constant::Short(_) => SymType::Short,
            Constant::Int(_) => SymType::Int,
            Constant::Long(_) => SymType::Long,
            Constant::Float(_) => SymType::Float,
            Constant::Double(_) => SymType::Double,
            Constant::String(_) => SymType::string(),
            Constant::Class(_) => SymType::class(CLASS_CLASS),
        }
    }

    /// Parses the literal spellings used in value names.
    ///
    /// | Text                      | Constant              |
    /// |---------------------------|-----------------------|
    /// | `null`                    | [`Constant::Null`]    |
    /// | `true`, `false`           | [`Constant::Bool`]    |
    /// | `42`, `-1`                | [`Constant::Int`]     |
    /// | `42L`                     | [`Constant::Long`]    |
    /// | `1.5f`, `1.5F`            | [`Constant::Float`]   |
    /// | `1.5`, `1e3`              | [`Constant::Double`]  |
    /// | `"text"`                  | [`Constant::String`]  |
    /// | `java/lang/String.class`  | [`Constant::Class`]   |
    ///
    /// # Returns
    ///
    /// `None` if `text` is not a literal.
    #[must_use]
    pub fn parse(text: &str) -> Option<Constant> {
        match text {
            "null" => return Some(Constant::Null),
            "true" => return Some(Constant::Bool(true)),
            "false" => return Some(Constant::Bool(false)),
            _ => {}
        }

        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Some(Constant::String(text[1..text.len() - 1].to_string()));
        }
        if let Some(class) = text.strip_suffix(".class") {
            return SymType::parse(class).ok().map(Constant::Class);
        }

        let first = text.chars().next()?;
        if !(first.is_ascii_digit() || first == '-') {
            return None;
        }
        if let Some(long) = text.strip_suffix('L') {
            return long.parse().ok().map(Constant::Long);
        }
        if let Some(float) = text.strip_suffix(['f', 'F']) {
            return float.parse().ok().map(Constant::Float);
        }
        if let Ok(int) = text.parse::<i32>() {
            return Some(Constant::Int(int));
        }
        text.parse::<f64>().ok().map(Constant::Double)
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Null, Constant::Null) => true,
            (Constant::Bool(a), Constant::Bool(b)) => a == b,
            (Constant::Byte(a), Constant::Byte(b)) => a == b,
            (Constant::Char(a), Constant::Char(b)) => a == b,
            (Constant::Short(a), Constant::Short(b)) => a == b,
            (Constant::Int(a), Constant::Int(b)) => a == b,
            (Constant::Long(a), Constant::Long(b)) => a == b,
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            (Constant::Double(a), Constant::Double(b)) => a.to_bits() == b.to_bits(),
            (Constant::String(a), Constant::String(b)) => a == b,
            (Constant::Class(a), Constant::Class(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::Null => {}
            Constant::Bool(value) => value.hash(state),
            Constant::Byte(value) => value.hash(state),
            Constant::Char(value) => value.hash(state),
            Constant::Short(value) => value.hash(state),
            Constant::Int(value) => value.hash(state),
            Constant::Long(value) => value.hash(state),
            Constant::Float(value) => value.to_bits().hash(state),
            Constant::Double(value) => value.to_bits().hash(state),
            Constant::String(value) => value.hash(state),
            Constant::Class(value) => value.hash(state),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "null"),
            Constant::Bool(value) => write!(f, "{value}"),
            Constant::Byte(value) => write!(f, "{value}"),
            Constant::Char(value) => match char::from_u32(u32::from(*value)) {
                Some(c) => write!(f, "'{}'", c.escape_default()),
                None => write!(f, "'\\u{{{value:04x}}}'"),
            },
            Constant::Short(value) => write!(f, "{value}"),
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Long(value) => write!(f, "{value}L"),
            Constant::Float(value) => write!(f, "{value:?}f"),
            Constant::Double(value) => write!(f, "{value:?}"),
            Constant::String(value) => write!(f, "\"{}\"", value.escape_default()),
            Constant::Class(value) => write!(f, "{value}.class"),
        }
    }
}

/// A source-level value of a method: the receiver, an argument, a constant or the result of
/// an instruction.
///
/// Values are the keys of a frame's value map. They are resolved from the string names the
/// instrumentation reports and never appear inside terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// The receiver of an instance method
    This(SymType),
    /// Formal argument by position
    Argument {
        /// Zero based position, excluding the receiver
        index: usize,
        /// Declared type
        ty: SymType,
    },
    /// Literal operand
    Constant(Constant),
    /// Result of an instruction
    Local {
        /// Instruction name
        name: String,
        /// Result type
        ty: SymType,
    },
}

impl Value {
    /// Type of the value.
    #[must_use]
    pub fn ty(&self) -> SymType {
        match self {
            Value::This(ty) | Value::Argument { ty, .. } | Value::Local { ty, .. } => ty.clone(),
            Value::Constant(constant) => constant.ty(),
        }
    }

    /// Returns `true` for the receiver.
    #[must_use]
    pub const fn is_this(&self) -> bool {
        matches!(self, Value::This(_))
    }

    /// Returns `true` for literal operands.
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::This(_) => write!(f, "this"),
            Value::Argument { index, .. } => write!(f, "arg${index}"),
            Value::Constant(constant) => write!(f, "{constant}"),
            Value::Local { name, .. } => write!(f, "{name}"),
        }
    }
}

/// Source position of an instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Source file, if known
    pub file: Option<String>,
    /// Line number, `0` when unknown
    pub line: u32,
}

impl Location {
    /// Location with a line number only.
    #[must_use]
    pub const fn line(line: u32) -> Self {
        Self { file: None, line }
    }

    /// Returns `true` if neither file nor line are known.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.file.is_none() && self.line == 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (None, 0) => write!(f, "unknown"),
            (None, line) => write!(f, "line {line}"),
            (Some(file), line) => write!(f, "{file}:{line}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals() {
        assert_eq!(Constant::parse("null"), Some(Constant::Null));
        assert_eq!(Constant::parse("true"), Some(Constant::Bool(true)));
        assert_eq!(Constant::parse("-7"), Some(Constant::Int(-7)));
        assert_eq!(Constant::parse("7L"), Some(Constant::Long(7)));
        assert_eq!(Constant::parse("1.5f"), Some(Constant::Float(1.5)));
        assert_eq!(Constant::parse("2.25"), Some(Constant::Double(2.25)));
        assert_eq!(
            Constant::parse("\"hi\""),
            Some(Constant::String("hi".to_string()))
        );
        assert_eq!(
            Constant::parse("java/lang/String.class"),
            Some(Constant::Class(SymType::string()))
        );
        assert_eq!(Constant::parse("%3"), None);
        assert_eq!(Constant::parse("arg$0"), None);
    }

    #[test]
    fn test_constant_display_parses_back() {
        for constant in [
            Constant::Int(3),
            Constant::Long(-4),
            Constant::Float(0.5),
            Constant::Double(2.0),
            Constant::Bool(false),
        ] {
            assert_eq!(Constant::parse(&constant.to_string()), Some(constant));
        }
    }

    #[test]
    fn test_float_constants_hash_by_bits() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(Constant::Double(f64::NAN));
        assert!(set.contains(&Constant::Double(f64::NAN)));
        assert_ne!(Constant::Double(0.0), Constant::Double(-0.0));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::This(SymType::object()).to_string(), "this");
        assert_eq!(
            Value::Argument {
                index: 2,
                ty: SymType::Int
            }
            .to_string(),
            "arg$2"
        );
        assert_eq!(Location::line(12).to_string(), "line 12");
    }
}
