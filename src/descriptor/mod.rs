//! Concrete values and their symbolic descriptors.
//!
//! The instrumentation delivers every observed operand as a [`RuntimeValue`]. The translator
//! stores, for every term it touches, the [`Descriptor`] of the value the term had at runtime.
//! Descriptors are the symbolic-constant form of runtime values: they are detached from the
//! running program and bounded in size, so cyclic or huge object graphs cannot blow up the
//! concrete value map.
//!
//! # Architecture
//!
//! - [`RuntimeValue`] - Concrete values as reported by the instrumentation
//! - [`Descriptor`] - Bounded, serializable snapshot of a runtime value
//! - [`DescriptorConverter`] - Conversion with depth and array length caps, preserving
//!   object identity within one conversion
//!
//! # Examples
//!
//! ```rust,ignore
//! use symtrace::config::DescriptorLimits;
//! use symtrace::descriptor::{Descriptor, DescriptorConverter, RuntimeValue};
//! use symtrace::types::SymType;
//!
//! let converter = DescriptorConverter::new(DescriptorLimits::default());
//! let boxed = RuntimeValue::boxed(1, "java/lang/Integer", RuntimeValue::Int(0));
//! assert_eq!(converter.convert_as(&boxed, &SymType::Bool), Descriptor::Bool(false));
//! ```

mod converter;
mod runtime;

pub use converter::DescriptorConverter;
pub use runtime::{RuntimeArray, RuntimeObject, RuntimeValue};

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::types::{SymType, CLASS_CLASS, STRING_CLASS};

/// Symbolic constant representation of a runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Descriptor {
    /// `null`, also the stand-in for values cut off by the depth cap
    Null,
    /// `boolean`
    Bool(bool),
    /// `byte`
    Byte(i8),
    /// `char`
    Char(u16),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// String instance
    String(String),
    /// Class literal
    Class(SymType),
    /// Object with its (depth-capped) fields
    Object(Arc<ObjectDescriptor>),
    /// Array with its (length-capped) elements
    Array(Arc<ArrayDescriptor>),
}

/// Descriptor of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// Identity of the described object
    pub id: u64,
    /// Runtime class, internal name
    pub class: String,
    /// Field name and descriptor pairs
    pub fields: Vec<(String, Descriptor)>,
}

/// Descriptor of an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    /// Identity of the described array
    pub id: u64,
    /// Element type
    pub element: SymType,
    /// Length of the runtime array
    pub length: usize,
    /// Descriptors of the first elements, at most the configured cap
    pub elements: Vec<Descriptor>,
}

impl Descriptor {
    /// Type of the described value.
    #[must_use]
    pub fn ty(&self) -> SymType {
        match self {
            Descriptor::Null => SymType::Null,
            Descriptor::Bool(_) => SymType::Bool,
            Descriptor::Byte(_) => SymType::Byte,
            Descriptor::Char(_) => SymType::Char,
            Descriptor::Short(_) => SymType::Short,
            Descriptor::Int(_) => SymType::Int,
            Descriptor::Long(_) => SymType::Long,
            Descriptor::Float(_) => SymType::Float,
            Descriptor::Double(_) => SymType::Double,
            Descriptor::String(_) => SymType::class(STRING_CLASS),
            Descriptor::Class(_) => SymType::class(CLASS_CLASS),
            Descriptor::Object(object) => SymType::class(object.class.as_str()),
            Descriptor::Array(array) => SymType::array(array.element.clone()),
        }
    }

    /// Returns `true` for `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Descriptor::Null)
    }

    /// Value of a boolean descriptor.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Descriptor::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Integral value widened to `i64`; booleans map to `0`/`1`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Descriptor::Bool(value) => Some(i64::from(*value)),
            Descriptor::Byte(value) => Some(i64::from(*value)),
            Descriptor::Char(value) => Some(i64::from(*value)),
            Descriptor::Short(value) => Some(i64::from(*value)),
            Descriptor::Int(value) => Some(i64::from(*value)),
            Descriptor::Long(value) => Some(*value),
            _ => None,
        }
    }

    /// Descriptor of the field `name` of an object descriptor.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Descriptor> {
        match self {
            Descriptor::Object(object) => object
                .fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Null => write!(f, "null"),
            Descriptor::Bool(value) => write!(f, "{value}"),
            Descriptor::Byte(value) => write!(f, "{value}b"),
            Descriptor::Char(value) => write!(f, "'\\u{value:04x}'"),
            Descriptor::Short(value) => write!(f, "{value}s"),
            Descriptor::Int(value) => write!(f, "{value}"),
            Descriptor::Long(value) => write!(f, "{value}L"),
            Descriptor::Float(value) => write!(f, "{value:?}f"),
            Descriptor::Double(value) => write!(f, "{value:?}"),
            Descriptor::String(value) => write!(f, "\"{}\"", value.escape_default()),
            Descriptor::Class(ty) => write!(f, "{ty}.class"),
            Descriptor::Object(object) => write!(f, "{}#{}", object.class, object.id),
            Descriptor::Array(array) => {
                write!(f, "{}[{}]#{}", array.element, array.length, array.id)
            }
        }
    }
}
