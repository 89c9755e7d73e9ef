use std::{cmp::Ordering, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    program::CmpOp,
    types::{SymType, STRING_CLASS},
    Error, Result,
};

/// A concrete value observed by the instrumentation.
///
/// Strings, objects and arrays carry an identity (`id`), the address-like handle the
/// instrumentation assigned to them. Two references to the same runtime object carry the
/// same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeValue {
    /// `null`
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
    /// `java.lang.String` instance
    Str {
        /// Identity of the string object
        id: u64,
        /// Contents
        value: String,
    },
    /// Any other object
    Object(Arc<RuntimeObject>),
    /// Array of any element type
    Array(Arc<RuntimeArray>),
}

/// A concrete object with its field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeObject {
    /// Identity of the object
    pub id: u64,
    /// Runtime class, internal name
    pub class: String,
    /// Field name and value pairs
    pub fields: Vec<(String, RuntimeValue)>,
}

/// A concrete array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeArray {
    /// Identity of the array
    pub id: u64,
    /// Element type
    pub element: SymType,
    /// Elements in index order
    pub elements: Vec<RuntimeValue>,
}

impl RuntimeValue {
    /// Creates an object value.
    #[must_use]
    pub fn object(id: u64, class: impl Into<String>, fields: Vec<(String, RuntimeValue)>) -> Self {
        RuntimeValue::Object(Arc::new(RuntimeObject {
            id,
            class: class.into().replace('.', "/"),
            fields,
        }))
    }

    /// Creates an array value.
    #[must_use]
    pub fn array(id: u64, element: SymType, elements: Vec<RuntimeValue>) -> Self {
        RuntimeValue::Array(Arc::new(RuntimeArray {
            id,
            element,
            elements,
        }))
    }

    /// Creates a string value.
    #[must_use]
    pub fn string(id: u64, value: impl Into<String>) -> Self {
        RuntimeValue::Str {
            id,
            value: value.into(),
        }
    }

    /// Boxes a primitive into an instance of `class` holding it in its `value` field, as the
    /// instrumentation reports primitives passed through `Object` slots.
    #[must_use]
    pub fn boxed(id: u64, class: &str, value: RuntimeValue) -> Self {
        RuntimeValue::object(id, class, vec![("value".to_string(), value)])
    }

    /// Returns `true` for `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, RuntimeValue::Null)
    }

    /// The runtime type, `None` for `null`.
    #[must_use]
    pub fn runtime_type(&self) -> Option<SymType> {
        Some(match self {
            RuntimeValue::Null => return None,
            RuntimeValue::Bool(_) => SymType::Bool,
            RuntimeValue::Byte(_) => SymType::Byte,
            RuntimeValue::Char(_) => SymType::Char,
            RuntimeValue::Short(_) => SymType::Short,
            RuntimeValue::Int(_) => SymType::Int,
            RuntimeValue::Long(_) => SymType::Long,
            RuntimeValue::Float(_) => SymType::Float,
            RuntimeValue::Double(_) => SymType::Double,
            RuntimeValue::Str { .. } => SymType::class(STRING_CLASS),
            RuntimeValue::Object(object) => SymType::class(object.class.as_str()),
            RuntimeValue::Array(array) => SymType::array(array.element.clone()),
        })
    }

    /// Integral value widened to `i64`; booleans map to `0`/`1`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RuntimeValue::Bool(value) => Some(i64::from(*value)),
            RuntimeValue::Byte(value) => Some(i64::from(*value)),
            RuntimeValue::Char(value) => Some(i64::from(*value)),
            RuntimeValue::Short(value) => Some(i64::from(*value)),
            RuntimeValue::Int(value) => Some(i64::from(*value)),
            RuntimeValue::Long(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric value as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RuntimeValue::Float(value) => Some(f64::from(*value)),
            RuntimeValue::Double(value) => Some(*value),
            other => other.as_i64().map(|value| value as f64),
        }
    }

    /// Length of an array value.
    #[must_use]
    pub fn array_length(&self) -> Option<usize> {
        match self {
            RuntimeValue::Array(array) => Some(array.elements.len()),
            _ => None,
        }
    }

    /// Value of the field `name` of an object.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&RuntimeValue> {
        match self {
            RuntimeValue::Object(object) => object
                .fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Evaluates `self op other` on concrete values.
    ///
    /// Three-way comparisons produce an `int` (`-1`, `0`, `1`); `Cmpg` and `Cmpl` decide
    /// NaN operands as `1` and `-1`. Every other operator produces a `boolean`. References,
    /// strings included, compare by identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeError`] for operands that cannot be compared with `op`.
    pub fn compare(&self, op: CmpOp, other: &RuntimeValue) -> Result<RuntimeValue> {
        if let (Some(lhv), Some(rhv)) = (self.as_i64(), other.as_i64()) {
            return Ok(Self::decide(op, Some(lhv.cmp(&rhv))));
        }
        if let (Some(lhv), Some(rhv)) = (self.as_f64(), other.as_f64()) {
            return Ok(Self::decide(op, lhv.partial_cmp(&rhv)));
        }

        let same = match (self, other) {
            (RuntimeValue::Null, RuntimeValue::Null) => true,
            (RuntimeValue::Str { id: lhv, .. }, RuntimeValue::Str { id: rhv, .. }) => lhv == rhv,
            (RuntimeValue::Object(lhv), RuntimeValue::Object(rhv)) => lhv.id == rhv.id,
            (RuntimeValue::Array(lhv), RuntimeValue::Array(rhv)) => lhv.id == rhv.id,
            (lhv, rhv) if lhv.is_reference() && rhv.is_reference() => false,
            _ => {
                return Err(Error::TypeError(format!(
                    "Cannot compare {self:?} with {other:?}"
                )))
            }
        };
        match op {
            CmpOp::Eq => Ok(RuntimeValue::Bool(same)),
            CmpOp::Neq => Ok(RuntimeValue::Bool(!same)),
            _ => Err(Error::TypeError(format!(
                "References only compare with == and !=, found {op}"
            ))),
        }
    }

    fn is_reference(&self) -> bool {
        matches!(
            self,
            RuntimeValue::Null
                | RuntimeValue::Str { .. }
                | RuntimeValue::Object(_)
                | RuntimeValue::Array(_)
        )
    }

    fn decide(op: CmpOp, ordering: Option<Ordering>) -> RuntimeValue {
        match op {
            CmpOp::Eq => RuntimeValue::Bool(ordering == Some(Ordering::Equal)),
            CmpOp::Neq => RuntimeValue::Bool(ordering != Some(Ordering::Equal)),
            CmpOp::Lt => RuntimeValue::Bool(ordering == Some(Ordering::Less)),
            CmpOp::Gt => RuntimeValue::Bool(ordering == Some(Ordering::Greater)),
            CmpOp::Le => RuntimeValue::Bool(matches!(
                ordering,
                Some(Ordering::Less | Ordering::Equal)
            )),
            CmpOp::Ge => RuntimeValue::Bool(matches!(
                ordering,
                Some(Ordering::Greater | Ordering::Equal)
            )),
            CmpOp::Cmp | CmpOp::Cmpg | CmpOp::Cmpl => RuntimeValue::Int(match ordering {
                Some(Ordering::Less) => -1,
                Some(Ordering::Equal) => 0,
                Some(Ordering::Greater) => 1,
                None if op == CmpOp::Cmpl => -1,
                None => 1,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_numbers() {
        let five = RuntimeValue::Int(5);
        assert_eq!(
            five.compare(CmpOp::Gt, &RuntimeValue::Int(0)).unwrap(),
            RuntimeValue::Bool(true)
        );
        assert_eq!(
            RuntimeValue::Long(3).compare(CmpOp::Cmp, &RuntimeValue::Long(7)).unwrap(),
            RuntimeValue::Int(-1)
        );
        assert_eq!(
            RuntimeValue::Double(f64::NAN)
                .compare(CmpOp::Cmpl, &RuntimeValue::Double(1.0))
                .unwrap(),
            RuntimeValue::Int(-1)
        );
        assert_eq!(
            RuntimeValue::Int(2).compare(CmpOp::Le, &RuntimeValue::Double(2.0)).unwrap(),
            RuntimeValue::Bool(true)
        );
    }

    #[test]
    fn test_compare_references() {
        let a = RuntimeValue::object(1, "app/A", vec![]);
        let b = RuntimeValue::object(2, "app/A", vec![]);
        assert_eq!(a.compare(CmpOp::Eq, &a).unwrap(), RuntimeValue::Bool(true));
        assert_eq!(a.compare(CmpOp::Eq, &b).unwrap(), RuntimeValue::Bool(false));
        assert_eq!(
            a.compare(CmpOp::Neq, &RuntimeValue::Null).unwrap(),
            RuntimeValue::Bool(true)
        );
        assert!(a.compare(CmpOp::Lt, &b).is_err());
        assert!(a.compare(CmpOp::Eq, &RuntimeValue::Int(1)).is_err());
    }

    #[test]
    fn test_strings_compare_by_identity() {
        let abc = RuntimeValue::string(1, "abc");
        let copy = RuntimeValue::string(2, "abc");
        assert_eq!(abc.compare(CmpOp::Eq, &copy).unwrap(), RuntimeValue::Bool(false));
        assert_eq!(abc.compare(CmpOp::Neq, &copy).unwrap(), RuntimeValue::Bool(true));
        assert_eq!(
            abc.compare(CmpOp::Eq, &RuntimeValue::string(1, "abc")).unwrap(),
            RuntimeValue::Bool(true)
        );
        assert_eq!(
            abc.compare(CmpOp::Eq, &RuntimeValue::object(2, "app/A", vec![])).unwrap(),
            RuntimeValue::Bool(false)
        );
    }

    #[test]
    fn test_runtime_types() {
        assert_eq!(RuntimeValue::Null.runtime_type(), None);
        assert_eq!(
            RuntimeValue::string(3, "s").runtime_type(),
            Some(SymType::string())
        );
        let array = RuntimeValue::array(4, SymType::Int, vec![RuntimeValue::Int(1)]);
        assert_eq!(array.runtime_type(), Some(SymType::array(SymType::Int)));
        assert_eq!(array.array_length(), Some(1));
        let boxed = RuntimeValue::boxed(9, "java.lang.Integer", RuntimeValue::Int(3));
        assert_eq!(boxed.runtime_type(), Some(SymType::class("java/lang/Integer")));
        assert_eq!(boxed.field("value"), Some(&RuntimeValue::Int(3)));
    }
}
