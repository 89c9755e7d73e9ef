use std::{collections::HashMap, sync::Arc};

use crate::{
    config::DescriptorLimits,
    descriptor::{ArrayDescriptor, Descriptor, ObjectDescriptor, RuntimeValue},
    types::SymType,
};

/// Converts runtime values into descriptors.
///
/// Objects and arrays nested deeper than `max_depth` become [`Descriptor::Null`]; arrays keep
/// at most `max_array_length` elements. Within one conversion, every runtime object is
/// described once: repeated occurrences of the same id share the same descriptor.
#[derive(Debug, Clone, Default)]
pub struct DescriptorConverter {
    limits: DescriptorLimits,
}

impl DescriptorConverter {
    /// Creates a converter with the given caps.
    #[must_use]
    pub const fn new(limits: DescriptorLimits) -> Self {
        Self { limits }
    }

    /// The configured caps.
    #[must_use]
    pub const fn limits(&self) -> &DescriptorLimits {
        &self.limits
    }

    /// Describes `value`.
    #[must_use]
    pub fn convert(&self, value: &RuntimeValue) -> Descriptor {
        let mut memo = HashMap::new();
        self.convert_at(value, 0, &mut memo)
    }

    /// Describes `value` as a value of type `expected`.
    ///
    /// Boxed primitives are unwrapped when a primitive is expected, and primitives are
    /// coerced to the expected primitive type (the instrumentation reports `boolean`, `char`
    /// and the short integral types widened to `int`).
    #[must_use]
    pub fn convert_as(&self, value: &RuntimeValue, expected: &SymType) -> Descriptor {
        let descriptor = self.convert(value);
        if !expected.is_primitive() {
            return descriptor;
        }

        let primitive = match &descriptor {
            Descriptor::Object(_) => match descriptor.field("value") {
                Some(inner) => inner.clone(),
                None => return descriptor,
            },
            _ => descriptor,
        };
        coerce(primitive, expected)
    }

    fn convert_at(
        &self,
        value: &RuntimeValue,
        depth: usize,
        memo: &mut HashMap<u64, Descriptor>,
    ) -> Descriptor {
        match value {
            RuntimeValue::Null => Descriptor::Null,
            RuntimeValue::Bool(value) => Descriptor::Bool(*value),
            RuntimeValue::Byte(value) => Descriptor::Byte(*value),
            RuntimeValue::Char(value) => Descriptor::Char(*value),
            RuntimeValue::Short(value) => Descriptor::Short(*value),
            RuntimeValue::Int(value) => Descriptor::Int(*value),
            RuntimeValue::Long(value) => Descriptor::Long(*value),
            RuntimeValue::Float(value) => Descriptor::Float(*value),
            RuntimeValue::Double(value) => Descriptor::Double(*value),
            RuntimeValue::Str { value, .. } => Descriptor::String(value.clone()),
            RuntimeValue::Object(object) => {
                if let Some(known) = memo.get(&object.id) {
                    return known.clone();
                }
                if depth >= self.limits.max_depth {
                    return Descriptor::Null;
                }
                let fields = object
                    .fields
                    .iter()
                    .map(|(name, field)| (name.clone(), self.convert_at(field, depth + 1, memo)))
                    .collect();
                let descriptor = Descriptor::Object(Arc::new(ObjectDescriptor {
                    id: object.id,
                    class: object.class.clone(),
                    fields,
                }));
                memo.insert(object.id, descriptor.clone());
                descriptor
            }
            RuntimeValue::Array(array) => {
                if let Some(known) = memo.get(&array.id) {
                    return known.clone();
                }
                if depth >= self.limits.max_depth {
                    return Descriptor::Null;
                }
                let elements = array
                    .elements
                    .iter()
                    .take(self.limits.max_array_length)
                    .map(|element| self.convert_at(element, depth + 1, memo))
                    .collect();
                let descriptor = Descriptor::Array(Arc::new(ArrayDescriptor {
                    id: array.id,
                    element: array.element.clone(),
                    length: array.elements.len(),
                    elements,
                }));
                memo.insert(array.id, descriptor.clone());
                descriptor
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn coerce(descriptor: Descriptor, expected: &SymType) -> Descriptor {
    if descriptor.ty() == *expected {
        return descriptor;
    }

    let integral = descriptor.as_i64();
    let real = match &descriptor {
        Descriptor::Float(value) => Some(f64::from(*value)),
        Descriptor::Double(value) => Some(*value),
        _ => integral.map(|value| value as f64),
    };
    let (Some(real), integral) = (real, integral) else {
        return descriptor;
    };
    let integral = integral.unwrap_or(real as i64);

    match expected {
        SymType::Bool => Descriptor::Bool(integral != 0),
        SymType::Byte => Descriptor::Byte(integral as i8),
        SymType::Char => Descriptor::Char(integral as u16),
        SymType::Short => Descriptor::Short(integral as i16),
        SymType::Int => Descriptor::Int(integral as i32),
        SymType::Long => Descriptor::Long(integral),
        SymType::Float => Descriptor::Float(real as f32),
        SymType::Double => Descriptor::Double(real),
        _ => descriptor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter(depth: usize, length: usize) -> DescriptorConverter {
        DescriptorConverter::new(DescriptorLimits {
            max_depth: depth,
            max_array_length: length,
        })
    }

    #[test]
    fn test_unwraps_boxed_primitives() {
        let converter = DescriptorConverter::default();
        let zero = RuntimeValue::boxed(1, "java/lang/Integer", RuntimeValue::Int(0));
        assert_eq!(converter.convert_as(&zero, &SymType::Bool), Descriptor::Bool(false));

        let yes = RuntimeValue::boxed(2, "java/lang/Boolean", RuntimeValue::Bool(true));
        assert_eq!(converter.convert_as(&yes, &SymType::Int), Descriptor::Int(1));

        let long = RuntimeValue::boxed(3, "java/lang/Long", RuntimeValue::Long(7));
        assert_eq!(converter.convert_as(&long, &SymType::Long), Descriptor::Long(7));
        assert!(matches!(
            converter.convert_as(&long, &SymType::object()),
            Descriptor::Object(_)
        ));
    }

    #[test]
    fn test_coerces_widened_primitives() {
        let converter = DescriptorConverter::default();
        assert_eq!(
            converter.convert_as(&RuntimeValue::Int(65), &SymType::Char),
            Descriptor::Char(65)
        );
        assert_eq!(
            converter.convert_as(&RuntimeValue::Int(1), &SymType::Bool),
            Descriptor::Bool(true)
        );
        assert_eq!(
            converter.convert_as(&RuntimeValue::Int(3), &SymType::Double),
            Descriptor::Double(3.0)
        );
        assert_eq!(
            converter.convert_as(&RuntimeValue::Null, &SymType::Int),
            Descriptor::Null
        );
    }

    #[test]
    fn test_depth_cap() {
        let inner = RuntimeValue::object(2, "app/Node", vec![]);
        let outer = RuntimeValue::object(1, "app/Node", vec![("next".into(), inner)]);

        let shallow = converter(1, 10).convert(&outer);
        assert_eq!(shallow.field("next"), Some(&Descriptor::Null));

        let deep = converter(2, 10).convert(&outer);
        assert!(matches!(deep.field("next"), Some(Descriptor::Object(_))));
    }

    #[test]
    fn test_array_cap_keeps_length() {
        let elements = (0..5).map(RuntimeValue::Int).collect();
        let array = RuntimeValue::array(1, SymType::Int, elements);
        let Descriptor::Array(descriptor) = converter(4, 2).convert(&array) else {
            panic!("expected an array descriptor");
        };
        assert_eq!(descriptor.length, 5);
        assert_eq!(descriptor.elements, vec![Descriptor::Int(0), Descriptor::Int(1)]);
    }

    #[test]
    fn test_shared_objects_described_once() {
        let shared = RuntimeValue::object(7, "app/Leaf", vec![("x".into(), RuntimeValue::Int(1))]);
        let pair = RuntimeValue::object(
            1,
            "app/Pair",
            vec![("a".into(), shared.clone()), ("b".into(), shared)],
        );
        let descriptor = DescriptorConverter::default().convert(&pair);
        match (descriptor.field("a"), descriptor.field("b")) {
            (Some(Descriptor::Object(a)), Some(Descriptor::Object(b))) => {
                assert!(Arc::ptr_eq(a, b));
            }
            other => panic!("unexpected fields {other:?}"),
        }
    }
}
