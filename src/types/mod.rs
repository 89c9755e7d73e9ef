//! JVM-style type model.
//!
//! [`SymType`] is the type tag carried by every [`crate::term::Term`] and every
//! [`crate::program::Value`]. It mirrors the JVM type system closely enough for the
//! translator: primitives, class types, arrays, the null type and typed references (the
//! result of indexing an array or selecting a field, which must be loaded or stored).
//!
//! # Key Components
//!
//! - [`SymType`] - The type tag itself, with descriptor parsing and pretty printing
//! - [`merge_types`] - Result type inference for binary operations
//! - [`ClassHierarchy`] - Explicit class registry answering subtype queries
//!
//! # Examples
//!
//! ```rust,ignore
//! use symtrace::types::SymType;
//!
//! let ty = SymType::from_descriptor("[Ljava/lang/String;")?;
//! assert_eq!(ty, SymType::array(SymType::string()));
//! assert_eq!(ty.to_string(), "java/lang/String[]");
//! ```

mod hierarchy;

pub use hierarchy::{ClassDecl, ClassFlags, ClassHierarchy, FieldDecl};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Internal name of `java.lang.Object`.
pub const OBJECT_CLASS: &str = "java/lang/Object";
/// Internal name of `java.lang.String`.
pub const STRING_CLASS: &str = "java/lang/String";
/// Internal name of `java.lang.Class`.
pub const CLASS_CLASS: &str = "java/lang/Class";
/// Internal name of `java.lang.Throwable`.
pub const THROWABLE_CLASS: &str = "java/lang/Throwable";

/// Type of a symbolic term or program value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymType {
    /// `void`, only valid as a method return type
    Void,
    /// `boolean`
    Bool,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// Type of the `null` constant, a subtype of every reference type
    Null,
    /// Class or interface type, by internal name (`java/lang/String`)
    Class(String),
    /// Array with the given element type
    Array(Box<SymType>),
    /// Reference to a storage location (array element or field) of the given type
    Reference(Box<SymType>),
}

impl SymType {
    /// Creates a class type from an internal or dotted class name.
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        SymType::Class(name.into().replace('.', "/"))
    }

    /// Creates an array type with the given element type.
    #[must_use]
    pub fn array(element: SymType) -> Self {
        SymType::Array(Box::new(element))
    }

    /// Creates a reference to a storage location holding `referenced`.
    #[must_use]
    pub fn reference(referenced: SymType) -> Self {
        SymType::Reference(Box::new(referenced))
    }

    /// `java/lang/Object`
    #[must_use]
    pub fn object() -> Self {
        SymType::Class(OBJECT_CLASS.to_string())
    }

    /// `java/lang/String`
    #[must_use]
    pub fn string() -> Self {
        SymType::Class(STRING_CLASS.to_string())
    }

    /// Returns `true` for `byte`, `char`, `short`, `int` and `long`.
    #[must_use]
    pub const fn is_integral(&self) -> bool {
        matches!(
            self,
            SymType::Byte | SymType::Char | SymType::Short | SymType::Int | SymType::Long
        )
    }

    /// Returns `true` for `float` and `double`.
    #[must_use]
    pub const fn is_real(&self) -> bool {
        matches!(self, SymType::Float | SymType::Double)
    }

    /// Returns `true` for integral and floating point types.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_real()
    }

    /// Returns `true` for every primitive value type including `boolean`.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        self.is_numeric() || matches!(self, SymType::Bool)
    }

    /// Returns `true` for class, array, reference and null types.
    #[must_use]
    pub const fn is_pointer(&self) -> bool {
        matches!(
            self,
            SymType::Class(_) | SymType::Array(_) | SymType::Reference(_) | SymType::Null
        )
    }

    /// Returns `true` if this is `java/lang/String`.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, SymType::Class(name) if name == STRING_CLASS)
    }

    /// Width of a primitive type in bits, `None` for non-primitives.
    #[must_use]
    pub const fn bit_size(&self) -> Option<u32> {
        match self {
            SymType::Bool => Some(1),
            SymType::Byte => Some(8),
            SymType::Char | SymType::Short => Some(16),
            SymType::Int | SymType::Float => Some(32),
            SymType::Long | SymType::Double => Some(64),
            _ => None,
        }
    }

    /// Element type of an array type.
    #[must_use]
    pub fn element(&self) -> Option<&SymType> {
        match self {
            SymType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Type stored behind a reference type.
    #[must_use]
    pub fn referenced(&self) -> Option<&SymType> {
        match self {
            SymType::Reference(referenced) => Some(referenced),
            _ => None,
        }
    }

    /// Internal class name of a class type.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            SymType::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Parses a JVM field descriptor (`I`, `Ljava/lang/String;`, `[[J`).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `descriptor` is not a complete, valid descriptor.
    pub fn from_descriptor(descriptor: &str) -> Result<SymType> {
        let (ty, rest) = Self::parse_descriptor_prefix(descriptor)?;
        if !rest.is_empty() {
            return Err(malformed_error!(
                "Trailing characters `{}` in descriptor `{}`",
                rest,
                descriptor
            ));
        }
        Ok(ty)
    }

    fn parse_descriptor_prefix(descriptor: &str) -> Result<(SymType, &str)> {
        let mut chars = descriptor.chars();
        let Some(first) = chars.next() else {
            return Err(malformed_error!("Empty type descriptor"));
        };
        let rest = chars.as_str();
        let ty = match first {
            'V' => SymType::Void,
            'Z' => SymType::Bool,
            'B' => SymType::Byte,
            'C' => SymType::Char,
            'S' => SymType::Short,
            'I' => SymType::Int,
            'J' => SymType::Long,
            'F' => SymType::Float,
            'D' => SymType::Double,
            '[' => {
                let (element, rest) = Self::parse_descriptor_prefix(rest)?;
                return Ok((SymType::array(element), rest));
            }
            'L' => {
                let Some(end) = rest.find(';') else {
                    return Err(malformed_error!("Unterminated class descriptor `{}`", descriptor));
                };
                if end == 0 {
                    return Err(malformed_error!("Empty class name in `{}`", descriptor));
                }
                return Ok((SymType::class(&rest[..end]), &rest[end + 1..]));
            }
            other => {
                return Err(malformed_error!(
                    "Unknown descriptor character `{}` in `{}`",
                    other,
                    descriptor
                ))
            }
        };
        Ok((ty, rest))
    }

    /// Parses a type written either as a JVM descriptor or as a source-level name.
    ///
    /// Accepted forms are descriptors (`I`, `[J`, `Ljava/lang/Object;`), primitive keywords
    /// (`int`, `boolean`), class names in internal or dotted form (`java/lang/String`,
    /// `java.lang.String`) and any of these followed by `[]` suffixes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for empty or syntactically invalid input.
    pub fn parse(text: &str) -> Result<SymType> {
        let text = text.trim();
        if text.is_empty() {
            return Err(malformed_error!("Empty type name"));
        }
        if let Some(element) = text.strip_suffix("[]") {
            return Ok(SymType::array(SymType::parse(element)?));
        }
        let keyword = match text {
            "void" => Some(SymType::Void),
            "boolean" | "bool" => Some(SymType::Bool),
            "byte" => Some(SymType::Byte),
            "char" => Some(SymType::Char),
            "short" => Some(SymType::Short),
            "int" => Some(SymType::Int),
            "long" => Some(SymType::Long),
            "float" => Some(SymType::Float),
            "double" => Some(SymType::Double),
            "null" => Some(SymType::Null),
            _ => None,
        };
        if let Some(ty) = keyword {
            return Ok(ty);
        }
        if text.starts_with('[') || (text.starts_with('L') && text.ends_with(';')) || text.len() == 1 {
            return SymType::from_descriptor(text);
        }
        if text.contains(|c: char| c.is_whitespace() || c == ';' || c == '[') {
            return Err(malformed_error!("Invalid type name `{}`", text));
        }
        Ok(SymType::class(text))
    }

    /// Renders the JVM descriptor of this type.
    ///
    /// References and the null type have no descriptor of their own; a reference renders as
    /// its referenced type and null renders as `java/lang/Object`.
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            SymType::Void => "V".to_string(),
            SymType::Bool => "Z".to_string(),
            SymType::Byte => "B".to_string(),
            SymType::Char => "C".to_string(),
            SymType::Short => "S".to_string(),
            SymType::Int => "I".to_string(),
            SymType::Long => "J".to_string(),
            SymType::Float => "F".to_string(),
            SymType::Double => "D".to_string(),
            SymType::Null => format!("L{OBJECT_CLASS};"),
            SymType::Class(name) => format!("L{name};"),
            SymType::Array(element) => format!("[{}", element.descriptor()),
            SymType::Reference(referenced) => referenced.descriptor(),
        }
    }
}

impl fmt::Display for SymType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymType::Void => write!(f, "void"),
            SymType::Bool => write!(f, "boolean"),
            SymType::Byte => write!(f, "byte"),
            SymType::Char => write!(f, "char"),
            SymType::Short => write!(f, "short"),
            SymType::Int => write!(f, "int"),
            SymType::Long => write!(f, "long"),
            SymType::Float => write!(f, "float"),
            SymType::Double => write!(f, "double"),
            SymType::Null => write!(f, "null"),
            SymType::Class(name) => write!(f, "{name}"),
            SymType::Array(element) => write!(f, "{element}[]"),
            SymType::Reference(referenced) => write!(f, "&{referenced}"),
        }
    }
}

/// Infers the common type of a set of operand types.
///
/// Null types are ignored. A single distinct type is returned as is. Reference types merge
/// into their most general member, or the closest common superclass known to `hierarchy`.
/// Primitive types follow binary numeric promotion: `double` wins over `float`, `float` over
/// `long`, and integral types merge to the widest one. `char` mixed with `byte` or `short`
/// promotes to `int`.
///
/// # Arguments
///
/// * `hierarchy` - Class registry used to find common superclasses
/// * `types` - Operand types to merge
///
/// # Errors
///
/// Returns [`crate::Error::TypeError`] when reference and primitive types are mixed or when a
/// type has no value representation (`void`, references).
pub fn merge_types(hierarchy: &ClassHierarchy, types: &[SymType]) -> Result<SymType> {
    let mut unique: Vec<&SymType> = Vec::new();
    for ty in types.iter().filter(|ty| **ty != SymType::Null) {
        if !unique.contains(&ty) {
            unique.push(ty);
        }
    }

    match unique.as_slice() {
        [] => return Ok(SymType::Null),
        [single] => return Ok((*single).clone()),
        _ => {}
    }

    if unique.iter().any(|ty| matches!(ty, SymType::Void | SymType::Reference(_))) {
        return Err(crate::Error::TypeError(format!(
            "Cannot merge non-value types {unique:?}"
        )));
    }

    if unique.iter().all(|ty| ty.is_pointer()) {
        if let Some(general) = unique
            .iter()
            .find(|candidate| unique.iter().all(|ty| hierarchy.is_subtype_of(ty, candidate)))
        {
            return Ok((*general).clone());
        }

        let mut common = unique[0].clone();
        for ty in &unique[1..] {
            common = hierarchy.common_supertype(&common, ty);
        }
        return Ok(common);
    }

    if unique.iter().all(|ty| ty.is_primitive()) {
        if unique.contains(&&SymType::Double) {
            return Ok(SymType::Double);
        }
        if unique.contains(&&SymType::Float) {
            return Ok(SymType::Float);
        }
        if unique.contains(&&SymType::Long) {
            return Ok(SymType::Long);
        }
        // Unsigned char and the signed narrow types share no 16 bit type.
        if unique.contains(&&SymType::Char)
            && unique.iter().any(|ty| matches!(ty, SymType::Byte | SymType::Short))
        {
            return Ok(SymType::Int);
        }
        return unique
            .iter()
            .max_by_key(|ty| ty.bit_size().unwrap_or(0))
            .map(|ty| (*ty).clone())
            .ok_or_else(|| crate::Error::TypeError("Nothing to merge".to_string()));
    }

    Err(crate::Error::TypeError(format!(
        "Cannot merge reference and primitive types {unique:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_parsing() {
        assert_eq!(SymType::from_descriptor("I").unwrap(), SymType::Int);
        assert_eq!(
            SymType::from_descriptor("[[J").unwrap(),
            SymType::array(SymType::array(SymType::Long))
        );
        assert_eq!(
            SymType::from_descriptor("Ljava/lang/String;").unwrap(),
            SymType::string()
        );
        assert!(SymType::from_descriptor("Ljava/lang/String").is_err());
        assert!(SymType::from_descriptor("II").is_err());
        assert!(SymType::from_descriptor("").is_err());
    }

    #[test]
    fn test_parse_source_names() {
        assert_eq!(SymType::parse("int").unwrap(), SymType::Int);
        assert_eq!(SymType::parse("java.lang.String").unwrap(), SymType::string());
        assert_eq!(
            SymType::parse("java/lang/Object[]").unwrap(),
            SymType::array(SymType::object())
        );
        assert_eq!(SymType::parse("[I").unwrap(), SymType::array(SymType::Int));
        assert!(SymType::parse("  ").is_err());
    }

    #[test]
    fn test_descriptor_rendering() {
        let ty = SymType::array(SymType::class("foo/Bar"));
        assert_eq!(ty.descriptor(), "[Lfoo/Bar;");
        assert_eq!(SymType::from_descriptor(&ty.descriptor()).unwrap(), ty);
        assert_eq!(ty.to_string(), "foo/Bar[]");
        assert_eq!(SymType::reference(SymType::Int).to_string(), "&int");
    }

    #[test]
    fn test_merge_numeric() {
        let hierarchy = ClassHierarchy::new();
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Int, SymType::Int]).unwrap(),
            SymType::Int
        );
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Byte, SymType::Short]).unwrap(),
            SymType::Short
        );
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Int, SymType::Long]).unwrap(),
            SymType::Long
        );
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Long, SymType::Float]).unwrap(),
            SymType::Float
        );
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Float, SymType::Double]).unwrap(),
            SymType::Double
        );
    }

    #[test]
    fn test_merge_char_with_signed_types() {
        let hierarchy = ClassHierarchy::new();
        for types in [
            [SymType::Char, SymType::Short],
            [SymType::Short, SymType::Char],
            [SymType::Byte, SymType::Char],
        ] {
            assert_eq!(merge_types(&hierarchy, &types).unwrap(), SymType::Int);
        }
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Bool, SymType::Char]).unwrap(),
            SymType::Char
        );
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Char, SymType::Int]).unwrap(),
            SymType::Int
        );
    }

    #[test]
    fn test_merge_ignores_null() {
        let hierarchy = ClassHierarchy::new();
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Null, SymType::string()]).unwrap(),
            SymType::string()
        );
        assert_eq!(
            merge_types(&hierarchy, &[SymType::Null, SymType::Null]).unwrap(),
            SymType::Null
        );
    }

    #[test]
    fn test_merge_pointers() {
        let hierarchy = ClassHierarchy::new();
        let exception = SymType::class("java/lang/Exception");
        let runtime = SymType::class("java/lang/RuntimeException");
        let error = SymType::class("java/lang/Error");

        assert_eq!(
            merge_types(&hierarchy, &[runtime.clone(), exception.clone()]).unwrap(),
            exception
        );
        assert_eq!(
            merge_types(&hierarchy, &[runtime, error]).unwrap(),
            SymType::class(THROWABLE_CLASS)
        );
    }

    #[test]
    fn test_merge_mixed_fails() {
        let hierarchy = ClassHierarchy::new();
        assert!(merge_types(&hierarchy, &[SymType::Int, SymType::string()]).is_err());
    }
}
