//! Explicit class registry.
//!
//! The translator needs a handful of class-level facts: whether one type is a subtype of
//! another (handler selection, type guards, dispatch confirmation), whether a class is known
//! at all, and which class declares a field. [`ClassHierarchy`] answers these from a table
//! that is built once, up front, and then shared immutably.
//!
//! A fresh hierarchy already contains the `java.lang` classes the translator relies on:
//! `Object`, `String`, `Class`, the boxed primitives and the common throwable types.
//!
//! # Examples
//!
//! ```rust,ignore
//! use symtrace::types::{ClassDecl, ClassHierarchy, SymType};
//!
//! let mut hierarchy = ClassHierarchy::new();
//! hierarchy.insert(ClassDecl::new("app/Shape"));
//! hierarchy.insert(ClassDecl::new("app/Circle").extends("app/Shape"));
//!
//! assert!(hierarchy.is_subtype_of(&SymType::class("app/Circle"), &SymType::class("app/Shape")));
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use bitflags::bitflags;

use crate::types::{SymType, OBJECT_CLASS};

bitflags! {
    /// Class modifiers relevant to dispatch and type checks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u32 {
        /// Declared as `interface`
        const INTERFACE = 0x0001;
        /// Declared `abstract`
        const ABSTRACT = 0x0002;
        /// Declared `final`, cannot be extended
        const FINAL = 0x0004;
    }
}

/// A field declared by a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: SymType,
    /// `true` for `static` fields
    pub is_static: bool,
}

/// Declaration of a single class or interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    /// Internal class name
    pub name: String,
    /// Direct superclass, `None` only for `java/lang/Object`
    pub super_class: Option<String>,
    /// Directly implemented interfaces
    pub interfaces: Vec<String>,
    /// Class modifiers
    pub flags: ClassFlags,
    /// Declared fields
    pub fields: Vec<FieldDecl>,
}

impl ClassDecl {
    /// Declares a class extending `java/lang/Object`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().replace('.', "/");
        let super_class = (name != OBJECT_CLASS).then(|| OBJECT_CLASS.to_string());
        Self {
            name,
            super_class,
            interfaces: Vec::new(),
            flags: ClassFlags::empty(),
            fields: Vec::new(),
        }
    }

    /// Sets the direct superclass.
    #[must_use]
    pub fn extends(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into().replace('.', "/"));
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into().replace('.', "/"));
        self
    }

    /// Sets the class modifiers.
    #[must_use]
    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Declares an instance field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: SymType) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            is_static: false,
        });
        self
    }

    /// Declares a static field.
    #[must_use]
    pub fn static_field(mut self, name: impl Into<String>, ty: SymType) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            is_static: true,
        });
        self
    }

    /// Returns `true` for interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }
}

/// `java.lang` classes every hierarchy starts with: (name, superclass).
const SYSTEM_CLASSES: &[(&str, &str)] = &[
    ("java/lang/String", OBJECT_CLASS),
    ("java/lang/Class", OBJECT_CLASS),
    ("java/lang/Number", OBJECT_CLASS),
    ("java/lang/Boolean", OBJECT_CLASS),
    ("java/lang/Character", OBJECT_CLASS),
    ("java/lang/Byte", "java/lang/Number"),
    ("java/lang/Short", "java/lang/Number"),
    ("java/lang/Integer", "java/lang/Number"),
    ("java/lang/Long", "java/lang/Number"),
    ("java/lang/Float", "java/lang/Number"),
    ("java/lang/Double", "java/lang/Number"),
    ("java/lang/Throwable", OBJECT_CLASS),
    ("java/lang/Exception", "java/lang/Throwable"),
    ("java/lang/Error", "java/lang/Throwable"),
    ("java/lang/RuntimeException", "java/lang/Exception"),
    ("java/lang/NullPointerException", "java/lang/RuntimeException"),
    ("java/lang/ArithmeticException", "java/lang/RuntimeException"),
    ("java/lang/ClassCastException", "java/lang/RuntimeException"),
    ("java/lang/IllegalArgumentException", "java/lang/RuntimeException"),
    ("java/lang/IllegalStateException", "java/lang/RuntimeException"),
    ("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException"),
    (
        "java/lang/ArrayIndexOutOfBoundsException",
        "java/lang/IndexOutOfBoundsException",
    ),
    ("java/lang/NegativeArraySizeException", "java/lang/RuntimeException"),
];

/// Interfaces implemented by every array type.
const ARRAY_INTERFACES: &[&str] = &["java/lang/Cloneable", "java/io/Serializable"];

/// Immutable-after-construction registry of class declarations.
///
/// The registry is populated once while the program model is built and is then only read.
/// Classes that were never declared are treated as unknown: they are subtypes of
/// `java/lang/Object` and of nothing else.
#[derive(Debug, Clone)]
pub struct ClassHierarchy {
    classes: HashMap<String, ClassDecl>,
}

impl Default for ClassHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassHierarchy {
    /// Creates a hierarchy holding `java/lang/Object` and the core `java.lang` classes.
    #[must_use]
    pub fn new() -> Self {
        let mut classes = HashMap::new();
        let object = ClassDecl::new(OBJECT_CLASS);
        classes.insert(object.name.clone(), object);
        for (name, super_class) in SYSTEM_CLASSES {
            let decl = ClassDecl::new(*name).extends(*super_class);
            classes.insert(decl.name.clone(), decl);
        }
        for interface in ARRAY_INTERFACES {
            let decl = ClassDecl::new(*interface).with_flags(ClassFlags::INTERFACE | ClassFlags::ABSTRACT);
            classes.insert(decl.name.clone(), decl);
        }
        let boxed_value = [
            ("java/lang/Boolean", SymType::Bool),
            ("java/lang/Character", SymType::Char),
            ("java/lang/Byte", SymType::Byte),
            ("java/lang/Short", SymType::Short),
            ("java/lang/Integer", SymType::Int),
            ("java/lang/Long", SymType::Long),
            ("java/lang/Float", SymType::Float),
            ("java/lang/Double", SymType::Double),
        ];
        for (name, ty) in boxed_value {
            if let Some(decl) = classes.get_mut(name) {
                decl.flags |= ClassFlags::FINAL;
                decl.fields.push(FieldDecl {
                    name: "value".to_string(),
                    ty,
                    is_static: false,
                });
            }
        }
        Self { classes }
    }

    /// Registers a class, replacing an earlier declaration with the same name.
    pub fn insert(&mut self, decl: ClassDecl) {
        self.classes.insert(decl.name.clone(), decl);
    }

    /// Looks up a class declaration.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    /// Returns `true` if `name` has been declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of declared classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns `true` if `class` is `ancestor` or transitively extends or implements it.
    #[must_use]
    pub fn is_inheritor_of(&self, class: &str, ancestor: &str) -> bool {
        if class == ancestor || ancestor == OBJECT_CLASS {
            return true;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([class]);
        while let Some(current) = queue.pop_front() {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(decl) = self.classes.get(current) {
                if let Some(super_class) = &decl.super_class {
                    queue.push_back(super_class.as_str());
                }
                queue.extend(decl.interfaces.iter().map(String::as_str));
            }
        }
        false
    }

    /// Subtype relation over [`SymType`].
    ///
    /// Every type is a subtype of itself, `null` is a subtype of every reference type, arrays
    /// are subtypes of `java/lang/Object` and the array interfaces, and arrays of references
    /// are covariant in their element type. Primitive types are only subtypes of themselves.
    #[must_use]
    pub fn is_subtype_of(&self, ty: &SymType, other: &SymType) -> bool {
        if ty == other {
            return true;
        }
        match (ty, other) {
            (SymType::Null, other) => other.is_pointer(),
            (SymType::Class(name), SymType::Class(other_name)) => {
                self.is_inheritor_of(name, other_name)
            }
            (SymType::Array(_), SymType::Class(other_name)) => {
                other_name == OBJECT_CLASS || ARRAY_INTERFACES.contains(&other_name.as_str())
            }
            (SymType::Array(element), SymType::Array(other_element)) => {
                element.is_pointer()
                    && other_element.is_pointer()
                    && self.is_subtype_of(element, other_element)
            }
            _ => false,
        }
    }

    /// Closest common supertype of two reference types.
    ///
    /// Walks the superclass chain of `ty` and returns the first class `other` is a subtype of,
    /// falling back to `java/lang/Object`.
    #[must_use]
    pub fn common_supertype(&self, ty: &SymType, other: &SymType) -> SymType {
        if self.is_subtype_of(ty, other) {
            return other.clone();
        }
        if self.is_subtype_of(other, ty) {
            return ty.clone();
        }

        let SymType::Class(name) = ty else {
            return SymType::object();
        };

        let mut current = self.classes.get(name.as_str()).and_then(|decl| decl.super_class.as_deref());
        while let Some(candidate) = current {
            let candidate_ty = SymType::class(candidate);
            if self.is_subtype_of(other, &candidate_ty) {
                return candidate_ty;
            }
            current = self.classes.get(candidate).and_then(|decl| decl.super_class.as_deref());
        }
        SymType::object()
    }

    /// Finds the declaration of field `name` of type `ty`, searching `class` and its
    /// superclasses.
    ///
    /// # Returns
    ///
    /// The declaring class name together with the field declaration, or `None` when no class
    /// in the chain declares a matching field.
    #[must_use]
    pub fn find_field(&self, class: &str, name: &str, ty: &SymType) -> Option<(&str, &FieldDecl)> {
        let mut current = Some(class);
        let mut visited = HashSet::new();
        while let Some(class_name) = current {
            if !visited.insert(class_name) {
                break;
            }
            let decl = self.classes.get(class_name)?;
            if let Some(field) = decl.fields.iter().find(|field| field.name == name && field.ty == *ty) {
                return Some((decl.name.as_str(), field));
            }
            current = decl.super_class.as_deref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> ClassHierarchy {
        let mut hierarchy = ClassHierarchy::new();
        hierarchy.insert(ClassDecl::new("app/Drawable").with_flags(ClassFlags::INTERFACE));
        hierarchy.insert(ClassDecl::new("app/Shape").implements("app/Drawable"));
        hierarchy.insert(ClassDecl::new("app/Circle").extends("app/Shape"));
        hierarchy.insert(ClassDecl::new("app/Square").extends("app/Shape"));
        hierarchy
    }

    #[test]
    fn test_system_classes_present() {
        let hierarchy = ClassHierarchy::new();
        assert!(hierarchy.contains("java/lang/Object"));
        assert!(hierarchy.contains("java/lang/IllegalStateException"));
        assert!(hierarchy.is_inheritor_of("java/lang/IllegalStateException", "java/lang/Exception"));
        assert!(!hierarchy.is_inheritor_of("java/lang/Exception", "java/lang/IllegalStateException"));
    }

    #[test]
    fn test_class_subtyping() {
        let hierarchy = shapes();
        let circle = SymType::class("app/Circle");
        let shape = SymType::class("app/Shape");
        let drawable = SymType::class("app/Drawable");

        assert!(hierarchy.is_subtype_of(&circle, &shape));
        assert!(hierarchy.is_subtype_of(&circle, &drawable));
        assert!(hierarchy.is_subtype_of(&circle, &SymType::object()));
        assert!(!hierarchy.is_subtype_of(&shape, &circle));
        assert!(hierarchy.is_subtype_of(&SymType::Null, &circle));
        assert!(!hierarchy.is_subtype_of(&SymType::Int, &SymType::Long));
    }

    #[test]
    fn test_array_subtyping() {
        let hierarchy = shapes();
        let circles = SymType::array(SymType::class("app/Circle"));
        let shapes = SymType::array(SymType::class("app/Shape"));

        assert!(hierarchy.is_subtype_of(&circles, &shapes));
        assert!(hierarchy.is_subtype_of(&circles, &SymType::object()));
        assert!(!hierarchy.is_subtype_of(
            &SymType::array(SymType::Int),
            &SymType::array(SymType::Long)
        ));
    }

    #[test]
    fn test_common_supertype() {
        let hierarchy = shapes();
        assert_eq!(
            hierarchy.common_supertype(&SymType::class("app/Circle"), &SymType::class("app/Square")),
            SymType::class("app/Shape")
        );
        assert_eq!(
            hierarchy.common_supertype(&SymType::class("app/Circle"), &SymType::string()),
            SymType::object()
        );
    }

    #[test]
    fn test_find_inherited_field() {
        let mut hierarchy = shapes();
        hierarchy.insert(ClassDecl::new("app/Shape").implements("app/Drawable").field("area", SymType::Double));

        let (owner, field) = hierarchy
            .find_field("app/Circle", "area", &SymType::Double)
            .unwrap();
        assert_eq!(owner, "app/Shape");
        assert!(!field.is_static);
        assert!(hierarchy.find_field("app/Circle", "area", &SymType::Int).is_none());
    }

    #[test]
    fn test_cyclic_declarations_terminate() {
        let mut hierarchy = ClassHierarchy::new();
        hierarchy.insert(ClassDecl::new("a/A").extends("a/B"));
        hierarchy.insert(ClassDecl::new("a/B").extends("a/A"));
        assert!(!hierarchy.is_inheritor_of("a/A", "a/C"));
        assert!(hierarchy.find_field("a/A", "x", &SymType::Int).is_none());
    }
}
