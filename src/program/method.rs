use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{types::SymType, Result};

bitflags! {
    /// Method modifiers relevant to dispatch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MethodFlags: u32 {
        /// `static` method, no receiver
        const STATIC = 0x0008;
        /// `final` method, cannot be overridden
        const FINAL = 0x0010;
        /// `native` method, never instrumented
        const NATIVE = 0x0100;
        /// `abstract` method, no body
        const ABSTRACT = 0x0400;
    }
}

/// Parameter and return types of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDesc {
    /// Parameter types, excluding the receiver
    pub args: Vec<SymType>,
    /// Return type
    pub ret: SymType,
}

impl MethodDesc {
    /// Creates a descriptor from already parsed types.
    #[must_use]
    pub fn new(args: Vec<SymType>, ret: SymType) -> Self {
        Self { args, ret }
    }

    /// Parses a descriptor from per-argument type strings and a return type string, the form
    /// in which instrumentation reports method signatures.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if any of the type strings fails to parse.
    pub fn parse<S: AsRef<str>>(args: &[S], ret: &str) -> Result<Self> {
        let args = args
            .iter()
            .map(|arg| SymType::parse(arg.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            args,
            ret: SymType::parse(ret)?,
        })
    }
}

impl fmt::Display for MethodDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for arg in &self.args {
            write!(f, "{}", arg.descriptor())?;
        }
        write!(f, "){}", self.ret.descriptor())
    }
}

/// A resolved method handle.
///
/// Methods are identified by owner class, name and descriptor; the display form
/// `owner.name(desc)` doubles as the lookup key of [`crate::program::Program`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Method {
    /// Internal name of the declaring class
    pub class: String,
    /// Method name
    pub name: String,
    /// Parameter and return types
    pub desc: MethodDesc,
    /// Modifiers
    pub flags: MethodFlags,
}

impl Method {
    /// Creates a method handle.
    #[must_use]
    pub fn new(class: impl Into<String>, name: impl Into<String>, desc: MethodDesc, flags: MethodFlags) -> Self {
        Self {
            class: class.into().replace('.', "/"),
            name: name.into(),
            desc,
            flags,
        }
    }

    /// Lookup key, `owner.name(desc)`.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    /// Returns `true` for final methods.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(MethodFlags::FINAL)
    }

    /// Type of the implicit receiver, `None` for static methods.
    #[must_use]
    pub fn this_type(&self) -> Option<SymType> {
        (!self.is_static()).then(|| SymType::class(self.class.as_str()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class, self.name, self.desc)
    }
}

/// A resolved field handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// Internal name of the declaring class
    pub class: String,
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: SymType,
    /// `true` for static fields
    pub is_static: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desc_parse_and_display() {
        let desc = MethodDesc::parse(&["I", "java.lang.String", "[J"], "V").unwrap();
        assert_eq!(desc.args.len(), 3);
        assert_eq!(desc.to_string(), "(ILjava/lang/String;[J)V");
    }

    #[test]
    fn test_method_key() {
        let method = Method::new(
            "app.Counter",
            "add",
            MethodDesc::new(vec![SymType::Int], SymType::Int),
            MethodFlags::empty(),
        );
        assert_eq!(method.key(), "app/Counter.add(I)I");
        assert_eq!(method.this_type(), Some(SymType::class("app/Counter")));
        assert!(!method.is_static());
    }
}
