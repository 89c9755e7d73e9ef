//! Program model: the name index the translator resolves identifiers against.
//!
//! The instrumentation reports instructions, values, methods and fields as strings. This
//! module holds the typed handles those strings resolve to, and the [`Program`] that owns
//! them. The model is intentionally small: it carries what the translator needs and nothing
//! about bytecode itself.
//!
//! # Architecture
//!
//! - [`Program`] - Class hierarchy, method handles and method bodies
//! - [`MethodBody`] - Per-method name index implementing [`NameResolver`]
//! - [`Instruction`] / [`InstKind`] - Instruction handles with their static payload
//! - [`Value`] / [`Constant`] - Source-level values, the keys of a frame's value map
//! - [`DispatchRule`] - Pluggable test confirming dynamic dispatch targets
//!
//! A program is assembled once with [`ProgramBuilder`] and is shared through an `Arc` by every
//! translator working on traces of it.
//!
//! # Examples
//!
//! ```rust,ignore
//! use symtrace::program::{InstKind, MethodBody, MethodFlags, ProgramBuilder};
//! use symtrace::types::{ClassDecl, SymType};
//!
//! let mut builder = ProgramBuilder::new();
//! builder.class(ClassDecl::new("app/Main"));
//! let main = builder.method("app/Main", "run", &["I"], "V", MethodFlags::STATIC)?;
//!
//! let mut body = MethodBody::builder(main.clone());
//! let entry = body.block("entry");
//! body.inst(entry, "ret", InstKind::Return)?;
//! builder.body(body.finish());
//!
//! let program = builder.build();
//! ```

mod body;
mod dispatch;
mod instruction;
mod method;
mod ops;
mod value;

pub use body::{parameter_values, BasicBlock, BodyBuilder, MethodBody, NameResolver};
pub use dispatch::{DispatchRule, ExactDispatch, JvmDispatch};
pub use instruction::{BlockId, InstKind, Instruction, LambdaBase};
pub use method::{FieldRef, Method, MethodDesc, MethodFlags};
pub use ops::{BinaryOp, CmpOp, UnaryOp};
pub use value::{Constant, Location, Value};

use std::{collections::HashMap, sync::Arc};

use crate::{
    types::{ClassDecl, ClassHierarchy, SymType},
    Error, Result,
};

/// The whole program model.
#[derive(Debug, Clone, Default)]
pub struct Program {
    hierarchy: ClassHierarchy,
    methods: HashMap<String, Arc<Method>>,
    bodies: HashMap<String, MethodBody>,
}

impl Program {
    /// Starts building a program.
    #[must_use]
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::new()
    }

    /// The class hierarchy.
    #[must_use]
    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    /// Resolves a method from the string form used by method entry and call events.
    ///
    /// Methods without a registered declaration (library or native code outside the model)
    /// resolve to a fresh handle without modifiers, so calls into them can still be
    /// described symbolically.
    ///
    /// # Arguments
    ///
    /// * `class` - Owner class, internal or dotted form
    /// * `name` - Method name
    /// * `arg_types` - Parameter types as descriptors or source names
    /// * `ret_type` - Return type as a descriptor or source name
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a type string fails to parse.
    pub fn method(&self, class: &str, name: &str, arg_types: &[&str], ret_type: &str) -> Result<Arc<Method>> {
        let desc = MethodDesc::parse(arg_types, ret_type)?;
        let probe = Method::new(class, name, desc, MethodFlags::empty());
        match self.methods.get(&probe.key()) {
            Some(method) => Ok(method.clone()),
            None => {
                log::debug!("Method {} is not part of the program model", probe);
                Ok(Arc::new(probe))
            }
        }
    }

    /// Looks up a registered method by its key (`owner.name(desc)`).
    #[must_use]
    pub fn method_by_key(&self, key: &str) -> Option<Arc<Method>> {
        self.methods.get(key).cloned()
    }

    /// Returns the body of `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodNotFound`] if no body was registered for the method.
    pub fn body(&self, method: &Method) -> Result<&MethodBody> {
        self.bodies
            .get(&method.key())
            .ok_or_else(|| Error::MethodNotFound(method.key()))
    }

    /// Resolves a field from the string form used by field events.
    ///
    /// The field is searched in `class` and its superclasses; the returned handle names the
    /// declaring class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] for an undeclared class, [`Error::FieldNotFound`] if
    /// no class in the chain declares the field, or [`Error::Malformed`] for a bad type.
    pub fn field(&self, class: &str, name: &str, ty: &str) -> Result<FieldRef> {
        let class = class.replace('.', "/");
        let ty = SymType::parse(ty)?;
        if !self.hierarchy.contains(&class) {
            return Err(Error::ClassNotFound(class));
        }
        let (owner, decl) = self
            .hierarchy
            .find_field(&class, name, &ty)
            .ok_or_else(|| Error::FieldNotFound(format!("{class}.{name}: {ty}")))?;
        Ok(FieldRef {
            class: owner.to_string(),
            name: decl.name.clone(),
            ty: decl.ty.clone(),
            is_static: decl.is_static,
        })
    }

    /// Number of registered methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

/// Incremental construction of a [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    /// Creates a builder whose hierarchy holds the core `java.lang` classes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a class.
    pub fn class(&mut self, decl: ClassDecl) -> &mut Self {
        self.program.hierarchy.insert(decl);
        self
    }

    /// Registers a method and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a type string fails to parse.
    pub fn method(
        &mut self,
        class: &str,
        name: &str,
        arg_types: &[&str],
        ret_type: &str,
        flags: MethodFlags,
    ) -> Result<Arc<Method>> {
        let desc = MethodDesc::parse(arg_types, ret_type)?;
        let method = Arc::new(Method::new(class, name, desc, flags));
        self.program.methods.insert(method.key(), method.clone());
        Ok(method)
    }

    /// Registers the body of a method. The method itself is registered as well.
    pub fn body(&mut self, body: MethodBody) -> &mut Self {
        let method = body.method().clone();
        let key = method.key();
        self.program.methods.entry(key.clone()).or_insert(method);
        self.program.bodies.insert(key, body);
        self
    }

    /// Finishes the program.
    #[must_use]
    pub fn build(self) -> Program {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_lookup() {
        let mut builder = ProgramBuilder::new();
        builder.class(ClassDecl::new("app/Main"));
        let registered = builder
            .method("app/Main", "run", &["I"], "V", MethodFlags::STATIC)
            .unwrap();
        let program = builder.build();

        let resolved = program.method("app.Main", "run", &["int"], "void").unwrap();
        assert!(Arc::ptr_eq(&registered, &resolved));
        assert!(resolved.is_static());

        let external = program
            .method("java/io/PrintStream", "println", &["Ljava/lang/String;"], "V")
            .unwrap();
        assert!(external.flags.is_empty());
        assert!(program.body(&external).is_err());
    }

    #[test]
    fn test_field_lookup() {
        let mut builder = ProgramBuilder::new();
        builder.class(ClassDecl::new("app/Base").static_field("count", SymType::Int));
        builder.class(ClassDecl::new("app/Derived").extends("app/Base"));
        let program = builder.build();

        let field = program.field("app/Derived", "count", "I").unwrap();
        assert_eq!(field.class, "app/Base");
        assert!(field.is_static);
        assert!(matches!(
            program.field("app/Missing", "count", "I"),
            Err(Error::ClassNotFound(_))
        ));
        assert!(matches!(
            program.field("app/Derived", "count", "J"),
            Err(Error::FieldNotFound(_))
        ));
    }
}
