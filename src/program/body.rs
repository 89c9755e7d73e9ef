//! Method bodies and per-method name resolution.
//!
//! A [`MethodBody`] is the name index of one method: it maps the string identifiers the
//! instrumentation reports (`%3`, `arg$0`, `this`, literals, block labels) to typed handles.
//! Bodies are built once with a [`BodyBuilder`] and shared read-only afterwards.
//!
//! # Examples
//!
//! ```rust,ignore
//! use symtrace::program::{BinaryOp, InstKind, MethodBody};
//! use symtrace::types::SymType;
//!
//! let mut body = MethodBody::builder(method.clone());
//! let entry = body.block("entry");
//! body.value(entry, "%sum", InstKind::Binary(BinaryOp::Add), SymType::Int)?;
//! body.inst(entry, "ret", InstKind::Return)?;
//! let body = body.finish();
//!
//! let value = body.resolve_value("%sum")?;
//! ```

use std::{collections::HashMap, sync::Arc};

use crate::{
    program::{BlockId, Constant, InstKind, Instruction, Location, Method, Value},
    types::SymType,
    Error, Result,
};

/// Resolution of string identifiers inside one method.
///
/// Failures are hard errors: an identifier that does not resolve means the event stream and
/// the program model disagree.
pub trait NameResolver {
    /// Resolves a value name: `this`, `arg$N`, a literal or an instruction result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownName`] if `name` does not denote a value of this method.
    fn resolve_value(&self, name: &str) -> Result<Value>;

    /// Resolves an instruction name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownName`] if no instruction has this name.
    fn resolve_instruction(&self, name: &str) -> Result<Arc<Instruction>>;

    /// Resolves a basic block label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownName`] if no block has this label.
    fn resolve_block(&self, name: &str) -> Result<&BasicBlock>;

    /// Resolves an instruction name, returning `None` instead of failing.
    fn find_instruction(&self, name: &str) -> Option<Arc<Instruction>> {
        self.resolve_instruction(name).ok()
    }
}

/// A basic block.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Index of the block in its body
    pub id: BlockId,
    /// Block label
    pub name: String,
    /// Exception types caught by the handlers covering this block
    pub handlers: Vec<SymType>,
    /// Positions of the block's instructions in [`MethodBody::instructions`]
    pub instructions: Vec<usize>,
}

/// The instructions and blocks of one method, indexed by name.
#[derive(Debug, Clone)]
pub struct MethodBody {
    method: Arc<Method>,
    blocks: Vec<BasicBlock>,
    instructions: Vec<Arc<Instruction>>,
    by_name: HashMap<String, usize>,
    block_names: HashMap<String, BlockId>,
}

impl MethodBody {
    /// Starts building the body of `method`.
    #[must_use]
    pub fn builder(method: Arc<Method>) -> BodyBuilder {
        BodyBuilder::new(method)
    }

    /// The method this body belongs to.
    #[must_use]
    pub fn method(&self) -> &Arc<Method> {
        &self.method
    }

    /// All blocks, entry block first.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Block by index.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id)
    }

    /// The entry block id.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        0
    }

    /// All instructions, grouped by block in block order.
    #[must_use]
    pub fn instructions(&self) -> &[Arc<Instruction>] {
        &self.instructions
    }

    /// The instruction executed after `instruction` within the same block.
    ///
    /// # Returns
    ///
    /// `None` if `instruction` terminates its block or belongs to another method.
    #[must_use]
    pub fn next(&self, instruction: &Instruction) -> Option<Arc<Instruction>> {
        if instruction.method != self.method {
            return None;
        }
        let block = self.blocks.get(instruction.block)?;
        let index = block
            .instructions
            .iter()
            .position(|position| *position == instruction.position)?;
        let next = block.instructions.get(index + 1)?;
        self.instructions.get(*next).cloned()
    }

    /// The receiver and argument values of the method, in parameter order.
    #[must_use]
    pub fn parameter_values(&self) -> (Option<Value>, Vec<Value>) {
        parameter_values(&self.method)
    }

    fn unknown(&self, name: &str) -> Error {
        Error::UnknownName {
            name: name.to_string(),
            scope: self.method.to_string(),
        }
    }
}

/// The receiver and argument values of `method`, in parameter order.
#[must_use]
pub fn parameter_values(method: &Method) -> (Option<Value>, Vec<Value>) {
    let this = method.this_type().map(Value::This);
    let args = method
        .desc
        .args
        .iter()
        .enumerate()
        .map(|(index, ty)| Value::Argument {
            index,
            ty: ty.clone(),
        })
        .collect();
    (this, args)
}

impl NameResolver for MethodBody {
    fn resolve_value(&self, name: &str) -> Result<Value> {
        if name == "this" {
            return self
                .method
                .this_type()
                .map(Value::This)
                .ok_or_else(|| self.unknown(name));
        }

        if let Some(index) = name.strip_prefix("arg$") {
            let index: usize = index
                .parse()
                .map_err(|_| malformed_error!("Invalid argument name `{}`", name))?;
            let ty = self
                .method
                .desc
                .args
                .get(index)
                .ok_or_else(|| self.unknown(name))?;
            return Ok(Value::Argument {
                index,
                ty: ty.clone(),
            });
        }

        if let Some(position) = self.by_name.get(name) {
            return self.instructions[*position]
                .result
                .clone()
                .ok_or_else(|| self.unknown(name));
        }

        Constant::parse(name)
            .map(Value::Constant)
            .ok_or_else(|| self.unknown(name))
    }

    fn resolve_instruction(&self, name: &str) -> Result<Arc<Instruction>> {
        self.by_name
            .get(name)
            .and_then(|position| self.instructions.get(*position))
            .cloned()
            .ok_or_else(|| self.unknown(name))
    }

    fn resolve_block(&self, name: &str) -> Result<&BasicBlock> {
        self.block_names
            .get(name)
            .and_then(|id| self.blocks.get(*id))
            .ok_or_else(|| self.unknown(name))
    }
}

/// Incremental construction of a [`MethodBody`].
///
/// Instructions receive ascending line numbers starting at the line set with
/// [`BodyBuilder::at_line`] (default `1`).
pub struct BodyBuilder {
    method: Arc<Method>,
    blocks: Vec<BasicBlock>,
    instructions: Vec<Arc<Instruction>>,
    by_name: HashMap<String, usize>,
    block_names: HashMap<String, BlockId>,
    source: Option<String>,
    line: u32,
}

impl BodyBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(method: Arc<Method>) -> Self {
        Self {
            method,
            blocks: Vec::new(),
            instructions: Vec::new(),
            by_name: HashMap::new(),
            block_names: HashMap::new(),
            source: None,
            line: 1,
        }
    }

    /// Sets the source file name recorded in instruction locations.
    #[must_use]
    pub fn with_source(mut self, file: impl Into<String>) -> Self {
        self.source = Some(file.into());
        self
    }

    /// Sets the line number of the next instruction.
    pub fn at_line(&mut self, line: u32) -> &mut Self {
        self.line = line;
        self
    }

    /// Appends a block. The first block is the entry block.
    pub fn block(&mut self, name: &str) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(BasicBlock {
            id,
            name: name.to_string(),
            handlers: Vec::new(),
            instructions: Vec::new(),
        });
        self.block_names.insert(name.to_string(), id);
        id
    }

    /// Declares that `block` is covered by a handler catching `exception`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownName`] if `block` does not exist.
    pub fn handler(&mut self, block: BlockId, exception: SymType) -> Result<&mut Self> {
        let scope = self.method.to_string();
        let block = self.blocks.get_mut(block).ok_or_else(|| Error::UnknownName {
            name: format!("block #{block}"),
            scope,
        })?;
        if !block.handlers.contains(&exception) {
            block.handlers.push(exception);
        }
        Ok(self)
    }

    /// Appends a value-producing instruction whose result has type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for a duplicate name and [`Error::UnknownName`] for an
    /// unknown block.
    pub fn value(&mut self, block: BlockId, name: &str, kind: InstKind, ty: SymType) -> Result<&mut Self> {
        let result = Value::Local {
            name: name.to_string(),
            ty,
        };
        self.push(block, name, kind, Some(result))
    }

    /// Appends an instruction without a result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for a duplicate name and [`Error::UnknownName`] for an
    /// unknown block.
    pub fn inst(&mut self, block: BlockId, name: &str, kind: InstKind) -> Result<&mut Self> {
        self.push(block, name, kind, None)
    }

    fn push(&mut self, block: BlockId, name: &str, kind: InstKind, result: Option<Value>) -> Result<&mut Self> {
        if self.by_name.contains_key(name) {
            return Err(malformed_error!(
                "Duplicate instruction name `{}` in {}",
                name,
                self.method
            ));
        }
        if block >= self.blocks.len() {
            return Err(Error::UnknownName {
                name: format!("block #{block}"),
                scope: self.method.to_string(),
            });
        }

        let position = self.instructions.len();
        let instruction = Instruction {
            name: name.to_string(),
            kind,
            method: self.method.clone(),
            block,
            position,
            location: Location {
                file: self.source.clone(),
                line: self.line,
            },
            result,
        };
        self.line += 1;
        self.instructions.push(Arc::new(instruction));
        self.by_name.insert(name.to_string(), position);
        self.blocks[block].instructions.push(position);
        Ok(self)
    }

    /// Finishes the body.
    #[must_use]
    pub fn finish(self) -> MethodBody {
        MethodBody {
            method: self.method,
            blocks: self.blocks,
            instructions: self.instructions,
            by_name: self.by_name,
            block_names: self.block_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{BinaryOp, MethodDesc, MethodFlags};

    fn body() -> MethodBody {
        let method = Arc::new(Method::new(
            "app/Calc",
            "sum",
            MethodDesc::new(vec![SymType::Int, SymType::Int], SymType::Int),
            MethodFlags::empty(),
        ));
        let mut builder = MethodBody::builder(method).with_source("Calc.java");
        let entry = builder.block("entry");
        builder.handler(entry, SymType::class("java/lang/Exception")).unwrap();
        builder.at_line(10);
        builder
            .value(entry, "%0", InstKind::Binary(BinaryOp::Add), SymType::Int)
            .unwrap()
            .inst(entry, "ret", InstKind::Return)
            .unwrap();
        builder.finish()
    }

    #[test]
    fn test_resolve_values() {
        let body = body();
        assert_eq!(
            body.resolve_value("arg$1").unwrap(),
            Value::Argument {
                index: 1,
                ty: SymType::Int
            }
        );
        assert_eq!(
            body.resolve_value("this").unwrap(),
            Value::This(SymType::class("app/Calc"))
        );
        assert_eq!(
            body.resolve_value("%0").unwrap(),
            Value::Local {
                name: "%0".to_string(),
                ty: SymType::Int
            }
        );
        assert_eq!(
            body.resolve_value("5").unwrap(),
            Value::Constant(Constant::Int(5))
        );
    }

    #[test]
    fn test_unknown_names_fail() {
        let body = body();
        assert!(matches!(
            body.resolve_value("%missing"),
            Err(Error::UnknownName { .. })
        ));
        assert!(body.resolve_value("arg$2").is_err());
        assert!(body.resolve_value("ret").is_err());
        assert!(body.resolve_block("exit").is_err());
        assert!(body.find_instruction("%missing").is_none());
    }

    #[test]
    fn test_next_and_locations() {
        let body = body();
        let add = body.resolve_instruction("%0").unwrap();
        let ret = body.next(&add).unwrap();
        assert_eq!(ret.name(), "ret");
        assert!(body.next(&ret).is_none());
        assert_eq!(add.location().line, 10);
        assert_eq!(ret.location().to_string(), "Calc.java:11");
        assert_eq!(body.resolve_block("entry").unwrap().handlers.len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let method = Arc::new(Method::new(
            "app/Calc",
            "f",
            MethodDesc::new(vec![], SymType::Void),
            MethodFlags::STATIC,
        ));
        let mut builder = MethodBody::builder(method);
        let entry = builder.block("entry");
        builder.inst(entry, "a", InstKind::Jump).unwrap();
        assert!(builder.inst(entry, "a", InstKind::Jump).is_err());
        assert!(builder.inst(7, "b", InstKind::Jump).is_err());
    }
}
