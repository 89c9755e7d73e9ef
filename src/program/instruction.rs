use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use strum::IntoStaticStr;

use crate::{
    program::{BinaryOp, CmpOp, Location, Method, UnaryOp, Value},
    term::Term,
    types::SymType,
};

/// Index of a basic block inside its [`crate::program::MethodBody`].
pub type BlockId = usize;

/// Target of an `invokedynamic` bootstrap: the method implementing the lambda.
#[derive(Debug, Clone)]
pub struct LambdaBase {
    /// The implementation method
    pub method: Arc<Method>,
    /// Body of the implementation method as a single expression over its argument terms,
    /// when the method is simple enough to have one
    pub body: Option<Term>,
}

/// Instruction kinds together with the static payload the translator needs.
#[derive(Debug, Clone, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum InstKind {
    /// `v = a[i]`
    ArrayLoad,
    /// `a[i] = v`
    ArrayStore,
    /// `v = a op b`
    Binary(BinaryOp),
    /// Conditional branch on a boolean value
    Branch,
    /// Method invocation
    Call,
    /// `v = (T) a`, the target type is the result type
    Cast,
    /// Exception handler entry, binding the caught exception of the given type
    Catch(SymType),
    /// `v = a cmp b`
    Cmp(CmpOp),
    /// `monitorenter`
    EnterMonitor,
    /// `monitorexit`
    ExitMonitor,
    /// `v = o.f` or `v = C.f`
    FieldLoad,
    /// `o.f = v` or `C.f = v`
    FieldStore,
    /// `v = a instanceof T`
    InstanceOf(SymType),
    /// `invokedynamic` producing a lambda
    InvokeDynamic(LambdaBase),
    /// Unconditional jump
    Jump,
    /// `v = new T[d0]..[dn]`, the array type is the result type
    NewArray,
    /// `v = new T`, the class type is the result type
    New,
    /// SSA phi with one incoming value per predecessor block
    Phi(Vec<(BlockId, Value)>),
    /// Method return
    Return,
    /// `lookupswitch` with the given case keys
    Switch(Vec<i32>),
    /// `tableswitch` over `min..=max`
    TableSwitch {
        /// Smallest case key
        min: i32,
        /// Largest case key
        max: i32,
    },
    /// `athrow`
    Throw,
    /// `v = op a`
    Unary(UnaryOp),
}

impl InstKind {
    /// Short name of the kind, used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// A resolved instruction handle.
///
/// Instructions are identified by their owning method and their name; the name of a
/// value-producing instruction is also the name of its result value.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub(crate) name: String,
    pub(crate) kind: InstKind,
    pub(crate) method: Arc<Method>,
    pub(crate) block: BlockId,
    pub(crate) position: usize,
    pub(crate) location: Location,
    pub(crate) result: Option<Value>,
}

impl Instruction {
    /// Instruction name, unique within its method.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind and static payload.
    #[must_use]
    pub const fn kind(&self) -> &InstKind {
        &self.kind
    }

    /// The method containing this instruction.
    #[must_use]
    pub fn method(&self) -> &Arc<Method> {
        &self.method
    }

    /// The basic block containing this instruction.
    #[must_use]
    pub const fn block(&self) -> BlockId {
        self.block
    }

    /// Source location.
    #[must_use]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// Result value, `None` for instructions that produce nothing.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns `true` for `return` instructions.
    #[must_use]
    pub const fn is_return(&self) -> bool {
        matches!(self.kind, InstKind::Return)
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.method == other.method
    }
}

impl Eq for Instruction {}

impl Hash for Instruction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.method.hash(state);
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] in {}", self.name, self.kind.name(), self.method)
    }
}
