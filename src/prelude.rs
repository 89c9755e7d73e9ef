//! # symtrace Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the symtrace library. Import this module to get quick access to the essential
//! types for building a program model and translating traces.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all symtrace operations
pub use crate::Error;

/// The result type used throughout symtrace
pub use crate::Result;

/// Translator configuration
pub use crate::{DescriptorLimits, TranslatorConfig};

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The trace translator and its event interface
pub use crate::trace::{InstructionTraceCollector, SymbolicTraceBuilder, TranslatorPhase};

/// Per-thread collector registry
pub use crate::trace::{CollectorRegistry, NoopCollector, SharedCollector};

/// Recorded events and their replay
pub use crate::trace::{replay, replay_all, TraceEvent};

// ================================================================================================
// Translation Output
// ================================================================================================

/// The symbolic state and its parts
pub use crate::trace::{
    Clause, ClauseState, PathClause, PathClauseType, PathCondition, StateClause, SymbolicState,
    WrappedValue,
};

/// JSON persistence of symbolic states
pub use crate::trace::SymbolicStateSnapshot;

// ================================================================================================
// Program Model
// ================================================================================================

/// Program, methods and bodies
pub use crate::program::{
    BasicBlock, BodyBuilder, Method, MethodBody, MethodDesc, MethodFlags, NameResolver, Program,
    ProgramBuilder,
};

/// Instructions and values
pub use crate::program::{
    BinaryOp, BlockId, CmpOp, Constant, FieldRef, InstKind, Instruction, LambdaBase, Location,
    UnaryOp, Value,
};

/// Dispatch rules
pub use crate::program::{DispatchRule, ExactDispatch, JvmDispatch};

// ================================================================================================
// Type System
// ================================================================================================

/// Symbolic types and the class hierarchy
pub use crate::types::{ClassDecl, ClassFlags, ClassHierarchy, FieldDecl, SymType};

// ================================================================================================
// Terms, Predicates and Rewriting
// ================================================================================================

/// The term algebra
pub use crate::term::{Term, TermKind};

/// Predicates
pub use crate::predicate::{Predicate, PredicateBuilder, PredicateKind, PredicateType};

/// Term and predicate transformers
pub use crate::transform::{
    collect_terms, RecollectingTransformer, TermCollector, TermRenamer, Transformer,
};

// ================================================================================================
// Concrete Values
// ================================================================================================

/// Runtime values and their descriptors
pub use crate::descriptor::{
    Descriptor, DescriptorConverter, RuntimeArray, RuntimeObject, RuntimeValue,
};
