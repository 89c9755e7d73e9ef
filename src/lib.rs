// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]

//! # symtrace
//!
//! Concolic trace translation for JVM programs. An instrumented program reports every
//! executed instruction together with the concrete values it observed; `symtrace` turns that
//! event stream into a symbolic description of the execution: the clauses each instruction
//! contributes, the path condition of the branches and guards that were taken, the concrete
//! values of every term and the source value each term stands for.
//!
//! ## Features
//!
//! - **Term algebra** - Immutable, structurally shared symbolic expressions with type checking
//! - **Predicates** - State, path, assumption, axiom and requirement facts over terms
//! - **Rewriting** - A [`transform::Transformer`] framework for bottom-up term and predicate rewrites
//! - **Trace translation** - A call-aware translator with virtual dispatch and exception unwinding
//! - **Replay and persistence** - Serializable event records and JSON snapshots of finished states
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use symtrace::prelude::*;
//!
//! let program = Arc::new(build_program()?);
//! let mut translator = SymbolicTraceBuilder::new(program);
//!
//! translator.method_enter("app/Main", "abs", &["I"], "I", None, &[RuntimeValue::Int(-3)])?;
//! translator.cmp("%c", "arg$0", "0", &RuntimeValue::Int(-3), &RuntimeValue::Int(0))?;
//! translator.branch("br", "%c")?;
//!
//! let state = translator.symbolic_state();
//! for clause in state.path.iter() {
//!     println!("{}", clause.predicate);
//! }
//! ```
//!
//! ## Architecture
//!
//! `symtrace` is organized into the following modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`types`] - Symbolic types and the class hierarchy
//! - [`program`] - The program model events are resolved against
//! - [`term`] - The term algebra
//! - [`predicate`] - Typed facts over terms
//! - [`transform`] - Term and predicate rewriting
//! - [`descriptor`] - Concrete runtime values and their symbolic descriptors
//! - [`trace`] - The event interface, the translator and its output
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Errors raised while translating an event are
//! wrapped in [`Error::Translation`], naming the event. Violated translator invariants are
//! fatal: the translator aborts and refuses every later event.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade. Skipped or failed events are reported at
//! `warn`, aborts at `error`, and detail useful when debugging a trace at `debug`.
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the symtrace library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust,ignore
/// use symtrace::prelude::*;
///
/// let mut translator = SymbolicTraceBuilder::new(program);
/// translator.method_enter("app/Main", "run", &[], "V", None, &[])?;
/// ```
pub mod prelude;

/// Translator configuration.
///
/// [`TranslatorConfig`] bounds the array lengths the translator assumes and the size of the
/// descriptors built from concrete values. Presets exist for shallow and deep capture.
pub mod config;

/// Symbolic types and the class hierarchy.
///
/// # Key Types
///
/// - [`types::SymType`] - Primitive, class, array and pointer types
/// - [`types::ClassHierarchy`] - Registry of class declarations answering subtype queries
/// - [`types::ClassDecl`] - Declaration of a class, its supertypes and fields
pub mod types;

/// The program model.
///
/// Instrumentation reports methods, values and instructions by name. This module maps those
/// names to typed handles: a [`program::Program`] holds the class hierarchy and the method
/// bodies, each [`program::MethodBody`] resolves the names local to one method.
///
/// # Key Types
///
/// - [`program::Program`] and [`program::ProgramBuilder`] - The model and its construction
/// - [`program::Method`] - Method handle with descriptor and modifiers
/// - [`program::Instruction`] and [`program::InstKind`] - Resolved instructions
/// - [`program::Value`] - Source values: receiver, arguments, constants, results
/// - [`program::DispatchRule`] - Decides whether an entered method is a call's target
pub mod program;

/// The term algebra.
///
/// Terms are immutable, hash-consed by structure and cheap to clone. Each term carries its
/// type and a printable name derived from its structure. Factory functions on
/// [`term::Term`] check operand types and fail with [`Error::TypeError`] on mismatches.
pub mod term;

/// Predicates: typed facts over terms.
///
/// A [`predicate::Predicate`] has a kind (equality, call, store, ...), a type (state, path,
/// ...) and the source location it was derived from. [`predicate::PredicateBuilder`] fixes
/// type and location for a series of predicates.
pub mod predicate;

/// Rewriting of terms and predicates.
///
/// [`transform::Transformer`] visits a term bottom-up and rebuilds it only where a rewrite
/// changed something. [`transform::TermRenamer`] and [`transform::TermCollector`] are the
/// stock transformers.
pub mod transform;

/// Concrete runtime values and symbolic descriptors.
///
/// Instrumentation reports concrete values as [`descriptor::RuntimeValue`]s. The
/// [`descriptor::DescriptorConverter`] turns them into [`descriptor::Descriptor`]s, bounded
/// in depth and array length, which the symbolic state stores per term.
pub mod descriptor;

/// Trace translation.
///
/// The [`trace::InstructionTraceCollector`] trait is the event interface the instrumentation
/// drives. [`trace::SymbolicTraceBuilder`] implements it and produces a
/// [`trace::SymbolicState`]. Recorded events ([`trace::TraceEvent`]) can be replayed, and
/// finished states persisted with [`trace::SymbolicStateSnapshot`].
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use symtrace::trace::{replay, TraceEvent};
/// use symtrace::TranslatorConfig;
///
/// let events: Vec<TraceEvent> = serde_json::from_str(&recorded)?;
/// let state = replay(Arc::new(program), TranslatorConfig::default(), &events)?;
/// println!("{} clauses, {} path clauses", state.clauses.len(), state.path.len());
/// ```
pub mod trace;

/// `symtrace` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `symtrace` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust,ignore
/// use symtrace::Error;
///
/// match translator.branch("br", "%c") {
///     Ok(()) => {}
///     Err(Error::Translation { event, source }) if source.is_fatal() => {
///         eprintln!("translation aborted in {event}: {source}");
///     }
///     Err(e) => eprintln!("skipped event: {e}"),
/// }
/// ```
pub use error::Error;

/// Translator and descriptor configuration.
pub use config::{DescriptorLimits, TranslatorConfig};

/// Main entry point: the trace translator and the state it builds.
pub use trace::{InstructionTraceCollector, SymbolicState, SymbolicTraceBuilder};
