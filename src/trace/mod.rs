//! Trace translation: from instruction events to a symbolic state.
//!
//! This module holds everything between the instrumentation and the solver-facing output:
//! the event interface, the translator implementing it, the state it produces, and the
//! tooling around traces (recorded event replay, per-thread registry, JSON snapshots).
//!
//! # Architecture
//!
//! - [`InstructionTraceCollector`] - Event interface, one method per instruction kind
//! - [`SymbolicTraceBuilder`] - The translator, a single-threaded state machine
//! - [`SymbolicState`] - Clauses, path condition, concrete values and term provenance
//! - [`CollectorRegistry`] - Map from observed thread to its collector
//! - [`TraceEvent`] - Serializable record of one event, replayable into any collector
//! - [`SymbolicStateSnapshot`] - JSON persistence of a finished state
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use symtrace::trace::{replay, TraceEvent};
//! use symtrace::TranslatorConfig;
//!
//! let events: Vec<TraceEvent> = serde_json::from_str(&recorded)?;
//! let state = replay(Arc::new(program), TranslatorConfig::default(), &events)?;
//! for predicate in state.predicates() {
//!     println!("{predicate}");
//! }
//! ```

mod builder;
mod collector;
mod event;
mod frame;
mod snapshot;
mod state;

pub use builder::{SymbolicTraceBuilder, TranslatorPhase};
pub use collector::{CollectorRegistry, InstructionTraceCollector, NoopCollector, SharedCollector};
pub use event::{replay, replay_all, TraceEvent};
pub use snapshot::SymbolicStateSnapshot;
pub use state::{
    Clause, ClauseState, PathClause, PathClauseType, PathCondition, StateClause, SymbolicState,
    WrappedValue,
};
