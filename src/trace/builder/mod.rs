//! The concolic trace translator.
//!
//! [`SymbolicTraceBuilder`] consumes the instruction events of one thread, in execution
//! order, and incrementally builds the [`SymbolicState`] describing that execution.
//!
//! # Architecture
//!
//! The translator keeps a stack of [`Frame`]s mirroring the executed call stack. Every frame
//! binds the source values of its method to terms: operands are looked up (and bound on
//! first use), results always get a fresh term. Each handled event appends a clause, records
//! its instruction in the raw trace, and refreshes the frame's catch-handler snapshots.
//!
//! Calls are two-phase. A `call` event leaves a pending call behind; the next event decides
//! what it was:
//!
//! - a method entry overriding the declared target aliases the callee's parameters to the
//!   caller's terms and the call is inlined (no call predicate);
//! - anything else flushes the call predicate into the clauses. If the call was a method
//!   entry that does not match, the callee runs uninstrumented from the translator's point
//!   of view and its events are suppressed until control is back after the call.
//!
//! ```text
//!            call                   method_enter (overrides)
//!   Idle ─────────────► PendingCall ─────────────────────────► Idle
//!    ▲                      │  any other event / method_enter (no match)
//!    │                      ▼
//!    └───── next inst ── Suppressed
//! ```
//!
//! Fatal failures (violated translator invariants) abort the translation: the error is
//! logged and returned, and every later event fails with [`crate::Error::Aborted`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use symtrace::descriptor::RuntimeValue;
//! use symtrace::trace::{InstructionTraceCollector, SymbolicTraceBuilder};
//!
//! let mut translator = SymbolicTraceBuilder::new(Arc::new(program));
//! translator.method_enter("app/Main", "abs", &["I"], "I", None, &[RuntimeValue::Int(-3)])?;
//! translator.cmp("%c", "arg$0", "0", &RuntimeValue::Int(-3), &RuntimeValue::Int(0))?;
//! translator.branch("br", "%c")?;
//! let state = translator.symbolic_state();
//! ```

mod constraints;
mod events;

use std::{
    collections::{HashMap, HashSet},
    fmt, mem,
    sync::Arc,
};

use imbl::{HashMap as ImHashMap, Vector};

use crate::{
    config::TranslatorConfig,
    descriptor::{Descriptor, DescriptorConverter, RuntimeValue},
    predicate::{Predicate, PredicateBuilder},
    program::{DispatchRule, InstKind, Instruction, JvmDispatch, Method, NameResolver, Program, Value},
    term::Term,
    trace::{
        frame::{CallFrame, Frame, NameGenerator},
        Clause, ClauseState, PathClause, PathCondition, StateClause, SymbolicState, WrappedValue,
    },
    types::SymType,
    Error, Result,
};

/// Phase of the call protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslatorPhase {
    /// No call is outstanding
    Idle,
    /// A call was seen and its callee not yet identified
    PendingCall,
    /// Events belong to an uninstrumented callee and are not translated
    Suppressed,
}

impl fmt::Display for TranslatorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslatorPhase::Idle => write!(f, "idle"),
            TranslatorPhase::PendingCall => write!(f, "pending call"),
            TranslatorPhase::Suppressed => write!(f, "suppressed"),
        }
    }
}

/// A call waiting for the next event.
#[derive(Debug, Clone)]
struct PendingCall {
    instruction: Arc<Instruction>,
    method: Arc<Method>,
    receiver: Option<(Value, Term)>,
    callee: Option<Term>,
    arguments: Vec<Term>,
    predicate: Predicate,
}

#[derive(Debug, Clone, Default)]
enum CallState {
    #[default]
    Idle,
    Pending(PendingCall),
}

/// Translator from instruction events to a [`SymbolicState`].
///
/// One translator serves one thread; it is driven through its
/// [`crate::trace::InstructionTraceCollector`] implementation.
pub struct SymbolicTraceBuilder {
    program: Arc<Program>,
    dispatch: Arc<dyn DispatchRule>,
    config: TranslatorConfig,
    converter: DescriptorConverter,

    clauses: Vector<Clause>,
    path: Vector<PathClause>,
    trace: Vec<Arc<Instruction>>,
    concrete_values: ImHashMap<Term, Descriptor>,
    terms: ImHashMap<Term, WrappedValue>,

    null_checked: HashSet<Term>,
    type_checked: HashMap<Term, SymType>,
    index_checked: HashMap<Term, HashSet<Term>>,
    length_checked: HashSet<Term>,

    frames: Vec<Frame>,
    names: NameGenerator,
    call_state: CallState,
    call_trace: Vec<CallFrame>,
    thrown_exception: Option<Term>,
    aborted: bool,
}

impl SymbolicTraceBuilder {
    /// Creates a translator with the default configuration and [`JvmDispatch`].
    #[must_use]
    pub fn new(program: Arc<Program>) -> Self {
        Self::with_config(program, TranslatorConfig::default())
    }

    /// Creates a translator with `config` and [`JvmDispatch`].
    #[must_use]
    pub fn with_config(program: Arc<Program>, config: TranslatorConfig) -> Self {
        Self {
            program,
            dispatch: Arc::new(JvmDispatch),
            converter: DescriptorConverter::new(config.descriptor),
            config,
            clauses: Vector::new(),
            path: Vector::new(),
            trace: Vec::new(),
            concrete_values: ImHashMap::new(),
            terms: ImHashMap::new(),
            null_checked: HashSet::new(),
            type_checked: HashMap::new(),
            index_checked: HashMap::new(),
            length_checked: HashSet::new(),
            frames: Vec::new(),
            names: NameGenerator::default(),
            call_state: CallState::Idle,
            call_trace: Vec::new(),
            thrown_exception: None,
            aborted: false,
        }
    }

    /// Replaces the rule deciding whether an entered method is the target of a pending call.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Arc<dyn DispatchRule>) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// The program model events are resolved against.
    #[must_use]
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Current phase of the call protocol.
    #[must_use]
    pub fn phase(&self) -> TranslatorPhase {
        if matches!(self.call_state, CallState::Pending(_)) {
            TranslatorPhase::PendingCall
        } else if !self.call_trace.is_empty() {
            TranslatorPhase::Suppressed
        } else {
            TranslatorPhase::Idle
        }
    }

    /// Returns `true` once a fatal failure stopped the translation.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Number of active frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The instructions translated so far, in execution order.
    #[must_use]
    pub fn instruction_trace(&self) -> &[Arc<Instruction>] {
        &self.trace
    }

    /// Builds the current state.
    ///
    /// A pending call is included as if it had been flushed; the translator itself is left
    /// untouched.
    #[must_use]
    pub fn state(&self) -> SymbolicState {
        let mut clauses = self.clauses.clone();
        if let CallState::Pending(call) = &self.call_state {
            clauses.push_back(Clause::State(StateClause {
                instruction: call.instruction.clone(),
                predicate: call.predicate.clone(),
            }));
        }
        SymbolicState {
            clauses: ClauseState::from(clauses),
            path: PathCondition::from(self.path.clone()),
            concrete_values: self.concrete_values.clone(),
            term_map: self.terms.clone(),
        }
    }

    /// Runs an event body, wrapping its failure and aborting on fatal ones.
    fn safe_call<F>(&mut self, event: &'static str, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if self.aborted {
            return Err(Error::Translation {
                event,
                source: Box::new(Error::Aborted),
            });
        }

        match body(self) {
            Ok(()) => Ok(()),
            Err(error) => {
                if error.is_fatal() {
                    log::error!("Aborting symbolic trace translation in `{event}`: {error}");
                    self.aborted = true;
                } else {
                    log::warn!("Could not translate `{event}` event: {error}");
                }
                Err(Error::Translation {
                    event,
                    source: Box::new(error),
                })
            }
        }
    }

    // Call protocol

    /// Common prologue of every event but method entry and catch.
    ///
    /// # Returns
    ///
    /// `true` if the event must be translated, `false` inside a suppressed region.
    fn begin(&mut self, name: &str) -> Result<bool> {
        self.pre_check(name)?;
        self.flush_call();
        Ok(self.collecting())
    }

    fn collecting(&self) -> bool {
        self.call_trace.is_empty()
    }

    /// Call-trace bookkeeping for the event naming `name`.
    fn pre_check(&mut self, name: &str) -> Result<()> {
        let Some(top) = self.call_trace.last() else {
            return Ok(());
        };
        let Some(current) = self.find_instruction(name) else {
            return Ok(());
        };

        if current == top.call {
            let again = top.clone();
            self.call_trace.push(again);
        } else if current == top.next {
            self.call_trace.pop();
        } else if current.is_return() {
            let frame = self
                .frames
                .last()
                .ok_or_else(|| unreachable_error!("Return {} with an empty frame stack", current))?;
            if frame.method != *current.method() {
                return Err(unreachable_error!(
                    "Return {} does not belong to the active method {}",
                    current,
                    frame.method
                ));
            }
            self.frames.pop();
        }
        Ok(())
    }

    /// Appends the predicate of the pending call, if any, to the clauses.
    fn flush_call(&mut self) {
        if let CallState::Pending(call) = mem::take(&mut self.call_state) {
            self.clauses.push_back(Clause::State(StateClause {
                instruction: call.instruction,
                predicate: call.predicate,
            }));
        }
    }

    // Resolution

    fn frame(&self) -> Result<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| unreachable_error!("No active frame"))
    }

    fn frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| unreachable_error!("No active frame"))
    }

    fn method(&self) -> Result<Arc<Method>> {
        Ok(self.frame()?.method.clone())
    }

    fn resolve_value(&self, name: &str) -> Result<Value> {
        let frame = self.frame()?;
        self.program.body(&frame.method)?.resolve_value(name)
    }

    fn find_instruction(&self, name: &str) -> Option<Arc<Instruction>> {
        let frame = self.frames.last()?;
        self.program.body(&frame.method).ok()?.find_instruction(name)
    }

    /// Resolves `name` to an instruction accepted by `accepts`.
    fn instruction(
        &self,
        name: &str,
        expected: &'static str,
        accepts: impl Fn(&InstKind) -> bool,
    ) -> Result<Arc<Instruction>> {
        let frame = self.frame()?;
        let instruction = self.program.body(&frame.method)?.resolve_instruction(name)?;
        if accepts(instruction.kind()) {
            Ok(instruction)
        } else {
            Err(Error::UnexpectedInstruction {
                name: name.to_string(),
                expected,
            })
        }
    }

    fn result_of(instruction: &Instruction) -> Result<Value> {
        instruction
            .result()
            .cloned()
            .ok_or_else(|| malformed_error!("Instruction {} produces no value", instruction))
    }

    // Terms

    fn fresh_term(&mut self, value: &Value) -> Term {
        match value {
            Value::This(ty) => Term::this(ty.clone()),
            Value::Argument { index, ty } => Term::argument(ty.clone(), *index),
            Value::Constant(constant) => Term::constant(constant),
            Value::Local { name, ty } => Term::value(ty.clone(), self.names.next(name)),
        }
    }

    /// The term bound to `value`, binding a new one on first use.
    fn mk_value(&mut self, value: &Value) -> Result<Term> {
        if let Some(term) = self.frame()?.values.get(value) {
            return Ok(term.clone());
        }
        let term = self.fresh_term(value);
        self.frame_mut()?.values.insert(value.clone(), term.clone());
        Ok(term)
    }

    /// Binds a new term to `value`.
    fn mk_new_value(&mut self, value: &Value) -> Result<Term> {
        let term = self.fresh_term(value);
        self.frame_mut()?.values.insert(value.clone(), term.clone());
        Ok(term)
    }

    /// Records which value of which method `term` stands for, unless already known.
    fn record_origin(&mut self, term: &Term, method: Arc<Method>, value: &Value) {
        if !self.terms.contains_key(term) {
            self.terms.insert(term.clone(), WrappedValue {
                method,
                value: value.clone(),
            });
        }
    }

    /// Records the concrete value of `term`, unless already known.
    fn record_concrete(&mut self, term: &Term, concrete: &RuntimeValue) {
        if !self.concrete_values.contains_key(term) {
            let descriptor = self.converter.convert_as(concrete, term.ty());
            self.concrete_values.insert(term.clone(), descriptor);
        }
    }

    /// Records origin and concrete value of an operand or result of the active method.
    fn update_info(&mut self, term: &Term, value: &Value, concrete: &RuntimeValue) -> Result<()> {
        let method = self.method()?;
        self.record_origin(term, method, value);
        self.record_concrete(term, concrete);
        Ok(())
    }

    // Output

    fn state_builder(instruction: &Instruction) -> PredicateBuilder {
        PredicateBuilder::state(instruction.location().clone())
    }

    fn path_builder(instruction: &Instruction) -> PredicateBuilder {
        PredicateBuilder::path(instruction.location().clone())
    }

    /// Appends a clause, records its instruction and refreshes the catch snapshots.
    fn post_process(&mut self, clause: Clause) -> Result<()> {
        let instruction = clause.instruction().clone();
        self.clauses.push_back(clause);
        self.trace.push(instruction.clone());
        self.update_catches(&instruction)
    }

    fn post_state(&mut self, instruction: &Arc<Instruction>, predicate: Predicate) -> Result<()> {
        self.post_process(Clause::State(StateClause {
            instruction: instruction.clone(),
            predicate,
        }))
    }

    /// Appends a path clause to the path.
    ///
    /// Control flow decisions also move the frame to the deciding block, so that phis of the
    /// successor resolve against it.
    fn process_path(&mut self, clause: PathClause, control_flow: bool) -> Result<()> {
        if control_flow {
            self.frame_mut()?.previous_block = clause.instruction.block();
        }
        self.path.push_back(clause);
        Ok(())
    }

    /// Replaces the catch snapshots of the active frame with the handlers covering
    /// `instruction`'s block.
    fn update_catches(&mut self, instruction: &Instruction) -> Result<()> {
        let program = Arc::clone(&self.program);
        let block = program
            .body(instruction.method())?
            .block(instruction.block())
            .ok_or_else(|| unreachable_error!("Instruction {} has no block", instruction))?;

        let frame = self.frame_mut()?;
        frame.catch_map.clear();
        for handler in &block.handlers {
            frame.catch_map.insert(handler.clone(), frame.values.clone());
        }
        Ok(())
    }

    /// Unwinds to the innermost frame with a handler for `thrown` and restores its snapshot.
    fn restore_catch_frame(&mut self, thrown: &SymType) -> Result<()> {
        let program = Arc::clone(&self.program);
        let hierarchy = program.hierarchy();

        while let Some(frame) = self.frames.last() {
            let candidates: Vec<&SymType> = frame
                .catch_map
                .keys()
                .filter(|handler| hierarchy.is_subtype_of(thrown, handler))
                .collect();
            let chosen = candidates
                .iter()
                .find(|candidate| {
                    candidates
                        .iter()
                        .all(|other| hierarchy.is_subtype_of(candidate, other))
                })
                .map(|candidate| (*candidate).clone());

            let ends_call = self
                .call_trace
                .last()
                .is_some_and(|top| self.dispatch.overrides(hierarchy, &frame.method, top.call.method()));
            if ends_call {
                self.call_trace.pop();
            }

            if let Some(handler) = chosen {
                let frame = self.frame_mut()?;
                if let Some(snapshot) = frame.catch_map.get(&handler).cloned() {
                    frame.values = snapshot;
                }
                return Ok(());
            }
            self.frames.pop();
        }

        Err(unreachable_error!(
            "Could not find a catch block for exception type {}",
            thrown
        ))
    }
}

impl fmt::Debug for SymbolicTraceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolicTraceBuilder")
            .field("phase", &self.phase())
            .field("depth", &self.frames.len())
            .field("clauses", &self.clauses.len())
            .field("path", &self.path.len())
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}
