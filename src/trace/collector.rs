//! The event interface and the per-thread collector registry.
//!
//! Instrumented code reports every executed instruction to the collector of its thread. The
//! [`InstructionTraceCollector`] trait is that event interface: one method per event kind,
//! identifiers passed as the strings the instrumentation knows them by, concrete operands
//! passed as [`RuntimeValue`]s (with [`RuntimeValue::Null`] standing for absent values).
//!
//! [`CollectorRegistry`] maps each observed thread to its collector. Entries are only ever
//! used by their own thread, so each sits behind an uncontended mutex.

use std::{
    sync::{Arc, Mutex, OnceLock},
    thread::{self, ThreadId},
};

use dashmap::DashMap;

use crate::{descriptor::RuntimeValue, trace::SymbolicState, Result};

/// Consumer of instruction events.
///
/// Every method returns [`crate::Error::Translation`] on failure, wrapping the cause.
/// Parameter names follow one convention: a plain name (`value`, `operand`, `index`, ...)
/// is an identifier, the `concrete_` prefixed counterpart is its runtime value, and `inst`
/// names an instruction without a result.
pub trait InstructionTraceCollector: Send {
    /// A method was entered.
    ///
    /// # Arguments
    ///
    /// * `class` - Owner class of the entered method
    /// * `method` - Method name
    /// * `arg_types` - Parameter types as descriptors or source names
    /// * `ret_type` - Return type as a descriptor or source name
    /// * `instance` - The receiver, `None` for static methods
    /// * `args` - Argument values in parameter order
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn method_enter(
        &mut self,
        class: &str,
        method: &str,
        arg_types: &[&str],
        ret_type: &str,
        instance: Option<&RuntimeValue>,
        args: &[RuntimeValue],
    ) -> Result<()>;

    /// `value = array_ref[index]`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn array_load(
        &mut self,
        value: &str,
        array_ref: &str,
        index: &str,
        concrete_value: &RuntimeValue,
        concrete_ref: &RuntimeValue,
        concrete_index: &RuntimeValue,
    ) -> Result<()>;

    /// `array_ref[index] = value`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn array_store(
        &mut self,
        inst: &str,
        array_ref: &str,
        index: &str,
        value: &str,
        concrete_ref: &RuntimeValue,
        concrete_index: &RuntimeValue,
        concrete_value: &RuntimeValue,
    ) -> Result<()>;

    /// `value = lhv op rhv`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn binary(
        &mut self,
        value: &str,
        lhv: &str,
        rhv: &str,
        concrete_value: &RuntimeValue,
        concrete_lhv: &RuntimeValue,
        concrete_rhv: &RuntimeValue,
    ) -> Result<()>;

    /// Conditional branch on `condition`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated, in particular
    /// if no concrete boolean is known for the condition.
    fn branch(&mut self, inst: &str, condition: &str) -> Result<()>;

    /// A method call is about to be executed.
    ///
    /// # Arguments
    ///
    /// * `inst` - The call instruction
    /// * `class`, `method`, `arg_types`, `ret_type` - The statically resolved target
    /// * `return_value` - Value receiving the result, if any
    /// * `callee` - The receiver value, `None` for static calls
    /// * `arguments` - Argument values
    /// * `concrete_arguments` - Runtime values of the arguments
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn call(
        &mut self,
        inst: &str,
        class: &str,
        method: &str,
        arg_types: &[&str],
        ret_type: &str,
        return_value: Option<&str>,
        callee: Option<&str>,
        arguments: &[&str],
        concrete_arguments: &[RuntimeValue],
    ) -> Result<()>;

    /// `value = (T) operand`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn cast(
        &mut self,
        value: &str,
        operand: &str,
        concrete_value: &RuntimeValue,
        concrete_operand: &RuntimeValue,
    ) -> Result<()>;

    /// An exception handler was entered with `concrete_exception`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated; running out
    /// of frames while looking for the handler is fatal.
    fn catch(&mut self, exception: &str, concrete_exception: &RuntimeValue) -> Result<()>;

    /// `value = lhv cmp rhv`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn cmp(
        &mut self,
        value: &str,
        lhv: &str,
        rhv: &str,
        concrete_lhv: &RuntimeValue,
        concrete_rhv: &RuntimeValue,
    ) -> Result<()>;

    /// `monitorenter operand`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn enter_monitor(&mut self, inst: &str, operand: &str, concrete_operand: &RuntimeValue) -> Result<()>;

    /// `monitorexit operand`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn exit_monitor(&mut self, inst: &str, operand: &str, concrete_operand: &RuntimeValue) -> Result<()>;

    /// `value = owner.field` or, without owner, `value = class.field`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn field_load(
        &mut self,
        value: &str,
        owner: Option<&str>,
        class: &str,
        field: &str,
        ty: &str,
        concrete_value: &RuntimeValue,
        concrete_owner: &RuntimeValue,
    ) -> Result<()>;

    /// `owner.field = value` or, without owner, `class.field = value`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn field_store(
        &mut self,
        inst: &str,
        owner: Option<&str>,
        class: &str,
        field: &str,
        ty: &str,
        value: &str,
        concrete_value: &RuntimeValue,
        concrete_owner: &RuntimeValue,
    ) -> Result<()>;

    /// `value = operand instanceof T`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn instance_of(
        &mut self,
        value: &str,
        operand: &str,
        concrete_value: &RuntimeValue,
        concrete_operand: &RuntimeValue,
    ) -> Result<()>;

    /// `invokedynamic` producing the lambda `value` over the captured `operands`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn invoke_dynamic(
        &mut self,
        value: &str,
        operands: &[&str],
        concrete_value: &RuntimeValue,
        concrete_operands: &[RuntimeValue],
    ) -> Result<()>;

    /// Unconditional jump.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn jump(&mut self, inst: &str) -> Result<()>;

    /// `value = new T[dimensions..]`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn new_array(
        &mut self,
        value: &str,
        dimensions: &[&str],
        concrete_value: &RuntimeValue,
        concrete_dimensions: &[RuntimeValue],
    ) -> Result<()>;

    /// `value = new T`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn new(&mut self, value: &str) -> Result<()>;

    /// SSA phi `value`, resolved against the previously executed block.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn phi(&mut self, value: &str, concrete_value: &RuntimeValue) -> Result<()>;

    /// Method return, with the returned value if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn ret(&mut self, inst: &str, return_value: Option<&str>, concrete_value: &RuntimeValue) -> Result<()>;

    /// `lookupswitch` on `value`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn switch(&mut self, inst: &str, value: &str, concrete_value: &RuntimeValue) -> Result<()>;

    /// `tableswitch` on `value`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn table_switch(&mut self, inst: &str, value: &str, concrete_value: &RuntimeValue) -> Result<()>;

    /// `athrow exception`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn throwing(&mut self, inst: &str, exception: &str, concrete_exception: &RuntimeValue) -> Result<()>;

    /// `value = op operand`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn unary(
        &mut self,
        value: &str,
        operand: &str,
        concrete_value: &RuntimeValue,
        concrete_operand: &RuntimeValue,
    ) -> Result<()>;

    /// Guards `value` against `null` before `inst` dereferences it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn add_nullity_constraints(&mut self, inst: &str, value: &str, concrete_value: &RuntimeValue) -> Result<()>;

    /// Fixes the runtime type of `value` before `inst` dispatches on it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn add_type_constraints(&mut self, inst: &str, value: &str, concrete_value: &RuntimeValue) -> Result<()>;

    /// Records whether `value` is an instance of the expected type `ty` at `inst`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn add_expected_type_constraints(
        &mut self,
        inst: &str,
        value: &str,
        ty: &str,
        concrete_value: &RuntimeValue,
    ) -> Result<()>;

    /// Guards `array[index]` against out-of-bounds access at `inst`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn add_array_index_constraints(
        &mut self,
        inst: &str,
        array: &str,
        index: &str,
        concrete_array: &RuntimeValue,
        concrete_index: &RuntimeValue,
    ) -> Result<()>;

    /// Guards the requested array `length` at `inst`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Translation`] if the event cannot be translated.
    fn add_array_length_constraints(&mut self, inst: &str, length: &str, concrete_length: &RuntimeValue) -> Result<()>;

    /// The symbolic state built so far.
    fn symbolic_state(&self) -> SymbolicState;
}

/// Collector that ignores every event.
///
/// Installed for threads whose events must not be traced.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCollector;

impl InstructionTraceCollector for NoopCollector {
    fn method_enter(&mut self, _: &str, _: &str, _: &[&str], _: &str, _: Option<&RuntimeValue>, _: &[RuntimeValue]) -> Result<()> {
        Ok(())
    }

    fn array_load(&mut self, _: &str, _: &str, _: &str, _: &RuntimeValue, _: &RuntimeValue, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn array_store(
        &mut self,
        _: &str,
        _: &str,
        _: &str,
        _: &str,
        _: &RuntimeValue,
        _: &RuntimeValue,
        _: &RuntimeValue,
    ) -> Result<()> {
        Ok(())
    }

    fn binary(&mut self, _: &str, _: &str, _: &str, _: &RuntimeValue, _: &RuntimeValue, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn branch(&mut self, _: &str, _: &str) -> Result<()> {
        Ok(())
    }

    fn call(
        &mut self,
        _: &str,
        _: &str,
        _: &str,
        _: &[&str],
        _: &str,
        _: Option<&str>,
        _: Option<&str>,
        _: &[&str],
        _: &[RuntimeValue],
    ) -> Result<()> {
        Ok(())
    }

    fn cast(&mut self, _: &str, _: &str, _: &RuntimeValue, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn catch(&mut self, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn cmp(&mut self, _: &str, _: &str, _: &str, _: &RuntimeValue, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn enter_monitor(&mut self, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn exit_monitor(&mut self, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn field_load(
        &mut self,
        _: &str,
        _: Option<&str>,
        _: &str,
        _: &str,
        _: &str,
        _: &RuntimeValue,
        _: &RuntimeValue,
    ) -> Result<()> {
        Ok(())
    }

    fn field_store(
        &mut self,
        _: &str,
        _: Option<&str>,
        _: &str,
        _: &str,
        _: &str,
        _: &str,
        _: &RuntimeValue,
        _: &RuntimeValue,
    ) -> Result<()> {
        Ok(())
    }

    fn instance_of(&mut self, _: &str, _: &str, _: &RuntimeValue, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn invoke_dynamic(&mut self, _: &str, _: &[&str], _: &RuntimeValue, _: &[RuntimeValue]) -> Result<()> {
        Ok(())
    }

    fn jump(&mut self, _: &str) -> Result<()> {
        Ok(())
    }

    fn new_array(&mut self, _: &str, _: &[&str], _: &RuntimeValue, _: &[RuntimeValue]) -> Result<()> {
        Ok(())
    }

    fn new(&mut self, _: &str) -> Result<()> {
        Ok(())
    }

    fn phi(&mut self, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn ret(&mut self, _: &str, _: Option<&str>, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn switch(&mut self, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn table_switch(&mut self, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn throwing(&mut self, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn unary(&mut self, _: &str, _: &str, _: &RuntimeValue, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn add_nullity_constraints(&mut self, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn add_type_constraints(&mut self, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn add_expected_type_constraints(&mut self, _: &str, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn add_array_index_constraints(&mut self, _: &str, _: &str, _: &str, _: &RuntimeValue, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn add_array_length_constraints(&mut self, _: &str, _: &str, _: &RuntimeValue) -> Result<()> {
        Ok(())
    }

    fn symbolic_state(&self) -> SymbolicState {
        SymbolicState::default()
    }
}

/// A collector shared between the registry and its thread.
pub type SharedCollector = Arc<Mutex<Box<dyn InstructionTraceCollector>>>;

/// Map from observed thread to its collector.
///
/// A registry can be created and owned by the embedding application, or the process-wide
/// instance returned by [`CollectorRegistry::global`] can be used.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: DashMap<ThreadId, SharedCollector>,
}

impl CollectorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static CollectorRegistry {
        static GLOBAL: OnceLock<CollectorRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CollectorRegistry::new)
    }

    /// Installs `collector` for the calling thread, replacing any previous one.
    ///
    /// # Returns
    ///
    /// The shared handle of the installed collector.
    pub fn register(&self, collector: Box<dyn InstructionTraceCollector>) -> SharedCollector {
        let shared: SharedCollector = Arc::new(Mutex::new(collector));
        self.collectors.insert(thread::current().id(), shared.clone());
        shared
    }

    /// The collector of the calling thread.
    ///
    /// Threads without a registered collector get a [`NoopCollector`], which is registered
    /// on first use.
    pub fn current(&self) -> SharedCollector {
        self.collectors
            .entry(thread::current().id())
            .or_insert_with(|| Arc::new(Mutex::new(Box::new(NoopCollector))))
            .clone()
    }

    /// Replaces the collector of the calling thread with a [`NoopCollector`].
    ///
    /// # Returns
    ///
    /// The detached collector, if one was registered.
    pub fn detach_current(&self) -> Option<SharedCollector> {
        let noop: SharedCollector = Arc::new(Mutex::new(Box::new(NoopCollector)));
        self.collectors.insert(thread::current().id(), noop)
    }

    /// Runs `f` on the collector of the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the collector's mutex is poisoned.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut dyn InstructionTraceCollector) -> R) -> Result<R> {
        let shared = self.current();
        let result = with_lock!(shared, |collector: &mut Box<dyn InstructionTraceCollector>| f(collector.as_mut()));
        result
    }

    /// The symbolic state of the calling thread's collector.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the collector's mutex is poisoned.
    pub fn current_state(&self) -> Result<SymbolicState> {
        let shared = self.current();
        let collector = lock!(shared)?;
        Ok(collector.symbolic_state())
    }

    /// Number of threads with a registered collector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    /// Returns `true` if no thread has a registered collector.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}
