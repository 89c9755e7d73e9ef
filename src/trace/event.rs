//! Recorded events.
//!
//! A [`TraceEvent`] is the owned, serializable form of one call on
//! [`InstructionTraceCollector`]. Recorded traces can be stored as JSON and replayed later,
//! against any collector, or translated in bulk with [`replay_all`].

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    config::TranslatorConfig,
    descriptor::RuntimeValue,
    program::Program,
    trace::{InstructionTraceCollector, SymbolicState, SymbolicTraceBuilder},
    Result,
};

/// One instruction event with owned arguments.
///
/// Field names match the parameters of the corresponding [`InstructionTraceCollector`]
/// method.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, IntoStaticStr, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TraceEvent {
    MethodEnter {
        class: String,
        method: String,
        arg_types: Vec<String>,
        ret_type: String,
        instance: Option<RuntimeValue>,
        args: Vec<RuntimeValue>,
    },
    ArrayLoad {
        value: String,
        array_ref: String,
        index: String,
        concrete_value: RuntimeValue,
        concrete_ref: RuntimeValue,
        concrete_index: RuntimeValue,
    },
    ArrayStore {
        inst: String,
        array_ref: String,
        index: String,
        value: String,
        concrete_ref: RuntimeValue,
        concrete_index: RuntimeValue,
        concrete_value: RuntimeValue,
    },
    Binary {
        value: String,
        lhv: String,
        rhv: String,
        concrete_value: RuntimeValue,
        concrete_lhv: RuntimeValue,
        concrete_rhv: RuntimeValue,
    },
    Branch {
        inst: String,
        condition: String,
    },
    Call {
        inst: String,
        class: String,
        method: String,
        arg_types: Vec<String>,
        ret_type: String,
        return_value: Option<String>,
        callee: Option<String>,
        arguments: Vec<String>,
        concrete_arguments: Vec<RuntimeValue>,
    },
    Cast {
        value: String,
        operand: String,
        concrete_value: RuntimeValue,
        concrete_operand: RuntimeValue,
    },
    Catch {
        exception: String,
        concrete_exception: RuntimeValue,
    },
    Cmp {
        value: String,
        lhv: String,
        rhv: String,
        concrete_lhv: RuntimeValue,
        concrete_rhv: RuntimeValue,
    },
    EnterMonitor {
        inst: String,
        operand: String,
        concrete_operand: RuntimeValue,
    },
    ExitMonitor {
        inst: String,
        operand: String,
        concrete_operand: RuntimeValue,
    },
    FieldLoad {
        value: String,
        owner: Option<String>,
        class: String,
        field: String,
        ty: String,
        concrete_value: RuntimeValue,
        concrete_owner: RuntimeValue,
    },
    FieldStore {
        inst: String,
        owner: Option<String>,
        class: String,
        field: String,
        ty: String,
        value: String,
        concrete_value: RuntimeValue,
        concrete_owner: RuntimeValue,
    },
    InstanceOf {
        value: String,
        operand: String,
        concrete_value: RuntimeValue,
        concrete_operand: RuntimeValue,
    },
    InvokeDynamic {
        value: String,
        operands: Vec<String>,
        concrete_value: RuntimeValue,
        concrete_operands: Vec<RuntimeValue>,
    },
    Jump {
        inst: String,
    },
    NewArray {
        value: String,
        dimensions: Vec<String>,
        concrete_value: RuntimeValue,
        concrete_dimensions: Vec<RuntimeValue>,
    },
    New {
        value: String,
    },
    Phi {
        value: String,
        concrete_value: RuntimeValue,
    },
    Ret {
        inst: String,
        return_value: Option<String>,
        concrete_value: RuntimeValue,
    },
    Switch {
        inst: String,
        value: String,
        concrete_value: RuntimeValue,
    },
    TableSwitch {
        inst: String,
        value: String,
        concrete_value: RuntimeValue,
    },
    Throwing {
        inst: String,
        exception: String,
        concrete_exception: RuntimeValue,
    },
    Unary {
        value: String,
        operand: String,
        concrete_value: RuntimeValue,
        concrete_operand: RuntimeValue,
    },
    NullityConstraints {
        inst: String,
        value: String,
        concrete_value: RuntimeValue,
    },
    TypeConstraints {
        inst: String,
        value: String,
        concrete_value: RuntimeValue,
    },
    ExpectedTypeConstraints {
        inst: String,
        value: String,
        ty: String,
        concrete_value: RuntimeValue,
    },
    ArrayIndexConstraints {
        inst: String,
        array: String,
        index: String,
        concrete_array: RuntimeValue,
        concrete_index: RuntimeValue,
    },
    ArrayLengthConstraints {
        inst: String,
        length: String,
        concrete_length: RuntimeValue,
    },
}

fn strs(strings: &[String]) -> Vec<&str> {
    strings.iter().map(String::as_str).collect()
}

impl TraceEvent {
    /// Name of the event kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Delivers the event to `collector`.
    ///
    /// # Errors
    ///
    /// Returns the collector's failure.
    pub fn apply(&self, collector: &mut dyn InstructionTraceCollector) -> Result<()> {
        match self {
            TraceEvent::MethodEnter {
                class,
                method,
                arg_types,
                ret_type,
                instance,
                args,
            } => collector.method_enter(class, method, &strs(arg_types), ret_type, instance.as_ref(), args),
            TraceEvent::ArrayLoad {
                value,
                array_ref,
                index,
                concrete_value,
                concrete_ref,
                concrete_index,
            } => collector.array_load(value, array_ref, index, concrete_value, concrete_ref, concrete_index),
            TraceEvent::ArrayStore {
                inst,
                array_ref,
                index,
                value,
                concrete_ref,
                concrete_index,
                concrete_value,
            } => collector.array_store(
                inst,
                array_ref,
                index,
                value,
                concrete_ref,
                concrete_index,
                concrete_value,
            ),
            TraceEvent::Binary {
                value,
                lhv,
                rhv,
                concrete_value,
                concrete_lhv,
                concrete_rhv,
            } => collector.binary(value, lhv, rhv, concrete_value, concrete_lhv, concrete_rhv),
            TraceEvent::Branch { inst, condition } => collector.branch(inst, condition),
            TraceEvent::Call {
                inst,
                class,
                method,
                arg_types,
                ret_type,
                return_value,
                callee,
                arguments,
                concrete_arguments,
            } => collector.call(
                inst,
                class,
                method,
                &strs(arg_types),
                ret_type,
                return_value.as_deref(),
                callee.as_deref(),
                &strs(arguments),
                concrete_arguments,
            ),
            TraceEvent::Cast {
                value,
                operand,
                concrete_value,
                concrete_operand,
            } => collector.cast(value, operand, concrete_value, concrete_operand),
            TraceEvent::Catch {
                exception,
                concrete_exception,
            } => collector.catch(exception, concrete_exception),
            TraceEvent::Cmp {
                value,
                lhv,
                rhv,
                concrete_lhv,
                concrete_rhv,
            } => collector.cmp(value, lhv, rhv, concrete_lhv, concrete_rhv),
            TraceEvent::EnterMonitor {
                inst,
                operand,
                concrete_operand,
            } => collector.enter_monitor(inst, operand, concrete_operand),
            TraceEvent::ExitMonitor {
                inst,
                operand,
                concrete_operand,
            } => collector.exit_monitor(inst, operand, concrete_operand),
            TraceEvent::FieldLoad {
                value,
                owner,
                class,
                field,
                ty,
                concrete_value,
                concrete_owner,
            } => collector.field_load(
                value,
                owner.as_deref(),
                class,
                field,
                ty,
                concrete_value,
                concrete_owner,
            ),
            TraceEvent::FieldStore {
                inst,
                owner,
                class,
                field,
                ty,
                value,
                concrete_value,
                concrete_owner,
            } => collector.field_store(
                inst,
                owner.as_deref(),
                class,
                field,
                ty,
                value,
                concrete_value,
                concrete_owner,
            ),
            TraceEvent::InstanceOf {
                value,
                operand,
                concrete_value,
                concrete_operand,
            } => collector.instance_of(value, operand, concrete_value, concrete_operand),
            TraceEvent::InvokeDynamic {
                value,
                operands,
                concrete_value,
                concrete_operands,
            } => collector.invoke_dynamic(value, &strs(operands), concrete_value, concrete_operands),
            TraceEvent::Jump { inst } => collector.jump(inst),
            TraceEvent::NewArray {
                value,
                dimensions,
                concrete_value,
                concrete_dimensions,
            } => collector.new_array(value, &strs(dimensions), concrete_value, concrete_dimensions),
            TraceEvent::New { value } => collector.new(value),
            TraceEvent::Phi {
                value,
                concrete_value,
            } => collector.phi(value, concrete_value),
            TraceEvent::Ret {
                inst,
                return_value,
                concrete_value,
            } => collector.ret(inst, return_value.as_deref(), concrete_value),
            TraceEvent::Switch {
                inst,
                value,
                concrete_value,
            } => collector.switch(inst, value, concrete_value),
            TraceEvent::TableSwitch {
                inst,
                value,
                concrete_value,
            } => collector.table_switch(inst, value, concrete_value),
            TraceEvent::Throwing {
                inst,
                exception,
                concrete_exception,
            } => collector.throwing(inst, exception, concrete_exception),
            TraceEvent::Unary {
                value,
                operand,
                concrete_value,
                concrete_operand,
            } => collector.unary(value, operand, concrete_value, concrete_operand),
            TraceEvent::NullityConstraints {
                inst,
                value,
                concrete_value,
            } => collector.add_nullity_constraints(inst, value, concrete_value),
            TraceEvent::TypeConstraints {
                inst,
                value,
                concrete_value,
            } => collector.add_type_constraints(inst, value, concrete_value),
            TraceEvent::ExpectedTypeConstraints {
                inst,
                value,
                ty,
                concrete_value,
            } => collector.add_expected_type_constraints(inst, value, ty, concrete_value),
            TraceEvent::ArrayIndexConstraints {
                inst,
                array,
                index,
                concrete_array,
                concrete_index,
            } => collector.add_array_index_constraints(inst, array, index, concrete_array, concrete_index),
            TraceEvent::ArrayLengthConstraints {
                inst,
                length,
                concrete_length,
            } => collector.add_array_length_constraints(inst, length, concrete_length),
        }
    }
}

/// Translates a recorded trace with a fresh translator.
///
/// Events failing with a recoverable error are skipped, as they would be in a live
/// translation.
///
/// # Arguments
///
/// * `program` - The program model the trace was recorded on
/// * `config` - Translator configuration
/// * `events` - The recorded events, in execution order
///
/// # Errors
///
/// Returns the first fatal failure. Translation stops there.
pub fn replay(program: Arc<Program>, config: TranslatorConfig, events: &[TraceEvent]) -> Result<SymbolicState> {
    let mut translator = SymbolicTraceBuilder::with_config(program, config);
    for event in events {
        if let Err(error) = event.apply(&mut translator) {
            if error.is_fatal() {
                return Err(error);
            }
        }
    }
    Ok(translator.symbolic_state())
}

/// Translates independent recorded traces in parallel.
///
/// Every trace gets its own translator; results are in input order.
#[must_use]
pub fn replay_all(
    program: &Arc<Program>,
    config: TranslatorConfig,
    traces: &[Vec<TraceEvent>],
) -> Vec<Result<SymbolicState>> {
    traces
        .par_iter()
        .map(|events| replay(Arc::clone(program), config, events))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = TraceEvent::Branch {
            inst: "br".to_string(),
            condition: "%c".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"branch","inst":"br","condition":"%c"}"#);
        assert_eq!(serde_json::from_str::<TraceEvent>(&json).unwrap(), event);
        assert_eq!(event.name(), "branch");
    }

    #[test]
    fn test_apply_forwards_to_collector() {
        let mut noop = crate::trace::NoopCollector;
        let event = TraceEvent::Call {
            inst: "call".to_string(),
            class: "app/Main".to_string(),
            method: "f".to_string(),
            arg_types: vec!["I".to_string()],
            ret_type: "V".to_string(),
            return_value: None,
            callee: None,
            arguments: vec!["arg$0".to_string()],
            concrete_arguments: vec![RuntimeValue::Int(1)],
        };
        assert!(event.apply(&mut noop).is_ok());
        assert_eq!(event.name(), "call");
    }
}
