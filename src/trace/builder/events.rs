//! Event handlers of the translator.

use std::collections::HashMap;

use crate::{
    descriptor::RuntimeValue,
    program::{parameter_values, InstKind},
    term::Term,
    trace::{
        builder::{CallState, PendingCall, SymbolicTraceBuilder},
        frame::{CallFrame, Frame},
        Clause, InstructionTraceCollector, PathClause, PathClauseType, StateClause, SymbolicState,
    },
    transform::{TermRenamer, Transformer},
    types::SymType,
    Result,
};

impl InstructionTraceCollector for SymbolicTraceBuilder {
    fn method_enter(
        &mut self,
        class: &str,
        method: &str,
        arg_types: &[&str],
        ret_type: &str,
        _instance: Option<&RuntimeValue>,
        args: &[RuntimeValue],
    ) -> Result<()> {
        self.safe_call("method_enter", |this| {
            let method = this.program.method(class, method, arg_types, ret_type)?;

            match std::mem::take(&mut this.call_state) {
                CallState::Pending(call) => {
                    if !this
                        .dispatch
                        .overrides(this.program.hierarchy(), &method, &call.method)
                    {
                        // The entered method is not the callee: whatever it is, it runs
                        // inside the call, which stays on the call trace.
                        this.frames.push(Frame::new(method, None));
                        this.call_state = CallState::Pending(call);
                        this.flush_call();
                        return Ok(());
                    }

                    this.frames.push(Frame::new(method.clone(), call.receiver.clone()));
                    this.call_trace.pop();

                    let (this_value, arg_values) = parameter_values(&method);
                    let frame = this.frame_mut()?;
                    if let (Some(value), Some(term)) = (this_value, call.callee) {
                        frame.values.insert(value, term);
                    }
                    for (value, term) in arg_values.into_iter().zip(call.arguments) {
                        frame.values.insert(value, term);
                    }
                    Ok(())
                }
                CallState::Idle => {
                    this.frames.push(Frame::new(method.clone(), None));
                    if !this.collecting() {
                        return Ok(());
                    }

                    let (_, arg_values) = parameter_values(&method);
                    for (value, concrete) in arg_values.iter().zip(args) {
                        let term = this.mk_new_value(value)?;
                        this.update_info(&term, value, concrete)?;
                    }
                    Ok(())
                }
            }
        })
    }

    fn array_load(
        &mut self,
        value: &str,
        array_ref: &str,
        index: &str,
        concrete_value: &RuntimeValue,
        concrete_ref: &RuntimeValue,
        concrete_index: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("array_load", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "array load", |kind| matches!(kind, InstKind::ArrayLoad))?;
            let result = Self::result_of(&inst)?;
            let array_value = this.resolve_value(array_ref)?;
            let index_value = this.resolve_value(index)?;

            let term = this.mk_new_value(&result)?;
            let array = this.mk_value(&array_value)?;
            let idx = this.mk_value(&index_value)?;
            this.update_info(&term, &result, concrete_value)?;
            this.update_info(&array, &array_value, concrete_ref)?;
            this.update_info(&idx, &index_value, concrete_index)?;

            let load = Term::load(&Term::array_index(array, idx)?)?;
            let predicate = Self::state_builder(&inst).equality(term, load);
            this.post_state(&inst, predicate)
        })
    }

    fn array_store(
        &mut self,
        inst: &str,
        array_ref: &str,
        index: &str,
        value: &str,
        concrete_ref: &RuntimeValue,
        concrete_index: &RuntimeValue,
        concrete_value: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("array_store", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction =
                this.instruction(inst, "array store", |kind| matches!(kind, InstKind::ArrayStore))?;
            let array_value = this.resolve_value(array_ref)?;
            let index_value = this.resolve_value(index)?;
            let stored_value = this.resolve_value(value)?;

            let array = this.mk_value(&array_value)?;
            let idx = this.mk_value(&index_value)?;
            let stored = this.mk_value(&stored_value)?;
            this.update_info(&array, &array_value, concrete_ref)?;
            this.update_info(&idx, &index_value, concrete_index)?;
            this.update_info(&stored, &stored_value, concrete_value)?;

            let predicate = Self::state_builder(&instruction).store(Term::array_index(array, idx)?, stored)?;
            this.post_state(&instruction, predicate)
        })
    }

    fn binary(
        &mut self,
        value: &str,
        lhv: &str,
        rhv: &str,
        concrete_value: &RuntimeValue,
        concrete_lhv: &RuntimeValue,
        concrete_rhv: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("binary", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "binary", |kind| matches!(kind, InstKind::Binary(_)))?;
            let InstKind::Binary(op) = *inst.kind() else {
                return Err(unreachable_error!("Binary {} lost its operator", inst));
            };
            let result = Self::result_of(&inst)?;
            let lhv_value = this.resolve_value(lhv)?;
            let rhv_value = this.resolve_value(rhv)?;

            let term = this.mk_new_value(&result)?;
            let lhv_term = this.mk_value(&lhv_value)?;
            let rhv_term = this.mk_value(&rhv_value)?;
            this.update_info(&term, &result, concrete_value)?;
            this.update_info(&lhv_term, &lhv_value, concrete_lhv)?;
            this.update_info(&rhv_term, &rhv_value, concrete_rhv)?;

            let expression = Term::binary(this.program.hierarchy(), op, lhv_term, rhv_term)?;
            let predicate = Self::state_builder(&inst).equality(term, expression);
            this.post_state(&inst, predicate)
        })
    }

    fn branch(&mut self, inst: &str, condition: &str) -> Result<()> {
        self.safe_call("branch", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction = this.instruction(inst, "branch", |kind| matches!(kind, InstKind::Branch))?;
            let condition_value = this.resolve_value(condition)?;
            let term = this.mk_value(&condition_value)?;

            let taken = this
                .concrete_values
                .get(&term)
                .and_then(|descriptor| descriptor.as_bool())
                .ok_or_else(|| unreachable_error!("Unknown boolean value {} in branch {}", term, instruction))?;

            let clause = PathClause {
                ty: PathClauseType::ConditionCheck,
                instruction: instruction.clone(),
                predicate: Self::path_builder(&instruction).equality(term, Term::bool(taken)),
            };
            this.process_path(clause.clone(), true)?;
            this.post_process(Clause::Path(clause))
        })
    }

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
    ) -> Result<()> {
        self.safe_call("call", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction = this.instruction(inst, "call", |kind| matches!(kind, InstKind::Call))?;
            let next = this
                .program
                .body(instruction.method())?
                .next(&instruction)
                .ok_or_else(|| unreachable_error!("Call {} is not followed by an instruction", instruction))?;
            let method = this.program.method(class, method, arg_types, ret_type)?;

            let return_value = return_value.map(|name| this.resolve_value(name)).transpose()?;
            let callee_value = callee.map(|name| this.resolve_value(name)).transpose()?;
            let argument_values = arguments
                .iter()
                .map(|name| this.resolve_value(name))
                .collect::<Result<Vec<_>>>()?;

            let return_term = return_value.as_ref().map(|value| this.mk_new_value(value)).transpose()?;
            let callee_term = callee_value.as_ref().map(|value| this.mk_value(value)).transpose()?;
            let argument_terms = argument_values
                .iter()
                .map(|value| this.mk_value(value))
                .collect::<Result<Vec<_>>>()?;

            let current = this.method()?;
            if let (Some(term), Some(value)) = (&return_term, &return_value) {
                this.record_origin(term, current.clone(), value);
            }
            if let (Some(term), Some(value)) = (&callee_term, &callee_value) {
                this.record_origin(term, current.clone(), value);
            }
            for ((term, value), concrete) in argument_terms.iter().zip(&argument_values).zip(concrete_arguments) {
                this.update_info(term, value, concrete)?;
            }

            let owner = callee_term
                .clone()
                .unwrap_or_else(|| Term::static_ref(&method.class));
            let call_term = Term::call(owner, method.clone(), argument_terms.clone())?;
            let predicate = Self::state_builder(&instruction).call(return_term.clone(), call_term)?;

            this.call_trace.push(CallFrame {
                call: instruction.clone(),
                next,
            });
            this.call_state = CallState::Pending(PendingCall {
                instruction: instruction.clone(),
                method,
                receiver: return_value.zip(return_term),
                callee: callee_term,
                arguments: argument_terms,
                predicate,
            });
            this.trace.push(instruction.clone());
            this.update_catches(&instruction)
        })
    }

    fn cast(
        &mut self,
        value: &str,
        operand: &str,
        concrete_value: &RuntimeValue,
        concrete_operand: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("cast", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "cast", |kind| matches!(kind, InstKind::Cast))?;
            let result = Self::result_of(&inst)?;
            let operand_value = this.resolve_value(operand)?;

            let term = this.mk_new_value(&result)?;
            let operand_term = this.mk_value(&operand_value)?;
            this.update_info(&term, &result, concrete_value)?;
            this.update_info(&operand_term, &operand_value, concrete_operand)?;

            let predicate = Self::state_builder(&inst).equality(term, Term::cast(result.ty(), operand_term)?);
            this.post_state(&inst, predicate)
        })
    }

    fn catch(&mut self, exception: &str, concrete_exception: &RuntimeValue) -> Result<()> {
        self.safe_call("catch", |this| {
            this.flush_call();
            let thrown = concrete_exception
                .runtime_type()
                .ok_or_else(|| malformed_error!("Caught exception `{}` is null", exception))?;
            this.restore_catch_frame(&thrown)?;
            if !this.collecting() {
                return Ok(());
            }

            let inst = this.instruction(exception, "catch", |kind| matches!(kind, InstKind::Catch(_)))?;
            let result = Self::result_of(&inst)?;
            let term = match this.thrown_exception.take() {
                Some(term) => {
                    this.frame_mut()?.values.insert(result.clone(), term.clone());
                    term
                }
                None => this.mk_new_value(&result)?,
            };
            this.update_info(&term, &result, concrete_exception)?;

            let predicate = Self::state_builder(&inst).catch(term);
            this.post_state(&inst, predicate)
        })
    }

    fn cmp(
        &mut self,
        value: &str,
        lhv: &str,
        rhv: &str,
        concrete_lhv: &RuntimeValue,
        concrete_rhv: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("cmp", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "cmp", |kind| matches!(kind, InstKind::Cmp(_)))?;
            let InstKind::Cmp(op) = *inst.kind() else {
                return Err(unreachable_error!("Cmp {} lost its operator", inst));
            };
            let result = Self::result_of(&inst)?;
            let lhv_value = this.resolve_value(lhv)?;
            let rhv_value = this.resolve_value(rhv)?;

            let term = this.mk_new_value(&result)?;
            let lhv_term = this.mk_value(&lhv_value)?;
            let rhv_term = this.mk_value(&rhv_value)?;
            match concrete_lhv.compare(op, concrete_rhv) {
                Ok(concrete) => this.update_info(&term, &result, &concrete)?,
                Err(error) => {
                    log::debug!("No concrete result for {}: {}", inst, error);
                    let method = this.method()?;
                    this.record_origin(&term, method, &result);
                }
            }
            this.update_info(&lhv_term, &lhv_value, concrete_lhv)?;
            this.update_info(&rhv_term, &rhv_value, concrete_rhv)?;

            let predicate = Self::state_builder(&inst).equality(term, Term::cmp(op, lhv_term, rhv_term)?);
            this.post_state(&inst, predicate)
        })
    }

    fn enter_monitor(&mut self, inst: &str, operand: &str, concrete_operand: &RuntimeValue) -> Result<()> {
        self.safe_call("enter_monitor", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction =
                this.instruction(inst, "monitor enter", |kind| matches!(kind, InstKind::EnterMonitor))?;
            let operand_value = this.resolve_value(operand)?;
            let monitor = this.mk_value(&operand_value)?;
            this.update_info(&monitor, &operand_value, concrete_operand)?;

            let predicate = Self::state_builder(&instruction).enter_monitor(monitor);
            this.post_state(&instruction, predicate)
        })
    }

    fn exit_monitor(&mut self, inst: &str, operand: &str, concrete_operand: &RuntimeValue) -> Result<()> {
        self.safe_call("exit_monitor", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction =
                this.instruction(inst, "monitor exit", |kind| matches!(kind, InstKind::ExitMonitor))?;
            let operand_value = this.resolve_value(operand)?;
            let monitor = this.mk_value(&operand_value)?;
            this.update_info(&monitor, &operand_value, concrete_operand)?;

            let predicate = Self::state_builder(&instruction).exit_monitor(monitor);
            this.post_state(&instruction, predicate)
        })
    }

    fn field_load(
        &mut self,
        value: &str,
        owner: Option<&str>,
        class: &str,
        field: &str,
        ty: &str,
        concrete_value: &RuntimeValue,
        concrete_owner: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("field_load", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "field load", |kind| matches!(kind, InstKind::FieldLoad))?;
            let result = Self::result_of(&inst)?;
            let field = this.program.field(class, field, ty)?;
            let owner_value = owner.map(|name| this.resolve_value(name)).transpose()?;

            let term = this.mk_new_value(&result)?;
            this.update_info(&term, &result, concrete_value)?;
            let owner_term = match &owner_value {
                Some(value) => {
                    let term = this.mk_value(value)?;
                    this.update_info(&term, value, concrete_owner)?;
                    term
                }
                None => Term::static_ref(&field.class),
            };

            let load = Term::field_load(Term::field(owner_term, field.ty.clone(), field.name.as_str())?)?;
            let predicate = Self::state_builder(&inst).equality(term, load);
            this.post_state(&inst, predicate)
        })
    }

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
    ) -> Result<()> {
        self.safe_call("field_store", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction =
                this.instruction(inst, "field store", |kind| matches!(kind, InstKind::FieldStore))?;
            let field = this.program.field(class, field, ty)?;
            let stored_value = this.resolve_value(value)?;
            let owner_value = owner.map(|name| this.resolve_value(name)).transpose()?;

            let stored = this.mk_value(&stored_value)?;
            this.update_info(&stored, &stored_value, concrete_value)?;
            let owner_term = match &owner_value {
                Some(value) => {
                    let term = this.mk_value(value)?;
                    this.update_info(&term, value, concrete_owner)?;
                    term
                }
                None => Term::static_ref(&field.class),
            };

            let target = Term::field(owner_term, field.ty.clone(), field.name.as_str())?;
            let predicate = Self::state_builder(&instruction).store(target, stored)?;
            this.post_state(&instruction, predicate)
        })
    }

    fn instance_of(
        &mut self,
        value: &str,
        operand: &str,
        concrete_value: &RuntimeValue,
        concrete_operand: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("instance_of", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "instanceof", |kind| matches!(kind, InstKind::InstanceOf(_)))?;
            let InstKind::InstanceOf(checked) = inst.kind().clone() else {
                return Err(unreachable_error!("Instanceof {} lost its type", inst));
            };
            let result = Self::result_of(&inst)?;
            let operand_value = this.resolve_value(operand)?;

            let term = this.mk_new_value(&result)?;
            let operand_term = this.mk_value(&operand_value)?;
            this.update_info(&term, &result, concrete_value)?;
            this.update_info(&operand_term, &operand_value, concrete_operand)?;

            let predicate = Self::state_builder(&inst).equality(term, Term::instance_of(operand_term, checked)?);
            this.post_state(&inst, predicate)
        })
    }

    fn invoke_dynamic(
        &mut self,
        value: &str,
        operands: &[&str],
        concrete_value: &RuntimeValue,
        concrete_operands: &[RuntimeValue],
    ) -> Result<()> {
        self.safe_call("invoke_dynamic", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "invokedynamic", |kind| {
                matches!(kind, InstKind::InvokeDynamic(_))
            })?;
            let InstKind::InvokeDynamic(base) = inst.kind().clone() else {
                return Err(unreachable_error!("Invokedynamic {} lost its lambda base", inst));
            };
            let result = Self::result_of(&inst)?;
            let operand_values = operands
                .iter()
                .map(|name| this.resolve_value(name))
                .collect::<Result<Vec<_>>>()?;

            let term = this.mk_new_value(&result)?;
            this.update_info(&term, &result, concrete_value)?;
            for (value, concrete) in operand_values.iter().zip(concrete_operands) {
                let operand = this.mk_value(value)?;
                this.update_info(&operand, value, concrete)?;
            }

            let Some(body) = &base.body else {
                log::error!(
                    "Could not process {}: lambda base {} has no body expression",
                    inst,
                    base.method
                );
                return Ok(());
            };

            let lambda_name = &base.method.name;
            let arg_types = &base.method.desc.args;
            let parameters: Vec<Term> = arg_types
                .iter()
                .enumerate()
                .map(|(index, ty)| Term::value(ty.clone(), format!("lambda_{lambda_name}_{index}")))
                .collect();
            let mapping: HashMap<Term, Term> = arg_types
                .iter()
                .enumerate()
                .map(|(index, ty)| Term::argument(ty.clone(), index))
                .zip(parameters.iter().cloned())
                .collect();
            let mut renamer = TermRenamer::new(format!(".lambda.{lambda_name}"), mapping);
            let renamed = renamer.transform(body)?;

            let lambda = Term::lambda(term.ty().clone(), parameters, renamed)?;
            let predicate = Self::state_builder(&inst).equality(term, lambda);
            this.post_state(&inst, predicate)
        })
    }

    fn jump(&mut self, inst: &str) -> Result<()> {
        self.safe_call("jump", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction = this.instruction(inst, "jump", |kind| matches!(kind, InstKind::Jump))?;
            this.frame_mut()?.previous_block = instruction.block();
            this.trace.push(instruction.clone());
            this.update_catches(&instruction)
        })
    }

    fn new_array(
        &mut self,
        value: &str,
        dimensions: &[&str],
        concrete_value: &RuntimeValue,
        concrete_dimensions: &[RuntimeValue],
    ) -> Result<()> {
        self.safe_call("new_array", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "new array", |kind| matches!(kind, InstKind::NewArray))?;
            let result = Self::result_of(&inst)?;
            let dimension_values = dimensions
                .iter()
                .map(|name| this.resolve_value(name))
                .collect::<Result<Vec<_>>>()?;

            let term = this.mk_new_value(&result)?;
            let dimension_terms = dimension_values
                .iter()
                .map(|value| this.mk_value(value))
                .collect::<Result<Vec<_>>>()?;
            this.null_checked.insert(term.clone());
            this.type_checked.insert(term.clone(), result.ty());
            this.update_info(&term, &result, concrete_value)?;
            for ((term, value), concrete) in dimension_terms.iter().zip(&dimension_values).zip(concrete_dimensions) {
                this.update_info(term, value, concrete)?;
            }

            let predicate = Self::state_builder(&inst).new_array(term, dimension_terms);
            this.post_state(&inst, predicate)
        })
    }

    fn new(&mut self, value: &str) -> Result<()> {
        self.safe_call("new", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "new", |kind| matches!(kind, InstKind::New))?;
            let result = Self::result_of(&inst)?;

            let term = this.mk_new_value(&result)?;
            this.null_checked.insert(term.clone());
            this.type_checked.insert(term.clone(), result.ty());
            let method = this.method()?;
            this.record_origin(&term, method, &result);

            let predicate = Self::state_builder(&inst).new_object(term);
            this.post_state(&inst, predicate)
        })
    }

    fn phi(&mut self, value: &str, concrete_value: &RuntimeValue) -> Result<()> {
        self.safe_call("phi", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "phi", |kind| matches!(kind, InstKind::Phi(_)))?;
            let InstKind::Phi(incomings) = inst.kind() else {
                return Err(unreachable_error!("Phi {} lost its incomings", inst));
            };
            let previous = this.frame()?.previous_block;
            let incoming = incomings
                .iter()
                .find(|(block, _)| *block == previous)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| unreachable_error!("Phi {} has no incoming value from block #{}", inst, previous))?;
            let result = Self::result_of(&inst)?;

            let term = this.mk_new_value(&result)?;
            let incoming_term = this.mk_value(&incoming)?;
            this.update_info(&term, &result, concrete_value)?;
            let method = this.method()?;
            this.record_origin(&incoming_term, method, &incoming);

            let predicate = Self::state_builder(&inst).equality(term, incoming_term);
            this.post_state(&inst, predicate)
        })
    }

    fn ret(&mut self, inst: &str, return_value: Option<&str>, concrete_value: &RuntimeValue) -> Result<()> {
        self.safe_call("ret", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction = this.instruction(inst, "return", |kind| matches!(kind, InstKind::Return))?;
            let returned_value = return_value.map(|name| this.resolve_value(name)).transpose()?;
            let returned = returned_value
                .as_ref()
                .map(|value| this.mk_value(value))
                .transpose()?;

            let frame = this
                .frames
                .pop()
                .ok_or_else(|| unreachable_error!("Return {} with an empty frame stack", instruction))?;

            if let (Some(returned), Some((receiver_value, receiver))) = (returned, frame.return_receiver) {
                let caller = this
                    .frames
                    .last()
                    .map_or_else(|| frame.method.clone(), |caller| caller.method.clone());
                this.record_origin(&receiver, caller, &receiver_value);
                this.record_concrete(&receiver, concrete_value);
                this.clauses.push_back(Clause::State(StateClause {
                    instruction: instruction.clone(),
                    predicate: Self::state_builder(&instruction).equality(receiver, returned),
                }));
            }
            this.trace.push(instruction);
            Ok(())
        })
    }

    fn switch(&mut self, inst: &str, value: &str, concrete_value: &RuntimeValue) -> Result<()> {
        self.safe_call("switch", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction = this.instruction(inst, "switch", |kind| matches!(kind, InstKind::Switch(_)))?;
            let InstKind::Switch(keys) = instruction.kind() else {
                return Err(unreachable_error!("Switch {} lost its keys", instruction));
            };
            let key_value = this.resolve_value(value)?;
            let term = this.mk_value(&key_value)?;
            this.update_info(&term, &key_value, concrete_value)?;
            let key = switch_key(concrete_value)?;

            let builder = Self::path_builder(&instruction);
            let predicate = if keys.contains(&key) {
                builder.equality(term, Term::int(key))
            } else {
                builder.default_switch(term, keys.iter().map(|key| Term::int(*key)).collect())
            };
            let clause = PathClause {
                ty: PathClauseType::ConditionCheck,
                instruction: instruction.clone(),
                predicate,
            };
            this.process_path(clause.clone(), true)?;
            this.post_process(Clause::Path(clause))
        })
    }

    fn table_switch(&mut self, inst: &str, value: &str, concrete_value: &RuntimeValue) -> Result<()> {
        self.safe_call("table_switch", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction = this.instruction(inst, "table switch", |kind| {
                matches!(kind, InstKind::TableSwitch { .. })
            })?;
            let key_value = this.resolve_value(value)?;
            let term = this.mk_value(&key_value)?;
            this.update_info(&term, &key_value, concrete_value)?;
            let key = switch_key(concrete_value)?;

            let clause = PathClause {
                ty: PathClauseType::ConditionCheck,
                instruction: instruction.clone(),
                predicate: Self::path_builder(&instruction).equality(term, Term::int(key)),
            };
            this.process_path(clause.clone(), true)?;
            this.post_process(Clause::Path(clause))
        })
    }

    fn throwing(&mut self, inst: &str, exception: &str, concrete_exception: &RuntimeValue) -> Result<()> {
        self.safe_call("throwing", |this| {
            if !this.begin(inst)? {
                return Ok(());
            }
            let instruction = this.instruction(inst, "throw", |kind| matches!(kind, InstKind::Throw))?;
            let exception_value = this.resolve_value(exception)?;
            let thrown = this.mk_value(&exception_value)?;
            this.update_info(&thrown, &exception_value, concrete_exception)?;

            let predicate = Self::state_builder(&instruction).throw(thrown.clone());
            this.thrown_exception = Some(thrown);
            this.post_state(&instruction, predicate)
        })
    }

    fn unary(
        &mut self,
        value: &str,
        operand: &str,
        concrete_value: &RuntimeValue,
        concrete_operand: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("unary", |this| {
            if !this.begin(value)? {
                return Ok(());
            }
            let inst = this.instruction(value, "unary", |kind| matches!(kind, InstKind::Unary(_)))?;
            let InstKind::Unary(op) = *inst.kind() else {
                return Err(unreachable_error!("Unary {} lost its operator", inst));
            };
            let result = Self::result_of(&inst)?;
            let operand_value = this.resolve_value(operand)?;

            let term = this.mk_new_value(&result)?;
            let operand_term = this.mk_value(&operand_value)?;
            this.update_info(&term, &result, concrete_value)?;
            this.update_info(&operand_term, &operand_value, concrete_operand)?;

            let predicate = Self::state_builder(&inst).equality(term, Term::unary(op, operand_term)?);
            this.post_state(&inst, predicate)
        })
    }

    fn add_nullity_constraints(&mut self, inst: &str, value: &str, concrete_value: &RuntimeValue) -> Result<()> {
        self.safe_call("add_nullity_constraints", |this| {
            this.nullity_constraints(inst, value, concrete_value)
        })
    }

    fn add_type_constraints(&mut self, inst: &str, value: &str, concrete_value: &RuntimeValue) -> Result<()> {
        self.safe_call("add_type_constraints", |this| {
            this.type_constraints(inst, value, concrete_value)
        })
    }

    fn add_expected_type_constraints(
        &mut self,
        inst: &str,
        value: &str,
        ty: &str,
        concrete_value: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("add_expected_type_constraints", |this| {
            let expected = SymType::parse(ty)?;
            this.expected_type_constraints(inst, value, &expected, concrete_value)
        })
    }

    fn add_array_index_constraints(
        &mut self,
        inst: &str,
        array: &str,
        index: &str,
        concrete_array: &RuntimeValue,
        concrete_index: &RuntimeValue,
    ) -> Result<()> {
        self.safe_call("add_array_index_constraints", |this| {
            this.array_index_constraints(inst, array, index, concrete_array, concrete_index)
        })
    }

    fn add_array_length_constraints(&mut self, inst: &str, length: &str, concrete_length: &RuntimeValue) -> Result<()> {
        self.safe_call("add_array_length_constraints", |this| {
            this.array_length_constraints(inst, length, concrete_length)
        })
    }

    fn symbolic_state(&self) -> SymbolicState {
        self.state()
    }
}

/// The concrete key of a switch.
fn switch_key(concrete: &RuntimeValue) -> Result<i32> {
    let key = concrete
        .as_i64()
        .ok_or_else(|| malformed_error!("Switch key {:?} is not integral", concrete))?;
    i32::try_from(key).map_err(|_| malformed_error!("Switch key {} does not fit an int", key))
}
