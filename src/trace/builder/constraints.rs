//! Guard constraints: nullness, runtime types, array bounds and array lengths.
//!
//! Each guard introduces a fresh boolean term, a state clause defining it and a path clause
//! fixing it to the value the execution observed. Guards are memoized per term so that
//! repeated checks of the same term do not grow the state.

use std::sync::Arc;

use crate::{
    descriptor::RuntimeValue,
    predicate::Predicate,
    program::{CmpOp, Constant, Instruction, Value},
    term::Term,
    trace::{builder::SymbolicTraceBuilder, Clause, PathClause, PathClauseType, StateClause},
    types::SymType,
    Result,
};

impl SymbolicTraceBuilder {
    pub(super) fn nullity_constraints(&mut self, inst: &str, value: &str, concrete: &RuntimeValue) -> Result<()> {
        if !self.begin(inst)? {
            return Ok(());
        }
        let instruction = self.instruction(inst, "instruction", |_| true)?;
        let checked_value = self.resolve_value(value)?;
        let term = self.mk_value(&checked_value)?;
        if checked_value.is_this() || term.is_null() || self.null_checked.contains(&term) {
            return Ok(());
        }
        self.null_checked.insert(term.clone());

        let guard = Term::value(SymType::Bool, format!("{term}NullCheck"));
        let definition = Term::cmp(CmpOp::Eq, term, Term::null())?;
        self.guard(
            &instruction,
            PathClauseType::NullCheck,
            guard,
            definition,
            concrete.is_null(),
        );
        Ok(())
    }

    pub(super) fn type_constraints(&mut self, inst: &str, value: &str, concrete: &RuntimeValue) -> Result<()> {
        if !self.begin(inst)? {
            return Ok(());
        }
        let Some(actual) = concrete.runtime_type() else {
            return Ok(());
        };
        let instruction = self.instruction(inst, "instruction", |_| true)?;
        let checked_value = self.resolve_value(value)?;
        let term = self.mk_value(&checked_value)?;
        if self.already_typed(&term, &actual) {
            return Ok(());
        }
        self.type_checked.insert(term.clone(), actual.clone());

        let predicate =
            Self::path_builder(&instruction).equality(Term::instance_of(term, actual)?, Term::bool(true));
        self.push_path(&instruction, PathClauseType::OverloadCheck, predicate);
        Ok(())
    }

    pub(super) fn expected_type_constraints(
        &mut self,
        inst: &str,
        value: &str,
        expected: &SymType,
        concrete: &RuntimeValue,
    ) -> Result<()> {
        if !self.begin(inst)? {
            return Ok(());
        }
        let instruction = self.instruction(inst, "instruction", |_| true)?;
        let checked_value = self.resolve_value(value)?;
        if matches!(checked_value, Value::Constant(Constant::Null)) {
            return Ok(());
        }
        let term = self.mk_value(&checked_value)?;
        if self.already_typed(&term, expected) {
            return Ok(());
        }

        let hierarchy = self.program.hierarchy();
        let is_instance = concrete
            .runtime_type()
            .is_some_and(|actual| hierarchy.is_subtype_of(&actual, expected));
        self.type_checked.insert(term.clone(), expected.clone());

        let predicate = Self::path_builder(&instruction)
            .equality(Term::instance_of(term, expected.clone())?, Term::bool(is_instance));
        self.push_path(&instruction, PathClauseType::TypeCheck, predicate);
        Ok(())
    }

    pub(super) fn array_index_constraints(
        &mut self,
        inst: &str,
        array: &str,
        index: &str,
        concrete_array: &RuntimeValue,
        concrete_index: &RuntimeValue,
    ) -> Result<()> {
        if !self.begin(inst)? {
            return Ok(());
        }
        if concrete_array.is_null() {
            return Ok(());
        }
        let instruction = self.instruction(inst, "instruction", |_| true)?;
        let array_value = self.resolve_value(array)?;
        let index_value = self.resolve_value(index)?;
        let array_term = self.mk_value(&array_value)?;
        let index_term = self.mk_value(&index_value)?;

        let Some(actual_index) = concrete_index.as_i64() else {
            return Ok(());
        };
        if !self
            .index_checked
            .entry(array_term.clone())
            .or_default()
            .insert(index_term.clone())
        {
            return Ok(());
        }
        let length = concrete_array.array_length().unwrap_or(0);
        let in_bounds = actual_index < i64::try_from(length).unwrap_or(i64::MAX);

        let guard = Term::value(SymType::Bool, format!("{array_term}IndexCheck{index_term}"));
        let definition = Term::cmp(CmpOp::Lt, index_term, Term::array_length(array_term)?)?;
        self.guard(&instruction, PathClauseType::BoundsCheck, guard, definition, in_bounds);
        Ok(())
    }

    pub(super) fn array_length_constraints(&mut self, inst: &str, length: &str, concrete: &RuntimeValue) -> Result<()> {
        if !self.begin(inst)? {
            return Ok(());
        }
        let instruction = self.instruction(inst, "instruction", |_| true)?;
        let length_value = self.resolve_value(length)?;
        if length_value.is_constant() {
            return Ok(());
        }
        let term = self.mk_value(&length_value)?;
        if self.length_checked.contains(&term) {
            return Ok(());
        }
        let Some(actual) = concrete.as_i64() else {
            return Ok(());
        };
        self.length_checked.insert(term.clone());

        let max = self.config.max_array_length;
        let positive = Term::value(SymType::Bool, format!("{term}PositiveLengthCheck"));
        let definition = Term::cmp(CmpOp::Ge, term.clone(), Term::int(0))?;
        self.guard(&instruction, PathClauseType::BoundsCheck, positive, definition, actual >= 0);

        let bounded = Term::value(SymType::Bool, format!("{term}UpperBoundLengthCheck"));
        let definition = Term::cmp(CmpOp::Lt, term, Term::int(max))?;
        self.guard(
            &instruction,
            PathClauseType::BoundsCheck,
            bounded,
            definition,
            actual < i64::from(max),
        );
        Ok(())
    }

    /// Returns `true` if `term` is already known to be of a subtype of `ty`.
    fn already_typed(&self, term: &Term, ty: &SymType) -> bool {
        self.type_checked
            .get(term)
            .is_some_and(|checked| self.program.hierarchy().is_subtype_of(checked, ty))
    }

    /// Defines `guard` as `definition` and fixes it to `observed`.
    fn guard(
        &mut self,
        instruction: &Arc<Instruction>,
        ty: PathClauseType,
        guard: Term,
        definition: Term,
        observed: bool,
    ) {
        let state = Self::state_builder(instruction).equality(guard.clone(), definition);
        self.clauses.push_back(Clause::State(StateClause {
            instruction: instruction.clone(),
            predicate: state,
        }));

        let path = Self::path_builder(instruction).equality(guard, Term::bool(observed));
        self.push_path(instruction, ty, path);
    }

    /// Appends a guard's path clause to both the path and the clauses.
    ///
    /// Guards do not move the frame's previous block, and their instruction is not
    /// recorded in the raw trace: the guarded instruction reports its own event.
    fn push_path(
        &mut self,
        instruction: &Arc<Instruction>,
        ty: PathClauseType,
        predicate: Predicate,
    ) {
        let clause = PathClause {
            ty,
            instruction: instruction.clone(),
            predicate,
        };
        self.path.push_back(clause.clone());
        self.clauses.push_back(Clause::Path(clause));
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        descriptor::RuntimeValue,
        test::{int_array, object, program, MAIN},
        trace::{InstructionTraceCollector, PathClauseType, SymbolicTraceBuilder},
    };

    fn guards(translator: &SymbolicTraceBuilder) -> Vec<(PathClauseType, String)> {
        translator
            .symbolic_state()
            .path
            .iter()
            .map(|clause| (clause.ty, clause.predicate.to_string()))
            .collect()
    }

    #[test]
    fn test_array_length_guards() {
        let mut translator = SymbolicTraceBuilder::new(program());
        translator
            .method_enter(MAIN, "alloc", &["I"], "[I", None, &[RuntimeValue::Int(3)])
            .unwrap();
        translator
            .add_array_length_constraints("%arr", "arg$0", &RuntimeValue::Int(3))
            .unwrap();
        translator
            .add_array_length_constraints("%arr", "arg$0", &RuntimeValue::Int(3))
            .unwrap();

        assert_eq!(
            guards(&translator),
            vec![
                (PathClauseType::BoundsCheck, "@P arg$0PositiveLengthCheck = true".to_string()),
                (PathClauseType::BoundsCheck, "@P arg$0UpperBoundLengthCheck = true".to_string()),
            ]
        );
        let state = translator.symbolic_state();
        assert_eq!(state.clauses.len(), 4);
        assert_eq!(
            state.clauses.get(0).unwrap().predicate().to_string(),
            "@S arg$0PositiveLengthCheck = (arg$0 >= 0)"
        );

        translator
            .new_array("%arr", &["arg$0"], &int_array(1, &[0, 0, 0]), &[RuntimeValue::Int(3)])
            .unwrap();
        translator
            .add_nullity_constraints("ret", "%arr", &int_array(1, &[0, 0, 0]))
            .unwrap();
        assert_eq!(translator.symbolic_state().clauses.len(), 5);
        assert_eq!(guards(&translator).len(), 2);
    }

    #[test]
    fn test_negative_length_is_observed() {
        let mut translator = SymbolicTraceBuilder::new(program());
        translator
            .method_enter(MAIN, "alloc", &["I"], "[I", None, &[RuntimeValue::Int(-1)])
            .unwrap();
        translator
            .add_array_length_constraints("%arr", "arg$0", &RuntimeValue::Int(-1))
            .unwrap();
        translator
            .add_array_length_constraints("%arr", "5", &RuntimeValue::Int(5))
            .unwrap();

        let guards = guards(&translator);
        assert_eq!(guards.len(), 2);
        assert_eq!(guards[0].1, "@P arg$0PositiveLengthCheck = false");
        assert_eq!(guards[1].1, "@P arg$0UpperBoundLengthCheck = true");
    }

    #[test]
    fn test_null_and_index_guards() {
        let array = int_array(1, &[1, 2, 3]);
        let mut translator = SymbolicTraceBuilder::new(program());
        translator
            .method_enter(MAIN, "get", &["[I", "I"], "I", None, &[array.clone(), RuntimeValue::Int(5)])
            .unwrap();
        translator.add_nullity_constraints("%e", "arg$0", &array).unwrap();
        translator
            .add_array_index_constraints("%e", "arg$0", "arg$1", &array, &RuntimeValue::Int(5))
            .unwrap();
        translator
            .add_array_index_constraints("%e", "arg$0", "arg$1", &array, &RuntimeValue::Int(5))
            .unwrap();
        translator.add_nullity_constraints("%e", "arg$0", &array).unwrap();

        assert_eq!(
            guards(&translator),
            vec![
                (PathClauseType::NullCheck, "@P arg$0NullCheck = false".to_string()),
                (PathClauseType::BoundsCheck, "@P arg$0IndexCheckarg$1 = false".to_string()),
            ]
        );
        let state = translator.symbolic_state();
        assert_eq!(
            state.clauses.get(2).unwrap().predicate().to_string(),
            "@S arg$0IndexCheckarg$1 = (arg$1 < arg$0.length)"
        );
    }

    #[test]
    fn test_null_array_skips_index_guard() {
        let mut translator = SymbolicTraceBuilder::new(program());
        translator
            .method_enter(MAIN, "get", &["[I", "I"], "I", None, &[RuntimeValue::Null, RuntimeValue::Int(0)])
            .unwrap();
        translator
            .add_array_index_constraints("%e", "arg$0", "arg$1", &RuntimeValue::Null, &RuntimeValue::Int(0))
            .unwrap();
        assert!(translator.symbolic_state().is_empty());
    }

    #[test]
    fn test_type_guards() {
        let text = RuntimeValue::string(7, "lock");
        let mut translator = SymbolicTraceBuilder::new(program());
        translator
            .method_enter(MAIN, "sync", &["Ljava/lang/Object;"], "V", None, &[text.clone()])
            .unwrap();
        translator.add_type_constraints("me", "arg$0", &text).unwrap();
        translator.add_type_constraints("me", "arg$0", &text).unwrap();
        translator
            .add_expected_type_constraints("me", "arg$0", "Ljava/lang/Object;", &text)
            .unwrap();
        translator
            .add_expected_type_constraints("me", "null", "Ljava/lang/Integer;", &RuntimeValue::Null)
            .unwrap();
        assert_eq!(
            guards(&translator),
            vec![(
                PathClauseType::OverloadCheck,
                "@P arg$0 instanceof java/lang/String = true".to_string()
            )]
        );

        let mut translator = SymbolicTraceBuilder::new(program());
        translator
            .method_enter(MAIN, "sync", &["Ljava/lang/Object;"], "V", None, &[text.clone()])
            .unwrap();
        translator
            .add_expected_type_constraints("me", "arg$0", "Ljava/lang/Integer;", &text)
            .unwrap();
        assert_eq!(
            guards(&translator),
            vec![(
                PathClauseType::TypeCheck,
                "@P arg$0 instanceof java/lang/Integer = false".to_string()
            )]
        );
    }

    #[test]
    fn test_null_constant_needs_no_guard() {
        let mut translator = SymbolicTraceBuilder::new(program());
        let lock = object(4, "java/lang/Object");
        translator
            .method_enter(MAIN, "sync", &["Ljava/lang/Object;"], "V", None, &[lock.clone()])
            .unwrap();
        translator.add_nullity_constraints("me", "null", &RuntimeValue::Null).unwrap();
        assert!(translator.symbolic_state().path.is_empty());
    }
}
