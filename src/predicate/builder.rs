use crate::{
    predicate::{Predicate, PredicateKind, PredicateType},
    program::Location,
    term::{Term, TermKind},
    Error, Result,
};

/// Creates predicates of one [`PredicateType`] at one source location.
///
/// The translator creates one state builder and one path builder per event, from the location
/// of the event's instruction.
#[derive(Debug, Clone)]
pub struct PredicateBuilder {
    ty: PredicateType,
    location: Location,
}

impl PredicateBuilder {
    /// Builder for predicates of type `ty`.
    #[must_use]
    pub fn new(ty: PredicateType, location: Location) -> Self {
        Self { ty, location }
    }

    /// Builder for state predicates.
    #[must_use]
    pub fn state(location: Location) -> Self {
        Self::new(PredicateType::State, location)
    }

    /// Builder for path predicates.
    #[must_use]
    pub fn path(location: Location) -> Self {
        Self::new(PredicateType::Path, location)
    }

    /// Builder for assumptions.
    #[must_use]
    pub fn assume(location: Location) -> Self {
        Self::new(PredicateType::Assume, location)
    }

    /// Builder for axioms.
    #[must_use]
    pub fn axiom(location: Location) -> Self {
        Self::new(PredicateType::Axiom, location)
    }

    /// Builder for requirements.
    #[must_use]
    pub fn require(location: Location) -> Self {
        Self::new(PredicateType::Require, location)
    }

    fn make(&self, kind: PredicateKind, operands: Vec<Term>) -> Predicate {
        Predicate::new(kind, self.ty, self.location.clone(), operands)
    }

    /// `lhv = rhv`
    #[must_use]
    pub fn equality(&self, lhv: Term, rhv: Term) -> Predicate {
        self.make(PredicateKind::Equality, vec![lhv, rhv])
    }

    /// `lhv != rhv`
    #[must_use]
    pub fn inequality(&self, lhv: Term, rhv: Term) -> Predicate {
        self.make(PredicateKind::Inequality, vec![lhv, rhv])
    }

    /// `cond` matches none of `keys`.
    #[must_use]
    pub fn default_switch(&self, cond: Term, keys: Vec<Term>) -> Predicate {
        let mut operands = Vec::with_capacity(keys.len() + 1);
        operands.push(cond);
        operands.extend(keys);
        self.make(PredicateKind::DefaultSwitch, operands)
    }

    /// Call effect, optionally binding the result to `lhv`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeError`] if `call` is not a call term.
    pub fn call(&self, lhv: Option<Term>, call: Term) -> Result<Predicate> {
        if !matches!(call.kind(), TermKind::Call { .. }) {
            return Err(Error::TypeError(format!("`{call}` is not a call term")));
        }
        Ok(match lhv {
            Some(lhv) => self.make(PredicateKind::Call { has_lhv: true }, vec![lhv, call]),
            None => self.make(PredicateKind::Call { has_lhv: false }, vec![call]),
        })
    }

    /// Store of `value` through an array element or field reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeError`] if `target` is neither kind of reference.
    pub fn store(&self, target: Term, value: Term) -> Result<Predicate> {
        let kind = match target.kind() {
            TermKind::ArrayIndex => PredicateKind::ArrayStore,
            TermKind::Field { .. } => PredicateKind::FieldStore,
            _ => return Err(Error::TypeError(format!("Cannot store through `{target}`"))),
        };
        Ok(self.make(kind, vec![target, value]))
    }

    /// Initializing store of `value` through a reference into a fresh allocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeError`] if `target` is neither kind of reference.
    pub fn initializer(&self, target: Term, value: Term) -> Result<Predicate> {
        let kind = match target.kind() {
            TermKind::ArrayIndex => PredicateKind::ArrayInitializer,
            TermKind::Field { .. } => PredicateKind::FieldInitializer,
            _ => {
                return Err(Error::TypeError(format!(
                    "Cannot initialize through `{target}`"
                )))
            }
        };
        Ok(self.make(kind, vec![target, value]))
    }

    /// `lhv = new T`, `T` being the type of `lhv`.
    #[must_use]
    pub fn new_object(&self, lhv: Term) -> Predicate {
        self.make(PredicateKind::New, vec![lhv])
    }

    /// `lhv = new T[dimensions..]`
    #[must_use]
    pub fn new_array(&self, lhv: Term, dimensions: Vec<Term>) -> Predicate {
        let mut operands = Vec::with_capacity(dimensions.len() + 1);
        operands.push(lhv);
        operands.extend(dimensions);
        self.make(PredicateKind::NewArray, operands)
    }

    /// Allocation of `lhv` whose fields follow as initializers.
    #[must_use]
    pub fn new_initializer(&self, lhv: Term) -> Predicate {
        self.make(PredicateKind::NewInitializer, vec![lhv])
    }

    /// Allocation of an array of `length` elements that follow as initializers.
    #[must_use]
    pub fn new_array_initializer(&self, lhv: Term, length: Term) -> Predicate {
        self.make(PredicateKind::NewArrayInitializer, vec![lhv, length])
    }

    /// `catch throwable`
    #[must_use]
    pub fn catch(&self, throwable: Term) -> Predicate {
        self.make(PredicateKind::Catch, vec![throwable])
    }

    /// `throw throwable`
    #[must_use]
    pub fn throw(&self, throwable: Term) -> Predicate {
        self.make(PredicateKind::Throw, vec![throwable])
    }

    /// `monitorenter monitor`
    #[must_use]
    pub fn enter_monitor(&self, monitor: Term) -> Predicate {
        self.make(PredicateKind::EnterMonitor, vec![monitor])
    }

    /// `monitorexit monitor`
    #[must_use]
    pub fn exit_monitor(&self, monitor: Term) -> Predicate {
        self.make(PredicateKind::ExitMonitor, vec![monitor])
    }

    /// `bound(pointer) = bound`
    #[must_use]
    pub fn bound_store(&self, pointer: Term, bound: Term) -> Predicate {
        self.make(PredicateKind::BoundStore, vec![pointer, bound])
    }

    /// `lhv = generate(length, generator)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeError`] if `generator` is not a lambda.
    pub fn generate_array(&self, lhv: Term, length: Term, generator: Term) -> Result<Predicate> {
        if !matches!(generator.kind(), TermKind::Lambda) {
            return Err(Error::TypeError(format!(
                "Array generator `{generator}` must be a lambda"
            )));
        }
        Ok(self.make(PredicateKind::GenerateArray, vec![lhv, length, generator]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymType;

    #[test]
    fn test_store_dispatches_on_reference() {
        let state = PredicateBuilder::state(Location::line(1));
        let array = Term::value(SymType::array(SymType::Int), "a");
        let element = Term::array_index(array, Term::int(0)).unwrap();
        let store = state.store(element, Term::int(5)).unwrap();
        assert_eq!(store.kind(), PredicateKind::ArrayStore);
        assert_eq!(store.to_string(), "@S *(a[0]) = 5");

        let owner = Term::value(SymType::class("app/P"), "p");
        let field = Term::field(owner, SymType::Int, "x").unwrap();
        assert_eq!(
            state.store(field, Term::int(1)).unwrap().kind(),
            PredicateKind::FieldStore
        );
        assert!(state.store(Term::int(0), Term::int(1)).is_err());
    }

    #[test]
    fn test_call_requires_call_term() {
        let state = PredicateBuilder::state(Location::line(1));
        assert!(state.call(None, Term::int(0)).is_err());
    }

    #[test]
    fn test_new_array_display() {
        let state = PredicateBuilder::state(Location::line(1));
        let lhv = Term::value(SymType::array(SymType::Int), "%a_0");
        let alloc = state.new_array(lhv, vec![Term::int(4)]);
        assert_eq!(alloc.to_string(), "@S %a_0 = new int[4]");
        assert_eq!(alloc.lhv().map(Term::name), Some("%a_0"));
    }
}
