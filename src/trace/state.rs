//! The symbolic state produced by a translation.
//!
//! A [`SymbolicState`] is made of an ordered [`ClauseState`] (every effect and every guard the
//! execution produced, each tied to its instruction), an ordered [`PathCondition`] (the
//! branch and guard decisions alone), and two maps keyed by term: the concrete value each
//! term had at runtime and the source value each term stands for.
//!
//! Sequences and maps are `imbl` persistent collections, so taking the state out of a live
//! translator and deriving sub-states are cheap structural-sharing clones.

use std::{fmt, ops::Range, sync::Arc};

use imbl::{HashMap as ImHashMap, Vector};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
    descriptor::Descriptor,
    predicate::Predicate,
    program::{Instruction, Method, Value},
    term::Term,
};

/// Classification of a path clause.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PathClauseType {
    /// Nullness of a reference
    NullCheck,
    /// A value against a statically expected type
    TypeCheck,
    /// A receiver against its runtime type, deciding dispatch
    OverloadCheck,
    /// Outcome of a branch or switch
    ConditionCheck,
    /// Array index and array length bounds
    BoundsCheck,
}

/// A state predicate together with the instruction it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct StateClause {
    /// The described instruction
    pub instruction: Arc<Instruction>,
    /// The effect of the instruction
    pub predicate: Predicate,
}

/// A path predicate together with its classification and instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct PathClause {
    /// Kind of decision
    pub ty: PathClauseType,
    /// The deciding instruction
    pub instruction: Arc<Instruction>,
    /// The decision taken
    pub predicate: Predicate,
}

/// An element of the clause sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Effect of an instruction
    State(StateClause),
    /// Decision taken at an instruction
    Path(PathClause),
}

impl Clause {
    /// The instruction the clause belongs to.
    #[must_use]
    pub fn instruction(&self) -> &Arc<Instruction> {
        match self {
            Clause::State(clause) => &clause.instruction,
            Clause::Path(clause) => &clause.instruction,
        }
    }

    /// The predicate of the clause.
    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        match self {
            Clause::State(clause) => &clause.predicate,
            Clause::Path(clause) => &clause.predicate,
        }
    }

    /// Returns `true` for path clauses.
    #[must_use]
    pub const fn is_path(&self) -> bool {
        matches!(self, Clause::Path(_))
    }

    /// The same clause over another predicate.
    #[must_use]
    pub fn with_predicate(&self, predicate: Predicate) -> Clause {
        match self {
            Clause::State(clause) => Clause::State(StateClause {
                instruction: clause.instruction.clone(),
                predicate,
            }),
            Clause::Path(clause) => Clause::Path(PathClause {
                ty: clause.ty,
                instruction: clause.instruction.clone(),
                predicate,
            }),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::State(clause) => write!(f, "{}", clause.predicate),
            Clause::Path(clause) => write!(f, "{} [{}]", clause.predicate, clause.ty),
        }
    }
}

/// Ordered sequence of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseState(Vector<Clause>);

impl ClauseState {
    /// Number of clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Clause at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Clause> {
        self.0.get(index)
    }

    /// Iterates the clauses in order.
    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.0.iter()
    }

    /// The clauses in `range`, clamped to the sequence.
    #[must_use]
    pub fn sub(&self, range: Range<usize>) -> ClauseState {
        let start = range.start.min(self.0.len());
        let end = range.end.clamp(start, self.0.len());
        ClauseState(self.0.skip(start).take(end - start))
    }

    /// `self` followed by `other`.
    #[must_use]
    pub fn plus(&self, other: &ClauseState) -> ClauseState {
        let mut clauses = self.0.clone();
        clauses.append(other.0.clone());
        ClauseState(clauses)
    }

    /// The predicates of all clauses, in order.
    #[must_use]
    pub fn predicates(&self) -> Vec<Predicate> {
        self.0.iter().map(|clause| clause.predicate().clone()).collect()
    }
}

impl From<Vector<Clause>> for ClauseState {
    fn from(clauses: Vector<Clause>) -> Self {
        ClauseState(clauses)
    }
}

impl FromIterator<Clause> for ClauseState {
    fn from_iter<I: IntoIterator<Item = Clause>>(iter: I) -> Self {
        ClauseState(iter.into_iter().collect())
    }
}

/// Ordered sequence of path clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathCondition(Vector<PathClause>);

impl PathCondition {
    /// Number of path clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no path clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path clause at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PathClause> {
        self.0.get(index)
    }

    /// Iterates the path clauses in order.
    pub fn iter(&self) -> impl Iterator<Item = &PathClause> {
        self.0.iter()
    }

    /// The path clauses in `range`, clamped to the sequence.
    #[must_use]
    pub fn sub_path(&self, range: Range<usize>) -> PathCondition {
        let start = range.start.min(self.0.len());
        let end = range.end.clamp(start, self.0.len());
        PathCondition(self.0.skip(start).take(end - start))
    }

    /// `self` followed by `other`.
    #[must_use]
    pub fn plus(&self, other: &PathCondition) -> PathCondition {
        let mut path = self.0.clone();
        path.append(other.0.clone());
        PathCondition(path)
    }

    /// The predicates of all path clauses, in order.
    #[must_use]
    pub fn predicates(&self) -> Vec<Predicate> {
        self.0.iter().map(|clause| clause.predicate.clone()).collect()
    }
}

impl From<Vector<PathClause>> for PathCondition {
    fn from(path: Vector<PathClause>) -> Self {
        PathCondition(path)
    }
}

impl FromIterator<PathClause> for PathCondition {
    fn from_iter<I: IntoIterator<Item = PathClause>>(iter: I) -> Self {
        PathCondition(iter.into_iter().collect())
    }
}

/// A source value together with the method it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WrappedValue {
    /// The method whose frame bound the value
    pub method: Arc<Method>,
    /// The source value
    pub value: Value,
}

impl fmt::Display for WrappedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.value, self.method)
    }
}

/// The symbolic summary of one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolicState {
    /// Effects and guards in execution order
    pub clauses: ClauseState,
    /// Decisions taken, in execution order
    pub path: PathCondition,
    /// Concrete value observed for each term
    pub concrete_values: ImHashMap<Term, Descriptor>,
    /// Source value each term stands for
    pub term_map: ImHashMap<Term, WrappedValue>,
}

impl SymbolicState {
    /// An empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenation of two states.
    ///
    /// Clauses and path clauses of `other` follow those of `self`. For terms present in both
    /// maps, the entry of `other` wins.
    #[must_use]
    pub fn plus(&self, other: &SymbolicState) -> SymbolicState {
        SymbolicState {
            clauses: self.clauses.plus(&other.clauses),
            path: self.path.plus(&other.path),
            concrete_values: other.concrete_values.clone().union(self.concrete_values.clone()),
            term_map: other.term_map.clone().union(self.term_map.clone()),
        }
    }

    /// The state restricted to the clauses in `range`.
    ///
    /// The path keeps the path clauses found in that range, in order. The maps are kept
    /// whole.
    #[must_use]
    pub fn sub_state(&self, range: Range<usize>) -> SymbolicState {
        let clauses = self.clauses.sub(range);
        let path = clauses
            .iter()
            .filter_map(|clause| match clause {
                Clause::Path(path) => Some(path.clone()),
                Clause::State(_) => None,
            })
            .collect();
        SymbolicState {
            clauses,
            path,
            concrete_values: self.concrete_values.clone(),
            term_map: self.term_map.clone(),
        }
    }

    /// The predicates of all clauses, in order.
    #[must_use]
    pub fn predicates(&self) -> Vec<Predicate> {
        self.clauses.predicates()
    }

    /// Returns `true` if the state has no clauses and no path clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty() && self.path.is_empty()
    }
}

impl fmt::Display for SymbolicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "(")?;
        for clause in self.clauses.iter() {
            writeln!(f, "  {clause}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        predicate::PredicateBuilder,
        program::{InstKind, MethodBody, MethodDesc, MethodFlags, NameResolver},
        types::SymType,
    };

    fn instructions() -> Vec<Arc<Instruction>> {
        let method = Arc::new(Method::new(
            "app/Main",
            "run",
            MethodDesc::new(vec![], SymType::Void),
            MethodFlags::STATIC,
        ));
        let mut builder = MethodBody::builder(method);
        let entry = builder.block("entry");
        for name in ["a", "b", "c"] {
            builder.inst(entry, name, InstKind::Jump).unwrap();
        }
        let body = builder.finish();
        ["a", "b", "c"]
            .iter()
            .map(|name| body.resolve_instruction(name).unwrap())
            .collect()
    }

    fn sample() -> SymbolicState {
        let insts = instructions();
        let x = Term::value(SymType::Bool, "x");
        let state = PredicateBuilder::state(insts[0].location().clone());
        let path = PredicateBuilder::path(insts[1].location().clone());

        let path_clause = PathClause {
            ty: PathClauseType::ConditionCheck,
            instruction: insts[1].clone(),
            predicate: path.equality(x.clone(), Term::bool(true)),
        };
        let clauses: ClauseState = vec![
            Clause::State(StateClause {
                instruction: insts[0].clone(),
                predicate: state.equality(x.clone(), Term::bool(true)),
            }),
            Clause::Path(path_clause.clone()),
            Clause::State(StateClause {
                instruction: insts[2].clone(),
                predicate: state.throw(Term::null()),
            }),
        ]
        .into_iter()
        .collect();

        let mut concrete_values = ImHashMap::new();
        concrete_values.insert(x, Descriptor::Bool(true));
        SymbolicState {
            clauses,
            path: vec![path_clause].into_iter().collect(),
            concrete_values,
            term_map: ImHashMap::new(),
        }
    }

    #[test]
    fn test_sub_state_keeps_inner_path() {
        let state = sample();
        let sub = state.sub_state(1..3);
        assert_eq!(sub.clauses.len(), 2);
        assert_eq!(sub.path.len(), 1);

        let head = state.sub_state(0..1);
        assert!(head.path.is_empty());
        assert_eq!(state.sub_state(2..10).clauses.len(), 1);
    }

    #[test]
    fn test_plus_prefers_other_values() {
        let state = sample();
        let mut other = SymbolicState::new();
        other
            .concrete_values
            .insert(Term::value(SymType::Bool, "x"), Descriptor::Bool(false));
        let sum = state.plus(&other);
        assert_eq!(sum.clauses.len(), 3);
        assert_eq!(
            sum.concrete_values.get(&Term::value(SymType::Bool, "x")),
            Some(&Descriptor::Bool(false))
        );
    }

    #[test]
    fn test_clause_type_names() {
        assert_eq!(PathClauseType::NullCheck.to_string(), "NULL_CHECK");
        assert_eq!(PathClauseType::ConditionCheck.to_string(), "CONDITION_CHECK");
    }
}
