//! JSON persistence of symbolic states.
//!
//! Terms, predicates and descriptors serialize as they are. Instruction handles do not: a
//! snapshot stores them as `(method key, instruction name)` pairs and [`SymbolicStateSnapshot::restore`]
//! resolves them again against the [`Program`] the state was built on.

use std::sync::Arc;

use imbl::{HashMap as ImHashMap, Vector};
use serde::{Deserialize, Serialize};

use crate::{
    descriptor::Descriptor,
    predicate::Predicate,
    program::{Instruction, Method, NameResolver, Program, Value},
    term::Term,
    trace::{
        Clause, ClauseState, PathClause, PathClauseType, PathCondition, StateClause, SymbolicState,
        WrappedValue,
    },
    Error, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct InstructionRef {
    method: String,
    name: String,
}

impl InstructionRef {
    fn of(instruction: &Instruction) -> Self {
        Self {
            method: instruction.method().key(),
            name: instruction.name().to_string(),
        }
    }

    fn resolve(&self, program: &Program) -> Result<Arc<Instruction>> {
        let method = program
            .method_by_key(&self.method)
            .ok_or_else(|| Error::MethodNotFound(self.method.clone()))?;
        program.body(&method)?.resolve_instruction(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClauseRecord {
    instruction: InstructionRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathClauseType>,
    predicate: Predicate,
}

impl ClauseRecord {
    fn of(clause: &Clause) -> Self {
        Self {
            instruction: InstructionRef::of(clause.instruction()),
            path: match clause {
                Clause::Path(path) => Some(path.ty),
                Clause::State(_) => None,
            },
            predicate: clause.predicate().clone(),
        }
    }

    fn of_path(clause: &PathClause) -> Self {
        Self {
            instruction: InstructionRef::of(&clause.instruction),
            path: Some(clause.ty),
            predicate: clause.predicate.clone(),
        }
    }

    fn restore(&self, program: &Program) -> Result<Clause> {
        let instruction = self.instruction.resolve(program)?;
        let predicate = self.predicate.clone();
        Ok(match self.path {
            Some(ty) => Clause::Path(PathClause {
                ty,
                instruction,
                predicate,
            }),
            None => Clause::State(StateClause {
                instruction,
                predicate,
            }),
        })
    }

    fn restore_path(&self, program: &Program) -> Result<PathClause> {
        let ty = self
            .path
            .ok_or_else(|| malformed_error!("Path entry for {} has no clause type", self.instruction.name))?;
        Ok(PathClause {
            ty,
            instruction: self.instruction.resolve(program)?,
            predicate: self.predicate.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OriginRecord {
    term: Term,
    method: Method,
    value: Value,
}

/// Serializable form of a [`SymbolicState`].
///
/// Map entries are stored sorted by term name, so equal states produce identical JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolicStateSnapshot {
    clauses: Vec<ClauseRecord>,
    path: Vec<ClauseRecord>,
    concrete_values: Vec<(Term, Descriptor)>,
    term_map: Vec<OriginRecord>,
}

impl SymbolicStateSnapshot {
    /// Captures `state`.
    #[must_use]
    pub fn capture(state: &SymbolicState) -> Self {
        let mut concrete_values: Vec<(Term, Descriptor)> = state
            .concrete_values
            .iter()
            .map(|(term, descriptor)| (term.clone(), descriptor.clone()))
            .collect();
        concrete_values.sort_by(|(a, _), (b, _)| a.name().cmp(b.name()));

        let mut term_map: Vec<OriginRecord> = state
            .term_map
            .iter()
            .map(|(term, origin)| OriginRecord {
                term: term.clone(),
                method: (*origin.method).clone(),
                value: origin.value.clone(),
            })
            .collect();
        term_map.sort_by(|a, b| a.term.name().cmp(b.term.name()));

        Self {
            clauses: state.clauses.iter().map(ClauseRecord::of).collect(),
            path: state.path.iter().map(ClauseRecord::of_path).collect(),
            concrete_values,
            term_map,
        }
    }

    /// Number of clauses in the captured state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Returns `true` if the captured state has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Serializes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if a value cannot be represented in JSON, such as a
    /// NaN floating point constant.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuilds the state, resolving instruction handles against `program`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodNotFound`] or [`Error::UnknownName`] if an instruction of the
    /// snapshot is not part of `program`.
    pub fn restore(&self, program: &Program) -> Result<SymbolicState> {
        let clauses = self
            .clauses
            .iter()
            .map(|record| record.restore(program))
            .collect::<Result<Vector<_>>>()?;
        let path = self
            .path
            .iter()
            .map(|record| record.restore_path(program))
            .collect::<Result<Vector<_>>>()?;

        let mut concrete_values = ImHashMap::new();
        for (term, descriptor) in &self.concrete_values {
            concrete_values.insert(term.clone(), descriptor.clone());
        }

        let mut term_map = ImHashMap::new();
        for record in &self.term_map {
            let method = program
                .method_by_key(&record.method.key())
                .unwrap_or_else(|| Arc::new(record.method.clone()));
            term_map.insert(record.term.clone(), WrappedValue {
                method,
                value: record.value.clone(),
            });
        }

        Ok(SymbolicState {
            clauses: ClauseState::from(clauses),
            path: PathCondition::from(path),
            concrete_values,
            term_map,
        })
    }
}

impl From<&SymbolicState> for SymbolicStateSnapshot {
    fn from(state: &SymbolicState) -> Self {
        Self::capture(state)
    }
}
