//! Bottom-up rewriting of terms, predicates and symbolic states.
//!
//! A [`Transformer`] visits a term in three steps: [`Transformer::enter_term`] may replace the
//! term outright without visiting its children, otherwise [`crate::term::Term::accept`]
//! transforms the children and rebuilds the node if one of them changed, and finally
//! [`Transformer::exit_term`] sees the (possibly rebuilt) node. A transformer that overrides
//! nothing is the identity and returns every node unchanged, without allocating.
//!
//! The same shape lifts to predicates, clause sequences, path conditions and whole
//! [`crate::trace::SymbolicState`]s.
//!
//! # Architecture
//!
//! - [`Transformer`] - The rewrite trait with default traversal
//! - [`RecollectingTransformer`] - Rewrites a clause sequence where each clause may turn into
//!   zero, one or many clauses
//! - [`TermRenamer`] - Suffix renaming of named values plus an explicit term mapping
//! - [`TermCollector`] - Collects every subterm accepted by a filter
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use symtrace::transform::{TermRenamer, Transformer};
//!
//! let mut renamer = TermRenamer::new(".inlined", HashMap::new());
//! let renamed = renamer.transform_state(&state)?;
//! ```

mod collector;
mod renamer;

pub use collector::{collect_terms, TermCollector};
pub use renamer::TermRenamer;

use imbl::{HashMap as ImHashMap, Vector};

use crate::{
    predicate::Predicate,
    term::Term,
    trace::{Clause, ClauseState, PathClause, PathCondition, SymbolicState},
    Result,
};

/// Bottom-up rewrite.
///
/// Every method has a default. Implementors usually override [`Transformer::enter_term`] or
/// [`Transformer::exit_term`] only.
pub trait Transformer {
    /// Called before the children of `term` are visited.
    ///
    /// # Returns
    ///
    /// `Some(replacement)` to replace `term` without descending into it, `None` to continue
    /// the traversal.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the error aborts the whole rewrite.
    fn enter_term(&mut self, _term: &Term) -> Result<Option<Term>> {
        Ok(None)
    }

    /// Called after the children of `term` were transformed.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the error aborts the whole rewrite.
    fn exit_term(&mut self, term: Term) -> Result<Term> {
        Ok(term)
    }

    /// Rewrites `term`.
    ///
    /// # Errors
    ///
    /// Propagates hook failures and [`crate::Error::TypeError`] from rebuilt nodes.
    fn transform(&mut self, term: &Term) -> Result<Term> {
        if let Some(replacement) = self.enter_term(term)? {
            return Ok(replacement);
        }
        let rebuilt = term.accept(self)?;
        self.exit_term(rebuilt)
    }

    /// Called after the operands of `predicate` were transformed.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the error aborts the whole rewrite.
    fn exit_predicate(&mut self, predicate: Predicate) -> Result<Predicate> {
        Ok(predicate)
    }

    /// Rewrites every operand of `predicate`.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`Transformer::transform`] and the predicate hook.
    fn transform_predicate(&mut self, predicate: &Predicate) -> Result<Predicate> {
        let rebuilt = predicate.accept(self)?;
        self.exit_predicate(rebuilt)
    }

    /// Rewrites the predicate of every clause.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`Transformer::transform_predicate`].
    fn transform_clauses(&mut self, clauses: &ClauseState) -> Result<ClauseState> {
        let mut rewritten = Vector::new();
        for clause in clauses.iter() {
            let predicate = self.transform_predicate(clause.predicate())?;
            rewritten.push_back(clause.with_predicate(predicate));
        }
        Ok(ClauseState::from(rewritten))
    }

    /// Rewrites the predicate of every path clause.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`Transformer::transform_predicate`].
    fn transform_path(&mut self, path: &PathCondition) -> Result<PathCondition> {
        let mut rewritten = Vector::new();
        for clause in path.iter() {
            let predicate = self.transform_predicate(&clause.predicate)?;
            rewritten.push_back(PathClause {
                predicate,
                ..clause.clone()
            });
        }
        Ok(PathCondition::from(rewritten))
    }

    /// Rewrites a whole symbolic state.
    ///
    /// The keys of the concrete value map and of the term map are rewritten as well. When two
    /// keys rewrite to the same term, the entry of the first key wins.
    ///
    /// # Errors
    ///
    /// Propagates failures of the per-part rewrites.
    fn transform_state(&mut self, state: &SymbolicState) -> Result<SymbolicState> {
        let clauses = self.transform_clauses(&state.clauses)?;
        let path = self.transform_path(&state.path)?;

        let mut concrete_values = ImHashMap::new();
        for (term, descriptor) in state.concrete_values.iter() {
            let key = self.transform(term)?;
            if !concrete_values.contains_key(&key) {
                concrete_values.insert(key, descriptor.clone());
            }
        }

        let mut term_map = ImHashMap::new();
        for (term, value) in state.term_map.iter() {
            let key = self.transform(term)?;
            if !term_map.contains_key(&key) {
                term_map.insert(key, value.clone());
            }
        }

        Ok(SymbolicState {
            clauses,
            path,
            concrete_values,
            term_map,
        })
    }
}

/// Rewrite of a clause sequence in which every clause may be kept, dropped or expanded.
pub trait RecollectingTransformer: Transformer {
    /// Produces the clauses replacing `clause`.
    ///
    /// The default keeps the clause with its predicate rewritten.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the error aborts the whole rewrite.
    fn recollect_clause(&mut self, clause: &Clause) -> Result<Vec<Clause>> {
        let predicate = self.transform_predicate(clause.predicate())?;
        Ok(vec![clause.with_predicate(predicate)])
    }

    /// Rebuilds `clauses` from the replacements of every clause, in order.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`RecollectingTransformer::recollect_clause`].
    fn recollect(&mut self, clauses: &ClauseState) -> Result<ClauseState> {
        let mut rebuilt = Vector::new();
        for clause in clauses.iter() {
            for replacement in self.recollect_clause(clause)? {
                rebuilt.push_back(replacement);
            }
        }
        Ok(ClauseState::from(rebuilt))
    }

    /// Rebuilds a whole state, recollecting its clauses and rewriting everything else.
    ///
    /// Path clauses that were also recollected away from the clause sequence stay in the
    /// path; the path is rewritten clause by clause.
    ///
    /// # Errors
    ///
    /// Propagates failures of the per-part rewrites.
    fn recollect_state(&mut self, state: &SymbolicState) -> Result<SymbolicState> {
        let clauses = self.recollect(&state.clauses)?;
        let rewritten = self.transform_state(&SymbolicState {
            clauses: ClauseState::default(),
            ..state.clone()
        })?;
        Ok(SymbolicState {
            clauses,
            ..rewritten
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::{BinaryOp, CmpOp},
        term::TermKind,
        types::SymType,
        Error,
    };

    struct Identity;
    impl Transformer for Identity {}

    /// Replaces one named value by another term.
    struct Substitute {
        from: Term,
        to: Term,
    }

    impl Transformer for Substitute {
        fn enter_term(&mut self, term: &Term) -> Result<Option<Term>> {
            Ok((*term == self.from).then(|| self.to.clone()))
        }
    }

    fn sample() -> Term {
        let x = Term::value(SymType::Int, "x");
        let y = Term::value(SymType::Int, "y");
        let sum = Term::binary_typed(SymType::Int, BinaryOp::Add, x, y).unwrap();
        let array = Term::value(SymType::array(SymType::Int), "a");
        let element = Term::load(&Term::array_index(array, Term::int(0)).unwrap()).unwrap();
        Term::cmp(CmpOp::Lt, sum, element).unwrap()
    }

    #[test]
    fn test_identity_returns_same_node() {
        let term = sample();
        let result = Identity.transform(&term).unwrap();
        assert!(result.ptr_eq(&term));

        let leaf = Term::int(1);
        assert!(Identity.transform(&leaf).unwrap().ptr_eq(&leaf));
    }

    #[test]
    fn test_single_change_shares_untouched_children() {
        let term = sample();
        let mut substitute = Substitute {
            from: Term::value(SymType::Int, "y"),
            to: Term::int(2),
        };
        let result = substitute.transform(&term).unwrap();

        assert_ne!(result, term);
        assert_eq!(result.name(), "((x + 2) < *(a[0]))");
        assert!(result.subterms()[1].ptr_eq(&term.subterms()[1]));
        assert!(result.subterms()[0].subterms()[0].ptr_eq(&term.subterms()[0].subterms()[0]));
    }

    #[test]
    fn test_rebuild_revalidates() {
        let term = sample();
        let mut substitute = Substitute {
            from: Term::value(SymType::Int, "y"),
            to: Term::string("oops"),
        };
        assert!(matches!(
            substitute.transform(&term),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_enter_term_skips_children() {
        struct Counting(usize);
        impl Transformer for Counting {
            fn enter_term(&mut self, term: &Term) -> Result<Option<Term>> {
                self.0 += 1;
                Ok(matches!(term.kind(), TermKind::Binary(_)).then(|| Term::int(0)))
            }
        }

        let mut counting = Counting(0);
        let result = counting.transform(&sample()).unwrap();
        assert_eq!(result.name(), "(0 < *(a[0]))");
        // root, binary (replaced), load, index, array, constant
        assert_eq!(counting.0, 6);
    }
}
