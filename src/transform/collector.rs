use std::collections::HashSet;

use crate::{term::Term, transform::Transformer, Result};

/// Collects every visited subterm accepted by a filter.
///
/// The collector never changes the terms it visits.
pub struct TermCollector<F>
where
    F: FnMut(&Term) -> bool,
{
    filter: F,
    terms: HashSet<Term>,
}

impl<F> TermCollector<F>
where
    F: FnMut(&Term) -> bool,
{
    /// Creates a collector keeping the terms for which `filter` returns `true`.
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            terms: HashSet::new(),
        }
    }

    /// The terms collected so far.
    #[must_use]
    pub fn terms(&self) -> &HashSet<Term> {
        &self.terms
    }

    /// Consumes the collector, returning the collected terms.
    #[must_use]
    pub fn into_terms(self) -> HashSet<Term> {
        self.terms
    }
}

impl<F> Transformer for TermCollector<F>
where
    F: FnMut(&Term) -> bool,
{
    fn exit_term(&mut self, term: Term) -> Result<Term> {
        if (self.filter)(&term) {
            self.terms.insert(term.clone());
        }
        Ok(term)
    }
}

/// Every subterm of `term`, `term` included, accepted by `filter`.
///
/// # Errors
///
/// Cannot fail for well-typed terms; the `Result` comes from the traversal.
pub fn collect_terms<F>(term: &Term, filter: F) -> Result<HashSet<Term>>
where
    F: FnMut(&Term) -> bool,
{
    let mut collector = TermCollector::new(filter);
    collector.transform(term)?;
    Ok(collector.into_terms())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        program::{BinaryOp, CmpOp},
        term::TermKind,
        types::SymType,
    };

    #[test]
    fn test_collect_named_values() {
        let x = Term::value(SymType::Int, "x");
        let y = Term::value(SymType::Int, "y");
        let sum = Term::binary_typed(SymType::Int, BinaryOp::Add, x.clone(), y.clone()).unwrap();
        let cmp = Term::cmp(CmpOp::Eq, sum, x.clone()).unwrap();

        let values = collect_terms(&cmp, |term| matches!(term.kind(), TermKind::Value { .. })).unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&x));
        assert!(values.contains(&y));

        let all = collect_terms(&cmp, |_| true).unwrap();
        assert_eq!(all.len(), 4);
    }
}
