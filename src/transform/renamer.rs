use std::collections::HashMap;

use crate::{
    term::{Term, TermKind},
    transform::Transformer,
    Result,
};

/// Renames named values and substitutes mapped terms.
///
/// Terms found in the mapping are replaced before their children are visited. Every other
/// named value gets `suffix` appended to its name. Arguments, `this` and constants are kept.
///
/// Used to instantiate a method body expression in a new context, for example the body of a
/// lambda whose arguments become the lambda parameters.
#[derive(Debug, Clone)]
pub struct TermRenamer {
    suffix: String,
    mapping: HashMap<Term, Term>,
}

impl TermRenamer {
    /// Creates a renamer.
    ///
    /// # Arguments
    ///
    /// * `suffix` - Appended verbatim to the name of every unmapped named value
    /// * `mapping` - Terms replaced as a whole
    #[must_use]
    pub fn new(suffix: impl Into<String>, mapping: HashMap<Term, Term>) -> Self {
        Self {
            suffix: suffix.into(),
            mapping,
        }
    }

    /// The suffix appended to named values.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Transformer for TermRenamer {
    fn enter_term(&mut self, term: &Term) -> Result<Option<Term>> {
        Ok(self.mapping.get(term).cloned())
    }

    fn exit_term(&mut self, term: Term) -> Result<Term> {
        match term.kind() {
            TermKind::Value { name } => Ok(Term::value(
                term.ty().clone(),
                format!("{name}{}", self.suffix),
            )),
            _ => Ok(term),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{program::BinaryOp, types::SymType};

    #[test]
    fn test_mapping_and_suffix() {
        let arg = Term::argument(SymType::Int, 0);
        let local = Term::value(SymType::Int, "%t");
        let body = Term::binary_typed(SymType::Int, BinaryOp::Mul, arg.clone(), local).unwrap();

        let param = Term::value(SymType::Int, "lambda_f_0");
        let mut mapping = HashMap::new();
        mapping.insert(arg, param);
        let mut renamer = TermRenamer::new(".lambda.f", mapping);

        let renamed = renamer.transform(&body).unwrap();
        assert_eq!(renamed.name(), "(lambda_f_0 * %t.lambda.f)");
    }

    #[test]
    fn test_constants_untouched() {
        let mut renamer = TermRenamer::new(".x", HashMap::new());
        let one = Term::int(1);
        assert!(renamer.transform(&one).unwrap().ptr_eq(&one));
        let this = Term::this(SymType::object());
        assert!(renamer.transform(&this).unwrap().ptr_eq(&this));
    }
}
