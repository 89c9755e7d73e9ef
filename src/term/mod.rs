//! Symbolic term algebra.
//!
//! A [`Term`] is an immutable node of a symbolic expression DAG. Every term has a display
//! name, a [`SymType`] and an ordered list of subterms; the [`TermKind`] tag says which of the
//! variants the node is and carries the little payload not expressed by the other fields.
//!
//! # Architecture
//!
//! Terms are reference counted (`Arc`) and never mutated after construction, so sharing a
//! subterm between many parents is free and terms can cross thread boundaries. Parents own
//! their children; no term refers back to its parent.
//!
//! Composite terms are created through the smart constructors in this module
//! ([`Term::binary`], [`Term::array_index`], [`Term::call`], ...). They validate operand types,
//! infer the result type when it is not given explicitly, and derive the display name.
//!
//! ## Equality
//!
//! Equality is structural: two terms are equal if they have the same variant, name, type and
//! pairwise equal subterms. For composite variants the name is derived from the type and the
//! subterms, so it adds nothing; for constants and named values it is the primary payload.
//! The hash is computed once at construction from the same data. [`Term::ptr_eq`] tests
//! node identity.
//!
//! ## Rewriting
//!
//! [`Term::accept`] applies a [`crate::transform::Transformer`] to every child. If every
//! transformed child equals the original, the original node is returned unchanged; otherwise
//! the node is rebuilt through its smart constructor, so the type rules run again.
//!
//! # Examples
//!
//! ```rust,ignore
//! use symtrace::term::Term;
//! use symtrace::program::CmpOp;
//! use symtrace::types::SymType;
//!
//! let x = Term::argument(SymType::Int, 0);
//! let positive = Term::cmp(CmpOp::Gt, x.clone(), Term::int(0))?;
//! assert_eq!(positive.ty(), &SymType::Bool);
//! assert_eq!(positive.name(), "(arg$0 > 0)");
//! ```

mod factory;
mod kind;

pub use kind::TermKind;

use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    mem,
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{transform::Transformer, types::SymType, Result};

/// Shared node storage of a [`Term`].
#[derive(Debug)]
struct TermNode {
    kind: TermKind,
    name: String,
    ty: SymType,
    subterms: Vec<Term>,
    hash: u64,
}

/// Immutable, reference counted node of a symbolic expression.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "TermRepr", into = "TermRepr")]
pub struct Term(Arc<TermNode>);

impl Term {
    /// Creates a node without validating operands.
    ///
    /// The name is derived from kind, type and subterms. Smart constructors call this after
    /// their checks succeed.
    pub(crate) fn from_parts(kind: TermKind, ty: SymType, subterms: Vec<Term>) -> Term {
        let name = kind.render(&ty, &subterms);

        let mut hasher = DefaultHasher::new();
        mem::discriminant(&kind).hash(&mut hasher);
        name.hash(&mut hasher);
        ty.hash(&mut hasher);
        for subterm in &subterms {
            hasher.write_u64(subterm.0.hash);
        }
        let hash = hasher.finish();

        Term(Arc::new(TermNode {
            kind,
            name,
            ty,
            subterms,
            hash,
        }))
    }

    /// The variant tag and payload.
    #[must_use]
    pub fn kind(&self) -> &TermKind {
        &self.0.kind
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Type of the term.
    #[must_use]
    pub fn ty(&self) -> &SymType {
        &self.0.ty
    }

    /// Ordered child terms.
    #[must_use]
    pub fn subterms(&self) -> &[Term] {
        &self.0.subterms
    }

    /// Returns `true` if both handles point to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Term) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns `true` for constant terms, including `null`.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.0.kind.is_constant()
    }

    /// Returns `true` for `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.0.kind, TermKind::Null)
    }

    /// Value of a boolean constant.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.0.kind {
            TermKind::ConstBool(value) => Some(value),
            _ => None,
        }
    }

    /// Value of an integral constant, widened to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self.0.kind {
            TermKind::ConstByte(value) => Some(i64::from(value)),
            TermKind::ConstChar(value) => Some(i64::from(value)),
            TermKind::ConstShort(value) => Some(i64::from(value)),
            TermKind::ConstInt(value) => Some(i64::from(value)),
            TermKind::ConstLong(value) => Some(value),
            _ => None,
        }
    }

    /// Applies `transformer` to every child and rebuilds the node if any child changed.
    ///
    /// # Returns
    ///
    /// `self` (the same node) if every transformed child equals the original, a node rebuilt
    /// through the variant's smart constructor otherwise.
    ///
    /// # Errors
    ///
    /// Propagates failures of the transformer and [`crate::Error::TypeError`] if the rebuilt
    /// node is ill-typed.
    pub fn accept<T: Transformer + ?Sized>(&self, transformer: &mut T) -> Result<Term> {
        if self.subterms().is_empty() {
            return Ok(self.clone());
        }

        let mut changed = false;
        let mut subterms = Vec::with_capacity(self.subterms().len());
        for child in self.subterms() {
            let transformed = transformer.transform(child)?;
            if transformed != *child {
                changed = true;
            }
            subterms.push(transformed);
        }

        if changed {
            self.rebuild(subterms)
        } else {
            Ok(self.clone())
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.0.hash == other.0.hash
            && mem::discriminant(&self.0.kind) == mem::discriminant(&other.0.kind)
            && self.0.name == other.0.name
            && self.0.ty == other.0.ty
            && self.0.subterms == other.0.subterms
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0.name, self.0.ty)
    }
}

/// Serialized form of a term. The name is re-derived on load.
#[derive(Serialize, Deserialize)]
struct TermRepr {
    kind: TermKind,
    #[serde(rename = "type")]
    ty: SymType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    subterms: Vec<Term>,
}

impl From<TermRepr> for Term {
    fn from(repr: TermRepr) -> Self {
        Term::from_parts(repr.kind, repr.ty, repr.subterms)
    }
}

impl From<Term> for TermRepr {
    fn from(term: Term) -> Self {
        TermRepr {
            kind: term.0.kind.clone(),
            ty: term.0.ty.clone(),
            subterms: term.0.subterms.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::program::{BinaryOp, CmpOp};

    #[test]
    fn test_structural_equality() {
        let a = Term::binary_typed(
            SymType::Int,
            BinaryOp::Add,
            Term::argument(SymType::Int, 0),
            Term::int(1),
        )
        .unwrap();
        let b = Term::binary_typed(
            SymType::Int,
            BinaryOp::Add,
            Term::argument(SymType::Int, 0),
            Term::int(1),
        )
        .unwrap();

        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_constants_compare_by_payload() {
        assert_eq!(Term::int(3), Term::int(3));
        assert_ne!(Term::int(3), Term::int(4));
        assert_ne!(Term::int(3), Term::long(3));
        assert_ne!(
            Term::value(SymType::Int, "x"),
            Term::value(SymType::Long, "x")
        );
        assert_ne!(Term::value(SymType::Int, "x"), Term::value(SymType::Int, "y"));
    }

    #[test]
    fn test_same_name_different_variant() {
        let value = Term::value(SymType::Int, "arg$0");
        let argument = Term::argument(SymType::Int, 0);
        assert_eq!(value.name(), argument.name());
        assert_ne!(value, argument);
    }

    #[test]
    fn test_names() {
        let x = Term::value(SymType::Int, "x");
        let cmp = Term::cmp(CmpOp::Ge, x.clone(), Term::int(0)).unwrap();
        assert_eq!(cmp.name(), "(x >= 0)");
        assert_eq!(Term::long(5).name(), "5L");
        assert_eq!(Term::string("a\"b").name(), "\"a\\\"b\"");
        assert_eq!(format!("{cmp:?}"), "(x >= 0): boolean");
    }

    #[test]
    fn test_serde_round_trip() {
        let array = Term::value(SymType::array(SymType::Int), "a");
        let load = Term::array_index(array, Term::argument(SymType::Int, 1))
            .and_then(|index| Term::load(&index))
            .unwrap();

        let json = serde_json::to_string(&load).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(back, load);
        assert_eq!(back.name(), "*(a[arg$1])");
    }
}
