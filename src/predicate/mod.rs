//! Predicates: single facts about single instructions.
//!
//! A [`Predicate`] is either a state update (an assignment, a store, a call effect, an
//! allocation, a monitor operation) or a path constraint. Its [`PredicateType`] says which of
//! the two roles it plays, its [`PredicateKind`] says what it states, and its operands are the
//! terms it states it about.
//!
//! Predicates are created through a [`PredicateBuilder`], which fixes type and source location
//! once for every predicate it makes.
//!
//! # Examples
//!
//! ```rust,ignore
//! use symtrace::predicate::PredicateBuilder;
//! use symtrace::program::Location;
//! use symtrace::term::Term;
//!
//! let state = PredicateBuilder::state(Location::line(12));
//! let assign = state.equality(result.clone(), sum);
//! assert_eq!(assign.to_string(), "@S %3_0 = (arg$0 + arg$1)");
//! ```

mod builder;

pub use builder::PredicateBuilder;

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::{program::Location, term::Term, transform::Transformer, Error, Result};

/// Role of a predicate in the symbolic state.
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
pub enum PredicateType {
    /// Effect of an executed instruction
    #[strum(serialize = "@S")]
    State,
    /// Branch or guard decision taken by the execution
    #[strum(serialize = "@P")]
    Path,
    /// Assumption made by an analysis
    #[strum(serialize = "@A")]
    Assume,
    /// Fact that holds for every execution
    #[strum(serialize = "@X")]
    Axiom,
    /// Condition to be proven
    #[strum(serialize = "@R")]
    Require,
}

/// What a predicate states.
///
/// The operand layout of each kind is documented on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum PredicateKind {
    /// `[lhv, rhv]`, `lhv = rhv`
    Equality,
    /// `[lhv, rhv]`, `lhv != rhv`
    Inequality,
    /// `[cond, keys..]`, `cond` matches none of the keys
    DefaultSwitch,
    /// `[lhv?, call]`
    Call {
        /// Whether the call result is bound to a left-hand value
        has_lhv: bool,
    },
    /// `[element_ref, value]`
    ArrayStore,
    /// `[field_ref, value]`
    FieldStore,
    /// `[element_ref, value]`, store into a freshly allocated array
    ArrayInitializer,
    /// `[field_ref, value]`, store into a freshly allocated object
    FieldInitializer,
    /// `[lhv]`, the allocated type is the type of `lhv`
    New,
    /// `[lhv, dimensions..]`
    NewArray,
    /// `[lhv]`, allocation whose fields are initialized by following initializers
    NewInitializer,
    /// `[lhv, length]`, allocation whose elements are initialized by following initializers
    NewArrayInitializer,
    /// `[throwable]`
    Catch,
    /// `[throwable]`
    Throw,
    /// `[monitor]`
    EnterMonitor,
    /// `[monitor]`
    ExitMonitor,
    /// `[pointer, bound]`
    BoundStore,
    /// `[lhv, length, generator]`, array whose elements are produced by a lambda
    GenerateArray,
}

impl PredicateKind {
    /// Short kind name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// One state update or path constraint.
///
/// Equality and hashing ignore the location: two predicates stating the same fact about the
/// same terms are equal wherever they come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    kind: PredicateKind,
    #[serde(rename = "type")]
    ty: PredicateType,
    #[serde(default)]
    location: Location,
    operands: Vec<Term>,
}

impl Predicate {
    pub(crate) fn new(
        kind: PredicateKind,
        ty: PredicateType,
        location: Location,
        operands: Vec<Term>,
    ) -> Self {
        Self {
            kind,
            ty,
            location,
            operands,
        }
    }

    /// What the predicate states.
    #[must_use]
    pub const fn kind(&self) -> PredicateKind {
        self.kind
    }

    /// Role of the predicate.
    #[must_use]
    pub const fn ty(&self) -> PredicateType {
        self.ty
    }

    /// Source location of the instruction the predicate describes.
    #[must_use]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// Operand terms in kind-specific order.
    #[must_use]
    pub fn operands(&self) -> &[Term] {
        &self.operands
    }

    /// First operand, the left-hand value of assignments.
    #[must_use]
    pub fn lhv(&self) -> Option<&Term> {
        match self.kind {
            PredicateKind::Call { has_lhv: false } => None,
            _ => self.operands.first(),
        }
    }

    /// Last operand, the assigned value of equalities and stores, the call of call
    /// predicates.
    #[must_use]
    pub fn rhv(&self) -> Option<&Term> {
        self.operands.last()
    }

    /// Returns a copy with the role replaced.
    #[must_use]
    pub fn with_type(&self, ty: PredicateType) -> Predicate {
        Predicate {
            ty,
            ..self.clone()
        }
    }

    /// Applies `transformer` to every operand.
    ///
    /// # Returns
    ///
    /// A clone of `self` sharing every operand if nothing changed, a predicate over the
    /// transformed operands otherwise.
    ///
    /// # Errors
    ///
    /// Propagates failures of the transformer.
    pub fn accept<T: Transformer + ?Sized>(&self, transformer: &mut T) -> Result<Predicate> {
        let mut changed = false;
        let mut operands = Vec::with_capacity(self.operands.len());
        for operand in &self.operands {
            let transformed = transformer.transform(operand)?;
            if transformed != *operand {
                changed = true;
            }
            operands.push(transformed);
        }

        if changed {
            Ok(Predicate {
                operands,
                ..self.clone()
            })
        } else {
            Ok(self.clone())
        }
    }

    /// The negation of an equality or inequality.
    ///
    /// An equality with a boolean constant on the right flips the constant, every other
    /// equality becomes an inequality and the other way around. Path clauses are inverted this
    /// way when an analysis wants the branch not taken.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeError`] for kinds without a negation.
    pub fn inverse(&self) -> Result<Predicate> {
        let (kind, operands) = match (self.kind, self.operands.as_slice()) {
            (PredicateKind::Equality, [lhv, rhv]) => match rhv.as_bool() {
                Some(value) => (PredicateKind::Equality, vec![lhv.clone(), Term::bool(!value)]),
                None => (PredicateKind::Inequality, self.operands.clone()),
            },
            (PredicateKind::Inequality, [_, _]) => (PredicateKind::Equality, self.operands.clone()),
            _ => {
                return Err(Error::TypeError(format!(
                    "Predicate `{self}` of kind {} has no inverse",
                    self.kind.name()
                )))
            }
        };
        Ok(Predicate {
            kind,
            operands,
            ..self.clone()
        })
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.ty == other.ty && self.operands == other.operands
    }
}

impl Eq for Predicate {}

impl Hash for Predicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.ty.hash(state);
        self.operands.hash(state);
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = |index: usize| {
            self.operands
                .get(index)
                .map_or_else(|| "?".to_string(), Term::to_string)
        };
        let rest = |from: usize| {
            self.operands
                .get(from..)
                .unwrap_or_default()
                .iter()
                .map(Term::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        write!(f, "{} ", self.ty)?;
        match self.kind {
            PredicateKind::Equality => write!(f, "{} = {}", op(0), op(1)),
            PredicateKind::Inequality => write!(f, "{} != {}", op(0), op(1)),
            PredicateKind::DefaultSwitch => write!(f, "{} !in ({})", op(0), rest(1)),
            PredicateKind::Call { has_lhv: true } => write!(f, "{} = {}", op(0), op(1)),
            PredicateKind::Call { has_lhv: false } => write!(f, "{}", op(0)),
            PredicateKind::ArrayStore | PredicateKind::FieldStore => {
                write!(f, "*({}) = {}", op(0), op(1))
            }
            PredicateKind::ArrayInitializer | PredicateKind::FieldInitializer => {
                write!(f, "*({}) := {}", op(0), op(1))
            }
            PredicateKind::New | PredicateKind::NewInitializer => {
                let ty = self
                    .operands
                    .first()
                    .map_or_else(|| "?".to_string(), |lhv| lhv.ty().to_string());
                write!(f, "{} = new {ty}", op(0))
            }
            PredicateKind::NewArray => {
                let element = self
                    .operands
                    .first()
                    .and_then(|lhv| lhv.ty().element().map(ToString::to_string))
                    .unwrap_or_else(|| "?".to_string());
                write!(f, "{} = new {element}[{}]", op(0), rest(1))
            }
            PredicateKind::NewArrayInitializer => write!(f, "{} = new [{}]", op(0), op(1)),
            PredicateKind::Catch => write!(f, "catch {}", op(0)),
            PredicateKind::Throw => write!(f, "throw {}", op(0)),
            PredicateKind::EnterMonitor => write!(f, "enterMonitor {}", op(0)),
            PredicateKind::ExitMonitor => write!(f, "exitMonitor {}", op(0)),
            PredicateKind::BoundStore => write!(f, "bound({}) = {}", op(0), op(1)),
            PredicateKind::GenerateArray => {
                write!(f, "{} = generate({}, {})", op(0), op(1), op(2))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{program::CmpOp, types::SymType};

    #[test]
    fn test_location_not_part_of_identity() {
        let x = Term::value(SymType::Int, "x");
        let a = PredicateBuilder::state(Location::line(3)).equality(x.clone(), Term::int(1));
        let b = PredicateBuilder::state(Location::line(9)).equality(x.clone(), Term::int(1));
        let c = PredicateBuilder::path(Location::line(3)).equality(x, Term::int(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        let x = Term::value(SymType::Int, "x");
        let cond = Term::cmp(CmpOp::Gt, x.clone(), Term::int(0)).unwrap();
        let path = PredicateBuilder::path(Location::default()).equality(cond, Term::bool(true));
        assert_eq!(path.to_string(), "@P (x > 0) = true");

        let switch = PredicateBuilder::path(Location::default())
            .default_switch(x, vec![Term::int(1), Term::int(2)]);
        assert_eq!(switch.to_string(), "@P x !in (1, 2)");
    }

    #[test]
    fn test_inverse() {
        let x = Term::value(SymType::Int, "x");
        let cond = Term::cmp(CmpOp::Gt, x.clone(), Term::int(0)).unwrap();
        let path = PredicateBuilder::path(Location::default()).equality(cond.clone(), Term::bool(true));
        let inverted = path.inverse().unwrap();
        assert_eq!(inverted.rhv(), Some(&Term::bool(false)));
        assert_eq!(inverted.inverse().unwrap(), path);

        let eq = PredicateBuilder::state(Location::default()).equality(x.clone(), Term::int(1));
        assert_eq!(eq.inverse().unwrap().kind(), PredicateKind::Inequality);

        let throw = PredicateBuilder::state(Location::default()).throw(Term::null());
        assert!(throw.inverse().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let x = Term::value(SymType::Int, "x");
        let predicate = PredicateBuilder::state(Location::line(4)).equality(x, Term::int(7));
        let json = serde_json::to_string(&predicate).unwrap();
        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, predicate);
        assert_eq!(back.location().line, 4);
    }
}
