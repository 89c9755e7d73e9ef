use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

/// Arithmetic and bitwise operators of binary instructions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr, Serialize, Deserialize,
)]
pub enum BinaryOp {
    /// Addition
    #[strum(serialize = "+")]
    Add,
    /// Subtraction
    #[strum(serialize = "-")]
    Sub,
    /// Multiplication
    #[strum(serialize = "*")]
    Mul,
    /// Division
    #[strum(serialize = "/")]
    Div,
    /// Remainder
    #[strum(serialize = "%")]
    Rem,
    /// Left shift
    #[strum(serialize = "<<")]
    Shl,
    /// Arithmetic right shift
    #[strum(serialize = ">>")]
    Shr,
    /// Logical right shift
    #[strum(serialize = ">>>")]
    Ushr,
    /// Bitwise and
    #[strum(serialize = "&")]
    And,
    /// Bitwise or
    #[strum(serialize = "|")]
    Or,
    /// Bitwise exclusive or
    #[strum(serialize = "^")]
    Xor,
}

/// Comparison operators.
///
/// `Cmp`, `Cmpg` and `Cmpl` are the three-way comparisons of `lcmp`, `fcmpg`/`dcmpg` and
/// `fcmpl`/`dcmpl`; they produce an `int`. All other operators produce a `boolean`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr, Serialize, Deserialize,
)]
pub enum CmpOp {
    /// Equal
    #[strum(serialize = "==")]
    Eq,
    /// Not equal
    #[strum(serialize = "!=")]
    Neq,
    /// Less than
    #[strum(serialize = "<")]
    Lt,
    /// Greater than
    #[strum(serialize = ">")]
    Gt,
    /// Less or equal
    #[strum(serialize = "<=")]
    Le,
    /// Greater or equal
    #[strum(serialize = ">=")]
    Ge,
    /// Three-way comparison of integral values
    #[strum(serialize = "cmp")]
    Cmp,
    /// Three-way comparison, NaN compares greater
    #[strum(serialize = "cmpg")]
    Cmpg,
    /// Three-way comparison, NaN compares less
    #[strum(serialize = "cmpl")]
    Cmpl,
}

impl CmpOp {
    /// Returns `true` for the three-way comparisons producing an `int`.
    #[must_use]
    pub const fn is_three_way(self) -> bool {
        matches!(self, CmpOp::Cmp | CmpOp::Cmpg | CmpOp::Cmpl)
    }

    /// The operator testing the opposite condition, `None` for three-way comparisons.
    #[must_use]
    pub const fn negated(self) -> Option<CmpOp> {
        match self {
            CmpOp::Eq => Some(CmpOp::Neq),
            CmpOp::Neq => Some(CmpOp::Eq),
            CmpOp::Lt => Some(CmpOp::Ge),
            CmpOp::Ge => Some(CmpOp::Lt),
            CmpOp::Gt => Some(CmpOp::Le),
            CmpOp::Le => Some(CmpOp::Gt),
            CmpOp::Cmp | CmpOp::Cmpg | CmpOp::Cmpl => None,
        }
    }
}

/// Unary instruction operators.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr, Serialize, Deserialize,
)]
pub enum UnaryOp {
    /// Arithmetic negation
    #[strum(serialize = "-")]
    Neg,
    /// Array length
    #[strum(serialize = "length")]
    Length,
}
