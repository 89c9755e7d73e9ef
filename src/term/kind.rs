use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    program::{BinaryOp, CmpOp, Method},
    types::SymType,
};

use super::Term;

/// Variant tag and payload of a [`Term`].
///
/// The subterm layout of each composite variant is fixed and documented on the variant. The
/// payload only carries what is not already expressed by the type and the subterms.
#[derive(Debug, Clone, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum TermKind {
    /// Formal argument `arg$index` of the method under analysis
    Argument {
        /// Zero based argument position
        index: usize,
    },
    /// Named symbolic value
    Value {
        /// Unique name of the value
        name: String,
    },
    /// Receiver of the method under analysis
    This,
    /// Value returned by a method
    ReturnValue {
        /// The returning method
        method: Arc<Method>,
    },
    /// `null`
    Null,
    /// `boolean` constant
    ConstBool(bool),
    /// `byte` constant
    ConstByte(i8),
    /// `char` constant
    ConstChar(u16),
    /// `short` constant
    ConstShort(i16),
    /// `int` constant
    ConstInt(i32),
    /// `long` constant
    ConstLong(i64),
    /// `float` constant
    ConstFloat(f32),
    /// `double` constant
    ConstDouble(f64),
    /// String constant
    ConstString(String),
    /// Class literal
    ConstClass(SymType),
    /// Owner of static members of a class
    StaticClassRef,
    /// `[array, index]`, reference to an array element
    ArrayIndex,
    /// `[element_ref]`, value stored at an array element reference
    ArrayLoad,
    /// `[array]`
    ArrayLength,
    /// `[array, value]`
    ArrayContains,
    /// `[owner]`, reference to a field of `owner`
    Field {
        /// Field name
        name: String,
    },
    /// `[field_ref]`, value stored at a field reference
    FieldLoad,
    /// `[lhv, rhv]`
    Binary(BinaryOp),
    /// `[operand]`
    Neg,
    /// `[lhv, rhv]`
    Cmp(CmpOp),
    /// `[lhv, rhv]`, reference equality
    Equals,
    /// `[operand]`, the target type is the term type
    Cast,
    /// `[operand]`
    InstanceOf {
        /// Type tested against
        checked: SymType,
    },
    /// `[owner, args..]`
    Call {
        /// Statically resolved callee
        method: Arc<Method>,
    },
    /// `[lhv, rhv]`
    Concat,
    /// `[string, offset, length]`
    Substring,
    /// `[string, substring, offset]`
    IndexOf,
    /// `[string, index]`
    CharAt,
    /// `[string]`
    StringLength,
    /// `[string, substring]`
    StringContains,
    /// `[string, prefix]`
    StartsWith,
    /// `[string, suffix]`
    EndsWith,
    /// `[string]`, parse to the term type
    StringParse,
    /// `[operand]`
    ToString,
    /// `[start, end, body]`, `body` holds for every index in `start..end`
    ForAll,
    /// `[start, end, body]`, `body` holds for some index in `start..end`
    Exists,
    /// `[condition, then, else]`
    Ite,
    /// `[params.., body]`
    Lambda,
    /// `[operand]`, runtime class of a reference
    ClassAccess,
    /// `[pointer]`, allocation bound of a reference
    Bound,
    /// Explicitly undefined value
    Undef,
}

impl TermKind {
    /// Short variant name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Returns `true` for constant variants, including `null`.
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        matches!(
            self,
            TermKind::Null
                | TermKind::ConstBool(_)
                | TermKind::ConstByte(_)
                | TermKind::ConstChar(_)
                | TermKind::ConstShort(_)
                | TermKind::ConstInt(_)
                | TermKind::ConstLong(_)
                | TermKind::ConstFloat(_)
                | TermKind::ConstDouble(_)
                | TermKind::ConstString(_)
                | TermKind::ConstClass(_)
        )
    }

    /// Returns `true` for variants that never have subterms.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.is_constant()
            || matches!(
                self,
                TermKind::Argument { .. }
                    | TermKind::Value { .. }
                    | TermKind::This
                    | TermKind::ReturnValue { .. }
                    | TermKind::StaticClassRef
                    | TermKind::Undef
            )
    }

    /// Renders the display name of a term with this kind.
    pub(crate) fn render(&self, ty: &SymType, subterms: &[Term]) -> String {
        let sub = |index: usize| subterms.get(index).map_or("?", |term| term.name());
        let joined = |terms: &[Term]| {
            terms
                .iter()
                .map(|term| term.name().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        match self {
            TermKind::Argument { index } => format!("arg${index}"),
            TermKind::Value { name } => name.clone(),
            TermKind::This => "this".to_string(),
            TermKind::ReturnValue { method } => format!("<retval>{}.{}", method.class, method.name),
            TermKind::Null => "null".to_string(),
            TermKind::ConstBool(value) => value.to_string(),
            TermKind::ConstByte(value) => format!("{value}b"),
            TermKind::ConstChar(value) => match char::from_u32(u32::from(*value)) {
                Some(c) => format!("'{}'", c.escape_default()),
                None => format!("'\\u{{{value:04x}}}'"),
            },
            TermKind::ConstShort(value) => format!("{value}s"),
            TermKind::ConstInt(value) => value.to_string(),
            TermKind::ConstLong(value) => format!("{value}L"),
            TermKind::ConstFloat(value) => format!("{value:?}f"),
            TermKind::ConstDouble(value) => format!("{value:?}"),
            TermKind::ConstString(value) => format!("\"{}\"", value.escape_default()),
            TermKind::ConstClass(constant) => format!("{constant}.class"),
            TermKind::StaticClassRef => format!("static {ty}"),
            TermKind::ArrayIndex => format!("{}[{}]", sub(0), sub(1)),
            TermKind::ArrayLoad | TermKind::FieldLoad => format!("*({})", sub(0)),
            TermKind::ArrayLength => format!("{}.length", sub(0)),
            TermKind::ArrayContains => format!("{} in {}", sub(1), sub(0)),
            TermKind::Field { name } => format!("{}.{name}", sub(0)),
            TermKind::Binary(op) => format!("({} {op} {})", sub(0), sub(1)),
            TermKind::Neg => format!("-{}", sub(0)),
            TermKind::Cmp(op) => format!("({} {op} {})", sub(0), sub(1)),
            TermKind::Equals => format!("{}.equals({})", sub(0), sub(1)),
            TermKind::Cast => format!("({ty}) {}", sub(0)),
            TermKind::InstanceOf { checked } => format!("{} instanceof {checked}", sub(0)),
            TermKind::Call { method } => format!(
                "{}.{}({})",
                sub(0),
                method.name,
                joined(subterms.get(1..).unwrap_or_default())
            ),
            TermKind::Concat => format!("{} ++ {}", sub(0), sub(1)),
            TermKind::Substring => format!("{}.substring({}, {})", sub(0), sub(1), sub(2)),
            TermKind::IndexOf => format!("{}.indexOf({}, {})", sub(0), sub(1), sub(2)),
            TermKind::CharAt => format!("{}.charAt({})", sub(0), sub(1)),
            TermKind::StringLength => format!("{}.length()", sub(0)),
            TermKind::StringContains => format!("{}.contains({})", sub(0), sub(1)),
            TermKind::StartsWith => format!("{}.startsWith({})", sub(0), sub(1)),
            TermKind::EndsWith => format!("{}.endsWith({})", sub(0), sub(1)),
            TermKind::StringParse => format!("{ty}.parse({})", sub(0)),
            TermKind::ToString => format!("{}.toString()", sub(0)),
            TermKind::ForAll => format!("forAll({}, {}, {})", sub(0), sub(1), sub(2)),
            TermKind::Exists => format!("exists({}, {}, {})", sub(0), sub(1), sub(2)),
            TermKind::Ite => format!("ite({}, {}, {})", sub(0), sub(1), sub(2)),
            TermKind::Lambda => {
                let (params, body) = subterms.split_at(subterms.len().saturating_sub(1));
                format!(
                    "({}) -> {{ {} }}",
                    joined(params),
                    body.first().map_or("?", |term| term.name())
                )
            }
            TermKind::ClassAccess => format!("{}.getClass()", sub(0)),
            TermKind::Bound => format!("bound({})", sub(0)),
            TermKind::Undef => "<undef>".to_string(),
        }
    }
}
