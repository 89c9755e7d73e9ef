//! Smart constructors.
//!
//! Leaf constructors are infallible. Composite constructors validate their operands and
//! return [`Error::TypeError`] when the operand types do not fit the variant.

use std::sync::Arc;

use crate::{
    program::{BinaryOp, CmpOp, Constant, Method, UnaryOp},
    term::{Term, TermKind},
    types::{merge_types, ClassHierarchy, SymType, CLASS_CLASS},
    Error, Result,
};

fn type_error(message: String) -> Error {
    Error::TypeError(message)
}

fn expect_pointer(term: &Term, role: &str) -> Result<()> {
    if term.ty().is_pointer() {
        Ok(())
    } else {
        Err(type_error(format!(
            "{role} `{term}` must be a reference, found {}",
            term.ty()
        )))
    }
}

fn expect_integral(term: &Term, role: &str) -> Result<()> {
    if term.ty().is_integral() {
        Ok(())
    } else {
        Err(type_error(format!(
            "{role} `{term}` must be integral, found {}",
            term.ty()
        )))
    }
}

fn expect_bool(term: &Term, role: &str) -> Result<()> {
    if *term.ty() == SymType::Bool {
        Ok(())
    } else {
        Err(type_error(format!(
            "{role} `{term}` must be boolean, found {}",
            term.ty()
        )))
    }
}

fn expect_string(term: &Term, role: &str) -> Result<()> {
    if term.ty().is_string() || term.is_null() {
        Ok(())
    } else {
        Err(type_error(format!(
            "{role} `{term}` must be a string, found {}",
            term.ty()
        )))
    }
}

fn expect_value(term: &Term, role: &str) -> Result<()> {
    match term.ty() {
        SymType::Void | SymType::Reference(_) => Err(type_error(format!(
            "{role} `{term}` has no value type, found {}",
            term.ty()
        ))),
        _ => Ok(()),
    }
}

impl Term {
    // Leaves

    /// Formal argument `arg$index` of type `ty`.
    #[must_use]
    pub fn argument(ty: SymType, index: usize) -> Term {
        Term::from_parts(TermKind::Argument { index }, ty, Vec::new())
    }

    /// Named symbolic value.
    #[must_use]
    pub fn value(ty: SymType, name: impl Into<String>) -> Term {
        Term::from_parts(TermKind::Value { name: name.into() }, ty, Vec::new())
    }

    /// Receiver of type `ty`.
    #[must_use]
    pub fn this(ty: SymType) -> Term {
        Term::from_parts(TermKind::This, ty, Vec::new())
    }

    /// Value returned by `method`.
    #[must_use]
    pub fn return_value(method: Arc<Method>) -> Term {
        let ty = method.desc.ret.clone();
        Term::from_parts(TermKind::ReturnValue { method }, ty, Vec::new())
    }

    /// `null`
    #[must_use]
    pub fn null() -> Term {
        Term::from_parts(TermKind::Null, SymType::Null, Vec::new())
    }

    /// `boolean` constant.
    #[must_use]
    pub fn bool(value: bool) -> Term {
        Term::from_parts(TermKind::ConstBool(value), SymType::Bool, Vec::new())
    }

    /// `byte` constant.
    #[must_use]
    pub fn byte(value: i8) -> Term {
        Term::from_parts(TermKind::ConstByte(value), SymType::Byte, Vec::new())
    }

    /// `char` constant.
    #[must_use]
    pub fn char(value: u16) -> Term {
        Term::from_parts(TermKind::ConstChar(value), SymType::Char, Vec::new())
    }

    /// `short` constant.
    #[must_use]
    pub fn short(value: i16) -> Term {
        Term::from_parts(TermKind::ConstShort(value), SymType::Short, Vec::new())
    }

    /// `int` constant.
    #[must_use]
    pub fn int(value: i32) -> Term {
        Term::from_parts(TermKind::ConstInt(value), SymType::Int, Vec::new())
    }

    /// `long` constant.
    #[must_use]
    pub fn long(value: i64) -> Term {
        Term::from_parts(TermKind::ConstLong(value), SymType::Long, Vec::new())
    }

    /// `float` constant.
    #[must_use]
    pub fn float(value: f32) -> Term {
        Term::from_parts(TermKind::ConstFloat(value), SymType::Float, Vec::new())
    }

    /// `double` constant.
    #[must_use]
    pub fn double(value: f64) -> Term {
        Term::from_parts(TermKind::ConstDouble(value), SymType::Double, Vec::new())
    }

    /// String constant.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Term {
        Term::from_parts(TermKind::ConstString(value.into()), SymType::string(), Vec::new())
    }

    /// Class literal for `constant`.
    #[must_use]
    pub fn class_constant(constant: SymType) -> Term {
        Term::from_parts(
            TermKind::ConstClass(constant),
            SymType::class(CLASS_CLASS),
            Vec::new(),
        )
    }

    /// Owner of the static members of `class`.
    #[must_use]
    pub fn static_ref(class: &str) -> Term {
        Term::from_parts(TermKind::StaticClassRef, SymType::class(class), Vec::new())
    }

    /// Constant term for a program constant.
    #[must_use]
    pub fn constant(constant: &Constant) -> Term {
        match constant {
            Constant::Null => Term::null(),
            Constant::Bool(value) => Term::bool(*value),
            Constant::Byte(value) => Term::byte(*value),
            Constant::Char(value) => Term::char(*value),
            Constant::Short(value) => Term::short(*value),
            Constant::Int(value) => Term::int(*value),
            Constant::Long(value) => Term::long(*value),
            Constant::Float(value) => Term::float(*value),
            Constant::Double(value) => Term::double(*value),
            Constant::String(value) => Term::string(value.as_str()),
            Constant::Class(value) => Term::class_constant(value.clone()),
        }
    }

    /// Explicitly undefined value of type `ty`.
    #[must_use]
    pub fn undef(ty: SymType) -> Term {
        Term::from_parts(TermKind::Undef, ty, Vec::new())
    }

    // Memory

    /// Reference to element `index` of `array`.
    ///
    /// # Errors
    ///
    /// Fails if `array` is not an array or `index` is not integral.
    pub fn array_index(array: Term, index: Term) -> Result<Term> {
        let Some(element) = array.ty().element().cloned() else {
            return Err(type_error(format!(
                "Indexed term `{array}` must be an array, found {}",
                array.ty()
            )));
        };
        expect_integral(&index, "Array index")?;
        Ok(Term::from_parts(
            TermKind::ArrayIndex,
            SymType::reference(element),
            vec![array, index],
        ))
    }

    /// Value stored at an array element reference.
    ///
    /// # Errors
    ///
    /// Fails if `index` is not an array element reference.
    pub fn array_load(index: Term) -> Result<Term> {
        if !matches!(index.kind(), TermKind::ArrayIndex) {
            return Err(type_error(format!(
                "Array load needs an element reference, found `{index}`"
            )));
        }
        Self::load_referenced(TermKind::ArrayLoad, index)
    }

    /// Length of `array`.
    ///
    /// # Errors
    ///
    /// Fails if `array` is not an array.
    pub fn array_length(array: Term) -> Result<Term> {
        if array.ty().element().is_none() {
            return Err(type_error(format!(
                "Length of `{array}` needs an array, found {}",
                array.ty()
            )));
        }
        Ok(Term::from_parts(TermKind::ArrayLength, SymType::Int, vec![array]))
    }

    /// `value` occurs in `array`.
    ///
    /// # Errors
    ///
    /// Fails if `array` is not an array.
    pub fn array_contains(array: Term, value: Term) -> Result<Term> {
        if array.ty().element().is_none() {
            return Err(type_error(format!(
                "Containment test needs an array, found `{array}`"
            )));
        }
        expect_value(&value, "Contained value")?;
        Ok(Term::from_parts(
            TermKind::ArrayContains,
            SymType::Bool,
            vec![array, value],
        ))
    }

    /// Reference to field `name` of type `ty` of `owner`.
    ///
    /// `owner` is either an object reference or a [`Term::static_ref`].
    ///
    /// # Errors
    ///
    /// Fails if `owner` is not a reference.
    pub fn field(owner: Term, ty: SymType, name: impl Into<String>) -> Result<Term> {
        expect_pointer(&owner, "Field owner")?;
        Ok(Term::from_parts(
            TermKind::Field { name: name.into() },
            SymType::reference(ty),
            vec![owner],
        ))
    }

    /// Value stored at a field reference.
    ///
    /// # Errors
    ///
    /// Fails if `field` is not a field reference.
    pub fn field_load(field: Term) -> Result<Term> {
        if !matches!(field.kind(), TermKind::Field { .. }) {
            return Err(type_error(format!(
                "Field load needs a field reference, found `{field}`"
            )));
        }
        Self::load_referenced(TermKind::FieldLoad, field)
    }

    /// Loads from an array element or field reference.
    ///
    /// # Errors
    ///
    /// Fails if `reference` is neither kind of reference.
    pub fn load(reference: &Term) -> Result<Term> {
        match reference.kind() {
            TermKind::ArrayIndex => Term::array_load(reference.clone()),
            TermKind::Field { .. } => Term::field_load(reference.clone()),
            _ => Err(type_error(format!("Cannot load from `{reference}`"))),
        }
    }

    fn load_referenced(kind: TermKind, reference: Term) -> Result<Term> {
        let Some(ty) = reference.ty().referenced().cloned() else {
            return Err(type_error(format!(
                "`{reference}` is not a reference, found {}",
                reference.ty()
            )));
        };
        Ok(Term::from_parts(kind, ty, vec![reference]))
    }

    // Arithmetic

    /// `lhv op rhv` with the result type merged from the operand types.
    ///
    /// # Errors
    ///
    /// Fails if the operand types cannot be merged or are not primitive.
    pub fn binary(hierarchy: &ClassHierarchy, op: BinaryOp, lhv: Term, rhv: Term) -> Result<Term> {
        let ty = merge_types(hierarchy, &[lhv.ty().clone(), rhv.ty().clone()])?;
        Term::binary_typed(ty, op, lhv, rhv)
    }

    /// `lhv op rhv` with an explicit result type.
    ///
    /// # Errors
    ///
    /// Fails if either operand or the result type is not primitive.
    pub fn binary_typed(ty: SymType, op: BinaryOp, lhv: Term, rhv: Term) -> Result<Term> {
        for operand in [&lhv, &rhv] {
            if !operand.ty().is_primitive() {
                return Err(type_error(format!(
                    "Operand `{operand}` of `{op}` must be primitive, found {}",
                    operand.ty()
                )));
            }
        }
        if !ty.is_primitive() {
            return Err(type_error(format!(
                "Result of `{op}` must be primitive, found {ty}"
            )));
        }
        Ok(Term::from_parts(TermKind::Binary(op), ty, vec![lhv, rhv]))
    }

    /// `-operand`
    ///
    /// # Errors
    ///
    /// Fails if `operand` is not numeric.
    pub fn neg(operand: Term) -> Result<Term> {
        if !operand.ty().is_numeric() {
            return Err(type_error(format!(
                "Negated term `{operand}` must be numeric, found {}",
                operand.ty()
            )));
        }
        let ty = operand.ty().clone();
        Ok(Term::from_parts(TermKind::Neg, ty, vec![operand]))
    }

    /// Applies a unary instruction operator.
    ///
    /// # Errors
    ///
    /// Fails like [`Term::neg`] or [`Term::array_length`].
    pub fn unary(op: UnaryOp, operand: Term) -> Result<Term> {
        match op {
            UnaryOp::Neg => Term::neg(operand),
            UnaryOp::Length => Term::array_length(operand),
        }
    }

    /// `lhv op rhv`.
    ///
    /// Three-way comparisons produce an `int`, every other operator a `boolean`. Operands must
    /// both be primitive or both be references.
    ///
    /// # Errors
    ///
    /// Fails on mixed operands, or on references compared with anything but `==`/`!=`.
    pub fn cmp(op: CmpOp, lhv: Term, rhv: Term) -> Result<Term> {
        let primitive = lhv.ty().is_primitive() && rhv.ty().is_primitive();
        let pointer = lhv.ty().is_pointer() && rhv.ty().is_pointer();
        if !primitive && !pointer {
            return Err(type_error(format!(
                "Cannot compare `{lhv}` ({}) with `{rhv}` ({})",
                lhv.ty(),
                rhv.ty()
            )));
        }
        if pointer && !matches!(op, CmpOp::Eq | CmpOp::Neq) {
            return Err(type_error(format!(
                "References `{lhv}` and `{rhv}` only support == and !=, found {op}"
            )));
        }
        let ty = if op.is_three_way() {
            SymType::Int
        } else {
            SymType::Bool
        };
        Ok(Term::from_parts(TermKind::Cmp(op), ty, vec![lhv, rhv]))
    }

    /// `lhv.equals(rhv)`
    ///
    /// # Errors
    ///
    /// Fails if either operand is not a reference.
    pub fn equals(lhv: Term, rhv: Term) -> Result<Term> {
        expect_pointer(&lhv, "Receiver of equals")?;
        expect_pointer(&rhv, "Argument of equals")?;
        Ok(Term::from_parts(TermKind::Equals, SymType::Bool, vec![lhv, rhv]))
    }

    // Types

    /// `(ty) operand`
    ///
    /// # Errors
    ///
    /// Fails on primitive/reference conversions and on non-value types.
    pub fn cast(ty: SymType, operand: Term) -> Result<Term> {
        expect_value(&operand, "Cast operand")?;
        let operand_primitive = operand.ty().is_primitive();
        if operand_primitive != ty.is_primitive() || ty == SymType::Void {
            return Err(type_error(format!(
                "Cannot cast `{operand}` ({}) to {ty}",
                operand.ty()
            )));
        }
        Ok(Term::from_parts(TermKind::Cast, ty, vec![operand]))
    }

    /// `operand instanceof checked`
    ///
    /// # Errors
    ///
    /// Fails if `operand` is not a reference.
    pub fn instance_of(operand: Term, checked: SymType) -> Result<Term> {
        expect_pointer(&operand, "Instance-of operand")?;
        Ok(Term::from_parts(
            TermKind::InstanceOf { checked },
            SymType::Bool,
            vec![operand],
        ))
    }

    /// Runtime class of `operand`.
    ///
    /// # Errors
    ///
    /// Fails if `operand` is not a reference.
    pub fn class_access(operand: Term) -> Result<Term> {
        expect_pointer(&operand, "Class access operand")?;
        Ok(Term::from_parts(
            TermKind::ClassAccess,
            SymType::class(CLASS_CLASS),
            vec![operand],
        ))
    }

    /// Allocation bound of `pointer`.
    ///
    /// # Errors
    ///
    /// Fails if `pointer` is not a reference.
    pub fn bound(pointer: Term) -> Result<Term> {
        expect_pointer(&pointer, "Bound operand")?;
        Ok(Term::from_parts(TermKind::Bound, SymType::Int, vec![pointer]))
    }

    // Calls

    /// `owner.method(arguments)` with the method's return type.
    ///
    /// `owner` is the receiver, or a [`Term::static_ref`] for static methods.
    ///
    /// # Errors
    ///
    /// Fails if `owner` is not a reference or the argument count does not match the
    /// descriptor.
    pub fn call(owner: Term, method: Arc<Method>, arguments: Vec<Term>) -> Result<Term> {
        expect_pointer(&owner, "Call owner")?;
        if arguments.len() != method.desc.args.len() {
            return Err(type_error(format!(
                "{method} expects {} arguments, got {}",
                method.desc.args.len(),
                arguments.len()
            )));
        }
        let ty = method.desc.ret.clone();
        let mut subterms = Vec::with_capacity(arguments.len() + 1);
        subterms.push(owner);
        subterms.extend(arguments);
        Ok(Term::from_parts(TermKind::Call { method }, ty, subterms))
    }

    // Strings

    /// `lhv ++ rhv`
    ///
    /// # Errors
    ///
    /// Fails unless both operands are strings.
    pub fn concat(lhv: Term, rhv: Term) -> Result<Term> {
        expect_string(&lhv, "Concatenated term")?;
        expect_string(&rhv, "Concatenated term")?;
        Ok(Term::from_parts(TermKind::Concat, SymType::string(), vec![lhv, rhv]))
    }

    /// `string.substring(offset, length)`
    ///
    /// # Errors
    ///
    /// Fails unless `string` is a string and the bounds are integral.
    pub fn substring(string: Term, offset: Term, length: Term) -> Result<Term> {
        expect_string(&string, "Substring source")?;
        expect_integral(&offset, "Substring offset")?;
        expect_integral(&length, "Substring length")?;
        Ok(Term::from_parts(
            TermKind::Substring,
            SymType::string(),
            vec![string, offset, length],
        ))
    }

    /// `string.indexOf(substring, offset)`
    ///
    /// # Errors
    ///
    /// Fails unless both are strings and `offset` is integral.
    pub fn index_of(string: Term, substring: Term, offset: Term) -> Result<Term> {
        expect_string(&string, "Searched string")?;
        expect_string(&substring, "Searched substring")?;
        expect_integral(&offset, "Search offset")?;
        Ok(Term::from_parts(
            TermKind::IndexOf,
            SymType::Int,
            vec![string, substring, offset],
        ))
    }

    /// `string.charAt(index)`
    ///
    /// # Errors
    ///
    /// Fails unless `string` is a string and `index` is integral.
    pub fn char_at(string: Term, index: Term) -> Result<Term> {
        expect_string(&string, "Indexed string")?;
        expect_integral(&index, "Character index")?;
        Ok(Term::from_parts(TermKind::CharAt, SymType::Char, vec![string, index]))
    }

    /// `string.length()`
    ///
    /// # Errors
    ///
    /// Fails unless `string` is a string.
    pub fn string_length(string: Term) -> Result<Term> {
        expect_string(&string, "Measured string")?;
        Ok(Term::from_parts(TermKind::StringLength, SymType::Int, vec![string]))
    }

    /// `string.contains(substring)`
    ///
    /// # Errors
    ///
    /// Fails unless both are strings.
    pub fn string_contains(string: Term, substring: Term) -> Result<Term> {
        Self::string_predicate(TermKind::StringContains, string, substring)
    }

    /// `string.startsWith(prefix)`
    ///
    /// # Errors
    ///
    /// Fails unless both are strings.
    pub fn starts_with(string: Term, prefix: Term) -> Result<Term> {
        Self::string_predicate(TermKind::StartsWith, string, prefix)
    }

    /// `string.endsWith(suffix)`
    ///
    /// # Errors
    ///
    /// Fails unless both are strings.
    pub fn ends_with(string: Term, suffix: Term) -> Result<Term> {
        Self::string_predicate(TermKind::EndsWith, string, suffix)
    }

    fn string_predicate(kind: TermKind, string: Term, other: Term) -> Result<Term> {
        expect_string(&string, "String operand")?;
        expect_string(&other, "String operand")?;
        Ok(Term::from_parts(kind, SymType::Bool, vec![string, other]))
    }

    /// Parses `string` into a value of type `ty`.
    ///
    /// # Errors
    ///
    /// Fails unless `string` is a string and `ty` is primitive.
    pub fn string_parse(ty: SymType, string: Term) -> Result<Term> {
        expect_string(&string, "Parsed string")?;
        if !ty.is_primitive() {
            return Err(type_error(format!("Strings only parse to primitives, not {ty}")));
        }
        Ok(Term::from_parts(TermKind::StringParse, ty, vec![string]))
    }

    /// String representation of `operand`.
    ///
    /// # Errors
    ///
    /// Fails if `operand` has no value type.
    pub fn to_string_term(operand: Term) -> Result<Term> {
        expect_value(&operand, "Converted term")?;
        Ok(Term::from_parts(TermKind::ToString, SymType::string(), vec![operand]))
    }

    // Quantifiers and functions

    /// `body(i)` holds for every `i` in `start..end`.
    ///
    /// # Errors
    ///
    /// Fails unless the bounds are integral and `body` is a one-parameter boolean lambda.
    pub fn for_all(start: Term, end: Term, body: Term) -> Result<Term> {
        Self::quantifier(TermKind::ForAll, start, end, body)
    }

    /// `body(i)` holds for some `i` in `start..end`.
    ///
    /// # Errors
    ///
    /// Fails unless the bounds are integral and `body` is a one-parameter boolean lambda.
    pub fn exists(start: Term, end: Term, body: Term) -> Result<Term> {
        Self::quantifier(TermKind::Exists, start, end, body)
    }

    fn quantifier(kind: TermKind, start: Term, end: Term, body: Term) -> Result<Term> {
        expect_integral(&start, "Quantifier start")?;
        expect_integral(&end, "Quantifier end")?;
        let predicate = match (body.kind(), body.subterms()) {
            (TermKind::Lambda, [_parameter, predicate]) => predicate,
            _ => {
                return Err(type_error(format!(
                    "Quantifier body `{body}` must be a one-parameter lambda"
                )))
            }
        };
        expect_bool(predicate, "Quantifier body")?;
        Ok(Term::from_parts(kind, SymType::Bool, vec![start, end, body]))
    }

    /// `condition ? then : otherwise` of type `ty`.
    ///
    /// # Errors
    ///
    /// Fails unless `condition` is boolean.
    pub fn ite(ty: SymType, condition: Term, then: Term, otherwise: Term) -> Result<Term> {
        expect_bool(&condition, "Ite condition")?;
        Ok(Term::from_parts(TermKind::Ite, ty, vec![condition, then, otherwise]))
    }

    /// Lambda of type `ty` binding `parameters` in `body`.
    ///
    /// # Errors
    ///
    /// Fails if a parameter is not a named value or argument.
    pub fn lambda(ty: SymType, parameters: Vec<Term>, body: Term) -> Result<Term> {
        if let Some(parameter) = parameters
            .iter()
            .find(|parameter| !matches!(parameter.kind(), TermKind::Value { .. } | TermKind::Argument { .. }))
        {
            return Err(type_error(format!(
                "Lambda parameter `{parameter}` must be a named value"
            )));
        }
        let mut subterms = parameters;
        subterms.push(body);
        Ok(Term::from_parts(TermKind::Lambda, ty, subterms))
    }

    /// Rebuilds this node over new children through the variant's smart constructor.
    ///
    /// # Errors
    ///
    /// Fails if the children do not fit the variant.
    pub fn rebuild(&self, subterms: Vec<Term>) -> Result<Term> {
        if subterms.len() != self.subterms().len() {
            return Err(type_error(format!(
                "`{self}` has {} children, rebuild got {}",
                self.subterms().len(),
                subterms.len()
            )));
        }

        let mut children = subterms.into_iter();
        let mut next = || {
            children
                .next()
                .ok_or_else(|| type_error("Missing child while rebuilding".to_string()))
        };

        match self.kind() {
            TermKind::Argument { .. }
            | TermKind::Value { .. }
            | TermKind::This
            | TermKind::ReturnValue { .. }
            | TermKind::Null
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
            | TermKind::StaticClassRef
            | TermKind::Undef => Ok(self.clone()),
            TermKind::ArrayIndex => Term::array_index(next()?, next()?),
            TermKind::ArrayLoad => Term::array_load(next()?),
            TermKind::ArrayLength => Term::array_length(next()?),
            TermKind::ArrayContains => Term::array_contains(next()?, next()?),
            TermKind::Field { name } => {
                let ty = self
                    .ty()
                    .referenced()
                    .cloned()
                    .ok_or_else(|| type_error(format!("Field `{self}` lost its reference type")))?;
                Term::field(next()?, ty, name.clone())
            }
            TermKind::FieldLoad => Term::field_load(next()?),
            TermKind::Binary(op) => Term::binary_typed(self.ty().clone(), *op, next()?, next()?),
            TermKind::Neg => Term::neg(next()?),
            TermKind::Cmp(op) => Term::cmp(*op, next()?, next()?),
            TermKind::Equals => Term::equals(next()?, next()?),
            TermKind::Cast => Term::cast(self.ty().clone(), next()?),
            TermKind::InstanceOf { checked } => Term::instance_of(next()?, checked.clone()),
            TermKind::Call { method } => {
                let owner = next()?;
                Term::call(owner, method.clone(), children.collect())
            }
            TermKind::Concat => Term::concat(next()?, next()?),
            TermKind::Substring => Term::substring(next()?, next()?, next()?),
            TermKind::IndexOf => Term::index_of(next()?, next()?, next()?),
            TermKind::CharAt => Term::char_at(next()?, next()?),
            TermKind::StringLength => Term::string_length(next()?),
            TermKind::StringContains => Term::string_contains(next()?, next()?),
            TermKind::StartsWith => Term::starts_with(next()?, next()?),
            TermKind::EndsWith => Term::ends_with(next()?, next()?),
            TermKind::StringParse => Term::string_parse(self.ty().clone(), next()?),
            TermKind::ToString => Term::to_string_term(next()?),
            TermKind::ForAll => Term::for_all(next()?, next()?, next()?),
            TermKind::Exists => Term::exists(next()?, next()?, next()?),
            TermKind::Ite => Term::ite(self.ty().clone(), next()?, next()?, next()?),
            TermKind::Lambda => {
                let mut parameters: Vec<Term> = children.collect();
                let body = parameters
                    .pop()
                    .ok_or_else(|| type_error(format!("Lambda `{self}` has no body")))?;
                Term::lambda(self.ty().clone(), parameters, body)
            }
            TermKind::ClassAccess => Term::class_access(next()?),
            TermKind::Bound => Term::bound(next()?),
        }
    }
}
