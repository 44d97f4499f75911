use crate::{
    db::predicate::kind::{Arity, PredicateKind},
    error::{ErrorOrigin, InternalError},
    model::{Field, FieldKind},
    value::{Value, strict_order_cmp},
};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

///
/// FieldPredicate
///
/// One typed condition on one field: a kind plus its operands. Structural
/// equality covers field identity, kind, and operands.
///

pub struct FieldPredicate<E> {
    field: Field<E>,
    kind: PredicateKind,
    operands: Vec<Value>,
}

impl<E> FieldPredicate<E> {
    #[must_use]
    pub const fn new(field: Field<E>, kind: PredicateKind, operands: Vec<Value>) -> Self {
        Self {
            field,
            kind,
            operands,
        }
    }

    #[must_use]
    pub const fn field(&self) -> Field<E> {
        self.field
    }

    #[must_use]
    pub const fn kind(&self) -> PredicateKind {
        self.kind
    }

    #[must_use]
    pub fn operands(&self) -> &[Value] {
        &self.operands
    }

    /// Complementary predicate over the same field and operands.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            field: self.field,
            kind: self.kind.complement(),
            operands: self.operands.clone(),
        }
    }

    /// Whether `negate` is the logical complement for every possible value.
    ///
    /// A null fails both a value comparison and its complement, so only
    /// non-nullable fields and the null-deciding kinds qualify.
    #[must_use]
    pub const fn is_exact_complement(&self) -> bool {
        !self.field.is_nullable() || self.kind.is_null_total()
    }

    /// Check operand count and operand types against the field kind.
    pub fn check_operands(&self) -> Result<(), InternalError> {
        let count = self.operands.len();
        let arity_ok = match self.kind.arity() {
            Arity::Nullary => count == 0,
            Arity::Unary => count == 1,
            Arity::Binary => count == 2,
            Arity::Variadic => true,
        };
        if !arity_ok {
            return Err(InternalError::type_mismatch(
                ErrorOrigin::Predicate,
                format!("{} on {} got {count} operand(s)", self.kind, self.field),
            ));
        }

        if self.kind.is_text_match() && self.field.kind() != FieldKind::Text {
            return Err(InternalError::type_mismatch(
                ErrorOrigin::Predicate,
                format!(
                    "{} requires a text field, {} is {}",
                    self.kind,
                    self.field,
                    self.field.kind()
                ),
            ));
        }

        if let Some(bad) = self
            .operands
            .iter()
            .find(|operand| !self.field.kind().accepts_operand(operand))
        {
            return Err(InternalError::type_mismatch(
                ErrorOrigin::Predicate,
                format!(
                    "operand {bad} ({}) cannot be compared with {} field {}",
                    bad.label(),
                    self.field.kind(),
                    self.field
                ),
            ));
        }

        Ok(())
    }

    /// Evaluate against one entity.
    pub fn test(&self, entity: &E) -> Result<bool, InternalError> {
        let value = self.field.read(entity)?;

        let matched = match self.kind {
            PredicateKind::AlwaysTrue => true,
            PredicateKind::AlwaysFalse => false,
            PredicateKind::IsNull => value.is_null(),
            PredicateKind::IsNotNull => !value.is_null(),
            _ if value.is_null() => false,

            PredicateKind::Equal => self.cmp_operand(&value, 0)? == Ordering::Equal,
            PredicateKind::NotEqual => self.cmp_operand(&value, 0)? != Ordering::Equal,
            PredicateKind::GreaterThan => self.cmp_operand(&value, 0)? == Ordering::Greater,
            PredicateKind::GreaterOrEqual => self.cmp_operand(&value, 0)? != Ordering::Less,
            PredicateKind::LessThan => self.cmp_operand(&value, 0)? == Ordering::Less,
            PredicateKind::LessOrEqual => self.cmp_operand(&value, 0)? != Ordering::Greater,
            PredicateKind::Between => self.between(&value)?,
            PredicateKind::NotBetween => !self.between(&value)?,
            PredicateKind::In => self.contained(&value)?,
            PredicateKind::NotIn => !self.contained(&value)?,

            PredicateKind::StartsWith => self.text_match(&value, |t, p| t.starts_with(p))?,
            PredicateKind::NotStartsWith => !self.text_match(&value, |t, p| t.starts_with(p))?,
            PredicateKind::EndsWith => self.text_match(&value, |t, p| t.ends_with(p))?,
            PredicateKind::NotEndsWith => !self.text_match(&value, |t, p| t.ends_with(p))?,
            PredicateKind::Contains => self.text_match(&value, |t, p| t.contains(p))?,
            PredicateKind::NotContains => !self.text_match(&value, |t, p| t.contains(p))?,
        };

        Ok(matched)
    }

    fn operand(&self, index: usize) -> Result<&Value, InternalError> {
        self.operands.get(index).ok_or_else(|| {
            InternalError::type_mismatch(
                ErrorOrigin::Predicate,
                format!("{} on {} is missing operand {index}", self.kind, self.field),
            )
        })
    }

    fn cmp_with(&self, value: &Value, operand: &Value) -> Result<Ordering, InternalError> {
        strict_order_cmp(value, operand).ok_or_else(|| {
            InternalError::type_mismatch(
                ErrorOrigin::Predicate,
                format!(
                    "cannot compare {} value with {} operand in {}",
                    value.label(),
                    operand.label(),
                    self
                ),
            )
        })
    }

    fn cmp_operand(&self, value: &Value, index: usize) -> Result<Ordering, InternalError> {
        self.cmp_with(value, self.operand(index)?)
    }

    fn between(&self, value: &Value) -> Result<bool, InternalError> {
        Ok(self.cmp_operand(value, 0)? != Ordering::Less
            && self.cmp_operand(value, 1)? != Ordering::Greater)
    }

    fn contained(&self, value: &Value) -> Result<bool, InternalError> {
        for operand in &self.operands {
            if self.cmp_with(value, operand)? == Ordering::Equal {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn text_match(
        &self,
        value: &Value,
        matcher: impl Fn(&str, &str) -> bool,
    ) -> Result<bool, InternalError> {
        let operand = self.operand(0)?;
        match (value.as_text(), operand.as_text()) {
            (Some(text), Some(pattern)) => Ok(matcher(text, pattern)),
            _ => Err(InternalError::type_mismatch(
                ErrorOrigin::Predicate,
                format!("{} needs text on both sides in {}", self.kind, self),
            )),
        }
    }
}

impl<E> Clone for FieldPredicate<E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            kind: self.kind,
            operands: self.operands.clone(),
        }
    }
}

impl<E> PartialEq for FieldPredicate<E> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.kind == other.kind && self.operands == other.operands
    }
}

impl<E> Eq for FieldPredicate<E> {}

impl<E> Hash for FieldPredicate<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field.hash(state);
        self.kind.hash(state);
        self.operands.hash(state);
    }
}

impl<E> fmt::Debug for FieldPredicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPredicate")
            .field("field", &self.field.identifier())
            .field("kind", &self.kind)
            .field("operands", &self.operands)
            .finish()
    }
}

impl<E> fmt::Display for FieldPredicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field.identifier();
        let ops = &self.operands;
        let list = || {
            ops.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        match (self.kind, ops.as_slice()) {
            (PredicateKind::AlwaysTrue, _) => write!(f, "true"),
            (PredicateKind::AlwaysFalse, _) => write!(f, "false"),
            (PredicateKind::IsNull, _) => write!(f, "{field} is null"),
            (PredicateKind::IsNotNull, _) => write!(f, "{field} is not null"),
            (PredicateKind::Equal, [v]) => write!(f, "{field} = {v}"),
            (PredicateKind::NotEqual, [v]) => write!(f, "{field} != {v}"),
            (PredicateKind::GreaterThan, [v]) => write!(f, "{field} > {v}"),
            (PredicateKind::GreaterOrEqual, [v]) => write!(f, "{field} >= {v}"),
            (PredicateKind::LessThan, [v]) => write!(f, "{field} < {v}"),
            (PredicateKind::LessOrEqual, [v]) => write!(f, "{field} <= {v}"),
            (PredicateKind::Between, [lo, hi]) => write!(f, "{field} between {lo} and {hi}"),
            (PredicateKind::NotBetween, [lo, hi]) => {
                write!(f, "{field} not between {lo} and {hi}")
            }
            (PredicateKind::In, _) => write!(f, "{field} in ({})", list()),
            (PredicateKind::NotIn, _) => write!(f, "{field} not in ({})", list()),
            (kind, _) => write!(f, "{field} {kind} ({})", list()),
        }
    }
}

///
/// Typed constructors
///

impl<E> Field<E> {
    fn predicate(self, kind: PredicateKind, operands: Vec<Value>) -> FieldPredicate<E> {
        FieldPredicate::new(self, kind, operands)
    }

    #[must_use]
    pub fn always_true(self) -> FieldPredicate<E> {
        self.predicate(PredicateKind::AlwaysTrue, Vec::new())
    }

    #[must_use]
    pub fn always_false(self) -> FieldPredicate<E> {
        self.predicate(PredicateKind::AlwaysFalse, Vec::new())
    }

    #[must_use]
    pub fn is_null(self) -> FieldPredicate<E> {
        self.predicate(PredicateKind::IsNull, Vec::new())
    }

    #[must_use]
    pub fn is_not_null(self) -> FieldPredicate<E> {
        self.predicate(PredicateKind::IsNotNull, Vec::new())
    }

    #[must_use]
    pub fn equal(self, value: impl Into<Value>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::Equal, vec![value.into()])
    }

    #[must_use]
    pub fn not_equal(self, value: impl Into<Value>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::NotEqual, vec![value.into()])
    }

    #[must_use]
    pub fn greater_than(self, value: impl Into<Value>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::GreaterThan, vec![value.into()])
    }

    #[must_use]
    pub fn greater_or_equal(self, value: impl Into<Value>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::GreaterOrEqual, vec![value.into()])
    }

    #[must_use]
    pub fn less_than(self, value: impl Into<Value>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::LessThan, vec![value.into()])
    }

    #[must_use]
    pub fn less_or_equal(self, value: impl Into<Value>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::LessOrEqual, vec![value.into()])
    }

    /// Inclusive on both ends.
    #[must_use]
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::Between, vec![low.into(), high.into()])
    }

    #[must_use]
    pub fn not_between(
        self,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> FieldPredicate<E> {
        self.predicate(PredicateKind::NotBetween, vec![low.into(), high.into()])
    }

    #[must_use]
    pub fn in_<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> FieldPredicate<E> {
        self.predicate(
            PredicateKind::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    #[must_use]
    pub fn not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> FieldPredicate<E> {
        self.predicate(
            PredicateKind::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    #[must_use]
    pub fn starts_with(self, prefix: impl Into<String>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::StartsWith, vec![Value::Text(prefix.into())])
    }

    #[must_use]
    pub fn ends_with(self, suffix: impl Into<String>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::EndsWith, vec![Value::Text(suffix.into())])
    }

    #[must_use]
    pub fn contains(self, needle: impl Into<String>) -> FieldPredicate<E> {
        self.predicate(PredicateKind::Contains, vec![Value::Text(needle.into())])
    }
}
