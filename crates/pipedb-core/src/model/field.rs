use crate::{
    error::{ErrorOrigin, InternalError},
    value::{Value, ValueFamily},
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

///
/// FieldId
///
/// Identity of a column: owning entity plus column name. Equality and
/// hashing of everything built on a field go through this pair.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FieldId {
    entity: &'static str,
    name: &'static str,
}

impl FieldId {
    #[must_use]
    pub const fn new(entity: &'static str, name: &'static str) -> Self {
        Self { entity, name }
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.name)
    }
}

///
/// FieldKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Int,
    Uint,
    Float,
    Text,
}

impl FieldKind {
    #[must_use]
    pub const fn family(self) -> ValueFamily {
        match self {
            Self::Bool => ValueFamily::Bool,
            Self::Int | Self::Uint | Self::Float => ValueFamily::Numeric,
            Self::Text => ValueFamily::Text,
        }
    }

    /// Whether an accessor result has exactly this kind (null excluded).
    #[must_use]
    pub const fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Int, Value::Int(_))
                | (Self::Uint, Value::Uint(_))
                | (Self::Float, Value::Float64(_))
                | (Self::Text, Value::Text(_))
        )
    }

    /// Whether an operand can be compared against values of this kind.
    /// Numeric kinds accept any numeric operand.
    #[must_use]
    pub fn accepts_operand(self, value: &Value) -> bool {
        value.family() == Some(self.family())
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Text => "text",
        };
        write!(f, "{label}")
    }
}

/// Pure column reader supplied by the entity's code provider.
pub type Accessor<E> = fn(&E) -> Value;

///
/// Field
///
/// Typed, identity-bearing column accessor. Built once per entity model and
/// copied into every predicate and comparator that references it.
///

pub struct Field<E> {
    id: FieldId,
    kind: FieldKind,
    nullable: bool,
    accessor: Accessor<E>,
}

impl<E> Field<E> {
    pub(crate) const fn new(
        id: FieldId,
        kind: FieldKind,
        nullable: bool,
        accessor: Accessor<E>,
    ) -> Self {
        Self {
            id,
            kind,
            nullable,
            accessor,
        }
    }

    #[must_use]
    pub const fn identifier(&self) -> FieldId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.id.name
    }

    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Raw accessor result.
    #[must_use]
    pub fn get(&self, entity: &E) -> Value {
        (self.accessor)(entity)
    }

    /// Accessor result checked against the declared kind and nullability.
    pub(crate) fn read(&self, entity: &E) -> Result<Value, InternalError> {
        let value = self.get(entity);

        if value.is_null() {
            if self.nullable {
                return Ok(value);
            }
            return Err(InternalError::precondition(
                ErrorOrigin::Model,
                format!("non-nullable field {} produced null", self.id),
            ));
        }

        if !self.kind.matches(&value) {
            return Err(InternalError::type_mismatch(
                ErrorOrigin::Model,
                format!(
                    "field {} declared {} but produced {}",
                    self.id,
                    self.kind,
                    value.label()
                ),
            ));
        }

        Ok(value)
    }
}

impl<E> Clone for Field<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Field<E> {}

impl<E> PartialEq for Field<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E> Eq for Field<E> {}

impl<E> Hash for Field<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<E> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

impl<E> fmt::Display for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
