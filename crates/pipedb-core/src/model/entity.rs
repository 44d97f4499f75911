use crate::{
    error::{ConfigError, InternalError},
    model::field::{Accessor, Field, FieldId, FieldKind},
    value::Value,
};
use std::{collections::BTreeSet, fmt};

///
/// ColumnSpec
///
/// Column metadata as delivered by the schema provider.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl ColumnSpec {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    #[must_use]
    pub const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

///
/// EntityModel
///
/// Resolved column set for one entity type. Immutable once built; share it
/// behind an `Arc` when several executors need it.
///

pub struct EntityModel<E> {
    entity: &'static str,
    fields: Vec<Field<E>>,
    primary_key: usize,
}

impl<E> EntityModel<E> {
    /// Pair each declared column with its accessor and validate the key.
    pub fn build(
        entity: &'static str,
        columns: &[ColumnSpec],
        accessors: &[(&'static str, Accessor<E>)],
        primary_key: &str,
    ) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut fields = Vec::with_capacity(columns.len());

        for column in columns {
            if !seen.insert(column.name) {
                return Err(ConfigError::DuplicateField {
                    entity: entity.to_string(),
                    field: column.name.to_string(),
                });
            }

            let accessor = accessors
                .iter()
                .find(|(name, _)| *name == column.name)
                .map(|(_, accessor)| *accessor)
                .ok_or_else(|| ConfigError::MissingAccessor {
                    entity: entity.to_string(),
                    field: column.name.to_string(),
                })?;

            fields.push(Field::new(
                FieldId::new(entity, column.name),
                column.kind,
                column.nullable,
                accessor,
            ));
        }

        if let Some((name, _)) = accessors.iter().find(|(name, _)| !seen.contains(name)) {
            return Err(ConfigError::UnknownAccessor {
                entity: entity.to_string(),
                field: (*name).to_string(),
            });
        }

        let primary_key = fields
            .iter()
            .position(|field| field.name() == primary_key)
            .ok_or_else(|| ConfigError::UnknownPrimaryKey {
                entity: entity.to_string(),
                field: primary_key.to_string(),
            })?;

        if fields[primary_key].is_nullable() {
            return Err(ConfigError::NullablePrimaryKey {
                entity: entity.to_string(),
                field: fields[primary_key].name().to_string(),
            });
        }

        Ok(Self {
            entity,
            fields,
            primary_key,
        })
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub fn fields(&self) -> &[Field<E>] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<Field<E>> {
        self.fields.iter().find(|field| field.name() == name).copied()
    }

    #[must_use]
    pub fn primary_key(&self) -> Field<E> {
        self.fields[self.primary_key]
    }

    #[must_use]
    pub fn contains(&self, id: FieldId) -> bool {
        self.fields.iter().any(|field| field.identifier() == id)
    }

    /// Full column tuple of one entity; used as the identity key for
    /// in-process `distinct`.
    pub(crate) fn row_key(&self, entity: &E) -> Result<Vec<Value>, InternalError> {
        self.fields.iter().map(|field| field.read(entity)).collect()
    }
}

impl<E> fmt::Debug for EntityModel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityModel")
            .field("entity", &self.entity)
            .field("fields", &self.fields)
            .field("primary_key", &self.primary_key().name())
            .finish()
    }
}
