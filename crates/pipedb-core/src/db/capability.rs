//! Store capability descriptors.
//!
//! `StoreCapabilities` is the raw, serializable declaration a store (or a
//! configuration document) provides per entity. Resolving it against an
//! `EntityModel` yields `Capabilities`, the checked form the optimizer and
//! the in-memory store consult.

use crate::{
    db::{
        comparator::{FieldComparator, NullOrder},
        plan::Window,
        predicate::{FieldPredicate, PredicateKind},
    },
    error::ConfigError,
    model::{EntityModel, FieldId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

///
/// StoreCapabilities
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
#[expect(clippy::struct_excessive_bools)]
pub struct StoreCapabilities {
    pub predicates: BTreeSet<PredicateKind>,
    /// `None` means every field accepts the listed predicate kinds.
    pub filterable_fields: Option<BTreeSet<String>>,
    pub orderable_fields: BTreeSet<String>,
    pub null_orders: BTreeSet<NullOrder>,
    pub offset: bool,
    pub limit: bool,
    pub count: bool,
    pub exists: bool,
    pub deterministic_default_order: bool,
}

impl StoreCapabilities {
    /// Descriptor of a store that can take over every stage and shortcut.
    #[must_use]
    pub fn everything<E>(model: &EntityModel<E>) -> Self {
        Self {
            predicates: PredicateKind::ALL.into_iter().collect(),
            filterable_fields: None,
            orderable_fields: model
                .fields()
                .iter()
                .map(|field| field.name().to_string())
                .collect(),
            null_orders: [NullOrder::First, NullOrder::Last].into_iter().collect(),
            offset: true,
            limit: true,
            count: true,
            exists: true,
            deterministic_default_order: true,
        }
    }

    pub fn resolve<E>(&self, model: &EntityModel<E>) -> Result<Capabilities, ConfigError> {
        let entity = model.entity();
        let lookup = |name: &String| -> Result<FieldId, ConfigError> {
            model
                .field(name)
                .map(|field| field.identifier())
                .ok_or_else(|| ConfigError::UnknownCapabilityField {
                    entity: entity.to_string(),
                    field: name.clone(),
                })
        };

        if self.null_orders.contains(&NullOrder::None) {
            return Err(ConfigError::MalformedCapabilities {
                entity: entity.to_string(),
                reason: "null order 'none' cannot be declared".to_string(),
            });
        }

        let filterable = self
            .filterable_fields
            .as_ref()
            .map(|names| names.iter().map(lookup).collect::<Result<BTreeSet<_>, _>>())
            .transpose()?;
        let orderable = self
            .orderable_fields
            .iter()
            .map(lookup)
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Capabilities {
            entity,
            predicates: self.predicates.clone(),
            filterable,
            orderable,
            null_orders: self.null_orders.clone(),
            offset: self.offset,
            limit: self.limit,
            count: self.count,
            exists: self.exists,
            deterministic_default_order: self.deterministic_default_order,
        })
    }
}

///
/// Capabilities
///
/// Capability set resolved against one entity model.
///

#[derive(Clone, Debug, Eq, PartialEq)]
#[expect(clippy::struct_excessive_bools)]
pub struct Capabilities {
    entity: &'static str,
    predicates: BTreeSet<PredicateKind>,
    filterable: Option<BTreeSet<FieldId>>,
    orderable: BTreeSet<FieldId>,
    null_orders: BTreeSet<NullOrder>,
    offset: bool,
    limit: bool,
    count: bool,
    exists: bool,
    deterministic_default_order: bool,
}

impl Capabilities {
    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub fn supports_filter<E>(&self, predicate: &FieldPredicate<E>) -> bool {
        let field = predicate.field().identifier();

        field.entity() == self.entity
            && self.predicates.contains(&predicate.kind())
            && self
                .filterable
                .as_ref()
                .is_none_or(|fields| fields.contains(&field))
    }

    /// A `None` null order is only sound for fields that can never be null.
    #[must_use]
    pub fn supports_order<E>(&self, comparator: &FieldComparator<E>) -> bool {
        let field = comparator.field();
        let null_order_ok = match comparator.null_order() {
            NullOrder::None => !field.is_nullable(),
            order => self.null_orders.contains(&order),
        };

        null_order_ok && self.orderable.contains(&field.identifier())
    }

    #[must_use]
    pub const fn supports_window(&self, window: &Window) -> bool {
        (window.offset == 0 || self.offset) && (window.limit.is_none() || self.limit)
    }

    #[must_use]
    pub const fn supports_count(&self) -> bool {
        self.count
    }

    #[must_use]
    pub const fn supports_exists(&self) -> bool {
        self.exists
    }

    #[must_use]
    pub const fn supports_offset(&self) -> bool {
        self.offset
    }

    #[must_use]
    pub const fn supports_limit(&self) -> bool {
        self.limit
    }

    #[must_use]
    pub const fn has_deterministic_default_order(&self) -> bool {
        self.deterministic_default_order
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{person_fields, person_model};

    #[test]
    fn resolve_rejects_unknown_fields() {
        let model = person_model();
        let raw = StoreCapabilities {
            orderable_fields: ["agee".to_string()].into_iter().collect(),
            ..StoreCapabilities::default()
        };

        assert_eq!(
            raw.resolve(&model),
            Err(ConfigError::UnknownCapabilityField {
                entity: "person".to_string(),
                field: "agee".to_string(),
            })
        );
    }

    #[test]
    fn resolve_rejects_declared_none_null_order() {
        let model = person_model();
        let raw = StoreCapabilities {
            null_orders: [NullOrder::None].into_iter().collect(),
            ..StoreCapabilities::default()
        };

        assert!(matches!(
            raw.resolve(&model),
            Err(ConfigError::MalformedCapabilities { .. })
        ));
    }

    #[test]
    fn filter_support_needs_kind_and_field() {
        let model = person_model();
        let fields = person_fields(&model);
        let caps = StoreCapabilities {
            predicates: [PredicateKind::GreaterThan].into_iter().collect(),
            filterable_fields: Some(["age".to_string()].into_iter().collect()),
            ..StoreCapabilities::default()
        }
        .resolve(&model)
        .expect("capabilities should resolve");

        assert!(caps.supports_filter(&fields.age.greater_than(1)));
        assert!(!caps.supports_filter(&fields.age.less_than(1)));
        assert!(!caps.supports_filter(&fields.score.greater_than(1)));
    }

    #[test]
    fn order_support_respects_null_orders() {
        let model = person_model();
        let fields = person_fields(&model);
        let caps = StoreCapabilities {
            orderable_fields: ["age".to_string(), "name".to_string()]
                .into_iter()
                .collect(),
            null_orders: [NullOrder::Last].into_iter().collect(),
            ..StoreCapabilities::default()
        }
        .resolve(&model)
        .expect("capabilities should resolve");

        assert!(caps.supports_order(&fields.age.comparator_nulls_last()));
        assert!(caps.supports_order(&fields.age.comparator_nulls_last().reversed()));
        assert!(!caps.supports_order(&fields.age.comparator_nulls_first()));
        assert!(!caps.supports_order(&FieldComparator::new(fields.age, NullOrder::None)));
        assert!(caps.supports_order(&fields.name.comparator()));
        assert!(!caps.supports_order(&fields.id.comparator()));
    }

    #[test]
    fn window_support_checks_each_part() {
        let model = person_model();
        let caps = StoreCapabilities {
            limit: true,
            ..StoreCapabilities::default()
        }
        .resolve(&model)
        .expect("capabilities should resolve");

        assert!(caps.supports_window(&Window::UNBOUNDED.limit(3)));
        assert!(!caps.supports_window(&Window::UNBOUNDED.skip(1)));
    }
}
