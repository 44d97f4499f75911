//! TOML configuration: optimizer switches, SQL rendering options, and
//! per-entity store capabilities.
//!
//! ```toml
//! [optimizer]
//! shortcuts = true
//!
//! [sql]
//! placeholder = "numbered"
//!
//! [entities.person]
//! predicates = ["equal", "greater_than"]
//! orderable_fields = ["age"]
//! null_orders = ["last"]
//! limit = true
//! ```

use crate::{
    db::{
        capability::{Capabilities, StoreCapabilities},
        plan::{OptimizerOptions, SqlOptions},
    },
    error::ConfigError,
    model::EntityModel,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

///
/// PipeConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipeConfig {
    pub optimizer: OptimizerOptions,
    pub sql: SqlOptions,
    pub entities: BTreeMap<String, StoreCapabilities>,
}

impl PipeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|err| ConfigError::Parse {
            message: err.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        Self::from_toml_str(&source)
    }

    /// Capabilities declared for `model`'s entity, resolved against it.
    pub fn capabilities_for<E>(
        &self,
        model: &EntityModel<E>,
    ) -> Result<Capabilities, ConfigError> {
        let entity = model.entity();
        let declared = self
            .entities
            .get(entity)
            .ok_or_else(|| ConfigError::UnknownEntity {
                entity: entity.to_string(),
            })?;

        let capabilities = declared.resolve(model)?;
        tracing::debug!(entity, "resolved store capabilities");

        Ok(capabilities)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            comparator::NullOrder,
            plan::PlaceholderStyle,
            predicate::PredicateKind,
        },
        test_fixtures::{person_fields, person_model},
    };

    const DOCUMENT: &str = r#"
[optimizer]
shortcuts = false

[sql]
placeholder = "numbered"
table = "people"

[entities.person]
predicates = ["equal", "greater_or_equal", "is_null"]
filterable_fields = ["age", "name"]
orderable_fields = ["age"]
null_orders = ["last"]
limit = true
count = true
"#;

    #[test]
    fn document_parses_into_sections() {
        let config = PipeConfig::from_toml_str(DOCUMENT).expect("document should parse");

        assert!(!config.optimizer.shortcuts);
        assert_eq!(config.sql.placeholder, PlaceholderStyle::Numbered);
        assert_eq!(config.sql.table.as_deref(), Some("people"));
        assert_eq!(config.sql.quote, '"');

        let person = &config.entities["person"];
        assert!(person.predicates.contains(&PredicateKind::GreaterOrEqual));
        assert!(person.null_orders.contains(&NullOrder::Last));
        assert!(person.limit);
        assert!(!person.offset);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = PipeConfig::from_toml_str("").expect("empty document should parse");

        assert_eq!(config, PipeConfig::default());
        assert!(config.optimizer.shortcuts);
    }

    #[test]
    fn capabilities_resolve_against_the_model() {
        let model = person_model();
        let fields = person_fields(&model);
        let config = PipeConfig::from_toml_str(DOCUMENT).expect("document should parse");

        let caps = config
            .capabilities_for(&model)
            .expect("capabilities should resolve");

        assert!(caps.supports_filter(&fields.age.greater_or_equal(1)));
        assert!(!caps.supports_filter(&fields.score.equal(1.0)));
        assert!(!caps.supports_filter(&fields.age.less_than(1)));
        assert!(caps.supports_order(&fields.age.comparator()));
        assert!(caps.supports_count());
        assert!(!caps.supports_exists());
    }

    #[test]
    fn missing_entity_is_reported() {
        let model = person_model();
        let err = PipeConfig::default()
            .capabilities_for(&model)
            .expect_err("no entities configured");

        assert_eq!(
            err,
            ConfigError::UnknownEntity {
                entity: "person".to_string()
            }
        );
    }

    #[test]
    fn unknown_keys_and_fields_are_rejected() {
        let typo = PipeConfig::from_toml_str("[optimizer]\nshortcut = true\n");
        assert!(matches!(typo, Err(ConfigError::Parse { .. })));

        let bad_kind = PipeConfig::from_toml_str("[entities.person]\npredicates = [\"like\"]\n");
        assert!(matches!(bad_kind, Err(ConfigError::Parse { .. })));

        let model = person_model();
        let config =
            PipeConfig::from_toml_str("[entities.person]\norderable_fields = [\"height\"]\n")
                .expect("document should parse");
        assert!(matches!(
            config.capabilities_for(&model),
            Err(ConfigError::UnknownCapabilityField { .. })
        ));
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let err = PipeConfig::from_path("/nonexistent/pipedb.toml")
            .expect_err("missing file should fail");

        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
