use pipedb_core::{
    config::PipeConfig,
    db::{
        PipelineExecutor, StoreExecutor,
        capability::Capabilities,
        pipeline::Query,
        plan::{OptimizerInfo, OptimizerOptions, SqlFragment, SqlOptions, optimize},
    },
    error::{ConfigError, InternalError},
    model::EntityModel,
};

///
/// Session
///
/// One entity model bound to the capabilities, optimizer switches and SQL
/// options a configuration document declares for it.
///

#[derive(Debug)]
pub struct Session<'m, E> {
    model: &'m EntityModel<E>,
    capabilities: Capabilities,
    options: OptimizerOptions,
    sql: SqlOptions,
}

impl<'m, E> Session<'m, E> {
    pub fn new(config: &PipeConfig, model: &'m EntityModel<E>) -> Result<Self, ConfigError> {
        let capabilities = config.capabilities_for(model)?;
        tracing::debug!(
            entity = model.entity(),
            shortcuts = config.optimizer.shortcuts,
            "session bound"
        );

        Ok(Self {
            model,
            capabilities,
            options: config.optimizer,
            sql: config.sql.clone(),
        })
    }

    /// Parse `source` and bind `model` in one step.
    pub fn from_toml_str(source: &str, model: &'m EntityModel<E>) -> Result<Self, ConfigError> {
        Self::new(&PipeConfig::from_toml_str(source)?, model)
    }

    #[must_use]
    pub const fn model(&self) -> &EntityModel<E> {
        self.model
    }

    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Executor over `store` using this session's capabilities.
    pub fn executor<'s, S>(&'s self, store: &'s S) -> PipelineExecutor<'s, E, S>
    where
        S: StoreExecutor<E>,
    {
        PipelineExecutor::new(self.model, &self.capabilities, store).with_options(self.options)
    }

    pub fn explain(&self, query: &Query<E>) -> Result<OptimizerInfo<E>, InternalError> {
        optimize(query, self.model, &self.capabilities, self.options)
    }

    /// The store-side part of `query` as parameterized SQL.
    pub fn render_sql(&self, query: &Query<E>) -> Result<SqlFragment, InternalError> {
        Ok(self.explain(query)?.fragment().render(&self.sql))
    }
}
