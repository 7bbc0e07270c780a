//! Shared application state

use crate::{
    config::Config,
    db::PostgresEntityStore,
    models::FacetCatalog,
    services::SearchContext,
    Error, Result,
};
use kumquat_index_client::ElasticsearchClient;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search: SearchContext,
}

impl AppState {
    /// Connect to the database and the search index.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let db_pool = PgPoolOptions::new()
            .max_connections(config.database.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.database.pool_timeout_seconds))
            .connect(&config.database.url)
            .await?;
        tracing::info!(max_connections = config.database.pool_max_size, "Database pool ready");

        if config.database.run_migrations {
            sqlx::migrate!("./migrations").run(&db_pool).await?;
            tracing::info!("Database migrations applied");
        }

        let client = ElasticsearchClient::with_timeout(
            config.elasticsearch.endpoint.clone(),
            config.elasticsearch.timeout(),
        )?;
        tracing::info!(
            endpoint = %client.endpoint(),
            items_index = %config.elasticsearch.items_index,
            collections_index = %config.elasticsearch.collections_index,
            "Search index client ready"
        );

        let search = SearchContext::new(
            Arc::new(client),
            Arc::new(PostgresEntityStore::new(db_pool)),
            Arc::new(FacetCatalog::default()),
            config.search_options(),
        );
        Ok(Self::from_parts(config, search))
    }

    /// Assemble state from an already built search context.
    pub fn from_parts(config: Config, search: SearchContext) -> Self {
        Self {
            config: Arc::new(config),
            search,
        }
    }
}
