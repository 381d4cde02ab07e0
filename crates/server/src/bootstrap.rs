use std::sync::Arc;

use basketry_core::config::{AppConfig, ConfigError, LoadOptions};
use basketry_core::{ApplicationError, RecommendationService};
use basketry_db::{connect_with_settings, migrations, DbPool, SqlOrderRepository, SqlProductRepository};
use thiserror::Error;
use tracing::info;

pub type Service = RecommendationService<SqlOrderRepository, SqlProductRepository>;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<Service>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("engine construction failed: {0}")]
    Engine(#[from] ApplicationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let service = Arc::new(Service::from_config(
        SqlOrderRepository::new(db_pool.clone()),
        SqlProductRepository::new(db_pool.clone()),
        &config.mining,
    )?);

    Ok(Application { config, db_pool, service })
}

#[cfg(test)]
mod tests {
    use basketry_core::config::{ConfigOverrides, LoadOptions};
    use basketry_core::ItemToken;
    use basketry_db::DemoSeedDataset;

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_thresholds() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                min_support: Some(1.5),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("mining.min_support"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_seed_and_recommendation_path() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('products', 'orders', 'order_lines')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables to be available after bootstrap");
        assert_eq!(table_count, 3, "bootstrap should expose the order-history tables");

        DemoSeedDataset::load(&app.db_pool).await.expect("load demo seeds");

        let summary = app.service.refresh_rules(true).await.expect("refresh rules");
        assert!(summary.rule_count > 0);

        let recommendations = app
            .service
            .cart_recommendations(&[ItemToken::new("prod-beans-espresso")], 6)
            .await;
        assert!(!recommendations.items.is_empty());

        app.db_pool.close().await;
    }
}
