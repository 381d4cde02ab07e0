use crate::commands::CommandResult;
use basketry_core::config::{AppConfig, LoadOptions};
use basketry_core::RecommendationService;
use basketry_db::{connect_with_settings, migrations, SqlOrderRepository, SqlProductRepository};

pub fn run(force: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "mine",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "mine",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let service = RecommendationService::from_config(
            SqlOrderRepository::new(pool.clone()),
            SqlProductRepository::new(pool.clone()),
            &config.mining,
        )
        .map_err(|error| ("engine_config", error.to_string(), 2u8))?;

        let summary = service
            .refresh_rules(force)
            .await
            .map_err(|error| ("mining", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success(
            "mine",
            format!(
                "mined {} rules from {} transactions ({})",
                summary.rule_count, summary.transaction_count, summary.status_message
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("mine", error_class, message, exit_code)
        }
    }
}
