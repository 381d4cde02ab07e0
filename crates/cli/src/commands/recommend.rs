use crate::commands::CommandResult;
use basketry_core::config::{AppConfig, LoadOptions};
use basketry_core::recommend::DEFAULT_CART_LIMIT;
use basketry_core::{ItemToken, RecommendationService};
use basketry_db::{connect_with_settings, migrations, SqlOrderRepository, SqlProductRepository};

pub fn run(tokens: Vec<String>, limit: Option<usize>) -> CommandResult {
    let tokens: Vec<ItemToken> =
        tokens.iter().map(ItemToken::new).filter(|token| !token.is_empty()).collect();
    if tokens.is_empty() {
        return CommandResult::failure(
            "recommend",
            "missing_tokens",
            "provide at least one item token via --tokens",
            2,
        );
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
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
                "recommend",
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

        let recommendations = service
            .cart_recommendations(&tokens, limit.unwrap_or(DEFAULT_CART_LIMIT))
            .await;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(recommendations)
    });

    match result {
        Ok(recommendations) => {
            let rendered: Vec<String> = recommendations
                .items
                .iter()
                .map(|item| {
                    format!(
                        "{} ({}) score {:.3}",
                        item.product.name, item.product.id.0, item.score
                    )
                })
                .collect();

            let message = if rendered.is_empty() {
                recommendations.message
            } else {
                format!("{}: {}", recommendations.message, rendered.join("; "))
            };
            CommandResult::success("recommend", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}
