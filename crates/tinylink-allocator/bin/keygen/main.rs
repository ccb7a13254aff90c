mod cli;

use crate::cli::CLI;
use anyhow::Context;
use clap::Parser;
use tinylink_allocator::{seed_pool, RandomGenerator};
use tinylink_core::KeyPool;
use tinylink_storage::postgres::apply_schema;
use tinylink_storage::{PgStoreConfig, PostgresKeyPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.json_logs);

    info!(
        total = config.total,
        batch_size = config.batch_size,
        code_length = config.code_length,
        "seeding key pool"
    );

    let store = PgStoreConfig::builder()
        .database_url(config.database_url)
        .build();
    let pool = PostgresKeyPool::connect(&store)
        .await
        .context("failed to connect to postgres")?;

    if config.apply_schema {
        apply_schema(pool.pool())
            .await
            .context("failed to apply schema")?;
    }

    let generator = RandomGenerator::with_length(config.code_length);
    let added = seed_pool(&pool, &generator, config.total, config.batch_size)
        .await
        .context("failed to seed key pool")?;
    let remaining = pool.remaining().await.context("failed to count keys")?;

    info!(added, remaining, "key pool seeded");
    pool.close().await;
    Ok(())
}
