use clap::Parser;

pub const DATABASE_URL_ENV: &str = "TINYLINK_DATABASE_URL";
pub const TOTAL_ENV: &str = "TINYLINK_KEYGEN_TOTAL";
pub const BATCH_SIZE_ENV: &str = "TINYLINK_KEYGEN_BATCH_SIZE";
pub const CODE_LENGTH_ENV: &str = "TINYLINK_KEYGEN_CODE_LENGTH";
pub const JSON_LOGS_ENV: &str = "TINYLINK_JSON_LOGS";

/// Pre-populates the key pool with random short codes.
#[derive(Debug, Parser)]
#[command(name = "tinylink-keygen")]
pub struct CLI {
    #[arg(long, env = DATABASE_URL_ENV)]
    pub database_url: String,

    /// Number of candidate codes to generate.
    #[arg(long, env = TOTAL_ENV)]
    pub total: u64,

    #[arg(long, env = BATCH_SIZE_ENV, default_value_t = tinylink_allocator::DEFAULT_SEED_BATCH_SIZE)]
    pub batch_size: usize,

    #[arg(long, env = CODE_LENGTH_ENV, default_value_t = tinylink_allocator::DEFAULT_CODE_LENGTH)]
    pub code_length: usize,

    /// Create the `urls` and `keys` tables before seeding.
    #[arg(long)]
    pub apply_schema: bool,

    #[arg(long, env = JSON_LOGS_ENV)]
    pub json_logs: bool,
}
