//! Spreadwatch - Pairs-Trading Signal Generator
//!
//! Rolling log-spread z-score signals and paper-traded backtests.

use anyhow::Result;
use spreadwatch::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (PAIRS_DATA_DIR and RUST_LOG can live there)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
