//! pkiscout - find keys and certificates, and pair them up.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    pkiscout_cli::run().await
}
