//! Meeplehall binary entry point.

use anyhow::Context as _;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // Call into the library's run function
    meeplehall::run().await.context("failed to run application")
}
