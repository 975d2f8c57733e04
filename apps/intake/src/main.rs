//! Event Intake Service
//!
//! Binary entry point.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    event_intake::run().await
}
