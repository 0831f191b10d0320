use hemmer_provider_random::{init_logging, serve_with_options, RandomProvider, ServeOptions};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let options = ServeOptions::from_env()?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting random provider");
    serve_with_options(RandomProvider::new(), options).await?;
    Ok(())
}
