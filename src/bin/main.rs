use meta_supervisor::{config::Settings, models::Query, supervisor::Supervisor};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    // Logs go to stderr so stdout stays pure JSON
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        eprintln!("usage: supervisor <query>");
        eprintln!("example: supervisor \"005930 분석해줘\"");
        std::process::exit(2);
    }

    let supervisor = Supervisor::from_settings(&settings)?;

    info!(query = %text, "Processing query");
    let envelope = supervisor.process(&Query::new(text)).await;

    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if !envelope.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
