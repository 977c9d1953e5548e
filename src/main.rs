use intake_assist::config::{ACKNOWLEDGE_SYSTEM_PROMPT, IntakeConfig};
use intake_assist::engine::IntakeSession;
use intake_assist::error::Result;
use intake_assist::reply::create_source;
use intake_assist::{cli, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = IntakeConfig::from_env()?;
    let mode = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "chat".to_string());

    eprintln!("🤖 Intake Assist v{}", env!("CARGO_PKG_VERSION"));

    match mode.as_str() {
        "serve" => serve(config).await?,
        "chat" => chat(config).await?,
        other => {
            eprintln!("Unknown mode: {}", other);
            eprintln!("  usage: intake-assist [chat|serve]");
            std::process::exit(2);
        }
    }
    Ok(())
}

async fn serve(config: IntakeConfig) -> Result<()> {
    let app = server::upstream_app(&config)?;

    eprintln!("   Intake WS: ws://0.0.0.0:{}/ws/intake", config.port);
    eprintln!("   Chat API: http://0.0.0.0:{}/api/chat", config.port);
    eprintln!(
        "   Recommend API: http://0.0.0.0:{}/api/recommend",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Server listening on port {}", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Ctrl+C received, shutting down...");
        })
        .await?;
    Ok(())
}

async fn chat(config: IntakeConfig) -> Result<()> {
    let source = create_source(&config, ACKNOWLEDGE_SYSTEM_PROMPT)?;
    eprintln!("   Source: {}", source.name());
    eprintln!("   Type an answer and press Enter. /quit to exit.");

    let session = IntakeSession::new(config.session.clone(), source).await?;
    cli::run(session).await?;
    Ok(())
}
