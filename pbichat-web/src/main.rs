//! Pbichat Web Server
//!
//! A chat service for Power BI documentation: question rewriting, vector
//! retrieval, and grounded answer generation behind a small HTTP API.

use clap::Parser;
use pbichat_web::server::ChatServerBuilder;
use pbichat_web::init_logging;

/// Pbichat Web Server - Power BI documentation chat
#[derive(Parser)]
#[command(name = "pbichat-web")]
#[command(about = "A chat service over indexed Power BI documentation")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the service TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    std::env::set_var(
        "RUST_LOG",
        format!(
            "pbichat_web={},pbichat_rag={},tower_http=debug",
            args.log_level, args.log_level
        ),
    );
    init_logging();

    // Load environment variables (API keys live in .env during development)
    dotenvy::dotenv().ok();

    if std::env::var("OPENAI_API_KEY").is_err() {
        tracing::warn!(
            "OPENAI_API_KEY is not set; the default provider will fail unless \
             the configuration file supplies api keys"
        );
    }

    let mut builder = ChatServerBuilder::new().host(args.host).port(args.port);
    if let Some(config) = args.config {
        builder = builder.config_path(config);
    }

    let server = match builder.build().await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("❌ Failed to initialize server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("❌ Server failed: {}", e);
        std::process::exit(1);
    }
}
