use clap::Parser;

use driftlock_server::config::loader::load_config;
use driftlock_server::{ServerBuilder, build_registry, observability};

/// Driftlock: a continuous reconciliation engine.
#[derive(Debug, Parser)]
#[command(name = "driftlock", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "DRIFTLOCK_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    // Load .env if present; absence is not an error.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let cfg = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    observability::init_tracing(&cfg.logging.level);
    tracing::info!(
        config = args.config.as_deref().unwrap_or("driftlock.toml"),
        "configuration loaded"
    );

    let registry = match build_registry(&cfg).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Engine initialization failed: {e}");
            std::process::exit(2);
        }
    };
    match registry.start().await {
        Ok(resumed) => tracing::info!(applications = resumed, "applications resumed"),
        Err(e) => {
            eprintln!("Failed to resume applications: {e}");
            std::process::exit(2);
        }
    }

    let server = ServerBuilder::new(registry).with_addr(cfg.addr()).build();
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}
