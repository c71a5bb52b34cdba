//! Vision relay server entry point.
//!
//! Binary name: `vision`
//!
//! Parses CLI arguments, loads configuration, wires the chat service to
//! Bedrock and the transcript store, then serves the HTTP API.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;
use vision_infra::config::load_config;
use vision_observe::tracing_setup::{
    filter_for_verbosity, init_tracing, shutdown_tracing, TracingOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config or tracing
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "vision", &mut std::io::stdout());
        return Ok(());
    }

    let enable_otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    init_tracing(&TracingOptions {
        enable_otel,
        json: cli.json,
        default_filter: filter_for_verbosity(cli.verbose, cli.quiet).to_string(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Config => cli::config::show_config(&config, cli.json)?,

        Commands::Serve { port, host, .. } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }

            let state = AppState::init(&config)?;
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            tracing::info!(
                %addr,
                model_id = %config.provider.model_id,
                region = %config.provider.region,
                max_history_messages = config.conversation.max_history_messages,
                "vision listening"
            );
            if !cli.quiet && !cli.json {
                println!(
                    "  {} Vision listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("server stopped");
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
