// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! hookgate server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hookgate_server::{create_app_state, create_router, create_store};
use hookgate_server_auth::MemoryUserDirectory;
use hookgate_server_config::{LogFormat, LoggingConfig};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// hookgate server - session auth and access control for webhook sources.
#[derive(Parser, Debug)]
#[command(name = "hookgate-server", about = "hookgate auth server", version)]
struct Args {
	/// Config file to load instead of /etc/hookgate/server.toml
	#[arg(long, short)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("hookgate-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match args.config {
		Some(path) => hookgate_server_config::load_config_with_file(path)?,
		None => hookgate_server_config::load_config()?,
	};

	init_tracing(&config.logging);

	tracing::info!(
		addr = %config.socket_addr(),
		store = %config.store.backend,
		"starting hookgate-server"
	);

	let store = create_store(&config.store).await?;
	let users = Arc::new(MemoryUserDirectory::new());
	let state = create_app_state(&config, store, users)?;

	let app = create_router(state).layer(TraceLayer::new_for_http());

	let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
	tracing::info!(addr = %listener.local_addr()?, "listening");

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("server stopped");
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
	tracing::info!("shutdown signal received");
}
