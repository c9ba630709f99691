#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unwrap_used,
    unsafe_code
)]

use std::io;

use campus::{CampusArgs, server};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), io::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CampusArgs::parse();

    let listener = TcpListener::bind(format!("127.0.0.1:{}", args.port))
        .await
        .map_err(io::Error::other)?;

    let app = server(args).await?;

    axum::serve(listener, app).await
}
