mod args;
mod config;

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use usagegraph_app::AppState;
use usagegraph_client::{SyncApi, SyncOutcome};
use usagegraph_core::{UsageEvent, aggregate_events};
use usagegraph_http::HttpState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let command = args::parse_args().map_err(|err| {
        eprintln!("{err}");
        args::print_help();
        io::Error::new(io::ErrorKind::InvalidInput, "invalid arguments")
    })?;

    let config = config::load_or_create().map_err(io::Error::other)?;
    if config.created {
        println!(
            "Created config at {} (default port {}).",
            config.paths.file.display(),
            config.config.port
        );
    }

    match command {
        args::Command::Serve { port } => {
            let port = port.unwrap_or(config.config.port);
            serve(config.paths.db.clone(), port).await
        }
        args::Command::Sync {
            input,
            server,
            token,
        } => {
            let server = server
                .or(config.config.server_url)
                .ok_or("no server URL; pass --server or set server_url in the config")?;
            let token = token
                .or(config.config.token)
                .ok_or("no bearer token; pass --token or set token in the config")?;
            run_sync(&input, &server, &token).await
        }
        args::Command::TokenMint {
            user,
            label,
            expires_days,
        } => {
            let state = open_state(config.paths.db.clone())?;
            let token = state
                .services
                .tokens
                .mint(&user, label.as_deref(), expires_days)?;
            println!("{token}");
            Ok(())
        }
        args::Command::TokenRevoke { token } => {
            let state = open_state(config.paths.db.clone())?;
            if state.services.tokens.revoke(&token)? {
                println!("Token revoked.");
            } else {
                println!("Token not found.");
            }
            Ok(())
        }
    }
}

fn open_state(db_path: PathBuf) -> Result<AppState, Box<dyn std::error::Error>> {
    let state = AppState::new(db_path);
    state.setup_db()?;
    Ok(state)
}

async fn serve(db_path: PathBuf, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let state = open_state(db_path)?;
    let router = usagegraph_http::router(HttpState::new(state));

    let (listener, actual_port, used_fallback) = bind_port(port).await?;
    if used_fallback {
        eprintln!("Configured port {port} was unavailable; using {actual_port} for this run.");
    }
    println!("usagegraph server is running at http://127.0.0.1:{actual_port}");
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn run_sync(
    input: &PathBuf,
    server: &str,
    token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(input)
        .map_err(|err| format!("read events {}: {}", input.display(), err))?;
    let events: Vec<UsageEvent> = serde_json::from_str(&contents)
        .map_err(|err| format!("parse events {}: {}", input.display(), err))?;
    let aggregates = aggregate_events(&events);
    if aggregates.is_empty() {
        println!("No usage to sync.");
        return Ok(());
    }

    let api = SyncApi::new(server, token, REQUEST_TIMEOUT)?;
    match usagegraph_client::sync(&api, &aggregates, env!("CARGO_PKG_VERSION")).await? {
        SyncOutcome::NoChange => {
            println!("Already in sync ({} days local).", aggregates.len());
        }
        SyncOutcome::Submitted {
            submission_id,
            days,
            full_upload,
        } => {
            let kind = if full_upload { "full upload" } else { "diff" };
            println!("Synced {days} day(s) as a {kind} (submission {submission_id}).");
        }
    }
    Ok(())
}

async fn bind_port(port: u16) -> Result<(tokio::net::TcpListener, u16, bool), io::Error> {
    if port == 0 {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let actual_port = listener.local_addr()?.port();
        return Ok((listener, actual_port, false));
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => Ok((listener, port, false)),
        Err(_) => {
            let listener =
                tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
            let actual_port = listener.local_addr()?.port();
            Ok((listener, actual_port, true))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
