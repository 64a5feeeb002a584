use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing;
use tracing_subscriber::EnvFilter;
use wayfarer::app::App;
use wayfarer::config::{Cli, Config, LogFormat};
use wayfarer::remote::HttpClient;
use wayfarer::shell::{self, Flow};
use wayfarer::storage::ClientStorage;
use wayfarer::unpack_error;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    let (cfg, config_path) = Config::resolve(args.config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("failed to load config: {:#}", e);
        std::process::exit(1);
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match cfg.app.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
    tracing::info!(config = ?config_path, base_url = cfg.app.get_base_url(), "wayfarer starting");

    // Durable storage lives next to the config unless data_dir says otherwise
    let data_dir = cfg.data_dir(&config_path);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(error = %e, path = ?data_dir, "failed to create data directory");
        std::process::exit(1);
    }

    let storage = Arc::new(ClientStorage::open(&data_dir).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&e), "failed to open client storage");
        std::process::exit(1);
    }));
    let client = Arc::new(HttpClient::new(&cfg.app).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&e), "failed to build http client");
        std::process::exit(1);
    }));

    let app = App::open(client.clone(), storage, &cfg.app);

    if let Some(line) = args.exec {
        run_line(&app, &line).await;
        client.drain().await;
        return;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if let Flow::Exit = run_line(&app, &line).await {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read input");
                        break;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("ctrl+c signal received, leaving");
                break;
            }
        }
    }

    client.drain().await;
    tracing::info!("wayfarer session closed");
}

async fn run_line(app: &App<HttpClient>, line: &str) -> Flow {
    match shell::parse_line(line) {
        Ok(Some(command)) => shell::execute(app, command).await,
        Ok(None) => Flow::Continue,
        Err(e) => {
            println!("{}", e);
            Flow::Continue
        }
    }
}
