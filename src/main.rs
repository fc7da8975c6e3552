use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use tracing::{info, warn};

mod booth;
mod config;
mod handlers;
mod llm;
mod state;
mod storage;
mod themes;
mod utils;

use config::CONFIG;
use llm::GeminiImageClient;
use state::AppState;
use storage::FirebaseStorageClient;
use themes::{build_fashion_prompt, ThemeCatalog};
use utils::logging::{init_cli_logging, init_logging};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Serve,
    Resolve(Vec<String>),
    Keywords,
    Prompt(String),
}

fn usage() -> &'static str {
    "Usage: retro-future-booth [serve | resolve <keyword>... | keywords | prompt <theme>]"
}

fn parse_cli_args(args: &[String]) -> anyhow::Result<CliCommand> {
    let Some(command) = args.get(1) else {
        return Ok(CliCommand::Serve);
    };

    match command.as_str() {
        "serve" if args.len() == 2 => Ok(CliCommand::Serve),
        "resolve" => Ok(CliCommand::Resolve(args[2..].to_vec())),
        "keywords" if args.len() == 2 => Ok(CliCommand::Keywords),
        "prompt" => {
            let theme = args[2..].join(" ");
            if theme.trim().is_empty() {
                return Err(anyhow!("Missing theme for prompt\n{}", usage()));
            }
            Ok(CliCommand::Prompt(theme.trim().to_string()))
        }
        "--help" | "-h" | "help" => Err(anyhow!(usage())),
        other => Err(anyhow!("Unknown command: {other}\n{}", usage())),
    }
}

fn load_catalog() -> anyhow::Result<ThemeCatalog> {
    ThemeCatalog::load_or_builtin(CONFIG.theme_catalog_path.as_deref())
        .context("Failed to load theme catalog")
}

fn print_resolution(catalog: &ThemeCatalog, keywords: &[String]) -> anyhow::Result<()> {
    let themes = catalog.resolve(keywords);
    let scores = catalog.score(keywords);

    for keyword in keywords {
        if !catalog.contains_keyword(keyword) {
            warn!("Keyword '{}' is not in the catalog and was skipped", keyword);
        }
    }

    let output = serde_json::json!({ "themes": themes, "scores": scores });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_prompt(catalog: &ThemeCatalog, theme: &str) -> anyhow::Result<()> {
    let era = catalog
        .era_of(theme)
        .ok_or_else(|| anyhow!("Unknown theme: {theme}"))?;
    let prompt = build_fashion_prompt(catalog, era, theme, &mut rand::thread_rng())?;
    println!("{prompt}");
    Ok(())
}

async fn serve(catalog: ThemeCatalog) -> anyhow::Result<()> {
    CONFIG.ensure_serving_credentials()?;

    let generator = GeminiImageClient::from_config(&CONFIG);
    info!(
        "Starting retro-future booth (model {}, bucket {})",
        generator.model(),
        CONFIG.firebase_storage_bucket
    );
    let uploader = FirebaseStorageClient::from_config(&CONFIG);

    let state = AppState::new(
        catalog,
        Arc::new(generator),
        Arc::new(uploader),
        Duration::from_secs(CONFIG.session_ttl_seconds),
    );
    tokio::spawn(sweep_idle_sessions(state.clone()));
    let app = handlers::router(state, CONFIG.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(CONFIG.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", CONFIG.bind_addr))?;
    info!("Booth listening on {}", CONFIG.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Booth stopped");
    Ok(())
}

async fn sweep_idle_sessions(state: AppState) {
    let period = (state.session_ttl / 4).max(Duration::from_secs(30));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let pruned = state.prune_expired();
        if pruned > 0 {
            info!("Swept {} idle booth session(s)", pruned);
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_cli_args(&args)?;

    match command {
        CliCommand::Serve => {
            let _guards = init_logging(&CONFIG.log_level, &CONFIG.log_dir);
            let catalog = load_catalog()?;
            serve(catalog).await
        }
        CliCommand::Resolve(keywords) => {
            init_cli_logging(&CONFIG.log_level);
            print_resolution(&load_catalog()?, &keywords)
        }
        CliCommand::Keywords => {
            init_cli_logging(&CONFIG.log_level);
            let catalog = load_catalog()?;
            for keyword in catalog.keywords() {
                println!("{keyword}");
            }
            Ok(())
        }
        CliCommand::Prompt(theme) => {
            init_cli_logging(&CONFIG.log_level);
            print_prompt(&load_catalog()?, &theme)
        }
    }
}
