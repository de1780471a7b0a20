use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tongyeok::cli::{Cli, Commands, ConfigAction};
use tongyeok::config::Config;
use tongyeok::relay::coordinator::Coordinator;
use tongyeok::relay::protocol::ServerMessage;
use tongyeok::relay::server::serve;
use tongyeok::relay::RelayClient;
use tongyeok::translate::{LlmGateway, TranslationGateway};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    match cli.command {
        None => run_serve(&config_path, None, None, None, None, cli.quiet, cli.verbose).await,
        Some(Commands::Serve {
            bind,
            secret,
            idle_timeout,
            debounce,
        }) => {
            run_serve(
                &config_path,
                bind,
                secret,
                idle_timeout,
                debounce,
                cli.quiet,
                cli.verbose,
            )
            .await
        }
        Some(Commands::Listen { addr, finals_only }) => {
            run_listen(&config_path, addr, finals_only, cli.quiet, cli.verbose).await
        }
        Some(Commands::Publish {
            addr,
            secret,
            interim,
        }) => run_publish(&config_path, addr, secret, interim, cli.quiet).await,
        Some(Commands::Config { action }) => run_config(action, &config_path),
    }
}

/// Scoped log filter from verbosity; RUST_LOG always wins.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_serve(
    config_path: &Path,
    bind: Option<String>,
    secret: Option<String>,
    idle_timeout: Option<u64>,
    debounce: Option<u64>,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    init_tracing(verbose);

    let mut config = Config::load_or_default(config_path)?.with_env_overrides();
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(secret) = secret {
        config.auth.secret = secret;
    }
    if let Some(ms) = idle_timeout {
        config.session.idle_timeout_ms = ms;
    }
    if let Some(ms) = debounce {
        config.session.debounce_ms = ms;
    }
    config.validate()?;

    let gateway: Arc<dyn TranslationGateway> = Arc::new(LlmGateway::from_config(&config.gateway)?);
    let (coordinator, events) = Coordinator::new(&config, gateway);
    tokio::spawn(coordinator.run());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    if !quiet {
        eprintln!(
            "tongyeok {} listening on {}",
            tongyeok::version_string(),
            config.server.bind
        );
    }

    serve(listener, events).await?;
    Ok(())
}

async fn run_listen(
    config_path: &Path,
    addr: Option<String>,
    finals_only: bool,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?.with_env_overrides();
    let addr = addr.unwrap_or(config.server.bind);

    let mut client = RelayClient::connect(&addr).await?;
    if !quiet {
        eprintln!("Connected to {}. Waiting for translations...", addr);
    }

    while let Some(message) = client.recv().await? {
        match message {
            ServerMessage::Translation { event } => {
                let arrow = format!("[{}→{}]", event.source_lang, event.target_lang);
                if event.is_final {
                    println!("{} {}", arrow.green(), event.translated_text.bold());
                    if verbose > 0 {
                        println!("  {}", event.source_text.dimmed());
                    }
                } else if !finals_only {
                    println!("{} {}", arrow.yellow(), event.translated_text.dimmed());
                }
            }
            ServerMessage::SubscriberCount { count } => {
                if !quiet {
                    eprintln!("{}", format!("{} listening", count).dimmed());
                }
            }
            ServerMessage::Error { reason } => {
                eprintln!("{}: {}", "relay error".red(), reason);
            }
            ServerMessage::AuthSuccess | ServerMessage::AuthFailed => {}
        }
    }

    if !quiet {
        eprintln!("Relay closed the connection.");
    }
    Ok(())
}

async fn run_publish(
    config_path: &Path,
    addr: Option<String>,
    secret: Option<String>,
    interim: bool,
    quiet: bool,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?.with_env_overrides();
    let addr = addr.unwrap_or_else(|| config.server.bind.clone());
    let secret = secret
        .or_else(|| config.auth.resolve_secret())
        .ok_or_else(|| anyhow::anyhow!("no publisher secret given (--secret or config)"))?;

    let mut client = RelayClient::connect(&addr).await?;
    client.authenticate(&secret).await?;
    if !quiet {
        eprintln!("{}", "Authenticated as publisher. Type and press enter.".green());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        client.send_fragment(&line, !interim).await?;

        // Surface any error the relay sends back before the next line
        while let Ok(Ok(Some(message))) =
            tokio::time::timeout(Duration::from_millis(50), client.recv()).await
        {
            if let ServerMessage::Error { reason } = message {
                eprintln!("{}: {}", "relay error".red(), reason);
            }
        }
    }
    Ok(())
}

fn run_config(action: ConfigAction, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Show => {
            let config = Config::load_or_default(config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init => {
            if config_path.exists() {
                anyhow::bail!("config already exists at {}", config_path.display());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(config_path, toml::to_string_pretty(&Config::default())?)?;
            eprintln!("Wrote {}", config_path.display());
        }
    }
    Ok(())
}
