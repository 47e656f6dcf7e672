use std::error::Error;
use std::fs::OpenOptions;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atty::Stream;
use birdle_rs::bootstrap::GameSessionConfig;
use birdle_rs::game_over::GameSummary;
use birdle_rs::identity::FileIdentity;
use birdle_rs::runtime::{Driver, RunExit, RuntimeOptions, ui_channel};
use birdle_rs::session::GameSession;
use birdle_rs::transport::{ClientConfig, HttpEndpoints};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::terminal::{InputThread, TerminalGuard, TerminalUi};

#[derive(Parser, Debug)]
#[command(name = "birdle-rs", about = "Play the daily Birdle from a terminal", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play today's game interactively.
    Play(PlayArgs),
    /// Show the end-of-game summary for a finished game.
    Summary {
        /// Bootstrap JSON: a file path or an http(s) URL.
        #[arg(long)]
        bootstrap: String,
    },
    /// Show the session state a bootstrap describes.
    Config {
        /// Bootstrap JSON: a file path or an http(s) URL.
        #[arg(long)]
        bootstrap: String,
    },
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Game page URL; guesses are posted here.
    #[arg(long)]
    page: String,
    /// Suggestion endpoint. Without it the suggestion list stays empty.
    #[arg(long)]
    suggest: Option<String>,
    /// Bootstrap JSON: a file path or an http(s) URL. Re-read on reload.
    #[arg(long)]
    bootstrap: String,
    /// Where the client id is kept. Defaults to ~/.birdle/user_id.
    #[arg(long)]
    identity_file: Option<PathBuf>,
    /// Write logs here; `play` logs nothing otherwise.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Number of suggestion responses to keep.
    #[arg(long, default_value_t = 64)]
    cache_size: usize,
    /// Request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    match cli.command {
        Command::Play(args) => {
            // The terminal is in raw mode; only log to a file.
            if let Some(path) = args.log_file.as_deref() {
                init_tracing(Some(path))?;
            }
            runtime.block_on(handle_play(args))
        }
        Command::Summary { bootstrap } => {
            init_tracing(None)?;
            let config = runtime.block_on(load_bootstrap(&bootstrap, None))?;
            handle_summary(config, cli.json)
        }
        Command::Config { bootstrap } => {
            init_tracing(None)?;
            let config = runtime.block_on(load_bootstrap(&bootstrap, None))?;
            handle_config(config, cli.json)
        }
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|err| err.to_string())?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|err| err.to_string())?;
        }
    }
    Ok(())
}

async fn load_bootstrap(
    source: &str,
    endpoints: Option<&HttpEndpoints>,
) -> Result<GameSessionConfig, Box<dyn Error>> {
    if !(source.starts_with("http://") || source.starts_with("https://")) {
        return Ok(GameSessionConfig::from_path(source)?);
    }
    let config = match endpoints {
        Some(endpoints) => endpoints.fetch_bootstrap(source).await?,
        None => {
            HttpEndpoints::new(ClientConfig::default())?
                .fetch_bootstrap(source)
                .await?
        }
    };
    Ok(config)
}

fn default_identity_path() -> Result<PathBuf, Box<dyn Error>> {
    let home = dirs::home_dir().ok_or("No home directory found; pass --identity-file")?;
    Ok(home.join(".birdle").join("user_id"))
}

async fn handle_play(args: PlayArgs) -> Result<(), Box<dyn Error>> {
    let cache_size = NonZeroUsize::new(args.cache_size).ok_or("--cache-size must be at least 1")?;
    let identity_path = match args.identity_file {
        Some(path) => path,
        None => default_identity_path()?,
    };
    let identity = FileIdentity::load_or_create(identity_path)?;
    let endpoints = Arc::new(HttpEndpoints::new(ClientConfig {
        page_url: args.page,
        suggest_url: args.suggest,
        request_timeout: Duration::from_secs(args.timeout),
    })?);
    let mut driver = Driver::new(
        Arc::clone(&endpoints),
        RuntimeOptions {
            suggestion_cache_size: cache_size,
        },
    );

    let (tx, mut rx) = ui_channel();
    let guard = TerminalGuard::enter()?;
    let ui = TerminalUi::new(tx);
    let input = InputThread::spawn(&ui);

    let mut result = Ok(());
    loop {
        let config = match load_bootstrap(&args.bootstrap, Some(&endpoints)).await {
            Ok(config) => config,
            Err(err) => {
                result = Err(err);
                break;
            }
        };
        ui.reset();
        let (mut session, initial) = GameSession::start(config, ui.clone(), identity.clone());
        match driver.run(&mut session, initial, &mut rx).await {
            RunExit::Reload => continue,
            RunExit::Quit | RunExit::Closed => {
                info!(guesses = session.guess_count(), "leaving game");
                break;
            }
        }
    }

    input.stop();
    drop(guard);
    result
}

fn handle_summary(config: GameSessionConfig, as_json: bool) -> Result<(), Box<dyn Error>> {
    if !config.is_terminal() {
        return Err("Today's game is not finished yet".into());
    }
    let summary = GameSummary::new(config.guess_count, config.is_winner, config.bird, config.emojis);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.title);
        render_markdown_block(&summary.message);
        if !summary.emojis.is_empty() {
            println!("\n{}", summary.emojis);
        }
    }
    Ok(())
}

fn handle_config(config: GameSessionConfig, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let terminal = config.is_terminal();
        let payload = json!({
            "config": config,
            "terminal": terminal,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mut rows = vec![
        ("guesses", config.guess_count.to_string()),
        ("winner", config.is_winner.to_string()),
        ("finished", config.is_terminal().to_string()),
    ];
    if let Some(hint) = config.hint.as_ref().filter(|hint| hint.show) {
        rows.push(("hint", format!("{}: {}", hint.title, hint.message)));
    }
    if let Some(taxonomy) = config.correct_taxonomy.as_ref().filter(|taxonomy| !taxonomy.is_empty()) {
        for (rank, value) in taxonomy.fields() {
            rows.push((rank.query_key(), value.to_string()));
        }
    }
    if !config.bird.name.is_empty() {
        rows.push(("bird", config.bird.name.clone()));
    }
    print_table(&rows);
    Ok(())
}

fn print_table(rows: &[(&str, String)]) {
    let width = rows
        .iter()
        .map(|(key, _)| key.len())
        .max()
        .unwrap_or(3)
        .max("KEY".len());
    println!("{:<width$}  {}", "KEY", "VALUE", width = width);
    println!("{:-<width$}  {}", "", "-----", width = width);
    for (key, value) in rows {
        println!("{:<width$}  {}", key, value, width = width);
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn play_arguments_parse_with_defaults() {
        let cli = Cli::parse_from([
            "birdle-rs",
            "play",
            "--page",
            "http://localhost:8000/birdle/",
            "--bootstrap",
            "state.json",
        ]);
        let Command::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.cache_size, 64);
        assert_eq!(args.timeout, 10);
        assert!(args.suggest.is_none());
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::parse_from(["birdle-rs", "config", "--bootstrap", "state.json", "--json"]);
        assert!(cli.json);
    }

    #[tokio::test]
    async fn bootstrap_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"guessCount": 6, "isWinner": false}}"#).unwrap();
        let config = load_bootstrap(file.path().to_str().unwrap(), None)
            .await
            .unwrap();
        assert!(config.is_terminal());
    }

    #[test]
    fn tracing_init_reports_an_existing_subscriber() {
        let _ = init_tracing(None);
        let err = init_tracing(None).unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn default_identity_lives_under_home() {
        let path = default_identity_path().unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with(".birdle/user_id"));
    }

    #[test]
    fn unfinished_game_has_no_summary() {
        let err = handle_summary(GameSessionConfig::default(), true).unwrap_err();
        assert_eq!(err.to_string(), "Today's game is not finished yet");
    }
}
