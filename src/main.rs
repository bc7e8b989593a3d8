//! MangaFetch CLI
//!
//! Command-line interface for the manga tracker:
//! - Show the catalog with read flags
//! - Mark manga read or unread and commit the changes
//! - Manage the scraper's source list
//! - Serve the web front-end

use clap::{Parser, Subcommand};
use mangafetch::config::{generate_default_config, Config};
use mangafetch::render::{render_sources, render_table};
use mangafetch::tracker::{NewSource, Tracker};
use mangafetch::web::{serve, AppState};
use mangafetch::TrackerError;
use std::path::PathBuf;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mangafetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track manga updates and commit read status to GitHub")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: searched in the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// GitHub token, overriding every other token source
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show tracked manga
    List,

    /// Mark a manga read (or unread) locally
    Mark {
        /// Manga ID
        id: u64,
        /// Mark as unread instead
        #[arg(long)]
        unread: bool,
    },

    /// Flip a manga's read flag locally
    Toggle {
        /// Manga ID
        id: u64,
    },

    /// Show uncommitted read changes
    Pending,

    /// Commit pending read changes to the repository
    Flush,

    /// List the scraper's sources
    Sources,

    /// Add a source for the scraper to follow
    Add {
        /// Manga name
        #[arg(short, long)]
        name: String,
        /// Page the scraper should read
        #[arg(short, long)]
        url: String,
        /// Selector matching the latest chapter link
        #[arg(short, long)]
        selector: String,
        /// The selector is an XPath expression rather than CSS
        #[arg(long)]
        xpath: bool,
    },

    /// Remove a source
    Remove {
        /// Source ID
        id: u64,
    },

    /// Show or change the themes
    Theme {
        #[arg(long)]
        accent: Option<String>,
        #[arg(long)]
        background: Option<String>,
    },

    /// Manage the locally stored GitHub token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Serve the web front-end
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum TokenAction {
    /// Store a token
    Set { token: String },
    /// Forget the stored token
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        if let Some(err) = e.downcast_ref::<TrackerError>() {
            if err.requires_new_credentials() {
                eprintln!();
                eprintln!("Store a token with:");
                eprintln!("  mangafetch token set <TOKEN>");
            } else if err.is_conflict() {
                eprintln!();
                eprintln!("Someone else changed the file. Nothing was lost; run the command again.");
            }
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    // The configured subscriber needs the config, so loading logs to a plain one
    let config = tracing::subscriber::with_default(bootstrap_subscriber(std::io::stderr), || {
        match &cli.config {
            Some(path) => Config::load_with_env(path),
            None => Ok(Config::load_default()),
        }
    })?;
    init_logging(&config);

    let json = cli.format == "json";
    let tracker = Tracker::open(config)?.with_token(cli.token);

    match cli.command {
        Commands::List => {
            let view = tracker.view().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view.entries())?);
            } else {
                print!("{}", render_table(&view.catalog, &view.read));
            }
        }

        Commands::Mark { id, unread } => {
            let pending = tracker.mark(id, !unread)?;
            println!(
                "Marked {} as {} ({} pending)",
                id,
                if unread { "unread" } else { "read" },
                pending.len()
            );
        }

        Commands::Toggle { id } => {
            let is_read = tracker.toggle(id).await?;
            println!("Manga {} is now {}", id, if is_read { "read" } else { "unread" });
        }

        Commands::Pending => {
            let pending = tracker.pending()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                println!("No pending changes.");
            } else {
                println!("{:<8} {}", "ID", "Change");
                println!("{}", "-".repeat(20));
                for (id, is_read) in &pending {
                    println!("{:<8} {}", id, if *is_read { "read" } else { "unread" });
                }
            }
        }

        Commands::Flush => {
            let outcome = tracker.flush().await?;
            match &outcome.version {
                None => println!("No changes to commit."),
                Some(version) => {
                    println!(
                        "Read status updated for {} manga (version {})",
                        outcome.flushed.len(),
                        version
                    );
                    if !outcome.remaining.is_empty() {
                        println!(
                            "{} change(s) recorded during the commit are still pending",
                            outcome.remaining.len()
                        );
                    }
                }
            }
        }

        Commands::Sources => {
            let sources = tracker.list_sources().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sources)?);
            } else {
                print!("{}", render_sources(&sources));
            }
        }

        Commands::Add {
            name,
            url,
            selector,
            xpath,
        } => {
            let source = tracker
                .add_source(NewSource {
                    name,
                    url,
                    selector,
                    use_xpath: xpath,
                })
                .await?;
            println!("Added {} with ID {}", source.name, source.id);
        }

        Commands::Remove { id } => {
            tracker.remove_source(id).await?;
            println!("Removed source {}", id);
        }

        Commands::Theme { accent, background } => {
            let theme = tracker.set_theme(accent.as_deref(), background.as_deref())?;
            println!("Accent: {}", theme.accent);
            println!("Background: {}", theme.background);
        }

        Commands::Token { action } => match action {
            TokenAction::Set { token } => {
                tracker.set_token(&token)?;
                println!("Token stored in {:?}", tracker.local().path());
            }
            TokenAction::Clear => {
                tracker.clear_token()?;
                println!("Token cleared");
            }
        },

        Commands::Serve { host, port } => {
            let mut web = tracker.config().web.clone();
            if let Some(host) = host {
                web.host = host;
            }
            if let Some(port) = port {
                web.port = port;
            }

            tracing::info!("Starting MangaFetch v{}", env!("CARGO_PKG_VERSION"));
            serve(AppState::new(tracker), &web).await?;
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn bootstrap_subscriber<W>(make_writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mangafetch=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(make_writer)
        .finish()
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("mangafetch={},tower_http=info", config.logging.level).into()
    });

    let json = config.logging.format == "json";
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_loading_is_logged_before_init() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let good = dir.path().join("good.toml");
        std::fs::write(&broken, "[logging\nlevel = ").unwrap();
        std::fs::write(&good, "[logging]\nlevel = \"debug\"\n").unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let config = tracing::subscriber::with_default(
            bootstrap_subscriber(move || writer.clone()),
            || Config::load_first(&[broken, good]),
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Failed to load config"), "{}", output);
        assert!(output.contains("Loaded config from"), "{}", output);
    }
}
