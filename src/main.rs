//! Digesta CLI - article summaries, contents and keywords by email
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use digesta::pipeline::{Delivery, Pipeline, ProgressEvent};
use digesta::{scraper, source, ui, Config};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "digesta")]
#[command(author, version, about = "Summaries, contents and keywords for an article, by email", long_about = None)]
struct Cli {
    /// Config file (defaults to ./digesta.toml, then ~/.config/digesta/digesta.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse an article and print the Markdown report
    Analyse {
        /// Read the article from a file (.txt, .md, .pdf, .pptx)
        #[arg(long, conflicts_with_all = ["url", "editor"])]
        file: Option<PathBuf>,
        /// Fetch the article from a web page
        #[arg(long, conflicts_with = "editor")]
        url: Option<String>,
        /// Compose the article in $EDITOR
        #[arg(long)]
        editor: bool,
        /// Don't send the report by email
        #[arg(long)]
        no_email: bool,
        /// Also write the report to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Full-screen terminal interface
    Tui {
        /// Don't send the report by email
        #[arg(long)]
        no_email: bool,
    },
    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

const BANNER: &str = r#"
############################################################
#                     DIGESTA                              #
#    Extracting summaries, topics and keywords             #
#    and sending the report by email                       #
############################################################
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let tui = matches!(cli.command, None | Some(Commands::Tui { .. }));
    init_logging(tui)?;

    match cli.command {
        Some(Commands::Analyse {
            file,
            url,
            editor,
            no_email,
            output,
        }) => {
            let mut config = load_config(cli.config.as_ref())?;
            if output.is_some() {
                config.pipeline.output = output;
            }

            let article = if let Some(path) = file {
                source::read_file(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?
            } else if let Some(url) = url {
                println!("Fetching: {}", url);
                scraper::fetch_content(&url).await?.into_article()
            } else if editor {
                source::read_editor()?
            } else {
                if atty::is(atty::Stream::Stdin) {
                    println!("{}", BANNER);
                    println!("Paste the article text below. Press Ctrl+D (or Ctrl+Z on Windows) when done:\n");
                }
                source::read_stdin()?
            };

            if article.trim().is_empty() {
                bail!("no article text given");
            }

            let mut pipeline = Pipeline::new(config)?;
            if no_email {
                pipeline = pipeline.without_email();
            }
            analyse(&pipeline, &article).await?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "digesta",
                &mut std::io::stdout(),
            );
        }
        Some(Commands::Tui { no_email }) => {
            run_tui(cli.config.as_ref(), no_email).await?;
        }
        None => {
            // Default: Launch the TUI
            run_tui(cli.config.as_ref(), false).await?;
        }
    }

    Ok(())
}

/// Console driver: run the pipeline with progress lines, then print the report
async fn analyse(pipeline: &Pipeline, article: &str) -> anyhow::Result<()> {
    println!(
        "Analysing {} characters with {}...\n",
        article.chars().count(),
        pipeline.config().llm.model
    );

    let outcome = pipeline
        .run(article, |event: ProgressEvent| {
            println!("{}", event.message.cyan().bold());
        })
        .await?;

    match &outcome.delivery {
        Delivery::Sent => println!("{}", "✅ Email sent successfully!".green()),
        Delivery::Skipped => println!("{}", "Email delivery skipped.".dimmed()),
        Delivery::Failed(e) => println!("{} {}", "❌ Failed to send email:".red(), e),
    }
    if let Some(path) = &outcome.saved_to {
        println!("Report saved to {}", path.display());
    }
    if let Some(e) = &outcome.save_error {
        println!("{} {}", "❌".red(), e);
    }

    println!("\n{}\n", "*".repeat(60));
    println!("{}", outcome.report);
    Ok(())
}

async fn run_tui(config_path: Option<&PathBuf>, no_email: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut pipeline = Pipeline::new(config)?;
    if no_email {
        pipeline = pipeline.without_email();
    }
    ui::run(pipeline).await?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Console mode logs to stderr; the TUI logs to a file so the screen stays intact
fn init_logging(tui: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if tui {
        let path = std::env::temp_dir().join("digesta.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}
