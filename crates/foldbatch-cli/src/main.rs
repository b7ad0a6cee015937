use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use foldbatch::ManifestLayout;
use foldbatch_cli::cli::{self, output};
use foldbatch_cli::config;
use foldbatch_cli::session::SessionArgs;

#[derive(Parser)]
#[command(
    name = "foldbatch",
    about = "Foldbatch: bulk-submit fold jobs and fetch their results through the browser",
    version,
    after_help = "Run 'foldbatch <command> --help' for details on each command."
)]
struct Cli {
    /// Settings file (JSON). Defaults to $FOLDBATCH_CONFIG, then ./foldbatch.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Args)]
struct BrowserArgs {
    /// Manifest layout: alternating or blank-delimited
    #[arg(long)]
    layout: Option<ManifestLayout>,

    /// Service URL to open instead of the configured one
    #[arg(long)]
    url: Option<String>,

    /// Browser profile directory holding the signed-in session
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Chrome/Chromium executable
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Close the browser at the end without waiting for Enter
    #[arg(long)]
    no_wait: bool,
}

impl BrowserArgs {
    fn session(&self) -> SessionArgs {
        SessionArgs {
            url: self.url.clone(),
            profile: self.profile.clone(),
            chrome: self.chrome.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Submit every manifest entry as a job
    Submit {
        /// Manifest file with named sequences
        manifest: PathBuf,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Download result archives for the jobs named in a manifest
    Download {
        /// Manifest file with named sequences
        manifest: PathBuf,
        /// Directory for <name>.zip archives. Defaults to $FOLDBATCH_OUTPUT_DIR, then ./downloads
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Parse a manifest and report problems, without opening a browser
    Check {
        manifest: PathBuf,
        /// Manifest layout: alternating or blank-delimited
        #[arg(long)]
        layout: Option<ManifestLayout>,
    },
    /// Check environment and diagnose issues
    Doctor {
        /// Chrome/Chromium executable to check
        #[arg(long)]
        chrome: Option<PathBuf>,
        /// Browser profile directory to check
        #[arg(long)]
        profile: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(args: &Cli) -> Result<()> {
    match &args.command {
        Commands::Submit { manifest, browser } => {
            let settings = config::load_settings(args.config.as_deref())?;
            cli::submit_cmd::run(
                manifest,
                browser.layout,
                &browser.session(),
                browser.no_wait,
                &settings,
            )
            .await
        }
        Commands::Download {
            manifest,
            output_dir,
            browser,
        } => {
            let settings = config::load_settings(args.config.as_deref())?;
            cli::download_cmd::run(
                manifest,
                browser.layout,
                output_dir.as_deref(),
                &browser.session(),
                browser.no_wait,
                &settings,
            )
            .await
        }
        Commands::Check { manifest, layout } => {
            let settings = config::load_settings(args.config.as_deref())?;
            cli::check_cmd::run(manifest, *layout, &settings).await
        }
        Commands::Doctor { chrome, profile } => {
            let session = SessionArgs {
                url: None,
                profile: profile.clone(),
                chrome: chrome.clone(),
            };
            cli::doctor::run(args.config.as_deref(), &session).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "foldbatch", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var(output::JSON_ENV, "1");
    }
    if cli.quiet {
        std::env::set_var(output::QUIET_ENV, "1");
    }

    init_tracing(&cli.log_level, cli.log_format);

    let result = run(&cli).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !output::is_quiet() && !output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
