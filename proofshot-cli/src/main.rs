//! Proofshot CLI - engagement-screenshot verification tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (bundle verified / accepted)
  1   General error
  64  Usage error (invalid arguments or configuration)
  65  Bundle rejected or duplicate
  66  Input file missing or unreadable image
  69  OCR engine unavailable or recognition failed
  74  I/O error writing output";

#[derive(Parser)]
#[command(name = "proofshot")]
#[command(author, version, about = "Engagement-screenshot verification", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Log debug output from the verification pipeline
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The five screenshots of one bundle.
#[derive(Debug, Args)]
pub struct BundleFiles {
    /// Screenshot showing the like icon
    #[arg(long, value_name = "FILE")]
    pub like: PathBuf,

    /// First comment-thread screenshot
    #[arg(long, value_name = "FILE")]
    pub comment1: PathBuf,

    /// Second comment-thread screenshot
    #[arg(long, value_name = "FILE")]
    pub comment2: PathBuf,

    /// First reply-thread screenshot
    #[arg(long, value_name = "FILE")]
    pub reply1: PathBuf,

    /// Second reply-thread screenshot
    #[arg(long, value_name = "FILE")]
    pub reply2: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a bundle without recording it
    Analyze {
        #[command(flatten)]
        files: BundleFiles,

        /// JSON configuration file (defaults to PROOFSHOT_* environment variables)
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Verify a bundle for a user and record it if accepted
    Submit {
        /// Submitting user identifier
        #[arg(long)]
        user: String,

        /// Target link identifier
        #[arg(long)]
        link: String,

        #[command(flatten)]
        files: BundleFiles,

        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Print perceptual hash, content hash and type of image files
    Hash {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Hamming distance between two hex perceptual hashes
    Distance {
        #[arg(value_name = "HASH_A")]
        a: String,

        #[arg(value_name = "HASH_B")]
        b: String,

        /// Maximum distance reported as a near-duplicate
        #[arg(short, long, default_value_t = proofshot_core::DEFAULT_HAMMING_THRESHOLD)]
        threshold: u32,
    },

    /// Write the Sauvola-binarized version of an image
    Binarize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output PNG path
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Odd window side in pixels
        #[arg(long, default_value_t = 25)]
        window: u32,

        /// Sensitivity constant
        #[arg(long, default_value_t = 0.2)]
        k: f64,

        /// Dynamic range of the standard deviation
        #[arg(long, default_value_t = 128.0)]
        range: f64,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "proofshot_core=debug,proofshot=debug,info"
    } else {
        "proofshot_core=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Analyze {
            files,
            config,
            format,
        } => commands::analyze::execute(files, config, format, quiet).await,
        Commands::Submit {
            user,
            link,
            files,
            config,
            format,
        } => commands::submit::execute(user, link, files, config, format, quiet).await,
        Commands::Hash { files, format } => commands::hash::execute(files, format),
        Commands::Distance { a, b, threshold } => commands::distance::execute(&a, &b, threshold, quiet),
        Commands::Binarize {
            input,
            output,
            window,
            k,
            range,
        } => commands::binarize::execute(input, output, window, k, range, quiet),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit = match run(cli).await {
        Ok(code) => ExitCode::from_code(code),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {message}", "Error:".red().bold());
    }
    std::process::exit(exit.code);
}
