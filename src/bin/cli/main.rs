//! CLI tool for vocabvault topic import and study-state snapshots.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Vocabulary topic import and state snapshot tool
#[derive(Parser)]
#[command(name = "vocabvault")]
#[command(author, version, about = "Vocabulary topic import and state snapshot tool", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Managed topic storage directory
    #[arg(long, short = 's', env = "VOCABVAULT_STORAGE", default_value = "topics", global = true)]
    storage: PathBuf,

    /// Directory of bundled topic files
    #[arg(long, short = 'b', env = "VOCABVAULT_BUNDLED", global = true)]
    bundled: Option<PathBuf>,

    /// Directory holding persisted practice and progress state
    #[arg(long, env = "VOCABVAULT_STATE", default_value = "state", global = true)]
    state: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Import CSV files or ZIP archives of CSV files (alias: i)
    #[command(alias = "i")]
    Import {
        /// Files to import
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Skip CRC-32 verification of archive entries
        #[arg(long)]
        no_crc: bool,

        /// Maximum decompressed size of one archive entry, in bytes
        #[arg(long)]
        max_entry_size: Option<u64>,
    },

    /// List the central directory of a ZIP archive (alias: l)
    #[command(alias = "l")]
    Inspect {
        /// Archive to inspect
        archive: PathBuf,

        /// Also decompress every entry and verify its checksum
        #[arg(long)]
        test: bool,
    },

    /// List loaded topics with their progress
    Topics,

    /// Export a state snapshot (alias: e)
    #[command(alias = "e")]
    Export {
        /// Folder receiving the snapshot
        #[arg(short = 'o', long, default_value = ".")]
        output: PathBuf,

        /// Snapshot file name
        #[arg(long, default_value = vocabvault::snapshot::DEFAULT_SNAPSHOT_FILE_NAME)]
        file_name: String,
    },

    /// Restore state and user topics from a snapshot
    Restore {
        /// Snapshot file to restore
        snapshot: PathBuf,

        /// Replace existing state without asking
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();
    let library = commands::Library {
        storage: &cli.storage,
        bundled: cli.bundled.as_deref(),
        state: &cli.state,
    };

    let exit_code = match cli.command {
        Commands::Import {
            sources,
            no_crc,
            max_entry_size,
        } => commands::import(&commands::ImportConfig {
            sources: &sources,
            storage: &cli.storage,
            verify_crc: !no_crc,
            max_entry_size,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Inspect { archive, test } => {
            commands::inspect(&archive, test, cli.format, cli.quiet)
        }

        Commands::Topics => commands::topics(&library, cli.format),

        Commands::Export { output, file_name } => {
            commands::export(&library, &output, &file_name, cli.format)
        }

        Commands::Restore { snapshot, yes } => {
            commands::restore(&library, &snapshot, yes, cli.format)
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
