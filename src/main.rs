//! Command-line interface for `ide-repack`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ide_repack::{Arch, ProcessorSpec, Product, RepackRequest};

#[derive(Parser)]
#[command(
    name = "ide-repack",
    version,
    about = "Repackages IDE distributions for alternative CPU architectures"
)]
struct Cli {
    /// Print per-entry progress (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a distribution for a target architecture
    Transform {
        /// The vendor distribution (tar.gz)
        #[arg(long, value_name = "FILE")]
        distribution: PathBuf,

        /// The native bundle (zip) built for the target architecture
        #[arg(long, value_name = "FILE")]
        natives: PathBuf,

        /// The runtime bundle (tar.gz) to splice under jbr/
        #[arg(long, value_name = "FILE")]
        runtime: Option<PathBuf>,

        /// The output archive
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Architecture the vendor distribution was built for
        #[arg(long, value_name = "ARCH", default_value = "aarch64")]
        base_arch: Arch,

        /// Architecture to repackage for
        #[arg(long, value_name = "ARCH")]
        target_arch: Arch,

        /// Product variant (IC or IU)
        #[arg(long, value_name = "CODE", default_value = "IC")]
        product: Product,
    },

    /// Extract a distribution into a directory, stripping the root prefix
    Extract {
        /// The distribution (tar.gz)
        archive: PathBuf,

        /// Destination directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        dest: PathBuf,
    },
}

fn init_logger(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Warn
    } else {
        match verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn run(command: Commands) -> ide_repack::Result<()> {
    match command {
        Commands::Transform {
            distribution,
            natives,
            runtime,
            output,
            base_arch,
            target_arch,
            product,
        } => {
            let summary = ide_repack::repack(RepackRequest {
                distribution,
                natives,
                runtime,
                output,
                base_arch,
                target_arch,
                product,
                processors: ProcessorSpec::defaults(),
            })?;
            log::info!(
                "wrote {} entries ({} patched, {} replaced, {} from the runtime bundle)",
                summary.total_written(),
                summary.patched,
                summary.replaced,
                summary.runtime_entries,
            );
            Ok(())
        }
        Commands::Extract { archive, dest } => {
            let summary = ide_repack::extract(&archive, &dest)?;
            log::info!("extracted {} entries into {}", summary.total(), dest.display());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
