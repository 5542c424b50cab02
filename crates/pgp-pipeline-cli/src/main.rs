//! CLI for the OpenPGP filter-pipeline engine.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pgp-pipeline")]
#[command(about = "Composable byte-stream filter pipeline for OpenPGP message processing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy one stream to another through the filter chain, unframed
    Cat {
        /// Input filename, `-` for stdin, or `fd:<n>` for a raw descriptor
        #[arg(default_value = "-")]
        input: String,

        /// Output filename, `-` for stdout, or `fd:<n>` for a raw descriptor
        #[arg(default_value = "-")]
        output: String,

        /// Append instead of truncating the output path
        #[arg(long)]
        append: bool,

        /// Restrict the output file's permissions to owner-only (0700)
        #[arg(long)]
        mode700: bool,
    },

    /// Wrap a stream in OpenPGP partial-body-length framing
    Pack {
        #[arg(default_value = "-")]
        input: String,

        #[arg(default_value = "-")]
        output: String,
    },

    /// Decode OpenPGP partial-body-length framing back into plain bytes
    Unpack {
        #[arg(default_value = "-")]
        input: String,

        #[arg(default_value = "-")]
        output: String,
    },

    /// Run the Assuan-style command dispatch server
    Serve {
        /// Listen on 127.0.0.1:<port> instead of stdio
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Cat { input, output, append, mode700 } => commands::cat::run(&input, &output, append, mode700),
        Commands::Pack { input, output } => commands::pack::run(&input, &output),
        Commands::Unpack { input, output } => commands::unpack::run(&input, &output),
        Commands::Serve { port } => commands::serve::run(port),
    }
}
