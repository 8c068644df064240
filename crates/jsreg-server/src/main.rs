#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

use clap::Parser;
use jsreg_core::{decode_name, encode_name};
use jsreg_server::{logging, ServerArgs};
use miette::{IntoDiagnostic, Result};

#[derive(Parser, Debug)]
#[command(name = "jsreg")]
#[command(author, version, about = "ESM package registry server", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Serve packages from a data directory
    Serve(ServerArgs),

    /// Print the storage token for a package name
    Encode {
        /// Package name (e.g. "left-pad" or "@std:fs")
        name: String,
    },

    /// Print the package name for a storage token
    Decode {
        /// Storage token
        token: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("jsreg {}", jsreg_core::VERSION);
            Ok(())
        }
        Commands::Encode { name } => {
            let encoded = encode_name(&name).into_diagnostic()?;
            print_pair(cli.json, &name, encoded.as_str(), encoded.as_str());
            Ok(())
        }
        Commands::Decode { token } => {
            let name = decode_name(&token);
            print_pair(cli.json, &name, &token, &name);
            Ok(())
        }
        Commands::Serve(args) => {
            logging::init(cli.verbose, cli.json)?;
            let config = args.into_config();
            let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
            runtime.block_on(jsreg_server::serve(config))
        }
    }
}

fn print_pair(json: bool, name: &str, token: &str, plain: &str) {
    if json {
        println!("{}", serde_json::json!({ "name": name, "encoded": token }));
    } else {
        println!("{plain}");
    }
}
