//! Tynic CLI - Convert debtor ledger exports to the Tynic upload CSV
//!
//! ```bash
//! tynic convert ledger.xlsx            # Write tynic_upload.csv
//! tynic convert ledger.csv -o -        # Write CSV to stdout
//! tynic preview ledger.csv --limit 10  # Print converted rows as JSON
//! tynic serve --port 3000              # Start HTTP server
//! ```

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tynic::{
    convert_file, export, process_file, server::ServerConfig, ConversionResult, DOWNLOAD_FILE_NAME,
};

#[derive(Parser)]
#[command(name = "tynic")]
#[command(about = "Convert debtor ledger exports to the Tynic upload format", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV or Excel file to the upload CSV
    Convert {
        /// Input file (.csv, .xls, .xlsx)
        input: PathBuf,

        /// Output file, or "-" for stdout
        #[arg(short, long, default_value = DOWNLOAD_FILE_NAME)]
        output: PathBuf,
    },

    /// Print the converted table as JSON
    Preview {
        /// Input file (.csv, .xls, .xlsx)
        input: PathBuf,

        /// Only show the first N records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: TYNIC_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert { input, output } => cmd_convert(&input, &output),
        Commands::Preview { input, limit } => cmd_preview(&input, limit),
        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let result = if output == Path::new("-") {
        let result = process_file(input)?;
        export::write_csv(io::stdout().lock(), &result.table.records)?;
        result
    } else {
        convert_file(input, output)?
    };

    print_summary(&result);
    Ok(())
}

fn cmd_preview(input: &Path, limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let mut result = process_file(input)?;

    if let Some(n) = limit {
        result.table.records.truncate(n);
    }

    let json = serde_json::to_string_pretty(&result.table)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env().with_port(port);
    tynic::server::start_server(config).await
}

fn print_summary(result: &ConversionResult) {
    eprintln!("\n📊 {} records", result.table.len());
    if result.failures.is_empty() {
        eprintln!("   ✅ All dates and balances converted");
    } else {
        eprintln!(
            "   ⚠️  {} dates and {} balances left empty",
            result.date_failures(),
            result.balance_failures()
        );
    }
}
