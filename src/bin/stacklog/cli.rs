// CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stacklog")]
#[command(author = "hatlonely <hatlonely@foxmail.com>")]
#[command(version = "0.1.0")]
#[command(about = "Send log events through a configured set of channels", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.stacklog/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log a message (emergency..debug, line, comment, warn)
    Log(LogArgs),
    /// Ask a question on the console and print the answer
    Ask(AskArgs),
    /// Print viewer links of storage and aggregation channels
    Links,
    /// Create export sinks for the aggregation channel
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Log method, e.g. info, error, warn
    pub method: String,

    /// Message text
    pub message: String,

    /// Context entries as key=value
    #[arg(short = 'C', long = "context")]
    pub context: Vec<String>,

    /// Override the aggregation log name
    #[arg(long)]
    pub log_name: Option<String>,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Prompt text
    pub prompt: String,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Destinations joined by '|', e.g. storage|bigquery
    #[arg(short, long)]
    pub destination: String,

    /// Sink name prefix
    #[arg(short, long)]
    pub sink: String,

    /// Destination parameters (bucket / project dataset / project topic / project region bucket)
    pub params: Vec<String>,
}
