use anyhow::Result;
use clap::{Parser, Subcommand};
use opflow::config::{CONFIG_FILE_NAME, OpflowConfig};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "opflow")]
#[command(version, about = "Operation flow maps for production orders")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Directory holding `<order>.json` edge record files
    #[arg(long, global = true, default_value = ".", env = "OPFLOW_DATA_DIR")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Operation, component and sequence selecting one node.
#[derive(clap::Args, Clone)]
pub struct NodeArgs {
    /// Operation name
    #[arg(short, long)]
    pub operation: String,

    /// Component name
    #[arg(short, long)]
    pub component: String,

    /// Sequence number of the operation within the component
    #[arg(short, long, default_value = "1")]
    pub seq: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate an order's operation map and list findings
    Validate { order: String },
    /// Print the full map as JSON
    Export { order: String },
    /// Print operation counts and flags as JSON
    Stats { order: String },
    /// Operations directly after the given one
    Next {
        order: String,
        #[command(flatten)]
        node: NodeArgs,
    },
    /// Operations directly before the given one
    Previous {
        order: String,
        #[command(flatten)]
        node: NodeArgs,
    },
    /// Every operation upstream of the given one
    History {
        order: String,
        #[command(flatten)]
        node: NodeArgs,
    },
    /// Whether the operation ends its component's flow
    IsFinal {
        order: String,
        #[arg(short, long)]
        operation: String,
        #[arg(short, long)]
        component: String,
    },
    /// Operations passed over between the last completed and the current one
    Skipped {
        order: String,
        #[arg(short, long)]
        component: String,
        /// Last completed operation
        #[arg(long)]
        last: String,
        /// Operation being scanned now
        #[arg(long)]
        current: String,
    },
    /// The operation that completes production for the order
    FinalProduction { order: String },
    /// Start-to-final paths of a component
    Flows {
        order: String,
        #[arg(short, long)]
        component: String,
    },
    /// Where a component stands after its last completed operation
    Status {
        order: String,
        #[arg(short, long)]
        component: String,
        /// Last completed operation
        #[arg(long)]
        last: String,
    },
    /// Operations of one kind (e.g. unlink, qc, "unlink link")
    ByKind { order: String, kind: String },
    /// Convert a process map into edge records
    Convert {
        /// Process map JSON file
        input: PathBuf,
        /// Write records here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default opflow.toml file
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&cli.config, command.clone());
    }

    let config = OpflowConfig::load_or_default(&cli.config)?;
    opflow::logging::init(&config.logging, &config.log_filter(), cli.verbose)?;
    let ctx = cmd::Context::new(config, &cli.data_dir);

    match &cli.command {
        Commands::Validate { order } => cmd::cmd_validate(&ctx, order)?,
        Commands::Export { order } => cmd::cmd_export(&ctx, order)?,
        Commands::Stats { order } => cmd::cmd_stats(&ctx, order)?,
        Commands::Next { order, node } => cmd::cmd_next(&ctx, order, node)?,
        Commands::Previous { order, node } => cmd::cmd_previous(&ctx, order, node)?,
        Commands::History { order, node } => cmd::cmd_history(&ctx, order, node)?,
        Commands::IsFinal {
            order,
            operation,
            component,
        } => cmd::cmd_is_final(&ctx, order, operation, component)?,
        Commands::Skipped {
            order,
            component,
            last,
            current,
        } => cmd::cmd_skipped(&ctx, order, component, last, current)?,
        Commands::FinalProduction { order } => cmd::cmd_final_production(&ctx, order)?,
        Commands::Flows { order, component } => cmd::cmd_flows(&ctx, order, component)?,
        Commands::Status {
            order,
            component,
            last,
        } => cmd::cmd_status(&ctx, order, component, last)?,
        Commands::ByKind { order, kind } => cmd::cmd_by_kind(&ctx, order, kind)?,
        Commands::Convert { input, output } => cmd::cmd_convert(input, output.as_deref())?,
        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}
