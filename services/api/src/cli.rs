use crate::server;
use crate::slips::{run_due_date, run_generate, DueDateArgs, GenerateArgs};
use clap::{Args, Parser, Subcommand};
use condo_billing::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "condo-billing",
    about = "Generate and track condominium payment slips",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Back-office slip operations
    Slips {
        #[command(subcommand)]
        command: SlipsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SlipsCommand {
    /// Generate the slips for one expense month from CSV billing data
    Generate(GenerateArgs),
    /// Print the due date selected for a due month
    DueDate(DueDateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Slips {
            command: SlipsCommand::Generate(args),
        } => run_generate(args),
        Command::Slips {
            command: SlipsCommand::DueDate(args),
        } => run_due_date(args),
    }
}
