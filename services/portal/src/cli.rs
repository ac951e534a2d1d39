use crate::demo::{run_submit, SubmitArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use policy_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Policy Submission Portal",
    about = "Submit insurance applications and run the stub underwriting backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one application through the portal workflow (default command)
    Submit(SubmitArgs),
    /// Serve the stub underwriting backend used for local demos
    Stub(StubArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct StubArgs {
    /// Override the configured host for the stub backend
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the stub backend
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Submit(SubmitArgs::default()));

    match command {
        Command::Submit(args) => run_submit(args).await,
        Command::Stub(args) => server::run(args).await,
    }
}
