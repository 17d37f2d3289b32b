use crate::demo::{run_demo, run_daily_report, DailyReportArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use meal_orders::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Meal Orders",
    about = "Run the corporate meal ordering engine from the command line",
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
    /// Summarize a day of orders from a CSV export
    Report(DailyReportArgs),
    /// Walk one order through its lifecycle against the seeded menu
    Demo(DemoArgs),
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
        Command::Report(args) => run_daily_report(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
