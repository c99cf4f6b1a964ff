use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::config::{AdviserSelection, AppConfig, ProcessingOrder, RankOrder};
use crate::error::AppError;
use crate::repository::{run_distribution, JsonFileRepository};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "thesis_distribution",
    about = "Distribute students over thesis themes and advisers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Solve a snapshot file once and write the result
    Solve(SolveArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// JSON snapshot to distribute
    #[arg(long)]
    input: PathBuf,
    /// Where to write the JSON result; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
    /// ascending (rank 1 is preferred) or descending
    #[arg(long)]
    rank_order: Option<RankOrder>,
    /// student-id or snapshot
    #[arg(long)]
    processing_order: Option<ProcessingOrder>,
    /// lowest-id or least-loaded
    #[arg(long)]
    adviser_selection: Option<AdviserSelection>,
    /// Place students nobody could take with any adviser that has room
    #[arg(long)]
    place_overflow: bool,
}

impl Cli {
    pub async fn run(self, mut config: AppConfig) -> Result<(), AppError> {
        let command = self
            .command
            .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

        match command {
            Command::Serve(args) => {
                if let Some(host) = args.host {
                    config.server.host = host;
                }
                if let Some(port) = args.port {
                    config.server.port = port;
                }
                server::run_server(&config).await
            }
            Command::Solve(args) => {
                let mut solver = config.solver;
                if let Some(rank_order) = args.rank_order {
                    solver.rank_order = rank_order;
                }
                if let Some(processing_order) = args.processing_order {
                    solver.processing_order = processing_order;
                }
                if let Some(adviser_selection) = args.adviser_selection {
                    solver.adviser_selection = adviser_selection;
                }
                solver.place_overflow |= args.place_overflow;

                let repository = JsonFileRepository::new(args.input, args.output);
                let output = run_distribution(&repository, &solver)?;
                info!(
                    "{} of {} students placed.",
                    output.assignments.len(),
                    output.summary.total_students
                );
                Ok(())
            }
        }
    }
}
