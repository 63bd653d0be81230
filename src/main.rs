use letsopt::infrastructure::cli;
use letsopt::{Dispatcher, SolverFactory};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let dispatcher = Dispatcher::new(SolverFactory::default_engine());
    let args = std::env::args().skip(1);

    let code = cli::run(args, &dispatcher, &mut std::io::stdout()).await;
    ExitCode::from(code)
}
