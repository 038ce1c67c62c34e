use hornet_cli::{init_tracing, run, Cli};
use hornet_core::Dispatcher;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    // Hardware backend factories register here via adapter crates; the
    // bare binary still handles offline work (convert, decode).
    let dispatcher = Dispatcher::new();

    match run(&dispatcher, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hornet: {}", e);
            ExitCode::FAILURE
        }
    }
}
