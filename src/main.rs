//! runcmd binary entry point.

use std::io::Write;
use std::process::exit;

use runcmd::cli::{self, Args};
use runcmd::config::Config;
use runcmd::execution::INTERNAL_ERR;
use runcmd::{logging, CommandRunner, ExecutionResult};
use tracing::{debug, warn};

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("runcmd: {}", e);
            eprintln!("Try 'runcmd --help' for more information.");
            exit(2);
        }
    };

    if args.help {
        cli::print_help();
        return;
    }
    if args.version {
        cli::print_version();
        return;
    }

    exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("runcmd: {}", e);
            return 2;
        }
    };

    let _ = logging::try_init_with_filter(config.log_filter());
    debug!("runcmd v{}", env!("CARGO_PKG_VERSION"));

    let Some(spec) = args.command_spec() else {
        println!("No command supplied. Exiting now.");
        return 0;
    };

    let runner_config = match config.runner_config() {
        Ok(runner_config) => runner_config,
        Err(e) => {
            eprintln!("runcmd: {}", e);
            return 2;
        }
    };

    match CommandRunner::with_config(runner_config).run(&spec).await {
        Ok(result) => emit(&mut std::io::stdout().lock(), &result),
        Err(e) => {
            eprintln!("runcmd: {}", e);
            e.status().code()
        }
    }
}

/// Write the captured output and pick the exit code.
///
/// Output that cannot be delivered (e.g. EPIPE into `head`) turns the run
/// into an internal error.
fn emit<W: Write>(out: &mut W, result: &ExecutionResult) -> i32 {
    match out.write_all(&result.output).and_then(|()| out.flush()) {
        Ok(()) => result.code(),
        Err(e) => {
            warn!(error = %e, bytes = result.output.len(), "failed to write command output");
            INTERNAL_ERR
        }
    }
}
