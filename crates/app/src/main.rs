//! apiprobe - Main Entry Point

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use apiprobe::cli::{Cli, Command};
use apiprobe::commands::{self, ScheduledOutcome};
use apiprobe_domain::TaskOutcome;
use apiprobe_infrastructure::render_summary;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_outcome(scheduled: &ScheduledOutcome) {
    let task = &scheduled.task;
    println!(
        "{} [{}] {} ({})",
        scheduled.file.display(),
        task.status,
        task.label,
        task.task_id
    );
    if let Some(error) = &task.error {
        println!("  error: {error}");
    }
    match &scheduled.outcome {
        Some(TaskOutcome::TestSuite(result)) => print!("{}", render_summary(result)),
        Some(TaskOutcome::TestCase(result)) => println!("  {}: {}", result.test_id, result.status),
        None => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref(), cli.verbose)?;

    let passed = match &cli.command {
        Command::Run(args) => {
            let result = commands::run(args, config).await?;
            print!("{}", render_summary(&result));
            result.all_passed()
        }
        Command::Schedule(args) => {
            let outcomes = commands::schedule(args, config).await?;
            for outcome in &outcomes {
                print_outcome(outcome);
            }
            outcomes.iter().all(ScheduledOutcome::is_success)
        }
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
