use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use job_poller::cli::{Cli, Command, JobSource};
use job_poller::config::{Overrides, PollerConfig};
use job_poller::executor::{ExecutionRecord, Executor};
use job_poller::runner::{CommandRunner, RandomRunner, ScriptedRunner};
use job_poller::telemetry::init_tracing;
use job_poller::ui::{ExecutionProgress, render_table};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let overrides = Overrides {
        wait_seconds: cli.wait_seconds,
        timeout_seconds: cli.timeout_seconds,
        log_level: cli.log_level.map(Into::into),
    };
    let config = PollerConfig::load(cli.config.as_deref(), &overrides)?;

    let executor = Executor::from_config(&config);

    match cli.command {
        Command::Run(source) => {
            let record = run(&executor, source).await?;
            Ok(if record.outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Definition => {
            let doc = executor.definition().to_states_language();
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Describe => {
            print!("{}", render_table(executor.definition()));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(executor: &Executor, source: JobSource) -> Result<ExecutionRecord> {
    let progress = ExecutionProgress::start();
    let record = match source {
        JobSource {
            codes: Some(codes), ..
        } => executor.run(&ScriptedRunner::new(codes), &progress).await?,
        JobSource {
            command: Some(command),
            ..
        } => executor.run(&CommandRunner::new(command), &progress).await?,
        _ => executor.run(&RandomRunner, &progress).await?,
    };
    progress.complete(&record);
    progress.print_record(&record)?;
    Ok(record)
}
