use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use vos_eval::{
    run_benchmark, summarize_dataset, Args, Evaluator, MissingEvaluator, ProcessEvaluator,
    VosDataset,
};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.to_eval_config();

    if args.summarize {
        info!("Summarizing dataset {}...", config.dataset.root.display());
        match VosDataset::new(config.dataset.clone()).and_then(|dataset| summarize_dataset(&dataset)) {
            Ok(summary) => summary.print_summary(),
            Err(e) => {
                error!("Failed to summarize dataset: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let evaluator: Box<dyn Evaluator> = match &args.evaluator {
        Some(program) => Box::new(ProcessEvaluator::new(program, args.evaluator_args.clone())),
        None => Box::new(MissingEvaluator),
    };

    match run_benchmark(&config, evaluator.as_ref()) {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Evaluation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
