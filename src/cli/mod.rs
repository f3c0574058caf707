// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All work is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `prepare`  — read the dataset, build the vocabulary,
//                   cache token ids
//   2. `train`    — fine-tune the language model, train the
//                   classifier, save the weights
//   3. `evaluate` — score a saved classifier on a split
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DataArgs, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "ulmfit-clas",
    version,
    about = "Fine-tune a pretrained language model and train a text classifier on top of it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case of the chosen subcommand.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args)  => run_prepare(args),
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_prepare(args: DataArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    tracing::info!("Preparing {} ({}) from '{}'", args.dataset, args.lang, args.data_dir);
    PrepareUseCase::new(args.into()).execute()?;
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}' in: {}", args.data.dataset, args.data.data_dir);
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Weights saved.");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let split = args.split.parse()?;
    EvaluateUseCase::new(args.model_dir, args.arch.into(), &args.name, split, args.cuda_id)
        .execute()?;
    Ok(())
}
