// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to its
// use case. Commands that need tensors go through the backend
// dispatcher, which picks Wgpu or NdArray from the accelerator
// count (probed, or given with --accelerators).
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use commands::{AskArgs, Commands, CompareArgs, HostedArgs, InitArgs, TrainArgs};

use crate::application::{
    ask_use_case::AskUseCase,
    compare_use_case::{run_moderation_scan, CompareUseCase},
    hosted_use_case::HostedUseCase,
    init_use_case::InitUseCase,
    train_use_case::TrainUseCase,
};
use crate::domain::{
    config::TrainingConfig,
    device::{select_device, DeviceKind},
};
use crate::infra::device_probe::accelerator_count;
use crate::ml::{backend::dispatch, training_args::TrainingArguments};

#[derive(Parser, Debug)]
#[command(
    name = "docs-finetune",
    version,
    about = "Fine-tune a small causal LM on question/answer docs and compare it with the base model."
)]
pub struct Cli {
    /// Run configuration (model, max_length, dataset) as JSON
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Number of accelerators to assume instead of probing
    #[arg(long, global = true)]
    pub accelerators: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Load --config or fall back to the built-in defaults.
    pub fn training_config(&self) -> Result<TrainingConfig> {
        match &self.config {
            Some(path) => TrainingConfig::load(path),
            None => Ok(TrainingConfig::default()),
        }
    }

    pub fn device(&self) -> DeviceKind {
        select_device(self.accelerators.unwrap_or_else(accelerator_count))
    }

    pub fn run(self, config: TrainingConfig) -> Result<()> {
        let device = self.device();
        match self.command {
            Commands::Walkthrough(args) => run_train(config, args, device, true),
            Commands::Train(args)       => run_train(config, args, device, false),
            Commands::Ask(args)         => run_ask(args, device),
            Commands::Compare(args)     => run_compare(config, args, device),
            Commands::Moderation        => run_moderation_scan(&config).map(|_| ()),
            Commands::Hosted(args)      => run_hosted(args),
            Commands::Init(args)        => run_init(args, device),
        }
    }
}

fn run_train(config: TrainingConfig, args: TrainArgs, device: DeviceKind, walkthrough: bool) -> Result<()> {
    let local_files_only = args.local_files_only;
    let training_args = TrainingArguments::from(args);
    let checkpointing = training_args.gradient_checkpointing;

    let use_case = TrainUseCase::new(config, training_args)
        .with_walkthrough(walkthrough)
        .with_local_files_only(local_files_only);
    let report = dispatch(device, checkpointing, use_case)?;

    println!(
        "Trained {} steps (loss {:.4}) in {:.1}s",
        report.output.global_step, report.output.training_loss, report.output.runtime_secs,
    );
    if let Some(best) = &report.best_checkpoint {
        println!("Best checkpoint: {}", best.display());
    }
    println!("Saved model to: {}", report.final_dir.display());

    if let Some(q) = &report.test_question {
        if let (Some(base), Some(tuned)) = (&report.base_answer, &report.finetuned_answer) {
            println!("Question input (test): {q}");
            println!("Base model output: {base}");
            println!("Fine-tuned model output: {tuned}");
        }
    }
    Ok(())
}

fn run_ask(args: AskArgs, device: DeviceKind) -> Result<()> {
    let use_case = AskUseCase::new(args.model, args.question)
        .with_limits(args.max_input_tokens, args.max_output_tokens)
        .with_local_files_only(args.local_files_only);
    let answer = dispatch(device, false, use_case)?;
    println!("\nAnswer: {answer}");
    Ok(())
}

fn run_compare(config: TrainingConfig, args: CompareArgs, device: DeviceKind) -> Result<()> {
    let use_case = CompareUseCase::new(config, args.slightly, args.longer)
        .with_bigger_hosted(args.bigger_hosted)
        .with_local_files_only(args.local_files_only);
    dispatch(device, false, use_case)?;
    Ok(())
}

fn run_hosted(args: HostedArgs) -> Result<()> {
    let use_case = HostedUseCase {
        model_name: args.model,
        data_path:  args.data,
        input_key:  args.input_key,
        output_key: args.output_key,
        is_public:  !args.private,
    };
    use_case.execute()?;
    Ok(())
}

fn run_init(args: InitArgs, device: DeviceKind) -> Result<()> {
    let use_case = InitUseCase {
        tokenizer:        args.tokenizer,
        output_dir:       args.output_dir,
        local_files_only: args.local_files_only,
        hidden_size:      args.hidden_size,
        num_layers:       args.num_layers,
        num_heads:        args.num_heads,
        max_positions:    args.max_positions,
    };
    dispatch(device, false, use_case)?;
    Ok(())
}
