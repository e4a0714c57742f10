// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// One subcommand per workflow:
//
//   walkthrough → train with base / fine-tuned answers printed
//   train       → train and save only
//   ask         → one question against one model
//   compare     → base vs fine-tuned vs reference (vs hosted)
//   moderation  → list training answers with the deflection phrase
//   hosted      → fine-tune and evaluate on the hosted API
//   init        → write a fresh base checkpoint
//
// Training flags map one-to-one onto TrainingArguments.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::compare_use_case::DEFAULT_LONGER_MODEL;
use crate::ml::training_args::{IntervalStrategy, OptimizerKind, TrainingArguments};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune and show the model's answer before and after
    Walkthrough(TrainArgs),

    /// Fine-tune and save the model
    Train(TrainArgs),

    /// Ask a base or fine-tuned model a question
    Ask(AskArgs),

    /// Compare model variants on the first test question
    Compare(CompareArgs),

    /// Scan training answers for the moderation phrase
    Moderation,

    /// Fine-tune on the hosted service and print its evaluation
    Hosted(HostedArgs),

    /// Write a freshly initialised base checkpoint
    Init(InitArgs),
}

/// Flags for `train` and `walkthrough`.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Optimisation steps; -1 trains for --epochs instead
    #[arg(long, default_value_t = 3, allow_hyphen_values = true)]
    pub max_steps: i64,

    #[arg(long, default_value_t = 1.0)]
    pub epochs: f64,

    #[arg(long, default_value_t = 1e-5)]
    pub learning_rate: f64,

    /// Defaults to lamini_docs_{max_steps}_steps
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub overwrite_output_dir: bool,

    #[arg(long, default_value_t = 1)]
    pub train_batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub eval_batch_size: usize,

    #[arg(long, default_value_t = 4)]
    pub gradient_accumulation_steps: usize,

    #[arg(long, default_value_t = 1)]
    pub warmup_steps: usize,

    #[arg(long, default_value_t = 120)]
    pub eval_steps: usize,

    #[arg(long, default_value_t = 120)]
    pub save_steps: usize,

    #[arg(long, default_value_t = 1)]
    pub logging_steps: usize,

    #[arg(long, value_enum, default_value_t = IntervalStrategy::Steps)]
    pub evaluation_strategy: IntervalStrategy,

    #[arg(long, value_enum, default_value_t = IntervalStrategy::Steps)]
    pub logging_strategy: IntervalStrategy,

    #[arg(long, value_enum, default_value_t = OptimizerKind::AdamW)]
    pub optim: OptimizerKind,

    #[arg(long)]
    pub gradient_checkpointing: bool,

    /// Keep the final weights instead of the best evaluated checkpoint
    #[arg(long)]
    pub no_load_best_model_at_end: bool,

    #[arg(long, default_value_t = 1)]
    pub save_total_limit: usize,

    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,

    #[arg(long, default_value_t = 0.0)]
    pub weight_decay: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Hide the progress bar
    #[arg(long)]
    pub disable_tqdm: bool,

    /// Never contact the hub for the base model
    #[arg(long)]
    pub local_files_only: bool,
}

/// CLI flags → TrainingArguments. The trainer never sees clap types.
impl From<TrainArgs> for TrainingArguments {
    fn from(a: TrainArgs) -> Self {
        let mut args = TrainingArguments::with_max_steps(a.max_steps);
        if let Some(dir) = a.output_dir {
            args.output_dir = dir;
        }
        args.num_train_epochs            = a.epochs;
        args.learning_rate               = a.learning_rate;
        args.overwrite_output_dir        = a.overwrite_output_dir;
        args.per_device_train_batch_size = a.train_batch_size;
        args.per_device_eval_batch_size  = a.eval_batch_size;
        args.gradient_accumulation_steps = a.gradient_accumulation_steps;
        args.warmup_steps                = a.warmup_steps;
        args.eval_steps                  = a.eval_steps;
        args.save_steps                  = a.save_steps;
        args.logging_steps               = a.logging_steps;
        args.evaluation_strategy         = a.evaluation_strategy;
        args.logging_strategy            = a.logging_strategy;
        args.optim                       = a.optim;
        args.gradient_checkpointing      = a.gradient_checkpointing;
        args.load_best_model_at_end      = !a.no_load_best_model_at_end;
        args.save_total_limit            = Some(a.save_total_limit);
        args.max_grad_norm               = a.max_grad_norm;
        args.weight_decay                = a.weight_decay;
        args.seed                        = a.seed;
        args.disable_tqdm                = a.disable_tqdm;
        args
    }
}

#[derive(Args, Debug)]
pub struct AskArgs {
    #[arg(long)]
    pub question: String,

    /// Local checkpoint directory or hub model id
    #[arg(long, default_value = "lamini_docs_3_steps/final")]
    pub model: String,

    #[arg(long, default_value_t = 1000)]
    pub max_input_tokens: usize,

    #[arg(long, default_value_t = 100)]
    pub max_output_tokens: usize,

    #[arg(long)]
    pub local_files_only: bool,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Checkpoint from a short local run
    #[arg(long, default_value = "lamini_docs_3_steps/final")]
    pub slightly: String,

    /// Reference model fine-tuned for longer
    #[arg(long, default_value = DEFAULT_LONGER_MODEL)]
    pub longer: String,

    /// Also ask this model on the hosted service
    #[arg(long)]
    pub bigger_hosted: Option<String>,

    #[arg(long)]
    pub local_files_only: bool,
}

#[derive(Args, Debug)]
pub struct HostedArgs {
    #[arg(long, default_value = "EleutherAI/pythia-410m")]
    pub model: String,

    #[arg(long, default_value = "lamini_docs.jsonl")]
    pub data: PathBuf,

    #[arg(long, default_value = "question")]
    pub input_key: String,

    #[arg(long, default_value = "answer")]
    pub output_key: String,

    /// Submit the job as private
    #[arg(long)]
    pub private: bool,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where tokenizer.json comes from (local path or hub model id)
    #[arg(long, default_value = "EleutherAI/pythia-70m")]
    pub tokenizer: String,

    #[arg(long, default_value = "pythia-70m-init")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub hidden_size: Option<usize>,

    #[arg(long)]
    pub num_layers: Option<usize>,

    #[arg(long)]
    pub num_heads: Option<usize>,

    #[arg(long)]
    pub max_positions: Option<usize>,

    #[arg(long)]
    pub local_files_only: bool,
}
