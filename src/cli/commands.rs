// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `prepare`, `train` and
// `evaluate`, and all their configurable flags. The defaults
// reproduce the reference ULMFiT classification recipe.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{ArgAction, Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Architecture;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read the dataset, build the vocabulary and cache token ids
    Prepare(DataArgs),

    /// Fine-tune the language model, then train the classifier
    Train(TrainArgs),

    /// Score a trained classifier on one split
    Evaluate(EvaluateArgs),
}

/// Recurrent architecture of the encoder
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchArg {
    Lstm,
    /// Quasi-recurrent layers; not available with this backend
    Qrnn,
}

impl From<ArchArg> for Architecture {
    fn from(a: ArchArg) -> Self {
        match a {
            ArchArg::Lstm => Architecture::Lstm,
            ArchArg::Qrnn => Architecture::Qrnn,
        }
    }
}

/// Where the data lives and how it is split and encoded.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Path to the `data` directory (must be named `data`)
    #[arg(long)]
    pub data_dir: String,

    /// Language code, e.g. en, de, zh
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// imdb or xnli; read from <data-dir>/<dataset>
    #[arg(long, default_value = "imdb")]
    pub dataset: String,

    /// Most frequent training tokens kept, besides xxunk / xxpad
    #[arg(long, default_value_t = 30000)]
    pub max_vocab: usize,

    /// Seed for the IMDb validation split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of the IMDb training reviews held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub valid_fraction: f64,
}

/// All arguments for the `train` command.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// GPU index; -1 runs on the CPU
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub cuda_id: i32,

    /// Pretrained model name: loads lstm_<name>.mpk and itos_<name>.json
    #[arg(long, default_value = "wt-103")]
    pub pretrain_name: String,

    /// Directory with the pretrained model; all weights are saved here
    #[arg(long, default_value = "models")]
    pub model_dir: String,

    #[arg(long, value_enum, default_value_t = ArchArg::Lstm)]
    pub arch: ArchArg,

    /// Embedding size; defaults to that of --arch
    #[arg(long)]
    pub emb_sz: Option<usize>,

    /// Hidden size of the LSTM layers; defaults to that of --arch
    #[arg(long)]
    pub nh: Option<usize>,

    /// Number of LSTM layers; defaults to that of --arch
    #[arg(long)]
    pub nl: Option<usize>,

    /// Fine-tune the pretrained language model first (`--fine-tune false`
    /// reuses a saved encoder)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub fine_tune: bool,

    /// Batch size
    #[arg(long, default_value_t = 70)]
    pub bs: usize,

    /// Back-propagation-through-time window of the language model
    #[arg(long, default_value_t = 70)]
    pub bptt: usize,

    /// Name of the trained classifier: saved as <arch>_<name>
    #[arg(long, default_value = "imdb-clas")]
    pub name: String,

    #[arg(long, default_value_t = 2)]
    pub lm_epochs: usize,

    /// Epochs of the last, fully unfrozen classifier stage
    #[arg(long, default_value_t = 10)]
    pub final_epochs: usize,

    /// Learning rate of the first layer group during LM fine-tuning
    #[arg(long, default_value_t = 1e-4)]
    pub lm_lr_min: f64,

    /// Learning rate of the last layer group during LM fine-tuning
    #[arg(long, default_value_t = 1e-2)]
    pub lm_lr_max: f64,

    /// Peak one-cycle learning rate of the classifier stages
    #[arg(long, default_value_t = 5e-3)]
    pub clas_lr: f64,

    #[arg(long, default_value_t = 1e-7)]
    pub wd: f64,
}

/// Convert CLI args into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<DataArgs> for TrainConfig {
    fn from(a: DataArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            lang:           a.lang,
            dataset:        a.dataset,
            max_vocab:      a.max_vocab,
            seed:           a.seed,
            valid_fraction: a.valid_fraction,
            ..TrainConfig::default()
        }
    }
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            cuda_id:       a.cuda_id,
            pretrain_name: a.pretrain_name,
            model_dir:     a.model_dir,
            arch:          a.arch.into(),
            emb_sz:        a.emb_sz,
            nh:            a.nh,
            nl:            a.nl,
            fine_tune:     a.fine_tune,
            bs:            a.bs,
            bptt:          a.bptt,
            name:          a.name,
            lm_epochs:     a.lm_epochs,
            final_epochs:  a.final_epochs,
            lm_lr_min:     a.lm_lr_min,
            lm_lr_max:     a.lm_lr_max,
            clas_lr:       a.clas_lr,
            wd:            a.wd,
            ..TrainConfig::from(a.data)
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Directory the classifier was saved to
    #[arg(long, default_value = "models")]
    pub model_dir: String,

    #[arg(long, value_enum, default_value_t = ArchArg::Lstm)]
    pub arch: ArchArg,

    /// Name given to `train`
    #[arg(long, default_value = "imdb-clas")]
    pub name: String,

    /// trn, val or tst
    #[arg(long, default_value = "tst")]
    pub split: String,

    /// GPU index; -1 runs on the CPU
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub cuda_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> TrainConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Train(a) => a.into(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_train_defaults() {
        let cfg = train_config(&["ulmfit-clas", "train", "--data-dir", "data"]);
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn test_train_flags() {
        let cfg = train_config(&[
            "ulmfit-clas", "train",
            "--data-dir", "/srv/data",
            "--dataset", "xnli",
            "--lang", "de",
            "--cuda-id", "-1",
            "--fine-tune", "false",
            "--arch", "qrnn",
            "--bs", "32",
            "--name", "xnli-clas",
            "--nh", "64",
        ]);
        assert_eq!(cfg.data_dir, "/srv/data");
        assert_eq!(cfg.dataset, "xnli");
        assert_eq!(cfg.lang, "de");
        assert_eq!(cfg.cuda_id, -1);
        assert!(!cfg.fine_tune);
        assert_eq!(cfg.arch, Architecture::Qrnn);
        assert_eq!(cfg.bs, 32);
        assert_eq!((cfg.emb_sz, cfg.nh, cfg.nl), (None, Some(64), None));
        assert_eq!(cfg.model_stem(), "qrnn_xnli-clas");
    }

    #[test]
    fn test_data_dir_is_required() {
        assert!(Cli::try_parse_from(["ulmfit-clas", "prepare"]).is_err());
    }

    #[test]
    fn test_evaluate_args() {
        let cli = Cli::try_parse_from(["ulmfit-clas", "evaluate", "--split", "val"]).unwrap();
        match cli.command {
            Commands::Evaluate(a) => {
                assert_eq!(a.split, "val");
                assert_eq!(a.arch, ArchArg::Lstm);
                assert_eq!(a.model_dir, "models");
            }
            other => panic!("expected evaluate, got {other:?}"),
        }
    }
}
