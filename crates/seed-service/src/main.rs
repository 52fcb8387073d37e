//! CLI entry point: train, score, or serve seed sales forecasts.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use seed_learning::{SelectionConfig, TrainedModel};
use seed_processing::{DataSource, PreprocessConfig};
use seed_service::{ForecastPipeline, ServerConfig, server};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "seed-forecast",
    version,
    about = "Seed sales forecasting: model selection and prediction service",
    long_about = "Trains regression models on historical seed sales, persists the best \
                  pipeline, and serves predictions.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  API_HOST      Host for `serve` (default 0.0.0.0)\n  \
                  API_PORT      Port for `serve` (default 5001)\n  \
                  MODEL_PATH    Model loaded by `serve` (default best_model.json)\n  \
                  RUST_LOG      Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  seed-forecast train -i case_study_data.csv\n  \
                  seed-forecast score -i next_season.csv -m best_model.json\n  \
                  seed-forecast serve --port 5001"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select the best model for a training file and save it
    Train {
        /// Historical sales CSV
        #[arg(short, long, default_value = seed_processing::DEFAULT_TRAINING_FILE)]
        input: PathBuf,

        /// Where to write the selected model
        #[arg(short = 'o', long, default_value = "best_model.json")]
        model_out: PathBuf,

        /// Score this CSV with the new model and print the predictions
        #[arg(long)]
        score_input: Option<PathBuf>,

        /// Fraction of rows held out for testing
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Cross-validation folds
        #[arg(long, default_value = "5")]
        cv_folds: usize,

        /// Seed for the split and the seeded estimators
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Parallel jobs for grid search (-1 for all cores)
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        n_jobs: i32,

        /// Drop rows that move a product backwards through its lifecycle
        #[arg(long)]
        enforce_lifecycle: bool,

        /// Keep going when a candidate family fails
        #[arg(long)]
        isolate_failures: bool,
    },

    /// Predict a CSV with a saved model
    Score {
        /// CSV to score
        #[arg(short, long)]
        input: PathBuf,

        /// Saved model
        #[arg(short, long, default_value = "best_model.json")]
        model: PathBuf,
    },

    /// Run the HTTP prediction service
    Serve {
        /// Host to bind (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides API_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Model loaded at startup (overrides MODEL_PATH)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber; `RUST_LOG` wins over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Train {
            input,
            model_out,
            score_input,
            test_size,
            cv_folds,
            seed,
            n_jobs,
            enforce_lifecycle,
            isolate_failures,
        } => {
            let preprocess = PreprocessConfig::builder()
                .enforce_lifecycle_order(enforce_lifecycle)
                .build()?;
            let selection = SelectionConfig::builder()
                .test_size(test_size)
                .cv_folds(cv_folds)
                .random_seed(seed)
                .n_jobs(n_jobs)
                .isolate_candidate_failures(isolate_failures)
                .build()?;
            run_train(
                ForecastPipeline::new(preprocess, selection),
                &input,
                &model_out,
                score_input.as_deref(),
            )
        }
        Command::Score { input, model } => run_score(&input, &model),
        Command::Serve { host, port, model } => {
            let config = ServerConfig::from_env().with_overrides(host, port, model);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::run_server(config))
        }
    }
}

fn require_file(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(anyhow!("Input file not found: {}", path.display()))
    }
}

/// Note: uses `println!` for the comparison table and predictions, which are
/// the command's output regardless of log level.
fn run_train(
    mut pipeline: ForecastPipeline,
    input: &Path,
    model_out: &Path,
    score_input: Option<&Path>,
) -> Result<()> {
    require_file(input)?;
    info!(input = %input.display(), "Training");
    let result = pipeline.fit(&DataSource::new(input))?;

    println!(
        "{:<28} {:>10} {:>10} {:>10} {:>10}  {}",
        "Model", "CV", "Train R2", "Test R2", "Test RMSE", "Overfitting"
    );
    println!("{}", "-".repeat(86));
    for c in &result.comparisons {
        println!(
            "{:<28} {:>10.4} {:>10.4} {:>10.4} {:>10.2}  {}",
            c.name, c.cv_score, c.train_score, c.test_score, c.test_rmse, c.overfitting_risk
        );
    }
    for failure in &result.failures {
        println!("{:<28} FAILED: {}", failure.name, failure.message);
    }
    println!(
        "\nBest model: {} ({}) in {:.1}s",
        result.model.model_name(),
        result.model.selected_params(),
        result.training_time_seconds
    );

    result.model.save(model_out)?;
    println!("Saved to {}", model_out.display());

    if let Some(score_input) = score_input {
        require_file(score_input)?;
        print_predictions(&pipeline.score(&DataSource::new(score_input))?);
    }
    Ok(())
}

fn run_score(input: &Path, model_path: &Path) -> Result<()> {
    require_file(input)?;
    let model = TrainedModel::load(model_path)?;
    let pipeline = ForecastPipeline::from_model(model);
    print_predictions(&pipeline.score(&DataSource::new(input))?);
    Ok(())
}

fn print_predictions(predictions: &[f64]) {
    for p in predictions {
        println!("{p}");
    }
}
