use anyhow::Context;
use clap::{Parser, ValueEnum};
use ohlc_knn::config::{GridConfig, ModelConfig, PipelineConfig, SplitConfig, DEFAULT_INPUT};
use ohlc_knn::engine::{DistanceMetric, Weighting};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ohlc-knn",
    about = "KNN next-day direction and close-price models for daily OHLC data"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum WeightsArg {
    Uniform,
    Distance,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Euclidean,
    Manhattan,
    Minkowski,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Train both models, print the results and plot the regression
    Run {
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,
        #[arg(short, long, default_value = ",")]
        delimiter: char,
        #[arg(long, default_value = "0.25")]
        test_size: f64,
        #[arg(long, default_value = "2")]
        k_min: usize,
        #[arg(long, default_value = "15")]
        k_max: usize,
        #[arg(long, default_value = "5")]
        folds: usize,
        #[arg(long, value_enum, default_value = "uniform")]
        weights: WeightsArg,
        #[arg(long, value_enum, default_value = "euclidean")]
        metric: MetricArg,
        /// Minkowski power (at least 1), used with `--metric minkowski`
        #[arg(long, default_value = "2.0")]
        p: f64,
        /// Shuffle before splitting (lets later days train the model)
        #[arg(long)]
        shuffle: bool,
        #[arg(long, default_value = "42")]
        seed: u64,
        #[arg(long, default_value = "10")]
        sample_rows: usize,
        #[arg(long)]
        no_plot: bool,
        /// Also write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Load and clean a price file, then print a summary
    Inspect {
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,
        #[arg(short, long, default_value = ",")]
        delimiter: char,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            delimiter,
            test_size,
            k_min,
            k_max,
            folds,
            weights,
            metric,
            p,
            shuffle,
            seed,
            sample_rows,
            no_plot,
            json,
        } => {
            let weighting = match weights {
                WeightsArg::Uniform => Weighting::Uniform,
                WeightsArg::Distance => Weighting::Distance,
            };
            let metric = match metric {
                MetricArg::Euclidean => DistanceMetric::Euclidean,
                MetricArg::Manhattan => DistanceMetric::Manhattan,
                MetricArg::Minkowski => DistanceMetric::minkowski(p)
                    .context("invalid --p for the Minkowski metric")?,
            };
            let config = PipelineConfig {
                input,
                delimiter: delimiter_byte(delimiter)?,
                split: SplitConfig {
                    test_size,
                    shuffle,
                    seed,
                },
                grid: GridConfig {
                    k_min,
                    k_max,
                    folds,
                },
                model: ModelConfig { weighting, metric },
                sample_rows,
                show_chart: !no_plot,
            };
            run(&config, json)?;
        }
        Commands::Inspect { input, delimiter } => {
            inspect(&input, delimiter_byte(delimiter)?)?;
        }
    }

    Ok(())
}

fn delimiter_byte(delimiter: char) -> anyhow::Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter {:?} is not a single ASCII character", delimiter))
}

fn run(config: &PipelineConfig, json: Option<PathBuf>) -> anyhow::Result<()> {
    let report = ohlc_knn::run(config)
        .with_context(|| format!("pipeline failed for {}", config.input.display()))?;

    ohlc_knn::report::print_report(&report);

    if let Some(path) = json {
        report
            .write_json(&path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        println!("\nReport written to {}", path.display());
    }

    if config.show_chart {
        ohlc_knn::report::show_regression_chart(&report.regression)
            .context("rendering regression chart")?;
    }
    Ok(())
}

fn inspect(input: &std::path::Path, delimiter: u8) -> anyhow::Result<()> {
    let history = ohlc_knn::data::load_prices(input, delimiter)
        .with_context(|| format!("loading {}", input.display()))?;
    ohlc_knn::data::HistorySummary::from_history(&history).print_summary();
    Ok(())
}
