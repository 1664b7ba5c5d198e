use clap::{Parser, Subcommand};
use crossterm::{
    cursor, execute,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use rec_core::dataset::{load_ratings_csv, Preprocessor};
use rec_core::persistence::{load_from_disk, save_to_disk};
use rec_core::{ModelConfig, Recommendation, StorageKind, TransitionModel};
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use tracing::{error, info};

const DEFAULT_TOP_N: usize = 10;

#[derive(Parser)]
#[command(name = "rec_engine")]
#[command(about = "Implicit-feedback Markov chain recommender")]
struct Cli {
    /// Logging level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a transition model from a ratings CSV and save it
    Fit {
        /// Ratings CSV (userId,movieId,rating[,timestamp])
        #[arg(long)]
        ratings: PathBuf,

        /// Output model file
        #[arg(long)]
        out: PathBuf,

        /// JSON model config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        alpha: Option<f64>,

        /// Fraction of unique users to keep
        #[arg(long)]
        sample_fraction: Option<f64>,

        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        max_items_per_user: Option<usize>,

        #[arg(long, value_enum)]
        storage: Option<StorageKind>,

        #[arg(long, default_value = "5")]
        min_user_ratings: usize,

        #[arg(long, default_value = "50")]
        min_item_ratings: usize,
    },
    /// Print recommendations for one item
    Recommend {
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        item: u64,

        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },
    /// Interactive recommendation prompt
    Repl {
        #[arg(long)]
        model: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let result = match cli.command {
        Commands::Fit {
            ratings,
            out,
            config,
            alpha,
            sample_fraction,
            seed,
            max_items_per_user,
            storage,
            min_user_ratings,
            min_item_ratings,
        } => {
            let mut model_config = match config {
                Some(path) => ModelConfig::from_json_file(&path)?,
                None => ModelConfig::default(),
            };
            if let Some(alpha) = alpha {
                model_config.alpha = alpha;
            }
            if let Some(fraction) = sample_fraction {
                model_config.sample_fraction = fraction;
            }
            if seed.is_some() {
                model_config.seed = seed;
            }
            if max_items_per_user.is_some() {
                model_config.max_items_per_user = max_items_per_user;
            }
            if let Some(storage) = storage {
                model_config.storage = storage;
            }
            run_fit(ratings, out, model_config, Preprocessor::new(min_user_ratings, min_item_ratings))
        }
        Commands::Recommend { model, item, top } => {
            let model = load_from_disk(&model)?;
            print_recommendations(item, &model.recommend(item, top));
            Ok(())
        }
        Commands::Repl { model } => run_repl(load_from_disk(&model)?),
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

fn run_fit(
    ratings: PathBuf,
    out: PathBuf,
    config: ModelConfig,
    preprocessor: Preprocessor,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = load_ratings_csv(&ratings)?;
    let filtered = preprocessor.filter(&raw);
    let model = TransitionModel::fit(&filtered, &config)?;
    save_to_disk(&model, &out)?;
    info!("Model saved to '{}'", out.display());
    Ok(())
}

fn run_repl(model: TransitionModel) -> Result<(), Box<dyn std::error::Error>> {
    let mut top_n = DEFAULT_TOP_N;
    let mut last: Option<(u64, Vec<Recommendation>)> = None;

    loop {
        print_ui(&model, top_n, last.as_ref())?;

        let mut input = String::new();
        if stdin().read_line(&mut input)? == 0 {
            break;
        }
        let cmd = input.trim();

        match cmd {
            "exit" => break,
            "" => {}
            s if s.starts_with(':') && s.len() > 1 => {
                // Change N with :5, :20 etc
                if let Ok(n) = s[1..].parse::<usize>() {
                    top_n = n;
                    if let Some(item) = last.as_ref().map(|(item, _)| *item) {
                        last = Some((item, model.recommend(item, top_n)));
                    }
                }
            }
            s => {
                if let Ok(item) = s.parse::<u64>() {
                    last = Some((item, model.recommend(item, top_n)));
                }
            }
        }
    }
    Ok(())
}

fn print_ui(
    model: &TransitionModel,
    top_n: usize,
    last: Option<&(u64, Vec<Recommendation>)>,
) -> std::io::Result<()> {
    let mut out = stdout();
    execute!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    println!("{}", "Markov Chain Recommender".bold());
    println!("---------------------------------------------------------------");
    println!("Type an item id and press [Enter] for recommendations.");
    println!("Change the list size with ':N'. 'exit' to quit.\n");
    println!(
        "Model: {} items, alpha = {}, storage = {:?}, top N = {}",
        model.item_count(),
        model.alpha(),
        model.storage_kind(),
        top_n
    );

    if let Some((item, recs)) = last {
        if !model.contains(*item) {
            println!("\n{}", format!("Item {} is not in the model.", item).yellow());
        } else {
            print_recommendations(*item, recs);
        }
    }
    print!("\n> ");
    out.flush()
}

fn print_recommendations(item: u64, recs: &[Recommendation]) {
    if recs.is_empty() {
        println!("\nNo recommendations for item {}.", item);
        return;
    }
    println!("\nRecommendations after item {}:", item);
    for (i, (next, p)) in recs.iter().enumerate() {
        println!("  {:>2}: {} (p = {:.4})", i + 1, next.to_string().green(), p);
    }
}
