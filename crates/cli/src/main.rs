use anyhow::{anyhow, bail, Context, Result};
use catalog::{CatalogStore, InMemoryCatalog, InteractionKind, ListingId, UserId};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use engine::CandidateSource;
use server::{ListingRecord, RecommendationService, ServiceConfig, Strategy};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

/// EstateRecs - Real-estate Recommendation Engine
#[derive(Parser)]
#[command(name = "estate-recs")]
#[command(about = "Recommend property listings by preference, similarity or collaborative filtering", long_about = None)]
struct Cli {
    /// Directory holding listings.json and interactions.json
    #[arg(short, long, default_value = "data/catalog")]
    data_dir: PathBuf,

    /// JSON file overriding service and engine settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match listings against explicit preferences
    Preferences {
        /// Maximum price
        #[arg(long)]
        budget: f64,

        #[arg(long)]
        min_bedrooms: u32,

        #[arg(long)]
        min_bathrooms: u32,

        /// Desired floor area
        #[arg(long)]
        preferred_area: f64,

        #[arg(long)]
        min_year_built: u32,

        #[arg(long, default_value = "0")]
        parking_spaces: u32,

        /// Number of listings to return (defaults to the config value)
        #[arg(long)]
        num_recommendations: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Listings similar to the ones a user interacted with
    Similar {
        #[command(flatten)]
        user: UserArgs,
    },

    /// Listings liked by users who agree with this user
    UserBased {
        #[command(flatten)]
        user: UserArgs,
    },

    /// Listings similar to this user's history by co-interaction
    ItemBased {
        #[command(flatten)]
        user: UserArgs,
    },

    /// Show one listing and how users interacted with it
    Listing {
        #[arg(long)]
        id: ListingId,
    },

    /// Run benchmark to test performance
    Benchmark {
        /// Strategy to benchmark (content, user-based or item-based)
        #[arg(long, default_value = "user-based")]
        strategy: Strategy,

        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[derive(Args)]
struct UserArgs {
    /// User ID to get recommendations for
    #[arg(long)]
    user_id: UserId,

    /// Number of recommendations to return (defaults to the config value)
    #[arg(long)]
    top_n: Option<usize>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// Print the records as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    println!("Loading catalog from {}...", cli.data_dir.display());
    let start = Instant::now();
    let store = Arc::new(
        InMemoryCatalog::load_from_dir(&cli.data_dir).context("Failed to load catalog")?,
    );
    let (listings, interactions) = store.counts();
    println!(
        "{} Loaded {} listings and {} interactions in {:?}",
        "✓".green(),
        listings,
        interactions,
        start.elapsed()
    );

    let service = RecommendationService::new(store.clone(), config);
    store.subscribe(Arc::new(service.clone()));

    match cli.command {
        Commands::Preferences {
            budget,
            min_bedrooms,
            min_bathrooms,
            preferred_area,
            min_year_built,
            parking_spaces,
            num_recommendations,
            output,
        } => {
            let mut params = BTreeMap::new();
            params.insert("budget".to_string(), budget.to_string());
            params.insert("min_bedrooms".to_string(), min_bedrooms.to_string());
            params.insert("min_bathrooms".to_string(), min_bathrooms.to_string());
            params.insert("preferred_area".to_string(), preferred_area.to_string());
            params.insert("min_year_built".to_string(), min_year_built.to_string());
            params.insert("parking_spaces".to_string(), parking_spaces.to_string());
            if let Some(n) = num_recommendations {
                params.insert("num_recommendations".to_string(), n.to_string());
            }
            handle_recommend(&service, Strategy::Preference, params, output.json).await?
        }
        Commands::Similar { user } => handle_user_strategy(&service, Strategy::Content, user).await?,
        Commands::UserBased { user } => {
            handle_user_strategy(&service, Strategy::UserBased, user).await?
        }
        Commands::ItemBased { user } => {
            handle_user_strategy(&service, Strategy::ItemBased, user).await?
        }
        Commands::Listing { id } => handle_listing(store.as_ref(), id)?,
        Commands::Benchmark {
            strategy,
            requests,
            concurrent,
        } => handle_benchmark(&service, strategy, requests, concurrent).await?,
    }

    Ok(())
}

/// Read the optional JSON config; absent keys keep their defaults
fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let Some(path) = path else {
        return Ok(ServiceConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ServiceConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    debug!("Loaded config: {:?}", config);
    Ok(config)
}

async fn handle_user_strategy(
    service: &RecommendationService,
    strategy: Strategy,
    user: UserArgs,
) -> Result<()> {
    let mut params = BTreeMap::new();
    params.insert("user_id".to_string(), user.user_id.to_string());
    if let Some(n) = user.top_n {
        params.insert("top_n".to_string(), n.to_string());
    }
    handle_recommend(service, strategy, params, user.output.json).await
}

/// Handle every recommendation command
async fn handle_recommend(
    service: &RecommendationService,
    strategy: Strategy,
    params: BTreeMap<String, String>,
    json: bool,
) -> Result<()> {
    let start = Instant::now();
    let records = service.recommend_async(strategy, params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print_records(strategy, &records);
        println!("{}", format!("({:?})", start.elapsed()).dimmed());
    }
    Ok(())
}

/// Handle the 'listing' command
fn handle_listing(store: &dyn CatalogStore, id: ListingId) -> Result<()> {
    let listing = store
        .get_listing(id)
        .ok_or_else(|| anyhow!("Listing {} not found", id))?;

    println!("{}", format!("Listing #{}", listing.id).bold().blue());
    println!("{}Price: {:.0}", "• ".green(), listing.price);
    println!(
        "{}Rooms: {} bedrooms, {} bathrooms",
        "• ".green(),
        listing.bedrooms,
        listing.bathrooms
    );
    println!("{}Area: {:.0}", "• ".green(), listing.area);
    println!("{}Built: {}", "• ".green(), listing.year_built);
    println!("{}Type: {}", "• ".green(), listing.property_type.as_str());
    println!(
        "{}Location: {}, {}",
        "• ".green(),
        listing.location.city,
        listing.location.country
    );
    println!(
        "{}Parking: {} spaces, garage: {}, pool: {}",
        "• ".green(),
        listing.parking_spaces,
        yes_no(listing.has_garage),
        yes_no(listing.has_pool)
    );
    if let Some(description) = &listing.description {
        println!("{}{}", "• ".green(), description.italic());
    }

    let mut counts: BTreeMap<InteractionKind, usize> = BTreeMap::new();
    for interaction in store
        .list_interactions(None)
        .iter()
        .filter(|i| i.listing_id == id)
    {
        *counts.entry(interaction.kind).or_insert(0) += 1;
    }
    println!("Interactions:");
    for kind in [InteractionKind::View, InteractionKind::Like, InteractionKind::Save] {
        println!(
            "  - {:?}: {}",
            kind,
            counts.get(&kind).copied().unwrap_or(0)
        );
    }
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    service: &RecommendationService,
    strategy: Strategy,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    if strategy == Strategy::Preference {
        bail!("Benchmark needs a user strategy (content, user-based or item-based)");
    }
    if requests == 0 || concurrent == 0 {
        bail!("--requests and --concurrent must be at least 1");
    }

    // Random users who have some history, so every request does real work
    let users: Vec<UserId> = service
        .store()
        .list_interactions(None)
        .iter()
        .map(|i| i.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if users.is_empty() {
        bail!("Catalog has no interactions to benchmark with");
    }
    let user_ids: Vec<UserId> = (0..requests)
        .map(|_| users[rand::random_range(0..users.len())])
        .collect();

    service.warm_up().await?;

    let limiter = Arc::new(Semaphore::new(concurrent));
    let run_start = Instant::now();
    let mut handles = vec![];
    for user in user_ids {
        let service = service.clone();
        let limiter = limiter.clone();
        let handle = tokio::spawn(async move {
            let _permit = limiter.acquire_owned().await?;
            let start = Instant::now();
            let params = BTreeMap::from([("user_id".to_string(), user.to_string())]);
            service.recommend_async(strategy, params).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        });
        handles.push(handle);
    }

    let mut timings = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall_time = run_start.elapsed();

    timings.sort();
    let total: Duration = timings.iter().sum();
    let avg_latency = total / timings.len() as u32;
    let throughput = requests as f64 / wall_time.as_secs_f64();

    println!("{}", format!("Benchmark results ({}):", strategy).bold().blue());
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(&timings, 0.50));
    println!("P95 latency: {:?}", percentile(&timings, 0.95));
    println!("P99 latency: {:?}", percentile(&timings, 0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Nearest-rank percentile of sorted, non-empty timings
fn percentile(sorted: &[Duration], q: f64) -> Duration {
    let index = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
    sorted[index]
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Helper function to format and print recommendations
fn print_records(strategy: Strategy, records: &[ListingRecord]) {
    println!("{}", format!("Recommendations ({}):", strategy).bold().blue());
    if records.is_empty() {
        println!("{}", "No matching listings".yellow());
        return;
    }
    for (i, record) in records.iter().enumerate() {
        println!(
            "{}. #{} {}, {} - {:.0} | {} bd / {} ba | {:.0} sqft | {} - Score: {:.3}",
            (i + 1).to_string().green(),
            record.id,
            record.city,
            record.country,
            record.price,
            record.bedrooms,
            record.bathrooms,
            record.area,
            record.year_built,
            record.score
        );
        if record.source == CandidateSource::Popularity {
            println!("   {}", "popular with other users".dimmed());
        }
    }
}
