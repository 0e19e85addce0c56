//! Resep Nusantara CLI - reviews and favorites from the terminal.
//!
//! Talks to the recipe backend through the same cache rules the installed
//! web app uses, so recipe data keeps working offline.

use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use resep_core::cache::CachePolicy;
use resep_core::config::Config;
use resep_core::hooks::{
    favorites_by_user, reviews_by_user, reviews_for_recipe, CreateReviewController, FetchState,
    UserIdentity,
};
use resep_core::models::{NewReview, Recipe, Review};
use resep_core::pwa::PwaConfig;
use resep_core::{connect, Connection};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Directory for a daily log file, in addition to stderr
const LOG_DIR_ENV: &str = "RESEP_LOG_DIR";

const LOG_FILE_PREFIX: &str = "resep.log";

const USAGE: &str = "\
Usage: resep <command>

Commands:
  reviews <recipe-id>                   List reviews for a recipe
  review <recipe-id> <rating> <text..>  Post a review, then list the recipe's reviews
  my-reviews                            List reviews written by the current user
  favorites                             List the current user's favorite recipes
  profile                               Reviews and favorites of the current user
  cache [clear]                         Show or clear cached API responses
  config                                Print the effective configuration
  manifest                              Print the web app manifest
  pwa-config                            Print the full PWA build configuration
  precache <build-dir>                  List the assets that would be precached

Environment:
  RESEP_BASE_URL   Backend URL (default http://localhost:3000)
  RESEP_USER_ID    Current user identifier
  RESEP_LOG_DIR    Also write logs to a daily file in this directory
  RUST_LOG         Log filter (default warn)";

/// Initialize the tracing subscriber for logging.
/// The returned guard must stay alive for file logs to be flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load().context("Failed to load config")?;
    let pwa = PwaConfig::default();
    info!(base_url = %config.base_url, command = %command, "Resep CLI starting");

    match command.as_str() {
        "reviews" => {
            let recipe_id = required(&args, 1, "recipe id")?;
            let conn = open(&config, &pwa)?;
            let state = reviews_for_recipe(conn.api.clone(), Some(recipe_id)).fetch().await;
            print_reviews(&state);
            conn.flush().await;
        }
        "review" => {
            let recipe_id = required(&args, 1, "recipe id")?;
            let rating: u8 = required(&args, 2, "rating")?
                .parse()
                .context("Rating must be a number from 1 to 5")?;
            if !(1..=5).contains(&rating) {
                bail!("Rating must be a number from 1 to 5");
            }
            let comment = args.get(3..).map(|rest| rest.join(" ")).unwrap_or_default();

            let conn = open(&config, &pwa)?;
            let mut payload = NewReview::new(rating, comment);
            if let Some(user) = config.user_identifier() {
                payload = payload.with_user(user);
            }

            let create = CreateReviewController::new(conn.api.clone());
            match create.create_review(recipe_id, &payload).await {
                Some(_) => println!("Review posted."),
                None => {
                    let state = create.state();
                    bail!(state.error.unwrap_or_else(|| "Failed to create review".to_string()));
                }
            }

            let state = reviews_for_recipe(conn.api.clone(), Some(recipe_id)).refetch().await;
            print_reviews(&state);
            conn.flush().await;
        }
        "my-reviews" => {
            let conn = open(&config, &pwa)?;
            require_user(&config)?;
            let state = reviews_by_user(conn.api.clone(), &config).fetch().await;
            print_reviews(&state);
            conn.flush().await;
        }
        "favorites" => {
            let conn = open(&config, &pwa)?;
            require_user(&config)?;
            let state = favorites_by_user(conn.api.clone(), &config).fetch().await;
            print_favorites(&state);
            conn.flush().await;
        }
        "profile" => {
            let conn = open(&config, &pwa)?;
            require_user(&config)?;
            let reviews = reviews_by_user(conn.api.clone(), &config);
            let favorites = favorites_by_user(conn.api.clone(), &config);

            let (reviews, favorites) = futures::join!(reviews.fetch(), favorites.fetch());
            println!("== Favorites ==");
            print_favorites(&favorites);
            println!();
            println!("== My reviews ==");
            print_reviews(&reviews);
            conn.flush().await;
        }
        "cache" => {
            let conn = open(&config, &pwa)?;
            if args.get(1).map(String::as_str) == Some("clear") {
                conn.storage.clear(pwa.runtime_caching()).await?;
                println!("Cache cleared.");
            } else {
                print_cache(&conn, pwa.runtime_caching()).await;
            }
        }
        "config" => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        "manifest" => {
            println!("{}", pwa.manifest_json()?);
        }
        "pwa-config" => {
            pwa.validate()?;
            println!("{}", serde_json::to_string_pretty(&pwa)?);
        }
        "precache" => {
            let dir = required(&args, 1, "build directory")?;
            let entries = pwa.precache_manifest(Path::new(dir))?;
            let total: u64 = entries.iter().map(|e| e.size).sum();
            for entry in &entries {
                println!("{:>10}  {}", entry.size, entry.url);
            }
            println!("{} files, {} bytes", entries.len(), total);
        }
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn open(config: &Config, pwa: &PwaConfig) -> Result<Connection> {
    connect(config, pwa.runtime_caching().clone())
}

fn required<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(value) if !value.trim().is_empty() => Ok(value.as_str()),
        _ => bail!("Missing {}\n\n{}", what, USAGE),
    }
}

fn require_user(config: &Config) -> Result<()> {
    if config.user_identifier().is_none() {
        bail!("No user identifier configured. Set RESEP_USER_ID or user_identifier in the config file.");
    }
    Ok(())
}

fn print_reviews(state: &FetchState<Review>) {
    if let Some(ref error) = state.error {
        eprintln!("Error: {}", error);
        return;
    }
    if state.items.is_empty() {
        println!("No reviews yet.");
        return;
    }
    for review in &state.items {
        let title = review
            .recipe_name
            .as_deref()
            .or(review.recipe_id.as_deref())
            .unwrap_or(&review.id);
        println!("{}  {}", review.stars(), title);
        if let Some(ref comment) = review.comment {
            if !comment.is_empty() {
                println!("    {}", comment);
            }
        }
    }
}

fn print_favorites(state: &FetchState<Recipe>) {
    if let Some(ref error) = state.error {
        eprintln!("Error: {}", error);
        return;
    }
    if state.items.is_empty() {
        println!("No favorites yet.");
        return;
    }
    for recipe in &state.items {
        println!("{:<32} {}", recipe.name, recipe.category_display());
    }
}

async fn print_cache(conn: &Connection, policy: &CachePolicy) {
    match conn.storage.cache_dir() {
        Some(dir) => println!("Cache directory: {}", dir.display()),
        None => println!("Cache directory: (memory only)"),
    }
    for summary in conn.storage.summaries(policy).await {
        println!(
            "{:<20} {:>4} entries, updated {}",
            summary.name,
            summary.entries,
            summary.last_updated_display()
        );
    }
}
