// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use wallgrab::api::{
    ApiError, CategoryFilter, GalleryClient, PurityFilter, SearchQuery, SortOrder, Sorting,
    TopRange,
};
use wallgrab::download::{
    DownloadError, DownloadManager, ItemSnapshot, ProgressTracker, RunReport, TransferStatus,
    DEFAULT_CONCURRENCY,
};
use wallgrab::error::{format_error, format_simple_error};
use wallgrab::utils::format_bytes;

/// Exit codes following sysexits.h conventions
/// These provide meaningful exit status to calling processes and scripts
mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// General error - some transfers failed
    pub const ERROR: i32 = 1;
    /// Data error - requested collection or input invalid
    pub const DATA_ERR: i32 = 65;
    /// Service unavailable - gallery API unreachable or erroring
    pub const SERVICE_UNAVAILABLE: i32 = 69;
    /// I/O error - destination directory not usable
    pub const IO_ERR: i32 = 74;
    /// Temporary failure - interrupted, try again later
    pub const TEMP_FAIL: i32 = 75;
    /// Configuration error - missing API key
    pub const CONFIG: i32 = 78;
}

use exit_codes::*;

/// How often the progress display refreshes.
const RENDER_INTERVAL_MS: u64 = 120;

#[derive(Parser)]
#[command(author, version, about = "Concurrent wallhaven.cc collection downloader", long_about = None)]
struct Cli {
    /// wallhaven.cc API key (defaults to $WALLHAVEN_API_KEY)
    #[arg(long, global = true)]
    apikey: Option<String>,

    /// Override the API host (mainly for testing)
    #[arg(long, global = true, hide = true)]
    api_host: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every wallpaper of a collection
    Download {
        /// Username shown on the wallhaven.cc profile page
        #[arg(short, long)]
        username: String,

        /// Label of the collection to download
        #[arg(short, long)]
        collection: String,

        /// Output directory (created if missing, ~ is expanded)
        #[arg(short, long)]
        output: PathBuf,

        /// Number of simultaneous transfers
        #[arg(short = 'j', long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Per-file request timeout in seconds
        #[arg(short = 't', long)]
        timeout: Option<u64>,
    },

    /// List the collections of a user (or of the API key's account)
    Collections {
        /// Username; optional when an API key is set
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Search wallpapers
    Search {
        /// Tags/keywords to search for
        tags: Vec<String>,

        /// Tags/keywords to exclude
        #[arg(short = 'x', long = "exclude")]
        exclude_tags: Vec<String>,

        /// Restrict to uploads by this user
        #[arg(short, long)]
        username: Option<String>,

        /// File types, e.g. jpg or png
        #[arg(long = "type")]
        types: Vec<String>,

        /// Find wallpapers similar to this wallpaper id
        #[arg(long)]
        like: Option<String>,

        /// Category bits: general/anime/people, e.g. 110
        #[arg(long, value_parser = parse_category_filter)]
        categories: Option<CategoryFilter>,

        /// Purity bits: sfw/sketchy/nsfw, e.g. 100 (nsfw needs an API key)
        #[arg(long, value_parser = parse_purity_filter)]
        purity: Option<PurityFilter>,

        /// Sorting: date_added, relevance, random, views, favorites, toplist
        #[arg(long)]
        sorting: Option<Sorting>,

        /// Order: desc or asc
        #[arg(long)]
        order: Option<SortOrder>,

        /// Toplist window: 1d, 3d, 1w, 1M, 3M, 6M, 1y
        #[arg(long = "top-range")]
        top_range: Option<TopRange>,

        /// Minimum resolution, e.g. 1920x1080
        #[arg(long)]
        atleast: Option<String>,

        /// Exact resolutions
        #[arg(long)]
        resolutions: Vec<String>,

        /// Aspect ratios, e.g. 16x9
        #[arg(long)]
        ratios: Vec<String>,

        /// Dominant colors as hex, e.g. 0066cc
        #[arg(long)]
        colors: Vec<String>,
    },

    /// Show the account settings of the configured API key
    Settings,
}

/// Parse a 3-character bit string like `110`.
fn parse_bits(input: &str) -> Result<(bool, bool, bool), String> {
    let bits: Vec<char> = input.chars().collect();
    if bits.len() != 3 || bits.iter().any(|c| *c != '0' && *c != '1') {
        return Err(format!("expected a 3-bit string like 110, got {:?}", input));
    }
    Ok((bits[0] == '1', bits[1] == '1', bits[2] == '1'))
}

fn parse_category_filter(input: &str) -> Result<CategoryFilter, String> {
    let (general, anime, people) = parse_bits(input)?;
    Ok(CategoryFilter { general, anime, people })
}

fn parse_purity_filter(input: &str) -> Result<PurityFilter, String> {
    let (sfw, sketchy, nsfw) = parse_bits(input)?;
    Ok(PurityFilter { sfw, sketchy, nsfw })
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, shutting down...");
        exit(TEMP_FAIL);
    })
    .expect("Error setting Ctrl-C handler");

    let mut client = GalleryClient::from_env();
    if let Some(host) = &cli.api_host {
        client = client.with_api_host(host);
    }
    if let Some(key) = &cli.apikey {
        client = client.with_api_key(key);
    }

    let code = match cli.command {
        Commands::Download { username, collection, output, concurrency, timeout } => {
            cmd_download(client, &username, &collection, &output, concurrency, timeout).await
        }
        Commands::Collections { username } => cmd_collections(client, username.as_deref()).await,
        Commands::Search {
            tags,
            exclude_tags,
            username,
            types,
            like,
            categories,
            purity,
            sorting,
            order,
            top_range,
            atleast,
            resolutions,
            ratios,
            colors,
        } => {
            let query = SearchQuery {
                tags,
                exclude_tags,
                username,
                types,
                like,
                categories,
                purity,
                sorting,
                order,
                top_range,
                atleast,
                resolutions,
                ratios,
                colors,
            };
            cmd_search(client, &query).await
        }
        Commands::Settings => cmd_settings(client).await,
    };

    exit(code);
}

// =============================================================================
// Download
// =============================================================================

async fn cmd_download(
    client: GalleryClient,
    username: &str,
    collection: &str,
    output: &Path,
    concurrency: usize,
    timeout: Option<u64>,
) -> i32 {
    let mut manager = DownloadManager::new(client).with_concurrency(concurrency);
    if let Some(secs) = timeout {
        manager = manager.with_request_timeout(Duration::from_secs(secs));
    }

    let prepared = match manager.prepare(username, collection, output).await {
        Ok(prepared) => prepared,
        Err(error) => {
            eprintln!("{}", fatal_message(&error));
            return fatal_exit_code(&error);
        }
    };

    println!(
        "{} {} — {} files, {} into {}",
        "Downloading".bold(),
        prepared.collection().label.cyan(),
        prepared.file_count(),
        format_bytes(prepared.total_bytes()),
        prepared.destination().display()
    );

    let tracker = prepared.tracker();
    let render = atty::is(atty::Stream::Stderr)
        .then(|| tokio::spawn(render_progress(Arc::clone(&tracker))));

    let report = prepared.execute().await;

    if let Some(handle) = render {
        let _ = handle.await;
    }

    print_report(&report, &tracker.item_snapshots());

    if report.is_success() {
        SUCCESS
    } else {
        ERROR
    }
}

/// Poll the shared tracker and drive one indicatif bar per active file plus
/// an aggregate bar, until every transfer is terminal.
async fn render_progress(tracker: Arc<ProgressTracker>) {
    let multi = MultiProgress::new();

    let total_style = ProgressStyle::with_template(
        "{prefix:>14.bold} [{bar:38.cyan/blue}] {bytes}/{total_bytes}",
    )
    .unwrap()
    .progress_chars("##-");
    let item_style = ProgressStyle::with_template(
        "{prefix:>14} [{bar:38.green/white}] {bytes}/{total_bytes} {msg}",
    )
    .unwrap()
    .progress_chars("##-");

    let total_bar = multi.add(ProgressBar::new(tracker.snapshot().total_bytes));
    total_bar.set_style(total_style);
    total_bar.set_prefix("total");

    let mut item_bars: Vec<Option<ProgressBar>> = vec![None; tracker.len()];

    loop {
        for (index, item) in tracker.item_snapshots().into_iter().enumerate() {
            if item.status == TransferStatus::Pending {
                continue;
            }

            let bar = item_bars[index].get_or_insert_with(|| {
                let bar = multi.add(ProgressBar::new(item.size_bytes));
                bar.set_style(item_style.clone());
                bar.set_prefix(item.name.clone());
                bar
            });
            bar.set_position(item.transferred);

            if item.status.is_terminal() && !bar.is_finished() {
                match item.status {
                    TransferStatus::Completed => bar.finish_with_message("✓".green().to_string()),
                    _ => bar.abandon_with_message("failed".red().to_string()),
                }
            }
        }

        total_bar.set_position(tracker.snapshot().transferred_bytes);

        if tracker.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(RENDER_INTERVAL_MS)).await;
    }

    total_bar.finish();
    let _ = multi.clear();
}

/// Name every file individually, then the run summary.
fn print_report(report: &RunReport, items: &[ItemSnapshot]) {
    let failure_by_name: HashMap<&str, String> = report
        .failures
        .iter()
        .map(|failure| (failure.name.as_str(), failure.error.to_string()))
        .collect();

    for item in items {
        match item.status {
            TransferStatus::Completed => {
                println!("  {} {} ({})", "✓".green(), item.name, format_bytes(item.size_bytes));
            }
            TransferStatus::Failed => {
                let cause = failure_by_name
                    .get(item.name.as_str())
                    .cloned()
                    .unwrap_or_else(|| "failed".to_string());
                println!("  {} {} — {}", "✗".red(), item.name, cause.red());
            }
            _ => {}
        }
    }

    let elapsed = report.elapsed().num_milliseconds() as f64 / 1000.0;
    let summary = format!(
        "{} completed, {} failed, {} in {:.1}s",
        report.completed,
        report.failures.len(),
        format_bytes(report.total_bytes),
        elapsed
    );
    if report.is_success() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
}

fn fatal_message(error: &DownloadError) -> String {
    match error {
        DownloadError::CollectionNotFound { username, label } => {
            let list_fix = format!("List the collections: wallgrab collections -u {}", username);
            format_error(
                &format!("Collection {:?} not found for user {:?}", label, username),
                &[
                    "The label is misspelled (matching is exact and case-sensitive)",
                    "The collection is private and no API key was supplied",
                ],
                &[
                    list_fix.as_str(),
                    "Pass an API key: wallgrab --apikey <KEY> download ...",
                ],
            )
        }
        DownloadError::Api(ApiError::AuthRequired) => format_error(
            "No username and no API key supplied",
            &["Anonymous collection listings need a username"],
            &[
                "Pass a username: wallgrab download -u <USER> ...",
                "Or set WALLHAVEN_API_KEY to use your own account",
            ],
        ),
        other => format_simple_error(&other.to_string()),
    }
}

fn fatal_exit_code(error: &DownloadError) -> i32 {
    match error {
        DownloadError::InvalidInput(_) | DownloadError::CollectionNotFound { .. } => DATA_ERR,
        DownloadError::Destination { .. } => IO_ERR,
        DownloadError::Api(ApiError::AuthRequired) => CONFIG,
        DownloadError::Api(_) => SERVICE_UNAVAILABLE,
    }
}

// =============================================================================
// Metadata commands
// =============================================================================

async fn cmd_collections(client: GalleryClient, username: Option<&str>) -> i32 {
    match list_collections(client, username).await {
        Ok(()) => SUCCESS,
        Err(error) => {
            eprintln!("{}", format_simple_error(&format!("{:#}", error)));
            api_exit_code(&error)
        }
    }
}

async fn list_collections(client: GalleryClient, username: Option<&str>) -> Result<()> {
    let collections = client
        .list_collections(username)
        .await
        .context("failed to list collections")?;

    if collections.is_empty() {
        println!("No collections.");
        return Ok(());
    }

    for collection in collections {
        let visibility = if collection.public == 1 { "public" } else { "private" };
        println!(
            "  {:<24} {:>5} wallpapers  {:>7} views  {}",
            collection.label.bold(),
            collection.count,
            collection.views,
            visibility.dimmed()
        );
    }
    Ok(())
}

async fn cmd_search(client: GalleryClient, query: &SearchQuery) -> i32 {
    match search(client, query).await {
        Ok(()) => SUCCESS,
        Err(error) => {
            eprintln!("{}", format_simple_error(&format!("{:#}", error)));
            api_exit_code(&error)
        }
    }
}

async fn search(client: GalleryClient, query: &SearchQuery) -> Result<()> {
    let wallpapers = client.search(query).await.context("search failed")?;

    if wallpapers.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for wallpaper in &wallpapers {
        println!(
            "  {}  {:>11}  {:>9}  {}",
            wallpaper.id.bold(),
            wallpaper.resolution,
            format_bytes(wallpaper.file_size),
            wallpaper.path.dimmed()
        );
    }
    println!("{} results", wallpapers.len());
    Ok(())
}

async fn cmd_settings(client: GalleryClient) -> i32 {
    match settings(client).await {
        Ok(()) => SUCCESS,
        Err(error) => {
            eprintln!("{}", format_simple_error(&format!("{:#}", error)));
            api_exit_code(&error)
        }
    }
}

async fn settings(client: GalleryClient) -> Result<()> {
    let settings = client
        .user_settings()
        .await
        .context("failed to fetch account settings")?;

    println!("  thumb size:     {}", settings.thumb_size);
    println!("  per page:       {}", settings.per_page);
    println!("  purity:         {}", settings.purity.join(", "));
    println!("  categories:     {}", settings.categories.join(", "));
    println!("  resolutions:    {}", settings.resolutions.join(", "));
    println!("  aspect ratios:  {}", settings.aspect_ratios.join(", "));
    println!("  toplist range:  {}", settings.toplist_range);
    println!("  tag blacklist:  {}", settings.tag_blacklist.join(", "));
    println!("  user blacklist: {}", settings.user_blacklist.join(", "));
    Ok(())
}

/// Map an anyhow chain from the metadata commands onto an exit code.
fn api_exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ApiError>() {
        Some(ApiError::AuthRequired) => CONFIG,
        Some(_) => SERVICE_UNAVAILABLE,
        None => ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bits() {
        assert_eq!(parse_bits("110").unwrap(), (true, true, false));
        assert_eq!(parse_bits("001").unwrap(), (false, false, true));
        assert!(parse_bits("10").is_err());
        assert!(parse_bits("abc").is_err());
        assert!(parse_bits("1101").is_err());
    }

    #[test]
    fn test_parse_filters() {
        let categories = parse_category_filter("100").unwrap();
        assert!(categories.general && !categories.anime && !categories.people);

        let purity = parse_purity_filter("101").unwrap();
        assert!(purity.sfw && !purity.sketchy && purity.nsfw);
    }

    #[test]
    fn test_cli_parses_download() {
        let cli = Cli::try_parse_from([
            "wallgrab", "download", "-u", "alice", "-c", "Nature", "-o", "/tmp/walls", "-j", "8",
        ])
        .unwrap();

        match cli.command {
            Commands::Download { username, collection, concurrency, .. } => {
                assert_eq!(username, "alice");
                assert_eq!(collection, "Nature");
                assert_eq!(concurrency, 8);
            }
            _ => panic!("expected download subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_search_filters() {
        let cli = Cli::try_parse_from([
            "wallgrab", "search", "--categories", "110", "--sorting", "toplist",
            "--top-range", "1w", "sunset", "mountains",
        ])
        .unwrap();

        match cli.command {
            Commands::Search { tags, categories, sorting, top_range, .. } => {
                assert_eq!(tags, vec!["sunset", "mountains"]);
                assert_eq!(categories.unwrap().bits(), "110");
                assert_eq!(sorting.unwrap(), Sorting::Toplist);
                assert_eq!(top_range.unwrap(), TopRange::OneWeek);
            }
            _ => panic!("expected search subcommand"),
        }
    }
}
