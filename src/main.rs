mod api;
mod fetch;
mod parser;

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use url::Url;

use api::ScrapeResponse;
use fetch::FetchConfig;

#[derive(Parser)]
#[command(name = "supply_lists", about = "Find and label school supply-list documents on a page")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a school page or drive folder and list its documents
    Scrape {
        url: String,
        /// Print the JSON envelope instead of a table
        #[arg(long)]
        json: bool,
        /// Request timeout in seconds (default: 20, or 25 for drive URLs)
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Override the browser User-Agent
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Run discovery on a saved HTML page (no network)
    Parse {
        /// HTML file to read
        #[arg(short, long)]
        file: String,
        /// URL the page was saved from, for relative links
        #[arg(short, long)]
        url: String,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let response = match cli.command {
        Commands::Scrape {
            url,
            json,
            timeout,
            user_agent,
        } => {
            let mut config = FetchConfig::default();
            if let Some(secs) = timeout {
                config.page_timeout = Duration::from_secs(secs);
                config.cloud_timeout = Duration::from_secs(secs);
            }
            if let Some(ua) = user_agent {
                config.user_agent = ua;
            }

            let spinner = (!json).then(|| {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                    pb.set_style(style);
                }
                pb.set_message(format!("Fetching {}", url));
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            });
            let response = api::scrape(&url, &config).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            print_response(&response, json)?;
            response
        }
        Commands::Parse { file, url, json } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file))?;
            let page_url = Url::parse(&url).with_context(|| format!("Invalid page URL {}", url))?;
            let response = ScrapeResponse::ok(parser::discover(&page_url, &page_url, &html));
            print_response(&response, json)?;
            response
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    if !response.is_success() {
        anyhow::bail!("scrape failed with status {}", response.status());
    }
    Ok(())
}

fn print_response(response: &ScrapeResponse, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    match response {
        ScrapeResponse::Failure(f) => {
            eprintln!("Error ({}): {}", f.status, f.error);
        }
        ScrapeResponse::Success(s) if s.links.is_empty() => {
            println!("No documents found.");
        }
        ScrapeResponse::Success(s) => {
            println!("{:>3} | {:<28} | {}", "#", "Label", "Href");
            println!("{}", "-".repeat(100));
            for (i, link) in s.links.iter().enumerate() {
                println!("{:>3} | {:<28} | {}", i + 1, truncate(&link.label, 28), link.href);
            }
            println!("\n{} documents", s.count);
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
