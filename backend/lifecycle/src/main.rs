use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use records::{Documents, database::RedisStore};
use server::search::SearchIndex;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Refresh this Meilisearch instance after moving hackathons.
    #[arg(long)]
    meili_url: Option<String>,

    #[arg(long)]
    meili_key: Option<String>,

    /// Only report what would change.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let store = RedisStore::connect(&args.redis_url)
        .await
        .with_context(|| format!("connecting to {}", args.redis_url))?;
    let docs = Documents::new(Arc::new(store));

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let report = lifecycle::sweep(&docs, Utc::now(), args.dry_run, &pb).await?;

    println!("Checked Hackathons: {}", report.checked);
    for transition in &report.transitions {
        println!(
            "{} {} ({}): {} -> {}",
            if args.dry_run { "Would move" } else { "Moved" },
            transition.title,
            transition.hackathon_id,
            transition.from.as_str(),
            transition.to.as_str()
        );
    }
    for (hackathon_id, error) in &report.failures {
        println!("Failed {hackathon_id}: {error}");
    }

    if !args.dry_run && !report.transitions.is_empty() && args.meili_url.is_some() {
        SearchIndex::new(args.meili_url.as_deref(), args.meili_key.as_deref(), docs).await?;
        println!("Search index refreshed");
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} hackathons failed to advance", report.failures.len());
    }

    Ok(())
}
