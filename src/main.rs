use std::sync::Arc;

use anyhow::{Context, Result};
use env_logger::Env;

use kick_streams::acquire::BoundedRetryAcquirer;
use kick_streams::candidates::load_candidates;
use kick_streams::config::Config;
use kick_streams::fetch::KickClient;
use kick_streams::records::ListingView;
use kick_streams::ui;

#[tokio::main]
async fn main() -> Result<()> {
    // the progress screen owns the terminal, so only warnings by default
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let candidates =
        load_candidates(&config.candidates).context("Failed to load candidate channels")?;

    let client = KickClient::new(&config.client)?;
    let acquirer = Arc::new(BoundedRetryAcquirer::new(client, config.retry.clone()));

    let outcome = ui::run_acquisition_progress(&acquirer, candidates)
        .await
        .context("Failed to load streamers")?;

    let listing = ListingView::default().apply(&outcome.records);
    print!("{}", ui::render_table(&listing));
    println!("{}", ui::summary_line(&outcome));

    Ok(())
}
