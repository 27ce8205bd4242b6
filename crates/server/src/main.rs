//! Simple test harness for the recommendation service.
//!
//! Loads a catalog directory and prints every strategy's answer for one
//! user, so the whole stack can be exercised without the CLI.
//!
//! Usage: server [DATA_DIR] [USER_ID]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use catalog::InMemoryCatalog;
use server::{RecommendationService, ServiceConfig, Strategy};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info,server=debug,engine=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data/catalog".to_string()));
    let user_id = args.next().unwrap_or_else(|| "1".to_string());

    info!("Loading catalog from {}", data_dir.display());
    let store = Arc::new(
        InMemoryCatalog::load_from_dir(&data_dir)
            .with_context(|| format!("Failed to load catalog from {}", data_dir.display()))?,
    );

    let service = RecommendationService::new(store.clone(), ServiceConfig::default());
    store.subscribe(Arc::new(service.clone()));
    service.warm_up().await.context("Failed to warm up engines")?;

    let params: BTreeMap<String, String> = [("user_id".to_string(), user_id.clone())].into();
    for strategy in [Strategy::Content, Strategy::UserBased, Strategy::ItemBased] {
        let records = service.recommend_async(strategy, params.clone()).await?;
        info!("{} for user {}: {} listings", strategy, user_id, records.len());
        for (i, record) in records.iter().enumerate() {
            info!(
                "{}. #{} {} {}, {} bd / {} ba, {:.0} - Score: {:.3} [{:?}]",
                i + 1,
                record.id,
                record.city,
                record.country,
                record.bedrooms,
                record.bathrooms,
                record.price,
                record.score,
                record.source
            );
        }
    }

    Ok(())
}
