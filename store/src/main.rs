use store::PublicationStore;
use store::infrastructure::http::ContentApiClient;
use store::infrastructure::settings::Settings;
use store::infrastructure::storage::FileStorage;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Headless sync runner: loads the local snapshot and drains pending sync
/// work against the remote content API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let storage = FileStorage::new(&settings.storage_dir)?;
    let client = ContentApiClient::new(
        &settings.api_base_url,
        settings.session.access_token.clone(),
    );
    let store = PublicationStore::open(storage, client, settings.session.clone());

    let stats = store.stats();
    tracing::info!(
        total = stats.total,
        pending = stats.pending_sync,
        "snapshot loaded"
    );

    store.reconcile().await;

    let stats = store.stats();
    tracing::info!(pending = stats.pending_sync, "reconciliation pass finished");
    Ok(())
}
