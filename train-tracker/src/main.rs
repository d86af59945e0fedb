use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use train_tracker::config::AppConfig;
use train_tracker::coordinator::{Coordinator, LookupError, TrainUpdate, lookup_train};
use train_tracker::domain;
use train_tracker::trenord::{MockTrenordClient, TrainFetcher, TrenordClient};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let result = match config.mock_dir.clone() {
        Some(dir) => match MockTrenordClient::from_dir(&dir) {
            Ok(client) => {
                info!(dir = %dir.display(), "serving trains from mock data");
                track(config, Arc::new(client)).await;
                Ok(())
            }
            Err(e) => Err(e),
        },
        None => match TrenordClient::new(config.trenord.clone()) {
            Ok(client) => {
                track(config, Arc::new(client)).await;
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed to create Trenord client");
            ExitCode::FAILURE
        }
    }
}

async fn track<F: TrainFetcher>(config: AppConfig, fetcher: Arc<F>) {
    let tracker = config.tracker_config();

    // The lookup result seeds the coordinator, so its first tick follows the
    // polling window instead of fetching the same train again.
    let coordinator = if config.schedule.is_none() {
        let today = domain::now().date_naive();
        match lookup_train(fetcher.as_ref(), &config.train_id, today).await {
            Ok(train) => {
                info!(train_id = %train.train_id, name = %train.name, "found train");
                report(&TrainUpdate::Snapshot(Arc::new(train.clone())));
                Coordinator::with_snapshot(tracker, train)
            }
            Err(LookupError::TrainNotFound) => {
                warn!(train_id = %config.train_id, "train does not run today, tracking anyway");
                Coordinator::new(tracker)
            }
            Err(e) => {
                warn!(train_id = %config.train_id, error = %e, "lookup failed, starting cold");
                Coordinator::new(tracker)
            }
        }
    } else {
        Coordinator::new(tracker)
    };

    let (handle, mut updates) = coordinator.spawn(fetcher);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            update = updates.recv() => match update {
                Ok(update) => report(&update),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped train updates"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await;
}

fn report(update: &TrainUpdate) {
    let now = domain::now();
    match update {
        TrainUpdate::Snapshot(train) => {
            let station = train.current_station.as_ref().map(|s| s.name.as_str());
            let suppression = train
                .suppression_at(&now)
                .map(|s| format!("{} -> {}", s.from_station_name, s.to_station_name));
            info!(
                name = %train.name,
                status = %train.status,
                delay = train.delay_at(&now),
                current_station = station.unwrap_or("-"),
                suppression = suppression.as_deref().unwrap_or("-"),
                "snapshot"
            );
        }
        TrainUpdate::Unchanged(Some(train)) => {
            info!(name = %train.name, status = %train.status, "unchanged")
        }
        TrainUpdate::Unchanged(None) => info!("no data yet"),
        TrainUpdate::RetryableFailure(reason) => warn!(%reason, "update failed, will retry"),
        TrainUpdate::FatalFailure(reason) => error!(%reason, "unexpected response from Trenord"),
    }
}

