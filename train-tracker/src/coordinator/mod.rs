//! Polling coordinator for one tracked train.
//!
//! [`Coordinator`] is a plain owned state machine: [`Coordinator::on_tick`]
//! asks the polling window whether to fetch, and
//! [`Coordinator::on_fetch_complete`] folds a fetch result into the last
//! accepted snapshot. [`Coordinator::spawn`] drives it from a tokio interval,
//! runs fetches on their own task and broadcasts a [`TrainUpdate`] per tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{broadcast, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::{self, RailInstant, Train};
use crate::polling::PollingWindow;
use crate::trenord::{ConversionError, ParseOutcome, TrainFetcher, TrenordError, parse_train};

/// Default tick interval.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest tick interval the loop will run with.
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Default end-to-end budget for one fetch, parse included.
const DEFAULT_FETCH_BUDGET: Duration = Duration::from_secs(30);

/// Capacity of the update broadcast channel.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Configuration for tracking one train.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Opaque upstream train identifier.
    pub train_id: String,
    /// Known departure, for a warm start.
    pub departure_time: Option<RailInstant>,
    /// Known arrival, for a warm start.
    pub arrival_time: Option<RailInstant>,
    /// Time between ticks.
    pub tick_interval: Duration,
    /// End-to-end budget for one fetch.
    pub fetch_budget: Duration,
    /// When polling is worthwhile.
    pub polling: PollingWindow,
}

impl TrackerConfig {
    /// Create a config for a train with no known schedule.
    pub fn new(train_id: impl Into<String>) -> Self {
        Self {
            train_id: train_id.into(),
            departure_time: None,
            arrival_time: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            fetch_budget: DEFAULT_FETCH_BUDGET,
            polling: PollingWindow::default(),
        }
    }

    /// Warm-start config from a looked-up train.
    pub fn from_train(train: &Train) -> Self {
        Self::new(train.train_id.clone()).with_schedule(train.departure_time, train.arrival_time)
    }

    /// Set the known schedule.
    pub fn with_schedule(mut self, departure_time: RailInstant, arrival_time: RailInstant) -> Self {
        self.departure_time = Some(departure_time);
        self.arrival_time = Some(arrival_time);
        self
    }

    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the end-to-end fetch budget.
    pub fn with_fetch_budget(mut self, budget: Duration) -> Self {
        self.fetch_budget = budget;
        self
    }

    /// Set the polling window.
    pub fn with_polling_window(mut self, polling: PollingWindow) -> Self {
        self.polling = polling;
        self
    }
}

/// What a subscriber receives on each tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainUpdate {
    /// A new snapshot was accepted.
    Snapshot(Arc<Train>),
    /// Nothing new; carries the last accepted snapshot, if any.
    Unchanged(Option<Arc<Train>>),
    /// Transient failure; the next tick may succeed.
    RetryableFailure(String),
    /// The payload had an unexpected shape; retrying the same tick won't help.
    FatalFailure(String),
}

/// Why a fetch cycle failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    /// Network, HTTP or timeout error
    #[error("transport failure: {0}")]
    Transport(#[from] TrenordError),

    /// Unexpected payload shape
    #[error("parse failure: {0}")]
    Parse(#[from] ConversionError),

    /// The fetch task panicked or was cancelled
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl FetchFailure {
    /// Returns true if the failure is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchFailure::Transport(_) | FetchFailure::Task(_))
    }
}

impl From<JoinError> for FetchFailure {
    fn from(err: JoinError) -> Self {
        FetchFailure::Task(err.to_string())
    }
}

/// Whether a fetch is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Fetching,
}

/// What the loop should do after a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickAction {
    /// A fetch is already in flight; nothing to publish.
    Busy,
    /// No fetch this tick; publish this update.
    Publish(TrainUpdate),
    /// Start a fetch for this service date.
    Fetch { date: NaiveDate },
}

/// Single-train polling state machine.
#[derive(Debug)]
pub struct Coordinator {
    config: TrackerConfig,
    state: CoordinatorState,
    snapshot: Option<Arc<Train>>,
    departure_time: Option<RailInstant>,
    arrival_time: Option<RailInstant>,
}

impl Coordinator {
    /// Create an idle coordinator.
    pub fn new(config: TrackerConfig) -> Self {
        let departure_time = config.departure_time;
        let arrival_time = config.arrival_time;
        Self {
            config,
            state: CoordinatorState::Idle,
            snapshot: None,
            departure_time,
            arrival_time,
        }
    }

    /// Create an idle coordinator that already holds `train`.
    ///
    /// The schedule comes from `train`, and the first tick is held to the
    /// polling window instead of forcing a fetch.
    pub fn with_snapshot(config: TrackerConfig, train: Train) -> Self {
        let config = config.with_schedule(train.departure_time, train.arrival_time);
        let mut coordinator = Self::new(config);
        coordinator.snapshot = Some(Arc::new(train));
        coordinator
    }

    pub fn train_id(&self) -> &str {
        &self.config.train_id
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Last accepted snapshot.
    pub fn snapshot(&self) -> Option<&Arc<Train>> {
        self.snapshot.as_ref()
    }

    /// Last known departure and arrival.
    pub fn schedule(&self) -> Option<(RailInstant, RailInstant)> {
        self.departure_time.zip(self.arrival_time)
    }

    /// Handle a timer tick at `now`.
    pub fn on_tick(&mut self, now: RailInstant) -> TickAction {
        if self.state == CoordinatorState::Fetching {
            debug!(train_id = %self.config.train_id, "fetch in flight, ignoring tick");
            return TickAction::Busy;
        }

        let poll = match self.schedule() {
            Some((departure, arrival)) => {
                let decision =
                    self.config
                        .polling
                        .decide(&now, &departure, &arrival, self.snapshot.is_some());
                debug!(train_id = %self.config.train_id, ?decision, %now, %departure, %arrival, "polling decision");
                decision.should_poll()
            }
            None => true,
        };

        if !poll {
            return TickAction::Publish(TrainUpdate::Unchanged(self.snapshot.clone()));
        }

        info!(train_id = %self.config.train_id, "refreshing train");
        self.state = CoordinatorState::Fetching;
        TickAction::Fetch {
            date: now.date_naive(),
        }
    }

    /// Fold the result of a fetch into the state and return the update to publish.
    pub fn on_fetch_complete(&mut self, result: Result<ParseOutcome, FetchFailure>) -> TrainUpdate {
        self.state = CoordinatorState::Idle;

        match result {
            Ok(ParseOutcome::Found(train)) => {
                info!(train_id = %train.train_id, name = %train.name, status = %train.status, delay = train.delay, "train updated");
                self.departure_time = Some(train.departure_time);
                self.arrival_time = Some(train.arrival_time);
                let train = Arc::new(train);
                self.snapshot = Some(Arc::clone(&train));
                TrainUpdate::Snapshot(train)
            }
            Ok(ParseOutcome::NotFound) => {
                info!(train_id = %self.config.train_id, "train not found for today");
                TrainUpdate::Unchanged(self.snapshot.clone())
            }
            Err(err) if err.is_retryable() => {
                warn!(train_id = %self.config.train_id, error = %err, "fetch failed, will retry");
                TrainUpdate::RetryableFailure(err.to_string())
            }
            Err(err) => {
                warn!(train_id = %self.config.train_id, error = %err, "unexpected payload");
                TrainUpdate::FatalFailure(err.to_string())
            }
        }
    }

    /// Drop an outstanding fetch without applying its result.
    fn abandon_fetch(&mut self) {
        if self.state == CoordinatorState::Fetching {
            debug!(train_id = %self.config.train_id, "abandoning in-flight fetch");
            self.state = CoordinatorState::Idle;
        }
    }

    /// Start the tick loop on the tokio runtime.
    ///
    /// The returned receiver is subscribed before the first tick, so it sees
    /// every update.
    pub fn spawn<F: TrainFetcher>(
        self,
        fetcher: Arc<F>,
    ) -> (CoordinatorHandle, broadcast::Receiver<TrainUpdate>) {
        let (updates, receiver) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(self.run(fetcher, updates.clone(), shutdown_rx));

        let handle = CoordinatorHandle {
            updates,
            shutdown: Some(shutdown_tx),
            task,
        };
        (handle, receiver)
    }

    async fn run<F: TrainFetcher>(
        mut self,
        fetcher: Arc<F>,
        updates: broadcast::Sender<TrainUpdate>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Self {
        let mut ticker = tokio::time::interval(self.config.tick_interval.max(MIN_TICK_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<Result<ParseOutcome, FetchFailure>>> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => match self.on_tick(domain::now()) {
                    TickAction::Busy => {}
                    TickAction::Publish(update) => publish(&updates, update),
                    TickAction::Fetch { date } => {
                        let fetcher = Arc::clone(&fetcher);
                        let train_id = self.config.train_id.clone();
                        let budget = self.config.fetch_budget;
                        in_flight = Some(tokio::spawn(async move {
                            fetch_train(fetcher.as_ref(), &train_id, date, budget).await
                        }));
                    }
                },
                joined = join_fetch(&mut in_flight) => {
                    in_flight = None;
                    let result = joined.unwrap_or_else(|err| Err(err.into()));
                    let update = self.on_fetch_complete(result);
                    publish(&updates, update);
                }
            }
        }

        if let Some(task) = in_flight {
            task.abort();
        }
        self.abandon_fetch();
        info!(train_id = %self.config.train_id, "coordinator stopped");
        self
    }
}

/// Wait for the in-flight fetch, or forever if there is none.
async fn join_fetch(
    task: &mut Option<JoinHandle<Result<ParseOutcome, FetchFailure>>>,
) -> Result<Result<ParseOutcome, FetchFailure>, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

fn publish(updates: &broadcast::Sender<TrainUpdate>, update: TrainUpdate) {
    if updates.send(update).is_err() {
        debug!("no subscribers for train update");
    }
}

/// Handle to a running coordinator.
///
/// Dropping the handle stops the loop as well.
pub struct CoordinatorHandle {
    updates: broadcast::Sender<TrainUpdate>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Coordinator>,
}

impl CoordinatorHandle {
    /// Subscribe to updates from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TrainUpdate> {
        self.updates.subscribe()
    }

    /// Stop the loop, abandon any in-flight fetch and return the final state.
    pub async fn shutdown(mut self) -> Option<Coordinator> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await.ok()
    }
}

/// Fetch and parse one train within `budget`.
pub async fn fetch_train<F: TrainFetcher>(
    fetcher: &F,
    train_id: &str,
    date: NaiveDate,
    budget: Duration,
) -> Result<ParseOutcome, FetchFailure> {
    let body = tokio::time::timeout(budget, fetcher.fetch(train_id, date))
        .await
        .map_err(|_| TrenordError::Timeout { budget })??;

    Ok(parse_train(train_id, &body)?)
}

/// Errors from looking up a train before tracking it.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// No journey for this id on the given day
    #[error("train not found")]
    TrainNotFound,

    #[error(transparent)]
    Fetch(#[from] FetchFailure),
}

/// Validate a train id with a single fetch.
///
/// Use [`TrackerConfig::from_train`] on the result for a warm start.
pub async fn lookup_train<F: TrainFetcher>(
    fetcher: &F,
    train_id: &str,
    date: NaiveDate,
) -> Result<Train, LookupError> {
    match fetch_train(fetcher, train_id, date, DEFAULT_FETCH_BUDGET).await? {
        ParseOutcome::Found(train) => Ok(train),
        ParseOutcome::NotFound => Err(LookupError::TrainNotFound),
    }
}
