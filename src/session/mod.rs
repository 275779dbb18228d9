mod api;

pub use api::{HistoryApi, HttpApi, TokenProvider};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::{Date, OffsetDateTime, UtcOffset};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::food::dto::TargetsRequest;
use crate::history::{local_date, summarize_by_day, DaySummary, FoodRecord, MacroTargets, MacroValues};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error("unknown record {0}")]
    UnknownRecord(Uuid),
    #[error("an edit for record {0} is already in flight")]
    EditInFlight(Uuid),
    #[error("request timed out")]
    Timeout,
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

/// What a refresh call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fresh data applied.
    Applied,
    /// A newer fetch already landed; this result was thrown away.
    Discarded,
    /// No token available; nothing was fetched.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub fetch_timeout: Duration,
    pub edit_timeout: Duration,
    pub display_offset: UtcOffset,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            edit_timeout: Duration::from_secs(10),
            display_offset: UtcOffset::UTC,
        }
    }
}

#[derive(Default)]
struct SessionState {
    records: Vec<FoodRecord>,
    targets: MacroTargets,
    fetch_issued: u64,
    fetch_applied: u64,
    edits_in_flight: HashSet<Uuid>,
}

/// Screen state for the history view, held behind a mutex that is only
/// locked between await points. Every network round-trip runs with the
/// state unlocked, so interleaved operations observe each other's effects,
/// and reconciliation always patches the then-current state.
#[derive(Clone)]
pub struct HistorySession {
    state: Arc<Mutex<SessionState>>,
    api: Arc<dyn HistoryApi>,
    tokens: Arc<dyn TokenProvider>,
    config: SessionConfig,
}

impl HistorySession {
    pub fn new(
        api: Arc<dyn HistoryApi>,
        tokens: Arc<dyn TokenProvider>,
        config: SessionConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            api,
            tokens,
            config,
        }
    }

    /// Fetch the food history and apply it, unless a fetch issued later has
    /// already been applied, in which case this result is discarded. Signed
    /// out means nothing is fetched and nothing is an error.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SessionError> {
        let Some(token) = self.tokens.token().await else {
            debug!("no token; skipping history fetch");
            return Ok(RefreshOutcome::Skipped);
        };

        let issue = {
            let mut state = self.state.lock().await;
            state.fetch_issued += 1;
            state.fetch_issued
        };

        let history = match timeout(self.config.fetch_timeout, self.api.fetch_history(&token)).await
        {
            Err(_) => return Err(SessionError::Timeout),
            Ok(Err(e)) => return Err(SessionError::Api(e)),
            Ok(Ok(history)) => history,
        };

        let mut state = self.state.lock().await;
        if issue <= state.fetch_applied {
            debug!(issue, applied = state.fetch_applied, "stale history fetch discarded");
            return Ok(RefreshOutcome::Discarded);
        }
        state.fetch_applied = issue;
        state.targets = history.targets();
        state.records = history.into_records();
        Ok(RefreshOutcome::Applied)
    }

    /// Apply a macro correction: patch the record immediately, then persist.
    /// On failure or timeout only that record is reverted to its pre-edit
    /// values; anything else that changed in the meantime stays. One edit
    /// per record may be outstanding at a time.
    pub async fn edit_macros(&self, id: Uuid, values: MacroValues) -> Result<(), SessionError> {
        let Some(token) = self.tokens.token().await else {
            return Err(SessionError::NotAuthenticated);
        };

        let snapshot = {
            let mut state = self.state.lock().await;
            if state.edits_in_flight.contains(&id) {
                return Err(SessionError::EditInFlight(id));
            }
            let record = state
                .records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(SessionError::UnknownRecord(id))?;
            let snapshot = record.macros;
            record.macros = values;
            state.edits_in_flight.insert(id);
            snapshot
        };

        let result = match timeout(
            self.config.edit_timeout,
            self.api.update_macros(&token, id, values),
        )
        .await
        {
            Err(_) => Err(SessionError::Timeout),
            Ok(Err(e)) => Err(SessionError::Api(e)),
            Ok(Ok(())) => Ok(()),
        };

        let mut state = self.state.lock().await;
        state.edits_in_flight.remove(&id);
        if result.is_err() {
            if let Some(record) = state.records.iter_mut().find(|r| r.id == id) {
                record.macros = snapshot;
            }
            warn!(record_id = %id, "macro edit failed; reverted to pre-edit values");
        }
        result
    }

    /// Persist the four daily targets; local state picks them up once the
    /// backend confirms.
    pub async fn save_targets(&self, targets: TargetsRequest) -> Result<(), SessionError> {
        let Some(token) = self.tokens.token().await else {
            return Err(SessionError::NotAuthenticated);
        };

        match timeout(
            self.config.edit_timeout,
            self.api.update_targets(&token, &targets),
        )
        .await
        {
            Err(_) => Err(SessionError::Timeout),
            Ok(Err(e)) => Err(SessionError::Api(e)),
            Ok(Ok(())) => {
                let mut state = self.state.lock().await;
                state.targets = MacroTargets {
                    calories: Some(targets.calories),
                    protein: Some(targets.protein),
                    carbs: Some(targets.carbs),
                    fat: Some(targets.fat),
                };
                Ok(())
            }
        }
    }

    /// The day-bucketed view, recomputed from the current records on every
    /// call, with "today" taken from the wall clock.
    pub async fn summaries(&self) -> Vec<DaySummary> {
        let today = local_date(OffsetDateTime::now_utc(), self.config.display_offset);
        self.summaries_at(today).await
    }

    /// Same as [`summaries`](Self::summaries) with a pinned "today".
    pub async fn summaries_at(&self, today: Date) -> Vec<DaySummary> {
        let state = self.state.lock().await;
        summarize_by_day(
            &state.records,
            state.targets,
            today,
            self.config.display_offset,
        )
    }

    pub async fn targets(&self) -> MacroTargets {
        self.state.lock().await.targets
    }
}
