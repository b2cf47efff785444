//! Rating aggregation for the listing detail view.
//!
//! A selection starts a cycle that fetches the listing's ratings and, when the
//! organizer can be rated, the organizer's ratings. Each cycle carries the
//! sequence number it was started with. Only the cycle holding the current
//! number may write the result, so when selections overlap the last one
//! wins no matter which fetches finish first.
//!
//! Every fetch fails on its own: an error degrades that one field and the rest
//! of the cycle carries on. Only a panic while the cycle runs marks it Failed.

use crate::core::ratings::{compute_summary, most_recent_first, RatingSummary};
use crate::domain::model::{Listing, RatingEntry, RatingSubmission, TargetRef};
use crate::domain::ports::CatalogApi;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use futures::FutureExt;
use regex::Regex;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

static CANONICAL_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("uuid pattern is valid")
});

/// Only hyphenated 8-4-4-4-12 identifiers name a user that can be rated.
pub fn is_canonical_uuid(id: &str) -> bool {
    CANONICAL_UUID.is_match(id)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Organizer {
    #[default]
    Unknown,
    Ratable {
        user_id: String,
    },
    /// The organizer id is not a user id, so there is nothing to rate. Only a
    /// display name can be shown.
    Unratable {
        display_name: Option<String>,
    },
}

impl Organizer {
    fn of(listing: &Listing) -> Self {
        match listing.organizer_id.as_deref().map(str::trim) {
            Some(id) if is_canonical_uuid(id) => Organizer::Ratable {
                user_id: id.to_string(),
            },
            _ => Organizer::Unratable {
                display_name: listing.provider_display_name().map(str::to_string),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResult {
    pub listing_id: Option<String>,
    pub listing_summary: RatingSummary,
    pub listing_entries: Vec<RatingEntry>,
    pub organizer: Organizer,
    pub organizer_summary: RatingSummary,
    pub organizer_entries: Vec<RatingEntry>,
    pub phase: Phase,
    pub error: Option<String>,
}

impl AggregationResult {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    sequence: u64,
    selected: Option<Listing>,
    result: AggregationResult,
}

struct Cycle {
    token: u64,
    listing: Listing,
}

/// Degrades a failed per-field fetch to `None`.
fn tolerate<T>(outcome: Result<T>, what: &str, target: &TargetRef) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(err) if err.is_recoverable() => {
            tracing::warn!("Could not fetch {} for {}: {}", what, target, err);
            None
        }
        Err(err) => {
            tracing::error!(
                "Fetching {} for {} failed unexpectedly ({:?}): {}",
                what,
                target,
                err.category(),
                err
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "aggregation panicked".to_string())
}

pub struct AggregationController<A: CatalogApi> {
    api: A,
    state: Mutex<ControllerState>,
}

impl<A: CatalogApi> AggregationController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: Mutex::new(ControllerState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a cycle for `listing`.
    ///
    /// The cycle's sequence number is taken and the phase set to Loading when
    /// this is called, not when the returned future is first polled. `None` (or
    /// a listing without an id) clears the view without touching the network.
    ///
    /// Dropping the future unpolled leaves the phase at Loading until the next
    /// `select` or `refresh`.
    pub fn select(&self, listing: Option<&Listing>) -> impl Future<Output = ()> + '_ {
        let cycle = {
            let mut state = self.lock_state();
            Self::begin(&mut state, listing.cloned())
        };
        self.drive(cycle)
    }

    /// Runs the cycle again for whatever is currently selected.
    pub fn refresh(&self) -> impl Future<Output = ()> + '_ {
        let cycle = {
            let mut state = self.lock_state();
            let selected = state.selected.clone();
            Self::begin(&mut state, selected)
        };
        self.drive(cycle)
    }

    /// Sends a rating and re-aggregates the selected listing once it is stored.
    pub async fn submit_rating(
        &self,
        target: &TargetRef,
        submission: &RatingSubmission,
    ) -> Result<RatingEntry> {
        submission.validate()?;

        let entry = self.api.submit_rating(target, submission).await?;
        tracing::info!("Stored {}-star rating {} for {}", entry.stars, entry.id, target);

        self.refresh().await;
        Ok(entry)
    }

    pub fn snapshot(&self) -> AggregationResult {
        self.lock_state().result.clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock_state().result.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase() == Phase::Loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock_state().result.error.clone()
    }

    pub fn selected_listing_id(&self) -> Option<String> {
        self.lock_state().selected.as_ref().map(|l| l.id.clone())
    }

    pub fn current_sequence(&self) -> u64 {
        self.lock_state().sequence
    }

    fn begin(state: &mut ControllerState, listing: Option<Listing>) -> Option<Cycle> {
        state.sequence += 1;
        let token = state.sequence;

        match listing.filter(|l| !l.id.trim().is_empty()) {
            None => {
                tracing::debug!("Cycle {}: selection cleared", token);
                state.selected = None;
                state.result = AggregationResult::default();
                None
            }
            Some(listing) => {
                tracing::debug!("Cycle {}: aggregating listing {}", token, listing.id);
                state.selected = Some(listing.clone());
                state.result.phase = Phase::Loading;
                state.result.error = None;
                Some(Cycle { token, listing })
            }
        }
    }

    async fn drive(&self, cycle: Option<Cycle>) {
        let Some(cycle) = cycle else {
            return;
        };
        let token = cycle.token;
        let listing_id = cycle.listing.id.clone();

        let Err(payload) = AssertUnwindSafe(self.run(cycle)).catch_unwind().await else {
            return;
        };

        let message = panic_message(payload.as_ref());
        let mut state = self.lock_state();
        if state.sequence != token {
            return;
        }
        tracing::error!("Cycle {} failed: {}", token, message);
        // Nothing from the previous listing may stay next to the new selection.
        state.result = AggregationResult {
            listing_id: Some(listing_id),
            phase: Phase::Failed,
            error: Some(message),
            ..Default::default()
        };
    }

    fn is_current(&self, token: u64) -> bool {
        self.lock_state().sequence == token
    }

    async fn run(&self, cycle: Cycle) {
        let Cycle { token, listing } = cycle;

        let listing_target = TargetRef::listing(listing.id.as_str());
        let (summary, entries) = tokio::join!(
            self.api.get_rating_summary(&listing_target),
            self.api.get_rating_entries(&listing_target),
        );
        let listing_distribution = tolerate(summary, "rating summary", &listing_target);
        let listing_entries = tolerate(entries, "rating entries", &listing_target);

        if !self.is_current(token) {
            tracing::debug!("Cycle {} superseded after listing fetch", token);
            return;
        }

        let organizer = Organizer::of(&listing);
        let (organizer_distribution, organizer_entries) = match &organizer {
            Organizer::Ratable { user_id } => {
                let user_target = TargetRef::user(user_id.as_str());
                let (summary, entries) = tokio::join!(
                    self.api.get_rating_summary(&user_target),
                    self.api.get_rating_entries(&user_target),
                );
                (
                    tolerate(summary, "rating summary", &user_target),
                    tolerate(entries, "rating entries", &user_target),
                )
            }
            _ => {
                tracing::debug!(
                    "Listing {} has no ratable organizer, skipping organizer ratings",
                    listing.id
                );
                (None, None)
            }
        };

        let result = AggregationResult {
            listing_id: Some(listing.id.clone()),
            listing_summary: compute_summary(listing_distribution.as_ref()),
            listing_entries: most_recent_first(listing_entries.unwrap_or_default()),
            organizer,
            organizer_summary: compute_summary(organizer_distribution.as_ref()),
            organizer_entries: most_recent_first(organizer_entries.unwrap_or_default()),
            phase: Phase::Ready,
            error: None,
        };

        let mut state = self.lock_state();
        if state.sequence != token {
            tracing::debug!("Cycle {} superseded before commit", token);
            return;
        }
        tracing::info!(
            "Listing {}: {} ratings (avg {:.2}), organizer {} ratings",
            listing.id,
            result.listing_summary.rating_count,
            result.listing_summary.avg,
            result.organizer_summary.rating_count
        );
        state.result = result;
    }
}
