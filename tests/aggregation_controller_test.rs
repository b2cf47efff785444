use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use course_catalog::core::aggregation::{AggregationController, Organizer, Phase};
use course_catalog::core::ratings::RatingSummary;
use course_catalog::domain::model::{
    Listing, RatingDistribution, RatingEntry, RatingSubmission, Report, ReportPayload, TargetRef,
};
use course_catalog::domain::ports::CatalogApi;
use course_catalog::utils::error::{CatalogError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

const ORGANIZER: &str = "6f1c2b8e-3d4a-4b5c-9e7f-0a1b2c3d4e5f";

/// Catalog API double. Fetches for a gated id wait until the test releases
/// that id, which lets a test decide the order in which cycles complete.
#[derive(Default)]
struct GatedApi {
    summaries: Mutex<HashMap<String, RatingDistribution>>,
    entries: Mutex<HashMap<String, Vec<RatingEntry>>>,
    gates: HashMap<String, Arc<Semaphore>>,
    unavailable: HashSet<String>,
    broken: HashSet<String>,
    crashing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl GatedApi {
    fn new() -> Self {
        Self::default()
    }

    fn with_summary(self, id: &str, counts: [u64; 5]) -> Self {
        self.summaries
            .lock()
            .unwrap()
            .insert(id.to_string(), RatingDistribution::from_counts(counts, None));
        self
    }

    fn with_entries(self, id: &str, entries: Vec<RatingEntry>) -> Self {
        self.entries.lock().unwrap().insert(id.to_string(), entries);
        self
    }

    fn gated(mut self, id: &str) -> Self {
        self.gates.insert(id.to_string(), Arc::new(Semaphore::new(0)));
        self
    }

    /// Fetches for `id` fail the way an unreachable service would.
    fn unavailable(mut self, id: &str) -> Self {
        self.unavailable.insert(id.to_string());
        self
    }

    /// Fetches for `id` fail with an error that is not the remote side's fault.
    fn broken(mut self, id: &str) -> Self {
        self.broken.insert(id.to_string());
        self
    }

    /// Fetches for `id` panic, as a bug in the collaborator would.
    fn crashing(mut self, id: &str) -> Self {
        self.crashing.insert(id.to_string());
        self
    }

    fn release(&self, id: &str) {
        self.gates[id].add_permits(1);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn pass(&self, call: &str, target: &TargetRef) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{} {}", call, target));

        if let Some(gate) = self.gates.get(target.id()) {
            let _permit = gate.acquire().await.unwrap();
        }

        if self.crashing.contains(target.id()) {
            panic!("rating store crashed while reading {}", target);
        }
        if self.unavailable.contains(target.id()) {
            return Err(CatalogError::HttpStatus {
                status: 503,
                url: format!("http://catalog.test/ratings/{}", target.id()),
            });
        }
        if self.broken.contains(target.id()) {
            return Err(CatalogError::ConfigError {
                message: "rating endpoint is not configured".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for GatedApi {
    async fn list_listings(&self, _query: Option<&str>) -> Result<Vec<Listing>> {
        Ok(Vec::new())
    }

    async fn get_rating_summary(&self, target: &TargetRef) -> Result<RatingDistribution> {
        self.pass("summary", target).await?;
        Ok(self
            .summaries
            .lock()
            .unwrap()
            .get(target.id())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_rating_entries(&self, target: &TargetRef) -> Result<Vec<RatingEntry>> {
        self.pass("entries", target).await?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(target.id())
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_rating(
        &self,
        target: &TargetRef,
        submission: &RatingSubmission,
    ) -> Result<RatingEntry> {
        self.calls.lock().unwrap().push(format!("submit {}", target));

        let entry = RatingEntry {
            id: format!("new-{}", target.id()),
            stars: submission.stars,
            feedback: submission.feedback.clone(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        };

        let mut summaries = self.summaries.lock().unwrap();
        let mut counts = summaries
            .get(target.id())
            .map(|d| d.counts())
            .unwrap_or_default();
        counts[usize::from(submission.stars) - 1] += 1;
        summaries.insert(
            target.id().to_string(),
            RatingDistribution::from_counts(counts, None),
        );

        self.entries
            .lock()
            .unwrap()
            .entry(target.id().to_string())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn create_report(&self, _payload: &ReportPayload) -> Result<Report> {
        unreachable!("reports are not part of aggregation")
    }
}

fn listing(id: &str, organizer_id: Option<&str>) -> Listing {
    let mut listing = Listing::new(id, format!("Course {}", id));
    listing.provider = Some(format!("Provider {}", id));
    listing.organizer_id = organizer_id.map(str::to_string);
    listing
}

fn entry(id: &str, stars: u8, day: u32) -> RatingEntry {
    RatingEntry {
        id: id.to_string(),
        stars,
        feedback: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, day, 8, 0, 0).unwrap(),
    }
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_listing_and_organizer_ratings_are_merged() {
    let api = GatedApi::new()
        .with_summary("a", [0, 0, 0, 1, 1])
        .with_entries("a", vec![entry("r1", 4, 2), entry("r2", 5, 9)])
        .with_summary(ORGANIZER, [1, 0, 0, 0, 2])
        .with_entries(ORGANIZER, vec![entry("o1", 5, 3)]);
    let controller = AggregationController::new(api);

    controller
        .select(Some(&listing("a", Some(ORGANIZER))))
        .await;
    let result = controller.snapshot();

    assert_eq!(result.phase, Phase::Ready);
    assert_eq!(result.error, None);
    assert_eq!(result.listing_id.as_deref(), Some("a"));
    assert_eq!(
        result.listing_summary,
        RatingSummary {
            rating_count: 2,
            avg: 4.5
        }
    );
    let ids: Vec<_> = result.listing_entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["r2", "r1"]);

    assert_eq!(
        result.organizer,
        Organizer::Ratable {
            user_id: ORGANIZER.to_string()
        }
    );
    assert_eq!(result.organizer_summary.rating_count, 3);
    assert!((result.organizer_summary.avg - 11.0 / 3.0).abs() < 1e-9);
    assert_eq!(result.organizer_entries.len(), 1);
}

#[tokio::test]
async fn test_non_uuid_organizer_skips_organizer_fetches() {
    let api = Arc::new(GatedApi::new().with_summary("a", [0, 0, 1, 0, 0]));
    let controller = AggregationController::new(Arc::clone(&api));

    controller
        .select(Some(&listing("a", Some("not-a-uuid"))))
        .await;
    let result = controller.snapshot();

    assert_eq!(result.phase, Phase::Ready);
    assert_eq!(
        result.organizer,
        Organizer::Unratable {
            display_name: Some("Provider a".to_string())
        }
    );
    assert_eq!(result.organizer_summary, RatingSummary::default());
    assert!(result.organizer_entries.is_empty());
    assert!(api.calls().iter().all(|call| !call.contains("user:")));
    assert_eq!(api.calls().len(), 2);
}

#[tokio::test]
async fn test_last_selection_wins_when_older_cycle_finishes_last() {
    let api = Arc::new(
        GatedApi::new()
            .with_summary("a", [5, 0, 0, 0, 0])
            .with_summary("b", [0, 0, 0, 0, 3])
            .gated("a")
            .gated("b"),
    );
    let controller = AggregationController::new(Arc::clone(&api));
    let (a, b) = (listing("a", None), listing("b", None));

    let select_a = controller.select(Some(&a));
    let select_b = controller.select(Some(&b));
    let releases = async {
        settle().await;
        api.release("b");
        settle().await;
        assert_eq!(controller.snapshot().listing_id.as_deref(), Some("b"));
        api.release("a");
    };
    tokio::join!(select_a, select_b, releases);

    let result = controller.snapshot();
    assert_eq!(result.listing_id.as_deref(), Some("b"));
    assert_eq!(result.listing_summary.rating_count, 3);
    assert!((result.listing_summary.avg - 5.0).abs() < f64::EPSILON);
    assert_eq!(result.phase, Phase::Ready);
}

#[tokio::test]
async fn test_last_selection_wins_when_older_cycle_finishes_first() {
    let api = Arc::new(
        GatedApi::new()
            .with_summary("a", [5, 0, 0, 0, 0])
            .with_summary("b", [0, 0, 0, 0, 3])
            .gated("a")
            .gated("b"),
    );
    let controller = AggregationController::new(Arc::clone(&api));
    let (a, b) = (listing("a", None), listing("b", None));

    let select_a = controller.select(Some(&a));
    let select_b = controller.select(Some(&b));
    let releases = async {
        settle().await;
        api.release("a");
        settle().await;
        // A has finished but was superseded, so nothing was written.
        let interim = controller.snapshot();
        assert_eq!(interim.listing_id, None);
        assert_eq!(interim.phase, Phase::Loading);
        api.release("b");
    };
    tokio::join!(select_a, select_b, releases);

    let result = controller.snapshot();
    assert_eq!(result.listing_id.as_deref(), Some("b"));
    assert_eq!(result.listing_summary.rating_count, 3);
}

#[tokio::test]
async fn test_selection_change_during_organizer_fetch_is_discarded() {
    let api = Arc::new(
        GatedApi::new()
            .with_summary("a", [0, 0, 0, 0, 1])
            .with_summary(ORGANIZER, [0, 0, 0, 0, 9])
            .with_summary("b", [0, 1, 0, 0, 0])
            .gated(ORGANIZER),
    );
    let controller = AggregationController::new(Arc::clone(&api));
    let (a, b) = (listing("a", Some(ORGANIZER)), listing("b", None));

    let select_a = controller.select(Some(&a));
    let later = async {
        settle().await;
        assert!(api.calls().iter().any(|c| c.starts_with("summary user:")));
        controller.select(Some(&b)).await;
        api.release(ORGANIZER);
    };
    tokio::join!(select_a, later);

    let result = controller.snapshot();
    assert_eq!(result.listing_id.as_deref(), Some("b"));
    assert_eq!(result.organizer_summary, RatingSummary::default());
    assert_eq!(result.listing_summary.rating_count, 1);
}

#[tokio::test]
async fn test_superseded_cycle_started_late_is_inert() {
    let api = Arc::new(
        GatedApi::new()
            .with_summary("a", [1, 0, 0, 0, 0])
            .with_summary("b", [0, 0, 0, 2, 0]),
    );
    let controller = AggregationController::new(Arc::clone(&api));
    let (a, b) = (listing("a", None), listing("b", None));

    let pending_a = controller.select(Some(&a));
    controller.select(Some(&b)).await;
    pending_a.await;

    let result = controller.snapshot();
    assert_eq!(result.listing_id.as_deref(), Some("b"));
    assert_eq!(result.listing_summary.rating_count, 2);
}

#[tokio::test]
async fn test_new_selection_while_loading_stays_loading() {
    let api = Arc::new(GatedApi::new().gated("a").gated("b"));
    let controller = AggregationController::new(Arc::clone(&api));
    let (a, b) = (listing("a", None), listing("b", None));

    let select_a = controller.select(Some(&a));
    assert_eq!(controller.phase(), Phase::Loading);
    let select_b = controller.select(Some(&b));
    assert_eq!(controller.phase(), Phase::Loading);
    assert_eq!(controller.current_sequence(), 2);

    api.release("a");
    api.release("b");
    tokio::join!(select_a, select_b);
    assert_eq!(controller.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_failed_listing_fetches_degrade() {
    let api = GatedApi::new().unavailable("a");
    let controller = AggregationController::new(api);

    controller.select(Some(&listing("a", None))).await;
    let result = controller.snapshot();

    assert_eq!(result.phase, Phase::Ready);
    assert_eq!(result.error, None);
    assert_eq!(result.listing_summary, RatingSummary::default());
    assert!(result.listing_entries.is_empty());
}

#[tokio::test]
async fn test_non_network_organizer_error_degrades_only_that_field() {
    let api = GatedApi::new()
        .with_summary("a", [0, 0, 0, 1, 1])
        .broken(ORGANIZER);
    let controller = AggregationController::new(api);

    controller
        .select(Some(&listing("a", Some(ORGANIZER))))
        .await;
    let result = controller.snapshot();

    assert_eq!(result.phase, Phase::Ready);
    assert_eq!(result.error, None);
    assert_eq!(result.listing_id.as_deref(), Some("a"));
    assert_eq!(result.listing_summary.rating_count, 2);
    assert_eq!(result.organizer_summary, RatingSummary::default());
    assert!(result.organizer_entries.is_empty());
}

#[tokio::test]
async fn test_panic_during_cycle_fails_it() {
    let api = GatedApi::new().crashing(ORGANIZER);
    let controller = AggregationController::new(api);

    controller
        .select(Some(&listing("a", Some(ORGANIZER))))
        .await;

    assert_eq!(controller.phase(), Phase::Failed);
    assert!(!controller.is_loading());
    let message = controller.error().unwrap();
    assert!(message.contains("rating store crashed"));
}

#[tokio::test]
async fn test_failed_cycle_drops_previous_listing_data() {
    let api = Arc::new(
        GatedApi::new()
            .with_summary("a", [0, 0, 0, 1, 1])
            .with_entries("a", vec![entry("r1", 4, 2)])
            .crashing("b"),
    );
    let controller = AggregationController::new(Arc::clone(&api));

    controller.select(Some(&listing("a", None))).await;
    assert_eq!(controller.snapshot().listing_summary.rating_count, 2);

    controller.select(Some(&listing("b", None))).await;
    let result = controller.snapshot();

    assert_eq!(result.phase, Phase::Failed);
    assert_eq!(result.listing_id.as_deref(), Some("b"));
    assert_eq!(controller.selected_listing_id().as_deref(), Some("b"));
    assert_eq!(result.listing_summary, RatingSummary::default());
    assert!(result.listing_entries.is_empty());
}

#[tokio::test]
async fn test_superseded_failure_is_not_surfaced() {
    let api = Arc::new(
        GatedApi::new()
            .with_summary("b", [0, 0, 0, 0, 1])
            .crashing("a")
            .gated("a"),
    );
    let controller = AggregationController::new(Arc::clone(&api));
    let (a, b) = (listing("a", None), listing("b", None));

    let select_a = controller.select(Some(&a));
    let later = async {
        controller.select(Some(&b)).await;
        api.release("a");
    };
    tokio::join!(select_a, later);

    assert_eq!(controller.phase(), Phase::Ready);
    assert_eq!(controller.error(), None);
    assert_eq!(controller.snapshot().listing_id.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_new_selection_clears_previous_error() {
    let api = Arc::new(GatedApi::new().crashing("a").gated("b"));
    let controller = AggregationController::new(Arc::clone(&api));

    controller.select(Some(&listing("a", None))).await;
    assert_eq!(controller.phase(), Phase::Failed);

    let select_b = controller.select(Some(&listing("b", None)));
    assert_eq!(controller.phase(), Phase::Loading);
    assert_eq!(controller.error(), None);

    api.release("b");
    select_b.await;
    assert_eq!(controller.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_clearing_selection_resets_view_without_fetching() {
    let api = Arc::new(GatedApi::new().with_summary("a", [0, 0, 0, 0, 1]));
    let controller = AggregationController::new(Arc::clone(&api));

    controller.select(Some(&listing("a", None))).await;
    let calls_before = api.calls().len();

    controller.select(None).await;
    let result = controller.snapshot();

    assert_eq!(result.phase, Phase::Idle);
    assert_eq!(result.listing_id, None);
    assert_eq!(result.listing_summary, RatingSummary::default());
    assert_eq!(api.calls().len(), calls_before);
}

#[tokio::test]
async fn test_refresh_reaggregates_current_selection() {
    let api = Arc::new(GatedApi::new().with_summary("a", [0, 0, 0, 0, 1]));
    let controller = AggregationController::new(Arc::clone(&api));

    controller.select(Some(&listing("a", None))).await;
    assert_eq!(controller.snapshot().listing_summary.rating_count, 1);

    api.summaries.lock().unwrap().insert(
        "a".to_string(),
        RatingDistribution::from_counts([0, 0, 0, 1, 1], None),
    );
    controller.refresh().await;

    assert_eq!(controller.snapshot().listing_summary.rating_count, 2);
    assert_eq!(controller.current_sequence(), 2);
}

#[tokio::test]
async fn test_refresh_recovers_from_dropped_selection() {
    let api = Arc::new(GatedApi::new().with_summary("a", [0, 0, 1, 0, 0]));
    let controller = AggregationController::new(Arc::clone(&api));

    drop(controller.select(Some(&listing("a", None))));
    assert_eq!(controller.phase(), Phase::Loading);
    assert!(api.calls().is_empty());

    controller.refresh().await;
    let result = controller.snapshot();
    assert_eq!(result.phase, Phase::Ready);
    assert_eq!(result.listing_summary.rating_count, 1);
}

#[tokio::test]
async fn test_refresh_without_selection_is_idle() {
    let api = Arc::new(GatedApi::new());
    let controller = AggregationController::new(Arc::clone(&api));

    controller.refresh().await;
    assert_eq!(controller.phase(), Phase::Idle);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_submit_rating_refreshes_view() {
    let api = Arc::new(GatedApi::new().with_summary("a", [0, 0, 0, 0, 1]));
    let controller = AggregationController::new(Arc::clone(&api));
    let a = listing("a", None);

    controller.select(Some(&a)).await;
    let submission = RatingSubmission::new(3, Some(" Mukava! ".to_string()), true);
    let stored = controller
        .submit_rating(&TargetRef::listing("a"), &submission)
        .await
        .unwrap();

    assert_eq!(stored.feedback.as_deref(), Some("Mukava!"));
    let result = controller.snapshot();
    assert_eq!(result.listing_summary.rating_count, 2);
    assert!((result.listing_summary.avg - 4.0).abs() < f64::EPSILON);
    assert_eq!(result.listing_entries[0].id, "new-a");
}

#[tokio::test]
async fn test_invalid_submission_is_rejected_before_sending() {
    let api = Arc::new(GatedApi::new());
    let controller = AggregationController::new(Arc::clone(&api));

    let err = controller
        .submit_rating(&TargetRef::listing("a"), &RatingSubmission::new(7, None, false))
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::ValidationError { .. }));
    assert!(api.calls().is_empty());
}
