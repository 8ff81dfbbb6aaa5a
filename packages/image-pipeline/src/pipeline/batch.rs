//! Multi-URL extraction through the shared scheduler.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::dedupe::{dedupe_records, dedupe_urls};
use crate::scheduler::RequestScheduler;
use crate::traits::ImageExtractor;
use crate::types::{BatchStatus, BatchUrlState, ImageRecord};

/// Shared, observable per-URL progress of one batch.
///
/// Clones see the same states, so a caller can keep one handle and read
/// snapshots while `run_batch` drives the other.
#[derive(Debug, Clone, Default)]
pub struct BatchTracker {
    states: Arc<Mutex<Vec<BatchUrlState>>>,
}

impl BatchTracker {
    /// Every URL starts `pending`.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_states(urls.into_iter().map(BatchUrlState::pending).collect())
    }

    /// Start from prepared states; anything not `pending` is left alone.
    pub fn from_states(states: Vec<BatchUrlState>) -> Self {
        Self {
            states: Arc::new(Mutex::new(states)),
        }
    }

    pub fn snapshot(&self) -> Vec<BatchUrlState> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(&self, index: usize, apply: impl FnOnce(&mut BatchUrlState)) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.get_mut(index) {
            apply(state);
        }
    }
}

/// Final result of a batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Per-URL outcome, in input order
    pub urls: Vec<BatchUrlState>,
    /// Merged records tagged with their source page, deduplicated
    pub images: Vec<ImageRecord>,
    /// Duplicates dropped per URL and across URLs
    pub removed_count: usize,
}

impl BatchOutcome {
    pub fn completed_count(&self) -> usize {
        self.urls
            .iter()
            .filter(|s| s.status == BatchStatus::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.urls
            .iter()
            .filter(|s| s.status == BatchStatus::Failed)
            .count()
    }
}

/// Extract every pending URL in `tracker`, merging the results.
///
/// All URLs are submitted in input order up front; the scheduler bounds how
/// many run at once. A URL is marked `processing` when its operation is
/// dispatched and settles as `completed` or `failed` on its own, so one
/// failure never affects its siblings.
pub async fn run_batch(
    scheduler: &RequestScheduler,
    extractor: Arc<dyn ImageExtractor>,
    tracker: &BatchTracker,
    deep_scrape: bool,
) -> BatchOutcome {
    let pending: Vec<(usize, String)> = tracker
        .snapshot()
        .into_iter()
        .enumerate()
        .filter(|(_, state)| state.status == BatchStatus::Pending)
        .map(|(index, state)| (index, state.url))
        .collect();

    info!(
        urls = tracker.len(),
        pending = pending.len(),
        deep_scrape,
        "Starting batch extraction"
    );

    let submissions = pending.iter().map(|(index, url)| {
        let index = *index;
        let url = url.clone();
        let extractor = extractor.clone();
        let progress = tracker.clone();
        scheduler.submit(move || async move {
            progress.update(index, BatchUrlState::mark_processing);
            debug!(url = %url, "Batch URL dispatched");
            match extractor.extract(&url, deep_scrape).await {
                Ok(srcs) => {
                    let per_url = dedupe_urls(&srcs);
                    progress.update(index, |s| s.mark_completed(per_url.images.len()));
                    let tagged: Vec<ImageRecord> = per_url
                        .images
                        .into_iter()
                        .map(|image| image.with_source_url(url.as_str()))
                        .collect();
                    Some((tagged, per_url.removed_count))
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Batch URL failed");
                    progress.update(index, |s| s.mark_failed(e.to_string()));
                    None
                }
            }
        })
    });
    let results = join_all(submissions).await;

    // Merge in input order regardless of completion order
    let mut merged = Vec::new();
    let mut removed_count = 0;
    for ((index, url), result) in pending.into_iter().zip(results) {
        match result {
            Ok(Some((images, removed))) => {
                removed_count += removed;
                merged.extend(images);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %url, error = %e, "Batch URL abandoned");
                tracker.update(index, |s| s.mark_failed(e.to_string()));
            }
        }
    }

    let combined = dedupe_records(merged);
    removed_count += combined.removed_count;

    let outcome = BatchOutcome {
        urls: tracker.snapshot(),
        images: combined.images,
        removed_count,
    };
    info!(
        completed = outcome.completed_count(),
        failed = outcome.failed_count(),
        images = outcome.images.len(),
        removed_count,
        "Batch extraction finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ExtractError;
    use crate::testing::MockExtractor;

    #[tokio::test]
    async fn merges_tags_and_dedupes_across_urls() {
        let mock = MockExtractor::new()
            .with_images(
                "https://a.com",
                ["https://cdn.com/x.jpg", "https://cdn.com/x-300x200.jpg"],
            )
            .with_images(
                "https://b.com",
                ["https://cdn.com/X.JPG", "https://cdn.com/y.png"],
            );
        let scheduler = RequestScheduler::new(4);
        let tracker = BatchTracker::new(["https://a.com", "https://b.com"]);

        let outcome = run_batch(&scheduler, Arc::new(mock), &tracker, false).await;

        let srcs: Vec<_> = outcome.images.iter().map(|i| i.src.as_str()).collect();
        assert_eq!(srcs, vec!["https://cdn.com/x.jpg", "https://cdn.com/y.png"]);
        assert_eq!(outcome.images[0].source_url.as_deref(), Some("https://a.com"));
        assert_eq!(outcome.images[1].source_url.as_deref(), Some("https://b.com"));
        assert_eq!(outcome.images[1].id, 2);
        // One within a.com, one across URLs
        assert_eq!(outcome.removed_count, 2);
        assert_eq!(outcome.urls[0].image_count, 1);
        assert_eq!(outcome.urls[1].image_count, 2);
        assert_eq!(outcome.completed_count(), 2);
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let mock = MockExtractor::new()
            .with_images("https://ok.com", ["https://ok.com/a.jpg"])
            .with_failure("https://bad.com", ExtractError::Upstream { status: 502 });
        let scheduler = RequestScheduler::new(1);
        let tracker = BatchTracker::new(["https://bad.com", "https://ok.com"]);

        let outcome = run_batch(&scheduler, Arc::new(mock), &tracker, false).await;

        assert_eq!(outcome.urls[0].status, BatchStatus::Failed);
        assert_eq!(outcome.urls[0].error.as_deref(), Some("API error: 502"));
        assert_eq!(outcome.urls[1].status, BatchStatus::Completed);
        assert_eq!(outcome.images.len(), 1);
        assert_eq!(scheduler.status().active, 0);
    }

    #[tokio::test]
    async fn prepared_failures_are_not_extracted() {
        let mock = MockExtractor::new().with_images("https://ok.com", ["https://ok.com/a.jpg"]);
        let mut rejected = BatchUrlState::pending("http://localhost/");
        rejected.mark_failed("blocked host: localhost");
        let tracker =
            BatchTracker::from_states(vec![rejected, BatchUrlState::pending("https://ok.com")]);

        let outcome = run_batch(
            &RequestScheduler::new(2),
            Arc::new(mock.clone()),
            &tracker,
            true,
        )
        .await;

        assert_eq!(outcome.urls[0].status, BatchStatus::Failed);
        assert_eq!(outcome.completed_count(), 1);
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://ok.com");
        assert!(calls[0].deep_scrape);
    }

    #[tokio::test]
    async fn submits_in_input_order() {
        let mock = MockExtractor::new();
        let urls: Vec<String> = (0..5).map(|i| format!("https://site{i}.com")).collect();
        let tracker = BatchTracker::new(urls.clone());

        run_batch(
            &RequestScheduler::new(1),
            Arc::new(mock.clone()),
            &tracker,
            false,
        )
        .await;

        let called: Vec<String> = mock.calls().into_iter().map(|c| c.url).collect();
        assert_eq!(called, urls);
    }

    #[tokio::test]
    async fn fast_url_settles_before_slow_sibling() {
        let mock = MockExtractor::new()
            .with_images("https://fast.com", ["https://fast.com/a.jpg"])
            .with_images("https://slow.com", ["https://slow.com/b.jpg"])
            .with_delay_for("https://slow.com", Duration::from_millis(500));
        let scheduler = RequestScheduler::new(2);
        let tracker = BatchTracker::new(["https://fast.com", "https://slow.com"]);

        let observer = tracker.clone();
        let batch = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { run_batch(&scheduler, Arc::new(mock), &tracker, false).await }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        let mid = observer.snapshot();
        assert_eq!(mid[0].status, BatchStatus::Completed);
        assert_eq!(mid[0].image_count, 1);
        assert_eq!(mid[1].status, BatchStatus::Processing);

        let outcome = batch.await.unwrap();
        assert_eq!(outcome.completed_count(), 2);
        let sources: Vec<_> = outcome
            .images
            .iter()
            .map(|i| i.source_url.as_deref().unwrap())
            .collect();
        assert_eq!(sources, vec!["https://fast.com", "https://slow.com"]);
    }

    #[tokio::test]
    async fn empty_tracker() {
        let tracker = BatchTracker::new(Vec::<String>::new());
        assert!(tracker.is_empty());
        let outcome = run_batch(
            &RequestScheduler::default(),
            Arc::new(MockExtractor::new()),
            &tracker,
            false,
        )
        .await;
        assert!(outcome.urls.is_empty());
        assert!(outcome.images.is_empty());
        assert_eq!(outcome.removed_count, 0);
    }
}
