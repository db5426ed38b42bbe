use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clients::ServiceError;
use crate::domain::catalog::CatalogHit;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Debounced, single-flight-per-burst catalog lookup for one picker.
///
/// Every keystroke takes a fresh ticket. The fetch only runs if the ticket
/// is still the newest after the debounce window, and its reply is dropped
/// if a newer ticket was taken while the request was in flight. Superseded
/// bursts resolve to `None`, never to merged results.
#[derive(Clone, Debug)]
pub struct DebouncedSearch {
    latest: Arc<AtomicU64>,
    debounce: Duration,
}

impl Default for DebouncedSearch {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl DebouncedSearch {
    pub fn new(debounce: Duration) -> Self {
        Self { latest: Arc::new(AtomicU64::new(0)), debounce }
    }

    pub async fn run<F, Fut>(&self, fetch: F) -> Result<Option<Vec<CatalogHit>>, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CatalogHit>, ServiceError>>,
    {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.debounce).await;
        if self.latest.load(Ordering::SeqCst) != ticket {
            return Ok(None);
        }

        let hits = fetch().await?;
        if self.latest.load(Ordering::SeqCst) != ticket {
            return Ok(None);
        }

        Ok(Some(hits))
    }
}
