//! Deterministic in-memory generation backend.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::generation::{
    domain::{GenerationRequest, ImageData},
    ports::{BackendError, BackendResult, ImageGenerationBackend},
};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// In-memory image backend.
///
/// Produces a PNG-signed payload derived from a digest of the request, so
/// identical requests yield identical bytes. Every request is recorded.
/// Failures and latency can be scripted, which makes the adapter suitable for
/// unit and integration tests and for local deterministic runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryImageBackend {
    state: Arc<Mutex<InMemoryBackendState>>,
    gauge: Arc<ConcurrencyGauge>,
}

#[derive(Debug, Default)]
struct InMemoryBackendState {
    requests: Vec<GenerationRequest>,
    pending_failures: usize,
    failure_reason: String,
    fail_always: Option<String>,
    malformed_output: bool,
    latency: Duration,
}

#[derive(Debug, Default)]
struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

struct GaugeGuard<'a>(&'a ConcurrencyGauge);

impl ConcurrencyGauge {
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryImageBackend {
    /// Creates a backend that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an artificial delay applied to every call.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Makes the next `count` calls fail with [`BackendError::Unavailable`].
    pub fn fail_next(&self, count: usize, reason: impl Into<String>) {
        let mut state = self.lock();
        state.pending_failures = count;
        state.failure_reason = reason.into();
    }

    /// Makes every call fail until [`Self::recover`] is called.
    pub fn fail_always(&self, reason: impl Into<String>) {
        self.lock().fail_always = Some(reason.into());
    }

    /// Makes calls succeed but return bytes without an image signature.
    pub fn return_malformed_output(&self, malformed: bool) {
        self.lock().malformed_output = malformed;
    }

    /// Clears all scripted failures.
    pub fn recover(&self) {
        let mut state = self.lock();
        state.pending_failures = 0;
        state.fail_always = None;
        state.malformed_output = false;
    }

    /// Returns every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of calls received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Returns the highest number of simultaneously running calls observed.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryBackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, request: &GenerationRequest) -> (Duration, Option<BackendError>, bool) {
        let mut state = self.lock();
        state.requests.push(request.clone());
        let failure = if let Some(reason) = state.fail_always.clone() {
            Some(BackendError::Unavailable(reason))
        } else if state.pending_failures > 0 {
            state.pending_failures -= 1;
            Some(BackendError::Unavailable(state.failure_reason.clone()))
        } else {
            None
        };
        (state.latency, failure, state.malformed_output)
    }
}

fn render_image(request: &GenerationRequest) -> ImageData {
    let mut hasher = Sha256::new();
    hasher.update(request.prompt().as_bytes());
    if let Some(reference) = request.master_reference() {
        hasher.update(reference.as_bytes());
    }
    if let Some(previous) = request.previous_page() {
        hasher.update(previous.as_bytes());
    }
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(&hasher.finalize());
    ImageData::new(bytes)
}

#[async_trait]
impl ImageGenerationBackend for InMemoryImageBackend {
    async fn generate_image(&self, request: &GenerationRequest) -> BackendResult<ImageData> {
        let _in_flight = self.gauge.enter();
        let (latency, failure, malformed) = self.record(request);
        debug!(
            prompt_len = request.prompt().len(),
            has_reference = request.master_reference().is_some(),
            has_previous_page = request.previous_page().is_some(),
            "in-memory backend received request"
        );

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = failure {
            return Err(error);
        }
        if malformed {
            return Ok(ImageData::new(b"not an image".to_vec()));
        }
        Ok(render_image(request))
    }
}
