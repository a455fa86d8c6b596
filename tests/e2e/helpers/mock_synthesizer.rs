use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tape_batch::infrastructure::repositories::{RemoteFailure, SynthesisRequest, Synthesizer};

/// Scripted synthesizer: returns the request text as audio bytes unless told
/// to fail, stall or hang
#[derive(Default)]
pub struct MockSynthesizer {
    state: Mutex<MockState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[derive(Default)]
struct MockState {
    calls: Vec<SynthesisRequest>,
    failures: HashMap<String, RemoteFailure>,
    rejected_credentials: HashSet<String>,
    latency: Duration,
    latencies: HashMap<String, Duration>,
    hang: bool,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_text(&self, text: &str, failure: RemoteFailure) {
        self.state.lock().failures.insert(text.to_string(), failure);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Answer every request signed with `credential` with a 401
    pub fn reject_credential(&self, credential: &str) {
        self.state
            .lock()
            .rejected_credentials
            .insert(credential.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    pub fn set_latency_for(&self, text: &str, latency: Duration) {
        self.state.lock().latencies.insert(text.to_string(), latency);
    }

    /// Calls made while hanging never complete
    pub fn set_hang(&self, hang: bool) {
        self.state.lock().hang = hang;
    }

    pub fn calls(&self) -> Vec<SynthesisRequest> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, RemoteFailure> {
        let (latency, hang) = {
            let mut state = self.state.lock();
            state.calls.push(request.clone());
            let latency = state
                .latencies
                .get(&request.text)
                .copied()
                .unwrap_or(state.latency);
            (latency, state.hang)
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if hang {
            std::future::pending::<()>().await;
        }

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.lock();
        if state.rejected_credentials.contains(&request.credential) {
            return Err(RemoteFailure::AuthOrRateLimit(
                "401 Unauthorized: invalid_api_key".to_string(),
            ));
        }
        if let Some(failure) = state.failures.get(&request.text) {
            return Err(failure.clone());
        }

        Ok(request.text.as_bytes().to_vec())
    }
}
