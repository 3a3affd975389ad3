//! Generation engine seam.
//!
//! A generation is started with a prompt, sampling parameters and a request id.
//! The engine answers with an [`OutputStream`]: a bounded channel of
//! [`GenerationOutput`] snapshots, each carrying the *whole* text produced so far.
//! Callers that need incremental fragments diff consecutive snapshots.
//!
//! Cancellation is a side channel: [`GenerationEngine::abort`] is keyed by the
//! request id and makes the engine drop the upstream request so the backend can
//! free its slot.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    config::SamplingParams,
    error_handler::{AiLlmError, Result},
};

/// One snapshot of a running generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    /// Full text generated so far.
    pub text: String,
    /// `true` on the last snapshot.
    pub finished: bool,
}

/// Receiving half of a running generation.
///
/// The channel closes after a `finished` snapshot, after an error item, or
/// when the generation is aborted.
pub type OutputStream = mpsc::Receiver<Result<GenerationOutput>>;

/// Text generation backend shared by all requests.
pub trait GenerationEngine: Send + Sync {
    /// Model identifier reported back to clients.
    fn model_name(&self) -> &str;

    /// Starts a generation and returns its output channel.
    ///
    /// Errors returned here happen before any output exists (transport,
    /// non-2xx status, duplicate request id).
    fn generate<'a>(
        &'a self,
        prompt: String,
        params: SamplingParams,
        request_id: &'a str,
    ) -> BoxFuture<'a, Result<OutputStream>>;

    /// Aborts the generation registered under `request_id`.
    ///
    /// Unknown or already finished ids are ignored.
    fn abort<'a>(&'a self, request_id: &'a str) -> BoxFuture<'a, ()>;
}

/// In-flight generations keyed by request id.
#[derive(Debug, Default)]
pub struct AbortRegistry {
    inflight: Mutex<HashMap<String, CancellationToken>>,
}

impl AbortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a new generation and returns the token its pump listens to.
    ///
    /// # Errors
    /// [`AiLlmError::DuplicateRequest`] if the id is already in flight.
    pub fn register(&self, request_id: &str) -> Result<CancellationToken> {
        let mut map = self.lock();
        if map.contains_key(request_id) {
            return Err(AiLlmError::DuplicateRequest(request_id.to_string()));
        }
        let token = CancellationToken::new();
        map.insert(request_id.to_string(), token.clone());
        Ok(token)
    }

    /// Cancels and forgets `request_id`. Returns whether it was in flight.
    pub fn abort(&self, request_id: &str) -> bool {
        match self.lock().remove(request_id) {
            Some(token) => {
                token.cancel();
                debug!(%request_id, "generation aborted");
                true
            }
            None => false,
        }
    }

    /// Forgets `request_id` after normal completion.
    pub fn finish(&self, request_id: &str) {
        self.lock().remove(request_id);
    }

    /// Number of generations currently registered.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }
}

/// Registration of a generation that has not reached its output pump yet.
///
/// Dropping it (start failed, or the start future itself was dropped) forgets
/// the request id. [`StartGuard::disarm`] hands ownership of the entry to
/// whoever finishes the generation.
#[derive(Debug)]
pub struct StartGuard {
    registry: Arc<AbortRegistry>,
    request_id: Option<String>,
}

impl StartGuard {
    pub fn new(registry: Arc<AbortRegistry>, request_id: &str) -> Self {
        Self {
            registry,
            request_id: Some(request_id.to_string()),
        }
    }

    pub fn disarm(mut self) {
        self.request_id = None;
    }
}

impl Drop for StartGuard {
    fn drop(&mut self) {
        if let Some(id) = self.request_id.take() {
            self.registry.finish(&id);
            debug!(request_id = %id, "generation start abandoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_are_rejected() {
        let reg = AbortRegistry::new();
        let _t = reg.register("req-1").expect("first registration");
        assert!(matches!(
            reg.register("req-1"),
            Err(AiLlmError::DuplicateRequest(id)) if id == "req-1"
        ));
    }

    #[test]
    fn abort_cancels_token_and_forgets_id() {
        let reg = AbortRegistry::new();
        let token = reg.register("req-2").expect("registration");
        assert_eq!(reg.in_flight(), 1);

        assert!(reg.abort("req-2"));
        assert!(token.is_cancelled());
        assert_eq!(reg.in_flight(), 0);
        assert!(!reg.abort("req-2"));
    }

    #[test]
    fn finish_does_not_cancel() {
        let reg = AbortRegistry::new();
        let token = reg.register("req-3").expect("registration");
        reg.finish("req-3");
        assert!(!token.is_cancelled());
        assert_eq!(reg.in_flight(), 0);
        assert!(reg.register("req-3").is_ok());
    }

    #[test]
    fn start_guard_forgets_id_unless_disarmed() {
        let reg = Arc::new(AbortRegistry::new());

        let _t = reg.register("req-4").expect("registration");
        drop(StartGuard::new(reg.clone(), "req-4"));
        assert_eq!(reg.in_flight(), 0);

        let _t = reg.register("req-5").expect("registration");
        StartGuard::new(reg.clone(), "req-5").disarm();
        assert_eq!(reg.in_flight(), 1);
    }
}
