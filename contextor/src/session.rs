//! Generation sessions: one engine call driven to an end state.
//!
//! A buffered session races the engine output against a cancellation token.
//! A streamed session forwards suffix fragments into a channel and treats a
//! dropped receiver as the client going away. Every exit other than normal
//! completion sends `abort(request_id)` to the engine.

use std::sync::Arc;

use ai_llm_service::{GenerationEngine, SamplingParams};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::error::ContextorError;

/// HTTP-style status logged when the client goes away.
pub const CLIENT_CLOSED_STATUS: u16 = 499;

/// One item of a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text produced since the previous fragment.
    Fragment(String),
    /// The engine failed after the stream started; no more events follow.
    Failed(String),
}

/// Receiving side of a streamed answer.
pub type FragmentStream = mpsc::Receiver<StreamEvent>;

/// Runs a generation until it finishes, fails, or `cancel` fires.
///
/// Returns the full generated text.
///
/// # Errors
/// - [`ContextorError::ClientClosed`] if `cancel` fired first
/// - [`ContextorError::Generation`] if the engine failed
#[instrument(skip_all, fields(%request_id))]
pub async fn run_to_completion(
    engine: &dyn GenerationEngine,
    prompt: String,
    params: SamplingParams,
    request_id: &str,
    cancel: &CancellationToken,
) -> Result<String, ContextorError> {
    debug!(stage = "generating", "starting buffered generation");

    let started = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        res = engine.generate(prompt, params, request_id) => Some(res),
    };
    let mut rx = match started {
        None => return Err(closed(engine, request_id).await),
        Some(Ok(rx)) => rx,
        Some(Err(err)) => {
            error!(stage = "failed", error = %err, "generation did not start");
            return Err(err.into());
        }
    };

    let mut text = String::new();
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(closed(engine, request_id).await),
            item = rx.recv() => item,
        };
        match item {
            Some(Ok(out)) => {
                text = out.text;
                if out.finished {
                    break;
                }
            }
            Some(Err(err)) => {
                error!(stage = "failed", error = %err, "generation failed");
                engine.abort(request_id).await;
                return Err(err.into());
            }
            None => break,
        }
    }

    info!(stage = "completed", chars = text.len(), "generation completed");
    Ok(text)
}

async fn closed(engine: &dyn GenerationEngine, request_id: &str) -> ContextorError {
    engine.abort(request_id).await;
    warn!(
        stage = "aborted-by-client",
        status = CLIENT_CLOSED_STATUS,
        "client closed request; generation aborted"
    );
    ContextorError::ClientClosed
}

/// Starts a generation and forwards it as suffix fragments.
///
/// Start-up failures are returned here, before any fragment exists, so the
/// caller can still answer with an error status. The start runs on its own
/// task; dropping this future while the engine is still starting aborts the
/// generation.
///
/// # Errors
/// - [`ContextorError::Generation`] if the engine refused to start
/// - [`ContextorError::Internal`] if the start task panicked
pub async fn stream_fragments(
    engine: Arc<dyn GenerationEngine>,
    prompt: String,
    params: SamplingParams,
    request_id: String,
    buffer: usize,
) -> Result<FragmentStream, ContextorError> {
    debug!(%request_id, stage = "generating", "starting streamed generation");

    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let start = tokio::spawn({
        let engine = engine.clone();
        let request_id = request_id.clone();
        async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    client_gone(engine.as_ref(), &request_id).await;
                    None
                }
                res = engine.generate(prompt, params, &request_id) => Some(res),
            }
        }
        .in_current_span()
    });
    let started = start
        .await
        .map_err(|e| ContextorError::Internal(format!("generation start task: {e}")));
    guard.disarm();

    let mut rx = match started? {
        Some(Ok(rx)) => rx,
        Some(Err(err)) => {
            error!(%request_id, stage = "failed", error = %err, "generation did not start");
            return Err(err.into());
        }
        None => return Err(ContextorError::ClientClosed),
    };
    let (tx, out) = mpsc::channel(buffer.max(1));

    tokio::spawn(
        async move {
            let mut prev = String::new();
            loop {
                let item = tokio::select! {
                    biased;
                    _ = tx.closed() => {
                        client_gone(engine.as_ref(), &request_id).await;
                        return;
                    }
                    item = rx.recv() => item,
                };
                match item {
                    Some(Ok(snapshot)) => {
                        let fragment = next_fragment(&prev, &snapshot.text).to_string();
                        prev = snapshot.text;
                        if !fragment.is_empty() && tx.send(StreamEvent::Fragment(fragment)).await.is_err() {
                            client_gone(engine.as_ref(), &request_id).await;
                            return;
                        }
                        if snapshot.finished {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        error!(%request_id, stage = "failed", error = %err, "stream failed");
                        engine.abort(&request_id).await;
                        let _ = tx.send(StreamEvent::Failed(err.to_string())).await;
                        return;
                    }
                    None => break,
                }
            }
            info!(%request_id, stage = "completed", chars = prev.len(), "stream completed");
        }
        .in_current_span(),
    );

    Ok(out)
}

async fn client_gone(engine: &dyn GenerationEngine, request_id: &str) {
    engine.abort(request_id).await;
    warn!(
        %request_id,
        stage = "aborted-by-client",
        status = CLIENT_CLOSED_STATUS,
        "stream receiver dropped; generation aborted"
    );
}

/// The part of `current` not yet sent, given the previously sent `prev`.
///
/// Snapshots normally extend each other; if the engine rewrote earlier text,
/// everything after the common prefix is sent again.
pub fn next_fragment<'a>(prev: &str, current: &'a str) -> &'a str {
    if let Some(rest) = current.strip_prefix(prev) {
        return rest;
    }
    let common = prev
        .char_indices()
        .zip(current.chars())
        .take_while(|((_, a), b)| a == b)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0);
    &current[common..]
}
