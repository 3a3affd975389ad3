//! Test doubles for crates that depend on [`GenerationEngine`].
//!
//! Enabled with the `test-util` feature.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::{
    config::SamplingParams,
    engine::{AbortRegistry, GenerationEngine, GenerationOutput, OutputStream, StartGuard},
    error_handler::{AiLlmError, Result},
};

/// What a [`ScriptedEngine`] does when asked to generate.
#[derive(Debug, Clone)]
pub enum Script {
    /// Emit one snapshot per fragment; the last one is `finished`.
    Fragments(Vec<String>),
    /// Fail before producing any output.
    FailToStart(String),
    /// Emit these fragments, then an error item.
    FailMidway(Vec<String>, String),
    /// Never produce anything until aborted.
    Hang,
}

/// A call recorded by [`ScriptedEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub params: SamplingParams,
    pub request_id: String,
}

/// Deterministic in-process [`GenerationEngine`].
#[derive(Debug)]
pub struct ScriptedEngine {
    script: Script,
    start_delay: Duration,
    inflight: Arc<AbortRegistry>,
    calls: Mutex<Vec<RecordedCall>>,
    aborts: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            start_delay: Duration::ZERO,
            inflight: Arc::new(AbortRegistry::new()),
            calls: Mutex::new(Vec::new()),
            aborts: Mutex::new(Vec::new()),
        }
    }

    /// Engine that answers with `fragments`.
    pub fn replying(fragments: &[&str]) -> Self {
        Self::new(Script::Fragments(
            fragments.iter().map(|s| s.to_string()).collect(),
        ))
    }

    /// Waits this long inside `generate` before the output channel exists,
    /// like an upstream that is slow to send response headers.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Every `generate` call seen so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Every request id passed to `abort`.
    pub fn aborted(&self) -> Vec<String> {
        self.aborts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Generations still registered.
    pub fn in_flight(&self) -> usize {
        self.inflight.in_flight()
    }
}

impl GenerationEngine for ScriptedEngine {
    fn model_name(&self) -> &str {
        "scripted-model"
    }

    fn generate<'a>(
        &'a self,
        prompt: String,
        params: SamplingParams,
        request_id: &'a str,
    ) -> BoxFuture<'a, Result<OutputStream>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(RecordedCall {
                    prompt,
                    params,
                    request_id: request_id.to_string(),
                });

            let (fragments, failure) = match &self.script {
                Script::FailToStart(msg) => return Err(AiLlmError::Engine(msg.clone())),
                Script::Fragments(f) => (f.clone(), None),
                Script::FailMidway(f, msg) => (f.clone(), Some(msg.clone())),
                Script::Hang => (Vec::new(), None),
            };
            let hang = matches!(self.script, Script::Hang);

            let token = self.inflight.register(request_id)?;
            let started = StartGuard::new(self.inflight.clone(), request_id);
            if !self.start_delay.is_zero() {
                tokio::time::sleep(self.start_delay).await;
            }
            started.disarm();

            let registry = self.inflight.clone();
            let id = request_id.to_string();
            let (tx, rx) = mpsc::channel(4);

            tokio::spawn(async move {
                let run = async {
                    if hang {
                        std::future::pending::<()>().await;
                    }
                    let mut text = String::new();
                    let last = fragments.len().saturating_sub(1);
                    for (i, fragment) in fragments.iter().enumerate() {
                        text.push_str(fragment);
                        let out = GenerationOutput {
                            text: text.clone(),
                            finished: failure.is_none() && i == last,
                        };
                        if tx.send(Ok(out)).await.is_err() {
                            return;
                        }
                    }
                    if let Some(msg) = &failure {
                        let _ = tx.send(Err(AiLlmError::Engine(msg.clone()))).await;
                    } else if fragments.is_empty() {
                        let _ = tx
                            .send(Ok(GenerationOutput {
                                text: String::new(),
                                finished: true,
                            }))
                            .await;
                    }
                };
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tx.closed() => {}
                    _ = run => {}
                }
                registry.finish(&id);
            });

            Ok(rx)
        })
    }

    fn abort<'a>(&'a self, request_id: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.aborts
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(request_id.to_string());
            self.inflight.abort(request_id);
        })
    }
}
