//! Background task that turns an upstream byte stream into [`GenerationOutput`]s.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    engine::{AbortRegistry, GenerationOutput, OutputStream},
    error_handler::Result,
    services::line_decoder::LineDecoder,
};

/// One decoded upstream event.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Delta {
    pub text: String,
    pub done: bool,
}

/// Provider-specific line decoder: `Ok(None)` for lines that carry nothing.
pub(crate) type DecodeLine = fn(&str) -> Result<Option<Delta>>;

/// Spawns the pump and returns the consumer side.
///
/// The pump stops on the first of: a `done` delta, an error, the end of the
/// upstream body, cancellation of `token`, or the consumer dropping the
/// receiver. Dropping the body closes the upstream connection.
pub(crate) fn spawn_pump<S, B>(
    body: S,
    decode: DecodeLine,
    token: CancellationToken,
    registry: Arc<AbortRegistry>,
    request_id: String,
    buffer: usize,
) -> OutputStream
where
    S: Stream<Item = std::result::Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(buffer.max(1));

    tokio::spawn(async move {
        let mut body = Box::pin(body);
        let mut lines = LineDecoder::new();
        let mut text = String::new();

        let finished = loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(%request_id, "pump cancelled; dropping upstream body");
                    break false;
                }
                _ = tx.closed() => {
                    debug!(%request_id, "consumer gone; dropping upstream body");
                    break false;
                }
                chunk = body.next() => chunk,
            };

            let decoded: Vec<String> = match chunk {
                Some(Ok(bytes)) => lines.push(bytes.as_ref()),
                Some(Err(err)) => {
                    warn!(%request_id, error = %err, "upstream stream failed");
                    let _ = tx.send(Err(err.into())).await;
                    break false;
                }
                None => {
                    let rest: Vec<String> = lines.finish().into_iter().collect();
                    match forward(&rest, decode, &mut text, &tx).await {
                        Step::Done => break true,
                        Step::Stop => break false,
                        Step::Continue => {
                            // Upstream closed without an explicit end marker.
                            let _ = tx
                                .send(Ok(GenerationOutput {
                                    text: text.clone(),
                                    finished: true,
                                }))
                                .await;
                            break true;
                        }
                    }
                }
            };

            match forward(&decoded, decode, &mut text, &tx).await {
                Step::Continue => {}
                Step::Done => break true,
                Step::Stop => break false,
            }
        };

        registry.finish(&request_id);
        debug!(%request_id, finished, chars = text.len(), "pump finished");
    });

    rx
}

enum Step {
    Continue,
    Done,
    Stop,
}

async fn forward(
    lines: &[String],
    decode: DecodeLine,
    text: &mut String,
    tx: &mpsc::Sender<Result<GenerationOutput>>,
) -> Step {
    for line in lines {
        match decode(line) {
            Ok(None) => {}
            Ok(Some(delta)) => {
                if delta.text.is_empty() && !delta.done {
                    continue;
                }
                text.push_str(&delta.text);
                let out = GenerationOutput {
                    text: text.clone(),
                    finished: delta.done,
                };
                if tx.send(Ok(out)).await.is_err() {
                    return Step::Stop;
                }
                if delta.done {
                    return Step::Done;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err)).await;
                return Step::Stop;
            }
        }
    }
    Step::Continue
}
