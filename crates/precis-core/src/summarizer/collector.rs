//! Streaming collector.
//!
//! Consumes a provider fragment stream, accumulates it into one string, and
//! reports progress through a throttled callback. On cancellation or a
//! mid-stream error the partial accumulation is flushed once before the
//! outcome propagates, so observers see whatever arrived.

use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{PrecisError, PrecisResult};
use crate::traits::ChatStream;

/// Minimum wall time between progress callbacks.
const PROGRESS_THROTTLE: Duration = Duration::from_millis(100);

/// Drain `stream` into one accumulated string.
///
/// Progress snapshots are delivered in non-decreasing accumulated-length
/// order, at most once per [`PROGRESS_THROTTLE`], with a final flush before
/// returning.
pub async fn collect_stream(
    mut stream: ChatStream,
    cancel: &CancellationToken,
    on_progress: Option<&(dyn Fn(&str) + Send + Sync)>,
) -> PrecisResult<String> {
    let mut accumulated = String::new();
    let mut last_push: Option<Instant> = None;

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                flush_partial(&accumulated, on_progress);
                return Err(PrecisError::Cancelled);
            }
            item = stream.next() => item,
        };

        match item {
            None => break,
            Some(Ok(fragment)) => {
                accumulated.push_str(&fragment);
                if let Some(cb) = on_progress {
                    let due = last_push
                        .map(|t| t.elapsed() >= PROGRESS_THROTTLE)
                        .unwrap_or(true);
                    if due {
                        last_push = Some(Instant::now());
                        cb(&accumulated);
                    }
                }
            }
            Some(Err(err)) => {
                // Flush what arrived; the partial text is useful for
                // diagnostics.
                flush_partial(&accumulated, on_progress);
                return Err(err);
            }
        }
    }

    if let Some(cb) = on_progress {
        cb(&accumulated);
    }
    Ok(accumulated)
}

fn flush_partial(accumulated: &str, on_progress: Option<&(dyn Fn(&str) + Send + Sync)>) {
    if !accumulated.is_empty() {
        if let Some(cb) = on_progress {
            cb(accumulated);
        }
    }
}
