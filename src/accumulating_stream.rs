//! Accumulates streamed fragments into a complete reply.
//!
//! A producer task drains the transport's [`FragmentStream`] into a bounded
//! channel; the consumer concatenates fragments in arrival order, reports the
//! running text after each one, and returns the finished reply.  Cancelling
//! the token stops the producer and closes the channel.

use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::observability::{STREAM_ABORTS, STREAM_DURATION, STREAM_ERRORS, STREAM_FRAGMENTS};
use crate::render::Renderer;
use crate::transport::FragmentStream;

/// Fragments buffered between producer and consumer.
const CHANNEL_CAPACITY: usize = 32;

/// How often a stalled stream checks the renderer for an interrupt.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Running concatenation of a reply's fragments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextAccumulator {
    text: String,
    fragments: usize,
}

impl TextAccumulator {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the text so far.
    pub fn push(&mut self, fragment: &str) -> &str {
        self.text.push_str(fragment);
        self.fragments += 1;
        &self.text
    }

    /// The text so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of fragments pushed.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Consume the accumulator, yielding the final text.
    pub fn finish(self) -> String {
        self.text
    }
}

/// Spawn the producer half: forward `stream` into a channel until it ends,
/// fails, the receiver is dropped, or `cancel` fires.
///
/// An error is forwarded as the last item.
pub fn spawn_producer(
    mut stream: FragmentStream,
    cancel: CancellationToken,
) -> mpsc::Receiver<Result<String>> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(async move {
        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                item = stream.next() => item,
            };
            match item {
                Some(Ok(fragment)) => {
                    if tx.send(Ok(fragment)).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
                None => break,
            }
        }
    });
    rx
}

/// Consume fragments from `rx`, reporting progress to `renderer`.
///
/// Returns the complete reply, or the first error.  An interrupt requested
/// through the renderer, or an external cancellation, cancels `cancel` and
/// fails with an abort error.  Partial text is never returned.
pub async fn consume_fragments(
    mut rx: mpsc::Receiver<Result<String>>,
    cancel: &CancellationToken,
    renderer: &mut dyn Renderer,
) -> Result<String> {
    let start = Instant::now();
    let mut accumulator = TextAccumulator::new();
    let mut ticker = tokio::time::interval(INTERRUPT_POLL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let outcome = loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Err(interrupted()),
            item = rx.recv() => item,
            _ = ticker.tick() => {
                if renderer.should_interrupt() {
                    break Err(interrupted());
                }
                continue;
            }
        };
        match item {
            Some(Ok(fragment)) => {
                if fragment.is_empty() {
                    continue;
                }
                STREAM_FRAGMENTS.click();
                let accumulated = accumulator.push(&fragment);
                renderer.print_text(&fragment, accumulated);
                if renderer.should_interrupt() {
                    break Err(interrupted());
                }
            }
            Some(Err(e)) => break Err(e),
            None => break Ok(()),
        }
    };
    STREAM_DURATION.add(start.elapsed().as_secs_f64());

    match outcome {
        Ok(()) => {
            let text = accumulator.finish();
            renderer.finish_response(&text);
            Ok(text)
        }
        Err(e) => {
            cancel.cancel();
            if e.is_abort() {
                STREAM_ABORTS.click();
                renderer.print_interrupted();
            } else {
                STREAM_ERRORS.click();
            }
            Err(e)
        }
    }
}

/// Drive `stream` to completion through a producer task and the consumer.
pub async fn accumulate(stream: FragmentStream, renderer: &mut dyn Renderer) -> Result<String> {
    let cancel = CancellationToken::new();
    let rx = spawn_producer(stream, cancel.clone());
    consume_fragments(rx, &cancel, renderer).await
}

fn interrupted() -> Error {
    Error::abort("interrupted by user")
}
