//! Sequential delivery of chunked text through any [`WebhookBackend`].

use crate::chunk::Chunks;
use crate::{Error, MessagePayload, Result, WebhookBackend};

/// What to do with the remaining chunks after one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Attempt every chunk regardless of earlier failures.
    #[default]
    Continue,
    /// Stop at the first failed chunk.
    Abort,
}

#[derive(Debug)]
pub struct ChunkOutcome {
    /// Zero-based position in the input.
    pub index: usize,
    pub chars: usize,
    pub result: Result<()>,
}

#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Number of chunks the input was split into.
    pub total: usize,
    /// One entry per attempted chunk, in send order.
    pub outcomes: Vec<ChunkOutcome>,
}

impl DeliveryReport {
    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.sent()
    }

    /// Chunks never attempted because delivery aborted.
    pub fn skipped(&self) -> usize {
        self.total - self.outcomes.len()
    }

    pub fn is_success(&self) -> bool {
        self.sent() == self.total
    }

    pub fn errors(&self) -> impl Iterator<Item = (usize, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.index, e)))
    }
}

/// Split `text` into chunks of at most `limit` characters and send each one, in order,
/// as a copy of `template` carrying the chunk as its content.
///
/// One call per chunk, no retries and no rollback: a chunk's outcome never affects
/// chunks already sent. Empty input sends nothing.
///
/// # Panics
///
/// Panics if `limit` is zero.
pub async fn deliver<B>(
    backend: &B,
    text: &str,
    template: &MessagePayload,
    limit: usize,
    policy: FailurePolicy,
) -> DeliveryReport
where
    B: WebhookBackend + ?Sized,
{
    let chunks: Vec<&str> = Chunks::new(text, limit).collect();
    let mut report = DeliveryReport {
        total: chunks.len(),
        outcomes: Vec::with_capacity(chunks.len()),
    };
    for (index, piece) in chunks.into_iter().enumerate() {
        let result = backend.send_message(&template.with_content(piece)).await;
        let stop = result.is_err() && policy == FailurePolicy::Abort;
        report.outcomes.push(ChunkOutcome {
            index,
            chars: piece.chars().count(),
            result,
        });
        if stop {
            break;
        }
    }
    report
}
