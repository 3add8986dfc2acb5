//! Stream topology for completion events.

use stream_worker::StreamDef;

/// Course completion events, consumed by the recommendation workers.
pub struct CompletionStream;

impl StreamDef for CompletionStream {
    const STREAM_NAME: &'static str = "enrollments:completed";
    const CONSUMER_GROUP: &'static str = "recommendation_workers";
    const DLQ_STREAM: &'static str = "enrollments:completed:dlq";
}
