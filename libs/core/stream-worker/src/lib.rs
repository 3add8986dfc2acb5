//! Stream Worker Framework
//!
//! A generic Redis Streams worker framework for event-driven pipeline stages.
//!
//! ## Features
//!
//! - **Generic worker**: `StreamWorker<J, P>` processes any job type
//! - **Consumer groups**: Horizontal scaling across worker instances
//! - **Dead Letter Queue**: Poison messages moved to a DLQ after max retries
//! - **Error categorization**: Transient / permanent / rate-limited retry policies
//! - **Graceful shutdown**: Watch-channel driven stop
//!
//! ## Example
//!
//! ```ignore
//! use stream_worker::{StreamWorker, StreamJob, StreamProcessor, StreamDef, WorkerConfig};
//!
//! struct MyStream;
//! impl StreamDef for MyStream {
//!     const STREAM_NAME: &'static str = "my:events";
//!     const CONSUMER_GROUP: &'static str = "my_workers";
//!     const DLQ_STREAM: &'static str = "my:events:dlq";
//! }
//!
//! let config = WorkerConfig::from_stream_def::<MyStream>();
//! let worker = StreamWorker::new(redis, processor, config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod dlq;
mod error;
mod producer;
mod registry;
mod worker;

pub use config::WorkerConfig;
pub use consumer::{StreamConsumer, StreamMessage};
pub use dlq::{DlqEntry, DlqManager, DlqStats};
pub use error::{ErrorCategory, StreamError};
pub use producer::StreamProducer;
pub use registry::{StreamDef, StreamJob, StreamProcessor};
pub use worker::StreamWorker;
