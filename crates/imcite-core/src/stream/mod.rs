//! Consumer-facing event stream.
//!
//! Entity processors emit one [`GraphEvent`] per mutation, synchronously,
//! into an unbounded channel. A flusher task coalesces them into
//! [`StreamMessage::Delta`] batches on a fixed interval so heavy fan-out
//! phases cannot overwhelm the consumer; phase transitions, progress, fatal
//! errors, resets, and completion bypass batching. Folding the message
//! stream from a `Reset` reconstructs the full graph state.

mod events;
mod flush;
mod mirror;

pub use events::{AuthorMerge, EventSink, GraphEvent, StreamItem, StreamMessage, event_channel};
pub use flush::spawn_flusher;
pub use mirror::GraphMirror;
