//! Timed coalescing of entity deltas

use super::events::{GraphEvent, StreamItem, StreamMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Drain the engine-side channel into consumer messages.
///
/// Entity events accumulate and leave as one `Delta` per interval tick;
/// control messages flush the buffer and pass through at once, keeping the
/// consumer's view ordered. Intervals with nothing buffered send nothing;
/// consumers must tolerate silent stretches during slow network phases.
/// Runs until the channel closes, then flushes whatever remains.
pub fn spawn_flusher(
    mut items: mpsc::UnboundedReceiver<StreamItem>,
    out: mpsc::UnboundedSender<StreamMessage>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut buffer: Vec<GraphEvent> = Vec::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !flush(&mut buffer, &out) {
                        return;
                    }
                }
                received = items.recv() => {
                    match received {
                        Some(StreamItem::Event(event)) => buffer.push(event),
                        Some(StreamItem::Control(message)) => {
                            if !flush(&mut buffer, &out) || out.send(message).is_err() {
                                return;
                            }
                        }
                        None => {
                            flush(&mut buffer, &out);
                            return;
                        }
                    }
                }
            }
        }
    })
}

/// Send the buffered events as one delta; false when the consumer is gone
fn flush(buffer: &mut Vec<GraphEvent>, out: &mpsc::UnboundedSender<StreamMessage>) -> bool {
    if buffer.is_empty() {
        return true;
    }
    let events = std::mem::take(buffer);
    out.send(StreamMessage::Delta { events }).is_ok()
}
