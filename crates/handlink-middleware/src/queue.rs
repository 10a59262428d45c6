//! Ingest queue: the only hand-off point between the I/O context and the
//! simulation context.
//!
//! [`ingest_queue`] returns a producer/consumer pair over an unbounded Tokio
//! channel.  Neither half is `Clone`, so there is exactly one producer (the
//! link task) and one consumer (the simulation tick).  Each
//! [`TelemetryRecord`] is moved through the queue; nothing is shared.
//!
//! * [`IngestProducer::push`] never blocks and never waits for the consumer.
//! * [`IngestConsumer::drain`] takes exactly the records present when the
//!   drain starts, in arrival order, and returns without waiting.  Records
//!   pushed during a drain are left for the next tick.
//!
//! There is no capacity limit and no drop policy: if the glove outpaces the
//! tick rate the queue grows.

use handlink_types::{HandError, TelemetryRecord};
use tokio::sync::mpsc;

/// Create a connected producer/consumer pair.
pub fn ingest_queue() -> (IngestProducer, IngestConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IngestProducer { tx }, IngestConsumer { rx })
}

/// Sending half, owned by the I/O context.
#[derive(Debug)]
pub struct IngestProducer {
    tx: mpsc::UnboundedSender<TelemetryRecord>,
}

impl IngestProducer {
    /// Enqueue a record without blocking.
    ///
    /// # Errors
    ///
    /// [`HandError::Transport`] when the consumer has been dropped; the
    /// record is discarded.
    pub fn push(&self, record: TelemetryRecord) -> Result<(), HandError> {
        self.tx
            .send(record)
            .map_err(|_| HandError::Transport("ingest consumer dropped".to_string()))
    }

    /// `true` once the consumer is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the simulation context.
#[derive(Debug)]
pub struct IngestConsumer {
    rx: mpsc::UnboundedReceiver<TelemetryRecord>,
}

impl IngestConsumer {
    /// Number of records waiting right now.
    pub fn depth(&self) -> usize {
        self.rx.len()
    }

    /// Take every record present at the start of the call, oldest first.
    pub fn drain(&mut self) -> Vec<TelemetryRecord> {
        let mut records = Vec::with_capacity(self.depth());
        self.drain_with(|record| records.push(record));
        records
    }

    /// Like [`drain`][Self::drain] but hands each record to `apply` as it
    /// is dequeued.  Returns the number of records applied.
    pub fn drain_with<F>(&mut self, mut apply: F) -> usize
    where
        F: FnMut(TelemetryRecord),
    {
        let depth = self.rx.len();
        let mut applied = 0;
        while applied < depth {
            match self.rx.try_recv() {
                Ok(record) => {
                    apply(record);
                    applied += 1;
                }
                Err(_) => break,
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handlink_types::{Channel, ChannelLabel, Side};
    use std::thread;
    use std::time::Duration;

    fn record(value: f32) -> TelemetryRecord {
        TelemetryRecord {
            side: Side::Left,
            channel: ChannelLabel::Known(Channel::IndexFlex),
            raw_value: value,
        }
    }

    #[test]
    fn drain_returns_records_in_arrival_order() {
        let (producer, mut consumer) = ingest_queue();
        for i in 0..10 {
            producer.push(record(i as f32)).unwrap();
        }
        assert_eq!(consumer.depth(), 10);

        let values: Vec<f32> = consumer.drain().into_iter().map(|r| r.raw_value).collect();
        assert_eq!(values, (0..10).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(consumer.depth(), 0);
    }

    #[test]
    fn drain_on_empty_queue_returns_immediately() {
        let (_producer, mut consumer) = ingest_queue();
        assert!(consumer.drain().is_empty());
    }

    #[test]
    fn drain_is_bounded_by_depth_at_start() {
        let (producer, mut consumer) = ingest_queue();
        producer.push(record(1.0)).unwrap();
        producer.push(record(2.0)).unwrap();

        // Records pushed while draining wait for the next drain.
        let mut seen = Vec::new();
        let applied = consumer.drain_with(|r| {
            seen.push(r.raw_value);
            producer.push(record(r.raw_value + 100.0)).unwrap();
        });

        assert_eq!(applied, 2);
        assert_eq!(seen, vec![1.0, 2.0]);
        let next: Vec<f32> = consumer.drain().into_iter().map(|r| r.raw_value).collect();
        assert_eq!(next, vec![101.0, 102.0]);
    }

    #[test]
    fn order_survives_producer_thread_jitter() {
        let (producer, mut consumer) = ingest_queue();
        let handle = thread::spawn(move || {
            for i in 0..200u32 {
                producer.push(record(i as f32)).unwrap();
                if i % 7 == 0 {
                    thread::sleep(Duration::from_micros(u64::from(i % 3) * 50));
                }
            }
        });
        handle.join().unwrap();

        let values: Vec<f32> = consumer.drain().into_iter().map(|r| r.raw_value).collect();
        assert_eq!(values.len(), 200);
        assert!(values.windows(2).all(|w| w[0] < w[1]), "records reordered");
    }

    #[test]
    fn concurrent_drains_never_reorder() {
        let (producer, mut consumer) = ingest_queue();
        let handle = thread::spawn(move || {
            for i in 0..1_000u32 {
                producer.push(record(i as f32)).unwrap();
            }
        });

        let mut values = Vec::new();
        while values.len() < 1_000 {
            consumer.drain_with(|r| values.push(r.raw_value));
            thread::yield_now();
        }
        handle.join().unwrap();

        assert_eq!(values, (0..1_000).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn push_after_consumer_dropped_is_transport_error() {
        let (producer, consumer) = ingest_queue();
        drop(consumer);
        assert!(producer.is_closed());
        assert!(matches!(producer.push(record(0.0)), Err(HandError::Transport(_))));
    }
}
