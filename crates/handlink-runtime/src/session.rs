//! [`HandSession`] – the simulation context.
//!
//! One session owns everything the tick touches: the ingest consumer, the
//! [`StateMapper`] (and with it the channel state and bindings), the
//! [`GestureEngine`] and the [`ObjectRegistry`].  Nothing here is shared with
//! the I/O context; the only input is the queue.
//!
//! Each [`HandSession::tick`]:
//!
//! 1. drains the records queued since the previous tick, in arrival order,
//!    through the mapper into the rig;
//! 2. evaluates the gesture rules once against the resulting state, unless
//!    gestures require a live link and the link is not connected.
//!
//! The host passed to `tick` is both the rig and the scene, so a single
//! [`SimScene`][handlink_hal::SimScene] (or an engine adapter implementing
//! both sink traits) drives the whole pipeline.

use handlink_hal::{ObjectRegistry, RigSink, SceneSink};
use handlink_middleware::IngestConsumer;
use handlink_types::LinkState;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::gesture::{GestureConfig, GestureEngine, GestureReport};
use crate::mapper::{Bindings, MapperConfig, StateMapper, TransformUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Skip gesture evaluation while the link is not connected.
    pub gestures_require_link: bool,
    pub mapper: MapperConfig,
    pub gestures: GestureConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gestures_require_link: true,
            mapper: MapperConfig::default(),
            gestures: GestureConfig::default(),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Sequence number of this tick, starting at 1.
    pub tick: u64,
    /// Records drained from the queue, including ignored ones.
    pub drained: usize,
    /// Updates computed for records with a recognised channel, in order.
    pub updates: Vec<TransformUpdate>,
    /// `None` when gesture evaluation was skipped.
    pub gestures: Option<GestureReport>,
}

pub struct HandSession {
    consumer: IngestConsumer,
    mapper: StateMapper,
    engine: GestureEngine,
    registry: ObjectRegistry,
    gestures_require_link: bool,
    ticks: u64,
}

impl HandSession {
    pub fn new(consumer: IngestConsumer, bindings: Bindings, config: SessionConfig) -> Self {
        Self {
            consumer,
            mapper: StateMapper::new(bindings, config.mapper),
            engine: GestureEngine::new(&config.gestures),
            registry: ObjectRegistry::new(),
            gestures_require_link: config.gestures_require_link,
            ticks: 0,
        }
    }

    /// Run one simulation step against `host`.
    pub fn tick<H>(&mut self, host: &mut H, link: LinkState) -> TickReport
    where
        H: RigSink + SceneSink,
    {
        self.ticks += 1;

        let mapper = &mut self.mapper;
        let mut updates = Vec::new();
        let drained = self.consumer.drain_with(|record| {
            if let Some(update) = mapper.apply(&record, host) {
                updates.push(update);
            }
        });

        let gestures = if self.gestures_require_link && link != LinkState::Connected {
            trace!(%link, "gestures skipped while link is down");
            None
        } else {
            Some(self.engine.evaluate(self.mapper.state(), &mut self.registry, host))
        };

        if drained > 0 {
            debug!(tick = self.ticks, drained, objects = self.registry.len(), "tick");
        }
        TickReport {
            tick: self.ticks,
            drained,
            updates,
            gestures,
        }
    }

    /// Destroy every tracked object, e.g. on shutdown.
    pub fn clear_objects(&mut self, scene: &mut dyn SceneSink) -> usize {
        self.registry.clear(scene)
    }

    pub fn mapper(&self) -> &StateMapper {
        &self.mapper
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Records waiting for the next tick.
    pub fn backlog(&self) -> usize {
        self.consumer.depth()
    }
}
