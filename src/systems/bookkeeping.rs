use anyhow::Result;
use tracing::warn;

use crate::engine::{System, SystemContext};
use crate::rng::SystemRng;
use crate::world::World;

/// Undrained events are capped so an embedder that never drains cannot
/// grow the queue without bound.
const EVENT_QUEUE_CAP: usize = 4_096;

/// End-of-tick hygiene: prune dissolved parties and bound the event
/// queue.
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.parties.retain(|_, party| !party.members.is_empty());

        let overflow = world.events.len().saturating_sub(EVENT_QUEUE_CAP);
        if overflow > 0 {
            warn!(dropped = overflow, "event queue overflowed; oldest events dropped");
            world.events.drain(..overflow);
        }
        Ok(())
    }
}
