mod agents;
mod bookkeeping;
pub mod delivery;
mod jobs;
mod parties;

pub use agents::AgentSystem;
pub use bookkeeping::BookkeepingSystem;
pub use jobs::{assign_villager_jobs, JobSystem};
pub use parties::PartySystem;
