mod artifacts;
mod executor;
mod orchestrator;
mod retry;
mod stage;

pub use artifacts::ArtifactStore;
pub use orchestrator::{Collaborators, Orchestrator, RunOutcome, RunStatus};
pub use stage::{StageId, StageReport, StageStatus};
