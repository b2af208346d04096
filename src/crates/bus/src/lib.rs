pub mod bus;
pub mod error;
pub mod inbox;
pub mod message;
pub mod orchestrator;

pub use bus::{inform, AgentHandle, Bus, DEFAULT_HISTORY_CAPACITY, DEFAULT_INBOX_CAPACITY};
pub use error::{BusError, Result};
pub use inbox::{new_inbox, Inbox};
pub use message::{Message, MessageKind, Payload, Priority};
pub use orchestrator::{
    ConsensusResult, DebateResult, DebateRound, Orchestrator, ParallelResult, RosterAgent,
    SequentialResult, VoteResult,
};
