//! Session lifecycle for tilewire.
//!
//! This crate decides what connection events and server messages mean
//! for the client's seat in a game:
//!
//! 1. **Joining**: which message opens a connection ([`JoinRequest`],
//!    [`SessionMachine::hello`])
//! 2. **Identity**: remembering the id the server assigns and resuming
//!    it after a dropped connection
//! 3. **Reconnection**: bounded retries with a doubling delay
//!    ([`SessionConfig`])
//! 4. **Termination**: the failures that end a session for good
//!    ([`SessionError`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client driver (above)  ← feeds events in, acts on Dispatch / Retry
//!     ↕
//! Session Layer (this crate)  ← identity, lifecycle, retry policy
//!     ↕
//! Protocol Layer (below)  ← provides PersonId, ServerMessage types
//! ```

mod error;
mod join;
mod machine;
mod session;

pub use error::SessionError;
pub use join::JoinRequest;
pub use machine::{Dispatch, Retry, SessionMachine};
pub use session::{ConnectionState, Session, SessionConfig, SessionState};
