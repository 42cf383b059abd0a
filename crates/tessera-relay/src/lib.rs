//! Tessera Relay - Session plumbing for threshold key ceremonies
//!
//! Parties never talk to each other directly. They meet on a relay server
//! under a shared session id and coordinate through a handful of plain
//! request/response calls:
//!
//! ```text
//! Initiator                      Relay                        Joiner
//! ─────────                      ─────                        ──────
//! create_session([me]) ───────►  sid: [me]
//!                                sid: [me, joiner] ◄─────── join_session(joiner)
//! list_members (poll 2s) ◄────►                   ◄───────► list_members (poll 2s)
//! start_session(members) ─────►
//!   ... ceremonies run through the engine ...
//! signal_complete(me) ────────►  complete: [me, joiner] ◄── signal_complete(joiner)
//! ```
//!
//! [`PeerBarrier`] and [`CompletionBarrier`] are the two polling loops on top
//! of [`SessionClient`]. Both are cancellable and absorb transient relay
//! faults until their deadline.

pub mod client;
pub mod completion;
pub mod error;
pub mod http;
pub mod memory;
pub mod peer_barrier;

pub use client::{PollSettings, SessionClient, DEFAULT_POLL_INTERVAL};
pub use completion::{CompletionBarrier, CompletionReport};
pub use error::{RelayError, Result};
pub use http::HttpSessionClient;
pub use memory::MemoryRelay;
pub use peer_barrier::{MemberOrdering, MemberTracker, PeerBarrier};
