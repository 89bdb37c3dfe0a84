//! Registry of named connections and their watcher tasks.
//!
//! Every registration owns one record `{handle, last state, cancel token,
//! task}` in a single concurrent map, and one watcher task that follows the
//! connection's transitions:
//!
//! ```text
//!  register(name) ──► entry(name) vacant? ──► record current state
//!                                                  │
//!                                                  ▼
//!                                         spawn watcher (tracked)
//!                                                  │
//!   ┌──────────────────────────────────────────────┘
//!   ▼
//! Lookup ──(record gone / cancelled)──► Terminated
//!   │
//!   ▼
//! Blocking: wait_for_state_change(last state, cancel)
//!   │
//!   ▼
//! re-read state, log if changed, store it ──► Lookup
//! ```
//!
//! `remove(name)` drops the record and fires its cancel token, so a blocked
//! watcher wakes right away and terminates on its next lookup.

mod connection_registry;
mod watcher;

pub use connection_registry::*;
