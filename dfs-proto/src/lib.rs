//! Wire framing and shared domain types for the DFS name server, storage
//! servers and clients.
//!
//! The wire format is UTF-8 `KEY:VALUE` lines terminated by `END`, with
//! `LOCATE` as the sole unframed exception.

pub mod acl;
pub mod command;
pub mod frame;
pub mod meta;

use std::time::Duration;

/// Port the name server listens on for both clients and storage servers.
pub const NS_PORT: u16 = 8080;

/// A storage server with id `id` listens on `8081 + id`.
pub fn ss_port(id: u32) -> u16 {
    8081 + id as u16
}

/// Upper bound on concurrently registered storage servers.
pub const MAX_SS: u32 = 32;

/// Timeout for the SS liveness connect probe run during registration
/// sweeps.
pub const SS_PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// Per-SS read/send timeout applied while fanning a VIEW out.
pub const FAN_OUT_TIMEOUT: Duration = Duration::from_secs(1);

/// Inter-token pause a STREAM response observes between words.
pub const STREAM_TOKEN_PAUSE: Duration = Duration::from_millis(100);
