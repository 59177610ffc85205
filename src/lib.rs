//! # dnswatch-engine — Passive DNS Wire Interpreter
//!
//! The DNS core of a passive network-analysis engine. It ingests opaque
//! byte buffers lifted from observed UDP datagrams or TCP streams and emits
//! structured, per-message events describing headers, questions, and
//! resource records, including the DNSSEC families (RRSIG, DNSKEY, NSEC,
//! NSEC3, DS) and the EDNS, TSIG, CAA, SRV, and TXT/SPF extensions. It never
//! originates or answers DNS traffic.
//!
//! ## Architecture
//!
//! - **wire**: bounds-checked big-endian cursor primitives
//! - **name**: compression-aware name decoding with loop and bounds guards
//! - **message**: the 12-byte header and per-message context
//! - **interpreter** / **rdata**: section orchestration and the typed
//!   per-record parsers
//! - **tcp**: the 2-byte length-prefix stream reassembler
//! - **session**: UDP/TCP wiring, idle expiry, finalization
//! - **events** / **flow**: the sink and flow-handle surfaces toward the
//!   embedding engine
//!
//! ## Integration
//!
//! The surrounding engine owns flows, timers, and event dispatch. It hands
//! each session a [`FlowHandle`] (endpoint identity plus the weird/violation
//! reporting channels) and an [`EventSink`] (handler gating plus delivery),
//! then drives [`DnsSession`] from its packet and stream callbacks:
//!
//! ```
//! use std::sync::Arc;
//! use dnswatch_engine::{
//!     CollectingSink, DnsConfig, DnsSession, FlowState, Transport,
//! };
//!
//! let conn = Arc::new(FlowState::new(
//!     "10.0.0.1:54321".parse().unwrap(),
//!     "192.0.2.53:53".parse().unwrap(),
//! ));
//! let sink = Arc::new(CollectingSink::new());
//! let mut session = DnsSession::new(
//!     conn.clone(),
//!     sink.clone(),
//!     Arc::new(DnsConfig::default()),
//!     Transport::Udp,
//! );
//!
//! // A minimal query for example.com, as captured off the wire.
//! let query: &[u8] = &[
//!     0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm',
//!     0x00, 0x00, 0x01, 0x00, 0x01,
//! ];
//! session.deliver_packet(query, true);
//! assert_eq!(sink.events().len(), 3); // message, request, message end
//! ```
//!
//! Everything is synchronous: a parse call never blocks, suspends, or keeps
//! references to the caller's buffer after it returns.

pub mod events;
pub mod flow;
pub mod interpreter;
pub mod message;
pub mod name;
mod rdata;
pub mod session;
pub mod tcp;
pub mod types;
pub mod wire;

use std::net::IpAddr;
use std::time::Duration;

use dashmap::DashMap;

pub use events::{CollectingSink, DnsEvent, EventKind, EventSink};
pub use flow::{FlowHandle, FlowState};
pub use interpreter::DnsInterpreter;
pub use message::{MsgHeader, Origin, Section};
pub use session::{DnsSession, ExpireAction, Transport};
pub use tcp::StreamReassembler;
pub use wire::ParseError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine-wide DNS tunables, shared by every session behind an `Arc`.
///
/// The skip tables hold responder addresses whose authority or additional
/// sections are not worth parsing; they are concurrent maps so the embedding
/// engine can update them while sessions are live.
pub struct DnsConfig {
    /// Messages declaring more questions than this are rejected as
    /// non-DNS. Zero disables the gate.
    pub max_queries: u64,
    /// Skip the authority section of every message.
    pub skip_all_auth: bool,
    /// Skip the additional section of every message.
    pub skip_all_addl: bool,
    /// Responder addresses whose authority sections are skipped.
    pub skip_auth: DashMap<IpAddr, ()>,
    /// Responder addresses whose additional sections are skipped.
    pub skip_addl: DashMap<IpAddr, ()>,
    /// Idle timeout for UDP sessions.
    pub session_timeout: Duration,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            max_queries: 25,
            skip_all_auth: false,
            skip_all_addl: false,
            skip_auth: DashMap::new(),
            skip_addl: DashMap::new(),
            session_timeout: Duration::from_secs(10),
        }
    }
}
