//! # DNS Events
//!
//! Typed events produced by the interpreter, and the sink interface that
//! receives them. Each event owns its payload; once handed to the sink the
//! sink owns the record.
//!
//! Handler gating: before constructing a record, the interpreter asks the
//! sink whether a handler for the event kind is installed; work for events
//! nobody listens to is skipped entirely (the corresponding wire bytes are
//! still consumed so the cursor stays valid).

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::{MsgHeader, Section};

// ---------------------------------------------------------------------------
// Record payloads
// ---------------------------------------------------------------------------

/// The common prefix of every resource record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsAnswer {
    /// Section the record was parsed from.
    pub section: Section,
    /// Owner name, lowercased, no trailing dot.
    pub name: String,
    /// Type code.
    pub rr_type: u16,
    /// Class.
    pub rr_class: u16,
    /// Time to live.
    pub ttl: Duration,
}

/// A question entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Query name, lowercased, no trailing dot.
    pub qname: String,
    /// Query type.
    pub qtype: u16,
    /// Query class.
    pub qclass: u16,
}

/// SOA rdata with the four timers exposed as durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaRdata {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: Duration,
    pub retry: Duration,
    pub expire: Duration,
    pub minimum: Duration,
}

/// EDNS pseudo-record metadata recovered from the reinterpreted RR fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdnsMeta {
    pub section: Section,
    pub name: String,
    pub rr_type: u16,
    /// Sender's maximum UDP payload size, carried in the class field.
    pub payload_size: u16,
    /// `(extended rcode << 8) | header rcode`.
    pub extended_rcode: u16,
    pub version: u8,
    /// The EDNS Z field (low 16 bits of the reinterpreted TTL).
    pub z: u16,
    /// The raw TTL word, as a duration for uniformity with other records.
    pub ttl: Duration,
    /// Message origin: reply 0, query 1, unknown 2.
    pub origin: u8,
}

/// TSIG pseudo-record metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsigMeta {
    pub name: String,
    pub section: Section,
    /// Signing algorithm name.
    pub algorithm: String,
    /// Request MAC.
    pub mac: Vec<u8>,
    /// Signing time as epoch seconds with a fractional part.
    pub signed_time: f64,
    /// Permitted clock skew, in seconds.
    pub fudge: f64,
    pub orig_id: u16,
    pub rr_error: u16,
    /// Message origin: reply 0, query 1, unknown 2.
    pub origin: u8,
}

/// RRSIG rdata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrsigRdata {
    pub name: String,
    pub section: Section,
    pub type_covered: u16,
    pub algorithm: u8,
    pub labels: u8,
    pub orig_ttl: Duration,
    /// Signature expiration, epoch seconds.
    pub sig_expiration: u32,
    /// Signature inception, epoch seconds.
    pub sig_inception: u32,
    pub key_tag: u16,
    pub signer_name: String,
    pub signature: Vec<u8>,
    /// Message origin: reply 0, query 1, unknown 2.
    pub origin: u8,
}

/// DNSKEY rdata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnskeyRdata {
    pub name: String,
    pub section: Section,
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
    /// Message origin: reply 0, query 1, unknown 2.
    pub origin: u8,
}

/// NSEC3 rdata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nsec3Rdata {
    pub name: String,
    pub section: Section,
    pub flags: u8,
    pub hash_algo: u8,
    pub iterations: u16,
    pub salt_len: u8,
    pub salt: Vec<u8>,
    pub hash_len: u8,
    pub hash: Vec<u8>,
    pub bitmaps: Vec<Vec<u8>>,
    /// Message origin: reply 0, query 1, unknown 2.
    pub origin: u8,
}

/// DS rdata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsRdata {
    pub name: String,
    pub section: Section,
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
    /// Message origin: reply 0, query 1, unknown 2.
    pub origin: u8,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Event kinds, used for handler gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Message,
    MessageEnd,
    Request,
    Rejected,
    QueryReply,
    AReply,
    AaaaReply,
    A6Reply,
    NsReply,
    CnameReply,
    PtrReply,
    SoaReply,
    MxReply,
    TxtReply,
    SpfReply,
    CaaReply,
    SrvReply,
    EdnsAdditional,
    TsigAdditional,
    Rrsig,
    Dnskey,
    Nsec,
    Nsec3,
    Ds,
    UnknownReply,
    NonDnsRequest,
    UdpSessionDone,
    ConnectionTimeout,
}

/// A parsed DNS event.
///
/// Every message-level event carries the parsed header record; RR events
/// additionally carry the common answer prefix and their typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DnsEvent {
    /// A message was seen: origin (reply 0 / query 1 / unknown 2), header,
    /// and the original wire length.
    Message {
        origin: u8,
        header: MsgHeader,
        len: usize,
    },
    /// Parsing of a message finished (success or not).
    MessageEnd { header: MsgHeader },
    /// A question in a query.
    Request { header: MsgHeader, query: Question },
    /// A question echoed in a reply with no records at all.
    Rejected { header: MsgHeader, query: Question },
    /// A question echoed in a reply.
    QueryReply { header: MsgHeader, query: Question },
    AReply {
        header: MsgHeader,
        answer: DnsAnswer,
        addr: Ipv4Addr,
    },
    AaaaReply {
        header: MsgHeader,
        answer: DnsAnswer,
        addr: Ipv6Addr,
    },
    A6Reply {
        header: MsgHeader,
        answer: DnsAnswer,
        addr: Ipv6Addr,
    },
    NsReply {
        header: MsgHeader,
        answer: DnsAnswer,
        name: String,
    },
    CnameReply {
        header: MsgHeader,
        answer: DnsAnswer,
        name: String,
    },
    PtrReply {
        header: MsgHeader,
        answer: DnsAnswer,
        name: String,
    },
    SoaReply {
        header: MsgHeader,
        answer: DnsAnswer,
        soa: SoaRdata,
    },
    MxReply {
        header: MsgHeader,
        answer: DnsAnswer,
        exchange: String,
        preference: u16,
    },
    TxtReply {
        header: MsgHeader,
        answer: DnsAnswer,
        strings: Vec<Vec<u8>>,
    },
    SpfReply {
        header: MsgHeader,
        answer: DnsAnswer,
        strings: Vec<Vec<u8>>,
    },
    CaaReply {
        header: MsgHeader,
        answer: DnsAnswer,
        flags: u16,
        tag: String,
        value: Vec<u8>,
    },
    SrvReply {
        header: MsgHeader,
        answer: DnsAnswer,
        target: String,
        priority: u16,
        weight: u16,
        port: u16,
    },
    EdnsAdditional { header: MsgHeader, edns: EdnsMeta },
    TsigAdditional { header: MsgHeader, tsig: TsigMeta },
    Rrsig {
        header: MsgHeader,
        answer: DnsAnswer,
        rrsig: RrsigRdata,
    },
    Dnskey {
        header: MsgHeader,
        answer: DnsAnswer,
        dnskey: DnskeyRdata,
    },
    Nsec {
        header: MsgHeader,
        answer: DnsAnswer,
        next_name: String,
        bitmaps: Vec<Vec<u8>>,
    },
    Nsec3 {
        header: MsgHeader,
        answer: DnsAnswer,
        nsec3: Nsec3Rdata,
    },
    Ds {
        header: MsgHeader,
        answer: DnsAnswer,
        ds: DsRdata,
    },
    /// A record of a type the interpreter has no decoder for.
    UnknownReply { header: MsgHeader, answer: DnsAnswer },
    /// An originator-side UDP payload that failed to parse as DNS.
    NonDnsRequest { payload: Vec<u8> },
    /// A UDP session was finalized.
    UdpSessionDone,
    /// A UDP session idled past its timeout.
    ConnectionTimeout,
}

impl DnsEvent {
    /// The kind of this event, for gating and filtering.
    pub fn kind(&self) -> EventKind {
        match self {
            DnsEvent::Message { .. } => EventKind::Message,
            DnsEvent::MessageEnd { .. } => EventKind::MessageEnd,
            DnsEvent::Request { .. } => EventKind::Request,
            DnsEvent::Rejected { .. } => EventKind::Rejected,
            DnsEvent::QueryReply { .. } => EventKind::QueryReply,
            DnsEvent::AReply { .. } => EventKind::AReply,
            DnsEvent::AaaaReply { .. } => EventKind::AaaaReply,
            DnsEvent::A6Reply { .. } => EventKind::A6Reply,
            DnsEvent::NsReply { .. } => EventKind::NsReply,
            DnsEvent::CnameReply { .. } => EventKind::CnameReply,
            DnsEvent::PtrReply { .. } => EventKind::PtrReply,
            DnsEvent::SoaReply { .. } => EventKind::SoaReply,
            DnsEvent::MxReply { .. } => EventKind::MxReply,
            DnsEvent::TxtReply { .. } => EventKind::TxtReply,
            DnsEvent::SpfReply { .. } => EventKind::SpfReply,
            DnsEvent::CaaReply { .. } => EventKind::CaaReply,
            DnsEvent::SrvReply { .. } => EventKind::SrvReply,
            DnsEvent::EdnsAdditional { .. } => EventKind::EdnsAdditional,
            DnsEvent::TsigAdditional { .. } => EventKind::TsigAdditional,
            DnsEvent::Rrsig { .. } => EventKind::Rrsig,
            DnsEvent::Dnskey { .. } => EventKind::Dnskey,
            DnsEvent::Nsec { .. } => EventKind::Nsec,
            DnsEvent::Nsec3 { .. } => EventKind::Nsec3,
            DnsEvent::Ds { .. } => EventKind::Ds,
            DnsEvent::UnknownReply { .. } => EventKind::UnknownReply,
            DnsEvent::NonDnsRequest { .. } => EventKind::NonDnsRequest,
            DnsEvent::UdpSessionDone => EventKind::UdpSessionDone,
            DnsEvent::ConnectionTimeout => EventKind::ConnectionTimeout,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Receiver for interpreter events.
///
/// `has_handler` gates record construction; `emit` transfers ownership of
/// the event to the sink.
pub trait EventSink: Send + Sync {
    /// True if a handler for this event kind is installed.
    fn has_handler(&self, kind: EventKind) -> bool;

    /// Deliver an event. The sink owns it afterwards.
    fn emit(&self, event: DnsEvent);
}

/// An in-process sink that collects events behind a mutex.
///
/// With no explicit handler set, every event kind is enabled.
pub struct CollectingSink {
    enabled: Option<HashSet<EventKind>>,
    events: Mutex<Vec<DnsEvent>>,
}

impl CollectingSink {
    /// Sink with every handler enabled.
    pub fn new() -> Self {
        Self {
            enabled: None,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Sink with handlers for the given kinds only.
    pub fn with_handlers(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            enabled: Some(kinds.into_iter().collect()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the collected events.
    pub fn events(&self) -> Vec<DnsEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Drain the collected events.
    pub fn take(&self) -> Vec<DnsEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Events of one kind.
    pub fn of_kind(&self, kind: EventKind) -> Vec<DnsEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for CollectingSink {
    fn has_handler(&self, kind: EventKind) -> bool {
        self.enabled.as_ref().map_or(true, |set| set.contains(&kind))
    }

    fn emit(&self, event: DnsEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
