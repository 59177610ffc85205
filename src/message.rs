//! # Message Header and Context
//!
//! The 12-byte fixed DNS header and the per-message context threaded through
//! section parsing.
//!
//! ## Wire Format Reference
//!
//! ```text
//!  0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                      ID                       |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    QDCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    ANCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    NSCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                    ARCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::DnsAnswer;
use crate::wire::{Cursor, ParseError, Result};

/// Length of the fixed DNS header.
pub const HEADER_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// The parsed fixed header. Doubles as the header record carried by every
/// emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgHeader {
    /// Transaction ID.
    pub id: u16,
    /// Operation code (4 bits).
    pub opcode: u8,
    /// Response code (4 bits).
    pub rcode: u8,
    /// Query/response bit.
    pub qr: bool,
    /// Authoritative answer.
    pub aa: bool,
    /// Truncated.
    pub tc: bool,
    /// Recursion desired.
    pub rd: bool,
    /// Recursion available.
    pub ra: bool,
    /// Reserved bits (3 bits).
    pub z: u8,
    /// Question count.
    pub qdcount: u16,
    /// Answer count.
    pub ancount: u16,
    /// Authority count.
    pub nscount: u16,
    /// Additional count.
    pub arcount: u16,
}

impl MsgHeader {
    /// Parse the 12-byte header at the cursor.
    pub fn parse(cur: &mut Cursor) -> Result<Self> {
        if cur.remaining() < HEADER_LEN {
            return Err(ParseError::TruncatedHeader);
        }

        let id = cur.read_u16()?;
        let flags = cur.read_u16()?;

        Ok(Self {
            id,
            qr: flags & 0x8000 != 0,
            opcode: ((flags & 0x7800) >> 11) as u8,
            aa: flags & 0x0400 != 0,
            tc: flags & 0x0200 != 0,
            rd: flags & 0x0100 != 0,
            ra: flags & 0x0080 != 0,
            z: ((flags & 0x0070) >> 4) as u8,
            rcode: (flags & 0x000f) as u8,
            qdcount: cur.read_u16()?,
            ancount: cur.read_u16()?,
            nscount: cur.read_u16()?,
            arcount: cur.read_u16()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Sections and message origin
// ---------------------------------------------------------------------------

/// The message section a record was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}

impl Section {
    /// Numeric form carried in answer records.
    pub fn as_count(&self) -> u8 {
        match self {
            Section::Question => 0,
            Section::Answer => 1,
            Section::Authority => 2,
            Section::Additional => 3,
        }
    }
}

/// Which side of the flow a message was delivered from, or `Unknown` for
/// partial bodies flushed at stream end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// The message is a reply (responder side).
    Reply,
    /// The message is a query (originator side).
    Query,
    /// Direction could not be established.
    Unknown,
}

impl Origin {
    /// Numeric form carried in event records: reply 0, query 1, unknown 2.
    pub fn as_count(&self) -> u8 {
        match self {
            Origin::Reply => 0,
            Origin::Query => 1,
            Origin::Unknown => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-message context
// ---------------------------------------------------------------------------

/// Context for one `parse_message` call. Carries the header, the section
/// being parsed, the most recent owner name with its type/class/ttl, and the
/// per-section skip decision. Destroyed when the call returns.
#[derive(Debug, Clone)]
pub struct MsgInfo {
    /// The parsed fixed header.
    pub header: MsgHeader,
    /// Direction the message was delivered from (after any role flip).
    pub origin: Origin,
    /// Section currently being parsed.
    pub section: Section,
    /// Owner name of the record currently being parsed.
    pub owner: String,
    /// Type code of the current record.
    pub rtype: u16,
    /// Class of the current record.
    pub rclass: u16,
    /// TTL of the current record.
    pub ttl: u32,
    /// Suppress event delivery for the current section.
    pub skip_event: bool,
}

impl MsgInfo {
    /// Fresh context for a message with the given header and origin.
    pub fn new(header: MsgHeader, origin: Origin) -> Self {
        Self {
            header,
            origin,
            section: Section::Question,
            owner: String::new(),
            rtype: 0,
            rclass: 0,
            ttl: 0,
            skip_event: false,
        }
    }

    /// Build the answer record for the current resource record.
    pub fn answer(&self) -> DnsAnswer {
        DnsAnswer {
            section: self.section,
            name: self.owner.clone(),
            rr_type: self.rtype,
            rr_class: self.rclass,
            ttl: Duration::from_secs(u64::from(self.ttl)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
