//! # DNS Interpreter
//!
//! Drives one message through header, question, answer, authority, and
//! additional sections, reporting every malformed construct as a weird and
//! delivering typed events to the sink. The typed per-record parsers live in
//! [`crate::rdata`].
//!
//! The interpreter is per-flow: the only state it keeps between messages is
//! whether the flow's first message has been seen, which drives the one-shot
//! role flip for captures that join a conversation mid-flight.

use std::sync::Arc;

use crate::events::{DnsEvent, EventKind, EventSink, Question};
use crate::flow::FlowHandle;
use crate::message::{MsgHeader, MsgInfo, Origin, Section, HEADER_LEN};
use crate::name::{decode_name, NameBuffer};
use crate::types::{rcode_name, NETBIOS_NS_PORT, RrType};
use crate::wire::{Cursor, ParseError, Result};
use crate::DnsConfig;

// ---------------------------------------------------------------------------
// DnsInterpreter
// ---------------------------------------------------------------------------

/// Per-flow DNS message interpreter.
pub struct DnsInterpreter {
    pub(crate) conn: Arc<dyn FlowHandle>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) config: Arc<DnsConfig>,
    first_message: bool,
}

impl DnsInterpreter {
    /// Create an interpreter bound to a flow, a sink, and the engine
    /// configuration.
    pub fn new(conn: Arc<dyn FlowHandle>, sink: Arc<dyn EventSink>, config: Arc<DnsConfig>) -> Self {
        Self {
            conn,
            sink,
            config,
            first_message: true,
        }
    }

    /// Parse one complete DNS message.
    ///
    /// Returns `true` on a clean parse. Non-fatal anomalies are reported as
    /// weirds and do not fail the message; a `false` return means the
    /// message was abandoned part-way through.
    pub fn parse_message(&mut self, data: &[u8], origin: Origin) -> bool {
        match self.parse_message_inner(data, origin) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, len = data.len(), "DNS message parse failed");
                false
            }
        }
    }

    fn parse_message_inner(&mut self, data: &[u8], origin: Origin) -> Result<()> {
        if data.len() < HEADER_LEN {
            self.conn.weird("DNS_truncated_len_lt_hdr_len");
            return Err(ParseError::TruncatedHeader);
        }

        let mut cur = Cursor::new(data);
        let header = MsgHeader::parse(&mut cur)?;
        let mut msg = MsgInfo::new(header, origin);

        // Captures that join a flow mid-flight deliver the first reply as if
        // it came from the originator. Trust the QR bit over the transport
        // orientation, once, and reorient the flow. Multicast responders are
        // left alone: the "responder" is a group address, not a peer.
        if self.first_message && header.qr && origin == Origin::Query {
            msg.origin = Origin::Reply;
            if !self.conn.responder_addr().is_multicast() {
                self.conn.flip_roles();
            }
        }
        self.first_message = false;

        tracing::trace!(
            id = header.id,
            rcode = rcode_name(header.rcode),
            qdcount = header.qdcount,
            "parsed DNS header"
        );

        if self.sink.has_handler(EventKind::Message) {
            self.sink.emit(DnsEvent::Message {
                origin: msg.origin.as_count(),
                header,
                len: data.len(),
            });
        }

        // A great deal of non-DNS traffic runs on port 53; an absurd
        // question count weeds most of it out.
        if self.config.max_queries > 0 && u64::from(header.qdcount) > self.config.max_queries {
            self.conn.protocol_violation("DNS_Conn_count_too_large");
            self.conn.weird("DNS_Conn_count_too_large");
            self.end_message(&msg);
            return Err(ParseError::ExcessiveQueries);
        }

        let result = self.parse_sections(&mut msg, &mut cur);
        self.end_message(&msg);
        result
    }

    fn parse_sections(&mut self, msg: &mut MsgInfo, cur: &mut Cursor) -> Result<()> {
        let MsgHeader {
            qdcount,
            ancount,
            nscount,
            arcount,
            ..
        } = msg.header;

        msg.section = Section::Question;
        for _ in 0..qdcount {
            self.parse_question(msg, cur)?;
        }

        self.parse_answers(msg, ancount, Section::Answer, cur)?;
        self.conn.protocol_confirmation();

        // With answers in hand the trailing sections are often noise; the
        // skip policy decides per flow whether to keep parsing them.
        let mut skip_auth = self.config.skip_all_auth;
        let mut skip_addl = self.config.skip_all_addl;
        if ancount > 0 {
            let server = self.conn.responder_addr();
            skip_auth = skip_auth || nscount == 0 || self.config.skip_auth.contains_key(&server);
            skip_addl = skip_addl || arcount == 0 || self.config.skip_addl.contains_key(&server);
        }

        if skip_auth && skip_addl {
            return Ok(());
        }

        msg.skip_event = skip_auth;
        self.parse_answers(msg, nscount, Section::Authority, cur)?;

        if skip_addl {
            return Ok(());
        }

        msg.skip_event = skip_addl;
        self.parse_answers(msg, arcount, Section::Additional, cur)?;

        Ok(())
    }

    fn end_message(&self, msg: &MsgInfo) {
        if self.sink.has_handler(EventKind::MessageEnd) {
            self.sink.emit(DnsEvent::MessageEnd { header: msg.header });
        }
    }

    // -----------------------------------------------------------------------
    // Questions
    // -----------------------------------------------------------------------

    fn parse_question(&self, msg: &MsgInfo, cur: &mut Cursor) -> Result<()> {
        let mut name = NameBuffer::new();
        decode_name(cur, &mut name, self.conn.as_ref())?;

        if cur.remaining() < 4 {
            self.conn.weird("DNS_truncated_quest_too_short");
            return Err(ParseError::TruncatedQuestion);
        }

        let kind = if !msg.header.qr {
            EventKind::Request
        } else if msg.header.ancount == 0 && msg.header.nscount == 0 && msg.header.arcount == 0 {
            // Service rejected in some fashion; there are no RRs to carry
            // the verdict.
            EventKind::Rejected
        } else {
            EventKind::QueryReply
        };

        let qtype = cur.read_u16()?;
        let qclass = cur.read_u16()?;

        if self.sink.has_handler(kind) && !msg.skip_event {
            let header = msg.header;
            let query = Question {
                qname: name.to_string_lossy(),
                qtype,
                qclass,
            };
            self.sink.emit(match kind {
                EventKind::Rejected => DnsEvent::Rejected { header, query },
                EventKind::QueryReply => DnsEvent::QueryReply { header, query },
                _ => DnsEvent::Request { header, query },
            });
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resource records
    // -----------------------------------------------------------------------

    fn parse_answers(
        &self,
        msg: &mut MsgInfo,
        count: u16,
        section: Section,
        cur: &mut Cursor,
    ) -> Result<()> {
        msg.section = section;
        for _ in 0..count {
            self.parse_answer(msg, cur)?;
        }
        Ok(())
    }

    /// Parse one resource record: owner name, fixed fields, then the typed
    /// rdata through a sub-cursor bounded to exactly rdlength bytes. The
    /// outer cursor always resynchronizes to the end of the rdata, so one
    /// malformed record cannot shift the framing of those that follow.
    fn parse_answer(&self, msg: &mut MsgInfo, cur: &mut Cursor) -> Result<()> {
        let mut name = NameBuffer::new();
        decode_name(cur, &mut name, self.conn.as_ref())?;

        if cur.remaining() < 10 {
            self.conn.weird("DNS_truncated_ans_too_short");
            return Err(ParseError::TruncatedAnswer);
        }

        // Some of the more adventurous RR types reinterpret these fields.
        msg.owner = name.to_string_lossy();
        msg.rtype = cur.read_u16()?;
        msg.rclass = cur.read_u16()?;
        msg.ttl = cur.read_u32()?;

        let rdlength = cur.read_u16()? as usize;
        if rdlength > cur.remaining() {
            self.conn.weird("DNS_truncated_RR_rdlength_lt_len");
            return Err(ParseError::RdataOverrun);
        }

        let mut rd = cur.sub_cursor(rdlength);
        self.parse_rdata(msg, &mut rd, rdlength)?;

        if rd.remaining() != 0 {
            self.conn.weird("DNS_RR_length_mismatch");
        }
        cur.skip(rdlength)?;

        Ok(())
    }

    fn parse_rdata(&self, msg: &MsgInfo, rd: &mut Cursor, rdlength: usize) -> Result<()> {
        match RrType::from_u16(msg.rtype) {
            RrType::A => self.parse_rr_a(msg, rd, rdlength),
            RrType::Aaaa | RrType::A6 => self.parse_rr_aaaa(msg, rd),
            RrType::Ns | RrType::Cname | RrType::Ptr => self.parse_rr_name(msg, rd),
            RrType::Soa => self.parse_rr_soa(msg, rd),
            RrType::Wks | RrType::Hinfo | RrType::Nbs => {
                rd.drain();
                Ok(())
            }
            RrType::Mx => self.parse_rr_mx(msg, rd),
            RrType::Txt => self.parse_rr_txt(msg, rd),
            RrType::Spf => self.parse_rr_spf(msg, rd),
            RrType::Caa => self.parse_rr_caa(msg, rd),
            RrType::Srv => {
                if self.conn.responder_port() == NETBIOS_NS_PORT {
                    // An NBSTAT (NetBIOS NODE STATUS) record; the SRV RFC
                    // reused its type code. Treated as opaque.
                    rd.drain();
                    Ok(())
                } else {
                    self.parse_rr_srv(msg, rd)
                }
            }
            RrType::Edns => self.parse_rr_edns(msg, rd),
            RrType::Tsig => self.parse_rr_tsig(msg, rd),
            RrType::Rrsig => self.parse_rr_rrsig(msg, rd),
            RrType::Dnskey => self.parse_rr_dnskey(msg, rd),
            RrType::Nsec => self.parse_rr_nsec(msg, rd),
            RrType::Nsec3 => self.parse_rr_nsec3(msg, rd),
            RrType::Ds => self.parse_rr_ds(msg, rd),
            RrType::Unknown(code) => {
                if self.sink.has_handler(EventKind::UnknownReply) && !msg.skip_event {
                    self.sink.emit(DnsEvent::UnknownReply {
                        header: msg.header,
                        answer: msg.answer(),
                    });
                }
                self.conn
                    .weird_detail("DNS_RR_unknown_type", Some(&code.to_string()));
                rd.drain();
                Ok(())
            }
        }
    }

    /// True when an event for `kind` should be constructed and delivered.
    pub(crate) fn wants(&self, msg: &MsgInfo, kind: EventKind) -> bool {
        self.sink.has_handler(kind) && !msg.skip_event
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
