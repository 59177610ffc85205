//! # DNS Session Adapter
//!
//! Wires the interpreter to the capture engine's delivery callbacks. UDP
//! datagrams carry exactly one message and parse directly; TCP keeps one
//! [`StreamReassembler`] per direction in front of the shared interpreter.
//!
//! The adapter also owns the session's idle-expiry decision for UDP flows
//! and the finalization events at teardown.

use std::sync::Arc;

use crate::events::{DnsEvent, EventKind, EventSink};
use crate::flow::FlowHandle;
use crate::interpreter::DnsInterpreter;
use crate::message::Origin;
use crate::tcp::StreamReassembler;
use crate::DnsConfig;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Transport the session rides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

/// Verdict of an idle-expiry check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpireAction {
    /// The session idled out; the engine should remove it.
    Remove,
    /// Still active; re-arm the timer for the given time.
    Reschedule(f64),
}

/// One DNS session: an interpreter plus, for TCP, two per-direction
/// reassemblers.
pub struct DnsSession {
    interp: DnsInterpreter,
    conn: Arc<dyn FlowHandle>,
    sink: Arc<dyn EventSink>,
    config: Arc<DnsConfig>,
    orig_stream: StreamReassembler,
    resp_stream: StreamReassembler,
    transport: Transport,
    did_session_done: bool,
}

impl DnsSession {
    /// Create a session over the given transport.
    pub fn new(
        conn: Arc<dyn FlowHandle>,
        sink: Arc<dyn EventSink>,
        config: Arc<DnsConfig>,
        transport: Transport,
    ) -> Self {
        Self {
            interp: DnsInterpreter::new(conn.clone(), sink.clone(), config.clone()),
            conn,
            sink,
            config,
            orig_stream: StreamReassembler::new(),
            resp_stream: StreamReassembler::new(),
            transport,
            did_session_done: false,
        }
    }

    /// The interpreter driving this session.
    pub fn interpreter(&mut self) -> &mut DnsInterpreter {
        &mut self.interp
    }

    /// Deliver one UDP datagram.
    ///
    /// An originator payload that fails to parse is surfaced as a
    /// `non_dns_request` event: plenty of non-DNS traffic runs on port 53.
    pub fn deliver_packet(&mut self, data: &[u8], is_orig: bool) {
        if is_orig {
            if !self.interp.parse_message(data, Origin::Query)
                && self.sink.has_handler(EventKind::NonDnsRequest)
            {
                self.sink.emit(DnsEvent::NonDnsRequest {
                    payload: data.to_vec(),
                });
            }
        } else {
            self.interp.parse_message(data, Origin::Reply);
        }
    }

    /// Deliver a chunk of TCP stream payload for one direction.
    pub fn deliver_stream(&mut self, data: &[u8], is_orig: bool) {
        let (stream, interp, origin) = if is_orig {
            (&mut self.orig_stream, &mut self.interp, Origin::Query)
        } else {
            (&mut self.resp_stream, &mut self.interp, Origin::Reply)
        };
        stream.deliver(data, |msg| {
            interp.parse_message(msg, origin);
        });
    }

    /// Flush one direction's partial frame at end-of-stream. The fragment
    /// parses with an unknown origin.
    pub fn flush_stream(&mut self, is_orig: bool) {
        let (stream, interp) = if is_orig {
            (&mut self.orig_stream, &mut self.interp)
        } else {
            (&mut self.resp_stream, &mut self.interp)
        };
        stream.flush(|msg| {
            interp.parse_message(msg, Origin::Unknown);
        });
    }

    /// The TCP connection closed; flush both directions.
    pub fn connection_closed(&mut self) {
        self.flush_stream(true);
        self.flush_stream(false);
        tracing::debug!("flushed DNS stream buffers at connection close");
    }

    /// Idle-expiry check for UDP sessions.
    ///
    /// The one-second slack keeps the common single-query/single-reply
    /// exchange from arming the timer twice.
    pub fn check_expire(&self, now: f64) -> ExpireAction {
        let timeout = self.config.session_timeout.as_secs_f64();
        if now - self.conn.last_time() >= timeout - 1.0 {
            if self.sink.has_handler(EventKind::ConnectionTimeout) {
                self.sink.emit(DnsEvent::ConnectionTimeout);
            }
            ExpireAction::Remove
        } else {
            ExpireAction::Reschedule(now + timeout)
        }
    }

    /// Finalize the session. UDP emits `udp_session_done` once; TCP flushes
    /// whatever the reassemblers still hold.
    pub fn done(&mut self) {
        match self.transport {
            Transport::Udp => {
                if !self.did_session_done {
                    self.did_session_done = true;
                    if self.sink.has_handler(EventKind::UdpSessionDone) {
                        self.sink.emit(DnsEvent::UdpSessionDone);
                    }
                }
            }
            Transport::Tcp => self.connection_closed(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
