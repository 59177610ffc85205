//! Shared fixtures: wire-message builders and session plumbing for the
//! integration suite. Messages are assembled byte-for-byte so each test
//! controls exactly what appears on the "wire".
#![allow(dead_code)]

use std::sync::Arc;

use dnswatch_engine::{
    CollectingSink, DnsConfig, DnsInterpreter, DnsSession, FlowState, Transport,
};

// ---------------------------------------------------------------------------
// Wire builders
// ---------------------------------------------------------------------------

/// The 12-byte header: id, flags, and the four section counts.
pub fn header(id: u16, flags: u16, counts: [u16; 4]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12);
    buf.extend_from_slice(&id.to_be_bytes());
    buf.extend_from_slice(&flags.to_be_bytes());
    for count in counts {
        buf.extend_from_slice(&count.to_be_bytes());
    }
    buf
}

/// Encode a dotted name as length-prefixed labels plus the terminator.
pub fn qname(name: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    if !name.is_empty() {
        for label in name.split('.') {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
    }
    buf.push(0);
    buf
}

/// A compression pointer to `offset`.
pub fn pointer(offset: u16) -> Vec<u8> {
    vec![0xc0 | (offset >> 8) as u8, (offset & 0xff) as u8]
}

/// One question entry.
pub fn question(name: &str, qtype: u16, qclass: u16) -> Vec<u8> {
    let mut buf = qname(name);
    buf.extend_from_slice(&qtype.to_be_bytes());
    buf.extend_from_slice(&qclass.to_be_bytes());
    buf
}

/// One resource record: pre-encoded owner, fixed fields, rdata.
pub fn rr(owner: &[u8], rtype: u16, rclass: u16, ttl: u32, rdata: &[u8]) -> Vec<u8> {
    let mut buf = owner.to_vec();
    buf.extend_from_slice(&rtype.to_be_bytes());
    buf.extend_from_slice(&rclass.to_be_bytes());
    buf.extend_from_slice(&ttl.to_be_bytes());
    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(rdata);
    buf
}

/// Like [`rr`] but with the rdlength overridden, for framing tests.
pub fn rr_with_rdlength(
    owner: &[u8],
    rtype: u16,
    rclass: u16,
    ttl: u32,
    rdlength: u16,
    rdata: &[u8],
) -> Vec<u8> {
    let mut buf = owner.to_vec();
    buf.extend_from_slice(&rtype.to_be_bytes());
    buf.extend_from_slice(&rclass.to_be_bytes());
    buf.extend_from_slice(&ttl.to_be_bytes());
    buf.extend_from_slice(&rdlength.to_be_bytes());
    buf.extend_from_slice(rdata);
    buf
}

// ---------------------------------------------------------------------------
// Session plumbing
// ---------------------------------------------------------------------------

/// An interpreter on a unicast port-53 flow with every handler enabled.
pub fn interp() -> (DnsInterpreter, Arc<FlowState>, Arc<CollectingSink>) {
    interp_with(DnsConfig::default(), 53)
}

/// An interpreter with explicit configuration and responder port.
pub fn interp_with(
    config: DnsConfig,
    resp_port: u16,
) -> (DnsInterpreter, Arc<FlowState>, Arc<CollectingSink>) {
    let conn = Arc::new(FlowState::new(
        "10.0.0.1:54321".parse().unwrap(),
        format!("192.0.2.53:{resp_port}").parse().unwrap(),
    ));
    let sink = Arc::new(CollectingSink::new());
    let interpreter = DnsInterpreter::new(conn.clone(), sink.clone(), Arc::new(config));
    (interpreter, conn, sink)
}

/// A session over the given transport with every handler enabled.
pub fn session(transport: Transport) -> (DnsSession, Arc<FlowState>, Arc<CollectingSink>) {
    let conn = Arc::new(FlowState::new(
        "10.0.0.1:54321".parse().unwrap(),
        "192.0.2.53:53".parse().unwrap(),
    ));
    let sink = Arc::new(CollectingSink::new());
    let sess = DnsSession::new(
        conn.clone(),
        sink.clone(),
        Arc::new(DnsConfig::default()),
        transport,
    );
    (sess, conn, sink)
}
