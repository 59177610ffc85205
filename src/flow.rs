//! # Flow Interface
//!
//! The interpreter never talks to the network; it talks to a flow handle
//! provided by the surrounding capture engine. The handle exposes the
//! responder endpoint, the role-flip operation for mid-flow captures, and
//! the reporting channels: weirds for protocol anomalies, violations and
//! confirmations for the engine's protocol-detection state, and an internal
//! channel for dispatch defects.
//!
//! [`FlowState`] is the in-process implementation used by embedders that
//! track flows themselves and by the test suite.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// FlowHandle
// ---------------------------------------------------------------------------

/// Per-flow surface the interpreter reports through.
///
/// All methods take `&self`; implementations use interior mutability. The
/// interpreter invokes them synchronously from within a parse call.
pub trait FlowHandle: Send + Sync {
    /// Address of the responder endpoint.
    fn responder_addr(&self) -> IpAddr;

    /// Port of the responder endpoint.
    fn responder_port(&self) -> u16;

    /// Timestamp of the flow's last activity (Unix epoch seconds).
    fn last_time(&self) -> f64;

    /// Swap the engine's notion of originator and responder. Invoked at most
    /// once per flow, when the first observed message turns out to be a
    /// response.
    fn flip_roles(&self);

    /// Report a protocol anomaly by its stable name.
    fn weird(&self, name: &str) {
        self.weird_detail(name, None);
    }

    /// Report a protocol anomaly with an additional detail string.
    fn weird_detail(&self, name: &str, detail: Option<&str>);

    /// Report an internal dispatch defect.
    fn internal_error(&self, reason: &str);

    /// Tell the engine the payload looks like it is not this protocol.
    fn protocol_violation(&self, tag: &str);

    /// Tell the engine a clean parse confirmed the protocol.
    fn protocol_confirmation(&self);
}

// ---------------------------------------------------------------------------
// FlowState
// ---------------------------------------------------------------------------

/// A recorded anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weird {
    /// Stable anomaly name.
    pub name: String,
    /// Optional detail (usually the offending field value).
    pub detail: Option<String>,
}

/// In-process flow bookkeeping.
///
/// Tracks the endpoint pair, supports role flipping, and records every
/// report made through the [`FlowHandle`] channels. Weirds are also logged
/// at `warn` level so embedders get operator-visible anomaly output without
/// draining the records.
pub struct FlowState {
    /// (originator, responder) endpoints; swapped by `flip_roles`.
    endpoints: Mutex<(SocketAddr, SocketAddr)>,
    last_time: Mutex<f64>,
    flips: AtomicU32,
    confirmations: AtomicU32,
    weirds: Mutex<Vec<Weird>>,
    violations: Mutex<Vec<String>>,
    internal: Mutex<Vec<String>>,
}

impl FlowState {
    /// Create flow state for an originator/responder endpoint pair.
    pub fn new(orig: SocketAddr, resp: SocketAddr) -> Self {
        Self {
            endpoints: Mutex::new((orig, resp)),
            last_time: Mutex::new(0.0),
            flips: AtomicU32::new(0),
            confirmations: AtomicU32::new(0),
            weirds: Mutex::new(Vec::new()),
            violations: Mutex::new(Vec::new()),
            internal: Mutex::new(Vec::new()),
        }
    }

    /// Record packet activity at `ts` (Unix epoch seconds).
    pub fn touch(&self, ts: f64) {
        let mut last = self.last_time.lock().unwrap();
        if ts > *last {
            *last = ts;
        }
    }

    /// The originator endpoint as currently oriented.
    pub fn originator(&self) -> SocketAddr {
        self.endpoints.lock().unwrap().0
    }

    /// The responder endpoint as currently oriented.
    pub fn responder(&self) -> SocketAddr {
        self.endpoints.lock().unwrap().1
    }

    /// How many times the roles were flipped.
    pub fn flip_count(&self) -> u32 {
        self.flips.load(Ordering::Relaxed)
    }

    /// How many protocol confirmations were reported.
    pub fn confirmation_count(&self) -> u32 {
        self.confirmations.load(Ordering::Relaxed)
    }

    /// Snapshot of the recorded anomalies.
    pub fn weirds(&self) -> Vec<Weird> {
        self.weirds.lock().unwrap().clone()
    }

    /// Names of the recorded anomalies, in report order.
    pub fn weird_names(&self) -> Vec<String> {
        self.weirds
            .lock()
            .unwrap()
            .iter()
            .map(|w| w.name.clone())
            .collect()
    }

    /// Snapshot of the recorded protocol violations.
    pub fn violations(&self) -> Vec<String> {
        self.violations.lock().unwrap().clone()
    }

    /// Snapshot of the recorded internal defects.
    pub fn internal_errors(&self) -> Vec<String> {
        self.internal.lock().unwrap().clone()
    }
}

impl FlowHandle for FlowState {
    fn responder_addr(&self) -> IpAddr {
        self.responder().ip()
    }

    fn responder_port(&self) -> u16 {
        self.responder().port()
    }

    fn last_time(&self) -> f64 {
        *self.last_time.lock().unwrap()
    }

    fn flip_roles(&self) {
        let mut endpoints = self.endpoints.lock().unwrap();
        *endpoints = (endpoints.1, endpoints.0);
        self.flips.fetch_add(1, Ordering::Relaxed);
    }

    fn weird_detail(&self, name: &str, detail: Option<&str>) {
        tracing::warn!(name, detail, "DNS anomaly");
        self.weirds.lock().unwrap().push(Weird {
            name: name.to_string(),
            detail: detail.map(str::to_string),
        });
    }

    fn internal_error(&self, reason: &str) {
        tracing::warn!(reason, "internal analyzer defect");
        self.internal.lock().unwrap().push(reason.to_string());
    }

    fn protocol_violation(&self, tag: &str) {
        self.violations.lock().unwrap().push(tag.to_string());
    }

    fn protocol_confirmation(&self) {
        self.confirmations.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> FlowState {
        FlowState::new(
            "10.0.0.1:54321".parse().unwrap(),
            "192.0.2.53:53".parse().unwrap(),
        )
    }

    #[test]
    fn test_flip_roles_swaps_endpoints() {
        let f = flow();
        assert_eq!(f.responder_port(), 53);
        f.flip_roles();
        assert_eq!(f.responder_port(), 54321);
        assert_eq!(f.flip_count(), 1);
    }

    #[test]
    fn test_weird_recording() {
        let f = flow();
        f.weird("DNS_NAME_too_long");
        f.weird_detail("DNS_RR_unknown_type", Some("4242"));
        let weirds = f.weirds();
        assert_eq!(weirds.len(), 2);
        assert_eq!(weirds[0].name, "DNS_NAME_too_long");
        assert_eq!(weirds[0].detail, None);
        assert_eq!(weirds[1].detail.as_deref(), Some("4242"));
    }

    #[test]
    fn test_touch_keeps_latest() {
        let f = flow();
        f.touch(100.0);
        f.touch(99.0);
        assert_eq!(f.last_time(), 100.0);
    }
}
