//! # DNS Name Decoding
//!
//! Decodes wire-format names, including RFC 1035 §4.1.4 compression
//! pointers, into a fixed-size dotted buffer. A naive decoder here is a
//! classic source of infinite loops and out-of-bounds reads; this one is
//! safe by construction:
//!
//! - a pointer must target an offset strictly below its own first byte, so
//!   the pointer graph is a DAG over decreasing offsets and recursion
//!   terminates without a depth counter;
//! - every literal label is checked against the remaining packet bytes and
//!   the remaining output buffer before it is copied.
//!
//! Labels are joined with `.`, ASCII uppercase is folded to lowercase, and
//! the trailing dot is stripped. Anomalies are reported through the flow
//! handle; only a forward or self-referencing pointer aborts the message.

use crate::flow::FlowHandle;
use crate::types::NETBIOS_NS_PORT;
use crate::wire::{Cursor, ParseError, Result};

/// Capacity of the assembled dotted form. One extra slot holds the trailing
/// dot of the final label before it is stripped.
pub const NAME_BUF_LEN: usize = 512;

/// Decoded forms at or beyond this length are reported as overlong.
const MAX_NAME_LEN: usize = 255;

/// Longest literal label permitted outside NetBIOS name-service lookups.
const MAX_LABEL_LEN: usize = 63;

// ---------------------------------------------------------------------------
// NameBuffer
// ---------------------------------------------------------------------------

/// Fixed-size assembly buffer for a decoded name.
pub struct NameBuffer {
    buf: [u8; NAME_BUF_LEN + 1],
    len: usize,
}

impl NameBuffer {
    /// Fresh, empty buffer.
    pub fn new() -> Self {
        Self {
            buf: [0; NAME_BUF_LEN + 1],
            len: 0,
        }
    }

    /// The assembled bytes so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The assembled name as a string, replacing any non-UTF-8 bytes.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    /// True if a label of `label_len` bytes no longer fits.
    fn would_overflow(&self, label_len: usize) -> bool {
        self.len + label_len >= NAME_BUF_LEN
    }

    /// Append a label and its separating dot.
    fn push_label(&mut self, label: &[u8]) {
        self.buf[self.len..self.len + label.len()].copy_from_slice(label);
        self.len += label.len();
        self.buf[self.len] = b'.';
        self.len += 1;
    }

    /// Drop a trailing dot at the end of the region starting at `from`.
    fn strip_trailing_dot(&mut self, from: usize) {
        if self.len > from && self.buf[self.len - 1] == b'.' {
            self.len -= 1;
        }
    }

    /// Fold ASCII uppercase to lowercase in the region starting at `from`.
    fn lowercase(&mut self, from: usize) {
        self.buf[from..self.len].make_ascii_lowercase();
    }
}

impl Default for NameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one name at the cursor into `out`.
///
/// On success the cursor sits past the terminating zero label, or past the
/// first compression pointer when one was followed. Recoverable anomalies
/// (overlong label, label past packet end, output overflow, overlong name)
/// are reported as weirds and leave a truncated name in `out`; a forward or
/// self-referencing pointer is fatal.
pub fn decode_name(cur: &mut Cursor, out: &mut NameBuffer, flow: &dyn FlowHandle) -> Result<()> {
    let region = out.len();

    while extract_label(cur, out, flow)? {}

    if out.len() - region >= MAX_NAME_LEN {
        flow.weird("DNS_NAME_too_long");
    }

    out.strip_trailing_dot(region);
    out.lowercase(region);
    Ok(())
}

/// Consume one label. Returns `Ok(true)` to continue with the next label,
/// `Ok(false)` when the name ends (terminator, pointer followed, end of
/// window, or a recoverable anomaly).
fn extract_label(cur: &mut Cursor, out: &mut NameBuffer, flow: &dyn FlowHandle) -> Result<bool> {
    if cur.remaining() == 0 {
        return Ok(false);
    }

    let label_pos = cur.pos();
    let len_byte = cur.read_u8()?;

    if cur.remaining() == 0 {
        // Nothing can follow the length byte; the name ends here.
        return Ok(false);
    }

    if len_byte == 0 {
        return Ok(false);
    }

    if len_byte & 0xc0 == 0xc0 {
        let low = cur.read_u8()?;
        let offset = ((len_byte as usize & 0x3f) << 8) | low as usize;

        // A pointer may only reference earlier bytes. Compression can point
        // at compression, so the only hard requirement is strict descent;
        // that is also what makes the decode terminate.
        if offset >= label_pos {
            flow.weird("DNS_label_forward_compress_offset");
            return Err(ParseError::MalformedName);
        }

        let mut target = Cursor::with_bounds(cur.message(), offset, label_pos);
        decode_name(&mut target, out, flow)?;
        return Ok(false);
    }

    // NBNS encodes labels longer than 63 bytes by spilling into the
    // reserved tag range, so the full byte is the literal length.
    let label_len = len_byte as usize;

    if label_len > cur.remaining() {
        flow.weird("DNS_label_len_gt_pkt");
        cur.drain();
        return Ok(false);
    }

    if label_len > MAX_LABEL_LEN && flow.responder_port() != NETBIOS_NS_PORT {
        flow.weird("DNS_label_too_long");
        return Ok(false);
    }

    if out.would_overflow(label_len) {
        flow.weird("DNS_label_len_gt_name_len");
        return Ok(false);
    }

    out.push_label(cur.read_bytes(label_len)?);
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
