//! # DNS-over-TCP Framing
//!
//! TCP carries DNS messages behind a 2-byte big-endian length prefix
//! (RFC 1035 §4.2.2). The reassembler turns an arbitrarily segmented byte
//! stream into discrete message buffers: a segment may end in the middle of
//! the length prefix, a message body may span many segments, and one segment
//! may complete several messages.
//!
//! ```text
//!  LEN_HI --byte--> LEN_LO --byte--> BODY --filled == size--> dispatch
//!     ^                                                          |
//!     +----------------------------------------------------------+
//! ```
//!
//! The body buffer grows to the largest message seen on the direction and is
//! reused; it is released with the reassembler at session teardown.

// ---------------------------------------------------------------------------
// Reassembler
// ---------------------------------------------------------------------------

/// Framing phase of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePhase {
    /// Expecting the high byte of the length prefix.
    LenHi,
    /// Expecting the low byte of the length prefix.
    LenLo,
    /// Accumulating the message body.
    Body,
}

/// One direction's length-prefixed stream reassembler.
pub struct StreamReassembler {
    phase: FramePhase,
    msg_size: usize,
    buf: Vec<u8>,
    filled: usize,
}

impl StreamReassembler {
    /// Fresh reassembler, expecting a length prefix.
    pub fn new() -> Self {
        Self {
            phase: FramePhase::LenHi,
            msg_size: 0,
            buf: Vec::new(),
            filled: 0,
        }
    }

    /// Feed stream bytes, invoking `dispatch` once per completed message.
    pub fn deliver(&mut self, mut data: &[u8], mut dispatch: impl FnMut(&[u8])) {
        while !data.is_empty() {
            match self.phase {
                FramePhase::LenHi => {
                    self.msg_size = (data[0] as usize) << 8;
                    self.phase = FramePhase::LenLo;
                    data = &data[1..];
                }
                FramePhase::LenLo => {
                    self.msg_size |= data[0] as usize;
                    self.filled = 0;
                    if self.buf.len() < self.msg_size {
                        self.buf.resize(self.msg_size, 0);
                    }
                    self.phase = FramePhase::Body;
                    data = &data[1..];
                }
                FramePhase::Body => {
                    let take = (self.msg_size - self.filled).min(data.len());
                    self.buf[self.filled..self.filled + take].copy_from_slice(&data[..take]);
                    self.filled += take;
                    data = &data[take..];

                    if self.filled == self.msg_size {
                        dispatch(&self.buf[..self.msg_size]);
                        self.filled = 0;
                        self.phase = FramePhase::LenHi;
                    }
                }
            }
        }
    }

    /// Deliver any partial body at end-of-stream and reset the framing
    /// state. The caller parses the fragment with an unknown origin.
    pub fn flush(&mut self, mut dispatch: impl FnMut(&[u8])) {
        if self.phase == FramePhase::Body && self.filled > 0 {
            dispatch(&self.buf[..self.filled]);
        }
        self.phase = FramePhase::LenHi;
        self.msg_size = 0;
        self.filled = 0;
    }

    /// True when the reassembler sits between messages.
    pub fn at_frame_boundary(&self) -> bool {
        self.phase == FramePhase::LenHi
    }
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
