// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chunking for payloads exceeding a single APDU frame
//!
//! The first chunk of a payload declares the total length; continuation
//! chunks carry successive slices until the payload is consumed. An empty
//! payload still produces exactly one (empty) first chunk so the receiver
//! always learns the total. Chunking never mutates or copies the payload,
//! it only hands out slices.
//!
//! How a chunk is wrapped into an APDU differs per flow: CIP-36 vote
//! continuations are sent raw, while datum / reference-script and message
//! chunks each declare their own size. The flow-specific APDU types in
//! [`tx::output`][crate::tx::output], [`cvote`][crate::cvote] and
//! [`msg`][crate::msg] take their slices from here.

/// Chunk size for inline datums, reference scripts and vote payloads
pub const MAX_CHUNK_SIZE: usize = 240;

/// First-chunk budget for messages displayed as ASCII
pub const MSG_FIRST_CHUNK_ASCII: usize = 198;

/// First-chunk budget for messages displayed as hex
pub const MSG_FIRST_CHUNK_HEX: usize = 99;

/// Continuation-chunk budget for messages
pub const MSG_NEXT_CHUNK_SIZE: usize = 250;

/// One chunk of a payload
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Chunk<'a> {
    /// Total payload length, declared on the first chunk only
    pub total: Option<u32>,

    /// Payload slice carried by this chunk
    pub body: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// Check whether this is the leading chunk
    pub fn is_first(&self) -> bool {
        self.total.is_some()
    }
}

/// Iterator over the chunks of a payload
///
/// Pure slicing over borrowed data; the caller sends one chunk per
/// round-trip, in order.
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
    data: &'a [u8],
    first_max: usize,
    rest_max: usize,
    offset: usize,
    started: bool,
}

impl<'a> Chunks<'a> {
    /// Chunk a payload with a single size bound
    pub fn new(data: &'a [u8], max: usize) -> Self {
        Self::asymmetric(data, max, max)
    }

    /// Chunk a payload with distinct first / continuation bounds
    /// (message signing budgets the first chunk by display mode)
    pub fn asymmetric(data: &'a [u8], first_max: usize, rest_max: usize) -> Self {
        debug_assert!(first_max > 0 && rest_max > 0);

        Self {
            data,
            first_max,
            rest_max,
            offset: 0,
            started: false,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;

            let n = core::cmp::min(self.data.len(), self.first_max);
            self.offset = n;

            return Some(Chunk {
                total: Some(self.data.len() as u32),
                body: &self.data[..n],
            });
        }

        if self.offset >= self.data.len() {
            return None;
        }

        let n = core::cmp::min(self.data.len() - self.offset, self.rest_max);
        let body = &self.data[self.offset..][..n];
        self.offset += n;

        Some(Chunk { total: None, body })
    }
}
