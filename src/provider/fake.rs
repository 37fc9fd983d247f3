//! Simulated object store: no backing data, content derived from the key, transfer time derived from size.

use rand::Rng;
use std::io::{self, Read};
use std::time::Duration;

use super::{AttachmentProvider, sleep_unless_cancelled};
use crate::Attachment;
use crate::error::FetchError;
use crate::pipeline::CancelToken;
use crate::utils::config::FakeTransfer;

/// Produces attachments of a fixed or random size after a simulated transfer delay
/// (`size / bytes_per_sec`, never less than `min_transfer`).
#[derive(Clone, Debug)]
pub struct FakeProvider {
    min_len: u64,
    max_len: u64,
    bytes_per_sec: f64,
    min_transfer: Duration,
}

impl FakeProvider {
    /// Sizes drawn uniformly from `[min_len, max_len]`; default transfer characteristics.
    pub fn new(min_len: u64, max_len: u64) -> Self {
        Self {
            min_len: min_len.min(max_len),
            max_len: max_len.max(min_len),
            bytes_per_sec: FakeTransfer::BYTES_PER_SEC,
            min_transfer: FakeTransfer::MIN_TRANSFER,
        }
    }

    /// Override the simulated transfer. A `min_transfer` of zero with a huge rate makes fetches instant.
    pub fn with_transfer(mut self, bytes_per_sec: f64, min_transfer: Duration) -> Self {
        self.bytes_per_sec = bytes_per_sec;
        self.min_transfer = min_transfer;
        self
    }

    fn pick_length(&self) -> u64 {
        if self.min_len == self.max_len {
            self.min_len
        } else {
            rand::thread_rng().gen_range(self.min_len..=self.max_len)
        }
    }

    pub fn transfer_time(&self, length: u64) -> Duration {
        let secs = if self.bytes_per_sec > 0.0 {
            length as f64 / self.bytes_per_sec
        } else {
            0.0
        };
        Duration::from_secs_f64(secs).max(self.min_transfer)
    }
}

impl AttachmentProvider for FakeProvider {
    fn fetch(&self, key: &str, cancel: &CancelToken) -> Result<Attachment, FetchError> {
        let length = self.pick_length();
        if !sleep_unless_cancelled(self.transfer_time(length), cancel) {
            return Err(FetchError::Cancelled(key.to_string()));
        }
        Ok(Attachment::new(length, KeyPattern::new(key, length)))
    }
}

/// Reader over `length` bytes of the key repeated round-robin: key "100" gives "100100100…".
#[derive(Clone, Debug)]
pub struct KeyPattern {
    key: Vec<u8>,
    length: u64,
    pos: u64,
}

impl KeyPattern {
    pub fn new(key: &str, length: u64) -> Self {
        let key = if key.is_empty() {
            vec![b'0']
        } else {
            key.as_bytes().to_vec()
        };
        Self {
            key,
            length,
            pos: 0,
        }
    }
}

impl Read for KeyPattern {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.length - self.pos;
        let n = (buf.len() as u64).min(remaining) as usize;
        let key_len = self.key.len() as u64;
        for (i, b) in buf[..n].iter_mut().enumerate() {
            *b = self.key[((self.pos + i as u64) % key_len) as usize];
        }
        self.pos += n as u64;
        Ok(n)
    }
}
