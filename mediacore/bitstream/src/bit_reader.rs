//! Plain bit reader over a byte slice, with no emulation-prevention handling.

use crate::bits::{bits_left, get_bits, get_ue, skip_bits};

/// Reads bits MSB-first from a byte slice.
///
/// Once a read runs past the end of the data the reader becomes sticky-wrong:
/// `error()` returns `true` and every subsequent `get`/`get_ue` returns `0`
/// rather than panicking, so callers can finish decoding a struct and check
/// `error()` once at the end instead of threading a `Result` through every
/// field read.
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
    error: bool,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            bit_pos: 0,
            error: false,
        }
    }

    /// Reads `n` bits (0..=32) MSB-first. Panics if `n > 32`.
    pub fn get(&mut self, n: u32) -> u32 {
        get_bits(self.data, &mut self.bit_pos, &mut self.error, n)
    }

    pub fn skip(&mut self, n: u32) {
        skip_bits(self.data, &mut self.bit_pos, &mut self.error, n);
    }

    /// Exp-Golomb unsigned decode (ue(v)).
    pub fn get_ue(&mut self) -> u32 {
        get_ue(self.data, &mut self.bit_pos, &mut self.error)
    }

    /// Signed Exp-Golomb decode (se(v)): maps ue(v) `k` to `(-1)^(k+1) * ceil(k/2)`.
    pub fn get_se(&mut self) -> i32 {
        let k = self.get_ue();
        let magnitude = (k as i64 + 1) / 2;
        if k % 2 == 1 {
            magnitude as i32
        } else {
            -(magnitude as i32)
        }
    }

    pub fn left(&self) -> usize {
        bits_left(self.data, self.bit_pos)
    }

    pub fn error(&self) -> bool {
        self.error
    }
}
