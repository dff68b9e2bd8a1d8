//! 32-bit wrapping sequence numbers.
//!
//! On the wire, sequence numbers are 32 bits and start at a random
//! per-connection ISN ("zero point"); internally the endpoints count with
//! 64-bit absolute sequence numbers that never wrap. `wrap` projects an
//! absolute number into the 32-bit space, `unwrap` recovers the absolute
//! number closest to a caller-supplied checkpoint.

use std::ops::Add;

const MASK_LOW_32: u64 = 0x0000_0000_FFFF_FFFF;
const MASK_HIGH_32: u64 = 0xFFFF_FFFF_0000_0000;
const BASE: u64 = 1 << 32;

/// A 32-bit sequence number relative to an arbitrary zero point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wrap32(u32);

impl Wrap32 {
    /// Construct from the raw wire bits.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw wire bits.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// A random zero point, for use as a connection ISN.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Project an absolute sequence number into the 32-bit space.
    pub fn wrap(n: u64, zero_point: Wrap32) -> Self {
        zero_point + n as u32
    }

    /// Recover the absolute sequence number closest to `checkpoint`.
    ///
    /// Of the many absolute numbers that wrap to this value, returns the one
    /// at minimum unsigned distance from `checkpoint`; at the exact
    /// half-window distance the smaller one wins.
    pub fn unwrap(self, zero_point: Wrap32, checkpoint: u64) -> u64 {
        let n_low = u64::from(self.0.wrapping_sub(zero_point.0));
        let c_low = checkpoint & MASK_LOW_32;

        // Splice the offset into the checkpoint's 2^32 window, then step one
        // window down or up if that lands closer.
        let res = (checkpoint & MASK_HIGH_32) | n_low;
        if res >= BASE && n_low > c_low && n_low - c_low >= BASE / 2 {
            return res - BASE;
        }
        if res < MASK_HIGH_32 && c_low > n_low && c_low - n_low > BASE / 2 {
            return res + BASE;
        }
        res
    }
}

impl Add<u32> for Wrap32 {
    type Output = Wrap32;

    fn add(self, n: u32) -> Wrap32 {
        Wrap32(self.0.wrapping_add(n))
    }
}
