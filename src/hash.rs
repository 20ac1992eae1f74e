//! Deterministic hashers for `BucketMap`.
//!
//! Bucket placement must not change between runs, so neither builder here
//! carries per-process randomness:
//! - `IdentityState`: integer keys hash to themselves (`h(k) = k`).
//! - `FixedState`: ahash with constant seeds, for strings and composite keys.

use core::hash::{BuildHasher, Hasher};

/// Hasher that returns the integer it was fed.
///
/// Each write is folded into the state with a rotate and xor, so a key fed
/// as one integer write hashes to that integer. Multi-write keys (strings,
/// tuples) still hash deterministically, just not well.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher {
    state: u64,
}

impl IdentityHasher {
    #[inline]
    fn mix(&mut self, n: u64) {
        self.state = self.state.rotate_left(8) ^ n;
    }
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.mix(u64::from_le_bytes(buf));
        }
    }

    fn write_u8(&mut self, n: u8) {
        self.mix(n as u64);
    }

    fn write_u16(&mut self, n: u16) {
        self.mix(n as u64);
    }

    fn write_u32(&mut self, n: u32) {
        self.mix(n as u64);
    }

    fn write_u64(&mut self, n: u64) {
        self.mix(n);
    }

    fn write_usize(&mut self, n: usize) {
        self.mix(n as u64);
    }

    fn write_i8(&mut self, n: i8) {
        self.mix(n as u8 as u64);
    }

    fn write_i16(&mut self, n: i16) {
        self.mix(n as u16 as u64);
    }

    fn write_i32(&mut self, n: i32) {
        self.mix(n as u32 as u64);
    }

    fn write_i64(&mut self, n: i64) {
        self.mix(n as u64);
    }

    fn write_isize(&mut self, n: isize) {
        self.mix(n as usize as u64);
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityState;

impl BuildHasher for IdentityState {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher::default()
    }
}

const SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// ahash keyed with constant seeds. The default hasher of `BucketMap`.
#[derive(Clone, Debug)]
pub struct FixedState(ahash::RandomState);

impl FixedState {
    pub fn new() -> Self {
        FixedState(ahash::RandomState::with_seeds(
            SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3],
        ))
    }
}

impl Default for FixedState {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildHasher for FixedState {
    type Hasher = ahash::AHasher;

    fn build_hasher(&self) -> ahash::AHasher {
        self.0.build_hasher()
    }
}
