use rand::RngCore;

use schemaseed_core::Seed;

const GOLDEN_GAMMA: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Mulberry32 generator. Every draw in a run comes from one instance, so a
/// fixed seed reproduces the whole run.
///
/// Per draw, with wrapping 32-bit arithmetic:
///
/// ```text
/// state += 0x6D2B79F5
/// t  = state
/// t  = (t ^ (t >> 15)) * (t | 1)
/// t ^= t + (t ^ (t >> 7)) * (t | 61)
/// out = t ^ (t >> 14)
/// ```
///
/// `next_f64` is `out / 2^32`. Integer seeds are truncated to their low 32
/// bits; string seeds are hashed with `h = (h << 5) - h + unit` over UTF-16
/// code units in wrapping `i32` arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRandom {
    state: u32,
}

impl SeedRandom {
    pub fn new(seed: &Seed) -> Self {
        let state = match seed {
            Seed::Int(value) => *value as u32,
            Seed::Text(value) => hash_seed(value),
        };
        Self { state }
    }

    pub fn from_state(state: u32) -> Self {
        Self { state }
    }

    fn next_raw(&mut self) -> u32 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_raw()) / TWO_POW_32
    }

    /// Uniform integer in `[min, max]`. Returns `min` when `max < min`.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        let span = i128::from(max) - i128::from(min) + 1;
        let offset = (self.next_f64() * span as f64).floor() as i128;
        if span <= 0 {
            return min;
        }
        // Rounding at the full i64 span can land one past `max`.
        (i128::from(min) + offset).min(i128::from(max)) as i64
    }

    /// Pick one element, uniformly or proportionally to `weights`. Returns
    /// `None` only for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T], weights: Option<&[f64]>) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let Some(weights) = weights else {
            let idx = self.next_int(0, items.len() as i64 - 1) as usize;
            return items.get(idx);
        };

        let total: f64 = weights.iter().sum();
        let mut remaining = self.next_f64() * total;
        for (idx, item) in items.iter().enumerate() {
            remaining -= weights.get(idx).copied().unwrap_or(0.0);
            if remaining <= 0.0 {
                return Some(item);
            }
        }
        items.last()
    }

    /// True with the given probability.
    pub fn boolean(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

impl RngCore for SeedRandom {
    fn next_u32(&mut self) -> u32 {
        self.next_raw()
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_raw());
        let low = u64::from(self.next_raw());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

fn hash_seed(value: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in value.encode_utf16() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit));
    }
    hash as u32
}
