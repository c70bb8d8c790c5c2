//! Bounded random walk behind synthetic quotes and synthetic history.
//!
//! The walk is seeded, so a given `(anchor, params, seed)` always produces
//! the same path. Prices never leave `anchor * (1 ± max_deviation)`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::{Bar, Resolution};

/// Shape of a random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkParams {
    /// Largest relative move per step.
    pub step_fraction: f64,
    /// Largest relative distance from the anchor price.
    pub max_deviation: f64,
}

impl WalkParams {
    /// Tick-level walk for live synthetic quotes.
    pub const QUOTES: Self = Self {
        step_fraction: 0.001,
        max_deviation: 0.2,
    };

    /// Bar-level walk for synthetic history.
    pub const HISTORY: Self = Self {
        step_fraction: 0.01,
        max_deviation: 0.5,
    };
}

/// Widest high/low excursion beyond open/close in a synthetic bar.
const WICK_FRACTION: f64 = 0.005;

/// Seeded bounded random walk.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    anchor: f64,
    price: f64,
    params: WalkParams,
    rng: StdRng,
}

impl RandomWalk {
    /// Start a walk at `anchor`.
    #[must_use]
    pub fn new(anchor: Decimal, params: WalkParams, seed: u64) -> Self {
        let anchor = anchor.to_f64().unwrap_or(0.0);
        Self {
            anchor,
            price: anchor,
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current price.
    #[must_use]
    pub fn price(&self) -> Decimal {
        to_decimal(self.price)
    }

    /// Advance one step and return the new price.
    pub fn step(&mut self) -> Decimal {
        let change = self.rng.random_range(-1.0..=1.0) * self.params.step_fraction;
        let lower = (self.anchor * (1.0 - self.params.max_deviation)).max(f64::MIN_POSITIVE);
        let upper = self.anchor * (1.0 + self.params.max_deviation);
        self.price = (self.price * (1.0 + change)).clamp(lower, upper.max(lower));
        self.price()
    }

    /// Uniform sample in `[0, fraction]`.
    pub fn jitter(&mut self, fraction: f64) -> f64 {
        self.rng.random_range(0.0..=fraction)
    }

    /// Uniform integer size in `[low, high)`.
    pub fn size(&mut self, low: u32, high: u32) -> Decimal {
        Decimal::from(self.rng.random_range(low..high.max(low + 1)))
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Deterministic 64-bit FNV-1a over the given parts.
///
/// Stable across processes and toolchains, unlike `DefaultHasher`.
#[must_use]
pub fn seed_from(parts: &[&str]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for part in parts {
        for byte in part.bytes().chain(std::iter::once(0xff)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

/// Synthetic bars covering `[from, to)` that end at `anchor`.
///
/// The first bar is the bucket containing `from`. When the range holds more
/// buckets than `cap`, bars are spaced `ceil(total / cap)` buckets apart so
/// the result never exceeds `cap`. The path is walked backwards from the
/// anchor, so the last close meets the live price. Returns an empty list for
/// an empty range, a zero cap or a non-positive anchor.
#[must_use]
pub fn synthetic_bars(
    anchor: Decimal,
    from: i64,
    to: i64,
    resolution: Resolution,
    cap: usize,
    seed: u64,
    decimals: u32,
) -> Vec<Bar> {
    if to <= from || cap == 0 || anchor <= Decimal::ZERO {
        return Vec::new();
    }

    // Widened to i128 so spans across the whole i64 range cannot overflow.
    let width = i128::from(resolution.seconds());
    let first = i128::from(resolution.bucket_start(from));
    let span = i128::from(to) - first;
    let total = (span + width - 1) / width;
    let stride = (total + cap as i128 - 1) / cap as i128;
    let step = stride.max(1) * width;
    let count = ((span + step - 1) / step) as usize;

    let mut walk = RandomWalk::new(anchor, WalkParams::HISTORY, seed);
    let mut path = Vec::with_capacity(count + 1);
    path.push(walk.price());
    for _ in 0..count {
        path.push(walk.step());
    }
    path.reverse();

    path.windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let open = pair[0];
            let close = pair[1];
            let wick_up = to_decimal(1.0 + walk.jitter(WICK_FRACTION));
            let wick_down = to_decimal(1.0 - walk.jitter(WICK_FRACTION));
            Bar {
                time: i64::try_from(first + i as i128 * step).unwrap_or(to),
                open: open.round_dp(decimals),
                high: (open.max(close) * wick_up).round_dp(decimals),
                low: (open.min(close) * wick_down).round_dp(decimals),
                close: close.round_dp(decimals),
                volume: walk.size(1_000, 100_000),
            }
        })
        .collect()
}
