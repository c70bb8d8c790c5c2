//! Quote-to-bar aggregation for a single subscription.

use super::{Bar, QuoteTick, Resolution};

/// Result of folding one tick into a subscription's bar state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarUpdate {
    /// The bar after the tick was applied.
    pub bar: Bar,
    /// True when the tick opened a new bucket.
    pub is_new_bar: bool,
}

/// Per-subscription bar builder.
///
/// Holds the current bar for one `(symbol, resolution)` stream. Ticks that
/// land in the current bucket widen it; a tick in a later bucket freezes the
/// current bar and starts a new one opened at that tick's mid. A tick from an
/// earlier bucket than the current bar is dropped, which keeps bar times
/// non-decreasing whatever order deliveries arrive in.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rust_decimal_macros::dec;
/// use terminal_gateway::domain::market_data::{BarAggregator, QuoteTick, Resolution};
/// use terminal_gateway::domain::shared::Symbol;
///
/// let mut agg = BarAggregator::new(Resolution::Minute1);
/// let tick = |secs, mid| {
///     QuoteTick::new(Symbol::new("AAPL"), mid, mid, dec!(0), dec!(0), Utc.timestamp_opt(secs, 0).unwrap())
/// };
///
/// assert!(agg.apply(&tick(0, dec!(10))).unwrap().is_new_bar);
/// assert!(!agg.apply(&tick(30, dec!(12))).unwrap().is_new_bar);
/// assert!(agg.apply(&tick(61, dec!(9))).unwrap().is_new_bar);
/// ```
#[derive(Debug, Clone)]
pub struct BarAggregator {
    resolution: Resolution,
    last_bar: Option<Bar>,
}

impl BarAggregator {
    /// Start with no bar.
    #[must_use]
    pub const fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            last_bar: None,
        }
    }

    /// Resolution this aggregator buckets by.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The current (most recent) bar.
    #[must_use]
    pub const fn last_bar(&self) -> Option<&Bar> {
        self.last_bar.as_ref()
    }

    /// Fold `tick` into the current bar.
    ///
    /// Returns `None` when the tick belongs to a bucket older than the
    /// current bar.
    pub fn apply(&mut self, tick: &QuoteTick) -> Option<BarUpdate> {
        let bucket = self.resolution.bucket_of(tick.timestamp);
        let mid = tick.mid();

        match self.last_bar.as_mut() {
            Some(bar) if bar.time == bucket => {
                bar.absorb(mid);
                Some(BarUpdate {
                    bar: *bar,
                    is_new_bar: false,
                })
            }
            Some(bar) if bucket < bar.time => {
                tracing::debug!(
                    symbol = %tick.symbol,
                    bucket,
                    current = bar.time,
                    "Dropping tick older than current bar"
                );
                None
            }
            _ => {
                let bar = Bar::opening(bucket, mid);
                self.last_bar = Some(bar);
                Some(BarUpdate {
                    bar,
                    is_new_bar: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Symbol;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tick(secs: i64, mid: Decimal) -> QuoteTick {
        QuoteTick::new(
            Symbol::new("AAPL"),
            mid,
            mid,
            Decimal::ZERO,
            Decimal::ZERO,
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[test]
    fn ticks_in_one_bucket_build_one_bar() {
        let mut agg = BarAggregator::new(Resolution::Minute1);

        let first = agg.apply(&tick(0, dec!(10))).unwrap();
        assert!(first.is_new_bar);
        assert!(!agg.apply(&tick(30, dec!(12))).unwrap().is_new_bar);
        let last = agg.apply(&tick(59, dec!(8))).unwrap();

        assert!(!last.is_new_bar);
        assert_eq!(
            last.bar,
            Bar {
                time: 0,
                open: dec!(10),
                high: dec!(12),
                low: dec!(8),
                close: dec!(8),
                volume: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn next_bucket_opens_at_tick_mid() {
        let mut agg = BarAggregator::new(Resolution::Minute1);
        for (t, mid) in [(0, dec!(10)), (30, dec!(12)), (59, dec!(8))] {
            agg.apply(&tick(t, mid));
        }

        let update = agg.apply(&tick(61, dec!(9))).unwrap();

        assert!(update.is_new_bar);
        assert_eq!(update.bar, Bar::opening(60, dec!(9)));
        assert_eq!(agg.last_bar(), Some(&Bar::opening(60, dec!(9))));
    }

    #[test]
    fn mid_is_used_not_bid() {
        let mut agg = BarAggregator::new(Resolution::Minute5);
        let quote = QuoteTick::new(
            Symbol::new("EURUSD"),
            dec!(1.0800),
            dec!(1.0802),
            Decimal::ZERO,
            Decimal::ZERO,
            Utc.timestamp_opt(300, 0).unwrap(),
        );
        let update = agg.apply(&quote).unwrap();
        assert_eq!(update.bar.open, dec!(1.0801));
        assert_eq!(update.bar.time, 300);
    }

    #[test]
    fn stale_tick_is_dropped() {
        let mut agg = BarAggregator::new(Resolution::Minute1);
        agg.apply(&tick(120, dec!(10)));

        assert!(agg.apply(&tick(30, dec!(50))).is_none());
        assert_eq!(agg.last_bar().unwrap().high, dec!(10));
    }

    #[test]
    fn gap_of_several_buckets_opens_one_bar() {
        let mut agg = BarAggregator::new(Resolution::Minute1);
        agg.apply(&tick(0, dec!(10)));
        let update = agg.apply(&tick(600, dec!(11))).unwrap();
        assert!(update.is_new_bar);
        assert_eq!(update.bar.time, 600);
    }

    proptest! {
        #[test]
        fn same_bucket_bar_summarizes_all_mids(
            mids in prop::collection::vec(1u32..100_000, 1..50),
        ) {
            let mut agg = BarAggregator::new(Resolution::Hour1);
            let mut last = None;
            for (i, m) in mids.iter().enumerate() {
                last = agg.apply(&tick(i as i64, Decimal::from(*m)));
            }
            let bar = last.unwrap().bar;
            prop_assert_eq!(bar.open, Decimal::from(mids[0]));
            prop_assert_eq!(bar.close, Decimal::from(*mids.last().unwrap()));
            prop_assert_eq!(bar.high, Decimal::from(*mids.iter().max().unwrap()));
            prop_assert_eq!(bar.low, Decimal::from(*mids.iter().min().unwrap()));
        }

        #[test]
        fn bar_times_never_decrease(
            ticks in prop::collection::vec((0i64..10_000, 1u32..1_000), 1..100),
        ) {
            let mut agg = BarAggregator::new(Resolution::Minute1);
            let mut previous_time = i64::MIN;
            let mut previous_bar: Option<Bar> = None;
            for (t, m) in ticks {
                if let Some(update) = agg.apply(&tick(t, Decimal::from(m))) {
                    prop_assert!(update.bar.time >= previous_time);
                    if let Some(prev) = previous_bar.filter(|b| b.time == update.bar.time) {
                        prop_assert!(update.bar.high >= prev.high);
                        prop_assert!(update.bar.low <= prev.low);
                    }
                    prop_assert!(update.bar.is_consistent());
                    previous_time = update.bar.time;
                    previous_bar = Some(update.bar);
                }
            }
        }
    }
}
