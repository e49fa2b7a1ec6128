//! Price snapshots and time-weighted averages
//!
//! One snapshot of every stored price is appended per vote period. The
//! history is trimmed to the lookback window, except that the newest
//! snapshot older than the window survives: its rate was still in force at
//! the start of the window.

use crate::context::Context;
use crate::keeper::Keeper;
use oracle_core::prelude::*;
use std::collections::BTreeMap;

impl Keeper {
    /// Snapshot of every stored price at the current block time
    pub fn build_price_snapshot(&self, ctx: &Context<'_>) -> Result<PriceSnapshot> {
        let price_snapshot_items = self
            .exchange_rates(ctx)?
            .into_iter()
            .map(|(denom, oracle_exchange_rate)| PriceSnapshotItem {
                denom,
                oracle_exchange_rate,
            })
            .collect();

        Ok(PriceSnapshot {
            snapshot_timestamp: ctx.unix_seconds(),
            price_snapshot_items,
        })
    }

    /// Append `snapshot` and evict history outside the lookback window
    pub fn add_price_snapshot(&self, ctx: &mut Context<'_>, snapshot: PriceSnapshot) -> Result<()> {
        let lookback = i64::try_from(self.params(ctx)?.lookback_duration).unwrap_or(i64::MAX);
        let now = ctx.unix_seconds();
        let mut history = self.price_snapshots(ctx)?;

        match history.binary_search_by_key(&snapshot.snapshot_timestamp, |s| s.snapshot_timestamp) {
            Ok(index) => history[index] = snapshot,
            Err(index) => history.insert(index, snapshot),
        }

        let out_of_range = history
            .iter()
            .take_while(|s| s.snapshot_timestamp.saturating_add(lookback) < now)
            .count();
        if out_of_range > 1 {
            history.drain(..out_of_range - 1);
            tracing::debug!(evicted = out_of_range - 1, retained = history.len(), "Pruned price snapshots");
        }

        self.set_price_snapshots(ctx, &history)
    }

    /// TWAP of every vote target with data in the last `lookback_seconds`
    ///
    /// Walking back from the newest snapshot, each rate is weighted by the
    /// time it was in force; the oldest interval is clipped to the window
    /// start. A denom whose only data point is the current instant gets a
    /// zero TWAP over a zero lookback.
    pub fn calculate_twaps(&self, ctx: &Context<'_>, lookback_seconds: i64) -> Result<Vec<OracleTwap>> {
        let max = self.params(ctx)?.lookback_duration;
        if lookback_seconds <= 0 || u64::try_from(lookback_seconds).map_or(true, |l| l > max) {
            return Err(OracleError::InvalidTwapLookback {
                requested: lookback_seconds,
                max,
            });
        }

        let now = ctx.unix_seconds();
        let window_start = now.saturating_sub(lookback_seconds);
        // denom -> (time-weighted sum, seconds covered)
        let mut accumulated: BTreeMap<Denom, (Dec, i64)> = BTreeMap::new();

        for snapshot in self.price_snapshots(ctx)?.iter().rev() {
            let clipped = snapshot.snapshot_timestamp < window_start;
            let traversed = now - snapshot.snapshot_timestamp.max(window_start);

            for item in &snapshot.price_snapshot_items {
                if !self.is_vote_target(ctx, &item.denom) {
                    continue;
                }
                let (sum, duration) = accumulated.entry(item.denom.clone()).or_insert((Dec::ZERO, 0));
                let weighted = item
                    .oracle_exchange_rate
                    .exchange_rate
                    .checked_mul_int(traversed - *duration)
                    .and_then(|w| sum.checked_add(w))
                    .ok_or_else(|| OracleError::Overflow(format!("TWAP sum for {}", item.denom)))?;
                *sum = weighted;
                *duration = traversed;
            }

            if clipped {
                break;
            }
        }

        if accumulated.is_empty() {
            return Err(OracleError::NoTwapData);
        }

        accumulated
            .into_iter()
            .map(|(denom, (sum, duration))| {
                let twap = if duration == 0 {
                    Dec::ZERO
                } else {
                    sum.checked_quo_int(duration)
                        .ok_or_else(|| OracleError::Overflow(format!("TWAP for {}", denom)))?
                };
                Ok(OracleTwap {
                    denom,
                    twap,
                    lookback_seconds: duration,
                })
            })
            .collect()
    }

    /// TWAP of a single denom
    pub fn twap_for(&self, ctx: &Context<'_>, denom: &str, lookback_seconds: i64) -> Result<OracleTwap> {
        self.calculate_twaps(ctx, lookback_seconds)?
            .into_iter()
            .find(|twap| twap.denom == denom)
            .ok_or_else(|| OracleError::NoTwapDataForDenom(denom.to_string()))
    }
}
