//! Indicator memoization shared across alerts on the same
//! symbol/timeframe.
//!
//! Closed-bar entries are write-once and retained under a bounded LRU;
//! forming-bar entries are volatile and invalidated on every tick.
//! Concurrent misses for one key collapse to a single computation.

use crate::models::alert::IndicatorParams;
use crate::models::candle::Timeframe;
use crate::services::indicators::{ComputeError, IndicatorOutputs, IndicatorProvider};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Memo key: one indicator request against one bar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub bar_time: DateTime<Utc>,
    /// Indicator name plus canonically-ordered params
    pub fingerprint: String,
}

/// Build the indicator fingerprint. Params are a `BTreeMap`, so the
/// serialized form is deterministic for equal parameter sets.
pub fn fingerprint(name: &str, params: &IndicatorParams) -> String {
    let params = serde_json::to_string(params).unwrap_or_default();
    format!("{}:{}", name, params)
}

struct Entry {
    /// Empty until the first computation completes; the per-key lock
    /// is what collapses concurrent misses into one computation.
    cell: Arc<Mutex<Option<IndicatorOutputs>>>,
    closed: bool,
    last_used: u64,
}

pub struct IndicatorCache {
    provider: Arc<dyn IndicatorProvider>,
    capacity: usize,
    entries: Mutex<HashMap<MemoKey, Entry>>,
    clock: AtomicU64,
}

impl IndicatorCache {
    pub fn new(provider: Arc<dyn IndicatorProvider>, capacity: usize) -> Self {
        Self {
            provider,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    /// Return the memoized outputs for this bar, computing them via the
    /// external provider on a miss. Failures are propagated and never
    /// cached, so the next request retries.
    pub async fn get_or_compute(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bar_time: DateTime<Utc>,
        closed: bool,
        name: &str,
        params: &IndicatorParams,
    ) -> Result<IndicatorOutputs, ComputeError> {
        let key = MemoKey {
            symbol: symbol.to_string(),
            timeframe,
            bar_time,
            fingerprint: fingerprint(name, params),
        };

        let cell = {
            let mut entries = self.entries.lock().await;
            let tick = self.clock.fetch_add(1, Ordering::Relaxed);

            // A bar that was cached while forming must be recomputed
            // once requested as closed.
            if closed {
                if let Some(existing) = entries.get(&key) {
                    if !existing.closed {
                        entries.remove(&key);
                    }
                }
            }

            let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
                cell: Arc::new(Mutex::new(None)),
                closed,
                last_used: tick,
            });
            entry.last_used = tick;
            let cell = entry.cell.clone();

            if entries.len() > self.capacity {
                Self::evict_lru(&mut entries, &key);
            }

            cell
        };

        let mut slot = cell.lock().await;
        if let Some(outputs) = slot.as_ref() {
            trace!(symbol = %symbol, timeframe = %timeframe, indicator = %name, "indicator cache hit");
            return Ok(outputs.clone());
        }

        debug!(
            symbol = %symbol,
            timeframe = %timeframe,
            indicator = %name,
            closed = closed,
            "indicator cache miss, computing {} for {}/{}",
            name,
            symbol,
            timeframe
        );
        let outputs = self
            .provider
            .compute(symbol, timeframe, name, params, bar_time)
            .await?;
        *slot = Some(outputs.clone());
        Ok(outputs)
    }

    /// Drop volatile entries for a symbol/timeframe; called when a new
    /// tick updates that forming bar.
    pub async fn invalidate_forming(&self, symbol: &str, timeframe: Timeframe) {
        let mut entries = self.entries.lock().await;
        entries.retain(|key, entry| {
            entry.closed || key.symbol != symbol || key.timeframe != timeframe
        });
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn evict_lru(entries: &mut HashMap<MemoKey, Entry>, keep: &MemoKey) {
        let victim = entries
            .iter()
            .filter(|(key, _)| *key != keep)
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(victim) = victim {
            trace!(symbol = %victim.symbol, timeframe = %victim.timeframe, "evicting LRU indicator memo entry");
            entries.remove(&victim);
        }
    }
}
