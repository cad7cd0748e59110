//! Fire-mode enforcement and de-duplication.

use crate::config::Config;
use crate::models::alert::{Alert, FireMode};
use crate::models::candle::{EventKind, MarketEvent};
use crate::models::evaluation::{FireDecision, SnapshotEntry};
use chrono::{DateTime, Utc};
use tracing::trace;

/// Decides whether a satisfied alert may actually fire for this event.
///
/// Stateless: the last-fired watermark is owned by the evaluation
/// context and only advances through its commit step, so a rejected
/// downstream dispatch never marks the alert as fired.
pub struct FireController {
    config: Config,
}

impl FireController {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn decide(
        &self,
        alert: &Alert,
        satisfied: bool,
        event: &MarketEvent,
        last_fired: Option<DateTime<Utc>>,
        snapshot: Vec<SnapshotEntry>,
    ) -> FireDecision {
        let suppress = |fired_at| FireDecision {
            should_fire: false,
            fired_at,
            snapshot: snapshot.clone(),
        };

        if !alert.is_active() || !satisfied {
            return suppress(event.at);
        }

        match alert.fire_mode {
            FireMode::PerBar => self.decide_per_bar(alert, event, last_fired, snapshot),
            FireMode::PerClose => {
                if event.kind != EventKind::BarClose {
                    trace!(
                        alert_id = alert.alert_id,
                        "per_close alert suppressed on intra-bar tick"
                    );
                    return suppress(event.at);
                }
                self.decide_per_bar(alert, event, last_fired, snapshot)
            }
            FireMode::PerTick => {
                if let (Some(min_interval), Some(last)) =
                    (self.config.min_refire_interval, last_fired)
                {
                    if event.at - last < min_interval {
                        trace!(
                            alert_id = alert.alert_id,
                            "per_tick alert suppressed by minimum re-fire interval"
                        );
                        return suppress(event.at);
                    }
                }
                FireDecision {
                    should_fire: true,
                    fired_at: event.at,
                    snapshot,
                }
            }
        }
    }

    /// At most one fire per distinct bar timestamp; the watermark never
    /// regresses, so a stale event for an older bar is also suppressed.
    fn decide_per_bar(
        &self,
        alert: &Alert,
        event: &MarketEvent,
        last_fired: Option<DateTime<Utc>>,
        snapshot: Vec<SnapshotEntry>,
    ) -> FireDecision {
        let deduped = last_fired.is_some_and(|last| last >= event.bar_time);
        if deduped {
            trace!(
                alert_id = alert.alert_id,
                bar_time = %event.bar_time,
                "alert already fired for this bar"
            );
        }
        FireDecision {
            should_fire: !deduped,
            fired_at: event.bar_time,
            snapshot,
        }
    }
}
