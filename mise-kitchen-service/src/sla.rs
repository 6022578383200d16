//! Service-level measurement: elapsed queue/prep time against per-station
//! targets, classified into levels for the kitchen dashboards.
//!
//! Everything here is computed on read from milestone timestamps; nothing
//! is persisted. "Now" substitutes for milestones not yet reached so
//! in-flight tickets report live elapsed time.

use chrono::{DateTime, Utc};

use crate::models::TicketState;

pub const DEFAULT_QUEUE_TARGET_SECS: i64 = 300;
pub const DEFAULT_PREP_TARGET_SECS: i64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaLevel {
    Normal,
    Warning,
    Critical,
    Expired,
}

impl SlaLevel {
    /// Collapses the level into the three dashboard buckets.
    pub fn status(self) -> SlaStatus {
        match self {
            SlaLevel::Normal => SlaStatus::OnTime,
            SlaLevel::Warning => SlaStatus::AtRisk,
            SlaLevel::Critical | SlaLevel::Expired => SlaStatus::Delayed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaStatus {
    OnTime,
    AtRisk,
    Delayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    pub queue_secs: i64,
    pub prep_secs: i64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            queue_secs: DEFAULT_QUEUE_TARGET_SECS,
            prep_secs: DEFAULT_PREP_TARGET_SECS,
        }
    }
}

/// Classification boundaries as fractions of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
    pub expired: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: 0.8,
            critical: 1.0,
            expired: 1.5,
        }
    }
}

/// The milestone timestamps SLA measurement reads. Both tickets and
/// ticket items carry this shape.
#[derive(Debug, Clone, Copy)]
pub struct Milestones {
    pub queued_at: DateTime<Utc>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub queue_secs: i64,
    pub prep_secs: i64,
    pub total_secs: i64,
    pub targets: Targets,
    pub queue_level: SlaLevel,
    pub prep_level: SlaLevel,
    pub total_level: SlaLevel,
    pub status: SlaStatus,
}

pub fn classify(elapsed_secs: i64, target_secs: i64, thresholds: &Thresholds) -> SlaLevel {
    let elapsed = elapsed_secs as f64;
    let target = target_secs as f64;
    if elapsed < target * thresholds.warning {
        SlaLevel::Normal
    } else if elapsed < target * thresholds.critical {
        SlaLevel::Warning
    } else if elapsed < target * thresholds.expired {
        SlaLevel::Critical
    } else {
        SlaLevel::Expired
    }
}

pub fn evaluate(
    milestones: &Milestones,
    targets: &Targets,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Snapshot {
    let queue_end = milestones.preparing_at.unwrap_or(now);
    let queue_secs = (queue_end - milestones.queued_at).num_seconds().max(0);

    // Zero until preparation actually starts, regardless of wall clock.
    let prep_secs = match milestones.preparing_at {
        Some(preparing_at) => {
            let prep_end = milestones.ready_at.unwrap_or(now);
            (prep_end - preparing_at).num_seconds().max(0)
        }
        None => 0,
    };

    let total_secs = queue_secs + prep_secs;
    let total_target = targets.queue_secs + targets.prep_secs;

    let total_level = classify(total_secs, total_target, thresholds);
    Snapshot {
        queue_secs,
        prep_secs,
        total_secs,
        targets: *targets,
        queue_level: classify(queue_secs, targets.queue_secs, thresholds),
        prep_level: classify(prep_secs, targets.prep_secs, thresholds),
        total_level,
        status: total_level.status(),
    }
}

/// Live dashboard aggregate for one station, over its non-terminal
/// tickets. An idle station yields the all-zero summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationSummary {
    pub active: u32,
    pub queued: u32,
    pub in_progress: u32,
    pub ready: u32,
    pub on_time: u32,
    pub at_risk: u32,
    pub delayed: u32,
    pub avg_queue_secs: i64,
    pub avg_prep_secs: i64,
    pub oldest_age_secs: Option<i64>,
    pub oldest_status: Option<SlaStatus>,
}

pub fn summarize(
    open_tickets: &[(TicketState, Milestones)],
    targets: &Targets,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> StationSummary {
    let mut summary = StationSummary::default();
    if open_tickets.is_empty() {
        return summary;
    }

    let mut queue_sum = 0i64;
    let mut prep_sum = 0i64;
    let mut oldest: Option<&Milestones> = None;

    for (state, milestones) in open_tickets {
        let snapshot = evaluate(milestones, targets, thresholds, now);

        summary.active += 1;
        match state {
            TicketState::Queued => summary.queued += 1,
            TicketState::InProgress => summary.in_progress += 1,
            TicketState::Ready => summary.ready += 1,
            TicketState::Served | TicketState::Cancelled => {}
        }
        match snapshot.status {
            SlaStatus::OnTime => summary.on_time += 1,
            SlaStatus::AtRisk => summary.at_risk += 1,
            SlaStatus::Delayed => summary.delayed += 1,
        }

        queue_sum += snapshot.queue_secs;
        prep_sum += snapshot.prep_secs;

        if oldest.map_or(true, |o| milestones.queued_at < o.queued_at) {
            oldest = Some(milestones);
            summary.oldest_age_secs = Some((now - milestones.queued_at).num_seconds().max(0));
            summary.oldest_status = Some(snapshot.status);
        }
    }

    let count = summary.active as i64;
    summary.avg_queue_secs = queue_sum / count;
    summary.avg_prep_secs = prep_sum / count;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(now: DateTime<Utc>, secs_ago: i64) -> DateTime<Utc> {
        now - Duration::seconds(secs_ago)
    }

    #[test]
    fn classification_boundaries_follow_the_ratios() {
        let th = Thresholds::default();
        assert_eq!(classify(0, 300, &th), SlaLevel::Normal);
        assert_eq!(classify(239, 300, &th), SlaLevel::Normal);
        assert_eq!(classify(240, 300, &th), SlaLevel::Warning);
        assert_eq!(classify(299, 300, &th), SlaLevel::Warning);
        assert_eq!(classify(300, 300, &th), SlaLevel::Critical);
        assert_eq!(classify(449, 300, &th), SlaLevel::Critical);
        assert_eq!(classify(450, 300, &th), SlaLevel::Expired);
    }

    #[test]
    fn custom_thresholds_move_the_boundaries() {
        let th = Thresholds {
            warning: 0.5,
            critical: 0.75,
            expired: 1.0,
        };
        assert_eq!(classify(100, 400, &th), SlaLevel::Normal);
        assert_eq!(classify(200, 400, &th), SlaLevel::Warning);
        assert_eq!(classify(300, 400, &th), SlaLevel::Critical);
        assert_eq!(classify(400, 400, &th), SlaLevel::Expired);
    }

    #[test]
    fn prep_time_is_zero_until_preparation_starts() {
        let now = Utc::now();
        // Queued two hours ago and still untouched: prep stays zero.
        let milestones = Milestones {
            queued_at: at(now, 7200),
            preparing_at: None,
            ready_at: None,
        };
        let snapshot = evaluate(&milestones, &Targets::default(), &Thresholds::default(), now);
        assert_eq!(snapshot.prep_secs, 0);
        assert_eq!(snapshot.queue_secs, 7200);
    }

    #[test]
    fn fresh_queued_ticket_is_on_time() {
        let now = Utc::now();
        let milestones = Milestones {
            queued_at: at(now, 200),
            preparing_at: None,
            ready_at: None,
        };
        let snapshot = evaluate(&milestones, &Targets::default(), &Thresholds::default(), now);
        assert_eq!(snapshot.queue_level, SlaLevel::Normal);
        assert_eq!(snapshot.prep_level, SlaLevel::Normal);
        assert_eq!(snapshot.status, SlaStatus::OnTime);
    }

    #[test]
    fn milestones_freeze_the_measurement() {
        let now = Utc::now();
        let milestones = Milestones {
            queued_at: at(now, 10_000),
            preparing_at: Some(at(now, 9_900)),
            ready_at: Some(at(now, 9_700)),
        };
        let snapshot = evaluate(&milestones, &Targets::default(), &Thresholds::default(), now);
        assert_eq!(snapshot.queue_secs, 100);
        assert_eq!(snapshot.prep_secs, 200);
        assert_eq!(snapshot.total_secs, 300);
    }

    #[test]
    fn live_prep_time_counts_from_preparing() {
        let now = Utc::now();
        let milestones = Milestones {
            queued_at: at(now, 500),
            preparing_at: Some(at(now, 400)),
            ready_at: None,
        };
        let snapshot = evaluate(&milestones, &Targets::default(), &Thresholds::default(), now);
        assert_eq!(snapshot.queue_secs, 100);
        assert_eq!(snapshot.prep_secs, 400);
    }

    #[test]
    fn idle_station_summarizes_to_zero() {
        let summary = summarize(&[], &Targets::default(), &Thresholds::default(), Utc::now());
        assert_eq!(summary, StationSummary::default());
    }

    #[test]
    fn summary_counts_states_and_buckets() {
        let now = Utc::now();
        let targets = Targets {
            queue_secs: 300,
            prep_secs: 600,
        };
        let open = vec![
            // Fresh, on time.
            (
                TicketState::Queued,
                Milestones {
                    queued_at: at(now, 60),
                    preparing_at: None,
                    ready_at: None,
                },
            ),
            // Preparing for a while: total 1000s of 900s target -> delayed.
            (
                TicketState::InProgress,
                Milestones {
                    queued_at: at(now, 1000),
                    preparing_at: Some(at(now, 800)),
                    ready_at: None,
                },
            ),
        ];
        let summary = summarize(&open, &targets, &Thresholds::default(), now);

        assert_eq!(summary.active, 2);
        assert_eq!(summary.queued, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.ready, 0);
        assert_eq!(summary.on_time, 1);
        assert_eq!(summary.delayed, 1);
        assert_eq!(summary.avg_queue_secs, (60 + 200) / 2);
        assert_eq!(summary.avg_prep_secs, (0 + 800) / 2);
        assert_eq!(summary.oldest_age_secs, Some(1000));
        assert_eq!(summary.oldest_status, Some(SlaStatus::Delayed));
    }
}
