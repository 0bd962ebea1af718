//! # Monitoring
//!
//! IDE activity reported by the browser while a participant is in a session.
//!
//! - Tab switches and focus losses are counted per participant
//! - Exceeding the tab switch limit flags the participant until an organizer clears it
//! - Heartbeats drive the online indicator on the organizer dashboard
use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const RECENT_EVENTS: usize = 50;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TabSwitch,
    FocusLost,
    FocusGained,
    Paste,
    Heartbeat,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ActivityLog {
    pub tab_switches: u32,
    pub focus_losses: u32,
    pub pastes: u32,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub flagged: bool,
    pub recent: Vec<ActivityEvent>,
}

impl ActivityLog {
    /// Returns `true` when this event is the one that flagged the participant.
    pub fn record(&mut self, event: ActivityEvent, tab_switch_limit: u32) -> bool {
        match event.kind {
            ActivityKind::TabSwitch => self.tab_switches += 1,
            ActivityKind::FocusLost => self.focus_losses += 1,
            ActivityKind::Paste => self.pastes += 1,
            ActivityKind::FocusGained => {}
            ActivityKind::Heartbeat => {
                self.last_heartbeat = Some(event.at);
                return false;
            }
        }

        self.last_heartbeat = Some(self.last_heartbeat.map_or(event.at, |seen| seen.max(event.at)));

        self.recent.push(event);
        if self.recent.len() > RECENT_EVENTS {
            let overflow = self.recent.len() - RECENT_EVENTS;
            self.recent.drain(..overflow);
        }

        if !self.flagged && self.tab_switches > tab_switch_limit {
            self.flagged = true;
            return true;
        }

        false
    }

    pub fn clear_flag(&mut self) {
        self.flagged = false;
    }

    pub fn is_online(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.last_heartbeat
            .is_some_and(|seen| now.signed_duration_since(seen) <= window)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ActivitySummary {
    pub user_id: String,
    pub team_id: Option<String>,
    pub tab_switches: u32,
    pub focus_losses: u32,
    pub pastes: u32,
    pub flagged: bool,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl ActivitySummary {
    pub fn new(
        user_id: &str,
        team_id: Option<&str>,
        log: &ActivityLog,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            team_id: team_id.map(str::to_string),
            tab_switches: log.tab_switches,
            focus_losses: log.focus_losses,
            pastes: log.pastes,
            flagged: log.flagged,
            online: log.is_online(now, window),
            last_seen: log.last_heartbeat,
        }
    }
}

/// Flagged participants first, then the most tab switches.
pub fn sort_dashboard(summaries: &mut [ActivitySummary]) {
    summaries.sort_by_key(|summary| {
        (
            Reverse(summary.flagged),
            Reverse(summary.tab_switches),
            summary.user_id.clone(),
        )
    });
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn event(kind: ActivityKind) -> ActivityEvent {
        ActivityEvent {
            kind,
            at: Utc::now(),
            detail: None,
        }
    }

    #[test]
    fn flags_once_limit_is_exceeded() {
        let mut log = ActivityLog::default();

        for _ in 0..3 {
            assert!(!log.record(event(ActivityKind::TabSwitch), 3));
        }
        assert!(!log.flagged);

        assert!(log.record(event(ActivityKind::TabSwitch), 3));
        assert!(log.flagged);

        assert!(!log.record(event(ActivityKind::TabSwitch), 3));
        assert_eq!(log.tab_switches, 5);
    }

    #[test]
    fn flag_persists_until_cleared() {
        let mut log = ActivityLog::default();
        log.record(event(ActivityKind::TabSwitch), 0);
        log.record(event(ActivityKind::FocusGained), 0);
        assert!(log.flagged);

        log.clear_flag();
        assert!(!log.flagged);
    }

    #[test]
    fn heartbeats_are_not_kept_as_events() {
        let mut log = ActivityLog::default();
        log.record(event(ActivityKind::Heartbeat), 5);

        assert!(log.recent.is_empty());
        assert!(log.is_online(Utc::now(), Duration::seconds(60)));
        assert!(!log.is_online(Utc::now() + Duration::seconds(120), Duration::seconds(60)));
    }

    #[test]
    fn recent_events_are_bounded() {
        let mut log = ActivityLog::default();
        for _ in 0..(RECENT_EVENTS + 10) {
            log.record(event(ActivityKind::Paste), 5);
        }

        assert_eq!(log.recent.len(), RECENT_EVENTS);
        assert_eq!(log.pastes as usize, RECENT_EVENTS + 10);
    }

    #[test]
    fn dashboard_puts_flagged_first() {
        let now = Utc::now();
        let window = Duration::seconds(60);
        let mut quiet = ActivityLog::default();
        quiet.tab_switches = 4;
        let mut flagged = ActivityLog::default();
        flagged.tab_switches = 1;
        flagged.flagged = true;

        let mut summaries = vec![
            ActivitySummary::new("a", None, &quiet, now, window),
            ActivitySummary::new("b", None, &ActivityLog::default(), now, window),
            ActivitySummary::new("c", None, &flagged, now, window),
        ];
        sort_dashboard(&mut summaries);

        let order: Vec<_> = summaries.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
