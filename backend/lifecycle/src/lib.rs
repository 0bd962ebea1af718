//! Moves hackathons along their schedule. Meant to run from cron every minute or so.
//!
//! 1. Load every hackathon
//! 2. Work out which status the schedule says it should have by now
//! 3. Step it forward one status at a time with optimistic updates, so a concurrent
//!    organizer action is never overwritten
//! 4. Drafts are never touched, publishing is always a human decision
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use records::{
    Documents, RecordResult,
    hackathon::{Hackathon, Status, advance_by_schedule},
};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub hackathon_id: String,
    pub title: String,
    pub from: Status,
    pub to: Status,
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub checked: usize,
    pub transitions: Vec<Transition>,
    pub failures: Vec<(String, String)>,
}

/// Statuses between the current one and the scheduled target, in order.
fn planned_steps(hackathon: &Hackathon, now: DateTime<Utc>) -> Vec<Status> {
    let target = hackathon.schedule_target(now);
    let mut steps = Vec::new();
    let mut current = hackathon.status;

    while current != target {
        match current.next() {
            Some(next) => {
                steps.push(next);
                current = next;
            }
            None => break,
        }
    }

    steps
}

pub async fn sweep(
    docs: &Documents,
    now: DateTime<Utc>,
    dry_run: bool,
    progress: &ProgressBar,
) -> RecordResult<SweepReport> {
    let hackathons = docs.all::<Hackathon>().await?;
    progress.set_length(hackathons.len() as u64);

    let mut report = SweepReport {
        checked: hackathons.len(),
        ..Default::default()
    };

    for hackathon in hackathons {
        progress.set_message(hackathon.title.clone());

        if dry_run {
            let mut from = hackathon.status;
            for to in planned_steps(&hackathon, now) {
                report.transitions.push(Transition {
                    hackathon_id: hackathon.id.clone(),
                    title: hackathon.title.clone(),
                    from,
                    to,
                });
                from = to;
            }

            progress.inc(1);
            continue;
        }

        let mut from = hackathon.status;
        loop {
            match advance_by_schedule(docs, &hackathon.id, now).await {
                Ok(Some(to)) => {
                    info!("Hackathon {} moved {} -> {}", hackathon.id, from.as_str(), to.as_str());
                    report.transitions.push(Transition {
                        hackathon_id: hackathon.id.clone(),
                        title: hackathon.title.clone(),
                        from,
                        to,
                    });
                    from = to;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to advance hackathon {}: {e}", hackathon.id);
                    report.failures.push((hackathon.id.clone(), e.to_string()));
                    break;
                }
            }
        }

        progress.inc(1);
    }

    progress.finish_with_message("Done");
    Ok(report)
}
