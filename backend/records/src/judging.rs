use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{RecordError, RecordResult, invalid},
    hackathon::{Hackathon, Status},
    store::Documents,
    team::{Team, teams_for},
    user::Organization,
};

pub const MAX_CRITERION_SCORE: u8 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Submission {
    pub repository_url: String,
    pub demo_url: Option<String>,
    pub description: String,
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewSubmission {
    pub repository_url: String,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Score {
    pub judge_id: String,
    pub criteria: BTreeMap<String, u8>,
    pub comment: String,
    pub scored_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewScore {
    pub criteria: BTreeMap<String, u8>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub team_id: String,
    pub name: String,
    pub average: Option<f64>,
    pub judges: usize,
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Submission {
    pub fn new(input: NewSubmission, submitted_by: &str, now: DateTime<Utc>) -> RecordResult<Self> {
        let repository_url = input.repository_url.trim().to_string();
        if !is_http_url(&repository_url) {
            return Err(invalid("repository url must start with http:// or https://"));
        }

        let demo_url = input
            .demo_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        if demo_url.as_deref().is_some_and(|url| !is_http_url(url)) {
            return Err(invalid("demo url must start with http:// or https://"));
        }

        Ok(Self {
            repository_url,
            demo_url,
            description: input.description,
            submitted_at: now,
            submitted_by: submitted_by.to_string(),
        })
    }
}

impl Score {
    pub fn new(input: NewScore, judge_id: &str, now: DateTime<Utc>) -> RecordResult<Self> {
        if input.criteria.is_empty() {
            return Err(invalid("at least one criterion is required"));
        }

        if let Some((name, _)) = input
            .criteria
            .iter()
            .find(|(_, value)| **value > MAX_CRITERION_SCORE)
        {
            return Err(invalid(format!(
                "criterion {name} must be between 0 and {MAX_CRITERION_SCORE}"
            )));
        }

        Ok(Self {
            judge_id: judge_id.to_string(),
            criteria: input.criteria,
            comment: input.comment,
            scored_at: now,
        })
    }
}

/// Mean of every criterion value across all scores, rounded to 2 decimals.
pub fn average(scores: &[Score]) -> Option<f64> {
    let values: Vec<f64> = scores
        .iter()
        .flat_map(|score| score.criteria.values())
        .map(|value| f64::from(*value))
        .collect();

    if values.is_empty() {
        return None;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

pub fn rank(teams: &[Team]) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = teams
        .iter()
        .filter(|team| team.submission.is_some())
        .map(|team| LeaderboardEntry {
            team_id: team.id.clone(),
            name: team.name.clone(),
            average: average(&team.scores),
            judges: team.scores.len(),
        })
        .collect();

    entries.sort_by(|a, b| match (a.average, b.average) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });

    entries
}

pub async fn submit(
    docs: &Documents,
    actor_id: &str,
    team_id: &str,
    input: NewSubmission,
    now: DateTime<Utc>,
) -> RecordResult<Submission> {
    let team = docs.require::<Team>(team_id).await?;
    let hackathon = docs.require::<Hackathon>(&team.hackathon_id).await?;

    if hackathon.status != Status::Active {
        return Err(RecordError::InvalidState(
            "submissions are only accepted while the hackathon is active".into(),
        ));
    }

    let submission = Submission::new(input, actor_id, now)?;

    docs.update::<Team, _, _>(team_id, |team| {
        if !team.is_member(actor_id) {
            return Err(RecordError::Forbidden(
                "only team members can submit".into(),
            ));
        }
        team.submission = Some(submission.clone());
        Ok(())
    })
    .await?;

    info!("Team {team_id} submitted {}", submission.repository_url);
    Ok(submission)
}

pub async fn score_team(
    docs: &Documents,
    actor_id: &str,
    team_id: &str,
    input: NewScore,
    now: DateTime<Utc>,
) -> RecordResult<Team> {
    let team = docs.require::<Team>(team_id).await?;
    let hackathon = docs.require::<Hackathon>(&team.hackathon_id).await?;
    let organization = docs
        .require::<Organization>(&hackathon.organization_id)
        .await?;

    if !hackathon.is_judge(actor_id, &organization) {
        return Err(RecordError::Forbidden("only judges can score teams".into()));
    }

    if hackathon.status != Status::Judging {
        return Err(RecordError::InvalidState(
            "scores are only accepted during judging".into(),
        ));
    }

    let score = Score::new(input, actor_id, now)?;

    let (team, ()) = docs
        .update::<Team, _, _>(team_id, |team| {
            if team.submission.is_none() {
                return Err(RecordError::InvalidState(
                    "team has not submitted a project".into(),
                ));
            }

            team.scores.retain(|existing| existing.judge_id != actor_id);
            team.scores.push(score.clone());
            Ok(())
        })
        .await?;

    Ok(team)
}

pub async fn leaderboard(docs: &Documents, hackathon_id: &str) -> RecordResult<Vec<LeaderboardEntry>> {
    docs.require::<Hackathon>(hackathon_id).await?;

    Ok(rank(&teams_for(docs, hackathon_id).await?))
}
