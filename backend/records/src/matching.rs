//! # Smart Matching
//!
//! Weighted-sum compatibility between a participant and a team, both described by skill lists.
//!
//! | Term | Weight | Value |
//! |---|---|---|
//! | complement | 0.4 | share of the candidate's skills the team does not have yet |
//! | wanted | 0.4 | share of the team's wanted skills the candidate covers, 0.5 when nothing is wanted |
//! | fit | 0.2 | `1 - size / max`, 0 for a full team |
use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
    error::{RecordError, RecordResult},
    hackathon::Hackathon,
    store::Documents,
    team::{Team, teams_for},
};

const COMPLEMENT_WEIGHT: f64 = 0.4;
const WANTED_WEIGHT: f64 = 0.4;
const FIT_WEIGHT: f64 = 0.2;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TeamMatch {
    pub team_id: String,
    pub name: String,
    pub score: f64,
    pub members: usize,
    pub covers: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ParticipantMatch {
    pub user_id: String,
    pub score: f64,
    pub skills: Vec<String>,
    pub covers: Vec<String>,
}

pub fn compatibility(
    candidate_skills: &[String],
    team_skills: &BTreeSet<String>,
    team_wanted: &[String],
    team_size: usize,
    max_size: usize,
) -> f64 {
    if max_size == 0 || team_size >= max_size {
        return 0.0;
    }

    let complement = if candidate_skills.is_empty() {
        0.0
    } else {
        let new_skills = candidate_skills
            .iter()
            .filter(|skill| !team_skills.contains(*skill))
            .count();
        new_skills as f64 / candidate_skills.len() as f64
    };

    let wanted = if team_wanted.is_empty() {
        0.5
    } else {
        covered(candidate_skills, team_wanted).len() as f64 / team_wanted.len() as f64
    };

    let fit = 1.0 - team_size as f64 / max_size as f64;

    let score = COMPLEMENT_WEIGHT * complement + WANTED_WEIGHT * wanted + FIT_WEIGHT * fit;
    (score * 1000.0).round() / 1000.0
}

fn covered(candidate_skills: &[String], wanted: &[String]) -> Vec<String> {
    wanted
        .iter()
        .filter(|skill| candidate_skills.contains(skill))
        .cloned()
        .collect()
}

fn team_skills(hackathon: &Hackathon, team: &Team) -> BTreeSet<String> {
    team.members
        .iter()
        .filter_map(|member| hackathon.participant(member))
        .flat_map(|participant| participant.skills.iter().cloned())
        .collect()
}

pub fn rank_teams(
    hackathon: &Hackathon,
    teams: &[Team],
    user_id: &str,
    limit: usize,
) -> RecordResult<Vec<TeamMatch>> {
    let participant = hackathon
        .participant(user_id)
        .ok_or_else(|| RecordError::Forbidden("register for the hackathon first".into()))?;

    if participant.team_id.is_some() {
        return Err(RecordError::InvalidState("you are already on a team".into()));
    }

    let max_size = hackathon.max_team_size as usize;
    let mut matches: Vec<TeamMatch> = teams
        .iter()
        .filter(|team| team.members.len() < max_size)
        .map(|team| TeamMatch {
            team_id: team.id.clone(),
            name: team.name.clone(),
            score: compatibility(
                &participant.skills,
                &team_skills(hackathon, team),
                &team.looking_for,
                team.members.len(),
                max_size,
            ),
            members: team.members.len(),
            covers: covered(&participant.skills, &team.looking_for),
        })
        .collect();

    matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    matches.truncate(limit);

    Ok(matches)
}

pub fn rank_participants(hackathon: &Hackathon, team: &Team, limit: usize) -> Vec<ParticipantMatch> {
    let skills = team_skills(hackathon, team);
    let max_size = hackathon.max_team_size as usize;

    let mut matches: Vec<ParticipantMatch> = hackathon
        .participants
        .iter()
        .filter(|participant| participant.team_id.is_none() && participant.looking_for_team)
        .map(|participant| ParticipantMatch {
            user_id: participant.user_id.clone(),
            score: compatibility(
                &participant.skills,
                &skills,
                &team.looking_for,
                team.members.len(),
                max_size,
            ),
            skills: participant.skills.clone(),
            covers: covered(&participant.skills, &team.looking_for),
        })
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    matches.truncate(limit);

    matches
}

pub async fn recommend_teams(
    docs: &Documents,
    hackathon_id: &str,
    user_id: &str,
    limit: usize,
) -> RecordResult<Vec<TeamMatch>> {
    let hackathon = docs.require::<Hackathon>(hackathon_id).await?;
    let teams = teams_for(docs, hackathon_id).await?;

    rank_teams(&hackathon, &teams, user_id, limit)
}

pub async fn recommend_teammates(
    docs: &Documents,
    team_id: &str,
    actor_id: &str,
    limit: usize,
) -> RecordResult<Vec<ParticipantMatch>> {
    let team = docs.require::<Team>(team_id).await?;
    if !team.is_member(actor_id) {
        return Err(RecordError::Forbidden(
            "only team members can look for teammates".into(),
        ));
    }

    let hackathon = docs.require::<Hackathon>(&team.hackathon_id).await?;

    Ok(rank_participants(&hackathon, &team, limit))
}
