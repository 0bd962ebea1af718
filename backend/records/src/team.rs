//! # Teams
//!
//! Team membership lives in two places: the team document lists its members and each
//! member's participant record on the hackathon points back at the team.
//!
//! ## Write Order
//! 1. Claim the participant record (`team_id` must be empty)
//! 2. Write the team document
//! 3. If the team write fails, release the participant record again
use chrono::{DateTime, Utc};
use rand::{Rng, thread_rng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    credentials::{IdeCredentials, end_member_sessions},
    error::{RecordError, RecordResult, invalid, not_found},
    hackathon::{Hackathon, Status},
    judging::{Score, Submission},
    store::{Collection, Document, Documents},
    utils::{new_id, sanitize_list},
    workspace::Workspace,
};

const INVITE_CODE_LENGTH: usize = 8;
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_TEAM_NAME: usize = 64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Team {
    pub id: String,
    pub hackathon_id: String,
    pub name: String,
    pub leader_id: String,
    pub members: Vec<String>,
    pub invite_code: String,
    pub looking_for: Vec<String>,
    pub credentials: Option<IdeCredentials>,
    #[serde(default)]
    pub workspace: Workspace,
    pub submission: Option<Submission>,
    #[serde(default)]
    pub scores: Vec<Score>,
    pub created_at: DateTime<Utc>,
}

impl Document for Team {
    const COLLECTION: Collection = Collection::Teams;
    const KIND: &'static str = "team";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Team as returned over the API. The invite code is only shown to members.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamView {
    pub id: String,
    pub hackathon_id: String,
    pub name: String,
    pub leader_id: String,
    pub members: Vec<String>,
    pub looking_for: Vec<String>,
    pub invite_code: Option<String>,
    pub has_credentials: bool,
    pub submission: Option<Submission>,
}

impl TeamView {
    pub fn for_viewer(team: &Team, viewer_id: Option<&str>) -> Self {
        let is_member = viewer_id.is_some_and(|viewer| team.is_member(viewer));

        Self {
            id: team.id.clone(),
            hackathon_id: team.hackathon_id.clone(),
            name: team.name.clone(),
            leader_id: team.leader_id.clone(),
            members: team.members.clone(),
            looking_for: team.looking_for.clone(),
            invite_code: is_member.then(|| team.invite_code.clone()),
            has_credentials: team.credentials.is_some(),
            submission: team.submission.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    #[serde(default)]
    pub looking_for: Vec<String>,
}

fn invite_code() -> String {
    let mut rng = thread_rng();

    (0..INVITE_CODE_LENGTH)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

impl Team {
    pub fn new(
        hackathon_id: &str,
        input: NewTeam,
        leader_id: &str,
        now: DateTime<Utc>,
    ) -> RecordResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() || name.len() > MAX_TEAM_NAME {
            return Err(invalid(format!(
                "team name must be 1 to {MAX_TEAM_NAME} characters"
            )));
        }

        Ok(Self {
            id: new_id(),
            hackathon_id: hackathon_id.to_string(),
            name,
            leader_id: leader_id.to_string(),
            members: vec![leader_id.to_string()],
            invite_code: invite_code(),
            looking_for: sanitize_list(&input.looking_for),
            credentials: None,
            workspace: Workspace::default(),
            submission: None,
            scores: Vec::new(),
            created_at: now,
        })
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member == user_id)
    }

    pub fn add_member(&mut self, user_id: &str, max_team_size: u32) -> RecordResult<()> {
        if self.is_member(user_id) {
            return Err(RecordError::Conflict(format!(
                "user {user_id} is already on this team"
            )));
        }

        if self.members.len() >= max_team_size as usize {
            return Err(RecordError::Conflict("team is full".into()));
        }

        self.members.push(user_id.to_string());
        Ok(())
    }

    /// Removes a member. Leadership passes to the longest-standing remaining member.
    pub fn remove_member(&mut self, user_id: &str) -> RecordResult<()> {
        let index = self
            .members
            .iter()
            .position(|member| member == user_id)
            .ok_or_else(|| not_found(format!("member {user_id}")))?;
        self.members.remove(index);

        if self.leader_id == user_id {
            if let Some(next) = self.members.first() {
                self.leader_id = next.clone();
            }
        }

        Ok(())
    }
}

pub async fn teams_for(docs: &Documents, hackathon_id: &str) -> RecordResult<Vec<Team>> {
    let mut teams: Vec<Team> = docs
        .all::<Team>()
        .await?
        .into_iter()
        .filter(|team| team.hackathon_id == hackathon_id)
        .collect();
    teams.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(teams)
}

fn ensure_forming(hackathon: &Hackathon) -> RecordResult<()> {
    if !matches!(hackathon.status, Status::Published | Status::Active) {
        return Err(RecordError::InvalidState(format!(
            "teams cannot change while the hackathon is {}",
            hackathon.status.as_str()
        )));
    }

    Ok(())
}

async fn claim_participant(
    docs: &Documents,
    hackathon_id: &str,
    user_id: &str,
    team_id: &str,
) -> RecordResult<Hackathon> {
    let (hackathon, ()) = docs
        .update::<Hackathon, _, _>(hackathon_id, |hackathon| {
            ensure_forming(hackathon)?;

            let participant = hackathon.participant_mut(user_id).map_err(|_| {
                RecordError::Forbidden("register for the hackathon first".into())
            })?;

            if participant.team_id.is_some() {
                return Err(RecordError::Conflict("you are already on a team".into()));
            }

            participant.team_id = Some(team_id.to_string());
            participant.looking_for_team = false;
            Ok(())
        })
        .await?;

    Ok(hackathon)
}

async fn release_participant(
    docs: &Documents,
    hackathon_id: &str,
    user_id: &str,
    team_id: &str,
) -> RecordResult<()> {
    docs.update::<Hackathon, _, _>(hackathon_id, |hackathon| {
        if let Ok(participant) = hackathon.participant_mut(user_id) {
            if participant.team_id.as_deref() == Some(team_id) {
                participant.team_id = None;
            }
        }
        Ok(())
    })
    .await?;

    Ok(())
}

pub async fn create_team(
    docs: &Documents,
    actor_id: &str,
    hackathon_id: &str,
    input: NewTeam,
    now: DateTime<Utc>,
) -> RecordResult<Team> {
    let team = Team::new(hackathon_id, input, actor_id, now)?;

    let taken = teams_for(docs, hackathon_id)
        .await?
        .iter()
        .any(|existing| existing.name.eq_ignore_ascii_case(&team.name));
    if taken {
        return Err(RecordError::Conflict(format!(
            "team name {} is taken",
            team.name
        )));
    }

    claim_participant(docs, hackathon_id, actor_id, &team.id).await?;

    if let Err(e) = docs.create(&team).await {
        warn!("Rolling back team {} for {actor_id}: {e}", team.id);
        release_participant(docs, hackathon_id, actor_id, &team.id).await?;
        return Err(e);
    }

    info!("Team {} created in {hackathon_id}", team.id);
    Ok(team)
}

pub async fn join_team(
    docs: &Documents,
    actor_id: &str,
    hackathon_id: &str,
    code: &str,
) -> RecordResult<Team> {
    let code = code.trim().to_uppercase();
    let team = teams_for(docs, hackathon_id)
        .await?
        .into_iter()
        .find(|team| team.invite_code == code)
        .ok_or_else(|| not_found("team for invite code"))?;

    let hackathon = claim_participant(docs, hackathon_id, actor_id, &team.id).await?;
    let max_team_size = hackathon.max_team_size;

    match docs
        .update::<Team, _, _>(&team.id, |team| team.add_member(actor_id, max_team_size))
        .await
    {
        Ok((team, ())) => {
            info!("User {actor_id} joined team {}", team.id);
            Ok(team)
        }
        Err(e) => {
            release_participant(docs, hackathon_id, actor_id, &team.id).await?;
            Err(e)
        }
    }
}

async fn detach_member(
    docs: &Documents,
    team_id: &str,
    user_id: &str,
) -> RecordResult<Option<Team>> {
    let team = docs.require::<Team>(team_id).await?;
    let hackathon = docs.require::<Hackathon>(&team.hackathon_id).await?;

    if matches!(hackathon.status, Status::Judging | Status::Completed) {
        return Err(RecordError::InvalidState(
            "team membership is frozen once judging begins".into(),
        ));
    }

    let (team, ()) = docs
        .update::<Team, _, _>(team_id, |team| team.remove_member(user_id))
        .await?;

    release_participant(docs, &team.hackathon_id, user_id, team_id).await?;
    end_member_sessions(docs, &team.hackathon_id, team_id, user_id).await?;

    if team.members.is_empty() {
        docs.delete_when::<Team, _>(team_id, |team| team.members.is_empty())
            .await?;
        info!("Team {team_id} disbanded");
        return Ok(None);
    }

    Ok(Some(team))
}

pub async fn leave_team(docs: &Documents, actor_id: &str, team_id: &str) -> RecordResult<Option<Team>> {
    detach_member(docs, team_id, actor_id).await
}

pub async fn remove_member(
    docs: &Documents,
    actor_id: &str,
    team_id: &str,
    user_id: &str,
) -> RecordResult<Option<Team>> {
    let team = docs.require::<Team>(team_id).await?;

    if team.leader_id != actor_id {
        return Err(RecordError::Forbidden(
            "only the team leader can remove members".into(),
        ));
    }

    if user_id == actor_id {
        return Err(invalid("leaders leave instead of removing themselves"));
    }

    detach_member(docs, team_id, user_id).await
}
