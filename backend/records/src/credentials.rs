//! # IDE Access
//!
//! Participants (solo) or teams (shared) receive a login id and password for the browser IDE.
//!
//! - Only a peppered SHA-256 hash of the password is stored, the plaintext is returned once
//! - `portal:credentials` maps login ids back to their owner so a login is a single lookup
//! - A successful login opens an [`IdeSession`] whose token is the bearer for every IDE call
//! - Re-issuing credentials or logging in again ends the previous session
use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{
    error::{RecordError, RecordResult},
    hackathon::{Hackathon, SessionState, Status},
    store::{Collection, Document, Documents},
    team::Team,
    utils::new_id,
};

const LOGIN_ID_LENGTH: usize = 10;
const PASSWORD_LENGTH: usize = 16;
const LOWER_ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IdeCredentials {
    pub login_id: String,
    pub password_hash: String,
    pub issued_at: DateTime<Utc>,
}

/// Returned to the caller once, never stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IssuedCredentials {
    pub login_id: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialOwner {
    Participant { user_id: String },
    Team { team_id: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialIndex {
    pub login_id: String,
    pub hackathon_id: String,
    pub owner: CredentialOwner,
}

impl Document for CredentialIndex {
    const COLLECTION: Collection = Collection::Credentials;
    const KIND: &'static str = "credential";

    fn id(&self) -> &str {
        &self.login_id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IdeSession {
    pub token: String,
    pub login_id: String,
    pub hackathon_id: String,
    pub user_id: String,
    pub team_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl Document for IdeSession {
    const COLLECTION: Collection = Collection::Sessions;
    const KIND: &'static str = "session";

    fn id(&self) -> &str {
        &self.token
    }
}

fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    (0..length)
        .map(|_| LOWER_ALPHANUMERIC[rng.gen_range(0..LOWER_ALPHANUMERIC.len())] as char)
        .collect()
}

fn hash_password(pepper: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pepper.as_bytes());
    hasher.update(password.as_bytes());

    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn issue(pepper: &str, now: DateTime<Utc>) -> (IdeCredentials, IssuedCredentials) {
    let login_id = format!("ide-{}", random_string(LOGIN_ID_LENGTH));
    let password: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect();

    (
        IdeCredentials {
            login_id: login_id.clone(),
            password_hash: hash_password(pepper, &password),
            issued_at: now,
        },
        IssuedCredentials { login_id, password },
    )
}

impl IdeCredentials {
    pub fn verify(&self, pepper: &str, password: &str) -> bool {
        constant_time_eq(
            hash_password(pepper, password).as_bytes(),
            self.password_hash.as_bytes(),
        )
    }
}

async fn index_credentials(
    docs: &Documents,
    credentials: &IdeCredentials,
    hackathon_id: &str,
    owner: CredentialOwner,
    previous: Option<IdeCredentials>,
) -> RecordResult<()> {
    docs.create(&CredentialIndex {
        login_id: credentials.login_id.clone(),
        hackathon_id: hackathon_id.to_string(),
        owner,
    })
    .await?;

    if let Some(previous) = previous {
        docs.delete::<CredentialIndex>(&previous.login_id).await?;
    }

    Ok(())
}

pub async fn issue_participant_credentials(
    docs: &Documents,
    actor_id: &str,
    hackathon_id: &str,
    pepper: &str,
    now: DateTime<Utc>,
) -> RecordResult<IssuedCredentials> {
    let (credentials, issued) = issue(pepper, now);

    let (_, previous) = docs
        .update::<Hackathon, _, _>(hackathon_id, |hackathon| {
            if !matches!(hackathon.status, Status::Published | Status::Active) {
                return Err(RecordError::InvalidState(
                    "IDE credentials are only issued before or during the event".into(),
                ));
            }

            let participant = hackathon.participant_mut(actor_id)?;
            Ok(participant.credentials.replace(credentials.clone()))
        })
        .await?;

    if let Some(previous) = &previous {
        end_sessions_for_login(docs, hackathon_id, &previous.login_id).await?;
    }

    index_credentials(
        docs,
        &credentials,
        hackathon_id,
        CredentialOwner::Participant {
            user_id: actor_id.to_string(),
        },
        previous,
    )
    .await?;

    info!("Issued IDE credentials {} to participant {actor_id}", issued.login_id);
    Ok(issued)
}

pub async fn issue_team_credentials(
    docs: &Documents,
    actor_id: &str,
    team_id: &str,
    pepper: &str,
    now: DateTime<Utc>,
) -> RecordResult<IssuedCredentials> {
    let team = docs.require::<Team>(team_id).await?;
    let hackathon = docs.require::<Hackathon>(&team.hackathon_id).await?;

    if !matches!(hackathon.status, Status::Published | Status::Active) {
        return Err(RecordError::InvalidState(
            "IDE credentials are only issued before or during the event".into(),
        ));
    }

    let (credentials, issued) = issue(pepper, now);

    let (_, previous) = docs
        .update::<Team, _, _>(team_id, |team| {
            if team.leader_id != actor_id {
                return Err(RecordError::Forbidden(
                    "only the team leader can issue team credentials".into(),
                ));
            }

            Ok(team.credentials.replace(credentials.clone()))
        })
        .await?;

    if let Some(previous) = &previous {
        end_sessions_for_login(docs, &team.hackathon_id, &previous.login_id).await?;
    }

    index_credentials(
        docs,
        &credentials,
        &team.hackathon_id,
        CredentialOwner::Team {
            team_id: team_id.to_string(),
        },
        previous,
    )
    .await?;

    info!("Issued IDE credentials {} to team {team_id}", issued.login_id);
    Ok(issued)
}

/// Deletes every session of `hackathon_id` that `ends` selects, along with its mirror on
/// the participant record.
async fn end_sessions<F>(docs: &Documents, hackathon_id: &str, ends: F) -> RecordResult<usize>
where
    F: Fn(&IdeSession) -> bool,
{
    let tokens: Vec<String> = docs
        .all::<IdeSession>()
        .await?
        .into_iter()
        .filter(|session| session.hackathon_id == hackathon_id && ends(session))
        .map(|session| session.token)
        .collect();

    if tokens.is_empty() {
        return Ok(0);
    }

    for token in &tokens {
        docs.delete::<IdeSession>(token).await?;
    }

    docs.update::<Hackathon, _, _>(hackathon_id, |hackathon| {
        for participant in &mut hackathon.participants {
            if participant
                .session
                .as_ref()
                .is_some_and(|session| tokens.contains(&session.token))
            {
                participant.session = None;
            }
        }
        Ok(())
    })
    .await?;

    Ok(tokens.len())
}

async fn end_sessions_for_login(
    docs: &Documents,
    hackathon_id: &str,
    login_id: &str,
) -> RecordResult<()> {
    end_sessions(docs, hackathon_id, |session| session.login_id == login_id).await?;
    Ok(())
}

/// Ends the sessions `user_id` opened with the shared credentials of `team_id`.
pub async fn end_member_sessions(
    docs: &Documents,
    hackathon_id: &str,
    team_id: &str,
    user_id: &str,
) -> RecordResult<()> {
    let ended = end_sessions(docs, hackathon_id, |session| {
        session.user_id == user_id && session.team_id.as_deref() == Some(team_id)
    })
    .await?;

    if ended > 0 {
        info!("Ended {ended} IDE sessions of {user_id} after leaving team {team_id}");
    }
    Ok(())
}

/// Ends every session of a hackathon, used once it stops being active.
pub async fn end_hackathon_sessions(docs: &Documents, hackathon_id: &str) -> RecordResult<()> {
    let ended = end_sessions(docs, hackathon_id, |_| true).await?;

    if ended > 0 {
        info!("Ended {ended} IDE sessions in {hackathon_id}");
    }
    Ok(())
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub login_id: String,
    pub password: String,
    /// Required for shared team credentials to know which member is typing.
    #[serde(default)]
    pub user_id: Option<String>,
}

pub async fn login(
    docs: &Documents,
    request: LoginRequest,
    pepper: &str,
    now: DateTime<Utc>,
) -> RecordResult<IdeSession> {
    let rejected = || RecordError::Unauthorized("invalid IDE credentials".into());

    let index = docs
        .get::<CredentialIndex>(&request.login_id)
        .await?
        .ok_or_else(rejected)?;
    let hackathon = docs.require::<Hackathon>(&index.hackathon_id).await?;

    let (stored, user_id, team_id) = match &index.owner {
        CredentialOwner::Participant { user_id } => {
            let participant = hackathon.participant(user_id).ok_or_else(rejected)?;
            (
                participant.credentials.clone(),
                user_id.clone(),
                participant.team_id.clone(),
            )
        }
        CredentialOwner::Team { team_id } => {
            let team = docs.require::<Team>(team_id).await?;
            let user_id = request.user_id.clone().ok_or_else(|| {
                RecordError::Validation("user_id is required for team credentials".into())
            })?;

            if !team.is_member(&user_id) {
                return Err(rejected());
            }

            (team.credentials.clone(), user_id, Some(team_id.clone()))
        }
    };

    let stored = stored
        .filter(|stored| stored.login_id == request.login_id)
        .ok_or_else(rejected)?;
    if !stored.verify(pepper, &request.password) {
        return Err(rejected());
    }

    if hackathon.status != Status::Active {
        return Err(RecordError::InvalidState(
            "the IDE is only open while the hackathon is active".into(),
        ));
    }

    let session = IdeSession {
        token: new_id(),
        login_id: request.login_id.clone(),
        hackathon_id: index.hackathon_id.clone(),
        user_id: user_id.clone(),
        team_id,
        started_at: now,
    };
    docs.create(&session).await?;

    let (_, previous) = docs
        .update::<Hackathon, _, _>(&index.hackathon_id, |hackathon| {
            let participant = hackathon.participant_mut(&user_id)?;
            Ok(participant.session.replace(SessionState {
                token: session.token.clone(),
                started_at: now,
            }))
        })
        .await?;

    if let Some(previous) = previous {
        docs.delete::<IdeSession>(&previous.token).await?;
    }

    info!("IDE session opened for {user_id} in {}", index.hackathon_id);
    Ok(session)
}

pub async fn resolve_session(docs: &Documents, token: &str) -> RecordResult<IdeSession> {
    docs.get::<IdeSession>(token)
        .await?
        .ok_or_else(|| RecordError::Unauthorized("unknown or expired IDE session".into()))
}

pub async fn logout(docs: &Documents, session: &IdeSession) -> RecordResult<()> {
    docs.delete::<IdeSession>(&session.token).await?;

    docs.update::<Hackathon, _, _>(&session.hackathon_id, |hackathon| {
        if let Ok(participant) = hackathon.participant_mut(&session.user_id) {
            if participant
                .session
                .as_ref()
                .is_some_and(|state| state.token == session.token)
            {
                participant.session = None;
            }
        }
        Ok(())
    })
    .await?;

    Ok(())
}
