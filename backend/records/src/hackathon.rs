//! # Hackathons
//!
//! A hackathon document embeds every participant record, so registration, team
//! assignment, IDE session state, and monitoring counters all update the same document.
//!
//! ## Lifecycle
//! Draft -> Published -> Active -> Judging -> Completed
//!
//! - Only single forward steps
//! - Draft only moves when an organizer publishes it
//! - Everything after Published can also be driven by the schedule, see [`Hackathon::schedule_target`]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    activity::ActivityLog,
    credentials::{IdeCredentials, end_hackathon_sessions},
    error::{RecordError, RecordResult, invalid, not_found},
    language::Language,
    store::{Collection, Document, Documents},
    user::{Organization, User},
    utils::{new_id, sanitize_list},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Published,
    Active,
    Judging,
    Completed,
}

impl Status {
    pub fn next(self) -> Option<Status> {
        match self {
            Status::Draft => Some(Status::Published),
            Status::Published => Some(Status::Active),
            Status::Active => Some(Status::Judging),
            Status::Judging => Some(Status::Completed),
            Status::Completed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Published => "published",
            Status::Active => "active",
            Status::Judging => "judging",
            Status::Completed => "completed",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionState {
    pub token: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Participant {
    pub user_id: String,
    pub registered_at: DateTime<Utc>,
    pub skills: Vec<String>,
    pub looking_for_team: bool,
    pub team_id: Option<String>,
    pub credentials: Option<IdeCredentials>,
    pub session: Option<SessionState>,
    #[serde(default)]
    pub activity: ActivityLog,
}

/// Participant as shown to other users, without credentials or session tokens.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ParticipantView {
    pub user_id: String,
    pub registered_at: DateTime<Utc>,
    pub skills: Vec<String>,
    pub looking_for_team: bool,
    pub team_id: Option<String>,
    pub has_credentials: bool,
    pub in_session: bool,
}

impl From<&Participant> for ParticipantView {
    fn from(participant: &Participant) -> Self {
        Self {
            user_id: participant.user_id.clone(),
            registered_at: participant.registered_at,
            skills: participant.skills.clone(),
            looking_for_team: participant.looking_for_team,
            team_id: participant.team_id.clone(),
            has_credentials: participant.credentials.is_some(),
            in_session: participant.session.is_some(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Hackathon {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: Status,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub judging_ends_at: Option<DateTime<Utc>>,
    pub min_team_size: u32,
    pub max_team_size: u32,
    pub max_participants: Option<u32>,
    pub allowed_languages: Vec<Language>,
    pub participants: Vec<Participant>,
    pub judges: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Hackathon {
    const COLLECTION: Collection = Collection::Hackathons;
    const KIND: &'static str = "hackathon";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Public shape of a hackathon, participant records collapsed to a count.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HackathonView {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: Status,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub judging_ends_at: Option<DateTime<Utc>>,
    pub min_team_size: u32,
    pub max_team_size: u32,
    pub max_participants: Option<u32>,
    pub allowed_languages: Vec<Language>,
    pub participant_count: usize,
    pub judges: Vec<String>,
}

impl From<&Hackathon> for HackathonView {
    fn from(hackathon: &Hackathon) -> Self {
        Self {
            id: hackathon.id.clone(),
            organization_id: hackathon.organization_id.clone(),
            title: hackathon.title.clone(),
            description: hackathon.description.clone(),
            tags: hackathon.tags.clone(),
            status: hackathon.status,
            starts_at: hackathon.starts_at,
            ends_at: hackathon.ends_at,
            registration_deadline: hackathon.registration_deadline,
            judging_ends_at: hackathon.judging_ends_at,
            min_team_size: hackathon.min_team_size,
            max_team_size: hackathon.max_team_size,
            max_participants: hackathon.max_participants,
            allowed_languages: hackathon.allowed_languages.clone(),
            participant_count: hackathon.participants.len(),
            judges: hackathon.judges.clone(),
        }
    }
}

fn default_min_team_size() -> u32 {
    1
}

fn default_max_team_size() -> u32 {
    4
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewHackathon {
    pub organization_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    #[serde(default)]
    pub judging_ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_min_team_size")]
    pub min_team_size: u32,
    #[serde(default = "default_max_team_size")]
    pub max_team_size: u32,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub allowed_languages: Vec<Language>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct HackathonUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub judging_ends_at: Option<DateTime<Utc>>,
    pub min_team_size: Option<u32>,
    pub max_team_size: Option<u32>,
    pub max_participants: Option<u32>,
    pub allowed_languages: Option<Vec<Language>>,
}

impl HackathonUpdate {
    fn touches_schedule(&self) -> bool {
        self.starts_at.is_some()
            || self.ends_at.is_some()
            || self.registration_deadline.is_some()
            || self.min_team_size.is_some()
            || self.max_team_size.is_some()
            || self.max_participants.is_some()
    }
}

impl Hackathon {
    pub fn new(input: NewHackathon, created_by: &str, now: DateTime<Utc>) -> RecordResult<Self> {
        let mut allowed_languages = input.allowed_languages;
        allowed_languages.sort();
        allowed_languages.dedup();

        let hackathon = Self {
            id: new_id(),
            organization_id: input.organization_id,
            title: input.title.trim().to_string(),
            description: input.description,
            tags: sanitize_list(&input.tags),
            status: Status::Draft,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            registration_deadline: input.registration_deadline,
            judging_ends_at: input.judging_ends_at,
            min_team_size: input.min_team_size,
            max_team_size: input.max_team_size,
            max_participants: input.max_participants,
            allowed_languages,
            participants: Vec::new(),
            judges: Vec::new(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };

        hackathon.validate()?;
        Ok(hackathon)
    }

    pub fn validate(&self) -> RecordResult<()> {
        if self.title.is_empty() {
            return Err(invalid("title must not be empty"));
        }

        if self.registration_deadline > self.starts_at {
            return Err(invalid("registration must close before the hackathon starts"));
        }

        if self.starts_at >= self.ends_at {
            return Err(invalid("hackathon must end after it starts"));
        }

        if let Some(judging_ends_at) = self.judging_ends_at {
            if judging_ends_at < self.ends_at {
                return Err(invalid("judging cannot end before the hackathon ends"));
            }
        }

        if self.min_team_size == 0 || self.min_team_size > self.max_team_size {
            return Err(invalid("team sizes must satisfy 1 <= min <= max"));
        }

        if self.max_participants == Some(0) {
            return Err(invalid("participant cap must be positive"));
        }

        Ok(())
    }

    pub fn apply_update(&mut self, update: HackathonUpdate, now: DateTime<Utc>) -> RecordResult<()> {
        if update.touches_schedule() && !matches!(self.status, Status::Draft | Status::Published) {
            return Err(RecordError::InvalidState(format!(
                "schedule is locked once the hackathon is {}",
                self.status.as_str()
            )));
        }

        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(tags) = update.tags {
            self.tags = sanitize_list(&tags);
        }
        if let Some(starts_at) = update.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(ends_at) = update.ends_at {
            self.ends_at = ends_at;
        }
        if let Some(deadline) = update.registration_deadline {
            self.registration_deadline = deadline;
        }
        if let Some(judging_ends_at) = update.judging_ends_at {
            self.judging_ends_at = Some(judging_ends_at);
        }
        if let Some(min) = update.min_team_size {
            self.min_team_size = min;
        }
        if let Some(max) = update.max_team_size {
            self.max_team_size = max;
        }
        if let Some(cap) = update.max_participants {
            if (cap as usize) < self.participants.len() {
                return Err(invalid("participant cap is below the current registrations"));
            }
            self.max_participants = Some(cap);
        }
        if let Some(mut languages) = update.allowed_languages {
            languages.sort();
            languages.dedup();
            self.allowed_languages = languages;
        }

        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    pub fn advance(&mut self, to: Status, now: DateTime<Utc>) -> RecordResult<()> {
        if self.status.next() != Some(to) {
            return Err(RecordError::InvalidState(format!(
                "cannot move from {} to {}",
                self.status.as_str(),
                to.as_str()
            )));
        }

        self.status = to;
        self.updated_at = now;

        if to == Status::Judging {
            for participant in &mut self.participants {
                participant.session = None;
            }
        }

        Ok(())
    }

    /// Status the schedule says this hackathon should have reached by `now`.
    pub fn schedule_target(&self, now: DateTime<Utc>) -> Status {
        let mut target = self.status;

        loop {
            let due = match target {
                Status::Published => now >= self.starts_at,
                Status::Active => now >= self.ends_at,
                Status::Judging => self.judging_ends_at.is_some_and(|end| now >= end),
                Status::Draft | Status::Completed => false,
            };

            match target.next() {
                Some(next) if due => target = next,
                _ => return target,
            }
        }
    }

    pub fn allows_language(&self, language: Language) -> bool {
        self.allowed_languages.is_empty() || self.allowed_languages.contains(&language)
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn participant_mut(&mut self, user_id: &str) -> RecordResult<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| not_found(format!("participant {user_id}")))
    }

    pub fn is_registered(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn is_judge(&self, user_id: &str, organization: &Organization) -> bool {
        organization.owner_id == user_id || self.judges.iter().any(|judge| judge == user_id)
    }

    pub fn can_manage(&self, user_id: &str, organization: &Organization) -> bool {
        self.created_by == user_id || organization.is_member(user_id)
    }

    pub fn register(
        &mut self,
        user: &User,
        looking_for_team: bool,
        now: DateTime<Utc>,
    ) -> RecordResult<()> {
        if !matches!(self.status, Status::Published | Status::Active) {
            return Err(RecordError::InvalidState(format!(
                "registration is closed while the hackathon is {}",
                self.status.as_str()
            )));
        }

        if now > self.registration_deadline {
            return Err(RecordError::InvalidState(
                "registration deadline has passed".into(),
            ));
        }

        if self.is_registered(&user.id) {
            return Err(RecordError::Conflict(format!(
                "user {} is already registered",
                user.id
            )));
        }

        if let Some(cap) = self.max_participants {
            if self.participants.len() >= cap as usize {
                return Err(RecordError::Conflict("hackathon is full".into()));
            }
        }

        self.participants.push(Participant {
            user_id: user.id.clone(),
            registered_at: now,
            skills: user.skills.clone(),
            looking_for_team,
            team_id: None,
            credentials: None,
            session: None,
            activity: ActivityLog::default(),
        });

        Ok(())
    }

    pub fn withdraw(&mut self, user_id: &str) -> RecordResult<Participant> {
        if !matches!(self.status, Status::Draft | Status::Published) {
            return Err(RecordError::InvalidState(
                "cannot withdraw once the hackathon has started".into(),
            ));
        }

        let index = self
            .participants
            .iter()
            .position(|p| p.user_id == user_id)
            .ok_or_else(|| not_found(format!("participant {user_id}")))?;

        if self.participants[index].team_id.is_some() {
            return Err(RecordError::Conflict(
                "leave your team before withdrawing".into(),
            ));
        }

        Ok(self.participants.remove(index))
    }

    pub fn add_judge(&mut self, judge_id: &str) -> RecordResult<()> {
        if self.judges.iter().any(|judge| judge == judge_id) {
            return Err(RecordError::Conflict(format!(
                "user {judge_id} is already a judge"
            )));
        }

        self.judges.push(judge_id.to_string());
        Ok(())
    }
}

async fn require_manager(
    docs: &Documents,
    hackathon: &Hackathon,
    actor_id: &str,
) -> RecordResult<Organization> {
    let organization = docs
        .require::<Organization>(&hackathon.organization_id)
        .await?;

    if !hackathon.can_manage(actor_id, &organization) {
        return Err(RecordError::Forbidden(
            "only organizers can manage this hackathon".into(),
        ));
    }

    Ok(organization)
}

pub async fn create_hackathon(
    docs: &Documents,
    actor_id: &str,
    input: NewHackathon,
    now: DateTime<Utc>,
) -> RecordResult<Hackathon> {
    let organization = docs
        .require::<Organization>(&input.organization_id)
        .await?;

    if !organization.is_member(actor_id) {
        return Err(RecordError::Forbidden(
            "only organization members can create hackathons".into(),
        ));
    }

    let hackathon = Hackathon::new(input, actor_id, now)?;
    docs.create(&hackathon).await?;

    info!("Hackathon {} created by {actor_id}", hackathon.id);
    Ok(hackathon)
}

pub async fn update_hackathon(
    docs: &Documents,
    actor_id: &str,
    hackathon_id: &str,
    update: HackathonUpdate,
    now: DateTime<Utc>,
) -> RecordResult<Hackathon> {
    let hackathon = docs.require::<Hackathon>(hackathon_id).await?;
    require_manager(docs, &hackathon, actor_id).await?;

    let (hackathon, ()) = docs
        .update::<Hackathon, _, _>(hackathon_id, |hackathon| {
            hackathon.apply_update(update.clone(), now)
        })
        .await?;

    Ok(hackathon)
}

pub async fn advance_hackathon(
    docs: &Documents,
    actor_id: &str,
    hackathon_id: &str,
    to: Status,
    now: DateTime<Utc>,
) -> RecordResult<Hackathon> {
    let hackathon = docs.require::<Hackathon>(hackathon_id).await?;
    require_manager(docs, &hackathon, actor_id).await?;

    let (hackathon, ()) = docs
        .update::<Hackathon, _, _>(hackathon_id, |hackathon| hackathon.advance(to, now))
        .await?;

    if to > Status::Active {
        end_hackathon_sessions(docs, hackathon_id).await?;
    }

    info!("Hackathon {hackathon_id} is now {}", to.as_str());
    Ok(hackathon)
}

/// Advances one step if the schedule says it is due. Used by the lifecycle sweeper.
pub async fn advance_by_schedule(
    docs: &Documents,
    hackathon_id: &str,
    now: DateTime<Utc>,
) -> RecordResult<Option<Status>> {
    let (_, advanced) = docs
        .update::<Hackathon, _, _>(hackathon_id, |hackathon| {
            if hackathon.schedule_target(now) == hackathon.status {
                return Ok(None);
            }

            match hackathon.status.next() {
                Some(next) => {
                    hackathon.advance(next, now)?;
                    Ok(Some(next))
                }
                None => Ok(None),
            }
        })
        .await?;

    if advanced.is_some_and(|status| status > Status::Active) {
        end_hackathon_sessions(docs, hackathon_id).await?;
    }

    Ok(advanced)
}

pub async fn register(
    docs: &Documents,
    actor_id: &str,
    hackathon_id: &str,
    looking_for_team: bool,
    now: DateTime<Utc>,
) -> RecordResult<ParticipantView> {
    let user = docs.require::<User>(actor_id).await?;

    let (hackathon, ()) = docs
        .update::<Hackathon, _, _>(hackathon_id, |hackathon| {
            hackathon.register(&user, looking_for_team, now)
        })
        .await?;

    hackathon
        .participant(actor_id)
        .map(ParticipantView::from)
        .ok_or_else(|| not_found(format!("participant {actor_id}")))
}

pub async fn withdraw(docs: &Documents, actor_id: &str, hackathon_id: &str) -> RecordResult<()> {
    docs.update::<Hackathon, _, _>(hackathon_id, |hackathon| {
        hackathon.withdraw(actor_id).map(|_| ())
    })
    .await?;

    Ok(())
}

pub async fn add_judge(
    docs: &Documents,
    actor_id: &str,
    hackathon_id: &str,
    judge_id: &str,
) -> RecordResult<Hackathon> {
    let hackathon = docs.require::<Hackathon>(hackathon_id).await?;
    let organization = docs
        .require::<Organization>(&hackathon.organization_id)
        .await?;

    if organization.owner_id != actor_id {
        return Err(RecordError::Forbidden(
            "only the organization owner can appoint judges".into(),
        ));
    }

    docs.require::<User>(judge_id).await?;

    let (hackathon, ()) = docs
        .update::<Hackathon, _, _>(hackathon_id, |hackathon| hackathon.add_judge(judge_id))
        .await?;

    Ok(hackathon)
}

pub async fn list_participants(
    docs: &Documents,
    hackathon_id: &str,
) -> RecordResult<Vec<ParticipantView>> {
    let hackathon = docs.require::<Hackathon>(hackathon_id).await?;

    Ok(hackathon
        .participants
        .iter()
        .map(ParticipantView::from)
        .collect())
}

pub async fn require_organizer(
    docs: &Documents,
    actor_id: &str,
    hackathon_id: &str,
) -> RecordResult<Hackathon> {
    let hackathon = docs.require::<Hackathon>(hackathon_id).await?;
    require_manager(docs, &hackathon, actor_id).await?;

    Ok(hackathon)
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;

    pub(crate) fn schedule(now: DateTime<Utc>) -> NewHackathon {
        NewHackathon {
            organization_id: "org".into(),
            title: "Hack Night".into(),
            description: "build things".into(),
            tags: vec!["AI".into()],
            starts_at: now + Duration::days(2),
            ends_at: now + Duration::days(3),
            registration_deadline: now + Duration::days(1),
            judging_ends_at: Some(now + Duration::days(4)),
            min_team_size: 1,
            max_team_size: 2,
            max_participants: Some(2),
            allowed_languages: vec![],
        }
    }

    pub(crate) fn user(id: &str, skills: &[&str]) -> User {
        User {
            id: id.into(),
            name: id.into(),
            email: format!("{id}@example.com"),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            interests: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_inverted_schedule() {
        let now = Utc::now();
        let mut input = schedule(now);
        input.ends_at = input.starts_at;

        assert!(Hackathon::new(input, "u", now).is_err());
    }

    #[test]
    fn rejects_bad_team_sizes() {
        let now = Utc::now();
        let mut input = schedule(now);
        input.min_team_size = 3;

        assert!(Hackathon::new(input, "u", now).is_err());
    }

    #[test]
    fn allowed_languages_are_deduplicated_in_any_order() {
        let now = Utc::now();
        let mut input = schedule(now);
        input.allowed_languages = vec![Language::Python, Language::Bash, Language::Python];

        let mut hackathon = Hackathon::new(input, "u", now).unwrap();
        assert_eq!(hackathon.allowed_languages, vec![Language::Python, Language::Bash]);

        let update = HackathonUpdate {
            allowed_languages: Some(vec![Language::Ruby, Language::Bash, Language::Ruby]),
            ..Default::default()
        };
        hackathon.apply_update(update, now).unwrap();
        assert_eq!(hackathon.allowed_languages, vec![Language::Bash, Language::Ruby]);
    }

    #[test]
    fn lifecycle_only_moves_one_step_forward() {
        let now = Utc::now();
        let mut hackathon = Hackathon::new(schedule(now), "u", now).unwrap();

        assert!(hackathon.advance(Status::Active, now).is_err());
        hackathon.advance(Status::Published, now).unwrap();
        assert!(hackathon.advance(Status::Draft, now).is_err());
        hackathon.advance(Status::Active, now).unwrap();
        hackathon.advance(Status::Judging, now).unwrap();
        hackathon.advance(Status::Completed, now).unwrap();
        assert_eq!(hackathon.status.next(), None);
    }

    #[test]
    fn schedule_target_follows_the_clock() {
        let now = Utc::now();
        let mut hackathon = Hackathon::new(schedule(now), "u", now).unwrap();

        assert_eq!(hackathon.schedule_target(now + Duration::days(10)), Status::Draft);

        hackathon.advance(Status::Published, now).unwrap();
        assert_eq!(hackathon.schedule_target(now), Status::Published);
        assert_eq!(
            hackathon.schedule_target(now + Duration::hours(50)),
            Status::Active
        );
        assert_eq!(
            hackathon.schedule_target(now + Duration::hours(80)),
            Status::Judging
        );
        assert_eq!(
            hackathon.schedule_target(now + Duration::days(5)),
            Status::Completed
        );

        hackathon.judging_ends_at = None;
        assert_eq!(
            hackathon.schedule_target(now + Duration::days(5)),
            Status::Judging
        );
    }

    #[test]
    fn registration_rules() {
        let now = Utc::now();
        let mut hackathon = Hackathon::new(schedule(now), "u", now).unwrap();
        let ada = user("ada", &["rust"]);

        assert!(matches!(
            hackathon.register(&ada, true, now),
            Err(RecordError::InvalidState(_))
        ));

        hackathon.advance(Status::Published, now).unwrap();
        hackathon.register(&ada, true, now).unwrap();
        assert!(matches!(
            hackathon.register(&ada, true, now),
            Err(RecordError::Conflict(_))
        ));

        hackathon.register(&user("bob", &[]), false, now).unwrap();
        assert!(matches!(
            hackathon.register(&user("cy", &[]), false, now),
            Err(RecordError::Conflict(_))
        ));

        assert!(
            hackathon
                .register(&user("dee", &[]), false, now + Duration::days(1) + Duration::seconds(1))
                .is_err()
        );
    }

    #[test]
    fn schedule_is_locked_once_active() {
        let now = Utc::now();
        let mut hackathon = Hackathon::new(schedule(now), "u", now).unwrap();
        hackathon.advance(Status::Published, now).unwrap();
        hackathon.advance(Status::Active, now).unwrap();

        let update = HackathonUpdate {
            ends_at: Some(now + Duration::days(9)),
            ..Default::default()
        };
        assert!(hackathon.apply_update(update, now).is_err());

        let update = HackathonUpdate {
            description: Some("new".into()),
            ..Default::default()
        };
        hackathon.apply_update(update, now).unwrap();
        assert_eq!(hackathon.description, "new");
    }

    #[test]
    fn withdraw_requires_leaving_team_first() {
        let now = Utc::now();
        let mut hackathon = Hackathon::new(schedule(now), "u", now).unwrap();
        hackathon.advance(Status::Published, now).unwrap();
        hackathon.register(&user("ada", &[]), true, now).unwrap();
        hackathon.participant_mut("ada").unwrap().team_id = Some("t".into());

        assert!(hackathon.withdraw("ada").is_err());

        hackathon.participant_mut("ada").unwrap().team_id = None;
        hackathon.withdraw("ada").unwrap();
        assert!(!hackathon.is_registered("ada"));
    }

    #[test]
    fn language_whitelist_defaults_to_everything() {
        let now = Utc::now();
        let mut hackathon = Hackathon::new(schedule(now), "u", now).unwrap();
        assert!(hackathon.allows_language(Language::Ruby));

        hackathon.allowed_languages = vec![Language::Python];
        assert!(hackathon.allows_language(Language::Python));
        assert!(!hackathon.allows_language(Language::Ruby));
    }
}
