use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{RecordError, RecordResult, invalid},
    store::{Collection, Document, Documents},
    utils::{new_id, sanitize_list},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;
    const KIND: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
}

impl User {
    pub fn new(input: NewUser, now: DateTime<Utc>) -> RecordResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(invalid("name must not be empty"));
        }

        let email = input.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(invalid("email must contain '@'"));
        }

        Ok(Self {
            id: new_id(),
            name,
            email,
            skills: sanitize_list(&input.skills),
            interests: sanitize_list(&input.interests),
            created_at: now,
        })
    }

    pub fn apply_profile(&mut self, update: ProfileUpdate) -> RecordResult<()> {
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(invalid("name must not be empty"));
            }
            self.name = name;
        }

        if let Some(skills) = update.skills {
            self.skills = sanitize_list(&skills);
        }

        if let Some(interests) = update.interests {
            self.interests = sanitize_list(&interests);
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Document for Organization {
    const COLLECTION: Collection = Collection::Organizations;
    const KIND: &'static str = "organization";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Organization {
    pub fn new(name: &str, owner_id: &str, now: DateTime<Utc>) -> RecordResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("organization name must not be empty"));
        }

        Ok(Self {
            id: new_id(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            members: vec![owner_id.to_string()],
            created_at: now,
        })
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member == user_id)
    }

    pub fn add_member(&mut self, actor_id: &str, user_id: &str) -> RecordResult<()> {
        if actor_id != self.owner_id {
            return Err(RecordError::Forbidden(
                "only the organization owner can add members".into(),
            ));
        }

        if self.is_member(user_id) {
            return Err(RecordError::Conflict(format!(
                "user {user_id} is already a member"
            )));
        }

        self.members.push(user_id.to_string());
        Ok(())
    }
}

pub async fn create_user(
    docs: &Documents,
    input: NewUser,
    now: DateTime<Utc>,
) -> RecordResult<User> {
    let user = User::new(input, now)?;

    if docs
        .all::<User>()
        .await?
        .iter()
        .any(|existing| existing.email == user.email)
    {
        return Err(RecordError::Conflict(format!(
            "email {} is already registered",
            user.email
        )));
    }

    docs.create(&user).await?;
    Ok(user)
}

pub async fn update_profile(
    docs: &Documents,
    actor_id: &str,
    user_id: &str,
    update: ProfileUpdate,
) -> RecordResult<User> {
    if actor_id != user_id {
        return Err(RecordError::Forbidden(
            "users can only edit their own profile".into(),
        ));
    }

    let (user, ()) = docs
        .update::<User, _, _>(user_id, |user| user.apply_profile(update.clone()))
        .await?;

    Ok(user)
}

pub async fn create_organization(
    docs: &Documents,
    owner_id: &str,
    name: &str,
    now: DateTime<Utc>,
) -> RecordResult<Organization> {
    docs.require::<User>(owner_id).await?;

    let organization = Organization::new(name, owner_id, now)?;
    docs.create(&organization).await?;

    Ok(organization)
}

pub async fn add_organization_member(
    docs: &Documents,
    actor_id: &str,
    organization_id: &str,
    user_id: &str,
) -> RecordResult<Organization> {
    docs.require::<User>(user_id).await?;

    let (organization, ()) = docs
        .update::<Organization, _, _>(organization_id, |organization| {
            organization.add_member(actor_id, user_id)
        })
        .await?;

    Ok(organization)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::memory::MemoryStore;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            skills: vec!["Rust".into(), "rust".into(), "React".into()],
            interests: vec![],
        }
    }

    #[test]
    fn new_user_normalizes_fields() {
        let user = User::new(new_user(" Ada ", "Ada@Example.com"), Utc::now()).unwrap();

        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.skills, vec!["rust", "react"]);
    }

    #[test]
    fn new_user_requires_valid_email() {
        assert!(User::new(new_user("Ada", "nope"), Utc::now()).is_err());
    }

    #[test]
    fn only_owner_adds_members() {
        let mut organization = Organization::new("Acme", "owner", Utc::now()).unwrap();

        assert!(matches!(
            organization.add_member("stranger", "x"),
            Err(RecordError::Forbidden(_))
        ));
        organization.add_member("owner", "x").unwrap();
        assert!(organization.is_member("x"));
        assert!(matches!(
            organization.add_member("owner", "x"),
            Err(RecordError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let docs = Documents::new(Arc::new(MemoryStore::default()));

        create_user(&docs, new_user("Ada", "ada@example.com"), Utc::now())
            .await
            .unwrap();
        let err = create_user(&docs, new_user("Other", "ADA@example.com"), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, RecordError::Conflict(_)));
    }

    #[tokio::test]
    async fn profiles_are_private_to_their_owner() {
        let docs = Documents::new(Arc::new(MemoryStore::default()));
        let user = create_user(&docs, new_user("Ada", "ada@example.com"), Utc::now())
            .await
            .unwrap();

        let update = ProfileUpdate {
            skills: Some(vec!["Go".into()]),
            ..Default::default()
        };
        assert!(
            update_profile(&docs, "someone", &user.id, update.clone())
                .await
                .is_err()
        );

        let updated = update_profile(&docs, &user.id, &user.id, update)
            .await
            .unwrap();
        assert_eq!(updated.skills, vec!["go"]);
    }
}
