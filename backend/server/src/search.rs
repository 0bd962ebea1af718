//! # Meilisearch
//!
//! Search engine behind hackathon discovery.
//!
//!
//!
//! ## Schema
//! - Index for all non-draft hackathons
//! - Fields: id (**string**), title (**string**), description (**string**), tags (**string list**),
//!   status (**string**), organization_id (**string**), starts_at (**unix seconds**)
//!
//!
//!
//! ## Sync
//! - Every create, update, and lifecycle step upserts the hackathon
//! - The store stays the source of truth, hits are ids that get reloaded from it
//! - A failed upsert is logged and the request still succeeds
//!
//!
//!
//! ## Fallback
//! Without `MEILI_URL` the same query runs as a scan over the store. Fine for small
//! deployments and tests, no typo tolerance.
use std::sync::Arc;

use meilisearch_sdk::{
    client::Client,
    settings::{MinWordSizeForTypos, Settings, TypoToleranceSettings},
};
use records::{
    Documents,
    hackathon::{Hackathon, HackathonView, Status},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;

pub const HACKATHON_INDEX: &str = "hackathons";
pub const HACKATHON_ID: &str = "id";
pub const HACKATHON_TITLE: &str = "title";
pub const HACKATHON_DESCRIPTION: &str = "description";
pub const HACKATHON_TAGS: &str = "tags";
pub const HACKATHON_STATUS: &str = "status";
pub const HACKATHON_ORGANIZATION: &str = "organization_id";
pub const HACKATHON_STARTS_AT: &str = "starts_at";
pub const PAGE_SIZE: usize = 20;

#[derive(Serialize, Deserialize, Debug)]
pub struct MeiliHackathon {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: String,
    pub organization_id: String,
    pub starts_at: i64,
}

impl From<&Hackathon> for MeiliHackathon {
    fn from(hackathon: &Hackathon) -> Self {
        Self {
            id: hackathon.id.clone(),
            title: hackathon.title.clone(),
            description: hackathon.description.clone(),
            tags: hackathon.tags.clone(),
            status: hackathon.status.as_str().to_string(),
            organization_id: hackathon.organization_id.clone(),
            starts_at: hackathon.starts_at.timestamp(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub status: Option<Status>,
    pub tag: Option<String>,
    pub page: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SearchPage {
    pub page: usize,
    pub hackathons: Vec<HackathonView>,
}

pub struct SearchIndex {
    meili_client: Option<Arc<Client>>,
    docs: Documents,
}

fn internal<E: std::error::Error + Send + Sync + 'static>(error: E) -> AppError {
    AppError::InternalError(Box::new(error))
}

impl SearchIndex {
    pub async fn new(
        meili_url: Option<&str>,
        meili_admin_key: Option<&str>,
        docs: Documents,
    ) -> anyhow::Result<Self> {
        let Some(meili_url) = meili_url else {
            info!("MEILI_URL not set, searching the store directly");
            return Ok(Self::local(docs));
        };

        let meili_client = Arc::new(Client::new(meili_url, meili_admin_key)?);
        let index = Self {
            meili_client: Some(meili_client.clone()),
            docs,
        };

        meili_client
            .index(HACKATHON_INDEX)
            .set_settings(&init_settings())
            .await?
            .wait_for_completion(&meili_client, None, None)
            .await?;

        index.reindex().await?;
        Ok(index)
    }

    pub fn local(docs: Documents) -> Self {
        Self {
            meili_client: None,
            docs,
        }
    }

    async fn reindex(&self) -> anyhow::Result<()> {
        let Some(meili_client) = &self.meili_client else {
            return Ok(());
        };

        let hackathons: Vec<MeiliHackathon> = self
            .docs
            .all::<Hackathon>()
            .await?
            .iter()
            .filter(|hackathon| hackathon.status != Status::Draft)
            .map(MeiliHackathon::from)
            .collect();

        let _result = meili_client
            .index(HACKATHON_INDEX)
            .add_or_update(&hackathons, Some(HACKATHON_ID))
            .await?
            .wait_for_completion(meili_client, None, None)
            .await?;

        #[cfg(feature = "verbose")]
        println!("Meili task result: {:?}", _result);

        info!("Indexed {} hackathons", hackathons.len());
        Ok(())
    }

    /// Pushes the latest version of a hackathon, drafts are removed from the index.
    pub async fn upsert(&self, hackathon: &Hackathon) {
        let Some(meili_client) = &self.meili_client else {
            return;
        };

        let index = meili_client.index(HACKATHON_INDEX);
        let result = if hackathon.status == Status::Draft {
            index.delete_document(&hackathon.id).await.map(|_| ())
        } else {
            index
                .add_or_update(&[MeiliHackathon::from(hackathon)], Some(HACKATHON_ID))
                .await
                .map(|_| ())
        };

        if let Err(e) = result {
            warn!("Failed to index hackathon {}: {e}", hackathon.id);
        }
    }

    pub async fn search(&self, query: SearchQuery) -> Result<SearchPage, AppError> {
        let page = query.page.unwrap_or(0);
        let offset = page_offset(page)?;

        let hackathons = match &self.meili_client {
            Some(meili_client) => self.search_meili(meili_client, &query, offset).await?,
            None => self.search_store(&query, offset).await?,
        };

        Ok(SearchPage { page, hackathons })
    }

    async fn search_meili(
        &self,
        meili_client: &Client,
        query: &SearchQuery,
        offset: usize,
    ) -> Result<Vec<HackathonView>, AppError> {
        let filter = meili_filter(query);
        let sort = [format!("{HACKATHON_STARTS_AT}:asc")];
        let sort: Vec<&str> = sort.iter().map(String::as_str).collect();

        let index = meili_client.index(HACKATHON_INDEX);
        let mut search = index.search();
        search
            .with_filter(&filter)
            .with_sort(&sort)
            .with_offset(offset)
            .with_limit(PAGE_SIZE);
        if let Some(q) = query.q.as_deref() {
            search.with_query(q);
        }

        let results = search
            .execute::<MeiliHackathon>()
            .await
            .map_err(internal)?;

        let mut hackathons = Vec::with_capacity(results.hits.len());
        for hit in results.hits {
            if let Some(hackathon) = self.docs.get::<Hackathon>(&hit.result.id).await? {
                hackathons.push(HackathonView::from(&hackathon));
            }
        }

        Ok(hackathons)
    }

    async fn search_store(
        &self,
        query: &SearchQuery,
        offset: usize,
    ) -> Result<Vec<HackathonView>, AppError> {
        let mut hackathons: Vec<Hackathon> = self
            .docs
            .all::<Hackathon>()
            .await?
            .into_iter()
            .filter(|hackathon| matches_query(hackathon, query))
            .collect();

        hackathons.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));

        Ok(hackathons
            .iter()
            .skip(offset)
            .take(PAGE_SIZE)
            .map(HackathonView::from)
            .collect())
    }
}

fn page_offset(page: usize) -> Result<usize, AppError> {
    page.checked_mul(PAGE_SIZE)
        .ok_or_else(|| AppError::Unprocessable(format!("page {page} is out of range")))
}

fn meili_filter(query: &SearchQuery) -> String {
    let mut clauses = vec![format!("{HACKATHON_STATUS} != \"draft\"")];

    if let Some(status) = query.status {
        clauses.push(format!("{HACKATHON_STATUS} = \"{}\"", status.as_str()));
    }

    if let Some(tag) = query.tag.as_deref() {
        clauses.push(format!(
            "{HACKATHON_TAGS} = \"{}\"",
            tag.to_lowercase().replace('"', "")
        ));
    }

    clauses.join(" AND ")
}

pub fn matches_query(hackathon: &Hackathon, query: &SearchQuery) -> bool {
    if hackathon.status == Status::Draft {
        return false;
    }

    if query.status.is_some_and(|status| status != hackathon.status) {
        return false;
    }

    if let Some(tag) = query.tag.as_deref() {
        let tag = tag.to_lowercase();
        if !hackathon.tags.iter().any(|existing| *existing == tag) {
            return false;
        }
    }

    match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            let q = q.to_lowercase();
            hackathon.title.to_lowercase().contains(&q)
                || hackathon.description.to_lowercase().contains(&q)
                || hackathon.tags.iter().any(|tag| tag.contains(&q))
        }
        None => true,
    }
}

fn init_settings() -> Settings {
    Settings::new()
        .with_ranking_rules([
            "sort",
            "words",
            "typo",
            "proximity",
            "exactness",
            "attribute",
        ])
        .with_filterable_attributes([HACKATHON_STATUS, HACKATHON_TAGS, HACKATHON_ORGANIZATION])
        .with_searchable_attributes([HACKATHON_TITLE, HACKATHON_TAGS, HACKATHON_DESCRIPTION])
        .with_sortable_attributes([HACKATHON_STARTS_AT])
        .with_typo_tolerance(TypoToleranceSettings {
            enabled: Some(true),
            disable_on_attributes: None,
            disable_on_words: None,
            min_word_size_for_typos: Some(MinWordSizeForTypos {
                one_typo: Some(5),
                two_typos: Some(9),
            }),
        })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use records::hackathon::{Hackathon, Status};

    use super::{PAGE_SIZE, SearchQuery, init_settings, matches_query, meili_filter, page_offset};

    fn hackathon(status: Status) -> Hackathon {
        let now = Utc::now();
        Hackathon {
            id: "h".into(),
            organization_id: "o".into(),
            title: "Climate Hack".into(),
            description: "Build tools for the planet".into(),
            tags: vec!["ai".into(), "climate".into()],
            status,
            starts_at: now,
            ends_at: now + Duration::days(1),
            registration_deadline: now,
            judging_ends_at: None,
            min_team_size: 1,
            max_team_size: 4,
            max_participants: None,
            allowed_languages: vec![],
            participants: vec![],
            judges: vec![],
            created_by: "u".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn drafts_never_match() {
        assert!(!matches_query(&hackathon(Status::Draft), &SearchQuery::default()));
        assert!(matches_query(&hackathon(Status::Published), &SearchQuery::default()));
    }

    #[test]
    fn query_matches_title_description_and_tags() {
        let published = hackathon(Status::Published);

        for q in ["climate", "PLANET", "ai"] {
            let query = SearchQuery {
                q: Some(q.into()),
                ..Default::default()
            };
            assert!(matches_query(&published, &query), "{q}");
        }

        let query = SearchQuery {
            q: Some("blockchain".into()),
            ..Default::default()
        };
        assert!(!matches_query(&published, &query));
    }

    #[test]
    fn status_and_tag_filters() {
        let active = hackathon(Status::Active);

        let query = SearchQuery {
            status: Some(Status::Published),
            ..Default::default()
        };
        assert!(!matches_query(&active, &query));

        let query = SearchQuery {
            tag: Some("Climate".into()),
            ..Default::default()
        };
        assert!(matches_query(&active, &query));
    }

    #[test]
    fn filter_always_excludes_drafts() {
        let query = SearchQuery {
            status: Some(Status::Active),
            tag: Some("AI".into()),
            ..Default::default()
        };

        assert_eq!(
            meili_filter(&query),
            "status != \"draft\" AND status = \"active\" AND tags = \"ai\""
        );
    }

    #[test]
    fn pages_past_the_address_space_are_rejected() {
        assert_eq!(page_offset(0).unwrap(), 0);
        assert_eq!(page_offset(3).unwrap(), 3 * PAGE_SIZE);
        assert!(page_offset(usize::MAX).is_err());
        assert!(page_offset(usize::MAX / PAGE_SIZE + 1).is_err());
    }

    #[test]
    fn start_time_order_outranks_relevance() {
        let rules = init_settings().ranking_rules.unwrap_or_default();

        assert_eq!(rules.first().map(String::as_str), Some("sort"));
        assert!(rules.contains(&"words".to_string()));
    }
}
