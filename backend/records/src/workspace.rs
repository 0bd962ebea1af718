//! # Team Workspace
//!
//! File collaboration for a team, stored inside the team document.
//!
//! - Branches hold the current files plus the commits made on them
//! - A commit is a full snapshot of the branch files, no diffs
//! - Merging a pull request overlays the source files onto the target by path and
//!   records a merge commit, files only on the target are kept
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{RecordError, RecordResult, invalid, not_found},
    utils::new_id,
};

pub const MAIN_BRANCH: &str = "main";
pub const MAX_PATH_LENGTH: usize = 256;
pub const MAX_FILE_BYTES: usize = 512 * 1024;

static BRANCH_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/-]{1,64}$").unwrap());

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Commit {
    pub id: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<FileEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Branch {
    pub name: String,
    pub files: Vec<FileEntry>,
    pub commits: Vec<Commit>,
    pub created_from: Option<String>,
}

impl Branch {
    fn new(name: &str, files: Vec<FileEntry>, created_from: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            files,
            commits: Vec::new(),
            created_from: created_from.map(str::to_string),
        }
    }

    pub fn file(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|file| file.path == path)
    }

    fn upsert(&mut self, entry: FileEntry) {
        match self.files.iter_mut().find(|file| file.path == entry.path) {
            Some(existing) => existing.content = entry.content,
            None => {
                self.files.push(entry);
                self.files.sort_by(|a, b| a.path.cmp(&b.path));
            }
        }
    }

    fn head_files(&self) -> &[FileEntry] {
        self.commits
            .last()
            .map(|commit| commit.files.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestStatus {
    Open,
    Merged,
    Closed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub number: u32,
    pub title: String,
    pub source: String,
    pub target: String,
    pub author: String,
    pub status: PullRequestStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Branch listing without file contents.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BranchSummary {
    pub name: String,
    pub file_count: usize,
    pub commit_count: usize,
    pub head: Option<String>,
    pub created_from: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Workspace {
    pub branches: Vec<Branch>,
    pub pull_requests: Vec<PullRequest>,
    pub next_pr_number: u32,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            branches: vec![Branch::new(MAIN_BRANCH, Vec::new(), None)],
            pull_requests: Vec::new(),
            next_pr_number: 1,
        }
    }
}

pub fn normalize_path(path: &str) -> RecordResult<String> {
    let trimmed = path.trim().trim_start_matches('/');
    let mut parts = Vec::new();

    for part in trimmed.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(invalid("file paths must not contain '..'")),
            part => parts.push(part),
        }
    }

    let normalized = parts.join("/");
    if normalized.is_empty() {
        return Err(invalid("file path must not be empty"));
    }
    if normalized.len() > MAX_PATH_LENGTH {
        return Err(invalid(format!(
            "file path exceeds {MAX_PATH_LENGTH} characters"
        )));
    }

    Ok(normalized)
}

fn validate_branch_name(name: &str) -> RecordResult<()> {
    if !BRANCH_NAME.is_match(name) {
        return Err(invalid(format!("invalid branch name: {name}")));
    }

    Ok(())
}

impl Workspace {
    pub fn branch(&self, name: &str) -> RecordResult<&Branch> {
        self.branches
            .iter()
            .find(|branch| branch.name == name)
            .ok_or_else(|| not_found(format!("branch {name}")))
    }

    fn branch_mut(&mut self, name: &str) -> RecordResult<&mut Branch> {
        self.branches
            .iter_mut()
            .find(|branch| branch.name == name)
            .ok_or_else(|| not_found(format!("branch {name}")))
    }

    pub fn summaries(&self) -> Vec<BranchSummary> {
        self.branches
            .iter()
            .map(|branch| BranchSummary {
                name: branch.name.clone(),
                file_count: branch.files.len(),
                commit_count: branch.commits.len(),
                head: branch.commits.last().map(|commit| commit.id.clone()),
                created_from: branch.created_from.clone(),
            })
            .collect()
    }

    pub fn create_branch(&mut self, name: &str, from: &str) -> RecordResult<&Branch> {
        validate_branch_name(name)?;

        if self.branch(name).is_ok() {
            return Err(RecordError::Conflict(format!("branch {name} already exists")));
        }

        let files = self.branch(from)?.files.clone();
        self.branches.push(Branch::new(name, files, Some(from)));

        self.branch(name)
    }

    pub fn delete_branch(&mut self, name: &str) -> RecordResult<()> {
        if name == MAIN_BRANCH {
            return Err(RecordError::InvalidState(
                "the main branch cannot be deleted".into(),
            ));
        }

        if self.pull_requests.iter().any(|pr| {
            pr.status == PullRequestStatus::Open && (pr.source == name || pr.target == name)
        }) {
            return Err(RecordError::Conflict(format!(
                "branch {name} has an open pull request"
            )));
        }

        let index = self
            .branches
            .iter()
            .position(|branch| branch.name == name)
            .ok_or_else(|| not_found(format!("branch {name}")))?;
        self.branches.remove(index);

        Ok(())
    }

    pub fn write_file(&mut self, branch: &str, path: &str, content: String) -> RecordResult<String> {
        let path = normalize_path(path)?;

        if content.len() > MAX_FILE_BYTES {
            return Err(invalid(format!("file exceeds {MAX_FILE_BYTES} bytes")));
        }

        self.branch_mut(branch)?.upsert(FileEntry {
            path: path.clone(),
            content,
        });

        Ok(path)
    }

    pub fn delete_file(&mut self, branch: &str, path: &str) -> RecordResult<()> {
        let path = normalize_path(path)?;
        let branch = self.branch_mut(branch)?;

        let index = branch
            .files
            .iter()
            .position(|file| file.path == path)
            .ok_or_else(|| not_found(format!("file {path}")))?;
        branch.files.remove(index);

        Ok(())
    }

    pub fn commit(
        &mut self,
        branch: &str,
        message: &str,
        author: &str,
        now: DateTime<Utc>,
    ) -> RecordResult<Commit> {
        let message = message.trim();
        if message.is_empty() {
            return Err(invalid("commit message must not be empty"));
        }

        let branch = self.branch_mut(branch)?;
        if branch.files.as_slice() == branch.head_files() {
            return Err(RecordError::InvalidState("nothing to commit".into()));
        }

        let commit = Commit {
            id: new_id(),
            message: message.to_string(),
            author: author.to_string(),
            timestamp: now,
            files: branch.files.clone(),
        };
        branch.commits.push(commit.clone());

        Ok(commit)
    }

    pub fn open_pull_request(
        &mut self,
        title: &str,
        source: &str,
        target: &str,
        author: &str,
        now: DateTime<Utc>,
    ) -> RecordResult<PullRequest> {
        let title = title.trim();
        if title.is_empty() {
            return Err(invalid("pull request title must not be empty"));
        }

        if source == target {
            return Err(invalid("source and target branches must differ"));
        }

        self.branch(source)?;
        self.branch(target)?;

        if self.pull_requests.iter().any(|pr| {
            pr.status == PullRequestStatus::Open && pr.source == source && pr.target == target
        }) {
            return Err(RecordError::Conflict(format!(
                "a pull request from {source} into {target} is already open"
            )));
        }

        let pull_request = PullRequest {
            number: self.next_pr_number,
            title: title.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            author: author.to_string(),
            status: PullRequestStatus::Open,
            created_at: now,
            closed_at: None,
        };
        self.next_pr_number += 1;
        self.pull_requests.push(pull_request.clone());

        Ok(pull_request)
    }

    fn open_pull_request_mut(&mut self, number: u32) -> RecordResult<&mut PullRequest> {
        let pull_request = self
            .pull_requests
            .iter_mut()
            .find(|pr| pr.number == number)
            .ok_or_else(|| not_found(format!("pull request #{number}")))?;

        if pull_request.status != PullRequestStatus::Open {
            return Err(RecordError::InvalidState(format!(
                "pull request #{number} is not open"
            )));
        }

        Ok(pull_request)
    }

    pub fn merge_pull_request(
        &mut self,
        number: u32,
        actor: &str,
        now: DateTime<Utc>,
    ) -> RecordResult<PullRequest> {
        let (source, target, title) = {
            let pr = self.open_pull_request_mut(number)?;
            (pr.source.clone(), pr.target.clone(), pr.title.clone())
        };

        let incoming = self.branch(&source)?.files.clone();
        let target_branch = self.branch_mut(&target)?;
        for entry in incoming {
            target_branch.upsert(entry);
        }

        target_branch.commits.push(Commit {
            id: new_id(),
            message: format!("Merge pull request #{number} from {source}: {title}"),
            author: actor.to_string(),
            timestamp: now,
            files: target_branch.files.clone(),
        });

        let pr = self.open_pull_request_mut(number)?;
        pr.status = PullRequestStatus::Merged;
        pr.closed_at = Some(now);

        Ok(pr.clone())
    }

    pub fn close_pull_request(&mut self, number: u32, now: DateTime<Utc>) -> RecordResult<PullRequest> {
        let pr = self.open_pull_request_mut(number)?;
        pr.status = PullRequestStatus::Closed;
        pr.closed_at = Some(now);

        Ok(pr.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn workspace_with_feature() -> Workspace {
        let mut workspace = Workspace::default();
        workspace
            .write_file(MAIN_BRANCH, "README.md", "hello".into())
            .unwrap();
        workspace
            .write_file(MAIN_BRANCH, "src/app.py", "print(1)".into())
            .unwrap();
        workspace
            .commit(MAIN_BRANCH, "initial", "ada", Utc::now())
            .unwrap();
        workspace.create_branch("feature", MAIN_BRANCH).unwrap();
        workspace
    }

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_path("/src//main.py").unwrap(), "src/main.py");
        assert_eq!(normalize_path("./a/./b").unwrap(), "a/b");
        assert!(normalize_path("../etc/passwd").is_err());
        assert!(normalize_path("/").is_err());
        assert!(normalize_path(&"a".repeat(MAX_PATH_LENGTH + 1)).is_err());
    }

    #[test]
    fn branch_names_are_checked() {
        let mut workspace = Workspace::default();

        assert!(workspace.create_branch("has space", MAIN_BRANCH).is_err());
        assert!(workspace.create_branch("", MAIN_BRANCH).is_err());
        assert!(workspace.create_branch(&"b".repeat(65), MAIN_BRANCH).is_err());
        workspace.create_branch(&"b".repeat(64), MAIN_BRANCH).unwrap();
        workspace.create_branch("feature/login", MAIN_BRANCH).unwrap();
        assert!(matches!(
            workspace.create_branch("feature/login", MAIN_BRANCH),
            Err(RecordError::Conflict(_))
        ));
        assert!(workspace.create_branch("x", "missing").is_err());
    }

    #[test]
    fn commit_requires_changes() {
        let mut workspace = Workspace::default();

        assert!(matches!(
            workspace.commit(MAIN_BRANCH, "empty", "ada", Utc::now()),
            Err(RecordError::InvalidState(_))
        ));

        workspace.write_file(MAIN_BRANCH, "a.txt", "1".into()).unwrap();
        assert!(workspace.commit(MAIN_BRANCH, "  ", "ada", Utc::now()).is_err());
        workspace.commit(MAIN_BRANCH, "add a", "ada", Utc::now()).unwrap();

        assert!(workspace.commit(MAIN_BRANCH, "again", "ada", Utc::now()).is_err());
    }

    #[test]
    fn new_branch_copies_files() {
        let workspace = workspace_with_feature();
        let feature = workspace.branch("feature").unwrap();

        assert_eq!(feature.files.len(), 2);
        assert!(feature.commits.is_empty());
        assert_eq!(feature.created_from.as_deref(), Some(MAIN_BRANCH));
    }

    #[test]
    fn merge_overlays_source_onto_target() {
        let mut workspace = workspace_with_feature();
        workspace
            .write_file("feature", "src/app.py", "print(2)".into())
            .unwrap();
        workspace
            .write_file("feature", "src/new.py", "x = 1".into())
            .unwrap();
        workspace.write_file(MAIN_BRANCH, "NOTES", "main only".into()).unwrap();
        workspace.delete_file("feature", "README.md").unwrap();

        let pr = workspace
            .open_pull_request("Update app", "feature", MAIN_BRANCH, "bob", Utc::now())
            .unwrap();
        let merged = workspace
            .merge_pull_request(pr.number, "ada", Utc::now())
            .unwrap();
        assert_eq!(merged.status, PullRequestStatus::Merged);

        let main = workspace.branch(MAIN_BRANCH).unwrap();
        let paths: Vec<_> = main.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["NOTES", "README.md", "src/app.py", "src/new.py"]);
        assert_eq!(main.file("src/app.py").unwrap().content, "print(2)");
        assert!(main.commits.last().unwrap().message.starts_with("Merge pull request #1"));
    }

    #[test]
    fn pull_request_rules() {
        let mut workspace = workspace_with_feature();

        assert!(
            workspace
                .open_pull_request("self", MAIN_BRANCH, MAIN_BRANCH, "a", Utc::now())
                .is_err()
        );
        let pr = workspace
            .open_pull_request("one", "feature", MAIN_BRANCH, "a", Utc::now())
            .unwrap();
        assert!(
            workspace
                .open_pull_request("two", "feature", MAIN_BRANCH, "a", Utc::now())
                .is_err()
        );
        assert!(workspace.delete_branch("feature").is_err());

        workspace.close_pull_request(pr.number, Utc::now()).unwrap();
        assert!(workspace.merge_pull_request(pr.number, "a", Utc::now()).is_err());

        let second = workspace
            .open_pull_request("two", "feature", MAIN_BRANCH, "a", Utc::now())
            .unwrap();
        assert_eq!(second.number, 2);
    }

    #[test]
    fn main_cannot_be_deleted() {
        let mut workspace = workspace_with_feature();

        assert!(workspace.delete_branch(MAIN_BRANCH).is_err());
        workspace.delete_branch("feature").unwrap();
        assert!(workspace.branch("feature").is_err());
    }

    #[test]
    fn oversized_files_are_rejected() {
        let mut workspace = Workspace::default();

        assert!(
            workspace
                .write_file(MAIN_BRANCH, "big.txt", "x".repeat(MAX_FILE_BYTES + 1))
                .is_err()
        );
    }
}
