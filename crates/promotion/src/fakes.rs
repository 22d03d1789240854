//! In-memory fakes for the port traits (testing only).
//!
//! [`MemoryRepositoryService`] models the hosting platform as a set of
//! repositories, pull requests and team memberships held in a `Mutex`, with a
//! journal of every call and per-operation failure injection.
//! [`ScriptedSourceControl`] writes scripted files into the clone directory
//! and, when linked to a [`MemoryRepositoryService`], records pushed heads on
//! the destination branch so post-push verification sees them.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{RemoteResult, RepositoryService, SourceControl};
use crate::{
    AppId, BranchName, BranchProtectionRule, BranchSnapshot, CommitSha, IssueSnapshot, LabelName,
    LockReason, Permission, PullRequestNumber, PullRequestSnapshot, PullRequestState, PushOutcome,
    RemoteServiceError, RepositoryId, RepositorySettings, RepositorySnapshot, SourceControlError,
    TeamSlug, UserLogin,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Operations that only read remote state.
const READ_OPERATIONS: [&str; 6] = [
    "get_pull_request",
    "get_repository",
    "get_branch",
    "is_team_member",
    "get_issue",
    "repository_node_id",
];

// ---------------------------------------------------------------------------
// MemoryRepositoryService
// ---------------------------------------------------------------------------

/// A repository held by [`MemoryRepositoryService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRepository {
    /// Name and URL reported to callers.
    pub snapshot: RepositorySnapshot,
    /// GraphQL node id, `R_<owner/name>`.
    pub node_id: String,
    /// Last settings applied through `edit_repository`.
    pub settings: Option<RepositorySettings>,
    /// Collaborator permissions keyed by login.
    pub collaborators: BTreeMap<String, Permission>,
    /// Team permissions keyed by slug.
    pub teams: BTreeMap<String, Permission>,
    /// Branch heads keyed by branch name.
    pub branches: BTreeMap<String, CommitSha>,
    /// Rules in creation order.
    pub protection_rules: Vec<BranchProtectionRule>,
}

impl MemoryRepository {
    fn new(repo: &RepositoryId, name: AppId) -> Self {
        Self {
            snapshot: RepositorySnapshot {
                name,
                html_url: format!("https://github.com/{repo}"),
            },
            node_id: format!("R_{repo}"),
            settings: None,
            collaborators: BTreeMap::new(),
            teams: BTreeMap::new(),
            branches: BTreeMap::new(),
            protection_rules: Vec::new(),
        }
    }

    /// Whether any protection rule pattern covers `branch`.
    ///
    /// A trailing `/*` matches exactly one further path segment.
    pub fn is_protected(&self, branch: &str) -> bool {
        self.protection_rules.iter().any(|rule| {
            let pattern = rule.pattern.as_str();
            match pattern.strip_suffix('*') {
                Some(prefix) => branch
                    .strip_prefix(prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/')),
                None => pattern == branch,
            }
        })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    pull_requests: HashMap<(String, u64), PullRequestSnapshot>,
    queued_pr_states: VecDeque<PullRequestState>,
    labels: HashMap<u64, Vec<LabelName>>,
    comments: Vec<(u64, String)>,
    locked_issues: HashMap<u64, LockReason>,
    repositories: HashMap<String, MemoryRepository>,
    team_members: HashMap<String, HashSet<String>>,
    failures: HashMap<&'static str, RemoteServiceError>,
    failing_patterns: HashSet<String>,
    created: Vec<String>,
    calls: Vec<String>,
}

/// In-memory hosting platform.
#[derive(Debug, Default)]
pub struct MemoryRepositoryService {
    state: Mutex<MemoryState>,
}

impl MemoryRepositoryService {
    /// An empty platform with no repositories, teams or failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- setup --------------------------------------------------------------

    /// Stores a pull request in `repo`.
    pub fn insert_pull_request(&self, repo: &RepositoryId, pr: PullRequestSnapshot) {
        let mut state = lock(&self.state);
        state
            .pull_requests
            .insert((repo.to_string(), pr.number.as_u64()), pr);
    }

    /// Makes the next `get_pull_request` calls report `states`, one per call,
    /// before falling back to the stored state.
    pub fn queue_pull_request_states(&self, states: impl IntoIterator<Item = PullRequestState>) {
        lock(&self.state).queued_pr_states.extend(states);
    }

    /// Adds `user` to `team`.
    pub fn add_team_member(&self, team: &str, user: &str) {
        lock(&self.state)
            .team_members
            .entry(team.to_string())
            .or_default()
            .insert(user.to_string());
    }

    /// Inserts an existing repository.
    pub fn insert_repository(&self, repo: &RepositoryId) {
        if let Some(name) = AppId::parse(repo.name()) {
            lock(&self.state)
                .repositories
                .insert(repo.to_string(), MemoryRepository::new(repo, name));
        }
    }

    /// Makes every call to `operation` fail with `error`.
    pub fn fail_on(&self, operation: &'static str, error: RemoteServiceError) {
        lock(&self.state).failures.insert(operation, error);
    }

    /// Makes protection rule creation fail for `pattern` only.
    pub fn fail_protection_for(&self, pattern: &str) {
        lock(&self.state).failing_patterns.insert(pattern.to_string());
    }

    /// Records that `branch` of `repo` now points at `head`.
    pub fn record_push(&self, repo: &RepositoryId, branch: &BranchName, head: CommitSha) {
        if let Some(repository) = lock(&self.state).repositories.get_mut(&repo.to_string()) {
            repository.branches.insert(branch.to_string(), head);
        }
    }

    // -- inspection ---------------------------------------------------------

    /// Every call made so far, as `"<operation> <target>"`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// Calls that changed remote state.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !READ_OPERATIONS.iter().any(|op| c.split(' ').next() == Some(*op)))
            .collect()
    }

    /// Full names of repositories created through the port.
    pub fn created_repositories(&self) -> Vec<String> {
        lock(&self.state).created.clone()
    }

    /// Current state of `repo`.
    pub fn repository(&self, repo: &RepositoryId) -> Option<MemoryRepository> {
        lock(&self.state).repositories.get(&repo.to_string()).cloned()
    }

    /// Stored pull request, ignoring queued states.
    pub fn pull_request(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> Option<PullRequestSnapshot> {
        lock(&self.state)
            .pull_requests
            .get(&(repo.to_string(), number.as_u64()))
            .cloned()
    }

    /// Labels last set on `number`.
    pub fn labels(&self, number: PullRequestNumber) -> Vec<LabelName> {
        lock(&self.state)
            .labels
            .get(&number.as_u64())
            .cloned()
            .unwrap_or_default()
    }

    /// Comments posted on `number`, oldest first.
    pub fn comments(&self, number: PullRequestNumber) -> Vec<String> {
        lock(&self.state)
            .comments
            .iter()
            .filter(|(n, _)| *n == number.as_u64())
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Lock reason of `number`; `None` while unlocked.
    pub fn lock_reason(&self, number: PullRequestNumber) -> Option<LockReason> {
        lock(&self.state).locked_issues.get(&number.as_u64()).copied()
    }

    // -- internals ----------------------------------------------------------

    fn begin(
        &self,
        operation: &'static str,
        target: impl std::fmt::Display,
    ) -> Result<MutexGuard<'_, MemoryState>, RemoteServiceError> {
        let mut state = lock(&self.state);
        state.calls.push(format!("{operation} {target}"));
        match state.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(state),
        }
    }
}

fn not_found(operation: &'static str, what: impl std::fmt::Display) -> RemoteServiceError {
    RemoteServiceError::new(operation, Some(404), format!("{what} not found"))
}

fn repository_mut<'a>(
    state: &'a mut MemoryState,
    operation: &'static str,
    repo: &RepositoryId,
) -> RemoteResult<&'a mut MemoryRepository> {
    state
        .repositories
        .get_mut(&repo.to_string())
        .ok_or_else(|| not_found(operation, repo))
}

#[async_trait]
impl RepositoryService for MemoryRepositoryService {
    async fn get_pull_request(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<PullRequestSnapshot> {
        let mut state = self.begin("get_pull_request", format!("{repo}{number}"))?;
        let queued = state.queued_pr_states.pop_front();
        let mut pr = state
            .pull_requests
            .get(&(repo.to_string(), number.as_u64()))
            .cloned()
            .ok_or_else(|| not_found("get_pull_request", number))?;
        if let Some(queued) = queued {
            pr.state = queued;
        }
        Ok(pr)
    }

    async fn get_repository(
        &self,
        repo: &RepositoryId,
    ) -> RemoteResult<Option<RepositorySnapshot>> {
        let state = self.begin("get_repository", repo)?;
        Ok(state
            .repositories
            .get(&repo.to_string())
            .map(|r| r.snapshot.clone()))
    }

    async fn create_repository(
        &self,
        organization: &str,
        name: &AppId,
    ) -> RemoteResult<RepositorySnapshot> {
        let mut state = self.begin("create_repository", format!("{organization}/{name}"))?;
        let repo = RepositoryId::new(organization, name.as_str())
            .ok_or_else(|| {
                RemoteServiceError::new("create_repository", Some(422), "invalid name")
            })?;
        if state.repositories.contains_key(&repo.to_string()) {
            return Err(RemoteServiceError::new(
                "create_repository",
                Some(422),
                "name already exists on this account",
            ));
        }
        let repository = MemoryRepository::new(&repo, name.clone());
        let snapshot = repository.snapshot.clone();
        state.repositories.insert(repo.to_string(), repository);
        state.created.push(repo.to_string());
        Ok(snapshot)
    }

    async fn edit_repository(
        &self,
        repo: &RepositoryId,
        settings: &RepositorySettings,
    ) -> RemoteResult<()> {
        let mut state = self.begin("edit_repository", repo)?;
        repository_mut(&mut state, "edit_repository", repo)?.settings = Some(settings.clone());
        Ok(())
    }

    async fn get_branch(
        &self,
        repo: &RepositoryId,
        branch: &BranchName,
    ) -> RemoteResult<BranchSnapshot> {
        let mut state = self.begin("get_branch", format!("{repo}@{branch}"))?;
        let repository = repository_mut(&mut state, "get_branch", repo)?;
        let head = repository
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| not_found("get_branch", branch))?;
        Ok(BranchSnapshot {
            name: branch.clone(),
            head_sha: head,
            protected: repository.is_protected(branch.as_str()),
        })
    }

    async fn remove_collaborator(&self, repo: &RepositoryId, user: &UserLogin) -> RemoteResult<()> {
        let mut state = self.begin("remove_collaborator", format!("{repo} {user}"))?;
        repository_mut(&mut state, "remove_collaborator", repo)?
            .collaborators
            .remove(user.as_str());
        Ok(())
    }

    async fn add_collaborator(
        &self,
        repo: &RepositoryId,
        user: &UserLogin,
        permission: Permission,
    ) -> RemoteResult<()> {
        let mut state = self.begin("add_collaborator", format!("{repo} {user}"))?;
        repository_mut(&mut state, "add_collaborator", repo)?
            .collaborators
            .insert(user.to_string(), permission);
        Ok(())
    }

    async fn is_team_member(
        &self,
        organization: &str,
        team: &TeamSlug,
        user: &UserLogin,
    ) -> RemoteResult<bool> {
        let state = self.begin("is_team_member", format!("{organization}/{team} {user}"))?;
        Ok(state
            .team_members
            .get(team.as_str())
            .is_some_and(|members| members.contains(user.as_str())))
    }

    async fn grant_team_permission(
        &self,
        organization: &str,
        team: &TeamSlug,
        repo: &RepositoryId,
        permission: Permission,
    ) -> RemoteResult<()> {
        let target = format!("{organization}/{team} {repo}");
        let mut state = self.begin("grant_team_permission", target)?;
        repository_mut(&mut state, "grant_team_permission", repo)?
            .teams
            .insert(team.to_string(), permission);
        Ok(())
    }

    async fn set_labels(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        labels: &[LabelName],
    ) -> RemoteResult<()> {
        let mut state = self.begin("set_labels", format!("{repo}{number}"))?;
        state.labels.insert(number.as_u64(), labels.to_vec());
        Ok(())
    }

    async fn create_issue_comment(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        body: &str,
    ) -> RemoteResult<()> {
        let mut state = self.begin("create_issue_comment", format!("{repo}{number}"))?;
        state.comments.push((number.as_u64(), body.to_string()));
        Ok(())
    }

    async fn close_pull_request(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<()> {
        let mut state = self.begin("close_pull_request", format!("{repo}{number}"))?;
        let pr = state
            .pull_requests
            .get_mut(&(repo.to_string(), number.as_u64()))
            .ok_or_else(|| not_found("close_pull_request", number))?;
        pr.state = PullRequestState::Closed;
        Ok(())
    }

    async fn get_issue(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<IssueSnapshot> {
        let state = self.begin("get_issue", format!("{repo}{number}"))?;
        if !state.pull_requests.contains_key(&(repo.to_string(), number.as_u64())) {
            return Err(not_found("get_issue", number));
        }
        Ok(IssueSnapshot {
            number,
            locked: state.locked_issues.contains_key(&number.as_u64()),
        })
    }

    async fn lock_issue(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        reason: LockReason,
    ) -> RemoteResult<()> {
        let mut state = self.begin("lock_issue", format!("{repo}{number}"))?;
        state.locked_issues.insert(number.as_u64(), reason);
        Ok(())
    }

    async fn repository_node_id(&self, repo: &RepositoryId) -> RemoteResult<String> {
        let mut state = self.begin("repository_node_id", repo)?;
        Ok(repository_mut(&mut state, "repository_node_id", repo)?.node_id.clone())
    }

    async fn create_branch_protection_rule(
        &self,
        repository_node_id: &str,
        rule: &BranchProtectionRule,
    ) -> RemoteResult<String> {
        let mut state = self.begin(
            "create_branch_protection_rule",
            format!("{repository_node_id} {}", rule.pattern),
        )?;
        if state.failing_patterns.contains(rule.pattern.as_str()) {
            return Err(RemoteServiceError::new(
                "create_branch_protection_rule",
                None,
                format!("Name already protected: {}", rule.pattern),
            ));
        }
        let repository = state
            .repositories
            .values_mut()
            .find(|r| r.node_id == repository_node_id)
            .ok_or_else(|| not_found("create_branch_protection_rule", repository_node_id))?;
        repository.protection_rules.push(rule.clone());
        Ok(format!("BPR_{}", repository.protection_rules.len()))
    }
}

// ---------------------------------------------------------------------------
// ScriptedSourceControl
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ScriptedState {
    remotes: HashMap<String, String>,
    calls: Vec<String>,
}

/// Source control whose clones contain scripted files at a scripted HEAD.
#[derive(Debug)]
pub struct ScriptedSourceControl {
    files: Vec<(String, String)>,
    clone_head: CommitSha,
    pushed_head: Option<CommitSha>,
    push_exit_code: Option<i32>,
    push_output: String,
    clone_error: Option<SourceControlError>,
    destination: Option<Arc<MemoryRepositoryService>>,
    state: Mutex<ScriptedState>,
}

impl ScriptedSourceControl {
    /// Clones check out `clone_head`; pushes succeed.
    pub fn new(clone_head: CommitSha) -> Self {
        Self {
            files: Vec::new(),
            clone_head,
            pushed_head: None,
            push_exit_code: Some(0),
            push_output: String::new(),
            clone_error: None,
            destination: None,
            state: Mutex::new(ScriptedState::default()),
        }
    }

    /// Adds a file written into every clone.
    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.push((name.into(), contents.into()));
        self
    }

    /// Records successful pushes on `service` so branch lookups observe them.
    pub fn publishing_to(mut self, service: Arc<MemoryRepositoryService>) -> Self {
        self.destination = Some(service);
        self
    }

    /// Makes the destination observe `head` after a push instead of the clone head.
    pub fn with_pushed_head(mut self, head: CommitSha) -> Self {
        self.pushed_head = Some(head);
        self
    }

    /// Makes pushes exit with `code` and print `output`.
    pub fn with_push_result(mut self, code: Option<i32>, output: impl Into<String>) -> Self {
        self.push_exit_code = code;
        self.push_output = output.into();
        self
    }

    /// Makes clones fail.
    pub fn with_clone_error(mut self, error: SourceControlError) -> Self {
        self.clone_error = Some(error);
        self
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// URL registered for remote `name`.
    pub fn remote_url(&self, name: &str) -> Option<String> {
        lock(&self.state).remotes.get(name).cloned()
    }
}

/// Recovers `owner/name` from the tail of a remote URL.
fn repository_from_url(url: &str) -> Option<RepositoryId> {
    let mut segments = url.trim_end_matches(".git").rsplit('/');
    let name = segments.next()?;
    let owner = segments.next()?;
    RepositoryId::new(owner, name)
}

#[async_trait]
impl SourceControl for ScriptedSourceControl {
    async fn clone_branch(
        &self,
        url: &str,
        branch: &BranchName,
        dest: &Path,
    ) -> Result<(), SourceControlError> {
        lock(&self.state).calls.push(format!("clone {url} {branch}"));
        if let Some(err) = &self.clone_error {
            return Err(err.clone());
        }
        for (name, contents) in &self.files {
            std::fs::write(dest.join(name), contents).map_err(|e| SourceControlError::Spawn {
                program: "fake clone".to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn head_sha(&self, _repo_dir: &Path) -> Result<CommitSha, SourceControlError> {
        lock(&self.state).calls.push("head_sha".to_string());
        Ok(self.clone_head.clone())
    }

    async fn add_remote(
        &self,
        _repo_dir: &Path,
        name: &str,
        url: &str,
    ) -> Result<(), SourceControlError> {
        let mut state = lock(&self.state);
        state.calls.push(format!("add_remote {name}"));
        state.remotes.insert(name.to_string(), url.to_string());
        Ok(())
    }

    async fn push(
        &self,
        _repo_dir: &Path,
        remote: &str,
        local_branch: &BranchName,
        remote_branch: &BranchName,
    ) -> Result<PushOutcome, SourceControlError> {
        let url = {
            let mut state = lock(&self.state);
            state.calls.push(format!("push {remote} {local_branch}:{remote_branch}"));
            state.remotes.get(remote).cloned()
        };
        let outcome = PushOutcome {
            exit_code: self.push_exit_code,
            output: self.push_output.clone(),
        };
        if outcome.succeeded() {
            let repo = url.as_deref().and_then(repository_from_url);
            if let (Some(service), Some(repo)) = (&self.destination, repo) {
                let head = self.pushed_head.clone().unwrap_or_else(|| self.clone_head.clone());
                service.record_push(&repo, remote_branch, head);
            }
        }
        Ok(outcome)
    }
}
