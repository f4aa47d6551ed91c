//! `git2` implementation of the version-control facade

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, DiffFormat, ErrorCode, IndexAddOption, Repository,
    RepositoryInitOptions, Signature, Sort,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{CommitInfo, RepoInfo, VersionControl};
use crate::config::GitConfig;
use crate::{Error, Result};

/// Metadata file committed at the root of every repo
pub const META_FILE: &str = ".braid.toml";

#[derive(Debug, Serialize, Deserialize)]
struct MetaFile {
    name: String,
    created: DateTime<Utc>,
}

/// Working trees stored under one root directory, one per repo id
#[derive(Debug)]
pub struct GitBackend {
    root: PathBuf,
    author_name: String,
    author_email: String,
    target_branch: String,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GitBackend {
    pub fn new(root: impl Into<PathBuf>, git: &GitConfig) -> Self {
        Self {
            root: root.into(),
            author_name: git.author_name.clone(),
            author_email: git.author_email.clone(),
            target_branch: git.target_branch.clone(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working tree directory for a repo
    pub fn repo_path(&self, repo_id: &str) -> Result<PathBuf> {
        let valid = !repo_id.is_empty()
            && repo_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Config(format!("Invalid repository id '{}'", repo_id)));
        }
        Ok(self.root.join(repo_id))
    }

    fn repo_lock(&self, repo_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(repo_id.to_string())
            .or_default()
            .clone()
    }

    /// Run `f` against an existing repo while holding its lock
    fn with_repo<T>(&self, repo_id: &str, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        let path = self.repo_path(repo_id)?;
        let lock = self.repo_lock(repo_id);
        let _guard = lock.lock();

        if !path.join(".git").exists() {
            return Err(Error::RepoNotFound(repo_id.to_string()));
        }

        let repo = Repository::open(&path)?;
        f(&repo)
    }

    fn signature(&self) -> Result<Signature<'static>> {
        Ok(Signature::now(&self.author_name, &self.author_email)?)
    }

    fn commit_worktree(&self, repo: &Repository, message: &str) -> Result<CommitInfo> {
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree = repo.find_tree(index.write_tree()?)?;
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let signature = self.signature()?;
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        let commit = repo.find_commit(oid)?;

        tracing::debug!(commit = %oid, message, "Committed working tree");
        Ok(commit_info(&commit))
    }
}

fn branch_commit<'r>(repo: &'r Repository, branch: &str) -> Result<Commit<'r>> {
    match repo.find_branch(branch, BranchType::Local) {
        Ok(found) => Ok(found.get().peel_to_commit()?),
        Err(e) if e.code() == ErrorCode::NotFound => {
            Err(Error::Config(format!("Branch '{}' not found", branch)))
        }
        Err(e) => Err(e.into()),
    }
}

fn force_checkout(repo: &Repository, branch: &str) -> Result<()> {
    let refname = format!("refs/heads/{}", branch);
    let commit = branch_commit(repo, branch)?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repo.set_head(&refname)?;
    Ok(())
}

fn commit_info(commit: &Commit<'_>) -> CommitInfo {
    let id = commit.id().to_string();
    let author = commit.author();
    let date = DateTime::from_timestamp(author.when().seconds(), 0)
        .map(|d| d.to_rfc3339())
        .unwrap_or_default();

    CommitInfo {
        hash: id.chars().take(7).collect(),
        message: commit.message().unwrap_or_default().trim_end().to_string(),
        author: author.name().unwrap_or_default().to_string(),
        date,
    }
}

/// Resolve a repo-relative path, refusing anything that escapes the tree
fn worktree_path(repo: &Repository, relative: &str) -> Result<PathBuf> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| Error::Config("Bare repositories are not supported".to_string()))?;

    let rel = Path::new(relative);
    let starts_in_git_dir = rel.components().next() == Some(Component::Normal(OsStr::new(".git")));
    let all_normal = rel.components().all(|c| matches!(c, Component::Normal(_)));

    if relative.is_empty() || !all_normal || starts_in_git_dir {
        return Err(Error::Config(format!("Path '{}' is outside the working tree", relative)));
    }

    Ok(workdir.join(rel))
}

impl VersionControl for GitBackend {
    fn init_repo(&self, repo_id: &str, name: &str) -> Result<()> {
        let path = self.repo_path(repo_id)?;
        let lock = self.repo_lock(repo_id);
        let _guard = lock.lock();

        if path.exists() {
            return Err(Error::Config(format!(
                "Repository directory {} already exists",
                path.display()
            )));
        }
        std::fs::create_dir_all(&path)?;

        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(&self.target_branch);
        let repo = Repository::init_opts(&path, &opts)?;

        let meta = MetaFile {
            name: name.to_string(),
            created: Utc::now(),
        };
        std::fs::write(path.join(META_FILE), toml::to_string(&meta)?)?;
        self.commit_worktree(&repo, "Initial commit: create repo")?;

        tracing::info!(repo_id, name, "Initialized repository");
        Ok(())
    }

    fn repo_info(&self, repo_id: &str) -> Result<RepoInfo> {
        let branches = self.list_branches(repo_id)?;
        self.with_repo(repo_id, |repo| {
            let name = repo
                .workdir()
                .and_then(|dir| std::fs::read_to_string(dir.join(META_FILE)).ok())
                .and_then(|text| toml::from_str::<MetaFile>(&text).ok())
                .map(|meta| meta.name)
                .unwrap_or_else(|| repo_id.to_string());

            let current_branch = match repo.head() {
                Ok(head) => head.shorthand().unwrap_or(self.target_branch.as_str()).to_string(),
                Err(_) => self.target_branch.clone(),
            };

            Ok(RepoInfo {
                id: repo_id.to_string(),
                name,
                current_branch,
                branches,
            })
        })
    }

    fn list_branches(&self, repo_id: &str) -> Result<Vec<String>> {
        self.with_repo(repo_id, |repo| {
            let mut names = Vec::new();
            for branch in repo.branches(Some(BranchType::Local))? {
                let (branch, _) = branch?;
                if let Some(name) = branch.name()? {
                    names.push(name.to_string());
                }
            }
            names.sort();
            Ok(names)
        })
    }

    fn create_branch(&self, repo_id: &str, branch: &str, base: &str) -> Result<()> {
        self.with_repo(repo_id, |repo| {
            if repo.find_branch(branch, BranchType::Local).is_ok() {
                tracing::debug!(repo_id, branch, "Reusing existing branch");
                return Ok(());
            }

            let base_commit = branch_commit(repo, base)?;
            repo.branch(branch, &base_commit, false)?;
            tracing::debug!(repo_id, branch, base, "Created branch");
            Ok(())
        })
    }

    fn checkout(&self, repo_id: &str, branch: &str) -> Result<()> {
        self.with_repo(repo_id, |repo| force_checkout(repo, branch))
    }

    fn ensure_dir(&self, repo_id: &str, path: &str) -> Result<()> {
        self.with_repo(repo_id, |repo| {
            std::fs::create_dir_all(worktree_path(repo, path)?)?;
            Ok(())
        })
    }

    fn write_file(&self, repo_id: &str, path: &str, content: &str) -> Result<()> {
        self.with_repo(repo_id, |repo| {
            let full = worktree_path(repo, path)?;
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
            Ok(())
        })
    }

    fn read_file_at_branch(&self, repo_id: &str, branch: &str, path: &str) -> Result<Option<String>> {
        self.with_repo(repo_id, |repo| {
            worktree_path(repo, path)?;
            let tree = branch_commit(repo, branch)?.tree()?;

            match tree.get_path(Path::new(path)) {
                Ok(entry) => {
                    let blob = entry.to_object(repo)?.peel_to_blob()?;
                    Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
                }
                Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn commit_all(&self, repo_id: &str, message: &str) -> Result<CommitInfo> {
        self.with_repo(repo_id, |repo| self.commit_worktree(repo, message))
    }

    fn merge(&self, repo_id: &str, source: &str, target: &str) -> Result<()> {
        self.with_repo(repo_id, |repo| {
            let source_commit = branch_commit(repo, source)?;
            force_checkout(repo, target)?;
            let target_commit = branch_commit(repo, target)?;

            let annotated = repo.find_annotated_commit(source_commit.id())?;
            let (analysis, _) = repo.merge_analysis(&[&annotated])?;

            if analysis.is_up_to_date() {
                tracing::debug!(repo_id, source, target, "Already up to date");
                return Ok(());
            }

            if analysis.is_fast_forward() {
                let mut reference = repo.find_reference(&format!("refs/heads/{}", target))?;
                reference.set_target(
                    source_commit.id(),
                    &format!("Fast-forward {} to {}", target, source),
                )?;
                repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
                tracing::info!(repo_id, source, target, "Fast-forward merge");
                return Ok(());
            }

            let mut index = repo.merge_commits(&target_commit, &source_commit, None)?;
            if index.has_conflicts() {
                return Err(Error::MergeConflict {
                    from_branch: source.to_string(),
                    into_branch: target.to_string(),
                });
            }

            let tree = repo.find_tree(index.write_tree_to(repo)?)?;
            let signature = self.signature()?;
            let message = format!("Merge branch '{}' into {}", source, target);
            repo.commit(
                Some("HEAD"),
                &signature,
                &signature,
                &message,
                &tree,
                &[&target_commit, &source_commit],
            )?;
            repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

            tracing::info!(repo_id, source, target, "Merge commit created");
            Ok(())
        })
    }

    fn branch_diff(&self, repo_id: &str, base: &str, compare: &str) -> Result<String> {
        self.with_repo(repo_id, |repo| {
            let base_tree = branch_commit(repo, base)?.tree()?;
            let compare_tree = branch_commit(repo, compare)?.tree()?;
            let diff = repo.diff_tree_to_tree(Some(&base_tree), Some(&compare_tree), None)?;

            let mut patch = String::new();
            diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
                if matches!(line.origin(), '+' | '-' | ' ') {
                    patch.push(line.origin());
                }
                patch.push_str(&String::from_utf8_lossy(line.content()));
                true
            })?;

            Ok(patch)
        })
    }

    fn log(&self, repo_id: &str, branch: Option<&str>, limit: usize) -> Result<Vec<CommitInfo>> {
        self.with_repo(repo_id, |repo| {
            let mut revwalk = repo.revwalk()?;
            match branch {
                Some(name) => revwalk.push(branch_commit(repo, name)?.id())?,
                None => match repo.head() {
                    Ok(head) => revwalk.push(head.peel_to_commit()?.id())?,
                    Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(Vec::new()),
                    Err(e) => return Err(e.into()),
                },
            }
            revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;

            let mut commits = Vec::new();
            for oid in revwalk.take(limit) {
                commits.push(commit_info(&repo.find_commit(oid?)?));
            }
            Ok(commits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Diff;
    use tempfile::TempDir;

    fn backend() -> (TempDir, GitBackend) {
        let dir = TempDir::new().unwrap();
        let backend = GitBackend::new(dir.path(), &GitConfig::default());
        backend.init_repo("r1", "Notes").unwrap();
        (dir, backend)
    }

    fn commit_file(backend: &GitBackend, branch: &str, path: &str, content: &str) {
        backend.checkout("r1", branch).unwrap();
        backend.write_file("r1", path, content).unwrap();
        backend.commit_all("r1", &format!("write {}", path)).unwrap();
    }

    #[test]
    fn test_init_repo_creates_main_with_meta() {
        let (_dir, backend) = backend();
        let info = backend.repo_info("r1").unwrap();

        assert_eq!(info.name, "Notes");
        assert_eq!(info.current_branch, "main");
        assert_eq!(info.branches, vec!["main"]);

        let meta = backend.read_file_at_branch("r1", "main", META_FILE).unwrap().unwrap();
        assert!(meta.contains("name = \"Notes\""));

        let log = backend.log("r1", None, 10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].author, "Braid");
        assert_eq!(log[0].hash.len(), 7);

        assert!(backend.init_repo("r1", "Again").is_err());
    }

    #[test]
    fn test_unknown_and_invalid_repo_ids() {
        let (_dir, backend) = backend();
        assert!(matches!(backend.list_branches("nope"), Err(Error::RepoNotFound(_))));
        assert!(matches!(backend.list_branches("../r1"), Err(Error::Config(_))));
    }

    #[test]
    fn test_create_branch_is_idempotent_and_based_on_target() {
        let (_dir, backend) = backend();
        backend.create_branch("r1", "issue/a-claude", "main").unwrap();
        commit_file(&backend, "issue/a-claude", "a.md", "from a\n");

        // HEAD is on issue/a-claude, but the new branch starts from main
        backend.create_branch("r1", "issue/b-claude", "main").unwrap();
        assert!(backend
            .read_file_at_branch("r1", "issue/b-claude", "a.md")
            .unwrap()
            .is_none());

        // Re-creating keeps the existing tip
        backend.create_branch("r1", "issue/a-claude", "main").unwrap();
        assert_eq!(
            backend.read_file_at_branch("r1", "issue/a-claude", "a.md").unwrap().as_deref(),
            Some("from a\n")
        );

        assert!(matches!(
            backend.create_branch("r1", "x", "missing"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_checkout_switches_working_tree() {
        let (dir, backend) = backend();
        backend.create_branch("r1", "feature", "main").unwrap();
        commit_file(&backend, "feature", "notes/one.md", "one\n");

        let file = dir.path().join("r1").join("notes/one.md");
        assert!(file.exists());

        backend.checkout("r1", "main").unwrap();
        assert!(!file.exists());
        assert_eq!(backend.repo_info("r1").unwrap().current_branch, "main");
    }

    #[test]
    fn test_paths_must_stay_inside_worktree() {
        let (_dir, backend) = backend();
        for bad in ["", "../escape.md", "/etc/passwd", ".git/config", "a/../../b"] {
            assert!(backend.write_file("r1", bad, "x").is_err(), "accepted {}", bad);
        }
        backend.ensure_dir("r1", "outputs/claude").unwrap();
        backend.write_file("r1", "outputs/claude/x.md", "ok").unwrap();
    }

    #[test]
    fn test_fast_forward_merge() {
        let (_dir, backend) = backend();
        backend.create_branch("r1", "feature", "main").unwrap();
        commit_file(&backend, "feature", "out.md", "result\n");

        backend.merge("r1", "feature", "main").unwrap();

        assert_eq!(
            backend.read_file_at_branch("r1", "main", "out.md").unwrap().as_deref(),
            Some("result\n")
        );
        assert_eq!(backend.repo_info("r1").unwrap().current_branch, "main");
        assert_eq!(backend.log("r1", Some("main"), 10).unwrap()[0].message, "write out.md");

        // Merging again is a no-op
        backend.merge("r1", "feature", "main").unwrap();
    }

    #[test]
    fn test_divergent_merge_creates_merge_commit() {
        let (_dir, backend) = backend();
        backend.create_branch("r1", "a", "main").unwrap();
        backend.create_branch("r1", "b", "main").unwrap();
        commit_file(&backend, "a", "a.md", "a\n");
        commit_file(&backend, "b", "b.md", "b\n");

        backend.merge("r1", "a", "main").unwrap();
        backend.merge("r1", "b", "main").unwrap();

        assert!(backend.read_file_at_branch("r1", "main", "a.md").unwrap().is_some());
        assert!(backend.read_file_at_branch("r1", "main", "b.md").unwrap().is_some());
        let head = &backend.log("r1", Some("main"), 1).unwrap()[0];
        assert_eq!(head.message, "Merge branch 'b' into main");
    }

    #[test]
    fn test_conflicting_merge_is_reported() {
        let (_dir, backend) = backend();
        backend.create_branch("r1", "a", "main").unwrap();
        backend.create_branch("r1", "b", "main").unwrap();
        commit_file(&backend, "a", "same.md", "from a\n");
        commit_file(&backend, "b", "same.md", "from b\n");

        backend.merge("r1", "a", "main").unwrap();
        let err = backend.merge("r1", "b", "main").unwrap_err();
        assert!(matches!(err, Error::MergeConflict { .. }));
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_branch_diff_applies_back_onto_base() {
        let (dir, backend) = backend();
        backend.create_branch("r1", "feature", "main").unwrap();
        commit_file(&backend, "feature", "outputs/claude/I1.md", "# Answer\n\nHello\n");

        let patch = backend.branch_diff("r1", "main", "feature").unwrap();
        assert!(patch.contains("+++ b/outputs/claude/I1.md"));
        assert!(patch.contains("+Hello"));
        assert!(!patch.contains(META_FILE));

        let repo = Repository::open(dir.path().join("r1")).unwrap();
        let base_tree = branch_commit(&repo, "main").unwrap().tree().unwrap();
        let compare_tree = branch_commit(&repo, "feature").unwrap().tree().unwrap();

        let diff = Diff::from_buffer(patch.as_bytes()).unwrap();
        let mut index = repo.apply_to_tree(&base_tree, &diff, None).unwrap();
        let applied = index.write_tree_to(&repo).unwrap();
        assert_eq!(applied, compare_tree.id());

        assert!(backend.branch_diff("r1", "main", "main").unwrap().is_empty());
    }

    #[test]
    fn test_repos_are_independent() {
        let (_dir, backend) = backend();
        backend.init_repo("r2", "Other").unwrap();
        backend.create_branch("r2", "only-here", "main").unwrap();

        assert_eq!(backend.list_branches("r1").unwrap(), vec!["main"]);
        assert_eq!(backend.list_branches("r2").unwrap(), vec!["main", "only-here"]);
    }
}
