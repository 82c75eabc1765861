use super::{CommitIter, CommitSource, SourceInfo};
use crate::error::{ChangegenError, Result};
use crate::model::RawCommit;
use chrono::DateTime;
use gix::{discover, ObjectId, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::cmp::Reverse;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// A git repository on disk, read directly without a hosting service.
pub struct LocalRepo {
    commits: Vec<RawCommit>,
    info: SourceInfo,
}

impl LocalRepo {
    /// Open a repository at `path`, or current dir if `None`, and read the
    /// history reachable from `branch` (falling back to `main`, `master`, then
    /// `HEAD`).
    pub fn open<P: AsRef<Path>>(path: Option<P>, branch: Option<&str>) -> Result<Self> {
        let repo_path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or(std::env::current_dir()?);

        let repo = discover(&repo_path)?;
        let workdir: PathBuf = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        let (branch, tip) = resolve_tip(&repo, branch)?;
        let commits = collect_history(&repo, tip)?;

        let name = workdir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| workdir.display().to_string());

        Ok(Self {
            info: SourceInfo {
                name,
                branch,
                description: None,
                total_commits: Some(commits.len()),
            },
            commits,
        })
    }
}

fn resolve_tip(repo: &Repository, requested: Option<&str>) -> Result<(String, ObjectId)> {
    let lookup = |name: &str| repo.rev_parse_single(name).ok().map(|id| id.detach());

    if let Some(branch) = requested {
        if let Some(id) = lookup(branch) {
            return Ok((branch.to_string(), id));
        }
        tracing::warn!(branch, "custom branch not found, falling back to default branch search");
    }
    for candidate in ["main", "master"] {
        if let Some(id) = lookup(candidate) {
            return Ok((candidate.to_string(), id));
        }
    }

    let mut head = repo.head()?;
    let head_name = head
        .referent_name()
        .map(|name| name.shorten().to_string())
        .unwrap_or_else(|| "HEAD".to_string());
    let head_commit = head
        .peel_to_commit_in_place()
        .map_err(|err| ChangegenError::GitRepo(format!("cannot read HEAD ({err}); does the repository have commits?")))?;
    Ok((head_name, head_commit.id))
}

/// Every commit reachable from `tip`, newest first by author date.
fn collect_history(repo: &Repository, tip: ObjectId) -> Result<Vec<RawCommit>> {
    let mut dated: Vec<(i64, RawCommit)> = Vec::new();
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut stack: VecDeque<ObjectId> = VecDeque::from([tip]);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Reading local history...");

    while let Some(commit_id) = stack.pop_back() {
        if !seen.insert(commit_id) {
            continue;
        }

        let commit = repo.find_commit(commit_id)?;
        let secs = match commit.author()?.time() {
            Ok(time) => time.seconds,
            Err(_) => commit.time()?.seconds,
        };
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| ChangegenError::InvalidDate(format!("Invalid timestamp: {secs}")))?;
        let message = commit.message()?;

        dated.push((
            secs,
            RawCommit::new(commit_id.to_string(), timestamp.date_naive(), &message.title.to_string()),
        ));

        for pid in commit.parent_ids() {
            stack.push_back(pid.into());
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    dated.sort_by_key(|(secs, _)| Reverse(*secs));
    Ok(dated.into_iter().map(|(_, commit)| commit).collect())
}

impl CommitSource for LocalRepo {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn commits(&self) -> Result<CommitIter<'_>> {
        Ok(Box::new(self.commits.iter().cloned().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::tempdir;

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_DATE", "2024-06-01T12:00:00Z")
            .env("GIT_COMMITTER_DATE", "2024-06-01T12:00:00Z")
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[test]
    fn reads_history_newest_first() {
        let dir = tempdir().unwrap();
        if !git(dir.path(), &["init", "-q", "-b", "main"]) {
            return;
        }
        git(dir.path(), &["config", "user.email", "dev@example.com"]);
        git(dir.path(), &["config", "user.name", "Dev"]);
        git(dir.path(), &["commit", "-q", "--allow-empty", "-m", "first"]);
        let later = Command::new("git")
            .args(["commit", "-q", "--allow-empty", "-m", "feat: second\n\nbody"])
            .current_dir(dir.path())
            .env("GIT_AUTHOR_DATE", "2024-06-03T12:00:00Z")
            .env("GIT_COMMITTER_DATE", "2024-06-09T12:00:00Z")
            .status()
            .unwrap();
        assert!(later.success());

        let repo = LocalRepo::open(Some(dir.path()), None).unwrap();
        assert_eq!(repo.info().branch, "main");
        assert_eq!(repo.info().total_commits, Some(2));

        let commits: Vec<RawCommit> = repo.commits().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(commits[0].title, "feat: second");
        assert_eq!(commits[0].date.to_string(), "2024-06-03", "dated by author, not committer");
        assert_eq!(commits[1].title, "first");
    }

    #[test]
    fn missing_repository_is_a_source_access_error() {
        let dir = tempdir().unwrap();
        let err = LocalRepo::open(Some(dir.path()), None).err().unwrap();
        assert!(err.is_source_access());
    }
}
