pub mod github;
pub mod local;

pub use github::{parse_github_url, GithubSource};
pub use local::LocalRepo;

use crate::error::Result;
use crate::model::RawCommit;

/// What a commit source knows about the repository it reads.
#[derive(Debug, Clone, Default)]
pub struct SourceInfo {
    pub name: String,
    pub branch: String,
    pub description: Option<String>,
    pub total_commits: Option<usize>,
}

pub type CommitIter<'a> = Box<dyn Iterator<Item = Result<RawCommit>> + 'a>;

/// Yields commits newest first. Iteration is lazy so a caller that stops
/// early does not pay for the rest of the history.
pub trait CommitSource {
    fn info(&self) -> &SourceInfo;

    fn commits(&self) -> Result<CommitIter<'_>>;
}
