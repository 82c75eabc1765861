use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChangegenError>;

#[derive(Error, Debug)]
pub enum ChangegenError {
    #[error("Repository not found: {0}")]
    NotFound(String),
    #[error("Access denied: {0}")]
    Unauthorized(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Commit source error: {0}")]
    Source(String),
    #[error("Git repository error: {0}")]
    GitRepo(String),
    #[error("Rewrite error: {0}")]
    Rewrite(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
}

impl ChangegenError {
    /// Source-access failures abort the run; everything else degrades.
    pub fn is_source_access(&self) -> bool {
        matches!(
            self,
            ChangegenError::NotFound(_)
                | ChangegenError::Unauthorized(_)
                | ChangegenError::Network(_)
                | ChangegenError::Source(_)
                | ChangegenError::GitRepo(_)
                | ChangegenError::GitDiscover(_)
        )
    }
}

// Manual From implementations for unboxed to boxed conversions
impl From<gix::object::commit::Error> for ChangegenError {
    fn from(err: gix::object::commit::Error) -> Self {
        ChangegenError::Commit(Box::new(err))
    }
}

impl From<gix::discover::Error> for ChangegenError {
    fn from(err: gix::discover::Error) -> Self {
        ChangegenError::GitDiscover(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for ChangegenError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        ChangegenError::RefFind(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for ChangegenError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        ChangegenError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for ChangegenError {
    fn from(err: gix::objs::decode::Error) -> Self {
        ChangegenError::ObjectDecode(Box::new(err))
    }
}
