/**
 * Responsibility
 * - repo (Datastore) が上位に伝える意味の定義
 * - 下位のエラー文言は保持する (500 のメッセージに含めるため)
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Db(sqlx::Error),
    #[error("datastore request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("datastore returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("row already exists")]
    Conflict,
    #[error("unexpected datastore response: {0}")]
    Decode(String),
    #[error("invalid datastore endpoint: {0}")]
    Endpoint(String),
}

impl RepoError {
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e
            && dbe.code().as_deref() == Some("23505")
        {
            return RepoError::Conflict;
        }
        RepoError::Db(e)
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        Self::from_sqlx(e)
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
