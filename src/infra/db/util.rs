use crate::application::repos::RepoError;

const QUERY_CANCELED: &str = "57014";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        sqlx::Error::Database(db)
            if db.is_foreign_key_violation() || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.is_check_violation() || db.message().contains("violates") => {
            RepoError::Integrity {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_map_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn pool_timeouts_map_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
    }

    #[test]
    fn other_errors_are_persistence_failures() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            RepoError::Persistence(_)
        ));
    }
}
