//! Redis-backed primary progress cache.

use audiocore_data::{JobId, ProgressRecord};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::instrument;

use crate::error::{ProgressError, Result};

/// Per-key TTL applied to every progress record in the primary cache.
pub const PRIMARY_TTL_SECS: u64 = 3600;

fn cache_key(job_id: &JobId) -> String {
    format!("progress:{job_id}")
}

/// Thin wrapper around a Redis connection manager, storing JSON-encoded
/// progress records under `progress:{jobId}` with a one-hour TTL.
#[derive(Clone)]
pub struct RedisProgressCache {
    connection: ConnectionManager,
}

impl RedisProgressCache {
    /// Connect using the given Redis URL, returning a managed connection
    /// that reconnects transparently.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed or the initial
    /// connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|source| ProgressError::Primary {
            operation: "connect",
            source,
        })?;
        let connection = ConnectionManager::new(client).await.map_err(|source| ProgressError::Primary {
            operation: "connect",
            source,
        })?;
        Ok(Self { connection })
    }

    /// Write a progress record, refreshing its TTL.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Primary`] if the write fails.
    #[instrument(skip(self, record))]
    pub async fn set(&self, record: &ProgressRecord) -> Result<()> {
        let job_id = JobId::from_string(record.job_id.clone());
        let payload = serde_json::to_string(record).map_err(|_| ProgressError::Corrupt {
            job_id: record.job_id.clone(),
        })?;
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(cache_key(&job_id), payload, PRIMARY_TTL_SECS)
            .await
            .map_err(|source| ProgressError::Primary {
                operation: "set",
                source,
            })
    }

    /// Read a progress record, if present and not expired.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Primary`] on a connection failure and
    /// [`ProgressError::Corrupt`] if the stored payload is not valid JSON.
    #[instrument(skip(self))]
    pub async fn get(&self, job_id: &JobId) -> Result<Option<ProgressRecord>> {
        let mut connection = self.connection.clone();
        let payload: Option<String> = connection.get(cache_key(job_id)).await.map_err(|source| ProgressError::Primary {
            operation: "get",
            source,
        })?;
        match payload {
            Some(raw) => {
                let record = serde_json::from_str(&raw).map_err(|_| ProgressError::Corrupt {
                    job_id: job_id.as_str().to_string(),
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_uses_the_progress_prefix() {
        let job_id = JobId::from_string("7-cafe".to_string());
        assert_eq!(cache_key(&job_id), "progress:7-cafe");
    }
}
