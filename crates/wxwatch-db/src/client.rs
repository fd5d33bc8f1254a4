//! MySQL store: where it lives, and the pooled client that talks to it

use crate::{schema, DbError, DbResult};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings given as separate fields rather than a URL
#[derive(Clone, PartialEq, Eq)]
pub struct DbParts {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
}

impl Default for DbParts {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: "wxwatch".to_string(),
            username: "wxwatch".to_string(),
            password: None,
        }
    }
}

impl fmt::Debug for DbParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbParts")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where the observation database lives
#[derive(Clone, PartialEq, Eq)]
pub enum DbTarget {
    Url(String),
    Parts(DbParts),
}

// URLs may embed credentials
impl fmt::Debug for DbTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbTarget::Url(_) => f.write_str("Url(<set>)"),
            DbTarget::Parts(parts) => f.debug_tuple("Parts").field(parts).finish(),
        }
    }
}

impl DbTarget {
    pub fn connect_options(&self) -> DbResult<MySqlConnectOptions> {
        match self {
            DbTarget::Url(url) => {
                if url.trim().is_empty() {
                    return Err(DbError::ConfigError("empty database URL".to_string()));
                }
                MySqlConnectOptions::from_str(url.trim())
                    .map_err(|e| DbError::ConfigError(format!("invalid database URL: {}", e)))
            }
            DbTarget::Parts(parts) => {
                if parts.host.trim().is_empty() || parts.database.trim().is_empty() {
                    return Err(DbError::ConfigError(
                        "database host and name are required".to_string(),
                    ));
                }
                let opts = MySqlConnectOptions::new()
                    .host(&parts.host)
                    .port(parts.port)
                    .database(&parts.database)
                    .username(&parts.username);
                Ok(match &parts.password {
                    Some(password) => opts.password(password),
                    None => opts,
                })
            }
        }
    }
}

/// Pooled MySQL observation store
#[derive(Clone)]
pub struct DbClient {
    pool: MySqlPool,
}

impl DbClient {
    /// Connect, verify the connection and make sure both tables exist
    pub async fn open(target: &DbTarget) -> DbResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(target.connect_options()?)
            .await?;
        let client = Self { pool };

        sqlx::query("SELECT 1").execute(&client.pool).await?;
        client.init_schema().await?;

        let existing = client.count_observations().await?;
        info!(existing, "Observation store opened");
        Ok(client)
    }

    pub(crate) fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn init_schema(&self) -> DbResult<()> {
        for ddl in schema::DDL {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Drain and close the pool; clones share it and stop working too
    pub async fn close(self) {
        self.pool.close().await;
        info!("Observation store closed");
    }
}
