use std::path::PathBuf;

use anyhow::Context;
use sqlx::PgPool;
use tracing::debug;

use crate::db;
use crate::mock::{self, MockConfig};
use crate::models::StudentRecord;

/// Where gradebook rows come from. Every read goes back to the source; rows
/// are never cached between requests.
#[derive(Debug, Clone)]
pub enum RowSource {
    Mock(MockConfig),
    File(PathBuf),
    Database,
}

impl RowSource {
    pub fn label(&self) -> String {
        match self {
            RowSource::Mock(config) => format!("{} generated students", config.student_count),
            RowSource::File(path) => path.display().to_string(),
            RowSource::Database => "the gradebook database".to_string(),
        }
    }

    pub async fn load(&self, pool: Option<&PgPool>) -> anyhow::Result<Vec<StudentRecord>> {
        let records = match self {
            RowSource::Mock(config) => mock::generate_records(config),
            RowSource::File(path) => mock::load_document(path)?,
            RowSource::Database => {
                let pool = pool.context("DATABASE_URL must be set to read rows from Postgres")?;
                db::fetch_student_records(pool).await?
            }
        };
        debug!(rows = records.len(), source = %self.label(), "loaded gradebook rows");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn database_source_requires_a_pool() {
        let err = RowSource::Database.load(None).await.unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[tokio::test]
    async fn mock_source_honours_student_count() {
        let source = RowSource::Mock(MockConfig {
            student_count: 4,
            seed: Some(1),
        });
        assert_eq!(source.load(None).await.unwrap().len(), 4);
        assert_eq!(source.label(), "4 generated students");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = RowSource::File(PathBuf::from("/nonexistent/mock_data.json"));
        assert!(source.load(None).await.is_err());
    }
}
