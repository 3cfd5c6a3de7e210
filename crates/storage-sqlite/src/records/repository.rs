use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use thyro_core::sync::LocalRecordRepositoryTrait;
use thyro_core::Result;

use super::model::LocalRecordDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::local_records;

pub struct LocalRecordRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LocalRecordRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        LocalRecordRepository { pool, writer }
    }
}

#[async_trait]
impl LocalRecordRepositoryTrait for LocalRecordRepository {
    fn load_record(&self, key: &str) -> Result<Option<String>> {
        let mut conn = get_connection(&self.pool)?;
        let row = local_records::table
            .find(key)
            .first::<LocalRecordDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(|row| row.payload))
    }

    async fn save_record(&self, key: &str, payload: String) -> Result<()> {
        let row = LocalRecordDB {
            record_key: key.to_string(),
            payload,
            updated_at: Utc::now().to_rfc3339(),
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(local_records::table)
                    .values(&row)
                    .on_conflict(local_records::record_key)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete_record(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(local_records::table.find(key))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
