//! All writes go through one dedicated connection so SQLite never sees two
//! concurrent writers. Each job runs in its own transaction.

use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use log::error;
use tokio::sync::{mpsc, oneshot};

use thyro_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send>;

enum TxError {
    Job(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Diesel(err)
    }
}

#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl WriteHandle {
    /// Run `job` on the writer connection inside a transaction. An `Err`
    /// from the job rolls the transaction back.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let wrapped: Job = Box::new(move |conn| {
            let result = conn
                .transaction::<T, TxError, _>(|tx_conn| job(tx_conn).map_err(TxError::Job))
                .map_err(|err| match err {
                    TxError::Job(err) => err,
                    TxError::Diesel(err) => StorageError::from(err).into(),
                });
            let _ = reply_tx.send(result);
        });

        self.tx.send(wrapped).map_err(|_| writer_gone())?;
        reply_rx.await.map_err(|_| writer_gone())?
    }
}

fn writer_gone() -> Error {
    Error::Database(DatabaseError::Internal(
        "database writer is not running".to_string(),
    ))
}

/// Start the writer thread. It owns one pooled connection until every
/// [`WriteHandle`] clone is dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

    let spawned = std::thread::Builder::new()
        .name("thyro-db-writer".to_string())
        .spawn(move || {
            let mut conn = match pool.get() {
                Ok(conn) => conn,
                Err(err) => {
                    error!("Database writer could not get a connection: {}", err);
                    return;
                }
            };
            while let Some(job) = rx.blocking_recv() {
                job(&mut *conn);
            }
        });
    if let Err(err) = spawned {
        error!("Failed to start database writer thread: {}", err);
    }

    WriteHandle { tx }
}
