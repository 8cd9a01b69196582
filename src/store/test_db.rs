use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use serde_json::Value;

use crate::event::EventRecord;
use crate::schema::event_records;
use crate::store::{PgPool, PgStore};

static NEXT_SCHEMA: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct SearchPath(String);

impl CustomizeConnection<PgConnection, r2d2::Error> for SearchPath {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!("SET search_path TO {}", self.0))
            .map_err(r2d2::Error::QueryError)
    }
}

/// A migrated store in its own schema, dropped together with the value.
pub struct TestDb {
    pub store: PgStore,
    pool: PgPool,
    url: String,
    schema: String,
}

impl TestDb {
    /// `None` when DATABASE_URL is not set, callers return early then.
    pub async fn new() -> Result<Option<Self>> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping postgres test");
            return Ok(None);
        };

        let schema = format!(
            "projector_test_{}_{}",
            std::process::id(),
            NEXT_SCHEMA.fetch_add(1, Ordering::SeqCst)
        );

        let mut conn =
            PgConnection::establish(&url).context("Failed to connect to the DATABASE_URL")?;
        conn.batch_execute(&format!("CREATE SCHEMA {schema}"))?;

        let pool = Pool::builder()
            .max_size(4)
            .connection_customizer(Box::new(SearchPath(schema.clone())))
            .build(ConnectionManager::<PgConnection>::new(url.as_str()))?;
        let store = PgStore::from_pool(pool.clone());
        store.run_pending_migrations().await?;

        Ok(Some(Self {
            store,
            pool,
            url,
            schema,
        }))
    }

    pub fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>> {
        Ok(self.pool.get()?)
    }

    /// Appends a record to the event log the way the chain sync service would.
    pub fn insert_event(&self, record: &EventRecord) -> Result<i64> {
        self.insert_raw_event(
            &record.id,
            &record.name,
            Value::Object(record.fields.clone()),
        )
    }

    pub fn insert_raw_event(&self, id: &str, name: &str, payload: Value) -> Result<i64> {
        let seq = diesel::insert_into(event_records::table)
            .values((
                event_records::id.eq(id),
                event_records::name.eq(name),
                event_records::payload.eq(payload),
            ))
            .returning(event_records::seq)
            .get_result::<i64>(&mut self.conn()?)?;
        Ok(seq)
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Ok(mut conn) = PgConnection::establish(&self.url) {
            let _ = conn.batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema));
        }
    }
}
