use anyhow::{anyhow, Context};
use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::Bool;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::Value;
use tracing::info;

use crate::error::StoreError;
use crate::event::EventRecord;
use crate::model::{Document, DocumentId, JobApplication, JobPosting};
use crate::repository::{EventLog, Marked, PendingRecord, Repository, Upserted};
use crate::schema::{event_records, job_applications, job_postings};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Postgres backed store.
///
/// diesel is synchronous, every call is moved onto the blocking pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = job_postings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct PostingRow {
    id: i64,
    contract_address: String,
    company_address: String,
    job_title: Option<String>,
    country: Option<String>,
    city: Option<String>,
    is_remote: bool,
    is_active: bool,
    contract_address_lower_case: String,
    company_address_lower_case: String,
}

impl From<PostingRow> for Document<JobPosting> {
    fn from(row: PostingRow) -> Self {
        Document {
            id: row.id,
            data: JobPosting {
                contract_address: row.contract_address,
                company_address: row.company_address,
                job_title: row.job_title,
                country: row.country,
                city: row.city,
                is_remote: row.is_remote,
                is_active: row.is_active,
                contract_address_lower_case: row.contract_address_lower_case,
                company_address_lower_case: row.company_address_lower_case,
            },
        }
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = job_postings)]
#[diesel(treat_none_as_null = true)]
struct PostingValues<'a> {
    contract_address: &'a str,
    company_address: &'a str,
    job_title: Option<&'a str>,
    country: Option<&'a str>,
    city: Option<&'a str>,
    is_remote: bool,
    is_active: bool,
    contract_address_lower_case: &'a str,
    company_address_lower_case: &'a str,
}

impl<'a> From<&'a JobPosting> for PostingValues<'a> {
    fn from(posting: &'a JobPosting) -> Self {
        PostingValues {
            contract_address: &posting.contract_address,
            company_address: &posting.company_address,
            job_title: posting.job_title.as_deref(),
            country: posting.country.as_deref(),
            city: posting.city.as_deref(),
            is_remote: posting.is_remote,
            is_active: posting.is_active,
            contract_address_lower_case: &posting.contract_address_lower_case,
            company_address_lower_case: &posting.company_address_lower_case,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = job_applications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ApplicationRow {
    id: i64,
    contract_address: String,
    applicant_address: String,
    job_posting_address: Option<String>,
    status: String,
    contract_address_lower_case: String,
    applicant_address_lower_case: String,
    job_posting_address_lower_case: Option<String>,
}

impl TryFrom<ApplicationRow> for Document<JobApplication> {
    type Error = StoreError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|err| StoreError::Corrupt {
            collection: "JobApplications",
            id: row.id.to_string(),
            reason: format!("{err}"),
        })?;

        Ok(Document {
            id: row.id,
            data: JobApplication {
                contract_address: row.contract_address,
                applicant_address: row.applicant_address,
                job_posting_address: row.job_posting_address,
                status,
                contract_address_lower_case: row.contract_address_lower_case,
                applicant_address_lower_case: row.applicant_address_lower_case,
                job_posting_address_lower_case: row.job_posting_address_lower_case,
            },
        })
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = job_applications)]
#[diesel(treat_none_as_null = true)]
struct ApplicationValues<'a> {
    contract_address: &'a str,
    applicant_address: &'a str,
    job_posting_address: Option<&'a str>,
    status: &'static str,
    contract_address_lower_case: &'a str,
    applicant_address_lower_case: &'a str,
    job_posting_address_lower_case: Option<&'a str>,
}

impl<'a> From<&'a JobApplication> for ApplicationValues<'a> {
    fn from(application: &'a JobApplication) -> Self {
        ApplicationValues {
            contract_address: &application.contract_address,
            applicant_address: &application.applicant_address,
            job_posting_address: application.job_posting_address.as_deref(),
            status: application.status.as_str(),
            contract_address_lower_case: &application.contract_address_lower_case,
            applicant_address_lower_case: &application.applicant_address_lower_case,
            job_posting_address_lower_case: application.job_posting_address_lower_case.as_deref(),
        }
    }
}

impl PgStore {
    pub fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(max_connections).build(manager)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_pending_migrations(&self) -> anyhow::Result<()> {
        let pool = self.pool.clone();
        let applied = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let mut conn = pool.get().context("failed to check out a connection")?;
            conn.run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.len())
                // error is not sized, pain to handle the usual way
                .map_err(|err| anyhow!(err))
        })
        .await
        .context("migration task panicked")??;

        info!(applied, "applied pending migrations");
        Ok(())
    }

    async fn interact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl Repository for PgStore {
    async fn find_posting(
        &self,
        contract_address: &str,
    ) -> Result<Option<Document<JobPosting>>, StoreError> {
        let contract_address = contract_address.to_owned();
        self.interact(move |conn| {
            // target sql:
            // SELECT * FROM job_postings
            // WHERE contract_address = "<contract_address>"
            // ORDER BY id LIMIT 1;
            let row = job_postings::table
                .filter(job_postings::contract_address.eq(&contract_address))
                .order_by(job_postings::id)
                .select(PostingRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Document::from))
        })
        .await
    }

    async fn create_posting(&self, posting: &JobPosting) -> Result<DocumentId, StoreError> {
        let posting = posting.clone();
        self.interact(move |conn| {
            let id = diesel::insert_into(job_postings::table)
                .values(PostingValues::from(&posting))
                .returning(job_postings::id)
                .get_result(conn)?;
            Ok(id)
        })
        .await
    }

    async fn update_posting(
        &self,
        id: DocumentId,
        posting: &JobPosting,
    ) -> Result<(), StoreError> {
        let posting = posting.clone();
        self.interact(move |conn| {
            let count = diesel::update(job_postings::table)
                .filter(job_postings::id.eq(id))
                .set(PostingValues::from(&posting))
                .execute(conn)?;

            if count != 1 {
                return Err(StoreError::Corrupt {
                    collection: "JobPostings",
                    id: id.to_string(),
                    reason: "document vanished before update".to_owned(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn upsert_posting(&self, posting: &JobPosting) -> Result<Upserted, StoreError> {
        let posting = posting.clone();
        self.interact(move |conn| {
            // target sql:
            // INSERT INTO job_postings (...) VALUES (...)
            // ON CONFLICT (contract_address) DO UPDATE SET ...
            // RETURNING id, (xmax = 0);
            let values = PostingValues::from(&posting);
            let (id, inserted): (i64, bool) = diesel::insert_into(job_postings::table)
                .values(&values)
                .on_conflict(job_postings::contract_address)
                .do_update()
                .set(&values)
                // xmax is only zero for freshly inserted tuples
                .returning((job_postings::id, sql::<Bool>("xmax = 0")))
                .get_result(conn)?;

            Ok(if inserted {
                Upserted::Created(id)
            } else {
                Upserted::Updated(id)
            })
        })
        .await
    }

    async fn find_application(
        &self,
        contract_address: &str,
    ) -> Result<Option<Document<JobApplication>>, StoreError> {
        let contract_address = contract_address.to_owned();
        self.interact(move |conn| {
            let row = job_applications::table
                .filter(job_applications::contract_address.eq(&contract_address))
                .order_by(job_applications::id)
                .select(ApplicationRow::as_select())
                .first(conn)
                .optional()?;
            row.map(Document::try_from).transpose()
        })
        .await
    }

    async fn create_application(
        &self,
        application: &JobApplication,
    ) -> Result<DocumentId, StoreError> {
        let application = application.clone();
        self.interact(move |conn| {
            let id = diesel::insert_into(job_applications::table)
                .values(ApplicationValues::from(&application))
                .returning(job_applications::id)
                .get_result(conn)?;
            Ok(id)
        })
        .await
    }

    async fn update_application(
        &self,
        id: DocumentId,
        application: &JobApplication,
    ) -> Result<(), StoreError> {
        let application = application.clone();
        self.interact(move |conn| {
            let count = diesel::update(job_applications::table)
                .filter(job_applications::id.eq(id))
                .set(ApplicationValues::from(&application))
                .execute(conn)?;

            if count != 1 {
                return Err(StoreError::Corrupt {
                    collection: "JobApplications",
                    id: id.to_string(),
                    reason: "document vanished before update".to_owned(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn upsert_application(
        &self,
        application: &JobApplication,
    ) -> Result<Upserted, StoreError> {
        let application = application.clone();
        self.interact(move |conn| {
            let values = ApplicationValues::from(&application);
            let (id, inserted): (i64, bool) = diesel::insert_into(job_applications::table)
                .values(&values)
                .on_conflict(job_applications::contract_address)
                .do_update()
                .set(&values)
                .returning((job_applications::id, sql::<Bool>("xmax = 0")))
                .get_result(conn)?;

            Ok(if inserted {
                Upserted::Created(id)
            } else {
                Upserted::Updated(id)
            })
        })
        .await
    }
}

#[async_trait]
impl EventLog for PgStore {
    async fn mark_processed(&self, record: &EventRecord) -> Result<Marked, StoreError> {
        let id = record.id.clone();
        let payload = Value::Object(record.fields.clone());
        self.interact(move |conn| {
            // target sql:
            // UPDATE event_records
            // SET payload = "<payload>", processed = true
            // WHERE id = "<id>"
            // AND processed = false;
            let count = diesel::update(event_records::table)
                .filter(event_records::id.eq(&id))
                // only the delivery that flips the flag counts
                .filter(event_records::processed.eq(false))
                .set((
                    event_records::payload.eq(payload),
                    event_records::processed.eq(true),
                ))
                .execute(conn)?;
            if count == 1 {
                return Ok(Marked::Flipped);
            }

            // nothing flipped, tell a lost race from a record that was never logged
            let exists = diesel::select(diesel::dsl::exists(
                event_records::table.filter(event_records::id.eq(&id)),
            ))
            .get_result::<bool>(conn)?;
            Ok(if exists {
                Marked::AlreadyProcessed
            } else {
                Marked::Missing
            })
        })
        .await
    }

    async fn is_processed(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_owned();
        self.interact(move |conn| {
            let processed = event_records::table
                .filter(event_records::id.eq(&id))
                .select(event_records::processed)
                .first::<bool>(conn)
                .optional()?;
            Ok(processed.unwrap_or(false))
        })
        .await
    }

    async fn pending(
        &self,
        after_seq: i64,
        limit: usize,
    ) -> Result<Vec<PendingRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.interact(move |conn| {
            let rows = event_records::table
                .filter(event_records::seq.gt(after_seq))
                .filter(event_records::processed.eq(false))
                .order_by(event_records::seq)
                .limit(limit)
                .select((
                    event_records::seq,
                    event_records::id,
                    event_records::name,
                    event_records::payload,
                ))
                .load::<(i64, String, String, Value)>(conn)?;

            rows.into_iter()
                .map(|(seq, id, name, payload)| {
                    let Value::Object(fields) = payload else {
                        return Err(StoreError::Corrupt {
                            collection: "events",
                            id,
                            reason: "payload is not an object".to_owned(),
                        });
                    };
                    Ok(PendingRecord {
                        seq,
                        record: EventRecord {
                            id,
                            name,
                            processed: Some(false),
                            fields,
                        },
                    })
                })
                .collect()
        })
        .await
    }
}
