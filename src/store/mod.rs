mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgPool, PgStore, MIGRATIONS};

#[cfg(test)]
mod test_db;
