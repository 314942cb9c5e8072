//! Database layer for the Calvault calendar store.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations for the `event` and `modules` tables that the
//! raw event retrieval strategy reads from.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: concurrent readers with a single writer, which
//!   matches a calendar workload that is overwhelmingly reads.
//! - **`r2d2` connection pool**: callers borrow a connection per request and
//!   hand it to the query layer explicitly. Nothing in the workspace keeps a
//!   process-wide database handle.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!` so the schema cannot drift from the queries built
//!   against it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
