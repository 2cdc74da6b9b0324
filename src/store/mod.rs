//! Gradebook Record Store
//!
//! The persistent side of the system. The query engine only ever sees it
//! through the [`RecordStore`] trait:
//!
//! - **request**: What a query wants to read (`ReadRequest`, `Fetch`, `GradeFilter`)
//! - **snapshot**: The consistent view a read returns, plus `Cancellation`
//! - **sqlite**: SQLite-backed store with the write-side CRUD operations
//! - **error**: Error types
//!
//! # Read Path
//!
//! ```text
//! ReadRequest → BEGIN (deferred) → per-table scan (cancellable) → COMMIT → Snapshot
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gradebook::model::{NewGroup, NewStudent, GradeScale};
//! use gradebook::store::{Cancellation, Fetch, ReadRequest, RecordStore, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open_in_memory(GradeScale::default())?;
//!
//!     let group = store.create_group(NewGroup::new("Group-1")).await?;
//!     store.create_student(NewStudent::new("Ada").in_group(group)).await?;
//!
//!     let request = ReadRequest::new().students(Fetch::All);
//!     let snapshot = store.read(&request, &Cancellation::new()).await?;
//!     assert_eq!(snapshot.students.len(), 1);
//!     Ok(())
//! }
//! ```

mod error;
mod request;
mod snapshot;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use request::{Fetch, GradeFetch, GradeFilter, ReadRequest};
pub use snapshot::{Cancellation, Snapshot};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;

/// Read interface the query engine depends on.
///
/// Implementations must return all tables of one request from a single
/// consistent view, and must check `cancel` while iterating rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the rows selected by `request` as one snapshot
    async fn read(&self, request: &ReadRequest, cancel: &Cancellation) -> StoreResult<Snapshot>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn read(&self, request: &ReadRequest, cancel: &Cancellation) -> StoreResult<Snapshot> {
        (**self).read(request, cancel).await
    }
}
