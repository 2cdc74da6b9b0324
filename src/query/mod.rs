//! Gradebook Query Engine
//!
//! Read-only analytics over the record store:
//!
//! - **aggregate**: Averages, top-N ranking and grouping
//! - **temporal**: "Last lesson" resolution
//! - **catalog**: The twelve queries as pure functions over a relationship index
//! - **named**: `NamedQuery`, `QueryKind` and `QueryOutput`
//! - **executor**: Runs queries against a `RecordStore`
//!
//! # Queries
//!
//! ```text
//! top-performers [n]                       subjects-of-student <student>
//! best-in-subject <subject>                subjects-teacher-teaches-student <student> <teacher>
//! group-averages-in-subject <subject>      teacher-average-for-student <teacher> <student>
//! overall-average                          last-lesson-grades <group> <subject>
//! subjects-of-teacher <teacher>            grades-in-group-subject <group> <subject>
//! students-in-group <group>                teacher-average <teacher>
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gradebook::model::GradeScale;
//! use gradebook::query::{NamedQuery, QueryExecutor};
//! use gradebook::store::SqliteStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::open_in_memory(GradeScale::default())?);
//! let executor = QueryExecutor::new(store);
//!
//! if let Some(best) = executor.best_in_subject("Math").await? {
//!     println!("{} ({:.2})", best.student, best.average);
//! }
//!
//! let output = executor.execute(&NamedQuery::OverallAverage).await?;
//! println!("overall: {:?}", output.as_scalar());
//!
//! let group = NamedQuery::StudentsInGroup { group: "Group-1".to_string() };
//! if let Some(names) = executor.execute(&group).await?.as_names() {
//!     println!("Group-1: {}", names.join(", "));
//! }
//! # Ok(())
//! # }
//! ```

mod aggregate;
pub mod catalog;
mod error;
mod executor;
mod named;
mod temporal;

#[cfg(test)]
pub(crate) mod fixtures;

pub use aggregate::{average, average_groups, group_by, top_n};
pub use catalog::{GroupAverage, StudentAverage, StudentGrade};
pub use error::{QueryError, QueryResult};
pub use executor::QueryExecutor;
pub use named::{NamedQuery, QueryKind, QueryOutput};
pub use temporal::{at_latest, latest_timestamp};
