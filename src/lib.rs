//! # Gradebook
//!
//! Academic record store with a read-only query and aggregation engine.
//! Groups, students, teachers, subjects and grades live in SQLite; a catalog
//! of twelve analytical queries (rankings, averages, membership listings,
//! "last lesson" lookups) runs over consistent snapshots of that store.
//!
//! ## Modules
//!
//! - [`model`]: Entities, typed ids and write-side validation
//! - [`store`]: The `RecordStore` trait and its SQLite implementation
//! - [`index`]: Relationship lookups over a snapshot
//! - [`query`]: Aggregation engine, query catalog and executor
//! - [`config`]: TOML configuration with environment overrides
//! - [`logging`]: Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gradebook::config::Config;
//! use gradebook::model::{NewGrade, NewGroup, NewStudent, NewSubject, NewTeacher};
//! use gradebook::query::QueryExecutor;
//! use gradebook::store::SqliteStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     gradebook::logging::init(&config.logging);
//!
//!     let store = Arc::new(SqliteStore::open(&config.store, config.grading.scale()?)?);
//!
//!     let group = store.create_group(NewGroup::new("Group-1")).await?;
//!     let ada = store.create_student(NewStudent::new("Ada").in_group(group)).await?;
//!     let teacher = store.create_teacher(NewTeacher::new("Ivanova")).await?;
//!     let math = store.create_subject(NewSubject::new("Math").taught_by(teacher)).await?;
//!     store.create_grade(NewGrade::new(ada, math, 5.0)).await?;
//!
//!     let executor = QueryExecutor::with_config(store, config.query.clone());
//!     for row in executor.top_performers(None).await? {
//!         println!("{}: {:.2}", row.student, row.average);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod index;
pub mod logging;
pub mod model;
pub mod query;
pub mod store;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError};

pub use index::RelationshipIndex;

pub use model::{
    EntityRef, Grade, GradeId, GradeScale, Group, GroupId, Student, StudentId, Subject, SubjectId,
    Teacher, TeacherId, ValidationError,
};

pub use query::{
    GroupAverage, NamedQuery, QueryError, QueryExecutor, QueryKind, QueryOutput, QueryResult,
    StudentAverage, StudentGrade,
};

pub use store::{
    Cancellation, ReadRequest, RecordStore, Snapshot, SqliteStore, StoreError, StoreResult,
};
