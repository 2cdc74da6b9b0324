//! Query Executor
//!
//! Runs catalog queries against a [`RecordStore`]:
//! 1. Validate parameters
//! 2. Read the rows the query needs as one snapshot
//! 3. Index the snapshot's relationships
//! 4. Evaluate the query over the index
//!
//! # Execution Pipeline
//!
//! ```text
//! NamedQuery → ReadRequest → Snapshot (cancellable) → RelationshipIndex → QueryOutput
//! ```

use crate::config::QueryConfig;
use crate::index::RelationshipIndex;
use crate::query::catalog::{self, GroupAverage, StudentAverage, StudentGrade};
use crate::query::error::{QueryError, QueryResult};
use crate::query::named::{resolve_limit, NamedQuery, QueryOutput};
use crate::store::{Cancellation, RecordStore};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Query executor over a shared store handle
pub struct QueryExecutor<S: RecordStore + ?Sized> {
    store: Arc<S>,
    config: QueryConfig,
}

impl<S: RecordStore + ?Sized> QueryExecutor<S> {
    /// Create an executor with default query settings
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, QueryConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Execute a query, honoring the configured timeout if any
    pub async fn execute(&self, query: &NamedQuery) -> QueryResult<QueryOutput> {
        let top_n = self.config.default_top_n;
        self.guarded(query, |index| query.evaluate(index, top_n))
            .await
    }

    /// Execute a query that the caller may cancel through `cancel`
    pub async fn execute_with(
        &self,
        query: &NamedQuery,
        cancel: &Cancellation,
    ) -> QueryResult<QueryOutput> {
        let top_n = self.config.default_top_n;
        self.run(query, cancel, |index| query.evaluate(index, top_n))
            .await
    }

    /// Execute a query, cancelling the store read if it outlives `timeout`
    pub async fn execute_with_timeout(
        &self,
        query: &NamedQuery,
        timeout: Duration,
    ) -> QueryResult<QueryOutput> {
        let top_n = self.config.default_top_n;
        self.run_with_timeout(query, timeout, |index| query.evaluate(index, top_n))
            .await
    }

    // Typed entry points, one per catalog query

    pub async fn top_performers(&self, limit: Option<i64>) -> QueryResult<Vec<StudentAverage>> {
        let n = resolve_limit(limit, self.config.default_top_n)?;
        let query = NamedQuery::TopPerformers { limit };
        self.guarded(&query, |index| catalog::top_performers(index, n))
            .await
    }

    pub async fn best_in_subject(&self, subject: &str) -> QueryResult<Option<StudentAverage>> {
        let query = NamedQuery::BestInSubject {
            subject: subject.to_string(),
        };
        self.guarded(&query, |index| catalog::best_in_subject(index, subject))
            .await
    }

    pub async fn group_averages_in_subject(&self, subject: &str) -> QueryResult<Vec<GroupAverage>> {
        let query = NamedQuery::GroupAveragesInSubject {
            subject: subject.to_string(),
        };
        self.guarded(&query, |index| {
            Ok(catalog::group_averages_in_subject(index, subject))
        })
        .await
    }

    pub async fn overall_average(&self) -> QueryResult<Option<f64>> {
        self.guarded(&NamedQuery::OverallAverage, |index| {
            Ok(catalog::overall_average(index))
        })
        .await
    }

    pub async fn subjects_of_teacher(&self, teacher: &str) -> QueryResult<Vec<String>> {
        let query = NamedQuery::SubjectsOfTeacher {
            teacher: teacher.to_string(),
        };
        self.guarded(&query, |index| Ok(catalog::subjects_of_teacher(index, teacher)))
            .await
    }

    pub async fn students_in_group(&self, group: &str) -> QueryResult<Vec<String>> {
        let query = NamedQuery::StudentsInGroup {
            group: group.to_string(),
        };
        self.guarded(&query, |index| Ok(catalog::students_in_group(index, group)))
            .await
    }

    pub async fn grades_in_group_subject(
        &self,
        group: &str,
        subject: &str,
    ) -> QueryResult<Vec<StudentGrade>> {
        let query = NamedQuery::GradesInGroupSubject {
            group: group.to_string(),
            subject: subject.to_string(),
        };
        self.guarded(&query, |index| {
            Ok(catalog::grades_in_group_subject(index, group, subject))
        })
        .await
    }

    pub async fn teacher_average(&self, teacher: &str) -> QueryResult<Option<f64>> {
        let query = NamedQuery::TeacherAverage {
            teacher: teacher.to_string(),
        };
        self.guarded(&query, |index| Ok(catalog::teacher_average(index, teacher)))
            .await
    }

    pub async fn subjects_of_student(&self, student: &str) -> QueryResult<Vec<String>> {
        let query = NamedQuery::SubjectsOfStudent {
            student: student.to_string(),
        };
        self.guarded(&query, |index| Ok(catalog::subjects_of_student(index, student)))
            .await
    }

    pub async fn subjects_teacher_teaches_student(
        &self,
        student: &str,
        teacher: &str,
    ) -> QueryResult<Vec<String>> {
        let query = NamedQuery::SubjectsTeacherTeachesStudent {
            student: student.to_string(),
            teacher: teacher.to_string(),
        };
        self.guarded(&query, |index| {
            Ok(catalog::subjects_teacher_teaches_student(index, student, teacher))
        })
        .await
    }

    pub async fn teacher_average_for_student(
        &self,
        teacher: &str,
        student: &str,
    ) -> QueryResult<Option<f64>> {
        let query = NamedQuery::TeacherAverageForStudent {
            teacher: teacher.to_string(),
            student: student.to_string(),
        };
        self.guarded(&query, |index| {
            Ok(catalog::teacher_average_for_student(index, teacher, student))
        })
        .await
    }

    pub async fn last_lesson_grades(
        &self,
        group: &str,
        subject: &str,
    ) -> QueryResult<Vec<StudentGrade>> {
        let query = NamedQuery::LastLessonGrades {
            group: group.to_string(),
            subject: subject.to_string(),
        };
        self.guarded(&query, |index| {
            Ok(catalog::last_lesson_grades(index, group, subject))
        })
        .await
    }

    /// Apply the configured timeout, if any
    async fn guarded<T, F>(&self, query: &NamedQuery, evaluate: F) -> QueryResult<T>
    where
        F: FnOnce(&RelationshipIndex<'_>) -> QueryResult<T>,
    {
        match self.config.timeout_ms {
            Some(ms) => {
                self.run_with_timeout(query, Duration::from_millis(ms), evaluate)
                    .await
            }
            None => self.run(query, &Cancellation::new(), evaluate).await,
        }
    }

    async fn run_with_timeout<T, F>(
        &self,
        query: &NamedQuery,
        timeout: Duration,
        evaluate: F,
    ) -> QueryResult<T>
    where
        F: FnOnce(&RelationshipIndex<'_>) -> QueryResult<T>,
    {
        let cancel = Cancellation::new();
        match tokio::time::timeout(timeout, self.run(query, &cancel, evaluate)).await {
            Ok(result) => result,
            Err(_) => {
                // Stops a store scan still running on the blocking pool
                cancel.cancel();
                tracing::warn!(
                    query = %query.kind(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Query timed out"
                );
                Err(QueryError::Cancelled)
            }
        }
    }

    async fn run<T, F>(&self, query: &NamedQuery, cancel: &Cancellation, evaluate: F) -> QueryResult<T>
    where
        F: FnOnce(&RelationshipIndex<'_>) -> QueryResult<T>,
    {
        let start = Instant::now();
        query.validate()?;

        let request = query.read_request();
        let snapshot = self.store.read(&request, cancel).await?;
        let read_time = start.elapsed();

        let index = RelationshipIndex::build(&snapshot);
        let result = evaluate(&index)?;

        tracing::debug!(
            query = %query.kind(),
            rows_read = snapshot.row_count(),
            read_us = read_time.as_micros() as u64,
            total_us = start.elapsed().as_micros() as u64,
            "Executed query"
        );

        Ok(result)
    }
}
