//! SQLite Record Store
//!
//! Persists groups, students, teachers, subjects and grades in one SQLite
//! database. Reads run inside a single deferred transaction so every table of
//! a [`ReadRequest`] comes from the same database state.
//!
//! The connection is not `Sync`, so it lives behind a `std::sync::Mutex` and
//! all SQLite work runs on tokio's blocking pool.

use crate::config::StoreConfig;
use crate::model::{
    EntityRef, Grade, GradeChanges, GradeId, GradeScale, Group, GroupChanges, GroupId, NewGrade,
    NewGroup, NewStudent, NewSubject, NewTeacher, Student, StudentChanges, StudentId, Subject,
    SubjectChanges, SubjectId, Teacher, TeacherChanges, TeacherId,
};
use crate::store::error::{StoreError, StoreResult};
use crate::store::request::{Fetch, GradeFetch, GradeFilter, ReadRequest};
use crate::store::snapshot::{Cancellation, Snapshot};
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row, TransactionBehavior};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS student_groups (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS teachers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS students (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        group_id INTEGER REFERENCES student_groups(id)
    );
    CREATE TABLE IF NOT EXISTS subjects (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        teacher_id INTEGER REFERENCES teachers(id)
    );
    CREATE TABLE IF NOT EXISTS grades (
        id INTEGER PRIMARY KEY,
        student_id INTEGER NOT NULL REFERENCES students(id),
        subject_id INTEGER NOT NULL REFERENCES subjects(id),
        grade REAL NOT NULL,
        received_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_students_group ON students(group_id);
    CREATE INDEX IF NOT EXISTS idx_students_name ON students(name);
    CREATE INDEX IF NOT EXISTS idx_teachers_name ON teachers(name);
    CREATE INDEX IF NOT EXISTS idx_subjects_teacher ON subjects(teacher_id);
    CREATE INDEX IF NOT EXISTS idx_subjects_name ON subjects(name);
    CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id);
    CREATE INDEX IF NOT EXISTS idx_grades_subject ON grades(subject_id);
    CREATE INDEX IF NOT EXISTS idx_grades_received ON grades(received_at);
";

const SELECT_GROUPS: &str = "SELECT id, name FROM student_groups";
const SELECT_STUDENTS: &str = "SELECT id, name, group_id FROM students";
const SELECT_TEACHERS: &str = "SELECT id, name FROM teachers";
const SELECT_SUBJECTS: &str = "SELECT id, name, teacher_id FROM subjects";
const SELECT_GRADES: &str = "SELECT id, student_id, subject_id, grade, received_at FROM grades";

/// SQLite-backed record store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    scale: GradeScale,
}

impl SqliteStore {
    /// Open (or create) the database file named by `config`
    pub fn open(config: &StoreConfig, scale: GradeScale) -> StoreResult<Self> {
        let path = config.resolved_path();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        tracing::info!("Opened record store at {:?}", path);
        Self::initialize(conn, scale)
    }

    /// Open a private in-memory database
    pub fn open_in_memory(scale: GradeScale) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, scale)
    }

    fn initialize(conn: Connection, scale: GradeScale) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            scale,
        })
    }

    /// Grade scale enforced on writes
    pub fn scale(&self) -> GradeScale {
        self.scale
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|e| StoreError::Lock(e.to_string()))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub async fn create_group(&self, group: NewGroup) -> StoreResult<GroupId> {
        group.validate()?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO student_groups (name) VALUES (?1)",
                params![group.name],
            )
            .map_err(StoreError::from_write)?;
            Ok(GroupId(conn.last_insert_rowid()))
        })
        .await
    }

    pub async fn create_student(&self, student: NewStudent) -> StoreResult<StudentId> {
        student.validate()?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO students (name, group_id) VALUES (?1, ?2)",
                params![student.name, student.group_id.map(GroupId::get)],
            )
            .map_err(StoreError::from_write)?;
            Ok(StudentId(conn.last_insert_rowid()))
        })
        .await
    }

    pub async fn create_teacher(&self, teacher: NewTeacher) -> StoreResult<TeacherId> {
        teacher.validate()?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO teachers (name) VALUES (?1)",
                params![teacher.name],
            )
            .map_err(StoreError::from_write)?;
            Ok(TeacherId(conn.last_insert_rowid()))
        })
        .await
    }

    pub async fn create_subject(&self, subject: NewSubject) -> StoreResult<SubjectId> {
        subject.validate()?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO subjects (name, teacher_id) VALUES (?1, ?2)",
                params![subject.name, subject.teacher_id.map(TeacherId::get)],
            )
            .map_err(StoreError::from_write)?;
            Ok(SubjectId(conn.last_insert_rowid()))
        })
        .await
    }

    /// Record a grade; an unset `received_at` is stamped with the current time
    pub async fn create_grade(&self, grade: NewGrade) -> StoreResult<GradeId> {
        grade.validate(&self.scale)?;
        let received_at = grade.received_at.unwrap_or_else(Utc::now);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO grades (student_id, subject_id, grade, received_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    grade.student_id.get(),
                    grade.subject_id.get(),
                    grade.value,
                    encode_timestamp(&received_at)
                ],
            )
            .map_err(StoreError::from_write)?;
            Ok(GradeId(conn.last_insert_rowid()))
        })
        .await
    }

    pub async fn update_group(&self, id: GroupId, changes: GroupChanges) -> StoreResult<()> {
        changes.validate()?;
        if changes.is_empty() {
            return self.ensure_exists(EntityRef::Group(id)).await;
        }
        let mut update = Update::new(EntityRef::Group(id));
        if let Some(name) = changes.name {
            update.set("name", Value::Text(name));
        }
        self.apply(update).await
    }

    pub async fn update_student(&self, id: StudentId, changes: StudentChanges) -> StoreResult<()> {
        changes.validate()?;
        if changes.is_empty() {
            return self.ensure_exists(EntityRef::Student(id)).await;
        }
        let mut update = Update::new(EntityRef::Student(id));
        if let Some(name) = changes.name {
            update.set("name", Value::Text(name));
        }
        if let Some(group_id) = changes.group_id {
            update.set("group_id", Value::Integer(group_id.get()));
        }
        self.apply(update).await
    }

    pub async fn update_teacher(&self, id: TeacherId, changes: TeacherChanges) -> StoreResult<()> {
        changes.validate()?;
        if changes.is_empty() {
            return self.ensure_exists(EntityRef::Teacher(id)).await;
        }
        let mut update = Update::new(EntityRef::Teacher(id));
        if let Some(name) = changes.name {
            update.set("name", Value::Text(name));
        }
        self.apply(update).await
    }

    pub async fn update_subject(&self, id: SubjectId, changes: SubjectChanges) -> StoreResult<()> {
        changes.validate()?;
        if changes.is_empty() {
            return self.ensure_exists(EntityRef::Subject(id)).await;
        }
        let mut update = Update::new(EntityRef::Subject(id));
        if let Some(name) = changes.name {
            update.set("name", Value::Text(name));
        }
        if let Some(teacher_id) = changes.teacher_id {
            update.set("teacher_id", Value::Integer(teacher_id.get()));
        }
        self.apply(update).await
    }

    pub async fn update_grade(&self, id: GradeId, changes: GradeChanges) -> StoreResult<()> {
        changes.validate(&self.scale)?;
        if changes.is_empty() {
            return self.ensure_exists(EntityRef::Grade(id)).await;
        }
        let mut update = Update::new(EntityRef::Grade(id));
        if let Some(student_id) = changes.student_id {
            update.set("student_id", Value::Integer(student_id.get()));
        }
        if let Some(subject_id) = changes.subject_id {
            update.set("subject_id", Value::Integer(subject_id.get()));
        }
        if let Some(value) = changes.value {
            update.set("grade", Value::Real(value));
        }
        if let Some(at) = changes.received_at {
            update.set("received_at", Value::Text(encode_timestamp(&at)));
        }
        self.apply(update).await
    }

    async fn apply(&self, update: Update) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let target = update.target;
            let (sql, values) = update.into_sql();
            let affected = conn
                .execute(&sql, params_from_iter(values.iter()))
                .map_err(StoreError::from_write)?;

            if affected == 0 {
                return Err(StoreError::NotFound {
                    entity: target.kind(),
                    id: target.id(),
                });
            }
            tracing::debug!("Updated {}", target);
            Ok(())
        })
        .await
    }

    /// An update with nothing to change still reports a missing record
    async fn ensure_exists(&self, target: EntityRef) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?1", table_of(&target));
            let count: i64 = conn.query_row(&sql, params![target.id()], |row| row.get(0))?;
            if count == 0 {
                return Err(StoreError::NotFound {
                    entity: target.kind(),
                    id: target.id(),
                });
            }
            Ok(())
        })
        .await
    }

    /// Delete one record. Records still referenced by others are kept and a
    /// [`StoreError::Constraint`] is returned.
    pub async fn delete(&self, target: EntityRef) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", table_of(&target));
            let affected = conn
                .execute(&sql, params![target.id()])
                .map_err(StoreError::from_write)?;

            if affected == 0 {
                return Err(StoreError::NotFound {
                    entity: target.kind(),
                    id: target.id(),
                });
            }
            tracing::debug!("Deleted {}", target);
            Ok(())
        })
        .await
    }

    /// Insert records with their ids preserved, all-or-nothing
    pub async fn import(&self, snapshot: Snapshot) -> StoreResult<()> {
        for group in &snapshot.groups {
            NewGroup::new(group.name.as_str()).validate()?;
        }
        for student in &snapshot.students {
            NewStudent::new(student.name.as_str()).validate()?;
        }
        for teacher in &snapshot.teachers {
            NewTeacher::new(teacher.name.as_str()).validate()?;
        }
        for subject in &snapshot.subjects {
            NewSubject::new(subject.name.as_str()).validate()?;
        }
        for grade in &snapshot.grades {
            self.scale.validate(grade.value)?;
        }

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare_cached("INSERT INTO student_groups (id, name) VALUES (?1, ?2)")?;
                for group in &snapshot.groups {
                    stmt.execute(params![group.id.get(), group.name])
                        .map_err(StoreError::from_write)?;
                }

                let mut stmt = tx.prepare_cached("INSERT INTO teachers (id, name) VALUES (?1, ?2)")?;
                for teacher in &snapshot.teachers {
                    stmt.execute(params![teacher.id.get(), teacher.name])
                        .map_err(StoreError::from_write)?;
                }

                let mut stmt = tx.prepare_cached(
                    "INSERT INTO students (id, name, group_id) VALUES (?1, ?2, ?3)",
                )?;
                for student in &snapshot.students {
                    stmt.execute(params![
                        student.id.get(),
                        student.name,
                        student.group_id.map(GroupId::get)
                    ])
                    .map_err(StoreError::from_write)?;
                }

                let mut stmt = tx.prepare_cached(
                    "INSERT INTO subjects (id, name, teacher_id) VALUES (?1, ?2, ?3)",
                )?;
                for subject in &snapshot.subjects {
                    stmt.execute(params![
                        subject.id.get(),
                        subject.name,
                        subject.teacher_id.map(TeacherId::get)
                    ])
                    .map_err(StoreError::from_write)?;
                }

                let mut stmt = tx.prepare_cached(
                    "INSERT INTO grades (id, student_id, subject_id, grade, received_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for grade in &snapshot.grades {
                    stmt.execute(params![
                        grade.id.get(),
                        grade.student_id.get(),
                        grade.subject_id.get(),
                        grade.value,
                        encode_timestamp(&grade.received_at)
                    ])
                    .map_err(StoreError::from_write)?;
                }
            }
            tx.commit()?;

            tracing::info!("Imported {} records", snapshot.row_count());
            Ok(())
        })
        .await
    }

    pub async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let request = ReadRequest::new().groups(Fetch::All);
        Ok(self.read(&request, &Cancellation::new()).await?.groups)
    }

    pub async fn list_students(&self) -> StoreResult<Vec<Student>> {
        let request = ReadRequest::new().students(Fetch::All);
        Ok(self.read(&request, &Cancellation::new()).await?.students)
    }

    pub async fn list_teachers(&self) -> StoreResult<Vec<Teacher>> {
        let request = ReadRequest::new().teachers(Fetch::All);
        Ok(self.read(&request, &Cancellation::new()).await?.teachers)
    }

    pub async fn list_subjects(&self) -> StoreResult<Vec<Subject>> {
        let request = ReadRequest::new().subjects(Fetch::All);
        Ok(self.read(&request, &Cancellation::new()).await?.subjects)
    }

    pub async fn list_grades(&self) -> StoreResult<Vec<Grade>> {
        let request = ReadRequest::new().all_grades();
        Ok(self.read(&request, &Cancellation::new()).await?.grades)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn read(&self, request: &ReadRequest, cancel: &Cancellation) -> StoreResult<Snapshot> {
        let request = request.clone();
        let cancel = cancel.clone();
        self.with_conn(move |conn| read_snapshot(conn, &request, &cancel))
            .await
    }
}

/// A pending single-row UPDATE
struct Update {
    target: EntityRef,
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Update {
    fn new(target: EntityRef) -> Self {
        Self {
            target,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    fn set(&mut self, column: &'static str, value: Value) {
        self.columns.push(column);
        self.values.push(value);
    }

    fn into_sql(self) -> (String, Vec<Value>) {
        let assignments: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();

        let mut values = self.values;
        values.push(Value::Integer(self.target.id()));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table_of(&self.target),
            assignments.join(", "),
            values.len()
        );
        (sql, values)
    }
}

fn table_of(target: &EntityRef) -> &'static str {
    match target {
        EntityRef::Group(_) => "student_groups",
        EntityRef::Student(_) => "students",
        EntityRef::Teacher(_) => "teachers",
        EntityRef::Subject(_) => "subjects",
        EntityRef::Grade(_) => "grades",
    }
}

fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn read_snapshot(
    conn: &mut Connection,
    request: &ReadRequest,
    cancel: &Cancellation,
) -> StoreResult<Snapshot> {
    cancel.check()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

    let snapshot = Snapshot {
        groups: fetch_named(&tx, SELECT_GROUPS, &request.groups, cancel, |row| {
            Ok(Group {
                id: GroupId(row.get(0)?),
                name: row.get(1)?,
            })
        })?,
        students: fetch_named(&tx, SELECT_STUDENTS, &request.students, cancel, |row| {
            Ok(Student {
                id: StudentId(row.get(0)?),
                name: row.get(1)?,
                group_id: row.get::<_, Option<i64>>(2)?.map(GroupId),
            })
        })?,
        teachers: fetch_named(&tx, SELECT_TEACHERS, &request.teachers, cancel, |row| {
            Ok(Teacher {
                id: TeacherId(row.get(0)?),
                name: row.get(1)?,
            })
        })?,
        subjects: fetch_named(&tx, SELECT_SUBJECTS, &request.subjects, cancel, |row| {
            Ok(Subject {
                id: SubjectId(row.get(0)?),
                name: row.get(1)?,
                teacher_id: row.get::<_, Option<i64>>(2)?.map(TeacherId),
            })
        })?,
        grades: fetch_grades(&tx, &request.grades, cancel)?,
    };

    tx.commit()?;

    tracing::debug!(rows = snapshot.row_count(), "Read snapshot");
    Ok(snapshot)
}

fn fetch_named<T>(
    conn: &Connection,
    select: &str,
    fetch: &Fetch,
    cancel: &Cancellation,
    decode: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Vec<T>> {
    match fetch {
        Fetch::Skip => Ok(Vec::new()),
        Fetch::All => scan(conn, &format!("{} ORDER BY id", select), &[], cancel, decode),
        Fetch::Named(name) => scan(
            conn,
            &format!("{} WHERE name = ?1 ORDER BY id", select),
            &[Value::Text(name.clone())],
            cancel,
            decode,
        ),
    }
}

fn fetch_grades(
    conn: &Connection,
    fetch: &GradeFetch,
    cancel: &Cancellation,
) -> StoreResult<Vec<Grade>> {
    match fetch {
        GradeFetch::Skip => Ok(Vec::new()),
        GradeFetch::All => scan(
            conn,
            &format!("{} ORDER BY id", SELECT_GRADES),
            &[],
            cancel,
            decode_grade,
        ),
        GradeFetch::Filtered(filter) => {
            let (where_clause, args) = grade_conditions(filter);
            let sql = format!("{} {} ORDER BY id", SELECT_GRADES, where_clause);
            scan(conn, &sql, &args, cancel, decode_grade)
        }
    }
}

/// Translate a grade filter into a WHERE clause with numbered parameters
fn grade_conditions(filter: &GradeFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut args = Vec::new();

    if let Some(ref name) = filter.subject_name {
        args.push(Value::Text(name.clone()));
        conditions.push(format!(
            "subject_id IN (SELECT id FROM subjects WHERE name = ?{})",
            args.len()
        ));
    }
    if let Some(ref name) = filter.student_name {
        args.push(Value::Text(name.clone()));
        conditions.push(format!(
            "student_id IN (SELECT id FROM students WHERE name = ?{})",
            args.len()
        ));
    }
    if let Some(ref name) = filter.teacher_name {
        args.push(Value::Text(name.clone()));
        conditions.push(format!(
            "subject_id IN (SELECT s.id FROM subjects s JOIN teachers t ON t.id = s.teacher_id
                            WHERE t.name = ?{})",
            args.len()
        ));
    }
    if let Some(ref name) = filter.group_name {
        args.push(Value::Text(name.clone()));
        conditions.push(format!(
            "student_id IN (SELECT st.id FROM students st JOIN student_groups g ON g.id = st.group_id
                            WHERE g.name = ?{})",
            args.len()
        ));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, args)
}

/// Step through a statement, checking for cancellation before every row
fn scan<T>(
    conn: &Connection,
    sql: &str,
    args: &[Value],
    cancel: &Cancellation,
    decode: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Vec<T>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params_from_iter(args.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        cancel.check()?;
        out.push(decode(row)?);
    }
    Ok(out)
}

fn decode_grade(row: &Row<'_>) -> rusqlite::Result<Grade> {
    let raw: String = row.get(4)?;
    let received_at = DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Grade {
        id: GradeId(row.get(0)?),
        student_id: StudentId(row.get(1)?),
        subject_id: SubjectId(row.get(2)?),
        value: row.get(3)?,
        received_at,
    })
}
