//! Mirror repository implementation

use std::collections::BTreeSet;
use std::hash::Hash;

use libsql::{params, params_from_iter, Connection, Row, Value};
use serde::Serialize;

use super::changes::{ChangeSet, Staged, StagedTable};
use crate::error::{Error, Result};
use crate::models::{
    Assignment, AssignmentField, Course, CourseField, LocalId, Resource, ResourceField,
};
use crate::util::instant_from_millis;

/// Store operations used by the sync engine.
#[allow(async_fn_in_trait)]
pub trait MirrorRepository {
    /// Find a course by its Moodle id
    async fn find_course_by_remote_id(&self, moodle_id: i64) -> Result<Option<Course>>;

    /// Find an assignment by its Moodle id
    async fn find_assignment_by_remote_id(&self, moodle_id: i64) -> Result<Option<Assignment>>;

    /// Find a resource by its file URL
    async fn find_resource_by_file_url(&self, file_url: &str) -> Result<Option<Resource>>;

    /// Apply every staged write as one transaction
    async fn commit(&self, changes: &ChangeSet) -> Result<CommitSummary>;
}

impl<T: MirrorRepository> MirrorRepository for &T {
    async fn find_course_by_remote_id(&self, moodle_id: i64) -> Result<Option<Course>> {
        (**self).find_course_by_remote_id(moodle_id).await
    }

    async fn find_assignment_by_remote_id(&self, moodle_id: i64) -> Result<Option<Assignment>> {
        (**self).find_assignment_by_remote_id(moodle_id).await
    }

    async fn find_resource_by_file_url(&self, file_url: &str) -> Result<Option<Resource>> {
        (**self).find_resource_by_file_url(file_url).await
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<CommitSummary> {
        (**self).commit(changes).await
    }
}

/// Rows written by a commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Filter for assignment and resource listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Restrict to one course (Moodle id)
    pub course_id: Option<i64>,
    /// Only rows still flagged as new
    pub only_new: bool,
}

const COURSE_COLUMNS: &str =
    "id, moodle_id, fullname, shortname, category_id, progress, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "id, moodle_id, course_id, cmid, name, description, due_date, \
     submitted, grade, is_new, created_at, updated_at";

const RESOURCE_COLUMNS: &str = "id, moodle_id, course_id, section, filename, file_url, mimetype, \
     filesize, time_created, is_new, created_at, updated_at";

/// libSQL implementation of `MirrorRepository`
pub struct LibSqlMirrorRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlMirrorRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All mirrored courses, ordered by name
    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY fullname ASC");
        let mut rows = self.conn.query(&sql, ()).await?;

        let mut courses = Vec::new();
        while let Some(row) = rows.next().await? {
            courses.push(Self::parse_course(&row)?);
        }
        Ok(courses)
    }

    /// Assignments ordered by due date (undated last)
    pub async fn list_assignments(&self, filter: ListFilter) -> Result<Vec<Assignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
             WHERE (?1 IS NULL OR course_id = ?1) AND (?2 = 0 OR is_new = 1)
             ORDER BY due_date IS NULL, due_date ASC, name ASC"
        );
        let mut rows = self.conn.query(&sql, Self::filter_params(filter)).await?;

        let mut assignments = Vec::new();
        while let Some(row) = rows.next().await? {
            assignments.push(Self::parse_assignment(&row)?);
        }
        Ok(assignments)
    }

    /// Resources ordered newest first
    pub async fn list_resources(&self, filter: ListFilter) -> Result<Vec<Resource>> {
        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources
             WHERE (?1 IS NULL OR course_id = ?1) AND (?2 = 0 OR is_new = 1)
             ORDER BY time_created DESC, filename ASC"
        );
        let mut rows = self.conn.query(&sql, Self::filter_params(filter)).await?;

        let mut resources = Vec::new();
        while let Some(row) = rows.next().await? {
            resources.push(Self::parse_resource(&row)?);
        }
        Ok(resources)
    }

    fn filter_params(filter: ListFilter) -> Vec<Value> {
        vec![
            filter.course_id.map_or(Value::Null, Value::Integer),
            Value::Integer(i64::from(filter.only_new)),
        ]
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<CommitSummary> {
        let mut summary = CommitSummary::default();

        // Parents first so foreign keys hold
        self.apply_table(
            "courses",
            &changes.courses,
            &mut summary,
            Self::insert_course,
            Self::update_course,
        )
        .await?;
        self.apply_table(
            "assignments",
            &changes.assignments,
            &mut summary,
            Self::insert_assignment,
            Self::update_assignment,
        )
        .await?;
        self.apply_table(
            "resources",
            &changes.resources,
            &mut summary,
            Self::insert_resource,
            Self::update_resource,
        )
        .await?;

        Ok(summary)
    }

    async fn apply_table<K, R, F>(
        &self,
        table_name: &str,
        table: &StagedTable<K, R, F>,
        summary: &mut CommitSummary,
        insert: fn(&R) -> (&'static str, Vec<Value>),
        update: fn(&R, &BTreeSet<F>) -> (String, Vec<Value>),
    ) -> Result<()>
    where
        K: Eq + Hash + Clone,
        F: Ord,
    {
        for staged in table.iter() {
            match staged {
                Staged::Insert(row) => {
                    let (sql, values) = insert(row);
                    self.conn.execute(sql, params_from_iter(values)).await?;
                    summary.inserted += 1;
                }
                Staged::Update { row, fields } => {
                    let (sql, values) = update(row, fields);
                    let changed = self.conn.execute(&sql, params_from_iter(values)).await?;
                    if changed == 0 {
                        return Err(Error::NotFound(format!(
                            "staged update matched no row in {table_name}"
                        )));
                    }
                    summary.updated += 1;
                }
            }
        }
        Ok(())
    }

    fn insert_course(course: &Course) -> (&'static str, Vec<Value>) {
        (
            "INSERT INTO courses (id, moodle_id, fullname, shortname, category_id, progress, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                Value::Text(course.id.as_str()),
                Value::Integer(course.moodle_id),
                Value::Text(course.fullname.clone()),
                Value::Text(course.shortname.clone()),
                course.category_id.map_or(Value::Null, Value::Integer),
                Value::Integer(course.progress),
                Value::Integer(course.created_at),
                Value::Integer(course.updated_at),
            ],
        )
    }

    fn update_course(course: &Course, fields: &BTreeSet<CourseField>) -> (String, Vec<Value>) {
        let values = fields.iter().map(|field| match field {
            CourseField::Fullname => Value::Text(course.fullname.clone()),
            CourseField::Progress => Value::Integer(course.progress),
        });
        update_statement(
            "courses",
            fields.iter().map(|field| field.column()),
            values,
            course.updated_at,
            ("moodle_id", Value::Integer(course.moodle_id)),
        )
    }

    fn insert_assignment(assignment: &Assignment) -> (&'static str, Vec<Value>) {
        (
            "INSERT INTO assignments (id, moodle_id, course_id, cmid, name, description, due_date, submitted, grade, is_new, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                Value::Text(assignment.id.as_str()),
                Value::Integer(assignment.moodle_id),
                Value::Integer(assignment.course_id),
                assignment.cmid.map_or(Value::Null, Value::Integer),
                Value::Text(assignment.name.clone()),
                Value::Text(assignment.description.clone()),
                assignment
                    .due_date
                    .map_or(Value::Null, |due| Value::Integer(due.timestamp_millis())),
                Value::Integer(i64::from(assignment.submitted)),
                assignment.grade.clone().map_or(Value::Null, Value::Text),
                Value::Integer(i64::from(assignment.is_new)),
                Value::Integer(assignment.created_at),
                Value::Integer(assignment.updated_at),
            ],
        )
    }

    fn update_assignment(
        assignment: &Assignment,
        fields: &BTreeSet<AssignmentField>,
    ) -> (String, Vec<Value>) {
        let values = fields.iter().map(|field| match field {
            AssignmentField::Name => Value::Text(assignment.name.clone()),
            AssignmentField::Description => Value::Text(assignment.description.clone()),
            AssignmentField::DueDate => assignment
                .due_date
                .map_or(Value::Null, |due| Value::Integer(due.timestamp_millis())),
            AssignmentField::Cmid => assignment.cmid.map_or(Value::Null, Value::Integer),
            AssignmentField::Submitted => Value::Integer(i64::from(assignment.submitted)),
            AssignmentField::Grade => assignment.grade.clone().map_or(Value::Null, Value::Text),
        });
        update_statement(
            "assignments",
            fields.iter().map(|field| field.column()),
            values,
            assignment.updated_at,
            ("moodle_id", Value::Integer(assignment.moodle_id)),
        )
    }

    fn insert_resource(resource: &Resource) -> (&'static str, Vec<Value>) {
        (
            "INSERT INTO resources (id, moodle_id, course_id, section, filename, file_url, mimetype, filesize, time_created, is_new, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                Value::Text(resource.id.as_str()),
                Value::Integer(resource.moodle_id),
                Value::Integer(resource.course_id),
                Value::Text(resource.section.clone()),
                Value::Text(resource.filename.clone()),
                Value::Text(resource.file_url.clone()),
                Value::Text(resource.mimetype.clone()),
                Value::Integer(resource.filesize),
                resource
                    .time_created
                    .map_or(Value::Null, |created| Value::Integer(created.timestamp_millis())),
                Value::Integer(i64::from(resource.is_new)),
                Value::Integer(resource.created_at),
                Value::Integer(resource.updated_at),
            ],
        )
    }

    fn update_resource(
        resource: &Resource,
        fields: &BTreeSet<ResourceField>,
    ) -> (String, Vec<Value>) {
        let values = fields.iter().map(|field| match field {
            ResourceField::Section => Value::Text(resource.section.clone()),
        });
        update_statement(
            "resources",
            fields.iter().map(|field| field.column()),
            values,
            resource.updated_at,
            ("file_url", Value::Text(resource.file_url.clone())),
        )
    }

    fn parse_id(row: &Row) -> Result<LocalId> {
        let id: String = row.get(0)?;
        id.parse()
            .map_err(|_| Error::Database(format!("Invalid local id: {id}")))
    }

    fn parse_course(row: &Row) -> Result<Course> {
        Ok(Course {
            id: Self::parse_id(row)?,
            moodle_id: row.get(1)?,
            fullname: row.get(2)?,
            shortname: row.get(3)?,
            category_id: row.get(4)?,
            progress: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn parse_assignment(row: &Row) -> Result<Assignment> {
        Ok(Assignment {
            id: Self::parse_id(row)?,
            moodle_id: row.get(1)?,
            course_id: row.get(2)?,
            cmid: row.get(3)?,
            name: row.get(4)?,
            description: row.get(5)?,
            due_date: instant_from_millis(row.get(6)?),
            submitted: row.get::<i64>(7)? != 0,
            grade: row.get(8)?,
            is_new: row.get::<i64>(9)? != 0,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn parse_resource(row: &Row) -> Result<Resource> {
        Ok(Resource {
            id: Self::parse_id(row)?,
            moodle_id: row.get(1)?,
            course_id: row.get(2)?,
            section: row.get(3)?,
            filename: row.get(4)?,
            file_url: row.get(5)?,
            mimetype: row.get(6)?,
            filesize: row.get(7)?,
            time_created: instant_from_millis(row.get(8)?),
            is_new: row.get::<i64>(9)? != 0,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl MirrorRepository for LibSqlMirrorRepository<'_> {
    async fn find_course_by_remote_id(&self, moodle_id: i64) -> Result<Option<Course>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE moodle_id = ?");
        let mut rows = self.conn.query(&sql, params![moodle_id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_course(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_assignment_by_remote_id(&self, moodle_id: i64) -> Result<Option<Assignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE moodle_id = ?");
        let mut rows = self.conn.query(&sql, params![moodle_id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_assignment(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_resource_by_file_url(&self, file_url: &str) -> Result<Option<Resource>> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE file_url = ?");
        let mut rows = self.conn.query(&sql, params![file_url]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_resource(&row)?)),
            None => Ok(None),
        }
    }

    async fn commit(&self, changes: &ChangeSet) -> Result<CommitSummary> {
        if changes.is_empty() {
            return Ok(CommitSummary::default());
        }

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let summary = match self.apply(changes).await {
            Ok(summary) => summary,
            Err(e) => {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        };

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        tracing::debug!(
            "Committed {} inserts and {} updates",
            summary.inserted,
            summary.updated
        );
        Ok(summary)
    }
}

/// `UPDATE <table> SET <columns..>, updated_at = ? WHERE <key> = ?`
fn update_statement<'c>(
    table: &str,
    columns: impl Iterator<Item = &'c str>,
    values: impl Iterator<Item = Value>,
    updated_at: i64,
    (key_column, key): (&str, Value),
) -> (String, Vec<Value>) {
    let assignments = columns
        .map(|column| format!("{column} = ?"))
        .chain(std::iter::once("updated_at = ?".to_string()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut params = values.collect::<Vec<_>>();
    params.push(Value::Integer(updated_at));
    params.push(key);

    (
        format!("UPDATE {table} SET {assignments} WHERE {key_column} = ?"),
        params,
    )
}
