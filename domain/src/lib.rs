//! Domain library for the course administration service.
//!
//! This crate holds the record types, ports (traits), and error definitions,
//! plus the roster service that keeps the course/student enrollment relation
//! consistent. Keep HTTP and other IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical string form of an opaque record identifier.
///
/// Clients have historically sent ids both as JSON strings and as raw
/// numbers; normalization to the string form happens once, here, so every
/// comparison downstream is plain string equality. Construction never fails:
/// an id that matches nothing simply yields NotFound at lookup time.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str("a string or integer identifier")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(RecordId::new(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(RecordId::new(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(RecordId::new(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// A course with its enrolled-student roster.
///
/// The `students` field holds ids in assignment order, never duplicated.
/// It is written only through [`service::RosterService`]; the regular
/// update path cannot reach it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Course {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub lesson_count: u32,
    pub students: Vec<RecordId>,
}

impl Course {
    /// Create a course with an empty roster.
    pub fn new(id: RecordId, fields: NewCourse) -> Self {
        Self {
            id,
            name: fields.name,
            description: fields.description,
            start_date: fields.start_date,
            lesson_count: fields.lesson_count,
            students: Vec::new(),
        }
    }
}

/// Input data for creating a course.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewCourse {
    pub name: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub lesson_count: u32,
}

/// Partial update for a course. Absent or empty values leave the stored
/// field unchanged ("falsy skip"); `lesson_count` and the roster are not
/// updatable through this path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
}

impl CourseUpdate {
    /// Apply the falsy-skip merge to an existing record.
    ///
    /// An empty string counts as absent, so clearing a field to "" is not
    /// possible; that matches the historical contract of this API.
    pub fn apply(&self, course: &mut Course) {
        if let Some(name) = self.name.as_deref().filter(|s| !s.is_empty()) {
            course.name = name.to_string();
        }
        if let Some(desc) = self.description.as_deref().filter(|s| !s.is_empty()) {
            course.description = desc.to_string();
        }
        if let Some(date) = self.start_date {
            course.start_date = Some(date);
        }
    }
}

/// A student record. Identity is immutable; other fields are mutable via
/// partial update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Student {
    pub id: RecordId,
    pub fullname: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub social_network_links: Option<String>,
}

impl Student {
    pub fn new(id: RecordId, fields: NewStudent) -> Self {
        Self {
            id,
            fullname: fields.fullname,
            date_of_birth: fields.date_of_birth,
            gender: fields.gender,
            city: fields.city,
            social_network_links: fields.social_network_links,
        }
    }
}

/// Input data for creating a student.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewStudent {
    pub fullname: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub social_network_links: Option<String>,
}

/// Partial update for a student. Only `fullname` and `city` are reachable,
/// with the same falsy-skip merge as [`CourseUpdate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StudentUpdate {
    pub fullname: Option<String>,
    pub city: Option<String>,
}

impl StudentUpdate {
    pub fn apply(&self, student: &mut Student) {
        if let Some(name) = self.fullname.as_deref().filter(|s| !s.is_empty()) {
            student.fullname = name.to_string();
        }
        if let Some(city) = self.city.as_deref().filter(|s| !s.is_empty()) {
            student.city = Some(city.to_string());
        }
    }
}

/// Identifier source; the server uses UUIDs, tests use sequential ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> RecordId;
}

/// Repository port for course records.
///
/// `delete` succeeds whether or not the id exists. The roster is written
/// only through `set_students`, which is reserved to the roster service;
/// `update` covers the plain-field merge and cannot touch enrollment.
pub trait CourseRepository: Send + Sync {
    fn create(&self, course: Course) -> Result<(), CoreError>;
    fn get(&self, id: &RecordId) -> Result<Option<Course>, CoreError>;
    fn list(&self) -> Result<Vec<Course>, CoreError>;
    fn update(&self, id: &RecordId, changes: &CourseUpdate) -> Result<Course, CoreError>;
    fn delete(&self, id: &RecordId) -> Result<(), CoreError>;
    /// Replace a course's roster wholesale and return the updated record.
    fn set_students(&self, id: &RecordId, students: Vec<RecordId>) -> Result<Course, CoreError>;
}

/// Repository port for student records.
pub trait StudentRepository: Send + Sync {
    fn create(&self, student: Student) -> Result<(), CoreError>;
    fn get(&self, id: &RecordId) -> Result<Option<Student>, CoreError>;
    fn list(&self) -> Result<Vec<Student>, CoreError>;
    fn update(&self, id: &RecordId, changes: &StudentUpdate) -> Result<Student, CoreError>;
    fn delete(&self, id: &RecordId) -> Result<(), CoreError>;
}

// Shared store instances: the server hands one Arc'd adapter to both the
// handlers and the roster service, so the service always reads live state.
impl<T: CourseRepository + ?Sized> CourseRepository for Arc<T> {
    fn create(&self, course: Course) -> Result<(), CoreError> {
        (**self).create(course)
    }
    fn get(&self, id: &RecordId) -> Result<Option<Course>, CoreError> {
        (**self).get(id)
    }
    fn list(&self) -> Result<Vec<Course>, CoreError> {
        (**self).list()
    }
    fn update(&self, id: &RecordId, changes: &CourseUpdate) -> Result<Course, CoreError> {
        (**self).update(id, changes)
    }
    fn delete(&self, id: &RecordId) -> Result<(), CoreError> {
        (**self).delete(id)
    }
    fn set_students(&self, id: &RecordId, students: Vec<RecordId>) -> Result<Course, CoreError> {
        (**self).set_students(id, students)
    }
}

impl<T: StudentRepository + ?Sized> StudentRepository for Arc<T> {
    fn create(&self, student: Student) -> Result<(), CoreError> {
        (**self).create(student)
    }
    fn get(&self, id: &RecordId) -> Result<Option<Student>, CoreError> {
        (**self).get(id)
    }
    fn list(&self) -> Result<Vec<Student>, CoreError> {
        (**self).list()
    }
    fn update(&self, id: &RecordId, changes: &StudentUpdate) -> Result<Student, CoreError> {
        (**self).update(id, changes)
    }
    fn delete(&self, id: &RecordId) -> Result<(), CoreError> {
        (**self).delete(id)
    }
}

/// Core domain errors.
#[derive(Debug)]
pub enum CoreError {
    CourseNotFound,
    StudentNotFound,
    MissingStudentId,
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::CourseNotFound => write!(f, "course not found"),
            CoreError::StudentNotFound => write!(f, "student not found"),
            CoreError::MissingStudentId => write!(f, "student id is required"),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    // Use env! at compile time; fallback literals kept minimal.
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} — domain library loaded", pkg, ver)
}

// Re-export modules when added
pub mod adapters;
pub mod service;
