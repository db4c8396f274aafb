use tracing::{debug, warn};

use crate::{CoreError, Course, CourseRepository, RecordId, Student, StudentRepository};

/// Service maintaining the course/student enrollment relation.
///
/// It is generic over both repository ports and holds live references to
/// them rather than snapshots, so each operation sees the stores' current
/// state. Referential integrity is enforced at assignment time only:
/// deleting a student does not cascade into rosters, and reads compensate
/// by dropping entries whose student record is gone.
pub struct RosterService<C: CourseRepository, S: StudentRepository> {
    courses: C,
    students: S,
}

impl<C: CourseRepository, S: StudentRepository> RosterService<C, S> {
    pub fn new(courses: C, students: S) -> Self {
        Self { courses, students }
    }

    /// Enroll a student in a course.
    ///
    /// Both endpoints must exist at call time. Assigning an already-enrolled
    /// student is a no-op success returning the unchanged course; otherwise
    /// the id is appended, so roster order is assignment order. The checks
    /// run in a fixed order: course, then id presence, then student.
    pub fn assign(&self, course_id: &RecordId, student_id: &RecordId) -> Result<Course, CoreError> {
        let course = self
            .courses
            .get(course_id)?
            .ok_or(CoreError::CourseNotFound)?;

        if student_id.is_empty() {
            return Err(CoreError::MissingStudentId);
        }
        if self.students.get(student_id)?.is_none() {
            return Err(CoreError::StudentNotFound);
        }

        if course.students.contains(student_id) {
            debug!(student = %student_id, course = %course.id, "student already enrolled");
            return Ok(course);
        }

        let mut roster = course.students;
        roster.push(student_id.clone());
        let updated = self.courses.set_students(course_id, roster)?;
        debug!(student = %student_id, course = %updated.id, "student enrolled");
        Ok(updated)
    }

    /// Materialize a course's roster as full student records, in stored
    /// order.
    ///
    /// A roster entry whose student has since been deleted is dropped from
    /// the result rather than failing the read, so the returned list can be
    /// shorter than the roster itself.
    pub fn roster_of(&self, course_id: &RecordId) -> Result<Vec<Student>, CoreError> {
        let course = self
            .courses
            .get(course_id)?
            .ok_or(CoreError::CourseNotFound)?;

        let mut result = Vec::with_capacity(course.students.len());
        for student_id in &course.students {
            match self.students.get(student_id)? {
                Some(student) => result.push(student),
                None => {
                    warn!(student = %student_id, course = %course.id, "dropping roster entry without student record");
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::{InMemoryCourseRepo, InMemoryStudentRepo};
    use crate::{CourseRepository, NewCourse, NewStudent, StudentRepository};
    use std::sync::Arc;

    fn svc() -> RosterService<Arc<InMemoryCourseRepo>, Arc<InMemoryStudentRepo>> {
        RosterService::new(
            Arc::new(InMemoryCourseRepo::new()),
            Arc::new(InMemoryStudentRepo::new()),
        )
    }

    fn seed_course(svc: &RosterService<Arc<InMemoryCourseRepo>, Arc<InMemoryStudentRepo>>, id: &str) {
        svc.courses
            .create(Course::new(
                RecordId::new(id),
                NewCourse {
                    name: "Rust 101".into(),
                    ..NewCourse::default()
                },
            ))
            .expect("seed course");
    }

    fn seed_student(
        svc: &RosterService<Arc<InMemoryCourseRepo>, Arc<InMemoryStudentRepo>>,
        id: &str,
        fullname: &str,
    ) {
        svc.students
            .create(Student::new(
                RecordId::new(id),
                NewStudent {
                    fullname: fullname.into(),
                    ..NewStudent::default()
                },
            ))
            .expect("seed student");
    }

    #[test]
    fn assign_appends_in_order() {
        let svc = svc();
        seed_course(&svc, "c1");
        seed_student(&svc, "s1", "Ada");
        seed_student(&svc, "s2", "Grace");

        svc.assign(&RecordId::new("c1"), &RecordId::new("s1"))
            .expect("first assign");
        let course = svc
            .assign(&RecordId::new("c1"), &RecordId::new("s2"))
            .expect("second assign");

        assert_eq!(
            course.students,
            vec![RecordId::new("s1"), RecordId::new("s2")]
        );
    }

    #[test]
    fn assign_twice_is_idempotent() {
        let svc = svc();
        seed_course(&svc, "c1");
        seed_student(&svc, "s1", "Ada");

        svc.assign(&RecordId::new("c1"), &RecordId::new("s1"))
            .expect("first assign");
        let course = svc
            .assign(&RecordId::new("c1"), &RecordId::new("s1"))
            .expect("repeat assign succeeds");

        assert_eq!(course.students, vec![RecordId::new("s1")]);
    }

    #[test]
    fn assign_unknown_course_fails() {
        let svc = svc();
        seed_student(&svc, "s1", "Ada");
        let err = svc
            .assign(&RecordId::new("missing"), &RecordId::new("s1"))
            .unwrap_err();
        assert!(matches!(err, CoreError::CourseNotFound));
    }

    #[test]
    fn assign_unknown_student_fails() {
        let svc = svc();
        seed_course(&svc, "c1");
        let err = svc
            .assign(&RecordId::new("c1"), &RecordId::new("missing"))
            .unwrap_err();
        assert!(matches!(err, CoreError::StudentNotFound));
    }

    #[test]
    fn assign_requires_student_id() {
        let svc = svc();
        seed_course(&svc, "c1");
        let err = svc
            .assign(&RecordId::new("c1"), &RecordId::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingStudentId));
    }

    #[test]
    fn roster_drops_deleted_students() {
        let svc = svc();
        seed_course(&svc, "c1");
        seed_student(&svc, "s1", "Ada");
        seed_student(&svc, "s2", "Grace");
        svc.assign(&RecordId::new("c1"), &RecordId::new("s1"))
            .expect("assign s1");
        svc.assign(&RecordId::new("c1"), &RecordId::new("s2"))
            .expect("assign s2");

        svc.students.delete(&RecordId::new("s2")).expect("delete");

        let roster = svc.roster_of(&RecordId::new("c1")).expect("roster");
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].fullname, "Ada");

        // The dangling id is still stored; only the read compensates.
        let course = svc
            .courses
            .get(&RecordId::new("c1"))
            .expect("get")
            .expect("some");
        assert_eq!(course.students.len(), 2);
    }

    #[test]
    fn roster_of_unknown_course_fails() {
        let svc = svc();
        let err = svc.roster_of(&RecordId::new("missing")).unwrap_err();
        assert!(matches!(err, CoreError::CourseNotFound));
    }

    #[test]
    fn numeric_and_string_ids_compare_equal() {
        let svc = svc();
        seed_course(&svc, "c1");
        seed_student(&svc, "123", "Ada");

        // Same id arriving once as a JSON string and once as a JSON number.
        let as_str: RecordId = serde_json::from_value(serde_json::json!("123")).expect("id");
        let as_num: RecordId = serde_json::from_value(serde_json::json!(123)).expect("id");

        svc.assign(&RecordId::new("c1"), &as_str).expect("assign");
        let course = svc.assign(&RecordId::new("c1"), &as_num).expect("assign");

        assert_eq!(course.students, vec![RecordId::new("123")]);
    }
}
