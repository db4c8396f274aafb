use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{
    CoreError, Course, CourseRepository, CourseUpdate, RecordId, Student, StudentRepository,
    StudentUpdate,
};

/// In-memory course store: an ordered map keyed by the canonical id string,
/// guarded by a mutex. Data lives only as long as the process.
pub struct InMemoryCourseRepo {
    inner: Mutex<BTreeMap<String, Course>>,
}

/// In-memory student store, same shape as [`InMemoryCourseRepo`].
pub struct InMemoryStudentRepo {
    inner: Mutex<BTreeMap<String, Student>>,
}

impl InMemoryCourseRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryCourseRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl CourseRepository for InMemoryCourseRepo {
    fn create(&self, course: Course) -> Result<(), CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        map.insert(course.id.as_str().to_string(), course);
        Ok(())
    }

    fn get(&self, id: &RecordId) -> Result<Option<Course>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.get(id.as_str()).cloned())
    }

    fn list(&self) -> Result<Vec<Course>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.values().cloned().collect())
    }

    fn update(&self, id: &RecordId, changes: &CourseUpdate) -> Result<Course, CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        match map.get_mut(id.as_str()) {
            Some(course) => {
                changes.apply(course);
                Ok(course.clone())
            }
            None => Err(CoreError::CourseNotFound),
        }
    }

    fn delete(&self, id: &RecordId) -> Result<(), CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        // Removing an absent id still reports success.
        map.remove(id.as_str());
        Ok(())
    }

    fn set_students(&self, id: &RecordId, students: Vec<RecordId>) -> Result<Course, CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        match map.get_mut(id.as_str()) {
            Some(course) => {
                course.students = students;
                Ok(course.clone())
            }
            None => Err(CoreError::CourseNotFound),
        }
    }
}

impl InMemoryStudentRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryStudentRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl StudentRepository for InMemoryStudentRepo {
    fn create(&self, student: Student) -> Result<(), CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        map.insert(student.id.as_str().to_string(), student);
        Ok(())
    }

    fn get(&self, id: &RecordId) -> Result<Option<Student>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.get(id.as_str()).cloned())
    }

    fn list(&self) -> Result<Vec<Student>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.values().cloned().collect())
    }

    fn update(&self, id: &RecordId, changes: &StudentUpdate) -> Result<Student, CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        match map.get_mut(id.as_str()) {
            Some(student) => {
                changes.apply(student);
                Ok(student.clone())
            }
            None => Err(CoreError::StudentNotFound),
        }
    }

    fn delete(&self, id: &RecordId) -> Result<(), CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        map.remove(id.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewCourse, NewStudent};

    fn mk_course(id: &str, name: &str) -> Course {
        Course::new(
            RecordId::new(id),
            NewCourse {
                name: name.to_string(),
                description: "desc".to_string(),
                start_date: None,
                lesson_count: 8,
            },
        )
    }

    fn mk_student(id: &str, fullname: &str) -> Student {
        Student::new(
            RecordId::new(id),
            NewStudent {
                fullname: fullname.to_string(),
                city: Some("Oslo".to_string()),
                ..NewStudent::default()
            },
        )
    }

    #[test]
    fn create_get_roundtrip() {
        let repo = InMemoryCourseRepo::new();
        repo.create(mk_course("c1", "Rust 101")).expect("create");
        let got = repo.get(&RecordId::new("c1")).expect("get").expect("some");
        assert_eq!(got.name, "Rust 101");
        assert!(got.students.is_empty());
    }

    #[test]
    fn update_missing_course_is_not_found() {
        let repo = InMemoryCourseRepo::new();
        let err = repo
            .update(&RecordId::new("nope"), &CourseUpdate::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::CourseNotFound));
    }

    #[test]
    fn update_applies_falsy_skip_merge() {
        let repo = InMemoryCourseRepo::new();
        repo.create(mk_course("c1", "Rust 101")).expect("create");

        let updated = repo
            .update(
                &RecordId::new("c1"),
                &CourseUpdate {
                    name: Some(String::new()),
                    description: Some("hands-on".into()),
                    start_date: None,
                },
            )
            .expect("update");

        assert_eq!(updated.name, "Rust 101");
        assert_eq!(updated.description, "hands-on");
    }

    #[test]
    fn delete_missing_id_reports_success() {
        let courses = InMemoryCourseRepo::new();
        assert!(courses.delete(&RecordId::new("ghost")).is_ok());

        let students = InMemoryStudentRepo::new();
        assert!(students.delete(&RecordId::new("ghost")).is_ok());
    }

    #[test]
    fn set_students_replaces_roster() {
        let repo = InMemoryCourseRepo::new();
        repo.create(mk_course("c1", "Rust 101")).expect("create");

        let updated = repo
            .set_students(
                &RecordId::new("c1"),
                vec![RecordId::new("s1"), RecordId::new("s2")],
            )
            .expect("set roster");
        assert_eq!(updated.students.len(), 2);

        let err = repo
            .set_students(&RecordId::new("missing"), Vec::new())
            .unwrap_err();
        assert!(matches!(err, CoreError::CourseNotFound));
    }

    #[test]
    fn student_update_only_touches_fullname_and_city() {
        let repo = InMemoryStudentRepo::new();
        repo.create(mk_student("s1", "Ada Lovelace")).expect("create");

        let updated = repo
            .update(
                &RecordId::new("s1"),
                &StudentUpdate {
                    fullname: Some("Ada King".into()),
                    city: Some(String::new()),
                },
            )
            .expect("update");

        assert_eq!(updated.fullname, "Ada King");
        assert_eq!(updated.city.as_deref(), Some("Oslo"));
    }

    #[test]
    fn list_returns_every_record() {
        let repo = InMemoryStudentRepo::new();
        for i in 0..4 {
            let id = format!("s{}", i);
            repo.create(mk_student(&id, "Student")).expect("create");
        }
        assert_eq!(repo.list().expect("list").len(), 4);
    }
}
