use std::env;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use domain::adapters::memory_repo::{InMemoryCourseRepo, InMemoryStudentRepo};
use domain::service::RosterService;
use domain::{
    Course, CourseRepository, IdGenerator, NewCourse, NewStudent, RecordId, Student,
    StudentRepository,
};

struct SeqIds(AtomicU64);

impl IdGenerator for SeqIds {
    fn next_id(&self) -> RecordId {
        let n = self.0.fetch_add(1, Ordering::Relaxed);
        RecordId::new(format!("demo-{}", n))
    }
}

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain demo\n  domain enroll <course-name> <student-name> [<student-name> ...]\n\nNotes:\n  - This demo CLI uses in-memory stores; data is not persisted across runs.",
        domain::about()
    );
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    // Construct a demo service with in-memory storage
    let courses = Arc::new(InMemoryCourseRepo::new());
    let students = Arc::new(InMemoryStudentRepo::new());
    let svc = RosterService::new(Arc::clone(&courses), Arc::clone(&students));
    let ids = SeqIds(AtomicU64::new(1));

    match cmd.as_str() {
        // Walk the enrollment flow end to end, including the degraded read
        // after a student deletion.
        "demo" => {
            let course = mk_course(&courses, &ids, "Introduction to Web Development")?;
            let ada = mk_student(&students, &ids, "Ada Lovelace")?;
            let grace = mk_student(&students, &ids, "Grace Hopper")?;

            let enrolled = svc
                .assign(&course.id, &ada.id)
                .map_err(|e| format!("assign failed: {}", e))?;
            println!("enrolled {} -> roster size {}", ada.fullname, enrolled.students.len());

            let repeat = svc
                .assign(&course.id, &ada.id)
                .map_err(|e| format!("repeat assign failed: {}", e))?;
            println!("repeat enroll is a no-op -> roster size {}", repeat.students.len());

            svc.assign(&course.id, &grace.id)
                .map_err(|e| format!("assign failed: {}", e))?;

            students
                .delete(&grace.id)
                .map_err(|e| format!("delete failed: {}", e))?;
            let roster = svc
                .roster_of(&course.id)
                .map_err(|e| format!("roster failed: {}", e))?;
            println!(
                "after deleting {}: roster lists {} student(s)",
                grace.fullname,
                roster.len()
            );
            for student in roster {
                println!("  - {}", student.fullname);
            }
            Ok(())
        }
        "enroll" => {
            let Some(course_name) = args.next() else {
                return Err("missing <course-name> for enroll".into());
            };
            let names: Vec<String> = args.collect();
            if names.is_empty() {
                return Err("enroll needs at least one <student-name>".into());
            }

            let course = mk_course(&courses, &ids, &course_name)?;
            for name in &names {
                let student = mk_student(&students, &ids, name)?;
                svc.assign(&course.id, &student.id)
                    .map_err(|e| format!("assign failed: {}", e))?;
            }

            let roster = svc
                .roster_of(&course.id)
                .map_err(|e| format!("roster failed: {}", e))?;
            println!("{}:", course.name);
            for student in roster {
                println!("  - {} ({})", student.fullname, student.id);
            }
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn mk_course(
    courses: &Arc<InMemoryCourseRepo>,
    ids: &SeqIds,
    name: &str,
) -> Result<Course, String> {
    let course = Course::new(
        ids.next_id(),
        NewCourse {
            name: name.to_string(),
            ..NewCourse::default()
        },
    );
    courses
        .create(course.clone())
        .map_err(|e| format!("create course failed: {}", e))?;
    Ok(course)
}

fn mk_student(
    students: &Arc<InMemoryStudentRepo>,
    ids: &SeqIds,
    fullname: &str,
) -> Result<Student, String> {
    let student = Student::new(
        ids.next_id(),
        NewStudent {
            fullname: fullname.to_string(),
            ..NewStudent::default()
        },
    );
    students
        .create(student.clone())
        .map_err(|e| format!("create student failed: {}", e))?;
    Ok(student)
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
