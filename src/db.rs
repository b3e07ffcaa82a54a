use std::collections::HashMap;

use anyhow::{anyhow, bail, Context};
use chrono::{Duration, NaiveDate};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::curriculum::{parse_field_name, PERFECT_SCORE};
use crate::mock::{self, MockConfig};
use crate::models::{
    ClassPeriod, CompletionStatus, Course, Enrollment, FieldValue, Student, StudentRecord,
};

const SEED_COURSE: (&str, &str) = (
    "Integrated Math",
    "Project-based math curriculum: ten units from Forensic Math to Home Makeover",
);

const SEED_PERIODS: [(&str, &str); 4] = [
    ("Period 1", "9:00 AM"),
    ("Period 2", "10:30 AM"),
    ("Period 3", "1:00 PM"),
    ("Period 4", "2:30 PM"),
];

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Loads a demo course with four periods and generated students, returning
/// the number of students written.
pub async fn seed(pool: &PgPool, config: &MockConfig) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    let courseid: Uuid = sqlx::query(
        r#"
        INSERT INTO gradebook.courses (courseid, coursename, coursedescription)
        VALUES ($1, $2, $3)
        ON CONFLICT (coursename) DO UPDATE
        SET coursedescription = EXCLUDED.coursedescription
        RETURNING courseid
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(SEED_COURSE.0)
    .bind(SEED_COURSE.1)
    .fetch_one(&mut *tx)
    .await?
    .get("courseid");

    let mut periods = Vec::new();
    for (name, schedule) in SEED_PERIODS {
        let periodid: Uuid = sqlx::query(
            r#"
            INSERT INTO gradebook.classperiods (periodid, courseid, periodname, schedule)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (courseid, periodname) DO UPDATE
            SET schedule = EXCLUDED.schedule
            RETURNING periodid
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(courseid)
        .bind(name)
        .bind(schedule)
        .fetch_one(&mut *tx)
        .await?
        .get("periodid");
        periods.push(periodid);
    }

    let term_start = NaiveDate::from_ymd_opt(2026, 1, 12).context("invalid date")?;
    let records = mock::generate_records(config);

    for (position, record) in records.iter().enumerate() {
        let email = format!(
            "{}.{}{}@example.com",
            record.first_name.to_lowercase(),
            record.last_name.to_lowercase(),
            position + 1
        );
        let studentid =
            upsert_student(&mut tx, &record.first_name, &record.last_name, &email).await?;

        sqlx::query(
            r#"
            INSERT INTO gradebook.enrollments
            (enrollmentid, studentid, periodid, enrollmentdate, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (studentid, periodid) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(studentid)
        .bind(periods[position % periods.len()])
        .bind(term_start - Duration::days((position % 14) as i64))
        .bind("Active")
        .execute(&mut *tx)
        .await?;

        let mut fields = Vec::with_capacity(record.fields.len());
        let mut scores = Vec::with_capacity(record.fields.len());
        let mut statuses = Vec::with_capacity(record.fields.len());
        for (field, value) in &record.fields {
            let (score, status) = entry_columns(*value);
            fields.push(field.clone());
            scores.push(score);
            statuses.push(status);
        }

        sqlx::query(
            r#"
            INSERT INTO gradebook.grade_entries (studentid, field, score, status)
            SELECT $1, entry.field, entry.score, entry.status
            FROM UNNEST($2::text[], $3::int4[], $4::text[]) AS entry(field, score, status)
            ON CONFLICT (studentid, field) DO UPDATE
            SET score = EXCLUDED.score, status = EXCLUDED.status
            "#,
        )
        .bind(studentid)
        .bind(&fields)
        .bind(&scores)
        .bind(&statuses)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(students = records.len(), "seeded gradebook");
    Ok(records.len())
}

async fn upsert_student(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> anyhow::Result<Uuid> {
    let studentid = sqlx::query(
        r#"
        INSERT INTO gradebook.students (studentid, firstname, lastname, email)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET firstname = EXCLUDED.firstname, lastname = EXCLUDED.lastname
        RETURNING studentid
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .fetch_one(&mut **tx)
    .await?
    .get("studentid");
    Ok(studentid)
}

/// Splits a field value into the `score`/`status` column pair.
pub fn entry_columns(value: FieldValue) -> (Option<i32>, Option<String>) {
    match value {
        FieldValue::Score(score) => (i32::try_from(score).ok(), None),
        FieldValue::Status(status) => (None, Some(status.label().to_string())),
    }
}

pub fn entry_value(score: Option<i32>, status: Option<&str>) -> Option<FieldValue> {
    if let Some(score) = score {
        return u32::try_from(score).ok().map(FieldValue::Score);
    }
    status?.parse().ok().map(FieldValue::Status)
}

/// Checks an imported entry against the field layout: presentations carry a
/// status, everything else a score in 0..=100.
pub fn csv_entry(
    field: &str,
    score: Option<i32>,
    status: Option<&str>,
) -> anyhow::Result<FieldValue> {
    let (_, key) = parse_field_name(field)
        .ok_or_else(|| anyhow!("{field} is not a gradebook field"))?;

    if key.is_presentation() {
        let status = status
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("{field} needs a status"))?;
        let status: CompletionStatus = status.parse().map_err(|err: String| anyhow!(err))?;
        return Ok(FieldValue::Status(status));
    }

    match score {
        Some(score) if (0..=PERFECT_SCORE as i32).contains(&score) => {
            Ok(FieldValue::Score(score as u32))
        }
        Some(score) => bail!("{field} score {score} is outside 0..=100"),
        None => bail!("{field} needs a score"),
    }
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        first_name: String,
        last_name: String,
        field: String,
        score: Option<i32>,
        status: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let value = csv_entry(&row.field, row.score, row.status.as_deref())
            .with_context(|| format!("row {} of {}", line + 1, csv_path.display()))?;
        let studentid =
            upsert_student(&mut tx, &row.first_name, &row.last_name, &row.email).await?;
        let (score, status) = entry_columns(value);

        let result = sqlx::query(
            r#"
            INSERT INTO gradebook.grade_entries (studentid, field, score, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (studentid, field) DO UPDATE
            SET score = EXCLUDED.score, status = EXCLUDED.status
            "#,
        )
        .bind(studentid)
        .bind(&row.field)
        .bind(score)
        .bind(status)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            written += 1;
        }
    }

    tx.commit().await?;
    Ok(written)
}

struct StudentRow {
    student: Student,
    enrollment: Option<Enrollment>,
}

/// Folds joined rows into one document per student, keeping row order.
fn nest_students(rows: Vec<StudentRow>) -> Vec<Student> {
    let mut students: Vec<Student> = Vec::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let position = *positions.entry(row.student.studentid).or_insert_with(|| {
            students.push(row.student.clone());
            students.len() - 1
        });
        if let Some(enrollment) = row.enrollment {
            students[position].enrollments.push(enrollment);
        }
    }

    students
}

pub async fn fetch_students(pool: &PgPool) -> anyhow::Result<Vec<Student>> {
    let records = sqlx::query(
        "SELECT s.studentid, s.firstname, s.lastname, s.email, \
         e.enrollmentid, e.enrollmentdate, e.status, \
         p.periodid, p.periodname, p.schedule, \
         c.courseid, c.coursename, c.coursedescription \
         FROM gradebook.students s \
         LEFT JOIN gradebook.enrollments e ON e.studentid = s.studentid \
         LEFT JOIN gradebook.classperiods p ON p.periodid = e.periodid \
         LEFT JOIN gradebook.courses c ON c.courseid = p.courseid \
         ORDER BY s.lastname, s.firstname, s.studentid, e.enrollmentdate",
    )
    .fetch_all(pool)
    .await?;

    let mut rows = Vec::with_capacity(records.len());
    for row in records {
        let course = match row.try_get::<Option<Uuid>, _>("courseid")? {
            Some(courseid) => Some(Course {
                courseid,
                coursename: row.try_get("coursename")?,
                coursedescription: row.try_get("coursedescription")?,
            }),
            None => None,
        };
        let period = match row.try_get::<Option<Uuid>, _>("periodid")? {
            Some(periodid) => Some(ClassPeriod {
                periodid,
                periodname: row.try_get("periodname")?,
                schedule: row.try_get("schedule")?,
                courses: course,
            }),
            None => None,
        };
        let enrollment = match row.try_get::<Option<Uuid>, _>("enrollmentid")? {
            Some(enrollmentid) => Some(Enrollment {
                enrollmentid,
                enrollmentdate: row.try_get("enrollmentdate")?,
                status: row.try_get("status")?,
                classperiods: period,
            }),
            None => None,
        };

        rows.push(StudentRow {
            student: Student {
                studentid: row.try_get("studentid")?,
                firstname: row.try_get("firstname")?,
                lastname: row.try_get("lastname")?,
                email: row.try_get("email")?,
                enrollments: Vec::new(),
            },
            enrollment,
        });
    }

    Ok(nest_students(rows))
}

/// Grade entries grouped into one flat record per student.
pub async fn fetch_student_records(pool: &PgPool) -> anyhow::Result<Vec<StudentRecord>> {
    let rows = sqlx::query(
        "SELECT s.studentid, s.firstname, s.lastname, g.field, g.score, g.status \
         FROM gradebook.students s \
         LEFT JOIN gradebook.grade_entries g ON g.studentid = s.studentid \
         ORDER BY s.lastname, s.firstname, s.studentid, g.field",
    )
    .fetch_all(pool)
    .await?;

    let mut records: Vec<StudentRecord> = Vec::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let studentid: Uuid = row.try_get("studentid")?;
        let position = match positions.get(&studentid) {
            Some(position) => *position,
            None => {
                let first_name: String = row.try_get("firstname")?;
                let last_name: String = row.try_get("lastname")?;
                records.push(StudentRecord::new(&first_name, &last_name));
                positions.insert(studentid, records.len() - 1);
                records.len() - 1
            }
        };

        let Some(field) = row.try_get::<Option<String>, _>("field")? else {
            continue;
        };
        let score: Option<i32> = row.try_get("score")?;
        let status: Option<String> = row.try_get("status")?;
        match entry_value(score, status.as_deref()) {
            Some(value) => {
                records[position].fields.insert(field, value);
            }
            None => warn!(%studentid, %field, "skipping unreadable grade entry"),
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: Uuid, first: &str) -> Student {
        Student {
            studentid: id,
            firstname: first.to_string(),
            lastname: "Lee".to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            enrollments: Vec::new(),
        }
    }

    fn enrollment(period: &str) -> Enrollment {
        Enrollment {
            enrollmentid: Uuid::new_v4(),
            enrollmentdate: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            status: "Active".to_string(),
            classperiods: Some(ClassPeriod {
                periodid: Uuid::new_v4(),
                periodname: period.to_string(),
                schedule: "9:00 AM".to_string(),
                courses: None,
            }),
        }
    }

    #[test]
    fn nests_enrollments_under_their_student() {
        let avery = Uuid::new_v4();
        let jules = Uuid::new_v4();
        let rows = vec![
            StudentRow {
                student: student(avery, "Avery"),
                enrollment: Some(enrollment("Period 1")),
            },
            StudentRow {
                student: student(avery, "Avery"),
                enrollment: Some(enrollment("Period 3")),
            },
            StudentRow {
                student: student(jules, "Jules"),
                enrollment: None,
            },
        ];

        let students = nest_students(rows);
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].firstname, "Avery");
        assert_eq!(students[0].enrollments.len(), 2);
        assert!(students[1].enrollments.is_empty());

        let json = serde_json::to_value(&students[0]).unwrap();
        assert_eq!(
            json["enrollments"][1]["classperiods"]["periodname"],
            "Period 3"
        );
    }

    #[test]
    fn entry_columns_round_trip() {
        for value in [
            FieldValue::Score(0),
            FieldValue::Score(97),
            FieldValue::Status(CompletionStatus::InProgress),
        ] {
            let (score, status) = entry_columns(value);
            assert_eq!(entry_value(score, status.as_deref()), Some(value));
        }
        assert_eq!(entry_value(Some(-4), None), None);
        assert_eq!(entry_value(None, None), None);
    }

    #[test]
    fn csv_entries_are_checked_against_the_layout() {
        assert_eq!(
            csv_entry("grade12_rca", Some(81), None).unwrap(),
            FieldValue::Score(81)
        );
        assert_eq!(
            csv_entry("grade15_presentation2", None, Some("Completed")).unwrap(),
            FieldValue::Status(CompletionStatus::Complete)
        );
        assert!(csv_entry("grade12_moduleGuide", Some(81), None).is_err());
        assert!(csv_entry("grade12_rca", Some(140), None).is_err());
        assert!(csv_entry("grade12_rca", None, Some("Completed")).is_err());
        assert!(csv_entry("grade12_presentation", None, Some(" ")).is_err());
    }
}
