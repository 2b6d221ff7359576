//! Student gateway contract and SQLite implementation.

use rusqlite::{params, Row};

use super::{check_schema, BatchPersist, SharedConnection, StorageError, StorageResult};
use crate::model::reservation::StudentId;
use crate::model::student::Student;

const STUDENT_SELECT_SQL: &str = "SELECT
    student_id,
    name
FROM students";

/// Row-level persistence contract for students.
pub trait StudentGateway: BatchPersist<Student> + Send + Sync {
    fn find(&self, id: StudentId) -> StorageResult<Option<Student>>;
    fn find_all(&self) -> StorageResult<Vec<Student>>;
    fn reset(&self) -> StorageResult<()>;
}

/// SQLite-backed student gateway.
pub struct SqliteStudentGateway {
    conn: SharedConnection,
}

impl SqliteStudentGateway {
    /// Wraps a bootstrapped connection, verifying the schema is usable.
    pub fn try_new(conn: SharedConnection) -> StorageResult<Self> {
        check_schema(&conn.lock(), "students")?;
        Ok(Self { conn })
    }
}

impl StudentGateway for SqliteStudentGateway {
    fn find(&self, id: StudentId) -> StorageResult<Option<Student>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{STUDENT_SELECT_SQL} WHERE student_id = ?1;"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }
        Ok(None)
    }

    fn find_all(&self) -> StorageResult<Vec<Student>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{STUDENT_SELECT_SQL} ORDER BY student_id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn reset(&self) -> StorageResult<()> {
        self.conn.lock().execute("DELETE FROM students;", [])?;
        Ok(())
    }
}

impl BatchPersist<Student> for SqliteStudentGateway {
    fn insert_rows(&self, rows: &[Student]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for student in rows {
            conn.execute(
                "INSERT INTO students (student_id, name) VALUES (?1, ?2);",
                params![student.id, student.name],
            )?;
        }
        Ok(())
    }

    fn update_rows(&self, rows: &[Student]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for student in rows {
            let changed = conn.execute(
                "UPDATE students SET name = ?1 WHERE student_id = ?2;",
                params![student.name, student.id],
            )?;
            if changed == 0 {
                return Err(StorageError::MissingRow {
                    table: "students",
                    id: student.id,
                });
            }
        }
        Ok(())
    }

    fn delete_rows(&self, rows: &[Student]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for student in rows {
            conn.execute(
                "DELETE FROM students WHERE student_id = ?1;",
                params![student.id],
            )?;
        }
        Ok(())
    }
}

fn parse_student_row(row: &Row<'_>) -> StorageResult<Student> {
    Ok(Student {
        id: row.get("student_id")?,
        name: row.get("name")?,
    })
}
