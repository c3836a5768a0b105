//! SQL schema for the tutorhub SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Keyed by the identity provider's numeric id; never generated locally.
CREATE TABLE IF NOT EXISTS users (
    npm       INTEGER PRIMARY KEY,
    username  TEXT    NOT NULL,
    name      TEXT    NOT NULL DEFAULT '',
    is_admin  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS courses (
    id              TEXT    PRIMARY KEY,
    name            TEXT    NOT NULL,
    matkul          TEXT    NOT NULL,   -- subject code
    datetime        TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
    link            TEXT,
    students_limit  INTEGER,            -- NULL means unlimited
    notes           TEXT,
    notes_short     TEXT,
    hidden          INTEGER NOT NULL DEFAULT 0,
    teacher         INTEGER NOT NULL REFERENCES users(npm)
);

CREATE TABLE IF NOT EXISTS course_students (
    course_id  TEXT    NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    student    INTEGER NOT NULL REFERENCES users(npm),
    PRIMARY KEY (course_id, student)
);

CREATE INDEX IF NOT EXISTS courses_datetime_idx ON courses(datetime);
CREATE INDEX IF NOT EXISTS courses_teacher_idx  ON courses(teacher);
CREATE INDEX IF NOT EXISTS course_students_student_idx
    ON course_students(student);

PRAGMA user_version = 1;
";
