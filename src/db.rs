use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "timetable.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_groups(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staff(
            id TEXT PRIMARY KEY,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            class_group_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            name TEXT NOT NULL,
            is_optional INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            FOREIGN KEY(class_group_id) REFERENCES class_groups(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(teacher_id) REFERENCES staff(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_class_group ON courses(class_group_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_teacher ON courses(teacher_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedule_slots(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            day_of_week INTEGER NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            classroom TEXT NOT NULL DEFAULT '',
            created_at TEXT,
            updated_at TEXT,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_schedule_slots_course_day
         ON schedule_slots(course_id, day_of_week)",
        [],
    )?;

    // Early workspaces stored slots without audit timestamps. Add if needed.
    ensure_slots_timestamps(&conn)?;

    Ok(conn)
}

fn ensure_slots_timestamps(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "schedule_slots", "created_at")? {
        conn.execute("ALTER TABLE schedule_slots ADD COLUMN created_at TEXT", [])?;
    }
    if !table_has_column(conn, "schedule_slots", "updated_at")? {
        conn.execute("ALTER TABLE schedule_slots ADD COLUMN updated_at TEXT", [])?;
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
