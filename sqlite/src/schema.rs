//! SQL schema for the `users` table.
//!
//! The table is created with `CREATE TABLE IF NOT EXISTS`, so opening an
//! already-initialized database file is a no-op. `AUTOINCREMENT` keeps
//! identifiers strictly increasing and never reused after a delete.

use rusqlite::Connection;

/// Name of the single table managed by the store.
pub(crate) const USERS_TABLE: &str = "users";

/// Returns the DDL for the `users` table.
pub(crate) fn schema_sql() -> &'static str {
    r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
"#
}

/// Checks whether the `users` table exists.
pub(crate) fn tables_exist(conn: &Connection) -> rusqlite::Result<bool> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1")?;
    let count: i64 = stmt.query_row([USERS_TABLE], |row| row.get(0))?;
    Ok(count > 0)
}

/// Counts rows in the `users` table.
pub(crate) fn count_users(conn: &Connection) -> rusqlite::Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_sql_declares_constraints() {
        let sql = schema_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("username TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("email TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("created_at DATETIME DEFAULT CURRENT_TIMESTAMP"));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!tables_exist(&conn).unwrap());

        conn.execute_batch(schema_sql()).unwrap();
        conn.execute_batch(schema_sql()).unwrap();
        assert!(tables_exist(&conn).unwrap());
        assert_eq!(count_users(&conn).unwrap(), 0);
    }

    #[test]
    fn test_unique_columns_reject_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(schema_sql()).unwrap();

        conn.execute(
            "INSERT INTO users (username, email) VALUES ('a', 'a@x.com')",
            [],
        )
        .unwrap();

        // same username, different email
        assert!(
            conn.execute(
                "INSERT INTO users (username, email) VALUES ('a', 'b@x.com')",
                [],
            )
            .is_err()
        );
        // same email, different username
        assert!(
            conn.execute(
                "INSERT INTO users (username, email) VALUES ('b', 'a@x.com')",
                [],
            )
            .is_err()
        );
        assert_eq!(count_users(&conn).unwrap(), 1);
    }
}
