//! Ticket sales totals from a SQLite database

use crate::command::validator::ValidatedCall;
use crate::core::error::{DispatchError, Result};
use crate::operations::{saved_to, write_output};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

const TOTAL_SALES_SQL: &str =
    "SELECT SUM(units * price) FROM tickets WHERE LOWER(type) LIKE ?1";

pub async fn ticket_sales(call: &ValidatedCall) -> Result<String> {
    let ticket_type = call.text("type")?.trim().to_lowercase();
    let database = call.path("input")?.to_path_buf();
    let output = call.path("output")?;

    // rusqlite is synchronous
    let total = tokio::task::spawn_blocking(move || total_sales(&database, &ticket_type))
        .await
        .map_err(|e| DispatchError::OperationFailed(e.to_string()))??;

    write_output(output, format_total(total)).await?;
    Ok(saved_to(output))
}

/// Sum of `units * price` for rows whose type contains `ticket_type`
pub fn total_sales(database: &Path, ticket_type: &str) -> Result<f64> {
    if !database.is_file() {
        return Err(DispatchError::NotFound(PathBuf::from(database)));
    }
    let conn = Connection::open_with_flags(
        database,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let pattern = format!("%{}%", ticket_type.to_lowercase());
    let total: Option<f64> = conn.query_row(TOTAL_SALES_SQL, [pattern], |row| row.get(0))?;
    Ok(total.unwrap_or(0.0))
}

/// `1234` rather than `1234.0` for integral totals
pub fn format_total(total: f64) -> String {
    if total.fract() == 0.0 && total.abs() < 1e15 {
        format!("{}", total as i64)
    } else {
        total.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE tickets (type TEXT, units INTEGER, price REAL);
             INSERT INTO tickets VALUES ('Gold', 2, 100.0);
             INSERT INTO tickets VALUES ('gold', 1, 50.5);
             INSERT INTO tickets VALUES ('Silver', 10, 10.0);",
        )
        .unwrap();
    }

    #[test]
    fn test_total_sales_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("tickets.db");
        seed(&db);
        assert_eq!(total_sales(&db, "GOLD").unwrap(), 250.5);
        assert_eq!(total_sales(&db, "silver").unwrap(), 100.0);
    }

    #[test]
    fn test_no_rows_is_zero() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("tickets.db");
        seed(&db);
        assert_eq!(total_sales(&db, "bronze").unwrap(), 0.0);
    }

    #[test]
    fn test_type_is_bound_not_interpolated() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("tickets.db");
        seed(&db);
        assert_eq!(total_sales(&db, "' OR 1=1 --").unwrap(), 0.0);
    }

    #[test]
    fn test_missing_database() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            total_sales(&dir.path().join("none.db"), "gold"),
            Err(DispatchError::NotFound(_))
        ));
    }

    #[test]
    fn test_format_total() {
        assert_eq!(format_total(100.0), "100");
        assert_eq!(format_total(0.0), "0");
        assert_eq!(format_total(250.5), "250.5");
    }
}
