pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::Connection;

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    let seeded = queries::seed_business_hours(&conn).context("failed to seed business hours")?;
    if seeded > 0 {
        tracing::info!(days = seeded, "seeded default business hours");
    }

    Ok(conn)
}
