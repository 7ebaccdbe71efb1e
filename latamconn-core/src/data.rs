use crate::error::{CoreError, Result};
use crate::matrix::ConnectivityMatrix;
use latamconn_geo::ArcSet;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// SQLite store for pipeline runs, their matrices and arcs.
pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub id: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub status: RunStatus,
    pub input: String,
    pub records: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArc {
    pub source: String,
    pub target: String,
    pub weight: u64,
    pub points: usize,
}

// SQLite integers are signed; counts beyond i64::MAX cannot be stored.
fn sql_count(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| CoreError::OutOfRange(format!("{} does not fit a database integer", value)))
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl Database {
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    started_at INTEGER NOT NULL,
    finished_at INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed')),
    input TEXT NOT NULL,
    records INTEGER,
    configuration TEXT        -- JSON configuration used
);

-- Row and column labels, in matrix order
CREATE TABLE IF NOT EXISTS matrix_labels (
    run_id TEXT NOT NULL,
    axis TEXT NOT NULL CHECK(axis IN ('row', 'column')),
    position INTEGER NOT NULL,
    label TEXT NOT NULL,
    PRIMARY KEY(run_id, axis, position),
    FOREIGN KEY(run_id) REFERENCES runs(id) ON DELETE CASCADE
);

-- Non-zero cells only
CREATE TABLE IF NOT EXISTS matrix_cells (
    run_id TEXT NOT NULL,
    row_country TEXT NOT NULL,
    column_country TEXT NOT NULL,
    count INTEGER NOT NULL CHECK(count > 0),
    PRIMARY KEY(run_id, row_country, column_country),
    FOREIGN KEY(run_id) REFERENCES runs(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS arcs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    weight INTEGER NOT NULL,
    path TEXT NOT NULL,       -- JSON array of [x, y]
    widths TEXT NOT NULL,     -- JSON array of per-segment widths
    FOREIGN KEY(run_id) REFERENCES runs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_arcs_run ON arcs(run_id);

CREATE TABLE IF NOT EXISTS centroid_failures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    missing TEXT NOT NULL,
    FOREIGN KEY(run_id) REFERENCES runs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_failures_run ON centroid_failures(run_id);
            ",
        )?;
        Ok(())
    }

    // Run management
    pub fn create_run(&self, input: &str, configuration: Option<&str>) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO runs (id, started_at, status, input, configuration) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&run_id, current_timestamp(), RunStatus::Running.as_str(), input, configuration],
        )?;
        Ok(run_id)
    }

    pub fn complete_run(&self, run_id: &str, records: usize) -> Result<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, records = ?3 WHERE id = ?4",
            params![
                RunStatus::Completed.as_str(),
                current_timestamp(),
                sql_count(records as u64)?,
                run_id
            ],
        )?;
        Ok(())
    }

    /// Mark a run as failed and discard any matrix or arcs already stored for it.
    pub fn fail_run(&self, run_id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for table in ["matrix_labels", "matrix_cells", "arcs", "centroid_failures"] {
            tx.execute(
                &format!("DELETE FROM {} WHERE run_id = ?1", table),
                params![run_id],
            )?;
        }
        tx.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Failed.as_str(), current_timestamp(), run_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, status, input, records FROM runs WHERE id = ?1",
        )?;
        let run = stmt.query_row(params![run_id], row_to_run).optional()?;
        Ok(run)
    }

    pub fn list_runs(&self) -> Result<Vec<RunInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, status, input, records FROM runs ORDER BY started_at DESC, id",
        )?;
        let runs = stmt
            .query_map([], row_to_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    // Matrix storage
    pub fn save_matrix(&self, run_id: &str, matrix: &ConnectivityMatrix) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut label = tx.prepare(
                "INSERT INTO matrix_labels (run_id, axis, position, label) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (i, row) in matrix.rows().iter().enumerate() {
                label.execute(params![run_id, "row", i as i64, row])?;
            }
            for (i, column) in matrix.columns().iter().enumerate() {
                label.execute(params![run_id, "column", i as i64, column])?;
            }

            let mut cell = tx.prepare(
                "INSERT INTO matrix_cells (run_id, row_country, column_country, count) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (row, column, count) in matrix.nonzero_cells() {
                cell.execute(params![run_id, row, column, sql_count(count)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_matrix(&self, run_id: &str) -> Result<Option<ConnectivityMatrix>> {
        let labels = |axis: &str| -> Result<Vec<String>> {
            let mut stmt = self.conn.prepare(
                "SELECT label FROM matrix_labels WHERE run_id = ?1 AND axis = ?2 ORDER BY position",
            )?;
            let labels = stmt
                .query_map(params![run_id, axis], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(labels)
        };

        let rows = labels("row")?;
        if rows.is_empty() {
            return Ok(None);
        }
        let columns = labels("column")?;

        let mut stmt = self.conn.prepare(
            "SELECT row_country, column_country, count FROM matrix_cells WHERE run_id = ?1",
        )?;
        let cells = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as u64))
            })?
            .collect::<rusqlite::Result<Vec<(String, String, u64)>>>()?;

        let mut matrix = ConnectivityMatrix::new(rows, columns);
        matrix.set_cells(cells)?;
        Ok(Some(matrix))
    }

    // Arc storage
    pub fn save_arcs(&self, run_id: &str, arcs: &ArcSet) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut insert_arc = tx.prepare(
                "INSERT INTO arcs (run_id, source, target, weight, path, widths) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for arc in &arcs.arcs {
                let path: Vec<[f64; 2]> = arc.path.iter().map(|p| [p.x, p.y]).collect();
                let widths: Vec<f64> = arc.segments.iter().map(|s| s.width).collect();
                insert_arc.execute(params![
                    run_id,
                    &arc.source,
                    &arc.target,
                    sql_count(arc.weight)?,
                    serde_json::to_string(&path)?,
                    serde_json::to_string(&widths)?,
                ])?;
            }

            let mut insert_failure = tx.prepare(
                "INSERT INTO centroid_failures (run_id, source, target, missing) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for failure in &arcs.failures {
                insert_failure.execute(params![
                    run_id,
                    &failure.source,
                    &failure.target,
                    &failure.missing
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_arcs_by_run(&self, run_id: &str) -> Result<Vec<StoredArc>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, target, weight, path FROM arcs WHERE run_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut arcs = Vec::with_capacity(rows.len());
        for (source, target, weight, path) in rows {
            let points: Vec<[f64; 2]> = serde_json::from_str(&path)?;
            arcs.push(StoredArc {
                source,
                target,
                weight: weight as u64,
                points: points.len(),
            });
        }
        Ok(arcs)
    }

    pub fn get_unresolved_by_run(&self, run_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT missing FROM centroid_failures WHERE run_id = ?1 ORDER BY missing",
        )?;
        let names = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunInfo> {
    let status: String = row.get(3)?;
    Ok(RunInfo {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        status: RunStatus::parse(&status).unwrap_or(RunStatus::Failed),
        input: row.get(4)?,
        records: row.get(5)?,
    })
}
