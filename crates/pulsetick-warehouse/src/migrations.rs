use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_market_metrics",
        sql: r#"
CREATE TABLE IF NOT EXISTS market_metrics (
    ts TEXT NOT NULL,
    metric_name TEXT NOT NULL,
    trade_date TEXT NOT NULL,
    metric_value DOUBLE,
    data_type TEXT NOT NULL DEFAULT 'premarket',
    source TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(ts, metric_name)
);

CREATE TABLE IF NOT EXISTS daily_snapshots (
    date TEXT PRIMARY KEY,
    snapshot_time TEXT NOT NULL,
    metrics TEXT NOT NULL,
    is_complete BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS collection_runs (
    run_id TEXT NOT NULL,
    family TEXT NOT NULL,
    source TEXT,
    status TEXT NOT NULL,
    records_processed BIGINT NOT NULL,
    latency_ms BIGINT,
    recorded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_market_metrics_name_date ON market_metrics(metric_name, trade_date);
CREATE INDEX IF NOT EXISTS idx_collection_runs_family ON collection_runs(family, recorded_at);
"#,
    },
];

/// Apply pending schema migrations in order, recording each applied version.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying warehouse migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
