//! SQLite-backed migration ledger.
//!
//! One row per migration, identifier as primary key. `claim` runs inside
//! a `BEGIN IMMEDIATE` transaction so two processes racing on the same
//! identifier serialize on SQLite's write lock and the loser sees the
//! winner's row instead of inserting a duplicate.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use strata_core::config::LedgerConfig;
use strata_core::errors::LedgerError;
use strata_core::models::{Direction, Lease, MigrationId, MigrationRecord, MigrationStatus};
use strata_core::traits::Ledger;

use crate::pragmas::apply_pragmas;

/// Durable migration ledger in a SQLite table.
///
/// The table name comes from configuration and is validated here before
/// it is ever spliced into SQL.
#[derive(Debug)]
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    table: String,
    stale_after_secs: i64,
}

impl SqliteLedger {
    /// Open a ledger backed by a database file.
    pub fn open(path: &Path, config: &LedgerConfig) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)
            .map_err(|e| LedgerError::backend(format!("open {}: {e}", path.display())))?;
        Self::with_connection(conn, config)
    }

    /// Open an in-memory ledger, for tests and dry runs.
    pub fn open_in_memory(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::backend(format!("open in-memory: {e}")))?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: &LedgerConfig) -> Result<Self, LedgerError> {
        let table = config.effective_table().to_string();
        if !valid_table_name(&table) {
            return Err(LedgerError::backend(format!(
                "invalid ledger table name {table:?}"
            )));
        }
        apply_pragmas(&conn).map_err(|e| LedgerError::backend(format!("pragmas: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            table,
            stale_after_secs: config.effective_stale_after_secs() as i64,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::backend("ledger connection poisoned"))
    }

    /// Decide what an existing row means for this claim. Runs inside the
    /// claim transaction.
    fn claim_existing(
        &self,
        tx: &Connection,
        record: MigrationRecord,
        checksum: &str,
        version: Option<&str>,
        direction: Direction,
    ) -> Result<Lease, LedgerError> {
        let identifier = record.identifier.to_string();
        match record.status {
            MigrationStatus::Completed => {
                if record.checksum != checksum {
                    return Err(LedgerError::ChecksumMismatch {
                        identifier,
                        stored: record.checksum,
                        actual: checksum.to_string(),
                    });
                }
                match direction {
                    Direction::Up => Err(LedgerError::AlreadyApplied { identifier }),
                    Direction::Down => {
                        self.mark_running(tx, &record.identifier, checksum, version, direction)
                    }
                }
            }
            MigrationStatus::Running => {
                let age_secs = record.lease_age(Utc::now()).num_seconds();
                if age_secs > self.stale_after_secs {
                    Err(LedgerError::StaleLease {
                        identifier,
                        age_secs,
                    })
                } else {
                    Err(LedgerError::AlreadyRunning { identifier })
                }
            }
            // Failed and rolled-back migrations are claimable again for a
            // forward retry; the checksum is refreshed in case the
            // definition was corrected since the failure.
            MigrationStatus::Failed | MigrationStatus::RolledBack => match direction {
                Direction::Up => {
                    self.mark_running(tx, &record.identifier, checksum, version, direction)
                }
                Direction::Down => Err(LedgerError::InvalidTransition {
                    identifier,
                    status: record.status,
                    direction,
                }),
            },
            MigrationStatus::RevertFailed => Err(LedgerError::RevertFailedResidue { identifier }),
            MigrationStatus::Pending => Err(LedgerError::InvalidTransition {
                identifier,
                status: record.status,
                direction,
            }),
        }
    }

    /// Insert a fresh `running` row and return its lease.
    fn insert_running(
        &self,
        tx: &Connection,
        identifier: &MigrationId,
        checksum: &str,
        version: Option<&str>,
    ) -> Result<Lease, LedgerError> {
        let token = Uuid::new_v4();
        let result = tx.execute(
            &format!(
                "INSERT INTO {} (identifier, checksum, status, direction, lease_token,
                                 started_at, completed_at, version, error)
                 VALUES (?1, ?2, 'running', 'up', ?3, ?4, NULL, ?5, NULL)",
                self.table
            ),
            params![
                identifier.as_str(),
                checksum,
                token.to_string(),
                Utc::now().to_rfc3339(),
                version,
            ],
        );
        match result {
            Ok(_) => Ok(Lease {
                identifier: identifier.clone(),
                token,
                direction: Direction::Up,
            }),
            // Another process inserted between our read and write. Only
            // possible without the immediate transaction, but mapped
            // anyway so the constraint is a second line of defense.
            Err(e) if is_constraint_violation(&e) => Err(LedgerError::AlreadyRunning {
                identifier: identifier.to_string(),
            }),
            Err(e) => Err(LedgerError::backend(format!("claim insert: {e}"))),
        }
    }

    /// Re-point an existing row at a new lease.
    fn mark_running(
        &self,
        tx: &Connection,
        identifier: &MigrationId,
        checksum: &str,
        version: Option<&str>,
        direction: Direction,
    ) -> Result<Lease, LedgerError> {
        let token = Uuid::new_v4();
        tx.execute(
            &format!(
                "UPDATE {} SET checksum = ?2, status = 'running', direction = ?3,
                               lease_token = ?4, started_at = ?5, completed_at = NULL,
                               version = ?6, error = NULL
                 WHERE identifier = ?1",
                self.table
            ),
            params![
                identifier.as_str(),
                checksum,
                direction.as_str(),
                token.to_string(),
                Utc::now().to_rfc3339(),
                version,
            ],
        )
        .map_err(|e| LedgerError::backend(format!("claim update: {e}")))?;
        Ok(Lease {
            identifier: identifier.clone(),
            token,
            direction,
        })
    }

    fn find_in(&self, conn: &Connection, identifier: &str) -> Result<Option<MigrationRecord>, LedgerError> {
        let raw = conn
            .query_row(
                &format!(
                    "SELECT identifier, checksum, status, direction, lease_token,
                            started_at, completed_at, version, error
                     FROM {} WHERE identifier = ?1",
                    self.table
                ),
                params![identifier],
                read_raw,
            )
            .optional()
            .map_err(|e| LedgerError::backend(format!("find: {e}")))?;
        raw.map(RawRecord::into_record).transpose()
    }
}

impl Ledger for SqliteLedger {
    fn ensure_ready(&self) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                identifier TEXT PRIMARY KEY,
                checksum TEXT NOT NULL,
                status TEXT NOT NULL,
                direction TEXT NOT NULL,
                lease_token TEXT,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                version TEXT,
                error TEXT
            ) STRICT;
            CREATE INDEX IF NOT EXISTS idx_{t}_status ON {t}(status);",
            t = self.table
        ))
        .map_err(|e| LedgerError::backend(format!("ensure_ready: {e}")))
    }

    fn claim(
        &self,
        identifier: &MigrationId,
        checksum: &str,
        version: Option<&str>,
        direction: Direction,
    ) -> Result<Lease, LedgerError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| LedgerError::backend(format!("claim begin: {e}")))?;

        let lease = match self.find_in(&tx, identifier.as_str())? {
            None => match direction {
                Direction::Up => self.insert_running(&tx, identifier, checksum, version)?,
                Direction::Down => {
                    return Err(LedgerError::RecordNotFound {
                        identifier: identifier.to_string(),
                    })
                }
            },
            Some(record) => self.claim_existing(&tx, record, checksum, version, direction)?,
        };

        tx.commit()
            .map_err(|e| LedgerError::backend(format!("claim commit: {e}")))?;
        tracing::debug!(
            identifier = %lease.identifier,
            direction = %lease.direction,
            "migration claimed"
        );
        Ok(lease)
    }

    fn commit(&self, lease: Lease) -> Result<(), LedgerError> {
        let status = match lease.direction {
            Direction::Up => MigrationStatus::Completed,
            Direction::Down => MigrationStatus::RolledBack,
        };
        let conn = self.lock()?;
        let updated = conn
            .execute(
                &format!(
                    "UPDATE {} SET status = ?3, completed_at = ?4, lease_token = NULL, error = NULL
                     WHERE identifier = ?1 AND lease_token = ?2",
                    self.table
                ),
                params![
                    lease.identifier.as_str(),
                    lease.token.to_string(),
                    status.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| LedgerError::backend(format!("commit: {e}")))?;
        if updated == 0 {
            return Err(LedgerError::LeaseInvalid {
                identifier: lease.identifier.to_string(),
            });
        }
        Ok(())
    }

    fn fail(&self, lease: Lease, error: &str) -> Result<(), LedgerError> {
        let status = match lease.direction {
            Direction::Up => MigrationStatus::Failed,
            Direction::Down => MigrationStatus::RevertFailed,
        };
        let conn = self.lock()?;
        let updated = conn
            .execute(
                &format!(
                    "UPDATE {} SET status = ?3, completed_at = ?4, lease_token = NULL, error = ?5
                     WHERE identifier = ?1 AND lease_token = ?2",
                    self.table
                ),
                params![
                    lease.identifier.as_str(),
                    lease.token.to_string(),
                    status.as_str(),
                    Utc::now().to_rfc3339(),
                    error,
                ],
            )
            .map_err(|e| LedgerError::backend(format!("fail: {e}")))?;
        if updated == 0 {
            return Err(LedgerError::LeaseInvalid {
                identifier: lease.identifier.to_string(),
            });
        }
        Ok(())
    }

    fn list_completed(&self) -> Result<BTreeSet<MigrationId>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT identifier FROM {} WHERE status = 'completed'",
                self.table
            ))
            .map_err(|e| LedgerError::backend(format!("list_completed: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| LedgerError::backend(format!("list_completed: {e}")))?;

        let mut completed = BTreeSet::new();
        for row in rows {
            let raw = row.map_err(|e| LedgerError::backend(format!("list_completed: {e}")))?;
            completed.insert(parse_identifier(&raw)?);
        }
        Ok(completed)
    }

    fn records(&self) -> Result<Vec<MigrationRecord>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT identifier, checksum, status, direction, lease_token,
                        started_at, completed_at, version, error
                 FROM {}",
                self.table
            ))
            .map_err(|e| LedgerError::backend(format!("records: {e}")))?;
        let rows = stmt
            .query_map([], read_raw)
            .map_err(|e| LedgerError::backend(format!("records: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| LedgerError::backend(format!("records: {e}")))?;
            records.push(raw.into_record()?);
        }
        // TEXT ordering puts "10-" before "2-"; sort by parsed identifier.
        records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(records)
    }

    fn find(&self, identifier: &MigrationId) -> Result<Option<MigrationRecord>, LedgerError> {
        let conn = self.lock()?;
        self.find_in(&conn, identifier.as_str())
    }

    fn reclaim(&self, identifier: &MigrationId) -> Result<MigrationRecord, LedgerError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| LedgerError::backend(format!("reclaim begin: {e}")))?;

        let record = self
            .find_in(&tx, identifier.as_str())?
            .ok_or_else(|| LedgerError::RecordNotFound {
                identifier: identifier.to_string(),
            })?;

        let reclaimable = match record.status {
            MigrationStatus::Running => {
                record.lease_age(Utc::now()).num_seconds() > self.stale_after_secs
            }
            MigrationStatus::RevertFailed => true,
            _ => false,
        };
        if !reclaimable {
            return Err(LedgerError::NotReclaimable {
                identifier: identifier.to_string(),
                status: record.status,
            });
        }

        tx.execute(
            &format!(
                "UPDATE {} SET status = 'failed', lease_token = NULL WHERE identifier = ?1",
                self.table
            ),
            params![identifier.as_str()],
        )
        .map_err(|e| LedgerError::backend(format!("reclaim: {e}")))?;

        let reclaimed = self
            .find_in(&tx, identifier.as_str())?
            .ok_or_else(|| LedgerError::RecordNotFound {
                identifier: identifier.to_string(),
            })?;
        tx.commit()
            .map_err(|e| LedgerError::backend(format!("reclaim commit: {e}")))?;
        tracing::info!(identifier = %identifier, previous = %record.status, "lease reclaimed");
        Ok(reclaimed)
    }
}

/// Ledger row before type conversion.
struct RawRecord {
    identifier: String,
    checksum: String,
    status: String,
    direction: String,
    lease_token: Option<String>,
    started_at: String,
    completed_at: Option<String>,
    version: Option<String>,
    error: Option<String>,
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        identifier: row.get(0)?,
        checksum: row.get(1)?,
        status: row.get(2)?,
        direction: row.get(3)?,
        lease_token: row.get(4)?,
        started_at: row.get(5)?,
        completed_at: row.get(6)?,
        version: row.get(7)?,
        error: row.get(8)?,
    })
}

impl RawRecord {
    fn into_record(self) -> Result<MigrationRecord, LedgerError> {
        let corrupt = |what: &str| {
            LedgerError::backend(format!(
                "corrupt ledger row {:?}: bad {what}",
                self.identifier
            ))
        };
        Ok(MigrationRecord {
            identifier: parse_identifier(&self.identifier)?,
            status: MigrationStatus::parse(&self.status).ok_or_else(|| corrupt("status"))?,
            direction: Direction::parse(&self.direction).ok_or_else(|| corrupt("direction"))?,
            lease_token: match &self.lease_token {
                Some(token) => Some(Uuid::parse_str(token).map_err(|_| corrupt("lease_token"))?),
                None => None,
            },
            started_at: parse_timestamp(&self.started_at).ok_or_else(|| corrupt("started_at"))?,
            completed_at: match &self.completed_at {
                Some(ts) => Some(parse_timestamp(ts).ok_or_else(|| corrupt("completed_at"))?),
                None => None,
            },
            checksum: self.checksum,
            version: self.version,
            error: self.error,
        })
    }
}

fn parse_identifier(raw: &str) -> Result<MigrationId, LedgerError> {
    MigrationId::parse(raw)
        .map_err(|e| LedgerError::backend(format!("corrupt ledger row {raw:?}: {e}")))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
