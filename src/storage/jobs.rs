use chrono::{DateTime, Utc};
use redb::{ReadableTable, ReadableTableMetadata};

use super::db::{Database, DatabaseError};
use super::models::{Job, JobEntry};
use super::tables::*;

impl Database {
    // ========================================================================
    // Job queue operations
    // ========================================================================

    /// Append a job to the queue, returning its sequence number
    pub fn push_job(&self, job: &Job) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let seq = {
            let mut table = write_txn.open_table(JOBS)?;
            let next = match table.last()? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            let entry = JobEntry {
                job: job.clone(),
                attempts: 0,
                leased_until: None,
            };
            let data = rmp_serde::to_vec_named(&entry)?;
            table.insert(next, data.as_slice())?;
            next
        };
        write_txn.commit()?;
        Ok(seq)
    }

    /// Lease the oldest job that is not currently leased.
    ///
    /// A job whose lease ended before `now` is deliverable again. The returned
    /// entry already has its attempt counter incremented.
    pub fn lease_next_job(
        &self,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Option<(u64, JobEntry)>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let leased = {
            let mut table = write_txn.open_table(JOBS)?;

            let mut candidate = None;
            for result in table.iter()? {
                let (key, value) = result?;
                let entry: JobEntry = rmp_serde::from_slice(value.value())?;
                let visible = entry.leased_until.map_or(true, |until| until <= now);
                if visible {
                    candidate = Some((key.value(), entry));
                    break;
                }
            }

            match candidate {
                Some((seq, mut entry)) => {
                    entry.attempts += 1;
                    entry.leased_until = Some(lease_until);
                    let data = rmp_serde::to_vec_named(&entry)?;
                    table.insert(seq, data.as_slice())?;
                    Some((seq, entry))
                }
                None => None,
            }
        };

        if leased.is_some() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(leased)
    }

    /// Clear the lease taken by delivery `attempt` so the next
    /// `lease_next_job` can pick the job up.
    ///
    /// Returns false when the job is gone or has since been leased again by a
    /// later delivery; that lease is left alone.
    pub fn release_job(&self, seq: u64, attempt: u32) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let released = {
            let mut table = write_txn.open_table(JOBS)?;
            let existing: Option<JobEntry> = match table.get(seq)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            match existing {
                Some(mut entry) if entry.attempts == attempt => {
                    entry.leased_until = None;
                    let data = rmp_serde::to_vec_named(&entry)?;
                    table.insert(seq, data.as_slice())?;
                    true
                }
                _ => false,
            }
        };

        if released {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(released)
    }

    /// Remove a job settled by delivery `attempt`.
    ///
    /// Returns false when the job is gone or a later delivery holds it.
    pub fn remove_job(&self, seq: u64, attempt: u32) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(JOBS)?;
            let current = match table.get(seq)? {
                Some(data) => {
                    let entry: JobEntry = rmp_serde::from_slice(data.value())?;
                    entry.attempts == attempt
                }
                None => false,
            };
            if current {
                table.remove(seq)?;
            }
            current
        };

        if removed {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(removed)
    }

    /// Number of queued jobs, leased or not
    pub fn job_count(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(JOBS)?;
        Ok(table.len()?)
    }
}
