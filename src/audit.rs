//! Best-effort audit trail.
//!
//! Audit writes must never block or fail order processing. Records go to
//! a separate database file; when a write fails the record is parked in
//! a bounded in-memory dead-letter queue and retried by the background
//! maintenance task. If the queue itself is full, the oldest record is
//! dropped and the loss is logged.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::db::{queries, DbPool};
use crate::models::NewAuditEvent;

/// Maximum number of failed records parked for retry.
const DEAD_LETTER_CAP: usize = 1024;

pub struct AuditLogger {
    pool: DbPool,
    enabled: bool,
    dead_letter: Mutex<VecDeque<NewAuditEvent>>,
}

impl AuditLogger {
    pub fn new(pool: DbPool, enabled: bool) -> Self {
        Self {
            pool,
            enabled,
            dead_letter: Mutex::new(VecDeque::new()),
        }
    }

    /// Record one audit event. Never returns an error: failures are
    /// parked in the dead-letter queue and logged.
    pub fn record(&self, event: NewAuditEvent) {
        if !self.enabled {
            return;
        }

        match self.try_write(&event) {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(
                    order_id = %event.order_id,
                    event_type = ?event.event_type,
                    "audit write failed, parking record: {e}"
                );
                self.park(event);
            }
        }
    }

    fn try_write(&self, event: &NewAuditEvent) -> crate::error::Result<()> {
        let conn = self.pool.get()?;
        queries::create_audit_event(&conn, event)?;
        Ok(())
    }

    fn park(&self, event: NewAuditEvent) {
        let mut queue = match self.dead_letter.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if queue.len() >= DEAD_LETTER_CAP {
            queue.pop_front();
            tracing::error!("audit dead-letter queue full, dropping oldest record");
        }
        queue.push_back(event);
    }

    /// Retry parked records. Records that fail again go back to the
    /// front of the queue in their original order. Returns how many
    /// records were flushed.
    pub fn drain_dead_letters(&self) -> usize {
        let parked: Vec<NewAuditEvent> = {
            let mut queue = match self.dead_letter.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            queue.drain(..).collect()
        };

        if parked.is_empty() {
            return 0;
        }

        let mut flushed = 0;
        let mut still_failing = VecDeque::new();
        for event in parked {
            if still_failing.is_empty() && self.try_write(&event).is_ok() {
                flushed += 1;
            } else {
                // First failure: stop retrying to preserve append order.
                still_failing.push_back(event);
            }
        }

        if !still_failing.is_empty() {
            let mut queue = match self.dead_letter.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // New records may have been parked while we retried.
            for event in still_failing.into_iter().rev() {
                queue.push_front(event);
            }
        }

        if flushed > 0 {
            tracing::info!("flushed {flushed} parked audit records");
        }
        flushed
    }

    /// Audit trail for one order, newest first.
    pub fn list_for_order(&self, order_id: &str) -> crate::error::Result<Vec<crate::models::AuditEvent>> {
        let conn = self.pool.get()?;
        queries::list_audit_events(&conn, order_id)
    }

    pub fn pending_dead_letters(&self) -> usize {
        match self.dead_letter.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
