//! Throttle store: persistent claim history backing the daily limits.

use crate::error::{FaucetError, FaucetResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use tracing::{debug, info, warn};

/// One row per claim attempt from a client, recorded regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub client: String,
    pub day: NaiveDate,
    pub recorded_at: i64,
}

/// Claim-history store.
///
/// Two trees: `address_claims` holds at most one row per `(address, day)`
/// and is the eligibility check; `client_attempts` is an append-only audit
/// log bounding per-client request frequency. Rows are pruned only by
/// external maintenance.
pub struct ThrottleStore {
    db: Db,
    address_claims: Tree,
    client_attempts: Tree,
}

impl ThrottleStore {
    /// Create or open the store.
    pub fn open(path: &str) -> FaucetResult<Self> {
        info!("Opening throttle database at: {}", path);

        let db = sled::Config::default().path(path).open()?;
        let address_claims = db.open_tree("address_claims")?;
        let client_attempts = db.open_tree("client_attempts")?;

        Ok(Self {
            db,
            address_claims,
            client_attempts,
        })
    }

    /// Append a claim-attempt row. A storage failure here is logged and never
    /// fails the caller's workflow.
    pub fn record_attempt(&self, client: &str, day: NaiveDate) {
        if let Err(e) = self.try_record_attempt(client, day) {
            warn!(client, error = %e, "failed to record claim attempt");
        }
    }

    fn try_record_attempt(&self, client: &str, day: NaiveDate) -> FaucetResult<()> {
        let seq = self.db.generate_id()?;
        let key = format!("{}/{}/{:020}", client, day, seq);
        let record = AttemptRecord {
            client: client.to_string(),
            day,
            recorded_at: chrono::Utc::now().timestamp(),
        };
        let value =
            bincode::serialize(&record).map_err(|e| FaucetError::Internal(e.to_string()))?;
        self.client_attempts.insert(key.as_bytes(), value)?;
        debug!(client, %day, "recorded claim attempt");
        Ok(())
    }

    /// Number of attempt rows for this client and day, the most recent
    /// `record_attempt` included.
    pub fn attempts_today(&self, client: &str, day: NaiveDate) -> FaucetResult<u64> {
        let prefix = format!("{}/{}/", client, day);
        let mut count = 0u64;
        for item in self.client_attempts.scan_prefix(prefix.as_bytes()) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Claim `(address, day)`: a single atomic insert-if-absent, so two
    /// concurrent claims for the same pair yield exactly one `true`. Returns
    /// `false` when the address already claimed that day.
    pub fn claim_address_for_day(&self, address: &str, day: NaiveDate) -> FaucetResult<bool> {
        let key = format!("{}/{}", address, day);
        let stamp = chrono::Utc::now().timestamp().to_be_bytes();
        let swap = self
            .address_claims
            .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(&stamp[..]))?;
        match swap {
            Ok(()) => {
                debug!(address, %day, "address claimed for the day");
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Whether an address-claim row exists for the pair.
    pub fn address_claimed(&self, address: &str, day: NaiveDate) -> FaucetResult<bool> {
        let key = format!("{}/{}", address, day);
        Ok(self.address_claims.get(key.as_bytes())?.is_some())
    }

    /// Commit recent writes to disk. Called from the persistence loop.
    pub async fn flush(&self) -> FaucetResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}
