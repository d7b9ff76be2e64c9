//! # store — persisted position state
//!
//! ## File format (`state.json`)
//! ```json
//! {
//!   "version": 1,
//!   "inPosition": true,
//!   "direction": 1,
//!   "entryPrice": 100.0,
//!   "tpsHit": [1, 2]
//! }
//! ```
//! `direction` is `1` long, `-1` short, `null` when flat.
//!
//! Records without `version` were written by the previous bot. They are
//! accepted, and a flat legacy record drops whatever direction, entry price
//! or TP levels it still carried. Version 1 records are validated strictly.
//!
//! No locking: one run at a time is assumed, last writer wins.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BotError;
use crate::models::{OpenPosition, PositionState, Side, NUM_TP};

pub const SCHEMA_VERSION: u32 = 1;

// ─── Port ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Last persisted state, or `Flat` when nothing was ever saved.
    async fn load(&self) -> Result<PositionState, BotError>;

    async fn save(&self, state: &PositionState) -> Result<(), BotError>;
}

// ─── Record ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    #[serde(default)]
    pub version:     Option<u32>,
    pub in_position: bool,
    #[serde(default)]
    pub direction:   Option<i8>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub tps_hit:     Vec<u8>,
}

impl StateRecord {
    /// Fails for an entry price JSON cannot carry, so nothing is written
    /// that `into_state` would later reject.
    pub fn from_state(state: &PositionState) -> Result<Self, String> {
        if let Some(price) = state.entry_price() {
            if !price.is_finite() {
                return Err(format!("entryPrice must be finite, got {price}"));
            }
        }

        let record = match state {
            PositionState::Flat => Self {
                version:     Some(SCHEMA_VERSION),
                in_position: false,
                direction:   None,
                entry_price: None,
                tps_hit:     Vec::new(),
            },
            PositionState::Open(pos) => Self {
                version:     Some(SCHEMA_VERSION),
                in_position: true,
                direction:   Some(pos.side.signum()),
                entry_price: Some(pos.entry_price),
                tps_hit:     pos.take_profits_hit.iter().copied().collect(),
            },
        };
        Ok(record)
    }

    /// Validate and convert. The error string explains the first violation.
    pub fn into_state(self) -> Result<PositionState, String> {
        match self.version {
            None => self.into_state_legacy(),
            Some(SCHEMA_VERSION) => self.into_state_v1(),
            Some(other) => Err(format!(
                "unsupported state version {other} (this build reads up to {SCHEMA_VERSION})"
            )),
        }
    }

    fn into_state_legacy(self) -> Result<PositionState, String> {
        if !self.in_position {
            return Ok(PositionState::Flat);
        }
        self.into_open()
    }

    fn into_state_v1(self) -> Result<PositionState, String> {
        if self.in_position {
            return self.into_open();
        }
        if self.direction.is_some() || self.entry_price.is_some() {
            return Err("flat record must not carry direction or entryPrice".to_string());
        }
        if !self.tps_hit.is_empty() {
            return Err("flat record must not carry tpsHit".to_string());
        }
        Ok(PositionState::Flat)
    }

    fn into_open(self) -> Result<PositionState, String> {
        let side = match self.direction {
            Some(raw) => Side::from_signum(raw)
                .ok_or_else(|| format!("direction must be 1 or -1, got {raw}"))?,
            None => return Err("open record is missing direction".to_string()),
        };
        let entry_price = match self.entry_price {
            Some(price) if price.is_finite() => price,
            Some(price) => return Err(format!("entryPrice must be finite, got {price}")),
            None => return Err("open record is missing entryPrice".to_string()),
        };

        let mut take_profits_hit = BTreeSet::new();
        for level in self.tps_hit {
            if !(1..=NUM_TP).contains(&level) {
                return Err(format!("tpsHit level {level} outside 1..={NUM_TP}"));
            }
            if !take_profits_hit.insert(level) {
                return Err(format!("tpsHit level {level} listed twice"));
            }
        }

        Ok(PositionState::Open(OpenPosition {
            side,
            entry_price,
            take_profits_hit,
        }))
    }
}

// ─── JSON file ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<PositionState, BotError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No saved state — starting flat");
                return Ok(PositionState::Flat);
            }
            Err(e) => {
                return Err(BotError::state_store(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let record: StateRecord = serde_json::from_str(&raw).map_err(|e| {
            BotError::state_store(format!("{} is not a valid state record: {e}", self.path.display()))
        })?;

        let state = record
            .into_state()
            .map_err(|e| BotError::state_store(format!("{}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), %state, "State loaded");
        Ok(state)
    }

    async fn save(&self, state: &PositionState) -> Result<(), BotError> {
        let record = StateRecord::from_state(state)
            .map_err(|e| BotError::state_store(format!("refusing to save state: {e}")))?;
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| BotError::state_store(format!("cannot encode state: {e}")))?;

        // Write-then-rename so a crash never leaves a half-written record
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| BotError::state_store(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            BotError::state_store(format!("cannot replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), %state, "State saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_store() -> (TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        (dir, store)
    }

    fn make_open(side: Side, entry: f64, hit: &[u8]) -> PositionState {
        PositionState::Open(OpenPosition {
            side,
            entry_price:      entry,
            take_profits_hit: hit.iter().copied().collect(),
        })
    }

    fn parse(json: &str) -> Result<PositionState, String> {
        serde_json::from_str::<StateRecord>(json).unwrap().into_state()
    }

    #[tokio::test]
    async fn test_missing_file_loads_flat() {
        let (_dir, store) = make_store();
        assert_eq!(store.load().await.unwrap(), PositionState::Flat);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let (_dir, store) = make_store();
        for state in [
            PositionState::Flat,
            make_open(Side::Long, 67012.5, &[]),
            make_open(Side::Short, 0.123456789, &[1, 3, 5]),
        ] {
            store.save(&state).await.unwrap();
            assert_eq!(store.load().await.unwrap(), state);
        }
    }

    #[tokio::test]
    async fn test_saved_file_layout() {
        let (_dir, store) = make_store();
        store.save(&make_open(Side::Short, 100.0, &[2, 1])).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "version": 1,
                "inPosition": true,
                "direction": -1,
                "entryPrice": 100.0,
                "tpsHit": [1, 2],
            })
        );
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_non_finite_entry_is_never_written() {
        let (_dir, store) = make_store();
        let prev = make_open(Side::Short, 100.0, &[1]);
        store.save(&prev).await.unwrap();

        for price in [f64::NAN, f64::INFINITY] {
            let err = store.save(&make_open(Side::Long, price, &[])).await.unwrap_err();
            assert_eq!(err.collaborator(), Some(crate::error::Collaborator::StateStore));
            assert!(err.to_string().contains("entryPrice must be finite"));
        }

        // Last good record is still on disk and loads
        assert_eq!(store.load().await.unwrap(), prev);
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_store_failure() {
        let (_dir, store) = make_store();
        std::fs::write(store.path(), "{ not json").unwrap();
        let err = store.load().await.unwrap_err();
        assert_eq!(err.collaborator(), Some(crate::error::Collaborator::StateStore));
    }

    #[test]
    fn test_legacy_flat_record_is_normalized() {
        // What the previous bot left behind after a stop-loss exit
        let state = parse(r#"{"inPosition":false,"direction":null,"entryPrice":100,"tpsHit":[1]}"#);
        assert_eq!(state.unwrap(), PositionState::Flat);
    }

    #[test]
    fn test_legacy_open_record() {
        let state = parse(r#"{"inPosition":true,"direction":1,"entryPrice":100.5,"tpsHit":[2]}"#);
        assert_eq!(state.unwrap(), make_open(Side::Long, 100.5, &[2]));
    }

    #[test]
    fn test_v1_flat_with_leftovers_is_rejected() {
        let state = parse(r#"{"version":1,"inPosition":false,"direction":null,"entryPrice":100,"tpsHit":[]}"#);
        assert!(state.is_err());
    }

    #[test]
    fn test_open_record_validation() {
        assert!(parse(r#"{"version":1,"inPosition":true,"direction":0,"entryPrice":1,"tpsHit":[]}"#).is_err());
        assert!(parse(r#"{"version":1,"inPosition":true,"direction":1,"entryPrice":null,"tpsHit":[]}"#).is_err());
        assert!(parse(r#"{"version":1,"inPosition":true,"direction":1,"entryPrice":1,"tpsHit":[6]}"#).is_err());
        assert!(parse(r#"{"version":1,"inPosition":true,"direction":1,"entryPrice":1,"tpsHit":[0]}"#).is_err());
        assert!(parse(r#"{"version":1,"inPosition":true,"direction":1,"entryPrice":1,"tpsHit":[2,2]}"#).is_err());
    }

    #[test]
    fn test_future_version_is_rejected() {
        let err = parse(r#"{"version":2,"inPosition":false,"direction":null,"entryPrice":null,"tpsHit":[]}"#)
            .unwrap_err();
        assert!(err.contains("unsupported state version 2"));
    }
}
