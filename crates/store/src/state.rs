//! Persisted `{last_symbol, last_timeframe}` selection (§4.3).
//!
//! Write procedure: serialize to JSON, write to a sibling `.tmp` file, then
//! atomically rename over the target. Load procedure: an absent or
//! unreadable/malformed file yields `(None, None)` — read failures are never
//! propagated (§7 "read failures return 'no saved state'").

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trade_agg_core::model::{Symbol, Timeframe};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedSelection {
    #[serde(rename = "lastSymbol")]
    last_symbol: Option<String>,
    #[serde(rename = "lastTimeframe")]
    last_timeframe: Option<String>,
}

/// Resolved, validated selection loaded from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadedSelection {
    pub symbol: Option<Symbol>,
    pub timeframe: Option<Timeframe>,
}

/// Owns the on-disk state file path and performs atomic reads/writes.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// `dir` is the writable directory handed in by `init`'s `stateDirPath`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("state.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted selection. Any failure — missing file, invalid
    /// UTF-8/JSON, or an unsupported symbol/timeframe string — resolves to
    /// `None` for that field rather than propagating an error.
    pub async fn load(&self) -> LoadedSelection {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "no persisted state");
                return LoadedSelection::default();
            }
        };

        let parsed: PersistedSelection = match serde_json::from_slice(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "malformed persisted state, discarding");
                return LoadedSelection::default();
            }
        };

        let symbol = parsed
            .last_symbol
            .as_deref()
            .and_then(|s| s.parse::<Symbol>().ok());
        let timeframe = parsed
            .last_timeframe
            .as_deref()
            .and_then(|s| s.parse::<Timeframe>().ok());

        LoadedSelection { symbol, timeframe }
    }

    /// Atomically persist `(symbol, timeframe)`: write to `state.json.tmp`,
    /// `fsync`, then rename over `state.json`.
    pub async fn save(&self, symbol: Symbol, timeframe: Timeframe) -> anyhow::Result<()> {
        let payload = PersistedSelection {
            last_symbol: Some(symbol.as_str().to_string()),
            last_timeframe: Some(timeframe.as_str().to_string()),
        };
        let serialized = serde_json::to_vec_pretty(&payload)?;

        let tmp_path = tmp_path_for(&self.path);
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        use tokio::io::AsyncWriteExt;
        file.write_all(&serialized).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!(path = %self.path.display(), symbol = %symbol, timeframe = %timeframe, "persisted selection");
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
