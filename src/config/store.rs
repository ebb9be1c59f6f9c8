//! The mutable home of the configuration, publishing immutable snapshots.
//! 配置的可变存储，对外发布不可变快照。

use super::{Config, Tunable};
use crate::error::Result;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Owns the operator-adjustable copy of [`Config`].
///
/// Readers take a snapshot per decision; a snapshot never changes after it
/// was published, so a decision sees one consistent set of tunables even while
/// an operator is writing. Writers are serialized among themselves.
///
/// 持有可由运维调整的 [`Config`] 副本。读者每次决策获取一个快照。
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<Config>,
    version: AtomicU64,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// Creates a store publishing `config` as version 0.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            current: ArcSwap::from_pointee(config),
            version: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the latest published snapshot.
    ///
    /// 返回最新发布的快照。
    pub fn snapshot(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// The number of updates published so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Applies `change` to a copy of the current configuration and publishes
    /// it if it still validates. On error nothing is published.
    ///
    /// 对当前配置的副本应用 `change`，若仍然有效则发布。出错时不发布任何内容。
    pub fn update<F>(&self, change: F) -> Result<u64>
    where
        F: FnOnce(&mut Config) -> Result<()>,
    {
        // A poisoned lock only means another writer panicked mid-update; the
        // published snapshot is still whole.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut next = Config::clone(&self.current.load());
        change(&mut next)?;
        next.validate()?;

        self.current.store(Arc::new(next));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(version)
    }

    /// Sets one named tunable from its textual value, the way an operator
    /// interface would.
    ///
    /// 以文本值设置一个具名参数，与运维接口的方式一致。
    pub fn set_tunable(&self, name: &str, value: &str) -> Result<u64> {
        let tunable: Tunable = name.parse()?;
        let result = self.update(|config| tunable.apply(config, value));
        match &result {
            Ok(version) => {
                if self.snapshot().verbosity > 0 {
                    info!(tunable = %tunable, value, version, "Tunable updated");
                }
            }
            Err(e) => warn!(tunable = %tunable, value, error = %e, "Tunable update rejected"),
        }
        result
    }

    /// Reads one named tunable's current value.
    pub fn get_tunable(&self, name: &str) -> Result<String> {
        let tunable: Tunable = name.parse()?;
        Ok(tunable.render(&self.snapshot()))
    }

    /// Renders every tunable as `name=value  # description` lines.
    pub fn describe(&self) -> String {
        let snapshot = self.snapshot();
        Tunable::ALL
            .iter()
            .map(|tunable| {
                format!(
                    "{}={}  # {}",
                    tunable,
                    tunable.render(&snapshot),
                    tunable.description()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(Config::default()),
            version: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }
}
