//! Registration of congestion control algorithms with the host runtime.
//! 拥塞控制算法在宿主运行时中的注册。
//!
//! Deregistration follows a drain-then-force contract: stop admitting new
//! sessions, poll a bounded number of times for the active ones to drain,
//! and only then either remove the algorithm or refuse (unless forced).

use crate::config::ConfigStore;
use crate::config::tunable::format_gain;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::stats::GlobalStats;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::time::{Instant, sleep};
use tracing::{info, trace, warn};

/// One registered algorithm: its configuration, aggregates and admission gate.
///
/// 一个已注册的算法：配置、汇总统计与准入开关。
#[derive(Debug)]
pub struct Registration {
    name: String,
    config: Arc<ConfigStore>,
    stats: Arc<GlobalStats>,
    accepting: AtomicBool,
    /// Admissions past the gate whose session is not yet counted as active.
    admitting: AtomicUsize,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn stats(&self) -> &GlobalStats {
        &self.stats
    }

    pub(crate) fn stats_handle(&self) -> Arc<GlobalStats> {
        Arc::clone(&self.stats)
    }

    /// Whether new sessions are currently admitted.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Runs `open` if admission is open. The admission is visible to
    /// [`Self::pending_sessions`] from before the gate is checked until the
    /// opened session is counted as active, so a drain cannot miss it.
    ///
    /// 若准入开放则执行 `open`。从检查准入开关前到会话计入活跃数为止，
    /// 该准入对排空过程可见。
    fn admit<T>(&self, open: impl FnOnce() -> T) -> Option<T> {
        self.admitting.fetch_add(1, Ordering::SeqCst);
        let admitted = self.accepting.load(Ordering::SeqCst).then(open);
        self.admitting.fetch_sub(1, Ordering::SeqCst);
        admitted
    }

    /// Sessions a drain waits for: active ones plus admissions in flight.
    fn pending_sessions(&self) -> usize {
        // In-flight first: an admission leaving that count is already active.
        let admitting = self.admitting.load(Ordering::SeqCst);
        admitting + self.stats.active_sessions()
    }

    /// Closes admission. Fails if another deregistration already closed it.
    fn close_admission(&self) -> bool {
        self.accepting
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn reopen_admission(&self) {
        self.accepting.store(true, Ordering::SeqCst);
    }
}

/// How a deregistration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unregistered {
    /// Every session drained before the algorithm was removed.
    Drained,
    /// Removed while sessions were still active.
    Forced { remaining: usize },
}

/// The host runtime's table of congestion control algorithms, keyed by name.
///
/// 宿主运行时中按名称索引的拥塞控制算法表。
#[derive(Debug, Default)]
pub struct Registry {
    algorithms: DashMap<String, Arc<Registration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an algorithm under `name`, reading its tunables from `config`.
    ///
    /// 以 `name` 注册一个算法，其参数从 `config` 读取。
    pub fn register(&self, name: &str, config: Arc<ConfigStore>) -> Result<Arc<Registration>> {
        match self.algorithms.entry(name.to_string()) {
            Entry::Occupied(_) => Err(Error::AlreadyRegistered(name.to_string())),
            Entry::Vacant(slot) => {
                let snapshot = config.snapshot();
                let registration = Arc::new(Registration {
                    name: name.to_string(),
                    config,
                    stats: Arc::new(GlobalStats::new()),
                    accepting: AtomicBool::new(true),
                    admitting: AtomicUsize::new(0),
                });
                slot.insert(Arc::clone(&registration));
                if snapshot.verbosity > 0 {
                    let cc = &snapshot.congestion_control;
                    info!(
                        name,
                        rate_ceiling = cc.rate_ceiling,
                        gain_ceiling = %format_gain(cc.gain_ceiling),
                        min_window = cc.min_window,
                        max_window = cc.max_window,
                        adaptive = cc.adaptive_enabled,
                        turbo = cc.turbo_enabled,
                        "Congestion control registered"
                    );
                }
                Ok(registration)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Registration>> {
        self.algorithms
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    /// Opens a session of the named algorithm. Returns it together with the
    /// slow-start threshold the transport should start from.
    ///
    /// 打开一个指定算法的会话，并返回传输层应使用的初始慢启动阈值。
    pub fn open_session(
        &self,
        name: &str,
        current_window: u32,
        now: Instant,
    ) -> Result<(Session, u32)> {
        let registration = self
            .get(name)
            .ok_or_else(|| Error::NotRegistered(name.to_string()))?;
        registration
            .admit(|| Session::open(Arc::clone(&registration), current_window, now))
            .ok_or_else(|| Error::Draining(name.to_string()))
    }

    /// Deregisters `name` once its sessions have drained.
    ///
    /// Admission stops first. Active sessions are then polled up to
    /// `drain_poll_attempts` times, `drain_poll_interval` apart. If sessions
    /// remain, `force` removes the algorithm anyway; otherwise the request is
    /// refused and admission reopens. A deregistration already in progress
    /// makes this one fail with [`Error::Draining`].
    ///
    /// 在会话排空后注销 `name`。若仍有会话且未强制，则拒绝注销并重新开放准入。
    pub async fn unregister(&self, name: &str, force: bool) -> Result<Unregistered> {
        let registration = self
            .get(name)
            .ok_or_else(|| Error::NotRegistered(name.to_string()))?;
        if !registration.close_admission() {
            return Err(Error::Draining(name.to_string()));
        }

        let snapshot = registration.config().snapshot();
        let lifecycle = &snapshot.lifecycle;
        let verbose = snapshot.verbosity > 0;

        let mut remaining = registration.pending_sessions();
        for attempt in 0..lifecycle.drain_poll_attempts {
            if remaining == 0 {
                break;
            }
            trace!(name, attempt, remaining, "Waiting for sessions to drain");
            sleep(lifecycle.drain_poll_interval).await;
            remaining = registration.pending_sessions();
        }

        if remaining == 0 {
            self.algorithms.remove(name);
            if verbose {
                info!(name, stats = %registration.stats(), "Congestion control unregistered");
            }
            return Ok(Unregistered::Drained);
        }

        if force {
            self.algorithms.remove(name);
            warn!(
                name,
                remaining,
                "Forcing unregistration with sessions still active; they keep running unmanaged"
            );
            return Ok(Unregistered::Forced { remaining });
        }

        registration.reopen_admission();
        warn!(name, remaining, "Unregistration refused, sessions still active");
        Err(Error::SessionsStillActive {
            name: name.to_string(),
            remaining,
        })
    }
}
