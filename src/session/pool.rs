use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Semaphore;
use url::Url;

use crate::app::{Result, TributaryError};

/// Fixed-size pool of reusable resources.
///
/// Acquisition blocks once every resource is checked out and serves waiters
/// in arrival order, so no caller starves under contention. Closing the pool
/// fails pending and future acquisitions instead of leaving them hung.
pub struct ResourcePool<T> {
    idle: Mutex<VecDeque<T>>,
    permits: Semaphore,
}

impl<T> ResourcePool<T> {
    pub fn new(resources: Vec<T>) -> Self {
        let permits = Semaphore::new(resources.len());
        Self {
            idle: Mutex::new(VecDeque::from(resources)),
            permits,
        }
    }

    /// Take a resource, waiting until one is free.
    pub async fn acquire(&self) -> Result<T> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TributaryError::SessionClosed)?;
        // The permit is restored by `release` when the resource comes back.
        permit.forget();

        let mut idle = self
            .idle
            .lock()
            .map_err(|e| TributaryError::Browser(format!("Tab pool lock poisoned: {}", e)))?;
        idle.pop_front()
            .ok_or_else(|| TributaryError::Browser("Tab pool empty with permit held".to_string()))
    }

    /// Return a resource to the pool and wake the oldest waiter.
    pub fn release(&self, resource: T) {
        let Ok(mut idle) = self.idle.lock() else {
            return;
        };
        idle.push_back(resource);
        drop(idle);
        self.permits.add_permits(1);
    }

    /// Close the pool. Pending and future acquisitions fail; resources
    /// already checked out stay with their holders.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Usage counters for one pooled tab.
///
/// The reset decision is a pure function of recorded use: cross-host moves
/// trigger a reset so sites do not see each other's page state, and a
/// navigation budget bounds how much memory a long-lived tab accumulates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TabState {
    prev_host: Option<String>,
    navigations: u32,
}

/// What a tab needs before going back into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPlan {
    /// The tab moved to a different host than its previous navigation.
    pub host_changed: bool,
    /// The tab exhausted its navigation budget.
    pub rotation_due: bool,
}

impl CleanupPlan {
    pub fn needs_reset(&self) -> bool {
        self.host_changed || self.rotation_due
    }
}

impl TabState {
    /// Record one use of the tab for `url` and decide whether it should be
    /// reset. URLs without a parseable host keep the previous host on
    /// record. Hitting the navigation budget restarts the count; a host
    /// switch does not.
    pub fn after_use(&mut self, url: &str, max_navigations: u32) -> CleanupPlan {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()));

        let host_changed = match host {
            Some(host) => {
                let changed = self
                    .prev_host
                    .as_deref()
                    .is_some_and(|prev| prev != host.as_str());
                self.prev_host = Some(host);
                changed
            }
            None => false,
        };

        self.navigations += 1;
        let rotation_due = self.navigations >= max_navigations;
        if rotation_due {
            self.navigations = 0;
        }

        CleanupPlan {
            host_changed,
            rotation_due,
        }
    }
}
