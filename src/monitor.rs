/// Idle monitor: collapses groups left idle for too long
use crate::grouper::Grouper;
use crate::tab_data::{GroupId, GroupUpdate};
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    /// No timer is running
    #[default]
    Idle,
    /// The ticker fires `Grouper::idle_tick` periodically
    Monitoring,
}

/// Singleton monitor lifecycle, independent of the timer primitive.
///
/// Idle → Monitoring on recorded activity; Monitoring → Idle once there is
/// nothing left to watch. Each transition reports whether the caller must
/// start or stop the ticker.
#[derive(Debug, Default)]
pub struct IdleMonitor {
    state: MonitorState,
}

impl IdleMonitor {
    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Monitoring
    }

    /// Returns true when the ticker has to be started
    pub fn on_activity(&mut self) -> bool {
        match self.state {
            MonitorState::Idle => {
                self.state = MonitorState::Monitoring;
                true
            }
            MonitorState::Monitoring => false,
        }
    }

    /// Returns true when the ticker has to be stopped
    pub fn on_nothing_to_monitor(&mut self) -> bool {
        match self.state {
            MonitorState::Monitoring => {
                self.state = MonitorState::Idle;
                true
            }
            MonitorState::Idle => false,
        }
    }
}

/// What a single tick did
#[derive(Debug, Default, PartialEq)]
pub struct TickReport {
    pub collapsed: Vec<GroupId>,
    /// Groups the host no longer knows about
    pub pruned: Vec<GroupId>,
    pub failed: Vec<GroupId>,
}

impl Grouper {
    /// Start the ticker unless it already runs or auto-collapse is off
    pub(crate) fn ensure_monitor(&self) {
        let start = {
            let mut state = self.state.borrow_mut();
            state.settings.auto_collapse && state.monitor.on_activity()
        };
        if start {
            let interval = self.config.tick_interval();
            info!("Idle monitor started ({:?} interval)", interval);
            self.ticker.start(interval);
        }
    }

    pub(crate) fn stop_monitor(&self) {
        let stop = self.state.borrow_mut().monitor.on_nothing_to_monitor();
        if stop {
            info!("Idle monitor stopped");
            self.ticker.stop();
        }
    }

    /// One pass of the idle monitor
    ///
    /// Every tracked group other than the active one that has been idle for
    /// longer than the current threshold is collapsed. Entries are dropped
    /// before the host confirms; a failed collapse is logged, not retried.
    pub async fn idle_tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let due = {
            let mut state = self.state.borrow_mut();
            if !state.monitor.is_running() {
                return report;
            }
            if !state.settings.auto_collapse {
                drop(state);
                self.stop_monitor();
                return report;
            }

            let threshold = state.settings.idle_threshold();
            let due = state.activity.idle_groups(self.now(), threshold);
            for group_id in &due {
                state.activity.mark_collapsed(*group_id);
            }
            due
        };

        for group_id in due {
            match self.host.update_group(group_id, &GroupUpdate::collapse()).await {
                Ok(_) => {
                    info!("Collapsed idle group {}", group_id);
                    report.collapsed.push(group_id);
                }
                Err(e) if e.is_group_not_found() => {
                    debug!("Pruned vanished group {}: {}", group_id, e);
                    self.state.borrow_mut().activity.remove(group_id);
                    self.forget_cached_group(group_id);
                    report.pruned.push(group_id);
                }
                Err(e) => {
                    warn!("Failed to collapse idle group {}: {}", group_id, e);
                    self.state.borrow_mut().activity.forget_collapse(group_id);
                    report.failed.push(group_id);
                }
            }
        }

        let needs_monitoring = self.state.borrow().activity.needs_monitoring();
        if !needs_monitoring {
            self.stop_monitor();
        }
        report
    }
}
