//! Inactivity countdown for the presentation layer.
//!
//! Mirrors the server's session policy on the client side: after
//! `session_minutes - warning_minutes` of silence a warning dialog
//! opens with a per-second countdown, and at zero the logout contract
//! fires. The machine is tick-driven (one tick per second) so the
//! host decides how ticks are scheduled; no two countdowns can run at
//! once because there is only one state value.

use crate::session::SessionPolicy;

/// Contract invoked exactly once when the monitor expires.
pub trait LogoutHandler {
    /// Ends the session (clears credentials, navigates to login).
    fn force_logout(&mut self);
}

impl<F: FnMut()> LogoutHandler for F {
    fn force_logout(&mut self) {
        self();
    }
}

/// Observable monitor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No dialog shown; user considered present.
    Active,
    /// Warning dialog visible with a running countdown.
    Warning {
        /// Seconds left before forced logout.
        seconds_remaining: u32,
    },
    /// Terminal. The logout contract has been invoked.
    Expired,
}

/// Single-threaded inactivity monitor.
pub struct TimeoutMonitor<H: LogoutHandler> {
    policy: SessionPolicy,
    state: MonitorState,
    idle_seconds: u64,
    handler: H,
}

impl<H: LogoutHandler> TimeoutMonitor<H> {
    /// Creates a monitor in the `Active` state.
    #[must_use]
    pub fn new(policy: SessionPolicy, handler: H) -> Self {
        Self {
            policy,
            state: MonitorState::Active,
            idle_seconds: 0,
            handler,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Advances the clock by one second.
    pub fn tick(&mut self) {
        match self.state {
            MonitorState::Active => {
                self.idle_seconds += 1;
                if self.idle_seconds >= self.policy.idle_seconds_before_warning() {
                    self.state = MonitorState::Warning {
                        seconds_remaining: self.policy.warning_minutes * 60,
                    };
                }
            }
            MonitorState::Warning { seconds_remaining } => {
                let seconds_remaining = seconds_remaining.saturating_sub(1);
                if seconds_remaining == 0 {
                    self.expire();
                } else {
                    self.state = MonitorState::Warning { seconds_remaining };
                }
            }
            MonitorState::Expired => {}
        }
    }

    /// Records a monitored user interaction: any activity while
    /// `Active` or `Warning` cancels the pending countdown and
    /// restarts the silence requirement from zero.
    pub fn record_activity(&mut self) {
        if self.state != MonitorState::Expired {
            self.state = MonitorState::Active;
            self.idle_seconds = 0;
        }
    }

    /// The "stay signed in" affordance on the warning dialog.
    /// Equivalent to a monitored interaction.
    pub fn stay_signed_in(&mut self) {
        self.record_activity();
    }

    /// The explicit "logout now" action: expires immediately from any
    /// state.
    pub fn logout_now(&mut self) {
        self.expire();
    }

    fn expire(&mut self) {
        if self.state != MonitorState::Expired {
            self.state = MonitorState::Expired;
            self.handler.force_logout();
        }
    }
}
