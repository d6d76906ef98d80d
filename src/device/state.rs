//! Operational state transitions
//!
//! `set_state` is idempotent: re-entering the current state does nothing,
//! except STARTUP which always re-initialises.

use crate::config::timing::TIME_UNKNOWN;
use crate::device::context::{Device, OperationalState};

/// What a LISTEN/ACTIVE window did this pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    /// Still inside the window
    Open,
    /// Window closed and the state was demoted
    Expired(OperationalState),
}

impl Device<'_> {
    /// Enter `new_state`, applying its clock, timeout and heartbeat settings
    pub fn set_state(&mut self, new_state: OperationalState) {
        if new_state != OperationalState::Startup && self.state == new_state {
            return;
        }

        let clock = self.clock;
        clock.set_heartbeat(new_state.song());

        let mut wait_ticks = 1;
        match new_state {
            OperationalState::Cold | OperationalState::Warm | OperationalState::LowBattery => {
                clock.set_power_mode(self.config.slow_period_ms, false);
                clock.set_tens_of_minutes(TIME_UNKNOWN);
                let sleep_ms = match new_state {
                    OperationalState::Cold => self.config.cold_sleep_ms,
                    _ => self.config.warm_sleep_ms,
                };
                wait_ticks = Self::ticks(sleep_ms, self.config.slow_period_ms);
            }
            OperationalState::Listen => {
                clock.set_power_mode(self.config.fast_period_ms, true);
                self.my_channel = 0;
                self.saw_rx = false;
                let window_ms = if self.state == OperationalState::Cold {
                    self.config.listen_after_cold_ms
                } else {
                    self.config.listen_ms
                };
                self.timeout = Self::ticks(window_ms, self.config.fast_period_ms);
            }
            OperationalState::Error => {
                wait_ticks = Self::ticks(self.config.error_hold_ms, clock.period_ms());
            }
            OperationalState::Active => {
                clock.set_power_mode(self.config.fast_period_ms, true);
                self.rearm_active_window();
            }
            OperationalState::Startup => {}
        }

        log::info!("state {:?} -> {:?} (wait {} ticks)", self.state, new_state, wait_ticks);
        clock.arm_pass(wait_ticks);
        self.state = new_state;
    }

    pub(crate) fn rearm_active_window(&mut self) {
        self.timeout = Self::ticks(self.config.active_ms, self.config.fast_period_ms);
    }

    /// Count down the LISTEN/ACTIVE window after the pass has polled the radio
    pub(crate) fn tick_window(&mut self) -> WindowOutcome {
        match self.state {
            OperationalState::Listen => {
                self.timeout = self.timeout.saturating_sub(1);
                if self.timeout == 0 {
                    let next = if self.saw_rx {
                        OperationalState::Warm
                    } else {
                        OperationalState::Cold
                    };
                    self.set_state(next);
                    return WindowOutcome::Expired(next);
                }
            }
            OperationalState::Active => {
                if self.saw_rx {
                    self.rearm_active_window();
                    self.saw_rx = false;
                }
                self.timeout = self.timeout.saturating_sub(1);
                if self.timeout == 0 {
                    self.set_state(OperationalState::Warm);
                    return WindowOutcome::Expired(OperationalState::Warm);
                }
            }
            _ => {}
        }
        WindowOutcome::Open
    }
}
