//! Device context: the single owner of link-wide state

use crate::config::timing;
use crate::device::clock::Clock;
use crate::radio::chip::{ChipStatus, FifoInfo, InterruptStatus, PartInfo};

/// Operational states, in the order reported over the serial line
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperationalState {
    Startup = 0,
    Error = 1,
    LowBattery = 2,
    Cold = 3,
    Warm = 4,
    Listen = 5,
    Active = 6,
}

impl OperationalState {
    /// LED pattern shown in this state
    pub fn song(self) -> u16 {
        match self {
            OperationalState::Startup => 0xFFFF,
            OperationalState::Error => 0x3333,
            OperationalState::LowBattery => 0x0000,
            OperationalState::Cold => 0x0001,
            OperationalState::Warm => 0x000F,
            OperationalState::Listen => 0x00FF,
            OperationalState::Active => 0x00F7,
        }
    }

    /// States in which the radio is awake and the scheduler may run
    pub fn is_awake(self) -> bool {
        self >= OperationalState::Listen
    }
}

/// Provisioned identity compared against ACTIVATE requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    pub cat1: u8,
    pub cat2: u8,
    pub num1: u8,
    pub num2: u8,
}

impl Identity {
    pub fn new(cat1: u8, cat2: u8, num1: u8, num2: u8) -> Self {
        Self {
            cat1,
            cat2,
            num1,
            num2,
        }
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        bytes == [self.cat1, self.cat2, self.num1, self.num2]
    }
}

/// Link timing, tunable at runtime
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub fast_period_ms: u16,
    pub slow_period_ms: u16,
    pub listen_ms: u32,
    pub listen_after_cold_ms: u32,
    pub active_ms: u32,
    pub error_hold_ms: u32,
    pub warm_sleep_ms: u32,
    pub cold_sleep_ms: u32,
    /// Passes a pinned channel waits for its reply
    pub reply_wait_passes: u16,
    /// ms_ticks modulus that triggers a time broadcast
    pub time_broadcast_modulo_ms: u16,
    pub xtal_hz: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        use crate::config::{radio, scheduler};

        Self {
            fast_period_ms: timing::FAST_PERIOD_MS,
            slow_period_ms: timing::SLOW_PERIOD_MS,
            listen_ms: timing::LISTEN_MS,
            listen_after_cold_ms: timing::LISTEN_AFTER_COLD_MS,
            active_ms: timing::ACTIVE_MS,
            error_hold_ms: timing::ERROR_HOLD_MS,
            warm_sleep_ms: timing::WARM_SLEEP_MS,
            cold_sleep_ms: timing::COLD_SLEEP_MS,
            reply_wait_passes: timing::REPLY_WAIT_PASSES,
            time_broadcast_modulo_ms: scheduler::TIME_BROADCAST_MODULO_MS,
            xtal_hz: radio::XTAL_HZ,
        }
    }
}

/// Packet and error counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub rx_packets: u16,
    pub tx_packets: u16,
    /// Frames dropped by the codec
    pub bad_frames: u16,
    /// Failed chip transactions
    pub chip_errors: u16,
    /// Queued packets replaced before they were sent
    pub displaced: u16,
}

/// Last values read back from the chip
#[derive(Debug, Clone, Copy, Default)]
pub struct ChipSnapshot {
    pub state: u8,
    pub channel: u8,
    pub fifo: FifoInfo,
    pub interrupts: InterruptStatus,
    pub status: ChipStatus,
    pub part: Option<PartInfo>,
}

/// Link-wide state, created once at boot
pub struct Device<'a> {
    pub(crate) clock: &'a Clock,
    pub config: LinkConfig,
    pub(crate) state: OperationalState,
    pub identity: Identity,
    pub my_channel: u8,
    pub my_node_id: u8,
    pub date: u16,
    /// Passes left before the LISTEN/ACTIVE window closes
    pub(crate) timeout: u32,
    /// Traffic seen since the window was last armed
    pub saw_rx: bool,
    pub counters: Counters,
    pub chip: ChipSnapshot,
}

impl<'a> Device<'a> {
    pub fn new(clock: &'a Clock, identity: Identity, config: LinkConfig) -> Self {
        clock.set_power_mode(config.fast_period_ms, false);
        clock.arm_pass(1);
        Self {
            clock,
            config,
            state: OperationalState::Startup,
            identity,
            my_channel: 0,
            my_node_id: 0,
            date: 0,
            timeout: 0,
            saw_rx: false,
            counters: Counters::default(),
            chip: ChipSnapshot::default(),
        }
    }

    pub fn state(&self) -> OperationalState {
        self.state
    }

    pub fn clock(&self) -> &'a Clock {
        self.clock
    }

    pub fn tens_of_minutes(&self) -> u8 {
        self.clock.tens_of_minutes()
    }

    /// Passes left in the current LISTEN/ACTIVE window
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    pub(crate) fn note_chip_error(&mut self) {
        self.counters.chip_errors = self.counters.chip_errors.wrapping_add(1);
    }

    /// Convert a duration into ticks of `period_ms`
    pub(crate) fn ticks(duration_ms: u32, period_ms: u16) -> u32 {
        (duration_ms / period_ms.max(1) as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ordering() {
        assert!(OperationalState::Active.is_awake());
        assert!(OperationalState::Listen.is_awake());
        assert!(!OperationalState::Warm.is_awake());
        assert!(OperationalState::Startup < OperationalState::Active);
    }

    #[test]
    fn test_identity_matches() {
        let id = Identity::new(1, 2, 3, 4);
        assert!(id.matches(&[1, 2, 3, 4]));
        assert!(!id.matches(&[1, 2, 3, 5]));
        assert!(!id.matches(&[1, 2, 3]));
    }

    #[test]
    fn test_ticks_conversion() {
        assert_eq!(Device::ticks(60_000, 10), 6000);
        assert_eq!(Device::ticks(15 * 60 * 1000, 160), 5625);
        assert_eq!(Device::ticks(5, 10), 1);
    }

    #[test]
    fn test_new_device_starts_in_startup() {
        let clock = Clock::new();
        let device = Device::new(&clock, Identity::default(), LinkConfig::default());
        assert_eq!(device.state(), OperationalState::Startup);
        assert_eq!(device.my_node_id, 0);
        assert_eq!(device.tens_of_minutes(), timing::TIME_UNKNOWN);
    }
}
