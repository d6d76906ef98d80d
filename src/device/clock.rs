//! Interrupt-driven logical clock
//!
//! The timer interrupt (or timer task) is the only writer of the tick
//! counters; the main loop reads them and takes the one-shot flags. All
//! shared fields are atomics so a 16-bit read can never tear.

use crate::config::timing::{
    FAST_PERIOD_MS, HEARTBEAT_STEP_MS, MS_PER_MINUTE, TENS_OF_MINUTES_PER_DAY, TIME_UNKNOWN,
};
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

/// Shared clock state between the timer, the chip IRQ line and the main loop
pub struct Clock {
    ms_ticks: AtomicU16,
    tens_of_minutes: AtomicU8,
    /// Minutes elapsed in the current ten-minute block
    minutes: AtomicU8,
    period_ms: AtomicU16,
    /// Time of day advances only while set
    running: AtomicBool,
    /// Ticks until the next main-loop pass
    main_ticks: AtomicU32,
    pass_due: AtomicBool,
    heartbeat: AtomicU16,
    hb_clock: AtomicU16,
    second_ms: AtomicU16,
    second_elapsed: AtomicBool,
    irq_enabled: AtomicBool,
    irq_fired: AtomicBool,
    /// Receive path is driven by the chip notification line
    irq_in_use: AtomicBool,
}

impl Clock {
    pub const fn new() -> Self {
        Self {
            ms_ticks: AtomicU16::new(0),
            tens_of_minutes: AtomicU8::new(TIME_UNKNOWN),
            minutes: AtomicU8::new(0),
            period_ms: AtomicU16::new(FAST_PERIOD_MS),
            running: AtomicBool::new(false),
            main_ticks: AtomicU32::new(1),
            pass_due: AtomicBool::new(false),
            heartbeat: AtomicU16::new(0xFFFF),
            hb_clock: AtomicU16::new(0),
            second_ms: AtomicU16::new(0),
            second_elapsed: AtomicBool::new(false),
            irq_enabled: AtomicBool::new(false),
            irq_fired: AtomicBool::new(false),
            irq_in_use: AtomicBool::new(false),
        }
    }

    /// Timer tick. Returns the heartbeat LED level when it changes step.
    pub fn on_timer_tick(&self) -> Option<bool> {
        let period = self.period_ms.load(Ordering::Relaxed);

        let mut led = None;
        let mut hb = self.hb_clock.load(Ordering::Relaxed).saturating_add(period);
        // a slow period can cover more than one step
        while hb >= HEARTBEAT_STEP_MS {
            hb -= HEARTBEAT_STEP_MS;
            let pattern = self.heartbeat.load(Ordering::Relaxed);
            let level = pattern & 0x8000 != 0;
            self.heartbeat
                .store(pattern << 1 | level as u16, Ordering::Relaxed);
            led = Some(level);
        }
        self.hb_clock.store(hb, Ordering::Relaxed);

        if self.running.load(Ordering::Relaxed) {
            self.advance_time(period);
        }

        let main_ticks = self.main_ticks.load(Ordering::Relaxed);
        if main_ticks != 0 {
            if main_ticks == 1 {
                self.pass_due.store(true, Ordering::Release);
                // keep one pass per tick until the state machine re-arms a wait
                self.main_ticks.store(1, Ordering::Relaxed);
            } else {
                self.main_ticks.store(main_ticks - 1, Ordering::Relaxed);
            }
        }

        let second = self.second_ms.load(Ordering::Relaxed) + period;
        if second >= 1000 {
            self.second_ms.store(0, Ordering::Relaxed);
            self.second_elapsed.store(true, Ordering::Release);
        } else {
            self.second_ms.store(second, Ordering::Relaxed);
        }

        led
    }

    fn advance_time(&self, period: u16) {
        let ms = self.ms_ticks.load(Ordering::Relaxed) as u32 + period as u32;
        if ms < MS_PER_MINUTE as u32 {
            self.ms_ticks.store(ms as u16, Ordering::Release);
            return;
        }
        self.ms_ticks
            .store((ms - MS_PER_MINUTE as u32) as u16, Ordering::Release);

        let minutes = self.minutes.load(Ordering::Relaxed) + 1;
        if minutes < 10 {
            self.minutes.store(minutes, Ordering::Relaxed);
            return;
        }
        self.minutes.store(0, Ordering::Relaxed);

        let tom = self.tens_of_minutes.load(Ordering::Relaxed);
        if tom != TIME_UNKNOWN {
            self.tens_of_minutes
                .store((tom + 1) % TENS_OF_MINUTES_PER_DAY, Ordering::Release);
        }
    }

    /// Chip notification edge. Returns true if the event was accepted.
    ///
    /// The line disables itself after one event until re-armed.
    pub fn on_chip_irq(&self) -> bool {
        if self.irq_enabled.swap(false, Ordering::AcqRel) {
            self.irq_fired.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Arm (or disarm) the chip notification line
    pub fn enable_irq(&self, enable: bool) {
        self.irq_fired.store(false, Ordering::Release);
        self.irq_enabled.store(enable, Ordering::Release);
    }

    /// Drive reception from the notification line and arm it
    pub fn use_irq(&self, in_use: bool) {
        self.irq_in_use.store(in_use, Ordering::Release);
        self.enable_irq(in_use);
    }

    /// Re-arm the line after a frame was taken, if it is in use
    pub fn rearm_irq(&self) {
        if self.irq_in_use.load(Ordering::Acquire) {
            self.enable_irq(true);
        }
    }

    pub fn take_irq_fired(&self) -> bool {
        self.irq_fired.swap(false, Ordering::AcqRel)
    }

    /// Consume the "run a main pass" flag
    pub fn take_pass_due(&self) -> bool {
        self.pass_due.swap(false, Ordering::AcqRel)
    }

    /// Consume the one-second housekeeping flag
    pub fn take_second_elapsed(&self) -> bool {
        self.second_elapsed.swap(false, Ordering::AcqRel)
    }

    /// Ticks until the next pass (0 = no pass scheduled)
    pub fn arm_pass(&self, ticks: u32) {
        self.main_ticks.store(ticks, Ordering::Release);
    }

    pub fn ms_ticks(&self) -> u16 {
        self.ms_ticks.load(Ordering::Acquire)
    }

    pub fn set_ms_ticks(&self, ticks: u16) {
        self.ms_ticks.store(ticks % MS_PER_MINUTE, Ordering::Release);
    }

    pub fn tens_of_minutes(&self) -> u8 {
        self.tens_of_minutes.load(Ordering::Acquire)
    }

    pub fn set_tens_of_minutes(&self, tom: u8) {
        self.tens_of_minutes.store(tom, Ordering::Release);
    }

    pub fn period_ms(&self) -> u16 {
        self.period_ms.load(Ordering::Relaxed)
    }

    /// Switch the tick period and whether time of day advances
    pub fn set_power_mode(&self, period_ms: u16, running: bool) {
        self.period_ms.store(period_ms, Ordering::Release);
        self.running.store(running, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_heartbeat(&self, pattern: u16) {
        self.heartbeat.store(pattern, Ordering::Relaxed);
    }

    pub fn heartbeat(&self) -> u16 {
        self.heartbeat.load(Ordering::Relaxed)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::timing::SLOW_PERIOD_MS;

    fn running_clock() -> Clock {
        let clock = Clock::new();
        clock.set_power_mode(FAST_PERIOD_MS, true);
        clock.arm_pass(0);
        clock
    }

    #[test]
    fn test_ms_ticks_advance_while_running() {
        let clock = running_clock();
        for _ in 0..5 {
            clock.on_timer_tick();
        }
        assert_eq!(clock.ms_ticks(), 5 * FAST_PERIOD_MS);
    }

    #[test]
    fn test_time_frozen_while_stopped() {
        let clock = Clock::new();
        clock.set_power_mode(160, false);
        for _ in 0..10 {
            clock.on_timer_tick();
        }
        assert_eq!(clock.ms_ticks(), 0);
    }

    #[test]
    fn test_minute_rollover_and_tens_of_minutes() {
        let clock = running_clock();
        clock.set_tens_of_minutes(143);

        // nine full minutes leave tom alone
        for _ in 0..9 {
            clock.set_ms_ticks(MS_PER_MINUTE - FAST_PERIOD_MS);
            clock.on_timer_tick();
            assert_eq!(clock.ms_ticks(), 0);
        }
        assert_eq!(clock.tens_of_minutes(), 143);

        // the tenth wraps the day
        clock.set_ms_ticks(MS_PER_MINUTE - FAST_PERIOD_MS);
        clock.on_timer_tick();
        assert_eq!(clock.tens_of_minutes(), 0);
    }

    #[test]
    fn test_unknown_time_stays_unknown() {
        let clock = running_clock();
        for _ in 0..10 {
            clock.set_ms_ticks(MS_PER_MINUTE - FAST_PERIOD_MS);
            clock.on_timer_tick();
        }
        assert_eq!(clock.tens_of_minutes(), TIME_UNKNOWN);
    }

    #[test]
    fn test_pass_countdown() {
        let clock = running_clock();
        clock.arm_pass(3);

        clock.on_timer_tick();
        clock.on_timer_tick();
        assert!(!clock.take_pass_due());

        clock.on_timer_tick();
        assert!(clock.take_pass_due());
        assert!(!clock.take_pass_due());

        // then once per tick
        clock.on_timer_tick();
        assert!(clock.take_pass_due());
    }

    #[test]
    fn test_second_flag() {
        let clock = running_clock();
        for _ in 0..99 {
            clock.on_timer_tick();
        }
        assert!(!clock.take_second_elapsed());
        clock.on_timer_tick();
        assert!(clock.take_second_elapsed());
    }

    #[test]
    fn test_heartbeat_rotates() {
        let clock = running_clock();
        clock.set_heartbeat(0x8000);

        let levels: std::vec::Vec<bool> = (0..22).filter_map(|_| clock.on_timer_tick()).collect();
        assert_eq!(levels, vec![true, false]);
        assert_eq!(clock.heartbeat(), 0x0002);
    }

    #[test]
    fn test_heartbeat_steps_every_hundred_ms() {
        let clock = running_clock();
        clock.set_heartbeat(0x0001);

        for _ in 0..9 {
            assert_eq!(clock.on_timer_tick(), None);
        }
        assert_eq!(clock.on_timer_tick(), Some(false));
        assert_eq!(clock.heartbeat(), 0x0002);
    }

    #[test]
    fn test_heartbeat_keeps_pace_at_slow_period() {
        let clock = Clock::new();
        clock.set_power_mode(SLOW_PERIOD_MS, false);
        clock.set_heartbeat(0x00FF);

        for _ in 0..2500 {
            clock.on_timer_tick();
        }
        // 2500 * 160 ms = 4000 steps, a whole number of rotations
        assert_eq!(clock.heartbeat(), 0x00FF);
        assert!(clock.hb_clock.load(Ordering::Relaxed) < HEARTBEAT_STEP_MS);
    }

    #[test]
    fn test_chip_irq_one_shot() {
        let clock = Clock::new();
        assert!(!clock.on_chip_irq());

        clock.enable_irq(true);
        assert!(clock.on_chip_irq());
        assert!(!clock.on_chip_irq());
        assert!(clock.take_irq_fired());
        assert!(!clock.take_irq_fired());
    }

    #[test]
    fn test_rearm_only_when_in_use() {
        let clock = Clock::new();
        clock.rearm_irq();
        assert!(!clock.on_chip_irq());

        clock.use_irq(true);
        assert!(clock.on_chip_irq());
        clock.rearm_irq();
        assert!(clock.on_chip_irq());
    }
}
