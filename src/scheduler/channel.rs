//! Controller channel table
//!
//! One slot per logical frequency. A slot holds at most one packet and a
//! priority used by the scheduler's aging scan.

use crate::config::scheduler::{
    AGING_STEP, MAX_RADIO_CHANNELS, PRIORITY_CEILING, PRIORITY_SHIFT,
};
use crate::packet::Packet;

/// Channel slot states
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not in use
    Disabled = 0,
    /// Listened on, never transmitted on
    ReadOnly = 1,
    /// Free for a new packet
    Empty = 2,
    /// Packet being entered on the serial line
    Adding = 3,
    /// Packet ready to send
    Transmit = 4,
    /// Packet ready to send; a reply is expected afterwards
    TransmitAwaitReply = 5,
    /// Sent, pinned until the reply arrives or the wait runs out
    AwaitReply = 6,
}

impl ChannelState {
    /// Values accepted by SET_CHANNEL
    pub fn from_config(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Disabled),
            1 => Some(Self::ReadOnly),
            2 => Some(Self::Empty),
            _ => None,
        }
    }

    /// Waiting to be picked by the scheduler
    pub fn is_queued(self) -> bool {
        matches!(self, Self::Transmit | Self::TransmitAwaitReply)
    }

    /// Can be selected on the serial line
    pub fn is_addressable(self) -> bool {
        !matches!(self, Self::Disabled | Self::ReadOnly)
    }
}

/// One channel slot
#[derive(Debug, Clone)]
pub struct Channel {
    pub state: ChannelState,
    /// 0 = not queued
    pub priority: u8,
    pub packet: Packet,
    /// Passes left before an unanswered request is abandoned
    pub reply_wait: u16,
}

impl Channel {
    pub const fn new() -> Self {
        Self {
            state: ChannelState::Disabled,
            priority: 0,
            packet: Packet {
                node: 0,
                cmd: 0,
                data: heapless::Vec::new(),
            },
            reply_wait: 0,
        }
    }

    /// Return to EMPTY, dropping any packet
    pub fn clear(&mut self) {
        self.state = ChannelState::Empty;
        self.priority = 0;
        self.reply_wait = 0;
        self.packet = Packet::default();
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

/// Starting priority for channel `index`: lower index ranks higher
pub fn base_priority(index: usize) -> u8 {
    ((MAX_RADIO_CHANNELS - index) as u8) << PRIORITY_SHIFT
}

/// Priority after one more packet lands on an already-queued channel
pub fn bump_priority(priority: u8) -> u8 {
    if priority >= PRIORITY_CEILING {
        priority
    } else {
        priority + 1
    }
}

/// Priority after one scheduling pass spent waiting
pub fn age_priority(priority: u8) -> u8 {
    if priority >= PRIORITY_CEILING {
        priority
    } else {
        priority.saturating_add(AGING_STEP).min(PRIORITY_CEILING)
    }
}

/// Fixed table of channel slots
pub struct ChannelTable {
    slots: [Channel; MAX_RADIO_CHANNELS],
}

impl ChannelTable {
    pub const fn new() -> Self {
        const DISABLED: Channel = Channel::new();
        Self {
            slots: [DISABLED; MAX_RADIO_CHANNELS],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.slots.iter()
    }

    /// Switch a channel between DISABLED, READ and EMPTY
    pub fn configure(&mut self, index: usize, state: ChannelState) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        slot.clear();
        slot.state = state;
        true
    }

    /// Claim an EMPTY channel for serial entry
    pub fn claim(&mut self, index: usize) -> Result<(), ChannelState> {
        match self.slots.get_mut(index) {
            Some(slot) if slot.state == ChannelState::Empty => {
                slot.state = ChannelState::Adding;
                Ok(())
            }
            Some(slot) => Err(slot.state),
            None => Err(ChannelState::Disabled),
        }
    }

    /// Give back a channel claimed with [`claim`](Self::claim)
    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.state == ChannelState::Adding {
                slot.state = ChannelState::Empty;
            }
        }
    }

    /// Queued channel with the strictly highest priority, first wins ties
    pub fn select(&self) -> Option<usize> {
        let mut best: Option<(usize, u8)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.state.is_queued() {
                continue;
            }
            if best.map_or(true, |(_, p)| slot.priority > p) {
                best = Some((index, slot.priority));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Age every queued channel except `skip`
    pub fn age(&mut self, skip: Option<usize>) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if Some(index) != skip && slot.state.is_queued() {
                slot.priority = age_priority(slot.priority);
            }
        }
    }

    /// Channel currently pinned waiting for a reply
    pub fn awaiting(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.state == ChannelState::AwaitReply)
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(table: &mut ChannelTable, index: usize, priority: u8) {
        let slot = table.get_mut(index).unwrap();
        slot.state = ChannelState::Transmit;
        slot.priority = priority;
    }

    #[test]
    fn test_table_starts_disabled() {
        let table = ChannelTable::new();
        assert_eq!(table.len(), MAX_RADIO_CHANNELS);
        assert!(table.iter().all(|c| c.state == ChannelState::Disabled));
    }

    #[test]
    fn test_base_priority_by_rank() {
        assert_eq!(base_priority(0), 48);
        assert_eq!(base_priority(5), 8);
        assert!(base_priority(1) < base_priority(0));
    }

    #[test]
    fn test_bump_saturates() {
        assert_eq!(bump_priority(48), 49);
        assert_eq!(bump_priority(PRIORITY_CEILING - 1), PRIORITY_CEILING);
        assert_eq!(bump_priority(PRIORITY_CEILING), PRIORITY_CEILING);
        // broadcast priority is never lowered
        assert_eq!(bump_priority(0xFF), 0xFF);
    }

    #[test]
    fn test_age_caps_at_ceiling() {
        assert_eq!(age_priority(10), 12);
        assert_eq!(age_priority(PRIORITY_CEILING - 1), PRIORITY_CEILING);
        assert_eq!(age_priority(0xFF), 0xFF);
    }

    #[test]
    fn test_claim_and_release() {
        let mut table = ChannelTable::new();
        assert_eq!(table.claim(0), Err(ChannelState::Disabled));

        table.configure(0, ChannelState::Empty);
        assert_eq!(table.claim(0), Ok(()));
        assert_eq!(table.claim(0), Err(ChannelState::Adding));

        table.release(0);
        assert_eq!(table.get(0).unwrap().state, ChannelState::Empty);
        assert_eq!(table.claim(9), Err(ChannelState::Disabled));
    }

    #[test]
    fn test_select_highest_first_wins_ties() {
        let mut table = ChannelTable::new();
        assert_eq!(table.select(), None);

        queue(&mut table, 3, 20);
        queue(&mut table, 1, 30);
        queue(&mut table, 4, 30);
        assert_eq!(table.select(), Some(1));
    }

    #[test]
    fn test_select_skips_unqueued() {
        let mut table = ChannelTable::new();
        table.configure(0, ChannelState::Empty);
        table.get_mut(0).unwrap().priority = 99;
        queue(&mut table, 2, 1);
        assert_eq!(table.select(), Some(2));
    }

    #[test]
    fn test_age_skips_selected() {
        let mut table = ChannelTable::new();
        queue(&mut table, 0, 10);
        queue(&mut table, 1, 10);
        table.configure(2, ChannelState::Empty);

        table.age(Some(0));
        assert_eq!(table.get(0).unwrap().priority, 10);
        assert_eq!(table.get(1).unwrap().priority, 12);
        assert_eq!(table.get(2).unwrap().priority, 0);
    }

    #[test]
    fn test_configure_from_byte() {
        assert_eq!(ChannelState::from_config(1), Some(ChannelState::ReadOnly));
        assert_eq!(ChannelState::from_config(3), None);
        assert!(!ChannelState::ReadOnly.is_addressable());
        assert!(ChannelState::Transmit.is_addressable());
    }
}
