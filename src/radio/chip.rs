//! Si4463 command set
//!
//! Each operation is a (request bytes, response length) pair run through
//! [`Transceiver::transact`]. Nothing here touches the bus directly.

use crate::config::radio::FRAME_SIZE;
use crate::radio::traits::ChipBus;
use crate::radio::transaction::{Transceiver, TransactionError};
use heapless::Vec;

/// Si4463 command opcodes
pub mod cmd {
    pub const PART_INFO: u8 = 0x01;
    pub const POWER_UP: u8 = 0x02;
    pub const FUNC_INFO: u8 = 0x10;
    pub const SET_PROPERTY: u8 = 0x11;
    pub const GET_PROPERTY: u8 = 0x12;
    pub const FIFO_INFO: u8 = 0x15;
    pub const GET_INT_STATUS: u8 = 0x20;
    pub const GET_PH_STATUS: u8 = 0x21;
    pub const GET_MODEM_STATUS: u8 = 0x22;
    pub const GET_CHIP_STATUS: u8 = 0x23;
    pub const START_TX: u8 = 0x31;
    pub const START_RX: u8 = 0x32;
    pub const REQUEST_DEVICE_STATE: u8 = 0x33;
    pub const CHANGE_STATE: u8 = 0x34;
    pub const READ_CMD_BUFF: u8 = 0x44;
    pub const WRITE_TX_FIFO: u8 = 0x66;
    pub const READ_RX_FIFO: u8 = 0x77;

    /// FIFO_INFO reset flags
    pub const FIFO_CLEAR_TX: u8 = 0x01;
    pub const FIFO_CLEAR_RX: u8 = 0x02;
}

/// Property groups and values used by the link
pub mod prop {
    /// INT_CTL group
    pub const GROUP_INT_CTL: u8 = 0x01;
    pub const INT_CTL_ENABLE: u8 = 0x00;
    /// INT_CTL_ENABLE: packet handler interrupts
    pub const PH_INT_STATUS_EN: u8 = 0x01;
    /// INT_CTL_PH_ENABLE: packet received, CRC error
    pub const PH_PACKET_RX_EN: u8 = 0x10;
    pub const PH_CRC_ERROR_EN: u8 = 0x08;
}

/// READ_CMD_BUFF answer when the response is ready
pub const CTS_READY: u8 = 0xFF;
/// READ_CMD_BUFF answer while the chip is still working
pub const CTS_BUSY: u8 = 0x00;

/// Most properties one SET_PROPERTY can carry
pub const MAX_SET_PROPERTIES: usize = 12;

/// Most properties one GET_PROPERTY can return
pub const MAX_GET_PROPERTIES: usize = 16;

/// POWER_UP boot options: no patch, functional mode
const BOOT_FUNCTIONAL: u8 = 0x01;
/// POWER_UP crystal options: crystal, not TCXO
const XTAL_OPTIONS: u8 = 0x00;

/// Chip operating states as reported by REQUEST_DEVICE_STATE
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipState {
    NoChange = 0,
    Sleep = 1,
    SpiActive = 2,
    Ready = 3,
    Ready2 = 4,
    TxTune = 5,
    RxTune = 6,
    Tx = 7,
    Rx = 8,
}

impl ChipState {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte & 0x0F {
            0 => Some(Self::NoChange),
            1 => Some(Self::Sleep),
            2 => Some(Self::SpiActive),
            3 => Some(Self::Ready),
            4 => Some(Self::Ready2),
            5 => Some(Self::TxTune),
            6 => Some(Self::RxTune),
            7 => Some(Self::Tx),
            8 => Some(Self::Rx),
            _ => None,
        }
    }

    /// Transmitting or about to
    pub fn is_transmitting(self) -> bool {
        matches!(self, Self::TxTune | Self::Tx)
    }
}

/// FIFO reset selection for GET_FIFO_INFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoClear {
    None,
    Rx,
    Tx,
    Both,
}

impl FifoClear {
    fn flags(self) -> u8 {
        match self {
            FifoClear::None => 0,
            FifoClear::Rx => cmd::FIFO_CLEAR_RX,
            FifoClear::Tx => cmd::FIFO_CLEAR_TX,
            FifoClear::Both => cmd::FIFO_CLEAR_RX | cmd::FIFO_CLEAR_TX,
        }
    }
}

/// FIFO occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoInfo {
    /// Bytes waiting in the RX FIFO
    pub rx_count: u8,
    /// Free space in the TX FIFO
    pub tx_space: u8,
}

/// REQUEST_DEVICE_STATE result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    /// Raw state nibble, see [`ChipState`]
    pub state: u8,
    pub channel: u8,
}

impl DeviceState {
    pub fn chip_state(&self) -> Option<ChipState> {
        ChipState::from_byte(self.state)
    }
}

/// PART_INFO result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartInfo {
    pub chip_rev: u8,
    pub part: u16,
    pub build: u8,
    pub id: u16,
    pub customer: u8,
    pub rom_id: u8,
}

/// FUNC_INFO result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuncInfo {
    pub rev_ext: u8,
    pub rev_branch: u8,
    pub rev_int: u8,
    pub patch: u16,
    pub func: u8,
}

/// GET_INT_STATUS result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptStatus {
    pub int_pending: u8,
    pub int_status: u8,
    pub ph_pending: u8,
    pub ph_status: u8,
    pub modem_pending: u8,
    pub modem_status: u8,
    pub chip_pending: u8,
    pub chip_status: u8,
}

/// GET_CHIP_STATUS result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChipStatus {
    pub pending: u8,
    pub status: u8,
    pub cmd_error: u8,
}

/// Si4463 command layer over a [`Transceiver`]
pub struct Si4463<B: ChipBus> {
    xcvr: Transceiver<B>,
}

impl<B: ChipBus> Si4463<B> {
    pub fn new(xcvr: Transceiver<B>) -> Self {
        Self { xcvr }
    }

    pub fn transceiver(&self) -> &Transceiver<B> {
        &self.xcvr
    }

    pub fn transceiver_mut(&mut self) -> &mut Transceiver<B> {
        &mut self.xcvr
    }

    /// Boot the chip from its crystal
    pub fn power_up(&mut self, xtal_hz: u32) -> Result<(), TransactionError> {
        let [f3, f2, f1, f0] = xtal_hz.to_be_bytes();
        self.xcvr
            .transact(&[cmd::POWER_UP, BOOT_FUNCTIONAL, XTAL_OPTIONS, f3, f2, f1, f0], 0)?;
        Ok(())
    }

    /// Raise nIRQ when a packet arrives
    pub fn enable_rx_interrupt(&mut self) -> Result<(), TransactionError> {
        self.set_property(
            prop::GROUP_INT_CTL,
            prop::INT_CTL_ENABLE,
            &[prop::PH_INT_STATUS_EN, prop::PH_PACKET_RX_EN | prop::PH_CRC_ERROR_EN],
        )
    }

    pub fn request_device_state(&mut self) -> Result<DeviceState, TransactionError> {
        let r = self.xcvr.transact(&[cmd::REQUEST_DEVICE_STATE], 2)?;
        Ok(DeviceState {
            state: r[0],
            channel: r[1],
        })
    }

    /// Read `count` properties from `group` starting at `start`
    pub fn get_property(
        &mut self,
        group: u8,
        start: u8,
        count: u8,
    ) -> Result<Vec<u8, MAX_GET_PROPERTIES>, TransactionError> {
        if count as usize > MAX_GET_PROPERTIES {
            return Err(TransactionError::TooLong);
        }
        let r = self
            .xcvr
            .transact(&[cmd::GET_PROPERTY, group, count, start], count as usize)?;
        let mut values = Vec::new();
        let _ = values.extend_from_slice(&r);
        Ok(values)
    }

    /// Write consecutive properties in `group` starting at `start`
    pub fn set_property(
        &mut self,
        group: u8,
        start: u8,
        values: &[u8],
    ) -> Result<(), TransactionError> {
        if values.len() > MAX_SET_PROPERTIES {
            return Err(TransactionError::TooLong);
        }
        let mut request: Vec<u8, 16> = Vec::new();
        let _ = request.extend_from_slice(&[cmd::SET_PROPERTY, group, values.len() as u8, start]);
        let _ = request.extend_from_slice(values);
        self.xcvr.transact(&request, 0)?;
        Ok(())
    }

    pub fn part_info(&mut self) -> Result<PartInfo, TransactionError> {
        let r = self.xcvr.transact(&[cmd::PART_INFO], 8)?;
        Ok(PartInfo {
            chip_rev: r[0],
            part: u16::from_be_bytes([r[1], r[2]]),
            build: r[3],
            id: u16::from_be_bytes([r[4], r[5]]),
            customer: r[6],
            rom_id: r[7],
        })
    }

    pub fn func_info(&mut self) -> Result<FuncInfo, TransactionError> {
        let r = self.xcvr.transact(&[cmd::FUNC_INFO], 6)?;
        Ok(FuncInfo {
            rev_ext: r[0],
            rev_branch: r[1],
            rev_int: r[2],
            patch: u16::from_be_bytes([r[3], r[4]]),
            func: r[5],
        })
    }

    /// Packet handler (pending, status)
    pub fn ph_status(&mut self) -> Result<(u8, u8), TransactionError> {
        let r = self.xcvr.transact(&[cmd::GET_PH_STATUS, 0xFF], 2)?;
        Ok((r[0], r[1]))
    }

    /// Modem (pending, status)
    pub fn modem_status(&mut self) -> Result<(u8, u8), TransactionError> {
        let r = self.xcvr.transact(&[cmd::GET_MODEM_STATUS], 6)?;
        Ok((r[0], r[1]))
    }

    pub fn chip_status(&mut self) -> Result<ChipStatus, TransactionError> {
        let r = self.xcvr.transact(&[cmd::GET_CHIP_STATUS, 0x7F], 3)?;
        Ok(ChipStatus {
            pending: r[0],
            status: r[1],
            cmd_error: r[2],
        })
    }

    pub fn change_state(&mut self, state: ChipState) -> Result<(), TransactionError> {
        self.xcvr.transact(&[cmd::CHANGE_STATE, state as u8 & 0x0F], 0)?;
        Ok(())
    }

    pub fn fifo_info(&mut self, clear: FifoClear) -> Result<FifoInfo, TransactionError> {
        let r = self.xcvr.transact(&[cmd::FIFO_INFO, clear.flags()], 2)?;
        Ok(FifoInfo {
            rx_count: r[0],
            tx_space: r[1],
        })
    }

    pub fn interrupt_status(&mut self) -> Result<InterruptStatus, TransactionError> {
        let r = self.xcvr.transact(&[cmd::GET_INT_STATUS, 0, 0, 0], 8)?;
        Ok(InterruptStatus {
            int_pending: r[0],
            int_status: r[1],
            ph_pending: r[2],
            ph_status: r[3],
            modem_pending: r[4],
            modem_status: r[5],
            chip_pending: r[6],
            chip_status: r[7],
        })
    }

    /// Receive one frame on `channel`, returning to READY afterwards
    pub fn start_rx(&mut self, channel: u8) -> Result<(), TransactionError> {
        self.xcvr.transact(
            &[
                cmd::START_RX,
                channel,
                0,
                0,
                FRAME_SIZE as u8,
                ChipState::NoChange as u8,
                ChipState::Ready as u8,
                ChipState::Ready as u8,
            ],
            0,
        )?;
        Ok(())
    }

    /// Transmit the TX FIFO on `channel`, then move to `post_state`
    pub fn start_tx(&mut self, channel: u8, post_state: ChipState) -> Result<(), TransactionError> {
        self.xcvr.transact(
            &[cmd::START_TX, channel, (post_state as u8) << 4, 0, FRAME_SIZE as u8],
            0,
        )?;
        Ok(())
    }

    pub fn write_tx_fifo(&mut self, frame: &[u8; FRAME_SIZE]) -> Result<(), TransactionError> {
        let mut request: Vec<u8, { FRAME_SIZE + 1 }> = Vec::new();
        let _ = request.push(cmd::WRITE_TX_FIFO);
        let _ = request.extend_from_slice(frame);
        self.xcvr.transact(&request, 0)?;
        Ok(())
    }

    pub fn read_rx_fifo(&mut self) -> Result<[u8; FRAME_SIZE], TransactionError> {
        let r = self.xcvr.transact(&[cmd::READ_RX_FIFO], FRAME_SIZE)?;
        let mut frame = [0u8; FRAME_SIZE];
        frame.copy_from_slice(&r);
        Ok(frame)
    }
}
