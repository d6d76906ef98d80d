//! Host line protocol matching the firmware.
//!
//! Requests are `>` lines, replies are `<` lines, one per line.

#![allow(dead_code)]

use anyhow::{bail, Context, Result};

/// Built-in command numbers.
pub mod cmd {
    pub const NOOP: u8 = 0;
    pub const STATUS: u8 = 2;
    pub const ACTIVATE: u8 = 3;
    pub const DEACTIVATE: u8 = 4;
    pub const SET_TIME: u8 = 5;
    pub const SET_DATE: u8 = 6;
    pub const READ_EEPROM: u8 = 7;
    pub const WRITE_EEPROM: u8 = 8;
    pub const STATUS_RESPONSE: u8 = 9;
    pub const EEPROM_RESPONSE: u8 = 10;
    /// Controller only
    pub const SET_CHANNEL: u8 = 16;
}

/// Error codes in `<-code/state`.
pub mod error {
    pub const INVALID_CHANNEL: u8 = 1;
    pub const BUSY: u8 = 2;
    pub const TOO_BIG: u8 = 4;
    pub const UNEXPECTED_CHARACTER: u8 = 5;
    pub const NOT_ACTIVE: u8 = 6;
    pub const BAD_COMMAND: u8 = 8;
}

/// Operational states.
pub mod state {
    pub const WARM: u8 = 4;
    pub const LISTEN: u8 = 5;
    pub const ACTIVE: u8 = 6;
}

/// A parsed reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Error { code: u8, state: u8 },
    Packet {
        channel: char,
        node: u8,
        ticks: u16,
        cmd: u8,
        data: Vec<u8>,
    },
}

/// Build a request line: `>A12:3:1,2,3.`
pub fn packet_line(channel: char, node: u8, cmd: u8, data: &[u8]) -> String {
    let mut line = format!(">{}{}:{}", channel, node, cmd);
    if !data.is_empty() {
        let values: Vec<String> = data.iter().map(|b| b.to_string()).collect();
        line.push(':');
        line.push_str(&values.join(","));
    }
    line.push_str(".\n");
    line
}

/// Parse one reply line (without the newline).
pub fn parse_reply(line: &str) -> Result<Reply> {
    let line = line.trim_end();
    let Some(body) = line.strip_prefix('<') else {
        bail!("not a reply line: {:?}", line);
    };

    if body == "+" {
        return Ok(Reply::Ack);
    }

    if let Some(error) = body.strip_prefix('-') {
        let (code, state) = error
            .split_once('/')
            .with_context(|| format!("bad error line: {:?}", line))?;
        return Ok(Reply::Error {
            code: code.parse()?,
            state: state.parse()?,
        });
    }

    let mut chars = body.chars();
    let channel = chars.next().context("empty reply")?;
    let mut fields = chars.as_str().splitn(4, ':');
    let node = fields.next().context("missing node")?.parse()?;
    let ticks = fields.next().context("missing ticks")?.parse()?;
    let cmd = fields.next().context("missing command")?.parse()?;
    let data = match fields.next() {
        Some("") | None => Vec::new(),
        Some(values) => values
            .split(',')
            .map(|v| v.parse::<u8>())
            .collect::<Result<_, _>>()?,
    };

    Ok(Reply::Packet {
        channel,
        node,
        ticks,
        cmd,
        data,
    })
}
