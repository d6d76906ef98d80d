//! Device communication client.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use serialport::SerialPort;

use crate::protocol::{cmd, packet_line, parse_reply, Reply};

/// Find a port with a controller on it by asking each candidate for `>S`.
pub fn find_data_port(baud: u32) -> Result<String> {
    for port_info in serialport::available_ports()? {
        let name = &port_info.port_name;
        if !(name.contains("ttyUSB") || name.contains("ttyACM")) {
            continue;
        }
        if let Ok(mut client) = DeviceClient::new(name, baud) {
            client.set_timeout(Duration::from_millis(500));
            if let Ok(Reply::Packet { cmd: cmd::STATUS_RESPONSE, .. }) = client.send_line(">S\n") {
                return Ok(name.clone());
            }
        }
    }
    anyhow::bail!("No controller found - ensure device is connected")
}

/// Resolve a port argument - returns the port path if not "auto", otherwise auto-detects.
pub fn resolve_port(port_arg: &str, baud: u32) -> Result<String> {
    if port_arg == "auto" {
        find_data_port(baud)
    } else {
        Ok(port_arg.to_string())
    }
}

/// Client for the controller's host line.
pub struct DeviceClient {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl DeviceClient {
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(Self {
            port,
            timeout: Duration::from_secs(2),
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Clear any pending data in the serial buffer.
    pub fn clear_buffer(&mut self) -> Result<()> {
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }

    /// Send a raw line and wait for the reply.
    pub fn send_line(&mut self, line: &str) -> Result<Reply> {
        self.port.write_all(line.as_bytes())?;
        self.port.flush()?;
        let reply = self.read_line()?;
        parse_reply(&reply)
    }

    /// Submit a packet on `channel`.
    pub fn submit(&mut self, channel: char, node: u8, cmd: u8, data: &[u8]) -> Result<Reply> {
        self.send_line(&packet_line(channel, node, cmd, data))
    }

    /// Wait for a reply line that is not an acknowledgement, e.g. a forwarded packet.
    pub fn wait_for_packet(&mut self, timeout: Duration) -> Result<Reply> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(line) = self.read_line() {
                let reply = parse_reply(&line)?;
                if let Reply::Packet { .. } = reply {
                    return Ok(reply);
                }
            }
        }
        anyhow::bail!("Timeout waiting for packet")
    }

    /// Read bytes until a newline.
    fn read_line(&mut self) -> Result<String> {
        let mut data = Vec::new();
        let mut buf = [0u8; 1];
        let start = Instant::now();

        while start.elapsed() < self.timeout {
            match self.port.read(&mut buf) {
                Ok(1) => {
                    if buf[0] == b'\n' {
                        if !data.is_empty() {
                            return Ok(String::from_utf8_lossy(&data).into_owned());
                        }
                    } else {
                        data.push(buf[0]);
                    }
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        anyhow::bail!(
            "Timeout waiting for reply, got {:?}",
            String::from_utf8_lossy(&data)
        );
    }
}
