//! Art-Net output (ArtDmx, protocol revision 14)
//!
//! One UDP datagram per frame: an 18-byte header followed by the 512
//! channel bytes.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use dmxflow_core::{DmxFrame, DMX_UNIVERSE_SIZE};

use crate::error::{ControlError, Result};
use crate::output::DmxTransport;

const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
const OP_DMX: u16 = 0x5000;
const PROTOCOL_VERSION: u16 = 14;
const HEADER_LEN: usize = 18;
/// Highest 15-bit port-address
pub const MAX_UNIVERSE: u16 = 0x7FFF;

/// Sends frames to one Art-Net universe
pub struct ArtNetSender {
    socket: UdpSocket,
    target: SocketAddr,
    universe: u16,
    sequence: u8,
    last_send: Option<Instant>,
    min_interval: Duration,
}

impl ArtNetSender {
    /// Create a sender for `universe` (0-32767) towards `target`,
    /// typically the broadcast address `255.255.255.255:6454`
    pub fn new(universe: u16, target: &str) -> Result<Self> {
        if universe > MAX_UNIVERSE {
            return Err(ControlError::InvalidUniverse(universe));
        }
        let target: SocketAddr = target.parse().map_err(|e: std::net::AddrParseError| {
            ControlError::InvalidAddress {
                address: target.to_string(),
                reason: e.to_string(),
            }
        })?;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;

        tracing::info!("Art-Net sender created for universe {} -> {}", universe, target);

        Ok(Self {
            socket,
            target,
            universe,
            sequence: 1,
            last_send: None,
            min_interval: Duration::from_millis(1000 / 44), // DMX512 tops out near 44 Hz
        })
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Cap the send rate; 0 disables the cap
    pub fn set_refresh_rate(&mut self, hz: u32) {
        self.min_interval = match hz {
            0 => Duration::ZERO,
            hz => Duration::from_secs_f64(1.0 / hz as f64),
        };
    }

    /// Build an ArtDmx packet
    fn build_packet(&self, channels: &[u8; DMX_UNIVERSE_SIZE]) -> Vec<u8> {
        let mut packet = vec![0u8; HEADER_LEN + DMX_UNIVERSE_SIZE];

        packet[0..8].copy_from_slice(ARTNET_ID);
        packet[8..10].copy_from_slice(&OP_DMX.to_le_bytes());
        packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        packet[12] = self.sequence;
        // Physical input port, informational only
        packet[13] = 0;
        packet[14..16].copy_from_slice(&self.universe.to_le_bytes());
        packet[16..18].copy_from_slice(&(DMX_UNIVERSE_SIZE as u16).to_be_bytes());
        packet[HEADER_LEN..].copy_from_slice(channels);

        packet
    }

    fn advance_sequence(&mut self) {
        // 0 means "sequencing disabled" to receivers.
        self.sequence = match self.sequence.wrapping_add(1) {
            0 => 1,
            next => next,
        };
    }
}

impl DmxTransport for ArtNetSender {
    fn name(&self) -> &str {
        "artnet"
    }

    fn send_frame(&mut self, frame: &DmxFrame) -> Result<()> {
        let now = Instant::now();
        if let Some(last) = self.last_send {
            if now.duration_since(last) < self.min_interval {
                return Ok(());
            }
        }

        let packet = self.build_packet(frame.as_bytes());
        let sent = self.socket.send_to(&packet, self.target)?;
        if sent != packet.len() {
            return Err(ControlError::TransportError(format!(
                "short Art-Net write: {} of {} bytes",
                sent,
                packet.len()
            )));
        }
        self.advance_sequence();
        self.last_send = Some(now);

        tracing::trace!("Sent Art-Net frame to universe {}", self.universe);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_structure() {
        let sender = ArtNetSender::new(3, "127.0.0.1:6454").unwrap();
        let mut frame = DmxFrame::new();
        frame.set(0, 11);
        frame.set(511, 99);
        let packet = sender.build_packet(frame.as_bytes());

        assert_eq!(&packet[0..8], b"Art-Net\0");
        // OpCode little-endian
        assert_eq!(&packet[8..10], &[0x00, 0x50]);
        // Protocol version big-endian
        assert_eq!(&packet[10..12], &[0, 14]);
        assert_eq!(packet[12], 1);
        assert_eq!(&packet[14..16], &[3, 0]);
        // Length big-endian
        assert_eq!(&packet[16..18], &[0x02, 0x00]);
        assert_eq!(packet[18], 11);
        assert_eq!(packet[18 + 511], 99);
        assert_eq!(packet.len(), 18 + 512);
    }

    #[test]
    fn test_invalid_target() {
        assert!(matches!(
            ArtNetSender::new(0, "invalid:address"),
            Err(ControlError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_universe_range() {
        assert!(ArtNetSender::new(MAX_UNIVERSE, "127.0.0.1:6454").is_ok());
        assert!(matches!(
            ArtNetSender::new(MAX_UNIVERSE + 1, "127.0.0.1:6454"),
            Err(ControlError::InvalidUniverse(_))
        ));
    }

    #[test]
    fn test_sequence_skips_zero() {
        let mut sender = ArtNetSender::new(0, "127.0.0.1:6454").unwrap();
        sender.sequence = 255;
        sender.advance_sequence();
        assert_eq!(sender.sequence, 1);
    }

    #[test]
    fn test_frames_reach_receiver() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let address = receiver.local_addr().unwrap().to_string();

        let mut sender = ArtNetSender::new(0, &address).unwrap();
        sender.set_refresh_rate(0);
        let mut frame = DmxFrame::new();
        frame.set(4, 200);
        sender.send_frame(&frame).unwrap();

        let mut buf = [0u8; 600];
        let len = receiver.recv(&mut buf).unwrap();
        assert_eq!(len, 18 + 512);
        assert_eq!(buf[18 + 4], 200);
    }
}
