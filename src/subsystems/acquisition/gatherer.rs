//! Telemetry packet assembly
//!
//! One packet is a single ASCII line, fields in [`Channel::ALL`] order:
//!
//! ```text
//! <tick>,<pitot>,<baro>,<gps alt>,<gps pos>,<accel>,<gyro>\n
//! 1500,2048,99325,167.8,4529.8360#N#7334.74137#W,101#101#101,101#101#101\n
//! ```
//!
//! A channel that was never written contributes an empty field.

use core::fmt::Write;

use heapless::{String, Vec};

use super::buffers::{AcquisitionBuffers, Channel, CHANNEL_COUNT, MAX_CHANNEL_CAPACITY};
use crate::core::traits::Tick;

/// Digits of the largest tick value
pub const TIMESTAMP_CAPACITY: usize = 10;

/// Largest possible packet: timestamp, every channel at capacity, one
/// separator per channel and the newline
pub const PACKET_CAPACITY: usize = {
    let mut total = TIMESTAMP_CAPACITY + CHANNEL_COUNT + 1;
    let mut i = 0;
    while i < CHANNEL_COUNT {
        total += Channel::ALL[i].capacity();
        i += 1;
    }
    total
};

/// Buffer holding one telemetry packet
pub type TelemetryPacket = Vec<u8, PACKET_CAPACITY>;

/// Build the packet for `tick` into `out` and return its length.
///
/// Every channel is read, clearing its new-data mark.
pub fn read_telemetry(buffers: &mut AcquisitionBuffers, tick: Tick, out: &mut TelemetryPacket) -> usize {
    out.clear();

    let mut timestamp: String<TIMESTAMP_CAPACITY> = String::new();
    // u32 never needs more than ten digits
    let _ = write!(timestamp, "{}", tick.as_u32());
    let _ = out.extend_from_slice(timestamp.as_bytes());

    let mut field = [0u8; MAX_CHANNEL_CAPACITY];
    for channel in Channel::ALL {
        let count = buffers.read(channel, &mut field);
        let _ = out.push(b',');
        let _ = out.extend_from_slice(&field[..count]);
    }
    let _ = out.push(b'\n');

    out.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffers_give_empty_fields() {
        let mut buffers = AcquisitionBuffers::new();
        let mut packet = TelemetryPacket::new();

        assert_eq!(read_telemetry(&mut buffers, Tick(42), &mut packet), 9);
        assert_eq!(packet.as_slice(), b"42,,,,,,\n");
    }

    #[test]
    fn packet_carries_every_channel_in_order() {
        let mut buffers = AcquisitionBuffers::new();
        buffers.write(Channel::Gyroscope, b"g");
        buffers.write(Channel::Pitot, b"p");
        buffers.write(Channel::GpsPosition, b"pos");
        let mut packet = TelemetryPacket::new();

        read_telemetry(&mut buffers, Tick(7), &mut packet);
        assert_eq!(packet.as_slice(), b"7,p,,,pos,,g\n");
        assert!(!buffers.is_new(Channel::Pitot));
        assert!(!buffers.is_new(Channel::Gyroscope));
    }

    #[test]
    fn full_buffers_fit_packet() {
        let mut buffers = AcquisitionBuffers::new();
        for channel in Channel::ALL {
            buffers.write(channel, &[b'9'; MAX_CHANNEL_CAPACITY]);
        }
        let mut packet = TelemetryPacket::new();

        let len = read_telemetry(&mut buffers, Tick(u32::MAX), &mut packet);
        assert_eq!(len, PACKET_CAPACITY);
        assert!(packet.starts_with(b"4294967295,99999999,"));
        assert_eq!(packet.last(), Some(&b'\n'));
    }
}
