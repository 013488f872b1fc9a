//! Latest-value acquisition buffers
//!
//! One fixed-capacity slot per [`Channel`]. A write replaces the previous
//! reading and marks the slot new; a read that copies the whole reading
//! clears the mark.

use heapless::Vec;

/// Capacity of the largest channel
pub const MAX_CHANNEL_CAPACITY: usize = 32;

/// Number of channels
pub const CHANNEL_COUNT: usize = 6;

/// Sensor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Pitot,
    Barometer,
    GpsAltitude,
    GpsPosition,
    Accelerometer,
    Gyroscope,
}

impl Channel {
    /// All channels in telemetry order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Pitot,
        Channel::Barometer,
        Channel::GpsAltitude,
        Channel::GpsPosition,
        Channel::Accelerometer,
        Channel::Gyroscope,
    ];

    /// Bytes kept for one reading
    pub const fn capacity(self) -> usize {
        match self {
            Channel::Pitot => 8,
            Channel::Barometer => 16,
            Channel::GpsAltitude => 32,
            Channel::GpsPosition => 32,
            Channel::Accelerometer => 24,
            Channel::Gyroscope => 24,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    data: Vec<u8, MAX_CHANNEL_CAPACITY>,
    new_data: bool,
}

/// Latest reading of every channel
#[derive(Debug, Clone, Default)]
pub struct AcquisitionBuffers {
    slots: [Slot; CHANNEL_COUNT],
}

impl AcquisitionBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the reading of `channel`.
    ///
    /// `data` is truncated to the channel capacity. Returns the number of
    /// bytes stored.
    pub fn write(&mut self, channel: Channel, data: &[u8]) -> usize {
        let count = core::cmp::min(data.len(), channel.capacity());
        let slot = &mut self.slots[channel.index()];
        slot.data.clear();
        // capacity() never exceeds MAX_CHANNEL_CAPACITY
        let _ = slot.data.extend_from_slice(&data[..count]);
        slot.new_data = true;
        count
    }

    /// Copy the reading of `channel` into `out`.
    ///
    /// The new-data mark is cleared only when the whole reading fit.
    pub fn read(&mut self, channel: Channel, out: &mut [u8]) -> usize {
        let slot = &mut self.slots[channel.index()];
        let count = core::cmp::min(out.len(), slot.data.len());
        out[..count].copy_from_slice(&slot.data[..count]);
        if count == slot.data.len() {
            slot.new_data = false;
        }
        count
    }

    /// Check if `channel` was written since its last complete read
    pub fn is_new(&self, channel: Channel) -> bool {
        self.slots[channel.index()].new_data
    }

    /// Current reading of `channel`, without touching the new-data mark
    pub fn peek(&self, channel: Channel) -> &[u8] {
        &self.slots[channel.index()].data
    }
}
