/// Maximum number of channels in one DMX512 universe.
pub const UNIVERSE_SIZE: usize = 512;

/// One snapshot of channel intensities, transmitted as a single DMX packet.
/// Immutable once constructed; chase sources keep frames within
/// `UNIVERSE_SIZE` channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    channels: Vec<u8>,
}

impl Frame {
    pub fn new(channels: Vec<u8>) -> Self {
        Frame { channels }
    }

    pub fn channels(&self) -> &[u8] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Scale every channel by `brightness / 255`, flooring the result.
    /// Brightness 255 is the identity, 0 blacks the frame out.
    pub fn scaled(&self, brightness: u8) -> Frame {
        Frame {
            channels: self
                .channels
                .iter()
                .map(|&v| ((v as u32 * brightness as u32) / 255) as u8)
                .collect(),
        }
    }
}
