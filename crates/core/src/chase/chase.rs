use std::time::Duration;

use crate::dmx::frame::Frame;

/// A pre-authored frame sequence plus its playback parameters. Loaded once
/// and immutable during playback; a running chase is never hot-edited.
#[derive(Debug, Clone)]
pub struct Chase {
    /// OSC trigger address, in canonical leading-slash form.
    pub address: String,
    pub frames: Vec<Frame>,
    pub loop_playback: bool,
    pub mute: bool,
    /// Frames per second; values below 1 are treated as 1.
    pub framerate: u32,
    /// Master brightness applied to every channel on send.
    pub brightness: u8,
}

impl Chase {
    /// A chase with no valid frames stays loadable but is never played.
    pub fn is_playable(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.framerate.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        let mut chase = Chase {
            address: "/test".to_string(),
            frames: vec![Frame::new(vec![0])],
            loop_playback: false,
            mute: false,
            framerate: 10,
            brightness: 255,
        };
        assert_eq!(chase.frame_interval(), Duration::from_millis(100));

        // Framerate is clamped to at least 1 before pacing.
        chase.framerate = 0;
        assert_eq!(chase.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_playable_requires_frames() {
        let chase = Chase {
            address: "/test".to_string(),
            frames: vec![],
            loop_playback: false,
            mute: false,
            framerate: 30,
            brightness: 255,
        };
        assert!(!chase.is_playable());
    }
}
