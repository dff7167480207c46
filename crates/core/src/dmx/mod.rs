pub mod frame;
pub mod transmitter;

/// Sink for DMX universe frames. The playback engine only depends on this
/// seam, so tests can substitute a recording output for the serial
/// transmitter.
pub trait DmxOutput: Send + Sync {
    /// Transmit one universe frame. Never blocks on an unavailable device:
    /// implementations drop the frame (with a log message) when the output
    /// is closed.
    ///
    /// On an open device this call is synchronous and can block for the
    /// break/mark timing plus the transport's write timeout. Callers on an
    /// async runtime accept that stall; it keeps a frame atomic on the wire.
    fn send(&self, channels: &[u8]);

    /// Whether the output is currently able to transmit.
    fn is_open(&self) -> bool;
}
