/// Provider of an absolute position over the full 32 bit span.
///
/// Decoded counters, the shared position slot and simulated rotations all
/// implement this; whatever signal routing the chip does between position
/// producers and consumers is plain trait plumbing here.
pub trait PositionSource {
    /// Current absolute position, wrapping over the span.
    fn read(&mut self) -> u32;
}
