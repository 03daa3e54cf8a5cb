//! Visible fail-safe signal for calibration failure.
//!
//! An uncalibrated timer would make the indicator logic meaningless, so when
//! the oscillator measurement never settles the device flashes the two
//! outputs in alternation and then parks in a permanent low-power halt. Only
//! an external reset or power cycle recovers it. The flash pattern is plain
//! data here; the firmware plays it on the real pins with its own delay
//! source.

use core::time::Duration;

/// Number of alternating flash frames in the fault signal.
pub const FAULT_FLASH_COUNT: usize = 8;

/// Time each flash frame is held on the outputs.
pub const FAULT_FLASH_PERIOD: Duration = Duration::from_millis(250);

/// `(red, green)` levels for one frame of the fault signal.
#[must_use]
pub const fn fault_flash_frame(index: usize) -> (bool, bool) {
    if index % 2 == 0 { (true, false) } else { (false, true) }
}

/// Iterates the full fault signal: alternating frames, then both outputs off.
pub fn fault_flash_frames() -> impl Iterator<Item = (bool, bool)> {
    (0..FAULT_FLASH_COUNT)
        .map(fault_flash_frame)
        .chain(core::iter::once((false, false)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_alternate_and_end_dark() {
        let frames: heapless::Vec<(bool, bool), 16> = fault_flash_frames().collect();
        assert_eq!(frames.len(), FAULT_FLASH_COUNT + 1);
        for pair in frames[..FAULT_FLASH_COUNT].windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(frames[0], (true, false));
        assert_eq!(frames[FAULT_FLASH_COUNT], (false, false));
    }

    #[test]
    fn no_frame_lights_both_outputs() {
        for (red, green) in fault_flash_frames() {
            assert!(!(red && green));
        }
    }
}
