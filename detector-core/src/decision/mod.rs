//! Hysteresis state machine mapping window occupancy onto the indicator.
//!
//! Once per cycle the sampling task hands the windowed sum to
//! [`Detector::on_tick`], which classifies the cycle as cleared or blocked
//! and applies the debounce policy: sustained clear detection eventually
//! parks the indicator dark (inactive), and a brief blocked blip while
//! inactive is ignored until the streak is long enough to justify
//! re-lighting. The decision is pure state-machine work; actually driving
//! the LEDs goes through the [`IndicatorDriver`] seam.

use core::fmt;

use crate::sampling::{OccupancyWindow, SAMPLES_PER_CYCLE, TARGET_CYCLE_HZ, WINDOW_BINS};

/// Percentage of the full window that must read clear for a cleared cycle.
pub const CLEAR_THRESHOLD_PERCENT: u32 = 90;

/// Minimum windowed sum classified as "sensor cleared", inclusive.
pub const CLEAR_THRESHOLD: u32 =
    (WINDOW_BINS as u32 * SAMPLES_PER_CYCLE * CLEAR_THRESHOLD_PERCENT + 50) / 100;

/// Sustained clear time before the indicator shuts off (seconds).
pub const IDLE_DEACTIVATION_SECS: u32 = 60;

/// Cleared cycles before the device goes inactive.
pub const MAX_CLEAR_COUNT: u16 = (IDLE_DEACTIVATION_SECS * TARGET_CYCLE_HZ) as u16;

/// Consecutive blocked cycles, while inactive, that force reactivation.
pub const MAX_BLOCKED_COUNT: u16 = 5;

/// Logical indicator state decided for one cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndicatorOutput {
    /// RED on, GREEN off.
    Blocked,
    /// GREEN on, RED off.
    Cleared,
    /// Both outputs off.
    Dark,
}

impl IndicatorOutput {
    /// Returns the `(red, green)` levels for this output.
    #[must_use]
    pub const fn levels(self) -> (bool, bool) {
        match self {
            IndicatorOutput::Blocked => (true, false),
            IndicatorOutput::Cleared => (false, true),
            IndicatorOutput::Dark => (false, false),
        }
    }
}

impl fmt::Display for IndicatorOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorOutput::Blocked => f.write_str("blocked"),
            IndicatorOutput::Cleared => f.write_str("cleared"),
            IndicatorOutput::Dark => f.write_str("dark"),
        }
    }
}

/// Abstraction over the physical two-color indicator.
pub trait IndicatorDriver {
    /// Drives the raw output levels.
    fn set_indicator(&mut self, red: bool, green: bool);

    /// Applies a decided output to the hardware.
    fn show(&mut self, output: IndicatorOutput) {
        let (red, green) = output.levels();
        self.set_indicator(red, green);
    }

    /// Turns both outputs off.
    fn all_off(&mut self) {
        self.set_indicator(false, false);
    }
}

/// Indicator driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopIndicator;

impl NoopIndicator {
    /// Creates a new no-op indicator driver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl IndicatorDriver for NoopIndicator {
    fn set_indicator(&mut self, _: bool, _: bool) {}
}

/// Debounce state carried across cycles.
///
/// Exactly one branch runs per tick, so the two counters are never advanced
/// in the same cycle. The device starts on the blocked/active assumption and
/// must earn its way into the inactive state through sustained clear cycles.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Detector {
    clear_count: u16,
    blocked_count: u16,
    inactive: bool,
}

impl Detector {
    /// Creates the initial active state with both counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clear_count: 0,
            blocked_count: 0,
            inactive: false,
        }
    }

    /// Cleared cycles observed since the last blocked cycle, saturating.
    #[must_use]
    pub const fn clear_count(self) -> u16 {
        self.clear_count
    }

    /// Blocked cycles observed while inactive, saturating.
    #[must_use]
    pub const fn blocked_count(self) -> u16 {
        self.blocked_count
    }

    /// Returns `true` once sustained clear detection has parked the device.
    #[must_use]
    pub const fn is_inactive(self) -> bool {
        self.inactive
    }

    /// Classifies one cycle and returns the indicator output to apply.
    pub fn on_tick(&mut self, windowed_sum: u32) -> IndicatorOutput {
        if windowed_sum >= CLEAR_THRESHOLD {
            // Any clear cycle forgives prior blocked history.
            self.blocked_count = 0;
            if self.clear_count >= MAX_CLEAR_COUNT {
                self.inactive = true;
                IndicatorOutput::Dark
            } else {
                self.clear_count += 1;
                self.inactive = false;
                IndicatorOutput::Cleared
            }
        } else if self.inactive {
            self.blocked_count += 1;
            if self.blocked_count >= MAX_BLOCKED_COUNT {
                self.reactivate()
            } else {
                // Brief blocked blip while idle: leave the indicator dark.
                IndicatorOutput::Dark
            }
        } else {
            self.reactivate()
        }
    }

    fn reactivate(&mut self) -> IndicatorOutput {
        self.clear_count = 0;
        self.blocked_count = 0;
        self.inactive = false;
        IndicatorOutput::Blocked
    }
}

/// Per-cycle consumer tying the occupancy window to the state machine.
///
/// The sampling task owns one engine; each timer period it drains the sense
/// counter and feeds the count through here.
#[derive(Default)]
pub struct DetectorEngine {
    window: OccupancyWindow,
    detector: Detector,
}

impl DetectorEngine {
    /// Creates an engine with a zero-filled window and active initial state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            window: OccupancyWindow::new(),
            detector: Detector::new(),
        }
    }

    /// Folds one completed cycle's edge count through window and detector.
    pub fn on_cycle(&mut self, cycle_count: u16) -> IndicatorOutput {
        let windowed_sum = self.window.tick(cycle_count);
        self.detector.on_tick(windowed_sum)
    }

    /// Read access to the debounce state.
    #[must_use]
    pub const fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Current occupancy statistic.
    #[must_use]
    pub fn windowed_sum(&self) -> u32 {
        self.window.windowed_sum()
    }
}
