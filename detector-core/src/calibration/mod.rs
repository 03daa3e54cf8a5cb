//! Startup calibration of the low-power sampling oscillator.
//!
//! The sampling timer runs from an imprecise internal oscillator whose real
//! frequency can land anywhere in a wide datasheet band. Before periodic
//! sampling starts, the firmware measures that oscillator against a trusted
//! reference clock and derives the timer compare value that yields the target
//! cycle period. The measurement primitive itself is hardware-specific, so it
//! enters through the [`OscillatorProbe`] trait; everything else is portable
//! and runs the same way on the host.

use core::fmt;

/// Reference clock the raw count samples are taken against (Hz).
pub const REFERENCE_CLOCK_HZ: u32 = 1_000_000;
/// Lower edge of the plausible oscillator band (Hz).
pub const OSC_MIN_HZ: u32 = 4_000;
/// Upper edge of the plausible oscillator band (Hz).
pub const OSC_MAX_HZ: u32 = 20_000;
/// Two consecutive samples must agree within this many reference counts.
pub const COUNT_TOLERANCE: u32 = 3;
/// Measurement attempts before calibration is declared unstable.
pub const MAX_CALIBRATION_ATTEMPTS: u8 = 20;

/// Source of raw oscillator count samples.
///
/// One sample is the number of reference-clock ticks observed during a single
/// period of the oscillator under measurement, so `reference_hz / count`
/// recovers the oscillator frequency.
pub trait OscillatorProbe {
    /// Takes one raw reference-relative count sample.
    fn measure_count(&mut self) -> u32;
}

/// Parameters governing a calibration run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CalibrationConfig {
    /// Frequency of the trusted reference clock (Hz).
    pub reference_hz: u32,
    /// Lowest oscillator frequency considered plausible (Hz).
    pub min_osc_hz: u32,
    /// Highest oscillator frequency considered plausible (Hz).
    pub max_osc_hz: u32,
    /// Maximum disagreement between consecutive accepted samples (counts).
    pub tolerance_counts: u32,
    /// Sample budget before giving up.
    pub max_attempts: u8,
    /// When `false`, the first raw sample is accepted without any checks.
    ///
    /// This is the size-reduced build variant: it trades startup robustness
    /// for code size and is a legitimate configuration, not a bug.
    pub validate: bool,
}

impl CalibrationConfig {
    /// Smallest plausible count (fastest plausible oscillator).
    #[must_use]
    pub const fn min_count(&self) -> u32 {
        self.reference_hz / self.max_osc_hz
    }

    /// Largest plausible count (slowest plausible oscillator).
    #[must_use]
    pub const fn max_count(&self) -> u32 {
        self.reference_hz / self.min_osc_hz
    }

    /// Returns `true` when the count maps into the plausible band.
    #[must_use]
    pub const fn count_plausible(&self, count: u32) -> bool {
        count >= self.min_count() && count <= self.max_count()
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            reference_hz: REFERENCE_CLOCK_HZ,
            min_osc_hz: OSC_MIN_HZ,
            max_osc_hz: OSC_MAX_HZ,
            tolerance_counts: COUNT_TOLERANCE,
            max_attempts: MAX_CALIBRATION_ATTEMPTS,
            validate: true,
        }
    }
}

/// Accepted calibration result, immutable after startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Calibration {
    frequency_hz: u32,
}

impl Calibration {
    /// Measured oscillator frequency (Hz).
    #[must_use]
    pub const fn frequency_hz(self) -> u32 {
        self.frequency_hz
    }

    /// Timer compare value yielding one interrupt per target cycle.
    ///
    /// The sampling timer counts the calibrated oscillator directly, so the
    /// compare register holds one less than the ticks per cycle.
    #[must_use]
    pub const fn timer_compare(self, target_cycle_hz: u32) -> u32 {
        (self.frequency_hz / target_cycle_hz).saturating_sub(1)
    }

    const fn from_count(count: u32, reference_hz: u32) -> Result<Self, CalibrationError> {
        if count == 0 {
            return Err(CalibrationError::ZeroCount);
        }
        Ok(Self {
            frequency_hz: reference_hz / count,
        })
    }
}

/// Failure reported when the oscillator measurement never settles.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CalibrationError {
    /// No two consecutive plausible samples agreed within tolerance.
    Unstable {
        /// Number of samples consumed before giving up.
        attempts: u8,
    },
    /// The probe returned a zero count, which no real oscillator produces.
    ZeroCount,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::Unstable { attempts } => {
                write!(f, "oscillator unstable after {attempts} samples")
            }
            CalibrationError::ZeroCount => f.write_str("oscillator count sample was zero"),
        }
    }
}

/// Runs the calibration procedure against the provided probe.
///
/// In validated mode, samples are drawn until two consecutive ones agree
/// within `tolerance_counts` and both land inside the plausibility band.
/// The frequency is derived from the later of the agreeing pair. Exhausting
/// `max_attempts` without agreement is fatal to the caller: the device signals
/// the fault and halts rather than sample on a meaningless timebase.
///
/// # Errors
///
/// [`CalibrationError::Unstable`] when the sample budget runs out, and
/// [`CalibrationError::ZeroCount`] when the probe hands back a zero count in
/// unvalidated mode.
pub fn calibrate<P: OscillatorProbe>(
    probe: &mut P,
    config: &CalibrationConfig,
) -> Result<Calibration, CalibrationError> {
    if !config.validate {
        return Calibration::from_count(probe.measure_count(), config.reference_hz);
    }

    let mut previous: Option<u32> = None;
    for _ in 0..config.max_attempts {
        let count = probe.measure_count();
        if let Some(prior) = previous
            && config.count_plausible(prior)
            && config.count_plausible(count)
            && count.abs_diff(prior) <= config.tolerance_counts
        {
            return Calibration::from_count(count, config.reference_hz);
        }
        previous = Some(count);
    }

    Err(CalibrationError::Unstable {
        attempts: config.max_attempts,
    })
}
