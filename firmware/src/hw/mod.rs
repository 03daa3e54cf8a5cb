//! Hardware adapters between the STM32 target and `detector-core`.
//!
//! Everything register-shaped lives here: the indicator GPIO pair, the LSI
//! measurement probe, and the LSI-clocked LPTIM that paces the sampling
//! cycle. The rest of the firmware only sees the core's traits.

use detector_core::calibration::{CalibrationConfig, OscillatorProbe};
use detector_core::decision::IndicatorDriver;
use embassy_stm32::Peri;
use embassy_stm32::gpio::Output;
use embassy_stm32::pac;
use embassy_stm32::peripherals::{LPTIM1, TIM16};

/// LSI rendition of the calibration constants: TIM16 counts the 16 MHz HSI
/// reference across one LSI period, and the LSI datasheet band maps to
/// roughly 400..620 counts.
pub const LSI_CALIBRATION: CalibrationConfig = CalibrationConfig {
    reference_hz: 16_000_000,
    min_osc_hz: 25_600,
    max_osc_hz: 40_000,
    tolerance_counts: 3,
    max_attempts: 20,
    validate: !cfg!(feature = "quick-calibration"),
};

/// Two-color indicator wired to push-pull outputs.
pub struct IndicatorPins {
    red: Output<'static>,
    green: Output<'static>,
}

impl IndicatorPins {
    /// Wraps the already-configured output pins.
    pub fn new(red: Output<'static>, green: Output<'static>) -> Self {
        Self { red, green }
    }
}

impl IndicatorDriver for IndicatorPins {
    fn set_indicator(&mut self, red: bool, green: bool) {
        if red {
            self.red.set_high();
        } else {
            self.red.set_low();
        }
        if green {
            self.green.set_high();
        } else {
            self.green.set_low();
        }
    }
}

/// Measures the LSI with TIM16 input capture.
///
/// TIM16's TI1 input can be routed to the LSI internally, so one count
/// sample is the number of HSI-driven timer ticks between two consecutive
/// LSI rising edges.
pub struct LsiProbe {
    _tim: Peri<'static, TIM16>,
}

impl LsiProbe {
    /// Claims TIM16, starts the LSI, and arms channel 1 for input capture.
    pub fn new(tim: Peri<'static, TIM16>) -> Self {
        pac::RCC.csr().modify(|w| w.set_lsion(true));
        while !pac::RCC.csr().read().lsirdy() {}

        pac::RCC.apbenr2().modify(|w| w.set_tim16en(true));

        let regs = pac::TIM16;
        // TI1 = LSI per the TIM16 input-selection table.
        regs.tisel().modify(|w| w.set_tisel(0, 1));
        regs.arr().modify(|w| w.set_arr(0xFFFF));
        regs.ccmr_input(0)
            .modify(|w| w.set_ccs(0, pac::timer::vals::CcmrInputCcs::from_bits(0b01)));
        regs.ccer().modify(|w| w.set_cce(0, true));
        regs.cr1().modify(|w| w.set_cen(true));

        Self { _tim: tim }
    }

    fn wait_capture(&self) -> u16 {
        let regs = pac::TIM16;
        while !regs.sr().read().ccif(0) {}
        regs.sr().modify(|w| w.set_ccif(0, false));
        regs.ccr(0).read().ccr()
    }
}

impl OscillatorProbe for LsiProbe {
    fn measure_count(&mut self) -> u32 {
        // Discard the first capture so the measurement spans a full period.
        let first = self.wait_capture();
        let second = self.wait_capture();
        u32::from(second.wrapping_sub(first))
    }
}

/// Clocks LPTIM1 from the LSI and starts it free-running with the calibrated
/// compare value, one autoreload-match interrupt per sampling cycle.
pub fn start_sampling_timer(_lptim: Peri<'static, LPTIM1>, compare: u32) {
    // LPTIMSEL = 01: LSI kernel clock.
    pac::RCC
        .ccipr()
        .modify(|w| w.set_lptim1sel(pac::rcc::vals::Lptim1sel::from_bits(0b01)));
    pac::RCC.apbenr1().modify(|w| w.set_lptim1en(true));

    let regs = pac::LPTIM1;
    // IER is only writable while the peripheral is disabled.
    regs.ier().modify(|w| w.set_arrmie(true));
    regs.cr().modify(|w| w.set_enable(true));
    regs.arr().modify(|w| w.set_arr(clamped_compare(compare)));
    regs.cr().modify(|w| w.set_cntstrt(true));
}

/// Clears the autoreload-match flag; returns `false` for spurious wakeups.
pub fn acknowledge_cycle_tick() -> bool {
    let regs = pac::LPTIM1;
    if regs.isr().read().arrm() {
        regs.icr().write(|w| w.set_arrmcf(true));
        true
    } else {
        false
    }
}

fn clamped_compare(compare: u32) -> u16 {
    u16::try_from(compare).unwrap_or(u16::MAX)
}
