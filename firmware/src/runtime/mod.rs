//! Embassy runtime wiring for the indicator firmware.
//!
//! Startup calibrates the LSI, programs the sampling timer, and spawns two
//! tasks: the sense task counts rising edges on the detector input, and the
//! sample task consumes one timer tick per cycle, folding the drained edge
//! count through the detector engine. Between interrupts the executor keeps
//! the core in its low-power wait.

use cortex_m::peripheral::NVIC;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::pac;
use embassy_stm32::pac::interrupt;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use detector_core::calibration::calibrate;
use detector_core::decision::{DetectorEngine, IndicatorDriver, IndicatorOutput};
use detector_core::fault::{FAULT_FLASH_PERIOD, fault_flash_frames};
use detector_core::sampling::{SenseCounter, TARGET_CYCLE_HZ};

use crate::hw::{self, IndicatorPins, LSI_CALIBRATION, LsiProbe};

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        cortex_m::interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                cortex_m::interrupt::enable();
            }
        }
    }
}

/// Edges recorded by the sense interrupt, drained once per cycle.
static SENSE_EDGES: SenseCounter = SenseCounter::new();
/// Raised by the LPTIM interrupt at the start of every sampling cycle.
static CYCLE_TICK: Signal<CriticalSectionRawMutex, ()> = Signal::new();

const FLASH_FRAME: Duration = Duration::from_millis(FAULT_FLASH_PERIOD.as_millis() as u64);

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA5,
        PA6,
        PA7,
        EXTI5,
        TIM16,
        LPTIM1,
        ..
    } = hal::init(config);

    let mut indicator = IndicatorPins::new(
        Output::new(PA7, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::Low),
    );

    let mut probe = LsiProbe::new(TIM16);
    let calibration = match calibrate(&mut probe, &LSI_CALIBRATION) {
        Ok(calibration) => calibration,
        Err(err) => {
            error!("lsi calibration failed: {}", defmt::Display2Format(&err));
            signal_fault_and_halt(indicator).await;
        }
    };

    let compare = calibration.timer_compare(TARGET_CYCLE_HZ);
    info!(
        "lsi calibrated at {} Hz, sampling compare {}",
        calibration.frequency_hz(),
        compare
    );

    spawner
        .spawn(sense_task(ExtiInput::new(PA5, EXTI5, Pull::Down)))
        .expect("failed to spawn sense task");
    spawner
        .spawn(sample_task(indicator))
        .expect("failed to spawn sample task");

    NVIC::unpend(pac::Interrupt::TIM6_DAC_LPTIM1);
    unsafe { NVIC::unmask(pac::Interrupt::TIM6_DAC_LPTIM1) };
    hw::start_sampling_timer(LPTIM1, compare);

    core::future::pending::<()>().await;
}

/// Counts low-to-high transitions of the sense input.
#[embassy_executor::task]
async fn sense_task(mut sense: ExtiInput<'static>) {
    loop {
        sense.wait_for_rising_edge().await;
        SENSE_EDGES.record_edge();
    }
}

/// Runs the detector once per sampling cycle and drives the indicator.
#[embassy_executor::task]
async fn sample_task(mut indicator: IndicatorPins) {
    let mut engine = DetectorEngine::new();
    let mut last: Option<IndicatorOutput> = None;

    loop {
        CYCLE_TICK.wait().await;
        let drained = SENSE_EDGES.drain();
        let output = engine.on_cycle(drained);
        indicator.show(output);

        if last != Some(output) {
            info!(
                "indicator {} (window sum {}, inactive {})",
                defmt::Display2Format(&output),
                engine.windowed_sum(),
                engine.detector().is_inactive()
            );
            last = Some(output);
        }
    }
}

/// Plays the calibration-fault flash pattern, then parks the MCU for good.
///
/// Recovery from here is an external reset or power cycle only.
async fn signal_fault_and_halt(mut indicator: IndicatorPins) -> ! {
    for (red, green) in fault_flash_frames() {
        indicator.set_indicator(red, green);
        Timer::after(FLASH_FRAME).await;
    }

    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

#[interrupt]
fn TIM6_DAC_LPTIM1() {
    if hw::acknowledge_cycle_tick() {
        CYCLE_TICK.signal(());
    }
}
