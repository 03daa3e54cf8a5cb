use crossterm::style::{Color, Stylize};

use detector_core::calibration::{Calibration, CalibrationConfig, OscillatorProbe, calibrate};
use detector_core::decision::{
    CLEAR_THRESHOLD, DetectorEngine, IndicatorOutput, MAX_BLOCKED_COUNT, MAX_CLEAR_COUNT,
};
use detector_core::fault::{FAULT_FLASH_COUNT, fault_flash_frames};
use detector_core::sampling::{SAMPLES_PER_CYCLE, SenseCounter, TARGET_CYCLE_HZ};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("edge", "edge [n]                 - record n sense edges (default 1)"),
    ("tick", "tick [n]                 - advance n sampling cycles (default 1)"),
    (
        "run",
        "run <n> <clear|blocked>  - simulate n cycles of a steady sensor",
    ),
    (
        "calibrate",
        "calibrate <counts...>    - replay raw oscillator samples",
    ),
    ("status", "status                   - show detector state"),
    ("reset", "reset                    - return to the power-on state"),
    ("help", "help [topic]             - show help for a command"),
];

/// Whether the `calibrate` command validates samples or takes the first one.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CalibrationMode {
    Validated,
    Quick,
}

/// Probe replaying user-provided counts, repeating the final one.
struct ReplayProbe {
    samples: Vec<u32>,
    cursor: usize,
}

impl OscillatorProbe for ReplayProbe {
    fn measure_count(&mut self) -> u32 {
        let sample = self.samples[self.cursor.min(self.samples.len() - 1)];
        self.cursor += 1;
        sample
    }
}

pub struct Session {
    engine: DetectorEngine,
    counter: SenseCounter,
    calibration: Option<Calibration>,
    last_output: Option<IndicatorOutput>,
    mode: CalibrationMode,
    cycles: u64,
}

impl Session {
    pub fn new(mode: CalibrationMode) -> Self {
        Self {
            engine: DetectorEngine::new(),
            counter: SenseCounter::new(),
            calibration: None,
            last_output: None,
            mode,
            cycles: 0,
        }
    }

    pub fn handle_command(&mut self, input: &str) -> Vec<String> {
        let mut parts = input.split_whitespace();
        let Some(command) = parts.next() else {
            return Vec::new();
        };
        let args: Vec<&str> = parts.collect();

        match command.to_ascii_lowercase().as_str() {
            "help" => help(args.first().copied()),
            "status" => self.status(),
            "edge" => self.edge(&args),
            "tick" => self.tick(&args),
            "run" => self.run(&args),
            "calibrate" => self.calibrate_from(&args),
            "reset" => {
                *self = Self::new(self.mode);
                vec!["Detector returned to the power-on state.".to_string()]
            }
            other => vec![format!("Unknown command `{other}`; try `help`.")],
        }
    }

    fn status(&self) -> Vec<String> {
        let detector = self.engine.detector();
        let calibration = self.calibration.map_or_else(
            || "not run".to_string(),
            |calibration| {
                format!(
                    "{} Hz (compare {})",
                    calibration.frequency_hz(),
                    calibration.timer_compare(TARGET_CYCLE_HZ)
                )
            },
        );

        vec![
            format!("indicator     {}", render_indicator(self.last_output)),
            format!(
                "window sum    {} (clear threshold {CLEAR_THRESHOLD})",
                self.engine.windowed_sum()
            ),
            format!("clear count   {}/{MAX_CLEAR_COUNT}", detector.clear_count()),
            format!(
                "block count   {}/{MAX_BLOCKED_COUNT}",
                detector.blocked_count()
            ),
            format!("inactive      {}", detector.is_inactive()),
            format!("pending edges {}", self.counter.peek()),
            format!("cycles        {}", self.cycles),
            format!("calibration   {calibration}"),
        ]
    }

    fn edge(&mut self, args: &[&str]) -> Vec<String> {
        let count = match optional_count(args, 1) {
            Ok(count) => count,
            Err(message) => return vec![message],
        };
        for _ in 0..count {
            self.counter.record_edge();
        }
        vec![format!(
            "Recorded {count} edge(s); {} pending for the next cycle.",
            self.counter.peek()
        )]
    }

    fn tick(&mut self, args: &[&str]) -> Vec<String> {
        let count = match optional_count(args, 1) {
            Ok(count) => count,
            Err(message) => return vec![message],
        };
        let mut responses = Vec::new();
        for _ in 0..count {
            if let Some(line) = self.advance_cycle() {
                responses.push(line);
            }
        }
        responses.push(format!(
            "Advanced {count} cycle(s); window sum {}.",
            self.engine.windowed_sum()
        ));
        responses
    }

    fn run(&mut self, args: &[&str]) -> Vec<String> {
        let (count, steady) = match (args.first(), args.get(1)) {
            (Some(count), Some(&steady)) => match count.parse::<u64>() {
                Ok(count) => (count, steady),
                Err(_) => return vec![format!("Expected a cycle count, got `{count}`.")],
            },
            _ => return vec!["Usage: run <n> <clear|blocked>".to_string()],
        };
        let edges_per_cycle = if steady.eq_ignore_ascii_case("clear") {
            u64::from(SAMPLES_PER_CYCLE)
        } else if steady.eq_ignore_ascii_case("blocked") {
            0
        } else {
            return vec![format!("Expected `clear` or `blocked`, got `{steady}`.")];
        };

        let mut responses = Vec::new();
        for _ in 0..count {
            for _ in 0..edges_per_cycle {
                self.counter.record_edge();
            }
            if let Some(line) = self.advance_cycle() {
                responses.push(line);
            }
        }
        responses.push(format!(
            "Ran {count} {steady} cycle(s); window sum {}.",
            self.engine.windowed_sum()
        ));
        responses
    }

    fn calibrate_from(&mut self, args: &[&str]) -> Vec<String> {
        if args.is_empty() {
            return vec!["Usage: calibrate <counts...>".to_string()];
        }
        let mut samples = Vec::with_capacity(args.len());
        for arg in args {
            match arg.parse::<u32>() {
                Ok(sample) => samples.push(sample),
                Err(_) => return vec![format!("Expected a count sample, got `{arg}`.")],
            }
        }

        let config = CalibrationConfig {
            validate: self.mode == CalibrationMode::Validated,
            ..CalibrationConfig::default()
        };
        let mut probe = ReplayProbe { samples, cursor: 0 };
        match calibrate(&mut probe, &config) {
            Ok(calibration) => {
                self.calibration = Some(calibration);
                vec![format!(
                    "Calibration accepted after {} sample(s): {} Hz, compare {}.",
                    probe.cursor,
                    calibration.frequency_hz(),
                    calibration.timer_compare(TARGET_CYCLE_HZ)
                )]
            }
            Err(err) => {
                self.calibration = None;
                vec![
                    format!("Calibration failed: {err}."),
                    format!(
                        "The device would flash {FAULT_FLASH_COUNT} alternating frames and halt:"
                    ),
                    fault_flash_frames()
                        .map(|(red, green)| render_levels(red, green))
                        .collect::<Vec<_>>()
                        .join(" "),
                ]
            }
        }
    }

    fn advance_cycle(&mut self) -> Option<String> {
        let drained = self.counter.drain();
        let output = self.engine.on_cycle(drained);
        self.cycles += 1;

        let changed = self.last_output != Some(output);
        self.last_output = Some(output);
        changed.then(|| {
            format!(
                "cycle {}: {} {} (window sum {})",
                self.cycles,
                render_indicator(Some(output)),
                output,
                self.engine.windowed_sum()
            )
        })
    }
}

fn help(topic: Option<&str>) -> Vec<String> {
    match topic {
        None => HELP_TOPICS
            .iter()
            .map(|(_, line)| (*line).to_string())
            .collect(),
        Some(topic) => HELP_TOPICS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(topic))
            .map_or_else(
                || vec![format!("No help for `{topic}`.")],
                |(_, line)| vec![(*line).to_string()],
            ),
    }
}

fn optional_count(args: &[&str], default: u64) -> Result<u64, String> {
    match args.first() {
        None => Ok(default),
        Some(arg) => arg
            .parse::<u64>()
            .map_err(|_| format!("Expected a count, got `{arg}`.")),
    }
}

fn render_indicator(output: Option<IndicatorOutput>) -> String {
    match output {
        None => render_levels(false, false),
        Some(output) => {
            let (red, green) = output.levels();
            render_levels(red, green)
        }
    }
}

fn render_levels(red: bool, green: bool) -> String {
    let red_lamp = if red {
        "●".with(Color::Red)
    } else {
        "○".with(Color::DarkGrey)
    };
    let green_lamp = if green {
        "●".with(Color::Green)
    } else {
        "○".with(Color::DarkGrey)
    };
    format!("[{red_lamp} {green_lamp}]")
}
