mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::{CalibrationMode, Session};

fn main() -> io::Result<()> {
    let mode = parse_mode().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: detector-emulator [--quick-calibration]");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(mode);
    let mut line = String::new();

    writeln!(
        writer,
        "Bay Indicator Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed) {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_mode() -> Result<CalibrationMode, String> {
    let mut args = env::args().skip(1);
    match args.next() {
        None => Ok(CalibrationMode::Validated),
        Some(arg) if arg == "--quick-calibration" => Ok(CalibrationMode::Quick),
        Some(arg) => Err(format!("Unknown argument `{arg}`")),
    }
}
