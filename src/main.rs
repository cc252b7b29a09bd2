//! LC-3 VM - CLI Entry Point
//!
//! Usage: `lc3-vm [OPTIONS] <IMAGE>...`
//!
//! Exit codes:
//! - 0: program executed TRAP HALT
//! - 1: an image failed to load
//! - 2: usage error (including no images)
//! - 3: fatal execution error
//! - 130: interrupted with Ctrl-C

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{debug, error};

use lc3::{disassemble, Console, ConsoleError, Cpu, CpuError, Image, PipeConsole};

const EXIT_LOAD_FAILURE: u8 = 1;
const EXIT_FATAL: u8 = 3;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "lc3-vm")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A virtual machine for the LC-3 educational computer")]
struct Cli {
    /// Object images to load, in order. Later images overwrite earlier ones.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// How long a keyboard status read waits for a key, in milliseconds
    #[arg(long, default_value = "1000")]
    poll_timeout_ms: u64,

    /// Print a disassembly of each image instead of running
    #[arg(short, long)]
    disassemble: bool,

    /// Print the final machine state as JSON on stderr
    #[arg(long)]
    report: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut cpu = Cpu::new();
    let images = match load_images(&mut cpu, &cli.images) {
        Some(images) => images,
        None => return ExitCode::from(EXIT_LOAD_FAILURE),
    };

    if cli.disassemble {
        for (path, image) in cli.images.iter().zip(&images) {
            println!("; {}", path.display());
            print!("{}", disassemble(image));
        }
        return ExitCode::SUCCESS;
    }

    let result = run_machine(&mut cpu, Duration::from_millis(cli.poll_timeout_ms));

    if cli.report {
        match serde_json::to_string_pretty(&cpu.report()) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => error!("failed to serialize report: {e}"),
        }
    }

    ExitCode::from(exit_status(&result))
}

/// Report how the run ended and pick the process exit status.
fn exit_status(result: &Result<u64, CpuError>) -> u8 {
    match result {
        Ok(steps) => {
            debug!("run complete after {steps} instructions");
            0
        }
        Err(CpuError::Console(ConsoleError::Interrupted)) => {
            eprintln!("Interrupted");
            EXIT_INTERRUPTED
        }
        Err(e) => {
            eprintln!("❌ {e}");
            EXIT_FATAL
        }
    }
}

/// Load every image into `cpu`, reporting each one that fails.
///
/// Returns `None` if any image failed.
fn load_images(cpu: &mut Cpu, paths: &[PathBuf]) -> Option<Vec<Image>> {
    let mut images = Vec::with_capacity(paths.len());
    let mut failed = false;

    for path in paths {
        let loaded = Image::from_file(path)
            .map_err(|e| e.to_string())
            .and_then(|image| cpu.load(&image).map(|()| image).map_err(|e| e.to_string()));

        match loaded {
            Ok(image) => images.push(image),
            Err(e) => {
                eprintln!("❌ Failed to load {}: {}", path.display(), e);
                failed = true;
            }
        }
    }

    (!failed).then_some(images)
}

/// Run on the terminal when stdin is one, otherwise on a pipe console.
///
/// The terminal console is dropped before this returns, so raw mode is
/// always restored before anything else is printed.
fn run_machine(cpu: &mut Cpu, poll_timeout: Duration) -> Result<u64, CpuError> {
    if std::io::stdin().is_terminal() {
        run_on_terminal(cpu, poll_timeout)
    } else {
        run_on_pipe(cpu, poll_timeout)
    }
}

#[cfg(feature = "terminal")]
fn run_on_terminal(cpu: &mut Cpu, poll_timeout: Duration) -> Result<u64, CpuError> {
    let mut console = lc3::TerminalConsole::new(poll_timeout).map_err(ConsoleError::from)?;
    run_to_end(cpu, &mut console)
}

#[cfg(not(feature = "terminal"))]
fn run_on_terminal(cpu: &mut Cpu, poll_timeout: Duration) -> Result<u64, CpuError> {
    run_on_pipe(cpu, poll_timeout)
}

fn run_on_pipe(cpu: &mut Cpu, poll_timeout: Duration) -> Result<u64, CpuError> {
    let mut console = PipeConsole::new(std::io::stdin(), std::io::stdout().lock(), poll_timeout)
        .map_err(ConsoleError::from)?;
    run_to_end(cpu, &mut console)
}

fn run_to_end<C: Console>(cpu: &mut Cpu, console: &mut C) -> Result<u64, CpuError> {
    let result = cpu.run(console);
    // Output written before a fault is still shown.
    if result.is_err() {
        if let Err(e) = console.flush() {
            error!("failed to flush output: {e}");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_images_are_required() {
        let err = Cli::try_parse_from(["lc3-vm"]).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "lc3-vm", "--poll-timeout-ms", "50", "--report", "a.obj", "b.obj",
        ])
        .unwrap();

        assert_eq!(cli.images, vec![PathBuf::from("a.obj"), PathBuf::from("b.obj")]);
        assert_eq!(cli.poll_timeout_ms, 50);
        assert!(cli.report);
        assert!(!cli.disassemble);
    }

    #[test]
    fn test_load_failure_reports_without_running() {
        let mut cpu = Cpu::new();
        let paths = [PathBuf::from("/nonexistent/image.obj")];

        assert!(load_images(&mut cpu, &paths).is_none());
        assert_eq!(cpu.steps, 0);
    }

    fn write_image(dir: &tempfile::TempDir, name: &str, image: &Image) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, image.to_bytes()).unwrap();
        path
    }

    #[test]
    fn test_later_image_overwrites_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_image(&dir, "first.obj", &Image::new(0x3000, vec![1, 2, 3]));
        let second = write_image(&dir, "second.obj", &Image::new(0x3001, vec![9]));

        let mut cpu = Cpu::new();
        let images = load_images(&mut cpu, &[first, second]).unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(cpu.mem.peek(0x3000), 1);
        assert_eq!(cpu.mem.peek(0x3001), 9);
        assert_eq!(cpu.mem.peek(0x3002), 3);
    }

    #[test]
    fn test_one_bad_image_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_image(&dir, "good.obj", &Image::new(0x3000, vec![0xF025]));
        let truncated = dir.path().join("truncated.obj");
        std::fs::write(&truncated, [0x30u8]).unwrap();

        let mut cpu = Cpu::new();

        assert!(load_images(&mut cpu, &[good, truncated]).is_none());
    }

    fn run_file(path: PathBuf) -> Result<u64, CpuError> {
        let mut cpu = Cpu::new();
        load_images(&mut cpu, &[path]).unwrap();
        let mut console = lc3::StreamConsole::new(&b""[..], Vec::new());
        run_to_end(&mut cpu, &mut console)
    }

    #[test]
    fn test_exit_status_for_halt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, "halt.obj", &Image::new(0x3000, vec![0xF025]));

        assert_eq!(exit_status(&run_file(path)), 0);
    }

    #[test]
    fn test_exit_status_for_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        // RES
        let path = write_image(&dir, "res.obj", &Image::new(0x3000, vec![0xD000]));

        assert_eq!(exit_status(&run_file(path)), EXIT_FATAL);
    }

    #[test]
    fn test_exit_status_for_interrupt() {
        let result = Err(CpuError::Console(ConsoleError::Interrupted));
        assert_eq!(exit_status(&result), EXIT_INTERRUPTED);
    }
}
