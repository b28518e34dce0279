use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use engine::{Runtime, RuntimeError};
use tracing::{error, info, warn};

use super::bootstrap::{AppWiring, KeyBindings};
use super::HostError;

const HOST_FRAME: Duration = Duration::from_millis(16);
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_console(app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "runtime_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_console(app: AppWiring) -> Result<(), HostError> {
    let mut runtime = Runtime::new(app.config, app.registry, app.hooks)?;
    let mut printer = FramePrinter::new(io::stdout());
    runtime.subscribe(move |frame| printer.print(frame));
    let lines = spawn_stdin_reader()?;
    let metrics = runtime.metrics();

    let result = drive(&mut runtime, &lines, app.bindings);
    runtime.shutdown();
    info!(logic_tps = metrics.snapshot().logic_tps, "host_stopped");
    result
}

fn drive(
    runtime: &mut Runtime,
    lines: &Receiver<String>,
    bindings: KeyBindings,
) -> Result<(), HostError> {
    loop {
        loop {
            match lines.try_recv() {
                Ok(line) => feed_line(runtime, bindings, &line)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("stdin_closed");
                    return Ok(());
                }
            }
        }

        runtime.on_tick(true)?;
        if runtime.is_idle() {
            info!(logic_ticks = runtime.logic_ticks(), "all_windows_closed");
            return Ok(());
        }
        thread::sleep(HOST_FRAME);
    }
}

/// Redraws the terminal for each frame. Only the first write failure is logged.
struct FramePrinter<W> {
    out: W,
    failed: bool,
}

impl<W: Write> FramePrinter<W> {
    fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    fn print(&mut self, frame: &str) {
        let written = write!(self.out, "{CLEAR_SCREEN}{frame}").and_then(|()| self.out.flush());
        if let Err(err) = written {
            if !self.failed {
                self.failed = true;
                warn!(error = %err, "frame_write_failed");
            }
        }
    }
}

/// Replays one terminal line as keystrokes. The end of the line submits;
/// bound characters submit or erase in the middle of it.
pub(crate) fn feed_line(
    runtime: &mut Runtime,
    bindings: KeyBindings,
    line: &str,
) -> Result<(), RuntimeError> {
    for ch in line.chars() {
        if Some(ch) == bindings.backspace {
            runtime.remove_last_char();
        } else if Some(ch) == bindings.submit {
            runtime.submit()?;
        } else {
            runtime.add_char(ch);
        }
    }
    runtime.submit()
}

fn spawn_stdin_reader() -> Result<Receiver<String>, HostError> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "stdin_read_failed");
                        break;
                    }
                }
            }
        })
        .map_err(HostError::StdinThread)?;
    Ok(receiver)
}
