//! Pier PTY Relay
//!
//! Spawns a shell (or a command) through a session, relays stdin to it line
//! by line, and prints the final screen once the child exits. Used for
//! exercising the PTY and session layers without a GUI.

use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pier_terminal::input::InputEvent;
use pier_terminal::session::{SessionEvent, SessionPoller};
use pier_terminal::{Session, TerminalConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = TerminalConfig::load_or_default();
    let mut command: Option<Vec<String>> = None;
    let mut timeout: Option<Duration> = None;
    let mut json = false;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--cols" => {
                i += 1;
                if i < args.len() {
                    config.cols = args[i].parse().unwrap_or(80);
                }
            },
            "-r" | "--rows" => {
                i += 1;
                if i < args.len() {
                    config.rows = args[i].parse().unwrap_or(24);
                }
            },
            "-s" | "--shell" => {
                i += 1;
                if i < args.len() {
                    config.shell = Some(args[i].clone());
                }
            },
            "--config" => {
                i += 1;
                if i < args.len() {
                    match TerminalConfig::load(std::path::Path::new(&args[i])) {
                        Ok(loaded) => config = loaded,
                        Err(e) => {
                            eprintln!("Error loading config '{}': {}", args[i], e);
                            return ExitCode::FAILURE;
                        },
                    }
                }
            },
            "-t" | "--timeout" => {
                i += 1;
                if i < args.len() {
                    timeout = args[i].parse().ok().map(Duration::from_secs_f64);
                }
            },
            "-j" | "--json" => json = true,
            "-h" | "--help" => show_help = true,
            "-e" | "--" => {
                command = Some(args[i + 1..].to_vec());
                break;
            },
            _ => {},
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let spawned = match command.as_deref() {
        Some([program, rest @ ..]) => {
            Session::spawn_command(config.cols, config.rows, program, rest, &config)
        },
        _ => Session::spawn(&config),
    };
    let session = match spawned {
        Ok(session) => session,
        Err(e) => {
            eprintln!("pier-pty-relay: cannot start session: {e}");
            return ExitCode::FAILURE;
        },
    };

    tracing::info!(pid = session.pid(), "session running");

    let (poller, events) = SessionPoller::start(session, config.poll_interval());
    let poller = Arc::new(poller);

    // The stdin thread is not joined: it may stay blocked on a read after the child exits
    {
        let poller = Arc::clone(&poller);
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let event = InputEvent::Paste(format!("{line}\n"));
                if let Err(e) = poller.with_session(|s| s.handle_input(&event)) {
                    tracing::warn!(error = %e, "stopped relaying stdin");
                    break;
                }
            }
        });
    }

    let deadline = timeout.map(|t| Instant::now() + t);
    let mut exit_code = None;
    loop {
        let wait = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::info!("timeout reached, destroying session");
                    poller.with_session(|s| s.destroy());
                    break;
                }
                remaining
            },
            None => Duration::from_secs(3600),
        };
        match events.recv_timeout(wait) {
            Ok(SessionEvent::Output(n)) => tracing::trace!(bytes = n, "output"),
            Ok(SessionEvent::Exited(status)) => {
                exit_code = status.map(|s| s.code());
                break;
            },
            Ok(SessionEvent::Failed(e)) => {
                eprintln!("Session failed: {}", e);
                break;
            },
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {},
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    let snapshot = poller.with_session(|s| s.snapshot(true));
    if json {
        match snapshot.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            },
        }
    } else {
        for line in &snapshot.lines {
            println!("{}", line);
        }
    }

    match exit_code {
        Some(0) | None => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(code.clamp(1, 255) as u8),
    }
}

fn print_help() {
    println!("Pier PTY Relay");
    println!();
    println!("Usage: pier-pty-relay [OPTIONS] [-e COMMAND [ARGS...]]");
    println!();
    println!("Options:");
    println!("  -c, --cols <N>       Set terminal width (default: 80)");
    println!("  -r, --rows <N>       Set terminal height (default: 24)");
    println!("  -s, --shell <PATH>   Shell to run (default: $SHELL)");
    println!("      --config <PATH>  Load settings from a TOML file");
    println!("  -t, --timeout <SECS> Destroy the session after this long");
    println!("  -j, --json           Print the final snapshot as JSON");
    println!("  -h, --help           Show this help message");
    println!();
    println!("Lines read from stdin are sent to the child as input.");
}
