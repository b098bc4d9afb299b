//! Replays a byte capture through the emulator without a PTY

use std::io::{self, Read};
use std::process::ExitCode;

use pier_terminal::core::DEFAULT_SCROLLBACK;
use pier_terminal::Terminal;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "\
Usage: pier-headless [OPTIONS] [INPUT_FILE]

Runs captured terminal output through the emulator and prints the screen.
Reads stdin when no input file is given.

Options:
  -c, --cols <N>        Terminal width (default: 80)
  -r, --rows <N>        Terminal height (default: 24)
  -s, --scrollback <N>  Scrollback capacity (default: 10000)
  -f, --file <PATH>     Read input from PATH
  -j, --json            Print a JSON snapshot
  -t, --text            Print the visible text (default)
  -h, --help            Show this message

Examples:
  printf 'hello\\r\\n\\x1b[2J' | pier-headless
  pier-headless -c 120 -r 40 --json capture.bin";

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

struct Options {
    cols: usize,
    rows: usize,
    scrollback: usize,
    input: Option<String>,
    format: OutputFormat,
    help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            scrollback: DEFAULT_SCROLLBACK,
            input: None,
            format: OutputFormat::Text,
            help: false,
        }
    }
}

fn number(flag: &str, value: Option<String>) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("{flag} needs a value"))?;
    value
        .parse()
        .map_err(|_| format!("{flag}: '{value}' is not a number"))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut opts = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--cols" => opts.cols = number(&arg, args.next())?,
            "-r" | "--rows" => opts.rows = number(&arg, args.next())?,
            "-s" | "--scrollback" => opts.scrollback = number(&arg, args.next())?,
            "-f" | "--file" => {
                opts.input = Some(args.next().ok_or("--file needs a path")?);
            },
            "-j" | "--json" => opts.format = OutputFormat::Json,
            "-t" | "--text" => opts.format = OutputFormat::Text,
            "-h" | "--help" => opts.help = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option {flag}")),
            _ if opts.input.is_none() => opts.input = Some(arg.clone()),
            _ => return Err(format!("unexpected argument {arg}")),
        }
    }
    Ok(opts)
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("pier-headless: {msg}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        },
    };
    if opts.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let input_data = match &opts.input {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("pier-headless: {path}: {e}");
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("pier-headless: stdin: {e}");
                return ExitCode::FAILURE;
            }
            data
        },
    };

    let mut terminal = Terminal::new(opts.cols.max(1), opts.rows.max(1), opts.scrollback);
    terminal.process(&input_data);
    tracing::debug!(bytes = input_data.len(), state = ?terminal.parser_state(), "input processed");

    match opts.format {
        OutputFormat::Text => {
            let screen = terminal.screen();
            let cursor = screen.cursor();
            println!(
                "{}x{} cursor={},{} history={}",
                screen.cols(),
                screen.rows(),
                cursor.col,
                cursor.row,
                screen.scrollback().len()
            );
            println!("{}", screen.visible_text());
        },
        OutputFormat::Json => match terminal.snapshot(true).to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("pier-headless: snapshot: {e}");
                return ExitCode::FAILURE;
            },
        },
    }

    ExitCode::SUCCESS
}
