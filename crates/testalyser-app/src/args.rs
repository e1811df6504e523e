use std::ffi::OsString;
use std::path::PathBuf;

const HELP: &str = "\
Testalyser - capture driver with a clock drift control channel

Runs a logic capture and listens for 16-byte control frames from the device
under test. Frames report clock interval sample counts or stop the capture.

USAGE:
  testalyser [COMMAND] [OPTIONS]

COMMANDS:
  run                    Start the capture and control listener (default)
  stop                   Send a stop frame to a running listener
  ping                   Send a handshake frame to a running listener

OPTIONS:
  -h, --help             Prints help information
  --config <file>        JSON config file (default: <config dir>/testalyser/config.json)
  --host <addr>          Listener address (default: 127.0.0.1)
  --port <port>          Listener port (default: 65432)
  --device <id>          Capture device serial
  --duration <secs>      Stop the capture after this many seconds
  --poll-ms <ms>         Accept/read poll interval (default: 1000)
  --sample-rate <hz>     Analyzer sample rate (default: 500000000)
  --clock-frequency <hz> Nominal clock under test (default: 3072000)
  -q, --quiet            Only show warnings and errors
  -v, --verbose          Show connection details
  -vv, --trace           Show every frame as hex
  --log <file>           Write log output to file instead of stderr
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
    Stop,
    Ping,
}

/// Verbosity level for log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet = 0,
    /// Status lines: connections, handshakes, drift reports
    #[default]
    Normal = 1,
    /// Partial frames, client details
    Verbose = 2,
    /// Every frame in hex
    Trace = 3,
}

#[derive(Debug)]
pub struct AppArgs {
    pub command: Command,
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub device: Option<String>,
    pub duration_secs: Option<f64>,
    pub poll_ms: Option<u64>,
    pub sample_rate: Option<u64>,
    pub clock_frequency: Option<u64>,
    pub verbosity: Verbosity,
    pub log_file: Option<PathBuf>,
}

pub fn parse_args() -> Result<AppArgs, pico_args::Error> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{}", HELP);
        std::process::exit(0);
    }

    parse(pargs)
}

pub fn parse_from(args: Vec<OsString>) -> Result<AppArgs, pico_args::Error> {
    parse(pico_args::Arguments::from_vec(args))
}

fn parse(mut pargs: pico_args::Arguments) -> Result<AppArgs, pico_args::Error> {
    let command = match pargs.subcommand()?.as_deref() {
        None | Some("run") => Command::Run,
        Some("stop") => Command::Stop,
        Some("ping") => Command::Ping,
        Some(other) => {
            return Err(pico_args::Error::ArgumentParsingFailed {
                cause: format!("unknown command '{other}'"),
            })
        }
    };

    let verbosity = parse_verbosity(&mut pargs);

    let args = AppArgs {
        command,
        config: pargs.opt_value_from_str("--config")?,
        host: pargs.opt_value_from_str("--host")?,
        port: pargs.opt_value_from_str("--port")?,
        device: pargs.opt_value_from_str("--device")?,
        duration_secs: pargs.opt_value_from_str("--duration")?,
        poll_ms: pargs.opt_value_from_str("--poll-ms")?,
        sample_rate: pargs.opt_value_from_str("--sample-rate")?,
        clock_frequency: pargs.opt_value_from_str("--clock-frequency")?,
        verbosity,
        log_file: pargs.opt_value_from_str("--log")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        eprintln!("Warning: unused arguments left: {:?}.", remaining);
    }

    Ok(args)
}

fn parse_verbosity(pargs: &mut pico_args::Arguments) -> Verbosity {
    // Consume every spelling so none is left over as an unused argument.
    let trace = pargs.contains("--trace") | pargs.contains("-vv");
    let verbose = pargs.contains(["-v", "--verbose"]);
    let quiet = pargs.contains(["-q", "--quiet"]);
    if trace {
        Verbosity::Trace
    } else if verbose {
        Verbosity::Verbose
    } else if quiet {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn defaults_to_run() {
        let parsed = parse_from(args(&[])).unwrap();
        assert_eq!(parsed.command, Command::Run);
        assert_eq!(parsed.verbosity, Verbosity::Normal);
        assert!(parsed.port.is_none());
    }

    #[test]
    fn stop_with_overrides() {
        let parsed = parse_from(args(&["stop", "--host", "10.0.0.2", "--port", "7000", "-v"])).unwrap();
        assert_eq!(parsed.command, Command::Stop);
        assert_eq!(parsed.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(parsed.port, Some(7000));
        assert_eq!(parsed.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn run_options() {
        let parsed = parse_from(args(&[
            "run",
            "--device",
            "F4241",
            "--duration",
            "2.5",
            "--sample-rate",
            "250000000",
            "-vv",
        ]))
        .unwrap();
        assert_eq!(parsed.device.as_deref(), Some("F4241"));
        assert_eq!(parsed.duration_secs, Some(2.5));
        assert_eq!(parsed.sample_rate, Some(250_000_000));
        assert_eq!(parsed.verbosity, Verbosity::Trace);
    }

    #[test]
    fn repeated_verbosity_flags_are_all_consumed() {
        let mut pargs = pico_args::Arguments::from_vec(args(&["--trace", "-vv", "-v", "-q"]));
        let parsed = parse_verbosity(&mut pargs);
        assert_eq!(parsed, Verbosity::Trace);
        assert!(pargs.finish().is_empty());
    }

    #[test]
    fn rejects_unknown_command_and_bad_port() {
        assert!(parse_from(args(&["export"])).is_err());
        assert!(parse_from(args(&["--port", "seventy"])).is_err());
    }
}
