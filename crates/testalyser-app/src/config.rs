use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use testalyser_core::ServerConfig;
use testalyser_decode::{ClockFrequency, DriftCalculator, SampleRate};

use crate::args::AppArgs;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub timing: TimingSection,
    pub capture: CaptureSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub sample_rate: SampleRate,
    pub clock_frequency: ClockFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    pub device: Option<String>,
    /// `None` runs until the device sends a stop frame.
    pub duration_secs: Option<f64>,
    pub max_drift_entries: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            device: None,
            duration_secs: None,
            max_drift_entries: 10_000,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("testalyser").join("config.json"))
    }

    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn apply(&mut self, args: &AppArgs) {
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ms) = args.poll_ms {
            self.server.poll_interval_ms = ms;
        }
        if let Some(device) = &args.device {
            self.capture.device = Some(device.clone());
        }
        if let Some(secs) = args.duration_secs {
            self.capture.duration_secs = Some(secs);
        }
        if let Some(rate) = args.sample_rate {
            self.timing.sample_rate = SampleRate(rate);
        }
        if let Some(freq) = args.clock_frequency {
            self.timing.clock_frequency = ClockFrequency(freq);
        }
    }

    pub fn validate(&self) -> Result<()> {
        DriftCalculator::new(self.timing.sample_rate, self.timing.clock_frequency)
            .context("invalid timing configuration")?;
        if self.server.poll_interval_ms == 0 {
            bail!("poll interval must be at least 1 ms");
        }
        self.capture_duration()?;
        Ok(())
    }

    pub fn capture_duration(&self) -> Result<Option<Duration>> {
        self.capture
            .duration_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .with_context(|| format!("invalid capture duration {secs}"))
            })
            .transpose()
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            poll_interval: Duration::from_millis(self.server.poll_interval_ms),
            sample_rate: self.timing.sample_rate,
            clock_frequency: self.timing.clock_frequency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::parse_from;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "server": {{ "port": 7000 }}, "timing": {{ "clock_frequency": 2822400 }} }}"#
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.server.port, 7000);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.timing.clock_frequency, ClockFrequency(2_822_400));
        assert_eq!(cfg.timing.sample_rate, SampleRate(500_000_000));
        assert_eq!(cfg.capture.duration_secs, None);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn cli_overrides_file() {
        let mut cfg = AppConfig::default();
        let args = parse_from(
            ["--port", "9000", "--poll-ms", "50", "--duration", "3"]
                .iter()
                .map(Into::into)
                .collect(),
        )
        .unwrap();
        cfg.apply(&args);

        let server = cfg.server_config();
        assert_eq!(server.port, 9000);
        assert_eq!(server.poll_interval, Duration::from_millis(50));
        assert_eq!(cfg.capture_duration().unwrap(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn zero_rates_and_negative_duration_are_rejected() {
        let mut cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.timing.clock_frequency = ClockFrequency(0);
        assert!(cfg.validate().is_err());

        cfg.timing.clock_frequency = ClockFrequency::default();
        cfg.capture.duration_secs = Some(-1.0);
        assert!(cfg.validate().is_err());
    }
}
