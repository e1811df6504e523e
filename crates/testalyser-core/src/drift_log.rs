use std::collections::VecDeque;
use std::fmt::Write;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use testalyser_decode::DriftReport;

#[derive(Debug, Clone)]
pub struct DriftEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub peer: SocketAddr,
    pub report: DriftReport,
}

/// Running statistics over every report pushed, including evicted ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftSummary {
    pub count: usize,
    pub lowest_min_ppm: f64,
    pub highest_max_ppm: f64,
}

pub struct DriftLog {
    entries: VecDeque<DriftEntry>,
    max_entries: usize,
    summary: Option<DriftSummary>,
}

impl DriftLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            summary: None,
        }
    }

    pub fn push(&mut self, peer: SocketAddr, report: DriftReport) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.push_at(timestamp, peer, report);
    }

    pub fn push_at(&mut self, timestamp: u64, peer: SocketAddr, report: DriftReport) {
        self.summary = Some(match self.summary {
            None => DriftSummary {
                count: 1,
                lowest_min_ppm: report.min_ppm,
                highest_max_ppm: report.max_ppm,
            },
            Some(s) => DriftSummary {
                count: s.count + 1,
                lowest_min_ppm: s.lowest_min_ppm.min(report.min_ppm),
                highest_max_ppm: s.highest_max_ppm.max(report.max_ppm),
            },
        });

        self.entries.push_back(DriftEntry {
            timestamp,
            peer,
            report,
        });
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &DriftEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> Option<DriftSummary> {
        self.summary
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.summary = None;
    }

    pub fn to_text(&self, show_timestamp: bool) -> String {
        let mut result = String::new();
        for entry in &self.entries {
            if show_timestamp {
                let secs = entry.timestamp / 1000;
                let millis = entry.timestamp % 1000;
                let hours = (secs / 3600) % 24;
                let minutes = (secs / 60) % 60;
                let seconds = secs % 60;
                let _ = write!(result, "[{hours:02}:{minutes:02}:{seconds:02}.{millis:03}] ");
            }
            let _ = writeln!(
                result,
                "{}: min {:.3} ppm, max {:.3} ppm",
                entry.peer, entry.report.min_ppm, entry.report.max_ppm
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:5000".parse().unwrap()
    }

    fn report(min_ppm: f64, max_ppm: f64) -> DriftReport {
        DriftReport { min_ppm, max_ppm }
    }

    #[test]
    fn evicts_oldest_but_keeps_totals() {
        let mut log = DriftLog::new(2);
        log.push_at(1, peer(), report(-10.0, 5.0));
        log.push_at(2, peer(), report(-3.0, 20.0));
        log.push_at(3, peer(), report(-1.0, 1.0));

        let stamps: Vec<u64> = log.entries().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![2, 3]);
        assert_eq!(
            log.summary(),
            Some(DriftSummary {
                count: 3,
                lowest_min_ppm: -10.0,
                highest_max_ppm: 20.0,
            })
        );
    }

    #[test]
    fn clear_resets_summary() {
        let mut log = DriftLog::new(8);
        log.push(peer(), report(0.0, 0.0));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.summary(), None);
    }

    #[test]
    fn text_rendering() {
        let mut log = DriftLog::new(8);
        // 01:02:03.456 UTC on 1970-01-01
        log.push_at(3_723_456, peer(), report(-1.5, 2.25));
        assert_eq!(
            log.to_text(true),
            "[01:02:03.456] 127.0.0.1:5000: min -1.500 ppm, max 2.250 ppm\n"
        );
        assert_eq!(log.to_text(false), "127.0.0.1:5000: min -1.500 ppm, max 2.250 ppm\n");
    }
}
