//! Latency summary and the printed report.

use std::fmt;
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("no query results collected, nothing to summarize")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsSummary {
    pub count: usize,
    pub total: Duration,
    pub min: Duration,
    /// Element `count / 2` of the sorted durations (upper median for even counts).
    pub median: Duration,
    /// `total / count`, truncated to whole nanoseconds.
    pub average: Duration,
    pub max: Duration,
}

impl StatisticsSummary {
    pub fn from_durations(durations: &[Duration]) -> Result<Self, StatsError> {
        if durations.is_empty() {
            return Err(StatsError::Empty);
        }

        let mut sorted = durations.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let total: Duration = sorted.iter().sum();
        let average_nanos = total.as_nanos() / count as u128;

        Ok(Self {
            count,
            total,
            min: sorted[0],
            median: sorted[count / 2],
            average: Duration::from_nanos(average_nanos as u64),
            max: sorted[count - 1],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkReport {
    pub elapsed: Duration,
    pub summary: StatisticsSummary,
    pub failed: usize,
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "Result of benchmark:")?;
        writeln!(f, "Overall execution time     : {:.2?}", self.elapsed)?;
        writeln!(f, "Number of queries          : {}", s.count)?;
        if self.failed > 0 {
            writeln!(f, "Failed queries             : {}", self.failed)?;
        }
        writeln!(f, "Total query processing time: {:.2?}", s.total)?;
        writeln!(f, "Minimum query time         : {:.2?}", s.min)?;
        writeln!(f, "Median query time          : {:.2?}", s.median)?;
        writeln!(f, "Average query time         : {:.2?}", s.average)?;
        writeln!(f, "Maximum query time         : {:.2?}", s.max)?;
        write!(f, "Application finished.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|&v| Duration::from_millis(v)).collect()
    }

    #[test]
    fn test_four_durations() {
        let summary = StatisticsSummary::from_durations(&ms(&[40, 10, 30, 20])).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min, Duration::from_millis(10));
        assert_eq!(summary.max, Duration::from_millis(40));
        assert_eq!(summary.median, Duration::from_millis(30));
        assert_eq!(summary.average, Duration::from_millis(25));
        assert_eq!(summary.total, Duration::from_millis(100));
    }

    #[test]
    fn test_odd_count_median() {
        let summary = StatisticsSummary::from_durations(&ms(&[5, 1, 3])).unwrap();
        assert_eq!(summary.median, Duration::from_millis(3));
    }

    #[test]
    fn test_single_duration() {
        let summary = StatisticsSummary::from_durations(&ms(&[7])).unwrap();
        assert_eq!(summary.min, summary.max);
        assert_eq!(summary.median, Duration::from_millis(7));
        assert_eq!(summary.average, Duration::from_millis(7));
    }

    #[test]
    fn test_average_truncates() {
        let durations = [Duration::from_nanos(1), Duration::from_nanos(2)];
        let summary = StatisticsSummary::from_durations(&durations).unwrap();
        assert_eq!(summary.average, Duration::from_nanos(1));
    }

    #[test]
    fn test_empty_input_fails() {
        assert_eq!(StatisticsSummary::from_durations(&[]), Err(StatsError::Empty));
    }

    #[test]
    fn test_report_lines() {
        let summary = StatisticsSummary::from_durations(&ms(&[10, 20, 30, 40])).unwrap();
        let report = BenchmarkReport {
            elapsed: Duration::from_millis(55),
            summary,
            failed: 0,
        };
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"Result of benchmark:"));
        assert_eq!(lines.last(), Some(&"Application finished."));
        assert!(text.contains("Number of queries          : 4"));
        assert!(text.contains("Median query time          : 30.00ms"));
        assert!(!text.contains("Failed queries"));

        let with_failures = BenchmarkReport { failed: 2, ..report };
        assert!(with_failures.to_string().contains("Failed queries             : 2"));
    }

    proptest! {
        #[test]
        fn prop_summary_invariants(nanos in prop::collection::vec(0u64..10_000_000_000, 1..200)) {
            let durations: Vec<Duration> = nanos.iter().map(|&n| Duration::from_nanos(n)).collect();
            let summary = StatisticsSummary::from_durations(&durations).unwrap();

            prop_assert!(summary.min <= summary.median);
            prop_assert!(summary.median <= summary.max);

            let count = summary.count as u128;
            let avg = summary.average.as_nanos();
            let total = summary.total.as_nanos();
            prop_assert!(avg * count <= total);
            prop_assert!(total < (avg + 1) * count);

            let again = StatisticsSummary::from_durations(&durations).unwrap();
            prop_assert_eq!(summary, again);
        }
    }
}
