//! Temperature thresholds and the visual status classes they map to.

use serde::{Deserialize, Serialize};

/// Visual status of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusClass {
    Nominal,
    Warning,
    Error,
}

impl StatusClass {
    /// CSS class used by the HTML report.
    pub fn css_class(self) -> &'static str {
        match self {
            StatusClass::Nominal => "success",
            StatusClass::Warning => "warning",
            StatusClass::Error => "error",
        }
    }
}

/// How a reading is compared against the limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    /// Compare the reading as measured (70.5 is above 70)
    Exact,
    /// Compare only the whole-degree part (70.9 counts as 70)
    WholeDegrees,
}

/// Temperature limits in degrees Celsius. Both limits are exclusive: a
/// reading equal to a limit stays in the lower class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning_above: f64,
    pub error_above: f64,
    pub boundary: Boundary,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning_above: 70.0,
            error_above: 80.0,
            boundary: Boundary::Exact,
        }
    }
}

impl Thresholds {
    /// Set the boundary mode.
    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Classify a temperature.
    pub fn classify(&self, celsius: f64) -> StatusClass {
        let reading = match self.boundary {
            Boundary::Exact => celsius,
            Boundary::WholeDegrees => celsius.trunc(),
        };
        if reading > self.error_above {
            StatusClass::Error
        } else if reading > self.warning_above {
            StatusClass::Warning
        } else {
            StatusClass::Nominal
        }
    }

    /// Classify a formatted reading such as `48.3'C`; unreadable text is
    /// nominal.
    pub fn classify_text(&self, reading: &str) -> StatusClass {
        parse_celsius(reading)
            .map(|celsius| self.classify(celsius))
            .unwrap_or(StatusClass::Nominal)
    }
}

/// Numeric part of `48.3'C`, `48.3°C` or `temp=48.3'C`.
pub fn parse_celsius(reading: &str) -> Option<f64> {
    let reading = reading.split_once('=').map_or(reading, |(_, value)| value);
    let number: String = reading
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_celsius() {
        assert_eq!(parse_celsius("48.3'C"), Some(48.3));
        assert_eq!(parse_celsius("temp=71.0'C"), Some(71.0));
        assert_eq!(parse_celsius("65.2°C"), Some(65.2));
        assert_eq!(parse_celsius("N/A"), None);
    }

    #[test]
    fn test_limits_are_exclusive() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.classify(70.0), StatusClass::Nominal);
        assert_eq!(thresholds.classify(70.1), StatusClass::Warning);
        assert_eq!(thresholds.classify(80.0), StatusClass::Warning);
        assert_eq!(thresholds.classify(80.1), StatusClass::Error);
    }

    #[test]
    fn test_whole_degrees_truncates() {
        let thresholds = Thresholds::default().with_boundary(Boundary::WholeDegrees);
        assert_eq!(thresholds.classify(70.9), StatusClass::Nominal);
        assert_eq!(thresholds.classify(71.0), StatusClass::Warning);
        assert_eq!(thresholds.classify(80.9), StatusClass::Warning);
        assert_eq!(thresholds.classify(81.0), StatusClass::Error);
    }

    #[test]
    fn test_classification_is_monotonic() {
        for boundary in [Boundary::Exact, Boundary::WholeDegrees] {
            let thresholds = Thresholds::default().with_boundary(boundary);
            let mut previous = StatusClass::Nominal;
            for tenth in -200..1200 {
                let class = thresholds.classify(tenth as f64 / 10.0);
                assert!(class >= previous, "{boundary:?} regressed at {tenth}");
                previous = class;
            }
        }
    }

    #[test]
    fn test_unreadable_text_is_nominal() {
        assert_eq!(Thresholds::default().classify_text("N/A"), StatusClass::Nominal);
        assert_eq!(Thresholds::default().classify_text("85.0'C"), StatusClass::Error);
    }
}
