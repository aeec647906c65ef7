//! Hardware-specific advice derived from the detected profile.

use crate::probe::HardwareProfile;
use serde::{Deserialize, Serialize};

/// A single piece of advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: &'static str,
    pub detail: &'static str,
}

struct Rule {
    applies: fn(&HardwareProfile) -> bool,
    recommendation: Recommendation,
}

const RULES: &[Rule] = &[
    Rule {
        applies: |p| p.is_pi5(),
        recommendation: Recommendation {
            title: "Pi 5 Power",
            detail: "Ensure you have the official 27W USB-C power supply",
        },
    },
    Rule {
        applies: |p| p.is_pi5() && p.has_ai_hat,
        recommendation: Recommendation {
            title: "AI HAT Power",
            detail: "AI HAT increases power requirements - monitor for under-voltage warnings",
        },
    },
    Rule {
        applies: |p| p.has_ai_hat,
        recommendation: Recommendation {
            title: "AI HAT Cooling",
            detail: "Neural processing generates heat - ensure adequate cooling",
        },
    },
    Rule {
        applies: |p| p.has_ai_hat,
        recommendation: Recommendation {
            title: "AI HAT Performance",
            detail: "Monitor I2C communication and GPIO usage",
        },
    },
    Rule {
        applies: |p| p.has_wifi && p.has_ethernet,
        recommendation: Recommendation {
            title: "Dual Network",
            detail: "Consider disabling WiFi if using Ethernet to avoid routing conflicts",
        },
    },
    Rule {
        applies: |p| p.has_cooling,
        recommendation: Recommendation {
            title: "Active Cooling",
            detail: "Monitor fan operation and clean dust regularly",
        },
    },
];

/// Recommendations for `profile`, in a fixed order.
pub fn recommendations(profile: &HardwareProfile) -> Vec<Recommendation> {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(profile))
        .map(|rule| rule.recommendation.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(profile: &HardwareProfile) -> Vec<&'static str> {
        recommendations(profile).iter().map(|r| r.title).collect()
    }

    #[test]
    fn test_bare_board_gets_no_advice() {
        assert!(recommendations(&HardwareProfile::default()).is_empty());
    }

    #[test]
    fn test_pi5_with_accelerator() {
        let profile = HardwareProfile {
            model: "Raspberry Pi 5 Model B Rev 1.0".to_string(),
            has_ai_hat: true,
            ..HardwareProfile::default()
        };
        assert_eq!(
            titles(&profile),
            vec!["Pi 5 Power", "AI HAT Power", "AI HAT Cooling", "AI HAT Performance"]
        );
    }

    #[test]
    fn test_accelerator_power_needs_pi5() {
        let profile = HardwareProfile {
            model: "Raspberry Pi 4 Model B Rev 1.4".to_string(),
            has_ai_hat: true,
            has_wifi: true,
            has_ethernet: true,
            has_cooling: true,
            ..HardwareProfile::default()
        };
        assert_eq!(
            titles(&profile),
            vec!["AI HAT Cooling", "AI HAT Performance", "Dual Network", "Active Cooling"]
        );
    }
}
