//! One-way violation heuristic over turn-by-turn steps.
//!
//! Keyword and maneuver-type based: there is no ground-truth directionality
//! data behind it, so expect false positives and false negatives on roads
//! whose names happen to mention (or omit) their direction.

use crate::route::{ManeuverModifier, ManeuverType, RouteStep};

/// Road-name fragments that suggest a one-way street, by locale.
const ONE_WAY_KEYWORDS: &[&str] = &["one way", "one-way", "oneway", "satu arah", "searah"];

#[derive(Debug, Clone)]
pub struct OneWayFilter {
    keywords: Vec<String>,
}

impl Default for OneWayFilter {
    fn default() -> Self {
        Self {
            keywords: ONE_WAY_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl OneWayFilter {
    pub fn with_keywords(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// True when any step in the sequence looks like a wrong-way traversal.
    pub fn violates(&self, steps: &[RouteStep]) -> bool {
        steps.iter().any(|step| self.step_flagged(step))
    }

    fn step_flagged(&self, step: &RouteStep) -> bool {
        if step.modifier == Some(ManeuverModifier::UTurn) {
            return true;
        }

        // Sharp turns arrive as Turn plus a sharp modifier, so Turn covers them.
        let turning = matches!(
            step.maneuver,
            ManeuverType::Turn
                | ManeuverType::Merge
                | ManeuverType::OnRamp
                | ManeuverType::OffRamp
                | ManeuverType::Roundabout
        );
        if !turning {
            return false;
        }

        let name = step.road_name.to_lowercase();
        self.keywords.iter().any(|keyword| name.contains(keyword))
    }
}
