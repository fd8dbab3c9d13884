//! Core decision types: sources, loads, score breakdowns, and decision records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::allocation::Allocation;
use super::error::DecisionError;

/// A power source that can supply a household load.
///
/// Declaration order is the tie-break order used when two available
/// sources score equally: solar > battery > grid > generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCandidate {
    Solar,
    Battery,
    Grid,
    Generator,
}

impl SourceCandidate {
    /// All candidates in tie-break order.
    pub const ALL: [SourceCandidate; 4] = [Self::Solar, Self::Battery, Self::Grid, Self::Generator];

    /// Lowercase identifier used in logs, CSV, and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solar => "solar",
            Self::Battery => "battery",
            Self::Grid => "grid",
            Self::Generator => "generator",
        }
    }

    /// Position in [`SourceCandidate::ALL`].
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Solar => 0,
            Self::Battery => 1,
            Self::Grid => 2,
            Self::Generator => 3,
        }
    }
}

impl fmt::Display for SourceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown energy source `{0}`")]
pub struct UnknownSource(pub String);

impl FromStr for SourceCandidate {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solar" => Ok(Self::Solar),
            "battery" => Ok(Self::Battery),
            "grid" => Ok(Self::Grid),
            "generator" => Ok(Self::Generator),
            _ => Err(UnknownSource(s.to_string())),
        }
    }
}

/// Load priority band. Ordered by level, so `High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPriority {
    Low = 25,
    Medium = 50,
    High = 75,
    Critical = 100,
}

impl LoadPriority {
    /// Numeric level (25, 50, 75, or 100).
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LoadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        write!(f, "{name}({})", self.level())
    }
}

/// One controllable household load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadDescriptor {
    /// Load identifier (e.g., `"HVAC"`).
    pub name: String,
    /// Priority band.
    pub priority: LoadPriority,
    /// Rated power draw (W).
    pub rated_power_w: f64,
    /// Whether the load may be postponed.
    pub can_defer: bool,
}

impl LoadDescriptor {
    pub fn new(name: impl Into<String>, priority: LoadPriority, rated_power_w: f64, can_defer: bool) -> Self {
        Self {
            name: name.into(),
            priority,
            rated_power_w,
            can_defer,
        }
    }

    /// Rated power in kW, with non-finite or negative ratings read as zero.
    pub fn rated_power_kw(&self) -> f64 {
        if self.rated_power_w.is_finite() && self.rated_power_w > 0.0 {
            self.rated_power_w / 1000.0
        } else {
            0.0
        }
    }
}

/// Score entry for a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceScore {
    pub source: SourceCandidate,
    /// Accumulated score (base weight plus adjustments).
    pub score: i32,
    /// Whether the source may be recommended.
    pub available: bool,
    /// Number of positive adjustments applied to this source.
    pub bonuses: u8,
}

/// Per-source scores and the reasoning accumulated while computing them.
///
/// Produced once by the scorer and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    scores: [SourceScore; 4],
    reasoning: Vec<String>,
}

impl ScoreBreakdown {
    /// Starts a breakdown from base weights in [`SourceCandidate::ALL`] order.
    pub(crate) fn from_base(base: [i32; 4]) -> Self {
        let scores = SourceCandidate::ALL.map(|source| SourceScore {
            source,
            score: base[source.index()],
            available: true,
            bonuses: 0,
        });
        Self {
            scores,
            reasoning: Vec::new(),
        }
    }

    /// Applies a signed adjustment and records why.
    pub(crate) fn adjust(&mut self, source: SourceCandidate, delta: i32, reason: &str) {
        let entry = &mut self.scores[source.index()];
        entry.score = entry.score.saturating_add(delta);
        if delta > 0 {
            entry.bonuses = entry.bonuses.saturating_add(1);
        }
        self.reasoning.push(reason.to_string());
    }

    pub(crate) fn set_available(&mut self, source: SourceCandidate, available: bool) {
        self.scores[source.index()].available = available;
    }

    /// Score of `source`.
    pub fn score(&self, source: SourceCandidate) -> i32 {
        self.scores[source.index()].score
    }

    /// Full entry for `source`.
    pub fn entry(&self, source: SourceCandidate) -> &SourceScore {
        &self.scores[source.index()]
    }

    /// Whether `source` passed availability gating.
    pub fn is_available(&self, source: SourceCandidate) -> bool {
        self.scores[source.index()].available
    }

    /// Entries in tie-break order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceScore> {
        self.scores.iter()
    }

    /// Reasoning strings in the order adjustments were applied.
    pub fn reasoning(&self) -> &[String] {
        &self.reasoning
    }

    /// Highest-scoring available source; ties resolve in tie-break order.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::AllSourcesUnavailable`] when no source passed
    /// availability gating.
    pub fn recommended(&self) -> Result<SourceCandidate, DecisionError> {
        let mut best: Option<&SourceScore> = None;
        for entry in self.scores.iter().filter(|e| e.available) {
            match best {
                Some(b) if entry.score <= b.score => {}
                _ => best = Some(entry),
            }
        }
        best.map(|e| e.source)
            .ok_or(DecisionError::AllSourcesUnavailable)
    }

    /// Heuristic display confidence for recommending `source`.
    ///
    /// `0.5 + 0.2 * bonuses / 3`, clamped to `[0, 0.95]`. Not a probability.
    pub fn confidence(&self, source: SourceCandidate) -> f64 {
        let bonuses = f64::from(self.entry(source).bonuses);
        (0.5 + 0.2 * (bonuses / 3.0)).clamp(0.0, 0.95)
    }
}

/// Outcome of comparing the recommended source with the active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchAdvice {
    pub should_switch: bool,
    /// Active source as supplied by the caller (may be unrecognized).
    pub current_source: String,
    pub recommended_source: SourceCandidate,
    pub reasoning: String,
    /// `score(recommended) - score(current)`; zero when they match.
    pub score_improvement: i32,
}

/// Which shedding threshold fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeferralTrigger {
    Carbon,
    Price,
}

/// Shedding verdict for one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferralAdvice {
    pub defer: bool,
    pub reason: String,
    pub trigger: Option<DeferralTrigger>,
    /// Estimated emissions avoided by deferring (g CO2eq per hour of runtime).
    pub carbon_savings_g: f64,
    /// Estimated cost avoided by deferring (currency per hour of runtime).
    pub cost_savings: f64,
}

/// A complete recommendation for one load at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub load: String,
    pub recommended_source: SourceCandidate,
    pub reasoning: Vec<String>,
    /// Display heuristic in `[0, 0.95]`.
    pub confidence: f64,
    pub scores: ScoreBreakdown,
    pub switch: SwitchAdvice,
    pub deferral: DeferralAdvice,
    pub allocation: Allocation,
    /// Observation time of the context the decision was made from.
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    /// Reasoning joined for display.
    pub fn reasoning_text(&self) -> String {
        self.reasoning.join(" ")
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:<16} -> {:<9} conf={:.2} | solar={:>4} battery={:>4} grid={:>4} gen={:>4} \
             | switch={} (+{}) defer={}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.load,
            self.recommended_source,
            self.confidence,
            self.scores.score(SourceCandidate::Solar),
            self.scores.score(SourceCandidate::Battery),
            self.scores.score(SourceCandidate::Grid),
            self.scores.score(SourceCandidate::Generator),
            self.switch.should_switch,
            self.switch.score_improvement,
            self.deferral.defer,
        )
    }
}

/// Who initiated a source switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggeredBy {
    Ai,
    User,
    Schedule,
    Fallback,
}

impl TriggeredBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::User => "user",
            Self::Schedule => "schedule",
            Self::Fallback => "fallback",
        }
    }
}

/// Append-only audit entry describing an executed switch.
///
/// Built by callers after acting on a [`SwitchAdvice`]; storing it is up to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchEvent {
    pub load: String,
    pub from_source: String,
    pub to_source: SourceCandidate,
    pub reason: String,
    pub triggered_by: TriggeredBy,
    pub timestamp: DateTime<Utc>,
}

impl SwitchEvent {
    /// Builds an event when `advice` recommends switching, `None` otherwise.
    pub fn from_advice(
        load: &str,
        advice: &SwitchAdvice,
        triggered_by: TriggeredBy,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        if !advice.should_switch {
            return None;
        }
        Some(Self {
            load: load.to_string(),
            from_source: advice.current_source.clone(),
            to_source: advice.recommended_source,
            reason: advice.reasoning.clone(),
            triggered_by,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_names_case_insensitively() {
        assert_eq!("Solar".parse::<SourceCandidate>(), Ok(SourceCandidate::Solar));
        assert_eq!(" grid ".parse::<SourceCandidate>(), Ok(SourceCandidate::Grid));
        assert!("wind".parse::<SourceCandidate>().is_err());
    }

    #[test]
    fn priority_levels_and_ordering() {
        assert_eq!(LoadPriority::Critical.level(), 100);
        assert_eq!(LoadPriority::High.level(), 75);
        assert_eq!(LoadPriority::Medium.level(), 50);
        assert_eq!(LoadPriority::Low.level(), 25);
        assert!(LoadPriority::Critical > LoadPriority::High);
        assert!(LoadPriority::Medium < LoadPriority::High);
    }

    #[test]
    fn recommended_breaks_ties_by_fixed_order() {
        let breakdown = ScoreBreakdown::from_base([80, 80, 80, 80]);
        assert_eq!(breakdown.recommended(), Ok(SourceCandidate::Solar));

        let mut breakdown = ScoreBreakdown::from_base([70, 90, 90, 10]);
        assert_eq!(breakdown.recommended(), Ok(SourceCandidate::Battery));
        breakdown.set_available(SourceCandidate::Battery, false);
        assert_eq!(breakdown.recommended(), Ok(SourceCandidate::Grid));
    }

    #[test]
    fn recommended_errors_when_nothing_available() {
        let mut breakdown = ScoreBreakdown::from_base([100, 75, 50, 25]);
        for source in SourceCandidate::ALL {
            breakdown.set_available(source, false);
        }
        assert_eq!(
            breakdown.recommended(),
            Err(DecisionError::AllSourcesUnavailable)
        );
    }

    #[test]
    fn confidence_counts_only_bonuses() {
        let mut breakdown = ScoreBreakdown::from_base([100, 75, 50, 25]);
        breakdown.adjust(SourceCandidate::Grid, -30, "penalty");
        assert_eq!(breakdown.confidence(SourceCandidate::Grid), 0.5);

        breakdown.adjust(SourceCandidate::Solar, 20, "a");
        breakdown.adjust(SourceCandidate::Solar, 15, "b");
        let expected = 0.5 + 0.2 * (2.0 / 3.0);
        assert!((breakdown.confidence(SourceCandidate::Solar) - expected).abs() < 1e-12);
    }

    #[test]
    fn confidence_is_clamped() {
        let mut breakdown = ScoreBreakdown::from_base([100, 75, 50, 25]);
        for _ in 0..20 {
            breakdown.adjust(SourceCandidate::Solar, 1, "bonus");
        }
        assert_eq!(breakdown.confidence(SourceCandidate::Solar), 0.95);
    }

    #[test]
    fn switch_event_only_for_switches() {
        let mut advice = SwitchAdvice {
            should_switch: false,
            current_source: "grid".to_string(),
            recommended_source: SourceCandidate::Solar,
            reasoning: "stay".to_string(),
            score_improvement: 5,
        };
        let now = Utc::now();
        assert!(SwitchEvent::from_advice("HVAC", &advice, TriggeredBy::Ai, now).is_none());

        advice.should_switch = true;
        let event = SwitchEvent::from_advice("HVAC", &advice, TriggeredBy::Ai, now);
        let event = event.as_ref();
        assert_eq!(event.map(|e| e.to_source), Some(SourceCandidate::Solar));
        assert_eq!(event.map(|e| e.from_source.as_str()), Some("grid"));
    }
}
