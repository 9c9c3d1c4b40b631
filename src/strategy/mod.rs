//! Strategy engine: rule matching, ranking, the selection gate and the
//! loss-streak guard.

pub mod matcher;
pub mod policy;
pub mod risk;

use tracing::{debug, info};

use crate::types::{BetCandidate, FixtureMatch, StatRule};
use matcher::RuleMatcher;
use policy::{SelectionOutcome, SelectionPolicy};

// ---------------------------------------------------------------------------
// Selection result
// ---------------------------------------------------------------------------

/// Everything one selection pass produced.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Bets to place, best-first. Empty, one, or two.
    pub bets: Vec<BetCandidate>,
    pub outcome: SelectionOutcome,
    /// Candidates found before the gate, for the log.
    pub candidates_found: usize,
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Pipelines rule matching → confidence ranking → selection gate.
pub struct CandidateSelector {
    matcher: RuleMatcher,
    policy: SelectionPolicy,
}

impl CandidateSelector {
    pub fn new(matcher: RuleMatcher, policy: SelectionPolicy) -> Self {
        Self { matcher, policy }
    }

    /// Run one selection pass over a fixture snapshot and the rule table.
    ///
    /// Candidates are ranked by confidence, highest first. The sort is
    /// stable, so equal confidences keep discovery order.
    pub fn select(&self, fixtures: &[FixtureMatch], rules: &[StatRule]) -> Selection {
        let mut candidates = self.matcher.find_candidates(fixtures, rules);
        let candidates_found = candidates.len();
        info!(
            fixtures = fixtures.len(),
            rules = rules.len(),
            candidates = candidates_found,
            "Rule matching complete"
        );

        candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        for (rank, c) in candidates.iter().enumerate() {
            debug!(rank = rank + 1, candidate = %c, "Ranked candidate");
        }

        let (bets, outcome) = self.policy.apply(candidates);
        info!(selected = bets.len(), outcome = %outcome, "Selection complete");

        Selection {
            bets,
            outcome,
            candidates_found,
        }
    }
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self::new(RuleMatcher::default(), SelectionPolicy::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BetCategory, FixtureMarket, Outcome, TeamsKey};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    // ---- helpers -----------------------------------------------------------

    fn make_fixture(home: &str, away: &str, label: &str, price: Decimal, prob: Decimal) -> FixtureMatch {
        FixtureMatch {
            group_id: "1021".to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            markets: vec![FixtureMarket {
                outcomes: vec![Outcome {
                    label: label.to_string(),
                    price,
                    implied_probability: prob,
                }],
            }],
        }
    }

    fn make_rule(teams: &str, prob: Decimal, confidence: Decimal) -> StatRule {
        StatRule {
            category: BetCategory::Over15,
            teams: teams.parse::<TeamsKey>().unwrap(),
            target_probability: prob,
            confidence,
            pick: None,
        }
    }

    // ---- tests -------------------------------------------------------------

    #[test]
    fn test_nothing_matches() {
        let selection = CandidateSelector::default().select(&[], &[make_rule("A vs B", dec!(0.7), dec!(80))]);
        assert!(selection.bets.is_empty());
        assert_eq!(selection.outcome, SelectionOutcome::NoCandidates);
        assert_eq!(selection.candidates_found, 0);
    }

    #[test]
    fn test_ranked_by_confidence_descending() {
        let fixtures = vec![
            make_fixture("A", "B", "over 1.5", dec!(1.30), dec!(0.70)),
            make_fixture("C", "D", "over 1.5", dec!(1.40), dec!(0.71)),
            make_fixture("E", "F", "over 1.5", dec!(1.50), dec!(0.72)),
        ];
        let rules = vec![
            make_rule("A vs B", dec!(0.70), dec!(60)),
            make_rule("C vs D", dec!(0.71), dec!(90)),
            make_rule("E vs F", dec!(0.72), dec!(75)),
        ];

        let selection = CandidateSelector::default().select(&fixtures, &rules);
        assert_eq!(selection.candidates_found, 3);
        assert_eq!(selection.bets.len(), 2);
        assert_eq!(selection.bets[0].teams.to_string(), "C vs D");
        assert_eq!(selection.bets[1].teams.to_string(), "E vs F");
        assert_eq!(
            selection.outcome,
            SelectionOutcome::Pair {
                combined_price: dec!(2.1000)
            }
        );
    }

    #[test]
    fn test_equal_confidence_keeps_discovery_order() {
        let fixtures = vec![
            make_fixture("A", "B", "over 1.5", dec!(1.30), dec!(0.70)),
            make_fixture("C", "D", "over 1.5", dec!(1.40), dec!(0.70)),
            make_fixture("E", "F", "over 1.5", dec!(1.50), dec!(0.70)),
        ];
        let rules = vec![
            make_rule("E vs F", dec!(0.70), dec!(80)),
            make_rule("A vs B", dec!(0.70), dec!(80)),
            make_rule("C vs D", dec!(0.70), dec!(80)),
        ];

        let selection = CandidateSelector::default().select(&fixtures, &rules);
        assert_eq!(selection.bets[0].teams.to_string(), "E vs F");
        assert_eq!(selection.bets[1].teams.to_string(), "A vs B");
    }

    #[test]
    fn test_low_single_rejected() {
        let fixtures = vec![make_fixture("A", "B", "over 1.5", dec!(1.10), dec!(0.70))];
        let rules = vec![make_rule("A vs B", dec!(0.70), dec!(80))];

        let selection = CandidateSelector::default().select(&fixtures, &rules);
        assert!(selection.bets.is_empty());
        assert_eq!(selection.candidates_found, 1);
        assert!(selection.outcome.is_rejected());
    }
}
