//! Rule × fixture cross-referencing.
//!
//! Finds, for every rule, each fixture with exactly the rule's teams and
//! an outcome carrying the category's target label at the rule's
//! probability. Output is in discovery order (rule order, then fixture
//! order); ranking happens later.

use rust_decimal::Decimal;
use tracing::debug;

use crate::types::{BetCandidate, FixtureMatch, Outcome, StatRule};

// ---------------------------------------------------------------------------
// Probability matching
// ---------------------------------------------------------------------------

/// How a fixture's implied probability is compared with a rule's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbabilityMatch {
    /// `None` = exact decimal equality.
    tolerance: Option<Decimal>,
}

impl ProbabilityMatch {
    pub fn exact() -> Self {
        Self { tolerance: None }
    }

    /// Match when `|implied - target| < tolerance`.
    pub fn within(tolerance: Decimal) -> Self {
        Self {
            tolerance: Some(tolerance.abs()),
        }
    }

    pub fn from_tolerance(tolerance: Option<Decimal>) -> Self {
        tolerance.map_or_else(Self::exact, Self::within)
    }

    pub fn matches(&self, implied: Decimal, target: Decimal) -> bool {
        match self.tolerance {
            None => implied == target,
            Some(tol) => (implied - target).abs() < tol,
        }
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RuleMatcher {
    probability: ProbabilityMatch,
}

impl RuleMatcher {
    pub fn new(probability: ProbabilityMatch) -> Self {
        Self { probability }
    }

    /// All candidates for a snapshot, unranked, at most one per
    /// (rule, fixture) pair.
    pub fn find_candidates(&self, fixtures: &[FixtureMatch], rules: &[StatRule]) -> Vec<BetCandidate> {
        let mut candidates = Vec::new();

        for rule in rules {
            let Some(label) = rule.category.target_label(rule.pick) else {
                debug!(
                    category = %rule.category,
                    teams = %rule.teams,
                    "Rule has no target label (missing pick), skipping"
                );
                continue;
            };

            for fixture in fixtures.iter().filter(|f| f.is_fixture_for(&rule.teams)) {
                match self.matching_outcome(fixture, label, rule.target_probability) {
                    Some(outcome) => {
                        debug!(
                            category = %rule.category,
                            teams = %rule.teams,
                            price = %outcome.price,
                            probability = %rule.target_probability,
                            "Candidate found"
                        );
                        candidates.push(BetCandidate {
                            category: rule.category,
                            teams: rule.teams.clone(),
                            price: outcome.price,
                            target_probability: rule.target_probability,
                            confidence: rule.confidence,
                            group_id: fixture.group_id.clone(),
                            pick: rule.pick,
                        });
                    }
                    None => debug!(
                        category = %rule.category,
                        teams = %rule.teams,
                        label,
                        probability = %rule.target_probability,
                        "Fixture found but no outcome at target probability"
                    ),
                }
            }
        }

        candidates
    }

    /// First outcome in market order with the target label and probability.
    fn matching_outcome<'a>(
        &self,
        fixture: &'a FixtureMatch,
        label: &str,
        target: Decimal,
    ) -> Option<&'a Outcome> {
        fixture
            .outcomes()
            .find(|o| o.label == label && self.probability.matches(o.implied_probability, target))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
