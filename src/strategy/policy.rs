//! Selection gate.
//!
//! Two-tier risk gate over confidence-ranked candidates: a lone
//! candidate needs its own price floor, a pair needs a combined floor.
//! Failing the gate yields no bets for the cycle; a pair that fails is
//! never reduced to a single.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use tracing::{info, warn};

use crate::types::BetCandidate;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Minimum price for a single candidate.
    pub single_min_price: Decimal,
    /// Minimum product of the top two prices.
    pub pair_min_combined_price: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            single_min_price: dec!(1.29),
            pair_min_combined_price: dec!(1.50),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What the gate decided for a cycle. Rejections are normal outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    NoCandidates,
    Single { price: Decimal },
    Pair { combined_price: Decimal },
    SingleRejected { price: Decimal, floor: Decimal },
    PairRejected { combined_price: Decimal, floor: Decimal },
    /// The product of the two prices does not fit in a `Decimal`.
    PairOverflow { floor: Decimal },
}

impl SelectionOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            SelectionOutcome::SingleRejected { .. }
                | SelectionOutcome::PairRejected { .. }
                | SelectionOutcome::PairOverflow { .. }
        )
    }
}

impl fmt::Display for SelectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionOutcome::NoCandidates => write!(f, "no candidates"),
            SelectionOutcome::Single { price } => write!(f, "single @ {price}"),
            SelectionOutcome::Pair { combined_price } => write!(f, "pair @ {combined_price}"),
            SelectionOutcome::SingleRejected { price, floor } => {
                write!(f, "single rejected: {price} < {floor}")
            }
            SelectionOutcome::PairRejected {
                combined_price,
                floor,
            } => write!(f, "pair rejected: {combined_price} < {floor}"),
            SelectionOutcome::PairOverflow { floor } => {
                write!(f, "pair rejected: combined price out of range (floor {floor})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
    config: PolicyConfig,
}

impl SelectionPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Apply the gate to candidates already ranked best-first.
    pub fn apply(&self, mut ranked: Vec<BetCandidate>) -> (Vec<BetCandidate>, SelectionOutcome) {
        match ranked.len() {
            0 => (Vec::new(), SelectionOutcome::NoCandidates),
            1 => {
                let price = ranked[0].price;
                let floor = self.config.single_min_price;
                if price >= floor {
                    info!(bet = %ranked[0], "Single bet accepted");
                    (ranked, SelectionOutcome::Single { price })
                } else {
                    warn!(bet = %ranked[0], %floor, "Single bet found but price below floor");
                    (Vec::new(), SelectionOutcome::SingleRejected { price, floor })
                }
            }
            _ => {
                ranked.truncate(2);
                let floor = self.config.pair_min_combined_price;
                let Some(combined_price) = ranked[0].price.checked_mul(ranked[1].price) else {
                    warn!(
                        first = %ranked[0],
                        second = %ranked[1],
                        "Combined price overflows, pair rejected"
                    );
                    return (Vec::new(), SelectionOutcome::PairOverflow { floor });
                };
                if combined_price >= floor {
                    info!(
                        first = %ranked[0],
                        second = %ranked[1],
                        combined = %combined_price,
                        "Bet pair accepted"
                    );
                    (ranked, SelectionOutcome::Pair { combined_price })
                } else {
                    warn!(
                        combined = %combined_price,
                        %floor,
                        "Two bets found but combined price below floor"
                    );
                    (
                        Vec::new(),
                        SelectionOutcome::PairRejected {
                            combined_price,
                            floor,
                        },
                    )
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BetCategory, TeamsKey};

    fn make_candidate(teams: &str, price: Decimal, confidence: Decimal) -> BetCandidate {
        BetCandidate {
            category: BetCategory::Over15,
            teams: teams.parse::<TeamsKey>().unwrap(),
            price,
            target_probability: dec!(0.75),
            confidence,
            group_id: "1021".to_string(),
            pick: None,
        }
    }

    #[test]
    fn test_no_candidates() {
        let (bets, outcome) = SelectionPolicy::default().apply(Vec::new());
        assert!(bets.is_empty());
        assert_eq!(outcome, SelectionOutcome::NoCandidates);
        assert!(!outcome.is_rejected());
    }

    #[test]
    fn test_single_at_floor_accepted() {
        let (bets, outcome) =
            SelectionPolicy::default().apply(vec![make_candidate("A vs B", dec!(1.29), dec!(80))]);
        assert_eq!(bets.len(), 1);
        assert_eq!(outcome, SelectionOutcome::Single { price: dec!(1.29) });
    }

    #[test]
    fn test_single_below_floor_rejected() {
        let (bets, outcome) =
            SelectionPolicy::default().apply(vec![make_candidate("A vs B", dec!(1.28999), dec!(80))]);
        assert!(bets.is_empty());
        assert!(outcome.is_rejected());
        assert_eq!(
            outcome,
            SelectionOutcome::SingleRejected {
                price: dec!(1.28999),
                floor: dec!(1.29)
            }
        );
    }

    #[test]
    fn test_pair_at_combined_floor_accepted() {
        let (bets, outcome) = SelectionPolicy::default().apply(vec![
            make_candidate("A vs B", dec!(1.2), dec!(90)),
            make_candidate("C vs D", dec!(1.25), dec!(80)),
        ]);
        assert_eq!(bets.len(), 2);
        assert_eq!(
            outcome,
            SelectionOutcome::Pair {
                combined_price: dec!(1.50)
            }
        );
    }

    #[test]
    fn test_pair_below_combined_floor_rejects_both() {
        let (bets, outcome) = SelectionPolicy::default().apply(vec![
            make_candidate("A vs B", dec!(1.2), dec!(90)),
            make_candidate("C vs D", dec!(1.24), dec!(80)),
        ]);
        assert!(bets.is_empty());
        assert_eq!(
            outcome,
            SelectionOutcome::PairRejected {
                combined_price: dec!(1.488),
                floor: dec!(1.50)
            }
        );
    }

    #[test]
    fn test_only_top_two_considered() {
        let (bets, _) = SelectionPolicy::default().apply(vec![
            make_candidate("A vs B", dec!(1.3), dec!(90)),
            make_candidate("C vs D", dec!(1.3), dec!(80)),
            make_candidate("E vs F", dec!(5.0), dec!(70)),
        ]);
        assert_eq!(bets.len(), 2);
        assert_eq!(bets[1].teams.to_string(), "C vs D");
    }

    #[test]
    fn test_failed_pair_never_falls_back_to_single() {
        // First candidate alone would clear the single floor.
        let (bets, outcome) = SelectionPolicy::default().apply(vec![
            make_candidate("A vs B", dec!(1.40), dec!(90)),
            make_candidate("C vs D", dec!(1.01), dec!(80)),
        ]);
        assert!(bets.is_empty());
        assert!(matches!(outcome, SelectionOutcome::PairRejected { .. }));
    }

    #[test]
    fn test_overflowing_pair_is_rejected() {
        let (bets, outcome) = SelectionPolicy::default().apply(vec![
            make_candidate("A vs B", Decimal::MAX, dec!(90)),
            make_candidate("C vs D", dec!(2), dec!(80)),
        ]);
        assert!(bets.is_empty());
        assert!(outcome.is_rejected());
        assert_eq!(outcome, SelectionOutcome::PairOverflow { floor: dec!(1.50) });
    }

    #[test]
    fn test_custom_floors() {
        let policy = SelectionPolicy::new(PolicyConfig {
            single_min_price: dec!(1.10),
            pair_min_combined_price: dec!(2.0),
        });
        let (bets, _) = policy.apply(vec![make_candidate("A vs B", dec!(1.15), dec!(80))]);
        assert_eq!(bets.len(), 1);
    }
}
