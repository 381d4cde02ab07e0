//! Association-rule generation from mined frequent itemsets.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::itemsets::{FrequentItemsets, ItemsetKey};
use super::transactions::Transaction;
use super::MiningParams;

/// An `antecedent => consequent` implication derived from a frequent
/// itemset. Antecedent and consequent are non-empty, disjoint, and their
/// union is the itemset the rule was split from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent: ItemsetKey,
    pub consequent: ItemsetKey,
    /// Fraction of all transactions containing the full itemset.
    pub support: f64,
    /// `support(antecedent ∪ consequent) / support(antecedent)`, in [0, 1].
    pub confidence: f64,
    /// `confidence / support(consequent)`; 1.0 means independence.
    pub lift: f64,
}

/// Splits every frequent itemset of size ≥ 2 into candidate rules and keeps
/// those at or above the confidence threshold, sorted by descending
/// confidence.
#[derive(Clone, Copy, Debug)]
pub struct RuleGenerator {
    params: MiningParams,
}

impl RuleGenerator {
    pub fn new(params: MiningParams) -> Self {
        Self { params }
    }

    pub fn generate(
        &self,
        itemsets: &FrequentItemsets,
        transactions: &[Transaction],
    ) -> Vec<AssociationRule> {
        let total = transactions.len();
        if total == 0 || itemsets.is_empty() {
            return Vec::new();
        }

        let mut rules = Vec::new();

        for level in itemsets.levels().iter().skip(1) {
            // Deterministic rule order within a level regardless of hash
            // iteration order.
            let mut entries: Vec<(&ItemsetKey, u32)> =
                level.iter().map(|(key, count)| (key, *count)).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            for (itemset, itemset_support) in entries {
                for antecedent in proper_subsets(itemset) {
                    let consequent = itemset.difference(&antecedent);

                    let antecedent_support =
                        itemsets.support_count_or_scan(&antecedent, transactions);
                    // Impossible for a subset of a frequent itemset, but a
                    // zero here must never reach the division.
                    if antecedent_support == 0 {
                        continue;
                    }

                    let confidence = f64::from(itemset_support) / f64::from(antecedent_support);
                    if confidence < self.params.min_confidence() {
                        continue;
                    }

                    let consequent_support =
                        f64::from(itemsets.support_count_or_scan(&consequent, transactions))
                            / total as f64;
                    let lift =
                        if consequent_support > 0.0 { confidence / consequent_support } else { 0.0 };

                    rules.push(AssociationRule {
                        antecedent,
                        consequent,
                        support: f64::from(itemset_support) / total as f64,
                        confidence,
                        lift,
                    });
                }
            }
        }

        // Stable sort: equal-confidence rules keep their level/key order.
        rules.sort_by(|a, b| {
            b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal)
        });
        rules
    }
}

/// All non-empty proper subsets of the itemset, enumerated by bitmask.
/// `MAX_ITEMSET_SIZE` keeps the mask comfortably inside a usize.
fn proper_subsets(itemset: &ItemsetKey) -> Vec<ItemsetKey> {
    let tokens = itemset.tokens();
    let n = tokens.len();
    let full: usize = (1 << n) - 1;

    let mut subsets = Vec::with_capacity(full.saturating_sub(1));
    for mask in 1..full {
        let subset = tokens
            .iter()
            .enumerate()
            .filter(|(index, _)| mask & (1 << index) != 0)
            .map(|(_, token)| token.clone());
        subsets.push(ItemsetKey::new(subset));
    }

    subsets
}

#[cfg(test)]
mod tests {
    use super::super::itemsets::{ItemsetKey, ItemsetMiner};
    use super::super::transactions::{ItemToken, Transaction};
    use super::super::MiningParams;
    use super::{proper_subsets, AssociationRule, RuleGenerator};

    fn token(raw: &str) -> ItemToken {
        ItemToken::new(raw)
    }

    fn key(raw: &[&str]) -> ItemsetKey {
        ItemsetKey::new(raw.iter().copied().map(token))
    }

    fn five_basket_fixture() -> Vec<Transaction> {
        [
            vec!["A", "B"],
            vec!["A", "B"],
            vec!["A", "B", "C"],
            vec!["A", "C"],
            vec!["B", "C"],
        ]
        .into_iter()
        .map(|basket| {
            Transaction::from_tokens(basket.into_iter().map(ItemToken::new))
                .expect("fixture baskets have two or more items")
        })
        .collect()
    }

    fn mine_rules(min_support: f64, min_confidence: f64) -> Vec<AssociationRule> {
        let params = MiningParams::new(min_support, min_confidence).expect("valid params");
        let baskets = five_basket_fixture();
        let itemsets = ItemsetMiner::new(params).mine(&baskets);
        RuleGenerator::new(params).generate(&itemsets, &baskets)
    }

    fn find<'a>(
        rules: &'a [AssociationRule],
        antecedent: &ItemsetKey,
        consequent: &ItemsetKey,
    ) -> &'a AssociationRule {
        rules
            .iter()
            .find(|rule| rule.antecedent == *antecedent && rule.consequent == *consequent)
            .unwrap_or_else(|| panic!("expected rule {antecedent} => {consequent}"))
    }

    #[test]
    fn five_basket_scenario_produces_the_expected_rules() {
        let rules = mine_rules(0.4, 0.5);

        let a_to_b = find(&rules, &key(&["A"]), &key(&["B"]));
        assert!((a_to_b.confidence - 0.75).abs() < 1e-9);
        assert!((a_to_b.support - 0.6).abs() < 1e-9);
        assert!((a_to_b.lift - 0.9375).abs() < 1e-9);

        let b_to_a = find(&rules, &key(&["B"]), &key(&["A"]));
        assert!((b_to_a.confidence - 0.75).abs() < 1e-9);

        let a_to_c = find(&rules, &key(&["A"]), &key(&["C"]));
        assert!((a_to_c.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rules_below_the_confidence_threshold_are_dropped() {
        let rules = mine_rules(0.4, 0.7);

        assert!(rules.iter().all(|rule| rule.confidence >= 0.7));
        assert!(rules.iter().any(|rule| rule.antecedent == key(&["A"])));
        assert!(
            !rules
                .iter()
                .any(|rule| rule.antecedent == key(&["A"]) && rule.consequent == key(&["C"])),
            "A => C has confidence 0.5 and must not survive a 0.7 threshold"
        );
    }

    #[test]
    fn confidence_stays_within_the_unit_interval() {
        for rule in mine_rules(0.2, 0.1) {
            assert!(
                (0.0..=1.0).contains(&rule.confidence),
                "confidence {} out of range",
                rule.confidence
            );
            assert!(rule.lift >= 0.0);
            assert!(rule.support > 0.0);
        }
    }

    #[test]
    fn antecedent_and_consequent_are_disjoint_and_non_empty() {
        for rule in mine_rules(0.2, 0.1) {
            assert!(rule.antecedent.arity() >= 1);
            assert!(rule.consequent.arity() >= 1);
            for token in rule.antecedent.tokens() {
                assert!(!rule.consequent.contains(token));
            }
        }
    }

    #[test]
    fn rules_are_sorted_by_descending_confidence() {
        let rules = mine_rules(0.2, 0.1);
        for window in rules.windows(2) {
            assert!(window[0].confidence >= window[1].confidence);
        }
    }

    #[test]
    fn subset_enumeration_yields_all_proper_non_empty_subsets() {
        let subsets = proper_subsets(&key(&["A", "B", "C"]));
        assert_eq!(subsets.len(), 6);
        assert!(subsets.contains(&key(&["A"])));
        assert!(subsets.contains(&key(&["B", "C"])));
        assert!(!subsets.contains(&key(&["A", "B", "C"])));
    }

    #[test]
    fn empty_itemsets_generate_no_rules() {
        let params = MiningParams::default();
        let generated = RuleGenerator::new(params)
            .generate(&super::super::itemsets::FrequentItemsets::default(), &[]);
        assert!(generated.is_empty());
    }
}
