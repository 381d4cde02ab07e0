//! Ranking functions over one rule-set snapshot.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::mining::{AssociationRule, ItemToken};

use super::types::{CoPurchaseItem, RankedItem, TrendingCombination};
use super::{TRENDING_MIN_CONFIDENCE, TRENDING_MIN_LIFT};

/// Pure query functions over an already-sorted rule list.
///
/// All modes assume the rules arrive in descending confidence order (the
/// generator's contract); score ties therefore resolve to the earlier,
/// higher-confidence contribution.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    /// Cart-based and personalized ranking. Every rule whose antecedent is
    /// contained in the context votes `confidence × lift` for each
    /// consequent token not already present; a token recommended by several
    /// rules sums its votes. Context tokens never appear in the output.
    pub fn rank_for_context(
        &self,
        rules: &[AssociationRule],
        context: &HashSet<ItemToken>,
        limit: usize,
    ) -> Vec<RankedItem> {
        let mut scores: HashMap<ItemToken, (f64, usize)> = HashMap::new();
        let mut next_seen = 0usize;

        for rule in rules {
            if !rule.antecedent.tokens().iter().all(|token| context.contains(token)) {
                continue;
            }

            for token in rule.consequent.tokens() {
                if context.contains(token) {
                    continue;
                }

                let entry = scores.entry(token.clone()).or_insert_with(|| {
                    let seen = next_seen;
                    next_seen += 1;
                    (0.0, seen)
                });
                entry.0 += rule.confidence * rule.lift;
            }
        }

        let mut ranked: Vec<(ItemToken, f64, usize)> =
            scores.into_iter().map(|(token, (score, seen))| (token, score, seen)).collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.2.cmp(&b.2))
        });
        ranked.truncate(limit);

        ranked.into_iter().map(|(token, score, _)| RankedItem { token, score }).collect()
    }

    /// Co-purchases for focal tokens, looking through both rule sides:
    /// consequents of rules the focal item implies, and antecedents of
    /// rules that imply it. Duplicates keep their highest-confidence
    /// occurrence; results are ordered by descending confidence.
    pub fn bought_together(
        &self,
        rules: &[AssociationRule],
        focals: &[ItemToken],
        limit: usize,
    ) -> Vec<CoPurchaseItem> {
        let focal_set: HashSet<&ItemToken> = focals.iter().collect();
        let mut best: HashMap<ItemToken, (CoPurchaseItem, usize)> = HashMap::new();
        let mut next_seen = 0usize;

        let mut consider =
            |token: &ItemToken, rule: &AssociationRule, best: &mut HashMap<ItemToken, (CoPurchaseItem, usize)>| {
                if focal_set.contains(token) {
                    return;
                }

                match best.get_mut(token) {
                    Some((existing, _)) if existing.confidence >= rule.confidence => {}
                    Some((existing, _)) => {
                        existing.confidence = rule.confidence;
                        existing.lift = rule.lift;
                    }
                    None => {
                        let seen = next_seen;
                        next_seen += 1;
                        best.insert(
                            token.clone(),
                            (
                                CoPurchaseItem {
                                    token: token.clone(),
                                    confidence: rule.confidence,
                                    lift: rule.lift,
                                },
                                seen,
                            ),
                        );
                    }
                }
            };

        for rule in rules {
            let focal_in_antecedent =
                focals.iter().any(|focal| rule.antecedent.contains(focal));
            let focal_in_consequent =
                focals.iter().any(|focal| rule.consequent.contains(focal));

            if focal_in_antecedent {
                for token in rule.consequent.tokens() {
                    consider(token, rule, &mut best);
                }
            }
            if focal_in_consequent {
                for token in rule.antecedent.tokens() {
                    consider(token, rule, &mut best);
                }
            }
        }

        let mut items: Vec<(CoPurchaseItem, usize)> = best.into_values().collect();
        items.sort_by(|a, b| {
            b.0.confidence.partial_cmp(&a.0.confidence).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1))
        });
        items.truncate(limit);

        items.into_iter().map(|(item, _)| item).collect()
    }

    /// Rules clearing the looser trending floors, as display groups without
    /// per-token scoring.
    pub fn trending(&self, rules: &[AssociationRule], limit: usize) -> Vec<TrendingCombination> {
        rules
            .iter()
            .filter(|rule| {
                rule.confidence > TRENDING_MIN_CONFIDENCE && rule.lift > TRENDING_MIN_LIFT
            })
            .take(limit)
            .map(|rule| TrendingCombination {
                antecedent: rule.antecedent.clone(),
                consequent: rule.consequent.clone(),
                support: rule.support,
                confidence: rule.confidence,
                lift: rule.lift,
            })
            .collect()
    }
}
