//! Level-wise Apriori frequent-itemset search.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::transactions::{item_frequencies, ItemToken, Transaction};
use super::{MiningParams, MAX_ITEMSET_SIZE};

/// Canonical identity of an itemset: tokens sorted ascending, deduplicated.
///
/// Every place that counts or looks up an itemset keys on this type, so two
/// itemsets with the same members are the same key regardless of the order
/// their tokens arrived in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemsetKey(Vec<ItemToken>);

impl ItemsetKey {
    pub fn new(tokens: impl IntoIterator<Item = ItemToken>) -> Self {
        let mut tokens: Vec<ItemToken> = tokens.into_iter().collect();
        tokens.sort();
        tokens.dedup();
        Self(tokens)
    }

    pub fn single(token: ItemToken) -> Self {
        Self(vec![token])
    }

    /// Number of distinct tokens (the `k` of a k-itemset).
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn tokens(&self) -> &[ItemToken] {
        &self.0
    }

    pub fn contains(&self, token: &ItemToken) -> bool {
        self.0.binary_search(token).is_ok()
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.0.iter().chain(other.0.iter()).cloned())
    }

    /// The members of `self` not present in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        Self::new(self.0.iter().filter(|token| !other.contains(token)).cloned())
    }

    pub fn is_contained_in(&self, transaction: &Transaction) -> bool {
        self.0.iter().all(|token| transaction.contains(token))
    }
}

impl fmt::Display for ItemsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            f.write_str(token.as_str())?;
        }
        Ok(())
    }
}

/// Frequent itemsets for one value of k: canonical key to support count.
pub type ItemsetLevel = HashMap<ItemsetKey, u32>;

/// Frequent-itemset levels in ascending k order; `levels()[0]` holds the
/// 1-itemsets. Construction stops at the first empty level, so the level
/// for any present key sits at index `arity - 1`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrequentItemsets {
    levels: Vec<ItemsetLevel>,
}

impl FrequentItemsets {
    pub fn levels(&self) -> &[ItemsetLevel] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total number of frequent itemsets across all levels.
    pub fn len(&self) -> usize {
        self.levels.iter().map(HashMap::len).sum()
    }

    pub fn support_count(&self, key: &ItemsetKey) -> Option<u32> {
        let level = self.levels.get(key.arity().checked_sub(1)?)?;
        level.get(key).copied()
    }

    /// Support lookup for rule generation: the mined levels first, then a
    /// full transaction scan. The fallback matters — an antecedent subset is
    /// not guaranteed to have survived the frequency filter when pruning was
    /// aggressive, and a silent zero here would corrupt confidence values.
    pub fn support_count_or_scan(&self, key: &ItemsetKey, transactions: &[Transaction]) -> u32 {
        if let Some(count) = self.support_count(key) {
            return count;
        }

        transactions.iter().filter(|transaction| key.is_contained_in(transaction)).count() as u32
    }
}

/// Level-wise Apriori search over deduplicated transactions.
///
/// Worst case is exponential in the number of distinct tokens; the support
/// threshold applied at every level is what keeps it tractable for retail
/// baskets. `MAX_ITEMSET_SIZE` caps the search regardless.
#[derive(Clone, Copy, Debug)]
pub struct ItemsetMiner {
    params: MiningParams,
}

impl ItemsetMiner {
    pub fn new(params: MiningParams) -> Self {
        Self { params }
    }

    pub fn mine(&self, transactions: &[Transaction]) -> FrequentItemsets {
        if transactions.is_empty() {
            return FrequentItemsets::default();
        }

        let threshold = self.params.support_threshold(transactions.len());

        let one_itemsets: ItemsetLevel = item_frequencies(transactions)
            .into_iter()
            .filter(|(_, count)| *count >= threshold)
            .map(|(token, count)| (ItemsetKey::single(token), count))
            .collect();

        if one_itemsets.is_empty() {
            return FrequentItemsets::default();
        }

        let mut levels = vec![one_itemsets];

        for k in 2..=MAX_ITEMSET_SIZE {
            let Some(survivors) = levels.last() else {
                break;
            };
            let candidates = candidate_itemsets(survivors, k);
            if candidates.is_empty() {
                break;
            }

            let level: ItemsetLevel = candidates
                .into_iter()
                .map(|candidate| {
                    let count = transactions
                        .iter()
                        .filter(|transaction| candidate.is_contained_in(transaction))
                        .count() as u32;
                    (candidate, count)
                })
                .filter(|(_, count)| *count >= threshold)
                .collect();

            if level.is_empty() {
                break;
            }
            levels.push(level);
        }

        FrequentItemsets { levels }
    }
}

/// Self-join step: union every pair of surviving (k-1)-itemsets, keeping
/// unions with exactly k tokens.
fn candidate_itemsets(survivors: &ItemsetLevel, k: usize) -> HashSet<ItemsetKey> {
    let keys: Vec<&ItemsetKey> = survivors.keys().collect();
    let mut candidates = HashSet::new();

    for (index, left) in keys.iter().enumerate() {
        for right in keys.iter().skip(index + 1) {
            let union = left.union(right);
            if union.arity() == k {
                candidates.insert(union);
            }
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::super::transactions::{ItemToken, Transaction};
    use super::super::MiningParams;
    use super::{FrequentItemsets, ItemsetKey, ItemsetMiner};

    fn token(raw: &str) -> ItemToken {
        ItemToken::new(raw)
    }

    fn key(raw: &[&str]) -> ItemsetKey {
        ItemsetKey::new(raw.iter().copied().map(token))
    }

    fn transactions(baskets: &[&[&str]]) -> Vec<Transaction> {
        baskets
            .iter()
            .map(|basket| {
                Transaction::from_tokens(basket.iter().copied().map(token))
                    .expect("fixture baskets have two or more items")
            })
            .collect()
    }

    fn five_basket_fixture() -> Vec<Transaction> {
        transactions(&[
            &["A", "B"],
            &["A", "B"],
            &["A", "B", "C"],
            &["A", "C"],
            &["B", "C"],
        ])
    }

    #[test]
    fn canonical_key_ignores_token_order_and_duplicates() {
        let left = ItemsetKey::new(vec![token("b"), token("a"), token("b")]);
        let right = ItemsetKey::new(vec![token("a"), token("b")]);
        assert_eq!(left, right);
        assert_eq!(left.arity(), 2);
    }

    #[test]
    fn mines_the_five_basket_scenario_exactly() {
        let miner = ItemsetMiner::new(MiningParams::new(0.4, 0.5).expect("valid params"));
        let itemsets = miner.mine(&five_basket_fixture());

        let levels = itemsets.levels();
        assert_eq!(levels.len(), 2, "the 3-itemset {{A,B,C}} has support 1 and must not survive");

        assert_eq!(levels[0].get(&key(&["A"])), Some(&4));
        assert_eq!(levels[0].get(&key(&["B"])), Some(&4));
        assert_eq!(levels[0].get(&key(&["C"])), Some(&3));

        assert_eq!(levels[1].get(&key(&["A", "B"])), Some(&3));
        assert_eq!(levels[1].get(&key(&["A", "C"])), Some(&2));
        assert_eq!(levels[1].get(&key(&["B", "C"])), Some(&2));
    }

    #[test]
    fn every_reported_support_matches_a_direct_transaction_count() {
        let baskets = five_basket_fixture();
        let miner = ItemsetMiner::new(MiningParams::new(0.2, 0.5).expect("valid params"));
        let itemsets = miner.mine(&baskets);

        for level in itemsets.levels() {
            for (key, count) in level {
                let direct =
                    baskets.iter().filter(|tx| key.is_contained_in(tx)).count() as u32;
                assert_eq!(*count, direct, "support mismatch for {key}");
            }
        }
    }

    #[test]
    fn downward_closure_holds_for_all_mined_levels() {
        let baskets = transactions(&[
            &["A", "B", "C"],
            &["A", "B", "C"],
            &["A", "B", "D"],
            &["B", "C", "D"],
            &["A", "C"],
            &["B", "C"],
        ]);
        let miner = ItemsetMiner::new(MiningParams::new(0.3, 0.5).expect("valid params"));
        let itemsets = miner.mine(&baskets);
        assert!(itemsets.levels().len() >= 2, "fixture should produce multi-token itemsets");

        for level in itemsets.levels().iter().skip(1) {
            for key in level.keys() {
                for dropped in key.tokens() {
                    let subset = ItemsetKey::new(
                        key.tokens().iter().filter(|t| *t != dropped).cloned(),
                    );
                    assert!(
                        itemsets.support_count(&subset).is_some(),
                        "subset {subset} of {key} must itself be frequent"
                    );
                }
            }
        }
    }

    #[test]
    fn no_single_token_meets_an_impossible_threshold() {
        let miner = ItemsetMiner::new(MiningParams::new(1.0, 0.5).expect("valid params"));
        let itemsets = miner.mine(&transactions(&[&["A", "B"], &["C", "D"], &["E", "F"]]));
        assert!(itemsets.is_empty());
    }

    #[test]
    fn empty_transaction_list_mines_nothing() {
        let miner = ItemsetMiner::new(MiningParams::default());
        assert!(miner.mine(&[]).is_empty());
    }

    #[test]
    fn scan_fallback_counts_itemsets_pruned_from_the_levels() {
        let baskets = five_basket_fixture();
        let miner = ItemsetMiner::new(MiningParams::new(0.8, 0.5).expect("valid params"));
        let itemsets = miner.mine(&baskets);

        // Threshold 4 prunes C and every pair, yet their true supports are
        // still recoverable through the scan path.
        assert_eq!(itemsets.support_count(&key(&["C"])), None);
        assert_eq!(itemsets.support_count_or_scan(&key(&["C"]), &baskets), 3);
        assert_eq!(itemsets.support_count_or_scan(&key(&["A", "B"]), &baskets), 3);
        assert_eq!(itemsets.support_count_or_scan(&key(&["A", "B", "C"]), &baskets), 1);
    }

    #[test]
    fn candidate_unions_must_have_exactly_k_tokens() {
        let mut survivors = super::ItemsetLevel::new();
        survivors.insert(key(&["A", "B"]), 3);
        survivors.insert(key(&["A", "C"]), 3);
        survivors.insert(key(&["D", "E"]), 3);

        let candidates = super::candidate_itemsets(&survivors, 3);

        // {A,B} ∪ {A,C} = {A,B,C}; disjoint pairs union to four tokens and
        // are discarded.
        assert_eq!(candidates.len(), 1);
        assert!(candidates.contains(&key(&["A", "B", "C"])));
    }

    #[test]
    fn level_index_matches_arity() {
        let miner = ItemsetMiner::new(MiningParams::new(0.2, 0.5).expect("valid params"));
        let itemsets: FrequentItemsets = miner.mine(&five_basket_fixture());

        for (index, level) in itemsets.levels().iter().enumerate() {
            for key in level.keys() {
                assert_eq!(key.arity(), index + 1);
            }
        }
    }
}
