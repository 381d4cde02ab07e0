//! Order-stream reduction: raw orders in, deduplicated transactions out.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::order::{Order, OrderLine};

/// Opaque, stable identifier for a purchasable item inside the miner.
///
/// Built from the catalog id when the order line carries one, falling back
/// to the display name. Comparison is case-sensitive string equality after
/// trimming.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemToken(String);

impl ItemToken {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ItemToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token identity for an order line: catalog id first, display name as the
/// fallback for lines whose product reference was lost.
pub fn token_for_line(line: &OrderLine) -> ItemToken {
    if line.product_id.0.trim().is_empty() {
        ItemToken::new(&line.name)
    } else {
        ItemToken::new(&line.product_id.0)
    }
}

/// Distinct item tokens purchased together in one qualifying order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    tokens: BTreeSet<ItemToken>,
}

impl Transaction {
    /// Builds a transaction from raw tokens, dropping blanks and duplicates.
    /// Returns `None` unless at least two distinct tokens remain: a
    /// single-item order carries no co-occurrence information.
    pub fn from_tokens(tokens: impl IntoIterator<Item = ItemToken>) -> Option<Self> {
        let tokens: BTreeSet<ItemToken> =
            tokens.into_iter().filter(|token| !token.is_empty()).collect();

        (tokens.len() >= 2).then_some(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &ItemToken) -> bool {
        self.tokens.contains(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &ItemToken> {
        self.tokens.iter()
    }
}

/// Aggregate numbers from one extraction pass, surfaced through analytics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub order_count: usize,
    pub eligible_order_count: usize,
    pub transaction_count: usize,
    pub unique_items: usize,
    pub avg_items_per_transaction: f64,
}

/// Reduces an order stream to the transaction list the miner consumes.
///
/// Empty input is not a fault: it yields zero transactions and downstream
/// components report insufficient data.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransactionExtractor;

impl TransactionExtractor {
    pub fn extract(&self, orders: &[Order]) -> Vec<Transaction> {
        self.extract_with_stats(orders).0
    }

    pub fn extract_with_stats(&self, orders: &[Order]) -> (Vec<Transaction>, TransactionStats) {
        let mut transactions = Vec::new();
        let mut unique_items: HashSet<ItemToken> = HashSet::new();
        let mut eligible_order_count = 0usize;
        let mut token_total = 0usize;

        for order in orders {
            if !order.status.contributes_to_mining() {
                continue;
            }
            eligible_order_count += 1;

            let Some(transaction) = Transaction::from_tokens(order.lines.iter().map(token_for_line))
            else {
                continue;
            };

            token_total += transaction.len();
            unique_items.extend(transaction.tokens().cloned());
            transactions.push(transaction);
        }

        let avg_items_per_transaction = if transactions.is_empty() {
            0.0
        } else {
            token_total as f64 / transactions.len() as f64
        };

        let stats = TransactionStats {
            order_count: orders.len(),
            eligible_order_count,
            transaction_count: transactions.len(),
            unique_items: unique_items.len(),
            avg_items_per_transaction,
        };

        (transactions, stats)
    }
}

/// Raw occurrence count of every single token across all transactions.
pub fn item_frequencies(transactions: &[Transaction]) -> HashMap<ItemToken, u32> {
    let mut counts: HashMap<ItemToken, u32> = HashMap::new();
    for transaction in transactions {
        for token in transaction.tokens() {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::order::{Order, OrderId, OrderLine, OrderStatus};
    use crate::domain::product::{CustomerId, ProductId};

    use super::{item_frequencies, ItemToken, Transaction, TransactionExtractor};

    fn line(product_id: &str, name: &str) -> OrderLine {
        OrderLine {
            product_id: ProductId(product_id.to_string()),
            name: name.to_string(),
            quantity: 1,
            unit_price: Decimal::new(999, 2),
        }
    }

    fn order(id: &str, status: OrderStatus, lines: Vec<OrderLine>) -> Order {
        Order {
            id: OrderId(id.to_string()),
            customer_id: CustomerId("cust-1".to_string()),
            status,
            lines,
            placed_at: Utc::now(),
        }
    }

    #[test]
    fn tokens_are_trimmed_and_case_sensitive() {
        assert_eq!(ItemToken::new("  espresso  "), ItemToken::new("espresso"));
        assert_ne!(ItemToken::new("Espresso"), ItemToken::new("espresso"));
    }

    #[test]
    fn duplicate_lines_collapse_into_one_token() {
        let transaction = Transaction::from_tokens(vec![
            ItemToken::new("a"),
            ItemToken::new("a"),
            ItemToken::new("b"),
        ])
        .expect("two distinct tokens remain");

        assert_eq!(transaction.len(), 2);
    }

    #[test]
    fn single_item_orders_yield_no_transaction() {
        assert!(Transaction::from_tokens(vec![ItemToken::new("a"), ItemToken::new("a")]).is_none());
        assert!(Transaction::from_tokens(Vec::new()).is_none());
    }

    #[test]
    fn extraction_filters_by_fulfillment_status() {
        let orders = vec![
            order("o-1", OrderStatus::Delivered, vec![line("a", "A"), line("b", "B")]),
            order("o-2", OrderStatus::Cancelled, vec![line("a", "A"), line("c", "C")]),
            order("o-3", OrderStatus::Pending, vec![line("b", "B"), line("c", "C")]),
            order("o-4", OrderStatus::Shipped, vec![line("a", "A"), line("c", "C")]),
        ];

        let (transactions, stats) = TransactionExtractor.extract_with_stats(&orders);

        assert_eq!(transactions.len(), 2);
        assert_eq!(stats.order_count, 4);
        assert_eq!(stats.eligible_order_count, 2);
        assert_eq!(stats.unique_items, 3);
    }

    #[test]
    fn lines_without_a_product_id_fall_back_to_the_name() {
        let mut nameless = line("", "Hand Grinder");
        nameless.product_id = ProductId(String::new());

        let orders =
            vec![order("o-1", OrderStatus::Delivered, vec![nameless, line("b", "Filter Pack")])];
        let transactions = TransactionExtractor.extract(&orders);

        assert_eq!(transactions.len(), 1);
        assert!(transactions[0].contains(&ItemToken::new("Hand Grinder")));
        assert!(transactions[0].contains(&ItemToken::new("b")));
    }

    #[test]
    fn empty_input_yields_zero_transactions_without_error() {
        let (transactions, stats) = TransactionExtractor.extract_with_stats(&[]);
        assert!(transactions.is_empty());
        assert_eq!(stats.transaction_count, 0);
        assert_eq!(stats.avg_items_per_transaction, 0.0);
    }

    #[test]
    fn frequencies_count_each_transaction_once_per_token() {
        let transactions = vec![
            Transaction::from_tokens(vec![ItemToken::new("a"), ItemToken::new("b")]).expect("tx"),
            Transaction::from_tokens(vec![ItemToken::new("a"), ItemToken::new("c")]).expect("tx"),
        ];

        let frequencies = item_frequencies(&transactions);
        assert_eq!(frequencies.get(&ItemToken::new("a")), Some(&2));
        assert_eq!(frequencies.get(&ItemToken::new("b")), Some(&1));
        assert_eq!(frequencies.get(&ItemToken::new("c")), Some(&1));
    }
}
