//! Flattening histories into rows for analysis.
//!
//! Nothing here feeds back into a simulation; it only reads finished histories.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, AuctionResult, ItemId, MultiItemAuctionResult, Price};
use crate::valuation::ValuationModel;

// === SINGLE ITEM ===

/// One row per (round, bid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRow {
    pub round: u32,
    pub agent_id: AgentId,
    pub bid_amount: Price,
    /// 0.0 when the result carries no value for this agent
    pub private_value: Price,
    pub won: bool,
    /// `winning_bid - private_value` for the winner, 0.0 for everyone else
    pub utility: f64,
}

pub fn bid_rows(history: &[AuctionResult]) -> Vec<BidRow> {
    history
        .iter()
        .flat_map(|result| {
            result.all_bids.iter().map(move |bid| {
                let private_value = result
                    .private_values
                    .get(&bid.agent_id)
                    .copied()
                    .unwrap_or(0.0);
                let won = result.winning_agent_id == Some(bid.agent_id);
                BidRow {
                    round: result.round_number,
                    agent_id: bid.agent_id,
                    bid_amount: bid.bid_amount,
                    private_value,
                    won,
                    utility: if won {
                        result.winning_bid - private_value
                    } else {
                        0.0
                    },
                }
            })
        })
        .collect()
}

pub fn utility_by_agent(rows: &[BidRow]) -> BTreeMap<AgentId, f64> {
    utility_by(rows, |agent_id| agent_id)
}

/// Utility totals grouped by a caller-chosen key, e.g. strategy kind.
pub fn utility_by<K: Ord>(
    rows: &[BidRow],
    mut key: impl FnMut(AgentId) -> K,
) -> BTreeMap<K, f64> {
    let mut totals = BTreeMap::new();
    for row in rows {
        *totals.entry(key(row.agent_id)).or_insert(0.0) += row.utility;
    }
    totals
}

pub fn wins_by_agent(history: &[AuctionResult]) -> BTreeMap<AgentId, u32> {
    let mut wins = BTreeMap::new();
    for winner in history.iter().filter_map(|r| r.winning_agent_id) {
        *wins.entry(winner).or_insert(0) += 1;
    }
    wins
}

// === MULTI ITEM ===

/// One row per (round, item bid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRow {
    pub round: u32,
    pub agent_id: AgentId,
    pub item_id: ItemId,
    pub bid_amount: Price,
    pub private_value: Price,
    pub won: bool,
    /// Clearing price if won, else 0.0
    pub price_paid: Price,
}

pub fn item_rows(history: &[MultiItemAuctionResult]) -> Vec<ItemRow> {
    history
        .iter()
        .flat_map(|result| {
            result.all_bids.iter().map(move |bid| {
                let won = result.allocations.get(&bid.item_id) == Some(&Some(bid.agent_id));
                ItemRow {
                    round: result.round_number,
                    agent_id: bid.agent_id,
                    item_id: bid.item_id,
                    bid_amount: bid.bid_amount,
                    private_value: result
                        .private_values
                        .get(&bid.agent_id)
                        .and_then(|values| values.get(&bid.item_id))
                        .copied()
                        .unwrap_or(0.0),
                    won,
                    price_paid: if won {
                        result.prices.get(&bid.item_id).copied().unwrap_or(0.0)
                    } else {
                        0.0
                    },
                }
            })
        })
        .collect()
}

/// What each agent took home in one multi-item round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleRow {
    pub round: u32,
    pub agent_id: AgentId,
    pub items_won: Vec<ItemId>,
    /// Won bundle valued under the round's model
    pub bundle_value: Price,
    pub spent: Price,
    /// `bundle_value - spent`
    pub surplus: f64,
}

/// One row per (round, agent with recorded values), valuing won bundles with `model`.
pub fn bundle_rows(history: &[MultiItemAuctionResult], model: &ValuationModel) -> Vec<BundleRow> {
    history
        .iter()
        .flat_map(|result| {
            result.private_values.iter().map(move |(&agent_id, values)| {
                let items_won = result.won_by(agent_id);
                let bundle: BTreeSet<ItemId> = items_won.iter().copied().collect();
                let bundle_value = model.bundle_value(&bundle, values);
                let spent = result.spent_by(agent_id);
                BundleRow {
                    round: result.round_number,
                    agent_id,
                    items_won,
                    bundle_value,
                    spent,
                    surplus: bundle_value - spent,
                }
            })
        })
        .collect()
}

// === DATAFRAMES ===

#[cfg(feature = "instrument")]
pub use frames::*;

#[cfg(feature = "instrument")]
mod frames {
    use instrument::polars::prelude::*;

    use super::{BidRow, ItemRow};

    fn column<T>(name: &str, values: Vec<T>) -> Column
    where
        Series: NamedFrom<Vec<T>, [T]>,
    {
        Column::new(name.into(), values)
    }

    pub fn bid_rows_frame(rows: &[BidRow]) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            column("round", rows.iter().map(|r| u64::from(r.round)).collect()),
            column("agent_id", rows.iter().map(|r| u64::from(r.agent_id)).collect()),
            column("bid_amount", rows.iter().map(|r| r.bid_amount).collect()),
            column("private_value", rows.iter().map(|r| r.private_value).collect()),
            column("won", rows.iter().map(|r| r.won).collect()),
            column("utility", rows.iter().map(|r| r.utility).collect()),
        ])
    }

    pub fn item_rows_frame(rows: &[ItemRow]) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            column("round", rows.iter().map(|r| u64::from(r.round)).collect()),
            column("agent_id", rows.iter().map(|r| u64::from(r.agent_id)).collect()),
            column("item_id", rows.iter().map(|r| u64::from(r.item_id)).collect()),
            column("bid_amount", rows.iter().map(|r| r.bid_amount).collect()),
            column("private_value", rows.iter().map(|r| r.private_value).collect()),
            column("won", rows.iter().map(|r| r.won).collect()),
            column("price_paid", rows.iter().map(|r| r.price_paid).collect()),
        ])
    }
}
