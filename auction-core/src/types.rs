use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::valuation::ValuationModel;

// ============================================================================
// IDs - Plain integer aliases, unique within one simulation
// ============================================================================

pub type AgentId = u32;
pub type ItemId = u32;
pub type Price = f64;

// ============================================================================
// Bids - What agents submit each round
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Bid {
    pub agent_id: AgentId,
    /// Amounts <= 0 are kept for audit but never win.
    pub bid_amount: Price,
}

impl Bid {
    pub fn new(agent_id: AgentId, bid_amount: Price) -> Self {
        Self {
            agent_id,
            bid_amount,
        }
    }

    pub fn participates(&self) -> bool {
        self.bid_amount > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ItemBid {
    pub agent_id: AgentId,
    pub item_id: ItemId,
    pub bid_amount: Price,
}

impl ItemBid {
    pub fn new(agent_id: AgentId, item_id: ItemId, bid_amount: Price) -> Self {
        Self {
            agent_id,
            item_id,
            bid_amount,
        }
    }

    pub fn participates(&self) -> bool {
        self.bid_amount > 0.0
    }
}

// ============================================================================
// Items - Independent lots in a multi-item round
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Item {
    pub item_id: ItemId,
    pub name: String,
}

impl Item {
    /// Item with a synthesized `Item_{id}` label.
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            name: format!("Item_{item_id}"),
        }
    }

    /// Empty names fall back to the synthesized label.
    pub fn named(item_id: ItemId, name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            return Self::new(item_id);
        }
        Self { item_id, name }
    }

    /// `count` items with ids `0..count`.
    pub fn sequence(count: u32) -> Vec<Item> {
        (0..count).map(Item::new).collect()
    }
}

// ============================================================================
// Per-round agent views
// ============================================================================

/// What one agent knows about the current single-item round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuctionState {
    pub agent_id: AgentId,
    pub private_value: Price,
    pub round_number: u32,
}

/// What one agent knows about the current multi-item round.
#[derive(Debug, Clone, Copy)]
pub struct MultiItemAuctionState<'a> {
    pub agent_id: AgentId,
    pub round_number: u32,
    pub items: &'a [Item],
    /// item_id -> base value for this agent
    pub private_values: &'a BTreeMap<ItemId, Price>,
    pub valuation_model: Option<&'a ValuationModel>,
}

impl MultiItemAuctionState<'_> {
    pub fn base_value(&self, item_id: ItemId) -> Price {
        self.private_values.get(&item_id).copied().unwrap_or(0.0)
    }
}

// ============================================================================
// Results - Appended to history, never mutated afterwards
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct AuctionResult {
    pub auction_id: u32,
    pub round_number: u32,
    /// None when no bid was positive
    pub winning_agent_id: Option<AgentId>,
    pub winning_bid: Price,
    pub all_bids: Vec<Bid>,
    pub private_values: BTreeMap<AgentId, Price>,
}

impl AuctionResult {
    pub fn no_winner(auction_id: u32, round_number: u32, all_bids: Vec<Bid>) -> Self {
        Self {
            auction_id,
            round_number,
            winning_agent_id: None,
            winning_bid: 0.0,
            all_bids,
            private_values: BTreeMap::new(),
        }
    }

    pub fn bid_of(&self, agent_id: AgentId) -> Option<&Bid> {
        self.all_bids.iter().find(|b| b.agent_id == agent_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MultiItemAuctionResult {
    pub auction_id: u32,
    pub round_number: u32,
    /// item_id -> winner, None when unallocated
    pub allocations: BTreeMap<ItemId, Option<AgentId>>,
    pub prices: BTreeMap<ItemId, Price>,
    pub all_bids: Vec<ItemBid>,
    /// agent_id -> {item_id -> base value}
    pub private_values: BTreeMap<AgentId, BTreeMap<ItemId, Price>>,
}

impl MultiItemAuctionResult {
    /// Items allocated to `agent_id` this round.
    pub fn won_by(&self, agent_id: AgentId) -> Vec<ItemId> {
        self.allocations
            .iter()
            .filter(|(_, winner)| **winner == Some(agent_id))
            .map(|(&item, _)| item)
            .collect()
    }

    /// Sum of prices paid by `agent_id` this round.
    pub fn spent_by(&self, agent_id: AgentId) -> Price {
        self.won_by(agent_id)
            .iter()
            .map(|item| self.prices.get(item).copied().unwrap_or(0.0))
            .sum()
    }
}
