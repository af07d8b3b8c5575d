//! First-price sealed-bid clearing.
//!
//! Clearing is pure: bids in, result out. The only side effect is on the caller's
//! RNG, which is advanced by exactly one draw per clearing decision, whether or
//! not anything participates or ties. Stream position therefore depends only on
//! how many decisions were made, never on bid values.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;

use crate::types::{
    AgentId, AuctionResult, Bid, Item, ItemBid, ItemId, MultiItemAuctionResult, Price,
};

// === TIE BREAK ===

/// Outcome of clearing one lot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotOutcome {
    pub winner: Option<AgentId>,
    pub price: Price,
    /// Bids with a positive amount
    pub participating: usize,
    /// Bids sharing the maximum amount
    pub tie_size: usize,
}

impl LotOutcome {
    const UNSOLD: LotOutcome = LotOutcome {
        winner: None,
        price: 0.0,
        participating: 0,
        tie_size: 0,
    };
}

/// Uniform index into a tie set of `len` entries from a roll in `[0, 1)`.
fn pick_index(roll: f64, len: usize) -> usize {
    ((roll * len as f64) as usize).min(len - 1)
}

/// Clear one lot from `(agent, amount)` pairs in submission order.
fn clear_lot<R: Rng>(bids: impl Iterator<Item = (AgentId, Price)>, rng: &mut R) -> LotOutcome {
    let roll: f64 = rng.random();
    let participating: Vec<(AgentId, Price)> = bids.filter(|(_, amount)| *amount > 0.0).collect();

    let Some(highest) = participating
        .iter()
        .map(|(_, amount)| *amount)
        .reduce(Price::max)
    else {
        return LotOutcome::UNSOLD;
    };

    // Exact equality: ties are bids with the same amount, no epsilon.
    let tied: Vec<AgentId> = participating
        .iter()
        .filter(|(_, amount)| *amount == highest)
        .map(|(agent, _)| *agent)
        .collect();

    let winner = tied[pick_index(roll, tied.len())];

    LotOutcome {
        winner: Some(winner),
        price: highest,
        participating: participating.len(),
        tie_size: tied.len(),
    }
}

// === SINGLE ITEM ===

/// Clear a single-item first-price sealed-bid auction.
///
/// - No bids: no winner, empty `all_bids`.
/// - No positive bids: no winner, `all_bids` echoes the input.
/// - Otherwise a uniformly random member of the top tie set wins and pays its bid.
///
/// `private_values` is left empty; the orchestrator fills it in.
pub fn clear_single_item<R: Rng>(
    bids: &[Bid],
    auction_id: u32,
    rng: &mut R,
    round_number: u32,
) -> AuctionResult {
    let outcome = clear_lot(bids.iter().map(|b| (b.agent_id, b.bid_amount)), rng);

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "clear",
        round = round_number,
        auction_id = auction_id,
        winner = outcome.winner.map_or(-1, i64::from),
        price = outcome.price,
        bid_count = bids.len() as u64,
        participating = outcome.participating as u64,
        tie_size = outcome.tie_size as u64,
    );

    AuctionResult {
        auction_id,
        round_number,
        winning_agent_id: outcome.winner,
        winning_bid: outcome.price,
        all_bids: bids.to_vec(),
        private_values: BTreeMap::new(),
    }
}

// === MULTI ITEM ===

/// Clear one independent first-price auction per item.
///
/// Items are cleared in `items` order, each drawing from the shared `rng`, so
/// item order anchors tie-break determinism. There is no cross-item constraint:
/// one agent may win everything. Bids on ids outside `items` stay in `all_bids`
/// but are never allocated.
pub fn clear_multi_item<R: Rng>(
    bids: &[ItemBid],
    items: &[Item],
    auction_id: u32,
    rng: &mut R,
    round_number: u32,
) -> MultiItemAuctionResult {
    let mut bids_by_item: HashMap<ItemId, Vec<(AgentId, Price)>> = HashMap::new();
    for bid in bids {
        bids_by_item
            .entry(bid.item_id)
            .or_default()
            .push((bid.agent_id, bid.bid_amount));
    }

    let mut allocations = BTreeMap::new();
    let mut prices = BTreeMap::new();

    for item in items {
        let item_bids = bids_by_item.remove(&item.item_id).unwrap_or_default();
        let bid_count = item_bids.len();
        let outcome = clear_lot(item_bids.into_iter(), rng);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "item_clear",
            round = round_number,
            auction_id = auction_id,
            item_id = item.item_id,
            winner = outcome.winner.map_or(-1, i64::from),
            price = outcome.price,
            bid_count = bid_count as u64,
            participating = outcome.participating as u64,
            tie_size = outcome.tie_size as u64,
        );
        let _ = bid_count; // Suppress unused warning when feature disabled

        allocations.insert(item.item_id, outcome.winner);
        prices.insert(item.item_id, outcome.price);
    }

    MultiItemAuctionResult {
        auction_id,
        round_number,
        allocations,
        prices,
        all_bids: bids.to_vec(),
        private_values: BTreeMap::new(),
    }
}
