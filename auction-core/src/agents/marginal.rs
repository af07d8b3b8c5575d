//! Bundle-aware bidding: bid a fraction of what each item adds to the full bundle.

use std::collections::BTreeSet;

use crate::bidder::{Bidder, MultiItemBidder};
use crate::types::{
    AgentId, AuctionResult, AuctionState, Bid, ItemBid, ItemId, MultiItemAuctionResult,
    MultiItemAuctionState, Price,
};
use crate::valuation::ValuationModel;

static ADDITIVE: ValuationModel = ValuationModel::Additive;

/// Shades the marginal value of each item by a fixed factor.
///
/// Under substitutes the second-best item in a group is worth nothing extra, so
/// this bidder sits it out; under synergy it bids up items that complete a pair.
#[derive(Debug, Clone, Copy)]
pub struct MarginalBidder {
    agent_id: AgentId,
    shading: f64,
}

impl MarginalBidder {
    pub fn new(agent_id: AgentId, shading: f64) -> Self {
        Self { agent_id, shading }
    }

    pub fn shading(&self) -> f64 {
        self.shading
    }
}

impl Bidder for MarginalBidder {
    fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    fn bid(&mut self, state: &AuctionState, _history: &[AuctionResult]) -> Bid {
        Bid::new(self.agent_id, self.shading * state.private_value)
    }
}

impl MultiItemBidder for MarginalBidder {
    fn item_bids(
        &mut self,
        state: &MultiItemAuctionState<'_>,
        _history: &[MultiItemAuctionResult],
    ) -> Vec<ItemBid> {
        let model = state.valuation_model.unwrap_or(&ADDITIVE);
        let bundle: BTreeSet<ItemId> = state.items.iter().map(|i| i.item_id).collect();

        state
            .items
            .iter()
            .map(|item| {
                let marginal: Price =
                    model.marginal_value(item.item_id, &bundle, state.private_values);
                ItemBid::new(self.agent_id, item.item_id, self.shading * marginal)
            })
            .collect()
    }
}
