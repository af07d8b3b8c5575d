//! Uniform random bidding, the baseline every strategy is compared against.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bidder::{Bidder, MultiItemBidder};
use crate::types::{
    AgentId, AuctionResult, AuctionState, Bid, ItemBid, MultiItemAuctionResult,
    MultiItemAuctionState, Price,
};

/// Bids uniformly in `[0, value]`, ignoring history.
#[derive(Debug, Clone)]
pub struct RandomBidder {
    agent_id: AgentId,
    rng: StdRng,
}

impl RandomBidder {
    pub fn new(agent_id: AgentId, seed: u64) -> Self {
        Self {
            agent_id,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `count` bidders with ids `first_id..` and seeds `base_seed + offset`.
    pub fn roster(first_id: AgentId, count: u32, base_seed: u64) -> Vec<RandomBidder> {
        (0..count)
            .map(|i| RandomBidder::new(first_id + i, base_seed.wrapping_add(u64::from(i))))
            .collect()
    }

    fn draw_up_to(&mut self, value: Price) -> Price {
        if value > 0.0 {
            self.rng.random_range(0.0..=value)
        } else {
            0.0
        }
    }
}

impl Bidder for RandomBidder {
    fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    fn bid(&mut self, state: &AuctionState, _history: &[AuctionResult]) -> Bid {
        Bid::new(self.agent_id, self.draw_up_to(state.private_value))
    }
}

impl MultiItemBidder for RandomBidder {
    fn item_bids(
        &mut self,
        state: &MultiItemAuctionState<'_>,
        _history: &[MultiItemAuctionResult],
    ) -> Vec<ItemBid> {
        state
            .items
            .iter()
            .map(|item| {
                let amount = self.draw_up_to(state.base_value(item.item_id));
                ItemBid::new(self.agent_id, item.item_id, amount)
            })
            .collect()
    }
}
