//! The bidding contract between the orchestrator and strategies.
//!
//! Every strategy implements [`Bidder`]. Strategies that can also take part in
//! multi-item rounds implement [`MultiItemBidder`]; `MultiItemSimulation` only
//! accepts rosters of those, so an unsupported agent is rejected when the
//! simulation is built rather than when it is first asked to bid.

use crate::types::{
    AgentId, AuctionResult, AuctionState, Bid, ItemBid, MultiItemAuctionResult,
    MultiItemAuctionState,
};

pub trait Bidder {
    fn agent_id(&self) -> AgentId;

    /// One sealed bid for the current round.
    ///
    /// `history` holds every earlier round in order; the current round's other
    /// bids are never visible. The returned `agent_id` must equal
    /// `state.agent_id`. Any amount is accepted: `<= 0` sits the round out and
    /// bidding above the private value is allowed.
    fn bid(&mut self, state: &AuctionState, history: &[AuctionResult]) -> Bid;
}

pub trait MultiItemBidder: Bidder {
    /// Bids for any subset of `state.items`, at most one per item expected.
    ///
    /// Every returned bid must carry this agent's id and an item id from
    /// `state.items`.
    fn item_bids(
        &mut self,
        state: &MultiItemAuctionState<'_>,
        history: &[MultiItemAuctionResult],
    ) -> Vec<ItemBid>;
}

impl<B: Bidder + ?Sized> Bidder for Box<B> {
    fn agent_id(&self) -> AgentId {
        (**self).agent_id()
    }

    fn bid(&mut self, state: &AuctionState, history: &[AuctionResult]) -> Bid {
        (**self).bid(state, history)
    }
}

impl<B: MultiItemBidder + ?Sized> MultiItemBidder for Box<B> {
    fn item_bids(
        &mut self,
        state: &MultiItemAuctionState<'_>,
        history: &[MultiItemAuctionResult],
    ) -> Vec<ItemBid> {
        (**self).item_bids(state, history)
    }
}
