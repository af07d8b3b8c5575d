//! Round orchestration.
//!
//! A simulation owns a fixed roster, two RNG streams and an append-only
//! history. Each round:
//!
//! 1. draw private values (value stream, roster order, then item order)
//! 2. ask every agent for bids (roster order, prior history only)
//! 3. validate and clear (tie stream, item order)
//! 4. attach private values and append to history
//!
//! Identical seeds, rosters and agent logic produce identical histories.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::bidder::{Bidder, MultiItemBidder};
use crate::clearing::{clear_multi_item, clear_single_item};
use crate::config::{PRIVATE_VALUE_MAX, PRIVATE_VALUE_MIN, SimulationConfig};
use crate::error::{AuctionError, Result};
use crate::types::{
    AgentId, AuctionResult, AuctionState, Item, ItemBid, ItemId, MultiItemAuctionResult,
    MultiItemAuctionState, Price,
};
use crate::valuation::ValuationModel;

fn check_unique_agents(ids: impl Iterator<Item = AgentId>) -> Result<()> {
    let mut seen = HashSet::new();
    for agent_id in ids {
        if !seen.insert(agent_id) {
            return Err(AuctionError::DuplicateAgent { agent_id });
        }
    }
    Ok(())
}

fn check_unique_items(items: &[Item]) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.item_id) {
            return Err(AuctionError::DuplicateItem {
                item_id: item.item_id,
            });
        }
    }
    Ok(())
}

fn draw_private_value<R: Rng>(rng: &mut R) -> Price {
    rng.random_range(PRIVATE_VALUE_MIN..PRIVATE_VALUE_MAX)
}

// ============================================================================
// Single item
// ============================================================================

pub struct Simulation<B, R = StdRng> {
    auction_id: u32,
    roster: Vec<B>,
    value_rng: R,
    tie_rng: R,
    history: Vec<AuctionResult>,
}

impl<B: Bidder> Simulation<B, StdRng> {
    /// Seed both streams from `config`.
    pub fn from_config(config: &SimulationConfig, roster: Vec<B>) -> Result<Self> {
        Self::new(
            config.auction_id,
            roster,
            StdRng::seed_from_u64(config.value_seed),
            StdRng::seed_from_u64(config.tie_break_seed()),
        )
    }
}

impl<B: Bidder, R: Rng> Simulation<B, R> {
    /// Fails if two agents share an id.
    pub fn new(auction_id: u32, roster: Vec<B>, value_rng: R, tie_rng: R) -> Result<Self> {
        check_unique_agents(roster.iter().map(Bidder::agent_id))?;
        Ok(Self {
            auction_id,
            roster,
            value_rng,
            tie_rng,
            history: Vec::new(),
        })
    }

    pub fn auction_id(&self) -> u32 {
        self.auction_id
    }

    pub fn roster(&self) -> &[B] {
        &self.roster
    }

    pub fn history(&self) -> &[AuctionResult] {
        &self.history
    }

    pub fn into_history(self) -> Vec<AuctionResult> {
        self.history
    }

    /// Number the next round will carry.
    pub fn next_round(&self) -> u32 {
        self.history.len() as u32 + 1
    }

    /// Run one round and return its result.
    ///
    /// A contract violation fails the round: nothing is appended and the error
    /// is returned. Both RNG streams have still advanced.
    pub fn run_round(&mut self) -> Result<&AuctionResult> {
        let round_number = self.next_round();

        let states: Vec<AuctionState> = self
            .roster
            .iter()
            .map(|agent| AuctionState {
                agent_id: agent.agent_id(),
                private_value: draw_private_value(&mut self.value_rng),
                round_number,
            })
            .collect();

        let mut bids = Vec::with_capacity(self.roster.len());
        for (agent, state) in self.roster.iter_mut().zip(&states) {
            let bid = agent.bid(state, &self.history);
            if bid.agent_id != state.agent_id {
                return Err(AuctionError::AgentIdMismatch {
                    round: round_number,
                    expected: state.agent_id,
                    actual: bid.agent_id,
                });
            }

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "bid",
                round = round_number,
                agent_id = state.agent_id,
                private_value = state.private_value,
                bid_amount = bid.bid_amount,
            );

            bids.push(bid);
        }

        let mut result = clear_single_item(&bids, self.auction_id, &mut self.tie_rng, round_number);
        result.private_values = states
            .iter()
            .map(|s| (s.agent_id, s.private_value))
            .collect();

        self.history.push(result);
        Ok(&self.history[self.history.len() - 1])
    }

    /// Run `rounds` more rounds and return the whole history.
    pub fn run(&mut self, rounds: u32) -> Result<&[AuctionResult]> {
        for _ in 0..rounds {
            self.run_round()?;
        }
        Ok(&self.history)
    }
}

// ============================================================================
// Multi item
// ============================================================================

pub struct MultiItemSimulation<B, R = StdRng> {
    auction_id: u32,
    items: Vec<Item>,
    item_ids: BTreeSet<ItemId>,
    valuation_model: Option<ValuationModel>,
    roster: Vec<B>,
    value_rng: R,
    tie_rng: R,
    history: Vec<MultiItemAuctionResult>,
}

impl<B: MultiItemBidder> MultiItemSimulation<B, StdRng> {
    /// Seed both streams from `config`; items and valuation model come from it too.
    pub fn from_config(config: &SimulationConfig, roster: Vec<B>) -> Result<Self> {
        Self::new(
            config.auction_id,
            Item::sequence(config.items),
            config.valuation.clone(),
            roster,
            StdRng::seed_from_u64(config.value_seed),
            StdRng::seed_from_u64(config.tie_break_seed()),
        )
    }
}

impl<B: MultiItemBidder, R: Rng> MultiItemSimulation<B, R> {
    /// Fails on duplicate item ids or duplicate agent ids.
    pub fn new(
        auction_id: u32,
        items: Vec<Item>,
        valuation_model: Option<ValuationModel>,
        roster: Vec<B>,
        value_rng: R,
        tie_rng: R,
    ) -> Result<Self> {
        check_unique_items(&items)?;
        check_unique_agents(roster.iter().map(Bidder::agent_id))?;
        let item_ids = items.iter().map(|i| i.item_id).collect();
        Ok(Self {
            auction_id,
            items,
            item_ids,
            valuation_model,
            roster,
            value_rng,
            tie_rng,
            history: Vec::new(),
        })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn valuation_model(&self) -> Option<&ValuationModel> {
        self.valuation_model.as_ref()
    }

    pub fn roster(&self) -> &[B] {
        &self.roster
    }

    pub fn history(&self) -> &[MultiItemAuctionResult] {
        &self.history
    }

    pub fn into_history(self) -> Vec<MultiItemAuctionResult> {
        self.history
    }

    pub fn next_round(&self) -> u32 {
        self.history.len() as u32 + 1
    }

    fn validate(&self, round: u32, agent_id: AgentId, bid: &ItemBid) -> Result<()> {
        if bid.agent_id != agent_id {
            return Err(AuctionError::AgentIdMismatch {
                round,
                expected: agent_id,
                actual: bid.agent_id,
            });
        }
        if !self.item_ids.contains(&bid.item_id) {
            return Err(AuctionError::UnknownItem {
                round,
                agent_id,
                item_id: bid.item_id,
            });
        }
        Ok(())
    }

    /// Run one round; same failure semantics as [`Simulation::run_round`].
    pub fn run_round(&mut self) -> Result<&MultiItemAuctionResult> {
        let round_number = self.next_round();

        let mut private_values: BTreeMap<AgentId, BTreeMap<ItemId, Price>> = BTreeMap::new();
        for agent in &self.roster {
            let values: BTreeMap<ItemId, Price> = self
                .items
                .iter()
                .map(|item| (item.item_id, draw_private_value(&mut self.value_rng)))
                .collect();

            #[cfg(feature = "instrument")]
            for (item_id, value) in &values {
                tracing::info!(
                    target: "valuation",
                    round = round_number,
                    agent_id = agent.agent_id(),
                    item_id = *item_id,
                    private_value = *value,
                );
            }

            private_values.insert(agent.agent_id(), values);
        }

        let mut bids: Vec<ItemBid> = Vec::new();
        for index in 0..self.roster.len() {
            let agent_id = self.roster[index].agent_id();
            let state = MultiItemAuctionState {
                agent_id,
                round_number,
                items: &self.items,
                private_values: &private_values[&agent_id],
                valuation_model: self.valuation_model.as_ref(),
            };
            let agent_bids = self.roster[index].item_bids(&state, &self.history);

            for bid in &agent_bids {
                self.validate(round_number, agent_id, bid)?;

                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "item_bid",
                    round = round_number,
                    agent_id = agent_id,
                    item_id = bid.item_id,
                    bid_amount = bid.bid_amount,
                );
            }
            bids.extend(agent_bids);
        }

        let mut result = clear_multi_item(
            &bids,
            &self.items,
            self.auction_id,
            &mut self.tie_rng,
            round_number,
        );
        result.private_values = private_values;

        self.history.push(result);
        Ok(&self.history[self.history.len() - 1])
    }

    pub fn run(&mut self, rounds: u32) -> Result<&[MultiItemAuctionResult]> {
        for _ in 0..rounds {
            self.run_round()?;
        }
        Ok(&self.history)
    }
}
