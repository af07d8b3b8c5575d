//! End-to-end runs through the public orchestrator API.

use std::collections::BTreeSet;

use auction_core::agents::{MarginalBidder, RandomBidder};
use auction_core::{
    AgentId, AuctionError, AuctionResult, AuctionState, Bid, Bidder, Item, ItemBid,
    MultiItemAuctionResult, MultiItemAuctionState, MultiItemBidder, MultiItemSimulation,
    PRIVATE_VALUE_MAX, PRIVATE_VALUE_MIN, Simulation, SimulationConfig, ValuationModel, bid_rows,
    utility_by_agent,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

const SEEDS: [u64; 5] = [3, 7, 19, 42, 2026];

// === TEST FIXTURES ===

/// Bids its full value and remembers which rounds of history it was shown.
struct Truthful {
    id: AgentId,
    seen: Vec<Vec<u32>>,
}

impl Truthful {
    fn new(id: AgentId) -> Self {
        Self {
            id,
            seen: Vec::new(),
        }
    }
}

impl Bidder for Truthful {
    fn agent_id(&self) -> AgentId {
        self.id
    }

    fn bid(&mut self, state: &AuctionState, history: &[AuctionResult]) -> Bid {
        self.seen.push(history.iter().map(|r| r.round_number).collect());
        Bid::new(self.id, state.private_value)
    }
}

/// Claims to be someone else from `from_round` on.
struct Impostor {
    id: AgentId,
    from_round: u32,
}

impl Bidder for Impostor {
    fn agent_id(&self) -> AgentId {
        self.id
    }

    fn bid(&mut self, state: &AuctionState, _history: &[AuctionResult]) -> Bid {
        let id = if state.round_number >= self.from_round {
            self.id + 100
        } else {
            self.id
        };
        Bid::new(id, 1.0)
    }
}

impl MultiItemBidder for Impostor {
    fn item_bids(
        &mut self,
        state: &MultiItemAuctionState<'_>,
        _history: &[MultiItemAuctionResult],
    ) -> Vec<ItemBid> {
        // Bids on an item that is not for sale
        vec![ItemBid::new(self.id, state.items.len() as u32 + 5, 1.0)]
    }
}

fn random_history(seed: u64, agents: u32, rounds: u32) -> Vec<AuctionResult> {
    let config = SimulationConfig::with_seed(seed);
    let roster = RandomBidder::roster(0, agents, seed * 31);
    let mut sim = Simulation::from_config(&config, roster).unwrap();
    sim.run(rounds).unwrap();
    sim.into_history()
}

// === SINGLE ITEM ===

#[test]
fn three_agents_five_rounds() {
    let roster = vec![Truthful::new(0), Truthful::new(1), Truthful::new(2)];
    let mut sim = Simulation::from_config(&SimulationConfig::with_seed(42), roster).unwrap();

    let history = sim.run(5).unwrap();
    assert_eq!(history.len(), 5);
    for (i, result) in history.iter().enumerate() {
        assert_eq!(result.round_number, i as u32 + 1);
        assert_eq!(result.auction_id, 1);
        assert_eq!(result.all_bids.len(), 3);
        assert_eq!(result.private_values.len(), 3);
        assert!(result.winning_agent_id.is_some());
    }

    for agent in sim.roster() {
        assert_eq!(agent.seen.len(), 5);
        for (r, seen) in agent.seen.iter().enumerate() {
            let prior: Vec<u32> = (1..=r as u32).collect();
            assert_eq!(*seen, prior, "round {} sees rounds 1..{}", r + 1, r + 1);
        }
    }
}

#[test]
fn truthful_winner_has_the_highest_value() {
    let roster: Vec<Truthful> = (0..4).map(Truthful::new).collect();
    let mut sim = Simulation::from_config(&SimulationConfig::with_seed(8), roster).unwrap();

    for result in sim.run(20).unwrap() {
        let (&best, _) = result
            .private_values
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(result.winning_agent_id, Some(best));
        assert_eq!(result.winning_bid, result.private_values[&best]);
    }
}

#[test]
fn private_values_stay_in_range() {
    for seed in SEEDS {
        for result in random_history(seed, 6, 30) {
            for value in result.private_values.values() {
                assert!((PRIVATE_VALUE_MIN..PRIVATE_VALUE_MAX).contains(value));
            }
            for bid in &result.all_bids {
                assert!(bid.bid_amount <= result.private_values[&bid.agent_id]);
            }
        }
    }
}

#[test]
fn identical_seeds_give_identical_histories() {
    for seed in SEEDS {
        let a = serde_json::to_string(&random_history(seed, 4, 25)).unwrap();
        let b = serde_json::to_string(&random_history(seed, 4, 25)).unwrap();
        assert_eq!(a, b, "seed {seed} diverged");
    }

    assert_ne!(random_history(1, 4, 10), random_history(2, 4, 10));
}

#[test]
fn split_runs_continue_numbering() {
    let config = SimulationConfig::with_seed(77);
    let mut split = Simulation::from_config(&config, RandomBidder::roster(0, 3, 5)).unwrap();
    split.run(4).unwrap();
    split.run(6).unwrap();

    let mut whole = Simulation::from_config(&config, RandomBidder::roster(0, 3, 5)).unwrap();
    whole.run(10).unwrap();

    assert_eq!(split.history(), whole.history());
    assert_eq!(split.next_round(), 11);
}

#[test]
fn wrong_agent_id_fails_the_round_and_keeps_history() {
    let roster: Vec<Box<dyn Bidder>> = vec![
        Box::new(Truthful::new(0)),
        Box::new(Impostor { id: 1, from_round: 3 }),
    ];
    let mut sim = Simulation::from_config(&SimulationConfig::default(), roster).unwrap();

    let err = sim.run(5).unwrap_err();
    assert_eq!(
        err,
        AuctionError::AgentIdMismatch {
            round: 3,
            expected: 1,
            actual: 101
        }
    );
    assert!(err.is_contract_violation());
    assert_eq!(sim.history().len(), 2);
}

#[test]
fn duplicate_agents_are_rejected_up_front() {
    let roster = vec![Truthful::new(4), Truthful::new(4)];
    let err = Simulation::from_config(&SimulationConfig::default(), roster)
        .err()
        .unwrap();
    assert_eq!(err, AuctionError::DuplicateAgent { agent_id: 4 });
    assert!(err.is_configuration());
}

#[test]
fn report_totals_match_history() {
    let history = random_history(42, 3, 25);
    let rows = bid_rows(&history);
    assert_eq!(rows.len(), 75);

    let totals = utility_by_agent(&rows);
    let by_hand: f64 = history
        .iter()
        .filter_map(|r| {
            let winner = r.winning_agent_id?;
            Some(r.winning_bid - r.private_values[&winner])
        })
        .sum();
    let reported: f64 = totals.values().sum();
    assert!((reported - by_hand).abs() < 1e-9);
}

// === MULTI ITEM ===

#[test]
fn multi_item_rounds_cover_every_item() {
    let config = SimulationConfig {
        items: 4,
        ..SimulationConfig::with_seed(12)
    };
    let roster = RandomBidder::roster(0, 3, 99);
    let mut sim = MultiItemSimulation::from_config(&config, roster).unwrap();

    for result in sim.run(10).unwrap() {
        assert_eq!(result.allocations.len(), 4);
        assert_eq!(result.prices.len(), 4);
        assert_eq!(result.all_bids.len(), 12);
        for values in result.private_values.values() {
            assert_eq!(values.len(), 4);
        }
        for (item, winner) in &result.allocations {
            if winner.is_none() {
                assert_eq!(result.prices[item], 0.0);
            }
        }
    }
}

#[test]
fn multi_item_runs_are_reproducible() {
    let config = SimulationConfig {
        items: 3,
        valuation: Some(ValuationModel::substitutes([BTreeSet::from([0, 1])])),
        ..SimulationConfig::with_seed(5)
    };
    let run = || {
        let roster = vec![MarginalBidder::new(0, 0.9), MarginalBidder::new(1, 0.7)];
        let mut sim = MultiItemSimulation::from_config(&config, roster).unwrap();
        sim.run(15).unwrap();
        serde_json::to_string(sim.history()).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn marginal_bidders_shade_substitutes() {
    let config = SimulationConfig {
        items: 2,
        valuation: Some(ValuationModel::substitutes([BTreeSet::from([0, 1])])),
        ..SimulationConfig::with_seed(3)
    };
    let mut sim =
        MultiItemSimulation::from_config(&config, vec![MarginalBidder::new(0, 1.0)]).unwrap();

    for result in sim.run(10).unwrap() {
        let values = &result.private_values[&0];
        let (low, high) = (values[&0].min(values[&1]), values[&0].max(values[&1]));
        let mut amounts: Vec<f64> = result.all_bids.iter().map(|b| b.bid_amount).collect();
        amounts.sort_by(f64::total_cmp);
        assert_eq!(amounts, vec![0.0, high - low]);
    }
}

#[test]
fn unknown_item_fails_the_round() {
    let roster = vec![Impostor { id: 2, from_round: u32::MAX }];
    let mut sim = MultiItemSimulation::from_config(&SimulationConfig::default(), roster).unwrap();

    let err = sim.run_round().unwrap_err();
    assert_eq!(
        err,
        AuctionError::UnknownItem {
            round: 1,
            agent_id: 2,
            item_id: 8
        }
    );
    assert!(sim.history().is_empty());
}

#[test]
fn duplicate_items_are_rejected() {
    let items = vec![Item::new(0), Item::named(0, "again")];
    let err = MultiItemSimulation::new(
        1,
        items,
        None,
        RandomBidder::roster(0, 2, 0),
        StdRng::seed_from_u64(1),
        StdRng::seed_from_u64(1),
    )
    .err()
    .unwrap();
    assert_eq!(err, AuctionError::DuplicateItem { item_id: 0 });
}
