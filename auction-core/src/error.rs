//! Error types for auction simulation.
//!
//! Clearing and valuation are total and never fail. Errors come from two places:
//! building a model or simulation from bad configuration, and agents that break
//! the bidding contract mid-run.

use thiserror::Error;

use crate::types::{AgentId, ItemId, Price};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuctionError {
    // === Configuration ===
    #[error("synergies must be pairwise, got a set of {size} distinct items")]
    NonPairwiseSynergy { size: usize },
    #[error("synergy bonus must be non-negative, got {bonus}")]
    NegativeSynergyBonus { bonus: Price },
    #[error("item {item_id} appears more than once in the item set")]
    DuplicateItem { item_id: ItemId },
    #[error("agent {agent_id} appears more than once in the roster")]
    DuplicateAgent { agent_id: AgentId },
    #[error("configuration error: {0}")]
    Config(String),

    // === Contract violations ===
    #[error("round {round}: agent {expected} returned a bid for agent {actual}")]
    AgentIdMismatch {
        round: u32,
        expected: AgentId,
        actual: AgentId,
    },
    #[error("round {round}: agent {agent_id} bid on unknown item {item_id}")]
    UnknownItem {
        round: u32,
        agent_id: AgentId,
        item_id: ItemId,
    },
}

impl AuctionError {
    /// True for errors raised while building models or simulations.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AuctionError::NonPairwiseSynergy { .. }
                | AuctionError::NegativeSynergyBonus { .. }
                | AuctionError::DuplicateItem { .. }
                | AuctionError::DuplicateAgent { .. }
                | AuctionError::Config(_)
        )
    }

    /// True for errors caused by an agent breaking the bidding contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            AuctionError::AgentIdMismatch { .. } | AuctionError::UnknownItem { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AuctionError>;
