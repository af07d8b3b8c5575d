use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::agents::RandomBidder;
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::report::{bid_rows, item_rows, utility_by_agent};
use crate::simulation::{MultiItemSimulation, Simulation};

// ============================================================================
// WASM API - Single item
// ============================================================================

/// Random-bidder auction driven from JS.
///
/// Bidder `i` gets id `i` and seed `value_seed + BIDDER_SEED_OFFSET + i`, so a
/// config string fully determines the run.
#[wasm_bindgen]
pub struct AuctionSimulation {
    config: SimulationConfig,
    inner: Simulation<RandomBidder>,
}

const BIDDER_SEED_OFFSET: u64 = 1_000;

/// Plain objects rather than ES `Map`s, so results read like their JSON form.
fn to_js<T: Serialize + ?Sized>(value: &T) -> std::result::Result<JsValue, JsError> {
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

#[wasm_bindgen]
impl AuctionSimulation {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, bidders: u32) -> std::result::Result<AuctionSimulation, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();
        Ok(Self::from_json(config_json, bidders)?)
    }

    /// Run the configured number of rounds; returns completed rounds.
    #[wasm_bindgen]
    pub fn run(&mut self) -> std::result::Result<u32, JsError> {
        Ok(self.advance(self.config.rounds)?)
    }

    #[wasm_bindgen]
    pub fn run_rounds(&mut self, rounds: u32) -> std::result::Result<u32, JsError> {
        Ok(self.advance(rounds)?)
    }

    /// Completed rounds so far.
    #[wasm_bindgen]
    pub fn round(&self) -> u32 {
        self.inner.history().len() as u32
    }

    #[wasm_bindgen]
    pub fn history(&self) -> std::result::Result<JsValue, JsError> {
        to_js(self.inner.history())
    }

    /// Per-round bid rows, the shape written to CSV by native runs.
    #[wasm_bindgen]
    pub fn bid_rows(&self) -> std::result::Result<JsValue, JsError> {
        to_js(&bid_rows(self.inner.history()))
    }

    #[wasm_bindgen]
    pub fn utility_by_agent(&self) -> std::result::Result<JsValue, JsError> {
        let totals = utility_by_agent(&bid_rows(self.inner.history()));
        to_js(&totals)
    }
}

impl AuctionSimulation {
    pub fn from_json(config_json: &str, bidders: u32) -> Result<Self> {
        let config = SimulationConfig::from_json_str(config_json)?;
        let seed = config.value_seed.wrapping_add(BIDDER_SEED_OFFSET);
        let roster = RandomBidder::roster(0, bidders, seed);
        let inner = Simulation::from_config(&config, roster)?;
        Ok(Self { config, inner })
    }

    pub fn advance(&mut self, rounds: u32) -> Result<u32> {
        self.inner.run(rounds)?;
        Ok(self.round())
    }

    pub fn simulation(&self) -> &Simulation<RandomBidder> {
        &self.inner
    }
}

// ============================================================================
// WASM API - Multi item
// ============================================================================

#[wasm_bindgen]
pub struct MultiItemAuction {
    config: SimulationConfig,
    inner: MultiItemSimulation<RandomBidder>,
}

#[wasm_bindgen]
impl MultiItemAuction {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, bidders: u32) -> std::result::Result<MultiItemAuction, JsError> {
        console_error_panic_hook::set_once();
        Ok(Self::from_json(config_json, bidders)?)
    }

    #[wasm_bindgen]
    pub fn run(&mut self) -> std::result::Result<u32, JsError> {
        Ok(self.advance(self.config.rounds)?)
    }

    #[wasm_bindgen]
    pub fn run_rounds(&mut self, rounds: u32) -> std::result::Result<u32, JsError> {
        Ok(self.advance(rounds)?)
    }

    #[wasm_bindgen]
    pub fn round(&self) -> u32 {
        self.inner.history().len() as u32
    }

    #[wasm_bindgen]
    pub fn history(&self) -> std::result::Result<JsValue, JsError> {
        to_js(self.inner.history())
    }

    #[wasm_bindgen]
    pub fn item_rows(&self) -> std::result::Result<JsValue, JsError> {
        to_js(&item_rows(self.inner.history()))
    }
}

impl MultiItemAuction {
    pub fn from_json(config_json: &str, bidders: u32) -> Result<Self> {
        let config = SimulationConfig::from_json_str(config_json)?;
        let seed = config.value_seed.wrapping_add(BIDDER_SEED_OFFSET);
        let roster = RandomBidder::roster(0, bidders, seed);
        let inner = MultiItemSimulation::from_config(&config, roster)?;
        Ok(Self { config, inner })
    }

    pub fn advance(&mut self, rounds: u32) -> Result<u32> {
        self.inner.run(rounds)?;
        Ok(self.round())
    }

    pub fn simulation(&self) -> &MultiItemSimulation<RandomBidder> {
        &self.inner
    }
}
