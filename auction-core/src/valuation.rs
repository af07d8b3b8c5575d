//! Bundle valuation models.
//!
//! A model turns a set of items plus per-item base values into one bundle value.
//! Models are pure: missing base values count as 0.0 and the empty bundle is
//! always worth 0.0. Configuration is validated once, at construction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{AuctionError, Result};
use crate::types::{ItemId, Price};

fn base_value(base_values: &BTreeMap<ItemId, Price>, item: ItemId) -> Price {
    base_values.get(&item).copied().unwrap_or(0.0)
}

fn additive_value(bundle: &BTreeSet<ItemId>, base_values: &BTreeMap<ItemId, Price>) -> Price {
    bundle.iter().map(|&item| base_value(base_values, item)).sum()
}

// ============================================================================
// Model enum
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValuationModel {
    /// Sum of base values.
    #[default]
    Additive,
    /// Complements: configured pairs add a bonus when held together.
    Synergy(SynergyValuation),
    /// Overlapping needs: within a group only the best item counts.
    Substitutes(SubstitutesValuation),
}

impl ValuationModel {
    pub fn synergy(
        synergies: impl IntoIterator<Item = (BTreeSet<ItemId>, Price)>,
    ) -> Result<Self> {
        SynergyValuation::new(synergies).map(ValuationModel::Synergy)
    }

    pub fn substitutes(groups: impl IntoIterator<Item = BTreeSet<ItemId>>) -> Self {
        ValuationModel::Substitutes(SubstitutesValuation::new(groups))
    }

    pub fn bundle_value(
        &self,
        bundle: &BTreeSet<ItemId>,
        base_values: &BTreeMap<ItemId, Price>,
    ) -> Price {
        match self {
            ValuationModel::Additive => additive_value(bundle, base_values),
            ValuationModel::Synergy(model) => model.bundle_value(bundle, base_values),
            ValuationModel::Substitutes(model) => model.bundle_value(bundle, base_values),
        }
    }

    /// Value `item` adds on top of the rest of `bundle`.
    ///
    /// Whether `bundle` already holds `item` does not matter: the result is
    /// `v(bundle ∪ {item}) - v(bundle \ {item})`.
    pub fn marginal_value(
        &self,
        item: ItemId,
        bundle: &BTreeSet<ItemId>,
        base_values: &BTreeMap<ItemId, Price>,
    ) -> Price {
        let mut with = bundle.clone();
        with.insert(item);
        let mut without = bundle.clone();
        without.remove(&item);
        self.bundle_value(&with, base_values) - self.bundle_value(&without, base_values)
    }
}

// ============================================================================
// Synergy
// ============================================================================

/// Serialized form of a synergy entry: `{"items": [0, 1], "bonus": 5.0}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyEntry {
    pub items: Vec<ItemId>,
    pub bonus: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergySpec {
    pub synergies: Vec<SynergyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SynergySpec", into = "SynergySpec")]
pub struct SynergyValuation {
    /// Keyed by `(low, high)` with `low < high`.
    pairs: BTreeMap<(ItemId, ItemId), Price>,
}

impl SynergyValuation {
    /// Fails if any key is not exactly two distinct items or any bonus is negative.
    ///
    /// Keys are unordered pairs: a pair given more than once keeps its last bonus.
    pub fn new(synergies: impl IntoIterator<Item = (BTreeSet<ItemId>, Price)>) -> Result<Self> {
        let mut pairs = BTreeMap::new();
        for (items, bonus) in synergies {
            let mut ids = items.iter().copied();
            let (Some(low), Some(high), None) = (ids.next(), ids.next(), ids.next()) else {
                return Err(AuctionError::NonPairwiseSynergy { size: items.len() });
            };
            if bonus < 0.0 || bonus.is_nan() {
                return Err(AuctionError::NegativeSynergyBonus { bonus });
            }
            pairs.insert((low, high), bonus);
        }
        Ok(Self { pairs })
    }

    pub fn bonus_for(&self, a: ItemId, b: ItemId) -> Price {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.pairs.get(&key).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn bundle_value(
        &self,
        bundle: &BTreeSet<ItemId>,
        base_values: &BTreeMap<ItemId, Price>,
    ) -> Price {
        let bonuses: Price = self
            .pairs
            .iter()
            .filter(|((low, high), _)| bundle.contains(low) && bundle.contains(high))
            .map(|(_, bonus)| bonus)
            .sum();
        additive_value(bundle, base_values) + bonuses
    }
}

impl TryFrom<SynergySpec> for SynergyValuation {
    type Error = AuctionError;

    fn try_from(spec: SynergySpec) -> Result<Self> {
        SynergyValuation::new(
            spec.synergies
                .into_iter()
                .map(|entry| (entry.items.into_iter().collect(), entry.bonus)),
        )
    }
}

impl From<SynergyValuation> for SynergySpec {
    fn from(model: SynergyValuation) -> Self {
        SynergySpec {
            synergies: model
                .pairs
                .into_iter()
                .map(|((low, high), bonus)| SynergyEntry {
                    items: vec![low, high],
                    bonus,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Substitutes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubstitutesValuation {
    groups: Vec<BTreeSet<ItemId>>,
}

impl SubstitutesValuation {
    pub fn new(groups: impl IntoIterator<Item = BTreeSet<ItemId>>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
        }
    }

    pub fn groups(&self) -> &[BTreeSet<ItemId>] {
        &self.groups
    }

    pub fn bundle_value(
        &self,
        bundle: &BTreeSet<ItemId>,
        base_values: &BTreeMap<ItemId, Price>,
    ) -> Price {
        let mut claimed = BTreeSet::new();
        let mut total = 0.0;

        // Groups are independent: overlapping members feed every group they sit in.
        for group in &self.groups {
            let best = group
                .intersection(bundle)
                .map(|&item| {
                    claimed.insert(item);
                    base_value(base_values, item)
                })
                .reduce(Price::max);
            if let Some(best) = best {
                total += best;
            }
        }

        total
            + bundle
                .difference(&claimed)
                .map(|&item| base_value(base_values, item))
                .sum::<Price>()
    }
}
