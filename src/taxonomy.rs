use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Taxonomic ranks the game reveals, coarsest first.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TaxonomyRank {
    Order,
    Family,
    Genus,
}

impl TaxonomyRank {
    pub const ALL: [TaxonomyRank; 3] = [TaxonomyRank::Order, TaxonomyRank::Family, TaxonomyRank::Genus];

    pub fn query_key(&self) -> &'static str {
        match self {
            TaxonomyRank::Order => "order",
            TaxonomyRank::Family => "family",
            TaxonomyRank::Genus => "genus",
        }
    }
}

impl fmt::Display for TaxonomyRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomyRank::Order => write!(f, "Order"),
            TaxonomyRank::Family => write!(f, "Family"),
            TaxonomyRank::Genus => write!(f, "Genus"),
        }
    }
}

/// Order/family/genus of the answer as far as it has been revealed.
///
/// Doubles as the wire shape of the `taxonomy` fragment in guess responses
/// and as the filter attached to suggestion queries; unset ranks are omitted
/// when serialized.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TaxonomyState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
}

impl TaxonomyState {
    pub fn get(&self, rank: TaxonomyRank) -> Option<&str> {
        let slot = match rank {
            TaxonomyRank::Order => &self.order,
            TaxonomyRank::Family => &self.family,
            TaxonomyRank::Genus => &self.genus,
        };
        slot.as_deref().filter(|value| !value.is_empty())
    }

    fn slot_mut(&mut self, rank: TaxonomyRank) -> &mut Option<String> {
        match rank {
            TaxonomyRank::Order => &mut self.order,
            TaxonomyRank::Family => &mut self.family,
            TaxonomyRank::Genus => &mut self.genus,
        }
    }

    /// Present ranks, coarsest first.
    pub fn fields(&self) -> impl Iterator<Item = (TaxonomyRank, &str)> + '_ {
        TaxonomyRank::ALL
            .into_iter()
            .filter_map(move |rank| self.get(rank).map(|value| (rank, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }
}

/// Accumulates the taxonomy revealed over a session.
///
/// Each rank is write-once: the first non-empty value sticks for the rest of
/// the session.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyFilter {
    state: TaxonomyState,
}

impl TaxonomyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the present ranks of `partial`; absent or empty ranks are ignored.
    pub fn update(&mut self, partial: &TaxonomyState) {
        for rank in TaxonomyRank::ALL {
            let Some(revealed) = partial.get(rank) else {
                continue;
            };
            let slot = self.state.slot_mut(rank);
            match slot.as_deref() {
                None => *slot = Some(revealed.to_string()),
                Some(known) if known == revealed => {}
                Some(known) => {
                    warn!(%rank, known, revealed, "ignoring conflicting taxonomy reveal");
                }
            }
        }
    }

    /// The currently known ranks as a suggestion query filter.
    pub fn current_filter(&self) -> TaxonomyState {
        self.state.clone()
    }

    pub fn state(&self) -> &TaxonomyState {
        &self.state
    }
}
