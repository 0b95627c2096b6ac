//! Species label set and taxonomy resolution.
//!
//! The taxonomy classifier speaks an open vocabulary: each prediction is a
//! semicolon-joined taxon string
//! (`id;class;order;family;genus;species;common_name`). This module collapses
//! that vocabulary onto the closed label set the rest of the system works
//! with, using an ordered decision list over curated tables, and rescues
//! near-miss predictions by aggregating ranked alternatives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed species label set.
///
/// Class ids are assigned by declaration order and are stable: they appear in
/// label files and in the dataset manifest, so reordering variants would
/// silently corrupt previously exported datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    /// European roe deer.
    RoeDeer,
    /// White-tailed deer (plus other large cervids pooled with it).
    WhiteTailedDeer,
    /// Hares and rabbits.
    Hare,
    /// Any bird.
    Birds,
    /// Raccoon dog.
    RaccoonDog,
    /// Red fox.
    Fox,
    /// Human.
    Human,
    /// Domestic dog.
    Dog,
    /// Recognized animal outside the label set.
    Other,
}

impl Species {
    /// All labels in class-id order.
    pub const ALL: [Self; 9] = [
        Self::RoeDeer,
        Self::WhiteTailedDeer,
        Self::Hare,
        Self::Birds,
        Self::RaccoonDog,
        Self::Fox,
        Self::Human,
        Self::Dog,
        Self::Other,
    ];

    /// Stable class id used in label files and the dataset manifest.
    #[must_use]
    pub fn class_id(self) -> usize {
        self as usize
    }

    /// Label for a discrete classifier class id. Ids outside the set map to
    /// [`Species::Other`].
    #[must_use]
    pub fn from_class_id(id: usize) -> Self {
        Self::ALL.get(id).copied().unwrap_or(Self::Other)
    }

    /// Snake-case label string as it appears in persisted records.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::RoeDeer => "roe_deer",
            Self::WhiteTailedDeer => "white_tailed_deer",
            Self::Hare => "hare",
            Self::Birds => "birds",
            Self::RaccoonDog => "raccoon_dog",
            Self::Fox => "fox",
            Self::Human => "human",
            Self::Dog => "dog",
            Self::Other => "other",
        }
    }

    /// Parse a label string as written by [`Species::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One ranked taxonomy classifier prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTaxon {
    /// Raw semicolon-joined taxon string.
    pub taxon: String,
    /// Classifier confidence in `[0, 1]`.
    pub score: f32,
}

/// Resolved species with the confidence backing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Resolved label.
    pub species: Species,
    /// Confidence; for a rescued label this is the aggregate over the
    /// alternatives that agreed on it.
    pub confidence: f32,
}

/// Fields of a taxon string, lowercased. Missing trailing fields are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TaxonFields {
    class: String,
    order: String,
    genus: String,
    species: String,
    common: String,
}

impl TaxonFields {
    /// Split `id;class;order;family;genus;species;common_name`. Malformed
    /// input is never an error; absent fields stay empty and resolution
    /// falls through to broader rules.
    fn parse(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        let mut parts = lowered.split(';').map(str::trim);
        let mut next = || parts.next().unwrap_or("").to_string();
        let _id = next();
        let class = next();
        let order = next();
        let _family = next();
        let genus = next();
        let species = next();
        let common = next();
        Self {
            class,
            order,
            genus,
            species,
            common,
        }
    }

    fn binomial(&self) -> Option<String> {
        if self.genus.is_empty() || self.species.is_empty() {
            None
        } else {
            Some(format!("{} {}", self.genus, self.species))
        }
    }
}

/// Taxonomic orders treated as birds.
const BIRD_ORDERS: &[&str] = &[
    "passeriformes",
    "anseriformes",
    "galliformes",
    "accipitriformes",
    "strigiformes",
    "charadriiformes",
];

fn binomial_species(binomial: &str) -> Option<Species> {
    let species = match binomial {
        "capreolus capreolus" => Species::RoeDeer,
        "odocoileus virginianus" | "cervus elaphus" | "dama dama" => Species::WhiteTailedDeer,
        "lepus europaeus" | "lepus timidus" => Species::Hare,
        "vulpes vulpes" => Species::Fox,
        "nyctereutes procyonoides" => Species::RaccoonDog,
        "homo sapiens" => Species::Human,
        "canis familiaris" | "canis lupus familiaris" => Species::Dog,
        // Regional species recognized by the classifier but outside the
        // label set; pinning them here keeps them from leaking through the
        // genus and order rules below.
        "alces alces" | "sus scrofa" | "lynx lynx" | "meles meles" | "mustela erminea"
        | "martes martes" | "sciurus vulgaris" | "lutra lutra" => Species::Other,
        _ => return None,
    };
    Some(species)
}

fn common_name_species(common: &str) -> Option<Species> {
    let species = match common {
        "roe deer" => Species::RoeDeer,
        "white-tailed deer" => Species::WhiteTailedDeer,
        "european hare" | "mountain hare" | "european rabbit" | "white-tailed jackrabbit" => {
            Species::Hare
        }
        "red fox" => Species::Fox,
        "raccoon dog" => Species::RaccoonDog,
        "human" => Species::Human,
        "domestic dog" | "dog" => Species::Dog,
        "moose" | "wild boar" | "eurasian lynx" | "european badger" => Species::Other,
        _ => return None,
    };
    Some(species)
}

fn genus_species(genus: &str) -> Option<Species> {
    let species = match genus {
        "capreolus" => Species::RoeDeer,
        "odocoileus" => Species::WhiteTailedDeer,
        "lepus" | "oryctolagus" => Species::Hare,
        "vulpes" => Species::Fox,
        "nyctereutes" => Species::RaccoonDog,
        "homo" => Species::Human,
        "canis" => Species::Dog,
        _ => return None,
    };
    Some(species)
}

/// Resolve a raw taxon string to a label.
///
/// Ordered decision list, first match wins: exact binomial, common name,
/// genus, then order-level rules (lagomorphs pool with hares, bird orders and
/// anything avian collapse to [`Species::Birds`]). Everything else is
/// [`Species::Other`]; this function never fails.
#[must_use]
pub fn resolve_taxon(raw: &str) -> Species {
    let fields = TaxonFields::parse(raw);

    if let Some(binomial) = fields.binomial()
        && let Some(species) = binomial_species(&binomial)
    {
        return species;
    }
    if let Some(species) = common_name_species(&fields.common) {
        return species;
    }
    if let Some(species) = genus_species(&fields.genus) {
        return species;
    }
    if fields.order == "lagomorpha" {
        return Species::Hare;
    }
    if BIRD_ORDERS.contains(&fields.order.as_str())
        || fields.class == "aves"
        || fields.common.contains("bird")
    {
        return Species::Birds;
    }
    Species::Other
}

/// Resolve a ranked prediction list to a single label and confidence.
///
/// The top-1 prediction decides. When it resolves to [`Species::Other`] and
/// alternatives exist, the leading `top_k` predictions are re-resolved
/// independently and their confidence summed per concrete label; the best
/// aggregate replaces the top-1 result only when it outweighs the top-1
/// confidence. Returns `None` for an empty prediction list.
#[must_use]
pub fn resolve_ranked(ranked: &[RankedTaxon], top_k: usize) -> Option<Resolution> {
    let top = ranked.first()?;
    let top_species = resolve_taxon(&top.taxon);
    if top_species != Species::Other || ranked.len() < 2 {
        return Some(Resolution {
            species: top_species,
            confidence: top.score,
        });
    }

    // Aggregate in rank order so equal sums settle on the higher-ranked
    // label.
    let mut aggregates: Vec<(Species, f32)> = Vec::new();
    for candidate in ranked.iter().take(top_k) {
        let species = resolve_taxon(&candidate.taxon);
        if species == Species::Other {
            continue;
        }
        match aggregates.iter_mut().find(|(s, _)| *s == species) {
            Some((_, sum)) => *sum += candidate.score,
            None => aggregates.push((species, candidate.score)),
        }
    }

    let mut best: Option<(Species, f32)> = None;
    for (species, sum) in aggregates {
        if best.is_none_or(|(_, best_sum)| sum > best_sum) {
            best = Some((species, sum));
        }
    }

    match best {
        Some((species, sum)) if sum > top.score => Some(Resolution {
            species,
            confidence: sum,
        }),
        _ => Some(Resolution {
            species: Species::Other,
            confidence: top.score,
        }),
    }
}
