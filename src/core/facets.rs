//! Facets derived from a listing's free text.
//!
//! Theme, cuisine and diet are not structured fields in the catalog. They are
//! inferred by matching a fixed keyword taxonomy (Finnish and English stems)
//! against the listing's text.

use crate::domain::model::Listing;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetDimension {
    Theme,
    Cuisine,
    Diet,
}

struct FacetRule {
    value: &'static str,
    keywords: &'static [&'static str],
}

const THEMES: &[FacetRule] = &[
    FacetRule {
        value: "Baking",
        keywords: &["leivo", "leipo", "leipä", "bake", "baking", "pastry", "sourdough"],
    },
    FacetRule {
        value: "Cooking",
        keywords: &["kokka", "ruoanlaitto", "ruuanlaitto", "keittiö", "cook", "kitchen"],
    },
    FacetRule {
        value: "Wine & Drinks",
        keywords: &["viini", "olut", "wine", "beer", "cocktail", "drink"],
    },
    FacetRule {
        value: "Coffee & Tea",
        keywords: &["kahvi", "teehetki", "coffee", "barista", "tea tasting"],
    },
    FacetRule {
        value: "Chocolate & Sweets",
        keywords: &["suklaa", "karkki", "jälkiruo", "chocolate", "candy", "dessert"],
    },
    FacetRule {
        value: "Foraging",
        keywords: &["sieni", "villiyrt", "mushroom", "forag", "wild herb"],
    },
];

const CUISINES: &[FacetRule] = &[
    FacetRule {
        value: "Italian",
        keywords: &["italia", "pasta", "pizza", "risotto"],
    },
    FacetRule {
        value: "Asian",
        keywords: &["aasia", "asian", "sushi", "ramen", "thai", "wok", "dumpling"],
    },
    FacetRule {
        value: "Finnish",
        keywords: &["suomalai", "karjal", "perinneruo", "finnish", "nordic"],
    },
    FacetRule {
        value: "Mexican",
        keywords: &["meksik", "mexic", "taco", "tortilla"],
    },
    FacetRule {
        value: "Indian",
        keywords: &["intialai", "indian", "curry", "masala"],
    },
    FacetRule {
        value: "French",
        keywords: &["ranska", "french", "croissant", "patisserie"],
    },
    FacetRule {
        value: "Middle Eastern",
        keywords: &["lähi-itä", "middle east", "hummus", "falafel"],
    },
];

const DIETS: &[FacetRule] = &[
    FacetRule {
        value: "Vegan",
        keywords: &["vegaan", "kasvipohj", "vegan", "plant-based"],
    },
    FacetRule {
        value: "Vegetarian",
        keywords: &["kasvis", "vegetar"],
    },
    FacetRule {
        value: "Gluten-free",
        keywords: &["gluteeniton", "keliak", "gluten-free", "gluten free"],
    },
    FacetRule {
        value: "Lactose-free",
        keywords: &[
            "laktoositon",
            "maidoton",
            "lactose-free",
            "lactose free",
            "dairy-free",
            "dairy free",
        ],
    },
];

fn rules(dimension: FacetDimension) -> &'static [FacetRule] {
    match dimension {
        FacetDimension::Theme => THEMES,
        FacetDimension::Cuisine => CUISINES,
        FacetDimension::Diet => DIETS,
    }
}

/// All values a dimension can take, in taxonomy order.
pub fn taxonomy(dimension: FacetDimension) -> impl Iterator<Item = &'static str> {
    rules(dimension).iter().map(|rule| rule.value)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedFacets {
    pub theme: BTreeSet<String>,
    pub cuisine: BTreeSet<String>,
    pub diet: BTreeSet<String>,
}

impl DerivedFacets {
    pub fn values(&self, dimension: FacetDimension) -> &BTreeSet<String> {
        match dimension {
            FacetDimension::Theme => &self.theme,
            FacetDimension::Cuisine => &self.cuisine,
            FacetDimension::Diet => &self.diet,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.theme.is_empty() && self.cuisine.is_empty() && self.diet.is_empty()
    }
}

fn text_fields(listing: &Listing) -> [Option<&str>; 6] {
    [
        Some(listing.name.as_str()),
        listing.description.as_deref(),
        listing.category.as_deref(),
        listing.service_type.as_deref(),
        listing.provider.as_deref(),
        listing.organizer_name.as_deref(),
    ]
}

fn text_blob(listing: &Listing) -> String {
    text_fields(listing)
        .into_iter()
        .flatten()
        .filter(|field| !field.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn matching_values(blob: &str, dimension: FacetDimension) -> BTreeSet<String> {
    rules(dimension)
        .iter()
        .filter(|rule| rule.keywords.iter().any(|keyword| blob.contains(keyword)))
        .map(|rule| rule.value.to_string())
        .collect()
}

pub fn derive_facets(listing: &Listing) -> DerivedFacets {
    let blob = text_blob(listing);
    if blob.is_empty() {
        return DerivedFacets::default();
    }

    DerivedFacets {
        theme: matching_values(&blob, FacetDimension::Theme),
        cuisine: matching_values(&blob, FacetDimension::Cuisine),
        diet: matching_values(&blob, FacetDimension::Diet),
    }
}

fn content_fingerprint(listing: &Listing) -> u64 {
    let mut hasher = DefaultHasher::new();
    text_fields(listing).hash(&mut hasher);
    hasher.finish()
}

/// Memoized [`derive_facets`], keyed by listing id.
///
/// Each entry remembers the fingerprint of the text it was derived from, so an
/// edited listing misses and is derived again under the same key.
#[derive(Debug, Default)]
pub struct FacetMemo {
    entries: Mutex<HashMap<String, (u64, Arc<DerivedFacets>)>>,
}

impl FacetMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, listing: &Listing) -> Arc<DerivedFacets> {
        let fingerprint = content_fingerprint(listing);

        let Ok(mut entries) = self.entries.lock() else {
            return Arc::new(derive_facets(listing));
        };

        if let Some((cached, facets)) = entries.get(&listing.id) {
            if *cached == fingerprint {
                return Arc::clone(facets);
            }
        }

        let facets = Arc::new(derive_facets(listing));
        entries.insert(listing.id.clone(), (fingerprint, Arc::clone(&facets)));
        facets
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
