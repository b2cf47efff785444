//! Narrowing a listing collection by a [`FilterState`].
//!
//! Every clause is a conjunct. Within a facet dimension the selected values are
//! alternatives. Malformed free text never causes an exclusion on its own
//! except for the date range, where an undated listing cannot be placed.

use crate::core::facets::{derive_facets, DerivedFacets, FacetDimension, FacetMemo};
use crate::domain::model::{DeliveryMode, FilterState, GroupSize, Listing, ModeFilter};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// A listing is online when its location is an absolute http(s) URL.
pub fn delivery_mode(listing: &Listing) -> DeliveryMode {
    let is_web_url = listing
        .location
        .as_deref()
        .and_then(|location| Url::parse(location.trim()).ok())
        .is_some_and(|url| matches!(url.scheme(), "http" | "https"));

    if is_web_url {
        DeliveryMode::Online
    } else {
        DeliveryMode::InPerson
    }
}

/// Reads an amount out of free-text prices such as `"€29"` or `"12,50 €"`.
///
/// Only digits, commas and periods are kept and a comma is read as the decimal
/// separator. `None` means the price is unknown.
pub fn parse_price(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    kept.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn leading_number(raw: &str) -> Option<f64> {
    if let Ok(value) = raw.parse::<f64>() {
        return Some(value).filter(|v| v.is_finite());
    }
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<f64>().ok()
}

pub fn group_size(attendee_limit: Option<&str>) -> GroupSize {
    let Some(raw) = attendee_limit.map(str::trim) else {
        return GroupSize::SmallGroup;
    };

    if raw.eq_ignore_ascii_case("unlimited") {
        return GroupSize::LargeGroup;
    }

    match leading_number(raw) {
        Some(n) if n <= 1.0 => GroupSize::Solo,
        Some(n) if n <= 10.0 => GroupSize::SmallGroup,
        Some(_) => GroupSize::LargeGroup,
        None => GroupSize::SmallGroup,
    }
}

/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates.
pub fn parse_listing_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_end(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc())
}

/// The active value of a category/type selector, `None` meaning "any".
fn active_selector(selector: &Option<String>) -> Option<&str> {
    selector
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("any"))
}

fn field_equals(field: Option<&str>, wanted: &str) -> bool {
    field.is_some_and(|value| value.trim().to_lowercase() == wanted.to_lowercase())
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
            && active_selector(&self.category).is_none()
            && active_selector(&self.service_type).is_none()
            && self.mode == ModeFilter::Any
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.max_price.is_none()
            && self.group_sizes.is_empty()
            && !self.has_facet_selection()
    }

    pub fn has_facet_selection(&self) -> bool {
        !(self.themes.is_empty() && self.cuisines.is_empty() && self.diets.is_empty())
    }

    pub fn facet_selection(&self, dimension: FacetDimension) -> &BTreeSet<String> {
        match dimension {
            FacetDimension::Theme => &self.themes,
            FacetDimension::Cuisine => &self.cuisines,
            FacetDimension::Diet => &self.diets,
        }
    }
}

fn matches_query(listing: &Listing, query: &str) -> bool {
    let haystack = [
        Some(listing.name.as_str()),
        listing.description.as_deref(),
        listing.provider.as_deref(),
        listing.organizer_name.as_deref(),
        listing.category.as_deref(),
        listing.service_type.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    haystack.contains(query)
}

fn matches_date_range(listing: &Listing, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }

    let Some(at) = listing.date.as_deref().and_then(parse_listing_datetime) else {
        return false;
    };

    if from.is_some_and(|from| at < day_start(from)) {
        return false;
    }
    if let Some(end) = to.and_then(day_end) {
        if at > end {
            return false;
        }
    }
    true
}

fn within_price_ceiling(listing: &Listing, ceiling: Option<f64>) -> bool {
    let Some(ceiling) = ceiling else {
        return true;
    };
    match listing.price.as_deref().and_then(parse_price) {
        Some(price) => price <= ceiling,
        None => true,
    }
}

fn matches_facets(facets: &DerivedFacets, state: &FilterState) -> bool {
    [
        FacetDimension::Theme,
        FacetDimension::Cuisine,
        FacetDimension::Diet,
    ]
    .into_iter()
    .all(|dimension| {
        let selected = state.facet_selection(dimension);
        selected.is_empty() || !selected.is_disjoint(facets.values(dimension))
    })
}

fn matches<F>(listing: &Listing, state: &FilterState, facets_of: &F) -> bool
where
    F: Fn(&Listing) -> Arc<DerivedFacets>,
{
    let query = state.query.trim().to_lowercase();
    if !query.is_empty() && !matches_query(listing, &query) {
        return false;
    }

    if let Some(category) = active_selector(&state.category) {
        if !field_equals(listing.category.as_deref(), category) {
            return false;
        }
    }

    if let Some(service_type) = active_selector(&state.service_type) {
        if !field_equals(listing.service_type.as_deref(), service_type) {
            return false;
        }
    }

    if !state.mode.admits(delivery_mode(listing)) {
        return false;
    }

    if !matches_date_range(listing, state.date_from, state.date_to) {
        return false;
    }

    if !within_price_ceiling(listing, state.max_price) {
        return false;
    }

    if !state.group_sizes.is_empty()
        && !state
            .group_sizes
            .contains(&group_size(listing.attendee_limit.as_deref()))
    {
        return false;
    }

    // Facets last: deriving them is the most expensive check.
    !state.has_facet_selection() || matches_facets(&facets_of(listing), state)
}

/// Listings admitted by `state`, in their original order.
pub fn apply_filters<'a>(listings: &'a [Listing], state: &FilterState) -> Vec<&'a Listing> {
    let derive = |listing: &Listing| Arc::new(derive_facets(listing));
    listings
        .iter()
        .filter(|listing| matches(listing, state, &derive))
        .collect()
}

/// [`apply_filters`] with facet derivation memoized across evaluations.
#[derive(Debug, Default)]
pub struct FilterEngine {
    memo: FacetMemo,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply<'a>(&self, listings: &'a [Listing], state: &FilterState) -> Vec<&'a Listing> {
        if state.is_empty() {
            return listings.iter().collect();
        }

        let memoized = |listing: &Listing| self.memo.get(listing);
        let admitted: Vec<&Listing> = listings
            .iter()
            .filter(|listing| matches(listing, state, &memoized))
            .collect();

        tracing::debug!(
            "Filter admitted {} of {} listings",
            admitted.len(),
            listings.len()
        );
        admitted
    }

    pub fn facets(&self, listing: &Listing) -> Arc<DerivedFacets> {
        self.memo.get(listing)
    }
}
