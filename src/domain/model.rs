use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// A bookable course or service as served by the catalog API.
///
/// Free-text fields (`price`, `attendee_limit`, `date`, `location`) are kept as
/// the API sent them. Interpreting them is the filter engine's job, and it
/// never rejects a listing just because one of them is malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub provider: Option<String>,
    pub organizer_id: Option<String>,
    pub organizer_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub attendee_limit: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            date: None,
            location: None,
            provider: None,
            organizer_id: None,
            organizer_name: None,
            price: None,
            service_type: None,
            attendee_limit: None,
            category: None,
            image: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Name shown for the organizer when it cannot be rated.
    pub fn provider_display_name(&self) -> Option<&str> {
        self.provider
            .as_deref()
            .or(self.organizer_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

// Some API versions send `price` and `attendee_limit` as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TargetKind {
    Listing,
    User,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Listing => "listing",
            TargetKind::User => "user",
        }
    }
}

/// What a rating or a report is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetRef {
    Listing { listing_id: String },
    User { user_id: String },
}

impl TargetRef {
    pub fn new(kind: TargetKind, id: impl Into<String>) -> Self {
        match kind {
            TargetKind::Listing => Self::listing(id),
            TargetKind::User => Self::user(id),
        }
    }

    pub fn listing(id: impl Into<String>) -> Self {
        TargetRef::Listing {
            listing_id: id.into(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        TargetRef::User { user_id: id.into() }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            TargetRef::Listing { .. } => TargetKind::Listing,
            TargetRef::User { .. } => TargetKind::User,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            TargetRef::Listing { listing_id } => listing_id,
            TargetRef::User { user_id } => user_id,
        }
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

/// Star counts keyed "1".."5" on the wire, plus an optional server-side average.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingDistribution {
    #[serde(rename = "1", default)]
    pub one: u64,
    #[serde(rename = "2", default)]
    pub two: u64,
    #[serde(rename = "3", default)]
    pub three: u64,
    #[serde(rename = "4", default)]
    pub four: u64,
    #[serde(rename = "5", default)]
    pub five: u64,
    #[serde(default)]
    pub average: Option<f64>,
}

impl RatingDistribution {
    pub fn from_counts(counts: [u64; 5], average: Option<f64>) -> Self {
        let [one, two, three, four, five] = counts;
        Self {
            one,
            two,
            three,
            four,
            five,
            average,
        }
    }

    /// Counts ordered by star value, index 0 holding one-star ratings.
    pub fn counts(&self) -> [u64; 5] {
        [self.one, self.two, self.three, self.four, self.five]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub id: String,
    pub stars: u8,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSubmission {
    pub stars: u8,
    pub feedback: Option<String>,
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    #[serde(flatten)]
    pub target: TargetRef,
    pub reason: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    Online,
    InPerson,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ModeFilter {
    #[default]
    Any,
    Online,
    InPerson,
}

impl ModeFilter {
    pub fn admits(&self, mode: DeliveryMode) -> bool {
        match self {
            ModeFilter::Any => true,
            ModeFilter::Online => mode == DeliveryMode::Online,
            ModeFilter::InPerson => mode == DeliveryMode::InPerson,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum GroupSize {
    Solo,
    SmallGroup,
    LargeGroup,
}

/// Everything the user can narrow the catalog by. `Default` constrains nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub query: String,
    pub category: Option<String>,
    pub service_type: Option<String>,
    pub mode: ModeFilter,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub max_price: Option<f64>,
    pub group_sizes: BTreeSet<GroupSize>,
    pub themes: BTreeSet<String>,
    pub cuisines: BTreeSet<String>,
    pub diets: BTreeSet<String>,
}
