//! Backend records and the feed items derived from them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Page request for the public video listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageQuery {
    pub page: u32,
    pub per_page: u32,
}

impl PageQuery {
    pub fn first(per_page: u32) -> Self {
        Self { page: 1, per_page }
    }
}

/// Cache key for a feed page.
pub type FeedKey = PageQuery;

impl fmt::Display for PageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page={}/per_page={}", self.page, self.per_page)
    }
}

/// Identifiers come back as numbers from some endpoints and strings from
/// others; both are normalized to a trimmed string.
fn de_normalized_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Int(n)) => n.to_string(),
        Some(RawId::Str(s)) => s.trim().to_string(),
        None => String::new(),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyRecord {
    #[serde(default, alias = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
}

/// A video as returned by the backend listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoRecord {
    #[serde(default, deserialize_with = "de_normalized_id")]
    pub id: String,
    #[serde(default, alias = "url")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub hls_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub likes_count: Option<u64>,
    #[serde(default)]
    pub is_liked: Option<bool>,
    #[serde(default)]
    pub property: Option<PropertyRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub last_page: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoPage {
    #[serde(default)]
    pub data: Vec<VideoRecord>,
    #[serde(default)]
    pub meta: PageMeta,
}

/// A playable entry of the feed, shaped like a property listing card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub video_url: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub likes_count: u64,
    pub property_reference: Option<String>,
    pub price_label: Option<String>,
    pub location: Option<String>,
    pub bedrooms: Option<u32>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_owned)
}

fn format_price(price: f64, currency: Option<&str>) -> String {
    let amount = if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    };
    match currency.map(str::trim).filter(|c| !c.is_empty()) {
        Some(currency) => format!("{currency} {amount}"),
        None => amount,
    }
}

impl FeedItem {
    /// Map a backend record. Records without an id or a playable URL yield
    /// `None`; the HLS URL wins over the progressive one when both exist.
    pub fn from_record(record: &VideoRecord) -> Option<Self> {
        if record.id.is_empty() {
            return None;
        }
        let video_url = non_blank(record.hls_url.as_ref())
            .or_else(|| non_blank(record.video_url.as_ref()))?;

        let property = record.property.as_ref();
        let title = non_blank(record.title.as_ref())
            .or_else(|| property.and_then(|p| non_blank(p.title.as_ref())))
            .unwrap_or_default();

        Some(Self {
            id: record.id.clone(),
            video_url,
            title,
            description: non_blank(record.description.as_ref()),
            thumbnail_url: non_blank(record.thumbnail_url.as_ref()),
            likes_count: record.likes_count.unwrap_or(0),
            property_reference: property.and_then(|p| non_blank(p.reference.as_ref())),
            price_label: property
                .and_then(|p| p.price.map(|price| format_price(price, p.currency.as_deref()))),
            location: property.and_then(|p| non_blank(p.location.as_ref())),
            bedrooms: property.and_then(|p| p.bedrooms),
        })
    }
}

/// Map a page of records into feed items, skipping unplayable records and
/// later duplicates of an id already seen.
pub fn feed_items(records: &[VideoRecord]) -> Vec<FeedItem> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(FeedItem::from_record)
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}
