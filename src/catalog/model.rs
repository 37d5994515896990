//! Typed product and comment records.
//!
//! Storefront files carry many fields this crate never reads. Each record keeps them
//! in a flattened `extra` map so a read-modify-write cycle preserves them.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::de::{MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::embedding::EmbeddingMethod;
use crate::sentiment::{SentimentClass, SentimentTuple};

/// A numeric field as it appears in scraped data: a JSON number or a numeric string.
///
/// The original representation is kept so rewriting a file does not reformat it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(Number),
    Text(String),
    Other(Value),
}

impl Numeric {
    /// Wraps a float. Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Numeric::Number)
    }

    /// Lenient conversion: numbers and numeric strings parse, anything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(n) => n.as_f64(),
            Numeric::Text(s) => s.trim().parse::<f64>().ok(),
            Numeric::Other(_) => None,
        }?;
        value.is_finite().then_some(value)
    }

    /// Strict conversion: only JSON numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

impl From<u32> for Numeric {
    fn from(value: u32) -> Self {
        Numeric::Number(Number::from(value))
    }
}

/// Sub-scores persisted next to a product's score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreMetadata {
    pub avg_sentiment: f64,
    pub normalized_rating: f64,
    pub value_score_norm: f64,
    pub confidence: f64,
    pub comment_count: u64,
    pub has_sentiment: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rating distribution derived from a product's comments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingStats {
    pub min: f64,
    pub max: f64,
    pub ratings: Vec<f64>,
}

/// One product listing in a store's category file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Numeric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Numeric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_vector_st: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_vector_clip: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_vector: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_vector: Option<Vec<f64>>,

    #[serde(
        rename = "pricelens_score",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,
    #[serde(
        rename = "pricelens_metadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub score_metadata: Option<ScoreMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_stats: Option<RatingStats>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Returns the id if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Price as a float (numeric strings accepted).
    pub fn price_value(&self) -> Option<f64> {
        self.price.as_ref().and_then(Numeric::as_f64)
    }

    /// Rating as a float (numeric strings accepted).
    pub fn rating_value(&self) -> Option<f64> {
        self.rating.as_ref().and_then(Numeric::as_f64)
    }

    /// First image path, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.as_ref()?.first().map(String::as_str)
    }

    /// Stored vector for `method`. Empty vectors count as absent.
    pub fn vector(&self, method: EmbeddingMethod) -> Option<&[f64]> {
        let vector = match method {
            EmbeddingMethod::TextSemantic => &self.text_vector_st,
            EmbeddingMethod::TextVisual => &self.text_vector_clip,
            EmbeddingMethod::Visual => &self.clip_vector,
            EmbeddingMethod::Combined => &self.combined_vector,
        };
        vector.as_deref().filter(|v| !v.is_empty())
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().or(self.id()).unwrap_or("<unnamed>")
    }
}

/// A customer comment attached to one product.
///
/// Sentiment fields are always written (as `null` when absent) so consumers can tell
/// an enriched file from a raw one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Numeric>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub polarity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub intensity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub density: Option<f64>,
    #[serde(default)]
    pub sentiment_class: Option<SentimentClass>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Comment {
    /// Creates a comment with only a body.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Returns the trimmed body, or `None` if it is blank.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// `true` if the comment carries no fields at all (`{}` in the file).
    pub fn is_blank_record(&self) -> bool {
        self.text.is_none()
            && self.rating.is_none()
            && self.polarity.is_none()
            && self.intensity.is_none()
            && self.density.is_none()
            && self.sentiment_class.is_none()
            && self.extra.is_empty()
    }

    /// Star rating if it is a JSON number.
    pub fn rating_value(&self) -> Option<f64> {
        self.rating.as_ref().and_then(Numeric::as_number)
    }

    /// Returns the sentiment tuple when all three numeric fields are present.
    ///
    /// A missing class is read as neutral.
    pub fn sentiment(&self) -> Option<SentimentTuple> {
        Some(SentimentTuple {
            polarity: self.polarity?,
            intensity: self.intensity?,
            density: self.density?,
            sentiment_class: self.sentiment_class.unwrap_or_default(),
        })
    }

    /// Sets or clears all four sentiment fields together.
    ///
    /// Returns `true` if any field changed.
    pub fn set_sentiment(&mut self, tuple: Option<SentimentTuple>) -> bool {
        let (polarity, intensity, density, class) = match tuple {
            Some(t) => (
                Some(t.polarity),
                Some(t.intensity),
                Some(t.density),
                Some(t.sentiment_class),
            ),
            None => (None, None, None, None),
        };

        let changed = self.polarity != polarity
            || self.intensity != intensity
            || self.density != density
            || self.sentiment_class != class;

        self.polarity = polarity;
        self.intensity = intensity;
        self.density = density;
        self.sentiment_class = class;
        changed
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_f64())
        .filter(|v| v.is_finite()))
}

/// A store's product file: the parsed records plus any that did not fit [`Product`].
///
/// Records that fail to parse are logged, left out of the slice view, and written back
/// untouched at their original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductList {
    products: Vec<Product>,
    unparsed: Vec<(usize, Value)>,
}

impl ProductList {
    /// Number of records that were kept as raw JSON.
    pub fn unparsed_len(&self) -> usize {
        self.unparsed.len()
    }

    /// Drops the raw records and returns the parsed products.
    pub fn into_products(self) -> Vec<Product> {
        self.products
    }
}

impl From<Vec<Product>> for ProductList {
    fn from(products: Vec<Product>) -> Self {
        Self {
            products,
            unparsed: Vec::new(),
        }
    }
}

impl Deref for ProductList {
    type Target = [Product];

    fn deref(&self) -> &[Product] {
        &self.products
    }
}

impl DerefMut for ProductList {
    fn deref_mut(&mut self) -> &mut [Product] {
        &mut self.products
    }
}

impl Serialize for ProductList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let total = self.products.len() + self.unparsed.len();
        let mut seq = serializer.serialize_seq(Some(total))?;
        let mut products = self.products.iter();
        let mut unparsed = self.unparsed.iter().peekable();
        for position in 0..total {
            match unparsed.next_if(|(at, _)| *at == position) {
                Some((_, raw)) => seq.serialize_element(raw)?,
                None => match products.next() {
                    Some(product) => seq.serialize_element(product)?,
                    None => break,
                },
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ProductList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<Value>::deserialize(deserializer)?;
        let mut list = ProductList::default();
        for (position, record) in records.into_iter().enumerate() {
            match Product::deserialize(&record) {
                Ok(product) => list.products.push(product),
                Err(e) => {
                    warn!(position, error = %e, "Skipping malformed product record");
                    list.unparsed.push((position, record));
                }
            }
        }
        Ok(list)
    }
}

/// One comment-map entry: a parsed list, or the raw value when it was not a list of
/// comments.
#[derive(Debug, Clone, PartialEq)]
enum CommentEntry {
    Parsed(Vec<Comment>),
    Unparsed(Value),
}

impl CommentEntry {
    fn comments(&self) -> &[Comment] {
        match self {
            CommentEntry::Parsed(comments) => comments,
            CommentEntry::Unparsed(_) => &[],
        }
    }
}

/// A store's `product_id -> [comment]` file, in file order.
///
/// Entries whose value is not a comment list are kept verbatim and otherwise ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentMap {
    entries: Vec<(String, CommentEntry)>,
}

impl CommentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of products with a comment list.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries kept as raw JSON.
    pub fn unparsed_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, CommentEntry::Unparsed(_)))
            .count()
    }

    /// Comments for `product_id` (empty slice if absent).
    pub fn get(&self, product_id: &str) -> &[Comment] {
        self.entries
            .iter()
            .find(|(id, _)| id == product_id)
            .map(|(_, entry)| entry.comments())
            .unwrap_or(&[])
    }

    /// Appends or replaces the comment list for `product_id`.
    pub fn insert(&mut self, product_id: impl Into<String>, comments: Vec<Comment>) {
        self.insert_entry(product_id.into(), CommentEntry::Parsed(comments));
    }

    fn insert_entry(&mut self, product_id: String, entry: CommentEntry) {
        match self.entries.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((product_id, entry)),
        }
    }

    /// Iterates `(product_id, comments)` in file order, skipping raw entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Comment])> {
        self.entries.iter().filter_map(|(id, entry)| match entry {
            CommentEntry::Parsed(comments) => Some((id.as_str(), comments.as_slice())),
            CommentEntry::Unparsed(_) => None,
        })
    }

    /// Iterates every comment in the file.
    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.iter().flat_map(|(_, comments)| comments.iter())
    }

    /// Iterates every comment in the file mutably.
    pub fn comments_mut(&mut self) -> impl Iterator<Item = &mut Comment> {
        self.entries
            .iter_mut()
            .filter_map(|(_, entry)| match entry {
                CommentEntry::Parsed(comments) => Some(comments),
                CommentEntry::Unparsed(_) => None,
            })
            .flat_map(|comments| comments.iter_mut())
    }
}

impl Serialize for CommentMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, entry) in &self.entries {
            match entry {
                CommentEntry::Parsed(comments) => map.serialize_entry(id, comments)?,
                CommentEntry::Unparsed(raw) => map.serialize_entry(id, raw)?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CommentMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CommentMapVisitor;

        impl<'de> Visitor<'de> for CommentMapVisitor {
            type Value = CommentMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of product ids to comment lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CommentMap, A::Error> {
                let mut map = CommentMap::new();
                while let Some((id, value)) = access.next_entry::<String, Value>()? {
                    let entry = match Vec::<Comment>::deserialize(&value) {
                        Ok(comments) => CommentEntry::Parsed(comments),
                        Err(e) => {
                            warn!(product_id = %id, error = %e, "Skipping malformed comment list");
                            CommentEntry::Unparsed(value)
                        }
                    };
                    map.insert_entry(id, entry);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(CommentMapVisitor)
    }
}
