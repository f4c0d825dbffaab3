use super::ingestion::RawNewsResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Articles kept per symbol, in provider order.
pub const MAX_ARTICLES: usize = 20;

/// Publication time as the provider reported it: an ISO string from newer
/// payloads, epoch seconds from older ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishedAt {
    Timestamp(Number),
    Text(String),
}

impl Default for PublishedAt {
    fn default() -> Self {
        PublishedAt::Text(String::new())
    }
}

/// Canonical news article written to the per-symbol artifact.
///
/// Every field is always present. Anything the provider left out is an
/// empty string or an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub publisher: String,
    pub link: String,
    pub published_at: PublishedAt,
    pub thumbnail: String,
    pub related_tickers: Vec<String>,
}

/// Where a field may be found inside an article record.
#[derive(Debug, Clone, Copy)]
enum Lookup {
    /// A direct key. Misses when absent or null.
    Key(&'static str),
    /// `key` inside the sub-record `parent`. Skipped when `parent` is not a
    /// record; when it is, it settles the field and a miss yields the default.
    Nested {
        parent: &'static str,
        key: &'static str,
    },
}

/// One output field: lookups tried in order, then the default.
struct FieldRule {
    field: &'static str,
    lookups: &'static [Lookup],
    default: Value,
}

const EMPTY_TEXT: Value = Value::String(String::new());
const EMPTY_LIST: Value = Value::Array(Vec::new());

const TITLE: FieldRule = FieldRule {
    field: "title",
    lookups: &[Lookup::Key("title")],
    default: EMPTY_TEXT,
};

const PUBLISHER: FieldRule = FieldRule {
    field: "publisher",
    lookups: &[
        Lookup::Nested {
            parent: "provider",
            key: "displayName",
        },
        Lookup::Key("publisher"),
    ],
    default: EMPTY_TEXT,
};

const LINK: FieldRule = FieldRule {
    field: "link",
    lookups: &[
        Lookup::Nested {
            parent: "canonicalUrl",
            key: "url",
        },
        Lookup::Key("link"),
        Lookup::Key("url"),
    ],
    default: EMPTY_TEXT,
};

const PUBLISHED_AT: FieldRule = FieldRule {
    field: "publishedAt",
    lookups: &[Lookup::Key("pubDate"), Lookup::Key("providerPublishTime")],
    default: EMPTY_TEXT,
};

const THUMBNAIL: FieldRule = FieldRule {
    field: "thumbnail",
    lookups: &[Lookup::Nested {
        parent: "thumbnail",
        key: "originalUrl",
    }],
    default: EMPTY_TEXT,
};

const RELATED_TICKERS: FieldRule = FieldRule {
    field: "relatedTickers",
    lookups: &[
        Lookup::Key("relatedTickers"),
        Lookup::Nested {
            parent: "finance",
            key: "relatedTickers",
        },
    ],
    default: EMPTY_LIST,
};

impl FieldRule {
    fn extract(&self, record: &Map<String, Value>) -> Value {
        for lookup in self.lookups {
            match *lookup {
                Lookup::Key(key) => {
                    if let Some(value) = present(record.get(key)) {
                        return value.clone();
                    }
                }
                Lookup::Nested { parent, key } => {
                    if let Some(Value::Object(inner)) = record.get(parent) {
                        return match present(inner.get(key)) {
                            Some(value) => value.clone(),
                            None => self.fallback(),
                        };
                    }
                }
            }
        }
        self.fallback()
    }

    fn fallback(&self) -> Value {
        tracing::trace!(field = self.field, "field missing, using default");
        self.default.clone()
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn into_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn into_published_at(value: Value) -> PublishedAt {
    match value {
        Value::Number(n) => PublishedAt::Timestamp(n),
        other => PublishedAt::Text(into_text(other)),
    }
}

fn into_tickers(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl Article {
    fn from_record(record: &Map<String, Value>) -> Self {
        Self {
            title: into_text(TITLE.extract(record)),
            publisher: into_text(PUBLISHER.extract(record)),
            link: into_text(LINK.extract(record)),
            published_at: into_published_at(PUBLISHED_AT.extract(record)),
            thumbnail: into_text(THUMBNAIL.extract(record)),
            related_tickers: into_tickers(RELATED_TICKERS.extract(record)),
        }
    }
}

/// Picks the article list out of whichever payload shape the provider used:
/// an object with a `news` array, or a bare array.
fn resolve_entries(raw: &RawNewsResponse) -> &[Value] {
    match raw {
        Value::Object(map) => match map.get("news") {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        Value::Array(items) => items,
        _ => &[],
    }
}

/// Newer payloads wrap each article in a `content` record. A `content` key
/// holding anything else, `null` included, leaves nothing to read.
fn unwrap_article(entry: &Value) -> Option<&Map<String, Value>> {
    let record = entry.as_object()?;
    match record.get("content") {
        Some(Value::Object(content)) => Some(content),
        Some(_) => None,
        None => Some(record),
    }
}

/// Maps a provider news payload of any known shape onto canonical articles.
///
/// At most [`MAX_ARTICLES`] entries are considered, in provider order.
/// Entries that are not records, or whose `content` is not a record, are
/// skipped. Never fails: a missing or
/// oddly typed field degrades to its default.
pub fn normalize_news(raw: &RawNewsResponse) -> Vec<Article> {
    resolve_entries(raw)
        .iter()
        .take(MAX_ARTICLES)
        .filter_map(unwrap_article)
        .map(Article::from_record)
        .collect()
}
