//! Deterministic cache keys and expirations derived from query shape.
//!
//! Keys follow the grammar `{prefix}{category}:{entity_type}:{tail}`. For
//! query keys the tail is a 128-bit blake3 fingerprint of a canonical
//! projection of the description, so two queries that differ only in the
//! ordering of sibling filters or search terms land on the same key.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use strata_domain::{
    AdvancedSearch, CacheSettings, FilterNode, QueryDescription, SortDirection,
};

/// Upper bound on the expiration the heuristic hands out.
const MAX_QUERY_TTL: Duration = Duration::from_secs(3600);

/// Fingerprint bytes kept in the key tail (32 hex chars).
const FINGERPRINT_BYTES: usize = 16;

/// Namespace a cached value lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCategory {
    /// Paginated query results.
    Query,
    /// A single entity body.
    Entity,
    /// A batch of entities addressed by id list.
    EntityList,
    /// A hierarchy slice below one parent.
    Tree,
    /// Per-entity-type metric values.
    Stats,
}

impl KeyCategory {
    /// Every category, in key-grammar order.
    pub const ALL: [KeyCategory; 5] = [
        KeyCategory::Query,
        KeyCategory::Entity,
        KeyCategory::EntityList,
        KeyCategory::Tree,
        KeyCategory::Stats,
    ];

    /// The literal segment this category contributes to a key.
    pub fn segment(&self) -> &'static str {
        match self {
            KeyCategory::Query => "query",
            KeyCategory::Entity => "entity",
            KeyCategory::EntityList => "entity-list",
            KeyCategory::Tree => "tree",
            KeyCategory::Stats => "stats",
        }
    }
}

/// Builds cache keys, invalidation patterns, and expirations for one
/// configured prefix.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    prefix: String,
    default_ttl: Duration,
}

impl KeyGenerator {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            prefix: settings.key_prefix.clone(),
            default_ttl: settings.default_expiration(),
        }
    }

    /// The configured key prefix, including its trailing separator.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Expiration used when no heuristic applies.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Key for one paginated query result.
    pub fn query_key(&self, entity_type: &str, query: &QueryDescription) -> String {
        let tail = fingerprint(&canonical_projection(query));
        self.compose(KeyCategory::Query, entity_type, &tail)
    }

    /// Key for a single entity body. The id is used verbatim.
    pub fn entity_key(&self, entity_type: &str, id: &str) -> String {
        self.compose(KeyCategory::Entity, entity_type, id)
    }

    /// Key for a batch lookup. The id list is sorted before hashing so the
    /// caller's ordering never splits the cache.
    pub fn entity_list_key(&self, entity_type: &str, ids: &[String]) -> String {
        let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let hash = blake3::hash(sorted.join(",").as_bytes());
        let tail = hex::encode(&hash.as_bytes()[..FINGERPRINT_BYTES]);
        self.compose(KeyCategory::EntityList, entity_type, &tail)
    }

    /// Key for a hierarchy slice below `parent_id` (or the roots when
    /// `None`) down to `depth` levels.
    pub fn tree_key(&self, entity_type: &str, parent_id: Option<&str>, depth: u32) -> String {
        let tail = format!("{}.{depth}", parent_id.unwrap_or("root"));
        self.compose(KeyCategory::Tree, entity_type, &tail)
    }

    /// Key for one per-entity-type metric.
    pub fn stats_key(&self, entity_type: &str, metric: &str) -> String {
        self.compose(KeyCategory::Stats, entity_type, metric)
    }

    /// Glob matching every key of every category for one entity type.
    pub fn invalidation_pattern(&self, entity_type: &str) -> String {
        format!("{}*:{entity_type}:*", self.prefix)
    }

    /// Glob matching every key of one category for one entity type.
    pub fn category_pattern(&self, category: KeyCategory, entity_type: &str) -> String {
        format!("{}{}:{entity_type}:*", self.prefix, category.segment())
    }

    /// Expiration heuristic for query results.
    ///
    /// Constrained queries go stale fastest and get a third of the default.
    /// Unconstrained first pages are the hottest and most stable reads and
    /// get double, capped at one hour. Everything else gets the default. The
    /// ordering constrained < default <= first-page holds for any
    /// configured default.
    pub fn query_ttl(&self, query: &QueryDescription) -> Duration {
        if query.has_constraints() {
            self.default_ttl / 3
        } else if query.is_first_page() {
            (self.default_ttl * 2).min(MAX_QUERY_TTL).max(self.default_ttl)
        } else {
            self.default_ttl
        }
    }

    fn compose(&self, category: KeyCategory, entity_type: &str, tail: &str) -> String {
        format!("{}{}:{entity_type}:{tail}", self.prefix, category.segment())
    }
}

/// Key-relevant projection of a query. Field order is part of the key
/// contract and must not change.
#[derive(Debug, Serialize)]
struct CanonicalQuery<'a> {
    page_index: u32,
    page_size: u32,
    sort_field: Option<&'a str>,
    sort_direction: SortDirection,
    filter: Option<FilterNode>,
    free_text_searches: Vec<&'a str>,
    advanced_searches: Vec<&'a AdvancedSearch>,
    custom_search_tokens: Vec<&'a str>,
    extra_keys: &'a BTreeMap<String, String>,
}

fn canonical_projection(query: &QueryDescription) -> CanonicalQuery<'_> {
    let mut free_text: Vec<&str> = query.free_text_searches.iter().map(String::as_str).collect();
    free_text.sort_unstable();

    let mut advanced: Vec<&AdvancedSearch> = query.advanced_searches.iter().collect();
    advanced.sort_unstable();

    let mut tokens: Vec<&str> = query.custom_search_tokens.iter().map(String::as_str).collect();
    tokens.sort_unstable();

    CanonicalQuery {
        page_index: query.page_index,
        page_size: query.page_size,
        sort_field: query.sort_field.as_deref(),
        sort_direction: query.sort_direction,
        filter: query.filter.as_ref().and_then(canonical_filter),
        free_text_searches: free_text,
        advanced_searches: advanced,
        custom_search_tokens: tokens,
        extra_keys: &query.extra_keys,
    }
}

/// Rebuilds a filter node with inert descendants pruned and siblings in a
/// stable order. Returns `None` when the node constrains nothing.
fn canonical_filter(node: &FilterNode) -> Option<FilterNode> {
    if node.is_empty() {
        return None;
    }
    Some(match node {
        FilterNode::Value { .. } => node.clone(),
        FilterNode::Group { logic, children } => FilterNode::Group {
            logic: *logic,
            children: canonical_children(children),
        },
        FilterNode::Collection { field, logic, children } => FilterNode::Collection {
            field: field.clone(),
            logic: *logic,
            children: canonical_children(children),
        },
        FilterNode::Class { field, node } => FilterNode::Class {
            field: field.clone(),
            node: Box::new(canonical_filter(node)?),
        },
    })
}

fn canonical_children(children: &[FilterNode]) -> Vec<FilterNode> {
    let mut kept: Vec<FilterNode> = children.iter().filter_map(canonical_filter).collect();
    kept.sort_by_cached_key(|child| serde_json::to_string(child).unwrap_or_default());
    kept
}

/// 128-bit blake3 fingerprint of a serializable value, hex-encoded.
fn fingerprint<T: Serialize + std::fmt::Debug>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_else(|_| format!("{value:?}").into_bytes());
    let hash = blake3::hash(&bytes);
    hex::encode(&hash.as_bytes()[..FINGERPRINT_BYTES])
}
