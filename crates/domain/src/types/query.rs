//! Query descriptions and the typed filter tree they carry.
//!
//! A [`QueryDescription`] is the full shape of one paginated read: page,
//! sort, filter tree, and search terms. Two descriptions that would return
//! the same rows must compare equal field by field, because the cache key
//! is derived from this structure alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Sort direction for an ordered query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Comparison applied by a leaf filter node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
}

/// How sibling filter nodes combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterLogic {
    And,
    Or,
}

/// One node of a filter tree.
///
/// The tree is a plain tagged union: walking it requires no runtime type
/// inspection, and every constructor states which fields participate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterNode {
    /// Boolean combination of child nodes.
    Group {
        logic: FilterLogic,
        children: Vec<FilterNode>,
    },
    /// Comparison of one field against a constant.
    Value {
        field: String,
        action: FilterAction,
        value: serde_json::Value,
    },
    /// Condition over the elements of a collection-valued field.
    Collection {
        field: String,
        logic: FilterLogic,
        children: Vec<FilterNode>,
    },
    /// Condition that descends into a nested object field.
    Class {
        field: String,
        node: Box<FilterNode>,
    },
}

impl FilterNode {
    /// Boolean group of child conditions.
    #[must_use]
    pub fn group(logic: FilterLogic, children: Vec<FilterNode>) -> Self {
        Self::Group { logic, children }
    }

    /// Leaf comparison on a single field.
    pub fn value(
        field: impl Into<String>,
        action: FilterAction,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self::Value { field: field.into(), action, value: value.into() }
    }

    /// Condition over a collection-valued field.
    pub fn collection(
        field: impl Into<String>,
        logic: FilterLogic,
        children: Vec<FilterNode>,
    ) -> Self {
        Self::Collection { field: field.into(), logic, children }
    }

    /// Condition on a nested object field.
    pub fn class(field: impl Into<String>, node: FilterNode) -> Self {
        Self::Class { field: field.into(), node: Box::new(node) }
    }

    /// Whether this node constrains nothing.
    ///
    /// A group or collection with no effective children is inert, and a
    /// nested condition over an inert node is inert itself. Inert nodes
    /// never reach the fingerprint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Value { .. } => false,
            Self::Group { children, .. } | Self::Collection { children, .. } => {
                children.iter().all(Self::is_empty)
            }
            Self::Class { node, .. } => node.is_empty(),
        }
    }
}

/// Field-scoped search term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdvancedSearch {
    pub field: String,
    pub term: String,
}

impl AdvancedSearch {
    pub fn new(field: impl Into<String>, term: impl Into<String>) -> Self {
        Self { field: field.into(), term: term.into() }
    }
}

/// The full shape of one paginated read against the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescription {
    /// 1-based page number.
    pub page_index: u32,
    /// Items per page.
    pub page_size: u32,
    /// Field the result set is ordered by, if any.
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// Root of the filter tree, if any.
    pub filter: Option<FilterNode>,
    /// Unscoped search terms applied across searchable fields.
    #[serde(default)]
    pub free_text_searches: Vec<String>,
    /// Field-scoped search terms.
    #[serde(default)]
    pub advanced_searches: Vec<AdvancedSearch>,
    /// Caller-defined search tokens interpreted by the store.
    #[serde(default)]
    pub custom_search_tokens: Vec<String>,
    /// Caller-supplied salt folded into the fingerprint. Entry order never
    /// affects the key; the map keeps its keys sorted.
    #[serde(default)]
    pub extra_keys: BTreeMap<String, String>,
}

impl Default for QueryDescription {
    fn default() -> Self {
        Self {
            page_index: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_field: None,
            sort_direction: SortDirection::Ascending,
            filter: None,
            free_text_searches: Vec::new(),
            advanced_searches: Vec::new(),
            custom_search_tokens: Vec::new(),
            extra_keys: BTreeMap::new(),
        }
    }
}

impl QueryDescription {
    /// First page with the default page size and no constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page coordinates.
    #[must_use]
    pub fn with_page(mut self, page_index: u32, page_size: u32) -> Self {
        self.page_index = page_index;
        self.page_size = page_size;
        self
    }

    /// Order the result set.
    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_field = Some(field.into());
        self.sort_direction = direction;
        self
    }

    /// Attach a filter tree.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add an unscoped search term.
    #[must_use]
    pub fn with_free_text(mut self, term: impl Into<String>) -> Self {
        self.free_text_searches.push(term.into());
        self
    }

    /// Add a field-scoped search term.
    #[must_use]
    pub fn with_advanced_search(
        mut self,
        field: impl Into<String>,
        term: impl Into<String>,
    ) -> Self {
        self.advanced_searches.push(AdvancedSearch::new(field, term));
        self
    }

    /// Add a store-interpreted search token.
    #[must_use]
    pub fn with_search_token(mut self, token: impl Into<String>) -> Self {
        self.custom_search_tokens.push(token.into());
        self
    }

    /// Add a caller-defined fingerprint salt entry.
    #[must_use]
    pub fn with_extra_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_keys.insert(key.into(), value.into());
        self
    }

    /// Whether any filter or search constrains the result set.
    ///
    /// An inert filter tree does not count.
    #[must_use]
    pub fn has_constraints(&self) -> bool {
        self.filter.as_ref().is_some_and(|f| !f.is_empty())
            || !self.free_text_searches.is_empty()
            || !self.advanced_searches.is_empty()
            || !self.custom_search_tokens.is_empty()
    }

    /// Whether this query targets the first page.
    #[must_use]
    pub fn is_first_page(&self) -> bool {
        self.page_index <= 1
    }
}
