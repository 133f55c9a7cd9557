//! Filter groups and selections.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use mystery_box_core::{Product, major_to_minor};
use rust_decimal::Decimal;

const OPTION_PREFIX: &str = "option:";

/// A product attribute shoppers can filter on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterGroup {
    /// Category handle or id.
    Category,
    /// Collection handle or id.
    Collection,
    Tag,
    /// Product type value.
    Type,
    /// Values of the variant option with this title (e.g. `Size`).
    Option(String),
}

impl FilterGroup {
    /// Parse a group key: `category`, `collection`, `tag`, `type` or `option:<title>`.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "category" => Some(Self::Category),
            "collection" => Some(Self::Collection),
            "tag" => Some(Self::Tag),
            "type" => Some(Self::Type),
            _ => key
                .strip_prefix(OPTION_PREFIX)
                .filter(|title| !title.trim().is_empty())
                .map(|title| Self::Option(title.trim().to_owned())),
        }
    }

    /// The product's values for this group.
    #[must_use]
    pub fn values<'a>(&self, product: &'a Product) -> Vec<&'a str> {
        match self {
            Self::Category => product
                .categories
                .iter()
                .flat_map(|c| [c.handle.as_str(), c.id.as_str()])
                .collect(),
            Self::Collection => product
                .collection
                .iter()
                .flat_map(|c| [c.handle.as_str(), c.id.as_str()])
                .collect(),
            Self::Tag => product.tag_values().collect(),
            Self::Type => product
                .product_type
                .iter()
                .map(|t| t.value.as_str())
                .collect(),
            Self::Option(title) => product.option_values(title),
        }
    }

    /// Values shown in a filter sidebar. Unlike [`values`](Self::values),
    /// categories and collections report only their handle.
    fn facet_values<'a>(&self, product: &'a Product) -> Vec<&'a str> {
        match self {
            Self::Category => product.category_handles().collect(),
            Self::Collection => product
                .collection
                .iter()
                .map(|c| c.handle.as_str())
                .collect(),
            _ => self.values(product),
        }
    }
}

impl fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category => f.write_str("category"),
            Self::Collection => f.write_str("collection"),
            Self::Tag => f.write_str("tag"),
            Self::Type => f.write_str("type"),
            Self::Option(title) => write!(f, "{OPTION_PREFIX}{title}"),
        }
    }
}

impl FromStr for FilterGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown filter group: {s}"))
    }
}

/// Active filter selections plus an optional price range in major units.
///
/// A product passes when it has a value in every group with a selection
/// (AND across groups, OR within one). Empty groups impose nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    selections: BTreeMap<FilterGroup, BTreeSet<String>>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to `group`'s selection.
    pub fn select(&mut self, group: FilterGroup, value: impl Into<String>) {
        self.selections.entry(group).or_default().insert(value.into());
    }

    /// Remove `value` from `group`'s selection.
    pub fn deselect(&mut self, group: &FilterGroup, value: &str) {
        if let Some(values) = self.selections.get_mut(group) {
            values.remove(value);
            if values.is_empty() {
                self.selections.remove(group);
            }
        }
    }

    /// Flip `value` in `group`'s selection.
    pub fn toggle(&mut self, group: FilterGroup, value: &str) {
        if self.is_selected(&group, value) {
            self.deselect(&group, value);
        } else {
            self.select(group, value);
        }
    }

    /// Replace a group's whole selection.
    pub fn set_group(&mut self, group: FilterGroup, values: impl IntoIterator<Item = String>) {
        let values: BTreeSet<String> = values.into_iter().collect();
        if values.is_empty() {
            self.selections.remove(&group);
        } else {
            self.selections.insert(group, values);
        }
    }

    #[must_use]
    pub fn is_selected(&self, group: &FilterGroup, value: &str) -> bool {
        self.selections
            .get(group)
            .is_some_and(|values| values.contains(value))
    }

    /// Selected values for a group, in sorted order.
    pub fn selected(&self, group: &FilterGroup) -> impl Iterator<Item = &str> {
        self.selections
            .get(group)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Groups with at least one selection.
    pub fn groups(&self) -> impl Iterator<Item = &FilterGroup> {
        self.selections.keys()
    }

    /// Whether no constraint is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.min_price.is_none() && self.max_price.is_none()
    }

    /// Drop every selection and the price range.
    pub fn clear(&mut self) {
        self.selections.clear();
        self.min_price = None;
        self.max_price = None;
    }

    /// Whether `product` passes every active constraint.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.selections.iter().all(|(group, selected)| {
            group
                .values(product)
                .iter()
                .any(|value| selected.contains(*value))
        }) && self.matches_price(product)
    }

    fn matches_price(&self, product: &Product) -> bool {
        if self.min_price.is_none() && self.max_price.is_none() {
            return true;
        }
        let Some(price) = product.sort_price() else {
            return false;
        };
        let bound = |major: Option<Decimal>| {
            major.and_then(|amount| major_to_minor(amount, &price.currency_code))
        };

        bound(self.min_price).is_none_or(|min| price.amount >= min)
            && bound(self.max_price).is_none_or(|max| price.amount <= max)
    }
}

/// Whether a product matches a free-text query on its title, handle,
/// description or tags (case-insensitive). A blank query matches everything.
#[must_use]
pub fn matches_query(product: &Product, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

    contains(&product.title)
        || contains(&product.handle)
        || product.description.as_deref().is_some_and(contains)
        || product.tag_values().any(contains)
}

/// Count how many products carry each value of `group`, sorted by value.
#[must_use]
pub fn facet_counts(products: &[Product], group: &FilterGroup) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for product in products {
        let mut values = group.facet_values(product);
        values.sort_unstable();
        values.dedup();
        for value in values {
            *counts.entry(value).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(value, count)| (value.to_owned(), count))
        .collect()
}
