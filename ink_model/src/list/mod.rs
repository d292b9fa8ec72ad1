//! Lists - ink's ordered-enum set type.
//!
//! A list definition declares named items with integer ranks. A list value is
//! a set of items drawn from one or more definitions. Items order by rank, then
//! by name, so iteration order never depends on insertion order.

mod catalog;

pub use catalog::*;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::error::ModelError;

/// One member of a list, tagged with the definition it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListItem {
    pub origin: String,
    pub name: String,
    pub rank: i64,
}

impl ListItem {
    pub fn new(origin: impl Into<String>, name: impl Into<String>, rank: i64) -> Self {
        Self {
            origin: origin.into(),
            name: name.into(),
            rank,
        }
    }

    /// `Origin.Item` form used by list literals.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.origin, self.name)
    }
}

impl Ord for ListItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.origin.cmp(&other.origin))
    }
}

impl PartialOrd for ListItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for ListItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A set of list items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListValue {
    items: BTreeSet<ListItem>,
}

impl ListValue {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list holding exactly one item.
    pub fn single(item: ListItem) -> Self {
        Self::from_items([item])
    }

    pub fn from_items(items: impl IntoIterator<Item = ListItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, item: ListItem) -> bool {
        self.items.insert(item)
    }

    pub fn contains(&self, item: &ListItem) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in `(rank, name)` order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ListItem> + ExactSizeIterator {
        self.items.iter()
    }

    /// Sorted copy of the items.
    pub fn to_sorted_vec(&self) -> Vec<ListItem> {
        self.items.iter().cloned().collect()
    }

    /// Names of every definition a member comes from.
    pub fn origins(&self) -> BTreeSet<&str> {
        self.items.iter().map(|item| item.origin.as_str()).collect()
    }

    /// Lowest-ranked item as a single-item list.
    pub fn min(&self) -> ListValue {
        self.items.first().cloned().map(Self::single).unwrap_or_default()
    }

    /// Highest-ranked item as a single-item list.
    pub fn max(&self) -> ListValue {
        self.items.last().cloned().map(Self::single).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// One member chosen uniformly, or an empty list.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> ListValue {
        if self.items.is_empty() {
            return ListValue::new();
        }
        let pick = rng.gen_range(0..self.items.len());
        self.items.iter().nth(pick).cloned().map(Self::single).unwrap_or_default()
    }

    /// True when the list has members.
    pub fn as_bool(&self) -> bool {
        !self.items.is_empty()
    }

    /// Rank of the sole member.
    pub fn as_int(&self) -> Result<i64, ModelError> {
        let mut items = self.items.iter();
        match (items.next(), items.next()) {
            (Some(item), None) => Ok(item.rank),
            (None, _) => Err(ModelError::InvalidListOperation(
                "cannot take the integer value of an empty list".into(),
            )),
            (Some(_), Some(_)) => Err(ModelError::InvalidListOperation(format!(
                "cannot take the integer value of a list with {} items",
                self.items.len()
            ))),
        }
    }

    /// Rank of the highest member, or 0 when empty.
    pub fn value(&self) -> i64 {
        self.items.last().map(|item| item.rank).unwrap_or(0)
    }

    pub fn union(&self, other: &ListValue) -> ListValue {
        Self {
            items: self.items.union(&other.items).cloned().collect(),
        }
    }

    pub fn difference(&self, other: &ListValue) -> ListValue {
        Self {
            items: self.items.difference(&other.items).cloned().collect(),
        }
    }

    pub fn intersection(&self, other: &ListValue) -> ListValue {
        Self {
            items: self.items.intersection(&other.items).cloned().collect(),
        }
    }

    /// Whether every member of `other` is in this list.
    pub fn is_superset(&self, other: &ListValue) -> bool {
        self.items.is_superset(&other.items)
    }

    /// Members with rank in `[min, max]`.
    pub fn range(&self, min: i64, max: i64) -> ListValue {
        Self {
            items: self
                .items
                .iter()
                .filter(|item| item.rank >= min && item.rank <= max)
                .cloned()
                .collect(),
        }
    }

    /// Union of every definition touched by a member.
    pub fn all(&self, catalog: &ListCatalog) -> Result<ListValue, ModelError> {
        let mut all = ListValue::new();
        for origin in self.origins() {
            all = all.union(catalog.universe(origin)?);
        }
        Ok(all)
    }

    /// The origin definition minus this list.
    ///
    /// The origin is read off the lowest member, so an empty list cannot be
    /// inverted.
    pub fn invert(&self, catalog: &ListCatalog) -> Result<ListValue, ModelError> {
        let first = self.items.first().ok_or_else(|| {
            ModelError::InvalidListOperation("cannot invert an empty list".into())
        })?;
        Ok(catalog.universe(&first.origin)?.difference(self))
    }

    /// Replace the sole member with the item `steps` ranks further along its
    /// definition. Walking off either end yields an empty list.
    pub fn advance(&self, catalog: &ListCatalog, steps: i64) -> Result<ListValue, ModelError> {
        let mut items = self.items.iter();
        let item = match (items.next(), items.next()) {
            (Some(item), None) => item,
            _ => {
                return Err(ModelError::InvalidListOperation(format!(
                    "can only increment single item lists, found {} items",
                    self.items.len()
                )))
            }
        };
        Ok(catalog
            .step(item, steps)?
            .map(Self::single)
            .unwrap_or_default())
    }
}

impl FromIterator<ListItem> for ListValue {
    fn from_iter<I: IntoIterator<Item = ListItem>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl std::fmt::Display for ListValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.items.iter().map(|item| item.name.as_str()).collect();
        write!(f, "{}", names.join(", "))
    }
}
