//! List definitions and the catalog derived from them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{ListItem, ListValue};
use crate::container::ListInit;
use crate::error::ModelError;

/// Global list declarations: list name -> item name -> rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListDefinitions(BTreeMap<String, BTreeMap<String, i64>>);

impl ListDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) a list definition.
    pub fn define<'a>(
        &mut self,
        name: impl Into<String>,
        items: impl IntoIterator<Item = (&'a str, i64)>,
    ) {
        let items = items
            .into_iter()
            .map(|(item, rank)| (item.to_owned(), rank))
            .collect();
        self.0.insert(name.into(), items);
    }

    /// Ranks declared for one definition.
    pub fn get(&self, name: &str) -> Option<&BTreeMap<String, i64>> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Item names declared by more than one definition.
    ///
    /// Such items are only reachable through their qualified
    /// `Origin.Item` name.
    pub fn duplicated_item_names(&self) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut duplicated = BTreeSet::new();
        for items in self.0.values() {
            for name in items.keys() {
                if !seen.insert(name.clone()) {
                    duplicated.insert(name.clone());
                }
            }
        }
        duplicated
    }

    /// Build the full item universe of every definition.
    pub fn derive_items(&self) -> ListCatalog {
        let mut universes = HashMap::new();
        let mut ordered = HashMap::new();

        for (origin, items) in &self.0 {
            let universe: ListValue = items
                .iter()
                .map(|(name, rank)| ListItem::new(origin.as_str(), name.as_str(), *rank))
                .collect();
            ordered.insert(origin.clone(), universe.to_sorted_vec());
            universes.insert(origin.clone(), universe);
        }

        let duplicated = self.duplicated_item_names();
        if !duplicated.is_empty() {
            tracing::debug!(?duplicated, "Items shared between lists need qualified names");
        }
        tracing::debug!(lists = universes.len(), "Derived list catalog");

        ListCatalog { universes, ordered }
    }
}

/// Every declared list realized as a [`ListValue`], plus rank order for
/// increment and decrement.
#[derive(Debug, Clone, Default)]
pub struct ListCatalog {
    universes: HashMap<String, ListValue>,
    /// Each definition's items in rank order; an item's successor is the next
    /// element.
    ordered: HashMap<String, Vec<ListItem>>,
}

impl ListCatalog {
    /// All items of one definition.
    pub fn universe(&self, origin: &str) -> Result<&ListValue, ModelError> {
        self.universes
            .get(origin)
            .ok_or_else(|| ModelError::UnknownList(origin.to_owned()))
    }

    /// Look up an item by origin and name.
    pub fn item(&self, origin: &str, name: &str) -> Result<&ListItem, ModelError> {
        self.ordered
            .get(origin)
            .ok_or_else(|| ModelError::UnknownList(origin.to_owned()))?
            .iter()
            .find(|item| item.name == name)
            .ok_or_else(|| ModelError::UnknownListItem {
                list: origin.to_owned(),
                item: name.to_owned(),
            })
    }

    /// Look up an item written as `Origin.Item`.
    pub fn item_by_qualified_name(&self, qualified: &str) -> Result<&ListItem, ModelError> {
        let (origin, name) = qualified.split_once('.').ok_or_else(|| {
            ModelError::InvalidListOperation(format!("{qualified} is not a qualified list item"))
        })?;
        self.item(origin, name)
    }

    /// The item of `origin` with exactly this rank, if one exists.
    pub fn item_with_rank(&self, origin: &str, rank: i64) -> Result<Option<&ListItem>, ModelError> {
        Ok(self
            .ordered
            .get(origin)
            .ok_or_else(|| ModelError::UnknownList(origin.to_owned()))?
            .iter()
            .find(|item| item.rank == rank))
    }

    /// The item `steps` positions away from `item` within its definition.
    pub fn step(&self, item: &ListItem, steps: i64) -> Result<Option<ListItem>, ModelError> {
        let ordered = self
            .ordered
            .get(&item.origin)
            .ok_or_else(|| ModelError::UnknownList(item.origin.clone()))?;
        let position = ordered
            .iter()
            .position(|candidate| candidate == item)
            .ok_or_else(|| ModelError::UnknownListItem {
                list: item.origin.clone(),
                item: item.name.clone(),
            })?;

        let target = (position as i64)
            .checked_add(steps)
            .and_then(|target| usize::try_from(target).ok());
        Ok(target.and_then(|target| ordered.get(target)).cloned())
    }

    /// Turn a list literal into a value: whole origin lists plus each
    /// qualified item.
    pub fn realize(&self, init: &ListInit) -> Result<ListValue, ModelError> {
        let mut list = ListValue::new();
        for origin in &init.origins {
            list = list.union(self.universe(origin)?);
        }
        for qualified in &init.items {
            list.insert(self.item_by_qualified_name(qualified)?.clone());
        }
        Ok(list)
    }
}
