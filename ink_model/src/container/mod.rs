//! Container tree - the static narrative graph.
//!
//! Containers live in an arena owned by [`ContainerTree`] and refer to one
//! another by [`ContainerId`]. A container owns its positional contents and its
//! named children; the link back to its parent is just an index, so the tree
//! has no ownership cycles.

mod content;

pub use content::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the root child that holds global variable declarations.
pub const GLOBAL_DECLARATIONS: &str = "global decl";

/// Stable handle to a container inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub usize);

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Counting flags carried by a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerFlags(pub u8);

impl ContainerFlags {
    pub const RECORD_VISITS: u8 = 0x1;
    pub const RECORD_TURNS: u8 = 0x2;
    pub const COUNT_START_ONLY: u8 = 0x4;

    pub fn record_visits(self) -> bool {
        self.0 & Self::RECORD_VISITS != 0
    }

    pub fn record_turns(self) -> bool {
        self.0 & Self::RECORD_TURNS != 0
    }

    pub fn count_start_only(self) -> bool {
        self.0 & Self::COUNT_START_ONLY != 0
    }
}

/// How a container hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentLink {
    /// The tree root.
    Root,
    /// One of the parent's positional contents.
    Positional { parent: ContainerId, index: usize },
    /// One of the parent's named children.
    Named { parent: ContainerId },
}

/// Where a container sits relative to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentPosition {
    /// Positional index inside the parent's contents.
    Index(usize),
    /// The container is a named child, so it has no positional successor.
    EndOfNamedChild,
    /// The container is the root.
    NoParent,
}

/// A named or anonymous ordered block of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub name: Option<String>,
    pub flags: ContainerFlags,
    pub contents: Vec<Content>,
    named_children: HashMap<String, ContainerId>,
    link: ParentLink,
}

impl Container {
    fn new(link: ParentLink) -> Self {
        Self {
            name: None,
            flags: ContainerFlags::default(),
            contents: Vec::new(),
            named_children: HashMap::new(),
            link,
        }
    }

    /// The parent container, if any.
    pub fn parent(&self) -> Option<ContainerId> {
        match self.link {
            ParentLink::Root => None,
            ParentLink::Positional { parent, .. } | ParentLink::Named { parent } => Some(parent),
        }
    }

    pub fn link(&self) -> ParentLink {
        self.link
    }

    /// Position of this container in its parent.
    pub fn position_in_parent(&self) -> ParentPosition {
        match self.link {
            ParentLink::Root => ParentPosition::NoParent,
            ParentLink::Named { .. } => ParentPosition::EndOfNamedChild,
            ParentLink::Positional { index, .. } => ParentPosition::Index(index),
        }
    }

    /// Named children, keyed by name.
    pub fn named_children(&self) -> &HashMap<String, ContainerId> {
        &self.named_children
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Display name for diagnostics.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// An executing position: a container plus an index into its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub container: ContainerId,
    pub index: usize,
}

impl Address {
    pub fn new(container: ContainerId, index: usize) -> Self {
        Self { container, index }
    }

    /// Start of a container.
    pub fn start_of(container: ContainerId) -> Self {
        Self::new(container, 0)
    }

    /// The address one item further on.
    pub fn next(self) -> Self {
        Self::new(self.container, self.index + 1)
    }

    /// Move one item forward in place.
    pub fn advance(&mut self) {
        self.index += 1;
    }
}

/// Arena of containers with a single root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerTree {
    nodes: Vec<Container>,
}

impl Default for ContainerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerTree {
    /// Create a tree holding only an empty, anonymous root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Container::new(ParentLink::Root)],
        }
    }

    /// The root container.
    pub fn root(&self) -> ContainerId {
        ContainerId(0)
    }

    /// Get container by ID.
    pub fn get(&self, id: ContainerId) -> Option<&Container> {
        self.nodes.get(id.0)
    }

    /// Get mutable container by ID.
    pub fn get_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.nodes.get_mut(id.0)
    }

    /// Number of containers in the tree.
    pub fn container_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append a positional sub-container to `parent`.
    pub fn add_container(&mut self, parent: ContainerId, name: Option<&str>) -> ContainerId {
        let id = ContainerId(self.nodes.len());
        let index = self[parent].contents.len();
        let mut container = Container::new(ParentLink::Positional { parent, index });
        container.name = name.map(str::to_owned);
        self.nodes.push(container);
        self[parent].contents.push(Content::Container(id));
        id
    }

    /// Attach a named child to `parent`.
    pub fn add_named_child(&mut self, parent: ContainerId, name: &str) -> ContainerId {
        let id = ContainerId(self.nodes.len());
        let mut container = Container::new(ParentLink::Named { parent });
        container.name = Some(name.to_owned());
        self.nodes.push(container);
        self[parent].named_children.insert(name.to_owned(), id);
        id
    }

    /// Append a content item that is not a container.
    ///
    /// Sub-containers must go through [`ContainerTree::add_container`] so that
    /// their parent link is recorded.
    pub fn push_content(&mut self, id: ContainerId, content: Content) {
        debug_assert!(
            !matches!(content, Content::Container(_)),
            "sub-containers are added with add_container"
        );
        self[id].contents.push(content);
    }

    /// Set a container's name.
    pub fn set_name(&mut self, id: ContainerId, name: impl Into<String>) {
        self[id].name = Some(name.into());
    }

    /// Set a container's flag byte.
    pub fn set_flags(&mut self, id: ContainerId, flags: u8) {
        self[id].flags = ContainerFlags(flags);
    }

    /// The parent of a container, if any.
    pub fn parent(&self, id: ContainerId) -> Option<ContainerId> {
        self[id].parent()
    }

    /// Walk parent links up to the root.
    pub fn root_of(&self, id: ContainerId) -> ContainerId {
        let mut current = id;
        while let Some(parent) = self[current].parent() {
            current = parent;
        }
        current
    }

    /// Look up a child by name.
    ///
    /// Named children are checked first, then positional sub-containers in
    /// order.
    pub fn named_child(&self, id: ContainerId, name: &str) -> Option<ContainerId> {
        let container = &self[id];
        if let Some(child) = container.named_children.get(name) {
            return Some(*child);
        }
        container.contents.iter().find_map(|content| match content {
            Content::Container(child) if self[*child].name.as_deref() == Some(name) => {
                Some(*child)
            }
            _ => None,
        })
    }

    /// Content at an address, or `None` if the address is past the end.
    pub fn content_at(&self, address: Address) -> Option<&Content> {
        self.get(address.container)
            .and_then(|container| container.contents.get(address.index))
    }

    /// Whether the address points past its container's last item.
    pub fn is_past_end(&self, address: Address) -> bool {
        address.index >= self[address.container].contents.len()
    }

    /// The first positional sub-container of the root, where stories begin.
    pub fn first_content_container(&self) -> Option<ContainerId> {
        self[self.root()].contents.iter().find_map(|content| match content {
            Content::Container(id) => Some(*id),
            _ => None,
        })
    }

    /// Iterate over every container with its ID.
    pub fn iter(&self) -> impl Iterator<Item = (ContainerId, &Container)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, container)| (ContainerId(index), container))
    }
}

impl std::ops::Index<ContainerId> for ContainerTree {
    type Output = Container;

    fn index(&self, id: ContainerId) -> &Container {
        &self.nodes[id.0]
    }
}

impl std::ops::IndexMut<ContainerId> for ContainerTree {
    fn index_mut(&mut self, id: ContainerId) -> &mut Container {
        &mut self.nodes[id.0]
    }
}
