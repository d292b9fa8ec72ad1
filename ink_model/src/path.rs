//! Paths - dotted references into the container tree.
//!
//! A path is either root-relative (`0.2.Baz`, `knot.stitch`) or relative to
//! the container doing the lookup (`.^.s`, `.^.^.0`). In a relative path the
//! leading `^` only marks the path as relative; each further `^` ascends one
//! level.

use serde::{Deserialize, Serialize};

use crate::container::{Address, Content, ContainerId, ContainerTree};
use crate::error::ModelError;

/// The reserved segment that means "enclosing container".
pub const PARENT_SEGMENT: &str = "^";

/// One element of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Index(usize),
    Name(String),
    Parent,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw == PARENT_SEGMENT {
            Segment::Parent
        } else if let Ok(index) = raw.parse::<usize>() {
            Segment::Index(index)
        } else {
            Segment::Name(raw.to_owned())
        }
    }
}

/// A textual reference into the container tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(String);

impl Path {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into segments.
    ///
    /// Empty pieces are dropped, so the leading `.` of `.^.s` disappears.
    pub fn segments(&self) -> Vec<Segment> {
        self.0
            .split('.')
            .filter(|raw| !raw.is_empty())
            .map(Segment::parse)
            .collect()
    }

    /// Whether the path is resolved against the current container.
    pub fn is_relative(&self) -> bool {
        matches!(self.segments().first(), Some(Segment::Parent))
    }

    fn unresolved(&self) -> ModelError {
        ModelError::UnresolvedPath {
            path: self.0.clone(),
        }
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for Path {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ContainerTree {
    /// Resolve a path to a concrete address.
    ///
    /// Root-relative paths ignore `current` apart from using it to find the
    /// root. Relative paths walk from `current`.
    pub fn resolve(&self, path: &Path, current: ContainerId) -> Result<Address, ModelError> {
        let segments = path.segments();
        match segments.first() {
            None => Err(ModelError::EmptyPath),
            Some(Segment::Parent) => self.resolve_relative(path, &segments, current),
            Some(_) => self.resolve_absolute(path, &segments, current),
        }
    }

    fn resolve_absolute(
        &self,
        path: &Path,
        segments: &[Segment],
        current: ContainerId,
    ) -> Result<Address, ModelError> {
        let mut container = self.root_of(current);
        let mut index = 0;

        for segment in segments {
            match segment {
                Segment::Index(position) => match self[container].contents.get(*position) {
                    Some(Content::Container(child)) => {
                        container = *child;
                        index = 0;
                    }
                    // Anything else is the final content index, including one
                    // past the end.
                    Some(_) => index = *position,
                    None if *position == self[container].contents.len() => index = *position,
                    None => return Err(path.unresolved()),
                },
                Segment::Name(name) => {
                    container = self
                        .named_child(container, name)
                        .ok_or_else(|| path.unresolved())?;
                    index = 0;
                }
                Segment::Parent => {
                    container = self.parent(container).ok_or_else(|| path.unresolved())?;
                    index = 0;
                }
            }
        }

        Ok(Address::new(container, index))
    }

    fn resolve_relative(
        &self,
        path: &Path,
        segments: &[Segment],
        current: ContainerId,
    ) -> Result<Address, ModelError> {
        // A bare `.^` is the start of the current container.
        let Some((last, middle)) = segments[1..].split_last() else {
            return Ok(Address::start_of(current));
        };

        let mut container = current;
        for segment in middle {
            container = match segment {
                Segment::Index(position) => match self[container].contents.get(*position) {
                    Some(Content::Container(child)) => *child,
                    _ => {
                        return Err(ModelError::NotAContainer {
                            path: path.as_str().to_owned(),
                            index: *position,
                        })
                    }
                },
                Segment::Name(name) => self
                    .named_child(container, name)
                    .ok_or_else(|| path.unresolved())?,
                Segment::Parent => self.parent(container).ok_or_else(|| path.unresolved())?,
            };
        }

        match last {
            Segment::Index(position) => Ok(Address::new(container, *position)),
            Segment::Parent => self
                .parent(container)
                .map(Address::start_of)
                .ok_or_else(|| path.unresolved()),
            Segment::Name(name) => self
                .named_child(container, name)
                .map(Address::start_of)
                .ok_or_else(|| path.unresolved()),
        }
    }
}
