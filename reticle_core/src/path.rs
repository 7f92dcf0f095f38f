//! Path expressions into document trees.
//!
//! Grammar: segments separated by `/`; `[i]` addresses a list index; any
//! other segment is a map key (or a list index, when it is all digits and the
//! container turns out to be a list); a trailing `*` asks for the children of
//! the addressed node. Empty segments are ignored, so `""` and `"/"` both name
//! the root.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Wildcard marker requesting enumeration.
pub const WILDCARD: &str = "*";

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Map key.
    Key(String),
    /// List index, written `[i]`.
    Index(usize),
}

impl Segment {
    /// Index this segment addresses inside a list, if any.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(key) if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) => {
                key.parse().ok()
            }
            Segment::Key(_) => None,
        }
    }

    fn parse(raw: &str) -> Self {
        if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']'))
            && let Ok(index) = inner.parse::<usize>()
        {
            return Segment::Index(index);
        }
        Segment::Key(raw.to_string())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath {
    segments: Vec<Segment>,
    wildcard: bool,
}

/// How a path is affected by the removal of another path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebase {
    /// The path does not depend on the removed node.
    Unaffected,
    /// A later sibling in the same list was removed; the index was shifted down.
    Shifted,
    /// The path pointed at or into the removed node.
    Invalidated,
}

impl JsonPath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path expression.
    ///
    /// A `*` anywhere but the last segment is rejected as ambiguous.
    pub fn parse(expr: &str) -> Result<Self> {
        let raw: Vec<&str> = expr.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut wildcard = false;

        for (i, part) in raw.iter().enumerate() {
            if *part == WILDCARD {
                if i + 1 != raw.len() {
                    return Err(Error::ambiguous_path(
                        expr,
                        "wildcard is only allowed as the last segment",
                    ));
                }
                wildcard = true;
                continue;
            }
            segments.push(Segment::parse(part));
        }

        Ok(Self { segments, wildcard })
    }

    /// Build a path from segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            wildcard: false,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the path ends with the enumeration marker.
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The same path without the enumeration marker.
    pub fn without_wildcard(&self) -> Self {
        Self::from_segments(self.segments.clone())
    }

    /// Split into parent path and final segment. `None` for the root.
    pub fn split_last(&self) -> Option<(JsonPath, &Segment)> {
        let (last, init) = self.segments.split_last()?;
        Some((JsonPath::from_segments(init.to_vec()), last))
    }

    /// Append a segment.
    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self::from_segments(segments)
    }

    /// Whether `self` equals `other` or lies underneath it.
    pub fn starts_with(&self, other: &JsonPath) -> bool {
        self.segments.len() >= other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }

    /// Adjust this path after `removed` was deleted from the same tree.
    ///
    /// Removing item `i` of a list moves every later item up by one; paths
    /// through those items are rewritten to match.
    pub fn rebase_after_removal(&mut self, removed: &JsonPath) -> Rebase {
        if self.starts_with(removed) {
            return Rebase::Invalidated;
        }

        let Some((list_path, Segment::Index(removed_index))) = removed.split_last() else {
            return Rebase::Unaffected;
        };
        if !self.starts_with(&list_path) {
            return Rebase::Unaffected;
        }

        let depth = list_path.segments.len();
        match self.segments.get(depth).and_then(Segment::as_index) {
            Some(index) if index > *removed_index => {
                self.segments[depth] = Segment::Index(index - 1);
                Rebase::Shifted
            }
            _ => Rebase::Unaffected,
        }
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        if self.wildcard {
            if !self.segments.is_empty() {
                f.write_str("/")?;
            }
            f.write_str(WILDCARD)?;
        }
        Ok(())
    }
}

impl FromStr for JsonPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        JsonPath::parse(s)
    }
}
