//! JSON document resources and fragments.
//!
//! A [`Document`] owns a JSON tree, the [`Owner`] its mutations mark, and the
//! [`Fragment`]s spawned from it. Fragments copy a subtree out of their
//! parent and write it back when the parent's save cascade reaches them.

use crate::error::{Error, Result};
use crate::path::{JsonPath, Rebase, Segment};
use crate::tracked::{Owner, TrackedList, TrackedMap, TrackedValue};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A JSON tree with change tracking and path access.
#[derive(Debug)]
pub struct Document {
    value: Value,
    owner: Owner,
    fragments: Vec<Fragment>,
}

impl Document {
    /// A document with its own, clean owner.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_owner(value.into(), Owner::new())
    }

    pub(crate) fn with_owner(value: Value, owner: Owner) -> Self {
        Self {
            value,
            owner,
            fragments: Vec::new(),
        }
    }

    /// Read-only view of the whole tree.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn is_dirty(&self) -> bool {
        self.owner.is_dirty()
    }

    /// Tracked view of the root node.
    pub fn root_mut(&mut self) -> TrackedValue<'_> {
        TrackedValue::new(&mut self.value, &self.owner)
    }

    /// Tracked view of the map at `path`.
    pub fn map_mut(&mut self, path: &str) -> Result<TrackedMap<'_>> {
        let parsed = parse_node_path(path)?;
        let owner = &self.owner;
        let node = resolve_mut(&mut self.value, &parsed)?;
        TrackedValue::new(node, owner)
            .into_map()
            .ok_or_else(|| Error::not_found(path, "not a map"))
    }

    /// Tracked view of the list at `path`.
    pub fn list_mut(&mut self, path: &str) -> Result<TrackedList<'_>> {
        let parsed = parse_node_path(path)?;
        let owner = &self.owner;
        let node = resolve_mut(&mut self.value, &parsed)?;
        TrackedValue::new(node, owner)
            .into_list()
            .ok_or_else(|| Error::not_found(path, "not a list"))
    }

    /// Value at `path`.
    pub fn get(&self, path: &str) -> Result<&Value> {
        self.get_at(&JsonPath::parse(path)?)
    }

    pub fn get_at(&self, path: &JsonPath) -> Result<&Value> {
        reject_wildcard(path)?;
        resolve(&self.value, path)
    }

    /// Whether `path` resolves.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    /// Assign `value` at `path`, creating missing intermediate containers.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.set_at(&JsonPath::parse(path)?, value.into())
    }

    pub fn set_at(&mut self, path: &JsonPath, value: Value) -> Result<()> {
        reject_wildcard(path)?;
        let Some((parent_path, last)) = path.split_last() else {
            self.root_mut().replace(value);
            return Ok(());
        };

        // Nothing is created unless the whole assignment can succeed
        check_assignable(&self.value, path)?;

        let owner = &self.owner;
        let parent = create_path(&mut self.value, owner, &parent_path, Some(last))?;

        match (parent, last) {
            (Value::Object(map), Segment::Key(key)) => {
                TrackedMap::new(map, owner).set(key.clone(), value);
                Ok(())
            }
            (Value::Object(_), Segment::Index(_)) => {
                Err(Error::not_found(path.to_string(), "map needs a key"))
            }
            (Value::Array(list), _) => {
                let index = last
                    .as_index()
                    .ok_or_else(|| Error::not_found(path.to_string(), "list needs an index"))?;
                let mut list = TrackedList::new(list, owner);
                if index == list.len() {
                    list.push(value);
                    Ok(())
                } else {
                    list.set(index, value)
                        .map(|_| ())
                        .ok_or_else(|| Error::not_found(path.to_string(), "index out of range"))
                }
            }
            _ => Err(Error::not_found(
                path.to_string(),
                "parent is not a container",
            )),
        }
    }

    /// Remove the value at `path`.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        self.pop(path).map(|_| ())
    }

    /// Remove and return the value at `path`.
    pub fn pop(&mut self, path: &str) -> Result<Value> {
        self.pop_at(&JsonPath::parse(path)?)
    }

    /// Remove and return the value at `path`.
    ///
    /// Registered fragments are re-pointed as in [`Document::delete_fragment`].
    pub fn pop_at(&mut self, path: &JsonPath) -> Result<Value> {
        reject_wildcard(path)?;
        let removed = self.canonical(path)?;
        let Some((parent_path, last)) = removed.split_last() else {
            return Err(Error::not_found(path.to_string(), "cannot remove the root"));
        };

        let owner = &self.owner;
        let parent = resolve_mut(&mut self.value, &parent_path)?;
        let value = match (parent, last) {
            (Value::Object(map), Segment::Key(key)) => TrackedMap::new(map, owner).delete(key),
            (Value::Array(list), Segment::Index(index)) => {
                TrackedList::new(list, owner).remove(*index)
            }
            _ => None,
        }
        .ok_or_else(|| Error::not_found(path.to_string(), format!("no entry {}", last)))?;

        self.rebase_fragments(&removed);
        Ok(value)
    }

    /// Children of the container addressed by `path`, which must end in `*`.
    ///
    /// Map children are yielded as `path/key`, list children as `path/[i]`.
    pub fn enumerate(&self, path: &str) -> Result<Children<'_>> {
        let parsed = JsonPath::parse(path)?;
        if !parsed.is_wildcard() {
            return Err(Error::ambiguous_path(path, "enumeration must end with *"));
        }

        let prefix = parsed.without_wildcard();
        let inner = match resolve(&self.value, &prefix)? {
            Value::Object(map) => ChildrenInner::Map(map.iter()),
            Value::Array(list) => ChildrenInner::List(list.iter().enumerate()),
            _ => {
                return Err(Error::ambiguous_path(
                    path,
                    "found a single element, not a list or map",
                ));
            }
        };

        Ok(Children {
            prefix: prefix.to_string(),
            inner,
        })
    }

    /// The fragment for `locator`, registering one if none exists yet.
    ///
    /// The fragment starts with a copy of the subtree at `locator`.
    pub fn fragment(&mut self, locator: &str) -> Result<&mut Fragment> {
        let locator = self.canonical(&parse_node_path(locator)?)?;

        let index = match self.fragments.iter().position(|f| f.locator == locator) {
            Some(index) => index,
            None => {
                let fragment = Fragment::new(self, locator)?;
                tracing::debug!(locator = %fragment.locator, "registered fragment");
                self.fragments.push(fragment);
                self.fragments.len() - 1
            }
        };

        Ok(&mut self.fragments[index])
    }

    /// Register a fragment for every child of the container at `path/*`.
    pub fn fragments_at(&mut self, path: &str) -> Result<Vec<&mut Fragment>> {
        let locators: Vec<String> = self.enumerate(path)?.map(|(p, _)| p).collect();

        let mut wanted = Vec::with_capacity(locators.len());
        for locator in &locators {
            wanted.push(self.fragment(locator)?.locator.clone());
        }

        Ok(self
            .fragments
            .iter_mut()
            .filter(|f| wanted.contains(&f.locator))
            .collect())
    }

    /// Fragments registered on this document, in registration order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragments_mut(&mut self) -> &mut [Fragment] {
        &mut self.fragments
    }

    /// Registered fragment at `locator`.
    pub fn find_fragment(&self, locator: &str) -> Result<&Fragment> {
        let index = self.fragment_index(locator)?;
        Ok(&self.fragments[index])
    }

    pub fn find_fragment_mut(&mut self, locator: &str) -> Result<&mut Fragment> {
        let index = self.fragment_index(locator)?;
        Ok(&mut self.fragments[index])
    }

    /// Delete the fragment at `locator`, removing its subtree from this document.
    ///
    /// Sibling fragments after it in the same list are re-pointed at their
    /// new indices; fragments inside the removed subtree are dropped.
    pub fn delete_fragment(&mut self, locator: &str) -> Result<()> {
        let index = self.fragment_index(locator)?;
        self.remove_fragment(index)
    }

    /// Save every fragment into this document, children first.
    pub(crate) fn flush_fragments(&mut self, force: bool) -> Result<()> {
        let mut fragments = std::mem::take(&mut self.fragments);
        let result = fragments.iter_mut().try_for_each(|f| f.save_into(self, force));
        self.fragments = fragments;
        result
    }

    /// Delete every fragment from this document, last registered first.
    pub(crate) fn delete_fragments(&mut self) -> Result<()> {
        while !self.fragments.is_empty() {
            match self.remove_fragment(self.fragments.len() - 1) {
                Ok(()) => {}
                // Already removed along with an ancestor's subtree
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn remove_fragment(&mut self, index: usize) -> Result<()> {
        let mut fragment = self.fragments.remove(index);
        // Siblings are re-pointed by the removal itself
        fragment.delete_from(self)?;
        tracing::debug!(locator = %fragment.locator, "deleted fragment");
        Ok(())
    }

    /// Re-point or drop registered fragments after `removed` left the tree.
    fn rebase_fragments(&mut self, removed: &JsonPath) {
        self.fragments.retain_mut(|fragment| {
            match fragment.locator.rebase_after_removal(removed) {
                Rebase::Invalidated => false,
                Rebase::Shifted => {
                    fragment.refresh_identifier();
                    true
                }
                Rebase::Unaffected => true,
            }
        });
    }

    fn fragment_index(&self, locator: &str) -> Result<usize> {
        let parsed = parse_node_path(locator)?;
        let parsed = self.canonical(&parsed).unwrap_or(parsed);
        self.fragments
            .iter()
            .position(|f| f.locator == parsed)
            .ok_or_else(|| Error::not_found(locator, "no fragment registered at this path"))
    }

    /// Rewrite digit keys that address list items as `[i]` segments.
    fn canonical(&self, path: &JsonPath) -> Result<JsonPath> {
        let mut current = &self.value;
        let mut segments = Vec::with_capacity(path.segments().len());
        for segment in path.segments() {
            let (next, canonical) = step(current, segment).ok_or_else(|| {
                Error::not_found(path.to_string(), format!("no entry {}", segment))
            })?;
            current = next;
            segments.push(canonical);
        }
        Ok(JsonPath::from_segments(segments))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(&self.value).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// A sub-tree of a parent document, addressed by a path inside it.
#[derive(Debug)]
pub struct Fragment {
    document: Document,
    locator: JsonPath,
    identifier: String,
}

impl Fragment {
    fn new(parent: &Document, locator: JsonPath) -> Result<Self> {
        let value = parent.get_at(&locator)?.clone();
        let identifier = identifier_of(&locator);
        Ok(Self {
            document: Document::with_owner(value, parent.owner.child()),
            locator,
            identifier,
        })
    }

    /// Where this fragment lives inside its parent.
    pub fn locator(&self) -> &JsonPath {
        &self.locator
    }

    /// Final locator segment, used as a readable name.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Write this fragment back into `parent`, nested fragments first.
    fn save_into(&mut self, parent: &mut Document, force: bool) -> Result<()> {
        if !(force || self.document.is_dirty()) {
            return Ok(());
        }

        self.document.flush_fragments(force)?;
        parent.set_at(&self.locator, self.document.value.clone())?;
        self.document.owner.clear();
        Ok(())
    }

    /// Remove this fragment's subtree from `parent`, nested fragments first.
    fn delete_from(&mut self, parent: &mut Document) -> Result<()> {
        self.document.delete_fragments()?;
        parent.owner.mark_dirty();
        parent.pop_at(&self.locator)?;
        Ok(())
    }

    fn refresh_identifier(&mut self) {
        self.identifier = identifier_of(&self.locator);
    }
}

impl Deref for Fragment {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

impl DerefMut for Fragment {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\": {}", self.identifier, self.document)
    }
}

impl fmt::Debug for Children<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            ChildrenInner::Map(_) => "map",
            ChildrenInner::List(_) => "list",
        };
        f.debug_struct("Children")
            .field("prefix", &self.prefix)
            .field("kind", &kind)
            .finish()
    }
}

fn identifier_of(locator: &JsonPath) -> String {
    locator.last().map(ToString::to_string).unwrap_or_default()
}

/// Lazily produced `(child_path, value)` pairs of one container.
pub struct Children<'a> {
    prefix: String,
    inner: ChildrenInner<'a>,
}

enum ChildrenInner<'a> {
    Map(serde_json::map::Iter<'a>),
    List(std::iter::Enumerate<std::slice::Iter<'a, Value>>),
}

impl<'a> Children<'a> {
    fn child_path(&self, segment: Segment) -> String {
        if self.prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", self.prefix, segment)
        }
    }
}

impl<'a> Iterator for Children<'a> {
    type Item = (String, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        let (segment, value) = match &mut self.inner {
            ChildrenInner::Map(iter) => {
                let (key, value) = iter.next()?;
                (Segment::Key(key.clone()), value)
            }
            ChildrenInner::List(iter) => {
                let (index, value) = iter.next()?;
                (Segment::Index(index), value)
            }
        };
        Some((self.child_path(segment), value))
    }
}

/// Parse a path that addresses a single node.
fn parse_node_path(path: &str) -> Result<JsonPath> {
    let parsed = JsonPath::parse(path)?;
    reject_wildcard(&parsed)?;
    Ok(parsed)
}

/// `*` only means something to [`Document::enumerate`].
fn reject_wildcard(path: &JsonPath) -> Result<()> {
    if path.is_wildcard() {
        return Err(Error::ambiguous_path(
            path.to_string(),
            "* enumerates children and cannot address a node",
        ));
    }
    Ok(())
}

/// One step down the tree, returning the child and its canonical segment.
fn step<'v>(node: &'v Value, segment: &Segment) -> Option<(&'v Value, Segment)> {
    match node {
        Value::Object(map) => match segment {
            Segment::Key(key) => map.get(key).map(|v| (v, segment.clone())),
            Segment::Index(_) => None,
        },
        Value::Array(list) => {
            let index = segment.as_index()?;
            list.get(index).map(|v| (v, Segment::Index(index)))
        }
        _ => None,
    }
}

fn resolve<'v>(root: &'v Value, path: &JsonPath) -> Result<&'v Value> {
    let mut current = root;
    for segment in path.segments() {
        current = step(current, segment)
            .map(|(next, _)| next)
            .ok_or_else(|| Error::not_found(path.to_string(), format!("no entry {}", segment)))?;
    }
    Ok(current)
}

fn resolve_mut<'v>(root: &'v mut Value, path: &JsonPath) -> Result<&'v mut Value> {
    let mut current = root;
    for segment in path.segments() {
        let missing = || Error::not_found(path.to_string(), format!("no entry {}", segment));
        current = match current {
            Value::Object(map) => match segment {
                Segment::Key(key) => map.get_mut(key).ok_or_else(missing)?,
                Segment::Index(_) => return Err(missing()),
            },
            Value::Array(list) => {
                let index = segment.as_index().ok_or_else(missing)?;
                list.get_mut(index).ok_or_else(missing)?
            }
            _ => return Err(missing()),
        };
    }
    Ok(current)
}

/// Check that assigning at `path` would succeed, without touching `root`.
///
/// Mirrors [`create_path`] followed by the final assignment: a missing step
/// becomes a new container, and a new list only accepts index 0.
fn check_assignable(root: &Value, path: &JsonPath) -> Result<()> {
    let refuse = |segment: &Segment| {
        Error::not_found(path.to_string(), format!("cannot assign through {}", segment))
    };

    // `None` once the walk has left the existing tree
    let mut current = Some(root);
    for segment in path.segments() {
        current = match current {
            Some(Value::Object(map)) => match segment {
                Segment::Key(key) => map.get(key),
                Segment::Index(_) => return Err(refuse(segment)),
            },
            Some(Value::Array(list)) => {
                let index = segment.as_index().ok_or_else(|| refuse(segment))?;
                if index > list.len() {
                    return Err(refuse(segment));
                }
                list.get(index)
            }
            Some(_) => return Err(refuse(segment)),
            None => {
                if matches!(segment, Segment::Index(index) if *index != 0) {
                    return Err(refuse(segment));
                }
                None
            }
        };
    }
    Ok(())
}

/// Walk `path`, creating missing containers through tracked views.
///
/// A missing step becomes a list when the segment after it is an index, and a
/// map otherwise. `last` is the segment the caller will assign after the walk.
fn create_path<'v>(
    root: &'v mut Value,
    owner: &Owner,
    path: &JsonPath,
    last: Option<&Segment>,
) -> Result<&'v mut Value> {
    let segments = path.segments();
    let mut current = root;

    for (i, segment) in segments.iter().enumerate() {
        let next = segments.get(i + 1).or(last);
        let empty = match next {
            Some(Segment::Index(_)) => Value::Array(Vec::new()),
            _ => Value::Object(Map::new()),
        };
        let missing = || Error::not_found(path.to_string(), format!("cannot create {}", segment));

        current = match current {
            Value::Object(map) => {
                let Segment::Key(key) = segment else {
                    return Err(missing());
                };
                if !map.contains_key(key) {
                    TrackedMap::new(&mut *map, owner).set(key.clone(), empty);
                }
                map.get_mut(key).ok_or_else(missing)?
            }
            Value::Array(list) => {
                let index = segment.as_index().ok_or_else(missing)?;
                if index == list.len() {
                    TrackedList::new(&mut *list, owner).push(empty);
                }
                list.get_mut(index).ok_or_else(missing)?
            }
            _ => return Err(missing()),
        };
    }

    Ok(current)
}
