//! Change tracking for document values.
//!
//! Documents never hand out raw mutable access to their JSON tree. Writers go
//! through [`TrackedValue`], [`TrackedMap`] and [`TrackedList`] views, which
//! pair a borrowed node with the [`Owner`] of the resource it belongs to.
//! Descending into a nested container yields a view with the same owner, so a
//! mutation at any depth marks the top-level resource dirty.

use serde_json::{Map, Value};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Shared dirty flag of a resource.
///
/// An owner may have a parent. Marking an owner dirty marks every ancestor
/// too; clearing only affects the owner itself.
#[derive(Clone, Default)]
pub struct Owner(Rc<OwnerState>);

#[derive(Default)]
struct OwnerState {
    dirty: Cell<bool>,
    parent: Option<Owner>,
}

impl Owner {
    /// Create a clean owner with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clean owner whose marks bubble into `self`.
    pub fn child(&self) -> Self {
        Owner(Rc::new(OwnerState {
            dirty: Cell::new(false),
            parent: Some(self.clone()),
        }))
    }

    /// Whether uncommitted mutations exist.
    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    /// Mark this owner and all of its ancestors dirty.
    pub fn mark_dirty(&self) {
        let mut current = Some(self);
        while let Some(owner) = current {
            owner.0.dirty.set(true);
            current = owner.0.parent.as_ref();
        }
    }

    /// Clear this owner's flag. Ancestors are left alone.
    pub fn clear(&self) {
        self.0.dirty.set(false);
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("dirty", &self.is_dirty())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

/// A tracked view of any JSON node.
pub struct TrackedValue<'a> {
    value: &'a mut Value,
    owner: &'a Owner,
}

impl<'a> TrackedValue<'a> {
    /// Wrap a node with the owner that mutations should mark.
    pub fn new(value: &'a mut Value, owner: &'a Owner) -> Self {
        Self { value, owner }
    }

    /// Read the node.
    pub fn get(&self) -> &Value {
        &*self.value
    }

    /// The owner this view marks.
    pub fn owner(&self) -> &Owner {
        self.owner
    }

    /// Replace the node, marking the owner only if the value changes.
    ///
    /// Returns the previous value.
    pub fn replace(&mut self, value: impl Into<Value>) -> Value {
        let value = value.into();
        if *self.value != value {
            self.owner.mark_dirty();
        }
        std::mem::replace(self.value, value)
    }

    /// View the node as a map, if it is one.
    pub fn into_map(self) -> Option<TrackedMap<'a>> {
        match self.value {
            Value::Object(map) => Some(TrackedMap::new(map, self.owner)),
            _ => None,
        }
    }

    /// View the node as a list, if it is one.
    pub fn into_list(self) -> Option<TrackedList<'a>> {
        match self.value {
            Value::Array(list) => Some(TrackedList::new(list, self.owner)),
            _ => None,
        }
    }
}

/// A tracked view of a JSON object.
pub struct TrackedMap<'a> {
    map: &'a mut Map<String, Value>,
    owner: &'a Owner,
}

impl<'a> TrackedMap<'a> {
    /// Wrap a map with the owner that mutations should mark.
    pub fn new(map: &'a mut Map<String, Value>, owner: &'a Owner) -> Self {
        Self { map, owner }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }

    /// Store `value` under `key`.
    ///
    /// The owner is marked only when the new value differs structurally from
    /// the current one. An existing key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if self.map.get(&key) != Some(&value) {
            self.owner.mark_dirty();
        }
        self.map.insert(key, value)
    }

    /// Remove `key`. Always marks the owner, present or not.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.owner.mark_dirty();
        self.map.shift_remove(key)
    }

    /// Tracked view of the value under `key`.
    pub fn entry_mut(&mut self, key: &str) -> Option<TrackedValue<'_>> {
        let owner = self.owner;
        self.map.get_mut(key).map(|value| TrackedValue::new(value, owner))
    }

    /// Tracked view of a nested map.
    pub fn map_mut(&mut self, key: &str) -> Option<TrackedMap<'_>> {
        self.entry_mut(key).and_then(TrackedValue::into_map)
    }

    /// Tracked view of a nested list.
    pub fn list_mut(&mut self, key: &str) -> Option<TrackedList<'_>> {
        self.entry_mut(key).and_then(TrackedValue::into_list)
    }
}

/// A tracked view of a JSON array.
pub struct TrackedList<'a> {
    list: &'a mut Vec<Value>,
    owner: &'a Owner,
}

impl<'a> TrackedList<'a> {
    /// Wrap a list with the owner that mutations should mark.
    pub fn new(list: &'a mut Vec<Value>, owner: &'a Owner) -> Self {
        Self { list, owner }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.list.get(index)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.list.iter()
    }

    /// Replace the item at `index`, marking the owner if it changes.
    ///
    /// Returns the previous item, or `None` (and changes nothing) when the
    /// index is out of range.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Option<Value> {
        let slot = self.list.get_mut(index)?;
        let value = value.into();
        if *slot != value {
            self.owner.mark_dirty();
        }
        Some(std::mem::replace(slot, value))
    }

    /// Append an item.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.owner.mark_dirty();
        self.list.push(value.into());
    }

    /// Insert an item, shifting later items. Returns `false` when `index` is
    /// past the end.
    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> bool {
        if index > self.list.len() {
            return false;
        }
        self.owner.mark_dirty();
        self.list.insert(index, value.into());
        true
    }

    /// Remove the item at `index`. Always marks the owner.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        self.owner.mark_dirty();
        if index < self.list.len() {
            Some(self.list.remove(index))
        } else {
            None
        }
    }

    /// Tracked view of the item at `index`.
    pub fn entry_mut(&mut self, index: usize) -> Option<TrackedValue<'_>> {
        let owner = self.owner;
        self.list
            .get_mut(index)
            .map(|value| TrackedValue::new(value, owner))
    }

    /// Tracked view of a nested map.
    pub fn map_mut(&mut self, index: usize) -> Option<TrackedMap<'_>> {
        self.entry_mut(index).and_then(TrackedValue::into_map)
    }

    /// Tracked view of a nested list.
    pub fn list_mut(&mut self, index: usize) -> Option<TrackedList<'_>> {
        self.entry_mut(index).and_then(TrackedValue::into_list)
    }
}
