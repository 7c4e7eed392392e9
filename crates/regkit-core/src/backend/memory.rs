//! In-memory emulation of the native store.
//!
//! Case-insensitive and case-preserving like the real registry, with
//! the same error-code conventions, so the engine and its tests run
//! identically on any host. Handle bookkeeping is observable through
//! [`MemoryBackend::open_handles`], which the scoped-release
//! discipline keeps at zero between operations.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use regkit_domain::{RootKey, ValueData, SEPARATOR};

use super::{Access, OsCode, RawHandle, StoreBackend};

// Keys of both maps are case-folded; the preserved spelling rides
// along as the first tuple element for enumeration.
#[derive(Default)]
struct Node {
    children: BTreeMap<String, (String, Node)>,
    values: BTreeMap<String, (String, ValueData)>,
}

struct OpenKey {
    root: RootKey,
    segments: Vec<String>,
    access: Access,
}

#[derive(Default)]
struct State {
    roots: HashMap<RootKey, Node>,
    handles: HashMap<u64, OpenKey>,
    next_handle: u64,
}

/// Emulated store behind a mutex. Root keys exist implicitly, exactly
/// as they do in the real registry.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

fn fold(s: &str) -> String {
    s.to_lowercase()
}

// The real store treats a doubled separator as naming a key with an
// empty name, which never exists; filtering the empties out would make
// the emulation more permissive than the live backend.
fn segments(path: &str) -> Result<Vec<&str>, OsCode> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    if path.split(SEPARATOR).any(str::is_empty) {
        return Err(OsCode::NOT_FOUND);
    }
    Ok(path.split(SEPARATOR).collect())
}

// Open handles are stored as canonical segment paths and re-resolved
// on every call, so a handle to a since-deleted key reports not-found
// instead of going stale.
fn resolve(state: &State, handle: RawHandle, need: Access) -> Result<(RootKey, Vec<String>), OsCode> {
    let open = state.handles.get(&handle.0).ok_or(OsCode::NOT_FOUND)?;
    if need == Access::Write && open.access != Access::Write {
        return Err(OsCode::ACCESS_DENIED);
    }
    Ok((open.root, open.segments.clone()))
}

fn node_mut<'a>(state: &'a mut State, root: RootKey, segments: &[String]) -> Option<&'a mut Node> {
    let mut node = state.roots.entry(root).or_default();
    for segment in segments {
        node = match node.children.get_mut(segment) {
            Some((_, child)) => child,
            None => return None,
        };
    }
    Some(node)
}

fn register(state: &mut State, root: RootKey, segments: Vec<String>, access: Access) -> RawHandle {
    state.next_handle += 1;
    let id = state.next_handle;
    state.handles.insert(id, OpenKey { root, segments, access });
    RawHandle(id)
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of native handles currently open.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.state().handles.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreBackend for MemoryBackend {
    fn open(&self, root: RootKey, path: &str, access: Access) -> Result<RawHandle, OsCode> {
        let mut state = self.state();
        let segments: Vec<String> = segments(path)?.into_iter().map(fold).collect();
        if node_mut(&mut state, root, &segments).is_none() {
            return Err(OsCode::NOT_FOUND);
        }
        Ok(register(&mut state, root, segments, access))
    }

    fn create(&self, root: RootKey, path: &str) -> Result<RawHandle, OsCode> {
        let raw = segments(path)?;
        let mut state = self.state();
        let mut folded = Vec::new();
        {
            let mut node = state.roots.entry(root).or_default();
            for segment in raw {
                let key = fold(segment);
                node = &mut node
                    .children
                    .entry(key.clone())
                    .or_insert_with(|| (segment.to_string(), Node::default()))
                    .1;
                folded.push(key);
            }
        }
        Ok(register(&mut state, root, folded, Access::Write))
    }

    fn close(&self, handle: RawHandle) {
        self.state().handles.remove(&handle.0);
    }

    fn delete_key(&self, parent: RawHandle, name: &str) -> Result<(), OsCode> {
        let mut state = self.state();
        let (root, segments) = resolve(&state, parent, Access::Write)?;
        let parent_node = node_mut(&mut state, root, &segments).ok_or(OsCode::NOT_FOUND)?;
        let key = fold(name);
        match parent_node.children.get(&key) {
            None => Err(OsCode::NOT_FOUND),
            // The real store refuses to delete a key with subkeys.
            Some((_, child)) if !child.children.is_empty() => Err(OsCode::ACCESS_DENIED),
            Some(_) => {
                parent_node.children.remove(&key);
                Ok(())
            }
        }
    }

    fn enum_key_at(&self, handle: RawHandle, index: u32) -> Result<String, OsCode> {
        let mut state = self.state();
        let (root, segments) = resolve(&state, handle, Access::Read)?;
        let node = node_mut(&mut state, root, &segments).ok_or(OsCode::NOT_FOUND)?;
        node.children
            .values()
            .nth(index as usize)
            .map(|(name, _)| name.clone())
            .ok_or(OsCode::NO_MORE_ITEMS)
    }

    fn enum_value_at(&self, handle: RawHandle, index: u32) -> Result<(String, ValueData), OsCode> {
        let mut state = self.state();
        let (root, segments) = resolve(&state, handle, Access::Read)?;
        let node = node_mut(&mut state, root, &segments).ok_or(OsCode::NOT_FOUND)?;
        node.values
            .values()
            .nth(index as usize)
            .map(|(name, data)| (name.clone(), data.clone()))
            .ok_or(OsCode::NO_MORE_ITEMS)
    }

    fn query_value(&self, handle: RawHandle, name: &str) -> Result<ValueData, OsCode> {
        let mut state = self.state();
        let (root, segments) = resolve(&state, handle, Access::Read)?;
        let node = node_mut(&mut state, root, &segments).ok_or(OsCode::NOT_FOUND)?;
        node.values
            .get(&fold(name))
            .map(|(_, data)| data.clone())
            .ok_or(OsCode::NOT_FOUND)
    }

    fn set_value(&self, handle: RawHandle, name: &str, data: &ValueData) -> Result<(), OsCode> {
        let mut state = self.state();
        let (root, segments) = resolve(&state, handle, Access::Write)?;
        let node = node_mut(&mut state, root, &segments).ok_or(OsCode::NOT_FOUND)?;
        match node.values.get_mut(&fold(name)) {
            // Overwriting keeps the spelling the value was created with.
            Some((_, existing)) => *existing = data.clone(),
            None => {
                node.values
                    .insert(fold(name), (name.to_string(), data.clone()));
            }
        }
        Ok(())
    }

    fn delete_value(&self, handle: RawHandle, name: &str) -> Result<(), OsCode> {
        let mut state = self.state();
        let (root, segments) = resolve(&state, handle, Access::Write)?;
        let node = node_mut(&mut state, root, &segments).ok_or(OsCode::NOT_FOUND)?;
        node.values
            .remove(&fold(name))
            .map(|_| ())
            .ok_or(OsCode::NOT_FOUND)
    }
}
