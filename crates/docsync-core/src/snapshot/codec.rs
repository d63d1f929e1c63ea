use std::collections::HashSet;

use crate::errors::{DocSyncError, Result};
use crate::model::schema;
use crate::model::{Attributes, NodeId, NodeRef, Owner, ID_ATTRIBUTE};
use crate::ops::{collection_ops, model_ops, SetOptions};
use crate::registry::Registry;

use super::tree::{CollectionSnapshot, Snapshot};

/// Options for [`export_snapshot`]
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Include child collections and child models
    pub recurse: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { recurse: true }
    }
}

/// Options for [`import_snapshot`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Apply without raising any events
    pub silent: bool,
}

/// Export a model, and by default its whole subtree
///
/// # Errors
/// * `StaleHandle` / `WrongNodeKind` - `model` is not a live model
pub fn export_snapshot(
    registry: &Registry,
    model: NodeRef,
    options: ExportOptions,
) -> Result<Snapshot> {
    let node = registry.model(model)?;
    let mut snapshot = Snapshot {
        id: node.id.clone(),
        cid: Some(model.correlation_tag()),
        attrs: node.attributes.clone(),
        ..Default::default()
    };
    if !options.recurse {
        return Ok(snapshot);
    }

    for (label, child) in &node.child_collections {
        let collection = registry.collection(*child)?;
        let models = collection
            .items
            .iter()
            .map(|item| export_snapshot(registry, *item, options))
            .collect::<Result<Vec<_>>>()?;
        snapshot.collections.insert(
            label.clone(),
            CollectionSnapshot {
                id: collection.id.clone(),
                models,
            },
        );
    }
    for (label, child) in &node.child_models {
        snapshot
            .models
            .insert(label.clone(), export_snapshot(registry, *child, options)?);
    }
    Ok(snapshot)
}

/// Merge a snapshot into an existing local model
///
/// Identifiers in the snapshot are adopted. Collection members are matched
/// by identifier; unmatched members are created from the collection's
/// element type and appended after their own import. Local members missing
/// from the snapshot are left alone and nothing is reordered, so importing
/// the same snapshot twice changes nothing. Members without an identifier
/// can never be matched and are appended again on every import.
///
/// The whole snapshot is checked before anything is written: on error the
/// local tree is untouched and nothing is published. While the import runs,
/// the snapshot's identifiers are kept away from freshly minted ones.
///
/// # Errors
/// * `UnknownChildLabel` - the snapshot names a child the model lacks
/// * `DuplicateIdentifier` - a snapshot identifier belongs to an unrelated
///   node, or appears twice in the snapshot
/// * `TypeMismatch` - snapshot attributes fail the model's schema
pub fn import_snapshot(
    registry: &mut Registry,
    model: NodeRef,
    snapshot: &Snapshot,
    options: ImportOptions,
) -> Result<()> {
    let mut check = Precheck::new(registry);
    check.model(registry, model, snapshot, false)?;
    let claimed = check.into_claimed();

    registry.reserve_ids(claimed);
    let result = merge_model(registry, model, snapshot, options);
    registry.release_reserved();
    result
}

/// Merge a collection snapshot into an existing local collection
///
/// Same contract as [`import_snapshot`].
pub(crate) fn import_collection(
    registry: &mut Registry,
    collection: NodeRef,
    snapshot: &CollectionSnapshot,
    options: ImportOptions,
) -> Result<()> {
    let mut check = Precheck::new(registry);
    check.collection(registry, collection, snapshot, false)?;
    let claimed = check.into_claimed();

    registry.reserve_ids(claimed);
    let result = merge_collection(registry, collection, snapshot, options);
    registry.release_reserved();
    result
}

/// Read-only pass over a snapshot, failing where the merge would fail
///
/// Members that do not exist yet are built in a scratch observer registry
/// so their declared children can be resolved without touching `target`.
struct Precheck<'a> {
    target: &'a Registry,
    claimed: HashSet<NodeId>,
}

impl<'a> Precheck<'a> {
    fn new(target: &'a Registry) -> Self {
        Self {
            target,
            claimed: HashSet::new(),
        }
    }

    fn into_claimed(self) -> HashSet<NodeId> {
        self.claimed
    }

    /// `fresh` nodes live in a scratch registry and will be new in `target`
    fn claim(&mut self, id: Option<&NodeId>, local: NodeRef, fresh: bool) -> Result<()> {
        let Some(id) = id else {
            return Ok(());
        };
        let holder = self.target.lookup(id.as_str());
        let conflicts = match holder {
            None => false,
            Some(_) if fresh => true,
            Some(holder) => holder != local,
        };
        if conflicts || !self.claimed.insert(id.clone()) {
            return Err(DocSyncError::DuplicateIdentifier { id: id.to_string() });
        }
        Ok(())
    }

    fn model(
        &mut self,
        local: &Registry,
        model: NodeRef,
        snapshot: &Snapshot,
        fresh: bool,
    ) -> Result<()> {
        self.claim(snapshot.id.as_ref(), model, fresh)?;

        let kind = local.model(model)?.kind.clone();
        for (key, tag) in kind.required() {
            if let Some(value) = snapshot.attrs.get(key) {
                schema::validate(*tag, Some(value), key, kind.type_name())?;
            }
        }

        for (label, coll_snapshot) in &snapshot.collections {
            let collection = local
                .child_collection(model, label)
                .ok_or_else(|| unknown_label(local, model, label))?;
            self.collection(local, collection, coll_snapshot, fresh)?;
        }
        for (label, child_snapshot) in &snapshot.models {
            let child = local
                .child_model(model, label)
                .ok_or_else(|| unknown_label(local, model, label))?;
            self.model(local, child, child_snapshot, fresh)?;
        }
        Ok(())
    }

    fn collection(
        &mut self,
        local: &Registry,
        collection: NodeRef,
        snapshot: &CollectionSnapshot,
        fresh: bool,
    ) -> Result<()> {
        self.claim(snapshot.id.as_ref(), collection, fresh)?;

        for member in &snapshot.models {
            match existing_member(local, collection, member) {
                Some(child) => self.model(local, child, member, fresh)?,
                None => {
                    let element = local.collection(collection)?.kind.element_type();
                    let mut scratch = Registry::observer();
                    let child = model_ops::create_model(&mut scratch, element, Attributes::new())?;
                    self.model(&scratch, child, member, true)?;
                }
            }
        }
        Ok(())
    }
}

fn unknown_label(registry: &Registry, model: NodeRef, label: &str) -> DocSyncError {
    DocSyncError::UnknownChildLabel {
        node: registry.describe(model),
        label: label.to_string(),
    }
}

/// Local member of `collection` the snapshot refers to, if any
fn existing_member(
    registry: &Registry,
    collection: NodeRef,
    member: &Snapshot,
) -> Option<NodeRef> {
    member
        .id
        .as_ref()
        .and_then(|id| registry.lookup(id.as_str()))
        .filter(|node| {
            registry
                .collection(collection)
                .is_ok_and(|c| c.items.contains(node))
        })
}

fn merge_model(
    registry: &mut Registry,
    model: NodeRef,
    snapshot: &Snapshot,
    options: ImportOptions,
) -> Result<()> {
    if let Some(id) = &snapshot.id {
        registry.assign_id(model, id.clone())?;
    }

    let mut attrs = snapshot.attrs.clone();
    if attrs.remove(ID_ATTRIBUTE).is_some() {
        tracing::debug!(node = %model, "Ignoring id attribute in snapshot");
    }
    model_ops::set_attributes_with(
        registry,
        model,
        attrs,
        SetOptions {
            silent: options.silent,
        },
    )?;

    for (label, coll_snapshot) in &snapshot.collections {
        let collection = registry
            .child_collection(model, label)
            .ok_or_else(|| unknown_label(registry, model, label))?;
        merge_collection(registry, collection, coll_snapshot, options)?;
    }

    for (label, child_snapshot) in &snapshot.models {
        let child = registry
            .child_model(model, label)
            .ok_or_else(|| unknown_label(registry, model, label))?;
        merge_model(registry, child, child_snapshot, options)?;
    }
    Ok(())
}

fn merge_collection(
    registry: &mut Registry,
    collection: NodeRef,
    snapshot: &CollectionSnapshot,
    options: ImportOptions,
) -> Result<()> {
    if let Some(id) = &snapshot.id {
        registry.assign_id(collection, id.clone())?;
    }

    for member in &snapshot.models {
        match existing_member(registry, collection, member) {
            Some(child) => merge_model(registry, child, member, options)?,
            None => merge_new_member(registry, collection, member, options)?,
        }
    }
    Ok(())
}

fn merge_new_member(
    registry: &mut Registry,
    collection: NodeRef,
    snapshot: &Snapshot,
    options: ImportOptions,
) -> Result<()> {
    let element = registry.collection(collection)?.kind.element_type();
    let child = model_ops::build_model(registry, element, Attributes::new(), snapshot.id.clone())?;
    registry.model_mut(child)?.owner = Some(Owner::Collection(collection));

    let silent_child = ImportOptions { silent: true };
    let attached = merge_model(registry, child, snapshot, silent_child)
        .and_then(|()| collection_ops::add_with(registry, collection, child, options.silent));
    if let Err(err) = attached {
        registry.discard(child);
        return Err(err);
    }
    tracing::debug!(
        collection = %collection,
        node = %child,
        "Imported new collection member"
    );
    Ok(())
}
