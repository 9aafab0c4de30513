//! Attaches the expander's listeners to every qualifying surface.
//!
//! The same traversal handles the startup walk and every subtree added later. Registration is
//! keyed by node id, so walking a subtree twice never adds a second listener.

use std::collections::HashSet;

use crate::dom::Document;
use crate::dom::ListenerKind;
use crate::dom::Mutation;
use crate::dom::NodeId;
use crate::surface::SurfaceClassifier;
use crate::surface::editor_container;

#[derive(Debug, Default)]
pub struct SurfaceWatcher {
    instrumented: HashSet<NodeId>,
}

impl SurfaceWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_instrumented(&self, node: NodeId) -> bool {
        self.instrumented.contains(&node)
    }

    pub fn instrumented_count(&self) -> usize {
        self.instrumented.len()
    }

    /// Instrument every qualifying element in `root`'s subtree, descending into same-origin
    /// frames. Returns how many elements were newly instrumented.
    pub fn instrument_tree(
        &mut self,
        doc: &mut Document,
        classifier: &mut SurfaceClassifier,
        root: NodeId,
    ) -> usize {
        let mut added = 0;
        let mut pending = vec![root];
        while let Some(subtree_root) = pending.pop() {
            for node in doc.subtree(subtree_root) {
                if doc.tag(node) == Some("iframe") {
                    match doc.content_root(node) {
                        Ok(frame_root) => pending.push(frame_root),
                        Err(err) => tracing::debug!("skipping frame: {err}"),
                    }
                    continue;
                }
                if classifier.kind(doc, node).is_unsupported()
                    || self.instrumented.contains(&node)
                    || self.covered_by_editor(doc, node)
                {
                    continue;
                }
                let registered = doc
                    .add_listener(node, ListenerKind::Input)
                    .and_then(|()| doc.add_listener(node, ListenerKind::KeyDown));
                match registered {
                    Ok(()) => {
                        self.instrumented.insert(node);
                        added += 1;
                    }
                    Err(err) => tracing::warn!("failed to instrument surface: {err}"),
                }
            }
        }
        if added > 0 {
            tracing::debug!(added, "instrumented surfaces");
        }
        added
    }

    /// Descendants of an instrumented embedded editor are handled through the editor.
    fn covered_by_editor(&self, doc: &Document, node: NodeId) -> bool {
        editor_container(doc, node)
            .is_some_and(|container| container != node && self.instrumented.contains(&container))
    }

    /// Drop bookkeeping for removed nodes.
    pub fn forget_tree(&mut self, classifier: &mut SurfaceClassifier, removed: &[NodeId]) {
        for node in removed {
            self.instrumented.remove(node);
            classifier.forget(*node);
        }
    }

    /// Apply a batch of mutation records.
    pub fn handle_mutations(
        &mut self,
        doc: &mut Document,
        classifier: &mut SurfaceClassifier,
        mutations: &[Mutation],
    ) {
        for mutation in mutations {
            match mutation {
                Mutation::Added(node) => {
                    if doc.is_alive(*node) {
                        self.instrument_tree(doc, classifier, *node);
                    }
                }
                Mutation::Removed(nodes) => self.forget_tree(classifier, nodes),
            }
        }
    }

    /// The instrumented surface that `target` belongs to (itself or its nearest instrumented
    /// ancestor).
    pub fn surface_for(&self, doc: &Document, target: NodeId) -> Option<NodeId> {
        let mut current = Some(target);
        while let Some(node) = current {
            if self.instrumented.contains(&node) {
                return Some(node);
            }
            current = doc.parent(node);
        }
        None
    }
}
