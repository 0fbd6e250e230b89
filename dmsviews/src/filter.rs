//! Vues filtrantes.
//!
//! Une vue filtrante enveloppe un prédicat `allowed(resource) -> bool` et
//! reconstruit l'arbre en ne gardant que les dossiers contenant
//! transitivement au moins une ressource admise.

use std::collections::HashSet;
use std::sync::Arc;

use dmsmodel::{MediaKind, NodeId, Resource, Tree, TreeError, default_comparer};

use crate::{View, ViewError};

/// Copie filtrée d'un sous-arbre; retourne vrai si quelque chose est gardé.
fn copy_filtered(
    src: &Tree,
    src_node: NodeId,
    dst: &mut Tree,
    dst_node: NodeId,
    allowed: &dyn Fn(&Resource) -> bool,
    seen: &mut HashSet<NodeId>,
) -> Result<bool, ViewError> {
    if !seen.insert(src_node) {
        return Err(TreeError::Reentrant(src.title(src_node).to_string()).into());
    }
    let mut kept = false;
    for resource in src.resources(src_node) {
        if allowed(resource) {
            dst.add_resource(dst_node, Arc::clone(resource));
            kept = true;
        }
    }
    for &child in src.folders(src_node) {
        let copy = dst.add_folder(dst_node, src.title(child));
        if copy_filtered(src, child, dst, copy, allowed, seen)? {
            kept = true;
        } else {
            dst.release_folder(dst_node, copy)?;
        }
    }
    Ok(kept)
}

/// Vue filtrante par nature de média (audio, vidéo ou image).
pub struct KindFilterView {
    kind: MediaKind,
    name: &'static str,
    description: &'static str,
}

impl KindFilterView {
    pub fn audio() -> Self {
        Self {
            kind: MediaKind::Audio,
            name: "audio",
            description: "Only folders containing audio",
        }
    }

    pub fn video() -> Self {
        Self {
            kind: MediaKind::Video,
            name: "video",
            description: "Only folders containing video",
        }
    }

    pub fn image() -> Self {
        Self {
            kind: MediaKind::Image,
            name: "image",
            description: "Only folders containing images",
        }
    }
}

impl View for KindFilterView {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn transform(&self, source: &Tree) -> Result<Tree, ViewError> {
        let mut out = Tree::new(source.title(source.root()));
        let root = out.root();
        let kind = self.kind;
        let mut seen = HashSet::new();
        copy_filtered(
            source,
            source.root(),
            &mut out,
            root,
            &|r| r.kind == kind,
            &mut seen,
        )?;
        out.sort_recursive(default_comparer().as_ref(), false);
        out.reindex();
        Ok(out)
    }
}
