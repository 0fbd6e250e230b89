//! Algorithmes réutilisables du moteur de vues.
//!
//! Deux familles de vues s'appuient sur ces briques : le tri-fusion en
//! cascade (vues alphabétiques et par genre) et la vue de domaine musicale.
//! Tous les parcours d'arbre source sont gardés par un ensemble de nœuds
//! visités : une entrée ré-entrante (dossier son propre ancêtre) est
//! signalée par une erreur, jamais parcourue en boucle.

use std::collections::HashSet;
use std::sync::Arc;

use dmsmodel::{NodeId, Resource, Tree, TreeError};
use dmsutils::{TitleNormalizer, fold_key};

use crate::ViewError;

/// Clone la forme d'un sous-arbre source sous `dst_node`.
///
/// Les dossiers sont des nœuds neufs ne partageant aucune collection
/// mutable avec la source; les ressources sont partagées par `Arc`.
pub fn copy_subtree(
    src: &Tree,
    src_node: NodeId,
    dst: &mut Tree,
    dst_node: NodeId,
) -> Result<(), ViewError> {
    let mut seen = HashSet::new();
    copy_subtree_inner(src, src_node, dst, dst_node, &mut seen)
}

fn copy_subtree_inner(
    src: &Tree,
    src_node: NodeId,
    dst: &mut Tree,
    dst_node: NodeId,
    seen: &mut HashSet<NodeId>,
) -> Result<(), ViewError> {
    if !seen.insert(src_node) {
        return Err(TreeError::Reentrant(src.title(src_node).to_string()).into());
    }
    for resource in src.resources(src_node) {
        dst.add_resource(dst_node, Arc::clone(resource));
    }
    for &child in src.folders(src_node) {
        let copy = dst.add_folder(dst_node, src.title(child));
        copy_subtree_inner(src, child, dst, copy, seen)?;
    }
    Ok(())
}

/// Clone l'arbre entier dans une racine de travail neuve.
pub fn clone_shape(source: &Tree) -> Result<Tree, ViewError> {
    let mut out = Tree::new(source.title(source.root()));
    let root = out.root();
    copy_subtree(source, source.root(), &mut out, root)?;
    Ok(out)
}

/// Liste tous les dossiers d'un sous-arbre, parcours préfixe.
pub fn walk_folders(tree: &Tree, from: NodeId) -> Result<Vec<NodeId>, ViewError> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            return Err(TreeError::Reentrant(tree.title(current).to_string()).into());
        }
        out.push(current);
        for &child in tree.folders(current).iter().rev() {
            stack.push(child);
        }
    }
    Ok(out)
}

/// Adopte les seaux de `staging` dans `dest`, en dissolvant les seaux de
/// moins de deux enfants en items libres.
pub fn adopt_buckets(tree: &mut Tree, staging: NodeId, dest: NodeId) -> Result<(), ViewError> {
    for bucket in tree.folders(staging).to_vec() {
        if tree.child_count(bucket) < 2 {
            for resource in tree.resources(bucket).to_vec() {
                tree.remove_resource(bucket, &resource.id);
                tree.add_resource(dest, resource);
            }
            for folder in tree.folders(bucket).to_vec() {
                tree.adopt_folder(dest, folder)?;
            }
            tree.release_folder(staging, bucket)?;
        } else {
            tree.adopt_folder(dest, bucket)?;
        }
    }
    Ok(())
}

/// Fusionne récursivement les dossiers frères de même titre.
///
/// Deux frères dont les titres sont égaux sans tenir compte de la casse
/// mais dont l'identité diffère sont combinés : les enfants concordants
/// fusionnent d'abord, puis tous les enfants du doublon rejoignent le
/// survivant et le doublon vidé est détaché. Nécessaire parce que des
/// branches indépendantes peuvent produire des seaux homonymes (deux
/// dossiers sources donnant chacun un « Rock »).
pub fn merge_duplicate_siblings(tree: &mut Tree, node: NodeId) -> Result<(), ViewError> {
    let mut survivors: std::collections::HashMap<String, NodeId> = std::collections::HashMap::new();
    for child in tree.folders(node).to_vec() {
        let key = fold_key(tree.title(child));
        match survivors.get(&key) {
            Some(&survivor) => merge_into(tree, survivor, child)?,
            None => {
                survivors.insert(key, child);
            }
        }
    }
    for child in tree.folders(node).to_vec() {
        merge_duplicate_siblings(tree, child)?;
    }
    Ok(())
}

fn merge_into(tree: &mut Tree, survivor: NodeId, duplicate: NodeId) -> Result<(), ViewError> {
    // Les enfants concordants fusionnent d'abord.
    for child in tree.folders(duplicate).to_vec() {
        let key = fold_key(tree.title(child));
        let matching = tree
            .folders(survivor)
            .iter()
            .copied()
            .find(|&f| fold_key(tree.title(f)) == key);
        match matching {
            Some(target) => merge_into(tree, target, child)?,
            None => tree.adopt_folder(survivor, child)?,
        }
    }
    // Les ressources rejoignent le survivant, sans doublon d'identité.
    for resource in tree.resources(duplicate).to_vec() {
        tree.remove_resource(duplicate, &resource.id);
        let already = tree
            .resources(survivor)
            .iter()
            .any(|r| r.id == resource.id);
        if !already {
            tree.add_resource(survivor, resource);
        }
    }
    // Le doublon vidé est détaché de son parent.
    if let Some(parent) = tree.parent(duplicate) {
        tree.release_folder(parent, duplicate)?;
    }
    Ok(())
}

/// Ajoute une couche de seaux par première lettre au-dessus des enfants
/// directs de `node`, bornant ainsi le fan-out d'un listing.
pub fn cascade(
    tree: &mut Tree,
    node: NodeId,
    normalizer: &dyn TitleNormalizer,
) -> Result<(), ViewError> {
    for folder in tree.folders(node).to_vec() {
        let letter = normalizer.bucket(tree.title(folder));
        let bucket = tree.get_or_create_child(node, &letter);
        if bucket != folder {
            tree.adopt_folder(bucket, folder)?;
        }
    }
    for resource in tree.resources(node).to_vec() {
        let letter = normalizer.bucket(&resource.title);
        let bucket = tree.get_or_create_child(node, &letter);
        tree.remove_resource(node, &resource.id);
        tree.add_resource(bucket, resource);
    }
    Ok(())
}

/// Élague les dossiers ne contenant transitivement aucune ressource.
pub fn prune_empty_folders(tree: &mut Tree, node: NodeId) -> Result<(), ViewError> {
    for child in tree.folders(node).to_vec() {
        prune_empty_folders(tree, child)?;
        if tree.full_child_count(child) == 0 {
            tree.release_folder(node, child)?;
        }
    }
    Ok(())
}

/// Fabrique un clone d'une ressource au titre décoré, même identité.
///
/// L'égalité des items étant portée par l'id, l'item décoré reste le même
/// objet logique : seul le titre affiché change.
pub fn decorated(resource: &Arc<Resource>, album: Option<&str>) -> Arc<Resource> {
    match album {
        Some(album) => {
            let mut clone = (**resource).clone();
            clone.title = format!("{} ({})", resource.title, album);
            Arc::new(clone)
        }
        None => Arc::clone(resource),
    }
}
