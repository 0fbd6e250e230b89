//! Arbre de dossiers virtuels.
//!
//! L'arbre est une arène : les nœuds vivent dans un `Vec` et se référencent
//! par index ([`NodeId`]). Le parent d'un nœud est un index détenu par
//! l'arène, jamais une poignée propriétaire, ce qui interdit les cycles de
//! références au démontage. L'acyclicité structurelle est vérifiée à chaque
//! adoption : un dossier ne peut pas être adopté dans sa propre descendance.
//!
//! Toutes les mutations sont synchrones et mono-thread : elles n'ont lieu
//! que pendant la phase de construction d'une génération, avant publication.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dmsutils::fold_key;

use crate::comparers::{Comparer, SortKey};
use crate::resource::Resource;

/// Index d'un nœud dossier dans l'arène.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Erreurs de manipulation de l'arbre.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("cycle detected: folder '{0}' cannot be adopted into its own subtree")]
    Cycle(String),

    #[error("the root folder cannot be adopted or released")]
    RootMove,

    #[error("folder is not a child of the given parent")]
    NotAChild,

    #[error("tree traversal revisited folder '{0}'")]
    Reentrant(String),
}

/// Un nœud dossier de l'arène.
#[derive(Debug, Clone)]
struct FolderNode {
    /// Id déterministe, dérivé du chemin de titres lors de [`Tree::reindex`].
    id: String,
    title: String,
    parent: Option<NodeId>,
    folders: Vec<NodeId>,
    resources: Vec<Arc<Resource>>,
    /// Index des enfants par clé normalisée (accès « get-or-create »).
    by_key: HashMap<String, NodeId>,
}

impl FolderNode {
    fn new(title: String, parent: Option<NodeId>) -> Self {
        Self {
            id: String::new(),
            title,
            parent,
            folders: Vec::new(),
            resources: Vec::new(),
            by_key: HashMap::new(),
        }
    }
}

/// L'arbre de dossiers virtuels d'une génération.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<FolderNode>,
    root: NodeId,
    /// Index id → nœud, reconstruit par [`Tree::reindex`].
    folder_ids: HashMap<String, NodeId>,
    /// Index id → ressource attachée, reconstruit par [`Tree::reindex`].
    resource_ids: HashMap<String, Arc<Resource>>,
    /// Premier dossier contenant chaque ressource, même reconstruction.
    resource_homes: HashMap<String, NodeId>,
}

impl Tree {
    /// Crée un arbre réduit à sa racine.
    pub fn new(root_title: impl Into<String>) -> Self {
        let root = FolderNode::new(root_title.into(), None);
        Self {
            nodes: vec![root],
            root: NodeId(0),
            folder_ids: HashMap::new(),
            resource_ids: HashMap::new(),
            resource_homes: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &FolderNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut FolderNode {
        &mut self.nodes[id.index()]
    }

    pub fn title(&self, id: NodeId) -> &str {
        &self.node(id).title
    }

    /// Id publié du dossier. Vide tant que [`Tree::reindex`] n'a pas tourné.
    pub fn folder_id(&self, id: NodeId) -> &str {
        &self.node(id).id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn folders(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).folders
    }

    pub fn resources(&self, id: NodeId) -> &[Arc<Resource>] {
        &self.node(id).resources
    }

    /// Nombre d'enfants directs, dossiers et ressources confondus.
    pub fn child_count(&self, id: NodeId) -> usize {
        let node = self.node(id);
        node.folders.len() + node.resources.len()
    }

    /// Nombre récursif de ressources sous ce dossier.
    pub fn full_child_count(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let node = self.node(current);
            count += node.resources.len();
            stack.extend(node.folders.iter().copied());
        }
        count
    }

    /// Crée un dossier enfant et l'attache à `parent`.
    pub fn add_folder(&mut self, parent: NodeId, title: impl Into<String>) -> NodeId {
        let child = NodeId(self.nodes.len() as u32);
        self.nodes.push(FolderNode::new(title.into(), Some(parent)));
        self.node_mut(parent).folders.push(child);
        child
    }

    /// Accès par clé : retourne l'enfant dont la clé normalisée correspond,
    /// en le créant au premier accès.
    ///
    /// La clé est insensible à la casse et aux zéros numériques de tête :
    /// `"rock"` et `"ROCK"` désignent le même dossier.
    pub fn get_or_create_child(&mut self, parent: NodeId, title: &str) -> NodeId {
        let key = fold_key(title);
        if let Some(&existing) = self.node(parent).by_key.get(&key) {
            return existing;
        }
        let child = self.add_folder(parent, title);
        self.node_mut(parent).by_key.insert(key, child);
        child
    }

    /// Ajoute une ressource aux enfants directs du dossier.
    pub fn add_resource(&mut self, folder: NodeId, resource: Arc<Resource>) {
        self.node_mut(folder).resources.push(resource);
    }

    /// Retire une ressource des enfants directs. Retourne `false` si absente.
    pub fn remove_resource(&mut self, folder: NodeId, resource_id: &str) -> bool {
        let resources = &mut self.node_mut(folder).resources;
        match resources.iter().position(|r| r.id == resource_id) {
            Some(pos) => {
                resources.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Vrai si `ancestor` figure sur le chemin de `node` vers la racine.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        // Garde-fou : jamais plus de sauts que de nœuds dans l'arène.
        for _ in 0..=self.nodes.len() {
            match current {
                Some(n) if n == ancestor => return true,
                Some(n) => current = self.node(n).parent,
                None => return false,
            }
        }
        true
    }

    /// Détache `child` de son parent actuel sans le détruire.
    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self.node(child).parent {
            let parent = self.node_mut(old_parent);
            parent.folders.retain(|&f| f != child);
            parent.by_key.retain(|_, &mut v| v != child);
            self.node_mut(child).parent = None;
        }
    }

    /// Adopte `child` comme dernier enfant de `parent`.
    ///
    /// Le dossier est détaché de son parent précédent le cas échéant.
    /// Adopter un enfant déjà direct ne change pas la structure (la
    /// relation parent est simplement réaffirmée). L'adoption dans sa
    /// propre descendance est refusée.
    pub fn adopt_folder(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if child == self.root {
            return Err(TreeError::RootMove);
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(TreeError::Cycle(self.node(child).title.clone()));
        }
        if self.node(child).parent == Some(parent) {
            return Ok(());
        }
        self.detach(child);
        self.node_mut(parent).folders.push(child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Détache `child` de `parent` sans le détruire, pour ré-adoption.
    pub fn release_folder(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if child == self.root {
            return Err(TreeError::RootMove);
        }
        if self.node(child).parent != Some(parent) {
            return Err(TreeError::NotAChild);
        }
        self.detach(child);
        Ok(())
    }

    /// Trie en place les enfants directs (dossiers et ressources).
    pub fn sort_children(&mut self, folder: NodeId, comparer: &dyn Comparer, descending: bool) {
        let mut folder_keys: Vec<(NodeId, SortKey)> = self
            .node(folder)
            .folders
            .iter()
            .map(|&f| {
                let n = self.node(f);
                (
                    f,
                    SortKey {
                        title: n.title.clone(),
                        id: n.id.clone(),
                        modified: None,
                    },
                )
            })
            .collect();
        folder_keys.sort_by(|(_, a), (_, b)| {
            let ord = comparer.compare(a, b);
            if descending { ord.reverse() } else { ord }
        });
        self.node_mut(folder).folders = folder_keys.into_iter().map(|(f, _)| f).collect();

        let resources = &mut self.node_mut(folder).resources;
        resources.sort_by(|a, b| {
            let ka = SortKey {
                title: a.title.clone(),
                id: a.id.clone(),
                modified: a.modified,
            };
            let kb = SortKey {
                title: b.title.clone(),
                id: b.id.clone(),
                modified: b.modified,
            };
            let ord = comparer.compare(&ka, &kb);
            if descending { ord.reverse() } else { ord }
        });
    }

    /// Trie tout l'arbre, dossier par dossier.
    pub fn sort_recursive(&mut self, comparer: &dyn Comparer, descending: bool) {
        let mut stack = vec![self.root];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            self.sort_children(current, comparer, descending);
            stack.extend(self.node(current).folders.iter().copied());
        }
    }

    /// Collecte toutes les ressources du sous-arbre, ordre de parcours.
    ///
    /// Refuse les entrées ré-entrantes : un dossier rencontré deux fois
    /// signale un arbre corrompu plutôt que de boucler.
    pub fn collect_resources(&self, from: NodeId) -> Result<Vec<Arc<Resource>>, TreeError> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_resources_into(from, &mut seen, &mut out)?;
        Ok(out)
    }

    fn collect_resources_into(
        &self,
        from: NodeId,
        seen: &mut HashSet<NodeId>,
        out: &mut Vec<Arc<Resource>>,
    ) -> Result<(), TreeError> {
        if !seen.insert(from) {
            return Err(TreeError::Reentrant(self.node(from).title.clone()));
        }
        let node = self.node(from);
        out.extend(node.resources.iter().cloned());
        for &child in &node.folders {
            self.collect_resources_into(child, seen, out)?;
        }
        Ok(())
    }

    /// Reconstruit les ids de dossiers et les index de résolution.
    ///
    /// L'id d'un dossier est dérivé de son chemin de titres normalisés, de
    /// sorte que deux constructions identiques produisent les mêmes ids et
    /// que des requêtes répétées résolvent identiquement. La racine reçoit
    /// l'ObjectID UPnP conventionnel `"0"`.
    pub fn reindex(&mut self) {
        self.folder_ids.clear();
        self.resource_ids.clear();
        self.resource_homes.clear();

        let mut stack: Vec<(NodeId, String)> = vec![(self.root, String::new())];
        let mut seen = HashSet::new();
        let mut assigned = HashSet::new();

        while let Some((current, path)) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let mut id = if current == self.root {
                "0".to_string()
            } else {
                derive_folder_id(&path)
            };
            // Deux enfants homonymes d'un même parent : désambiguïser par
            // ordinal, déterministe à ordre de construction égal.
            let mut ordinal = 1;
            while !assigned.insert(id.clone()) {
                ordinal += 1;
                id = derive_folder_id(&format!("{}#{}", path, ordinal));
            }
            self.node_mut(current).id = id.clone();
            self.folder_ids.insert(id, current);

            for resource in self.node(current).resources.clone() {
                self.resource_homes
                    .entry(resource.id.clone())
                    .or_insert(current);
                self.resource_ids
                    .entry(resource.id.clone())
                    .or_insert(resource);
            }
            for child in self.node(current).folders.clone() {
                let child_path = format!("{}/{}", path, fold_key(self.title(child)));
                stack.push((child, child_path));
            }
        }

        tracing::debug!(
            folders = self.folder_ids.len(),
            resources = self.resource_ids.len(),
            "tree reindexed"
        );
    }

    /// Résout un id de dossier publié.
    pub fn find_folder(&self, id: &str) -> Option<NodeId> {
        self.folder_ids.get(id).copied()
    }

    /// Résout un id de ressource attachée à cette génération.
    pub fn find_resource(&self, id: &str) -> Option<Arc<Resource>> {
        self.resource_ids.get(id).cloned()
    }

    /// Premier dossier contenant la ressource, dans l'ordre de parcours.
    pub fn find_resource_home(&self, id: &str) -> Option<NodeId> {
        self.resource_homes.get(id).copied()
    }
}

/// Hache un chemin de titres normalisés en id stable.
fn derive_folder_id(path: &str) -> String {
    // DefaultHasher::new() utilise des clés fixes : le même chemin produit
    // le même id d'une exécution à l'autre.
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    path.hash(&mut hasher);
    format!("f{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MediaKind, Resource};

    fn resource(id: &str, title: &str) -> Arc<Resource> {
        Arc::new(Resource::new(id, title, MediaKind::Audio, "audio/flac"))
    }

    #[test]
    fn test_full_child_count_is_recursive() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let a = tree.add_folder(root, "A");
        let b = tree.add_folder(a, "B");
        tree.add_resource(root, resource("r1", "One"));
        tree.add_resource(a, resource("r2", "Two"));
        tree.add_resource(b, resource("r3", "Three"));
        tree.add_resource(b, resource("r4", "Four"));

        assert_eq!(tree.full_child_count(root), 4);
        assert_eq!(tree.full_child_count(a), 3);
        assert_eq!(tree.child_count(root), 2); // A + r1
    }

    #[test]
    fn test_remove_resource() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        tree.add_resource(root, resource("r1", "One"));

        assert!(tree.remove_resource(root, "r1"));
        assert!(!tree.remove_resource(root, "r1"));
        assert_eq!(tree.child_count(root), 0);
    }

    #[test]
    fn test_adopt_reparents() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let a = tree.add_folder(root, "A");
        let b = tree.add_folder(root, "B");

        tree.adopt_folder(a, b).unwrap();
        assert_eq!(tree.parent(b), Some(a));
        assert_eq!(tree.folders(root), &[a]);
        assert_eq!(tree.folders(a), &[b]);
    }

    #[test]
    fn test_adopt_is_idempotent_in_shape() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let a = tree.add_folder(root, "A");

        tree.adopt_folder(root, a).unwrap();
        assert_eq!(tree.folders(root), &[a]);
        assert_eq!(tree.parent(a), Some(root));
    }

    #[test]
    fn test_adopt_into_descendant_is_rejected() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let a = tree.add_folder(root, "A");
        let b = tree.add_folder(a, "B");

        let err = tree.adopt_folder(b, a).unwrap_err();
        assert!(matches!(err, TreeError::Cycle(_)));
        // La structure n'a pas bougé.
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.parent(b), Some(a));
    }

    #[test]
    fn test_release_then_readopt() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let a = tree.add_folder(root, "A");
        let b = tree.add_folder(root, "B");

        tree.release_folder(root, b).unwrap();
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.folders(root), &[a]);

        tree.adopt_folder(a, b).unwrap();
        assert_eq!(tree.parent(b), Some(a));

        assert!(matches!(
            tree.release_folder(root, b),
            Err(TreeError::NotAChild)
        ));
    }

    #[test]
    fn test_keyed_access_is_idempotent() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let rock = tree.get_or_create_child(root, "rock");
        let rock2 = tree.get_or_create_child(root, "ROCK");

        assert_eq!(rock, rock2);
        assert_eq!(tree.folders(root).len(), 1);
        // Le titre conservé est celui du premier accès.
        assert_eq!(tree.title(rock), "rock");
    }

    #[test]
    fn test_reindex_is_deterministic() {
        let build = || {
            let mut tree = Tree::new("Root");
            let root = tree.root();
            let a = tree.add_folder(root, "Albums");
            tree.add_folder(a, "Abbey Road");
            tree.add_resource(a, resource("r1", "Come Together"));
            tree.reindex();
            tree
        };
        let t1 = build();
        let t2 = build();

        let a1 = t1.folders(t1.root())[0];
        let a2 = t2.folders(t2.root())[0];
        assert_eq!(t1.folder_id(a1), t2.folder_id(a2));
        assert_eq!(t1.folder_id(t1.root()), "0");
        assert!(t1.find_folder(t1.folder_id(a1)).is_some());
        assert!(t1.find_resource("r1").is_some());
        assert!(t1.find_resource("missing").is_none());
    }

    #[test]
    fn test_reindex_disambiguates_homonyms() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let a = tree.add_folder(root, "Dup");
        let b = tree.add_folder(root, "Dup");
        tree.reindex();

        assert_ne!(tree.folder_id(a), tree.folder_id(b));
        assert_eq!(tree.find_folder(tree.folder_id(a)), Some(a));
        assert_eq!(tree.find_folder(tree.folder_id(b)), Some(b));
    }

    #[test]
    fn test_collect_resources_in_order() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let a = tree.add_folder(root, "A");
        tree.add_resource(root, resource("r1", "One"));
        tree.add_resource(a, resource("r2", "Two"));

        let all = tree.collect_resources(root).unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }
}
