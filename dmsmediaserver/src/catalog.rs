//! Interface du catalogue de médias.
//!
//! Le catalogue est le collaborateur qui énumère les fichiers physiques et
//! fournit l'arbre initial; le cœur ne fait que le consommer. Le signal de
//! changement est un canal `watch` portant un numéro de génération : chaque
//! incrément déclenche une reconstruction des vues et une bascule de
//! montage (voir `registry::spawn_rescan`).

use dmsmodel::Tree;
use tokio::sync::watch;

/// Fournisseur de l'arbre physique et de son signal de changement.
pub trait MediaCatalog: Send + Sync {
    /// Construit l'arbre physique courant.
    fn scan(&self) -> anyhow::Result<Tree>;

    /// Canal de notification : la valeur change à chaque rescan nécessaire.
    fn changes(&self) -> watch::Receiver<u64>;
}

/// Catalogue en mémoire, pour les tests et les bibliothèques figées.
pub struct StaticCatalog {
    tree: Tree,
    tx: watch::Sender<u64>,
}

impl StaticCatalog {
    pub fn new(tree: Tree) -> Self {
        let (tx, _) = watch::channel(0);
        Self { tree, tx }
    }

    /// Signale un changement de contenu aux montages abonnés.
    pub fn notify_changed(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }
}

impl MediaCatalog for StaticCatalog {
    fn scan(&self) -> anyhow::Result<Tree> {
        Ok(self.tree.clone())
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_catalog_notifies() {
        let catalog = StaticCatalog::new(Tree::new("Media"));
        let mut rx = catalog.changes();
        assert_eq!(*rx.borrow(), 0);

        catalog.notify_changed();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);

        assert!(catalog.scan().is_ok());
    }
}
