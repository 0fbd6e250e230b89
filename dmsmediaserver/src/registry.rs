//! Registre des montages et câblage des rescans.
//!
//! Le compteur de préfixes appartient au registre qui construit les
//! montages : pas d'état statique au niveau du process. L'enregistrement
//! HTTP passe par le trait d'extension [`MediaServerExt`], qui ajoute la
//! notion de montage à `dmsserver::Server` sans que celui-ci connaisse
//! UPnP.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use dmsmodel::Tree;
use dmsserver::Server;
use dmsviews::View;

use crate::auth::Authorizer;
use crate::catalog::MediaCatalog;
use crate::mount::Mount;
use crate::streams::MediaStreams;

/// Fabrique et annuaire des montages d'un serveur.
pub struct MountRegistry {
    base_url: String,
    counter: AtomicUsize,
    mounts: RwLock<Vec<Arc<Mount>>>,
}

impl MountRegistry {
    /// # Arguments
    ///
    /// * `base_url` - Base absolue du serveur (ex: "http://10.0.0.2:8200"),
    ///   reprise dans les URLs de ressources des documents DIDL-Lite.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            counter: AtomicUsize::new(0),
            mounts: RwLock::new(Vec::new()),
        }
    }

    /// Préfixe unique pour le prochain montage.
    fn next_prefix(&self) -> String {
        format!("/dms/{}", self.counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Crée un montage sur un préfixe généré.
    pub fn create_mount(
        &self,
        friendly_name: impl Into<String>,
        tree: Arc<Tree>,
        authorizer: Arc<dyn Authorizer>,
        streams: Arc<dyn MediaStreams>,
    ) -> Arc<Mount> {
        let prefix = self.next_prefix();
        let mount = Arc::new(Mount::new(
            prefix,
            friendly_name,
            self.base_url.clone(),
            tree,
            authorizer,
            streams,
        ));
        self.mounts.write().push(Arc::clone(&mount));
        mount
    }

    /// Tous les montages créés, dans l'ordre de création.
    pub fn mounts(&self) -> Vec<Arc<Mount>> {
        self.mounts.read().clone()
    }

    /// Retrouve un montage par préfixe.
    pub fn find(&self, prefix: &str) -> Option<Arc<Mount>> {
        self.mounts
            .read()
            .iter()
            .find(|m| m.prefix() == prefix)
            .cloned()
    }
}

/// Extension de `dmsserver::Server` pour les montages média.
#[async_trait]
pub trait MediaServerExt {
    /// Monte le routeur d'un montage sous son préfixe.
    async fn register_mount(&mut self, mount: &Arc<Mount>);
}

#[async_trait]
impl MediaServerExt for Server {
    async fn register_mount(&mut self, mount: &Arc<Mount>) {
        info!(
            "Mount '{}' available at {}{}/description.xml",
            mount.friendly_name(),
            self.base_url(),
            mount.prefix(),
        );
        self.add_router(mount.prefix(), mount.router()).await;
    }
}

/// Construit la génération initiale d'un montage.
///
/// Si la vue échoue (entrée cyclique, données manquantes), on sert l'arbre
/// physique brut plutôt que de laisser le montage sans racine.
pub fn initial_tree(catalog: &dyn MediaCatalog, view: &dyn View) -> anyhow::Result<Arc<Tree>> {
    let mut physical = catalog.scan()?;
    match view.transform(&physical) {
        Ok(tree) => Ok(Arc::new(tree)),
        Err(e) => {
            warn!(view = view.name(), error = %e, "view build failed, serving raw tree");
            physical.reindex();
            Ok(Arc::new(physical))
        }
    }
}

/// Câble le rescan d'un montage : à chaque signal du catalogue, reconstruit
/// la vue et bascule la génération. Un échec de reconstruction est
/// journalisé et la génération précédente reste servie; les requêtes en
/// vol ne sont jamais bloquées.
pub fn spawn_rescan(
    mount: Arc<Mount>,
    view: Arc<dyn View>,
    catalog: Arc<dyn MediaCatalog>,
) -> JoinHandle<()> {
    let mut changes = catalog.changes();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let rebuilt = catalog
                .scan()
                .and_then(|physical| view.transform(&physical).map_err(anyhow::Error::from));
            match rebuilt {
                Ok(tree) => mount.swap_tree(Arc::new(tree)),
                Err(e) => {
                    warn!(
                        mount = mount.prefix(),
                        view = view.name(),
                        error = %e,
                        "rescan rebuild failed, keeping previous generation"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AllowAll;
    use crate::catalog::StaticCatalog;
    use crate::streams::FsMediaStreams;
    use dmsviews::{ViewParams, make_view};

    fn sample_catalog() -> StaticCatalog {
        let mut tree = Tree::new("Media");
        let root = tree.root();
        tree.add_folder(root, "Music");
        StaticCatalog::new(tree)
    }

    fn registry_with_mount() -> (MountRegistry, Arc<Mount>) {
        let registry = MountRegistry::new("http://10.0.0.2:8200");
        let catalog = sample_catalog();
        let view = make_view("titles", &ViewParams::default()).unwrap();
        let tree = initial_tree(&catalog, view.as_ref()).unwrap();
        let mount = registry.create_mount(
            "Test",
            tree,
            Arc::new(AllowAll),
            Arc::new(FsMediaStreams),
        );
        (registry, mount)
    }

    #[test]
    fn test_prefixes_are_distinct_and_sequential() {
        let (registry, first) = registry_with_mount();
        let catalog = sample_catalog();
        let view = make_view("titles", &ViewParams::default()).unwrap();
        let tree = initial_tree(&catalog, view.as_ref()).unwrap();
        let second = registry.create_mount(
            "Other",
            tree,
            Arc::new(AllowAll),
            Arc::new(FsMediaStreams),
        );

        assert_eq!(first.prefix(), "/dms/0");
        assert_eq!(second.prefix(), "/dms/1");
        assert_eq!(registry.mounts().len(), 2);
        assert!(registry.find("/dms/1").is_some());
        assert!(registry.find("/dms/9").is_none());
    }

    #[tokio::test]
    async fn test_rescan_swaps_generation() {
        let (_registry, mount) = registry_with_mount();
        let catalog = Arc::new(sample_catalog());
        let catalog_dyn: Arc<dyn MediaCatalog> = catalog.clone();
        let view: Arc<dyn View> = make_view("titles", &ViewParams::default()).unwrap().into();

        let handle = spawn_rescan(Arc::clone(&mount), view, catalog_dyn);
        assert_eq!(mount.system_id(), 0);

        catalog.notify_changed();
        // Laisse la tâche consommer le signal.
        for _ in 0..50 {
            if mount.system_id() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(mount.system_id(), 1);
        handle.abort();
    }
}
