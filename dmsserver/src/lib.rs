//! # dmsserver - Abstraction de serveur HTTP
//!
//! Ce crate fournit une abstraction simple au-dessus d'Axum : le cœur
//! protocolaire enregistre des handlers et des routeurs sans connaître la
//! mécanique d'écoute, et le transport garde la main sur l'acceptation des
//! connexions, la contre-pression et les déconnexions clients.
//!
//! ## Fonctionnalités
//!
//! - **Handlers simples** : `add_handler()` pour les routes GET
//! - **Routeurs montés** : `add_router()` pour un sous-arbre d'URLs complet
//! - **Redirections** : `add_redirect()`
//! - **Arrêt gracieux** : Ctrl+C arrête proprement le serveur
//!
//! Les handlers reçoivent l'adresse distante via `ConnectInfo<SocketAddr>`,
//! nécessaire aux tables par adresse du cœur média.

use axum::Router;
use axum::handler::Handler;
use axum::response::Redirect;
use axum::routing::get;
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tracing::info;

/// Info serveur sérialisable.
#[derive(Clone, Serialize)]
pub struct ServerInfo {
    /// Nom du serveur
    pub name: String,
    /// URL de base
    pub base_url: String,
    /// Port HTTP
    pub http_port: u16,
}

/// Serveur principal.
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Crée une nouvelle instance de serveur.
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - URL de base (ex: "http://10.0.0.2:8200")
    /// * `http_port` - Port HTTP à écouter
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            join_handle: None,
        }
    }

    /// Ajoute un handler GET sur un chemin fixe.
    pub async fn add_handler<H, T>(&mut self, path: &str, handler: H)
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let route = Router::new().route("/", get(handler));

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).nest(path, route);
    }

    /// Monte un routeur complet sous un préfixe.
    ///
    /// C'est la porte d'entrée des montages média : le cœur construit son
    /// routeur (chemins paramétrés, fallback, state partagé) et le
    /// transport se contente de le monter.
    pub async fn add_router(&mut self, prefix: &str, router: Router) {
        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).nest(prefix, router);
    }

    /// Ajoute une redirection permanente.
    pub async fn add_redirect(&mut self, from: &str, to: &str) {
        let to = to.to_string();
        let handler = move || {
            let to = to.clone();
            async move { Redirect::permanent(&to) }
        };

        let mut r = self.router.write().await;

        if from == "/" {
            // Pour la racine, merger au lieu de nester.
            let route = Router::new().route("/", get(handler));
            *r = std::mem::take(&mut *r).merge(route);
        } else {
            let route = Router::new().route("/", get(handler));
            *r = std::mem::take(&mut *r).nest(from, route);
        }
    }

    /// Démarre le serveur HTTP.
    ///
    /// Lance l'écoute sur le port configuré et met en place l'arrêt
    /// gracieux sur Ctrl+C.
    pub async fn start(&mut self) -> std::io::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        info!(
            "Server {} running at {} (port {})",
            self.name, self.base_url, self.http_port
        );

        let router = self.router.clone();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let server_task = tokio::spawn(async move {
            let r = router.read().await.clone();
            if let Err(e) = axum::serve(
                listener,
                r.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("HTTP server stopped: {}", e);
            }
        });

        let shutdown_task = tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, shutting down");
            }
        });

        self.join_handle = Some(tokio::spawn(async move {
            tokio::select! {
                _ = server_task => {},
                _ = shutdown_task => {},
            }
        }));

        Ok(())
    }

    /// Attend la fin du serveur.
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    /// Récupère les infos du serveur.
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
        }
    }

    /// URL de base (protocole + hôte + port), sans slash final.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Builder pattern.
pub struct ServerBuilder {
    name: String,
    base_url: String,
    http_port: u16,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
        }
    }

    /// Construit le serveur.
    pub fn build(self) -> Server {
        Server::new(self.name, self.base_url, self.http_port)
    }
}
