//! Montages : liaison (préfixe d'URL, racine de vue, identité de device).
//!
//! Un montage sert une vue sous un préfixe d'URL. Il possède sa table
//! adresse → GUID de device (créée au premier contact, stable ensuite),
//! son SystemUpdateID monotone, et un cache de corps SOAP invalidé à
//! chaque bascule de génération. La racine publiée est immuable : une
//! reconstruction installe un nouvel arbre par une unique affectation
//! d'`Arc`, les requêtes en vol terminant sur la génération précédente.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use parking_lot::RwLock;
use uuid::Uuid;

use dmsmodel::{NodeId, Resource, Tree};

use crate::actions::{ActionContext, ActionDispatcher};
use crate::auth::{Authorizer, is_loopback};
use crate::descriptor;
use crate::errors::HandlerError;
use crate::soap::{build_soap_fault, build_soap_response, parse_soap_action};
use crate::streams::{MediaStreams, resource_response};

/// Taille maximale acceptée pour un corps de contrôle SOAP.
const MAX_CONTROL_BODY: usize = 256 * 1024;

/// Bail accordé aux abonnements GENA quand le client n'en demande pas.
const DEFAULT_SUBSCRIBE_TIMEOUT: &str = "Second-1800";

/// Item résolu par [`Mount::get_item`].
#[derive(Debug, Clone)]
pub enum MountItem {
    Folder { id: String, title: String },
    Resource(Arc<Resource>),
}

/// Un montage : une vue servie sous un préfixe avec une identité de device.
pub struct Mount {
    prefix: String,
    friendly_name: String,
    base_url: String,
    tree: RwLock<Arc<Tree>>,
    guids: RwLock<HashMap<IpAddr, Uuid>>,
    system_id: AtomicU32,
    soap_cache: RwLock<HashMap<String, String>>,
    authorizer: Arc<dyn Authorizer>,
    streams: Arc<dyn MediaStreams>,
    dispatcher: ActionDispatcher,
}

impl Mount {
    /// Crée un montage sur une génération initiale d'arbre.
    ///
    /// L'arbre doit avoir été réindexé par la vue qui l'a produit.
    pub fn new(
        prefix: impl Into<String>,
        friendly_name: impl Into<String>,
        base_url: impl Into<String>,
        tree: Arc<Tree>,
        authorizer: Arc<dyn Authorizer>,
        streams: Arc<dyn MediaStreams>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            friendly_name: friendly_name.into(),
            base_url: base_url.into(),
            tree: RwLock::new(tree),
            guids: RwLock::new(HashMap::new()),
            system_id: AtomicU32::new(0),
            soap_cache: RwLock::new(HashMap::new()),
            authorizer,
            streams,
            dispatcher: ActionDispatcher::with_defaults(),
        }
    }

    /// Remplace la table d'actions, pour injecter des handlers
    /// supplémentaires ou surcharger les défauts.
    pub fn with_dispatcher(mut self, dispatcher: ActionDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// Génération publiée de l'arbre.
    pub fn current_tree(&self) -> Arc<Tree> {
        Arc::clone(&self.tree.read())
    }

    /// SystemUpdateID courant.
    pub fn system_id(&self) -> u32 {
        self.system_id.load(Ordering::Relaxed)
    }

    /// Installe une nouvelle génération : bascule atomique de la racine,
    /// incrément du SystemUpdateID, invalidation du cache SOAP.
    pub fn swap_tree(&self, tree: Arc<Tree>) {
        *self.tree.write() = tree;
        self.system_id.fetch_add(1, Ordering::Relaxed);
        self.soap_cache.write().clear();
        tracing::info!(
            mount = %self.prefix,
            system_id = self.system_id(),
            "content generation swapped"
        );
    }

    /// GUID de device attribué à une adresse, stable après premier contact.
    pub fn device_guid(&self, addr: IpAddr) -> Uuid {
        if let Some(guid) = self.guids.read().get(&addr) {
            return *guid;
        }
        let mut guids = self.guids.write();
        *guids.entry(addr).or_insert_with(|| {
            let guid = Uuid::new_v4();
            tracing::debug!(addr = %addr, guid = %guid, "new device GUID");
            guid
        })
    }

    /// Résout un id relatif au montage, pour l'extérieur (administration,
    /// journalisation). `is_file_request` restreint aux ressources.
    pub fn get_item(&self, id: &str, is_file_request: bool) -> Option<MountItem> {
        let tree = self.current_tree();
        if !is_file_request {
            if let Some(node) = tree.find_folder(id) {
                return Some(MountItem::Folder {
                    id: tree.folder_id(node).to_string(),
                    title: tree.title(node).to_string(),
                });
            }
        }
        tree.find_resource(id).map(MountItem::Resource)
    }

    /// Routeur Axum du montage, à nester sous son préfixe.
    ///
    /// Tout passe par un unique fallback : la table de dispatch par
    /// sous-chemin reste lisible d'un bloc et les méthodes GENA
    /// (SUBSCRIBE/UNSUBSCRIBE) sont acceptées sur n'importe quel chemin.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(Arc::clone(self))
    }

    // -- Dispatch ----------------------------------------------------------

    async fn handle(&self, request: Request) -> Result<Response, HandlerError> {
        let remote = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);

        // Autorisation avant toute résolution.
        if !is_loopback(remote) && !self.authorizer.authorize(request.headers(), remote) {
            tracing::warn!(remote = ?remote, "request denied by authorizer");
            return Err(HandlerError::Denied);
        }

        let path = {
            let full = request.uri().path();
            full.strip_prefix(self.prefix.as_str())
                .unwrap_or(full)
                .trim_matches('/')
                .to_string()
        };

        let method = request.method().clone();
        if method == Method::GET || method == Method::HEAD {
            self.handle_get(&path, request.headers(), remote).await
        } else if method == Method::POST && path == "control" {
            self.handle_control(request).await
        } else if method.as_str() == "SUBSCRIBE" {
            Ok(self.handle_subscribe(request.headers()))
        } else if method.as_str() == "UNSUBSCRIBE" {
            Ok(StatusCode::OK.into_response())
        } else {
            Err(HandlerError::NotFound(path))
        }
    }

    async fn handle_get(
        &self,
        path: &str,
        headers: &HeaderMap,
        remote: Option<SocketAddr>,
    ) -> Result<Response, HandlerError> {
        if let Some(id) = path.strip_prefix("file/") {
            return self.handle_file(id, headers).await;
        }
        if let Some(id) = path.strip_prefix("cover/") {
            return self.handle_cover(id).await;
        }
        if let Some(id) = path.strip_prefix("subtitle/") {
            return self.handle_subtitle(id).await;
        }
        if let Some(id) = path.strip_prefix("index/") {
            return self.handle_index(id);
        }
        match path {
            "description.xml" => self.handle_description(remote),
            "" | "index.html" => {
                Ok(Redirect::temporary(&format!("{}/index/0", self.prefix)).into_response())
            }
            name => match descriptor::scpd_document(name) {
                Some(document) => Ok(xml_response(document.to_string())),
                None => Err(HandlerError::NotFound(name.to_string())),
            },
        }
    }

    fn handle_description(&self, remote: Option<SocketAddr>) -> Result<Response, HandlerError> {
        let guid = remote
            .map(|addr| self.device_guid(addr.ip()).to_string())
            .unwrap_or_default();
        let xml = descriptor::description_xml(&self.prefix, &self.friendly_name, &guid)?;
        Ok(xml_response(xml))
    }

    async fn handle_control(&self, request: Request) -> Result<Response, HandlerError> {
        let body = axum::body::to_bytes(request.into_body(), MAX_CONTROL_BODY)
            .await
            .map_err(|e| HandlerError::BadProtocol(e.to_string()))?;

        let action = match parse_soap_action(&body) {
            Ok(action) => action,
            Err(e) => {
                // Enveloppe illisible : SOAP fault, pas d'erreur HTTP nue.
                tracing::debug!(error = %e, "malformed SOAP envelope");
                return fault_response("402", &e.to_string());
            }
        };

        // Les corps Browse sont coûteux et déterministes par génération.
        let cache_key = (action.name == "Browse").then(|| {
            let mut args: Vec<_> = action
                .args
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            args.sort();
            format!("{}|{}", action.name, args.join("&"))
        });
        if let Some(key) = &cache_key {
            if let Some(cached) = self.soap_cache.read().get(key) {
                return Ok(xml_response(cached.clone()));
            }
        }

        let ctx = ActionContext {
            tree: self.current_tree(),
            system_id: self.system_id(),
            resource_base: format!("{}{}", self.base_url, self.prefix),
        };

        match self.dispatcher.dispatch(&ctx, &action) {
            Ok((service_urn, values)) => {
                let xml = build_soap_response(service_urn, &action.name, &values)
                    .map_err(|e| HandlerError::Internal(anyhow::anyhow!("SOAP emit: {}", e)))?;
                if let Some(key) = cache_key {
                    self.soap_cache.write().insert(key, xml.clone());
                }
                Ok(xml_response(xml))
            }
            Err(e) => {
                tracing::debug!(action = %action.name, error = %e, "SOAP action failed");
                let (code, description) = e.fault();
                fault_response(code, &description)
            }
        }
    }

    async fn handle_file(&self, id: &str, headers: &HeaderMap) -> Result<Response, HandlerError> {
        let resource = self
            .current_tree()
            .find_resource(id)
            .ok_or_else(|| HandlerError::NotFound(id.to_string()))?;
        let range = headers
            .get(header::RANGE)
            .and_then(|value| value.to_str().ok());
        resource_response(self.streams.as_ref(), &resource, range).await
    }

    async fn handle_cover(&self, id: &str) -> Result<Response, HandlerError> {
        let resource = self
            .current_tree()
            .find_resource(id)
            .filter(|r| r.has_cover)
            .ok_or_else(|| HandlerError::NotFound(id.to_string()))?;
        let body = self
            .streams
            .open_cover(&resource)
            .await
            .map_err(|e| HandlerError::Internal(e.into()))?
            .ok_or_else(|| HandlerError::NotFound(id.to_string()))?;
        Ok(media_body_response(body))
    }

    async fn handle_subtitle(&self, id: &str) -> Result<Response, HandlerError> {
        let resource = self
            .current_tree()
            .find_resource(id)
            .filter(|r| r.has_subtitle)
            .ok_or_else(|| HandlerError::NotFound(id.to_string()))?;
        let body = self
            .streams
            .open_subtitle(&resource)
            .await
            .map_err(|e| HandlerError::Internal(e.into()))?
            .ok_or_else(|| HandlerError::NotFound(id.to_string()))?;
        Ok(media_body_response(body))
    }

    /// Page HTML de secours pour naviguer sans client UPnP.
    fn handle_index(&self, id: &str) -> Result<Response, HandlerError> {
        let tree = self.current_tree();
        let node = tree
            .find_folder(id)
            .ok_or_else(|| HandlerError::NotFound(id.to_string()))?;
        Ok(Html(self.render_index(&tree, node)).into_response())
    }

    fn render_index(&self, tree: &Tree, node: NodeId) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"/><title>");
        html.push_str(&escape_html(tree.title(node)));
        html.push_str("</title></head><body>\n<h1>");
        html.push_str(&escape_html(tree.title(node)));
        html.push_str("</h1>\n<ul>\n");
        if let Some(parent) = tree.parent(node) {
            html.push_str(&format!(
                "<li><a href=\"{}/index/{}\">..</a></li>\n",
                self.prefix,
                tree.folder_id(parent)
            ));
        }
        for &child in tree.folders(node) {
            html.push_str(&format!(
                "<li><a href=\"{}/index/{}\">{}/</a> ({})</li>\n",
                self.prefix,
                tree.folder_id(child),
                escape_html(tree.title(child)),
                tree.full_child_count(child)
            ));
        }
        for resource in tree.resources(node) {
            html.push_str(&format!(
                "<li><a href=\"{}/file/{}\">{}</a></li>\n",
                self.prefix,
                resource.id,
                escape_html(&resource.title)
            ));
        }
        html.push_str("</ul>\n</body></html>\n");
        html
    }

    fn handle_subscribe(&self, headers: &HeaderMap) -> Response {
        // GENA accepté mais non suivi : SID frais, timeout repris tel quel,
        // aucun événement ne sera jamais poussé (les clients sondent
        // GetSystemUpdateID).
        let sid = format!("uuid:{}", Uuid::new_v4());
        let timeout = headers
            .get("TIMEOUT")
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_SUBSCRIBE_TIMEOUT)
            .to_string();

        let mut response_headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&sid) {
            response_headers.insert(axum::http::HeaderName::from_static("sid"), value);
        }
        if let Ok(value) = HeaderValue::from_str(&timeout) {
            response_headers.insert(axum::http::HeaderName::from_static("timeout"), value);
        }
        (StatusCode::OK, response_headers).into_response()
    }
}

/// Handler unique du routeur : traduit le signal d'échec à la frontière.
async fn dispatch(State(mount): State<Arc<Mount>>, request: Request) -> Response {
    match mount.handle(request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

fn xml_response(xml: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")],
        xml,
    )
        .into_response()
}

/// Fault SOAP : statut 500 et corps UPnPError, conformément à UPnP.
fn fault_response(code: &str, description: &str) -> Result<Response, HandlerError> {
    let xml = build_soap_fault(code, description)
        .map_err(|e| HandlerError::Internal(anyhow::anyhow!("SOAP fault emit: {}", e)))?;
    Ok((
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")],
        xml,
    )
        .into_response())
}

fn media_body_response(body: crate::streams::MediaBody) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&body.mime_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(len) = body.total_len {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    (
        StatusCode::OK,
        headers,
        Body::from_stream(tokio_util::io::ReaderStream::new(body.reader)),
    )
        .into_response()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AllowAll;
    use crate::streams::FsMediaStreams;
    use dmsmodel::MediaKind;

    fn mount() -> Arc<Mount> {
        let mut tree = Tree::new("Media");
        let root = tree.root();
        let music = tree.add_folder(root, "Music");
        let mut plain = Resource::new("r1", "Song", MediaKind::Audio, "audio/flac");
        plain.size = Some(10);
        tree.add_resource(music, Arc::new(plain));
        let mut covered = Resource::new("r2", "Covered", MediaKind::Audio, "audio/flac");
        covered.has_cover = true;
        tree.add_resource(music, Arc::new(covered));
        tree.reindex();

        Arc::new(Mount::new(
            "/dms/0",
            "Test DMS",
            "http://10.0.0.2:8200",
            Arc::new(tree),
            Arc::new(AllowAll),
            Arc::new(FsMediaStreams),
        ))
    }

    #[test]
    fn test_device_guid_stable_per_address() {
        let mount = mount();
        let a: IpAddr = "10.0.0.17".parse().unwrap();
        let b: IpAddr = "10.0.0.18".parse().unwrap();

        let guid_a = mount.device_guid(a);
        let guid_b = mount.device_guid(b);
        assert_eq!(mount.device_guid(a), guid_a);
        assert_eq!(mount.device_guid(b), guid_b);
        assert_ne!(guid_a, guid_b);
    }

    #[test]
    fn test_swap_tree_bumps_system_id_and_clears_cache() {
        let mount = mount();
        assert_eq!(mount.system_id(), 0);
        mount
            .soap_cache
            .write()
            .insert("Browse|x".to_string(), "cached".to_string());

        let mut fresh = Tree::new("Media");
        fresh.reindex();
        mount.swap_tree(Arc::new(fresh));

        assert_eq!(mount.system_id(), 1);
        assert!(mount.soap_cache.read().is_empty());
    }

    #[test]
    fn test_get_item() {
        let mount = mount();
        match mount.get_item("0", false) {
            Some(MountItem::Folder { title, .. }) => assert_eq!(title, "Media"),
            other => panic!("expected folder, got {:?}", other),
        }
        match mount.get_item("r1", true) {
            Some(MountItem::Resource(r)) => assert_eq!(r.title, "Song"),
            other => panic!("expected resource, got {:?}", other),
        }
        // Un id de dossier n'est pas un fichier.
        assert!(matches!(mount.get_item("0", true), None));
        assert!(mount.get_item("zzz", false).is_none());
    }

    #[test]
    fn test_subscribe_echoes_timeout() {
        let mount = mount();
        let mut headers = HeaderMap::new();
        headers.insert("TIMEOUT", HeaderValue::from_static("Second-300"));

        let response = mount.handle_subscribe(&headers);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["TIMEOUT"], "Second-300");
        let sid = response.headers()["SID"].to_str().unwrap();
        assert!(sid.starts_with("uuid:"));
        assert!(Uuid::parse_str(sid.trim_start_matches("uuid:")).is_ok());
    }

    #[test]
    fn test_subscribe_default_timeout() {
        let mount = mount();
        let response = mount.handle_subscribe(&HeaderMap::new());
        assert_eq!(response.headers()["TIMEOUT"], DEFAULT_SUBSCRIBE_TIMEOUT);
    }

    #[test]
    fn test_render_index_lists_children() {
        let mount = mount();
        let tree = mount.current_tree();
        let html = mount.render_index(&tree, tree.root());
        assert!(html.contains("Music/"));
        assert!(html.contains("/dms/0/index/"));
    }

    // -- Dispatch de bout en bout -----------------------------------------

    /// Autorisateur traceur : refuse tout et note s'il a été consulté.
    struct DenyAll(std::sync::atomic::AtomicBool);

    impl Authorizer for DenyAll {
        fn authorize(&self, _headers: &HeaderMap, _remote: Option<SocketAddr>) -> bool {
            self.0.store(true, Ordering::Relaxed);
            false
        }
    }

    fn denied_mount() -> (Arc<Mount>, Arc<DenyAll>) {
        let mut tree = Tree::new("Media");
        tree.reindex();
        let deny = Arc::new(DenyAll(std::sync::atomic::AtomicBool::new(false)));
        let mount = Arc::new(Mount::new(
            "/dms/0",
            "Denied DMS",
            "http://10.0.0.2:8200",
            Arc::new(tree),
            Arc::clone(&deny) as Arc<dyn Authorizer>,
            Arc::new(FsMediaStreams),
        ));
        (mount, deny)
    }

    fn request(method: &str, uri: &str, remote: Option<&str>) -> Request {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        if let Some(remote) = remote {
            let addr: SocketAddr = remote.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[tokio::test]
    async fn test_denied_request_short_circuits_resolution() {
        let (mount, deny) = denied_mount();
        let err = mount
            .handle(request("GET", "/dms/0/file/r1", Some("10.0.0.17:4000")))
            .await
            .unwrap_err();
        // Refusé avant résolution : Denied, pas NotFound.
        assert!(matches!(err, HandlerError::Denied));
        assert!(deny.0.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_loopback_bypasses_authorizer() {
        let (mount, deny) = denied_mount();
        let err = mount
            .handle(request("GET", "/dms/0/file/zzz", Some("127.0.0.1:4000")))
            .await
            .unwrap_err();
        // La résolution a eu lieu (id inconnu), sans consulter l'autorisateur.
        assert!(matches!(err, HandlerError::NotFound(_)));
        assert!(!deny.0.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_file_unknown_id_is_not_found() {
        let mount = mount();
        let err = mount
            .handle(request("GET", "/dms/0/file/unknown", Some("127.0.0.1:4000")))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cover_without_capability_is_not_found() {
        let mount = mount();
        // r1 n'a pas de pochette, r2 en a une.
        let err = mount
            .handle(request("GET", "/dms/0/cover/r1", Some("127.0.0.1:4000")))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));

        let err = mount
            .handle(request("GET", "/dms/0/subtitle/r1", Some("127.0.0.1:4000")))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unmapped_path_is_not_found() {
        let mount = mount();
        let err = mount
            .handle(request("GET", "/dms/0/elsewhere", Some("127.0.0.1:4000")))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));

        let err = mount
            .handle(request("DELETE", "/dms/0/control", Some("127.0.0.1:4000")))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_subscribe_works_on_any_path() {
        let mount = mount();
        for uri in ["/dms/0/events", "/dms/0/anything/at/all", "/dms/0"] {
            let response = mount
                .handle(request("SUBSCRIBE", uri, Some("127.0.0.1:4000")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("SID"));
        }

        let response = mount
            .handle(request("UNSUBSCRIBE", "/dms/0/events", Some("127.0.0.1:4000")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_description_guid_stable_per_remote() {
        let mount = mount();
        let body_of = |response: Response| async move {
            let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
                .await
                .unwrap();
            String::from_utf8(bytes.to_vec()).unwrap()
        };

        let first = body_of(
            mount
                .handle(request("GET", "/dms/0/description.xml", Some("10.0.0.17:4000")))
                .await
                .unwrap(),
        )
        .await;
        // DenyAll absent ici : le montage de test autorise tout.
        let second = body_of(
            mount
                .handle(request("GET", "/dms/0/description.xml", Some("10.0.0.17:5000")))
                .await
                .unwrap(),
        )
        .await;
        let other = body_of(
            mount
                .handle(request("GET", "/dms/0/description.xml", Some("10.0.0.99:4000")))
                .await
                .unwrap(),
        )
        .await;

        let udn_of = |xml: &str| {
            let start = xml.find("<UDN>").unwrap() + 5;
            let end = xml.find("</UDN>").unwrap();
            xml[start..end].to_string()
        };
        assert_eq!(udn_of(&first), udn_of(&second));
        assert_ne!(udn_of(&first), udn_of(&other));
        assert!(udn_of(&first).starts_with("uuid:"));
    }

    #[tokio::test]
    async fn test_scpd_documents_served() {
        let mount = mount();
        for name in [
            "contentDirectory.xml",
            "connectionManager.xml",
            "MSMediaReceiverRegistrar.xml",
        ] {
            let response = mount
                .handle(request(
                    "GET",
                    &format!("/dms/0/{}", name),
                    Some("127.0.0.1:4000"),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_empty_path_redirects_to_index() {
        let mount = mount();
        for uri in ["/dms/0", "/dms/0/index.html"] {
            let response = mount
                .handle(request("GET", uri, Some("127.0.0.1:4000")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(response.headers()[header::LOCATION], "/dms/0/index/0");
        }
    }

    #[tokio::test]
    async fn test_malformed_soap_yields_fault_not_bare_error() {
        let mount = mount();
        let mut request = Request::builder()
            .method("POST")
            .uri("/dms/0/control")
            .body(Body::from("this is not soap"))
            .unwrap();
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        let response = mount.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("<s:Fault>"));
        assert!(body.contains("UPnPError"));
    }

    #[tokio::test]
    async fn test_control_browse_round_trip_and_cache() {
        let mount = mount();
        let envelope = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:Browse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
      <ObjectID>0</ObjectID>
      <BrowseFlag>BrowseDirectChildren</BrowseFlag>
      <StartingIndex>0</StartingIndex>
      <RequestedCount>0</RequestedCount>
    </u:Browse>
  </s:Body>
</s:Envelope>"#;

        let send = || async {
            let mut request = Request::builder()
                .method("POST")
                .uri("/dms/0/control")
                .body(Body::from(envelope))
                .unwrap();
            let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
            mount.handle(request).await.unwrap()
        };

        let response = send().await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("BrowseResponse"));
        assert!(body.contains("Music"));
        assert_eq!(mount.soap_cache.read().len(), 1);

        // Deuxième requête servie depuis le cache, même corps.
        let response = send().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mount.soap_cache.read().len(), 1);
    }
}
