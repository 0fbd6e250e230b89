//! Dispatch des actions SOAP.
//!
//! Le registre des handlers d'actions est explicite : une table assemblée
//! à la construction du montage, extensible par injection, jamais de
//! découverte à l'exécution. Les handlers par défaut couvrent les actions
//! obligatoires de ContentDirectory:1 et ConnectionManager:1, plus le
//! service d'enregistrement Microsoft attendu par consoles et TV.

use std::collections::HashMap;
use std::sync::Arc;

use dmsdidl::{Container, DidlLite, Item, Res};
use dmsmodel::{NodeId, Resource, Tree};

use crate::soap::SoapAction;
use crate::soap::error_codes;

pub const CONTENT_DIRECTORY_URN: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";
pub const CONNECTION_MANAGER_URN: &str = "urn:schemas-upnp-org:service:ConnectionManager:1";
pub const MEDIA_RECEIVER_URN: &str = "urn:microsoft.com:service:X_MS_MediaReceiverRegistrar:1";

/// Contexte d'exécution d'une action : l'état du montage au moment de la
/// requête, figé le temps du traitement.
pub struct ActionContext {
    /// Génération publiée de l'arbre de la vue.
    pub tree: Arc<Tree>,
    /// SystemUpdateID courant du montage.
    pub system_id: u32,
    /// Base absolue des URLs de ressources (`http://host:port/prefix`).
    pub resource_base: String,
}

/// Échec d'une action, traduit en SOAP Fault par le chemin de contrôle.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("unknown action: {0}")]
    Unknown(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("no such object: {0}")]
    NoSuchObject(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ActionError {
    /// Code d'erreur UPnP et description pour le fault.
    pub fn fault(&self) -> (&'static str, String) {
        match self {
            ActionError::Unknown(_) => (error_codes::INVALID_ACTION, "Invalid Action".to_string()),
            ActionError::InvalidArgs(reason) => (error_codes::INVALID_ARGS, reason.clone()),
            ActionError::NoSuchObject(_) => {
                (error_codes::NO_SUCH_OBJECT, "No such object".to_string())
            }
            ActionError::Failed(e) => (error_codes::ACTION_FAILED, format!("{:#}", e)),
        }
    }
}

/// Paires (argument de sortie, valeur) d'une action réussie.
pub type ActionValues = Vec<(String, String)>;

/// Un handler d'action SOAP.
pub trait ActionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// URN du service déclarant l'action, utilisé dans la réponse.
    fn service_urn(&self) -> &'static str {
        CONTENT_DIRECTORY_URN
    }

    fn handle(&self, ctx: &ActionContext, action: &SoapAction) -> Result<ActionValues, ActionError>;
}

/// Table de dispatch des actions d'un montage.
pub struct ActionDispatcher {
    handlers: HashMap<&'static str, Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Dispatcher pré-rempli avec les actions par défaut.
    pub fn with_defaults() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(Arc::new(BrowseAction));
        dispatcher.register(Arc::new(GetSearchCapabilities));
        dispatcher.register(Arc::new(GetSortCapabilities));
        dispatcher.register(Arc::new(GetSystemUpdateId));
        dispatcher.register(Arc::new(GetProtocolInfo));
        dispatcher.register(Arc::new(GetCurrentConnectionIds));
        dispatcher.register(Arc::new(GetCurrentConnectionInfo));
        dispatcher.register(Arc::new(RegistrarStub::is_authorized()));
        dispatcher.register(Arc::new(RegistrarStub::is_validated()));
        dispatcher
    }

    /// Enregistre (ou remplace) un handler.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    /// Exécute l'action nommée. Retourne l'URN du service et les valeurs.
    pub fn dispatch(
        &self,
        ctx: &ActionContext,
        action: &SoapAction,
    ) -> Result<(&'static str, ActionValues), ActionError> {
        let handler = self
            .handlers
            .get(action.name.as_str())
            .ok_or_else(|| ActionError::Unknown(action.name.clone()))?;
        tracing::debug!(action = %action.name, "dispatching SOAP action");
        let values = handler.handle(ctx, action)?;
        Ok((handler.service_urn(), values))
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ---------------------------------------------------------------------------
// ContentDirectory
// ---------------------------------------------------------------------------

/// Browse : navigation BrowseMetadata / BrowseDirectChildren avec
/// pagination StartingIndex / RequestedCount (0 = tout le reste).
pub struct BrowseAction;

impl BrowseAction {
    fn container_of(ctx: &ActionContext, node: NodeId) -> Container {
        let tree = &ctx.tree;
        let parent_id = match tree.parent(node) {
            Some(parent) => tree.folder_id(parent).to_string(),
            None => "-1".to_string(),
        };
        Container::new(tree.folder_id(node), parent_id, tree.title(node))
            .with_child_count(tree.child_count(node))
    }

    fn item_of(ctx: &ActionContext, parent_id: &str, resource: &Resource) -> Item {
        let mut item = Item::new(
            &resource.id,
            parent_id,
            &resource.title,
            resource.kind.upnp_class(),
        );
        if let Some(audio) = &resource.audio {
            item.artist = audio.artist.clone();
            item.album = audio.album.clone();
            item.genre = audio.genre.clone();
        }
        if resource.has_cover {
            item.album_art = Some(format!("{}/cover/{}", ctx.resource_base, resource.id));
        }
        item.resources.push(Res::http_get(
            format!("{}/file/{}", ctx.resource_base, resource.id),
            &resource.mime_type,
            resource.size,
        ));
        item
    }

    fn browse_metadata(ctx: &ActionContext, object_id: &str) -> Result<ActionValues, ActionError> {
        let tree = &ctx.tree;
        let (containers, items) = if let Some(node) = tree.find_folder(object_id) {
            (vec![Self::container_of(ctx, node)], vec![])
        } else if let Some(resource) = tree.find_resource(object_id) {
            let parent_id = tree
                .find_resource_home(object_id)
                .map(|home| tree.folder_id(home).to_string())
                .unwrap_or_else(|| "0".to_string());
            (vec![], vec![Self::item_of(ctx, &parent_id, &resource)])
        } else {
            return Err(ActionError::NoSuchObject(object_id.to_string()));
        };

        let didl = DidlLite::new(containers, items)
            .to_xml()
            .map_err(|e| ActionError::Failed(e.into()))?;
        Ok(browse_values(didl, 1, 1, ctx.system_id))
    }

    fn browse_children(
        ctx: &ActionContext,
        object_id: &str,
        starting_index: u32,
        requested_count: u32,
    ) -> Result<ActionValues, ActionError> {
        let tree = &ctx.tree;
        let node = tree
            .find_folder(object_id)
            .ok_or_else(|| ActionError::NoSuchObject(object_id.to_string()))?;
        let folder_id = tree.folder_id(node).to_string();

        let mut containers: Vec<Container> = tree
            .folders(node)
            .iter()
            .map(|&child| Self::container_of(ctx, child))
            .collect();
        let mut items: Vec<Item> = tree
            .resources(node)
            .iter()
            .map(|resource| Self::item_of(ctx, &folder_id, resource))
            .collect();

        // Pagination : les containers d'abord, puis les items.
        let total = (containers.len() + items.len()) as u32;
        let start = starting_index as usize;
        let count = if requested_count == 0 {
            (total as usize).saturating_sub(start)
        } else {
            requested_count as usize
        };

        let total_containers = containers.len();
        if start < total_containers {
            containers = containers.into_iter().skip(start).collect();
            let remaining = count.saturating_sub(containers.len());
            containers.truncate(count);
            if remaining > 0 {
                items.truncate(remaining);
            } else {
                items.clear();
            }
        } else {
            let item_start = start - total_containers;
            containers.clear();
            items = items.into_iter().skip(item_start).take(count).collect();
        }

        let returned = (containers.len() + items.len()) as u32;
        let didl = DidlLite::new(containers, items)
            .to_xml()
            .map_err(|e| ActionError::Failed(e.into()))?;
        Ok(browse_values(didl, returned, total, ctx.system_id))
    }
}

fn browse_values(didl: String, returned: u32, total: u32, update_id: u32) -> ActionValues {
    vec![
        ("Result".to_string(), didl),
        ("NumberReturned".to_string(), returned.to_string()),
        ("TotalMatches".to_string(), total.to_string()),
        ("UpdateID".to_string(), update_id.to_string()),
    ]
}

impl ActionHandler for BrowseAction {
    fn name(&self) -> &'static str {
        "Browse"
    }

    fn handle(&self, ctx: &ActionContext, action: &SoapAction) -> Result<ActionValues, ActionError> {
        let object_id = match action.arg("ObjectID") {
            "" => "0",
            id => id,
        };
        let starting_index = action.arg_u32("StartingIndex", 0);
        let requested_count = action.arg_u32("RequestedCount", 0);

        tracing::debug!(
            object_id = %object_id,
            browse_flag = %action.arg("BrowseFlag"),
            starting_index = %starting_index,
            requested_count = %requested_count,
            "ContentDirectory::Browse"
        );

        match action.arg("BrowseFlag") {
            "BrowseMetadata" => Self::browse_metadata(ctx, object_id),
            "BrowseDirectChildren" => {
                Self::browse_children(ctx, object_id, starting_index, requested_count)
            }
            other => Err(ActionError::InvalidArgs(format!(
                "invalid BrowseFlag: {}",
                other
            ))),
        }
    }
}

pub struct GetSearchCapabilities;

impl ActionHandler for GetSearchCapabilities {
    fn name(&self) -> &'static str {
        "GetSearchCapabilities"
    }

    fn handle(&self, _ctx: &ActionContext, _action: &SoapAction) -> Result<ActionValues, ActionError> {
        // Pas de Search : capacités vides.
        Ok(vec![("SearchCaps".to_string(), String::new())])
    }
}

pub struct GetSortCapabilities;

impl ActionHandler for GetSortCapabilities {
    fn name(&self) -> &'static str {
        "GetSortCapabilities"
    }

    fn handle(&self, _ctx: &ActionContext, _action: &SoapAction) -> Result<ActionValues, ActionError> {
        Ok(vec![("SortCaps".to_string(), "dc:title".to_string())])
    }
}

pub struct GetSystemUpdateId;

impl ActionHandler for GetSystemUpdateId {
    fn name(&self) -> &'static str {
        "GetSystemUpdateID"
    }

    fn handle(&self, ctx: &ActionContext, _action: &SoapAction) -> Result<ActionValues, ActionError> {
        Ok(vec![("Id".to_string(), ctx.system_id.to_string())])
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

pub struct GetProtocolInfo;

impl ActionHandler for GetProtocolInfo {
    fn name(&self) -> &'static str {
        "GetProtocolInfo"
    }

    fn service_urn(&self) -> &'static str {
        CONNECTION_MANAGER_URN
    }

    fn handle(&self, _ctx: &ActionContext, _action: &SoapAction) -> Result<ActionValues, ActionError> {
        Ok(vec![
            ("Source".to_string(), "http-get:*:*:*".to_string()),
            ("Sink".to_string(), String::new()),
        ])
    }
}

pub struct GetCurrentConnectionIds;

impl ActionHandler for GetCurrentConnectionIds {
    fn name(&self) -> &'static str {
        "GetCurrentConnectionIDs"
    }

    fn service_urn(&self) -> &'static str {
        CONNECTION_MANAGER_URN
    }

    fn handle(&self, _ctx: &ActionContext, _action: &SoapAction) -> Result<ActionValues, ActionError> {
        Ok(vec![("ConnectionIDs".to_string(), "0".to_string())])
    }
}

pub struct GetCurrentConnectionInfo;

impl ActionHandler for GetCurrentConnectionInfo {
    fn name(&self) -> &'static str {
        "GetCurrentConnectionInfo"
    }

    fn service_urn(&self) -> &'static str {
        CONNECTION_MANAGER_URN
    }

    fn handle(&self, _ctx: &ActionContext, _action: &SoapAction) -> Result<ActionValues, ActionError> {
        Ok(vec![
            ("RcsID".to_string(), "-1".to_string()),
            ("AVTransportID".to_string(), "-1".to_string()),
            ("ProtocolInfo".to_string(), String::new()),
            ("PeerConnectionManager".to_string(), String::new()),
            ("PeerConnectionID".to_string(), "-1".to_string()),
            ("Direction".to_string(), "Output".to_string()),
            ("Status".to_string(), "OK".to_string()),
        ])
    }
}

// ---------------------------------------------------------------------------
// X_MS_MediaReceiverRegistrar
// ---------------------------------------------------------------------------

/// Stub Microsoft : toute device est autorisée et validée.
pub struct RegistrarStub {
    action: &'static str,
}

impl RegistrarStub {
    pub fn is_authorized() -> Self {
        Self {
            action: "IsAuthorized",
        }
    }

    pub fn is_validated() -> Self {
        Self {
            action: "IsValidated",
        }
    }
}

impl ActionHandler for RegistrarStub {
    fn name(&self) -> &'static str {
        self.action
    }

    fn service_urn(&self) -> &'static str {
        MEDIA_RECEIVER_URN
    }

    fn handle(&self, _ctx: &ActionContext, _action: &SoapAction) -> Result<ActionValues, ActionError> {
        Ok(vec![("Result".to_string(), "1".to_string())])
    }
}
