//! # dmsdidl - Modèle DIDL-Lite
//!
//! Structures et sérialisation du vocabulaire DIDL-Lite utilisé par UPnP
//! pour décrire les containers et items navigables. Le document est
//! sérialisé via `quick-xml`, les noms qualifiés (`dc:`, `upnp:`) étant
//! portés par les attributs serde.

use serde::{Deserialize, Serialize};

pub const XMLNS_DIDL: &str = "urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/";
pub const XMLNS_UPNP: &str = "urn:schemas-upnp-org:metadata-1-0/upnp/";
pub const XMLNS_DC: &str = "http://purl.org/dc/elements/1.1/";
pub const XMLNS_DLNA: &str = "urn:schemas-dlna-org:metadata-1-0/";

/// Erreur de sérialisation DIDL-Lite.
#[derive(Debug, thiserror::Error)]
#[error("failed to serialize DIDL-Lite: {0}")]
pub struct DidlError(#[from] quick_xml::SeError);

/// Racine d'un document DIDL-Lite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DidlLite {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,

    #[serde(rename = "@xmlns:upnp")]
    pub xmlns_upnp: String,

    #[serde(rename = "@xmlns:dc")]
    pub xmlns_dc: String,

    #[serde(rename = "@xmlns:dlna", skip_serializing_if = "Option::is_none")]
    pub xmlns_dlna: Option<String>,

    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

impl DidlLite {
    /// Document prêt à sérialiser avec les espaces de noms usuels.
    pub fn new(containers: Vec<Container>, items: Vec<Item>) -> Self {
        Self {
            xmlns: XMLNS_DIDL.to_string(),
            xmlns_upnp: XMLNS_UPNP.to_string(),
            xmlns_dc: XMLNS_DC.to_string(),
            xmlns_dlna: Some(XMLNS_DLNA.to_string()),
            containers,
            items,
        }
    }

    /// Sérialise le document en XML.
    pub fn to_xml(&self) -> Result<String, DidlError> {
        Ok(quick_xml::se::to_string(self)?)
    }
}

/// Container navigable (dossier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted")]
    pub restricted: String,

    #[serde(rename = "@childCount", skip_serializing_if = "Option::is_none")]
    pub child_count: Option<String>,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,
}

impl Container {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            restricted: "1".to_string(),
            child_count: None,
            title: title.into(),
            class: "object.container.storageFolder".to_string(),
        }
    }

    pub fn with_child_count(mut self, count: usize) -> Self {
        self.child_count = Some(count.to_string());
        self
    }
}

/// Item feuille (piste, vidéo, image).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted")]
    pub restricted: String,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,

    #[serde(
        rename = "upnp:artist",
        alias = "artist",
        skip_serializing_if = "Option::is_none"
    )]
    pub artist: Option<String>,

    #[serde(
        rename = "upnp:album",
        alias = "album",
        skip_serializing_if = "Option::is_none"
    )]
    pub album: Option<String>,

    #[serde(
        rename = "upnp:genre",
        alias = "genre",
        skip_serializing_if = "Option::is_none"
    )]
    pub genre: Option<String>,

    #[serde(
        rename = "upnp:albumArtURI",
        alias = "albumArtURI",
        skip_serializing_if = "Option::is_none"
    )]
    pub album_art: Option<String>,

    #[serde(rename = "res", default)]
    pub resources: Vec<Res>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        title: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            restricted: "1".to_string(),
            title: title.into(),
            class: class.into(),
            artist: None,
            album: None,
            genre: None,
            album_art: None,
            resources: Vec::new(),
        }
    }
}

/// Élément `res` : l'URL de la ressource et son protocolInfo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Res {
    #[serde(rename = "@protocolInfo")]
    pub protocol_info: String,

    #[serde(rename = "@size", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(rename = "$text")]
    pub url: String,
}

impl Res {
    /// `res` HTTP classique : `http-get:*:<mime>:*`.
    pub fn http_get(url: impl Into<String>, mime_type: &str, size: Option<u64>) -> Self {
        Self {
            protocol_info: format!("http-get:*:{}:*", mime_type),
            size: size.map(|s| s.to_string()),
            url: url.into(),
        }
    }
}
