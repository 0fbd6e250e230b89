//! Ressources média : les feuilles de la hiérarchie.
//!
//! Une [`Resource`] est fournie par le catalogue (collaborateur externe) et
//! partagée telle quelle entre toutes les vues d'un même montage via
//! `Arc<Resource>`. Son identité (`id`) est stable et unique au sein d'un
//! montage : deux items sont égaux si et seulement si leurs ids le sont.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Nature d'une ressource média.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Image,
}

impl MediaKind {
    /// Classe UPnP correspondante, telle qu'attendue dans DIDL-Lite.
    pub fn upnp_class(&self) -> &'static str {
        match self {
            MediaKind::Audio => "object.item.audioItem.musicTrack",
            MediaKind::Video => "object.item.videoItem",
            MediaKind::Image => "object.item.imageItem.photo",
        }
    }
}

/// Métadonnées audio fournies par l'extracteur de tags.
///
/// `artist` est l'artiste d'album, `performer` l'interprète de la piste;
/// les deux peuvent différer (compilations).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioMeta {
    pub artist: Option<String>,
    pub performer: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub track: Option<u32>,
}

/// Dimensions et durée d'une vidéo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMeta {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<u32>,
}

/// Dimensions d'une image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageMeta {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Une ressource média (feuille jouable ou affichable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Identité stable, unique au sein d'un montage.
    pub id: String,

    /// Titre affiché.
    pub title: String,

    /// Fil d'Ariane dans l'arbre physique (titres des dossiers parents).
    pub path: Vec<String>,

    pub kind: MediaKind,

    /// Type MIME servi dans les réponses HTTP.
    pub mime_type: String,

    /// Taille en octets si connue.
    pub size: Option<u64>,

    /// Date de dernière modification si connue.
    pub modified: Option<DateTime<Utc>>,

    /// Sac de propriétés libres (emplacement physique, etc.).
    #[serde(default)]
    pub properties: HashMap<String, String>,

    pub audio: Option<AudioMeta>,
    pub video: Option<VideoMeta>,
    pub image: Option<ImageMeta>,

    /// La ressource possède une pochette servie via `cover/<id>`.
    #[serde(default)]
    pub has_cover: bool,

    /// La ressource possède des sous-titres servis via `subtitle/<id>`.
    #[serde(default)]
    pub has_subtitle: bool,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        kind: MediaKind,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            path: Vec::new(),
            kind,
            mime_type: mime_type.into(),
            size: None,
            modified: None,
            properties: HashMap::new(),
            audio: None,
            video: None,
            image: None,
            has_cover: false,
            has_subtitle: false,
        }
    }

    /// Emplacement physique (chemin local) si le catalogue l'a renseigné.
    pub fn location(&self) -> Option<&str> {
        self.properties.get("location").map(String::as_str)
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Resource {}

impl std::hash::Hash for Resource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
