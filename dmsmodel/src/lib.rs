//! # dmsmodel - Modèle de dossiers virtuels
//!
//! Ce crate définit la hiérarchie de contenu adressable servie aux clients
//! UPnP : ressources média (feuilles), arbre de dossiers virtuels, et le
//! sous-système de comparateurs qui ordonne tout cela.
//!
//! ## Architecture
//!
//! - [`Resource`] : feuille jouable (audio/vidéo/image), identité stable,
//!   métadonnées optionnelles fournies par le catalogue
//! - [`Tree`] : arène de nœuds dossiers adressés par index ([`NodeId`]),
//!   parent par index, détection de cycle à l'adoption
//! - [`Comparer`] : ordres totaux nommés, registre statique
//!
//! Les arbres publiés sont immuables : toute mutation a lieu pendant la
//! phase de construction mono-thread, avant publication (voir `dmsviews`).

pub mod comparers;
pub mod resource;
pub mod tree;

pub use comparers::{Comparer, SortKey, default_comparer, get_comparer, list_comparers};
pub use resource::{AudioMeta, ImageMeta, MediaKind, Resource, VideoMeta};
pub use tree::{NodeId, Tree, TreeError};
