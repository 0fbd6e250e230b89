//! # dmsmediaserver - Cœur protocolaire du serveur média
//!
//! Ce crate implémente la surface HTTP/SOAP attendue par les clients
//! UPnP-AV (TV, consoles, renderers) au-dessus des vues de `dmsviews`.
//!
//! # Architecture
//!
//! Un [`Mount`](mount::Mount) lie la racine d'une vue à un préfixe d'URL
//! et à une identité de device, et répond à tout le tableau de dispatch :
//!
//! - `description.xml` : descripteur de device, GUID par adresse appelante
//! - `contentDirectory.xml`, `connectionManager.xml`,
//!   `MSMediaReceiverRegistrar.xml` : SCPD statiques embarqués
//! - `control` : déballage SOAP et dispatch d'actions (Browse paginé,
//!   capacités, SystemUpdateID, ConnectionManager)
//! - `file/<id>`, `cover/<id>`, `subtitle/<id>` : corps média en streaming
//!   paresseux, plages `Range` comprises
//! - `index/<id>` : navigation HTML de secours
//! - `SUBSCRIBE` / `UNSUBSCRIBE` : GENA accepté mais non suivi (les
//!   clients sondent GetSystemUpdateID)
//!
//! # Concurrence
//!
//! Les arbres publiés sont immuables; un rescan construit une génération
//! neuve et la bascule par une unique affectation d'`Arc`. Les requêtes en
//! vol terminent sur la génération précédente, jamais bloquées.
//!
//! # Collaborateurs
//!
//! L'autorisation ([`auth::Authorizer`]), le catalogue
//! ([`catalog::MediaCatalog`]) et l'accès aux octets
//! ([`streams::MediaStreams`]) sont des capacités injectées : le cœur n'a
//! aucune politique propre.

pub mod actions;
pub mod auth;
pub mod catalog;
pub mod descriptor;
pub mod errors;
pub mod mount;
pub mod registry;
pub mod soap;
pub mod streams;

pub use actions::{ActionContext, ActionDispatcher, ActionError, ActionHandler};
pub use auth::{AllowAll, Authorizer};
pub use catalog::{MediaCatalog, StaticCatalog};
pub use errors::HandlerError;
pub use mount::{Mount, MountItem};
pub use registry::{MediaServerExt, MountRegistry, initial_tree, spawn_rescan};
pub use streams::{FsMediaStreams, MediaBody, MediaStreams, RangeSpec};
