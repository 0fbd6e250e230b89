//! Sous-système de comparateurs.
//!
//! Un comparateur est un ordre total nommé, sans état, partagé entre toutes
//! les requêtes concurrentes. Le registre est une liste statique assemblée
//! au démarrage : pas de découverte dynamique, l'ordre d'enregistrement est
//! explicite.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::sync::Arc;

use dmsutils::{ArticleNormalizer, TitleNormalizer, natural_cmp};

/// Clé de tri d'un enfant direct (dossier ou ressource).
#[derive(Debug, Clone)]
pub struct SortKey {
    pub title: String,
    /// Identité, départage déterministe en cas d'égalité.
    pub id: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Ordre total nommé sur les enfants d'un dossier.
///
/// Contrat : ordre total, les valeurs absentes se classent en dernier,
/// l'identité départage toute égalité.
pub trait Comparer: Send + Sync {
    /// Nom utilisé pour la sélection en configuration.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn compare(&self, a: &SortKey, b: &SortKey) -> Ordering;
}

/// Ordre naturel sur les titres normalisés.
pub struct TitleComparer {
    normalizer: Arc<dyn TitleNormalizer>,
}

impl TitleComparer {
    pub fn new(normalizer: Arc<dyn TitleNormalizer>) -> Self {
        Self { normalizer }
    }
}

impl Default for TitleComparer {
    fn default() -> Self {
        Self::new(Arc::new(ArticleNormalizer::default()))
    }
}

impl Comparer for TitleComparer {
    fn name(&self) -> &'static str {
        "title"
    }

    fn description(&self) -> &'static str {
        "Natural, case-insensitive title order"
    }

    fn compare(&self, a: &SortKey, b: &SortKey) -> Ordering {
        natural_cmp(
            &self.normalizer.sort_key(&a.title),
            &self.normalizer.sort_key(&b.title),
        )
        .then_with(|| a.id.cmp(&b.id))
    }
}

/// Ordre par date de modification, du plus récent au plus ancien.
///
/// Les entrées sans date se classent en dernier.
pub struct DateComparer;

impl Comparer for DateComparer {
    fn name(&self) -> &'static str {
        "date"
    }

    fn description(&self) -> &'static str {
        "Most recently modified first"
    }

    fn compare(&self, a: &SortKey, b: &SortKey) -> Ordering {
        match (a.modified, b.modified) {
            (Some(da), Some(db)) => db.cmp(&da),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| natural_cmp(&a.title, &b.title))
        .then_with(|| a.id.cmp(&b.id))
    }
}

/// Registre statique, ordonné, des comparateurs disponibles.
static COMPARERS: Lazy<Vec<Arc<dyn Comparer>>> = Lazy::new(|| {
    vec![
        Arc::new(TitleComparer::default()),
        Arc::new(DateComparer),
    ]
});

/// Recherche un comparateur par nom.
pub fn get_comparer(name: &str) -> Option<Arc<dyn Comparer>> {
    COMPARERS.iter().find(|c| c.name() == name).cloned()
}

/// Le comparateur par défaut (« title »).
pub fn default_comparer() -> Arc<dyn Comparer> {
    Arc::clone(&COMPARERS[0])
}

/// Liste (nom, description) des comparateurs, dans l'ordre du registre.
pub fn list_comparers() -> Vec<(&'static str, &'static str)> {
    COMPARERS
        .iter()
        .map(|c| (c.name(), c.description()))
        .collect()
}
