//! Normalisation des titres pour le tri et le rangement par lettre.
//!
//! Les heuristiques de normalisation (déplacement de l'article initial,
//! choix de la lettre de rangement) dépendent de la locale. Elles sont donc
//! exposées derrière la capacité [`TitleNormalizer`] plutôt que codées en
//! dur dans les comparateurs et les vues.

use crate::natural::fold_key;

/// Capacité de normalisation des titres.
///
/// Implémentée par le serveur pour sa locale; les vues et comparateurs ne
/// connaissent que ce contrat.
pub trait TitleNormalizer: Send + Sync {
    /// Clé de tri d'un titre (casse repliée, article éventuellement déplacé).
    fn sort_key(&self, title: &str) -> String;

    /// Lettre de rangement d'un titre, pour les seaux « première lettre ».
    ///
    /// Les titres ne commençant pas par une lettre se rangent sous `#`.
    fn bucket(&self, title: &str) -> String {
        match self.sort_key(title).chars().next() {
            Some(c) if c.is_alphabetic() => c.to_uppercase().collect(),
            _ => "#".to_string(),
        }
    }
}

/// Normalisateur sans heuristique : clé repliée telle quelle.
#[derive(Debug, Default, Clone)]
pub struct PlainNormalizer;

impl TitleNormalizer for PlainNormalizer {
    fn sort_key(&self, title: &str) -> String {
        fold_key(title)
    }
}

/// Normalisateur avec déplacement de l'article initial.
///
/// `"The Wall"` produit la clé `"wall, the"` et se range donc sous `W`.
#[derive(Debug, Clone)]
pub struct ArticleNormalizer {
    articles: Vec<&'static str>,
}

impl Default for ArticleNormalizer {
    fn default() -> Self {
        Self {
            articles: vec!["the", "a", "an", "le", "la", "les", "der", "die", "das"],
        }
    }
}

impl ArticleNormalizer {
    pub fn with_articles(articles: Vec<&'static str>) -> Self {
        Self { articles }
    }
}

impl TitleNormalizer for ArticleNormalizer {
    fn sort_key(&self, title: &str) -> String {
        let key = fold_key(title);
        for article in &self.articles {
            if let Some(rest) = key.strip_prefix(article) {
                if let Some(rest) = rest.strip_prefix(' ') {
                    if !rest.is_empty() {
                        return format!("{}, {}", rest, article);
                    }
                }
            }
        }
        key
    }
}
