//! # dmsviews - Moteur de transformation de vues
//!
//! Une vue est une transformation nommée, pure et sans état, d'un arbre de
//! dossiers vers un autre arbre représentant une organisation de navigation
//! alternative (par titre, par genre, par artiste, par récence...).
//!
//! ## Modèle
//!
//! - la vue consomme l'arbre physique en lecture seule et produit un arbre
//!   neuf à chaque (re)construction;
//! - les ressources (`Arc<Resource>`) sont partagées entre générations,
//!   jamais les collections d'enfants;
//! - une entrée cyclique est détectée et rejetée, jamais parcourue en
//!   boucle;
//! - une ressource privée d'un attribut requis est simplement absente des
//!   seaux indexés par cet attribut, mais reste présente dans les vues non
//!   filtrées.
//!
//! ## Registre
//!
//! Comme pour les comparateurs, le registre des vues est une liste
//! statique : des constructeurs explicites derrière [`make_view`], pas de
//! découverte dynamique.

pub mod engine;
pub mod filter;
pub mod music;
pub mod params;
pub mod recent;
pub mod titles;

use dmsmodel::{Tree, TreeError};

pub use params::ViewParams;

/// Erreurs de construction d'une vue.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Une transformation nommée `Tree -> Tree`.
///
/// Les vues sont sans état : leurs paramètres sont fixés à la
/// construction, la transformation peut être rejouée sur chaque nouvelle
/// génération de l'arbre physique.
pub trait View: Send + Sync {
    /// Nom utilisé pour la sélection en configuration.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Construit l'arbre de la vue à partir de l'arbre source.
    fn transform(&self, source: &Tree) -> Result<Tree, ViewError>;
}

/// Table statique des vues disponibles : (nom, description).
const VIEWS: &[(&str, &str)] = &[
    ("titles", "All titles, bucketed by first letter"),
    ("genres", "Audio resources grouped by genre"),
    ("music", "Music library: artists, performers, albums, genres"),
    ("recent", "Resources added or changed recently"),
    ("audio", "Only folders containing audio"),
    ("video", "Only folders containing video"),
    ("image", "Only folders containing images"),
];

/// Construit une vue par nom.
///
/// Les paramètres non reconnus par la vue sont ignorés, conformément au
/// contrat de configuration.
pub fn make_view(name: &str, params: &ViewParams) -> Option<Box<dyn View>> {
    match name {
        "titles" => Some(Box::new(titles::TitlesView::new(params))),
        "genres" => Some(Box::new(titles::GenresView::new(params))),
        "music" => Some(Box::new(music::MusicView::new(params))),
        "recent" => Some(Box::new(recent::RecentView::new(params))),
        "audio" => Some(Box::new(filter::KindFilterView::audio())),
        "video" => Some(Box::new(filter::KindFilterView::video())),
        "image" => Some(Box::new(filter::KindFilterView::image())),
        _ => None,
    }
}

/// Liste (nom, description) des vues, dans l'ordre du registre.
pub fn list_views() -> Vec<(&'static str, &'static str)> {
    VIEWS.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        let params = ViewParams::default();
        for (name, _) in list_views() {
            assert!(make_view(name, &params).is_some(), "missing view {name}");
        }
        assert!(make_view("nope", &params).is_none());
    }

    #[test]
    fn test_unknown_params_are_ignored() {
        let mut params = ViewParams::default();
        params.set_str("no_such_parameter", "whatever");
        assert!(make_view("titles", &params).is_some());
    }
}
