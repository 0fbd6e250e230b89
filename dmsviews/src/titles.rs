//! Vues par tri-fusion en cascade : « titles » et « genres ».
//!
//! Les deux vues suivent la même recette : cloner la forme de l'arbre
//! source, déplacer chaque feuille vers un seau indexé par un attribut
//! dérivé (première lettre du titre, genre), dissoudre les seaux trop
//! petits, fusionner les frères homonymes, puis ajouter au besoin une
//! couche de cascade pour borner le fan-out.

use std::sync::Arc;

use dmsmodel::{Resource, Tree, default_comparer};
use dmsutils::{ArticleNormalizer, TitleNormalizer};

use crate::engine::{
    adopt_buckets, cascade, clone_shape, merge_duplicate_siblings, prune_empty_folders,
    walk_folders,
};
use crate::params::ViewParams;
use crate::{View, ViewError};

/// Seuil de cascade par défaut (nombre maximal d'enfants d'un listing).
pub const DEFAULT_CASCADE_THRESHOLD: usize = 50;

/// Paramètres communs aux vues en cascade.
struct CascadeSettings {
    enabled: bool,
    threshold: usize,
}

impl CascadeSettings {
    fn from_params(params: &ViewParams) -> Self {
        Self {
            enabled: params.get_bool("cascade", true),
            threshold: params.get_num("cascade_threshold", DEFAULT_CASCADE_THRESHOLD as i64)
                as usize,
        }
    }
}

/// Transformation commune : seaux par attribut, dissolution, fusion, cascade.
///
/// `key_of` dérive la clé de seau d'une ressource; `None` signifie que la
/// ressource n'a pas l'attribut requis : elle est laissée à sa place dans
/// la forme clonée plutôt que perdue.
fn sort_and_merge(
    source: &Tree,
    settings: &CascadeSettings,
    normalizer: &dyn TitleNormalizer,
    key_of: impl Fn(&Arc<Resource>) -> Option<String>,
) -> Result<Tree, ViewError> {
    let mut out = clone_shape(source)?;
    let root = out.root();

    // Zone de transit détachée pour les seaux.
    let staging = out.add_folder(root, "staging");
    out.release_folder(root, staging)?;

    for folder in walk_folders(&out, root)? {
        for resource in out.resources(folder).to_vec() {
            if let Some(key) = key_of(&resource) {
                out.remove_resource(folder, &resource.id);
                let bucket = out.get_or_create_child(staging, &key);
                out.add_resource(bucket, resource);
            }
        }
    }

    // La forme d'origine, vidée de ses feuilles indexées, ne garde que les
    // dossiers abritant encore des ressources sans attribut.
    prune_empty_folders(&mut out, root)?;

    adopt_buckets(&mut out, staging, root)?;
    merge_duplicate_siblings(&mut out, root)?;

    if settings.enabled && out.child_count(root) > settings.threshold {
        tracing::debug!(
            children = out.child_count(root),
            threshold = settings.threshold,
            "cascading top-level listing"
        );
        cascade(&mut out, root, normalizer)?;
    }

    out.sort_recursive(default_comparer().as_ref(), false);
    out.reindex();
    Ok(out)
}

/// Vue alphabétique : toutes les feuilles, rangées par première lettre.
pub struct TitlesView {
    settings: CascadeSettings,
    normalizer: Arc<dyn TitleNormalizer>,
}

impl TitlesView {
    pub fn new(params: &ViewParams) -> Self {
        Self {
            settings: CascadeSettings::from_params(params),
            normalizer: Arc::new(ArticleNormalizer::default()),
        }
    }
}

impl View for TitlesView {
    fn name(&self) -> &'static str {
        "titles"
    }

    fn description(&self) -> &'static str {
        "All titles, bucketed by first letter"
    }

    fn transform(&self, source: &Tree) -> Result<Tree, ViewError> {
        let normalizer = Arc::clone(&self.normalizer);
        sort_and_merge(source, &self.settings, self.normalizer.as_ref(), move |r| {
            Some(normalizer.bucket(&r.title))
        })
    }
}

/// Vue par genre : les ressources audio, rangées par tag de genre.
///
/// Une ressource sans tag de genre reste dans la forme d'origine au lieu
/// de rejoindre un seau.
pub struct GenresView {
    settings: CascadeSettings,
    normalizer: Arc<dyn TitleNormalizer>,
}

impl GenresView {
    pub fn new(params: &ViewParams) -> Self {
        Self {
            settings: CascadeSettings::from_params(params),
            normalizer: Arc::new(ArticleNormalizer::default()),
        }
    }
}

impl View for GenresView {
    fn name(&self) -> &'static str {
        "genres"
    }

    fn description(&self) -> &'static str {
        "Audio resources grouped by genre"
    }

    fn transform(&self, source: &Tree) -> Result<Tree, ViewError> {
        sort_and_merge(source, &self.settings, self.normalizer.as_ref(), |r| {
            r.audio.as_ref().and_then(|a| a.genre.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmsmodel::{AudioMeta, MediaKind};

    fn audio(id: &str, title: &str, genre: Option<&str>) -> Arc<Resource> {
        let mut r = Resource::new(id, title, MediaKind::Audio, "audio/flac");
        r.audio = Some(AudioMeta {
            genre: genre.map(str::to_string),
            ..AudioMeta::default()
        });
        Arc::new(r)
    }

    fn titled_tree(titles: &[&str]) -> Tree {
        let mut tree = Tree::new("Media");
        let root = tree.root();
        let sub = tree.add_folder(root, "Incoming");
        for (i, title) in titles.iter().enumerate() {
            tree.add_resource(sub, audio(&format!("r{}", i), title, None));
        }
        tree
    }

    #[test]
    fn test_titles_view_buckets_by_letter() {
        let source = titled_tree(&["Alpha", "Amber", "Beta", "Bravo", "Celt"]);
        let view = TitlesView::new(&ViewParams::default());
        let out = view.transform(&source).unwrap();
        let root = out.root();

        // A et B font des seaux, C (singleton) est dissous en item libre.
        let titles: Vec<&str> = out
            .folders(root)
            .iter()
            .map(|&f| out.title(f))
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(out.resources(root).len(), 1);
        assert_eq!(out.resources(root)[0].title, "Celt");
        assert_eq!(out.full_child_count(root), 5);
    }

    #[test]
    fn test_titles_view_keeps_source_untouched() {
        let source = titled_tree(&["Alpha", "Amber"]);
        let before = source.full_child_count(source.root());
        let view = TitlesView::new(&ViewParams::default());
        let _ = view.transform(&source).unwrap();
        assert_eq!(source.full_child_count(source.root()), before);
        assert_eq!(source.folders(source.root()).len(), 1);
    }

    #[test]
    fn test_genres_view_skips_untagged() {
        let mut tree = Tree::new("Media");
        let root = tree.root();
        let sub = tree.add_folder(root, "Rips");
        tree.add_resource(sub, audio("r1", "One", Some("Rock")));
        tree.add_resource(sub, audio("r2", "Two", Some("Rock")));
        tree.add_resource(sub, audio("r3", "Three", None));

        let view = GenresView::new(&ViewParams::default());
        let out = view.transform(&tree).unwrap();
        let root = out.root();

        // Le seau Rock existe; la ressource sans genre reste dans Rips.
        let titles: Vec<&str> = out.folders(root).iter().map(|&f| out.title(f)).collect();
        assert!(titles.contains(&"Rock"));
        assert!(titles.contains(&"Rips"));
        assert_eq!(out.full_child_count(root), 3);
    }

    #[test]
    fn test_cascade_applies_over_threshold() {
        let titles: Vec<String> = (0..60)
            .map(|i| format!("{}{} title", char::from(b'a' + (i % 26) as u8), i))
            .collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let source = titled_tree(&refs);

        let mut params = ViewParams::default();
        params.set_num("cascade_threshold", 10);
        let view = TitlesView::new(&params);
        let out = view.transform(&source).unwrap();

        assert!(out.child_count(out.root()) <= 26);
        assert_eq!(out.full_child_count(out.root()), 60);
    }

    #[test]
    fn test_cascade_can_be_disabled() {
        let titles: Vec<String> = (0..60).map(|i| format!("t{} song", i)).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let source = titled_tree(&refs);

        let mut params = ViewParams::default();
        params.set_num("cascade_threshold", 10);
        params.set_bool("cascade", false);
        let view = TitlesView::new(&params);
        let out = view.transform(&source).unwrap();

        // Tout sous « T », pas de couche supplémentaire.
        let root = out.root();
        assert_eq!(out.folders(root).len(), 1);
        let t = out.folders(root)[0];
        assert_eq!(out.title(t), "T");
        assert_eq!(out.child_count(t), 60);
    }
}
