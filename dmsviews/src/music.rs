//! Vue de domaine musicale.
//!
//! Un seul passage sur les feuilles audio de l'arbre source alimente en
//! parallèle quatre hiérarchies indexées (artistes, interprètes, albums,
//! genres); la forme d'origine est conservée en dernière branche
//! « Folders ». Chaque ressource est rangée sous un chemin de clés à deux
//! niveaux (seau première lettre, puis seau nom), et un item synthétique
//! « All Albums » par artiste affiche le titre décoré du nom d'album sans
//! dupliquer l'identité de la ressource.

use std::sync::Arc;

use dmsmodel::{NodeId, Tree, default_comparer};
use dmsutils::{ArticleNormalizer, TitleNormalizer};

use crate::engine::{copy_subtree, decorated, walk_folders};
use crate::params::ViewParams;
use crate::{View, ViewError};

pub struct MusicView {
    normalizer: Arc<dyn TitleNormalizer>,
}

impl MusicView {
    pub fn new(_params: &ViewParams) -> Self {
        Self {
            normalizer: Arc::new(ArticleNormalizer::default()),
        }
    }

    /// Range une ressource sous `section → lettre → nom`.
    fn keyed_path(&self, tree: &mut Tree, section: NodeId, name: &str) -> NodeId {
        let letter = self.normalizer.bucket(name);
        let letter_bucket = tree.get_or_create_child(section, &letter);
        tree.get_or_create_child(letter_bucket, name)
    }
}

impl View for MusicView {
    fn name(&self) -> &'static str {
        "music"
    }

    fn description(&self) -> &'static str {
        "Music library: artists, performers, albums, genres"
    }

    fn transform(&self, source: &Tree) -> Result<Tree, ViewError> {
        let mut out = Tree::new(source.title(source.root()));
        let root = out.root();
        let artists = out.add_folder(root, "Artists");
        let performers = out.add_folder(root, "Performers");
        let albums = out.add_folder(root, "Albums");
        let genres = out.add_folder(root, "Genres");

        for folder in walk_folders(source, source.root())? {
            for resource in source.resources(folder) {
                let Some(audio) = resource.audio.as_ref() else {
                    continue;
                };
                let album = audio.album.as_deref();

                if let Some(artist) = audio.artist.as_deref() {
                    let artist_folder = self.keyed_path(&mut out, artists, artist);
                    if let Some(album) = album {
                        let album_folder = out.get_or_create_child(artist_folder, album);
                        out.add_resource(album_folder, Arc::clone(resource));
                    }
                    // « All Albums » : titre décoré, identité inchangée.
                    let all = out.get_or_create_child(artist_folder, "All Albums");
                    out.add_resource(all, decorated(resource, album));
                }

                if let Some(performer) = audio.performer.as_deref() {
                    let performer_folder = self.keyed_path(&mut out, performers, performer);
                    match album {
                        Some(album) => {
                            let album_folder = out.get_or_create_child(performer_folder, album);
                            out.add_resource(album_folder, Arc::clone(resource));
                        }
                        None => out.add_resource(performer_folder, Arc::clone(resource)),
                    }
                }

                if let Some(album) = album {
                    let album_folder = self.keyed_path(&mut out, albums, album);
                    out.add_resource(album_folder, Arc::clone(resource));
                }

                if let Some(genre) = audio.genre.as_deref() {
                    let genre_folder = out.get_or_create_child(genres, genre);
                    out.add_resource(genre_folder, Arc::clone(resource));
                }
            }
        }

        // La structure d'origine reste accessible en dernière branche.
        let folders_branch = out.add_folder(root, "Folders");
        copy_subtree(source, source.root(), &mut out, folders_branch)?;

        out.sort_recursive(default_comparer().as_ref(), false);
        out.reindex();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmsmodel::{AudioMeta, MediaKind, Resource};

    fn track(
        id: &str,
        title: &str,
        artist: Option<&str>,
        performer: Option<&str>,
        album: Option<&str>,
        genre: Option<&str>,
    ) -> Arc<Resource> {
        let mut r = Resource::new(id, title, MediaKind::Audio, "audio/flac");
        r.audio = Some(AudioMeta {
            artist: artist.map(str::to_string),
            performer: performer.map(str::to_string),
            album: album.map(str::to_string),
            genre: genre.map(str::to_string),
            track: None,
        });
        Arc::new(r)
    }

    fn source() -> Tree {
        let mut tree = Tree::new("Media");
        let root = tree.root();
        let rips = tree.add_folder(root, "Rips");
        tree.add_resource(
            rips,
            track(
                "r1",
                "Money",
                Some("Pink Floyd"),
                Some("Pink Floyd"),
                Some("The Dark Side of the Moon"),
                Some("Rock"),
            ),
        );
        tree.add_resource(
            rips,
            track(
                "r2",
                "Time",
                Some("Pink Floyd"),
                None,
                Some("The Dark Side of the Moon"),
                Some("Rock"),
            ),
        );
        tree.add_resource(rips, track("r3", "Untagged", None, None, None, None));
        tree
    }

    fn find_child<'a>(tree: &'a Tree, node: NodeId, title: &str) -> Option<NodeId> {
        tree.folders(node)
            .iter()
            .copied()
            .find(|&f| tree.title(f) == title)
    }

    #[test]
    fn test_sections_and_artist_path() {
        let view = MusicView::new(&ViewParams::default());
        let out = view.transform(&source()).unwrap();
        let root = out.root();

        let titles: Vec<&str> = out.folders(root).iter().map(|&f| out.title(f)).collect();
        assert_eq!(
            titles,
            vec!["Albums", "Artists", "Folders", "Genres", "Performers"]
        );

        // Artists → P → Pink Floyd → { All Albums, The Dark Side of the Moon }
        let artists = find_child(&out, root, "Artists").unwrap();
        let p = find_child(&out, artists, "P").unwrap();
        let floyd = find_child(&out, p, "Pink Floyd").unwrap();
        let album = find_child(&out, floyd, "The Dark Side of the Moon").unwrap();
        assert_eq!(out.resources(album).len(), 2);

        let all = find_child(&out, floyd, "All Albums").unwrap();
        let decorated_titles: Vec<&str> = out
            .resources(all)
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert!(decorated_titles.contains(&"Money (The Dark Side of the Moon)"));
        // L'identité n'est pas dupliquée : même id que la piste d'album.
        assert!(out.resources(all).iter().any(|r| r.id == "r1"));
    }

    #[test]
    fn test_untagged_resource_kept_in_folders_branch() {
        let view = MusicView::new(&ViewParams::default());
        let out = view.transform(&source()).unwrap();
        let root = out.root();

        // Absente des seaux indexés...
        let artists = find_child(&out, root, "Artists").unwrap();
        assert_eq!(out.full_child_count(artists), 4); // r1+r2 en album et All Albums

        // ... mais retenue dans la branche Folders.
        let folders = find_child(&out, root, "Folders").unwrap();
        let rips = find_child(&out, folders, "Rips").unwrap();
        assert!(out.resources(rips).iter().any(|r| r.id == "r3"));
    }

    #[test]
    fn test_performer_differs_from_artist() {
        let mut tree = Tree::new("Media");
        let root = tree.root();
        tree.add_resource(
            root,
            track(
                "r1",
                "Cover Song",
                Some("Various Artists"),
                Some("The Band"),
                Some("Tribute"),
                None,
            ),
        );

        let view = MusicView::new(&ViewParams::default());
        let out = view.transform(&tree).unwrap();
        let root = out.root();

        let performers = find_child(&out, root, "Performers").unwrap();
        let b = find_child(&out, performers, "B").unwrap();
        assert!(find_child(&out, b, "The Band").is_some());

        let artists = find_child(&out, root, "Artists").unwrap();
        let v = find_child(&out, artists, "V").unwrap();
        assert!(find_child(&out, v, "Various Artists").is_some());
    }
}
