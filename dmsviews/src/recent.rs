//! Vue de récence : les ressources modifiées depuis une date de coupure.

use chrono::{Duration, Utc};
use dmsmodel::{Tree, get_comparer};

use crate::params::ViewParams;
use crate::{View, ViewError};

/// Fenêtre de récence par défaut, en jours.
pub const DEFAULT_RECENT_DAYS: i64 = 7;

/// Liste plate des ressources récentes, la plus fraîche en tête.
///
/// Une ressource sans date de modification n'est jamais « récente ».
pub struct RecentView {
    days: i64,
}

impl RecentView {
    pub fn new(params: &ViewParams) -> Self {
        Self {
            days: params.get_num("days", DEFAULT_RECENT_DAYS).max(0),
        }
    }
}

impl View for RecentView {
    fn name(&self) -> &'static str {
        "recent"
    }

    fn description(&self) -> &'static str {
        "Resources added or changed recently"
    }

    fn transform(&self, source: &Tree) -> Result<Tree, ViewError> {
        let cutoff = Utc::now() - Duration::days(self.days);
        let mut out = Tree::new(source.title(source.root()));
        let root = out.root();

        for resource in source.collect_resources(source.root())? {
            if resource.modified.is_some_and(|m| m >= cutoff) {
                out.add_resource(root, resource);
            }
        }

        let by_date = get_comparer("date").unwrap_or_else(dmsmodel::default_comparer);
        out.sort_children(root, by_date.as_ref(), false);
        out.reindex();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmsmodel::{MediaKind, Resource};
    use std::sync::Arc;

    fn dated(id: &str, title: &str, days_ago: i64) -> Arc<Resource> {
        let mut r = Resource::new(id, title, MediaKind::Video, "video/mp4");
        r.modified = Some(Utc::now() - Duration::days(days_ago));
        Arc::new(r)
    }

    #[test]
    fn test_cutoff_and_order() {
        let mut tree = Tree::new("Media");
        let root = tree.root();
        let sub = tree.add_folder(root, "Captures");
        tree.add_resource(sub, dated("old", "Old", 30));
        tree.add_resource(sub, dated("fresh", "Fresh", 1));
        tree.add_resource(sub, dated("today", "Today", 0));
        tree.add_resource(
            sub,
            Arc::new(Resource::new("undated", "Undated", MediaKind::Video, "video/mp4")),
        );

        let view = RecentView::new(&ViewParams::default());
        let out = view.transform(&tree).unwrap();
        let root = out.root();

        let ids: Vec<&str> = out.resources(root).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["today", "fresh"]);
        assert!(out.folders(root).is_empty());
    }

    #[test]
    fn test_window_parameter() {
        let mut tree = Tree::new("Media");
        let root = tree.root();
        tree.add_resource(root, dated("r1", "One", 20));

        let mut params = ViewParams::default();
        params.set_num("days", 40);
        let out = RecentView::new(&params).transform(&tree).unwrap();
        assert_eq!(out.resources(out.root()).len(), 1);

        params.set_num("days", 5);
        let out = RecentView::new(&params).transform(&tree).unwrap();
        assert_eq!(out.resources(out.root()).len(), 0);
    }
}
