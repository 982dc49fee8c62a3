//! Breadcrumb path from the root to the current folder.

use serde::Serialize;

use crate::item::ItemId;

/// Default label of the root crumb.
pub const DEFAULT_ROOT_LABEL: &str = "My Drive";

/// One step in the navigation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    /// Folder id, None for the root.
    pub folder_id: Option<ItemId>,
    /// Display name.
    pub name: String,
}

/// Navigation stack. The first crumb is always the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BreadcrumbPath {
    crumbs: Vec<Breadcrumb>,
}

impl Default for BreadcrumbPath {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_LABEL)
    }
}

impl BreadcrumbPath {
    /// Create a path holding only the root crumb.
    pub fn new(root_label: impl Into<String>) -> Self {
        Self {
            crumbs: vec![Breadcrumb {
                folder_id: None,
                name: root_label.into(),
            }],
        }
    }

    /// Append a folder to the path.
    pub fn push(&mut self, folder_id: ItemId, name: impl Into<String>) {
        self.crumbs.push(Breadcrumb {
            folder_id: Some(folder_id),
            name: name.into(),
        });
    }

    /// Position of the first crumb pointing at `folder_id`.
    pub fn position(&self, folder_id: Option<&ItemId>) -> Option<usize> {
        self.crumbs
            .iter()
            .position(|c| c.folder_id.as_ref() == folder_id)
    }

    /// Cut the path just after the first crumb pointing at `folder_id`.
    ///
    /// Returns false and leaves the path unchanged when no crumb matches.
    pub fn truncate_to(&mut self, folder_id: Option<&ItemId>) -> bool {
        match self.position(folder_id) {
            Some(index) => {
                self.crumbs.truncate(index + 1);
                true
            }
            None => false,
        }
    }

    /// Drop everything but the root crumb.
    pub fn reset(&mut self) {
        self.crumbs.truncate(1);
    }

    /// The crumb of the current folder.
    pub fn current(&self) -> &Breadcrumb {
        // The root crumb is never removed.
        &self.crumbs[self.crumbs.len() - 1]
    }

    /// The root crumb.
    pub fn root(&self) -> &Breadcrumb {
        &self.crumbs[0]
    }

    /// All crumbs from the root.
    pub fn crumbs(&self) -> &[Breadcrumb] {
        &self.crumbs
    }

    /// Number of crumbs, root included.
    pub fn len(&self) -> usize {
        self.crumbs.len()
    }

    /// Always false; a path holds at least the root.
    pub fn is_empty(&self) -> bool {
        self.crumbs.is_empty()
    }

    /// Crumb names joined with " / ".
    pub fn display(&self) -> String {
        self.crumbs
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}
