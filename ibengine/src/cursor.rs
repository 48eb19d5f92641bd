//! Curseur de rotation sur une playlist.
//!
//! La continuité entre deux versions de la playlist repose sur l'identité
//! des éléments (leur `id`), jamais sur leur position.

use crate::model::MediaItem;

/// Différence entre deux versions d'une playlist, utilisée pour les logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistDiff {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
    /// L'élément courant existe toujours dans la nouvelle playlist.
    pub current_kept: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistCursor {
    items: Vec<MediaItem>,
    index: usize,
}

impl PlaylistCursor {
    /// Crée un curseur positionné sur le premier élément.
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self { items, index: 0 }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Retourne l'élément courant, `None` si la playlist est vide.
    pub fn current(&self) -> Option<&MediaItem> {
        self.items.get(self.index)
    }

    /// Passe à l'élément suivant (cyclique). Sans effet sur une playlist vide.
    pub fn advance(&mut self) {
        if !self.items.is_empty() {
            self.index = (self.index + 1) % self.items.len();
        }
    }

    /// Remplace la playlist en conservant l'élément courant s'il est toujours
    /// présent (à sa nouvelle position), sinon revient au début.
    pub fn replace(&mut self, items: Vec<MediaItem>) -> PlaylistDiff {
        let current_id = self.current().map(|item| item.id);

        let added = items
            .iter()
            .filter(|new| !self.items.iter().any(|old| old.id == new.id))
            .map(|item| item.id)
            .collect();
        let removed = self
            .items
            .iter()
            .filter(|old| !items.iter().any(|new| new.id == old.id))
            .map(|item| item.id)
            .collect();

        let kept_index =
            current_id.and_then(|id| items.iter().position(|item| item.id == id));

        self.items = items;
        self.index = kept_index.unwrap_or(0);

        PlaylistDiff {
            added,
            removed,
            current_kept: kept_index.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ids: &[i64]) -> Vec<MediaItem> {
        ids.iter()
            .map(|id| MediaItem::new(*id, format!("https://example.org/{}", id)))
            .collect()
    }

    fn current_id(cursor: &PlaylistCursor) -> Option<i64> {
        cursor.current().map(|item| item.id)
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = PlaylistCursor::default();
        assert_eq!(cursor.current(), None);
        cursor.advance();
        assert_eq!(cursor.index(), 0);
        assert_eq!(cursor.current(), None);
    }

    #[test]
    fn test_n_advances_return_to_start() {
        for n in 1..=5 {
            let mut cursor = PlaylistCursor::new(items(&(1..=n).collect::<Vec<_>>()));
            cursor.advance();
            let start = cursor.index();
            for _ in 0..n {
                cursor.advance();
            }
            assert_eq!(cursor.index(), start, "playlist of {} items", n);
        }
    }

    #[test]
    fn test_single_item_stays_put() {
        let mut cursor = PlaylistCursor::new(items(&[42]));
        cursor.advance();
        assert_eq!(current_id(&cursor), Some(42));
    }

    #[test]
    fn test_replace_keeps_current_item() {
        let mut cursor = PlaylistCursor::new(items(&[1, 2, 3]));
        cursor.advance();
        assert_eq!(current_id(&cursor), Some(2));

        let diff = cursor.replace(items(&[2, 3, 4]));
        assert_eq!(current_id(&cursor), Some(2));
        assert_eq!(cursor.index(), 0);
        assert!(diff.current_kept);
        assert_eq!(diff.added, vec![4]);
        assert_eq!(diff.removed, vec![1]);

        cursor.advance();
        assert_eq!(current_id(&cursor), Some(3));
    }

    #[test]
    fn test_replace_follows_moved_item() {
        let mut cursor = PlaylistCursor::new(items(&[1, 2, 3]));
        cursor.advance();
        cursor.replace(items(&[3, 1, 2]));
        assert_eq!(cursor.index(), 2);
        assert_eq!(current_id(&cursor), Some(2));
    }

    #[test]
    fn test_replace_dropping_current_resets() {
        let mut cursor = PlaylistCursor::new(items(&[1, 2, 3]));
        cursor.advance();
        cursor.advance();

        let diff = cursor.replace(items(&[1, 2]));
        assert!(!diff.current_kept);
        assert_eq!(cursor.index(), 0);
        assert_eq!(current_id(&cursor), Some(1));
    }

    #[test]
    fn test_replace_with_empty_playlist() {
        let mut cursor = PlaylistCursor::new(items(&[1, 2]));
        cursor.replace(Vec::new());
        assert_eq!(cursor.current(), None);

        cursor.replace(items(&[5]));
        assert_eq!(current_id(&cursor), Some(5));
    }
}
