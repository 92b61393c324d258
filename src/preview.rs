//! In-memory object-URL store for local previews of selected blueprints.

use std::collections::HashMap;

/// URL scheme prefix for preview handles.
const PREVIEW_PREFIX: &str = "blob:blueprint3d/";

/// Holds preview bytes keyed by a `blob:` style URL until revoked.
#[derive(Debug, Default)]
pub struct PreviewStore {
    entries: HashMap<String, Vec<u8>>,
    next_id: u64,
}

impl PreviewStore {
    /// Register bytes and return the URL that refers to them.
    pub fn create(&mut self, bytes: Vec<u8>) -> String {
        self.next_id += 1;
        let url = format!("{PREVIEW_PREFIX}{}", self.next_id);
        self.entries.insert(url.clone(), bytes);
        url
    }

    /// Release a URL. Unknown URLs are ignored.
    pub fn revoke(&mut self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    /// Bytes behind a live URL.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&[u8]> {
        self.entries.get(url).map(Vec::as_slice)
    }

    /// Number of URLs not yet revoked.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    /// Revoke everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_revoke() {
        let mut store = PreviewStore::default();
        let url = store.create(vec![1, 2]);
        assert!(url.starts_with("blob:blueprint3d/"));
        assert_eq!(store.get(&url), Some(&[1u8, 2][..]));
        assert!(store.revoke(&url));
        assert!(store.get(&url).is_none());
        assert!(!store.revoke(&url));
    }

    #[test]
    fn urls_are_unique() {
        let mut store = PreviewStore::default();
        let a = store.create(vec![1]);
        let b = store.create(vec![1]);
        assert_ne!(a, b);
        assert_eq!(store.live_count(), 2);
        store.clear();
        assert_eq!(store.live_count(), 0);
    }
}
