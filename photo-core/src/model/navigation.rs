//! ``src/model/navigation.rs``
//! ============================================================================
//! # `NavigationState`: breadcrumb stack and current folder
//!
//! Linear push/pop only. The first entry is always the root sentinel and the
//! last entry always names the current folder.

use std::fmt;

use smallvec::{SmallVec, smallvec};

use crate::model::resource::FolderId;

pub const ROOT_NAME: &str = "root";

/// One step of the path from root to the current folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbEntry {
    pub id: Option<FolderId>,
    pub name: String,
}

impl BreadcrumbEntry {
    #[must_use]
    pub fn root() -> Self {
        Self {
            id: None,
            name: ROOT_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    /// Never empty; index 0 is the root sentinel.
    stack: SmallVec<[BreadcrumbEntry; 8]>,
}

impl NavigationState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: smallvec![BreadcrumbEntry::root()],
        }
    }

    /// Enter a folder listed in the current location.
    pub fn open_folder(&mut self, id: FolderId, name: impl Into<String>) {
        self.stack.push(BreadcrumbEntry {
            id: Some(id),
            name: name.into(),
        });
    }

    /// Pop one level. Returns `false` (and does nothing) at root.
    pub fn go_back(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    #[must_use]
    pub fn current_folder(&self) -> Option<&FolderId> {
        self.stack.last().and_then(|entry| entry.id.as_ref())
    }

    #[must_use]
    pub fn breadcrumbs(&self) -> &[BreadcrumbEntry] {
        &self.stack
    }

    /// Number of folders below root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    #[must_use]
    pub fn is_at_root(&self) -> bool {
        self.stack.len() == 1
    }

    /// Back to root, dropping the whole path.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Breadcrumb bar text: `root / Vacation / Beach`
impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, entry) in self.stack.iter().enumerate() {
            if idx > 0 {
                f.write_str(" / ")?;
            }
            f.write_str(&entry.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_root() {
        let nav = NavigationState::new();

        assert_eq!(nav.breadcrumbs(), &[BreadcrumbEntry::root()]);
        assert_eq!(nav.current_folder(), None);
        assert!(nav.is_at_root());
    }

    #[test]
    fn test_back_at_root_is_noop() {
        let mut nav = NavigationState::new();

        assert!(!nav.go_back());
        assert_eq!(nav.breadcrumbs().len(), 1);
    }

    #[test]
    fn test_stack_discipline() {
        let mut nav = NavigationState::new();
        nav.open_folder("a".into(), "A");
        let before_b = nav.breadcrumbs().to_vec();

        nav.open_folder("b".into(), "B");
        assert_eq!(nav.current_folder(), Some(&FolderId::from("b")));
        assert_eq!(nav.depth(), 2);

        assert!(nav.go_back());
        assert_eq!(nav.breadcrumbs(), before_b.as_slice());
        assert_eq!(nav.current_folder(), Some(&FolderId::from("a")));

        assert!(nav.go_back());
        assert_eq!(nav.current_folder(), None);
    }

    #[test]
    fn test_random_sequences_match_vec_model() {
        // xorshift keeps the walk deterministic without a rand dependency
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..50 {
            let mut nav = NavigationState::new();
            let mut model: Vec<(String, String)> = Vec::new();

            for step in 0..200 {
                if next() % 3 == 0 {
                    let popped = nav.go_back();
                    assert_eq!(popped, model.pop().is_some());
                } else {
                    let id = format!("f{step}");
                    let name = format!("Folder {step}");
                    nav.open_folder(FolderId::new(id.clone()), name.clone());
                    model.push((id, name));
                }

                assert_eq!(nav.breadcrumbs()[0], BreadcrumbEntry::root());
                assert_eq!(nav.depth(), model.len());
                assert_eq!(
                    nav.current_folder().map(FolderId::as_str),
                    model.last().map(|(id, _)| id.as_str())
                );
                let tail: Vec<(&str, &str)> = nav.breadcrumbs()[1..]
                    .iter()
                    .map(|e| (e.id.as_ref().map_or("", FolderId::as_str), e.name.as_str()))
                    .collect();
                let expected: Vec<(&str, &str)> = model
                    .iter()
                    .map(|(id, name)| (id.as_str(), name.as_str()))
                    .collect();
                assert_eq!(tail, expected);
            }
        }
    }

    #[test]
    fn test_deep_path_and_reset() {
        let mut nav = NavigationState::new();
        for i in 0..12 {
            nav.open_folder(FolderId::new(format!("f{i}")), format!("F{i}"));
        }

        assert_eq!(nav.depth(), 12);
        assert_eq!(nav.current_folder().map(FolderId::as_str), Some("f11"));

        nav.reset();
        assert!(nav.is_at_root());
        assert_eq!(nav.breadcrumbs()[0], BreadcrumbEntry::root());
    }

    #[test]
    fn test_display_matches_breadcrumb_bar() {
        let mut nav = NavigationState::new();
        nav.open_folder("f1".into(), "Vacation");
        nav.open_folder("f2".into(), "Beach");

        assert_eq!(nav.to_string(), "root / Vacation / Beach");
    }
}
