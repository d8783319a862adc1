//! Notification categories observers subscribe to.

use std::fmt;
use std::str::FromStr;

use crate::state_manager::StateError;

/// One of the fixed notification channels of the state store.
///
/// The declaration order is also the order in which categories are notified
/// when a single update touches several of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Category {
    /// Every successful update.
    #[default]
    Global,
    /// Runtime flags: running, fullscreen, transitioning.
    AppState,
    /// The active theme or the active theme's config.
    Theme,
    /// Any theme config.
    ThemeConfigs,
    /// Audio configuration.
    Audio,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Global,
        Category::AppState,
        Category::Theme,
        Category::ThemeConfigs,
        Category::Audio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Global => "global",
            Category::AppState => "appState",
            Category::Theme => "theme",
            Category::ThemeConfigs => "themeConfigs",
            Category::Audio => "audio",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| StateError::UnknownCategory(s.to_string()))
    }
}

/// Set of categories implicated by one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategorySet(u8);

impl CategorySet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, category: Category) {
        self.0 |= category.bit();
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Categories in notification order.
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = CategorySet::new();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.name().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "visuals".parse::<Category>().unwrap_err();
        assert!(matches!(err, StateError::UnknownCategory(ref name) if name == "visuals"));
    }

    #[test]
    fn test_set_iterates_in_notification_order() {
        let set: CategorySet = [Category::Audio, Category::Global, Category::Theme]
            .into_iter()
            .collect();
        let order: Vec<_> = set.iter().collect();
        assert_eq!(order, vec![Category::Global, Category::Theme, Category::Audio]);
        assert_eq!(set.len(), 3);
        assert!(!set.contains(Category::AppState));
    }
}
