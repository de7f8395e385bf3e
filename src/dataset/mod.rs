//! Dataset layout, split labels and membership manifests

pub mod layout;
pub mod membership;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use layout::{list_subdirs, resolve_data_root, DatasetLayout};
pub use membership::Membership;

/// Destination split of a minor-index directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Test,
    Train,
    Other,
}

impl Split {
    /// Every split, in the order they are processed
    pub const ALL: [Split; 3] = [Split::Test, Split::Train, Split::Other];

    /// Directory name used for this split
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Test => "test",
            Split::Train => "train",
            Split::Other => "other",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_names() {
        let names: Vec<&str> = Split::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["test", "train", "other"]);
        assert_eq!(Split::Train.to_string(), "train");
    }
}
