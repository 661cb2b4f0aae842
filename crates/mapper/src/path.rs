//! # Column paths
//!
//! Splits column names on the path separator and groups them by nesting level. A column
//! `Category$CategoryName` is the leaf `CategoryName` of the group `Category` at depth 1; a
//! column without a separator is a leaf of the root group.

use std::collections::BTreeMap;

/// The default path separator.
pub const SEPARATOR: &str = "$";

/// Columns sharing one parent path and group name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    /// Nesting depth; the root group is 0.
    pub depth: usize,
    /// Path of the enclosing group; empty for the root and its direct children.
    pub parent: String,
    /// Group name; empty for the root.
    pub name: String,
    /// Leaf names keyed by column ordinal.
    pub columns: BTreeMap<usize, String>,
}

impl Group {
    /// Full path of the group, used to find its children.
    #[must_use]
    pub fn path(&self, separator: &str) -> String {
        if self.parent.is_empty() {
            self.name.clone()
        } else {
            format!("{}{separator}{}", self.parent, self.name)
        }
    }
}

/// Column groups of one row shape, ordered by (depth, parent, name).
#[derive(Debug, Clone)]
pub struct Groups {
    separator: String,
    groups: BTreeMap<(usize, String, String), Group>,
}

impl Groups {
    /// Groups `names` (in ordinal order). Missing intermediate groups and the root are always
    /// present, possibly with no columns.
    #[must_use]
    pub fn parse<'a>(names: impl IntoIterator<Item = &'a str>, separator: &str) -> Self {
        let mut groups = BTreeMap::new();
        groups.insert((0, String::new(), String::new()), Group::default());

        for (ordinal, name) in names.into_iter().enumerate() {
            let segments: Vec<&str> = name.split(separator).collect();
            let Some((leaf, path)) = segments.split_last() else {
                continue;
            };

            // every prefix of the path is a group, so nothing nested is dropped
            for depth in 1..=path.len() {
                let key = (depth, path[..depth - 1].join(separator), path[depth - 1].to_string());
                groups.entry(key).or_insert_with_key(|(depth, parent, name)| Group {
                    depth: *depth,
                    parent: parent.clone(),
                    name: name.clone(),
                    columns: BTreeMap::new(),
                });
            }

            let key = match path.split_last() {
                Some((group, parent)) => (path.len(), parent.join(separator), (*group).to_string()),
                None => (0, String::new(), String::new()),
            };
            if let Some(group) = groups.get_mut(&key) {
                group.columns.insert(ordinal, (*leaf).to_string());
            }
        }

        Self {
            separator: separator.to_string(),
            groups,
        }
    }

    /// The root group.
    #[must_use]
    pub fn root(&self) -> Option<&Group> {
        self.groups.get(&(0, String::new(), String::new()))
    }

    /// Groups one level below `group`, in (parent, name) order.
    pub fn children<'a>(&'a self, group: &Group) -> impl Iterator<Item = &'a Group> + 'a {
        let depth = group.depth + 1;
        let path = group.path(&self.separator);
        self.groups.values().filter(move |g| g.depth == depth && g.parent == path)
    }

    /// All groups in visiting order.
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }
}

/// The constructor-parameter position a name denotes, if it is made only of ASCII digits.
#[must_use]
pub fn parameter_index(name: &str) -> Option<usize> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_columns_belong_to_root() {
        let groups = Groups::parse(["ProductID", "ProductName"], SEPARATOR);
        let root = groups.root().unwrap();

        assert_eq!(root.depth, 0);
        assert_eq!(root.columns.len(), 2);
        assert_eq!(root.columns[&1], "ProductName");
        assert_eq!(groups.children(root).count(), 0);
    }

    #[test]
    fn nested_columns_share_a_group() {
        let groups = Groups::parse(
            ["ProductID", "Category$CategoryID", "Category$CategoryName", "Supplier$Address$City"],
            SEPARATOR,
        );
        let root = groups.root().unwrap();
        let children: Vec<_> = groups.children(root).map(|g| g.name.as_str()).collect();
        assert_eq!(children, ["Category", "Supplier"]);

        let category = groups.children(root).next().unwrap();
        assert_eq!(category.columns.keys().copied().collect::<Vec<_>>(), [1, 2]);

        // the intermediate group exists even without columns of its own
        let supplier = groups.children(root).nth(1).unwrap();
        assert!(supplier.columns.is_empty());

        let address: Vec<_> = groups.children(supplier).collect();
        assert_eq!(address.len(), 1);
        assert_eq!(address[0].depth, 2);
        assert_eq!(address[0].parent, "Supplier");
        assert_eq!(address[0].path(SEPARATOR), "Supplier$Address");
        assert_eq!(address[0].columns[&3], "City");
    }

    #[test]
    fn visiting_order() {
        let groups = Groups::parse(["b$x", "a$y$z", "a$x", "c"], SEPARATOR);
        let order: Vec<_> =
            groups.iter().map(|g| (g.depth, g.parent.as_str(), g.name.as_str())).collect();
        assert_eq!(order, [(0, "", ""), (1, "", "a"), (1, "", "b"), (2, "a", "y")]);
    }

    #[test]
    fn custom_separator() {
        let groups = Groups::parse(["Category__CategoryID"], "__");
        let root = groups.root().unwrap();
        let category = groups.children(root).next().unwrap();
        assert_eq!(category.name, "Category");
        assert_eq!(category.columns[&0], "CategoryID");
    }

    #[test]
    fn parameter_positions() {
        assert_eq!(parameter_index("0"), Some(0));
        assert_eq!(parameter_index("12"), Some(12));
        assert_eq!(parameter_index(""), None);
        assert_eq!(parameter_index("-1"), None);
        assert_eq!(parameter_index("+1"), None);
        assert_eq!(parameter_index("1a"), None);
    }
}
