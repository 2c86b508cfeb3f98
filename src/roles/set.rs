use std::fmt;

use super::Role;

/// Copyable set of [`Role`]s backed by a bitmask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

impl RoleSet {
    /// Empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set containing every role.
    pub const fn all() -> Self {
        Self(0b111)
    }

    /// Returns true if `role` is in the set.
    pub const fn contains(self, role: Role) -> bool {
        self.0 & Self::bit(role) != 0
    }

    /// Adds `role`; returns true if it was not present.
    pub fn insert(&mut self, role: Role) -> bool {
        let was = self.contains(role);
        self.0 |= Self::bit(role);
        !was
    }

    /// Removes `role`; returns true if it was present.
    pub fn remove(&mut self, role: Role) -> bool {
        let was = self.contains(role);
        self.0 &= !Self::bit(role);
        was
    }

    /// Returns true if the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of roles in the set.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates members in dependency order.
    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }

    const fn bit(role: Role) -> u8 {
        1 << role.index()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = Self::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut set = RoleSet::empty();
        assert!(set.insert(Role::Web));
        assert!(!set.insert(Role::Web));
        assert!(set.contains(Role::Web));
        assert!(!set.contains(Role::Search));
        assert_eq!(set.len(), 1);
        assert!(set.remove(Role::Web));
        assert!(set.is_empty());
    }

    #[test]
    fn test_iter_follows_dependency_order() {
        let set: RoleSet = [Role::TaskProcessor, Role::Search].into_iter().collect();
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Role::Search, Role::TaskProcessor]
        );
        assert_eq!(RoleSet::all().len(), 3);
    }
}
