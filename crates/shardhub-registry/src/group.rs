//! Shard groups: named, ordered lists of world servers.

use shardhub_protocol::WorldId;

/// A named cluster of world servers, shown to clients as one entry of the
/// channel list.
///
/// Member order is insertion order and decides channel numbering: the
/// first server registered is channel 1. A group never exists with zero
/// members; the registry deletes it when the last one leaves.
#[derive(Debug, Clone)]
pub struct ShardGroup {
    name: String,
    members: Vec<WorldId>,
}

impl ShardGroup {
    /// Creates a group whose sole member is `first`.
    pub(crate) fn new(name: &str, first: WorldId) -> Self {
        Self {
            name: name.to_string(),
            members: vec![first],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member ids in channel order.
    pub fn members(&self) -> &[WorldId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &WorldId) -> bool {
        self.members.contains(id)
    }

    pub(crate) fn push(&mut self, id: WorldId) {
        self.members.push(id);
    }

    /// Removes `id`, keeping the order of the others. Returns `false` if
    /// it wasn't a member.
    pub(crate) fn remove(&mut self, id: &WorldId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| member != id);
        self.members.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_keeps_remaining_order() {
        let mut group = ShardGroup::new("Act1", WorldId(1));
        group.push(WorldId(2));
        group.push(WorldId(3));

        assert!(group.remove(&WorldId(2)));

        assert_eq!(group.members(), &[WorldId(1), WorldId(3)]);
    }

    #[test]
    fn test_remove_non_member_returns_false() {
        let mut group = ShardGroup::new("Act1", WorldId(1));

        assert!(!group.remove(&WorldId(9)));
        assert_eq!(group.len(), 1);
    }
}
