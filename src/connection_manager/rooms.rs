use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::stats::RoomInfo;
use super::types::{ConnectionHandle, RegistryError, RoomId};

/// A room member: the connection plus the name it joined under
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub handle: Arc<ConnectionHandle>,
}

impl Member {
    pub fn new(name: impl Into<String>, handle: Arc<ConnectionHandle>) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }
}

/// Process-wide mapping from room id to its members in join order.
///
/// Each room's member list is mutated under its DashMap shard lock, so joins
/// and leaves on one room are serialized without blocking unrelated rooms.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Vec<Member>>,
    prune_empty: bool,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_pruning(true)
    }

    /// `prune_empty` drops a room as soon as its last member leaves
    pub fn with_pruning(prune_empty: bool) -> Self {
        Self {
            rooms: DashMap::new(),
            prune_empty,
        }
    }

    /// Create `room` with `creator` as its only member
    pub fn create(&self, room: &RoomId, creator: Member) -> Result<(), RegistryError> {
        match self.rooms.entry(room.clone()) {
            Entry::Occupied(_) => Err(RegistryError::RoomExists(room.clone())),
            Entry::Vacant(slot) => {
                tracing::info!(room = %room, name = %creator.name, "Room created");
                slot.insert(vec![creator]);
                Ok(())
            }
        }
    }

    /// Append `member` to `room`, returning everyone who was already there.
    ///
    /// The snapshot and the append happen under the same lock, so two
    /// concurrent joiners each see the other exactly once between them.
    pub fn join(&self, room: &RoomId, member: Member) -> Result<Vec<Member>, RegistryError> {
        let mut members = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| RegistryError::RoomNotFound(room.clone()))?;

        if members.iter().any(|m| m.handle.id == member.handle.id) {
            return Err(RegistryError::AlreadyMember(room.clone()));
        }

        let existing = members.value().clone();
        tracing::info!(
            room = %room,
            name = %member.name,
            existing_members = existing.len(),
            "Member joined room"
        );
        members.push(member);

        Ok(existing)
    }

    /// Remove `handle` from `room`. Removing a non-member is a no-op.
    pub fn leave(&self, room: &RoomId, handle: &ConnectionHandle) {
        let now_empty = match self.rooms.get_mut(room) {
            Some(mut members) => {
                let before = members.len();
                members.retain(|m| m.handle.id != handle.id);
                if members.len() < before {
                    tracing::info!(room = %room, connection_id = %handle.id, "Member left room");
                }
                members.is_empty()
            }
            None => false,
        };

        if now_empty && self.prune_empty {
            // Re-checked under the lock: a join may have raced in.
            if self
                .rooms
                .remove_if(room, |_, members| members.is_empty())
                .is_some()
            {
                tracing::debug!(room = %room, "Empty room removed");
            }
        }
    }

    /// Members of `room` in join order
    pub fn members(&self, room: &RoomId) -> Option<Vec<Member>> {
        self.rooms.get(room).map(|m| m.value().clone())
    }

    pub fn contains(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn room_info(&self, room: &RoomId) -> Option<RoomInfo> {
        self.rooms.get(room).map(|members| RoomInfo::new(room, &members))
    }

    /// All rooms, sorted by id
    pub fn list(&self) -> Vec<RoomInfo> {
        let mut rooms: Vec<RoomInfo> = self
            .rooms
            .iter()
            .map(|entry| RoomInfo::new(entry.key(), entry.value()))
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use tokio::sync::mpsc;

    fn member(name: &str) -> Member {
        let (tx, _rx) = mpsc::unbounded_channel();
        Member::new(name, Arc::new(ConnectionHandle::new(tx)))
    }

    fn names(members: &[Member]) -> Vec<&str> {
        members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_create_makes_creator_sole_member() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("r1");

        rooms.create(&room, member("alice")).unwrap();

        let members = rooms.members(&room).unwrap();
        assert_eq!(names(&members), vec!["alice"]);
    }

    #[test]
    fn test_duplicate_create_leaves_membership_unchanged() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("r1");
        rooms.create(&room, member("alice")).unwrap();

        let result = rooms.create(&room, member("mallory"));

        assert_eq!(result, Err(RegistryError::RoomExists(room.clone())));
        assert_eq!(names(&rooms.members(&room).unwrap()), vec!["alice"]);
    }

    #[test]
    fn test_join_returns_prior_members_in_order() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("r1");
        rooms.create(&room, member("alice")).unwrap();

        let before_bob = rooms.join(&room, member("bob")).unwrap();
        let before_carol = rooms.join(&room, member("carol")).unwrap();

        assert_eq!(names(&before_bob), vec!["alice"]);
        assert_eq!(names(&before_carol), vec!["alice", "bob"]);
        assert_eq!(
            names(&rooms.members(&room).unwrap()),
            vec!["alice", "bob", "carol"]
        );
    }

    #[test]
    fn test_join_missing_room_creates_nothing() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("nowhere");

        let result = rooms.join(&room, member("bob"));

        assert_eq!(result.unwrap_err(), RegistryError::RoomNotFound(room.clone()));
        assert!(!rooms.contains(&room));
        assert!(rooms.is_empty());
    }

    #[test]
    fn test_join_twice_is_rejected() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("r1");
        let alice = member("alice");
        rooms.create(&room, alice.clone()).unwrap();

        let result = rooms.join(&room, alice);

        assert_eq!(result.unwrap_err(), RegistryError::AlreadyMember(room.clone()));
        assert_eq!(rooms.members(&room).unwrap().len(), 1);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("r1");
        let alice = member("alice");
        let bob = member("bob");
        rooms.create(&room, alice.clone()).unwrap();
        rooms.join(&room, bob.clone()).unwrap();

        rooms.leave(&room, &bob.handle);
        rooms.leave(&room, &bob.handle);

        assert_eq!(names(&rooms.members(&room).unwrap()), vec!["alice"]);
    }

    #[test]
    fn test_last_leave_prunes_room() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("r1");
        let alice = member("alice");
        rooms.create(&room, alice.clone()).unwrap();

        rooms.leave(&room, &alice.handle);

        assert!(!rooms.contains(&room));
        assert!(rooms.create(&room, member("bob")).is_ok());
    }

    #[test]
    fn test_last_leave_keeps_room_without_pruning() {
        let rooms = RoomRegistry::with_pruning(false);
        let room = RoomId::from("r1");
        let alice = member("alice");
        rooms.create(&room, alice.clone()).unwrap();

        rooms.leave(&room, &alice.handle);

        assert!(rooms.members(&room).unwrap().is_empty());
        assert!(rooms.create(&room, member("bob")).is_err());
    }

    #[test]
    fn test_list_reports_members() {
        let rooms = RoomRegistry::new();
        rooms.create(&RoomId::from("b"), member("bob")).unwrap();
        rooms.create(&RoomId::from("a"), member("alice")).unwrap();
        rooms.join(&RoomId::from("a"), member("carol")).unwrap();

        let list = rooms.list();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, RoomId::from("a"));
        assert_eq!(list[0].member_names(), vec!["alice", "carol"]);
        assert_eq!(list[0].member_count, 2);
        assert_eq!(list[1].id, RoomId::from("b"));
    }

    #[test]
    fn test_room_info_carries_connection_time() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("r1");
        let alice = member("alice");
        let bob = member("bob");
        rooms.create(&room, alice.clone()).unwrap();
        rooms.join(&room, bob.clone()).unwrap();

        let info = rooms.room_info(&room).unwrap();

        assert_eq!(info.members[0].connected_at, alice.handle.connected_at);
        assert_eq!(info.members[1].connected_at, bob.handle.connected_at);
        assert!(info.members[0].connected_at <= info.members[1].connected_at);
    }

    #[test]
    fn test_concurrent_create_single_winner() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("contested");
        let attempts = 16;
        let barrier = Barrier::new(attempts);

        let outcomes: Vec<Result<(), RegistryError>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..attempts)
                .map(|i| {
                    let rooms = &rooms;
                    let room = &room;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        let creator = member(&format!("peer-{}", i));
                        barrier.wait();
                        rooms.create(room, creator)
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::RoomExists(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, attempts - 1);
        assert_eq!(rooms.members(&room).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_join_sees_every_member_once() {
        let rooms = RoomRegistry::new();
        let room = RoomId::from("busy");
        rooms.create(&room, member("host")).unwrap();
        let joiners = 12;
        let barrier = Barrier::new(joiners);

        let seen: Vec<usize> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..joiners)
                .map(|i| {
                    let rooms = &rooms;
                    let room = &room;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        let joiner = member(&format!("peer-{}", i));
                        barrier.wait();
                        rooms.join(room, joiner).unwrap().len()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let mut seen = seen;
        seen.sort();
        // Joins are serialized: the k-th joiner saw the host plus k-1 others.
        assert_eq!(seen, (1..=joiners).collect::<Vec<_>>());
        assert_eq!(rooms.members(&room).unwrap().len(), joiners + 1);
    }
}
