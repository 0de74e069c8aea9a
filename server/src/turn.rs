use minesweeper_common::models::Slot;

use crate::registry::{PeerAddr, PlayerRegistry};

/// Whose open-cell move is currently accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnCoordinator {
    active: Slot,
}

impl Default for TurnCoordinator {
    fn default() -> Self {
        Self { active: Slot::P1 }
    }
}

impl TurnCoordinator {
    pub fn active(&self) -> Slot {
        self.active
    }

    pub fn is_turn_of<S>(&self, registry: &PlayerRegistry<S>, addr: &PeerAddr) -> bool {
        registry
            .get(addr)
            .is_some_and(|p| p.is_online() && p.slot() == self.active)
    }

    /// Only called after an accepted move that left the board in progress.
    pub fn advance(&mut self) {
        self.active = self.active.other();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Connection;

    fn registry_with(addrs: &[&str]) -> PlayerRegistry<()> {
        let mut registry = PlayerRegistry::new();
        for a in addrs {
            assert!(registry.join(PeerAddr::new(*a), Connection::new(())).is_ok());
        }
        registry
    }

    #[test]
    fn starts_with_p1() {
        assert_eq!(TurnCoordinator::default().active(), Slot::P1);
    }

    #[test]
    fn is_turn_of_matches_slot_and_liveness() {
        let mut registry = registry_with(&["a:1", "b:1"]);
        let (a, b) = (PeerAddr::new("a:1"), PeerAddr::new("b:1"));
        let mut turn = TurnCoordinator::default();

        assert!(turn.is_turn_of(&registry, &a));
        assert!(!turn.is_turn_of(&registry, &b));

        turn.advance();
        assert!(!turn.is_turn_of(&registry, &a));
        assert!(turn.is_turn_of(&registry, &b));

        let id = registry
            .connection_mut(Slot::P2)
            .map(|c| c.id())
            .unwrap();
        registry.disconnect(&b, id);
        assert!(!turn.is_turn_of(&registry, &b));
    }

    #[test]
    fn unknown_address_never_has_the_turn() {
        let registry = registry_with(&["a:1"]);
        let turn = TurnCoordinator::default();
        assert!(!turn.is_turn_of(&registry, &PeerAddr::new("z:9")));
    }

    #[test]
    fn advance_alternates() {
        let mut turn = TurnCoordinator::default();
        turn.advance();
        turn.advance();
        assert_eq!(turn.active(), Slot::P1);
    }
}
