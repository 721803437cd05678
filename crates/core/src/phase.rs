//! Auction lifecycle phases
//!
//! Replaces scattered boolean flags with one state value whose transitions
//! are validated. `InsufficientProceeds` and `EarlyExit` are sticky: once
//! entered, the only way forward is migration (early exit only).

use serde::{Deserialize, Serialize};

use crate::error::{AuctionError, AuctionResult};

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionPhase {
    /// Created but not yet bound to a pool
    #[default]
    Uninitialized,

    /// Selling on schedule
    Active,

    /// Matured below minimum proceeds; only asset sales back into the refund slug
    InsufficientProceeds,

    /// Maximum proceeds reached; trading closed
    EarlyExit,

    /// Liquidity handed to the migrator's recipient
    Migrated { early_exit: bool },
}

impl AuctionPhase {
    pub fn is_initialized(&self) -> bool {
        !matches!(self, AuctionPhase::Uninitialized)
    }

    /// Sticky early-exit flag, preserved through migration
    pub fn is_early_exit(&self) -> bool {
        matches!(
            self,
            AuctionPhase::EarlyExit | AuctionPhase::Migrated { early_exit: true }
        )
    }

    /// Sticky insufficient-proceeds flag
    pub fn is_insufficient_proceeds(&self) -> bool {
        matches!(self, AuctionPhase::InsufficientProceeds)
    }

    pub fn is_migrated(&self) -> bool {
        matches!(self, AuctionPhase::Migrated { .. })
    }

    /// Validate phase transition
    pub fn can_transition_to(&self, new_phase: AuctionPhase) -> bool {
        match (self, new_phase) {
            (AuctionPhase::Uninitialized, AuctionPhase::Active) => true,

            // Terminal trading modes
            (AuctionPhase::Active, AuctionPhase::InsufficientProceeds) => true,
            (AuctionPhase::Active, AuctionPhase::EarlyExit) => true,

            // Settlement
            (AuctionPhase::Active, AuctionPhase::Migrated { early_exit: false }) => true,
            (AuctionPhase::EarlyExit, AuctionPhase::Migrated { early_exit: true }) => true,

            _ => false,
        }
    }

    /// Move to `new_phase`, rejecting edges the lifecycle does not allow
    pub fn transition(&mut self, new_phase: AuctionPhase) -> AuctionResult<()> {
        if !self.can_transition_to(new_phase) {
            return Err(AuctionError::InvalidPhaseTransition {
                from: *self,
                to: new_phase,
            });
        }
        *self = new_phase;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AuctionPhase; 6] = [
        AuctionPhase::Uninitialized,
        AuctionPhase::Active,
        AuctionPhase::InsufficientProceeds,
        AuctionPhase::EarlyExit,
        AuctionPhase::Migrated { early_exit: false },
        AuctionPhase::Migrated { early_exit: true },
    ];

    #[test]
    fn test_happy_paths() {
        let mut phase = AuctionPhase::default();
        phase.transition(AuctionPhase::Active).unwrap();
        phase.transition(AuctionPhase::EarlyExit).unwrap();
        phase.transition(AuctionPhase::Migrated { early_exit: true }).unwrap();
        assert!(phase.is_early_exit());
        assert!(phase.is_migrated());

        let mut matured = AuctionPhase::Active;
        matured
            .transition(AuctionPhase::Migrated { early_exit: false })
            .unwrap();
        assert!(!matured.is_early_exit());
    }

    #[test]
    fn test_sticky_flags_never_unset() {
        for sticky in [AuctionPhase::InsufficientProceeds, AuctionPhase::EarlyExit] {
            for target in ALL {
                if sticky.can_transition_to(target) {
                    assert!(matches!(target, AuctionPhase::Migrated { early_exit: true }));
                    assert_eq!(sticky, AuctionPhase::EarlyExit);
                }
            }
        }
    }

    #[test]
    fn test_migrated_is_final() {
        for from in [
            AuctionPhase::Migrated { early_exit: false },
            AuctionPhase::Migrated { early_exit: true },
        ] {
            for to in ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_rejected_transition_leaves_phase() {
        let mut phase = AuctionPhase::InsufficientProceeds;
        let err = phase.transition(AuctionPhase::Active).unwrap_err();
        assert_eq!(
            err,
            AuctionError::InvalidPhaseTransition {
                from: AuctionPhase::InsufficientProceeds,
                to: AuctionPhase::Active,
            }
        );
        assert!(phase.is_insufficient_proceeds());
    }
}
