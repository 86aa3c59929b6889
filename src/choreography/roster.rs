//! Identity-to-role resolution for the formation.
//!
//! Roles differ only in their approach velocity vector; durations are shared.
//! The mapping is configuration data loaded at startup, not code.

use std::collections::HashMap;

use crate::config::RosterConfig;

/// A resolved role in the formation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleProfile {
    /// Velocity vector applied during the approach phase, m/s
    pub approach_velocity: [f32; 2],
}

impl RoleProfile {
    /// Mirrored translation used when the formation breaks up.
    pub fn retreat_velocity(&self) -> [f32; 2] {
        [-self.approach_velocity[0], -self.approach_velocity[1]]
    }
}

/// Fixed roster of known agent identities.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: HashMap<String, RoleProfile>,
}

impl Roster {
    pub fn from_config(config: &RosterConfig) -> Self {
        let members = config
            .members
            .iter()
            .map(|m| {
                (
                    m.id.clone(),
                    RoleProfile {
                        approach_velocity: m.approach,
                    },
                )
            })
            .collect();
        Self { members }
    }

    /// Resolve an identity to its role. Unrecognized identities get no role;
    /// the caller skips the sequence with a warning.
    pub fn resolve(&self, id: &str) -> Option<RoleProfile> {
        self.members.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterMember;

    fn reference_roster() -> Roster {
        Roster::from_config(&RosterConfig {
            members: vec![
                RosterMember {
                    id: "605".to_string(),
                    approach: [0.0, 0.0],
                },
                RosterMember {
                    id: "699".to_string(),
                    approach: [0.134, -0.268],
                },
                RosterMember {
                    id: "814".to_string(),
                    approach: [0.399, 0.265],
                },
            ],
        })
    }

    #[test]
    fn test_known_identities_resolve() {
        let roster = reference_roster();
        assert_eq!(roster.resolve("605").unwrap().approach_velocity, [0.0, 0.0]);
        assert_eq!(
            roster.resolve("699").unwrap().approach_velocity,
            [0.134, -0.268]
        );
        assert_eq!(
            roster.resolve("814").unwrap().approach_velocity,
            [0.399, 0.265]
        );
    }

    #[test]
    fn test_unknown_identity_has_no_role() {
        let roster = reference_roster();
        assert!(roster.resolve("514").is_none());
        assert!(roster.resolve("").is_none());
    }

    #[test]
    fn test_retreat_mirrors_approach() {
        let roster = reference_roster();
        let role = roster.resolve("699").unwrap();
        assert_eq!(role.retreat_velocity(), [-0.134, 0.268]);
    }
}
