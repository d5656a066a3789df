//! Entity identity: team, colour and glyph.
//!
//! Resolution is a pure function of the entity id and the team context, so
//! every observer renders the same colour and symbol for the same player
//! without exchanging anything beyond what is already replicated.

use serde::{Deserialize, Serialize};

use crate::math::polynomial_hash;

/// 24-bit RGB colour, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u32);

impl Rgb {
    /// Colour used for every opponent in free-for-all.
    pub const HOSTILE: Rgb = Rgb(0xE5_39_35);
    /// Team 0.
    pub const TEAM_0: Rgb = Rgb(0x42_A5_F5);
    /// Team 1.
    pub const TEAM_1: Rgb = Rgb(0xFF_A7_26);
    /// Missing or unknown team.
    pub const NEUTRAL: Rgb = Rgb(0x9E_9E_9E);

    /// Components as floats in [0, 1].
    pub fn to_linear_f32(self) -> [f32; 3] {
        [
            ((self.0 >> 16) & 0xFF) as f32 / 255.0,
            ((self.0 >> 8) & 0xFF) as f32 / 255.0,
            (self.0 & 0xFF) as f32 / 255.0,
        ]
    }
}

/// Glyph palette. The index is `hash(id) % len`.
pub const SYMBOL_PALETTE: [char; 8] = ['▲', '●', '■', '◆', '★', '✚', '⬢', '✦'];

/// How teams relate to each other this match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Teams,
    FreeForAll,
}

impl GameMode {
    pub fn is_ffa(self) -> bool {
        matches!(self, GameMode::FreeForAll)
    }
}

/// Extra team definitions beyond the two fixed teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: u32,
    pub name: String,
    pub color: Rgb,
}

/// Lookup for teams with id >= 2.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamRegistry {
    teams: Vec<TeamInfo>,
}

impl TeamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a team definition.
    pub fn insert(&mut self, info: TeamInfo) {
        match self.teams.iter_mut().find(|t| t.id == info.id) {
            Some(existing) => *existing = info,
            None => self.teams.push(info),
        }
    }

    pub fn get(&self, id: u32) -> Option<&TeamInfo> {
        self.teams.iter().find(|t| t.id == id)
    }
}

/// Resolved identity for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub team_id: u32,
    pub color: Rgb,
    pub symbol: char,
}

/// Glyph for an id.
pub fn symbol_for(id: &str) -> char {
    SYMBOL_PALETTE[polynomial_hash(id) as usize % SYMBOL_PALETTE.len()]
}

/// Resolve `(id, team?, mode)` into a team id, colour and glyph.
///
/// An absent team becomes team 0 for bookkeeping but is drawn in the
/// neutral colour, since nothing was actually replicated for it.
pub fn resolve(id: &str, team_id: Option<u32>, mode: GameMode, teams: &TeamRegistry) -> Identity {
    let symbol = symbol_for(id);

    let color = if mode.is_ffa() {
        Rgb::HOSTILE
    } else {
        match team_id {
            Some(0) => Rgb::TEAM_0,
            Some(1) => Rgb::TEAM_1,
            Some(other) => teams.get(other).map_or(Rgb::NEUTRAL, |t| t.color),
            None => Rgb::NEUTRAL,
        }
    };

    Identity {
        team_id: team_id.unwrap_or(0),
        color,
        symbol,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_colors() {
        let teams = TeamRegistry::new();
        assert_eq!(resolve("p1", Some(0), GameMode::Teams, &teams).color, Rgb::TEAM_0);
        assert_eq!(resolve("p1", Some(1), GameMode::Teams, &teams).color, Rgb::TEAM_1);
        assert_eq!(resolve("p1", Some(5), GameMode::Teams, &teams).color, Rgb::NEUTRAL);
    }

    #[test]
    fn test_registered_team_lookup() {
        let mut teams = TeamRegistry::new();
        teams.insert(TeamInfo {
            id: 3,
            name: "Green".into(),
            color: Rgb(0x00FF00),
        });
        let id = resolve("p1", Some(3), GameMode::Teams, &teams);
        assert_eq!(id.color, Rgb(0x00FF00));
        assert_eq!(id.team_id, 3);
    }

    #[test]
    fn test_ffa_ignores_team() {
        let teams = TeamRegistry::new();
        for team in [None, Some(0), Some(1), Some(9)] {
            assert_eq!(resolve("p1", team, GameMode::FreeForAll, &teams).color, Rgb::HOSTILE);
        }
    }

    #[test]
    fn test_missing_team_is_neutral_team_zero() {
        let id = resolve("p1", None, GameMode::Teams, &TeamRegistry::new());
        assert_eq!(id.team_id, 0);
        assert_eq!(id.color, Rgb::NEUTRAL);
    }

    #[test]
    fn test_symbol_deterministic() {
        let teams = TeamRegistry::new();
        let a = resolve("observer-42", Some(1), GameMode::Teams, &teams);
        for _ in 0..50 {
            assert_eq!(resolve("observer-42", Some(1), GameMode::Teams, &teams), a);
        }
        // Symbol does not depend on team context.
        assert_eq!(
            resolve("observer-42", None, GameMode::FreeForAll, &teams).symbol,
            a.symbol
        );
        assert!(SYMBOL_PALETTE.contains(&a.symbol));
    }
}
