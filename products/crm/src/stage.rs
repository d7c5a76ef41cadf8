use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline phase a deal occupies. Declaration order is column order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Lead,
    Qualified,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl Stage {
    pub const COUNT: usize = 5;

    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Lead,
        Stage::Qualified,
        Stage::Negotiation,
        Stage::ClosedWon,
        Stage::ClosedLost,
    ];

    /// Wire key, also used as the drop-target id of the stage column.
    pub fn key(self) -> &'static str {
        match self {
            Stage::Lead => "LEAD",
            Stage::Qualified => "QUALIFIED",
            Stage::Negotiation => "NEGOTIATION",
            Stage::ClosedWon => "CLOSED_WON",
            Stage::ClosedLost => "CLOSED_LOST",
        }
    }

    /// Exact, case-sensitive key lookup.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.key() == key)
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Lead => "Lead",
            Stage::Qualified => "Qualified",
            Stage::Negotiation => "Negotiation",
            Stage::ClosedWon => "Closed Won",
            Stage::ClosedLost => "Closed Lost",
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Stage::ClosedWon | Stage::ClosedLost)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl From<entity::deal::Stage> for Stage {
    fn from(value: entity::deal::Stage) -> Self {
        match value {
            entity::deal::Stage::Lead => Stage::Lead,
            entity::deal::Stage::Qualified => Stage::Qualified,
            entity::deal::Stage::Negotiation => Stage::Negotiation,
            entity::deal::Stage::ClosedWon => Stage::ClosedWon,
            entity::deal::Stage::ClosedLost => Stage::ClosedLost,
        }
    }
}

impl From<Stage> for entity::deal::Stage {
    fn from(value: Stage) -> Self {
        match value {
            Stage::Lead => entity::deal::Stage::Lead,
            Stage::Qualified => entity::deal::Stage::Qualified,
            Stage::Negotiation => entity::deal::Stage::Negotiation,
            Stage::ClosedWon => entity::deal::Stage::ClosedWon,
            Stage::ClosedLost => entity::deal::Stage::ClosedLost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_lookup() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_key(stage.key()), Some(stage));
        }
    }

    #[test]
    fn key_lookup_is_exact() {
        assert_eq!(Stage::from_key("lead"), None);
        assert_eq!(Stage::from_key(" LEAD"), None);
        assert_eq!(Stage::from_key("WON"), None);
    }

    #[test]
    fn serde_uses_wire_keys() {
        let json = serde_json::to_string(&Stage::ClosedWon).unwrap();
        assert_eq!(json, "\"CLOSED_WON\"");
        let parsed: Stage = serde_json::from_str("\"NEGOTIATION\"").unwrap();
        assert_eq!(parsed, Stage::Negotiation);
    }

    #[test]
    fn only_won_and_lost_are_closed() {
        let closed: Vec<Stage> = Stage::ALL.into_iter().filter(|s| s.is_closed()).collect();
        assert_eq!(closed, vec![Stage::ClosedWon, Stage::ClosedLost]);
    }
}
