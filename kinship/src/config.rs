use crate::model::{Generation, Position};
use serde::{Deserialize, Serialize};

/// Geometry of the slot grid. Every row has the same number of slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub slots_per_row: u32,
    pub slot_width: f32,
    pub row_height: f32,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            slots_per_row: 32,
            slot_width: 120.0,
            row_height: 160.0,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }
}

impl GridConfig {
    pub fn center_slot(&self) -> u32 {
        self.slots_per_row / 2
    }

    pub fn contains(&self, slot: i64) -> bool {
        slot >= 0 && slot < self.slots_per_row as i64
    }

    /// Canvas position of a slot. Pure function of `(generation, slot)`.
    pub fn position(&self, generation: Generation, slot: u32) -> Position {
        Position {
            x: self.origin_x + slot as f32 * self.slot_width,
            y: self.origin_y + generation.value() as f32 * self.row_height,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// A parent must be at least this many whole years older than the child.
    pub min_parent_age_years: u32,
    /// Larger parent/child age gaps are reported as a non-blocking warning.
    pub max_parent_age_gap_years: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            min_parent_age_years: 16,
            max_parent_age_gap_years: 60,
        }
    }
}

/// Per-generation person caps, indexed from generation -2 to 2.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityLimits {
    pub per_generation: [u32; 5],
}

impl Default for CapacityLimits {
    fn default() -> Self {
        CapacityLimits {
            per_generation: [4, 8, 12, 16, 16],
        }
    }
}

impl CapacityLimits {
    pub fn max_for(&self, generation: Generation) -> u32 {
        self.per_generation[generation.index()]
    }

    pub fn ceiling(&self) -> u32 {
        self.per_generation.iter().sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub validation: ValidationConfig,
    pub capacity: CapacityLimits,
    /// Maximum number of undo entries kept; the oldest is dropped first.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            grid: GridConfig::default(),
            validation: ValidationConfig::default(),
            capacity: CapacityLimits::default(),
            history_limit: 100,
        }
    }
}

impl EngineConfig {
    /// Partial JSON objects are accepted; missing fields keep their defaults.
    pub fn from_json_value(v: serde_json::Value) -> Result<Self, String> {
        let cfg: EngineConfig = serde_json::from_value(v).map_err(|e| e.to_string())?;
        cfg.check()?;
        Ok(cfg)
    }

    pub fn check(&self) -> Result<(), String> {
        let g = &self.grid;
        if g.slots_per_row < 3 || g.slots_per_row > crate::limits::MAX_SLOTS_PER_ROW {
            return Err(format!("slots_per_row must be in 3..={}", crate::limits::MAX_SLOTS_PER_ROW));
        }
        for (name, v) in [
            ("slot_width", g.slot_width),
            ("row_height", g.row_height),
            ("origin_x", g.origin_x),
            ("origin_y", g.origin_y),
        ] {
            if !v.is_finite() {
                return Err(format!("{} must be finite", name));
            }
        }
        if self.capacity.max_for(Generation::OWNER) == 0 {
            return Err("generation 0 must allow at least the root person".to_string());
        }
        if self.history_limit == 0 {
            return Err("history_limit must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg = EngineConfig::from_json_value(json!({"grid": {"slots_per_row": 12}})).unwrap();
        assert_eq!(cfg.grid.slots_per_row, 12);
        assert_eq!(cfg.grid.slot_width, 120.0);
        assert_eq!(cfg.validation.min_parent_age_years, 16);
        assert_eq!(cfg.capacity.ceiling(), 56);
    }

    #[test]
    fn rejects_tiny_grid() {
        assert!(EngineConfig::from_json_value(json!({"grid": {"slots_per_row": 2}})).is_err());
    }

    #[test]
    fn position_is_function_of_slot() {
        let g = GridConfig::default();
        let p = g.position(Generation::new(-1).unwrap(), 3);
        assert_eq!(p.x, 360.0);
        assert_eq!(p.y, -160.0);
    }
}
