use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One garment's placement within an outfit canvas.
///
/// Positions are percentage coordinates in [0, 100] and always equal one of
/// the garment category's candidate slots. Layers have no existence outside
/// their owning outfit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitLayer {
    pub garment_id: Uuid,
    pub z_index: i32,
    pub position_x: f64,
    pub position_y: f64,
    pub scale: f64,
    pub rotation: f64,
}

impl OutfitLayer {
    pub fn new(garment_id: Uuid, z_index: i32, position_x: f64, position_y: f64) -> Self {
        Self {
            garment_id,
            z_index,
            position_x,
            position_y,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

/// A dated, layered outfit composition. Exactly one outfit exists per
/// (owner, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outfit {
    pub id: Uuid,
    pub owner_id: String,
    pub date_worn: NaiveDate,
    pub layers: Vec<OutfitLayer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Outfit {
    pub fn new(owner_id: impl Into<String>, date_worn: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            date_worn,
            layers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_layers(mut self, layers: Vec<OutfitLayer>) -> Self {
        self.layers = layers;
        self
    }

    /// Highest z-index currently in use, or 0 for an empty canvas.
    pub fn max_z_index(&self) -> i32 {
        self.layers.iter().map(|l| l.z_index).max().unwrap_or(0)
    }
}

impl fmt::Display for Outfit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Outfit for {}", self.date_worn)?;
        writeln!(f, "Layers: {}", self.layers.len())?;
        for layer in &self.layers {
            writeln!(
                f,
                "  - {} at ({:.0}, {:.0}) z={}",
                layer.garment_id, layer.position_x, layer.position_y, layer.z_index
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outfit_new() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let outfit = Outfit::new("user1", date);

        assert_eq!(outfit.owner_id, "user1");
        assert_eq!(outfit.date_worn, date);
        assert!(outfit.layers.is_empty());
        assert_eq!(outfit.max_z_index(), 0);
    }

    #[test]
    fn test_max_z_index() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let outfit = Outfit::new("user1", date).with_layers(vec![
            OutfitLayer::new(Uuid::new_v4(), 2, 50.0, 30.0),
            OutfitLayer::new(Uuid::new_v4(), 5, 28.0, 32.0),
        ]);

        assert_eq!(outfit.max_z_index(), 5);
    }

    #[test]
    fn test_outfit_json_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let outfit = Outfit::new("user1", date)
            .with_layers(vec![OutfitLayer::new(Uuid::new_v4(), 1, 50.0, 8.0)]);

        let json = serde_json::to_string(&outfit).unwrap();
        let parsed: Outfit = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, outfit.id);
        assert_eq!(parsed.date_worn, outfit.date_worn);
        assert_eq!(parsed.layers, outfit.layers);
    }
}
