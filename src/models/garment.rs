use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::category::Category;

/// A single garment owned by one user.
///
/// `image_ref` is either a remote URL or a `pending:` marker for an image
/// that has not been uploaded yet. Garments are immutable once synced,
/// except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Garment {
    pub id: Uuid,
    pub owner_id: String,
    pub category: Category,
    pub sub_category: String,
    pub image_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Garment {
    pub fn new(
        owner_id: impl Into<String>,
        category: Category,
        sub_category: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            category,
            sub_category: sub_category.into(),
            image_ref: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }
}

impl fmt::Display for Garment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.sub_category, self.category)?;
        if !self.image_ref.is_empty() {
            write!(f, " [{}]", self.image_ref)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garment_new() {
        let garment = Garment::new("user1", Category::Top, "t-shirt");

        assert_eq!(garment.owner_id, "user1");
        assert_eq!(garment.category, Category::Top);
        assert_eq!(garment.sub_category, "t-shirt");
        assert!(garment.image_ref.is_empty());
    }

    #[test]
    fn test_garment_with_image_ref() {
        let garment = Garment::new("user1", Category::Feet, "sneakers")
            .with_image_ref("https://img.example.com/abc.png");

        assert_eq!(garment.image_ref, "https://img.example.com/abc.png");
    }

    #[test]
    fn test_garment_json_roundtrip() {
        let garment = Garment::new("user1", Category::Bag, "tote");

        let json = serde_json::to_string(&garment).unwrap();
        let parsed: Garment = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, garment.id);
        assert_eq!(parsed.category, garment.category);
        assert_eq!(parsed.sub_category, garment.sub_category);
    }
}
