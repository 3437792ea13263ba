use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Head,
    Top,
    Bottom,
    Feet,
    Acc,
    Bag,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Head,
        Category::Top,
        Category::Bottom,
        Category::Feet,
        Category::Acc,
        Category::Bag,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Head => write!(f, "head"),
            Category::Top => write!(f, "top"),
            Category::Bottom => write!(f, "bottom"),
            Category::Feet => write!(f, "feet"),
            Category::Acc => write!(f, "acc"),
            Category::Bag => write!(f, "bag"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "head" => Ok(Category::Head),
            "top" => Ok(Category::Top),
            "bottom" => Ok(Category::Bottom),
            "feet" => Ok(Category::Feet),
            "acc" => Ok(Category::Acc),
            "bag" => Ok(Category::Bag),
            _ => Err(format!(
                "Invalid category '{}'. Valid options: head, top, bottom, feet, acc, bag",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(format!("{}", Category::Head), "head");
        assert_eq!(format!("{}", Category::Top), "top");
        assert_eq!(format!("{}", Category::Bag), "bag");
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(Category::from_str("top").unwrap(), Category::Top);
        assert_eq!(Category::from_str("FEET").unwrap(), Category::Feet);
        assert_eq!(Category::from_str("Acc").unwrap(), Category::Acc);
    }

    #[test]
    fn test_category_from_str_invalid() {
        assert!(Category::from_str("hat").is_err());
        assert!(Category::from_str("").is_err());
    }

    #[test]
    fn test_category_json_roundtrip() {
        let json = serde_json::to_string(&Category::Bottom).unwrap();
        assert_eq!(json, "\"bottom\"");

        let parsed: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Category::Bottom);
    }
}
