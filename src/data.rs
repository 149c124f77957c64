use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct Restaurant {
    pub name: String,
    /// 0 to 5, in steps of 0.5
    pub rating: f64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub kakao_url: String,
    #[serde(default)]
    #[builder(default)]
    pub visited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option), default)]
    pub description: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub menus: Vec<Menu>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct Menu {
    pub name: String,
    #[serde(default)]
    #[builder(default)]
    pub rating: f64,
    #[serde(default)]
    #[builder(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option), default)]
    pub description: Option<String>,
}

/// The whole document as it lives on disk.
///
/// `restaurants` is `None` when the key is missing (or `null`), which is a
/// different state from an empty list: only the latter is a valid document.
/// `config` is never looked at, it is carried through loads and saves as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantData {
    #[serde(default)]
    pub restaurants: Option<Vec<Restaurant>>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl RestaurantData {
    /// A valid document with nothing in it.
    pub fn empty() -> Self {
        Self {
            restaurants: Some(Vec::new()),
            config: Map::new(),
        }
    }

    pub fn restaurants(&self) -> &[Restaurant] {
        self.restaurants.as_deref().unwrap_or_default()
    }

    pub fn restaurants_mut(&mut self) -> &mut Vec<Restaurant> {
        self.restaurants.get_or_insert_with(Vec::new)
    }
}

/// A batch of changes applied in one load-and-save pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub new: Vec<Restaurant>,
    #[serde(default)]
    pub update: Vec<Restaurant>,
    #[serde(default)]
    pub delete: Vec<String>,
}
