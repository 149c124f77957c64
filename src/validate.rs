//! Structural checks run before anything is written to the data file.
//!
//! Every check stops at the first problem it finds. Errors found inside a
//! nested list are wrapped with the position of the offending element.

use std::collections::HashSet;

use thiserror::Error;

use crate::data::{Menu, Restaurant, RestaurantData};

pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    EmptyField { field: &'static str },
    #[error("{field} must be between 0 and 5, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be a multiple of 0.5, got {value}")]
    InvalidStep { field: &'static str, value: f64 },
    #[error("{field} needs at least one entry")]
    EmptyCollection { field: &'static str },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} field is missing")]
    MissingCollection { field: &'static str },
    #[error("restaurant name {name:?} is already used at index {first}")]
    DuplicateName { name: String, first: usize },
    #[error("menus[{index}]: {source}")]
    Menu {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
    #[error("restaurants[{index}]: {source}")]
    Restaurant {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// The innermost error, with index wrappers peeled off.
    pub fn root(&self) -> &ValidationError {
        match self {
            Self::Menu { source, .. } | Self::Restaurant { source, .. } => source.root(),
            other => other,
        }
    }
}

fn check_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn check_rating(value: f64) -> Result<(), ValidationError> {
    let field = "rating";
    if value < 0.0 || value > MAX_RATING {
        return Err(ValidationError::OutOfRange { field, value });
    }
    // NaN lands here too
    if (value * 2.0).fract() != 0.0 {
        return Err(ValidationError::InvalidStep { field, value });
    }
    Ok(())
}

pub fn validate_menu(menu: &Menu) -> Result<(), ValidationError> {
    check_name("name", &menu.name)?;
    check_rating(menu.rating)?;
    if menu.price < 0.0 {
        return Err(ValidationError::Negative {
            field: "price",
            value: menu.price,
        });
    }
    Ok(())
}

pub fn validate_restaurant(rest: &Restaurant) -> Result<(), ValidationError> {
    check_name("name", &rest.name)?;
    check_rating(rest.rating)?;
    if rest.categories.is_empty() {
        return Err(ValidationError::EmptyCollection {
            field: "categories",
        });
    }
    check_name("kakao_url", &rest.kakao_url)?;

    for (index, menu) in rest.menus.iter().enumerate() {
        validate_menu(menu).map_err(|e| ValidationError::Menu {
            index,
            source: Box::new(e),
        })?;
    }

    Ok(())
}

/// Checks every restaurant in order, then rejects repeated names.
pub fn validate_document(data: &RestaurantData) -> Result<(), ValidationError> {
    let Some(rests) = data.restaurants.as_ref() else {
        return Err(ValidationError::MissingCollection {
            field: "restaurants",
        });
    };

    for (index, rest) in rests.iter().enumerate() {
        validate_restaurant(rest).map_err(|e| ValidationError::Restaurant {
            index,
            source: Box::new(e),
        })?;
    }

    check_unique_names(rests)
}

/// Rejects the first restaurant whose name was already used earlier in
/// `rests`.
pub fn check_unique_names(rests: &[Restaurant]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(rests.len());
    for (index, rest) in rests.iter().enumerate() {
        if !seen.insert(rest.name.as_str()) {
            let first = rests
                .iter()
                .position(|r| r.name == rest.name)
                .unwrap_or_default();
            return Err(ValidationError::Restaurant {
                index,
                source: Box::new(ValidationError::DuplicateName {
                    name: rest.name.clone(),
                    first,
                }),
            });
        }
    }

    Ok(())
}
