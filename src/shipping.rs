//! Shipping templates, zone rates and per-option shipping rules.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Divisor turning cubic centimetres into volumetric kilograms.
pub const VOLUMETRIC_DIVISOR: f64 = 5000.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Dimensions {
    pub fn volume(&self) -> f64 { self.length * self.width * self.height }
    fn fits_within(&self, max: &Dimensions) -> bool {
        self.length <= max.length && self.width <= max.width && self.height <= max.height
    }
}

/// Shipping data a vendor attaches to a single variant option.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRules {
    pub weight: Option<f64>,
    pub dimensions: Option<Dimensions>,
    pub additional_cost: Option<Decimal>,
    #[serde(default)]
    pub special_handling: bool,
}

impl ShippingRules {
    pub fn is_empty(&self) -> bool {
        self.weight.is_none() && self.dimensions.is_none() && self.additional_cost.is_none() && !self.special_handling
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template { Standard, Express, Bulk }

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    pub name: &'static str,
    pub base_rate: f64,
    pub rate_per_kg: f64,
    pub handling_fee: f64,
    pub min_weight: Option<f64>,
    pub max_weight: f64,
    pub max_dimensions: Dimensions,
    pub restrictions: &'static [&'static str],
}

impl Template {
    pub const ALL: [Template; 3] = [Self::Standard, Self::Express, Self::Bulk];

    pub fn spec(self) -> TemplateSpec {
        match self {
            Self::Standard => TemplateSpec {
                name: "Standard Shipping", base_rate: 10.0, rate_per_kg: 2.0, handling_fee: 5.0,
                min_weight: None, max_weight: 20.0,
                max_dimensions: Dimensions { length: 100.0, width: 50.0, height: 50.0 },
                restrictions: &["flammable", "fragile"],
            },
            Self::Express => TemplateSpec {
                name: "Express Shipping", base_rate: 20.0, rate_per_kg: 4.0, handling_fee: 10.0,
                min_weight: None, max_weight: 10.0,
                max_dimensions: Dimensions { length: 80.0, width: 40.0, height: 40.0 },
                restrictions: &["flammable"],
            },
            Self::Bulk => TemplateSpec {
                name: "Bulk Shipping", base_rate: 30.0, rate_per_kg: 1.5, handling_fee: 15.0,
                min_weight: Some(20.0), max_weight: 100.0,
                max_dimensions: Dimensions { length: 200.0, width: 100.0, height: 100.0 },
                restrictions: &["perishable"],
            },
        }
    }

    /// `base + weight × per_kg + handling`, after checking the template's limits.
    pub fn quote(self, weight: f64, dimensions: &Dimensions) -> Result<Decimal, ShippingError> {
        let spec = self.spec();
        if weight < 0.0 || weight > spec.max_weight || spec.min_weight.is_some_and(|min| weight < min) {
            return Err(ShippingError::WeightOutOfRange { template: spec.name, weight });
        }
        if !dimensions.fits_within(&spec.max_dimensions) {
            return Err(ShippingError::DimensionsExceeded { template: spec.name });
        }
        money(spec.base_rate + weight * spec.rate_per_kg + spec.handling_fee)
    }
}

impl FromStr for Template {
    type Err = ShippingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            "bulk" => Ok(Self::Bulk),
            other => Err(ShippingError::UnknownTemplate(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: &'static str,
    pub name: &'static str,
    pub region: &'static str,
    pub base_rate: f64,
    pub rate_per_kg: f64,
}

pub const ZONES: [Zone; 6] = [
    Zone { id: "zone1", name: "Zone 1", region: "domestic", base_rate: 10.0, rate_per_kg: 2.0 },
    Zone { id: "zone2", name: "Zone 2", region: "domestic", base_rate: 15.0, rate_per_kg: 2.5 },
    Zone { id: "zone3", name: "Zone 3", region: "domestic", base_rate: 20.0, rate_per_kg: 3.0 },
    Zone { id: "intl1", name: "International Zone 1", region: "international", base_rate: 30.0, rate_per_kg: 5.0 },
    Zone { id: "intl2", name: "International Zone 2", region: "international", base_rate: 40.0, rate_per_kg: 6.0 },
    Zone { id: "intl3", name: "International Zone 3", region: "international", base_rate: 50.0, rate_per_kg: 7.0 },
];

pub fn zone(id: &str) -> Result<&'static Zone, ShippingError> {
    ZONES.iter().find(|z| z.id == id).ok_or_else(|| ShippingError::UnknownZone(id.to_string()))
}

impl Zone {
    /// Charges the larger of actual and volumetric weight.
    pub fn quote(&self, weight: f64, dimensions: &Dimensions) -> Result<Decimal, ShippingError> {
        if weight < 0.0 { return Err(ShippingError::WeightOutOfRange { template: self.name, weight }); }
        let chargeable = weight.max(dimensions.volume() / VOLUMETRIC_DIVISOR);
        money(self.base_rate + chargeable * self.rate_per_kg)
    }
}

/// Zone quote for one option, plus the option's own surcharge.
pub fn quote_option(zone: &Zone, rules: &ShippingRules) -> Result<Decimal, ShippingError> {
    let surcharge = rules.additional_cost.unwrap_or_default();
    if surcharge.is_sign_negative() {
        return Err(ShippingError::NegativeCost);
    }
    let base = zone.quote(rules.weight.unwrap_or_default(), &rules.dimensions.unwrap_or_default())?;
    base.checked_add(surcharge).ok_or(ShippingError::Overflow)
}

fn money(value: f64) -> Result<Decimal, ShippingError> {
    Decimal::from_f64(value).map(|d| d.round_dp(2)).ok_or(ShippingError::NotFinite)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShippingError {
    #[error("Weight {weight} outside allowed range for {template}")]
    WeightOutOfRange { template: &'static str, weight: f64 },
    #[error("Dimensions exceed maximum allowed for {template}")]
    DimensionsExceeded { template: &'static str },
    #[error("Unknown shipping template: {0}")]
    UnknownTemplate(String),
    #[error("Unknown shipping zone: {0}")]
    UnknownZone(String),
    #[error("Shipping cost is not a finite number")]
    NotFinite,
    #[error("Additional shipping cost cannot be negative")]
    NegativeCost,
    #[error("Shipping cost is too large")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(l: f64, w: f64, h: f64) -> Dimensions { Dimensions { length: l, width: w, height: h } }

    #[test]
    fn test_standard_template() {
        assert_eq!(Template::Standard.quote(3.0, &dims(10.0, 10.0, 10.0)).unwrap(), Decimal::new(21, 0));
    }

    #[test]
    fn test_bulk_requires_minimum_weight() {
        assert!(matches!(
            Template::Bulk.quote(5.0, &dims(10.0, 10.0, 10.0)),
            Err(ShippingError::WeightOutOfRange { .. })
        ));
        assert_eq!(Template::Bulk.quote(20.0, &dims(10.0, 10.0, 10.0)).unwrap(), Decimal::new(75, 0));
    }

    #[test]
    fn test_express_dimension_limit() {
        assert!(matches!(
            Template::Express.quote(1.0, &dims(81.0, 10.0, 10.0)),
            Err(ShippingError::DimensionsExceeded { .. })
        ));
    }

    #[test]
    fn test_zone_uses_volumetric_weight() {
        let z = zone("zone2").unwrap();
        // 50×40×30 / 5000 = 12kg volumetric, beats 2kg actual
        assert_eq!(z.quote(2.0, &dims(50.0, 40.0, 30.0)).unwrap(), Decimal::new(45, 0));
        assert_eq!(z.quote(2.0, &dims(1.0, 1.0, 1.0)).unwrap(), Decimal::new(20, 0));
    }

    #[test]
    fn test_option_surcharge() {
        let rules = ShippingRules { weight: Some(1.0), additional_cost: Some(Decimal::new(250, 2)), ..Default::default() };
        assert_eq!(quote_option(zone("intl1").unwrap(), &rules).unwrap(), Decimal::new(3750, 2));
        assert!(zone("mars").is_err());
    }

    #[test]
    fn test_option_surcharge_bounds() {
        let negative = ShippingRules { additional_cost: Some(Decimal::new(-1, 0)), ..Default::default() };
        assert_eq!(quote_option(zone("zone1").unwrap(), &negative), Err(ShippingError::NegativeCost));
        let huge = ShippingRules { weight: Some(1.0), additional_cost: Some(Decimal::MAX), ..Default::default() };
        assert_eq!(quote_option(zone("zone1").unwrap(), &huge), Err(ShippingError::Overflow));
    }
}
