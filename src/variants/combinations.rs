//! Cartesian expansion of variant options.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{sku, VariantError, VariantType};
use crate::domain::aggregates::Variant;
use crate::domain::value_objects::{Sku, MAX_SKU_LEN};

/// Upper bound on generated combinations per product.
pub const MAX_COMBINATIONS: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(rename = "type")]
    pub variant_type: String,
    pub option: String,
}

/// One purchasable configuration: one option picked from every type.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Combination {
    pub selections: Vec<Selection>,
    pub price: Decimal,
    pub stock: u32,
    pub sku: String,
}

impl Combination {
    /// Display name such as `"M / Red"`.
    pub fn name(&self) -> String {
        self.selections.iter().map(|s| s.option.as_str()).collect::<Vec<_>>().join(" / ")
    }

    pub fn to_variant(&self) -> Result<Variant, VariantError> {
        Ok(Variant { name: self.name(), sku: Sku::new(&self.sku)?, price: self.price, stock: self.stock, images: vec![] })
    }
}

/// Number of combinations `types` expands to. Zero types expand to nothing.
pub fn count(types: &[VariantType]) -> u128 {
    if types.is_empty() { return 0; }
    types.iter().map(|t| t.options.len() as u128).product()
}

/// Expands every option of every type into combinations.
///
/// The first type varies slowest. Price is the sum of the picked options'
/// prices and stock is the smallest of their stocks.
pub fn generate(product_name: &str, types: &[VariantType]) -> Result<Vec<Combination>, VariantError> {
    let total = count(types);
    if total > MAX_COMBINATIONS as u128 {
        return Err(VariantError::TooManyCombinations { count: total, limit: MAX_COMBINATIONS });
    }
    if total == 0 { return Ok(vec![]); }

    let mut partials: Vec<(Vec<Selection>, Decimal, u32)> = vec![(Vec::with_capacity(types.len()), Decimal::ZERO, u32::MAX)];
    for t in types {
        let mut next = Vec::with_capacity(partials.len() * t.options.len());
        for (selections, price, stock) in &partials {
            for option in &t.options {
                let price = price.checked_add(option.price).ok_or(VariantError::PriceOverflow)?;
                let mut selections = selections.clone();
                selections.push(Selection { variant_type: t.variant_type.clone(), option: option.name.clone() });
                next.push((selections, price, (*stock).min(option.stock)));
            }
        }
        partials = next;
    }

    let prefix = sku::code(product_name, 3);
    Ok(partials
        .into_iter()
        .enumerate()
        .map(|(i, (selections, price, stock))| {
            let number = format!("{:03}", i + 1);
            let budget = MAX_SKU_LEN.saturating_sub(prefix.len() + number.len() + 2);
            let codes = truncate(
                selections.iter().map(|s| format!("{}{}", sku::code(&s.variant_type, 2), sku::code(&s.option, 2))).collect(),
                budget,
            );
            Combination { sku: format!("{prefix}-{codes}-{number}"), selections, price, stock }
        })
        .collect())
}

/// Cuts `s` to at most `max` bytes on a char boundary. The running number
/// keeps truncated SKUs unique.
fn truncate(mut s: String, max: usize) -> String {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::VariantOption;

    fn opt(name: &str, cents: i64, stock: u32) -> VariantOption {
        VariantOption { name: name.into(), price: Decimal::new(cents, 2), stock, ..Default::default() }
    }

    fn size_color() -> Vec<VariantType> {
        vec![
            VariantType { variant_type: "Size".into(), options: vec![opt("S", 0, 5), opt("M", 100, 3), opt("L", 200, 9)] },
            VariantType { variant_type: "Color".into(), options: vec![opt("Red", 50, 4), opt("Blue", 0, 10)] },
        ]
    }

    #[test]
    fn test_count_is_product_of_option_counts() {
        let types = size_color();
        let combos = generate("Tee", &types).unwrap();
        assert_eq!(combos.len(), 6);
        assert_eq!(count(&types), 6);
    }

    #[test]
    fn test_price_sums_and_stock_is_minimum() {
        let types = size_color();
        for c in generate("Tee", &types).unwrap() {
            let picked: Vec<&VariantOption> = c.selections.iter().zip(&types)
                .map(|(s, t)| t.options.iter().find(|o| o.name == s.option).unwrap())
                .collect();
            assert_eq!(c.price, picked.iter().map(|o| o.price).sum::<Decimal>());
            assert_eq!(c.stock, picked.iter().map(|o| o.stock).min().unwrap());
        }
    }

    #[test]
    fn test_first_type_varies_slowest() {
        let combos = generate("Tee", &size_color()).unwrap();
        let names: Vec<String> = combos.iter().map(Combination::name).collect();
        assert_eq!(names, ["S / Red", "S / Blue", "M / Red", "M / Blue", "L / Red", "L / Blue"]);
        assert_eq!(combos[2].sku, "TEE-SIMCORE-003");
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        assert!(generate("Tee", &[]).unwrap().is_empty());
        let mut types = size_color();
        types[1].options.clear();
        assert!(generate("Tee", &types).unwrap().is_empty());
    }

    #[test]
    fn test_limit_is_enforced() {
        let many: Vec<VariantOption> = (0..101).map(|i| opt(&i.to_string(), 1, 1)).collect();
        let types = vec![
            VariantType { variant_type: "A".into(), options: many.clone() },
            VariantType { variant_type: "B".into(), options: many },
        ];
        assert!(matches!(generate("X", &types), Err(VariantError::TooManyCombinations { count: 10_201, .. })));
    }

    #[test]
    fn test_price_overflow() {
        let types = vec![
            VariantType { variant_type: "A".into(), options: vec![VariantOption { name: "a".into(), price: Decimal::MAX, stock: 1, ..Default::default() }] },
            VariantType { variant_type: "B".into(), options: vec![VariantOption { name: "b".into(), price: Decimal::MAX, stock: 1, ..Default::default() }] },
        ];
        assert!(matches!(generate("X", &types), Err(VariantError::PriceOverflow)));
    }

    #[test]
    fn test_many_types_keep_sku_within_limit() {
        let types: Vec<VariantType> = (0..12)
            .map(|i| VariantType { variant_type: format!("T{i}"), options: vec![opt("Aa", 0, 1), opt("Bb", 0, 1)] })
            .collect();
        let combos = generate("Shirt", &types).unwrap();
        assert_eq!(combos.len(), 4096);
        assert!(combos.iter().all(|c| c.sku.len() <= MAX_SKU_LEN));
        assert_eq!(combos[4095].sku.len(), MAX_SKU_LEN);
        assert!(combos[4095].sku.ends_with("-4096"));
        assert!(combos.iter().all(|c| c.to_variant().is_ok()));
        let unique: std::collections::HashSet<_> = combos.iter().map(|c| c.sku.as_str()).collect();
        assert_eq!(unique.len(), 4096);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("ÄÖ".to_string(), 3), "Ä");
        assert_eq!(truncate("AB".to_string(), 10), "AB");
    }

    #[test]
    fn test_to_variant() {
        let v = generate("Tee", &size_color()).unwrap()[0].to_variant().unwrap();
        assert_eq!(v.name, "S / Red");
        assert_eq!(v.price, Decimal::new(50, 2));
        assert_eq!(v.stock, 4);
    }
}
