//! SKU and barcode generation for variant options.

use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;

use super::VariantType;

/// Upper-cased first `len` alphanumeric characters of `s`.
pub fn code(s: &str, len: usize) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).take(len).flat_map(char::to_uppercase).collect()
}

/// `{PRODUCT}-{TYPE}{OPTION}-{NNN}` with a random three-digit suffix.
pub fn option_sku(product_name: &str, variant_type: &str, option_name: &str, rng: &mut impl Rng) -> String {
    let suffix: u16 = rng.gen_range(0..1000);
    format!("{}-{}{}-{:03}", code(product_name, 3), code(variant_type, 2), code(option_name, 2), suffix)
}

/// Lower-case `{product}-{variant}` with whitespace runs replaced by `-`.
pub fn slug_sku(product_name: &str, variant_name: &str) -> String {
    format!("{product_name}-{variant_name}").split_whitespace().collect::<Vec<_>>().join("-").to_lowercase()
}

/// `{product}-var001`, `{product}-var002`, ... lower-cased.
pub fn numbered_skus(product_name: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| slug_sku(product_name, &format!("VAR{i:03}"))).collect()
}

/// How [`assign`] names options that have no SKU yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkuMode {
    /// [`option_sku`] codes with a random suffix.
    #[default]
    Random,
    /// [`slug_sku`] of the type and option names.
    Slug,
    /// [`numbered_skus`] by position across the whole set.
    Numbered,
}

/// Assigns SKUs to options lacking one in the given mode. Returns how many
/// were assigned.
pub fn assign(mode: SkuMode, product_name: &str, types: &mut [VariantType], rng: &mut impl Rng) -> usize {
    let missing = |sku: &Option<String>| sku.as_deref().map_or(true, |s| s.trim().is_empty());
    match mode {
        SkuMode::Random => assign_missing(product_name, types, rng),
        SkuMode::Slug => {
            let mut assigned = 0;
            for t in types.iter_mut() {
                for option in t.options.iter_mut().filter(|o| missing(&o.sku)) {
                    option.sku = Some(slug_sku(product_name, &format!("{} {}", t.variant_type, option.name)));
                    assigned += 1;
                }
            }
            assigned
        }
        SkuMode::Numbered => {
            let total: usize = types.iter().map(|t| t.options.len()).sum();
            let numbers = numbered_skus(product_name, total);
            let options = types.iter_mut().flat_map(|t| t.options.iter_mut());
            let mut assigned = 0;
            for (option, sku) in options.zip(numbers).filter(|(o, _)| missing(&o.sku)) {
                option.sku = Some(sku);
                assigned += 1;
            }
            assigned
        }
    }
}

/// Fills in a SKU for every option that lacks one, avoiding SKUs already in
/// use within the set. Returns how many were assigned.
pub fn assign_missing(product_name: &str, types: &mut [VariantType], rng: &mut impl Rng) -> usize {
    let mut taken: HashSet<String> = types
        .iter()
        .flat_map(|t| t.options.iter().filter_map(|o| o.sku.clone()))
        .collect();
    let mut assigned = 0;
    for t in types.iter_mut() {
        for option in t.options.iter_mut().filter(|o| o.sku.as_deref().map_or(true, |s| s.trim().is_empty())) {
            let mut sku = None;
            for _ in 0..1000 {
                let candidate = option_sku(product_name, &t.variant_type, &option.name, rng);
                if !taken.contains(&candidate) {
                    sku = Some(candidate);
                    break;
                }
            }
            // only 1000 suffixes per prefix; disambiguate once they run out
            let sku = match sku {
                Some(sku) => sku,
                None => format!("{}-{}", option_sku(product_name, &t.variant_type, &option.name, rng), taken.len()),
            };
            taken.insert(sku.clone());
            option.sku = Some(sku);
            assigned += 1;
        }
    }
    assigned
}

/// Uses each option's SKU as its barcode where no barcode was scanned in.
pub fn assign_barcodes(types: &mut [VariantType]) {
    for option in types.iter_mut().flat_map(|t| t.options.iter_mut()) {
        if option.barcode.is_none() {
            option.barcode = option.sku.clone();
        }
    }
}
