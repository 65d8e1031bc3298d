//! Bulk import/export of variant options.
//!
//! Export flattens every option into one row, repeating its type and
//! shipping fields. Import reverses that, grouping rows back under their
//! `type` column in order of first appearance. A single bad row rejects the
//! whole file.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use super::{VariantError, VariantOption, VariantType};
use crate::shipping::{Dimensions, ShippingRules};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format { Csv, Json }

impl Format {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for Format {
    type Err = VariantError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(VariantError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// One option, flattened with its type and shipping fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRow {
    #[serde(rename = "type")]
    pub variant_type: String,
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub image: Option<String>,
    pub weight: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub additional_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "blank_is_false")]
    pub special_handling: bool,
}

/// Spreadsheets leave unticked flags as empty cells.
fn blank_is_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn flatten(types: &[VariantType]) -> Vec<VariantRow> {
    types
        .iter()
        .flat_map(|t| {
            t.options.iter().map(move |o| {
                let rules = o.shipping_rules.clone().unwrap_or_default();
                let dims = rules.dimensions;
                VariantRow {
                    variant_type: t.variant_type.clone(),
                    name: o.name.clone(),
                    price: o.price,
                    stock: o.stock,
                    sku: o.sku.clone(),
                    barcode: o.barcode.clone(),
                    image: o.image.clone(),
                    weight: rules.weight,
                    length: dims.map(|d| d.length),
                    width: dims.map(|d| d.width),
                    height: dims.map(|d| d.height),
                    additional_cost: rules.additional_cost,
                    special_handling: rules.special_handling,
                }
            })
        })
        .collect()
}

/// Groups rows back into variant types. `first_row` is the number reported
/// for `rows[0]` in errors.
pub fn group(rows: Vec<VariantRow>, first_row: usize) -> Result<Vec<VariantType>, VariantError> {
    let mut types: Vec<VariantType> = Vec::new();
    for (i, row) in rows.into_iter().enumerate() {
        let row_no = first_row + i;
        let type_name = row.variant_type.trim();
        if type_name.is_empty() {
            return Err(VariantError::InvalidRow { row: row_no, message: "type is required".into() });
        }
        if row.name.trim().is_empty() {
            return Err(VariantError::InvalidRow { row: row_no, message: "name is required".into() });
        }
        if row.price < Decimal::ZERO {
            return Err(VariantError::InvalidRow { row: row_no, message: "price must not be negative".into() });
        }
        if row.additional_cost.is_some_and(|c| c < Decimal::ZERO) {
            return Err(VariantError::InvalidRow { row: row_no, message: "additionalCost must not be negative".into() });
        }
        let option = option_from_row(&row);
        match types.iter_mut().find(|t| t.variant_type == type_name) {
            Some(t) => t.options.push(option),
            None => types.push(VariantType { variant_type: type_name.to_string(), options: vec![option] }),
        }
    }
    Ok(types)
}

fn option_from_row(row: &VariantRow) -> VariantOption {
    let dimensions = (row.length.is_some() || row.width.is_some() || row.height.is_some()).then(|| Dimensions {
        length: row.length.unwrap_or_default(),
        width: row.width.unwrap_or_default(),
        height: row.height.unwrap_or_default(),
    });
    let rules = ShippingRules {
        weight: row.weight,
        dimensions,
        additional_cost: row.additional_cost,
        special_handling: row.special_handling,
    };
    VariantOption {
        name: row.name.trim().to_string(),
        price: row.price,
        stock: row.stock,
        sku: non_blank(&row.sku),
        barcode: non_blank(&row.barcode),
        image: non_blank(&row.image),
        shipping_rules: (!rules.is_empty()).then_some(rules),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn export(types: &[VariantType], format: Format) -> Result<Vec<u8>, VariantError> {
    let rows = flatten(types);
    match format {
        Format::Json => Ok(serde_json::to_vec_pretty(&rows)?),
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in &rows {
                writer.serialize(row)?;
            }
            writer.into_inner().map_err(|e| VariantError::Csv(e.into_error().into()))
        }
    }
}

pub fn import(input: &[u8], format: Format) -> Result<Vec<VariantType>, VariantError> {
    match format {
        Format::Json => {
            let values: Vec<serde_json::Value> = serde_json::from_slice(input)?;
            let rows = values
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    serde_json::from_value::<VariantRow>(v)
                        .map_err(|e| VariantError::InvalidRow { row: i + 1, message: e.to_string() })
                })
                .collect::<Result<Vec<_>, _>>()?;
            group(rows, 1)
        }
        Format::Csv => {
            let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
            let rows = reader
                .deserialize::<VariantRow>()
                .enumerate()
                .map(|(i, r)| r.map_err(|e| VariantError::InvalidRow { row: i + 1, message: e.to_string() }))
                .collect::<Result<Vec<_>, _>>()?;
            group(rows, 1)
        }
    }
}

/// Parses pasted `name,price,stock` lines into options for one type.
pub fn parse_option_lines(text: &str) -> Result<Vec<VariantOption>, VariantError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let row = i + 1;
            let bad = |message: &str| VariantError::InvalidRow { row, message: message.to_string() };
            let mut fields = line.split(',').map(str::trim);
            let name = fields.next().filter(|n| !n.is_empty()).ok_or_else(|| bad("name is required"))?;
            let price = fields.next().and_then(|p| Decimal::from_str(p).ok()).ok_or_else(|| bad("price is not a number"))?;
            let stock = fields.next().and_then(|s| s.parse::<u32>().ok()).ok_or_else(|| bad("stock is not a whole number"))?;
            if price < Decimal::ZERO { return Err(bad("price must not be negative")); }
            Ok(VariantOption { name: name.to_string(), price, stock, ..Default::default() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<VariantType> {
        vec![
            VariantType {
                variant_type: "Size".into(),
                options: vec![
                    VariantOption { name: "S".into(), price: Decimal::new(1000, 2), stock: 4, sku: Some("TEE-SIS-001".into()), ..Default::default() },
                    VariantOption {
                        name: "XL".into(), price: Decimal::new(1250, 2), stock: 2, barcode: Some("4006381333931".into()),
                        shipping_rules: Some(ShippingRules {
                            weight: Some(0.4),
                            dimensions: Some(Dimensions { length: 30.0, width: 20.0, height: 2.5 }),
                            additional_cost: Some(Decimal::new(150, 2)),
                            special_handling: true,
                        }),
                        ..Default::default()
                    },
                ],
            },
            VariantType {
                variant_type: "Color".into(),
                options: vec![VariantOption { name: "Navy, dark".into(), price: Decimal::ZERO, stock: 9, image: Some("/uploads/n.png".into()), ..Default::default() }],
            },
        ]
    }

    #[test]
    fn test_flatten_duplicates_type_per_option() {
        let rows = flatten(&sample());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].variant_type, "Size");
        assert_eq!(rows[1].length, Some(30.0));
        assert!(rows[1].special_handling);
    }

    #[test]
    fn test_csv_round_trip_restores_groups() {
        let bytes = export(&sample(), Format::Csv).unwrap();
        let header = String::from_utf8(bytes.clone()).unwrap();
        assert!(header.starts_with("type,name,price,stock,sku,barcode,image,weight,length,width,height,additionalCost,specialHandling"));
        assert_eq!(import(&bytes, Format::Csv).unwrap(), sample());
    }

    #[test]
    fn test_json_round_trip_restores_groups() {
        let bytes = export(&sample(), Format::Json).unwrap();
        assert_eq!(import(&bytes, Format::Json).unwrap(), sample());
    }

    #[test]
    fn test_interleaved_rows_group_by_first_appearance() {
        let csv = "type,name,price,stock\nColor,Red,1,2\nSize,M,0,5\nColor,Blue,1,3\n";
        let types = import(csv.as_bytes(), Format::Csv).unwrap();
        assert_eq!(types.iter().map(|t| t.variant_type.as_str()).collect::<Vec<_>>(), ["Color", "Size"]);
        assert_eq!(types[0].options.len(), 2);
    }

    #[test]
    fn test_bad_row_rejects_whole_import() {
        let csv = "type,name,price,stock\nColor,Red,1,2\nColor,Blue,abc,3\n";
        match import(csv.as_bytes(), Format::Csv) {
            Err(VariantError::InvalidRow { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected row error, got {other:?}"),
        }
        let json = r#"[{"type":"","name":"Red","price":1,"stock":1}]"#;
        assert!(matches!(import(json.as_bytes(), Format::Json), Err(VariantError::InvalidRow { row: 1, .. })));
    }

    #[test]
    fn test_blank_trailing_cells() {
        let csv = "type,name,price,stock,sku,barcode,image,weight,length,width,height,additionalCost,specialHandling\n\
                   Size,S,1,2,,,,,,,,,\n\
                   Size,M,1,2,,,,0.5,,,,,true\n";
        let types = import(csv.as_bytes(), Format::Csv).unwrap();
        let options = &types[0].options;
        assert_eq!(options[0], VariantOption { name: "S".into(), price: Decimal::ONE, stock: 2, ..Default::default() });
        let rules = options[1].shipping_rules.as_ref().unwrap();
        assert!(rules.special_handling);
        assert_eq!(rules.weight, Some(0.5));
    }

    #[test]
    fn test_negative_surcharge_rejected() {
        let json = r#"[{"type":"Size","name":"S","price":1,"stock":1,"additionalCost":-2}]"#;
        assert!(matches!(import(json.as_bytes(), Format::Json), Err(VariantError::InvalidRow { row: 1, .. })));
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!("xlsx".parse::<Format>(), Err(VariantError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_parse_option_lines() {
        let options = parse_option_lines("Small, 9.99, 10\n\nLarge,12.50,3").unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].price, Decimal::new(1250, 2));
        assert!(parse_option_lines("Small,-1,2").is_err());
    }
}
