//! Reference data (functions, industries, countries, ...) reduced to flat lookup tables.

use crate::error::{Error, Result};
use crate::melt::table::{build_table, into_row, Row, Table, TableOptions};
use crate::models::StandardizedDataType;
use serde_json::{Map, Value};

const OPTIONAL_TAXONOMY_FIELDS: [&str; 3] = ["rollup", "rollupIds", "parentId"];

/// Reduce one standardized-data element to the fixed shape of its type
pub fn process_enum_element(data_type: StandardizedDataType, element: Value) -> Result<Row> {
    let element = into_row(element)?;
    let mut row = Map::new();

    match data_type {
        StandardizedDataType::Countries => {
            row.insert("name".into(), required(&element, &["name", "value"])?);
            row.insert("id".into(), required(&element, &["countryCode"])?);
            row.insert("urn".into(), required(&element, &["$URN"])?);
            row.insert("countryCode".into(), required(&element, &["countryCode"])?);
        }
        StandardizedDataType::Regions => {
            row.insert("name".into(), required(&element, &["name", "value"])?);
            row.insert("id".into(), required(&element, &["id"])?);
            row.insert("urn".into(), required(&element, &["$URN"])?);
            row.insert("country".into(), required(&element, &["country"])?);
        }
        StandardizedDataType::Functions
        | StandardizedDataType::Industries
        | StandardizedDataType::Seniorities => {
            row.insert("name".into(), required(&element, &["name", "localized", "en_US"])?);
            row.insert("id".into(), required(&element, &["id"])?);
            row.insert("urn".into(), required(&element, &["$URN"])?);
            for field in OPTIONAL_TAXONOMY_FIELDS {
                if let Some(value) = element.get(field).filter(|v| is_present(v)) {
                    row.insert(field.to_string(), value.clone());
                }
            }
        }
    }

    Ok(row)
}

/// Build the lookup table for one standardized data type, keyed by `id`
pub fn standardized_data_table<'a, I>(data_type: StandardizedDataType, records: I) -> Result<Table<'a>>
where
    I: IntoIterator<Item = Result<Value>>,
    I::IntoIter: 'a,
{
    let rows = records
        .into_iter()
        .map(move |record| record.and_then(|element| process_enum_element(data_type, element)));
    build_table(
        rows,
        &data_type.normalized_name(),
        &["id"],
        TableOptions::default(),
    )
}

fn required(element: &Map<String, Value>, path: &[&str]) -> Result<Value> {
    let mut current = element.get(path[0]);
    for key in &path[1..] {
        current = current.and_then(|v| v.get(*key));
    }
    current
        .cloned()
        .ok_or_else(|| Error::Format(format!("standardized data element lacks '{}'", path.join("."))))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_industry_element() {
        let element = json!({
            "$URN": "urn:li:industry:4",
            "id": 4,
            "name": {"localized": {"en_US": "Software Development"}},
            "rollupIds": [6],
            "parentId": null
        });
        let row = process_enum_element(StandardizedDataType::Industries, element).unwrap();
        assert_eq!(
            Value::Object(row),
            json!({"name": "Software Development", "id": 4, "urn": "urn:li:industry:4", "rollupIds": [6]})
        );
    }

    #[test]
    fn test_country_element() {
        let element = json!({
            "$URN": "urn:li:country:us",
            "countryCode": "us",
            "countryGroup": "urn:li:countryGroup:NA",
            "name": {"value": "United States"}
        });
        let row = process_enum_element(StandardizedDataType::Countries, element).unwrap();
        assert_eq!(
            Value::Object(row),
            json!({"name": "United States", "id": "us", "urn": "urn:li:country:us", "countryCode": "us"})
        );
    }

    #[test]
    fn test_missing_field_is_format_error() {
        let element = json!({"$URN": "urn:li:region:7", "id": 7, "name": {"value": "Bay Area"}});
        assert!(matches!(
            process_enum_element(StandardizedDataType::Regions, element),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_table_is_named_and_keyed() {
        let records = vec![Ok(json!({
            "$URN": "urn:li:seniority:1",
            "id": 1,
            "name": {"localized": {"en_US": "Unpaid"}}
        }))];
        let table = standardized_data_table(StandardizedDataType::Seniorities, records).unwrap();
        assert_eq!(table.name, "seniorities");
        assert_eq!(table.primary_key, vec!["id"]);
        assert_eq!(table.columns.as_deref().unwrap(), ["id", "name", "urn"]);
    }
}
