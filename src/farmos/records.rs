//! Records and list envelopes returned by farmOS list endpoints.

use std::collections::BTreeMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query filters for a list request, keyed by field name.
pub type Filters = BTreeMap<String, String>;

/// A single remote entity, kept as the JSON object farmOS returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Reads a numeric field. farmOS often sends IDs as strings.
    pub fn number(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Term ID (`tid`), falling back to a generic `id`.
    pub fn id(&self) -> Option<u64> {
        self.number("tid").or_else(|| self.number("id"))
    }

    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    /// Area type machine name, e.g. `field` or `building`.
    pub fn area_type(&self) -> Option<&str> {
        self.text("field_farm_area_type")
    }

    /// WKT geometry of the first geofield value.
    pub fn geometry(&self) -> Option<&str> {
        match self.0.get("field_farm_geofield")? {
            Value::Array(items) => items.first()?.get("geom")?.as_str(),
            Value::Object(item) => item.get("geom")?.as_str(),
            _ => None,
        }
    }
}

/// A taxonomy vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    pub machine_name: String,
    pub vid: u64,
}

impl Vocabulary {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            machine_name: record.text("machine_name")?.to_string(),
            vid: record.number("vid")?,
        })
    }
}

/// The JSON wrapper around a page of records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub list: Vec<Record>,
    /// Link to the final page. Other links (`self`, `first`, `next`) are
    /// not needed for walking pages and are ignored.
    #[serde(default)]
    pub last: Option<String>,
}

impl Envelope {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Number of pages, from the `page` parameter of the `last` link.
    ///
    /// `None` if there is no `last` link. A `last` link without a `page`
    /// parameter points at page 0, so it counts as one page.
    pub fn page_total(&self) -> Option<u32> {
        let last = self.last.as_deref()?;
        let page = page_param(last).unwrap_or(0);
        Some(page.saturating_add(1))
    }
}

fn page_param(link: &str) -> Option<u32> {
    let url = Url::parse(link)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(link)))
        .ok()?;

    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_list() {
        let env = Envelope::parse(r#"{"list":[{"tid":1,"name":"Barn"}]}"#).unwrap();
        assert_eq!(env.list.len(), 1);
        assert_eq!(
            serde_json::to_value(&env.list).unwrap(),
            json!([{"tid":1,"name":"Barn"}])
        );
    }

    #[test]
    fn test_envelope_without_list_is_empty() {
        let env = Envelope::parse(r#"{"self":"http://host/x.json"}"#).unwrap();
        assert!(env.list.is_empty());
        assert_eq!(env.page_total(), None);
    }

    #[test]
    fn test_page_total_from_last_link() {
        let env = Envelope::parse(r#"{"last":"http://host/path?page=3"}"#).unwrap();
        assert_eq!(env.page_total(), Some(4));
    }

    #[test]
    fn test_page_total_with_other_params() {
        let env = Envelope::parse(
            r#"{"last":"http://host/taxonomy_term.json?vocabulary=7&page=12&area_type=field"}"#,
        )
        .unwrap();
        assert_eq!(env.page_total(), Some(13));
    }

    #[test]
    fn test_page_total_relative_link() {
        let env = Envelope::parse(r#"{"last":"/taxonomy_term.json?page=2"}"#).unwrap();
        assert_eq!(env.page_total(), Some(3));
    }

    #[test]
    fn test_page_total_without_page_param() {
        let env = Envelope::parse(r#"{"last":"http://host/taxonomy_term.json"}"#).unwrap();
        assert_eq!(env.page_total(), Some(1));
    }

    #[test]
    fn test_record_numeric_ids_as_strings() {
        let r = record(json!({"tid": "42", "name": "North field"}));
        assert_eq!(r.id(), Some(42));
        assert_eq!(r.name(), Some("North field"));
    }

    #[test]
    fn test_record_area_fields() {
        let r = record(json!({
            "tid": 5,
            "name": "Barn",
            "field_farm_area_type": "building",
            "field_farm_geofield": [{"geom": "POINT (1 2)", "geo_type": "point"}]
        }));
        assert_eq!(r.area_type(), Some("building"));
        assert_eq!(r.geometry(), Some("POINT (1 2)"));
    }

    #[test]
    fn test_record_missing_geometry() {
        let r = record(json!({"tid": 5, "field_farm_geofield": []}));
        assert_eq!(r.geometry(), None);
    }

    #[test]
    fn test_vocabulary_from_record() {
        let v = Vocabulary::from_record(&record(json!({"vid": "7", "machine_name": "farm_areas"})));
        assert_eq!(
            v,
            Some(Vocabulary {
                machine_name: "farm_areas".to_string(),
                vid: 7
            })
        );
        assert!(Vocabulary::from_record(&record(json!({"machine_name": "x"}))).is_none());
    }
}
