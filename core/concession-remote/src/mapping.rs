//! Conversion between [`Record`] and feature-layer JSON.
//!
//! A feature is a flat attribute map plus a polygon geometry in WGS 84
//! (`wkid` 4326). Only the first ring of a polygon is mapped to a record
//! boundary.

use chrono::{DateTime, NaiveDate};
use concession_types::{ContactInfo, Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const WGS84_WKID: u32 = 4326;

pub const FIELD_OBJECT_ID: &str = "OBJECTID";
pub const FIELD_NAME: &str = "NAME";
pub const FIELD_OWNER: &str = "OWNER";
pub const FIELD_SIZE: &str = "SIZE_HA";
pub const FIELD_PERMIT_TYPE: &str = "PERMIT_TYPE";
pub const FIELD_STATUS: &str = "STATUS";
pub const FIELD_REGION: &str = "REGION";
pub const FIELD_DISTRICT: &str = "DISTRICT";
pub const FIELD_EXPIRY_DATE: &str = "EXPIRY_DATE";
pub const FIELD_PHONE: &str = "PHONE";
pub const FIELD_EMAIL: &str = "EMAIL";
pub const FIELD_ADDRESS: &str = "ADDRESS";

/// A feature as exchanged with the feature layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

/// Polygon geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    #[serde(default)]
    pub rings: Vec<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

/// Builds the feature for `record`.
///
/// `OBJECTID` is only written when `with_object_id` is set and the record
/// carries a remote id; adds must omit it so the service assigns one.
pub fn feature_from_record(record: &Record, with_object_id: bool) -> Feature {
    let mut attributes = Map::new();
    if with_object_id {
        if let Some(object_id) = record.id.object_id() {
            attributes.insert(FIELD_OBJECT_ID.into(), Value::from(object_id));
        }
    }
    attributes.insert(FIELD_NAME.into(), Value::from(record.name.clone()));
    attributes.insert(FIELD_OWNER.into(), Value::from(record.owner.clone()));
    attributes.insert(FIELD_SIZE.into(), Value::from(record.size));
    attributes.insert(FIELD_PERMIT_TYPE.into(), Value::from(record.permit_type.as_str()));
    attributes.insert(FIELD_STATUS.into(), Value::from(record.status.as_str()));
    attributes.insert(FIELD_REGION.into(), Value::from(record.region.clone()));
    attributes.insert(FIELD_DISTRICT.into(), Value::from(record.district.clone()));
    attributes.insert(
        FIELD_EXPIRY_DATE.into(),
        record
            .expiry_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Value::from(dt.and_utc().timestamp_millis()))
            .unwrap_or(Value::Null),
    );
    let contact = record.contact_info.clone().unwrap_or_default();
    attributes.insert(FIELD_PHONE.into(), opt_string(contact.phone));
    attributes.insert(FIELD_EMAIL.into(), opt_string(contact.email));
    attributes.insert(FIELD_ADDRESS.into(), opt_string(contact.address));

    let geometry = (!record.boundary.is_empty()).then(|| Geometry {
        rings: vec![record.boundary.clone()],
        spatial_reference: Some(SpatialReference { wkid: WGS84_WKID }),
    });

    Feature {
        attributes,
        geometry,
    }
}

/// Builds a record from a queried feature.
///
/// Returns `None` for features without a usable `OBJECTID`.
pub fn record_from_feature(feature: Feature) -> Option<Record> {
    let attrs = &feature.attributes;
    let Some(object_id) = attrs.get(FIELD_OBJECT_ID).and_then(as_i64) else {
        warn!("Skipping feature without OBJECTID: {:?}", attrs.get(FIELD_NAME));
        return None;
    };

    let contact = ContactInfo {
        phone: str_attr(attrs, FIELD_PHONE),
        email: str_attr(attrs, FIELD_EMAIL),
        address: str_attr(attrs, FIELD_ADDRESS),
    };

    let boundary = feature
        .geometry
        .and_then(|g| g.rings.into_iter().next())
        .unwrap_or_default();

    Some(Record {
        id: RecordId::remote(object_id),
        name: str_attr(attrs, FIELD_NAME).unwrap_or_default(),
        owner: str_attr(attrs, FIELD_OWNER).unwrap_or_default(),
        size: attrs.get(FIELD_SIZE).and_then(as_f64).unwrap_or_default(),
        permit_type: str_attr(attrs, FIELD_PERMIT_TYPE)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        status: str_attr(attrs, FIELD_STATUS)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        region: str_attr(attrs, FIELD_REGION).unwrap_or_default(),
        district: str_attr(attrs, FIELD_DISTRICT).unwrap_or_default(),
        expiry_date: attrs.get(FIELD_EXPIRY_DATE).and_then(as_date),
        boundary,
        contact_info: (!contact.is_empty()).then_some(contact),
    })
}

fn opt_string(value: Option<String>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn str_attr(attrs: &Map<String, Value>, key: &str) -> Option<String> {
    match attrs.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Date fields arrive as epoch milliseconds; older layers store `YYYY-MM-DD`
/// strings instead.
fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => {
            DateTime::from_timestamp_millis(n.as_i64()?).map(|dt| dt.date_naive())
        }
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        _ => None,
    }
}
