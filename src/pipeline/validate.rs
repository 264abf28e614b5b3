use serde_json::Value;

pub const REQUIRED_FIELDS: [&str; 6] = [
    "user_id",
    "device_type",
    "ip",
    "device_id",
    "app_version",
    "locale",
];

/// True iff every required key is present. Value types are not inspected.
pub fn validate(event: &Value) -> bool {
    missing_fields(event).is_empty()
}

/// Required keys absent from `event`; a non-object is missing all of them.
pub fn missing_fields(event: &Value) -> Vec<&'static str> {
    match event.as_object() {
        Some(map) => REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !map.contains_key(*field))
            .collect(),
        None => REQUIRED_FIELDS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete() -> Value {
        json!({
            "user_id": "u1",
            "device_type": "mobile",
            "ip": "1.2.3.4",
            "device_id": "d1",
            "app_version": "2.5.0",
            "locale": "en-US"
        })
    }

    #[test]
    fn accepts_complete_event() {
        assert!(validate(&complete()));
    }

    #[test]
    fn rejects_when_any_single_field_is_missing() {
        for field in REQUIRED_FIELDS {
            let mut event = complete();
            event.as_object_mut().unwrap().remove(field);
            assert!(!validate(&event), "missing {field} should fail");
            assert_eq!(missing_fields(&event), vec![field]);
        }
    }

    #[test]
    fn ignores_value_types_and_extra_fields() {
        let event = json!({
            "user_id": 42,
            "device_type": null,
            "ip": ["1.2.3.4"],
            "device_id": {"raw": "d1"},
            "app_version": 2.5,
            "locale": "",
            "extra": true
        });
        assert!(validate(&event));
    }

    #[test]
    fn non_object_documents_miss_everything() {
        assert!(!validate(&json!(["user_id"])));
        assert_eq!(missing_fields(&json!("text")).len(), REQUIRED_FIELDS.len());
    }
}
