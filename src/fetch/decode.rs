use serde_json::Value;

use crate::error::LookupError;
use crate::records::StreamerRecord;

/// Normalize a channel payload into a record.
///
/// The payload must carry a numeric `id` or an object `user`; anything else is
/// treated as "no such channel". Optional fields are copied only when present
/// with the expected type.
pub fn normalize_channel(payload: &Value, identifier: &str) -> Result<StreamerRecord, LookupError> {
    let has_id = payload.get("id").map(Value::is_number).unwrap_or(false);
    let user = payload.get("user").filter(|user| user.is_object());

    if !has_id && user.is_none() {
        return Err(LookupError::MissingShape {
            identifier: identifier.to_string(),
        });
    }

    let user_name = user.and_then(|user| non_empty_str(user, "username"));

    let mut record = StreamerRecord::new(user_name.unwrap_or(identifier));
    record.id = payload.get("id").and_then(Value::as_u64);
    record.display_name = user_name.map(str::to_string);
    record.avatar = user
        .and_then(|user| non_empty_str(user, "profile_pic"))
        .map(str::to_string);
    record.followers = payload
        .get("followersCount")
        .or_else(|| payload.get("followers_count"))
        .and_then(Value::as_u64);

    if let Some(livestream) = payload.get("livestream") {
        record.is_live = Some(is_truthy(livestream));
        if livestream.is_object() {
            record.title = non_empty_str(livestream, "session_title").map(str::to_string);
            record.viewers = livestream.get("viewer_count").and_then(Value::as_u64);
            record.language = non_empty_str(livestream, "language").map(str::to_string);
            record.tags = livestream
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                });
        }
    }

    if let Some(category) = recent_category(payload) {
        record.category = Some(category.to_string());
        record.game = Some(category.to_string());
    }

    Ok(record)
}

/// First entry of `recent_categories`: its flat `name`, else `category.name`.
fn recent_category(payload: &Value) -> Option<&str> {
    let recent = payload.get("recent_categories")?.as_array()?.first()?;
    non_empty_str(recent, "name").or_else(|| {
        recent
            .get("category")
            .and_then(|category| non_empty_str(category, "name"))
    })
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
