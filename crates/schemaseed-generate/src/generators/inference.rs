use serde_json::json;

use schemaseed_core::NormalizedType;

use crate::generators::InferredGenerator;

/// Default field-to-generator mapping: name heuristics first, then type.
/// `None` leaves the field to the type fallback.
pub fn infer_generator(field: &str, data_type: NormalizedType) -> Option<InferredGenerator> {
    if let Some(id) = infer_from_name(&field.to_lowercase()) {
        return Some(InferredGenerator::new(id));
    }
    infer_from_type(data_type)
}

fn infer_from_name(name: &str) -> Option<&'static str> {
    let id = if name.contains("email") {
        "email"
    } else if name.contains("first_name") || name.contains("firstname") {
        "firstName"
    } else if name.contains("last_name") || name.contains("lastname") {
        "lastName"
    } else if name.contains("full_name") || name.contains("fullname") || name == "name" {
        "fullName"
    } else if name.contains("phone") || name.contains("mobile") || name.contains("tel") {
        "phone"
    } else if name.contains("user_name") || name.contains("username") || name == "login" {
        "username"
    } else if name.contains("url") || name.contains("website") || name.contains("link") {
        "url"
    } else if name.contains("country") {
        "country"
    } else if name.contains("city") {
        "city"
    } else if name.contains("address") {
        "address"
    } else if name.contains("uuid") || name.contains("guid") {
        "uuid"
    } else if name.contains("created_at") || name.contains("updated_at") {
        "dateRecent"
    } else if name.contains("birth") || name.contains("date") {
        "datePast"
    } else {
        return None;
    };
    Some(id)
}

fn infer_from_type(data_type: NormalizedType) -> Option<InferredGenerator> {
    let inferred = match data_type {
        NormalizedType::Boolean => InferredGenerator::new("booleanWeighted"),
        NormalizedType::Int | NormalizedType::Bigint => {
            InferredGenerator::new("intRange").with_options(json!({"min": 1, "max": 1_000_000}))
        }
        NormalizedType::Float | NormalizedType::Decimal => InferredGenerator::new("decimalRange")
            .with_options(json!({"min": 0, "max": 1000, "precision": 2})),
        NormalizedType::Date | NormalizedType::Datetime => InferredGenerator::new("dateRecent"),
        NormalizedType::Uuid => InferredGenerator::new("uuid"),
        NormalizedType::String | NormalizedType::Text | NormalizedType::Binary => {
            InferredGenerator::new("textSentence")
        }
        NormalizedType::Enum | NormalizedType::Json | NormalizedType::ObjectId => return None,
    };
    Some(inferred)
}
