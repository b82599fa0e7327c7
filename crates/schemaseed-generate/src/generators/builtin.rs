use chrono::{DateTime, Duration, SecondsFormat, Utc};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, CountryName, StreetName};
use fake::faker::internet::en::{DomainSuffix, SafeEmail, Username};
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::RngCore;
use serde_json::{Value, json};

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorCall, GeneratorRegistry};
use crate::random::SeedRandom;

const MILLIS_PER_DAY: i64 = 86_400_000;
const DEFAULT_RECENT_DAYS: i64 = 30;
const DEFAULT_PAST_YEARS: i64 = 10;
const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 100;
const DEFAULT_DECIMAL_MIN: f64 = 0.0;
const DEFAULT_DECIMAL_MAX: f64 = 100.0;
const DEFAULT_DECIMAL_PRECISION: i64 = 2;

pub fn register(registry: &mut GeneratorRegistry) {
    let text_generators: [(&'static str, fn(&mut SeedRandom) -> String); 11] = [
        ("email", |rng| SafeEmail().fake_with_rng(rng)),
        ("firstName", |rng| FirstName().fake_with_rng(rng)),
        ("lastName", |rng| LastName().fake_with_rng(rng)),
        ("fullName", |rng| Name().fake_with_rng(rng)),
        ("phone", |rng| PhoneNumber().fake_with_rng(rng)),
        ("username", |rng| Username().fake_with_rng(rng)),
        ("url", random_url),
        ("country", |rng| CountryName().fake_with_rng(rng)),
        ("city", |rng| CityName().fake_with_rng(rng)),
        ("address", random_address),
        ("textSentence", |rng| Sentence(3..8).fake_with_rng(rng)),
    ];
    for (id, produce) in text_generators {
        registry.register_generator(Box::new(TextGenerator { id, produce }));
    }

    registry.register_generator(Box::new(UuidGenerator));
    registry.register_generator(Box::new(ObjectIdGenerator));
    registry.register_generator(Box::new(DateRecentGenerator));
    registry.register_generator(Box::new(DatePastGenerator));
    registry.register_generator(Box::new(BooleanWeightedGenerator));
    registry.register_generator(Box::new(IntRangeGenerator));
    registry.register_generator(Box::new(DecimalRangeGenerator));
}

/// Timestamp text used for every generated instant.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 24 lowercase hex characters from 12 random bytes.
pub fn random_object_id(rng: &mut SeedRandom) -> String {
    let mut bytes = [0u8; 12];
    rng.fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn random_uuid(rng: &mut SeedRandom) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

/// Instant up to `span_ms` before `anchor`.
pub fn instant_before(rng: &mut SeedRandom, anchor: DateTime<Utc>, span_ms: i64) -> String {
    let offset = rng.next_int(0, span_ms.max(0));
    format_instant(anchor - Duration::milliseconds(offset))
}

pub fn round_to(value: f64, precision: i64) -> f64 {
    let factor = 10f64.powi(precision.clamp(0, 12) as i32);
    (value * factor).round() / factor
}

fn random_url(rng: &mut SeedRandom) -> String {
    let word: String = Word().fake_with_rng(rng);
    let suffix: String = DomainSuffix().fake_with_rng(rng);
    format!("https://{}.{}", word.to_lowercase(), suffix)
}

fn random_address(rng: &mut SeedRandom) -> String {
    let number: String = BuildingNumber().fake_with_rng(rng);
    let street: String = StreetName().fake_with_rng(rng);
    format!("{number} {street}")
}

struct TextGenerator {
    id: &'static str,
    produce: fn(&mut SeedRandom) -> String,
}

impl Generator for TextGenerator {
    fn id(&self) -> &str {
        self.id
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        Ok(Value::String((self.produce)(call.rng)))
    }
}

struct UuidGenerator;

impl Generator for UuidGenerator {
    fn id(&self) -> &str {
        "uuid"
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        Ok(Value::String(random_uuid(call.rng)))
    }
}

struct ObjectIdGenerator;

impl Generator for ObjectIdGenerator {
    fn id(&self) -> &str {
        "objectId"
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        Ok(Value::String(random_object_id(call.rng)))
    }
}

struct DateRecentGenerator;

impl Generator for DateRecentGenerator {
    fn id(&self) -> &str {
        "dateRecent"
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        let days = call.option_i64("days").unwrap_or(DEFAULT_RECENT_DAYS);
        let anchor = call.reference_time;
        Ok(Value::String(instant_before(
            call.rng,
            anchor,
            days * MILLIS_PER_DAY,
        )))
    }
}

struct DatePastGenerator;

impl Generator for DatePastGenerator {
    fn id(&self) -> &str {
        "datePast"
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        let years = call.option_i64("years").unwrap_or(DEFAULT_PAST_YEARS);
        let anchor = call.reference_time;
        Ok(Value::String(instant_before(
            call.rng,
            anchor,
            years * 365 * MILLIS_PER_DAY,
        )))
    }
}

struct BooleanWeightedGenerator;

impl Generator for BooleanWeightedGenerator {
    fn id(&self) -> &str {
        "booleanWeighted"
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        let probability = call.option_f64("probability").unwrap_or(0.5);
        Ok(Value::Bool(call.rng.boolean(probability)))
    }
}

struct IntRangeGenerator;

impl Generator for IntRangeGenerator {
    fn id(&self) -> &str {
        "intRange"
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        let min = call.option_i64("min").unwrap_or(DEFAULT_INT_MIN);
        let max = call.option_i64("max").unwrap_or(DEFAULT_INT_MAX);
        if min > max {
            return Err(GenerationError::Generator {
                id: self.id().to_string(),
                message: format!("min {min} is greater than max {max}"),
            });
        }
        Ok(json!(call.rng.next_int(min, max)))
    }
}

struct DecimalRangeGenerator;

impl Generator for DecimalRangeGenerator {
    fn id(&self) -> &str {
        "decimalRange"
    }

    fn generate(&self, call: &mut GeneratorCall<'_>) -> Result<Value, GenerationError> {
        let min = call.option_f64("min").unwrap_or(DEFAULT_DECIMAL_MIN);
        let max = call.option_f64("max").unwrap_or(DEFAULT_DECIMAL_MAX);
        let precision = call.option_i64("precision").unwrap_or(DEFAULT_DECIMAL_PRECISION);
        if min > max {
            return Err(GenerationError::Generator {
                id: self.id().to_string(),
                message: format!("min {min} is greater than max {max}"),
            });
        }
        let value = min + call.rng.next_f64() * (max - min);
        Ok(json!(round_to(value, precision)))
    }
}
