//! Utilities for deserializing some common structures

use core::fmt;
use core::time::Duration;

use serde::de::{self, Visitor};
use serde::{Deserialize as _, Deserializer};

/// Decode [`Duration`] assuming that the underlying number is representation of duration in
/// seconds
///
/// # Errors
/// When the provided number cannot be deserialized into an `u64`
pub fn duration_secs_decode<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw_number = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(raw_number))
}

/// Decode an optional value that may be written either as a string or as an integer into an
/// `Option<String>`.
///
/// Chat ids are negative integers for groups but are usually passed around as strings, and
/// homework ids come back as numbers from some API versions.
///
/// # Errors
/// When the value is neither a string, an integer nor null
pub fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> Visitor<'de> for StringOrNumber {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a string or an integer")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(value.to_owned()))
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(
            self,
            deserializer: D2,
        ) -> Result<Self::Value, D2::Error> {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
