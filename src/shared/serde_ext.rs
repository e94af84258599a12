use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Reads a nullable string and hands it to `parser`. `null` yields
/// `T::default()`; parser errors name the offending value.
pub fn parse_nullable_via_string<'de, D, T, F>(
    deserializer: D,
    kind: &str,
    parser: F,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default,
    F: FnOnce(&str) -> Result<T, String>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(T::default()),
        Some(raw) => {
            parser(&raw).map_err(|err| D::Error::custom(format!("invalid {kind} `{raw}`: {err}")))
        }
    }
}
