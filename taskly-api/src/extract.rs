/// Request extractors
///
/// [`ApiJson`] and [`ApiPath`] behave like `axum::Json` and
/// `axum::extract::Path` but reject bad input with an [`ApiError`], so every
/// client error shares the same JSON shape.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON body extractor with `ApiError` rejections
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameter extractor with `ApiError` rejections
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Deserializes a field that distinguishes "absent" from "null"
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>` field: absent yields `None`, `null` yields
/// `Some(None)` and a value yields `Some(Some(value))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    <Option<T> as serde::Deserialize>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_tristate() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.description, None);

        let null: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Some(None));

        let value: Patch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(value.description, Some(Some("x".to_string())));
    }
}
