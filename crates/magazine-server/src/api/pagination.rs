use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::IntoParams;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 页码（从 1 开始，默认 1）
    #[param(required = false)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    pub page: Option<u64>,
    /// 每页条数（默认 15，最大 100）
    #[param(required = false)]
    #[serde(default, deserialize_with = "deserialize_optional_u64")]
    pub per_page: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum U64Input {
    Number(u64),
    Text(String),
}

/// Query strings deliver numbers as text; accept both forms.
pub fn deserialize_optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<U64Input>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(U64Input::Number(number)) => Ok(Some(number)),
        Some(U64Input::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(U64Input::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(DeError::custom),
    }
}

/// Same as [`deserialize_optional_u64`] for boolean filters (`?processed=true`).
pub fn deserialize_optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolInput {
        Bool(bool),
        Text(String),
    }

    match Option::<BoolInput>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolInput::Bool(b)) => Ok(Some(b)),
        Some(BoolInput::Text(text)) => match text.trim() {
            "" => Ok(None),
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            other => Err(DeError::custom(format!("invalid boolean '{other}'"))),
        },
    }
}

const DEFAULT_PER_PAGE: u64 = 15;
const MAX_PER_PAGE: u64 = 100;

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn limit(&self) -> u64 {
        self.per_page()
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_bounds() {
        let p = PaginationParams::default();
        assert_eq!((p.page(), p.per_page(), p.offset()), (1, 15, 0));

        let p = PaginationParams {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!((p.page(), p.per_page()), (1, 100));

        let p = PaginationParams {
            page: Some(3),
            per_page: Some(20),
        };
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn accepts_numeric_strings() {
        let p: PaginationParams =
            serde_json::from_value(serde_json::json!({"page": "2", "per_page": 5})).unwrap();
        assert_eq!(p.page(), 2);
        assert_eq!(p.per_page(), 5);
    }
}
