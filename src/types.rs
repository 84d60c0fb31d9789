use serde::{Deserialize, Serialize};

/// Inbound request body for POST /api/generate.
/// `prompt` is validated (present, non-empty after trim) in the handler so
/// a missing field yields our 400 body instead of a serde rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Optional reference hardware table, free text. Forwarded to the
    /// provider as advisory context; absence is not an error.
    #[serde(default)]
    pub hardware_data: Option<String>,
}

/// One recommended component. The provider emits an ordered sequence of
/// exactly this shape; both fields are required at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub component_name: String,
    pub component_description: String,
}

/// Structured error body returned for every failure class.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}
