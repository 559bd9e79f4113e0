use serde::{Deserialize, Serialize};

/// A decoded upload, valid for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct Photo {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Structured styling advice produced by the analysis call. All fields are
/// required and written in Korean per the upstream prompt contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleAdvice {
    pub style_name: String,
    pub technique: String,
    pub growth_guide: String,
    pub styling_tips: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Salon {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Payload of a successful `/api/process` call. `simulation` is a data URI
/// when image generation succeeded and `null` when it degraded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessData {
    pub simulation: Option<String>,
    pub advice: StyleAdvice,
    pub salons: Vec<Salon>,
}
