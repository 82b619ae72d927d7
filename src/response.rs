use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Decoded response body, chosen by content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ResponseBody {
    Json(serde_json::Value),
    /// Image payloads are summarized, never kept.
    Image { size: u64 },
    Text(String),
}

impl ResponseBody {
    /// Pretty JSON for structured bodies, the raw text otherwise.
    pub fn render(&self) -> String {
        match self {
            Self::Json(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
            Self::Image { size } => format!("[image, {}]", format_file_size(*size)),
            Self::Text(s) => s.clone(),
        }
    }
}

/// What the playground shows (and stores in history) for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
    /// Elapsed wall time in milliseconds.
    pub time: u64,
    pub size: usize,
    #[serde(default)]
    pub is_image: bool,
}

impl ResponseRecord {
    /// Synthetic status-0 record for anything that went wrong before a
    /// response arrived (transport failure, mock error, unreadable file, ...).
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            status_text: "Network Error".to_string(),
            headers: BTreeMap::new(),
            body: ResponseBody::Json(serde_json::json!({ "error": message.into() })),
            time: 0,
            size: 0,
            is_image: false,
        }
    }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    pub fn status_class(&self) -> StatusClass { StatusClass::of(self.status) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StatusClass {
    Success,
    Warning,
    Error,
    Info,
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            400..=499 => Self::Warning,
            500.. => Self::Error,
            _ => Self::Info,
        }
    }
}

/// `1536` -> `"1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(StatusClass::of(204), StatusClass::Success);
        assert_eq!(StatusClass::of(401), StatusClass::Warning);
        assert_eq!(StatusClass::of(503), StatusClass::Error);
        assert_eq!(StatusClass::of(0), StatusClass::Info);
        assert_eq!(StatusClass::of(302).to_string(), "info");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn network_error_record() {
        let r = ResponseRecord::network_error("boom");
        assert_eq!(r.status, 0);
        assert_eq!(r.status_text, "Network Error");
        assert_eq!(r.body, ResponseBody::Json(serde_json::json!({"error": "boom"})));
        assert!(!r.is_success());
    }

    #[test]
    fn record_survives_json() {
        let r = ResponseRecord {
            status: 200,
            status_text: "OK".into(),
            headers: BTreeMap::from([("content-type".into(), "image/png".into())]),
            body: ResponseBody::Image { size: 10 },
            time: 12,
            size: 10,
            is_image: true,
        };
        let back: ResponseRecord = serde_json::from_str(&serde_json::to_string(&r).unwrap()).unwrap();
        assert_eq!(back, r);
    }
}
