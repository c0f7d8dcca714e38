//! Content snapshot records

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PNG_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Ok,
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPayload {
    Html(String),
    Image {
        data: Vec<u8>,
        content_type: String,
    },
    /// No payload; only produced alongside an Error status.
    Empty,
}

/// Point-in-time capture from one tab. Ephemeral: produced, returned, gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub tab_id: String,
    pub retrieved_at: DateTime<Utc>,
    pub payload: SnapshotPayload,
    pub status: SnapshotStatus,
}

impl ContentSnapshot {
    pub fn html(tab_id: &str, html: String) -> Self {
        Self {
            tab_id: tab_id.to_string(),
            retrieved_at: Utc::now(),
            payload: SnapshotPayload::Html(html),
            status: SnapshotStatus::Ok,
        }
    }

    pub fn image(tab_id: &str, data: Vec<u8>) -> Self {
        Self {
            tab_id: tab_id.to_string(),
            retrieved_at: Utc::now(),
            payload: SnapshotPayload::Image {
                data,
                content_type: PNG_CONTENT_TYPE.to_string(),
            },
            status: SnapshotStatus::Ok,
        }
    }

    pub fn error(tab_id: &str, message: String) -> Self {
        Self {
            tab_id: tab_id.to_string(),
            retrieved_at: Utc::now(),
            payload: SnapshotPayload::Empty,
            status: SnapshotStatus::Error(message),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SnapshotStatus::Ok
    }

    /// Image payload encoded as a data URI, for JSON transports.
    pub fn data_uri(&self) -> Option<String> {
        match &self.payload {
            SnapshotPayload::Image { data, content_type } => {
                Some(format!("data:{};base64,{}", content_type, BASE64.encode(data)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_snapshot_is_ok() {
        let snapshot = ContentSnapshot::html("tab-1", "<html></html>".into());
        assert!(snapshot.is_ok());
        assert!(snapshot.data_uri().is_none());
    }

    #[test]
    fn test_image_snapshot_data_uri() {
        let snapshot = ContentSnapshot::image("tab-1", vec![1, 2, 3]);
        let uri = snapshot.data_uri().unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_error_snapshot_carries_message() {
        let snapshot = ContentSnapshot::error("tab-1", "engine hiccup".into());
        assert!(!snapshot.is_ok());
        assert!(matches!(snapshot.payload, SnapshotPayload::Empty));
    }
}
