//! Camera add-on: still snapshots from cameras attached to the workspace

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::{Value, json};

use crate::error::{RerobotsError, RerobotsResult};
use crate::transport::ApiRequest;

use super::{Addon, AddonOutput, addon_path};

/// `cam` add-on
#[derive(Debug, Clone, Copy, Default)]
pub struct CamAddon;

/// Action payload requesting a snapshot from `camera_id`
pub fn snapshot_payload(camera_id: u32) -> Value {
    json!({ "camera_id": camera_id })
}

impl Addon for CamAddon {
    fn name(&self) -> &str {
        "cam"
    }

    fn action_request(&self, lease_id: &str, payload: &Value) -> RerobotsResult<ApiRequest> {
        let camera_id = payload
            .get("camera_id")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let mut request =
            ApiRequest::get(format!("{}/{camera_id}/img", addon_path(self.name(), lease_id)));
        if let Some(coding) = payload.get("coding").and_then(Value::as_str) {
            request = request.with_query("coding", coding);
        }
        if let Some(format) = payload.get("format").and_then(Value::as_str) {
            request = request.with_query("format", format);
        }
        Ok(request)
    }

    fn parse_action(&self, body: Value) -> RerobotsResult<AddonOutput> {
        let encoded = body
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| RerobotsError::decode("cam snapshot: missing `data`"))?;
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| RerobotsError::decode(format!("cam snapshot: {e}")))?;
        let format = body
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("jpeg")
            .to_string();

        Ok(AddonOutput::Image {
            format,
            data: Bytes::from(data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_route_uses_camera_id() {
        let request = CamAddon
            .action_request("c81613e1", &snapshot_payload(1))
            .expect("request builds");
        assert_eq!(request.path, "/addon/cam/c81613e1/1/img");

        let request = CamAddon
            .action_request("c81613e1", &json!({}))
            .expect("request builds");
        assert_eq!(request.path, "/addon/cam/c81613e1/0/img");
    }

    #[test]
    fn snapshot_bytes_pass_through() {
        let output = CamAddon
            .parse_action(json!({"data": STANDARD.encode(b"\xff\xd8\xff\xe0JFIF"), "format": "jpeg"}))
            .expect("snapshot decodes");
        assert_eq!(
            output.into_image().as_deref(),
            Some(&b"\xff\xd8\xff\xe0JFIF"[..])
        );
    }

    #[test]
    fn corrupt_snapshot_is_rejected() {
        let err = CamAddon
            .parse_action(json!({"data": "%%%not-base64%%%"}))
            .expect_err("invalid base64");
        assert!(matches!(err, RerobotsError::Decode { .. }));
    }
}
