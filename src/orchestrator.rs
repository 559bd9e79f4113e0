//! Request orchestration: decode the multipart body, validate the photo
//! pair, fan out to the upstream gateway and assemble the response payload.
//!
//! Failure asymmetry: analysis is mandatory, simulation runs in parallel but
//! is best-effort, and salon search runs after analysis (it needs the style
//! name) and only when the client sent coordinates.

use tracing::info;

use crate::error::ApiError;
use crate::gemini::StyleGateway;
use crate::multipart::{self, FilePart, FormData};
use crate::types::{Photo, ProcessData};

pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
const CURRENT_PHOTO_FIELD: &str = "currentPhoto";
const DESIRED_PHOTO_FIELD: &str = "desiredPhoto";

/// Full pipeline behind `POST /api/process`.
pub async fn process<G: StyleGateway>(
    gateway: &G,
    body: &[u8],
    content_type: &str,
) -> Result<ProcessData, ApiError> {
    let mut form = multipart::parse(body, content_type)?;
    let (current, desired) = extract_photos(&mut form)?;
    let location = parse_location(&form);

    let (advice, simulation) = tokio::join!(
        gateway.analyze(&current, &desired),
        gateway.simulate(&current, &desired),
    );
    let advice = advice?;

    let salons = match location {
        Some((lat, lng)) if !advice.style_name.trim().is_empty() => {
            info!("searching salons for style: {}", advice.style_name);
            gateway.find_salons(&advice.style_name, lat, lng).await
        }
        _ => Vec::new(),
    };

    Ok(ProcessData {
        simulation,
        advice,
        salons,
    })
}

/// Pulls the two required photo parts out of a decoded form and validates
/// size and image type. Shared by `/api/process`, `/api/simulate` and
/// `/api/analyze`.
pub fn extract_photos(form: &mut FormData) -> Result<(Photo, Photo), ApiError> {
    let (Some(current), Some(desired)) = (
        form.files.remove(CURRENT_PHOTO_FIELD),
        form.files.remove(DESIRED_PHOTO_FIELD),
    ) else {
        return Err(ApiError::Validation(
            "Both currentPhoto and desiredPhoto are required".to_string(),
        ));
    };

    Ok((
        validate_photo(CURRENT_PHOTO_FIELD, current)?,
        validate_photo(DESIRED_PHOTO_FIELD, desired)?,
    ))
}

fn validate_photo(name: &str, part: FilePart) -> Result<Photo, ApiError> {
    if part.bytes.is_empty() {
        return Err(ApiError::Validation(format!("{name} is empty")));
    }
    if part.bytes.len() > MAX_PHOTO_BYTES {
        return Err(ApiError::Validation(format!(
            "{name} exceeds the 10MB size limit"
        )));
    }

    let mime_type = resolve_mime_type(&part);
    if !ALLOWED_IMAGE_TYPES.contains(&mime_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "{name} must be a JPEG, PNG, or WebP image"
        )));
    }

    Ok(Photo {
        bytes: part.bytes,
        mime_type,
    })
}

/// Prefers the declared part type; when that is missing or not an accepted
/// image type (browsers occasionally send application/octet-stream), falls
/// back to sniffing the payload.
fn resolve_mime_type(part: &FilePart) -> String {
    let declared = normalize_mime_type(&part.mime_type);
    if ALLOWED_IMAGE_TYPES.contains(&declared.as_str()) {
        return declared;
    }
    infer::get(&part.bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or(declared)
}

fn normalize_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

/// Both coordinates must be present and parse as floats; anything else means
/// "no location provided" and is not an error.
fn parse_location(form: &FormData) -> Option<(f64, f64)> {
    let lat = form.fields.get("lat")?.trim().parse::<f64>().ok()?;
    let lng = form.fields.get("lng")?.trim().parse::<f64>().ok()?;
    Some((lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        jpeg_file_part, multipart_body, multipart_content_type, text_part, MockGateway,
    };

    fn both_photos() -> Vec<Vec<u8>> {
        vec![
            jpeg_file_part(CURRENT_PHOTO_FIELD),
            jpeg_file_part(DESIRED_PHOTO_FIELD),
        ]
    }

    #[tokio::test]
    async fn happy_path_without_location_skips_salon_search() {
        let gateway = MockGateway::succeeding();
        let body = multipart_body(both_photos());

        let data = process(&gateway, &body, &multipart_content_type())
            .await
            .unwrap();

        assert!(data.simulation.is_some());
        assert!(!data.advice.style_name.is_empty());
        assert!(data.salons.is_empty());
        assert_eq!(gateway.analyze_calls(), 1);
        assert_eq!(gateway.simulate_calls(), 1);
        assert_eq!(gateway.salon_calls(), 0);
    }

    #[tokio::test]
    async fn location_triggers_salon_search_after_analysis() {
        let gateway = MockGateway::succeeding();
        let mut parts = both_photos();
        parts.push(text_part("lat", "37.5"));
        parts.push(text_part("lng", "127.0"));
        let body = multipart_body(parts);

        let data = process(&gateway, &body, &multipart_content_type())
            .await
            .unwrap();

        assert_eq!(gateway.salon_calls(), 1);
        assert!(!data.salons.is_empty());
    }

    #[tokio::test]
    async fn missing_photo_fails_before_any_upstream_call() {
        let gateway = MockGateway::succeeding();
        let body = multipart_body(vec![jpeg_file_part(CURRENT_PHOTO_FIELD)]);

        let err = process(&gateway, &body, &multipart_content_type())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(gateway.analyze_calls(), 0);
        assert_eq!(gateway.simulate_calls(), 0);
        assert_eq!(gateway.salon_calls(), 0);
    }

    #[tokio::test]
    async fn analysis_failure_fails_the_request_even_if_simulation_succeeds() {
        let gateway = MockGateway::with_failing_analysis();
        let body = multipart_body(both_photos());

        let err = process(&gateway, &body, &multipart_content_type())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Upstream { .. }));
        assert_eq!(gateway.simulate_calls(), 1);
        assert_eq!(gateway.salon_calls(), 0);
    }

    #[tokio::test]
    async fn simulation_failure_degrades_to_null() {
        let gateway = MockGateway::succeeding().without_simulation();
        let body = multipart_body(both_photos());

        let data = process(&gateway, &body, &multipart_content_type())
            .await
            .unwrap();

        assert!(data.simulation.is_none());
        assert!(!data.advice.technique.is_empty());
    }

    #[tokio::test]
    async fn unparseable_coordinates_mean_no_location() {
        let gateway = MockGateway::succeeding();
        let mut parts = both_photos();
        parts.push(text_part("lat", "not-a-number"));
        parts.push(text_part("lng", "127.0"));
        let body = multipart_body(parts);

        let data = process(&gateway, &body, &multipart_content_type())
            .await
            .unwrap();

        assert_eq!(gateway.salon_calls(), 0);
        assert!(data.salons.is_empty());
    }

    #[tokio::test]
    async fn oversized_photo_is_rejected() {
        let gateway = MockGateway::succeeding();
        let mut oversized = vec![0xFF, 0xD8, 0xFF, 0xE0];
        oversized.resize(MAX_PHOTO_BYTES + 1, 0);
        let parts = vec![
            crate::test_utils::file_part(CURRENT_PHOTO_FIELD, "big.jpg", "image/jpeg", &oversized),
            jpeg_file_part(DESIRED_PHOTO_FIELD),
        ];

        let err = process(&gateway, &multipart_body(parts), &multipart_content_type())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(gateway.analyze_calls(), 0);
    }

    #[tokio::test]
    async fn non_image_part_is_rejected() {
        let gateway = MockGateway::succeeding();
        let parts = vec![
            crate::test_utils::file_part(CURRENT_PHOTO_FIELD, "note.txt", "text/plain", b"hello"),
            jpeg_file_part(DESIRED_PHOTO_FIELD),
        ];

        let err = process(&gateway, &multipart_body(parts), &multipart_content_type())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn declared_jpg_alias_normalizes_to_jpeg() {
        let part = FilePart {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            mime_type: "image/JPG".to_string(),
        };
        assert_eq!(resolve_mime_type(&part), "image/jpeg");
    }

    #[test]
    fn octet_stream_falls_back_to_sniffed_type() {
        let part = FilePart {
            bytes: b"\x89PNG\r\n\x1a\n0000000000".to_vec(),
            mime_type: "application/octet-stream".to_string(),
        };
        assert_eq!(resolve_mime_type(&part), "image/png");
    }
}
