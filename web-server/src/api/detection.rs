// web-server/src/api/detection.rs
use actix::Addr;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use rand::Rng;
use roadnet_common::models::detection::{DetectionRecord, DetectionRequest};
use uuid::Uuid;

use crate::detection_registry::{DetectionRegistryActor, GetDetection, StoreDetection};
use crate::error::DetectionError;

// Cracks reported per image: 0..=9
const MAX_CRACKS: u32 = 9;
const DEFAULT_FILENAME: &str = "upload";
// Upper bound for base64 image uploads
const DEFAULT_UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

/// Overrides the upload size limit when registered as app data
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

async fn read_upload(mut payload: web::Payload, limit: usize) -> Result<web::Bytes, DetectionError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| DetectionError::Upload(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(DetectionError::UploadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// Strip an optional `data:<mime>;base64,` prefix and decode
pub fn decode_image(raw: &str) -> Result<Vec<u8>, DetectionError> {
    let raw = raw.trim();
    let encoded = match raw.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or(DetectionError::InvalidImage)?,
        None => raw,
    };
    if encoded.is_empty() {
        return Err(DetectionError::MissingImage);
    }

    let bytes = base64::decode(encoded).map_err(|_| DetectionError::InvalidImage)?;
    if bytes.is_empty() {
        return Err(DetectionError::InvalidImage);
    }
    Ok(bytes)
}

/// Synthetic analysis: a crack count and a confidence that is zero when nothing was found
pub fn analyze<R: Rng + ?Sized>(rng: &mut R) -> (u32, f64) {
    let crack_count = rng.gen_range(0..=MAX_CRACKS);
    let confidence = if crack_count > 0 {
        (rng.gen_range(0.6..1.0_f64) * 100.0).round() / 100.0
    } else {
        0.0
    };
    (crack_count, confidence)
}

#[post("/crack-detection")]
pub async fn upload(
    req: HttpRequest,
    payload: web::Payload,
    registry: web::Data<Addr<DetectionRegistryActor>>,
) -> Result<HttpResponse, DetectionError> {
    let limit = req
        .app_data::<UploadLimit>()
        .map_or(DEFAULT_UPLOAD_LIMIT, |limit| limit.0);
    let body = read_upload(payload, limit).await?;

    // Anything that isn't an object with an image counts as a missing image
    let request: DetectionRequest = serde_json::from_slice(&body).unwrap_or_default();
    let image = request.image.ok_or(DetectionError::MissingImage)?;
    let bytes = decode_image(&image)?;

    let (crack_count, confidence) = analyze(&mut rand::thread_rng());
    let filename = request
        .filename
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let record = DetectionRecord::new(filename, crack_count, confidence);

    tracing::info!(
        "Analyzed {} ({} bytes): {} cracks, confidence {}",
        record.filename,
        bytes.len(),
        crack_count,
        confidence
    );

    registry.send(StoreDetection { record: record.clone() }).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[get("/crack-detection/{id}")]
pub async fn get_result(
    path: web::Path<(String,)>,
    registry: web::Data<Addr<DetectionRegistryActor>>,
) -> Result<HttpResponse, DetectionError> {
    let id = Uuid::parse_str(&path.0).map_err(|_| DetectionError::NotFound)?;

    match registry.send(GetDetection { id }).await? {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Err(DetectionError::NotFound),
    }
}
