use crate::scanner::detection::{self, CATEGORY, DetectRequest, DetectionOutcome, Reason};
use crate::scanner::resources::Resources;
use crate::utils::logging::*;
use actix_web::{Error, HttpResponse, Responder, Scope, post, web};
use serde::Serialize;
use serde_json::Number;
use uuid::Uuid;

pub fn initialize(max_payload_size: usize) -> Scope {
    web::scope("/detect")
        .app_data(web::JsonConfig::default().limit(max_payload_size))
        .service(detect)
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    item_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl From<DetectionOutcome> for DetectResponse {
    fn from(value: DetectionOutcome) -> Self {
        match value {
            DetectionOutcome::Detected { name, price, confidence } => Self {
                item_found: true,
                name: Some(name),
                price: Some(price),
                category: Some(CATEGORY),
                confidence: Some(confidence),
                reason: None,
            },
            DetectionOutcome::NotDetected { reason } => Self {
                item_found: false,
                name: None,
                price: None,
                category: None,
                confidence: None,
                reason: Some(reason.to_string()),
            },
        }
    }
}

// Every outcome, including a body that failed to parse, is answered with 200.
#[post("")]
async fn detect(resources: web::Data<Resources>, request: Result<web::Json<DetectRequest>, Error>) -> impl Responder {
    let request_id = Uuid::new_v4();
    let outcome = match request {
        _ if resources.detector().is_none() => DetectionOutcome::not_detected(Reason::ModelUnavailable),
        Ok(request) => run_detection(resources, request.into_inner(), request_id).await,
        Err(err) => {
            logging_warning!(NetworkEntry::RequestRejected(err.to_string()), format!("Request: {}", request_id));
            DetectionOutcome::failure(err)
        }
    };
    HttpResponse::Ok().json(DetectResponse::from(outcome))
}

async fn run_detection(resources: web::Data<Resources>, request: DetectRequest, request_id: Uuid) -> DetectionOutcome {
    match web::block(move || detection::detect(&resources, request)).await {
        Ok(Ok(outcome)) => {
            if let DetectionOutcome::Detected { name, confidence, .. } = &outcome {
                logging_information!(InferenceEntry::ItemDetected(name.clone(), *confidence), format!("Request: {}", request_id));
            }
            outcome
        }
        Ok(Err(err)) => {
            logging_error!(InferenceEntry::DetectionFailed(err.to_string()), format!("Request: {}", request_id));
            DetectionOutcome::from(err)
        }
        Err(err) => {
            logging_error!(InferenceEntry::DetectionFailed(err.to_string()), format!("Request: {}", request_id));
            DetectionOutcome::failure(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::catalog::Catalog;
    use crate::scanner::detector::tests::candidate;
    use crate::scanner::detector::{Candidate, Detector, DetectorError};
    use actix_web::http::StatusCode;
    use actix_web::http::header::ContentType;
    use actix_web::{App, test};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use serde_json::{Value, json};
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CATALOG: &str = r#"{
        "apple": {"alias": "Red Apple", "price": 3},
        "milk_carton": {"alias": "Whole Milk 1L", "price": 2.49}
    }"#;

    struct ScriptedDetector {
        result: Result<Vec<Candidate>, String>,
        calls: Arc<AtomicUsize>,
    }

    impl Detector for ScriptedDetector {
        fn detect(&self, _image: &DynamicImage) -> Result<Vec<Candidate>, DetectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(DetectorError::Inference)
        }
    }

    fn resources(result: Result<Vec<Candidate>, String>) -> (Resources, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = ScriptedDetector { result, calls: calls.clone() };
        let catalog = Catalog::parse(CATALOG).unwrap();
        (Resources::new(Some(Box::new(detector)), catalog), calls)
    }

    fn png_base64() -> String {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 30, 30])));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        STANDARD.encode(bytes.into_inner())
    }

    async fn send(resources: Resources, max_payload_size: usize, request: test::TestRequest) -> String {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(resources))
                .service(initialize(max_payload_size)),
        )
        .await;
        let response = test::call_service(&app, request.uri("/detect").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        String::from_utf8(test::read_body(response).await.to_vec()).unwrap()
    }

    async fn post_json(resources: Resources, body: Value) -> Value {
        let body = send(resources, 1024 * 1024, test::TestRequest::post().set_json(body)).await;
        serde_json::from_str(&body).unwrap()
    }

    fn reason(body: &Value) -> &str {
        assert_eq!(body["itemFound"], json!(false));
        body["reason"].as_str().unwrap()
    }

    #[actix_web::test]
    async fn detected_item_is_reported_with_catalog_entry() {
        let (resources, _) = resources(Ok(vec![candidate("apple", 0.75)]));
        let request = test::TestRequest::post().set_json(json!({"image": png_base64()}));
        let body = send(resources, 1024 * 1024, request).await;
        assert_eq!(body, r#"{"itemFound":true,"name":"Red Apple","price":3,"category":"Groceries","confidence":0.75}"#);
    }

    #[actix_web::test]
    async fn data_url_header_is_accepted() {
        let (resources, _) = resources(Ok(vec![candidate("milk_carton", 0.875)]));
        let image = format!("data:image/png;base64,{}", png_base64());
        let body = post_json(resources, json!({"image": image})).await;
        assert_eq!(body, json!({"itemFound": true, "name": "Whole Milk 1L", "price": 2.49, "category": "Groceries", "confidence": 0.875}));
    }

    #[actix_web::test]
    async fn best_candidate_wins() {
        let candidates = vec![candidate("milk_carton", 0.625), candidate("apple", 0.875), candidate("milk_carton", 0.75)];
        let (resources, _) = resources(Ok(candidates));
        let body = post_json(resources, json!({"image": png_base64()})).await;
        assert_eq!(body["name"], json!("Red Apple"));
        assert_eq!(body["confidence"], json!(0.875));
    }

    #[actix_web::test]
    async fn missing_model_is_reported_before_anything_else() {
        let resources = Resources::new(None, Catalog::parse(CATALOG).unwrap());
        let request = test::TestRequest::post().insert_header(ContentType::json()).set_payload("{ not json");
        let body: Value = serde_json::from_str(&send(resources, 1024 * 1024, request).await).unwrap();
        assert_eq!(body, json!({"itemFound": false, "reason": "Server Error: model file missing"}));
    }

    #[actix_web::test]
    async fn absent_or_empty_image_is_not_decoded() {
        for request in [json!({}), json!({"image": ""}), json!({"image": null}), json!({"image": "data:image/png;base64,"})] {
            let (resources, calls) = resources(Ok(vec![candidate("apple", 0.75)]));
            let body = post_json(resources, request).await;
            assert_eq!(body, json!({"itemFound": false, "reason": "No image data sent"}));
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[actix_web::test]
    async fn unknown_fields_are_ignored() {
        let (resources, _) = resources(Ok(vec![candidate("apple", 0.75)]));
        let body = post_json(resources, json!({"image": png_base64(), "device": "till-3"})).await;
        assert_eq!(body["itemFound"], json!(true));
    }

    #[actix_web::test]
    async fn scores_at_or_below_floor_are_not_reported() {
        let (resources, _) = resources(Ok(vec![candidate("apple", 0.5), candidate("milk_carton", 0.25)]));
        let body = post_json(resources, json!({"image": png_base64()})).await;
        assert_eq!(body, json!({"itemFound": false, "reason": "No item detected"}));
    }

    #[actix_web::test]
    async fn class_missing_from_catalog_is_not_reported() {
        let (resources, _) = resources(Ok(vec![candidate("banana", 0.875), candidate("apple", 0.75)]));
        let body = post_json(resources, json!({"image": png_base64()})).await;
        assert_eq!(body, json!({"itemFound": false, "reason": "No item detected"}));
    }

    #[actix_web::test]
    async fn invalid_base64_is_a_failure() {
        let (resources, calls) = resources(Ok(vec![]));
        let body = post_json(resources, json!({"image": "@@not base64@@"})).await;
        assert!(reason(&body).starts_with("Invalid base64 payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn undecodable_image_is_a_failure() {
        let (resources, _) = resources(Ok(vec![]));
        let body = post_json(resources, json!({"image": STANDARD.encode("plain text")})).await;
        assert!(reason(&body).starts_with("Invalid image"));
    }

    #[actix_web::test]
    async fn inference_error_is_a_failure() {
        let (resources, _) = resources(Err("device lost".to_string()));
        let body = post_json(resources, json!({"image": png_base64()})).await;
        assert_eq!(reason(&body), "Inference failed: device lost");
    }

    #[actix_web::test]
    async fn malformed_body_is_answered_with_a_reason() {
        let (resources, _) = resources(Ok(vec![]));
        let request = test::TestRequest::post().insert_header(ContentType::json()).set_payload("{ not json");
        let body: Value = serde_json::from_str(&send(resources, 1024 * 1024, request).await).unwrap();
        assert!(!reason(&body).is_empty());
    }

    #[actix_web::test]
    async fn wrong_content_type_is_answered_with_a_reason() {
        let (resources, _) = resources(Ok(vec![]));
        let request = test::TestRequest::post().insert_header(ContentType::plaintext()).set_payload(r#"{"image": ""}"#);
        let body: Value = serde_json::from_str(&send(resources, 1024 * 1024, request).await).unwrap();
        assert!(!reason(&body).is_empty());
    }

    #[actix_web::test]
    async fn oversized_body_is_answered_with_a_reason() {
        let (resources, calls) = resources(Ok(vec![candidate("apple", 0.75)]));
        let request = test::TestRequest::post().set_json(json!({"image": png_base64()}));
        let body: Value = serde_json::from_str(&send(resources, 16, request).await).unwrap();
        assert!(!reason(&body).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn identical_requests_get_identical_answers() {
        let image = png_base64();
        let (first, _) = resources(Ok(vec![candidate("apple", 0.75)]));
        let (second, _) = resources(Ok(vec![candidate("apple", 0.75)]));
        let first = send(first, 1024 * 1024, test::TestRequest::post().set_json(json!({"image": image}))).await;
        let second = send(second, 1024 * 1024, test::TestRequest::post().set_json(json!({"image": image}))).await;
        assert_eq!(first, second);
    }

    #[actix_web::test]
    async fn data_url_payload_ends_at_the_next_comma() {
        let (resources, calls) = resources(Ok(vec![candidate("apple", 0.75)]));
        let body = post_json(resources, json!({"image": "data:image/png;base64,,AAAA"})).await;
        assert_eq!(body, json!({"itemFound": false, "reason": "No image data sent"}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let (resources, _) = self::resources(Ok(vec![candidate("apple", 0.75)]));
        let image = format!("data:image/png;base64,{},trailing", png_base64());
        let body = post_json(resources, json!({"image": image})).await;
        assert_eq!(body["itemFound"], json!(true));
    }

    #[actix_web::test]
    async fn non_string_image_is_answered_with_a_reason() {
        for request in [json!({"image": 42}), json!({"image": ["AAAA"]}), json!({"image": {"data": "AAAA"}})] {
            let (resources, calls) = resources(Ok(vec![candidate("apple", 0.75)]));
            let body = post_json(resources, request).await;
            assert!(!reason(&body).is_empty());
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[actix_web::test]
    async fn retained_log_stays_bounded_under_repeated_failures() {
        for _ in 0..64 {
            let (resources, _) = resources(Ok(vec![]));
            post_json(resources, json!({"image": "@@"})).await;
        }
        assert!(Logger::get_system_logs().await.len() <= Logger::capacity().await);
    }
}
