//! Live adapter that dispatches generation requests through the relay.

use reqwest::{Client, StatusCode, Url};

use crate::error::BlueprintError;
use crate::ports::generation::{
    GenerateFuture, GenerateRequest, GenerateResponse, GeneratedImage, GenerationBackend,
};

/// Relay route for generation requests.
pub const GENERATE_PATH: &str = "/api/generate";

const GENERIC_FAILURE: &str = "Generation failed";
const MISSING_IMAGE: &str = "Backend returned no image URL";
const INVALID_BODY: &str = "Invalid response from backend";

/// Posts JSON generation requests to the same-origin relay.
pub struct RelayDispatcher {
    client: Client,
    endpoint: Url,
    asset_origin: Url,
}

impl RelayDispatcher {
    /// Create a dispatcher for the relay at `relay_url`.
    ///
    /// Relative image locations in responses are resolved against
    /// `asset_origin`, or against the relay itself when that is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL cannot be parsed.
    pub fn new(relay_url: &str, asset_origin: Option<&str>) -> Result<Self, BlueprintError> {
        let relay = parse_url(relay_url)?;
        let endpoint = relay
            .join(GENERATE_PATH)
            .map_err(|e| BlueprintError::Config(format!("Invalid relay URL '{relay_url}': {e}")))?;
        let asset_origin = match asset_origin {
            Some(origin) => parse_url(origin)?,
            None => relay,
        };
        Ok(Self { client: Client::new(), endpoint, asset_origin })
    }
}

impl GenerationBackend for RelayDispatcher {
    fn generate(&self, request: &GenerateRequest) -> GenerateFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            tracing::debug!(
                endpoint = %self.endpoint,
                view_angle = %request.view_angle,
                style = %request.style,
                "dispatching generation request"
            );

            let response = self.client.post(self.endpoint.clone()).json(&request).send().await?;
            let status = response.status();
            let body = response.text().await?;

            let result = interpret_response(status, &body, &self.asset_origin);
            match &result {
                Ok(image) => {
                    tracing::info!(
                        url = %image.url,
                        seconds = image.processing_time,
                        "generation succeeded"
                    );
                }
                Err(e) => tracing::warn!(status = status.as_u16(), error = %e, "generation failed"),
            }
            result
        })
    }
}

/// Map a relay response into a generated image or a user-facing failure.
///
/// The body is parsed as JSON whatever the status. HTTP failure, a falsy
/// `success`, and `success` without an image all count as failures; the
/// backend's `detail` is preferred over the generic messages.
///
/// # Errors
///
/// Returns [`BlueprintError::Api`] for every failure case.
pub fn interpret_response(
    status: StatusCode,
    body: &str,
    asset_origin: &Url,
) -> Result<GeneratedImage, BlueprintError> {
    let code = status.as_u16();
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|_| BlueprintError::Api { status: code, message: INVALID_BODY.to_string() })?;

    let failure = |fallback: &str| BlueprintError::Api {
        status: code,
        message: parsed
            .detail
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string()),
    };

    if !status.is_success() || !parsed.success {
        return Err(failure(GENERIC_FAILURE));
    }

    let Some(image_url) = parsed.image_url.as_deref().filter(|u| !u.is_empty()) else {
        return Err(failure(MISSING_IMAGE));
    };

    let url = asset_origin.join(image_url).map_err(|e| BlueprintError::Api {
        status: code,
        message: format!("Invalid image URL '{image_url}': {e}"),
    })?;

    Ok(GeneratedImage {
        url: url.to_string(),
        processing_time: parsed.processing_time.unwrap_or(0.0),
    })
}

fn parse_url(raw: &str) -> Result<Url, BlueprintError> {
    Url::parse(raw).map_err(|e| BlueprintError::Config(format!("Invalid URL '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use crate::settings::{Style, ViewAngle};

    fn origin() -> Url {
        Url::parse("http://relay.test").unwrap()
    }

    fn message(err: BlueprintError) -> String {
        match err {
            BlueprintError::Api { message, .. } => message,
            other => panic!("expected API error, got {other}"),
        }
    }

    #[test]
    fn success_resolves_relative_url() {
        let image = interpret_response(
            StatusCode::OK,
            r#"{"success":true,"imageUrl":"/out/1.png","processingTime":12}"#,
            &origin(),
        )
        .unwrap();
        assert_eq!(image.url, "http://relay.test/out/1.png");
        assert!((image.processing_time - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn absolute_url_is_kept() {
        let image = interpret_response(
            StatusCode::OK,
            r#"{"success":true,"imageUrl":"https://cdn.example.com/a.png"}"#,
            &origin(),
        )
        .unwrap();
        assert_eq!(image.url, "https://cdn.example.com/a.png");
        assert!(image.processing_time.abs() < f64::EPSILON);
    }

    #[test]
    fn success_without_image_is_an_error() {
        let err = interpret_response(StatusCode::OK, r#"{"success":true}"#, &origin()).unwrap_err();
        assert_eq!(message(err), MISSING_IMAGE);

        let err = interpret_response(StatusCode::OK, r#"{"success":true,"imageUrl":""}"#, &origin())
            .unwrap_err();
        assert_eq!(message(err), MISSING_IMAGE);
    }

    #[test]
    fn logical_failure_uses_detail() {
        let err = interpret_response(
            StatusCode::OK,
            r#"{"success":false,"detail":"quota exceeded"}"#,
            &origin(),
        )
        .unwrap_err();
        assert_eq!(message(err), "quota exceeded");
    }

    #[test]
    fn http_failure_without_detail_is_generic() {
        let err = interpret_response(
            StatusCode::BAD_GATEWAY,
            r#"{"success":true,"imageUrl":"/x.png"}"#,
            &origin(),
        )
        .unwrap_err();
        match err {
            BlueprintError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, GENERIC_FAILURE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_body_is_an_error() {
        let err =
            interpret_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>", &origin())
                .unwrap_err();
        assert_eq!(message(err), INVALID_BODY);
    }

    #[test]
    fn rejects_malformed_relay_url() {
        assert!(matches!(RelayDispatcher::new("not a url", None), Err(BlueprintError::Config(_))));
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn posts_json_envelope_to_relay() {
        let app = Router::new().route(
            GENERATE_PATH,
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["image"], "data:image/png;base64,AAAA");
                assert_eq!(body["viewAngle"], "side");
                assert_eq!(body["style"], "technical");
                assert_eq!(body["description"], "two storey office");
                Json(json!({"success": true, "imageUrl": "/temp/out.png", "processingTime": 3.5}))
            }),
        );
        let base = spawn(app).await;

        let dispatcher = RelayDispatcher::new(&base, None).unwrap();
        let request = GenerateRequest {
            image: "data:image/png;base64,AAAA".into(),
            description: "two storey office".into(),
            view_angle: ViewAngle::Side,
            style: Style::Technical,
        };
        let image = dispatcher.generate(&request).await.unwrap();
        assert_eq!(image.url, format!("{base}/temp/out.png"));
        assert!((image.processing_time - 3.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn surfaces_backend_detail_on_error_status() {
        let app = Router::new().route(
            GENERATE_PATH,
            post(|| async {
                (AxumStatus::BAD_REQUEST, Json(json!({"success": false, "detail": "bad image"})))
            }),
        );
        let base = spawn(app).await;

        let dispatcher = RelayDispatcher::new(&base, Some("https://assets.example.com")).unwrap();
        let request = GenerateRequest {
            image: "data:image/png;base64,AAAA".into(),
            description: String::new(),
            view_angle: ViewAngle::Perspective,
            style: Style::Realistic,
        };
        let err = dispatcher.generate(&request).await.unwrap_err();
        match err {
            BlueprintError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad image");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
