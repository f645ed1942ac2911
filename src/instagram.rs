//! Instagram publishing over the private mobile API.
//!
//! Three calls per post: log in with username/password, push the JPEG to
//! `rupload_igphoto`, then `media/configure` it as a feed post with a caption.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, info};
use url::Url;

use crate::config::InstagramCredentials;
use crate::constants::{INSTAGRAM_APP_ID, INSTAGRAM_USER_AGENT};
use crate::error::PublishError;

/// What Instagram gave back for a finished post.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishedMedia {
    /// Media primary key
    pub id: String,
    /// Shortcode used in `instagram.com/p/<code>` links
    pub code: Option<String>,
}

/// Posts an image with a caption, the seam the pipeline is tested through.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Logs in and posts `image_path` with `caption`.
    async fn publish(
        &self,
        credentials: &InstagramCredentials,
        image_path: &Path,
        caption: &str,
    ) -> Result<PublishedMedia, PublishError>;
}

/// Publishes and logs the outcome, separating login problems from everything else.
pub async fn upload_to_instagram<P: Publisher + ?Sized>(
    publisher: &P,
    credentials: &InstagramCredentials,
    image_path: &Path,
    caption: &str,
) -> Result<PublishedMedia, PublishError> {
    let result = publisher.publish(credentials, image_path, caption).await;
    match &result {
        Ok(media) => info!(
            "Successfully uploaded '{}' to Instagram (media {}).",
            image_path.display(),
            media.id
        ),
        Err(PublishError::LoginRequired(message)) => error!(
            "Instagram login required. Please check your credentials or session. ({message})"
        ),
        Err(err) => error!("An unexpected error occurred during Instagram upload: {err}"),
    }
    result
}

// -----------------------------
// Wire types
// -----------------------------

/// Fields every mobile API response may carry.
#[derive(Debug, Default, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    invalid_credentials: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    logged_in_user: LoggedInUser,
}

#[derive(Debug, Deserialize)]
struct LoggedInUser {
    pk: Value,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_id: Value,
}

#[derive(Debug, Deserialize)]
struct ConfigureResponse {
    media: MediaItem,
}

#[derive(Debug, Deserialize)]
struct MediaItem {
    pk: Value,
    #[serde(default)]
    code: Option<String>,
}

/// Session obtained from a successful login.
#[derive(Debug)]
struct Session {
    user_id: String,
    authorization: Option<String>,
}

const LOGIN_REQUIRED_MESSAGES: &[&str] = &[
    "login_required",
    "challenge_required",
    "checkpoint_required",
];

const LOGIN_ERROR_TYPES: &[&str] = &["bad_password", "invalid_user", "invalid_credentials"];

/// Ids come back as numbers or strings depending on the endpoint.
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turns a failed response into the matching [`PublishError`].
fn classify_failure(step: &'static str, status: reqwest::StatusCode, body: &[u8]) -> PublishError {
    let parsed: ApiStatus = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .clone()
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    let login_required = matches!(status.as_u16(), 401 | 403)
        || parsed.invalid_credentials.unwrap_or(false)
        || parsed
            .message
            .as_deref()
            .is_some_and(|m| LOGIN_REQUIRED_MESSAGES.contains(&m))
        || parsed
            .error_type
            .as_deref()
            .is_some_and(|t| LOGIN_ERROR_TYPES.contains(&t));

    if login_required {
        PublishError::LoginRequired(message)
    } else {
        PublishError::Rejected {
            step,
            status,
            message,
        }
    }
}

/// Headers and body of a successful response, or the classified failure.
async fn checked_body(
    step: &'static str,
    resp: reqwest::Response,
) -> Result<(HeaderMap, Vec<u8>), PublishError> {
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.bytes().await?.to_vec();

    if !status.is_success() {
        return Err(classify_failure(step, status, &body));
    }
    // 200 with "status": "fail" happens too.
    let parsed: ApiStatus = serde_json::from_slice(&body).unwrap_or_default();
    if parsed.status.as_deref() == Some("fail") {
        return Err(classify_failure(step, status, &body));
    }
    Ok((headers, body))
}

// -----------------------------
// Client
// -----------------------------

/// Instagram mobile API client. Holds no session between posts.
#[derive(Clone, Debug)]
pub struct InstagramClient {
    client: reqwest::Client,
    endpoint: Url,
    device_id: String,
    phone_id: String,
}

impl InstagramClient {
    /// Wraps a shared HTTP client, generating fresh device identifiers.
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        let device = uuid::Uuid::new_v4().simple().to_string();
        Self {
            client,
            endpoint,
            device_id: format!("android-{}", &device[..16]),
            phone_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.as_str().trim_end_matches('/'), path)
    }

    fn headers(&self, session: Option<&Session>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(INSTAGRAM_USER_AGENT),
        );
        headers.insert("x-ig-app-id", HeaderValue::from_static(INSTAGRAM_APP_ID));
        if let Ok(value) = HeaderValue::from_str(&self.device_id) {
            headers.insert("x-ig-android-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.phone_id) {
            headers.insert("x-ig-device-id", value);
        }
        if let Some(auth) = session.and_then(|s| s.authorization.as_deref())
            && let Ok(value) = HeaderValue::from_str(auth)
        {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        headers
    }

    /// Sends a `signed_body` form post and returns the raw success body.
    async fn signed_post(
        &self,
        step: &'static str,
        path: &str,
        session: Option<&Session>,
        payload: &Value,
    ) -> Result<(HeaderMap, Vec<u8>), PublishError> {
        let signed_body = format!("SIGNATURE.{payload}");
        let resp = self
            .client
            .post(self.url(path))
            .headers(self.headers(session))
            .form(&[("signed_body", signed_body)])
            .send()
            .await?;
        checked_body(step, resp).await
    }

    async fn login(&self, credentials: &InstagramCredentials) -> Result<Session, PublishError> {
        let timestamp = chrono::Utc::now().timestamp();
        let payload = json!({
            "username": credentials.username,
            "enc_password": format!("#PWD_INSTAGRAM:0:{timestamp}:{}", credentials.password),
            "device_id": self.device_id,
            "phone_id": self.phone_id,
            "guid": self.phone_id,
            "login_attempt_count": "0",
        });

        let (headers, body) = self
            .signed_post("login", "api/v1/accounts/login/", None, &payload)
            .await?;
        let parsed: LoginResponse = serde_json::from_slice(&body)?;

        let authorization = headers
            .get("ig-set-authorization")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if authorization.is_none() {
            debug!("Login response carried no ig-set-authorization header");
        }

        Ok(Session {
            user_id: id_string(&parsed.logged_in_user.pk),
            authorization,
        })
    }

    async fn upload_photo(&self, session: &Session, jpeg: Vec<u8>) -> Result<String, PublishError> {
        let upload_id = chrono::Utc::now().timestamp_millis().to_string();
        let upload_name = format!("{upload_id}_0_{}", rand::random::<u32>());
        let rupload_params = json!({
            "retry_context": r#"{"num_step_auto_retry":0,"num_reupload":0,"num_step_manual_retry":0}"#,
            "media_type": "1",
            "xsharing_user_ids": "[]",
            "upload_id": upload_id,
            "image_compression": r#"{"lib_name":"moz","lib_version":"3.1.m","quality":"80"}"#,
        });

        let mut headers = self.headers(Some(session));
        let extra = [
            ("x-instagram-rupload-params", rupload_params.to_string()),
            ("x-entity-type", "image/jpeg".to_string()),
            ("x-entity-name", upload_name.clone()),
            ("x-entity-length", jpeg.len().to_string()),
            ("offset", "0".to_string()),
        ];
        for (name, value) in extra {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );

        let resp = self
            .client
            .post(self.url(&format!("rupload_igphoto/{upload_name}")))
            .headers(headers)
            .body(jpeg)
            .send()
            .await?;
        let (_, body) = checked_body("photo upload", resp).await?;
        let parsed: UploadResponse = serde_json::from_slice(&body)?;
        Ok(id_string(&parsed.upload_id))
    }

    async fn configure(
        &self,
        session: &Session,
        upload_id: &str,
        caption: &str,
    ) -> Result<PublishedMedia, PublishError> {
        let payload = json!({
            "upload_id": upload_id,
            "caption": caption,
            "source_type": "4",
            "timezone_offset": "0",
            "_uid": session.user_id,
            "_uuid": self.phone_id,
            "device_id": self.device_id,
        });
        let (_, body) = self
            .signed_post("configure", "api/v1/media/configure/", Some(session), &payload)
            .await?;
        let parsed: ConfigureResponse = serde_json::from_slice(&body)?;
        Ok(PublishedMedia {
            id: id_string(&parsed.media.pk),
            code: parsed.media.code,
        })
    }
}

#[async_trait]
impl Publisher for InstagramClient {
    async fn publish(
        &self,
        credentials: &InstagramCredentials,
        image_path: &Path,
        caption: &str,
    ) -> Result<PublishedMedia, PublishError> {
        let jpeg = tokio::fs::read(image_path)
            .await
            .map_err(|source| PublishError::Io {
                path: image_path.to_path_buf(),
                source,
            })?;

        info!("Attempting to log in to Instagram...");
        let session = self.login(credentials).await?;
        info!("Login successful. Uploading photo...");
        let upload_id = self.upload_photo(&session, jpeg).await?;
        debug!("Photo uploaded with upload_id {upload_id}, configuring post");
        self.configure(&session, &upload_id, caption).await
    }
}
