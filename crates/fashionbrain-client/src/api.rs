//! Typed helpers for the backend's endpoints.

use std::fmt;

use fashionbrain_core::{
    AckResponse, ActionRequest, ActionResponse, AuthSession, FashionBrainError, FeedResponse,
    LoginRequest, MeResponse, OnboardingRequest, RecommendRequest, RecommendResponse, Result,
    SignupOutcome, SignupRequest, User,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::ApiClient;
use crate::paths;

const DEFAULT_CONFIRMATION_MESSAGE: &str =
    "Account created! Please check your email to confirm your account.";

/// Destination of an image upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// Free-form image used to search for similar outfits.
    Search,
    /// Inspiration image collected during onboarding.
    Inspiration,
}

impl UploadTarget {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Search => paths::UPLOAD_IMAGE,
            Self::Inspiration => paths::INSPO_IMAGE,
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl ApiClient {
    /// Create an account.
    ///
    /// A pending email confirmation is a successful outcome, whether the
    /// backend reports it with a 2xx body or with a rejection the client
    /// reinterprets.
    pub async fn signup(&self, request: &SignupRequest) -> Result<SignupOutcome> {
        let value = self.post(paths::SIGNUP, request, None).await?;
        signup_outcome(value)
    }

    /// Sign in with email and password.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthSession> {
        let value = self.post(paths::LOGIN, request, None).await?;
        decode(value)
    }

    /// Fetch the user the token belongs to.
    pub async fn me(&self, token: &str) -> Result<User> {
        let value = self.get(paths::ME, Some(token)).await?;
        decode::<MeResponse>(value).map(|me| me.user)
    }

    /// Fetch up to `num_outfits` personalised outfits.
    pub async fn feed(&self, token: &str, num_outfits: u32) -> Result<FeedResponse> {
        let path = format!("{}?num_outfits={}", paths::FEED, num_outfits);
        let value = self.get(&path, Some(token)).await?;
        decode(value)
    }

    /// Record a save / skip / shop action on a set of products.
    pub async fn record_action(&self, token: &str, request: &ActionRequest) -> Result<ActionResponse> {
        if request.product_ids.trim().is_empty() {
            return Err(FashionBrainError::invalid_request(
                "an action needs at least one product id",
            ));
        }
        let value = self.post(paths::ACTION, request, Some(token)).await?;
        decode(value)
    }

    /// Store onboarding answers.
    pub async fn complete_onboarding(
        &self,
        token: &str,
        request: &OnboardingRequest,
    ) -> Result<AckResponse> {
        let value = self
            .post(paths::ONBOARDING_COMPLETE, request, Some(token))
            .await?;
        decode(value)
    }

    /// Ask for outfit recommendations from a text query or an image URL.
    pub async fn recommend(&self, token: &str, request: &RecommendRequest) -> Result<RecommendResponse> {
        if !request.has_input() {
            return Err(FashionBrainError::invalid_request(
                "either query or image_url must be provided",
            ));
        }
        let value = self.post(paths::RECOMMEND, request, Some(token)).await?;
        decode(value)
    }

    /// Upload an image as the `image` field of a multipart form.
    ///
    /// The backend's answer is returned as-is; its shape differs per target.
    pub async fn upload_image(
        &self,
        token: &str,
        target: UploadTarget,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Value> {
        if bytes.is_empty() {
            return Err(FashionBrainError::invalid_request("image is empty"));
        }

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(image_mime(file_name))
            .map_err(|err| FashionBrainError::invalid_request(err.to_string()))?;
        let form = Form::new().part("image", part);

        self.post_multipart(target.path(), form, Some(token)).await
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|err| FashionBrainError::parse(err.to_string()))
}

fn signup_outcome(value: Value) -> Result<SignupOutcome> {
    if value.get("requires_confirmation").and_then(Value::as_bool) != Some(true) {
        return decode(value).map(SignupOutcome::Session);
    }

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(DEFAULT_CONFIRMATION_MESSAGE)
        .to_string();
    let user = decode(value.get("user").cloned().unwrap_or(Value::Null))?;

    Ok(SignupOutcome::ConfirmationRequired { message, user })
}

fn image_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signup_session_outcome() {
        let outcome = signup_outcome(json!({
            "success": true,
            "access_token": "tok",
            "user": {"id": "u1", "email": "a@b.com", "name": "a"}
        }))
        .unwrap();

        match outcome {
            SignupOutcome::Session(session) => {
                assert_eq!(session.access_token, "tok");
                assert_eq!(session.user.id, "u1");
            }
            other => panic!("expected a session, got {:?}", other),
        }
    }

    #[test]
    fn signup_confirmation_outcome() {
        let outcome = signup_outcome(json!({
            "success": true,
            "requires_confirmation": true,
            "message": "check your email",
            "user": {"id": "pending", "email": "a@b.com", "name": "a"}
        }))
        .unwrap();

        assert!(outcome.requires_confirmation());
        assert_eq!(outcome.user().id, "pending");
    }

    #[test]
    fn signup_confirmation_without_message_gets_default() {
        let outcome = signup_outcome(json!({
            "requires_confirmation": true,
            "user": {"id": "u9"}
        }))
        .unwrap();

        match outcome {
            SignupOutcome::ConfirmationRequired { message, .. } => {
                assert_eq!(message, DEFAULT_CONFIRMATION_MESSAGE)
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
    }

    #[test]
    fn signup_without_token_is_parse_error() {
        let err = signup_outcome(json!({"success": true})).unwrap_err();
        assert!(matches!(err, FashionBrainError::Parse(_)));
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(image_mime("look.PNG"), "image/png");
        assert_eq!(image_mime("a.jpeg"), "image/jpeg");
        assert_eq!(image_mime("noext"), "application/octet-stream");
    }

    #[test]
    fn upload_targets() {
        assert_eq!(UploadTarget::Search.path(), "/upload-image");
        assert_eq!(UploadTarget::Inspiration.to_string(), "/onboarding/inspo-image");
    }
}
