//! Request and response bodies exchanged with the FashionBrain backend.
//!
//! Response types are lenient: optional fields default when missing, and
//! open-ended records (users, products, outfits) keep any fields they do not
//! name in an `extra` map so nothing the backend sends is lost.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /auth/signup`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SignupRequest {
    pub fn new<S: Into<String>>(email: S, password: S) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: None,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new<S: Into<String>>(email: S, password: S) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Record ids arrive as strings or as numeric primary keys.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Uint(u64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Uint(n) => n.to_string(),
        RawId::Float(n) => n.to_string(),
    })
}

/// A user record as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(deserialize_with = "id_string")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Absent for users that have never been through onboarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Whether the user still has to go through onboarding.
    pub fn needs_onboarding(&self) -> bool {
        !self.onboarding_completed.unwrap_or(false)
    }
}

/// A signed-in session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    pub user: User,
}

/// Result of a signup attempt that the backend did not reject.
#[derive(Debug, Clone, PartialEq)]
pub enum SignupOutcome {
    /// The account is usable right away.
    Session(AuthSession),

    /// The account exists but an email confirmation is pending; no token is
    /// issued until the user confirms.
    ConfirmationRequired { message: String, user: User },
}

impl SignupOutcome {
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::ConfirmationRequired { .. })
    }

    pub fn user(&self) -> &User {
        match self {
            Self::Session(session) => &session.user,
            Self::ConfirmationRequired { user, .. } => user,
        }
    }
}

/// Body of `GET /auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeResponse {
    pub user: User,
}

/// A single catalogue product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(deserialize_with = "id_string")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_link: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A suggested outfit: a group of products shown together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outfit {
    #[serde(default)]
    pub items: Vec<Product>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit_type: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Outfit {
    /// Item ids joined with `,`, the form `/action` expects.
    pub fn product_ids(&self) -> String {
        self.items
            .iter()
            .map(|item| item.id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Body of `GET /feed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedResponse {
    #[serde(default)]
    pub outfits: Vec<Outfit>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// What the user did with an outfit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Save,
    Skip,
    Shop,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::Skip => write!(f, "skip"),
            Self::Shop => write!(f, "shop"),
        }
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "save" => Ok(Self::Save),
            "skip" => Ok(Self::Skip),
            "shop" => Ok(Self::Shop),
            other => Err(format!(
                "unknown action '{}', expected one of: save, skip, shop",
                other
            )),
        }
    }
}

/// Body of `POST /action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRequest {
    /// Comma-joined product ids.
    pub product_ids: String,
    pub action_type: ActionType,
}

impl ActionRequest {
    pub fn new<I, S>(product_ids: I, action_type: ActionType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = product_ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        Self {
            product_ids: ids.join(","),
            action_type,
        }
    }

    /// Build an action covering every item of an outfit.
    pub fn for_outfit(outfit: &Outfit, action_type: ActionType) -> Self {
        Self {
            product_ids: outfit.product_ids(),
            action_type,
        }
    }
}

/// Body of `POST /action` responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit_id: Option<String>,
}

/// Body of `POST /onboarding/complete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OnboardingRequest {
    pub gender: Option<String>,
    pub preferred_styles: Option<Vec<String>>,
    pub budget_range: Option<String>,
    pub onboarding_completed: bool,
}

/// Body of `POST /recommend`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl RecommendRequest {
    pub fn from_query<S: Into<String>>(query: S) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn from_image_url<S: Into<String>>(image_url: S) -> Self {
        Self {
            image_url: Some(image_url.into()),
            ..Self::default()
        }
    }

    /// The backend needs at least one of `query` / `image_url`.
    pub fn has_input(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.query) || present(&self.image_url)
    }
}

/// Body of `POST /recommend` responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendResponse {
    #[serde(default)]
    pub recommendations: Vec<Outfit>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Plain acknowledgement returned by write-only endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AckResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
