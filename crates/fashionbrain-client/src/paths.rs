//! Backend API paths.

pub const SIGNUP: &str = "/auth/signup";
pub const LOGIN: &str = "/auth/login";
pub const ME: &str = "/auth/me";
pub const FEED: &str = "/feed";
pub const ACTION: &str = "/action";
pub const ONBOARDING_COMPLETE: &str = "/onboarding/complete";
pub const RECOMMEND: &str = "/recommend";
pub const UPLOAD_IMAGE: &str = "/upload-image";
pub const INSPO_IMAGE: &str = "/onboarding/inspo-image";
