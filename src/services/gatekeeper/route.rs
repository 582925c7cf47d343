use crate::services::rate_limit::RateLimitPolicy;

use super::sanitize::Sanitizer;

/// Every path the gatekeeper knows how to treat. Anything else is `Other`
/// and gets the strictest handling (general limit, CSRF required).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthRoute {
    CsrfToken,
    Register,
    Login,
    Google,
    Me,
    Profile,
    Logout,
    ForgotPassword,
    ResetPassword,
    VerifyEmail,
    ResendVerification,
    CheckEmail,
    ValidateToken,
    ClearExpiredTokens,
    CreateVideo,
    Other,
}

type FieldTable = &'static [(&'static str, Sanitizer)];

const REGISTER_FIELDS: FieldTable = &[
    ("firstName", Sanitizer::Name),
    ("lastName", Sanitizer::Name),
    ("email", Sanitizer::Email),
    ("phone", Sanitizer::Phone),
];
const GOOGLE_FIELDS: FieldTable = &[
    ("firstName", Sanitizer::Name),
    ("lastName", Sanitizer::Name),
    ("email", Sanitizer::Email),
];
const PROFILE_FIELDS: FieldTable = &[
    ("firstName", Sanitizer::Name),
    ("lastName", Sanitizer::Name),
    ("phone", Sanitizer::Phone),
];
const EMAIL_ONLY: FieldTable = &[("email", Sanitizer::Email)];
const VIDEO_FIELDS: FieldTable = &[
    ("title", Sanitizer::Text),
    ("description", Sanitizer::Text),
    ("propertyAddress", Sanitizer::Text),
];

impl AuthRoute {
    /// Resolves a full request path (including the `/api/auth` prefix).
    pub fn classify(path: &str) -> Self {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        if let Some(endpoint) = path.strip_prefix("/api/auth/") {
            return match endpoint {
                "csrf-token" => Self::CsrfToken,
                "register" => Self::Register,
                "login" => Self::Login,
                "google" => Self::Google,
                "me" => Self::Me,
                "profile" => Self::Profile,
                "logout" => Self::Logout,
                "forgot-password" => Self::ForgotPassword,
                "reset-password" => Self::ResetPassword,
                "verify-email" => Self::VerifyEmail,
                "resend-verification" => Self::ResendVerification,
                "check-email" => Self::CheckEmail,
                "validate-token" => Self::ValidateToken,
                "clear-expired-tokens" => Self::ClearExpiredTokens,
                _ => Self::Other,
            };
        }

        match path {
            "/api/video/create" | "/api/videos/create" => Self::CreateVideo,
            _ => Self::Other,
        }
    }

    pub fn policy(self) -> RateLimitPolicy {
        match self {
            Self::Login => RateLimitPolicy::Login,
            Self::Register => RateLimitPolicy::Register,
            Self::ForgotPassword | Self::ResetPassword => RateLimitPolicy::PasswordReset,
            Self::VerifyEmail | Self::ResendVerification => RateLimitPolicy::EmailVerification,
            Self::CreateVideo => RateLimitPolicy::CreateVideo,
            _ => RateLimitPolicy::General,
        }
    }

    /// Routes that accept state-changing requests without a CSRF token:
    /// the public credential endpoints and the bearer-protected ones.
    pub fn csrf_exempt(self) -> bool {
        !matches!(
            self,
            Self::ResendVerification | Self::CreateVideo | Self::Other
        )
    }

    pub fn requires_auth(self) -> bool {
        matches!(
            self,
            Self::Me | Self::Profile | Self::Logout | Self::ClearExpiredTokens | Self::CreateVideo
        )
    }

    /// JSON body fields rewritten before the handler sees them. Passwords
    /// and tokens are never listed.
    pub fn sanitized_fields(self) -> FieldTable {
        match self {
            Self::Register => REGISTER_FIELDS,
            Self::Google => GOOGLE_FIELDS,
            Self::Profile => PROFILE_FIELDS,
            Self::Login | Self::ForgotPassword | Self::ResendVerification => EMAIL_ONLY,
            Self::CreateVideo => VIDEO_FIELDS,
            _ => &[],
        }
    }
}
