//! Access token claims
//!
//! Tokens are decoded, never verified: signature checks belong to the
//! server. Decoding is pure and can be repeated on the same string.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AuthError;
use crate::Result;

/// Window before expiry in which a token counts as "expiring soon".
pub const EXPIRY_WARNING_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Parent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(deserialize_with = "subject_as_string")]
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Unix seconds
    pub exp: i64,
    #[serde(default)]
    pub current_class: Option<u32>,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub remember_me: Option<bool>,
}

impl TokenClaims {
    /// Strictly before `exp`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.exp > now
    }

    /// Saturates, so extreme `exp` claims cannot overflow.
    pub fn expires_within(&self, now: i64, window_secs: i64) -> bool {
        self.exp.saturating_sub(now) < window_secs
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            current_class: self.current_class,
            school_name: self.school_name.clone(),
        }
    }
}

/// The signed-in user, as derived from the access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_class: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
}

/// Decode the payload segment of a JWT.
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| AuthError::Decode("missing payload segment".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::Decode(format!("invalid base64 payload: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| AuthError::Decode(format!("invalid claims: {e}")))
}

pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

// The API issues `sub` as a string; older tokens carry the numeric user id.
fn subject_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subject {
        Text(String),
        Number(i64),
    }

    Ok(match Subject::deserialize(deserializer)? {
        Subject::Text(s) => s,
        Subject::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_token, student_claims};
    use serde_json::json;

    #[test]
    fn test_decode_student_token() {
        let now = now_unix();
        let token = make_token(&student_claims(now + 3600));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.current_class, Some(10));
        assert_eq!(claims.school_name.as_deref(), Some("Delhi Public School"));

        // Pure: decoding twice gives the same claims
        assert_eq!(decode_claims(&token).unwrap(), claims);
    }

    #[test]
    fn test_numeric_subject() {
        let token = make_token(&json!({
            "sub": 7,
            "email": "admin@studyai.in",
            "name": "Admin",
            "role": "admin",
            "exp": 2_000_000_000i64,
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert!(claims.current_class.is_none());
        assert!(claims.school_name.is_none());
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(decode_claims(""), Err(AuthError::Decode(_))));
        assert!(matches!(decode_claims("abc"), Err(AuthError::Decode(_))));
        assert!(matches!(decode_claims("a.!!!.c"), Err(AuthError::Decode(_))));

        let not_claims = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"{\"hello\":1}"));
        assert!(matches!(decode_claims(&not_claims), Err(AuthError::Decode(_))));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = 1_700_000_000;

        let future = decode_claims(&make_token(&student_claims(now + 1))).unwrap();
        assert!(future.is_valid_at(now));

        let past = decode_claims(&make_token(&student_claims(now - 1))).unwrap();
        assert!(!past.is_valid_at(now));

        let exact = decode_claims(&make_token(&student_claims(now))).unwrap();
        assert!(!exact.is_valid_at(now));
    }

    #[test]
    fn test_expiring_soon_window() {
        let now = 1_700_000_000;

        let four_minutes = decode_claims(&make_token(&student_claims(now + 4 * 60))).unwrap();
        assert!(four_minutes.expires_within(now, EXPIRY_WARNING_SECS));

        let six_minutes = decode_claims(&make_token(&student_claims(now + 6 * 60))).unwrap();
        assert!(!six_minutes.expires_within(now, EXPIRY_WARNING_SECS));
    }

    #[test]
    fn test_extreme_expiry_claims() {
        let now = 1_700_000_000;

        let ancient = decode_claims(&make_token(&student_claims(i64::MIN))).unwrap();
        assert!(ancient.expires_within(now, EXPIRY_WARNING_SECS));
        assert!(!ancient.is_valid_at(now));

        let forever = decode_claims(&make_token(&student_claims(i64::MAX))).unwrap();
        assert!(!forever.expires_within(-now, EXPIRY_WARNING_SECS));
        assert!(forever.is_valid_at(now));
    }

    #[test]
    fn test_identity_serializes_camel_case() {
        let claims = decode_claims(&make_token(&student_claims(2_000_000_000))).unwrap();
        let value = serde_json::to_value(claims.identity()).unwrap();

        assert_eq!(value["currentClass"], 10);
        assert_eq!(value["schoolName"], "Delhi Public School");
        assert_eq!(value["role"], "student");
    }
}
