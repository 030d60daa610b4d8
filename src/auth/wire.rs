//! JSON payloads exchanged with the backend's login and refresh endpoints.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Body sent to the login endpoint.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
	/// Account email.
	pub email: String,
	/// Account password; never logged.
	pub password: String,
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Successful login payload: `{access, refresh, user}`.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
	/// Freshly issued access token.
	pub access: TokenSecret,
	/// Freshly issued refresh token.
	pub refresh: TokenSecret,
	/// Backend user profile, passed through untouched.
	#[serde(default)]
	pub user: serde_json::Value,
}

/// Body sent to the refresh endpoint; carries only the refresh token.
#[derive(Clone, Debug, Serialize)]
pub struct RefreshRequest<'a> {
	/// Refresh token being exchanged.
	pub refresh: &'a str,
}

/// Refresh endpoint payload: `{access}` plus an optional rotated refresh token.
#[derive(Clone, Debug, Deserialize)]
pub struct RefreshResponse {
	/// Replacement access token.
	pub access: TokenSecret,
	/// Rotated refresh token, if the backend issued one.
	#[serde(default)]
	pub refresh: Option<TokenSecret>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_response_tolerates_missing_rotation() {
		let parsed: RefreshResponse =
			serde_json::from_str("{\"access\":\"A2\"}").expect("Minimal refresh body should parse.");

		assert_eq!(parsed.access.expose(), "A2");
		assert!(parsed.refresh.is_none());
	}

	#[test]
	fn login_request_debug_hides_password() {
		let request = LoginRequest { email: "seeker@example.com".into(), password: "hunter2".into() };

		assert!(!format!("{request:?}").contains("hunter2"));
		assert_eq!(
			serde_json::to_value(&request).expect("Login body should serialize."),
			serde_json::json!({ "email": "seeker@example.com", "password": "hunter2" }),
		);
	}
}
