//! Error normalization: backend status codes and error envelopes into [`ClientError`].
//!
//! The backend reports failures either as `{"detail": "..."}` or as a field-keyed
//! validation map (`{"email": ["..."], "non_field_errors": ["..."]}`). Everything here is
//! pure: the same status, body, and profile always produce the same error, whatever call
//! site issued the request.

// self
use crate::{_prelude::*, config::BuildProfile};

const BODY_PREVIEW_LIMIT: usize = 256;
const NON_FIELD_ERRORS: &str = "non_field_errors";

const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
const SERVER_ERROR_MESSAGE: &str = "The server encountered an error. Please try again later.";
const UNKNOWN_MESSAGE: &str = "Something went wrong. Please try again.";

/// Parsed backend error envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorEnvelope {
	/// `{"detail": "..."}`.
	Detail(String),
	/// Field-keyed validation messages.
	Fields(BTreeMap<String, Vec<String>>),
}
impl ErrorEnvelope {
	/// Parses `body`, returning `None` when it is not a recognizable envelope.
	pub fn parse(body: &[u8]) -> Option<Self> {
		let value = serde_json::from_slice::<serde_json::Value>(body).ok()?;
		let serde_json::Value::Object(map) = value else {
			return None;
		};

		if let Some(serde_json::Value::String(detail)) = map.get("detail") {
			return Some(Self::Detail(detail.trim().to_owned()));
		}

		let mut fields = BTreeMap::new();

		for (field, value) in map {
			let messages = match value {
				serde_json::Value::String(message) => vec![message],
				serde_json::Value::Array(items) => items
					.into_iter()
					.filter_map(|item| match item {
						serde_json::Value::String(message) => Some(message),
						serde_json::Value::Null => None,
						other => Some(other.to_string()),
					})
					.collect(),
				_ => continue,
			};

			if !messages.is_empty() {
				fields.insert(field, messages);
			}
		}

		if fields.is_empty() { None } else { Some(Self::Fields(fields)) }
	}

	/// Flattens the envelope into a single display message.
	///
	/// Non-field errors come first without a prefix; every other message is rendered as
	/// `field: message`. Entries are joined with `"; "` in field-name order.
	pub fn message(&self) -> String {
		match self {
			Self::Detail(detail) => detail.clone(),
			Self::Fields(fields) => {
				let general = fields.get(NON_FIELD_ERRORS).into_iter().flatten().cloned();
				let specific = fields
					.iter()
					.filter(|(field, _)| field.as_str() != NON_FIELD_ERRORS)
					.flat_map(|(field, messages)| {
						messages.iter().map(move |message| format!("{field}: {message}"))
					});

				general.chain(specific).collect::<Vec<_>>().join("; ")
			},
		}
	}

	/// Returns the field map (empty for [`ErrorEnvelope::Detail`]).
	pub fn into_fields(self) -> BTreeMap<String, Vec<String>> {
		match self {
			Self::Detail(_) => BTreeMap::new(),
			Self::Fields(fields) => fields,
		}
	}
}

/// Maps a non-2xx response into the closed error taxonomy.
///
/// `retry_after` is only consulted for 429 responses. A 401 reaching this function is one
/// the refresh flow does not apply to (login, refresh, or opted-out calls) and is treated
/// like any other 4xx.
///
/// Every 4xx other than 403 and 429 that carries an envelope becomes
/// [`ClientError::ValidationFailed`]. A bare `{"detail": ...}` (a rejected login, a 404)
/// keeps its text as the message and yields an empty `fields` map, so callers can tell it
/// apart from a field-level rejection. A 4xx without an envelope becomes
/// [`ClientError::Unknown`].
pub fn normalize_response(
	status: u16,
	body: &[u8],
	retry_after: Duration,
	profile: BuildProfile,
) -> ClientError {
	match status {
		429 => ClientError::RateLimited { retry_after },
		403 => ClientError::Forbidden {
			message: match ErrorEnvelope::parse(body) {
				Some(ErrorEnvelope::Detail(detail)) if !detail.is_empty() => detail,
				_ => FORBIDDEN_MESSAGE.into(),
			},
		},
		500..=599 => ClientError::ServerError { status, message: SERVER_ERROR_MESSAGE.into() },
		400..=499 => match ErrorEnvelope::parse(body) {
			Some(envelope) => {
				let message = envelope.message();

				ClientError::ValidationFailed { message, fields: envelope.into_fields() }
			},
			None => unknown(profile, format_args!("HTTP {status}: {}", body_preview(body))),
		},
		_ => unknown(profile, format_args!("Unexpected HTTP {status}: {}", body_preview(body))),
	}
}

/// Builds a [`ClientError::Unknown`], including `detail` only in development builds.
pub fn unknown(profile: BuildProfile, detail: impl Display) -> ClientError {
	let message = match profile {
		BuildProfile::Development => format!("{UNKNOWN_MESSAGE} ({detail})"),
		BuildProfile::Production => UNKNOWN_MESSAGE.into(),
	};

	ClientError::Unknown { message }
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		return "<empty body>".into();
	}

	let mut preview = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	if text.chars().count() > BODY_PREVIEW_LIMIT {
		preview.push('…');
	}

	preview
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const RETRY: Duration = Duration::seconds(60);

	#[test]
	fn detail_envelope_is_stable_across_calls() {
		let body = br#"{"detail":"Invalid credentials"}"#;
		let first = normalize_response(401, body, RETRY, BuildProfile::Production);
		let second = normalize_response(401, body, RETRY, BuildProfile::Production);

		assert_eq!(first, second);
		assert_eq!(
			first,
			ClientError::ValidationFailed {
				message: "Invalid credentials".into(),
				fields: BTreeMap::new(),
			},
		);
	}

	#[test]
	fn detail_only_client_errors_carry_no_fields() {
		for status in [400, 404, 409] {
			let err = normalize_response(
				status,
				br#"{"detail":"Not found."}"#,
				RETRY,
				BuildProfile::Production,
			);

			assert_eq!(
				err,
				ClientError::ValidationFailed { message: "Not found.".into(), fields: BTreeMap::new() },
			);
			assert_eq!(err.to_string(), "Not found.");
		}

		assert!(matches!(
			normalize_response(404, b"<html>Not Found</html>", RETRY, BuildProfile::Production),
			ClientError::Unknown { .. },
		));
	}

	#[test]
	fn field_map_is_flattened_in_order() {
		let body = br#"{"password":["Too short.","Too common."],"email":"Enter a valid email.","non_field_errors":["Passwords do not match."]}"#;
		let err = normalize_response(400, body, RETRY, BuildProfile::Production);

		match err {
			ClientError::ValidationFailed { message, fields } => {
				assert_eq!(
					message,
					"Passwords do not match.; email: Enter a valid email.; password: Too short.; password: Too common.",
				);
				assert_eq!(fields.len(), 3);
				assert_eq!(fields["password"], vec!["Too short.", "Too common."]);
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn status_classes_map_to_categories() {
		assert_eq!(
			normalize_response(429, b"", Duration::seconds(30), BuildProfile::Production),
			ClientError::RateLimited { retry_after: Duration::seconds(30) },
		);
		assert_eq!(
			normalize_response(403, b"", RETRY, BuildProfile::Production),
			ClientError::Forbidden { message: FORBIDDEN_MESSAGE.into() },
		);
		assert_eq!(
			normalize_response(403, br#"{"detail":"Employers only."}"#, RETRY, BuildProfile::Production),
			ClientError::Forbidden { message: "Employers only.".into() },
		);

		let server = normalize_response(
			502,
			br#"{"detail":"Traceback (most recent call last): ..."}"#,
			RETRY,
			BuildProfile::Development,
		);

		assert_eq!(
			server,
			ClientError::ServerError { status: 502, message: SERVER_ERROR_MESSAGE.into() },
		);
		assert!(!server.to_string().contains("Traceback"));
	}

	#[test]
	fn unknown_verbosity_follows_profile() {
		let body = b"<html>Not Found</html>";
		let production = normalize_response(404, body, RETRY, BuildProfile::Production);
		let development = normalize_response(404, body, RETRY, BuildProfile::Development);

		assert_eq!(production, ClientError::Unknown { message: UNKNOWN_MESSAGE.into() });

		match development {
			ClientError::Unknown { message } => {
				assert!(message.contains("HTTP 404"));
				assert!(message.contains("Not Found"));
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn non_envelope_bodies_are_rejected() {
		assert_eq!(ErrorEnvelope::parse(b"[\"oops\"]"), None);
		assert_eq!(ErrorEnvelope::parse(b"{\"count\":3}"), None);
		assert_eq!(ErrorEnvelope::parse(b"not json"), None);
	}

	#[test]
	fn body_preview_is_truncated() {
		let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = body_preview(long.as_bytes());

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert_eq!(body_preview(b"  "), "<empty body>");
	}
}
