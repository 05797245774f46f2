//! Request DTOs
//!
//! Data structures for service inputs. Ids arrive as decimal strings and are
//! checked here before any side effect.

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::Snowflake;

/// Send message request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(custom(function = "validate_snowflake", message = "Receiver ID must be a valid id"))]
    pub receiver_id: String,

    /// Upper bound is `messages.max_content_length`, checked by the service
    #[validate(length(min = 1, message = "Message must not be empty"))]
    pub content: String,

    /// Message this one replies to
    #[validate(custom(function = "validate_snowflake", message = "Parent message ID must be a valid id"))]
    pub parent_message_id: Option<String>,
}

impl SendMessageRequest {
    pub fn new(receiver_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            content: content.into(),
            parent_message_id: None,
        }
    }

    pub fn in_reply_to(mut self, parent_message_id: impl Into<String>) -> Self {
        self.parent_message_id = Some(parent_message_id.into());
        self
    }
}

fn default_page() -> i64 {
    1
}

/// View conversation query
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ViewMessagesQuery {
    #[validate(custom(function = "validate_snowflake", message = "User ID must be a valid id"))]
    pub other_user_id: String,

    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: i64,

    /// Falls back to the configured default page size
    #[validate(range(min = 1, message = "Limit must be at least 1"))]
    pub limit: Option<i64>,
}

impl ViewMessagesQuery {
    pub fn new(other_user_id: impl Into<String>) -> Self {
        Self {
            other_user_id: other_user_id.into(),
            page: default_page(),
            limit: None,
        }
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn validate_snowflake(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Snowflake>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("snowflake"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1234567890123", true ; "numeric id")]
    #[test_case("", false ; "empty")]
    #[test_case("507f1f77bcf86cd799439011", false ; "hex object id")]
    #[test_case("-5", false ; "negative")]
    #[test_case("0", false ; "zero")]
    fn test_receiver_id(receiver: &str, valid: bool) {
        let request = SendMessageRequest::new(receiver, "hello");
        assert_eq!(request.validate().is_ok(), valid);
    }

    #[test]
    fn test_content_bounds() {
        assert!(SendMessageRequest::new("12", "").validate().is_err());
        assert!(SendMessageRequest::new("12", "a").validate().is_ok());
        // the length cap is configuration, not part of the shape
        assert!(SendMessageRequest::new("12", "a".repeat(20_000)).validate().is_ok());
    }

    #[test]
    fn test_parent_id_checked_when_present() {
        assert!(SendMessageRequest::new("12", "hi").in_reply_to("34").validate().is_ok());
        assert!(SendMessageRequest::new("12", "hi").in_reply_to("x").validate().is_err());
    }

    #[test]
    fn test_query_defaults_from_json() {
        let query: ViewMessagesQuery = serde_json::from_str(r#"{"otherUserId":"77"}"#).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, None);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_query_ranges() {
        assert!(ViewMessagesQuery::new("77").page(0).validate().is_err());
        assert!(ViewMessagesQuery::new("77").limit(0).validate().is_err());
        assert!(ViewMessagesQuery::new("77").page(3).limit(50).validate().is_ok());
    }
}
