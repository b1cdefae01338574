//! User directory record.

use crate::models::{Role, UserId, UserName};
use serde::{Deserialize, Serialize};

/// One user as known to the user directory.
///
/// The directory is the authoritative source for authorization attributes;
/// identities derived from tokens are always cross-checked against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: UserName,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl UserRecord {
    pub fn new(
        user_id: UserId,
        username: UserName,
        display_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            user_id,
            username,
            display_name: display_name.into(),
            email: None,
            image_url: None,
            role,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}
