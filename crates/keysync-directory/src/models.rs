//! Wire types for the directory admin API.

use serde::{Deserialize, Serialize};

/// One member of a directory group. Transient: used only during snapshot
/// resolution, never published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The member's primary email address
    pub email: String,
}

impl Member {
    /// Create a member from an email address.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Response shape of `GET groups/{group}/members`.
///
/// The upstream omits the `members` field entirely for empty groups, so it
/// defaults to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberList {
    /// Members of the group, in membership-list order
    #[serde(default)]
    pub members: Vec<Member>,
}

/// Per-user custom SSH-key attribute.
///
/// A user who has never registered a key carries an empty `ssh` value; that
/// is a normal state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    /// The registered public SSH key, or empty if none
    #[serde(default)]
    pub ssh: String,
}

impl KeyAttribute {
    /// Returns true if the user has a key registered.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.ssh.is_empty()
    }
}

/// Custom-schema envelope the directory nests key attributes under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSchemas {
    /// The `keys` custom schema holding the SSH attribute
    #[serde(default)]
    pub keys: KeyAttribute,
}

/// Response shape of `GET users/{email}?customFieldMask=keys&projection=custom`,
/// and the body of `PUT users/{email}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Custom schemas attached to the user
    #[serde(rename = "customSchemas", default)]
    pub custom_schemas: CustomSchemas,
}

/// Request body used to set a user's SSH-key attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateUserRequest {
    /// Custom schemas to merge into the user record
    #[serde(rename = "customSchemas")]
    pub custom_schemas: CustomSchemas,
}

impl UpdateUserRequest {
    /// Build the update body for the given key value.
    #[must_use]
    pub fn with_ssh_key(key: impl Into<String>) -> Self {
        Self {
            custom_schemas: CustomSchemas {
                keys: KeyAttribute { ssh: key.into() },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_list_decodes() {
        let body = json!({
            "members": [
                {"email": "member1@example.com"},
                {"email": "member2@example.com"}
            ]
        });
        let list: MemberList = serde_json::from_value(body).unwrap();
        assert_eq!(list.members.len(), 2);
        assert_eq!(list.members[0].email, "member1@example.com");
    }

    #[test]
    fn member_list_defaults_to_empty() {
        let list: MemberList = serde_json::from_str("{}").unwrap();
        assert!(list.members.is_empty());
    }

    #[test]
    fn key_attribute_decodes_nested_schema() {
        let body = json!({"customSchemas": {"keys": {"ssh": "dummy ssh key"}}});
        let user: DirectoryUser = serde_json::from_value(body).unwrap();
        assert!(user.custom_schemas.keys.is_set());
        assert_eq!(user.custom_schemas.keys.ssh, "dummy ssh key");
    }

    #[test]
    fn missing_key_attribute_is_empty_not_error() {
        let user: DirectoryUser = serde_json::from_str("{}").unwrap();
        assert!(!user.custom_schemas.keys.is_set());
        assert_eq!(user.custom_schemas.keys.ssh, "");
    }

    #[test]
    fn update_request_serializes_expected_shape() {
        let request = UpdateUserRequest::with_ssh_key("ssh-ed25519 AAAA a@b.com");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"customSchemas": {"keys": {"ssh": "ssh-ed25519 AAAA a@b.com"}}})
        );
    }
}
