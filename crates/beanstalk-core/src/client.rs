//! The remote platform as the engine sees it.
//!
//! [`RemoteActionClient`] is the only way the engine reaches the network.
//! Every call answers with a response code; [`SUCCESS_CODE`] means success.
//! `Err` is reserved for transport and decoding failures.

use crate::error::Result;
use crate::types::{Account, Platform, TaskStatus, WeeklyTask, SUCCESS_CODE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    /// Id of whatever the call created (update, comment, media log).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<i64>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            code: SUCCESS_CODE,
            message: String::new(),
            artifact_id: None,
        }
    }

    pub fn created(artifact_id: i64) -> Self {
        Self {
            artifact_id: Some(artifact_id),
            ..Self::ok()
        }
    }

    pub fn failed(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            artifact_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    /// The recipient has blocked the sender.
    #[serde(default)]
    pub blacklisted: bool,
}

/// Identity resolved from a stored credential. `user_id == 0` means the
/// credential was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStatus {
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub role_name: String,
    #[serde(default)]
    pub artist_id: u64,
}

impl UserProfile {
    const CREATOR_MARKER: &'static str = "网易音乐人";

    /// Whether the account takes part in the creator reward program.
    pub fn is_creator(&self) -> bool {
        self.role_name.contains(Self::CREATOR_MARKER)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistHome {
    #[serde(default)]
    pub blocks: Vec<HomeBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeBlock {
    pub code: String,
    #[serde(default)]
    pub creatives: Vec<Creative>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creative {
    #[serde(default)]
    pub resources: Vec<HomeResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeResource {
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: String,
}

impl ArtistHome {
    /// The creator's own community circle, if the homepage advertises one.
    pub fn circle_id(&self) -> Option<String> {
        self.blocks
            .iter()
            .filter(|b| b.code == "PERSONAL_MY_CIRCLE")
            .flat_map(|b| &b.creatives)
            .flat_map(|c| &c.resources)
            .find(|r| r.resource_type == "CIRCLE" && !r.resource_id.is_empty())
            .map(|r| r.resource_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    #[serde(default)]
    pub level: u32,
}

// ---------------------------------------------------------------------------
// RemoteActionClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RemoteActionClient: Send + Sync {
    async fn verify_session(&self, credential: &str) -> Result<LoginStatus>;

    async fn daily_check_in(&self, account: &Account, platform: Platform) -> Result<ApiResponse>;

    async fn fetch_profile(&self, account: &Account) -> Result<UserProfile>;

    async fn fetch_artist_home(&self, account: &Account, artist_id: u64) -> Result<ArtistHome>;

    async fn fetch_balance(&self, account: &Account) -> Result<Balance>;

    async fn fetch_daily_tasks(&self, account: &Account) -> Result<Vec<TaskStatus>>;

    async fn fetch_weekly_tasks(&self, account: &Account) -> Result<Vec<WeeklyTask>>;

    async fn claim_reward(&self, account: &Account, mission_id: i64, period: i64)
        -> Result<ApiResponse>;

    async fn creator_sign_in(&self, account: &Account) -> Result<ApiResponse>;

    /// Share a track and publish the share as an update; the update id is
    /// returned as the artifact.
    async fn share_track(&self, account: &Account, track_id: u64) -> Result<ApiResponse>;

    async fn post_update(
        &self,
        account: &Account,
        text: &str,
        media_refs: &[String],
    ) -> Result<ApiResponse>;

    async fn delete_update(&self, account: &Account, update_id: i64) -> Result<ApiResponse>;

    async fn add_comment(&self, account: &Account, resource_id: u64, text: &str)
        -> Result<ApiResponse>;

    async fn reply_comment(
        &self,
        account: &Account,
        resource_id: u64,
        parent_comment_id: u64,
        text: &str,
    ) -> Result<ApiResponse>;

    async fn delete_comment(
        &self,
        account: &Account,
        resource_id: u64,
        comment_id: i64,
    ) -> Result<ApiResponse>;

    async fn send_direct_message(
        &self,
        account: &Account,
        recipient_ids: &[u64],
        text: &str,
    ) -> Result<MessageReceipt>;

    async fn post_media_log(
        &self,
        account: &Account,
        text: &str,
        track_id: u64,
        image_paths: &[PathBuf],
    ) -> Result<ApiResponse>;

    async fn fetch_membership(&self, account: &Account) -> Result<Membership>;

    async fn claim_all_membership_rewards(&self, account: &Account) -> Result<ApiResponse>;

    async fn fetch_community_circle(&self, account: &Account, circle_id: &str)
        -> Result<ApiResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_id_found_in_personal_block() {
        let json = r#"{
            "blocks": [
                {"code": "PERSONAL_SONGS", "creatives": [
                    {"resources": [{"resource_type": "CIRCLE", "resource_id": "wrong"}]}
                ]},
                {"code": "PERSONAL_MY_CIRCLE", "creatives": [
                    {"resources": [
                        {"resource_type": "CIRCLE", "resource_id": ""},
                        {"resource_type": "SONG", "resource_id": "77"},
                        {"resource_type": "CIRCLE", "resource_id": "c-42"}
                    ]}
                ]}
            ]
        }"#;
        let home: ArtistHome = serde_json::from_str(json).unwrap();
        assert_eq!(home.circle_id().as_deref(), Some("c-42"));
    }

    #[test]
    fn circle_id_absent() {
        assert_eq!(ArtistHome::default().circle_id(), None);
    }

    #[test]
    fn creator_marker_detection() {
        let creator = UserProfile {
            role_name: "网易音乐人·原创".into(),
            artist_id: 3,
        };
        let listener = UserProfile {
            role_name: "".into(),
            artist_id: 0,
        };
        assert!(creator.is_creator());
        assert!(!listener.is_creator());
    }

    #[test]
    fn api_response_decodes_without_optional_fields() {
        let resp: ApiResponse = serde_json::from_str(r#"{"code": 200}"#).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.artifact_id, None);
    }
}
