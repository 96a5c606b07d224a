//! [`RemoteActionClient`] over an HTTP JSON gateway.
//!
//! Every operation is `POST {base_url}/{operation}` with the operation's
//! parameters as a JSON object and the account credential in the `Cookie`
//! header. The gateway answers with the matching payload type as JSON.

use crate::client::{
    ApiResponse, ArtistHome, Balance, LoginStatus, Membership, MessageReceipt, RemoteActionClient,
    UserProfile,
};
use crate::config::GatewayConfig;
use crate::error::{BeanstalkError, Result};
use crate::types::{Account, Platform, TaskStatus, WeeklyTask};
use async_trait::async_trait;
use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn call<T: DeserializeOwned>(&self, credential: &str, op: &str, body: Value) -> Result<T> {
        let url = format!("{}/{op}", self.base_url);
        tracing::debug!(op, "gateway call");
        let resp = self
            .http
            .post(url)
            .header(COOKIE, credential)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BeanstalkError::Remote(format!(
                "{op}: gateway answered {status}: {text}"
            )));
        }
        resp.json::<T>()
            .await
            .map_err(|e| BeanstalkError::Remote(format!("{op}: undecodable response: {e}")))
    }
}

#[async_trait]
impl RemoteActionClient for GatewayClient {
    async fn verify_session(&self, credential: &str) -> Result<LoginStatus> {
        self.call(credential, "verify_session", json!({})).await
    }

    async fn daily_check_in(&self, account: &Account, platform: Platform) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "daily_check_in",
            json!({ "platform": platform.as_str() }),
        )
        .await
    }

    async fn fetch_profile(&self, account: &Account) -> Result<UserProfile> {
        self.call(
            &account.credential,
            "fetch_profile",
            json!({ "user_id": account.user_id }),
        )
        .await
    }

    async fn fetch_artist_home(&self, account: &Account, artist_id: u64) -> Result<ArtistHome> {
        self.call(
            &account.credential,
            "fetch_artist_home",
            json!({ "artist_id": artist_id }),
        )
        .await
    }

    async fn fetch_balance(&self, account: &Account) -> Result<Balance> {
        self.call(&account.credential, "fetch_balance", json!({})).await
    }

    async fn fetch_daily_tasks(&self, account: &Account) -> Result<Vec<TaskStatus>> {
        self.call(&account.credential, "fetch_daily_tasks", json!({}))
            .await
    }

    async fn fetch_weekly_tasks(&self, account: &Account) -> Result<Vec<WeeklyTask>> {
        self.call(&account.credential, "fetch_weekly_tasks", json!({}))
            .await
    }

    async fn claim_reward(
        &self,
        account: &Account,
        mission_id: i64,
        period: i64,
    ) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "claim_reward",
            json!({ "mission_id": mission_id, "period": period }),
        )
        .await
    }

    async fn creator_sign_in(&self, account: &Account) -> Result<ApiResponse> {
        self.call(&account.credential, "creator_sign_in", json!({}))
            .await
    }

    async fn share_track(&self, account: &Account, track_id: u64) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "share_track",
            json!({ "track_id": track_id }),
        )
        .await
    }

    async fn post_update(
        &self,
        account: &Account,
        text: &str,
        media_refs: &[String],
    ) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "post_update",
            json!({ "text": text, "media_refs": media_refs }),
        )
        .await
    }

    async fn delete_update(&self, account: &Account, update_id: i64) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "delete_update",
            json!({ "update_id": update_id }),
        )
        .await
    }

    async fn add_comment(
        &self,
        account: &Account,
        resource_id: u64,
        text: &str,
    ) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "add_comment",
            json!({ "resource_id": resource_id, "text": text }),
        )
        .await
    }

    async fn reply_comment(
        &self,
        account: &Account,
        resource_id: u64,
        parent_comment_id: u64,
        text: &str,
    ) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "reply_comment",
            json!({
                "resource_id": resource_id,
                "parent_comment_id": parent_comment_id,
                "text": text,
            }),
        )
        .await
    }

    async fn delete_comment(
        &self,
        account: &Account,
        resource_id: u64,
        comment_id: i64,
    ) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "delete_comment",
            json!({ "resource_id": resource_id, "comment_id": comment_id }),
        )
        .await
    }

    async fn send_direct_message(
        &self,
        account: &Account,
        recipient_ids: &[u64],
        text: &str,
    ) -> Result<MessageReceipt> {
        self.call(
            &account.credential,
            "send_direct_message",
            json!({ "recipient_ids": recipient_ids, "text": text }),
        )
        .await
    }

    async fn post_media_log(
        &self,
        account: &Account,
        text: &str,
        track_id: u64,
        image_paths: &[PathBuf],
    ) -> Result<ApiResponse> {
        let images: Vec<String> = image_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        self.call(
            &account.credential,
            "post_media_log",
            json!({ "text": text, "track_id": track_id, "images": images }),
        )
        .await
    }

    async fn fetch_membership(&self, account: &Account) -> Result<Membership> {
        self.call(&account.credential, "fetch_membership", json!({}))
            .await
    }

    async fn claim_all_membership_rewards(&self, account: &Account) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "claim_all_membership_rewards",
            json!({}),
        )
        .await
    }

    async fn fetch_community_circle(
        &self,
        account: &Account,
        circle_id: &str,
    ) -> Result<ApiResponse> {
        self.call(
            &account.credential,
            "fetch_community_circle",
            json!({ "circle_id": circle_id }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskState;
    use mockito::Matcher;

    fn client(url: &str) -> GatewayClient {
        GatewayClient::new(&GatewayConfig {
            base_url: format!("{url}/"),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn account() -> Account {
        Account {
            user_id: 9,
            nickname: "n".into(),
            credential: "MUSIC_U=abc".into(),
        }
    }

    #[tokio::test]
    async fn sends_cookie_and_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/reply_comment")
            .match_header("cookie", "MUSIC_U=abc")
            .match_body(Matcher::Json(json!({
                "resource_id": 7,
                "parent_comment_id": 8,
                "text": "hi",
            })))
            .with_status(200)
            .with_body(r#"{"code": 200, "artifact_id": 55}"#)
            .create_async()
            .await;

        let resp = client(&server.url())
            .reply_comment(&account(), 7, 8, "hi")
            .await
            .unwrap();
        assert_eq!(resp, ApiResponse::created(55));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn decodes_ledger_states() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/fetch_daily_tasks")
            .with_body(
                r#"[
                    {"description": "发布动态", "state": 20, "reward": 2,
                     "claim": {"mission_id": 3, "period": 1}},
                    {"description": "分享单曲", "state": 100, "reward": 1},
                    {"description": "回复评论", "state": 0, "reward": 1}
                ]"#,
            )
            .create_async()
            .await;

        let tasks = client(&server.url())
            .fetch_daily_tasks(&account())
            .await
            .unwrap();
        let states: Vec<TaskState> = tasks.iter().map(|t| t.state).collect();
        assert_eq!(
            states,
            vec![
                TaskState::CompletedUnclaimed,
                TaskState::Claimed,
                TaskState::InProgress
            ]
        );
        assert_eq!(tasks[1].claim, None);
    }

    #[tokio::test]
    async fn http_error_becomes_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/fetch_balance")
            .with_status(502)
            .with_body("upstream down")
            .create_async()
            .await;

        let err = client(&server.url())
            .fetch_balance(&account())
            .await
            .unwrap_err();
        assert!(matches!(err, BeanstalkError::Remote(_)));
        assert!(err.to_string().contains("fetch_balance: gateway answered 502"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/verify_session")
            .with_body("<html>")
            .create_async()
            .await;

        let err = client(&server.url())
            .verify_session("MUSIC_U=abc")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("undecodable response"));
    }
}
