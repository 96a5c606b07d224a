//! In-memory collaborators shared by the unit tests.
//!
//! `ScriptedClient` and `RecordingSleeper` write into one event log so tests
//! can assert how remote calls and sleeps interleave.

use crate::client::{
    ApiResponse, ArtistHome, Balance, LoginStatus, Membership, MessageReceipt, RemoteActionClient,
    UserProfile,
};
use crate::error::{BeanstalkError, Result};
use crate::jitter::Sleeper;
use crate::types::{Account, Platform, TaskStatus, WeeklyTask};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn account(nickname: &str) -> Account {
    Account {
        user_id: 1,
        nickname: nickname.to_string(),
        credential: format!("cookie-{nickname}"),
    }
}

// ---------------------------------------------------------------------------
// RecordingSleeper
// ---------------------------------------------------------------------------

pub struct RecordingSleeper {
    log: EventLog,
}

impl RecordingSleeper {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, secs: u64) {
        self.log.lock().unwrap().push(format!("sleep({secs})"));
    }
}

// ---------------------------------------------------------------------------
// ScriptedClient
// ---------------------------------------------------------------------------

type Scripted = std::result::Result<ApiResponse, String>;

#[derive(Default)]
struct Script {
    responses: HashMap<&'static str, VecDeque<Scripted>>,
    receipts: VecDeque<MessageReceipt>,
    balances: VecDeque<i64>,
    next_artifact: i64,
}

/// A remote client answering from per-operation queues.
///
/// Unscripted creation calls succeed with increasing artifact ids starting
/// at 1000; every other unscripted call succeeds with a bare 200.
pub struct ScriptedClient {
    pub log: EventLog,
    pub logins: HashMap<String, LoginStatus>,
    pub profile: UserProfile,
    pub artist_home: ArtistHome,
    pub daily: Vec<TaskStatus>,
    pub weekly: Vec<WeeklyTask>,
    pub membership: Membership,
    pub tasks_unavailable: bool,
    script: Mutex<Script>,
}

impl ScriptedClient {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            logins: HashMap::new(),
            profile: UserProfile {
                role_name: String::new(),
                artist_id: 0,
            },
            artist_home: ArtistHome::default(),
            daily: Vec::new(),
            weekly: Vec::new(),
            membership: Membership { level: 0 },
            tasks_unavailable: false,
            script: Mutex::new(Script {
                next_artifact: 1000,
                ..Script::default()
            }),
        }
    }

    pub fn with_login(mut self, credential: &str, user_id: u64, nickname: &str) -> Self {
        self.logins.insert(
            credential.to_string(),
            LoginStatus {
                user_id,
                nickname: nickname.to_string(),
            },
        );
        self
    }

    pub fn creator(mut self) -> Self {
        self.profile = UserProfile {
            role_name: "网易音乐人".into(),
            artist_id: 5,
        };
        self
    }

    /// Queue a response for the named operation.
    pub fn respond(&self, op: &'static str, response: ApiResponse) -> &Self {
        self.enqueue(op, Ok(response))
    }

    /// Queue a transport failure for the named operation.
    pub fn fail(&self, op: &'static str, reason: &str) -> &Self {
        self.enqueue(op, Err(reason.to_string()))
    }

    pub fn respond_receipt(&self, receipt: MessageReceipt) -> &Self {
        self.script.lock().unwrap().receipts.push_back(receipt);
        self
    }

    pub fn balances(&self, amounts: &[i64]) -> &Self {
        self.script.lock().unwrap().balances.extend(amounts);
        self
    }

    fn enqueue(&self, op: &'static str, response: Scripted) -> &Self {
        self.script
            .lock()
            .unwrap()
            .responses
            .entry(op)
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.starts_with("sleep("))
            .cloned()
            .collect()
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }

    fn answer(&self, op: &'static str, creates: bool) -> Result<ApiResponse> {
        let mut script = self.script.lock().unwrap();
        if let Some(next) = script.responses.get_mut(op).and_then(VecDeque::pop_front) {
            return next.map_err(BeanstalkError::Remote);
        }
        if creates {
            script.next_artifact += 1;
            Ok(ApiResponse::created(script.next_artifact - 1))
        } else {
            Ok(ApiResponse::ok())
        }
    }
}

#[async_trait]
impl RemoteActionClient for ScriptedClient {
    async fn verify_session(&self, credential: &str) -> Result<LoginStatus> {
        self.record(format!("verify_session({credential})"));
        if credential.starts_with("offline") {
            return Err(BeanstalkError::Remote("connection refused".into()));
        }
        Ok(self.logins.get(credential).cloned().unwrap_or(LoginStatus {
            user_id: 0,
            nickname: String::new(),
        }))
    }

    async fn daily_check_in(&self, _account: &Account, platform: Platform) -> Result<ApiResponse> {
        self.record(format!("daily_check_in({platform})"));
        self.answer("daily_check_in", false)
    }

    async fn fetch_profile(&self, _account: &Account) -> Result<UserProfile> {
        self.record("fetch_profile".into());
        Ok(self.profile.clone())
    }

    async fn fetch_artist_home(&self, _account: &Account, artist_id: u64) -> Result<ArtistHome> {
        self.record(format!("fetch_artist_home({artist_id})"));
        Ok(self.artist_home.clone())
    }

    async fn fetch_balance(&self, _account: &Account) -> Result<Balance> {
        self.record("fetch_balance".into());
        let amount = self.script.lock().unwrap().balances.pop_front().unwrap_or(0);
        Ok(Balance { amount })
    }

    async fn fetch_daily_tasks(&self, _account: &Account) -> Result<Vec<TaskStatus>> {
        self.record("fetch_daily_tasks".into());
        if self.tasks_unavailable {
            return Err(BeanstalkError::Remote("ledger unavailable".into()));
        }
        Ok(self.daily.clone())
    }

    async fn fetch_weekly_tasks(&self, _account: &Account) -> Result<Vec<WeeklyTask>> {
        self.record("fetch_weekly_tasks".into());
        Ok(self.weekly.clone())
    }

    async fn claim_reward(
        &self,
        _account: &Account,
        mission_id: i64,
        period: i64,
    ) -> Result<ApiResponse> {
        self.record(format!("claim_reward({mission_id},{period})"));
        self.answer("claim_reward", false)
    }

    async fn creator_sign_in(&self, _account: &Account) -> Result<ApiResponse> {
        self.record("creator_sign_in".into());
        self.answer("creator_sign_in", false)
    }

    async fn share_track(&self, _account: &Account, track_id: u64) -> Result<ApiResponse> {
        self.record(format!("share_track({track_id})"));
        self.answer("share_track", true)
    }

    async fn post_update(
        &self,
        _account: &Account,
        text: &str,
        _media_refs: &[String],
    ) -> Result<ApiResponse> {
        self.record(format!("post_update({text})"));
        self.answer("post_update", true)
    }

    async fn delete_update(&self, _account: &Account, update_id: i64) -> Result<ApiResponse> {
        self.record(format!("delete_update({update_id})"));
        self.answer("delete_update", false)
    }

    async fn add_comment(
        &self,
        _account: &Account,
        resource_id: u64,
        text: &str,
    ) -> Result<ApiResponse> {
        self.record(format!("add_comment({resource_id},{text})"));
        self.answer("add_comment", true)
    }

    async fn reply_comment(
        &self,
        _account: &Account,
        resource_id: u64,
        parent_comment_id: u64,
        text: &str,
    ) -> Result<ApiResponse> {
        self.record(format!("reply_comment({resource_id},{parent_comment_id},{text})"));
        self.answer("reply_comment", true)
    }

    async fn delete_comment(
        &self,
        _account: &Account,
        resource_id: u64,
        comment_id: i64,
    ) -> Result<ApiResponse> {
        self.record(format!("delete_comment({resource_id},{comment_id})"));
        self.answer("delete_comment", false)
    }

    async fn send_direct_message(
        &self,
        _account: &Account,
        recipient_ids: &[u64],
        text: &str,
    ) -> Result<MessageReceipt> {
        let ids: Vec<String> = recipient_ids.iter().map(u64::to_string).collect();
        self.record(format!("send_direct_message({},{text})", ids.join("+")));
        let receipt = self.script.lock().unwrap().receipts.pop_front();
        Ok(receipt.unwrap_or(MessageReceipt {
            code: 200,
            message: String::new(),
            blacklisted: false,
        }))
    }

    async fn post_media_log(
        &self,
        _account: &Account,
        text: &str,
        track_id: u64,
        image_paths: &[PathBuf],
    ) -> Result<ApiResponse> {
        self.record(format!(
            "post_media_log({text},{track_id},{})",
            image_paths.len()
        ));
        self.answer("post_media_log", true)
    }

    async fn fetch_membership(&self, _account: &Account) -> Result<Membership> {
        self.record("fetch_membership".into());
        Ok(self.membership)
    }

    async fn claim_all_membership_rewards(&self, _account: &Account) -> Result<ApiResponse> {
        self.record("claim_all_membership_rewards".into());
        self.answer("claim_all_membership_rewards", false)
    }

    async fn fetch_community_circle(
        &self,
        _account: &Account,
        circle_id: &str,
    ) -> Result<ApiResponse> {
        self.record(format!("fetch_community_circle({circle_id})"));
        self.answer("fetch_community_circle", false)
    }
}
