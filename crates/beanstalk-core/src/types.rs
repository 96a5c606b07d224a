use serde::{Deserialize, Serialize};
use std::fmt;

/// Response code the remote service uses for success on every call.
pub const SUCCESS_CODE: i64 = 200;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// The closed set of actions the engine knows how to perform.
///
/// Variants are declared in dispatch order, so `Ord` (and therefore a
/// `BTreeSet<ActionKind>`) iterates in the order actions are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ShareTrack,
    DailySignIn,
    PostUpdate,
    ReplyComment,
    SendDirectMessage,
    PostMediaLog,
    PostCreatorNote,
    VisitCommunityCircle,
}

/// Which configured jitter profile paces a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterSlot {
    Update,
    Comment,
    Message,
    MediaLog,
    /// Kinds that are never paced.
    Unpaced,
}

impl ActionKind {
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::ShareTrack,
            ActionKind::DailySignIn,
            ActionKind::PostUpdate,
            ActionKind::ReplyComment,
            ActionKind::SendDirectMessage,
            ActionKind::PostMediaLog,
            ActionKind::PostCreatorNote,
            ActionKind::VisitCommunityCircle,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ShareTrack => "share_track",
            ActionKind::DailySignIn => "daily_sign_in",
            ActionKind::PostUpdate => "post_update",
            ActionKind::ReplyComment => "reply_comment",
            ActionKind::SendDirectMessage => "send_direct_message",
            ActionKind::PostMediaLog => "post_media_log",
            ActionKind::PostCreatorNote => "post_creator_note",
            ActionKind::VisitCommunityCircle => "visit_community_circle",
        }
    }

    /// Whatever this kind creates on the remote side must be deleted again.
    pub fn requires_cleanup(self) -> bool {
        matches!(
            self,
            ActionKind::ShareTrack
                | ActionKind::PostUpdate
                | ActionKind::ReplyComment
                | ActionKind::PostMediaLog
                | ActionKind::PostCreatorNote
        )
    }

    /// Number of successful attempts the attempt loop drives toward.
    pub fn max_retry(self) -> u32 {
        match self {
            ActionKind::ReplyComment | ActionKind::SendDirectMessage => 2,
            _ => 1,
        }
    }

    /// Whether a failed attempt is retried until the failure ceiling. Other
    /// kinds get exactly one attempt.
    pub fn retries_on_failure(self) -> bool {
        matches!(
            self,
            ActionKind::PostUpdate | ActionKind::ReplyComment | ActionKind::SendDirectMessage
        )
    }

    /// Whether the kind draws its text from the content pool.
    pub fn carries_content(self) -> bool {
        matches!(
            self,
            ActionKind::PostUpdate
                | ActionKind::ReplyComment
                | ActionKind::SendDirectMessage
                | ActionKind::PostMediaLog
                | ActionKind::PostCreatorNote
        )
    }

    pub fn jitter_slot(self) -> JitterSlot {
        match self {
            ActionKind::ShareTrack | ActionKind::PostUpdate => JitterSlot::Update,
            ActionKind::ReplyComment | ActionKind::PostCreatorNote => JitterSlot::Comment,
            ActionKind::SendDirectMessage => JitterSlot::Message,
            ActionKind::PostMediaLog => JitterSlot::MediaLog,
            ActionKind::DailySignIn | ActionKind::VisitCommunityCircle => JitterSlot::Unpaced,
        }
    }

    /// Phrase the remote task ledger uses in the description of this kind.
    pub fn trigger_phrase(self) -> &'static str {
        match self {
            ActionKind::ShareTrack => "分享",
            ActionKind::DailySignIn => "签到",
            ActionKind::PostUpdate => "动态",
            ActionKind::ReplyComment => "评论",
            ActionKind::SendDirectMessage => "私信",
            ActionKind::PostMediaLog => "mlog",
            ActionKind::PostCreatorNote => "主创说",
            ActionKind::VisitCommunityCircle => "云圈",
        }
    }

    /// Resolve a ledger description to the kind it asks for.
    ///
    /// Phrases are matched case-sensitively and tried in dispatch order; the
    /// first hit wins, so a description mentioning both "share" and "update"
    /// resolves to `ShareTrack`.
    pub fn classify(description: &str) -> Option<ActionKind> {
        ActionKind::all()
            .iter()
            .copied()
            .find(|kind| description.contains(kind.trigger_phrase()))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = crate::error::BeanstalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::error::BeanstalkError::InvalidConfig(format!("unknown action kind '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// TaskState / TaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a remote ledger entry.
///
/// Transitions: `InProgress → CompletedUnclaimed → Claimed`. The engine only
/// observes these; the claim call is what moves an entry to `Claimed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum TaskState {
    InProgress,
    CompletedUnclaimed,
    Claimed,
}

impl TaskState {
    const COMPLETED_CODE: i64 = 20;
    const CLAIMED_CODE: i64 = 100;
}

impl From<i64> for TaskState {
    fn from(code: i64) -> Self {
        match code {
            TaskState::COMPLETED_CODE => TaskState::CompletedUnclaimed,
            TaskState::CLAIMED_CODE => TaskState::Claimed,
            _ => TaskState::InProgress,
        }
    }
}

impl From<TaskState> for i64 {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::InProgress => 0,
            TaskState::CompletedUnclaimed => TaskState::COMPLETED_CODE,
            TaskState::Claimed => TaskState::CLAIMED_CODE,
        }
    }
}

/// Identifies a ledger entry for the claim call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimToken {
    pub mission_id: i64,
    pub period: i64,
}

/// One entry of the remote reward ledger, as the reconciler sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub description: String,
    pub state: TaskState,
    #[serde(default)]
    pub reward: i64,
    #[serde(default)]
    pub claim: Option<ClaimToken>,
}

/// A weekly ledger task: one description, several stage targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTask {
    pub description: String,
    pub period: i64,
    #[serde(default)]
    pub stages: Vec<StageTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTarget {
    pub state: TaskState,
    /// Zero when the stage has no claimable mission yet.
    #[serde(default)]
    pub mission_id: i64,
    #[serde(default)]
    pub worth: i64,
}

impl WeeklyTask {
    /// Flatten stage targets into ledger entries carrying the task description.
    pub fn stage_statuses(&self) -> Vec<TaskStatus> {
        self.stages
            .iter()
            .map(|stage| TaskStatus {
                description: self.description.clone(),
                state: stage.state,
                reward: stage.worth,
                claim: (stage.mission_id != 0).then_some(ClaimToken {
                    mission_id: stage.mission_id,
                    period: self.period,
                }),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Account / AttemptResult
// ---------------------------------------------------------------------------

/// A signed-in account: the identity the remote service resolved from the
/// stored credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user_id: u64,
    pub nickname: String,
    pub credential: String,
}

/// Outcome of a single remote attempt. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub succeeded: bool,
    pub remote_code: i64,
    pub remote_message: String,
    pub artifact_id: Option<i64>,
}

impl AttemptResult {
    pub fn from_code(code: i64, message: impl Into<String>, artifact_id: Option<i64>) -> Self {
        Self {
            succeeded: code == SUCCESS_CODE,
            remote_code: code,
            remote_message: message.into(),
            artifact_id,
        }
    }

    /// An attempt that never got a response (transport failure).
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            remote_code: 0,
            remote_message: reason.into(),
            artifact_id: None,
        }
    }
}

/// Client platform a daily check-in is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Mobile,
    Web,
}

impl Platform {
    pub fn all() -> &'static [Platform] {
        &[Platform::Mobile, Platform::Web]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Mobile => "mobile",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_order_matches_ord() {
        let mut sorted = ActionKind::all().to_vec();
        sorted.sort();
        assert_eq!(sorted, ActionKind::all());
    }

    #[test]
    fn classify_known_phrases() {
        assert_eq!(ActionKind::classify("每日分享歌曲"), Some(ActionKind::ShareTrack));
        assert_eq!(ActionKind::classify("音乐人签到"), Some(ActionKind::DailySignIn));
        assert_eq!(ActionKind::classify("发布动态"), Some(ActionKind::PostUpdate));
        assert_eq!(ActionKind::classify("回复粉丝评论"), Some(ActionKind::ReplyComment));
        assert_eq!(ActionKind::classify("回复粉丝私信"), Some(ActionKind::SendDirectMessage));
        assert_eq!(ActionKind::classify("发布mlog"), Some(ActionKind::PostMediaLog));
        assert_eq!(ActionKind::classify("发布主创说"), Some(ActionKind::PostCreatorNote));
        assert_eq!(ActionKind::classify("访问自己的云圈"), Some(ActionKind::VisitCommunityCircle));
    }

    #[test]
    fn classify_prefers_earlier_kind() {
        assert_eq!(ActionKind::classify("分享动态"), Some(ActionKind::ShareTrack));
    }

    #[test]
    fn classify_unknown_is_none() {
        assert_eq!(ActionKind::classify("上传一首新歌"), None);
        assert_eq!(ActionKind::classify("发布Mlog"), None);
    }

    #[test]
    fn action_kind_parses_from_str() {
        for kind in ActionKind::all() {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), *kind);
        }
        assert!("nope".parse::<ActionKind>().is_err());
    }

    #[test]
    fn cleanup_and_retry_table() {
        assert!(!ActionKind::DailySignIn.requires_cleanup());
        assert!(!ActionKind::SendDirectMessage.requires_cleanup());
        assert!(ActionKind::ShareTrack.requires_cleanup());
        assert_eq!(ActionKind::ReplyComment.max_retry(), 2);
        assert_eq!(ActionKind::SendDirectMessage.max_retry(), 2);
        assert_eq!(ActionKind::PostUpdate.max_retry(), 1);
        let retried: Vec<_> = ActionKind::all()
            .iter()
            .filter(|k| k.retries_on_failure())
            .copied()
            .collect();
        assert_eq!(
            retried,
            vec![
                ActionKind::PostUpdate,
                ActionKind::ReplyComment,
                ActionKind::SendDirectMessage
            ]
        );
    }

    #[test]
    fn task_state_from_remote_code() {
        assert_eq!(TaskState::from(20), TaskState::CompletedUnclaimed);
        assert_eq!(TaskState::from(100), TaskState::Claimed);
        assert_eq!(TaskState::from(10), TaskState::InProgress);
        let parsed: TaskStatus =
            serde_json::from_str(r#"{"description":"发布动态","state":100}"#).unwrap();
        assert_eq!(parsed.state, TaskState::Claimed);
        assert!(parsed.claim.is_none());
    }

    #[test]
    fn weekly_stages_without_mission_have_no_claim() {
        let task = WeeklyTask {
            description: "回复评论".into(),
            period: 7,
            stages: vec![
                StageTarget { state: TaskState::CompletedUnclaimed, mission_id: 0, worth: 5 },
                StageTarget { state: TaskState::CompletedUnclaimed, mission_id: 9, worth: 10 },
            ],
        };
        let statuses = task.stage_statuses();
        assert!(statuses[0].claim.is_none());
        assert_eq!(statuses[1].claim, Some(ClaimToken { mission_id: 9, period: 7 }));
        assert_eq!(statuses[1].reward, 10);
    }

    #[test]
    fn attempt_result_success_code() {
        assert!(AttemptResult::from_code(200, "", Some(1)).succeeded);
        assert!(!AttemptResult::from_code(301, "nope", None).succeeded);
        assert!(!AttemptResult::unreachable("timeout").succeeded);
    }
}
