//! Runs one action kind end to end.
//!
//! Each action is a bounded attempt loop. Successful attempts of kinds that
//! must leave no trace are followed by a delete of the created artifact, and
//! every attempt is followed by a pacing delay drawn from the kind's jitter
//! profile.

use crate::client::RemoteActionClient;
use crate::config::{AccountConfig, Config, JitterConfig, MediaLogConfig, ReplyTarget};
use crate::error::{BeanstalkError, Result};
use crate::jitter::{JitterSource, Sleeper};
use crate::types::{Account, ActionKind, AttemptResult};
use std::path::PathBuf;

/// Failed attempts after which an action is abandoned.
pub const FAILURE_CEILING: u32 = 5;

// ---------------------------------------------------------------------------
// ActionParams
// ---------------------------------------------------------------------------

/// Everything an account's actions draw from: content pool, targets,
/// recipients.
#[derive(Debug, Clone, Default)]
pub struct ActionParams {
    pub content: Vec<String>,
    pub share_track_id: Option<u64>,
    pub reply_target: Option<ReplyTarget>,
    pub recipients: Vec<u64>,
    pub media_log: Option<MediaLogConfig>,
    pub circle_id: Option<String>,
}

impl ActionParams {
    pub fn for_account(config: &Config, account: &AccountConfig, circle_id: Option<String>) -> Self {
        Self {
            content: config.content.clone(),
            share_track_id: config.share.as_ref().map(|s| s.track_id),
            reply_target: account.reply_target,
            recipients: account.recipients.clone(),
            media_log: config.media_log.clone(),
            circle_id,
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionOutcome
// ---------------------------------------------------------------------------

/// Result of deleting an artifact after a successful creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub artifact_id: i64,
    pub deleted: bool,
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub kind: ActionKind,
    pub attempts: Vec<AttemptResult>,
    pub cleanups: Vec<CleanupOutcome>,
}

impl ExecutionOutcome {
    fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            attempts: Vec::new(),
            cleanups: Vec::new(),
        }
    }

    pub fn successes(&self) -> usize {
        self.attempts.iter().filter(|a| a.succeeded).count()
    }

    pub fn cleanup_failures(&self) -> usize {
        self.cleanups.iter().filter(|c| !c.deleted).count()
    }

    /// One summary line for the notification.
    pub fn describe(&self) -> String {
        let mut line = format!(
            "{} done ({} of {} attempts succeeded)",
            self.kind,
            self.successes(),
            self.attempts.len()
        );
        let failed = self.cleanup_failures();
        if failed > 0 {
            line.push_str(&format!(", {failed} artifact(s) left undeleted"));
        }
        line
    }
}

// ---------------------------------------------------------------------------
// Attempt plans
// ---------------------------------------------------------------------------

/// Per-kind inputs, resolved once before the attempt loop starts.
enum Plan<'p> {
    SignIn,
    Share { track_id: u64 },
    Update,
    Reply { target: ReplyTarget },
    CreatorNote { track_id: u64 },
    Message { recipients: &'p [u64] },
    MediaLog { pictures: Vec<PathBuf>, track_ids: &'p [u64] },
    Circle { circle_id: &'p str },
}

// ---------------------------------------------------------------------------
// ActionExecutor
// ---------------------------------------------------------------------------

pub struct ActionExecutor<'a> {
    client: &'a dyn RemoteActionClient,
    sleeper: &'a dyn Sleeper,
    profiles: &'a JitterConfig,
    jitter: JitterSource,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(
        client: &'a dyn RemoteActionClient,
        sleeper: &'a dyn Sleeper,
        profiles: &'a JitterConfig,
    ) -> Self {
        Self {
            client,
            sleeper,
            profiles,
            jitter: JitterSource::new(),
        }
    }

    /// Run `kind` for `account` until it has succeeded `kind.max_retry()`
    /// times or has failed [`FAILURE_CEILING`] times. Kinds that do not
    /// retry on failure give up after their first failed attempt.
    ///
    /// Giving up is returned as [`BeanstalkError::FailureCeiling`].
    /// Missing inputs (no content, no target) are returned as
    /// [`BeanstalkError::ActionUnavailable`] without any remote call.
    pub async fn execute(
        &self,
        kind: ActionKind,
        account: &Account,
        params: &ActionParams,
    ) -> Result<ExecutionOutcome> {
        let plan = prepare(kind, params).await?;
        let profile = self.profiles.profile_for(kind);
        let mut outcome = ExecutionOutcome::new(kind);
        let mut successes = 0;
        let mut failures = 0;
        let ceiling = if kind.retries_on_failure() {
            FAILURE_CEILING
        } else {
            1
        };

        while successes < kind.max_retry() {
            if failures >= ceiling {
                tracing::error!(account = %account.nickname, %kind, failures, "giving up on action");
                return Err(BeanstalkError::FailureCeiling { kind, failures });
            }

            let attempt = self.attempt(kind, account, &plan, params).await;
            if attempt.succeeded {
                successes += 1;
                tracing::info!(
                    account = %account.nickname,
                    %kind,
                    artifact_id = ?attempt.artifact_id,
                    "attempt succeeded"
                );
                if kind.requires_cleanup() {
                    match attempt.artifact_id {
                        Some(id) => {
                            if profile.between_create_and_delete {
                                self.pause(account, self.jitter.sample(&profile)).await;
                            }
                            outcome.cleanups.push(self.cleanup(account, &plan, id).await);
                        }
                        None => {
                            tracing::warn!(account = %account.nickname, %kind, "no artifact id returned; nothing to delete")
                        }
                    }
                }
            } else {
                failures += 1;
                tracing::warn!(
                    account = %account.nickname,
                    %kind,
                    code = attempt.remote_code,
                    reason = %attempt.remote_message,
                    failures,
                    "attempt failed"
                );
            }
            outcome.attempts.push(attempt);
            self.pause(account, self.jitter.sample(&profile)).await;
        }

        Ok(outcome)
    }

    async fn pause(&self, account: &Account, secs: u64) {
        if secs > 0 {
            tracing::info!(account = %account.nickname, secs, "pausing");
            self.sleeper.sleep(secs).await;
        }
    }

    async fn attempt(
        &self,
        kind: ActionKind,
        account: &Account,
        plan: &Plan<'_>,
        params: &ActionParams,
    ) -> AttemptResult {
        let text = self.jitter.pick(&params.content).map(String::as_str).unwrap_or("");
        let client = self.client;
        let response = match plan {
            Plan::SignIn => client.creator_sign_in(account).await,
            Plan::Share { track_id } => client.share_track(account, *track_id).await,
            Plan::Update => client.post_update(account, text, &[]).await,
            Plan::Reply { target } => {
                client
                    .reply_comment(account, target.track_id, target.comment_id, text)
                    .await
            }
            Plan::CreatorNote { track_id } => client.add_comment(account, *track_id, text).await,
            Plan::Message { recipients } => {
                let recipient = match recipients {
                    [only] => *only,
                    _ => self.jitter.pick(*recipients).copied().unwrap_or_default(),
                };
                return match client.send_direct_message(account, &[recipient], text).await {
                    Ok(receipt) => {
                        if receipt.blacklisted {
                            tracing::warn!(account = %account.nickname, recipient, "recipient has blocked this account");
                        }
                        AttemptResult::from_code(receipt.code, receipt.message, None)
                    }
                    Err(e) => AttemptResult::unreachable(e.to_string()),
                };
            }
            Plan::MediaLog { pictures, track_ids } => {
                let picture = self.jitter.pick(pictures).cloned();
                let track_id = self.jitter.pick(*track_ids).copied().unwrap_or_default();
                let images: Vec<PathBuf> = picture.into_iter().collect();
                client.post_media_log(account, text, track_id, &images).await
            }
            Plan::Circle { circle_id } => client.fetch_community_circle(account, circle_id).await,
        };

        match response {
            Ok(resp) => AttemptResult::from_code(resp.code, resp.message, resp.artifact_id),
            Err(e) => {
                tracing::warn!(account = %account.nickname, %kind, error = %e, "remote call failed");
                AttemptResult::unreachable(e.to_string())
            }
        }
    }

    /// Delete a created artifact. Never retried, never counted as a failed
    /// attempt.
    async fn cleanup(&self, account: &Account, plan: &Plan<'_>, artifact_id: i64) -> CleanupOutcome {
        let response = match plan {
            Plan::Reply { target } => {
                self.client
                    .delete_comment(account, target.track_id, artifact_id)
                    .await
            }
            Plan::CreatorNote { track_id } => {
                self.client.delete_comment(account, *track_id, artifact_id).await
            }
            _ => self.client.delete_update(account, artifact_id).await,
        };

        let (code, message) = match response {
            Ok(resp) => (resp.code, resp.message),
            Err(e) => (0, e.to_string()),
        };
        let deleted = code == crate::types::SUCCESS_CODE;
        if deleted {
            tracing::info!(account = %account.nickname, artifact_id, "artifact deleted");
        } else {
            tracing::error!(account = %account.nickname, artifact_id, code, reason = %message, "failed to delete artifact");
        }
        CleanupOutcome {
            artifact_id,
            deleted,
            code,
            message,
        }
    }
}

async fn prepare(kind: ActionKind, params: &ActionParams) -> Result<Plan<'_>> {
    let unavailable = |reason: &str| BeanstalkError::ActionUnavailable {
        kind,
        reason: reason.to_string(),
    };
    if kind.carries_content() && params.content.is_empty() {
        return Err(unavailable("content pool is empty"));
    }

    let plan = match kind {
        ActionKind::DailySignIn => Plan::SignIn,
        ActionKind::ShareTrack => Plan::Share {
            track_id: params
                .share_track_id
                .ok_or_else(|| unavailable("no track configured for sharing"))?,
        },
        ActionKind::PostUpdate => Plan::Update,
        ActionKind::ReplyComment => Plan::Reply {
            target: params
                .reply_target
                .ok_or_else(|| unavailable("no reply target configured"))?,
        },
        ActionKind::PostCreatorNote => Plan::CreatorNote {
            track_id: params
                .reply_target
                .map(|t| t.track_id)
                .ok_or_else(|| unavailable("no reply target configured"))?,
        },
        ActionKind::SendDirectMessage => {
            if params.recipients.is_empty() {
                return Err(unavailable("no recipients configured"));
            }
            Plan::Message {
                recipients: &params.recipients,
            }
        }
        ActionKind::PostMediaLog => {
            let media_log = params
                .media_log
                .as_ref()
                .ok_or_else(|| unavailable("media log is not configured"))?;
            if media_log.track_ids.is_empty() {
                return Err(unavailable("no media log tracks configured"));
            }
            let pictures = list_pictures(&media_log.picture_dir)
                .await
                .map_err(|e| unavailable(&format!("cannot read {}: {e}", media_log.picture_dir.display())))?;
            if pictures.is_empty() {
                return Err(unavailable(&format!(
                    "{} contains no pictures",
                    media_log.picture_dir.display()
                )));
            }
            Plan::MediaLog {
                pictures,
                track_ids: &media_log.track_ids,
            }
        }
        ActionKind::VisitCommunityCircle => Plan::Circle {
            circle_id: params
                .circle_id
                .as_deref()
                .ok_or_else(|| unavailable("no community circle found"))?,
        },
    };
    Ok(plan)
}

async fn list_pictures(dir: &std::path::Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut pictures = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            pictures.push(entry.path());
        }
    }
    pictures.sort();
    Ok(pictures)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
