//! Per-account workflow and the run over all configured accounts.
//!
//! ```text
//! SigningIn ──► Reconciling ──► ExecutingActions ──► Reconciling (once) ──► Done
//!     │              ▲
//!     │              └── creator accounts only
//!     └──► (membership growth, when configured) ──► Done
//! ```

use crate::client::{RemoteActionClient, UserProfile};
use crate::config::Config;
use crate::error::{BeanstalkError, Result};
use crate::executor::{ActionExecutor, ActionParams};
use crate::jitter::Sleeper;
use crate::reconciler::{RewardReconciler, SETTLE_DELAY_SECS};
use crate::summary::{ExecutionSummary, RunSession};
use crate::types::{Account, Platform};
use std::sync::Arc;

/// Drives every configured account through its workflow, one at a time.
pub struct AccountOrchestrator {
    config: Arc<Config>,
    client: Arc<dyn RemoteActionClient>,
    sleeper: Arc<dyn Sleeper>,
}

impl AccountOrchestrator {
    pub fn new(
        config: Arc<Config>,
        client: Arc<dyn RemoteActionClient>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            client,
            sleeper,
        }
    }

    /// Process all accounts in configuration order.
    ///
    /// An account that cannot be processed is recorded in the session as a
    /// failure line and the next account still runs. Each account's state
    /// lives in its own [`ExecutionSummary`], so a failed account leaves
    /// nothing behind for the others.
    pub async fn run_all(&self) -> RunSession {
        let mut session = RunSession::new();
        for index in 0..self.config.accounts.len() {
            session.begin_account(index);
            let label = self.config.accounts[index].display_label(index);
            tracing::info!(account = %label, "processing account");

            match self.process_account(index).await {
                Ok(summary) => session.merge(summary),
                Err(e) => {
                    tracing::error!(account = %label, error = %e, "account skipped");
                    session.record_failure(&label, e.to_string());
                }
            }
        }
        session
    }

    /// Run one account's workflow.
    ///
    /// Returns `Err` only when the account cannot be signed in; later
    /// failures end the workflow early and are reported in the summary.
    pub async fn process_account(&self, index: usize) -> Result<ExecutionSummary> {
        let account = self.sign_in(index).await?;
        let mut summary = ExecutionSummary::new(&account.nickname);

        if let Err(e) = self.workflow(index, &account, &mut summary).await {
            tracing::error!(account = %account.nickname, error = %e, "workflow aborted");
            summary.push(format!("workflow aborted: {e}"));
        }
        Ok(summary)
    }

    async fn sign_in(&self, index: usize) -> Result<Account> {
        let cfg = &self.config.accounts[index];
        let label = cfg.display_label(index);
        let login = match self.client.verify_session(&cfg.credential).await {
            Ok(login) => login,
            Err(e) => {
                tracing::error!(account = %label, error = %e, "could not reach the service to verify the session");
                return Err(e);
            }
        };
        if login.user_id == 0 {
            tracing::error!(account = %label, "stored credential was rejected; it is invalid or expired");
            return Err(BeanstalkError::CredentialRejected(index));
        }
        tracing::info!(account = %login.nickname, user_id = login.user_id, "signed in");
        Ok(Account {
            user_id: login.user_id,
            nickname: login.nickname,
            credential: cfg.credential.clone(),
        })
    }

    async fn workflow(
        &self,
        index: usize,
        account: &Account,
        summary: &mut ExecutionSummary,
    ) -> Result<()> {
        self.check_in(account, summary).await;

        let profile = self.client.fetch_profile(account).await?;
        if profile.is_creator() {
            self.creator_tasks(index, account, &profile, summary).await?;
        } else {
            tracing::debug!(account = %account.nickname, "not a creator account; skipping ledger");
        }

        if self.config.membership_growth {
            self.membership_growth(account, summary).await?;
        }
        Ok(())
    }

    async fn check_in(&self, account: &Account, summary: &mut ExecutionSummary) {
        for &platform in Platform::all() {
            match self.client.daily_check_in(account, platform).await {
                Ok(resp) if resp.is_success() => {
                    tracing::info!(account = %account.nickname, %platform, "checked in");
                    summary.push(format!("checked in ({platform})"));
                }
                Ok(resp) => {
                    tracing::info!(account = %account.nickname, %platform, code = resp.code, reason = %resp.message, "check-in not accepted");
                }
                Err(e) => {
                    tracing::warn!(account = %account.nickname, %platform, error = %e, "check-in failed");
                }
            }
        }
    }

    async fn creator_tasks(
        &self,
        index: usize,
        account: &Account,
        profile: &UserProfile,
        summary: &mut ExecutionSummary,
    ) -> Result<()> {
        let client = self.client.as_ref();
        let sleeper = self.sleeper.as_ref();

        let circle_id = match client.fetch_artist_home(account, profile.artist_id).await {
            Ok(home) => home.circle_id(),
            Err(e) => {
                tracing::warn!(account = %account.nickname, error = %e, "could not load artist homepage");
                None
            }
        };
        let params = ActionParams::for_account(&self.config, &self.config.accounts[index], circle_id);

        let reconciler = RewardReconciler::new(client, sleeper);
        let found = reconciler.reconcile(account, summary).await?;
        tracing::info!(
            account = %account.nickname,
            issued = found.claims_issued,
            claimed = found.claims_succeeded,
            "rewards reconciled"
        );
        if found.eligible.is_empty() {
            return Ok(());
        }

        tracing::info!(account = %account.nickname, count = found.eligible.len(), "running creator tasks");
        let executor = ActionExecutor::new(client, sleeper, &self.config.jitter);
        for &kind in &found.eligible {
            tracing::info!(account = %account.nickname, %kind, "running action");
            match executor.execute(kind, account, &params).await {
                Ok(outcome) => summary.push(outcome.describe()),
                Err(BeanstalkError::ActionUnavailable { reason, .. }) => {
                    tracing::warn!(account = %account.nickname, %kind, %reason, "action skipped");
                    summary.push(format!("{kind} skipped: {reason}"));
                }
                Err(e) => {
                    tracing::error!(account = %account.nickname, %kind, error = %e, "action failed");
                    summary.push(format!("{kind} failed: {e}"));
                }
            }
        }

        tracing::info!(account = %account.nickname, "creator tasks finished; checking rewards again");
        sleeper.sleep(SETTLE_DELAY_SECS).await;
        let after = reconciler.reconcile(account, summary).await?;
        tracing::info!(
            account = %account.nickname,
            issued = after.claims_issued,
            claimed = after.claims_succeeded,
            "rewards reconciled after actions"
        );
        Ok(())
    }

    async fn membership_growth(&self, account: &Account, summary: &mut ExecutionSummary) -> Result<()> {
        let membership = self.client.fetch_membership(account).await?;
        if membership.level == 0 {
            tracing::info!(account = %account.nickname, "no membership; skipping growth points");
            return Ok(());
        }
        let resp = self.client.claim_all_membership_rewards(account).await?;
        if resp.is_success() {
            summary.push("membership growth points claimed");
        } else {
            tracing::warn!(account = %account.nickname, code = resp.code, reason = %resp.message, "membership claim rejected");
        }
        Ok(())
    }
}
