//! Reward ledger reconciliation.
//!
//! Reads the daily and weekly ledgers, claims every completed-but-unclaimed
//! entry, and reports which action kinds are still worth running.

use crate::client::RemoteActionClient;
use crate::error::Result;
use crate::jitter::Sleeper;
use crate::summary::ExecutionSummary;
use crate::types::{Account, ActionKind, TaskState, TaskStatus};
use std::collections::BTreeSet;

/// Pause after claiming, before the balance is read again.
pub const SETTLE_DELAY_SECS: u64 = 10;

/// What one reconciliation pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Kinds with an unfinished ledger entry, in dispatch order.
    pub eligible: BTreeSet<ActionKind>,
    pub claims_issued: usize,
    pub claims_succeeded: usize,
}

pub struct RewardReconciler<'a> {
    client: &'a dyn RemoteActionClient,
    sleeper: &'a dyn Sleeper,
}

impl<'a> RewardReconciler<'a> {
    pub fn new(client: &'a dyn RemoteActionClient, sleeper: &'a dyn Sleeper) -> Self {
        Self { client, sleeper }
    }

    /// Claim what can be claimed and return the kinds still eligible.
    ///
    /// Only failures to read the balance or the task lists are returned as
    /// errors; an individual claim failure is logged and left for the next
    /// cycle, since the ledger entry stays unclaimed.
    pub async fn reconcile(
        &self,
        account: &Account,
        summary: &mut ExecutionSummary,
    ) -> Result<Reconciliation> {
        let balance = self.client.fetch_balance(account).await?;
        tracing::info!(account = %account.nickname, balance = balance.amount, "current balance");
        summary.record_balance(balance.amount);

        let daily = self.client.fetch_daily_tasks(account).await?;
        let weekly = self.client.fetch_weekly_tasks(account).await?;
        let entries = daily
            .into_iter()
            .chain(weekly.iter().flat_map(|task| task.stage_statuses()));

        let mut result = Reconciliation::default();
        for entry in entries {
            match entry.state {
                TaskState::CompletedUnclaimed => {
                    self.claim(account, &entry, summary, &mut result).await;
                }
                TaskState::InProgress => {
                    if let Some(kind) = ActionKind::classify(&entry.description) {
                        tracing::info!(account = %account.nickname, task = %entry.description, %kind, "task not finished yet");
                        result.eligible.insert(kind);
                    }
                }
                TaskState::Claimed => {}
            }
        }

        if result.claims_issued > 0 {
            self.sleeper.sleep(SETTLE_DELAY_SECS).await;
            let balance = self.client.fetch_balance(account).await?;
            tracing::info!(account = %account.nickname, balance = balance.amount, "balance after claims");
            summary.record_balance(balance.amount);
        }
        if result.eligible.is_empty() {
            tracing::info!(account = %account.nickname, "no automatable tasks left for today");
        }
        Ok(result)
    }

    async fn claim(
        &self,
        account: &Account,
        entry: &TaskStatus,
        summary: &mut ExecutionSummary,
        result: &mut Reconciliation,
    ) {
        let Some(token) = entry.claim else {
            tracing::debug!(account = %account.nickname, task = %entry.description, "completed stage has no claimable mission");
            return;
        };
        tracing::info!(account = %account.nickname, task = %entry.description, "task completed, claiming reward");
        result.claims_issued += 1;
        match self
            .client
            .claim_reward(account, token.mission_id, token.period)
            .await
        {
            Ok(resp) if resp.is_success() => {
                result.claims_succeeded += 1;
                summary.push(format!("completed 「{}」 reward +{}", entry.description, entry.reward));
            }
            Ok(resp) => {
                tracing::error!(account = %account.nickname, task = %entry.description, code = resp.code, reason = %resp.message, "claim rejected");
            }
            Err(e) => {
                tracing::error!(account = %account.nickname, task = %entry.description, error = %e, "claim failed");
            }
        }
    }
}
