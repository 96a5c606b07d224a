//! Human-readable results of a run.
//!
//! An [`ExecutionSummary`] belongs to one account for one pass. The
//! [`RunSession`] owns everything that spans accounts and is threaded
//! explicitly through the run; nothing here outlives a run.

/// Outcome lines and the latest reward balance for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub nickname: String,
    pub lines: Vec<String>,
    pub balance: Option<i64>,
}

impl ExecutionSummary {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            lines: Vec::new(),
            balance: None,
        }
    }

    /// Append a line prefixed with the account's nickname.
    pub fn push(&mut self, line: impl AsRef<str>) {
        self.lines.push(format!("[{}] {}", self.nickname, line.as_ref()));
    }

    pub fn record_balance(&mut self, amount: i64) {
        self.balance = Some(amount);
        self.push(format!("current balance: {amount}"));
    }
}

/// Run-wide state: the aggregated notification lines and the index of the
/// account being processed.
#[derive(Debug, Clone, Default)]
pub struct RunSession {
    lines: Vec<String>,
    current_account: Option<usize>,
    failed_accounts: usize,
}

impl RunSession {
    pub const HEADER: &'static str = "beanstalk run finished";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_account(&mut self, index: usize) {
        self.current_account = Some(index);
    }

    pub fn current_account(&self) -> Option<usize> {
        self.current_account
    }

    /// Fold a finished account's summary into the run.
    pub fn merge(&mut self, summary: ExecutionSummary) {
        self.lines.extend(summary.lines);
        self.current_account = None;
    }

    /// Record an account that could not be processed.
    pub fn record_failure(&mut self, label: &str, reason: impl AsRef<str>) {
        self.failed_accounts += 1;
        self.lines.push(format!("[{label}] {}", reason.as_ref()));
        self.current_account = None;
    }

    pub fn failed_accounts(&self) -> usize {
        self.failed_accounts
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The plain-text notification: a header line, then one line per outcome.
    pub fn message(&self) -> String {
        std::iter::once(Self::HEADER)
            .chain(self.lines.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
