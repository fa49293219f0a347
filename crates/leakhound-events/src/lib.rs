//! Inbound webhook event model for leakhound.
//!
//! The platform delivers events as JSON with the variant named in the
//! `X-GitHub-Event` header. [`Event::decode`] turns a `(header, body)`
//! pair into a tagged sum; unknown variants decode to `None` and are
//! acknowledged without action. Each variant carries the fields the
//! scanning pipeline needs and nothing more.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Sender account kind that is filtered out to prevent the service
/// reacting to its own edits.
pub const BOT_SENDER_KIND: &str = "Bot";

/// The installation identity carried by every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Installation {
    /// 64-bit installation identifier scoped to one repository owner.
    pub id: u64,
}

/// The account that triggered the event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sender {
    /// Account login.
    pub login: String,
    /// Account kind: `User`, `Organization`, or `Bot`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl Sender {
    /// Whether this sender is a bot account.
    pub fn is_bot(&self) -> bool {
        self.kind == BOT_SENDER_KIND
    }
}

/// Repository owner as delivered in event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Owner {
    /// Owner login.
    pub login: String,
}

/// The repository an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    /// Repository name.
    pub name: String,
    /// Repository owner.
    pub owner: Owner,
}

/// The account that performed a push.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pusher {
    /// Pusher account name.
    pub name: String,
}

/// One commit in a push payload, with its changed-file lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushCommit {
    /// Commit identifier.
    pub id: String,
    /// Commit timestamp; pushes are walked oldest first.
    pub timestamp: DateTime<FixedOffset>,
    /// Paths added by the commit.
    #[serde(default)]
    pub added: Vec<String>,
    /// Paths modified by the commit.
    #[serde(default)]
    pub modified: Vec<String>,
    /// Paths removed by the commit.
    #[serde(default)]
    pub removed: Vec<String>,
}

/// A repository push.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    /// Installation identity.
    pub installation: Installation,
    /// Repository pushed to.
    pub repository: Repository,
    /// Account that performed the push; tracking issues are assigned to it.
    pub pusher: Pusher,
    /// Pushed commits in payload order.
    #[serde(default)]
    pub commits: Vec<PushCommit>,
    /// Triggering account, when delivered.
    pub sender: Option<Sender>,
}

/// An issue in an issues event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    /// Issue number.
    pub number: u64,
    /// Issue body; absent bodies scan to zero matches.
    pub body: Option<String>,
}

/// An issue opened or edited.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    /// Action verb, e.g. `opened`.
    pub action: String,
    /// Installation identity.
    pub installation: Installation,
    /// Repository the issue lives in.
    pub repository: Repository,
    /// The issue.
    pub issue: Issue,
    /// Triggering account.
    pub sender: Option<Sender>,
}

/// A comment on an issue or a pull request review.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    /// Comment identifier.
    pub id: u64,
    /// Comment body.
    pub body: Option<String>,
}

/// An issue comment created or edited.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentEvent {
    /// Action verb, e.g. `created`.
    pub action: String,
    /// Installation identity.
    pub installation: Installation,
    /// Repository the issue lives in.
    pub repository: Repository,
    /// The issue the comment is attached to.
    pub issue: Issue,
    /// The comment.
    pub comment: Comment,
    /// Triggering account.
    pub sender: Option<Sender>,
}

/// A pull request in a pull-request event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    /// Pull request number.
    pub number: u64,
    /// Pull request description.
    pub body: Option<String>,
}

/// A pull request opened or edited.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Action verb, e.g. `opened`.
    pub action: String,
    /// Installation identity.
    pub installation: Installation,
    /// Repository the pull request targets.
    pub repository: Repository,
    /// The pull request.
    pub pull_request: PullRequest,
    /// Triggering account.
    pub sender: Option<Sender>,
}

/// A review attached to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Review {
    /// Review identifier.
    pub id: u64,
    /// Review body.
    pub body: Option<String>,
}

/// A pull request review submitted or edited.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestReviewEvent {
    /// Action verb, e.g. `submitted`.
    pub action: String,
    /// Installation identity.
    pub installation: Installation,
    /// Repository the pull request targets.
    pub repository: Repository,
    /// The pull request under review.
    pub pull_request: PullRequest,
    /// The review.
    pub review: Review,
    /// Triggering account.
    pub sender: Option<Sender>,
}

/// A pull request review comment created or edited.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestReviewCommentEvent {
    /// Action verb, e.g. `created`.
    pub action: String,
    /// Installation identity.
    pub installation: Installation,
    /// Repository the pull request targets.
    pub repository: Repository,
    /// The pull request the comment belongs to.
    pub pull_request: PullRequest,
    /// The review comment.
    pub comment: Comment,
    /// Triggering account.
    pub sender: Option<Sender>,
}

/// Reference to a pull request attached to a check suite.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestRef {
    /// Pull request number.
    pub number: u64,
}

/// The check suite in a check-suite event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckSuite {
    /// Head commit of the suite.
    pub head_sha: String,
    /// Pull requests attached to the suite. Empty suites are skipped.
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
}

/// A CI check suite requested or rerequested.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuiteEvent {
    /// Action verb, e.g. `requested`.
    pub action: String,
    /// Installation identity.
    pub installation: Installation,
    /// Repository the suite runs against.
    pub repository: Repository,
    /// The check suite.
    pub check_suite: CheckSuite,
    /// Triggering account.
    pub sender: Option<Sender>,
}

/// An app installation created, deleted, or otherwise changed.
/// Currently acknowledged without action.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationEvent {
    /// Action verb, e.g. `created`.
    pub action: String,
    /// Installation identity.
    pub installation: Installation,
    /// Triggering account.
    pub sender: Option<Sender>,
}

/// Tagged sum of every inbound event variant the service handles.
#[derive(Debug, Clone)]
pub enum Event {
    /// `installation` event, any action.
    Installation(InstallationEvent),
    /// `push` event, any action.
    Push(PushEvent),
    /// `issues` event.
    Issues(IssuesEvent),
    /// `issue_comment` event.
    IssueComment(IssueCommentEvent),
    /// `pull_request` event.
    PullRequest(PullRequestEvent),
    /// `pull_request_review` event.
    PullRequestReview(PullRequestReviewEvent),
    /// `pull_request_review_comment` event.
    PullRequestReviewComment(PullRequestReviewCommentEvent),
    /// `check_suite` event.
    CheckSuite(CheckSuiteEvent),
}

impl Event {
    /// Decode an event from its `X-GitHub-Event` header value and raw
    /// body. Unknown variants return `Ok(None)` and are acknowledged
    /// without action; a malformed body for a known variant is an error.
    pub fn decode(kind: &str, body: &[u8]) -> Result<Option<Self>, serde_json::Error> {
        let event = match kind {
            "installation" => Self::Installation(serde_json::from_slice(body)?),
            "push" => Self::Push(serde_json::from_slice(body)?),
            "issues" => Self::Issues(serde_json::from_slice(body)?),
            "issue_comment" => Self::IssueComment(serde_json::from_slice(body)?),
            "pull_request" => Self::PullRequest(serde_json::from_slice(body)?),
            "pull_request_review" => Self::PullRequestReview(serde_json::from_slice(body)?),
            "pull_request_review_comment" => {
                Self::PullRequestReviewComment(serde_json::from_slice(body)?)
            }
            "check_suite" => Self::CheckSuite(serde_json::from_slice(body)?),
            _ => return Ok(None),
        };

        Ok(Some(event))
    }

    /// The variant name, as used in the event-type header.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Installation(_) => "installation",
            Self::Push(_) => "push",
            Self::Issues(_) => "issues",
            Self::IssueComment(_) => "issue_comment",
            Self::PullRequest(_) => "pull_request",
            Self::PullRequestReview(_) => "pull_request_review",
            Self::PullRequestReviewComment(_) => "pull_request_review_comment",
            Self::CheckSuite(_) => "check_suite",
        }
    }

    /// The installation identifier carried by the event.
    pub fn installation_id(&self) -> u64 {
        match self {
            Self::Installation(e) => e.installation.id,
            Self::Push(e) => e.installation.id,
            Self::Issues(e) => e.installation.id,
            Self::IssueComment(e) => e.installation.id,
            Self::PullRequest(e) => e.installation.id,
            Self::PullRequestReview(e) => e.installation.id,
            Self::PullRequestReviewComment(e) => e.installation.id,
            Self::CheckSuite(e) => e.installation.id,
        }
    }

    /// Whether the bot-sender filter applies to this variant. Pushes and
    /// check suites are exempt: their content originates in commits, not
    /// in a body the service itself may have edited.
    pub fn bot_filter_applies(&self) -> bool {
        !matches!(self, Self::Push(_) | Self::CheckSuite(_))
    }

    /// Whether the triggering account is a bot.
    pub fn sender_is_bot(&self) -> bool {
        let sender = match self {
            Self::Installation(e) => &e.sender,
            Self::Push(e) => &e.sender,
            Self::Issues(e) => &e.sender,
            Self::IssueComment(e) => &e.sender,
            Self::PullRequest(e) => &e.sender,
            Self::PullRequestReview(e) => &e.sender,
            Self::PullRequestReviewComment(e) => &e.sender,
            Self::CheckSuite(e) => &e.sender,
        };

        sender.as_ref().is_some_and(Sender::is_bot)
    }

    /// Whether the action verb is in the handled set for this variant.
    pub fn action_accepted(&self) -> bool {
        match self {
            Self::Installation(_) | Self::Push(_) => true,
            Self::Issues(e) => matches!(e.action.as_str(), "opened" | "edited"),
            Self::IssueComment(e) => matches!(e.action.as_str(), "created" | "edited"),
            Self::PullRequest(e) => matches!(e.action.as_str(), "opened" | "edited"),
            Self::PullRequestReview(e) => matches!(e.action.as_str(), "submitted" | "edited"),
            Self::PullRequestReviewComment(e) => {
                matches!(e.action.as_str(), "created" | "edited")
            }
            Self::CheckSuite(e) => matches!(e.action.as_str(), "requested" | "rerequested"),
        }
    }
}
