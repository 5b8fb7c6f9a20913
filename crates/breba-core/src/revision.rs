//! Specification revision after an edit
//!
//! Once an edit lands, the builder agent sees the user's instruction together
//! with the page diff and decides whether the site specification must change.
//! A change caused by the generator not following the existing specification
//! leaves the specification alone.

use crate::error::{GenerationError, ReconcileError};
use crate::session::SessionId;
use crate::workflow::ReconcileOutcome;
use async_trait::async_trait;

/// Reply of a conversational agent
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentReply {
    /// Reply text
    pub content: String,
    /// False when the agent is waiting for the user
    pub is_task_complete: bool,
}

/// The agent that owns the site specification
#[async_trait]
pub trait SpecificationAgent: Send + Sync {
    /// Send one message within a session
    async fn invoke(&self, session: &SessionId, message: &str)
        -> Result<AgentReply, GenerationError>;
}

/// What the builder agent did with the specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecRevision {
    /// The edit changed nothing; the agent was not asked
    Unchanged,
    /// Agent finished; carries its resulting specification
    Revised(String),
    /// Agent needs the user to answer before it can finish
    NeedsInput(String),
}

/// Standing directive sent with every revision request
pub const REVISION_DIRECTIVE: &str = "When a user requests a change to the website, update the \
website specification to reflect the new requirement, unless the requested change is already \
explicitly included in the current specification. Only refrain from updating the specification \
if the issue was due to an implementation error, where the generator did not follow the existing \
specification. IMPORTANT: if the diff shows that the issue stemmed from a bug in the \
implementation, do not modify the website specification.";

/// Message asking the builder agent to revise after `instruction` produced `diff`
#[must_use]
pub fn revision_message(instruction: &str, diff: &str) -> String {
    format!(
        "{instruction}\n\nIn response to the user message, the generator modified the output \
         according to this diff:\n{diff}\n{REVISION_DIRECTIVE}"
    )
}

/// Hand an applied edit to the builder agent
///
/// # Errors
/// `Generation` if the agent call fails
pub async fn revise_specification(
    agent: &dyn SpecificationAgent,
    session: &SessionId,
    instruction: &str,
    outcome: &ReconcileOutcome,
) -> Result<SpecRevision, ReconcileError> {
    if outcome.is_unchanged() {
        tracing::debug!(%session, "edit changed nothing, specification kept");
        return Ok(SpecRevision::Unchanged);
    }

    let message = revision_message(instruction, &outcome.diff);
    let reply = agent.invoke(session, &message).await?;

    if reply.is_task_complete {
        tracing::info!(%session, "specification revised");
        Ok(SpecRevision::Revised(reply.content))
    } else {
        tracing::info!(%session, "specification revision waiting for user input");
        Ok(SpecRevision::NeedsInput(reply.content))
    }
}
