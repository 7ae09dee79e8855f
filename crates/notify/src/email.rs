//! Per-recipient email composition.
//!
//! An [`Email`] is created by
//! [`NotificationGroup::generate`](crate::group::NotificationGroup::generate)
//! for each resolved recipient, filled with sections by the content
//! generator, and turned
//! into an immutable [`FinishedEmail`] at commit time. Line width and
//! subject template are the recipient's own settings.

use std::sync::Arc;

use remark_core::layout;
use remark_core::model::{Review, User};
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::group::GroupContext;
use crate::store::DataStore;

/// Recipient line width when the `email.lineLength` setting is unset.
pub const DEFAULT_LINE_WIDTH: usize = 80;

/// Subject template when the per-kind `email.subjectLine.<kind>`
/// setting is unset.
pub const DEFAULT_SUBJECT_TEMPLATE: &str = "[r/%(id)d] %(summary)s";

const HEADER_SENTENCE: &str = "This is an automatic message generated by the review at:";

// ---------------------------------------------------------------------------
// Subject rendering
// ---------------------------------------------------------------------------

/// Render a subject template, interpolating `%(id)d`, `%(summary)s`,
/// and `%(branch)s`.
///
/// Fails with [`NotifyError::MissingBranch`] when the review has no
/// branch. Every recipient shares the same review, so this failure is
/// group-fatal by design.
fn render_subject(template: &str, review: &Review) -> Result<String, NotifyError> {
    let branch = review
        .branch
        .as_deref()
        .ok_or(NotifyError::MissingBranch(review.id))?;
    Ok(template
        .replace("%(id)d", &review.id.to_string())
        .replace("%(summary)s", &review.summary)
        .replace("%(branch)s", branch))
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// One recipient's message under composition.
pub struct Email {
    ctx: Arc<GroupContext>,
    to_user: User,
    line_width: usize,
    separator: String,
    message_id: String,
    parent_message_id: Option<String>,
    subject: String,
    sections: Vec<String>,
}

impl Email {
    /// Build an email seeded with the recipient's settings.
    ///
    /// The subject is rendered here so that a review with no branch
    /// fails the group during generation, before anything is queued.
    pub(crate) async fn create(
        store: &dyn DataStore,
        ctx: Arc<GroupContext>,
        to_user: User,
        message_id_prefix: &str,
        parent_message_id: Option<String>,
    ) -> Result<Self, NotifyError> {
        let line_width = store
            .usize_setting(to_user.id, "email", "lineLength", DEFAULT_LINE_WIDTH)
            .await?;
        let template = store
            .string_setting(
                to_user.id,
                "email",
                &format!("subjectLine.{}", ctx.kind),
                DEFAULT_SUBJECT_TEMPLATE,
            )
            .await?;
        let subject = render_subject(&template, &ctx.review)?;
        let message_id = format!("{message_id_prefix}.u{}", to_user.id);

        Ok(Self {
            separator: "-".repeat(line_width),
            ctx,
            to_user,
            line_width,
            message_id,
            parent_message_id,
            subject,
            sections: Vec::new(),
        })
    }

    pub fn recipient(&self) -> &User {
        &self.to_user
    }

    pub fn line_width(&self) -> usize {
        self.line_width
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn parent_message_id(&self) -> Option<&str> {
        self.parent_message_id.as_deref()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Shared group context: event, review snapshot, sender, kind, and
    /// the cross-recipient memo cache.
    pub fn context(&self) -> &GroupContext {
        &self.ctx
    }

    pub fn review(&self) -> &Review {
        &self.ctx.review
    }

    /// Append one section built from `lines`.
    ///
    /// With `wrap_lines`, every non-empty line starting with an
    /// alphabetic character is word-wrapped to the recipient's line
    /// width; blank lines and structured content (indented tables,
    /// bullets, separators) pass through verbatim. Each call produces
    /// exactly one section.
    pub fn add_section<I>(&mut self, lines: I, wrap_lines: bool)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut actual = Vec::new();
        for line in lines {
            let line = line.as_ref();
            if wrap_lines && line.chars().next().is_some_and(char::is_alphabetic) {
                actual.extend(layout::wrap(line, self.line_width));
            } else {
                actual.push(line.to_string());
            }
        }
        self.sections.push(actual.join("\n"));
    }

    /// Append a section consisting solely of the separator line.
    pub fn add_separator(&mut self) {
        self.sections.push(self.separator.clone());
    }

    /// Standard header: separator, explanation, one review URL per
    /// prefix reachable by the recipient, separator.
    fn header(&self) -> String {
        let mut lines = vec![self.separator.clone(), HEADER_SENTENCE.to_string()];
        for url_prefix in &self.to_user.url_prefixes {
            lines.push(format!("  {url_prefix}/r/{}", self.ctx.review.id));
        }
        lines.push(self.separator.clone());
        lines.join("\n")
    }

    /// Header, sections in call order, and the sender signature, joined
    /// with double blank lines.
    fn body(&self) -> String {
        let mut parts = Vec::with_capacity(self.sections.len() + 2);
        parts.push(self.header());
        parts.extend(self.sections.iter().cloned());
        parts.push(format!("--{}", self.ctx.from_user.name));
        parts.join("\n\n\n")
    }

    /// Produce the immutable outbound artifact.
    pub fn finish(&self) -> FinishedEmail {
        FinishedEmail {
            from: self.ctx.from_user.name.clone(),
            to: self
                .to_user
                .email
                .clone()
                .unwrap_or_else(|| self.to_user.name.clone()),
            subject: self.subject.clone(),
            message_id: self.message_id.clone(),
            in_reply_to: self.parent_message_id.clone(),
            body: self.body(),
        }
    }
}

impl std::fmt::Debug for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} mail to {}",
            self.ctx.kind,
            self.to_user.email.as_deref().unwrap_or(&self.to_user.name)
        )
    }
}

// ---------------------------------------------------------------------------
// FinishedEmail
// ---------------------------------------------------------------------------

/// An immutable, fully composed message as handed to the outbound bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    #[serde(rename = "message-id")]
    pub message_id: String,
    #[serde(rename = "in-reply-to", skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
