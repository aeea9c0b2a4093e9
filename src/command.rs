use crate::source::InboundMessage;

/// Why a message was excluded from the candidate set.
///
/// Rejection is a filter, not a fault: callers debug-log it and move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseReject {
    #[error("malformed sender header")]
    MalformedSender,
    #[error("subject is not the recharge command")]
    SubjectMismatch,
}

/// A validated recharge request extracted from one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeRequest {
    pub sender: String,
    pub amount: i64,
    pub message_id: String,
}

/// The fixed recharge command: an exact subject literal carrying a configured
/// amount. The subject is never parsed for a quantity; the source only
/// supports one recharge size.
#[derive(Debug, Clone)]
pub struct RechargeCommand {
    subject: String,
    amount: i64,
}

impl RechargeCommand {
    pub fn new(subject: &str, amount: i64) -> Self {
        Self {
            subject: subject.trim().to_lowercase(),
            amount,
        }
    }

    /// Validate one message's sender and subject headers.
    pub fn parse(&self, msg: &InboundMessage) -> Result<RechargeRequest, ParseReject> {
        let sender = extract_sender(&msg.from).ok_or(ParseReject::MalformedSender)?;

        if msg.subject.trim().to_lowercase() != self.subject {
            return Err(ParseReject::SubjectMismatch);
        }

        Ok(RechargeRequest {
            sender,
            amount: self.amount,
            message_id: msg.id.clone(),
        })
    }
}

/// Pull the address out of a From header: either a bare address or the
/// `Display Name <address>` form.
fn extract_sender(from: &str) -> Option<String> {
    let from = from.trim();

    if let Some(start) = from.find('<') {
        let rest = &from[start + 1..];
        let end = rest.find('>')?;
        let address = rest[..end].trim();
        return looks_like_address(address).then(|| address.to_string());
    }

    looks_like_address(from).then(|| from.to_string())
}

fn looks_like_address(s: &str) -> bool {
    if s.contains(char::is_whitespace) || s.contains('<') || s.contains('>') {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn command() -> RechargeCommand {
        RechargeCommand::new("recharge 5 credits", 5)
    }

    fn message(from: &str, subject: &str) -> InboundMessage {
        InboundMessage {
            id: "msg-001".to_string(),
            from: from.to_string(),
            subject: subject.to_string(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_accepts_exact_subject() {
        let req = command()
            .parse(&message("user@x.com", "recharge 5 credits"))
            .unwrap();
        assert_eq!(req.sender, "user@x.com");
        assert_eq!(req.amount, 5);
        assert_eq!(req.message_id, "msg-001");
    }

    #[test]
    fn test_subject_is_case_insensitive() {
        let req = command()
            .parse(&message("user@x.com", "RECHARGE 5 CREDITS"))
            .unwrap();
        assert_eq!(req.sender, "user@x.com");
    }

    #[test]
    fn test_subject_is_trimmed() {
        assert!(command()
            .parse(&message("user@x.com", "  recharge 5 credits  "))
            .is_ok());
    }

    #[test]
    fn test_rejects_reply_prefix() {
        let result = command().parse(&message("user@x.com", "Re: recharge 5 credits"));
        assert_eq!(result, Err(ParseReject::SubjectMismatch));
    }

    #[test]
    fn test_rejects_trailing_words() {
        let result = command().parse(&message("user@x.com", "recharge 5 credits please"));
        assert_eq!(result, Err(ParseReject::SubjectMismatch));
    }

    #[test]
    fn test_rejects_substring() {
        let result = command().parse(&message("user@x.com", "recharge 5"));
        assert_eq!(result, Err(ParseReject::SubjectMismatch));
    }

    #[test]
    fn test_extracts_bracketed_sender() {
        let req = command()
            .parse(&message("Jordan Founder <jordan@startup.io>", "recharge 5 credits"))
            .unwrap();
        assert_eq!(req.sender, "jordan@startup.io");
    }

    #[test]
    fn test_extracts_bare_sender() {
        let req = command()
            .parse(&message("  jordan@startup.io  ", "recharge 5 credits"))
            .unwrap();
        assert_eq!(req.sender, "jordan@startup.io");
    }

    #[test]
    fn test_rejects_sender_without_address() {
        let result = command().parse(&message("Jordan Founder", "recharge 5 credits"));
        assert_eq!(result, Err(ParseReject::MalformedSender));
    }

    #[test]
    fn test_rejects_unclosed_bracket() {
        let result = command().parse(&message("Jordan <jordan@startup.io", "recharge 5 credits"));
        assert_eq!(result, Err(ParseReject::MalformedSender));
    }

    #[test]
    fn test_rejects_empty_brackets() {
        let result = command().parse(&message("Jordan <>", "recharge 5 credits"));
        assert_eq!(result, Err(ParseReject::MalformedSender));
    }

    #[test]
    fn test_sender_checked_before_subject() {
        // A malformed sender is rejected even when the subject matches.
        let result = command().parse(&message("not-an-address", "recharge 5 credits"));
        assert_eq!(result, Err(ParseReject::MalformedSender));
    }

    #[test]
    fn test_amount_comes_from_configuration() {
        let command = RechargeCommand::new("recharge 3 credits", 3);
        let req = command
            .parse(&message("user@x.com", "recharge 3 credits"))
            .unwrap();
        assert_eq!(req.amount, 3);
    }

    #[test]
    fn test_command_literal_normalized_at_construction() {
        let command = RechargeCommand::new("  Recharge 5 Credits ", 5);
        assert!(command.parse(&message("user@x.com", "recharge 5 credits")).is_ok());
    }
}
