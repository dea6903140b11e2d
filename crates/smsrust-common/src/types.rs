//! Common types for SmsRust

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for users (campaign owners)
pub type UserId = Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for contact lists
pub type ContactListId = Uuid;

/// Unique identifier for contacts
pub type ContactId = Uuid;

/// Unique identifier for gateway devices
pub type DeviceId = Uuid;

/// Unique identifier for message sent details
pub type MessageDetailId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Phone number in E.164-ish form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse a phone number, stripping separators and validating digits
    pub fn parse(s: &str) -> Option<Self> {
        let cleaned: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect();

        let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if digits.len() < 7 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        Some(Self(cleaned))
    }

    /// The normalized number as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::Error::Validation("Invalid phone number".to_string()))
    }
}

/// Campaign lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Scheduled,
    Active,
    Paused,
    Completed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Active => write!(f, "active"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "active" => Ok(CampaignStatus::Active),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            _ => Err(crate::Error::Validation(format!(
                "Invalid campaign status: {}",
                s
            ))),
        }
    }
}

/// Why a campaign is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    Manual,
    DailyLimitReached,
    TimeRestriction,
}

impl std::fmt::Display for PauseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PauseReason::Manual => write!(f, "manual"),
            PauseReason::DailyLimitReached => write!(f, "daily_limit_reached"),
            PauseReason::TimeRestriction => write!(f, "time_restriction"),
        }
    }
}

impl std::str::FromStr for PauseReason {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(PauseReason::Manual),
            "daily_limit_reached" => Ok(PauseReason::DailyLimitReached),
            "time_restriction" => Ok(PauseReason::TimeRestriction),
            _ => Err(crate::Error::Validation(format!(
                "Invalid pause reason: {}",
                s
            ))),
        }
    }
}

/// Delivery lifecycle status of a dispatched message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    Read,
    Undelivered,
}

impl MessageStatus {
    /// Whether this state accepts a transition to `next`.
    ///
    /// `delivered` is terminal except for `read` and the late-correction
    /// `undelivered`; `failed`, `read` and `undelivered` accept nothing.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Failed)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Delivered, Read)
                | (Delivered, Undelivered)
        )
    }

    /// Whether no further delivery report is expected in this state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MessageStatus::Failed | MessageStatus::Read | MessageStatus::Undelivered
        )
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Pending => write!(f, "pending"),
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Delivered => write!(f, "delivered"),
            MessageStatus::Failed => write!(f, "failed"),
            MessageStatus::Read => write!(f, "read"),
            MessageStatus::Undelivered => write!(f, "undelivered"),
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MessageStatus::Pending),
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "failed" => Ok(MessageStatus::Failed),
            "read" => Ok(MessageStatus::Read),
            "undelivered" => Ok(MessageStatus::Undelivered),
            _ => Err(crate::Error::Validation(format!(
                "Invalid message status: {}",
                s
            ))),
        }
    }
}

/// Allowed sending window for a campaign, in the campaign's local time.
///
/// The window is expressed as wall-clock start/end plus a fixed UTC offset.
/// Windows may cross midnight (`start > end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Offset from UTC in minutes, e.g. -300 for America/Toronto in winter
    pub utc_offset_minutes: i32,
}

impl SendWindow {
    /// Whether `now` falls inside the allowed window
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = (now + Duration::minutes(self.utc_offset_minutes as i64)).time();
        if self.start <= self.end {
            local >= self.start && local < self.end
        } else {
            // Overnight window, e.g. 21:00-06:00
            local >= self.start || local < self.end
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_phone_number_parse() {
        let phone = PhoneNumber::parse("+1 (416) 555-0199").unwrap();
        assert_eq!(phone.as_str(), "+14165550199");
        assert!(PhoneNumber::parse("not-a-number").is_none());
        assert!(PhoneNumber::parse("123").is_none());
    }

    #[test]
    fn test_message_status_transitions() {
        use MessageStatus::*;
        assert!(Pending.can_transition_to(Sent));
        assert!(Pending.can_transition_to(Failed));
        assert!(Sent.can_transition_to(Delivered));
        assert!(Sent.can_transition_to(Failed));
        assert!(Delivered.can_transition_to(Read));
        assert!(Delivered.can_transition_to(Undelivered));

        // Terminal states reject everything
        assert!(!Failed.can_transition_to(Delivered));
        assert!(!Read.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Sent));
        // Repeats are not transitions
        assert!(!Delivered.can_transition_to(Delivered));
        assert!(!Sent.can_transition_to(Sent));
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["scheduled", "active", "paused", "completed"] {
            let parsed: CampaignStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        for s in ["manual", "daily_limit_reached", "time_restriction"] {
            let parsed: PauseReason = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn test_send_window_contains() {
        let window = SendWindow {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            utc_offset_minutes: 0,
        };

        let inside = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 6, 2, 8, 59, 59).unwrap();
        let at_end = Utc.with_ymd_and_hms(2025, 6, 2, 17, 0, 0).unwrap();

        assert!(window.contains(inside));
        assert!(!window.contains(before));
        assert!(!window.contains(at_end));
    }

    #[test]
    fn test_send_window_with_offset() {
        // 09:00-17:00 at UTC-5: 13:00 UTC is 08:00 local
        let window = SendWindow {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            utc_offset_minutes: -300,
        };

        let morning_utc = Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0).unwrap();
        assert!(!window.contains(morning_utc));
        let afternoon_utc = Utc.with_ymd_and_hms(2025, 6, 2, 15, 0, 0).unwrap();
        assert!(window.contains(afternoon_utc));
    }

    #[test]
    fn test_send_window_overnight() {
        let window = SendWindow {
            start: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            utc_offset_minutes: 0,
        };

        assert!(window.contains(Utc.with_ymd_and_hms(2025, 6, 2, 23, 30, 0).unwrap()));
        assert!(window.contains(Utc.with_ymd_and_hms(2025, 6, 2, 3, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()));
    }
}
