//! Plain-text content for cards, reminders, and announcements.
//!
//! The transport decides styling; these helpers only fix wording and layout.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::core::ballot::{Tally, TallyEntry};
use crate::core::model::{Event, Poll, PollStatus};
use crate::core::status::DisplayStatus;
use crate::util::ids::UserId;

/// Configured offset, or UTC when none is valid.
pub fn offset_or_utc(offset: Option<FixedOffset>) -> FixedOffset {
    offset.unwrap_or_else(|| Utc.fix())
}

/// Timestamp in the display offset, e.g. `14.03.2025 21:00 (+03:00)`.
pub fn format_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d.%m.%Y %H:%M (%:z)").to_string()
}

fn mentions<'a>(users: impl IntoIterator<Item = &'a UserId>, sep: &str) -> String {
    users
        .into_iter()
        .map(|u| format!("@{u}"))
        .collect::<Vec<_>>()
        .join(sep)
}

fn role_prefix(role: Option<&str>) -> String {
    role.map(|r| format!("{r} ")).unwrap_or_default()
}

/// Live event card with occupancy and display status.
pub fn event_card(event: &Event, status: DisplayStatus, offset: FixedOffset) -> String {
    let mut out = format!("[event] {}\n", event.title);
    if !event.description.is_empty() {
        let _ = writeln!(out, "{}", event.description);
    }
    let _ = writeln!(out, "Starts: {}", format_time(event.starts_at, offset));
    let _ = writeln!(out, "Limit: {}", event.capacity);
    let _ = writeln!(out, "Participants: {}/{}", event.participants.len(), event.capacity);
    let _ = write!(out, "Status: {status}");
    out
}

/// Final card of a finished event, listing everyone who took part.
pub fn finished_event_card(event: &Event, offset: FixedOffset) -> String {
    let mut out = event_card(event, DisplayStatus::Finished, offset);
    if !event.participants.is_empty() {
        let _ = write!(out, "\nRoster:\n{}", mentions(&event.participants, "\n"));
    }
    out
}

/// Reminder naming every participant.
pub fn reminder(event: &Event) -> String {
    format!(
        "Event '{}' starts in 5 minutes {}",
        event.title,
        mentions(&event.participants, " ")
    )
}

/// Poll card. `winner` is shown once the poll is closed.
pub fn poll_card(
    poll: &Poll,
    tally: &Tally,
    offset: FixedOffset,
    winner: Option<&TallyEntry>,
) -> String {
    let mut out = format!("[poll] {}\n", poll.title);
    if !poll.description.is_empty() {
        let _ = writeln!(out, "{}", poll.description);
    }
    let _ = writeln!(out, "Ends: {}", format_time(poll.deadline, offset));
    let status = match poll.status {
        PollStatus::Open => "Open",
        PollStatus::Closed => "Closed",
    };
    let _ = writeln!(out, "Status: {status}");
    if tally.is_empty() {
        out.push_str("Options: none yet");
    } else {
        out.push_str("Options:");
        for entry in tally.entries() {
            let _ = write!(out, "\n- {} ({})", entry.option.title, entry.votes);
            if let Some(link) = &entry.option.link {
                let _ = write!(out, " {link}");
            }
        }
    }
    if let Some(w) = winner {
        let _ = write!(out, "\nWinner: {} ({} votes)", w.option.title, w.votes);
    }
    out
}

/// Card shown while a runoff is running.
pub fn runoff_card(poll: &Poll, tally: &Tally, offset: FixedOffset, window_minutes: i64) -> String {
    format!(
        "{}\nRunoff ({window_minutes} minutes)",
        poll_card(poll, tally, offset, None)
    )
}

/// Winner announcement, with the option link on its own line when present.
pub fn winner_announcement(poll: &Poll, winner: &TallyEntry, role: Option<&str>) -> String {
    let mut out = format!(
        "{}Poll '{}' is over! Winner: {} ({} votes)",
        role_prefix(role),
        poll.title,
        winner.option.title,
        winner.votes
    );
    if let Some(link) = &winner.option.link {
        let _ = write!(out, "\n{link}");
    }
    out
}

/// Notice for a poll closed without any options.
pub fn no_winner_notice(poll: &Poll) -> String {
    format!("Poll '{}' is over, no winner (no options were proposed)", poll.title)
}

/// Runoff announcement naming the finalists.
pub fn runoff_announcement<'a>(
    poll: &Poll,
    finalists: impl IntoIterator<Item = &'a str>,
    window_minutes: i64,
    role: Option<&str>,
) -> String {
    let names: Vec<&str> = finalists.into_iter().collect();
    format!(
        "{}Tie in '{}'! Runoff between: {} ({window_minutes} minutes)",
        role_prefix(role),
        poll.title,
        names.join(", ")
    )
}
