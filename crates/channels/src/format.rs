//! Plain-text rendering of an event, shared by the built-in plug-ins.

use reshare_common::Event;

use crate::{Error, Result};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Render an event as a plain-text announcement.
///
/// Layout: name, time span, optional location, optional description, link.
pub fn render_event_message(event: &Event) -> String {
    let mut out = String::new();
    out.push_str(event.name.trim());
    out.push('\n');
    out.push_str(&format!(
        "When: {} - {}\n",
        event.begin_datetime.format(DATETIME_FORMAT),
        event.end_datetime.format(DATETIME_FORMAT)
    ));
    if let Some(location) = event.location.as_deref().filter(|l| !l.trim().is_empty()) {
        out.push_str(&format!("Where: {}\n", location.trim()));
    }
    if let Some(description) = event
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        out.push('\n');
        out.push_str(description.trim());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&event.link);
    out
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reject events that cannot produce a sendable message on `channel`.
pub fn check_rendered(channel: &str, event: &Event, rendered: &str, max_chars: usize) -> Result<()> {
    if event.name.trim().is_empty() {
        return Err(Error::invalid_content(channel, "event has no name"));
    }
    if event.end_datetime < event.begin_datetime {
        return Err(Error::invalid_content(channel, "event ends before it begins"));
    }
    let len = rendered.chars().count();
    if len > max_chars {
        return Err(Error::invalid_content(
            channel,
            format!("message is {len} characters, limit is {max_chars}"),
        ));
    }
    Ok(())
}
