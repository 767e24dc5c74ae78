//! Notification message formatting.

use crate::model::Record;

/// Telegram caps photo captions at 1024 characters.
pub const MAX_CAPTION_CHARS: usize = 1024;

/// Channel-agnostic message for one new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub text: String,
    /// Poster to attach, when the record has one
    pub image_url: Option<String>,
}

impl NotificationMessage {
    /// Text truncated to [`MAX_CAPTION_CHARS`] on a character boundary.
    pub fn caption(&self) -> String {
        if self.text.chars().count() <= MAX_CAPTION_CHARS {
            return self.text.clone();
        }
        let mut caption: String = self.text.chars().take(MAX_CAPTION_CHARS - 1).collect();
        caption.push('…');
        caption
    }
}

/// Build the message announcing a newly scheduled screening.
pub fn format_notification(record: &Record) -> NotificationMessage {
    let mut lines = Vec::new();

    let headline = if record.is_new_release {
        format!("🆕 Nuovo film in programmazione: {}", record.title)
    } else {
        format!("🎬 Nuova proiezione: {}", record.title)
    };
    lines.push(headline);
    lines.push(format!(
        "📅 {} ore {}",
        record.occurrence_date.format("%d/%m/%Y"),
        record.occurrence_time
    ));
    if let Some(screen) = &record.screen {
        lines.push(format!("📍 {}", screen));
    }
    if let Some(url) = record.purchase_url.as_ref().or(record.detail_url.as_ref()) {
        lines.push(format!("🎟 {}", url));
    }

    NotificationMessage {
        text: lines.join("\n"),
        image_url: record.image_url.clone(),
    }
}
