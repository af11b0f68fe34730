//! # Response Formatter Module
//!
//! ## Purpose
//! Renders a parsed entity into an ordered multi-part message payload for
//! the transport to deliver: tagged parts in a fixed order, long bodies
//! split at line boundaries, a persistent source link on the final part.
//!
//! ## Input/Output Specification
//! - **Input**: Entity, optional public document URL
//! - **Output**: Ordered `MessagePart` list
//! - **Part order**: header → photo → voice → video → web link → body
//!
//! ## Key Features
//! - Every present header field is label-prefixed; absent optional fields
//!   produce no line at all
//! - Body parts never exceed the character budget and never split mid-line
//! - The "open full source" link lands only on the last body part

use crate::config::FormatConfig;
use crate::{Entity, Joke, MediaHandle, Song, StrummingPattern};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One deliverable message part, tagged with its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MessagePart {
    Text(String),
    Photo(MediaHandle),
    Voice(MediaHandle),
    Video(MediaHandle),
}

/// Entity-to-message-parts renderer
pub struct ResponseFormatter {
    config: FormatConfig,
}

impl ResponseFormatter {
    pub fn new(config: &FormatConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Render an entity into ordered message parts. `source_url` is the
    /// public document link appended to the final body part.
    pub fn format(&self, entity: &Entity, source_url: Option<&str>) -> Vec<MessagePart> {
        match entity {
            Entity::Song(song) => self.format_song(song, source_url),
            Entity::Strumming(pattern) => self.format_strumming(pattern, source_url),
            Entity::Joke(joke) => self.format_joke(joke),
        }
    }

    fn format_song(&self, song: &Song, source_url: Option<&str>) -> Vec<MessagePart> {
        let mut parts = Vec::new();

        let mut header = vec![song.title.clone()];
        header.push(format!("{} {}", self.config.authors_label, song.authors));
        if !song.rhythm.is_empty() {
            header.push(format!("{} {}", self.config.rhythm_label, song.rhythm));
        }
        if let Some(group) = &song.group {
            header.push(format!("{} {}", self.config.group_label, group));
        }
        if let Some(features) = &song.features {
            header.push(format!("{} {}", self.config.features_label, features));
        }
        parts.push(MessagePart::Text(header.join("\n")));

        if let Some(voice) = &song.voice {
            parts.push(MessagePart::Voice(voice.clone()));
        }
        if let Some(video) = &song.video {
            parts.push(MessagePart::Video(video.clone()));
        }
        if let Some(url) = &song.video_url {
            parts.push(MessagePart::Text(url.clone()));
        }

        self.push_body(&mut parts, &song.body, source_url);
        parts
    }

    fn format_strumming(&self, pattern: &StrummingPattern, source_url: Option<&str>) -> Vec<MessagePart> {
        let mut parts = Vec::new();

        let mut header = vec![pattern.title.clone()];
        if let Some(features) = &pattern.features {
            header.push(format!("{} {}", self.config.features_label, features));
        }
        parts.push(MessagePart::Text(header.join("\n")));

        if let Some(photo) = &pattern.photo {
            parts.push(MessagePart::Photo(photo.clone()));
        }
        if let Some(voice) = &pattern.voice {
            parts.push(MessagePart::Voice(voice.clone()));
        }
        if let Some(video) = &pattern.video {
            parts.push(MessagePart::Video(video.clone()));
        }

        if let Some(url) = source_url {
            parts.push(MessagePart::Text(self.source_link(url)));
        }
        parts
    }

    fn format_joke(&self, joke: &Joke) -> Vec<MessagePart> {
        vec![MessagePart::Text(joke.text.clone())]
    }

    fn push_body(&self, parts: &mut Vec<MessagePart>, body: &str, source_url: Option<&str>) {
        let suffix = source_url.map(|url| format!("\n\n{}", self.source_link(url)));

        if body.is_empty() {
            if let Some(suffix) = suffix {
                parts.push(MessagePart::Text(suffix.trim_start().to_string()));
            }
            return;
        }

        let mut chunks = split_at_lines(body, self.effective_budget(suffix.as_deref()));
        if let (Some(last), Some(suffix)) = (chunks.last_mut(), suffix) {
            last.push_str(&suffix);
        }
        parts.extend(chunks.into_iter().map(MessagePart::Text));
    }

    /// Budget for body chunks, reserving room so the suffix on the final
    /// part cannot push it over the configured limit.
    fn effective_budget(&self, suffix: Option<&str>) -> usize {
        let reserve = suffix.map(|s| s.chars().count()).unwrap_or(0);
        self.config.part_char_budget.saturating_sub(reserve).max(1)
    }

    fn source_link(&self, url: &str) -> String {
        format!("{} {}", self.config.source_link_text, url)
    }
}

/// Split text into chunks of at most `budget` characters, only at line
/// boundaries. A single line longer than the budget becomes its own
/// oversized chunk; mid-line splits are never produced.
fn split_at_lines(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for line in text.lines() {
        let line_chars = line.chars().count();
        let needed = if current.is_empty() {
            line_chars
        } else {
            current_chars + 1 + line_chars
        };

        if needed > budget && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if line_chars > budget {
            warn!(chars = line_chars, budget, "line exceeds part budget, emitting unsplit");
        }

        if current.is_empty() {
            current.push_str(line);
            current_chars = line.chars().count();
        } else {
            current.push('\n');
            current.push_str(line);
            current_chars += 1 + line_chars;
        }

        if current_chars >= budget {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> Song {
        Song {
            title: "Gray Bird".to_string(),
            authors: "J. Sparrow".to_string(),
            rhythm: "fingerstyle 4/4".to_string(),
            group: None,
            features: None,
            voice: Some("voice-1".to_string()),
            video: None,
            video_url: Some("https://example.com/v".to_string()),
            body: "Am F\nfly away now\ngray bird of mine".to_string(),
            position: 0,
        }
    }

    fn formatter() -> ResponseFormatter {
        ResponseFormatter::new(&FormatConfig::default())
    }

    fn text_of(part: &MessagePart) -> &str {
        match part {
            MessagePart::Text(t) => t,
            other => panic!("expected text part, got {:?}", other),
        }
    }

    #[test]
    fn parts_come_in_fixed_order() {
        let parts = formatter().format(&Entity::Song(song()), Some("https://doc"));

        assert!(text_of(&parts[0]).starts_with("Gray Bird"));
        assert_eq!(parts[1], MessagePart::Voice("voice-1".to_string()));
        assert_eq!(parts[2], MessagePart::Text("https://example.com/v".to_string()));
        assert!(text_of(&parts[3]).contains("fly away now"));
        assert!(text_of(parts.last().unwrap()).contains("https://doc"));
    }

    #[test]
    fn header_labels_present_fields_only() {
        let mut s = song();
        s.features = None;
        s.group = Some("Night Owls".to_string());
        let parts = formatter().format(&Entity::Song(s), None);
        let header = text_of(&parts[0]);

        assert!(header.contains("Authors: J. Sparrow"));
        assert!(header.contains("Group: Night Owls"));
        assert!(!header.contains("Features:"));
    }

    #[test]
    fn sentinel_authors_render_in_header() {
        let mut s = song();
        s.authors = "authors unknown".to_string();
        let parts = formatter().format(&Entity::Song(s), None);

        assert!(text_of(&parts[0]).contains("Authors: authors unknown"));
    }

    #[test]
    fn long_body_splits_at_line_boundaries_within_budget() {
        let line = "a line of lyrics that repeats"; // 30 chars
        let body = vec![line; 300].join("\n"); // 9299 chars
        assert!(body.chars().count() > 9000);

        let mut s = song();
        s.body = body;
        let config = FormatConfig::default();
        let parts = formatter().format(&Entity::Song(s), Some("https://doc"));

        let body_parts: Vec<&str> = parts
            .iter()
            .skip(3) // header, voice, video url
            .map(text_of)
            .collect();
        assert!(body_parts.len() > 1);

        for part in &body_parts {
            assert!(part.chars().count() <= config.part_char_budget);
            for piece in part.split('\n') {
                // every piece is a whole source line or part of the suffix
                assert!(piece == line || piece.is_empty() || piece.contains("https://doc"));
            }
        }

        // source link only on the last part
        let with_link: Vec<bool> = body_parts.iter().map(|p| p.contains("https://doc")).collect();
        assert_eq!(with_link.iter().filter(|b| **b).count(), 1);
        assert!(*with_link.last().unwrap());
    }

    #[test]
    fn strumming_pattern_renders_photo_between_header_and_link() {
        let pattern = StrummingPattern {
            title: "Six-eight waltz".to_string(),
            features: Some("accented downbeat".to_string()),
            photo: Some("photo-1".to_string()),
            voice: None,
            video: None,
            position: 0,
        };
        let parts = formatter().format(&Entity::Strumming(pattern), Some("https://doc"));

        assert!(text_of(&parts[0]).contains("Features: accented downbeat"));
        assert_eq!(parts[1], MessagePart::Photo("photo-1".to_string()));
        assert!(text_of(&parts[2]).contains("https://doc"));
    }

    #[test]
    fn empty_body_still_carries_source_link() {
        let mut s = song();
        s.body = String::new();
        let parts = formatter().format(&Entity::Song(s), Some("https://doc"));

        assert!(text_of(parts.last().unwrap()).contains("https://doc"));
    }
}
