//! # Marker-Based Song Parsing
//!
//! ## Purpose
//! Parses free-text song documents where a reserved marker glyph prefixes
//! each title line. The progression is an explicit finite-state machine
//! (`SeekingTitle → ReadingMetadata → ReadingBody`) so the
//! title-marker-while-a-song-is-open edge case is a named transition
//! (finalize-then-start) rather than emergent flag behavior.
//!
//! ## Input/Output Specification
//! - **Input**: Flattened line stream from the document's paragraph blocks
//! - **Output**: Songs in order of first appearance, positions preassigned
//! - **Noise handling**: short titles discarded, stray metadata lines
//!   skipped, consecutive body blanks collapsed to one

use crate::config::ParserConfig;
use crate::errors::Result;
use crate::parser::classify::{LineClassifier, LineLabel};
use crate::Song;
use tracing::debug;

/// Parser state over the line stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No song open; waiting for a title marker
    SeekingTitle,
    /// Title seen; consuming metadata lines until the body opens
    ReadingMetadata,
    /// Accumulating the lyric/chord body
    ReadingBody,
}

/// A song under construction
struct PendingSong {
    title: String,
    authors: Vec<String>,
    body: Vec<String>,
}

impl PendingSong {
    fn new(title: String) -> Self {
        Self {
            title,
            authors: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Append a body line, collapsing consecutive blanks to at most one
    fn push_body(&mut self, line: &str) {
        if line.trim().is_empty() {
            if !self.body.is_empty() && !self.body.last().unwrap().is_empty() {
                self.body.push(String::new());
            }
        } else {
            self.body.push(line.trim_end().to_string());
        }
    }
}

/// Marker-document song parser
pub struct MarkerParser {
    classifier: LineClassifier,
    marker_glyph: String,
    min_title_chars: usize,
    authors_unknown: String,
}

impl MarkerParser {
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            classifier: LineClassifier::new(config)?,
            marker_glyph: config.marker_glyph.clone(),
            min_title_chars: config.min_title_chars,
            authors_unknown: config.authors_unknown.clone(),
        })
    }

    /// Parse a line stream into songs. Positions are assigned in order of
    /// first appearance and are stable across parses of the same stream.
    pub fn parse_lines<'a, I>(&self, lines: I) -> Vec<Song>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut songs = Vec::new();
        let mut state = State::SeekingTitle;
        let mut pending: Option<PendingSong> = None;

        for line in lines {
            let label = self.classifier.classify(line);

            // A title marker always finalizes the open song first.
            if label == LineLabel::Title {
                if let Some(open) = pending.take() {
                    self.finalize(open, &mut songs);
                }
                pending = Some(PendingSong::new(self.strip_marker(line)));
                state = State::ReadingMetadata;
                continue;
            }

            match state {
                State::SeekingTitle => {
                    // Preamble before the first marker is not song content.
                }
                State::ReadingMetadata => {
                    let open = pending.as_mut().expect("song open in metadata state");
                    match label {
                        LineLabel::Author => open.authors.push(line.trim().to_string()),
                        LineLabel::Chords => {
                            open.push_body(line);
                            state = State::ReadingBody;
                        }
                        LineLabel::Blank => {}
                        LineLabel::Text => {
                            debug!(line, "skipping unclassified line between title and body");
                        }
                        LineLabel::Title => unreachable!("handled above"),
                    }
                }
                State::ReadingBody => {
                    let open = pending.as_mut().expect("song open in body state");
                    open.push_body(line);
                }
            }
        }

        // End of stream finalizes any open song.
        if let Some(open) = pending.take() {
            self.finalize(open, &mut songs);
        }

        songs
    }

    fn strip_marker(&self, line: &str) -> String {
        line.trim()
            .trim_start_matches(self.marker_glyph.as_str())
            .trim()
            .to_string()
    }

    fn finalize(&self, open: PendingSong, songs: &mut Vec<Song>) {
        if open.title.chars().count() < self.min_title_chars {
            debug!(title = open.title.as_str(), "discarding short-title entity as noise");
            return;
        }

        let mut body = open.body;
        while body.last().map(|l| l.is_empty()).unwrap_or(false) {
            body.pop();
        }

        let authors = if open.authors.is_empty() {
            self.authors_unknown.clone()
        } else {
            open.authors.join(", ")
        };

        songs.push(Song {
            title: open.title,
            authors,
            rhythm: String::new(),
            group: None,
            features: None,
            voice: None,
            video: None,
            video_url: None,
            body: body.join("\n"),
            position: songs.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> MarkerParser {
        MarkerParser::new(&ParserConfig::default()).unwrap()
    }

    #[test]
    fn parses_single_song_with_metadata() {
        let input = "♭ Song One\nAuthor Name\nAm\nline one\n\nline two";
        let songs = parser().parse_lines(input.split('\n'));

        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Song One");
        assert_eq!(songs[0].authors, "Author Name");
        assert_eq!(songs[0].body, "Am\nline one\n\nline two");
    }

    #[test]
    fn collapses_consecutive_blank_lines() {
        let input = "♭ Song One\nAuthor Name\nAm\nline one\n\n\n\nline two";
        let songs = parser().parse_lines(input.split('\n'));

        assert_eq!(songs[0].body, "Am\nline one\n\nline two");
    }

    #[test]
    fn title_marker_finalizes_open_song() {
        let input = "♭ First Song\nAm\nfirst body\n♭ Second Song\nC\nsecond body";
        let songs = parser().parse_lines(input.split('\n'));

        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].title, "First Song");
        assert_eq!(songs[0].body, "Am\nfirst body");
        assert_eq!(songs[1].title, "Second Song");
        assert_eq!(songs[1].position, 1);
    }

    #[test]
    fn missing_author_gets_sentinel() {
        let input = "♭ Lone Song\nAm\nbody line";
        let songs = parser().parse_lines(input.split('\n'));

        assert_eq!(songs[0].authors, ParserConfig::default().authors_unknown);
    }

    #[test]
    fn short_titles_are_discarded() {
        let input = "♭ ab\nAm\nnoise body\n♭ Real Song\nC\nreal body";
        let songs = parser().parse_lines(input.split('\n'));

        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Real Song");
        assert_eq!(songs[0].position, 0);
    }

    #[test]
    fn positions_are_stable_across_parses() {
        let input = "♭ First Song\nAm\nbody\n♭ Second Song\nC\nbody two";
        let p = parser();
        let first: Vec<usize> = p.parse_lines(input.split('\n')).iter().map(|s| s.position).collect();
        let second: Vec<usize> = p.parse_lines(input.split('\n')).iter().map(|s| s.position).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn preamble_before_first_marker_is_ignored() {
        let input = "collection notes\nmore notes\n♭ Real Song\nAm\nbody";
        let songs = parser().parse_lines(input.split('\n'));

        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Real Song");
    }

    #[test]
    fn trailing_blanks_are_trimmed() {
        let input = "♭ Song One\nAm\nline\n\n\n";
        let songs = parser().parse_lines(input.split('\n'));

        assert_eq!(songs[0].body, "Am\nline");
    }
}
