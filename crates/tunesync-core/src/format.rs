//! A small `{token}` template renderer.
//!
//! Supported tokens: `{title}`, `{artists}`, `{album}`, `{state}`, `{cover}`
//! and `{lyrics}`. A token whose field is not populated on the song, or that
//! is not known at all, renders as an empty string.

use regex::{Captures, Regex};

use crate::output::Renderer;
use crate::song::{Capabilities, Song};

const TOKEN_PATTERN: &str = r"\{([a-z_]+)\}";

/// Separator used when joining artists.
pub const ARTIST_SEPARATOR: &str = ", ";

/// [`Renderer`] substituting `{token}` fields from the song.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    token: Option<Regex>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a renderer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: Regex::new(TOKEN_PATTERN).ok(),
        }
    }

    fn field(name: &str, song: &Song) -> String {
        let has = |cap| song.capabilities.contains(cap);
        match name {
            "title" if has(Capabilities::TITLE) => song.title.clone(),
            "artists" if has(Capabilities::ARTISTS) => song.artists.join(ARTIST_SEPARATOR),
            "album" if has(Capabilities::ALBUM) => song.album.clone(),
            "cover" if has(Capabilities::COVER) => song.cover_url.clone(),
            "lyrics" if has(Capabilities::LYRICS) => song.lyrics_url.clone(),
            "state" => song.state.to_string(),
            _ => String::new(),
        }
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template: &str, song: &Song) -> String {
        let Some(token) = &self.token else {
            return template.to_string();
        };
        token
            .replace_all(template, |caps: &Captures<'_>| Self::field(&caps[1], song))
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::PlaybackState;

    #[test]
    fn test_render_fields() {
        let song = Song::new(PlaybackState::Playing)
            .with_title("Intro")
            .with_artists(["The xx", "Jamie xx"])
            .with_album("xx");
        let text = TemplateRenderer::new().render("{artists} - {title} ({album})", &song);
        assert_eq!(text, "The xx, Jamie xx - Intro (xx)");
    }

    #[test]
    fn test_render_missing_capability_is_empty() {
        let song = Song {
            title: "hidden".to_string(),
            ..Song::new(PlaybackState::Playing)
        };
        assert_eq!(TemplateRenderer::new().render("[{title}]", &song), "[]");
    }

    #[test]
    fn test_render_unknown_token_and_literal_text() {
        let song = Song::new(PlaybackState::Paused);
        let text = TemplateRenderer::new().render("{nope}{state} 100%", &song);
        assert_eq!(text, "paused 100%");
    }

    #[test]
    fn test_render_without_tokens_is_unchanged() {
        let song = Song::new(PlaybackState::Playing);
        assert_eq!(TemplateRenderer::new().render("static", &song), "static");
        assert_eq!(TemplateRenderer::new().render("", &song), "");
    }
}
