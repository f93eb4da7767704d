// HLS master playlist subtitle discovery.
//
// Only `#EXT-X-MEDIA` lines of `TYPE=SUBTITLES` are inspected. Everything else
// in the manifest (variants, audio renditions, session data) is ignored, and a
// malformed attribute list never fails the whole parse.

use std::collections::HashMap;

use tracing::trace;

use crate::uri::resolve_uri;

const MEDIA_TAG: &str = "#EXT-X-MEDIA:";

/// A subtitle rendition declared in a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    /// `LANGUAGE` attribute, as declared.
    pub language: Option<String>,
    /// `NAME` attribute, as declared.
    pub name: Option<String>,
    pub group_id: Option<String>,
    /// `DEFAULT=YES`
    pub is_default: bool,
    /// Absolute URI of the subtitle media playlist.
    pub uri: String,
}

impl SubtitleTrack {
    /// Case-insensitive exact match on the declared language.
    pub fn matches_language(&self, language: &str) -> bool {
        self.language
            .as_deref()
            .is_some_and(|lang| lang.eq_ignore_ascii_case(language.trim()))
    }
}

/// Split an HLS attribute list into `KEY -> VALUE` pairs.
///
/// Values may be double-quoted (quotes stripped, commas inside quotes kept) or
/// unquoted up to the next comma. Pairs without `=` are skipped. Later
/// duplicates overwrite earlier ones.
pub fn parse_attribute_list(input: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        // Key, up to '=' or ','
        let mut key = String::new();
        let mut saw_equals = false;
        for ch in chars.by_ref() {
            match ch {
                '=' => {
                    saw_equals = true;
                    break;
                }
                ',' => break,
                _ => key.push(ch),
            }
        }

        let key = key.trim().to_string();

        if !saw_equals {
            if !key.is_empty() {
                trace!(fragment = %key, "Skipping attribute without value");
            }
            if chars.peek().is_none() {
                break;
            }
            continue;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '"' {
                    break;
                }
                value.push(ch);
            }
            // Drop anything between the closing quote and the next comma.
            for ch in chars.by_ref() {
                if ch == ',' {
                    break;
                }
            }
        } else {
            for ch in chars.by_ref() {
                if ch == ',' {
                    break;
                }
                value.push(ch);
            }
            value = value.trim().to_string();
        }

        if !key.is_empty() {
            attributes.insert(key, value);
        }

        if chars.peek().is_none() {
            break;
        }
    }

    attributes
}

/// Extract every subtitle track declared in `manifest`.
///
/// `base_url` is the URL the manifest was fetched from; relative `URI`
/// attributes are resolved against it. Candidates without a `URI` are dropped.
pub fn parse_hls_subtitle_tracks(manifest: &str, base_url: &str) -> Vec<SubtitleTrack> {
    manifest
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(MEDIA_TAG))
        .filter_map(|attrs| {
            let mut attributes = parse_attribute_list(attrs);

            let is_subtitles = attributes
                .get("TYPE")
                .is_some_and(|t| t.eq_ignore_ascii_case("SUBTITLES"));
            if !is_subtitles {
                return None;
            }

            let Some(uri) = attributes.remove("URI").filter(|u| !u.trim().is_empty()) else {
                trace!(attributes = %attrs, "Subtitle rendition without URI, skipping");
                return None;
            };

            Some(SubtitleTrack {
                language: attributes.remove("LANGUAGE"),
                name: attributes.remove("NAME"),
                group_id: attributes.remove("GROUP-ID"),
                is_default: attributes
                    .get("DEFAULT")
                    .is_some_and(|d| d.eq_ignore_ascii_case("YES")),
                uri: resolve_uri(base_url, &uri),
            })
        })
        .collect()
}

/// First track whose language matches `language`. There is no fallback to the
/// default rendition.
pub fn find_track<'a>(tracks: &'a [SubtitleTrack], language: &str) -> Option<&'a SubtitleTrack> {
    tracks.iter().find(|track| track.matches_language(language))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = r#"#EXTM3U
#EXT-X-VERSION:6
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud",LANGUAGE="en",NAME="English",URI="audio/en.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",LANGUAGE="en",NAME="English",DEFAULT=YES,AUTOSELECT=YES,URI="subs/en.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",LANGUAGE="ar",NAME="Arabic, UAE",URI="https://cdn.example.com/subs/ar.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",LANGUAGE="fr",NAME="French"
#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=720x1280,SUBTITLES="subs"
video/720.m3u8
"#;

    #[test]
    fn test_single_track_example() {
        let line = r#"#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="s1",LANGUAGE="en",NAME="English",URI="subs/en.m3u8""#;
        let tracks = parse_hls_subtitle_tracks(line, "https://x/master.m3u8");

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language.as_deref(), Some("en"));
        assert_eq!(tracks[0].name.as_deref(), Some("English"));
        assert_eq!(tracks[0].group_id.as_deref(), Some("s1"));
        assert_eq!(tracks[0].uri, "https://x/subs/en.m3u8");
    }

    #[test]
    fn test_only_subtitle_renditions_with_uri() {
        let tracks = parse_hls_subtitle_tracks(MASTER, "https://x/v/master.m3u8");

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].uri, "https://x/v/subs/en.m3u8");
        assert!(tracks[0].is_default);
        assert_eq!(tracks[1].uri, "https://cdn.example.com/subs/ar.m3u8");
        assert_eq!(tracks[1].name.as_deref(), Some("Arabic, UAE"));
        assert!(!tracks[1].is_default);
    }

    #[test]
    fn test_find_track_is_case_insensitive_and_exact() {
        let tracks = parse_hls_subtitle_tracks(MASTER, "https://x/v/master.m3u8");

        assert_eq!(
            find_track(&tracks, "EN").map(|t| t.uri.as_str()),
            Some("https://x/v/subs/en.m3u8")
        );
        assert!(find_track(&tracks, "e").is_none());
        assert!(find_track(&tracks, "en-US").is_none());
        // French has no URI, so it was never a track.
        assert!(find_track(&tracks, "fr").is_none());
    }

    #[test]
    fn test_attribute_list_unquoted_and_quoted_values() {
        let attrs = parse_attribute_list(r#"TYPE=SUBTITLES,NAME="a,b",FORCED=NO, CHARACTERISTICS="x""#);

        assert_eq!(attrs.get("TYPE").map(String::as_str), Some("SUBTITLES"));
        assert_eq!(attrs.get("NAME").map(String::as_str), Some("a,b"));
        assert_eq!(attrs.get("FORCED").map(String::as_str), Some("NO"));
        assert_eq!(attrs.get("CHARACTERISTICS").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_malformed_attributes_do_not_abort() {
        let manifest = "#EXT-X-MEDIA:garbage,,TYPE=SUBTITLES,URI=\"s.m3u8\nnext line";
        let tracks = parse_hls_subtitle_tracks(manifest, "https://x/m.m3u8");

        // The unterminated quote runs to end of line; the URI is still usable.
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].uri, "https://x/s.m3u8");
        assert!(tracks[0].language.is_none());
    }

    #[test]
    fn test_empty_manifest() {
        assert!(parse_hls_subtitle_tracks("", "https://x/m.m3u8").is_empty());
        assert!(parse_hls_subtitle_tracks("#EXTM3U\nvideo.m3u8", "https://x/m.m3u8").is_empty());
    }
}
