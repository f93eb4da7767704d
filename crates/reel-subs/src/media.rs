use crate::uri::resolve_uri;

/// List the media URIs of a subtitle media playlist.
///
/// Every line that is neither blank nor a comment/tag (`#...`) is taken as a
/// segment URI and resolved against `playlist_url`. Order is preserved.
pub fn parse_segment_uris(playlist: &str, playlist_url: &str) -> Vec<String> {
    playlist
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| resolve_uri(playlist_url, line))
        .collect()
}
