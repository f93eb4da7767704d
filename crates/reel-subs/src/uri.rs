use url::Url;

/// Resolve `uri` against the URL of the playlist it was found in.
///
/// Absolute URIs are returned unchanged. If the base cannot be parsed or the
/// join fails, the raw URI is returned as-is so callers still get something
/// to try.
pub fn resolve_uri(base_url: &str, uri: &str) -> String {
    let uri = uri.trim();
    if let Ok(absolute) = Url::parse(uri) {
        return absolute.to_string();
    }

    match Url::parse(base_url).and_then(|base| base.join(uri)) {
        Ok(joined) => joined.to_string(),
        Err(e) => {
            tracing::trace!(base = %base_url, uri = %uri, error = %e, "Could not absolutize URI");
            uri.to_string()
        }
    }
}
