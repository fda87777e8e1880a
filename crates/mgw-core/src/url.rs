use ::url::Url;

/// Check that `s` is an absolute URL with a scheme followed by a non-empty
/// `//` authority.
///
/// The raw text is checked as well as the parsed URL: for special schemes the
/// parser invents a host when the authority is missing (`http:example.com`).
pub fn is_valid_url(s: &str) -> bool {
    if !has_authority(s) {
        return false;
    }

    match Url::parse(s) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

fn has_authority(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once(':') else {
        return false;
    };
    if scheme.is_empty() {
        return false;
    }
    let Some(rest) = rest.strip_prefix("//") else {
        return false;
    };
    let end = rest.find(['/', '\\', '?', '#']).unwrap_or(rest.len());
    !rest[..end].is_empty()
}
