//! URL utilities for consistent URL handling
//!
//! This module provides utilities for normalizing URLs to prevent issues
//! with trailing slashes when constructing API endpoints, plus the image
//! proxy rewrite applied to assistant-sent image URLs.

/// Normalize a base URL by removing trailing slashes
///
/// This ensures consistent URL construction when appending endpoints,
/// preventing double slashes in the final URLs.
///
/// # Examples
///
/// ```
/// use plausch::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://chat.example.com/api"), "https://chat.example.com/api");
/// assert_eq!(normalize_base_url("https://chat.example.com/api/"), "https://chat.example.com/api");
/// assert_eq!(normalize_base_url("https://chat.example.com/api///"), "https://chat.example.com/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete API endpoint URL from a base URL and endpoint path
///
/// This function normalizes the base URL and safely appends the endpoint,
/// ensuring there are no double slashes in the result.
///
/// # Examples
///
/// ```
/// use plausch::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://chat.example.com/api", "chat"),
///     "https://chat.example.com/api/chat"
/// );
/// assert_eq!(
///     construct_api_url("https://chat.example.com/api/", "chat"),
///     "https://chat.example.com/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Rewrite an external image URL so it is fetched through the backend's
/// image proxy instead of directly by the client.
///
/// Assistant replies can reference images on arbitrary hosts. Fetching those
/// directly would leak the user's address to third parties and trip mixed
/// content rules, so the backend exposes `GET api/proxy-image?url=<encoded>`
/// and the client routes every remote image through it. URLs that already
/// point at the proxy, relative URLs, and data URLs pass through unchanged.
pub fn proxied_image_url(base_url: &str, image_url: &str) -> String {
    if image_url.is_empty()
        || image_url.starts_with("data:")
        || image_url.contains("/api/proxy-image")
    {
        return image_url.to_string();
    }
    if !image_url.starts_with("http://") && !image_url.starts_with("https://") {
        // Relative path, already served by the backend itself.
        return image_url.to_string();
    }

    let endpoint = construct_api_url(base_url, "api/proxy-image");
    match reqwest::Url::parse_with_params(&endpoint, &[("url", image_url)]) {
        Ok(url) => url.to_string(),
        // A base URL broken enough to fail parsing would have failed the
        // chat request long before any image arrived. Pass through.
        Err(_) => image_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        // No trailing slash - should remain unchanged
        assert_eq!(
            normalize_base_url("https://chat.example.com/api"),
            "https://chat.example.com/api"
        );

        // Single trailing slash - should be removed
        assert_eq!(
            normalize_base_url("https://chat.example.com/api/"),
            "https://chat.example.com/api"
        );

        // Multiple trailing slashes - should all be removed
        assert_eq!(
            normalize_base_url("https://chat.example.com/api///"),
            "https://chat.example.com/api"
        );

        // Root URL with trailing slash
        assert_eq!(
            normalize_base_url("https://chat.example.com/"),
            "https://chat.example.com"
        );

        // Root URL without trailing slash
        assert_eq!(
            normalize_base_url("https://chat.example.com"),
            "https://chat.example.com"
        );

        // Empty string
        assert_eq!(normalize_base_url(""), "");

        // Just slashes
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        // Normal case - no trailing slash on base URL
        assert_eq!(
            construct_api_url("https://chat.example.com", "api/chat"),
            "https://chat.example.com/api/chat"
        );

        // Base URL with trailing slash
        assert_eq!(
            construct_api_url("https://chat.example.com/", "api/chat"),
            "https://chat.example.com/api/chat"
        );

        // Endpoint with leading slash
        assert_eq!(
            construct_api_url("https://chat.example.com", "/api/chat/upload"),
            "https://chat.example.com/api/chat/upload"
        );

        // Both base URL with trailing slash and endpoint with leading slash
        assert_eq!(
            construct_api_url("https://chat.example.com/", "/api/chat/upload"),
            "https://chat.example.com/api/chat/upload"
        );

        // Multiple trailing slashes on base URL
        assert_eq!(
            construct_api_url("https://chat.example.com///", "api/conversations"),
            "https://chat.example.com/api/conversations"
        );

        // Multiple leading slashes on endpoint
        assert_eq!(
            construct_api_url("https://chat.example.com", "///api/conversations"),
            "https://chat.example.com/api/conversations"
        );
    }

    #[test]
    fn test_proxied_image_url_rewrites_remote() {
        let out = proxied_image_url("https://chat.example.com", "https://cdn.host/cat.png");
        assert!(out.starts_with("https://chat.example.com/api/proxy-image?url="));
        assert!(out.contains("cdn.host"));
        // The remote URL must arrive percent-encoded, not raw.
        assert!(!out.contains("url=https://cdn.host"));
    }

    #[test]
    fn test_proxied_image_url_percent_encodes_query() {
        let out = proxied_image_url(
            "https://chat.example.com",
            "https://cdn.host/img?id=1&size=big",
        );
        assert!(out.contains("%3Fid%3D1%26size%3Dbig"));
    }

    #[test]
    fn test_proxied_image_url_passthrough() {
        // Already proxied
        let already = "https://chat.example.com/api/proxy-image?url=x";
        assert_eq!(proxied_image_url("https://chat.example.com", already), already);

        // Data URL
        let data = "data:image/png;base64,AAAA";
        assert_eq!(proxied_image_url("https://chat.example.com", data), data);

        // Relative path served by the backend
        assert_eq!(
            proxied_image_url("https://chat.example.com", "/static/logo.png"),
            "/static/logo.png"
        );

        // Empty
        assert_eq!(proxied_image_url("https://chat.example.com", ""), "");
    }
}
