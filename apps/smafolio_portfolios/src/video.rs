use url::Url;

const EMBED_BASE: &str = "https://www.youtube-nocookie.com/embed/";

/// Privacy-enhanced YouTube embed URL for a watch, short, embed or
/// `youtu.be` link. Anything else has no embed.
pub fn embed_url(link: &str) -> Option<String> {
    let parsed = Url::parse(link.trim()).ok()?;
    let video_id = match parsed.host_str()? {
        "youtu.be" => Some(parsed.path().trim_start_matches('/').to_string()),
        "www.youtube.com" | "youtube.com" => {
            let path = parsed.path();
            if path == "/watch" {
                parsed
                    .query_pairs()
                    .find(|(k, v)| k == "v" && !v.is_empty())
                    .map(|(_, v)| v.into_owned())
            } else if path.starts_with("/embed/") || path.starts_with("/shorts/") {
                path.split('/').nth(2).map(str::to_owned)
            } else {
                None
            }
        }
        _ => None,
    };
    video_id
        .filter(|id| !id.is_empty())
        .map(|id| format!("{EMBED_BASE}{id}?rel=0&modestbranding=1"))
}
