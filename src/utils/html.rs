use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: keeps safe formatting tags while stripping
/// dangerous ones (like <script>, <iframe>) and event-handler attributes.
/// Applied to every user-authored rich field (gig descriptions, seller bios,
/// chat messages, reviews) before it is stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
