// src/utils/slug.rs

/// Derives a URL slug from a display name: lowercase, ASCII alphanumerics
/// kept, every other run of characters collapsed into a single dash.
/// Returns an empty string when the name has no usable characters.
pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut prev_dash = false;
    for c in input.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}
