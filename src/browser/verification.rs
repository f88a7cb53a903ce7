//! Bot-challenge interstitial detection
//!
//! Matching is a case-insensitive keyword scan. Challenge phrases count
//! anywhere in the title or the leading body text. Brand and generic words
//! ("cloudflare", "just a moment") count in the title, and in the body only
//! when the body is as short as an interstitial is. Ordinary pages mention
//! those words in footers and articles.

/// Phrases only a challenge page shows; matched in title and body
pub const CHALLENGE_PHRASES: &[&str] = &[
    "checking your browser",
    "verify you are human",
    "verifying you are human",
    "please wait while we verify",
];

/// Words that also appear on ordinary pages; matched in the title, or in a
/// body no longer than [`SHORT_BODY_CHARS`]
pub const TITLE_KEYWORDS: &[&str] = &[
    "security check",
    "cloudflare",
    "just a moment",
    "ddos protection",
    "attention required",
];

/// Characters of body text inspected for keywords
pub const BODY_SAMPLE_CHARS: usize = 10_000;

/// Trimmed body length up to which [`TITLE_KEYWORDS`] are matched in the body
pub const SHORT_BODY_CHARS: usize = 600;

/// In-page script returning `{ title, text }`
pub const PAGE_TEXT_SCRIPT: &str = r#"
    (() => {
        const body = document.body ? (document.body.innerText || '') : '';
        return {
            title: document.title || '',
            text: body.substring(0, 10000)
        };
    })()
"#;

/// Whether `title` or `body` looks like a challenge page
pub fn is_verification_text(title: &str, body: &str) -> bool {
    let title = title.to_lowercase();
    let body: String = body.chars().take(BODY_SAMPLE_CHARS).collect::<String>().to_lowercase();
    let short_body = body.trim().chars().count() <= SHORT_BODY_CHARS;

    CHALLENGE_PHRASES
        .iter()
        .any(|kw| title.contains(kw) || body.contains(kw))
        || TITLE_KEYWORDS
            .iter()
            .any(|kw| title.contains(kw) || (short_body && body.contains(kw)))
}

/// JS arrow function `(title, body) => bool` with the same rules as
/// [`is_verification_text`], for embedding into page scripts
pub fn verification_js_fn() -> String {
    let phrases = serde_json::to_string(CHALLENGE_PHRASES).unwrap_or_else(|_| "[]".to_string());
    let title_keywords = serde_json::to_string(TITLE_KEYWORDS).unwrap_or_else(|_| "[]".to_string());
    format!(
        "((title, body) => {{
            const t = (title || '').toLowerCase();
            const b = (body || '').substring(0, {sample}).toLowerCase();
            const shortBody = b.trim().length <= {short};
            return {phrases}.some(k => t.includes(k) || b.includes(k)) ||
                {title_keywords}.some(k => t.includes(k) || (shortBody && b.includes(k)));
        }})",
        sample = BODY_SAMPLE_CHARS,
        short = SHORT_BODY_CHARS,
        phrases = phrases,
        title_keywords = title_keywords,
    )
}
