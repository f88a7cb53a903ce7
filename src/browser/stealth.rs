//! Fingerprint patches for the automated browser
//!
//! Many sites serve a bot challenge to anything that looks like headless
//! Chrome. These patches run before any page script on every new document.

use crate::error::{Error, Result};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use tracing::{debug, instrument};

const HIDE_WEBDRIVER: &str = r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
"#;

const MOCK_PLUGINS: &str = r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => {
            const plugins = [
                { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer' },
                { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai' },
                { name: 'Native Client', filename: 'internal-nacl-plugin' }
            ];
            plugins.item = (i) => plugins[i];
            plugins.namedItem = (name) => plugins.find(p => p.name === name);
            plugins.refresh = () => {};
            return plugins;
        },
        configurable: true
    });
"#;

const MOCK_LANGUAGES: &str = r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
"#;

const MOCK_CHROME_RUNTIME: &str = r#"
    if (!window.chrome) {
        window.chrome = {};
    }
    if (!window.chrome.runtime) {
        window.chrome.runtime = {
            connect: function() {},
            sendMessage: function() {}
        };
    }
"#;

const PATCH_PERMISSIONS: &str = r#"
    if (navigator.permissions && navigator.permissions.query) {
        const originalQuery = navigator.permissions.query.bind(navigator.permissions);
        navigator.permissions.query = (parameters) => (
            parameters && parameters.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : originalQuery(parameters)
        );
    }
"#;

/// Stealth patch set
pub struct StealthMode;

impl StealthMode {
    /// Named patches in injection order
    pub fn patches() -> [(&'static str, &'static str); 5] {
        [
            ("webdriver", HIDE_WEBDRIVER),
            ("plugins", MOCK_PLUGINS),
            ("languages", MOCK_LANGUAGES),
            ("chrome-runtime", MOCK_CHROME_RUNTIME),
            ("permissions", PATCH_PERMISSIONS),
        ]
    }

    /// Register every patch to run on each new document of `page`
    #[instrument(skip(page))]
    pub async fn apply(page: &Page) -> Result<()> {
        for (name, script) in Self::patches() {
            Self::inject_script(page, name, script).await?;
        }
        debug!("Stealth patches registered");
        Ok(())
    }

    async fn inject_script(page: &Page, name: &str, script: &str) -> Result<()> {
        let params = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(script)
            .build()
            .map_err(|e| Error::cdp(format!("Failed to build {} patch: {}", name, e)))?;

        page.execute(params)
            .await
            .map_err(|e| Error::cdp(format!("Failed to inject {} patch: {}", name, e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patches_cover_fingerprinted_properties() {
        let names: Vec<&str> = StealthMode::patches().iter().map(|(n, _)| *n).collect();
        assert!(names.contains(&"webdriver"));
        assert!(names.contains(&"plugins"));
        assert!(names.contains(&"languages"));
    }

    #[test]
    fn test_patches_target_navigator() {
        for (name, script) in StealthMode::patches() {
            assert!(!script.trim().is_empty(), "{} patch is empty", name);
        }
        assert!(HIDE_WEBDRIVER.contains("'webdriver'"));
        assert!(MOCK_LANGUAGES.contains("'en-US'"));
    }
}
