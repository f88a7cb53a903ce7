//! DOM snapshot extraction
//!
//! One in-page evaluation walks the rendered document and returns the whole
//! snapshot as JSON. Each element is read inside its own try/catch so a single
//! hostile node never loses the rest of the page.

use crate::browser::verification::verification_js_fn;
use crate::browser::PageHandle;
use crate::error::{ExtractionError, Result};
use crate::extraction::snapshot::PageSnapshot;
use tracing::{debug, info, instrument, warn};

const VERIFICATION_PLACEHOLDER: &str = "__IS_VERIFICATION__";

const SNAPSHOT_SCRIPT: &str = r##"
    (() => {
        const isVerification = __IS_VERIFICATION__;
        const clean = (s, max) => (s || '').replace(/\s+/g, ' ').trim().substring(0, max || 200);
        const attr = (el, name) => el.getAttribute(name) || '';

        const isVisible = (el) => {
            try {
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                return rect.width > 0 && rect.height > 0 &&
                    style.display !== 'none' &&
                    style.visibility !== 'hidden' &&
                    style.opacity !== '0';
            } catch (e) {
                return false;
            }
        };

        const labelFor = (input) => {
            if (input.id) {
                try {
                    const label = document.querySelector('label[for="' + CSS.escape(input.id) + '"]');
                    if (label) return clean(label.innerText || label.textContent);
                } catch (e) {}
            }
            const wrapping = input.closest('label');
            if (wrapping) return clean(wrapping.innerText || wrapping.textContent);
            const labelledBy = attr(input, 'aria-labelledby');
            if (labelledBy) {
                const ref = document.getElementById(labelledBy.split(/\s+/)[0]);
                if (ref) return clean(ref.textContent);
            }
            return '';
        };

        const metaContent = (selector) => {
            const el = document.querySelector(selector);
            return el ? (el.getAttribute('content') || null) : null;
        };

        const title = document.title || '';
        const bodyText = document.body ? (document.body.innerText || '') : '';
        const isVerificationPage = isVerification(title, bodyText);

        const root = document.documentElement;
        const dimensions = {
            scrollWidth: root.scrollWidth || 0,
            scrollHeight: root.scrollHeight || 0,
            clientWidth: root.clientWidth || 0,
            clientHeight: root.clientHeight || 0,
            viewportWidth: window.innerWidth || 0,
            viewportHeight: window.innerHeight || 0
        };

        const charsetMeta = document.querySelector('meta[charset]');
        const meta = {
            description: metaContent('meta[name="description"]'),
            viewport: metaContent('meta[name="viewport"]'),
            charset: charsetMeta ? charsetMeta.getAttribute('charset') : (document.characterSet || null),
            ogTitle: metaContent('meta[property="og:title"]'),
            ogDescription: metaContent('meta[property="og:description"]'),
            ogImage: metaContent('meta[property="og:image"]')
        };

        const has = (sel) => document.querySelector(sel) !== null;
        const structure = {
            hasMain: has('main, [role="main"]'),
            hasNav: has('nav, [role="navigation"]'),
            hasHeader: has('header, [role="banner"]'),
            hasFooter: has('footer, [role="contentinfo"]'),
            hasAside: has('aside, [role="complementary"]'),
            hasSection: has('section'),
            hasArticle: has('article'),
            landmarkCount: document.querySelectorAll(
                'main, nav, header, footer, aside, [role="main"], [role="navigation"], [role="banner"], [role="contentinfo"], [role="complementary"]'
            ).length,
            hasSkipLinks: Array.from(document.querySelectorAll('a[href^="#"]')).some(a => {
                const text = (a.textContent || '').toLowerCase();
                return text.includes('skip') || (a.className || '').toString().toLowerCase().includes('skip');
            })
        };

        const headings = [];
        document.querySelectorAll('h1, h2, h3, h4, h5, h6').forEach((h) => {
            try {
                headings.push({
                    level: parseInt(h.tagName.substring(1), 10),
                    text: clean(h.textContent),
                    id: h.id || '',
                    className: (h.className || '').toString(),
                    visible: isVisible(h),
                    index: headings.length
                });
            } catch (e) {}
        });

        const images = [];
        document.querySelectorAll('img').forEach((img) => {
            try {
                const hasAlt = img.hasAttribute('alt');
                const alt = attr(img, 'alt');
                const role = attr(img, 'role');
                const src = (img.currentSrc || img.src || '').toLowerCase();
                const cls = (img.className || '').toString().toLowerCase();
                const rect = img.getBoundingClientRect();
                const isDecorative = (hasAlt && alt.trim() === '') ||
                    role === 'presentation' ||
                    src.includes('icon') || src.includes('logo') ||
                    cls.includes('icon') || cls.includes('logo') ||
                    (rect.width < 50 && rect.height < 50);
                const visible = isVisible(img);
                images.push({
                    src: img.currentSrc || img.src || attr(img, 'data-src'),
                    alt: alt,
                    title: attr(img, 'title'),
                    hasAlt: hasAlt,
                    altLength: alt.length,
                    visible: visible,
                    isLazy: attr(img, 'loading') === 'lazy' || img.hasAttribute('data-src'),
                    isDecorative: isDecorative,
                    needsAlt: !hasAlt && !isDecorative && visible,
                    index: images.length
                });
            } catch (e) {}
        });

        const links = [];
        document.querySelectorAll('a').forEach((a) => {
            try {
                const text = clean(a.textContent);
                const ariaLabel = attr(a, 'aria-label');
                const linkTitle = attr(a, 'title');
                const hasImageWithAlt = Array.from(a.querySelectorAll('img')).some(i => attr(i, 'alt').trim() !== '');
                const hasIcon = a.querySelector('svg, i, [class*="icon"]') !== null;
                const href = a.href || '';
                let isExternal = false;
                try { isExternal = href !== '' && new URL(href).host !== location.host; } catch (e) {}
                const empty = text === '' && ariaLabel.trim() === '' && linkTitle.trim() === '' && !hasImageWithAlt;
                links.push({
                    href: href,
                    text: text,
                    title: linkTitle,
                    ariaLabel: ariaLabel,
                    hasText: text !== '',
                    hasAriaLabel: ariaLabel.trim() !== '',
                    hasTitle: linkTitle.trim() !== '',
                    hasImageWithAlt: hasImageWithAlt,
                    visible: isVisible(a),
                    isExternal: isExternal,
                    isEmpty: empty,
                    isIconOnly: text === '' && hasIcon,
                    index: links.length
                });
            } catch (e) {}
        });

        const BUTTON_TYPES = ['submit', 'button', 'reset', 'image'];
        const readInput = (input, index) => {
            const type = (input.type || input.tagName.toLowerCase() || '').toLowerCase();
            const labelText = labelFor(input);
            const placeholder = attr(input, 'placeholder');
            const ariaLabel = attr(input, 'aria-label');
            const isHidden = type === 'hidden';
            const isButton = BUTTON_TYPES.includes(type) || input.tagName === 'BUTTON';
            const visible = isVisible(input);
            const hasLabel = labelText !== '';
            return {
                type: type,
                name: input.name || '',
                id: input.id || '',
                placeholder: placeholder,
                required: !!input.required,
                disabled: !!input.disabled,
                ariaLabel: ariaLabel,
                hasLabel: hasLabel,
                hasPlaceholder: placeholder.trim() !== '',
                hasAriaLabel: ariaLabel.trim() !== '',
                labelText: labelText,
                visible: visible,
                isHidden: isHidden,
                isButton: isButton,
                needsLabel: visible && !isHidden && !isButton && !hasLabel &&
                    placeholder.trim() === '' && ariaLabel.trim() === '',
                index: index
            };
        };

        const forms = [];
        document.querySelectorAll('form').forEach((form) => {
            try {
                const inputs = [];
                form.querySelectorAll('input, select, textarea').forEach((input) => {
                    try { inputs.push(readInput(input, inputs.length)); } catch (e) {}
                });
                forms.push({
                    action: form.action || '',
                    method: (form.method || 'get').toLowerCase(),
                    name: attr(form, 'name'),
                    id: form.id || '',
                    visible: isVisible(form),
                    inputs: inputs,
                    index: forms.length
                });
            } catch (e) {}
        });

        // controls outside any <form> are grouped into one synthetic form
        const orphans = [];
        document.querySelectorAll('input, select, textarea').forEach((input) => {
            try {
                if (!input.form && !input.closest('form')) orphans.push(readInput(input, orphans.length));
            } catch (e) {}
        });
        if (orphans.length > 0) {
            forms.push({ action: '', method: '', name: '', id: '', visible: true, inputs: orphans, index: forms.length });
        }

        const interactive = [];
        document.querySelectorAll(
            'a[href], button, input, select, textarea, [tabindex], [role="button"], [role="link"], [onclick]'
        ).forEach((el) => {
            try {
                const tabAttr = el.getAttribute('tabindex');
                const tabindex = tabAttr === null ? null : parseInt(tabAttr, 10);
                interactive.push({
                    tag: el.tagName.toLowerCase(),
                    role: attr(el, 'role'),
                    tabindex: Number.isNaN(tabindex) ? null : Math.max(-2147483648, Math.min(2147483647, tabindex)),
                    text: clean(el.textContent || el.value || attr(el, 'aria-label'), 100),
                    disabled: !!el.disabled,
                    visible: isVisible(el),
                    focusable: el.tabIndex >= 0 && !el.disabled,
                    index: interactive.length
                });
            } catch (e) {}
        });

        const textElements = [];
        const textNodes = document.querySelectorAll('p, li, span, td, th, blockquote, figcaption, label');
        for (let i = 0; i < textNodes.length && textElements.length < 50; i++) {
            try {
                const el = textNodes[i];
                const text = clean(el.textContent, 300);
                if (text.length >= 3 && isVisible(el)) {
                    textElements.push({ tag: el.tagName.toLowerCase(), text: text, index: textElements.length });
                }
            } catch (e) {}
        }

        const all = document.querySelectorAll('*');
        let visibleCount = 0;
        for (let i = 0; i < all.length && i < 5000; i++) {
            try { if (isVisible(all[i])) visibleCount++; } catch (e) {}
        }

        const frameworks = {
            react: !!(window.React || document.querySelector('[data-reactroot], [data-reactid]') || window.__REACT_DEVTOOLS_GLOBAL_HOOK__),
            vue: !!(window.Vue || window.__VUE__ || document.querySelector('[data-v-app]')),
            angular: !!(window.angular || window.ng || document.querySelector('[ng-version], [ng-app]')),
            next: !!(window.__NEXT_DATA__ || document.getElementById('__next')),
            nuxt: !!(window.__NUXT__ || document.getElementById('__nuxt')),
            svelte: !!document.querySelector('[class*="svelte-"]'),
            jquery: !!(window.jQuery || window.$ && window.$.fn && window.$.fn.jquery)
        };

        return {
            title: title,
            url: location.href,
            language: root.getAttribute('lang') || '',
            dimensions: dimensions,
            meta: meta,
            structure: structure,
            headings: headings,
            images: images,
            links: links,
            forms: forms,
            interactive: interactive,
            textElements: textElements,
            performance: {
                totalElements: all.length,
                visibleElements: visibleCount,
                images: images.length,
                links: links.length,
                forms: forms.length,
                inputs: forms.reduce((n, f) => n + f.inputs.length, 0),
                hasLazyLoading: images.some(i => i.isLazy),
                pageWidth: dimensions.scrollWidth,
                pageHeight: dimensions.scrollHeight,
                viewportWidth: dimensions.viewportWidth,
                viewportHeight: dimensions.viewportHeight,
                frameworks: frameworks
            },
            isVerificationPage: isVerificationPage
        };
    })()
"##;

/// Snapshot script with the challenge matcher embedded
pub fn snapshot_script() -> String {
    SNAPSHOT_SCRIPT.replace(VERIFICATION_PLACEHOLDER, &verification_js_fn())
}

/// Decode and normalize the raw in-page result
pub fn parse_snapshot(value: serde_json::Value) -> Result<PageSnapshot> {
    let mut snapshot: PageSnapshot =
        serde_json::from_value(value).map_err(|e| ExtractionError::ParsingFailed(e.to_string()))?;
    snapshot.normalize();
    Ok(snapshot)
}

/// Structured DOM extraction for a settled page
pub struct SnapshotExtractor;

impl SnapshotExtractor {
    /// Run the in-page extraction.
    ///
    /// Errors only if the evaluation as a whole fails; see [`Self::extract_or_minimal`].
    #[instrument(skip(page))]
    pub async fn try_extract(page: &PageHandle) -> Result<PageSnapshot> {
        info!("Extracting page snapshot");

        let result = page
            .page
            .evaluate(snapshot_script().as_str())
            .await
            .map_err(|e| ExtractionError::JsExecutionFailed(e.to_string()))?;

        let value: serde_json::Value = result
            .into_value()
            .map_err(|e| ExtractionError::ParsingFailed(e.to_string()))?;

        let snapshot = parse_snapshot(value)?;

        debug!(
            "Snapshot: {} headings, {} images, {} links, {} forms, verification={}",
            snapshot.headings.len(),
            snapshot.images.len(),
            snapshot.links.len(),
            snapshot.forms.len(),
            snapshot.is_verification_page
        );

        Ok(snapshot)
    }

    /// Extract, degrading to a minimal snapshot when the page cannot be read
    pub async fn extract_or_minimal(page: &PageHandle, url: &str, is_verification_page: bool) -> PageSnapshot {
        match Self::try_extract(page).await {
            Ok(mut snapshot) => {
                snapshot.is_verification_page |= is_verification_page;
                if snapshot.url.is_empty() {
                    snapshot.url = url.to_string();
                }
                snapshot
            }
            Err(e) => {
                warn!("Snapshot extraction failed, using minimal snapshot: {}", e);
                PageSnapshot::minimal(url, is_verification_page)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_embeds_keywords() {
        let script = snapshot_script();
        assert!(!script.contains(VERIFICATION_PLACEHOLDER));
        assert!(script.contains("\"checking your browser\""));
        assert!(script.contains("isVerification(title, bodyText)"));
        assert!(!script.contains("captcha"));
    }

    #[test]
    fn test_script_survives_hash_selectors() {
        let script = snapshot_script();
        assert!(script.contains(r##"document.querySelectorAll('a[href^="#"]')"##));
        assert!(script.contains("isVerificationPage: isVerificationPage"));
        assert!(script.trim_end().ends_with("})()"));
    }

    #[test]
    fn test_parse_snapshot_normalizes() {
        let value = json!({
            "title": "Shop",
            "images": [
                { "src": "a.png", "alt": "Logo", "visible": true, "needsAlt": true },
                { "src": "b.png", "visible": true }
            ],
            "links": [{ "href": "/x", "visible": true }],
            "textElements": (0..60).map(|i| json!({ "tag": "p", "text": format!("x{}", i) })).collect::<Vec<_>>()
        });
        let snap = parse_snapshot(value).unwrap();
        assert!(!snap.images[0].needs_alt);
        assert!(snap.images[1].needs_alt);
        assert!(snap.links[0].is_empty);
        assert_eq!(snap.text_elements.len(), 50);
    }

    #[test]
    fn test_parse_snapshot_rejects_wrong_shape() {
        let err = parse_snapshot(json!({ "images": "nope" })).unwrap_err();
        assert_eq!(err.code(), "EXTRACTION_FAILED");
    }
}
