//! Extraction module tests
//!
//! These tests exercise snapshot decoding and normalization on payloads shaped
//! like the in-page script's output. Running the script itself needs Chromium.

use a11yscan::extraction::{parse_snapshot, PageSnapshot, TEXT_SAMPLE_CAP};
use pretty_assertions::assert_eq;
use serde_json::json;

fn page_payload() -> serde_json::Value {
    json!({
        "title": "Example Store",
        "url": "https://store.example/",
        "language": "en",
        "dimensions": {
            "scrollWidth": 1920, "scrollHeight": 5400,
            "clientWidth": 1920, "clientHeight": 1080,
            "viewportWidth": 1920, "viewportHeight": 1080
        },
        "meta": { "description": "Shoes", "viewport": "width=device-width", "charset": "UTF-8", "ogTitle": null },
        "structure": {
            "hasMain": true, "hasNav": true, "hasHeader": true, "hasFooter": false,
            "hasAside": false, "hasSection": true, "hasArticle": false,
            "landmarkCount": 3, "hasSkipLinks": false
        },
        "headings": [
            { "level": 1, "text": "Store", "visible": true, "index": 0 },
            { "level": 2, "text": "Deals", "visible": true, "index": 1 }
        ],
        "images": [
            { "src": "/hero.jpg", "hasAlt": false, "alt": "", "visible": true, "isDecorative": false, "needsAlt": false },
            { "src": "/logo.svg", "hasAlt": false, "alt": "", "visible": true, "isDecorative": true, "needsAlt": false },
            { "src": "/shoe.jpg", "hasAlt": true, "alt": "Red running shoe", "visible": true, "needsAlt": true }
        ],
        "links": [
            { "href": "/cart", "text": "", "ariaLabel": "Cart", "visible": true, "isEmpty": true },
            { "href": "/x", "text": "", "visible": true, "isEmpty": false, "isIconOnly": true },
            { "href": "/about", "text": "About us", "visible": true }
        ],
        "forms": [
            {
                "action": "/search", "method": "get", "visible": true,
                "inputs": [
                    { "type": "search", "name": "q", "visible": true, "placeholder": "", "hasLabel": false },
                    { "type": "submit", "visible": true, "isButton": true },
                    { "type": "hidden", "name": "csrf", "isHidden": true, "visible": false }
                ]
            }
        ],
        "interactive": [
            { "tag": "button", "role": "", "tabindex": null, "text": "Menu", "visible": true, "focusable": true },
            { "tag": "div", "role": "button", "tabindex": 0, "text": "Open", "visible": true, "focusable": true }
        ],
        "textElements": [],
        "performance": {
            "totalElements": 812, "visibleElements": 540,
            "images": 3, "links": 3, "forms": 1, "inputs": 3,
            "hasLazyLoading": false,
            "pageWidth": 1920, "pageHeight": 5400, "viewportWidth": 1920, "viewportHeight": 1080,
            "frameworks": { "react": true, "vue": false, "angular": false, "next": true, "nuxt": false, "svelte": false, "jquery": false }
        },
        "isVerificationPage": false
    })
}

#[test]
fn test_full_payload_decodes() {
    let snap = parse_snapshot(page_payload()).unwrap();
    assert_eq!(snap.title, "Example Store");
    assert_eq!(snap.language, "en");
    assert_eq!(snap.dimensions.scroll_height, 5400);
    assert_eq!(snap.meta.description.as_deref(), Some("Shoes"));
    assert!(snap.meta.og_title.is_none());
    assert_eq!(snap.headings.len(), 2);
    assert_eq!(snap.interactive[1].tabindex, Some(0));
    assert_eq!(snap.detected_frameworks(), vec!["next", "react"]);
}

#[test]
fn test_image_flags_rederived() {
    let snap = parse_snapshot(page_payload()).unwrap();
    // script said no, but nothing describes it
    assert!(snap.images[0].needs_alt);
    assert!(!snap.images[1].needs_alt);
    // alt text wins over a tampered flag
    assert!(!snap.images[2].needs_alt);
    assert_eq!(snap.images[2].alt_length, "Red running shoe".len());
    assert_eq!(snap.images_without_alt(), 1);
}

#[test]
fn test_link_flags_rederived() {
    let snap = parse_snapshot(page_payload()).unwrap();
    assert!(!snap.links[0].is_empty, "aria-label gives the link a name");
    assert!(snap.links[1].is_empty, "icon-only link with no label is empty");
    assert!(!snap.links[2].is_empty);
    assert_eq!(snap.empty_visible_links(), 1);
}

#[test]
fn test_input_flags_rederived() {
    let snap = parse_snapshot(page_payload()).unwrap();
    let inputs: Vec<_> = snap.all_inputs().collect();
    assert!(inputs[0].needs_label);
    assert!(!inputs[1].needs_label);
    assert!(!inputs[2].needs_label);
    assert_eq!(snap.inputs_without_labels(), 1);
}

#[test]
fn test_derived_structure_signals() {
    let snap = parse_snapshot(page_payload()).unwrap();
    assert!(snap.has_semantic_landmark());
    assert!(snap.has_headings());
    assert!(snap.has_framework());
}

#[test]
fn test_text_samples_capped() {
    let mut payload = page_payload();
    payload["textElements"] = json!((0..120)
        .map(|i| json!({ "tag": "p", "text": format!("paragraph {}", i), "index": i }))
        .collect::<Vec<_>>());
    let snap = parse_snapshot(payload).unwrap();
    assert_eq!(snap.text_elements.len(), TEXT_SAMPLE_CAP);
    assert_eq!(snap.text_elements.last().map(|t| t.index), Some(TEXT_SAMPLE_CAP - 1));
}

#[test]
fn test_malformed_entries_take_defaults() {
    let snap = parse_snapshot(json!({
        "images": [{}],
        "links": [{ "href": "/a" }],
        "forms": [{ "inputs": [{}] }],
        "performance": {}
    }))
    .unwrap();
    assert_eq!(snap.images.len(), 1);
    assert!(!snap.images[0].visible);
    assert!(snap.links[0].is_empty);
    assert!(!snap.has_framework());
}

#[test]
fn test_minimal_snapshot_schema() {
    let snap = PageSnapshot::minimal("https://down.example/", true);
    let json = serde_json::to_value(&snap).unwrap();
    for key in [
        "title", "url", "language", "dimensions", "meta", "structure", "headings", "images", "links", "forms",
        "interactive", "textElements", "performance", "isVerificationPage",
    ] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(json["isVerificationPage"], true);
    assert_eq!(json["performance"]["totalElements"], 0);
}

#[test]
fn test_snapshot_round_trips_through_json() {
    let snap = parse_snapshot(page_payload()).unwrap();
    let text = serde_json::to_string(&snap).unwrap();
    let back: PageSnapshot = serde_json::from_str(&text).unwrap();
    assert_eq!(back, snap);
}

#[test]
fn test_out_of_range_tabindex_keeps_page() {
    let mut payload = page_payload();
    payload["interactive"] = json!([
        { "tag": "div", "role": "button", "tabindex": 3000000000u64, "text": "Odd", "visible": true },
        { "tag": "button", "tabindex": -1, "text": "Close", "visible": true }
    ]);
    let snap = parse_snapshot(payload).unwrap();
    assert_eq!(snap.title, "Example Store");
    assert_eq!(snap.interactive.len(), 2);
    assert_eq!(snap.interactive[0].tabindex, Some(3_000_000_000));
    assert_eq!(snap.interactive[1].tabindex, Some(-1));
}

#[test]
fn test_malformed_element_dropped_not_page() {
    let mut payload = page_payload();
    payload["images"] = json!([
        { "src": "/ok.jpg", "visible": true },
        { "src": ["not", "a", "string"], "visible": true },
        { "src": "/also-ok.jpg", "alt": "Shoe", "visible": true }
    ]);
    payload["links"] = serde_json::Value::Null;
    let snap = parse_snapshot(payload).unwrap();
    assert_eq!(snap.images.len(), 2);
    assert_eq!(snap.images[1].src, "/also-ok.jpg");
    assert_eq!(snap.images[1].index, 1);
    assert!(snap.links.is_empty());
    assert_eq!(snap.headings.len(), 2);
}
