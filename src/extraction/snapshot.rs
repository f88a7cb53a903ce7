//! Page snapshot data model
//!
//! A `PageSnapshot` is the point-in-time record of a rendered page's
//! accessibility-relevant DOM. Every field defaults, so a partially readable
//! in-page result still deserializes into the full shape.

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Maximum number of text samples kept in a snapshot
pub const TEXT_SAMPLE_CAP: usize = 50;

/// Decode a list entry by entry, dropping entries that do not fit the schema.
/// `null` reads as an empty list; any other non-array is still an error.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Dropping malformed list entry: {}", e);
                    None
                }
            })
            .collect()),
        other => Err(D::Error::custom(format!("expected a list, found {}", other))),
    }
}

/// Structured snapshot of one rendered page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSnapshot {
    /// Document title
    pub title: String,
    /// Page URL at extraction time
    pub url: String,
    /// `lang` attribute of the root element
    pub language: String,
    /// Scroll, client and viewport sizes
    pub dimensions: Dimensions,
    /// Selected meta tags
    pub meta: MetaInfo,
    /// Landmark presence
    pub structure: Structure,
    /// Headings in document order
    #[serde(deserialize_with = "lenient_list")]
    pub headings: Vec<Heading>,
    /// Images in document order
    #[serde(deserialize_with = "lenient_list")]
    pub images: Vec<Image>,
    /// Anchors in document order
    #[serde(deserialize_with = "lenient_list")]
    pub links: Vec<Link>,
    /// Forms and their controls
    #[serde(deserialize_with = "lenient_list")]
    pub forms: Vec<Form>,
    /// Focusable or clickable elements
    #[serde(deserialize_with = "lenient_list")]
    pub interactive: Vec<InteractiveElement>,
    /// Short visible text samples (context only)
    #[serde(deserialize_with = "lenient_list")]
    pub text_elements: Vec<TextElement>,
    /// Aggregate counts
    pub performance: PerformanceInfo,
    /// The page is a bot-verification interstitial
    pub is_verification_page: bool,
}

/// Document and viewport dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dimensions {
    pub scroll_width: u32,
    pub scroll_height: u32,
    pub client_width: u32,
    pub client_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

/// Meta tags relevant to the report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaInfo {
    pub description: Option<String>,
    pub viewport: Option<String>,
    pub charset: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
}

/// Semantic landmark presence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Structure {
    pub has_main: bool,
    pub has_nav: bool,
    pub has_header: bool,
    pub has_footer: bool,
    pub has_aside: bool,
    pub has_section: bool,
    pub has_article: bool,
    pub landmark_count: u32,
    pub has_skip_links: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
    pub class_name: String,
    pub visible: bool,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Image {
    pub src: String,
    pub alt: String,
    pub title: String,
    /// The element carries an `alt` attribute (possibly empty)
    pub has_alt: bool,
    pub alt_length: usize,
    pub visible: bool,
    pub is_lazy: bool,
    pub is_decorative: bool,
    /// No alt, not decorative, visible. The only defect signal the scorer trusts.
    pub needs_alt: bool,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Link {
    pub href: String,
    pub text: String,
    pub title: String,
    pub aria_label: String,
    pub has_text: bool,
    pub has_aria_label: bool,
    pub has_title: bool,
    pub has_image_with_alt: bool,
    pub visible: bool,
    pub is_external: bool,
    pub is_empty: bool,
    pub is_icon_only: bool,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Form {
    pub action: String,
    pub method: String,
    pub name: String,
    pub id: String,
    pub visible: bool,
    #[serde(deserialize_with = "lenient_list")]
    pub inputs: Vec<FormInput>,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormInput {
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub required: bool,
    pub disabled: bool,
    pub aria_label: String,
    pub has_label: bool,
    pub has_placeholder: bool,
    pub has_aria_label: bool,
    pub label_text: String,
    pub visible: bool,
    pub is_hidden: bool,
    pub is_button: bool,
    pub needs_label: bool,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractiveElement {
    pub tag: String,
    pub role: String,
    /// Clamped to the i32 range by the extraction script
    pub tabindex: Option<i64>,
    pub text: String,
    pub disabled: bool,
    pub visible: bool,
    pub focusable: bool,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextElement {
    pub tag: String,
    pub text: String,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceInfo {
    pub total_elements: u32,
    pub visible_elements: u32,
    pub images: u32,
    pub links: u32,
    pub forms: u32,
    pub inputs: u32,
    pub has_lazy_loading: bool,
    pub page_width: u32,
    pub page_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Detected client frameworks, keyed by name
    pub frameworks: BTreeMap<String, bool>,
}

fn present(s: &str) -> bool {
    !s.trim().is_empty()
}

impl Image {
    /// Re-derive the flags that follow from other fields
    pub fn normalize(&mut self) {
        self.has_alt = self.has_alt || !self.alt.is_empty();
        self.alt_length = self.alt.chars().count();
        if self.has_alt && self.alt.trim().is_empty() {
            // explicit alt="" marks the image decorative
            self.is_decorative = true;
        }
        self.needs_alt = !self.has_alt && !self.is_decorative && self.visible;
    }
}

impl Link {
    /// Re-derive the flags that follow from other fields
    pub fn normalize(&mut self) {
        self.has_text = present(&self.text);
        self.has_aria_label = present(&self.aria_label);
        self.has_title = present(&self.title);
        self.is_empty = !(self.has_text || self.has_aria_label || self.has_title || self.has_image_with_alt);
        if self.has_text {
            self.is_icon_only = false;
        }
    }
}

impl FormInput {
    /// Re-derive the flags that follow from other fields
    pub fn normalize(&mut self) {
        self.has_placeholder = present(&self.placeholder);
        self.has_aria_label = present(&self.aria_label);
        self.has_label = self.has_label || present(&self.label_text);
        self.needs_label = self.visible
            && !self.is_hidden
            && !self.is_button
            && !self.has_label
            && !self.has_placeholder
            && !self.has_aria_label;
    }
}

impl PageSnapshot {
    /// The all-empty snapshot returned when in-page extraction fails as a whole
    pub fn minimal(url: impl Into<String>, is_verification_page: bool) -> Self {
        Self {
            url: url.into(),
            is_verification_page,
            ..Self::default()
        }
    }

    /// Enforce the snapshot invariants: derived flags agree with their
    /// defining fields, indices are positional, and the text sample is capped.
    pub fn normalize(&mut self) {
        for (i, heading) in self.headings.iter_mut().enumerate() {
            heading.index = i;
        }
        for (i, image) in self.images.iter_mut().enumerate() {
            image.index = i;
            image.normalize();
        }
        for (i, link) in self.links.iter_mut().enumerate() {
            link.index = i;
            link.normalize();
        }
        for (i, form) in self.forms.iter_mut().enumerate() {
            form.index = i;
            for (j, input) in form.inputs.iter_mut().enumerate() {
                input.index = j;
                input.normalize();
            }
        }
        for (i, el) in self.interactive.iter_mut().enumerate() {
            el.index = i;
        }
        self.text_elements.truncate(TEXT_SAMPLE_CAP);
        for (i, el) in self.text_elements.iter_mut().enumerate() {
            el.index = i;
        }

        let s = &mut self.structure;
        let landmarks = [s.has_main, s.has_nav, s.has_header, s.has_footer, s.has_aside]
            .iter()
            .filter(|b| **b)
            .count() as u32;
        s.landmark_count = s.landmark_count.max(landmarks);
    }

    /// Visible images with no alt attribute that are not decorative
    pub fn images_without_alt(&self) -> usize {
        self.images.iter().filter(|i| i.needs_alt).count()
    }

    /// Visible links with no accessible name
    pub fn empty_visible_links(&self) -> usize {
        self.links.iter().filter(|l| l.is_empty && l.visible).count()
    }

    /// Form controls with no accessible label
    pub fn inputs_without_labels(&self) -> usize {
        self.all_inputs().filter(|i| i.needs_label).count()
    }

    /// Every form control across all forms
    pub fn all_inputs(&self) -> impl Iterator<Item = &FormInput> {
        self.forms.iter().flat_map(|f| f.inputs.iter())
    }

    /// `main`, `header` or `nav` is present
    pub fn has_semantic_landmark(&self) -> bool {
        self.structure.has_main || self.structure.has_header || self.structure.has_nav
    }

    /// At least one heading exists
    pub fn has_headings(&self) -> bool {
        !self.headings.is_empty()
    }

    /// Any client framework was detected
    pub fn has_framework(&self) -> bool {
        self.performance.frameworks.values().any(|v| *v)
    }

    /// Names of detected frameworks
    pub fn detected_frameworks(&self) -> Vec<&str> {
        self.performance
            .frameworks
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}
