//! DOM snapshot extraction module
//!
//! Turns a settled page into a structured, accessibility-relevant snapshot:
//! headings, images, links, forms, landmarks, interactive elements and
//! aggregate counts.

pub mod extractor;
pub mod snapshot;

pub use extractor::{parse_snapshot, SnapshotExtractor};
pub use snapshot::{
    Dimensions, Form, FormInput, Heading, Image, InteractiveElement, Link, MetaInfo, PageSnapshot,
    PerformanceInfo, Structure, TextElement, TEXT_SAMPLE_CAP,
};
