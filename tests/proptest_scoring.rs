//! Property-based tests for scoring and snapshot invariants
//!
//! Run with: cargo test --test proptest_scoring

use a11yscan::extraction::{Form, FormInput, Heading, Image, Link, PageSnapshot};
use a11yscan::scoring::{Grade, HeuristicScorer};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_image() -> impl Strategy<Value = Image> {
    (any::<bool>(), "[a-z ]{0,12}", any::<bool>(), any::<bool>()).prop_map(|(has_alt, alt, visible, decorative)| {
        Image {
            has_alt,
            alt,
            visible,
            is_decorative: decorative,
            ..Image::default()
        }
    })
}

fn arb_link() -> impl Strategy<Value = Link> {
    ("[a-z]{0,6}", "[a-z]{0,6}", "[a-z]{0,6}", any::<bool>(), any::<bool>()).prop_map(
        |(text, aria_label, title, has_image_with_alt, visible)| Link {
            text,
            aria_label,
            title,
            has_image_with_alt,
            visible,
            ..Link::default()
        },
    )
}

fn arb_input() -> impl Strategy<Value = FormInput> {
    (any::<bool>(), "[a-z]{0,4}", "[a-z]{0,4}", any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(has_label, placeholder, aria_label, visible, is_hidden, is_button)| FormInput {
            has_label,
            placeholder,
            aria_label,
            visible,
            is_hidden,
            is_button,
            ..FormInput::default()
        },
    )
}

prop_compose! {
    fn arb_snapshot()(
        images in prop::collection::vec(arb_image(), 0..30),
        links in prop::collection::vec(arb_link(), 0..30),
        inputs in prop::collection::vec(arb_input(), 0..10),
        headings in 0usize..5,
        has_main in any::<bool>(),
        has_nav in any::<bool>(),
        landmarks in 0u32..8,
        react in any::<bool>(),
        lang in "(en)?",
    ) -> PageSnapshot {
        let mut snap = PageSnapshot::default();
        snap.images = images;
        snap.links = links;
        snap.forms = vec![Form { inputs, ..Form::default() }];
        snap.headings = (0..headings).map(|_| Heading { level: 2, ..Heading::default() }).collect();
        snap.structure.has_main = has_main;
        snap.structure.has_nav = has_nav;
        snap.structure.landmark_count = landmarks;
        snap.performance.frameworks.insert("react".to_string(), react);
        snap.language = lang;
        snap.normalize();
        snap
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_score_bounded(snap in arb_snapshot()) {
        let result = HeuristicScorer::score(&snap);
        prop_assert!((30..=100).contains(&result.score));
        for c in [
            result.categories.perceivable,
            result.categories.operable,
            result.categories.understandable,
            result.categories.robust,
        ] {
            prop_assert!(c <= 100);
        }
    }

    #[test]
    fn prop_score_deterministic(snap in arb_snapshot()) {
        prop_assert_eq!(HeuristicScorer::score(&snap), HeuristicScorer::score(&snap));
    }

    #[test]
    fn prop_grade_follows_score(snap in arb_snapshot()) {
        let result = HeuristicScorer::score(&snap);
        prop_assert_eq!(result.grade, Grade::from_score(result.score));
    }

    #[test]
    fn prop_extra_missing_alt_never_raises_score(snap in arb_snapshot()) {
        let before = HeuristicScorer::score(&snap).score;
        let mut worse = snap.clone();
        worse.images.push(Image { visible: true, ..Image::default() });
        worse.normalize();
        let after = HeuristicScorer::score(&worse).score;
        prop_assert_eq!(after, before.saturating_sub(8).max(30));
    }

    #[test]
    fn prop_needs_alt_invariant(snap in arb_snapshot()) {
        for img in &snap.images {
            prop_assert_eq!(img.needs_alt, !img.has_alt && !img.is_decorative && img.visible);
            if !img.alt.is_empty() {
                prop_assert!(!img.needs_alt);
            }
        }
    }

    #[test]
    fn prop_link_empty_invariant(snap in arb_snapshot()) {
        for link in &snap.links {
            if !link.aria_label.trim().is_empty() {
                prop_assert!(!link.is_empty);
            }
            prop_assert_eq!(
                link.is_empty,
                !(link.has_text || link.has_aria_label || link.has_title || link.has_image_with_alt)
            );
        }
    }

    #[test]
    fn prop_needs_label_invariant(snap in arb_snapshot()) {
        for input in snap.all_inputs() {
            prop_assert_eq!(
                input.needs_label,
                input.visible && !input.is_hidden && !input.is_button
                    && !input.has_label && !input.has_placeholder && !input.has_aria_label
            );
        }
    }

    #[test]
    fn prop_verification_always_short_circuits(mut snap in arb_snapshot()) {
        snap.is_verification_page = true;
        let result = HeuristicScorer::score(&snap);
        prop_assert_eq!(result.score, 30);
        prop_assert_eq!(result.grade, Grade::D);
        prop_assert_eq!(result.issues.len(), 1);
    }
}
