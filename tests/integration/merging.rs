//! Merging nested and disjoint substitutions.

use super::{part, SAMPLE_DOC};
use chapter_patcher::{Dom, DomError, Substitution};

#[test]
fn sentence_inside_translated_paragraph() {
    let dom = Dom::load(SAMPLE_DOC).unwrap();
    let paragraph = Substitution::new(part("2/1/1-1"), "<p>Bonjour monde!</p>");
    let sentence = Substitution::new(part("2/1/1/0-0"), "Salut le monde!");

    let merged = dom
        .merge_substitutions(&[sentence.clone(), paragraph.clone()])
        .unwrap();
    assert_eq!(merged.partition, part("2/1/1-1"));
    assert_eq!(merged.content, "<p>Salut le monde!</p>");

    // Rejected as a flat set, accepted once merged.
    assert!(dom
        .substitute_all(&[paragraph.clone(), sentence.clone()])
        .is_err());
    let rendered = dom.substitute_all_merged(&[paragraph, sentence]).unwrap();
    assert_eq!(
        rendered,
        SAMPLE_DOC.replace("<p>Hello world!</p>", "<p>Salut le monde!</p>")
    );
}

#[test]
fn disjoint_merge_renders_like_the_flat_set() {
    let dom = Dom::load(SAMPLE_DOC).unwrap();
    let substitutions = [
        Substitution::new(part("2/0/0/0-0"), "Mon livre"),
        Substitution::new(part("2/1/2-2"), "<p>C'est mon livre.</p>"),
    ];

    let merged = dom.merge_substitutions(&substitutions).unwrap();
    assert_eq!(merged.partition, part("2/0-1"));
    assert_eq!(
        dom.substitute_all(&[merged]).unwrap(),
        dom.substitute_all(&substitutions).unwrap()
    );
}

#[test]
fn partial_overlap_is_not_nesting() {
    let dom = Dom::load(SAMPLE_DOC).unwrap();
    let err = dom
        .merge_substitutions(&[
            Substitution::new(part("2/1/0-1"), "a"),
            Substitution::new(part("2/1/1-1"), "b"),
        ])
        .unwrap_err();
    assert!(matches!(err, DomError::OverlappingPartitions { .. }));
}
