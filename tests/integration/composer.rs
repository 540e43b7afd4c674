//! Extracting and substituting over a complete chapter.

use super::{nid, part, SAMPLE_DOC};
use chapter_patcher::{Composer, ComposerError, Dom, DomError, NodeKind, Partition, Substitution};

const FRENCH: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#,
    r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">"#,
    r#"<head><title>Mon livre</title><meta charset="utf-8"/></head>"#,
    r#"<body><h1>Mon livre</h1><p>Bonjour monde!</p><p>C'est mon livre.</p></body>"#,
    r#"</html>"#
);

/// Registers the head, the first two body children and the last paragraph.
fn register_french(composer: &mut Composer) -> [String; 3] {
    [
        composer.add(
            part("2/0-0"),
            r#"<head><title>Mon livre</title><meta charset="utf-8"/></head>"#,
        ),
        composer.add(part("2/1/0-1"), "<h1>Mon livre</h1><p>Bonjour monde!</p>"),
        composer.add(part("2/1/2-2"), "<p>C'est mon livre.</p>"),
    ]
}

#[test]
fn get_original_content() {
    let composer = Composer::load(SAMPLE_DOC).unwrap();
    assert_eq!(
        composer.original_content(nid("2/1/1")).unwrap(),
        "<p>Hello world!</p>"
    );

    let dom = composer.dom();
    assert_eq!(dom.node(&nid("0")).unwrap().kind, NodeKind::Declaration);
    assert_eq!(dom.node(&nid("1")).unwrap().kind, NodeKind::DocType);
    assert_eq!(
        dom.extract_content(nid("2/0/1")).unwrap(),
        r#"<meta charset="utf-8"/>"#
    );
}

#[test]
fn register_translations() {
    let mut composer = Composer::load(SAMPLE_DOC).unwrap();
    let [head, intro, outro] = register_french(&mut composer);
    assert!(!composer.has_overlaps(&[&head, &intro, &outro]).unwrap());

    let sentence = composer.add(part("2/1/1/0-0"), "Bonjour monde!");
    assert!(composer
        .has_overlaps(&[&head, &intro, &outro, &sentence])
        .unwrap());
    assert!(!composer.has_overlaps(&[&head, &intro, &outro]).unwrap());
    assert!(!composer.has_overlaps(&[&head, &outro, &sentence]).unwrap());

    assert_eq!(composer.find_ids(&nid("2/1/1/0")), [intro.as_str(), sentence.as_str()]);
    assert_eq!(composer.iter().count(), 4);

    assert_eq!(composer.render::<&str>(&[]).unwrap(), SAMPLE_DOC);
    assert_eq!(composer.render(&[&head, &intro, &outro]).unwrap(), FRENCH);
}

#[test]
fn render_rejects_nested_translation() {
    let mut composer = Composer::load(SAMPLE_DOC).unwrap();
    let [head, intro, outro] = register_french(&mut composer);
    let sentence = composer.add(part("2/1/1/0-0"), "Bonjour monde!");

    let err = composer
        .render(&[&head, &intro, &outro, &sentence])
        .unwrap_err();
    assert_eq!(
        err,
        ComposerError::Dom(DomError::OverlappingPartitions {
            first: "2/1/0-1".to_string(),
            second: "2/1/1/0-0".to_string(),
        })
    );

    // Dropping the paragraph-level edit leaves a renderable set.
    composer.remove(&intro);
    let out = composer.render(&[&head, &outro, &sentence]).unwrap();
    assert!(out.contains("<h1>My Book</h1><p>Bonjour monde!</p>"));
}

#[test]
fn flat_substitution_list_matches_registry() {
    let dom = Dom::load(SAMPLE_DOC).unwrap();
    let partitions = [part("2/0-0"), part("2/1/0-1"), part("2/1/2-2")];
    assert!(Partition::check_disjoint(&partitions));

    let mut composer = Composer::load(SAMPLE_DOC).unwrap();
    let ids = register_french(&mut composer);
    let substitutions: Vec<Substitution> = ids
        .iter()
        .map(|id| composer.get(id).unwrap().clone())
        .collect();
    assert_eq!(dom.substitute_all(&substitutions).unwrap(), FRENCH);
}

#[test]
fn source_formatting_survives() {
    let chapter = concat!(
        "\u{feff}<?xml version='1.0' encoding='utf-8'?>\n",
        "<html>\n  <body>\n",
        "    <!-- chapter 3 -->\n",
        "    <p class='lead'>Caf&#233; &amp; <i>cr&egrave;me</i></p>\n",
        "    <p>Second</p>\n",
        "  </body>\n</html>\n"
    );
    let dom = Dom::load(chapter).unwrap();
    // html = 2, body = 2/1, first p = 2/1/3, second p = 2/1/5
    assert_eq!(dom.extract_content(nid("2/1/5")).unwrap(), "<p>Second</p>");

    let out = dom
        .substitute_all(&[Substitution::new(part("2/1/5-5"), "<p>Deuxième</p>")])
        .unwrap();
    assert_eq!(out, chapter.replace("<p>Second</p>", "<p>Deuxième</p>"));
}
