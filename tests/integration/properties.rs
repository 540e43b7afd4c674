//! Property tests over generated paths and markup.

use chapter_patcher::{Dom, NodeId, Partition, Step};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Fragment {
    Text(String),
    Comment(String),
    Empty(String),
    Element(String, Vec<Fragment>),
}

impl Fragment {
    fn render(&self, out: &mut String) {
        match self {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Fragment::Empty(name) => {
                out.push('<');
                out.push_str(name);
                out.push_str("/>");
            }
            Fragment::Element(name, children) => {
                out.push('<');
                out.push_str(name);
                out.push('>');
                for child in children {
                    child.render(out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

fn fragment() -> impl Strategy<Value = Fragment> {
    let name = prop::sample::select(vec!["p", "b", "i", "span", "div"]).prop_map(String::from);
    let leaf = prop_oneof![
        "[a-z ]{1,8}".prop_map(Fragment::Text),
        "[a-z ]{0,6}".prop_map(Fragment::Comment),
        name.clone().prop_map(Fragment::Empty),
    ];
    leaf.prop_recursive(4, 32, 5, move |inner| {
        (name.clone(), prop::collection::vec(inner, 0..5))
            .prop_map(|(name, children)| Fragment::Element(name, children))
    })
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 1..4).prop_map(|fragments| {
        let mut out = String::from("<?xml version=\"1.0\"?>\n<html>");
        for fragment in &fragments {
            fragment.render(&mut out);
        }
        out.push_str("</html>\n");
        out
    })
}

fn node_id() -> impl Strategy<Value = NodeId> {
    prop::collection::vec(0usize..4, 1..5).prop_map(NodeId::new)
}

fn partition() -> impl Strategy<Value = Partition> {
    (node_id(), 1usize..3).prop_map(|(offset, size)| Partition::new(offset, size).unwrap())
}

proptest! {
    #[test]
    fn tokens_reproduce_the_document(text in document()) {
        let dom = Dom::load(text.as_str()).unwrap();
        let joined: String = dom.tokens().map(|token| token.content).collect();
        prop_assert_eq!(&joined, &text);
        prop_assert_eq!(&dom.substitute_all(&[]).unwrap(), &text);
    }

    #[test]
    fn every_node_extracts_its_span(text in document()) {
        let dom = Dom::load(text.as_str()).unwrap();
        for visit in dom.traverse().filter(|visit| visit.step == Step::Open) {
            if visit.node_id.is_root() {
                continue;
            }
            let extracted = dom.extract_content(&visit.node_id).unwrap();
            prop_assert_eq!(extracted, &text[visit.node.span.clone()]);
        }
    }

    #[test]
    fn node_id_display_parses_back(id in node_id()) {
        prop_assert_eq!(NodeId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn compare_is_antisymmetric(a in node_id(), b in node_id()) {
        prop_assert_eq!(NodeId::compare(&a, &b), NodeId::compare(&b, &a).reverse());
    }

    #[test]
    fn contains_means_member_or_descendant(p in partition(), id in node_id()) {
        let expected = p.members().any(|member| member.contains(&id));
        prop_assert_eq!(p.contains(&id), expected);
    }

    #[test]
    fn disjoint_partitions_render_in_any_order(text in document(), seed in any::<u64>()) {
        let dom = Dom::load(text.as_str()).unwrap();
        // Replace every child of <html> with its own text; no two overlap.
        let html = NodeId::new(vec![2]);
        let count = dom.node(&html).unwrap().child_count();
        let mut substitutions: Vec<_> = (0..count)
            .map(|n| {
                let id = html.nth_child(n);
                let content = dom.extract_content(&id).unwrap().to_string();
                chapter_patcher::Substitution::new(Partition::single(id).unwrap(), content)
            })
            .collect();
        if !substitutions.is_empty() {
            let k = (seed as usize) % substitutions.len();
            substitutions.rotate_left(k);
        }
        prop_assert_eq!(&dom.substitute_all(&substitutions).unwrap(), &text);
    }
}
