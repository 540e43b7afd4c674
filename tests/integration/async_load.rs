use super::SAMPLE_DOC;
use chapter_patcher::dom::parser::CHUNK_SIZE;
use chapter_patcher::{Dom, Token};

fn long_chapter() -> String {
    let mut text = String::from("<html><body>");
    let mut n = 0;
    while text.len() < CHUNK_SIZE * 8 {
        text.push_str(&format!("<p id=\"p{n}\">Paragraph {n} &amp; more</p>\n"));
        n += 1;
    }
    text.push_str("</body></html>");
    text
}

#[tokio::test]
async fn async_load_matches_sync_load() {
    for text in [SAMPLE_DOC.to_string(), long_chapter()] {
        let sync = Dom::load(text.as_str()).unwrap();
        let parsed = Dom::load_async(text.as_str()).await.unwrap();

        assert_eq!(parsed.node_count(), sync.node_count());
        let a: Vec<Token<'_>> = parsed.tokens().collect();
        let b: Vec<Token<'_>> = sync.tokens().collect();
        assert_eq!(a, b);
        assert_eq!(parsed.substitute_all(&[]).unwrap(), text);
    }
}

#[tokio::test]
async fn async_load_reports_parse_errors() {
    let mut text = long_chapter();
    text.push_str("<p unterminated");
    assert!(Dom::load_async(text).await.is_err());
}
