//! Tree construction from quick-xml events.
//!
//! quick-xml reports positions, not spans, so the builder keeps its own
//! cursor: every event starts where the previous one ended. Markup events end
//! at the reader's buffer position; text events end `len` raw bytes later
//! (no trimming, no unescaping).

use crate::dom::errors::DomError;
use crate::dom::{Node, NodeIndex, NodeKind, ROOT};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::ops::Range;

/// Bytes of input consumed between cooperative yields in [`parse_async`].
pub const CHUNK_SIZE: usize = 1024;

const UTF8_BOM: &str = "\u{feff}";

pub(crate) fn parse(text: &str) -> Result<Vec<Node>, DomError> {
    let mut builder = TreeBuilder::new(text);
    while builder.step()? {}
    Ok(builder.finish())
}

pub(crate) async fn parse_async(text: &str) -> Result<Vec<Node>, DomError> {
    let mut builder = TreeBuilder::new(text);
    let mut next_yield = CHUNK_SIZE;
    while builder.step()? {
        if builder.cursor >= next_yield {
            tokio::task::yield_now().await;
            next_yield = builder.cursor + CHUNK_SIZE;
        }
    }
    Ok(builder.finish())
}

struct TreeBuilder<'a> {
    reader: Reader<&'a [u8]>,
    /// Offset of the reader's input within the full text (a skipped BOM).
    base: usize,
    len: usize,
    cursor: usize,
    nodes: Vec<Node>,
    /// Open elements, innermost last, with their raw names.
    open: Vec<(NodeIndex, Vec<u8>)>,
}

impl<'a> TreeBuilder<'a> {
    fn new(text: &'a str) -> Self {
        let (base, body) = match text.strip_prefix(UTF8_BOM) {
            Some(body) => (UTF8_BOM.len(), body),
            None => (0, text),
        };

        let mut reader = Reader::from_str(body);
        reader.trim_text(false);
        reader.check_end_names(false);
        reader.expand_empty_elements(false);

        Self {
            reader,
            base,
            len: text.len(),
            cursor: base,
            nodes: vec![Node::new(NodeKind::Document, 0..text.len())],
            open: Vec::new(),
        }
    }

    /// Consume one event. Returns `false` at end of input.
    fn step(&mut self) -> Result<bool, DomError> {
        let event = self.reader.read_event().map_err(|err| DomError::Parse {
            position: self.base + self.reader.buffer_position(),
            message: err.to_string(),
        })?;
        let end = self.base + self.reader.buffer_position();
        let start = self.cursor;

        match event {
            Event::Eof => return Ok(false),
            Event::Text(text) => {
                let span = start..start + text.len();
                self.cursor = span.end;
                self.push_leaf(NodeKind::Text, span);
                return Ok(true);
            }
            Event::Start(tag) => {
                let raw = tag.name().as_ref().to_vec();
                let index = self.push_leaf(element(&raw), start..end);
                self.open.push((index, raw));
            }
            Event::End(tag) => self.close(tag.name().as_ref(), start..end),
            Event::Empty(tag) => {
                self.push_leaf(element(tag.name().as_ref()), start..end);
            }
            Event::Comment(_) => {
                self.push_leaf(NodeKind::Comment, start..end);
            }
            Event::CData(_) => {
                self.push_leaf(NodeKind::CData, start..end);
            }
            Event::Decl(_) => {
                self.push_leaf(NodeKind::Declaration, start..end);
            }
            Event::PI(_) => {
                self.push_leaf(NodeKind::ProcessingInstruction, start..end);
            }
            Event::DocType(_) => {
                self.push_leaf(NodeKind::DocType, start..end);
            }
        }
        self.cursor = end;
        Ok(true)
    }

    fn parent(&self) -> NodeIndex {
        self.open.last().map(|(index, _)| *index).unwrap_or(ROOT)
    }

    fn push_leaf(&mut self, kind: NodeKind, span: Range<usize>) -> NodeIndex {
        let index = self.nodes.len();
        let parent = self.parent();
        self.nodes.push(Node::new(kind, span));
        self.nodes[parent].children.push(index);
        index
    }

    /// Close the innermost open element named `name`. Elements opened inside
    /// it and still open end where this end tag starts.
    fn close(&mut self, name: &[u8], span: Range<usize>) {
        let Some(depth) = self.open.iter().rposition(|(_, open)| open == name) else {
            log::warn!(
                "stray end tag </{}> at byte {}",
                String::from_utf8_lossy(name),
                span.start
            );
            self.push_leaf(
                NodeKind::StrayEndTag {
                    name: String::from_utf8_lossy(name).into_owned(),
                },
                span,
            );
            return;
        };

        for (index, raw) in self.open.drain(depth + 1..).rev() {
            log::debug!(
                "implicitly closing <{}> at byte {}",
                String::from_utf8_lossy(&raw),
                span.start
            );
            self.nodes[index].span.end = span.start;
        }
        if let Some((index, _)) = self.open.pop() {
            self.nodes[index].span.end = span.end;
        }
    }

    fn finish(mut self) -> Vec<Node> {
        // Anything the reader left unreported still belongs to the text.
        if self.cursor < self.len {
            log::warn!(
                "{} trailing bytes not reported by the reader, keeping them as text",
                self.len - self.cursor
            );
            self.push_leaf(NodeKind::Text, self.cursor..self.len);
        }
        for (index, raw) in self.open.drain(..) {
            log::debug!("unclosed <{}> runs to end of input", String::from_utf8_lossy(&raw));
            self.nodes[index].span.end = self.len;
        }
        log::debug!("parsed {} nodes from {} bytes", self.nodes.len(), self.len);
        self.nodes
    }
}

fn element(raw: &[u8]) -> NodeKind {
    NodeKind::Element {
        name: String::from_utf8_lossy(raw).into_owned(),
    }
}
