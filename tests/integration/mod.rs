//! Integration tests for the substitution engine, run as one test binary.

mod async_load;
mod composer;
mod merging;
mod properties;

/// An XHTML chapter with prolog and doctype, whitespace between tags removed.
pub const SAMPLE_DOC: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#,
    r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">"#,
    r#"<head><title>My Book</title><meta charset="utf-8"/></head>"#,
    r#"<body><h1>My Book</h1><p>Hello world!</p><p>This is my book.</p></body>"#,
    r#"</html>"#
);

pub fn nid(s: &str) -> chapter_patcher::NodeId {
    chapter_patcher::NodeId::parse(s).unwrap()
}

pub fn part(s: &str) -> chapter_patcher::Partition {
    chapter_patcher::Partition::parse(s).unwrap()
}
