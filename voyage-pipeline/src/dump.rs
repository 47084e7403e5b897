//! SAX-style handler for the pages-articles XML dump.
//!
//! [`scan_dump`] pulls events from `quick-xml` and feeds them to a
//! [`DumpHandler`], which assembles one [`PageJob`] per `<page>` whose
//! page-level `<id>` appears in the mapping table. The callbacks never
//! block: qualifying pages are handed to the caller, which decides how to
//! schedule them.

use std::collections::HashMap;
use std::io::BufRead;
use std::mem;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// One scheduled unit of work: the raw wikitext of a mapped page together
/// with its Wikidata uid and dump title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageJob {
    pub uid: String,
    pub title: String,
    pub text: String,
}

/// State machine over start/end/characters events.
///
/// Only the page-level `<id>` is captured (`!in_revision` excludes the
/// revision id), the first one wins, `<title>` characters are concatenated
/// exactly as received, and `<text>` content is accumulated verbatim.
pub struct DumpHandler<'m> {
    mappings: &'m HashMap<String, String>,
    current_tag: Vec<u8>,
    in_page: bool,
    in_revision: bool,
    in_text: bool,
    page_id: Option<String>,
    title: String,
    text: String,
}

impl<'m> DumpHandler<'m> {
    pub fn new(mappings: &'m HashMap<String, String>) -> DumpHandler<'m> {
        DumpHandler {
            mappings,
            current_tag: Vec::new(),
            in_page: false,
            in_revision: false,
            in_text: false,
            page_id: None,
            title: String::new(),
            text: String::new(),
        }
    }

    fn reset_page(&mut self) {
        self.page_id = None;
        self.title.clear();
        self.text.clear();
    }

    pub fn start_element(&mut self, name: &[u8]) {
        self.current_tag.clear();
        self.current_tag.extend_from_slice(name);
        match name {
            b"page" => {
                self.in_page = true;
                self.reset_page();
            }
            b"revision" => self.in_revision = true,
            b"text" if self.in_revision => self.in_text = true,
            _ => {}
        }
    }

    pub fn characters(&mut self, content: &str) {
        if self.current_tag.as_slice() == b"id"
            && self.in_page
            && !self.in_revision
            && self.page_id.is_none()
        {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                self.page_id = Some(trimmed.to_string());
            }
        } else if self.current_tag.as_slice() == b"title" && self.in_page {
            self.title.push_str(content);
        } else if self.in_text {
            self.text.push_str(content);
        }
    }

    pub fn end_element(&mut self, name: &[u8]) -> Option<PageJob> {
        let mut job = None;
        match name {
            b"page" => {
                if let Some(page_id) = self.page_id.take() {
                    if let Some(uid) = self.mappings.get(&page_id) {
                        debug!(page_id = %page_id, uid = %uid, "scheduling page");
                        job = Some(PageJob {
                            uid: uid.clone(),
                            title: mem::take(&mut self.title),
                            text: mem::take(&mut self.text),
                        });
                    } else {
                        debug!(page_id = %page_id, "page has no wikidata id, skipping");
                    }
                }
                self.in_page = false;
                self.in_revision = false;
                self.in_text = false;
                self.reset_page();
            }
            b"revision" => self.in_revision = false,
            b"text" => self.in_text = false,
            _ => {}
        }
        self.current_tag.clear();
        job
    }
}

/// Drives the XML reader over a decompressed dump stream, forwarding each
/// qualifying page to `on_page`. Returns early when `on_page` reports the
/// consumer is gone; malformed XML is fatal.
pub fn scan_dump<R: BufRead>(
    reader: R,
    mappings: &HashMap<String, String>,
    mut on_page: impl FnMut(PageJob) -> bool,
) -> Result<()> {
    let mut xml = Reader::from_reader(reader);
    let mut handler = DumpHandler::new(mappings);
    let mut buf = Vec::with_capacity(8 * 1024);

    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => handler.start_element(e.name().as_ref()),
            Ok(Event::Empty(ref e)) => {
                // an empty element is a start immediately followed by an end
                let name = e.name();
                handler.start_element(name.as_ref());
                if let Some(job) = handler.end_element(name.as_ref()) {
                    if !on_page(job) {
                        return Ok(());
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                let content = e
                    .unescape()
                    .map_err(|err| PipelineError::Xml(err.to_string()))?;
                handler.characters(&content);
            }
            Ok(Event::CData(ref e)) => {
                handler.characters(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) => {
                if let Some(job) = handler.end_element(e.name().as_ref()) {
                    if !on_page(job) {
                        return Ok(());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::Xml(format!(
                    "at byte {}: {e}",
                    xml.buffer_position()
                )))
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mappings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn collect_jobs(xml: &str, mappings: &HashMap<String, String>) -> Vec<PageJob> {
        let mut jobs = Vec::new();
        scan_dump(Cursor::new(xml), mappings, |job| {
            jobs.push(job);
            true
        })
        .unwrap();
        jobs
    }

    const TWO_PAGES: &str = "<mediawiki>\
        <page>\
          <title>Boston</title>\
          <ns>0</ns>\
          <id>101</id>\
          <revision><id>9001</id><text>== See ==\nThe Common.</text></revision>\
        </page>\
        <page>\
          <title>Draft</title>\
          <ns>0</ns>\
          <id>102</id>\
          <revision><id>9002</id><text>unused</text></revision>\
        </page>\
        </mediawiki>";

    #[test]
    fn only_mapped_pages_are_scheduled() {
        let map = mappings(&[("101", "Q10")]);
        let jobs = collect_jobs(TWO_PAGES, &map);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].uid, "Q10");
        assert_eq!(jobs[0].title, "Boston");
        assert_eq!(jobs[0].text, "== See ==\nThe Common.");
    }

    #[test]
    fn revision_id_never_overrides_page_id() {
        // revision ids (9001) are not in the table; page ids are
        let map = mappings(&[("9001", "Q99"), ("101", "Q10")]);
        let jobs = collect_jobs(TWO_PAGES, &map);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].uid, "Q10");
    }

    #[test]
    fn text_whitespace_is_preserved_verbatim() {
        let xml = "<page><title>T</title><id>1</id>\
            <revision><text>  line one\n\nline two  </text></revision></page>";
        let map = mappings(&[("1", "Q1")]);
        let jobs = collect_jobs(xml, &map);
        assert_eq!(jobs[0].text, "  line one\n\nline two  ");
    }

    #[test]
    fn title_entities_are_unescaped() {
        let xml = "<page><title>Trinidad &amp; Tobago</title><id>1</id>\
            <revision><text>x</text></revision></page>";
        let map = mappings(&[("1", "Q1")]);
        let jobs = collect_jobs(xml, &map);
        assert_eq!(jobs[0].title, "Trinidad & Tobago");
    }

    #[test]
    fn split_title_characters_concatenate() {
        let map = mappings(&[("1", "Q1")]);
        let mut handler = DumpHandler::new(&map);
        handler.start_element(b"page");
        handler.start_element(b"title");
        handler.characters("Bos");
        handler.characters("ton");
        handler.end_element(b"title");
        handler.start_element(b"id");
        handler.characters(" 1 ");
        handler.end_element(b"id");
        let job = handler.end_element(b"page").unwrap();
        assert_eq!(job.title, "Boston");
        assert_eq!(job.uid, "Q1");
    }

    #[test]
    fn empty_text_element_still_yields_a_job() {
        let xml = "<page><title>T</title><id>1</id>\
            <revision><text/></revision></page>";
        let map = mappings(&[("1", "Q1")]);
        let jobs = collect_jobs(xml, &map);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].text, "");
    }

    #[test]
    fn consumer_hangup_stops_the_scan() {
        let map = mappings(&[("101", "Q10"), ("102", "Q11")]);
        let mut seen = 0;
        scan_dump(Cursor::new(TWO_PAGES), &map, |_| {
            seen += 1;
            false
        })
        .unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn malformed_xml_is_fatal() {
        let map = HashMap::new();
        let err = scan_dump(Cursor::new("<page><title>x</page>"), &map, |_| true);
        assert!(matches!(err, Err(PipelineError::Xml(_))));
    }
}
