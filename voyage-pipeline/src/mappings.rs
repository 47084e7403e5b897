//! Builds the page-id → Wikidata-id table from the page-props SQL dump.

use std::collections::HashMap;
use std::io::{BufReader, Read};
use std::sync::LazyLock;

use flate2::read::MultiGzDecoder;
use regex::Regex;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task;
use tracing::debug;

use crate::error::Result;
use crate::stream::{pump_body, ChannelReader};

/// SQL tuple grammar: `(page,'prop','value',NULL_or_number)`.
static TUPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d+),'([^']+)','([^']+)',(NULL|[\d.]+)\)").unwrap()
});

/// Rolling-buffer tail kept between chunks. Tuples are far below 1 KB, so
/// this suffix always completes a tuple split across a chunk boundary.
const BUFFER_TAIL: usize = 1000;

/// Downloads and gunzips the `page_props` SQL dump, returning the full
/// page-id → `wikibase_item` table. Any transport or decode failure is
/// fatal; a partial table is never returned.
pub async fn fetch_mappings(client: &Client, url: &str) -> Result<HashMap<String, String>> {
    let response = client.get(url).send().await?.error_for_status()?;

    let (tx, rx) = mpsc::channel(8);
    let scanner = task::spawn_blocking(move || {
        let reader = BufReader::new(MultiGzDecoder::new(ChannelReader::new(rx)));
        scan_page_props(reader)
    });

    let pump_result = pump_body(response, tx).await;
    let scan_result = scanner.await?;
    pump_result?;
    scan_result
}

/// Scans decompressed SQL text for `wikibase_item` tuples using a rolling
/// buffer, so tuples split across read boundaries are completed on the
/// next iteration. Re-matching a tuple inside the kept tail is harmless:
/// same key, same value.
pub fn scan_page_props<R: Read>(mut reader: R) -> Result<HashMap<String, String>> {
    let mut mappings = HashMap::new();
    let mut buffer = String::new();
    let mut chunk = vec![0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));

        for caps in TUPLE_RE.captures_iter(&buffer) {
            if &caps[2] == "wikibase_item" {
                mappings.insert(caps[1].to_string(), caps[3].to_string());
            }
        }

        if let Some((tail_start, _)) = buffer.char_indices().rev().nth(BUFFER_TAIL - 1) {
            if tail_start > 0 {
                buffer.drain(..tail_start);
            }
        }
    }

    debug!(count = mappings.len(), "scanned page_props dump");
    Ok(mappings)
}
