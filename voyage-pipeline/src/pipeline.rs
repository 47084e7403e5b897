//! Pipeline driver: wires mappings, dump scanning, parsing and sinks.

use std::collections::HashMap;
use std::io::BufReader;
use std::sync::Arc;

use bzip2::read::MultiBzDecoder;
use futures::future;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{error, info};
use voyage_sinks::{build_sink, Sink};

use crate::config::Config;
use crate::dump::{scan_dump, PageJob};
use crate::error::{PipelineError, Result};
use crate::mappings::fetch_mappings;
use crate::stream::{pump_body, ChannelReader};

/// Wikimedia dump endpoints for English Wikivoyage.
pub const PAGE_PROPS_URL: &str =
    "https://dumps.wikimedia.org/enwikivoyage/latest/enwikivoyage-latest-page_props.sql.gz";
pub const ARTICLES_URL: &str =
    "https://dumps.wikimedia.org/enwikivoyage/latest/enwikivoyage-latest-pages-articles.xml.bz2";

/// Runs one full extraction: build sinks, fetch the mapping table, stream
/// the XML dump, then close every sink. Sinks are closed even when the run
/// fails, so their totals are always logged; close errors never mask the
/// run's own error.
pub async fn run(config: Config) -> Result<()> {
    let mut sinks = Vec::new();
    for name in &config.handlers {
        let params = config.sink_params(name);
        let sink = build_sink(name, &params).await?;
        info!(sink = sink.kind(), "sink ready");
        sinks.push(sink);
    }
    let sinks = Arc::new(sinks);

    let client = Client::builder().build()?;

    info!("fetching page mappings from the SQL dump");
    let mappings = fetch_mappings(&client, PAGE_PROPS_URL).await?;
    info!(count = mappings.len(), "wikibase mappings resolved");

    info!("processing the XML dump");
    let result = process_dump(&client, ARTICLES_URL, Arc::new(mappings), Arc::clone(&sinks)).await;

    for sink in sinks.iter() {
        if let Err(e) = sink.close().await {
            error!(sink = sink.kind(), error = %e, "error closing sink");
        }
    }
    result
}

/// Streams the bzip2 XML dump and fans pages out to the sinks.
///
/// Three legs run concurrently: the async download pump, the blocking
/// decompress-and-scan task, and the driver loop spawning one worker per
/// qualifying page. All workers are awaited before returning, so every
/// scheduled write completes before the caller closes the sinks.
async fn process_dump(
    client: &Client,
    url: &str,
    mappings: Arc<HashMap<String, String>>,
    sinks: Arc<Vec<Sink>>,
) -> Result<()> {
    let response = client.get(url).send().await?.error_for_status()?;

    let (byte_tx, byte_rx) = mpsc::channel(8);
    let (job_tx, mut job_rx) = mpsc::channel::<PageJob>(64);

    let scanner = task::spawn_blocking(move || {
        let reader = BufReader::with_capacity(
            256 * 1024,
            MultiBzDecoder::new(ChannelReader::new(byte_rx)),
        );
        scan_dump(reader, &mappings, |job| job_tx.blocking_send(job).is_ok())
    });
    let pump = tokio::spawn(pump_body(response, byte_tx));

    let mut workers = JoinSet::new();
    let mut first_error = None;
    while let Some(job) = job_rx.recv().await {
        let sinks = Arc::clone(&sinks);
        workers.spawn(async move { process_page(job, &sinks).await });
        while let Some(done) = workers.try_join_next() {
            record(done, &mut first_error);
        }
        if first_error.is_some() {
            break;
        }
    }
    // dropping the receiver tells the scanner to stop on an aborted run
    drop(job_rx);

    let pump_result = pump.await?;
    let scan_result = scanner.await?;
    while let Some(done) = workers.join_next().await {
        record(done, &mut first_error);
    }

    pump_result?;
    scan_result?;
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn record(
    result: std::result::Result<Result<()>, JoinError>,
    first_error: &mut Option<PipelineError>,
) {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(join) => Err(PipelineError::Join(join)),
    };
    if let Err(e) = outcome {
        error!(error = %e, "page task failed");
        if first_error.is_none() {
            *first_error = Some(e);
        }
    }
}

/// Per-page unit of work: parse the wikitext, stamp the dump title into
/// the root properties, then write the entry to every sink concurrently.
/// Completes only once every sink has acknowledged the write.
pub async fn process_page(job: PageJob, sinks: &[Sink]) -> Result<()> {
    let mut entry = voyage::parse(&job.text);
    entry.set_title(job.title.as_str());
    future::try_join_all(
        sinks
            .iter()
            .map(|sink| sink.write_entry(&entry, &job.uid)),
    )
    .await?;
    Ok(())
}
