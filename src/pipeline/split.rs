// src/pipeline/split.rs

//! Release dump splitter.
//!
//! Streams a gzipped XML data dump and emits one `"<id> <hash>"` line per
//! release element. The hash is a SHA-256 digest over the re-serialized
//! element subtree, which is stable across runs of this tool; the seeder
//! diffs these lines against a prior run to find new/changed releases.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

/// Split a gzipped dump file, writing result lines to `output` (stdout when
/// absent). Returns the number of releases hashed.
pub fn run_split(datadump: &Path, output: Option<&Path>) -> Result<u64> {
    let dump = BufReader::new(GzDecoder::new(File::open(datadump)?));

    match output {
        Some(path) => scan_dump(dump, &mut BufWriter::new(File::create(path)?)),
        None => scan_dump(dump, &mut std::io::stdout().lock()),
    }
}

/// Scan an XML stream for `<release>` elements and write one result line
/// per element.
pub fn scan_dump<R: BufRead>(reader: R, out: &mut impl Write) -> Result<u64> {
    let mut reader = Reader::from_reader(reader);
    let mut buf = Vec::new();

    // Subtree currently being captured, if any.
    let mut capture: Option<Capture> = None;
    let mut count = 0u64;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            event => {
                if let Some(current) = capture.as_mut() {
                    match &event {
                        Event::Start(_) => current.depth += 1,
                        Event::End(_) => current.depth -= 1,
                        _ => {}
                    }
                    current.writer.write_event(event.clone())?;

                    if current.depth == 0 {
                        if let Some(finished) = capture.take() {
                            write_result_line(out, finished.id, &finished.writer.into_inner())?;
                            count += 1;
                        }
                    }
                } else {
                    match &event {
                        Event::Start(e) if e.local_name().as_ref() == b"release" => {
                            let id = release_id(e)?;
                            let mut writer = Writer::new(Vec::new());
                            writer.write_event(event.clone())?;
                            capture = Some(Capture {
                                id,
                                writer,
                                depth: 1,
                            });
                        }
                        Event::Empty(e) if e.local_name().as_ref() == b"release" => {
                            let id = release_id(e)?;
                            let mut writer = Writer::new(Vec::new());
                            writer.write_event(event.clone())?;
                            write_result_line(out, id, &writer.into_inner())?;
                            count += 1;
                        }
                        _ => {}
                    }
                }
            }
        }
        buf.clear();
    }

    out.flush()?;
    Ok(count)
}

struct Capture {
    id: u64,
    writer: Writer<Vec<u8>>,
    depth: usize,
}

fn release_id(element: &BytesStart) -> Result<u64> {
    let attr = element
        .try_get_attribute("id")
        .map_err(|e| AppError::dump(format!("bad release attributes: {e}")))?
        .ok_or_else(|| AppError::dump("release element without an id attribute"))?;

    String::from_utf8_lossy(&attr.value)
        .trim()
        .parse()
        .map_err(|_| {
            AppError::dump(format!(
                "release id {:?} is not numeric",
                String::from_utf8_lossy(&attr.value)
            ))
        })
}

fn write_result_line(out: &mut impl Write, id: u64, subtree: &[u8]) -> Result<()> {
    let hash = hex::encode(Sha256::digest(subtree));
    writeln!(out, "{id} {hash}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DUMP: &str = r#"<releases>
        <release id="1" status="Accepted"><title>First</title></release>
        <release id="2" status="Accepted"><title>Second</title><artists><artist><name>A</name></artist></artists></release>
    </releases>"#;

    fn scan(xml: &str) -> Vec<(u64, String)> {
        let mut out = Vec::new();
        scan_dump(Cursor::new(xml.as_bytes()), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| {
                let (id, hash) = line.split_once(' ').unwrap();
                (id.parse().unwrap(), hash.to_string())
            })
            .collect()
    }

    #[test]
    fn emits_one_line_per_release() {
        let results = scan(DUMP);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 1);
        assert_eq!(results[1].0, 2);
    }

    #[test]
    fn hashes_are_stable_across_runs() {
        assert_eq!(scan(DUMP), scan(DUMP));
    }

    #[test]
    fn changed_content_changes_the_hash() {
        let changed = DUMP.replace("<title>First</title>", "<title>First (Remaster)</title>");
        let before = scan(DUMP);
        let after = scan(&changed);

        assert_ne!(before[0].1, after[0].1);
        // The untouched release hashes identically.
        assert_eq!(before[1].1, after[1].1);
    }

    #[test]
    fn handles_self_closing_releases() {
        let results = scan(r#"<releases><release id="9"/></releases>"#);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 9);
    }

    #[test]
    fn reads_through_gzip() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(DUMP.as_bytes()).unwrap();
        let gz = encoder.finish().unwrap();

        let mut out = Vec::new();
        let count = scan_dump(BufReader::new(GzDecoder::new(&gz[..])), &mut out).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn missing_id_attribute_is_an_error() {
        let mut out = Vec::new();
        let result = scan_dump(
            Cursor::new(b"<releases><release><title>X</title></release></releases>".as_slice()),
            &mut out,
        );
        assert!(matches!(result, Err(AppError::Dump(_))));
    }
}
