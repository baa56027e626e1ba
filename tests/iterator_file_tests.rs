// Range max-time iterator driven by TsmReader cursors over real files

mod common;

use common::{init_logging, span, write_tombstones, TsmFileWriter};
use std::path::PathBuf;
use tempfile::TempDir;
use tsmscan::tsm::{TombstoneRecord, TsmReader};
use tsmscan::{
    scan_max_time, BlockKeyCursor, Error, RangeMaxTimeIterator, ReaderOptions, TimeRange,
    INVALID_MIN_NANO_TIME,
};

fn open(path: &PathBuf) -> TsmReader {
    TsmReader::open(path, ReaderOptions::default()).unwrap()
}

#[test]
fn test_scenario_a_no_tombstones() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.tsm");
    TsmFileWriter::new().key("cpu", &[&span(10, 20)]).write_to(&path).unwrap();

    let reader = open(&path);
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(15, 16));
    assert!(iter.advance());
    assert!(iter.has_data());
    assert_eq!(iter.max_time(), 20);
}

#[test]
fn test_scenario_b_fully_deleted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("b.tsm");
    TsmFileWriter::new().key("cpu", &[&span(10, 20)]).write_to(&path).unwrap();
    write_tombstones(&path, &[TombstoneRecord::new("cpu", 10, 20)]).unwrap();

    let reader = open(&path);
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(15, 16));
    assert!(iter.advance());
    assert!(!iter.has_data());
    assert_eq!(iter.max_time(), INVALID_MIN_NANO_TIME);
}

#[test]
fn test_scenario_c_newest_survivor_outside_range() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c.tsm");
    TsmFileWriter::new().key("cpu", &[&span(0, 10), &span(20, 30)]).write_to(&path).unwrap();
    write_tombstones(&path, &[TombstoneRecord::new("cpu", 0, 10)]).unwrap();

    let reader = open(&path);
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(5, 6));
    assert!(iter.advance());
    assert!(!iter.has_data());
    assert_eq!(iter.max_time(), 30);
}

#[test]
fn test_scenario_d_cursor_failed_before_access() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("d.tsm");
    TsmFileWriter::new()
        .raw_key("bad", &[(100, 1, 5, 16)])
        .key("cpu", &[&span(0, 10)])
        .write_to(&path)
        .unwrap();

    let reader = open(&path);
    let mut cursor = reader.cursor();
    assert!(cursor.advance());
    let (mut entries, mut tombstones) = (Vec::new(), Vec::new());
    cursor.entries_and_tombstones(&mut entries, &mut tombstones);
    assert!(cursor.err().is_some());

    let mut iter = RangeMaxTimeIterator::new(cursor, TimeRange::all());
    assert!(!iter.has_data());
    assert_eq!(iter.max_time(), INVALID_MIN_NANO_TIME);
    assert!(!iter.advance());
    assert!(iter.err().is_some());
}

#[test]
fn test_corrupt_index_surfaces_through_iterator() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.tsm");
    TsmFileWriter::new()
        .key("a", &[&span(0, 10)])
        .raw_key("b", &[(20, 30, 5, 16), (10, 15, 5, 16)])
        .key("c", &[&span(0, 10)])
        .write_to(&path)
        .unwrap();

    let reader = open(&path);
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::all());

    assert!(iter.advance());
    assert!(iter.has_data());

    // entries of "b" are not in time order
    assert!(iter.advance());
    assert!(!iter.has_data());
    assert_eq!(iter.max_time(), INVALID_MIN_NANO_TIME);
    assert!(matches!(iter.err(), Some(Error::Corruption(_))));
    assert!(!iter.advance());
}

#[test]
fn test_corrupt_block_only_affects_its_key() {
    use std::io::{Seek, SeekFrom, Write};

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bitrot.tsm");
    TsmFileWriter::new()
        .key("a", &[&[1, 5, 9]])
        .key("b", &[&[1, 5, 9]])
        .write_to(&path)
        .unwrap();

    let entries = open(&path).entries(b"a").unwrap().unwrap();
    let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(entries[0].handle.offset + 8)).unwrap();
    file.write_all(&[0x7F]).unwrap();
    drop(file);

    let reader = open(&path);
    // strictly inside the block bounds, so both keys need a decode
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(4, 6));

    assert!(iter.advance());
    assert!(!iter.has_data());
    assert_eq!(iter.max_time(), INVALID_MIN_NANO_TIME);
    assert!(iter.err().is_none());

    assert!(iter.advance());
    assert!(iter.has_data());
    assert_eq!(iter.max_time(), 9);
}

#[test]
fn test_multi_block_tombstones() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("multi.tsm");
    TsmFileWriter::new()
        .key("cpu", &[&span(0, 9), &span(10, 19), &span(20, 29), &span(30, 39)])
        .write_to(&path)
        .unwrap();
    write_tombstones(
        &path,
        &[TombstoneRecord::new("cpu", 0, 12), TombstoneRecord::new("cpu", 35, 100)],
    )
    .unwrap();

    let reader = open(&path);

    // first surviving match is in block 1, newest survivor in block 3
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(5, 15));
    assert!(iter.advance());
    assert!(iter.has_data());
    assert_eq!(iter.max_time(), 34);

    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(0, 12));
    assert!(iter.advance());
    assert!(!iter.has_data());
    assert_eq!(iter.max_time(), 34);

    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(35, 50));
    assert!(iter.advance());
    assert!(!iter.has_data());
    assert_eq!(iter.max_time(), 34);
}

fn scan_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("scan.tsm");
    TsmFileWriter::new()
        .key("cpu,host=a", &[&span(0, 100)])
        .key("cpu,host=b", &[&span(50, 60)])
        .key("disk,host=a", &[&span(200, 300)])
        .key("mem,host=a", &[&span(0, 10), &span(500, 600)])
        .key("net,host=a", &[])
        .write_to(&path)
        .unwrap();
    write_tombstones(&path, &[TombstoneRecord::new("mem,host=a", 550, 600)]).unwrap();
    path
}

#[test]
fn test_scan_max_time_all_keys() {
    let dir = TempDir::new().unwrap();
    let reader = open(&scan_fixture(&dir));
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(55, 250));

    let summary = scan_max_time(&mut iter, b"", None).unwrap();
    let keys: Vec<(&[u8], i64)> =
        summary.keys.iter().map(|k| (k.key.as_slice(), k.max_time)).collect();
    assert_eq!(
        keys,
        vec![(&b"cpu,host=a"[..], 100), (&b"cpu,host=b"[..], 60), (&b"disk,host=a"[..], 300)]
    );
    assert_eq!(summary.max_time, 300);
}

#[test]
fn test_scan_max_time_bounded() {
    let dir = TempDir::new().unwrap();
    let reader = open(&scan_fixture(&dir));
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::new(500, 549));

    let summary = scan_max_time(&mut iter, b"disk", Some(b"net")).unwrap();
    assert_eq!(summary.keys.len(), 1);
    assert_eq!(summary.keys[0].key, b"mem,host=a".to_vec());
    assert_eq!(summary.keys[0].max_time, 549);
    assert_eq!(summary.max_time, 549);

    // empty key range
    let summary = scan_max_time(&mut iter, b"cpu", Some(b"cpu")).unwrap();
    assert!(summary.keys.is_empty());
    assert_eq!(summary.max_time, INVALID_MIN_NANO_TIME);

    // start past the last key
    let summary = scan_max_time(&mut iter, b"zzz", None).unwrap();
    assert!(summary.keys.is_empty());
}

#[test]
fn test_scan_max_time_reports_cursor_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan_bad.tsm");
    TsmFileWriter::new()
        .key("a", &[&span(0, 10)])
        .raw_key("b", &[(10, 0, 5, 16)])
        .write_to(&path)
        .unwrap();

    let reader = open(&path);
    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::all());
    let err = scan_max_time(&mut iter, b"", None).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[test]
fn test_parallel_iterators_share_reader() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parallel.tsm");
    let mut writer = TsmFileWriter::new();
    for k in 0..50 {
        let base = k * 1000;
        writer = writer.key(&format!("series-{:03}", k), &[&span(base, base + 99)]);
    }
    writer.write_to(&path).unwrap();
    let mut records = Vec::new();
    for k in (0..50).step_by(2) {
        let base = k * 1000;
        records.push(TombstoneRecord::new(format!("series-{:03}", k), base + 50, base + 99));
    }
    write_tombstones(&path, &records).unwrap();

    let reader = open(&path);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let mut iter = RangeMaxTimeIterator::new(reader.cursor(), TimeRange::all());
                    let mut seen = Vec::new();
                    while iter.advance() {
                        assert!(iter.has_data());
                        seen.push(iter.max_time());
                    }
                    assert!(iter.err().is_none());
                    seen
                })
            })
            .collect();

        for handle in handles {
            let seen = handle.join().unwrap();
            assert_eq!(seen.len(), 50);
            for (k, max_time) in seen.into_iter().enumerate() {
                let base = k as i64 * 1000;
                let expected = if k % 2 == 0 { base + 49 } else { base + 99 };
                assert_eq!(max_time, expected);
            }
        }
    });
}
