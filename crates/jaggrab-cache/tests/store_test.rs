//! Integration tests for loading and reading a cache directory.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use jaggrab_cache::{
    CacheError, CacheStore, ChainFault, HeaderPolicy, Lifecycle, OutOfRangeKind, StoreConfig,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use test_utils::{BuiltCache, CacheFixture, encode_record, encode_sector, overwrite, pattern};

fn two_sector_cache() -> (BuiltCache, Vec<u8>) {
    let mut data = pattern(0x10, 512);
    data.extend(pattern(0x90, 488));
    let built = CacheFixture::new()
        .file(0, 5, data.clone())
        .build()
        .expect("Failed to build fixture");
    (built, data)
}

#[test]
fn test_two_sector_file() {
    let (built, data) = two_sector_cache();
    let placement = built.placement(0, 5).unwrap();
    assert_eq!(placement.start_block, 0);
    assert_eq!(placement.blocks, 2);

    let store = CacheStore::open(built.path()).unwrap();
    let file = store.get_file(0, 5).unwrap();
    assert_eq!(file.archive(), 0);
    assert_eq!(file.file_id(), 5);
    assert_eq!(file.data(), &data[..]);

    let read = store.read_chain(0, 5).unwrap();
    assert_eq!(read.blocks, 2);
}

#[test]
fn test_many_files_across_archives() {
    let built = CacheFixture::new()
        .file(0, 1, pattern(1, 10))
        .file(0, 2, pattern(2, 1500))
        .file(1, 0, pattern(3, 512))
        .file(3, 7, pattern(4, 2049))
        .build()
        .unwrap();

    let store = CacheStore::open(built.path()).unwrap();
    assert_eq!(store.index_count().unwrap(), 4);
    assert_eq!(store.get_file(0, 1).unwrap().into_bytes(), pattern(1, 10));
    assert_eq!(store.get_file(0, 2).unwrap().into_bytes(), pattern(2, 1500));
    assert_eq!(store.get_file(1, 0).unwrap().into_bytes(), pattern(3, 512));
    assert_eq!(store.get_file(3, 7).unwrap().into_bytes(), pattern(4, 2049));
}

#[test]
fn test_unset_record_is_empty_file() {
    let built = CacheFixture::new().file(0, 4, pattern(1, 20)).build().unwrap();
    let store = CacheStore::open(built.path()).unwrap();

    let file = store.get_file(0, 2).unwrap();
    assert!(file.is_empty());
    assert_eq!(store.read_chain(0, 2).unwrap().blocks, 0);
}

#[test]
fn test_empty_index_store() {
    let built = CacheFixture::new()
        .file(0, 0, pattern(1, 20))
        .archives(3)
        .build()
        .unwrap();
    let store = CacheStore::open(built.path()).unwrap();

    assert_eq!(store.record_count(2).unwrap(), 0);
    let err = store.get_file(2, 0).unwrap_err();
    assert!(matches!(
        err,
        CacheError::OutOfRange {
            kind: OutOfRangeKind::File,
            value: 0,
            limit: 0
        }
    ));
}

#[test]
fn test_archive_out_of_range() {
    let (built, _) = two_sector_cache();
    let store = CacheStore::open(built.path()).unwrap();

    let err = store.get_file(1, 0).unwrap_err();
    assert!(err.is_out_of_range());
    assert!(matches!(
        err,
        CacheError::OutOfRange {
            kind: OutOfRangeKind::Archive,
            value: 1,
            limit: 1
        }
    ));
    assert!(store.get_file(u32::MAX, 0).unwrap_err().is_out_of_range());
}

#[test]
fn test_file_out_of_range() {
    let (built, _) = two_sector_cache();
    let store = CacheStore::open(built.path()).unwrap();
    assert_eq!(store.record_count(0).unwrap(), 6);

    let err = store.get_file(0, 6).unwrap_err();
    assert!(matches!(
        err,
        CacheError::OutOfRange {
            kind: OutOfRangeKind::File,
            value: 6,
            limit: 6
        }
    ));
    assert!(store.get_file(0, u32::MAX).unwrap_err().is_out_of_range());
}

#[test]
fn test_partial_trailing_record_ignored() {
    let (built, _) = two_sector_cache();
    let index = built.index_store(0);
    let mut bytes = std::fs::read(&index).unwrap();
    bytes.extend_from_slice(&[0, 0, 1]);
    std::fs::write(&index, bytes).unwrap();

    let store = CacheStore::open(built.path()).unwrap();
    assert_eq!(store.record_count(0).unwrap(), 6);
    assert!(store.get_file(0, 6).unwrap_err().is_out_of_range());
}

#[test]
fn test_short_final_sector_is_read() {
    let data = pattern(7, 700);
    let built = CacheFixture::new()
        .file(0, 1, data.clone())
        .short_tail()
        .build()
        .unwrap();

    let store = CacheStore::open(built.path()).unwrap();
    assert_eq!(store.main_store_len().unwrap(), 520 + 8 + 188);
    assert_eq!(store.get_file(0, 1).unwrap().into_bytes(), data);
}

#[test]
fn test_truncated_main_store_rejected() {
    let (built, _) = two_sector_cache();
    test_utils::truncate(&built.main_store(), 520 + 8 + 100).unwrap();

    let store = CacheStore::open(built.path()).unwrap();
    let err = store.get_file(0, 5).unwrap_err();
    assert!(err.is_corrupt());
    assert!(matches!(
        err,
        CacheError::CorruptChain {
            block: 1,
            fault: ChainFault::TruncatedPayload {
                needed: 488,
                available: 100
            },
            ..
        }
    ));
}

#[test]
fn test_record_pointing_past_store() {
    let (built, _) = two_sector_cache();
    overwrite(&built.index_store(0), 5 * 6, &encode_record(1000, 0x00FF_FFFF)).unwrap();

    let store = CacheStore::open(built.path()).unwrap();
    let err = store.get_file(0, 5).unwrap_err();
    assert!(matches!(
        err,
        CacheError::CorruptChain {
            block: 0x00FF_FFFF,
            fault: ChainFault::TruncatedSector { available: 0 },
            ..
        }
    ));
}

#[test]
fn test_foreign_sector_rejected_unless_lenient() {
    let (built, data) = two_sector_cache();
    // Second sector claims to belong to file 9.
    let second = encode_sector(9, 1, 0, 1, &data[512..]);
    overwrite(&built.main_store(), BuiltCache::sector_offset(1), &second).unwrap();

    let strict = CacheStore::open(built.path()).unwrap();
    assert!(matches!(
        strict.get_file(0, 5).unwrap_err(),
        CacheError::CorruptChain {
            archive: 0,
            file_id: 5,
            block: 1,
            fault: ChainFault::OwnerMismatch {
                expected: 5,
                found: 9
            }
        }
    ));

    let config = StoreConfig::new().with_header_policy(HeaderPolicy::Lenient);
    let lenient = CacheStore::open_with_config(built.path(), config).unwrap();
    assert_eq!(lenient.get_file(0, 5).unwrap().into_bytes(), data);
}

#[test]
fn test_self_loop_is_bounded() {
    let built = CacheFixture::new().file(0, 1, pattern(0, 3000)).build().unwrap();
    // Sector 1 links back to itself with a matching chunk number.
    let looping = encode_sector(1, 1, 1, 1, &pattern(0, 512));
    overwrite(&built.main_store(), BuiltCache::sector_offset(1), &looping).unwrap();

    let strict = CacheStore::open(built.path()).unwrap();
    assert!(matches!(
        strict.get_file(0, 1).unwrap_err(),
        CacheError::CorruptChain {
            block: 1,
            fault: ChainFault::SequenceMismatch {
                expected: 2,
                found: 1
            },
            ..
        }
    ));

    // Without header checks the walk still stops once the length is covered.
    let config = StoreConfig::new().with_header_policy(HeaderPolicy::Lenient);
    let lenient = CacheStore::open_with_config(built.path(), config).unwrap();
    let read = lenient.read_chain(0, 1).unwrap();
    assert_eq!(read.blocks, 6);
    assert_eq!(read.data.len(), 3000);
}

#[test]
fn test_reads_after_close_fail() {
    let (built, _) = two_sector_cache();
    let store = CacheStore::open(built.path()).unwrap();
    store.get_file(0, 5).unwrap();

    store.close().unwrap();
    assert_eq!(store.lifecycle(), Lifecycle::Closed);
    assert!(matches!(
        store.get_file(0, 5).unwrap_err(),
        CacheError::StoreNotReady {
            state: Lifecycle::Closed
        }
    ));
}

#[test]
fn test_missing_index_stores() {
    let (built, _) = two_sector_cache();
    std::fs::remove_file(built.index_store(0)).unwrap();

    let err = CacheStore::open(built.path()).unwrap_err();
    assert!(matches!(err, CacheError::CacheUnavailable { .. }));
}

#[test]
fn test_concurrent_reads() {
    let mut fixture = CacheFixture::new();
    for id in 0..16u32 {
        fixture = fixture.file(0, id, pattern(id as u8, 300 + id as usize * 97));
    }
    let built = fixture.build().unwrap();
    let store = Arc::new(CacheStore::open(built.path()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for round in 0..50u32 {
                    let id = (t + round) % 16;
                    let file = store.get_file(0, id).unwrap();
                    assert_eq!(file.into_bytes(), pattern(id as u8, 300 + id as usize * 97));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
