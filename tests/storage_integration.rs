//! Integration tests for the disk manager and page layer together.

use std::sync::Arc;

use strata::{DiskManager, Page, PageId};
use tempfile::tempdir;

#[tokio::test]
async fn test_allocate_write_read() {
    let dir = tempdir().unwrap();
    let disk = DiskManager::open(dir.path().join("test.db")).await.unwrap();

    assert_eq!(disk.page_count(), 0);

    // Allocation hands out consecutive ids starting at the current count.
    let id0 = disk.allocate_page().await.unwrap();
    let id1 = disk.allocate_page().await.unwrap();
    let id2 = disk.allocate_page().await.unwrap();
    assert_eq!(id0, PageId::new(0));
    assert_eq!(id1, PageId::new(1));
    assert_eq!(id2, PageId::new(2));
    assert_eq!(disk.page_count(), 3);

    // Write a distinct record into each page.
    for (id, value) in [(id0, 10u8), (id1, 20u8), (id2, 30u8)] {
        let mut page = Page::new();
        disk.read_page(id, &mut page).await.unwrap();
        page.insert(&[value; 8]).unwrap();
        disk.write_page(id, &page).await.unwrap();
    }

    // Read back and verify.
    let mut page = Page::new();
    for (id, value) in [(id0, 10u8), (id1, 20u8), (id2, 30u8)] {
        disk.read_page(id, &mut page).await.unwrap();
        assert_eq!(page.page_id(), id);
        assert_eq!(page.read(0), Some([value; 8].as_slice()));
    }

    disk.sync_all().await.unwrap();
}

#[tokio::test]
async fn test_page_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    {
        let disk = DiskManager::open(&path).await.unwrap();
        let page_id = disk.allocate_page().await.unwrap();

        let mut page = Page::new();
        disk.read_page(page_id, &mut page).await.unwrap();
        page.insert(b"alpha").unwrap();
        page.insert(b"beta").unwrap();
        page.insert(b"gamma").unwrap();
        page.delete(0).unwrap();
        page.set_lsn(41);
        disk.write_page(page_id, &page).await.unwrap();
        disk.sync_all().await.unwrap();
    }

    {
        let disk = DiskManager::open(&path).await.unwrap();
        assert_eq!(disk.page_count(), 1);

        let mut page = Page::new();
        disk.read_page(PageId::new(0), &mut page).await.unwrap();

        // Compaction and the slot-id shift from the delete persisted.
        assert_eq!(page.slot_count(), 2);
        assert_eq!(page.free_space_offset(), 9);
        assert_eq!(page.read(0), Some(b"beta".as_slice()));
        assert_eq!(page.read(1), Some(b"gamma".as_slice()));
        assert_eq!(page.lsn(), 41);
    }
}

#[tokio::test]
async fn test_full_page_roundtrips_through_disk() {
    let dir = tempdir().unwrap();
    let disk = DiskManager::open(dir.path().join("test.db")).await.unwrap();
    let page_id = disk.allocate_page().await.unwrap();

    let mut page = Page::new();
    disk.read_page(page_id, &mut page).await.unwrap();

    // Fill the page with fixed-size records until insert fails.
    let record = [0x5Au8; 100];
    let mut count = 0;
    while page.insert(&record).is_ok() {
        count += 1;
    }
    assert!(page.insert(&record).is_err());

    disk.write_page(page_id, &page).await.unwrap();

    let mut restored = Page::new();
    disk.read_page(page_id, &mut restored).await.unwrap();
    assert_eq!(restored, page);
    assert_eq!(restored.record_count(), count);
    for slot_id in 0..count {
        assert_eq!(restored.read(slot_id), Some(record.as_slice()));
    }
}

#[tokio::test]
async fn test_concurrent_writes_to_distinct_pages() {
    let dir = tempdir().unwrap();
    let disk = Arc::new(DiskManager::open(dir.path().join("test.db")).await.unwrap());

    for _ in 0..8 {
        disk.allocate_page().await.unwrap();
    }

    let mut handles = vec![];
    for i in 0..8 {
        let disk = Arc::clone(&disk);
        handles.push(tokio::spawn(async move {
            let page_id = PageId::new(i);
            let mut page = Page::new();
            disk.read_page(page_id, &mut page).await.unwrap();
            page.insert(&[i as u8; 32]).unwrap();
            disk.write_page(page_id, &page).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut page = Page::new();
    for i in 0..8 {
        disk.read_page(PageId::new(i), &mut page).await.unwrap();
        assert_eq!(page.read(0), Some([i as u8; 32].as_slice()));
    }
}
