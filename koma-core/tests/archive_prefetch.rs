mod common;

use std::sync::Arc;

use common::{cbz, cbz_owned, corrupt, numbered_pages};
use koma_core::archive::ArchiveHandle;
use koma_core::config::PrefetchConfig;
use koma_core::prefetch::{PrefetchEvent, Prefetcher, SlotState};

fn prefetcher(bytes: Vec<u8>, cfg: PrefetchConfig) -> Prefetcher {
    Prefetcher::new(Arc::new(ArchiveHandle::open(bytes).unwrap()), cfg)
}

fn radius(n: usize) -> PrefetchConfig {
    PrefetchConfig {
        look_ahead: n,
        ..PrefetchConfig::default()
    }
}

#[tokio::test]
async fn window_around_visible_page() {
    let p = prefetcher(cbz_owned(&numbered_pages(20)), radius(3));
    let ticket = p.on_visible_index_changed(5);

    let mut issued = ticket.issued.clone();
    assert_eq!(ticket.issued[0], 5);
    issued.sort();
    assert_eq!(issued, vec![4, 5, 6, 7, 8]);
    ticket.settled().await;

    for i in 4..=8 {
        assert!(p.get_decoded_slot(i).is_ready(), "slot {i}");
    }
    for i in [0, 1, 2, 3, 9, 19] {
        assert_eq!(p.get_decoded_slot(i), SlotState::Empty, "slot {i}");
    }
}

#[tokio::test]
async fn pages_follow_natural_order() {
    let p = prefetcher(
        cbz(&[("page10.jpg", b"ten"), ("page2.jpg", b"two"), ("page1.jpg", b"one")]),
        radius(3),
    );
    assert_eq!(p.handle().entries(), ["page1.jpg", "page2.jpg", "page10.jpg"]);
    p.on_visible_index_changed(0).settled().await;
    let page = p.get_decoded_slot(1);
    assert!(page.page().unwrap().source_key.ends_with("/page2.jpg"));
}

#[tokio::test]
async fn moving_the_window_only_decodes_new_pages() {
    let p = prefetcher(cbz_owned(&numbered_pages(20)), radius(3));
    p.on_visible_index_changed(5).settled().await;
    let t = p.on_visible_index_changed(6);
    assert_eq!(t.issued, vec![9]);
    t.settled().await;
    assert!(p.get_decoded_slot(4).is_ready());
}

#[tokio::test]
async fn corrupt_entry_leaves_only_its_slot_empty() {
    let mut bytes = cbz(&[("p1.jpg", b"first-page-body"), ("p2.jpg", b"second-page-body")]);
    corrupt(&mut bytes, b"second-page-body");
    let p = prefetcher(bytes, radius(3));

    p.on_visible_index_changed(0).settled().await;
    assert!(p.get_decoded_slot(0).is_ready());
    assert!(matches!(p.get_decoded_slot(1), SlotState::Failed(_)));

    // not retried
    let t = p.on_visible_index_changed(1);
    assert!(t.issued.is_empty());
}

#[tokio::test]
async fn eviction_margin_drops_far_pages() {
    let cfg = PrefetchConfig {
        look_ahead: 2,
        look_behind: 1,
        eviction_margin: Some(3),
    };
    let p = prefetcher(cbz_owned(&numbered_pages(30)), cfg);
    p.on_visible_index_changed(2).settled().await;
    assert!(p.get_decoded_slot(1).is_ready());

    let t = p.on_visible_index_changed(10);
    assert_eq!(t.evicted, 4);
    t.settled().await;
    for i in 1..=4 {
        assert_eq!(p.get_decoded_slot(i), SlotState::Empty);
    }
    assert_eq!(p.slots().ready_count(), 4);
}

#[tokio::test]
async fn without_margin_nothing_is_evicted() {
    let p = prefetcher(cbz_owned(&numbered_pages(30)), radius(2));
    p.on_visible_index_changed(2).settled().await;
    let t = p.on_visible_index_changed(20);
    assert_eq!(t.evicted, 0);
    t.settled().await;
    assert!(p.get_decoded_slot(2).is_ready());
    assert!(p.get_decoded_slot(22).is_ready());
}

#[tokio::test]
async fn late_results_after_close_are_dropped() {
    let p = prefetcher(cbz_owned(&numbered_pages(10)), radius(3));
    let t = p.on_visible_index_changed(0);
    p.close();
    t.settled().await;
    for i in 0..4 {
        assert_eq!(p.get_decoded_slot(i), SlotState::Empty);
    }
    assert!(p.on_visible_index_changed(0).issued.is_empty());
    assert!(!p.handle().is_open());
}

#[tokio::test]
async fn event_loop_consumes_visibility_messages() {
    let p = Arc::new(prefetcher(cbz_owned(&numbered_pages(10)), radius(1)));
    let (tx, task) = p.clone().spawn_event_loop(8);
    tx.send(PrefetchEvent::VisibleIndexChanged(4)).await.unwrap();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while !(p.get_decoded_slot(5).is_ready() && p.get_decoded_slot(3).is_ready()) {
        assert!(tokio::time::Instant::now() < deadline, "prefetch did not complete");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(p.window().map(|w| w.center), Some(4));

    tx.send(PrefetchEvent::Close).await.unwrap();
    task.await.unwrap();
    assert!(!p.handle().is_open());
    assert_eq!(p.get_decoded_slot(4), SlotState::Empty);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_racing_decodes_leaves_no_ready_slot() {
    let bytes = cbz_owned(&numbered_pages(8));
    for _ in 0..50 {
        let p = prefetcher(bytes.clone(), radius(3));
        let t = p.on_visible_index_changed(1);
        tokio::task::yield_now().await;
        p.close();
        t.settled().await;
        for i in 0..8 {
            assert_eq!(p.get_decoded_slot(i), SlotState::Empty, "slot {i}");
        }
    }
}
