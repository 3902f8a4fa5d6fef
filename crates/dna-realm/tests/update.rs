//! Open window tests
//!
//! `request_update` and its async form must leave the realm closed on every
//! exit path, exactly once.

use std::pin::pin;

use dna_realm::{Component, Dom, OpenGuard, Realm};
use smol::future::poll_once;

fn setup() -> (Dom, Realm) {
    let dom = Dom::new();
    let host = dom.create_element("x-async");
    let realm = dom.create_realm(host).unwrap();
    realm.initialize().unwrap();
    (dom, realm)
}

#[test]
fn test_sync_update_returns_value() {
    let (dom, realm) = setup();
    let host = realm.node();

    let div = realm.request_update(|| {
        let div = dom.create_element("div");
        dom.append_child(host, div).unwrap();
        div
    });

    assert!(!realm.is_open());
    assert_eq!(dom.native(|tree| tree.child_ids(host)), vec![div]);
    assert!(realm.child_nodes().is_empty());
}

#[test]
fn test_async_stays_open_until_settled() {
    let (_dom, realm) = setup();
    let (tx, rx) = smol::channel::bounded::<u32>(1);

    let probe = realm.clone();
    let mut fut = Box::pin(realm.request_update_async(|| async move {
        assert!(probe.is_open());
        rx.recv().await.unwrap_or(0)
    }));

    smol::block_on(async {
        assert!(poll_once(&mut fut).await.is_none());
        assert!(realm.is_open());

        tx.send(7).await.unwrap();
        assert_eq!(fut.await, 7);
    });
    assert!(!realm.is_open());
}

#[test]
fn test_dropping_future_closes() {
    let (_dom, realm) = setup();
    let (_tx, rx) = smol::channel::bounded::<()>(1);

    smol::block_on(async {
        let mut fut = pin!(realm.request_update_async(|| async move {
            let _ = rx.recv().await;
        }));
        assert!(poll_once(fut.as_mut()).await.is_none());
        assert!(realm.is_open());
    });

    assert!(!realm.is_open());
}

#[test]
fn test_async_error_closes() {
    let (_dom, realm) = setup();

    let result: Result<(), String> = smol::block_on(
        realm.request_update_async(|| async { Err("template failed".to_string()) }),
    );

    assert_eq!(result.unwrap_err(), "template failed");
    assert!(!realm.is_open());
}

#[test]
fn test_update_inside_open_window_leaves_it_open() {
    let (_dom, realm) = setup();
    realm.dangerously_open();

    realm.request_update(|| ());
    smol::block_on(realm.request_update_async(|| async {}));

    assert!(realm.is_open());
}

#[test]
fn test_guard_reports_ownership_of_window() {
    let (_dom, realm) = setup();

    let outer = OpenGuard::acquire(&realm);
    let inner = OpenGuard::acquire(&realm);
    assert!(outer.opened());
    assert!(!inner.opened());

    drop(inner);
    assert!(realm.is_open());
    drop(outer);
    assert!(!realm.is_open());
}

#[test]
fn test_async_render() {
    let dom = Dom::new();
    let card = Component::upgrade(&dom, dom.create_element("x-card")).unwrap();
    card.connect(dom.body().unwrap()).unwrap();
    let host = card.host();

    let rendered = smol::block_on(card.render_async(|dom| async move {
        smol::future::yield_now().await;
        let div = dom.create_element("div");
        dom.append_child(host, div).map(|_| div)
    }))
    .unwrap();

    assert!(!card.realm().is_open());
    assert_eq!(dom.native(|tree| tree.child_ids(host)), vec![rendered]);
    assert!(card.slotted().is_empty());
}
