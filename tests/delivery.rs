//! End-to-end tests of the delivery protocol against a scripted remote
//! platform and a real temporary filesystem.

mod support;

use std::time::Duration;

use staffetta::application::DeliveryOutcome;
use staffetta::domain::MediaKind;

use support::Harness;

#[tokio::test]
async fn first_request_transmits_and_caches() {
    let harness = Harness::new();
    let asset = harness
        .write_asset("clave", "clave.pdf", MediaKind::Document, b"reset steps")
        .await;

    let outcome = harness.delivery.deliver(&asset).await;

    match outcome {
        DeliveryOutcome::Delivered {
            from_cache,
            identifier,
            ..
        } => {
            assert!(!from_cache);
            assert_eq!(identifier.as_str(), "remote-id-1");
        }
        other => panic!("expected delivery from source, got {other:?}"),
    }
    assert_eq!(harness.transport.transmit_count(), 1);
    assert_eq!(harness.transport.transmitted_sizes(), vec![b"reset steps".len()]);
    assert_eq!(harness.store.len(), 1);
    assert_eq!(
        harness.store.get(&asset.key).expect("cached").as_str(),
        "remote-id-1"
    );
}

#[tokio::test]
async fn unchanged_file_is_served_by_reference() {
    let harness = Harness::new();
    let asset = harness
        .write_asset("clave", "clave.pdf", MediaKind::Document, b"reset steps")
        .await;

    harness.delivery.deliver(&asset).await;
    let second = harness.delivery.deliver(&asset).await;

    match second {
        DeliveryOutcome::Delivered { from_cache, .. } => assert!(from_cache),
        other => panic!("expected cached delivery, got {other:?}"),
    }
    // No second upload took place.
    assert_eq!(harness.transport.transmit_count(), 1);
    assert_eq!(harness.transport.reference_count(), 1);
    assert_eq!(
        harness.transport.delivered_references(),
        vec!["remote-id-1".to_string()]
    );
}

#[tokio::test]
async fn edited_content_invalidates_and_retransmits() {
    let harness = Harness::new();
    let asset = harness
        .write_asset("clave", "clave.pdf", MediaKind::Document, b"version one")
        .await;

    harness.delivery.deliver(&asset).await;
    let first_entry = harness.store.entry(&asset.key).expect("first entry");

    tokio::fs::write(&asset.source_path, b"version two")
        .await
        .expect("edit file");
    let outcome = harness.delivery.deliver(&asset).await;

    match outcome {
        DeliveryOutcome::Delivered {
            from_cache,
            identifier,
            ..
        } => {
            assert!(!from_cache);
            assert_eq!(identifier.as_str(), "remote-id-2");
        }
        other => panic!("expected re-transmission, got {other:?}"),
    }
    // The stale identifier was never replayed.
    assert_eq!(harness.transport.reference_count(), 0);

    let second_entry = harness.store.entry(&asset.key).expect("second entry");
    assert_ne!(first_entry.identifier, second_entry.identifier);
    assert_ne!(first_entry.digest, second_entry.digest);
}

#[tokio::test]
async fn rejected_identifier_triggers_exactly_one_fallback() {
    let harness = Harness::new();
    let asset = harness
        .write_asset("samsung", "Samsung.mp4", MediaKind::Video, b"video bytes")
        .await;

    harness.delivery.deliver(&asset).await;
    harness.transport.reject_references(true);

    let outcome = harness.delivery.deliver(&asset).await;

    match outcome {
        DeliveryOutcome::Delivered {
            from_cache,
            identifier,
            ..
        } => {
            assert!(!from_cache);
            assert_eq!(identifier.as_str(), "remote-id-2");
        }
        other => panic!("expected fallback delivery, got {other:?}"),
    }
    // One reference attempt, then one (and only one) re-upload.
    assert_eq!(harness.transport.reference_count(), 1);
    assert_eq!(harness.transport.transmit_count(), 2);
    assert_eq!(
        harness.store.get(&asset.key).expect("repopulated").as_str(),
        "remote-id-2"
    );
}

#[tokio::test]
async fn missing_source_with_no_entry_is_not_found() {
    let harness = Harness::new();
    let asset = harness.missing_asset("ingresar", "ingresar.pdf", MediaKind::Document);

    let outcome = harness.delivery.deliver(&asset).await;

    assert!(matches!(outcome, DeliveryOutcome::NotFound { .. }));
    assert_eq!(harness.transport.transmit_count(), 0);
    assert!(harness.store.is_empty());
    assert_eq!(harness.store.baseline_count(), 0);
}

#[tokio::test]
async fn cached_entry_survives_source_deletion() {
    let harness = Harness::new();
    let asset = harness
        .write_asset("xiaomi", "Xiaomi.mp4", MediaKind::Video, b"video bytes")
        .await;

    harness.delivery.deliver(&asset).await;
    tokio::fs::remove_file(&asset.source_path)
        .await
        .expect("delete source");

    // A missing file is not a change; the cached reference still serves.
    let outcome = harness.delivery.deliver(&asset).await;
    match outcome {
        DeliveryOutcome::Delivered { from_cache, .. } => assert!(from_cache),
        other => panic!("expected cached delivery, got {other:?}"),
    }
    assert_eq!(harness.transport.transmit_count(), 1);
}

#[tokio::test]
async fn refused_transmission_never_poisons_the_cache() {
    let harness = Harness::new();
    harness.transport.refuse_transmits(true);
    let asset = harness
        .write_asset("clave", "clave.pdf", MediaKind::Document, b"reset steps")
        .await;

    let outcome = harness.delivery.deliver(&asset).await;

    match outcome {
        DeliveryOutcome::Failed { reason, .. } => {
            assert!(reason.contains("refused"), "unexpected reason: {reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(harness.store.get(&asset.key).is_none());
}

#[tokio::test]
async fn transmission_timeout_is_a_terminal_failure() {
    let harness = Harness::with_timeout(Duration::from_millis(50));
    harness.transport.delay_transmits(Duration::from_millis(500));
    let asset = harness
        .write_asset("samsung", "Samsung.mp4", MediaKind::Video, b"video bytes")
        .await;

    let outcome = harness.delivery.deliver(&asset).await;

    match outcome {
        DeliveryOutcome::Failed { reason, .. } => {
            assert!(reason.contains("timed out"), "unexpected reason: {reason}");
        }
        other => panic!("expected timeout failure, got {other:?}"),
    }
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn multi_asset_partial_failure_does_not_abort_siblings() {
    let harness = Harness::new();
    let missing = harness.missing_asset("samsung", "Samsung.mp4", MediaKind::Video);
    let present = harness
        .write_asset("xiaomi", "Xiaomi.mp4", MediaKind::Video, b"video bytes")
        .await;

    let report = harness
        .delivery
        .deliver_many(&[missing.clone(), present.clone()])
        .await;

    assert_eq!(report.total(), 2);
    assert_eq!(report.delivered(), 1);
    assert!(matches!(
        report.outcomes[0],
        DeliveryOutcome::NotFound { .. }
    ));
    assert!(report.outcomes[1].is_delivered());
    // The sibling's failure did not stop the present asset being cached.
    assert!(harness.store.get(&present.key).is_some());
    assert!(harness.store.get(&missing.key).is_none());
}

#[tokio::test]
async fn concurrent_requests_for_one_key_upload_once() {
    let harness = Harness::new();
    let asset = harness
        .write_asset("pasar_pedido", "PasarPedido.mp4", MediaKind::Video, b"bytes")
        .await;

    let (first, second) = tokio::join!(
        harness.delivery.deliver(&asset),
        harness.delivery.deliver(&asset)
    );

    assert!(first.is_delivered());
    assert!(second.is_delivered());
    // Per-key serialization: the second request observed the first's entry.
    assert_eq!(harness.transport.transmit_count(), 1);
    assert_eq!(harness.store.len(), 1);
}
