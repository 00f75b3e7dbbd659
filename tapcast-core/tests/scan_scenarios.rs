use std::sync::{Arc, Mutex};

use serde_json::json;
use tapcast_core::{
    BroadcastMessage, BroadcastTransport, CardId, Delivery, ProfileRecord,
    ProfileStore, ReaderBackend, SCANNED_EVENT, ScanBridge, ScanDispatcher,
    ScanEvent, ScriptedReader, TransportSet,
};

/// Transport with a late-joining subscriber list, standing in for a socket
/// hub.
#[derive(Debug, Default)]
struct Hub {
    subscribers: Mutex<Vec<Vec<serde_json::Value>>>,
}

impl Hub {
    fn join(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.push(Vec::new());
        subscribers.len() - 1
    }

    fn inbox(&self, subscriber: usize) -> Vec<serde_json::Value> {
        self.subscribers.lock().unwrap()[subscriber].clone()
    }
}

impl BroadcastTransport for Hub {
    fn name(&self) -> &str {
        "hub"
    }

    fn broadcast(&self, event: &str, message: &BroadcastMessage) -> Delivery {
        let frame = json!({ "event": event, "data": message });
        let mut subscribers = self.subscribers.lock().unwrap();
        for inbox in subscribers.iter_mut() {
            inbox.push(frame.clone());
        }
        Delivery {
            delivered: subscribers.len(),
            dropped: 0,
        }
    }
}

fn john_store() -> Arc<ProfileStore> {
    Arc::new(ProfileStore::from_entries([(
        CardId::from("123456789"),
        ProfileRecord::new("John Doe", "/profiles/john.jpg"),
    )]))
}

#[test]
fn known_card_scenario_matches_wire_shape() {
    let dispatcher = ScanDispatcher::new(john_store());

    let message = dispatcher.dispatch(&ScanEvent::new(CardId::from("123456789")));

    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({
            "uid": "123456789",
            "profile": { "name": "John Doe", "image": "/profiles/john.jpg" }
        })
    );
}

#[test]
fn unknown_card_scenario_has_null_profile() {
    let dispatcher = ScanDispatcher::new(john_store());

    let message = dispatcher.dispatch(&ScanEvent::new(CardId::from("deadbeef")));

    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({ "uid": "deadbeef", "profile": null })
    );
}

#[test]
fn subscriber_joining_after_broadcast_misses_it() {
    let hub = Arc::new(Hub::default());
    let bridge = ScanBridge::new(
        ScanDispatcher::new(john_store()),
        TransportSet::new().with(hub.clone()),
    );

    let early = hub.join();
    bridge.handle(tapcast_core::ReaderEvent::card("reader", "123456789"));
    let late = hub.join();
    bridge.handle(tapcast_core::ReaderEvent::card("reader", "deadbeef"));

    let early_inbox = hub.inbox(early);
    assert_eq!(early_inbox.len(), 2);
    assert_eq!(early_inbox[0]["event"], SCANNED_EVENT);

    let late_inbox = hub.inbox(late);
    assert_eq!(late_inbox.len(), 1);
    assert_eq!(late_inbox[0]["data"]["uid"], "deadbeef");
}

#[tokio::test]
async fn device_fault_then_scan_still_broadcasts() {
    let plain = Arc::new(Hub::default());
    let secure = Arc::new(Hub::default());
    let plain_client = plain.join();
    let secure_client = secure.join();

    let bridge = ScanBridge::new(
        ScanDispatcher::new(john_store()),
        TransportSet::new().with(plain.clone()).with(secure.clone()),
    );
    let events = Box::new(
        ScriptedReader::new()
            .ready("ACS ACR122U")
            .fault("ACS ACR122U", "SCardTransmit failed")
            .card("ACS ACR122U", "123456789"),
    )
    .start()
    .expect("scripted reader starts");

    let stats = bridge.run(events).await;
    assert_eq!(stats.faults, 1);
    assert_eq!(stats.scans, 1);

    for (hub, client) in [(&plain, plain_client), (&secure, secure_client)] {
        let inbox = hub.inbox(client);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0]["data"]["profile"]["name"], "John Doe");
    }
}
