use super::*;

#[test]
fn publish_without_subscribers_is_dropped() {
    let bus = SignalBus::default();
    assert_eq!(bus.publish(BoardEvent::PinsCleared), 0);
}

#[tokio::test]
async fn every_subscriber_sees_events_in_order() {
    let bus = SignalBus::new(8);
    let mut a = bus.subscribe();
    let mut b = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 2);

    assert_eq!(bus.publish(BoardEvent::RouteSelectionStart), 2);
    bus.publish(BoardEvent::RouteSelectionEnd);

    assert_eq!(a.recv().await.unwrap(), BoardEvent::RouteSelectionStart);
    assert_eq!(a.recv().await.unwrap(), BoardEvent::RouteSelectionEnd);
    assert_eq!(b.recv().await.unwrap(), BoardEvent::RouteSelectionStart);
}

#[tokio::test]
async fn lagging_subscriber_skips_instead_of_blocking() {
    let bus = SignalBus::new(1);
    let mut rx = bus.subscribe();
    bus.publish(BoardEvent::PinsCleared);
    bus.publish(BoardEvent::Disconnected);

    assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(1))));
    assert_eq!(rx.recv().await.unwrap(), BoardEvent::Disconnected);
}
