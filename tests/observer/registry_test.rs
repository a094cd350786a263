// Observer Registry Tests
// Slot replacement and late-join delivery

use smartlocker::observer::{ObserverRegistry, Signal, SignalKind};
use std::sync::{Arc, Mutex};

fn recorder() -> (Arc<Mutex<Vec<Signal>>>, Box<dyn FnMut(&Signal) + Send>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Box::new(move |signal: &Signal| sink.lock().unwrap().push(signal.clone())))
}

#[test]
fn test_notify_without_callback_is_noop() {
    let mut registry = ObserverRegistry::new();

    registry.notify(Signal::Code("1234".to_string()));

    assert!(!registry.is_registered(SignalKind::Code));
    assert_eq!(registry.latest(SignalKind::Code), Some(&Signal::Code("1234".to_string())));
}

#[test]
fn test_register_with_no_value_does_not_call() {
    let mut registry = ObserverRegistry::new();
    let (seen, callback) = recorder();

    registry.register(SignalKind::Door, callback);

    assert!(seen.lock().unwrap().is_empty());
    assert!(registry.is_registered(SignalKind::Door));
}

#[test]
fn test_late_join_delivers_once_synchronously() {
    let mut registry = ObserverRegistry::new();
    registry.notify(Signal::Door("B2".to_string()));
    let (seen, callback) = recorder();

    registry.register(SignalKind::Door, callback);

    assert_eq!(*seen.lock().unwrap(), vec![Signal::Door("B2".to_string())]);
}

#[test]
fn test_seeded_value_replays_without_notifying() {
    let mut registry = ObserverRegistry::new();
    let (seen, callback) = recorder();

    registry.seed(Signal::Available(Some(4)));
    assert_eq!(registry.latest(SignalKind::Available), Some(&Signal::Available(Some(4))));

    registry.register(SignalKind::Available, callback);
    assert_eq!(*seen.lock().unwrap(), vec![Signal::Available(Some(4))]);
}

#[test]
fn test_notify_reaches_registered_callback() {
    let mut registry = ObserverRegistry::new();
    let (seen, callback) = recorder();
    registry.register(SignalKind::Code, callback);

    registry.notify(Signal::Code("1".to_string()));
    registry.notify(Signal::Code("2".to_string()));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Signal::Code("1".to_string()), Signal::Code("2".to_string())]
    );
}

#[test]
fn test_notify_only_hits_its_kind() {
    let mut registry = ObserverRegistry::new();
    let (codes, code_cb) = recorder();
    let (doors, door_cb) = recorder();
    registry.register(SignalKind::Code, code_cb);
    registry.register(SignalKind::Door, door_cb);

    registry.notify(Signal::Door("C3".to_string()));

    assert!(codes.lock().unwrap().is_empty());
    assert_eq!(*doors.lock().unwrap(), vec![Signal::Door("C3".to_string())]);
}

#[test]
fn test_register_replaces_previous_callback() {
    let mut registry = ObserverRegistry::new();
    let (first, first_cb) = recorder();
    let (second, second_cb) = recorder();
    registry.register(SignalKind::Code, first_cb);
    registry.register(SignalKind::Code, second_cb);

    registry.notify(Signal::Code("9".to_string()));

    assert!(first.lock().unwrap().is_empty());
    assert_eq!(*second.lock().unwrap(), vec![Signal::Code("9".to_string())]);
}

#[test]
fn test_unknown_available_is_not_replayed() {
    let mut registry = ObserverRegistry::new();
    registry.notify(Signal::Available(Some(3)));
    registry.notify(Signal::Available(None));
    let (seen, callback) = recorder();

    registry.register(SignalKind::Available, callback);

    assert!(seen.lock().unwrap().is_empty());
    assert!(registry.latest(SignalKind::Available).is_none());
}

#[test]
fn test_seed_ignores_unknown_available() {
    let mut registry = ObserverRegistry::new();

    registry.seed(Signal::Available(None));

    assert!(registry.latest(SignalKind::Available).is_none());
}

#[test]
fn test_forget_stops_replay() {
    let mut registry = ObserverRegistry::new();
    registry.notify(Signal::Code("1234".to_string()));
    registry.forget(SignalKind::Code);
    let (seen, callback) = recorder();

    registry.register(SignalKind::Code, callback);

    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_unregister() {
    let mut registry = ObserverRegistry::new();
    let (seen, callback) = recorder();
    registry.register(SignalKind::Code, callback);

    assert!(registry.unregister(SignalKind::Code));
    assert!(!registry.unregister(SignalKind::Code));

    registry.notify(Signal::Code("1".to_string()));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_signal_kind() {
    assert_eq!(Signal::Code(String::new()).kind(), SignalKind::Code);
    assert_eq!(Signal::Door(String::new()).kind(), SignalKind::Door);
    assert_eq!(Signal::Available(None).kind(), SignalKind::Available);
}
