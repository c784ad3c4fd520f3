use super::*;
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{LineString, RouteProperties};

fn route_between(from: &str, to: &str) -> Route {
    Route {
        geometry: LineString { coordinates: vec![[0.0, 0.0], [1.0, 1.0]] },
        properties: RouteProperties {
            from_id: Some(from.into()),
            to_id: Some(to.into()),
            distance: Some(1200.0),
            duration: Some(300.0),
        },
    }
}

fn store_with(ids: &[&str]) -> AnnotationStore {
    let mut store = AnnotationStore::new();
    let mut lng = 0.0;
    for id in ids {
        store.add_pin(NewPin::at([lng, 0.0]).with_id(*id));
        lng += 1.0;
    }
    store
}

#[test]
fn add_pin_generates_uuid_and_preserves_order() {
    let mut store = AnnotationStore::new();
    let a = store.add_pin(NewPin::at([-77.6, 43.1]).with_title("A"));
    let b = store.add_pin(NewPin::at([-77.5, 43.2]));

    assert!(Uuid::parse_str(&a.id).is_ok());
    assert_ne!(a.id, b.id);
    assert_eq!(store.pins().len(), 2);
    assert_eq!(store.pins()[0].title.as_deref(), Some("A"));
    assert_eq!(store.pins()[1].id, b.id);
}

#[test]
fn add_pin_keeps_supplied_id() {
    let mut store = AnnotationStore::new();
    let pin = store.add_pin(NewPin::at([1.0, 2.0]).with_id("p1").with_color("#fff"));
    assert_eq!(pin.id, "p1");
    assert_eq!(store.pin("p1").and_then(|p| p.color.as_deref()), Some("#fff"));
}

#[test]
fn add_pin_with_blank_id_generates_one() {
    let mut store = AnnotationStore::new();
    let pin = store.add_pin(NewPin::at([0.0, 0.0]).with_id(""));
    assert!(!pin.id.is_empty());
}

#[test]
fn add_pin_with_existing_id_replaces_in_place() {
    let mut store = store_with(&["a", "b", "c"]);
    store.add_pin(NewPin::at([9.0, 9.0]).with_id("b").with_title("B2"));
    assert_eq!(store.len(), 3);
    assert_eq!(store.pins()[1].id, "b");
    assert_eq!(store.pins()[1].coordinates, [9.0, 9.0]);
    assert_eq!(store.pins()[1].title.as_deref(), Some("B2"));
}

#[test]
fn update_pin_merges_patch() {
    let mut store = store_with(&["a"]);
    let updated = store.update_pin("a", PinPatch { title: Some("Cafe".into()), ..PinPatch::default() }).unwrap();
    assert_eq!(updated.title.as_deref(), Some("Cafe"));
    assert_eq!(updated.coordinates, [0.0, 0.0]);
}

#[test]
fn update_unknown_pin_is_noop() {
    let mut store = store_with(&["a"]);
    assert!(store.update_pin("zzz", PinPatch::default()).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn delete_endpoint_clears_route() {
    let mut store = store_with(&["a", "b", "c"]);
    assert!(store.set_route(Some(route_between("a", "b"))));

    let deleted = store.delete_pin("b").unwrap();
    assert!(deleted.route_cleared);
    assert!(store.route().is_none());
    assert_eq!(store.len(), 2);
}

#[test]
fn delete_unrelated_pin_keeps_route() {
    let mut store = store_with(&["a", "b", "c"]);
    store.set_route(Some(route_between("a", "b")));
    let deleted = store.delete_pin("c").unwrap();
    assert!(!deleted.route_cleared);
    assert!(store.route().is_some());
}

#[test]
fn delete_clears_route_every_time_it_is_referenced() {
    let mut store = store_with(&["a", "b", "c"]);
    store.set_route(Some(route_between("a", "b")));
    store.delete_pin("a");
    assert!(store.route().is_none());

    store.set_route(Some(route_between("b", "c")));
    store.delete_pin("c");
    assert!(store.route().is_none());
}

#[test]
fn delete_selected_pin_clears_selection() {
    let mut store = store_with(&["a", "b"]);
    store.select_pin(Some("a"));
    let deleted = store.delete_pin("a").unwrap();
    assert!(deleted.selection_cleared);
    assert!(store.selected().is_none());
}

#[test]
fn delete_unknown_pin_is_noop() {
    let mut store = store_with(&["a"]);
    assert!(store.delete_pin("nope").is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn select_unknown_id_leaves_selection() {
    let mut store = store_with(&["a"]);
    assert!(store.select_pin(Some("a")));
    assert!(!store.select_pin(Some("ghost")));
    assert_eq!(store.selected(), Some("a"));
}

#[test]
fn select_none_clears_and_reports_change() {
    let mut store = store_with(&["a"]);
    assert!(!store.select_pin(None));
    store.select_pin(Some("a"));
    assert!(!store.select_pin(Some("a")));
    assert!(store.select_pin(None));
    assert!(store.selected().is_none());
}

#[test]
fn clear_pins_resets_everything() {
    let mut store = store_with(&["a", "b"]);
    store.select_pin(Some("a"));
    store.set_route(Some(route_between("a", "b")));
    store.clear_pins();
    assert!(store.is_empty());
    assert!(store.selected().is_none());
    assert!(store.route().is_none());
}

#[test]
fn set_route_refuses_dangling_endpoint() {
    let mut store = store_with(&["a"]);
    assert!(!store.set_route(Some(route_between("a", "missing"))));
    assert!(store.route().is_none());
}

#[test]
fn set_route_accepts_route_without_ids() {
    let mut store = AnnotationStore::new();
    assert!(store.set_route(Some(Route::default())));
    assert!(store.clear_route());
    assert!(!store.clear_route());
}

#[test]
fn last_two_in_insertion_order() {
    assert!(store_with(&[]).last_two().is_none());
    assert!(store_with(&["a"]).last_two().is_none());
    let store = store_with(&["a", "b", "c"]);
    let (from, to) = store.last_two().unwrap();
    assert_eq!((from.id.as_str(), to.id.as_str()), ("b", "c"));
}

fn assert_consistent(store: &AnnotationStore, step: usize) {
    let ids: HashSet<&str> = store.pins().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), store.len(), "duplicate pin id after step {step}");
    if let Some(selected) = store.selected() {
        assert!(ids.contains(selected), "selection names a missing pin after step {step}");
    }
    if let Some(route) = store.route() {
        for id in [&route.properties.from_id, &route.properties.to_id].into_iter().flatten() {
            assert!(ids.contains(id.as_str()), "route names a missing pin after step {step}");
        }
    }
}

#[test]
fn random_mixed_sequences_keep_ids_unique() {
    const POOL: [&str; 6] = ["p0", "p1", "p2", "p3", "p4", "p5"];

    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut store = AnnotationStore::new();

        for step in 0..400 {
            let id = POOL[rng.random_range(0..POOL.len())];
            let at = [f64::from(rng.random_range(0..360u32)) - 180.0, f64::from(rng.random_range(0..180u32)) - 90.0];
            match rng.random_range(0..8) {
                0 => {
                    store.add_pin(NewPin::at(at));
                }
                1 | 2 => {
                    store.add_pin(NewPin::at(at).with_id(id));
                }
                3 => {
                    store.update_pin(id, PinPatch { coordinates: Some(at), ..PinPatch::default() });
                }
                4 => {
                    store.delete_pin(id);
                }
                5 => {
                    store.select_pin(Some(id));
                }
                6 => {
                    let other = POOL[rng.random_range(0..POOL.len())];
                    store.set_route(Some(route_between(id, other)));
                }
                _ => {
                    if rng.random_bool(0.1) {
                        store.clear_pins();
                    } else if let Some(pin) = store.pins().first().map(|p| p.id.clone()) {
                        store.delete_pin(&pin);
                    }
                }
            }
            assert_consistent(&store, step);
        }
    }
}
