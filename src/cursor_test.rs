use super::*;

#[derive(Debug, Default)]
struct RecordingLayer {
    next: u32,
    live: HashMap<u32, (String, MarkerStyle, LngLat)>,
    moves: usize,
}

impl MarkerLayer for RecordingLayer {
    type Handle = u32;

    fn create_marker(&mut self, session_id: &str, style: &MarkerStyle, position: LngLat) -> u32 {
        self.next += 1;
        self.live.insert(self.next, (session_id.to_owned(), style.clone(), position));
        self.next
    }

    fn move_marker(&mut self, handle: &mut u32, position: LngLat) {
        self.moves += 1;
        if let Some(entry) = self.live.get_mut(handle) {
            entry.2 = position;
        }
    }

    fn remove_marker(&mut self, handle: u32) {
        self.live.remove(&handle);
    }
}

fn tracker() -> RemoteCursorTracker<RecordingLayer> {
    RemoteCursorTracker::new(RecordingLayer::default(), ColorRegistry::default())
}

fn sample(sid: &str, lng: f64, lat: f64) -> CursorSample {
    CursorSample { session_id: sid.into(), lng, lat, participant: None, color: None }
}

fn style_of<'a>(t: &'a RemoteCursorTracker<RecordingLayer>, sid: &str) -> &'a MarkerStyle {
    &t.layer().live.values().find(|(s, _, _)| s == sid).unwrap().1
}

#[test]
fn first_sample_creates_marker_then_moves_it() {
    let mut t = tracker();
    assert_eq!(t.on_cursor_sample(sample("s1", 1.0, 2.0)), CursorUpdate::Created);
    assert_eq!(t.on_cursor_sample(sample("s1", 3.0, 4.0)), CursorUpdate::Moved);
    assert_eq!(t.len(), 1);
    assert_eq!(t.layer().live.len(), 1);
    assert_eq!(t.layer().moves, 1);
    assert_eq!(t.last_position("s1"), Some([3.0, 4.0]));
}

#[test]
fn local_session_never_gets_a_marker() {
    let mut t = tracker();
    t.set_local_session(Some("me".into()));
    assert_eq!(t.on_cursor_sample(sample("me", 1.0, 1.0)), CursorUpdate::Ignored);
    assert!(t.is_empty());
    assert!(t.layer().live.is_empty());
}

#[test]
fn setting_local_session_drops_existing_marker_for_it() {
    let mut t = tracker();
    t.on_cursor_sample(sample("me", 1.0, 1.0));
    t.set_local_session(Some("me".into()));
    assert!(t.is_empty());
    assert!(t.layer().live.is_empty());
}

#[test]
fn blank_or_non_finite_samples_are_ignored() {
    let mut t = tracker();
    assert_eq!(t.on_cursor_sample(sample("", 1.0, 1.0)), CursorUpdate::Ignored);
    assert_eq!(t.on_cursor_sample(sample("s1", f64::NAN, 1.0)), CursorUpdate::Ignored);
    assert_eq!(t.on_cursor_sample(sample("s1", 1.0, f64::INFINITY)), CursorUpdate::Ignored);
    assert!(t.is_empty());
}

#[test]
fn missing_participant_uses_placeholder_initials() {
    let mut t = tracker();
    t.on_cursor_sample(sample("s1", 0.0, 0.0));
    assert_eq!(style_of(&t, "s1").initials, "??");
}

#[test]
fn color_precedence_sample_then_participant_then_registry() {
    let mut t = tracker();

    let mut s = sample("a", 0.0, 0.0);
    s.color = Some("#ABCDEF".into());
    s.participant = Some(Participant { color: Some("#000000".into()), ..Participant::new("a", "AA") });
    t.on_cursor_sample(s);
    assert_eq!(style_of(&t, "a").color, "#abcdef");
    assert_eq!(style_of(&t, "a").initials, "AA");

    let mut s = sample("b", 0.0, 0.0);
    s.participant = Some(Participant { color: Some("#123456".into()), ..Participant::new("b", "BB") });
    t.on_cursor_sample(s);
    assert_eq!(style_of(&t, "b").color, "#123456");

    t.on_cursor_sample(sample("c", 0.0, 0.0));
    assert_eq!(style_of(&t, "c").color, DEFAULT_FIRST);
    assert_eq!(t.colors().peek("c"), Some(DEFAULT_FIRST));
}

const DEFAULT_FIRST: &str = crate::color::DEFAULT_PALETTE[0];

#[test]
fn moved_sample_keeps_previous_participant_when_absent() {
    let mut t = tracker();
    let mut s = sample("s1", 0.0, 0.0);
    s.participant = Some(Participant::new("u1", "JD"));
    t.on_cursor_sample(s);
    t.on_cursor_sample(sample("s1", 1.0, 1.0));
    assert_eq!(t.participant("s1").map(|p| p.initials.as_str()), Some("JD"));
}

#[test]
fn participant_left_removes_marker_and_releases_color() {
    let mut t = tracker();
    t.on_cursor_sample(sample("s1", 0.0, 0.0));
    assert!(t.colors().contains("s1"));

    assert!(t.on_participant_left("s1"));
    assert!(t.layer().live.is_empty());
    assert!(!t.colors().contains("s1"));
    assert!(t.last_position("s1").is_none());

    // idempotent
    assert!(!t.on_participant_left("s1"));
}

#[test]
fn dispose_clears_everything() {
    let mut t = tracker();
    t.on_cursor_sample(sample("s1", 0.0, 0.0));
    t.on_cursor_sample(sample("s2", 0.0, 0.0));
    t.dispose();
    assert!(t.is_empty());
    assert!(t.layer().live.is_empty());
    assert_eq!(t.colors().assigned(), 0);
}

#[test]
fn last_write_wins_even_when_out_of_order() {
    let mut t = tracker();
    t.on_cursor_sample(sample("s1", 5.0, 5.0));
    // an older position delivered late still overwrites
    t.on_cursor_sample(sample("s1", 1.0, 1.0));
    assert_eq!(t.last_position("s1"), Some([1.0, 1.0]));
}

#[test]
fn tracing_layer_returns_session_handle() {
    let mut layer = TracingMarkerLayer;
    let style = MarkerStyle { initials: "AB".into(), color: "#ffffff".into() };
    let mut handle = layer.create_marker("s1", &style, [0.0, 0.0]);
    layer.move_marker(&mut handle, [1.0, 1.0]);
    assert_eq!(handle, "s1");
    layer.remove_marker(handle);
}
