//! Integration tests for visibility-driven playback and per-player mute.

mod common;

use std::sync::Arc;

use vidwish_gallery::{GalleryError, IntersectionEntry, PlaybackAction, PlaybackCommand};

fn command(player: &str, action: PlaybackAction) -> PlaybackCommand {
    PlaybackCommand {
        player: player.to_string(),
        action,
    }
}

#[test]
fn visibility_playback_tests_mount_registers_each_player_at_half() {
    let (mut gallery, ids) = common::gallery(&["Alice", "Bob"]);
    let observer = Arc::new(common::RecordingObserver::default());
    gallery.mount(observer.clone()).expect("mount should succeed");

    let observed = observer.observed.lock().expect("lock should work").clone();
    assert_eq!(
        observed,
        vec![(ids[0].clone(), 0.5), (ids[1].clone(), 0.5)]
    );

    gallery.unmount();
    let disconnected = observer.disconnected.lock().expect("lock should work").clone();
    assert_eq!(disconnected, ids);
    assert!(!gallery.is_mounted());
}

#[test]
fn visibility_playback_tests_crossing_threshold_plays_then_pauses() {
    let (mut gallery, ids) = common::gallery(&["Alice"]);
    gallery
        .mount(Arc::new(common::RecordingObserver::default()))
        .expect("mount should succeed");
    let id = ids[0].as_str();

    assert!(gallery.on_intersection(&[IntersectionEntry::new(id, 0.3)]).is_empty());
    assert_eq!(
        gallery.on_intersection(&[IntersectionEntry::new(id, 0.5)]),
        vec![command(id, PlaybackAction::Play)]
    );
    assert!(gallery.on_intersection(&[IntersectionEntry::new(id, 0.8)]).is_empty());
    assert_eq!(
        gallery.on_intersection(&[IntersectionEntry::new(id, 0.49)]),
        vec![command(id, PlaybackAction::Pause)]
    );
}

#[test]
fn visibility_playback_tests_players_are_independent() {
    let (mut gallery, ids) = common::gallery(&["Alice", "Bob"]);
    gallery
        .mount(Arc::new(common::RecordingObserver::default()))
        .expect("mount should succeed");

    let commands = gallery.on_intersection(&[
        IntersectionEntry::new(&ids[0], 1.0),
        IntersectionEntry::new(&ids[1], 0.0),
    ]);
    assert_eq!(commands, vec![command(&ids[0], PlaybackAction::Play)]);

    let commands = gallery.on_intersection(&[
        IntersectionEntry::new(&ids[0], 0.2),
        IntersectionEntry::new(&ids[1], 0.7),
    ]);
    assert_eq!(
        commands,
        vec![
            command(&ids[0], PlaybackAction::Pause),
            command(&ids[1], PlaybackAction::Play)
        ]
    );
}

#[test]
fn visibility_playback_tests_unmount_pauses_playing_players() {
    let (mut gallery, ids) = common::gallery(&["Alice", "Bob"]);
    gallery
        .mount(Arc::new(common::RecordingObserver::default()))
        .expect("mount should succeed");
    gallery.on_intersection(&[IntersectionEntry::new(&ids[1], 0.9)]);

    assert_eq!(gallery.unmount(), vec![command(&ids[1], PlaybackAction::Pause)]);
    assert!(gallery.unmount().is_empty());
}

#[test]
fn visibility_playback_tests_mute_toggles_per_player() {
    let (mut gallery, ids) = common::gallery(&["Alice", "Bob"]);

    assert_eq!(
        gallery.toggle_mute(&ids[0]).expect("toggle should succeed"),
        command(&ids[0], PlaybackAction::SetMuted(false))
    );
    assert_eq!(gallery.mute_label(&ids[0]), Some("Mute"));
    assert_eq!(gallery.mute_label(&ids[1]), Some("Unmute"));

    assert_eq!(
        gallery.toggle_mute(&ids[0]).expect("toggle should succeed"),
        command(&ids[0], PlaybackAction::SetMuted(true))
    );
    assert_eq!(gallery.mute_label(&ids[0]), Some("Unmute"));

    assert!(matches!(
        gallery.toggle_mute("missing"),
        Err(GalleryError::UnknownPlayer(_))
    ));
}
