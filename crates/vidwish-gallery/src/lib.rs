#![warn(missing_docs)]
//! # vidwish-gallery
//!
//! ## Purpose
//! Lists stored videos once and drives per-player autoplay from viewport
//! visibility.
//!
//! ## Responsibilities
//! - Read every metadata record in one bulk call ([`Gallery::load`]).
//! - Register each player with a [`VisibilityObserver`] on mount and
//!   disconnect it on unmount.
//! - Turn intersection callbacks into [`PlaybackCommand`]s, emitting a
//!   command only when a player crosses the visibility threshold.
//! - Keep one mute flag per player, muted by default.
//!
//! ## Data flow
//! [`RecordSource::list_all`] -> [`StoredVideo`] list -> [`Player`] per
//! video -> observer callbacks -> [`Gallery::on_intersection`] -> commands
//! applied by the host's video elements.
//!
//! ## Error model
//! A failed bulk read is [`GalleryError::Store`]. Records missing `name` or
//! `url` are skipped with a warning instead of failing the whole page.

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use vidwish_core::{StoredVideo, VIDEOS_COLLECTION, VideoRecord};
use vidwish_upload::{RecordSource, StoreError};

/// Fraction of a player's area that must be on screen for it to play.
pub const VISIBILITY_THRESHOLD: f64 = 0.5;

/// Button label shown while a player is muted.
pub const UNMUTE_LABEL: &str = "Unmute";

/// Button label shown while a player has sound.
pub const MUTE_LABEL: &str = "Mute";

/// Viewport-intersection capability supplied by the host.
pub trait VisibilityObserver: Send + Sync {
    /// Starts reporting intersection changes for `player` at `threshold`.
    fn observe(&self, player: &str, threshold: f64);

    /// Stops reporting for `player`.
    fn disconnect(&self, player: &str);
}

/// One observer callback entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry {
    /// Player id (the stored video id).
    pub player: String,
    /// Visible fraction of the player, `0.0..=1.0`.
    pub ratio: f64,
}

impl IntersectionEntry {
    /// Creates an entry.
    pub fn new(player: impl Into<String>, ratio: f64) -> Self {
        Self {
            player: player.into(),
            ratio,
        }
    }
}

/// Playback change the host applies to one video element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    /// Begin playback.
    Play,
    /// Pause playback.
    Pause,
    /// Set the muted flag.
    SetMuted(bool),
}

/// A [`PlaybackAction`] addressed to one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackCommand {
    /// Target player id.
    pub player: String,
    /// Action to apply.
    pub action: PlaybackAction,
}

/// Render state of one gallery entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    video: StoredVideo,
    muted: bool,
    visible: bool,
}

impl Player {
    fn new(video: StoredVideo) -> Self {
        Self {
            video,
            muted: true,
            visible: false,
        }
    }

    /// Player id.
    pub fn id(&self) -> &str {
        &self.video.id
    }

    /// Video shown by this player.
    pub fn video(&self) -> &StoredVideo {
        &self.video
    }

    /// Whether sound is off.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Whether the player is at or above the threshold and therefore playing.
    pub fn is_playing(&self) -> bool {
        self.visible
    }

    /// Mute button label for the current state.
    pub fn mute_label(&self) -> &'static str {
        if self.muted { UNMUTE_LABEL } else { MUTE_LABEL }
    }
}

/// Loaded gallery page.
pub struct Gallery {
    players: Vec<Player>,
    skipped: usize,
    threshold: f64,
    observer: Option<Arc<dyn VisibilityObserver>>,
}

impl Gallery {
    /// Reads every record of `collection` in store order.
    ///
    /// # Errors
    /// Returns [`GalleryError::Store`] when the bulk read fails.
    pub fn load(source: &dyn RecordSource, collection: &str) -> Result<Self, GalleryError> {
        let documents = source.list_all(collection)?;
        let total = documents.len();

        let mut players = Vec::with_capacity(total);
        for document in documents {
            match VideoRecord::from_document(&document.body) {
                Ok(record) => players.push(Player::new(StoredVideo::from_record(document.id, record))),
                Err(error) => warn!("gallery skipping record id={}: {error}", document.id),
            }
        }

        let skipped = total - players.len();
        info!(
            "gallery loaded collection={collection} videos={} skipped={skipped}",
            players.len()
        );
        Ok(Self {
            players,
            skipped,
            threshold: VISIBILITY_THRESHOLD,
            observer: None,
        })
    }

    /// Loads the default `videos` collection.
    ///
    /// # Errors
    /// Same as [`Gallery::load`].
    pub fn load_default(source: &dyn RecordSource) -> Result<Self, GalleryError> {
        Self::load(source, VIDEOS_COLLECTION)
    }

    /// Replaces the visibility threshold. Only allowed before mounting.
    ///
    /// # Errors
    /// Returns [`GalleryError::InvalidThreshold`] unless `0 < threshold <= 1`
    /// and [`GalleryError::AlreadyMounted`] after [`Gallery::mount`].
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, GalleryError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(GalleryError::InvalidThreshold(threshold));
        }
        if self.observer.is_some() {
            return Err(GalleryError::AlreadyMounted);
        }
        self.threshold = threshold;
        Ok(self)
    }

    /// Current visibility threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Players in store order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Looks up one player.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id() == id)
    }

    /// Number of records dropped for a missing `name` or `url`.
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    /// Whether the players are registered with an observer.
    pub fn is_mounted(&self) -> bool {
        self.observer.is_some()
    }

    /// Registers every player with `observer`.
    ///
    /// # Errors
    /// Returns [`GalleryError::AlreadyMounted`] when mounted twice.
    pub fn mount(&mut self, observer: Arc<dyn VisibilityObserver>) -> Result<(), GalleryError> {
        if self.observer.is_some() {
            return Err(GalleryError::AlreadyMounted);
        }
        for player in &self.players {
            observer.observe(player.id(), self.threshold);
        }
        debug!("gallery mounted players={}", self.players.len());
        self.observer = Some(observer);
        Ok(())
    }

    /// Disconnects every player and pauses the ones still playing.
    pub fn unmount(&mut self) -> Vec<PlaybackCommand> {
        let Some(observer) = self.observer.take() else {
            return Vec::new();
        };

        let mut commands = Vec::new();
        for player in &mut self.players {
            observer.disconnect(player.id());
            if player.visible {
                player.visible = false;
                commands.push(PlaybackCommand {
                    player: player.id().to_string(),
                    action: PlaybackAction::Pause,
                });
            }
        }
        debug!("gallery unmounted players={}", self.players.len());
        commands
    }

    /// Applies one observer callback.
    ///
    /// Entries for unknown players, or arriving while unmounted, are ignored.
    /// Within one callback only the last entry for a player counts.
    pub fn on_intersection(&mut self, entries: &[IntersectionEntry]) -> Vec<PlaybackCommand> {
        if self.observer.is_none() {
            return Vec::new();
        }

        let mut latest: Vec<(&str, f64)> = Vec::new();
        for entry in entries {
            match latest.iter_mut().find(|(id, _)| *id == entry.player) {
                Some(slot) => slot.1 = entry.ratio,
                None => latest.push((entry.player.as_str(), entry.ratio)),
            }
        }

        let threshold = self.threshold;
        let mut commands = Vec::new();
        for (id, ratio) in latest {
            let Some(player) = self.players.iter_mut().find(|player| player.id() == id) else {
                debug!("gallery ignoring entry for unknown player id={id}");
                continue;
            };

            let visible = ratio >= threshold;
            if visible == player.visible {
                continue;
            }
            player.visible = visible;
            commands.push(PlaybackCommand {
                player: id.to_string(),
                action: if visible {
                    PlaybackAction::Play
                } else {
                    PlaybackAction::Pause
                },
            });
        }
        commands
    }

    /// Flips the mute flag of one player.
    ///
    /// # Errors
    /// Returns [`GalleryError::UnknownPlayer`] for an id not on the page.
    pub fn toggle_mute(&mut self, id: &str) -> Result<PlaybackCommand, GalleryError> {
        let player = self
            .players
            .iter_mut()
            .find(|player| player.id() == id)
            .ok_or_else(|| GalleryError::UnknownPlayer(id.to_string()))?;
        player.muted = !player.muted;
        Ok(PlaybackCommand {
            player: id.to_string(),
            action: PlaybackAction::SetMuted(player.muted),
        })
    }

    /// Mute button label for one player.
    pub fn mute_label(&self, id: &str) -> Option<&'static str> {
        self.player(id).map(Player::mute_label)
    }
}

/// Gallery failures.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Bulk read failed.
    #[error("loading videos failed: {0}")]
    Store(#[from] StoreError),
    /// Threshold outside `(0, 1]`.
    #[error("visibility threshold {0} must be in (0, 1]")]
    InvalidThreshold(f64),
    /// Players are already registered with an observer.
    #[error("gallery is already mounted")]
    AlreadyMounted,
    /// No player with this id.
    #[error("no player with id {0}")]
    UnknownPlayer(String),
}
