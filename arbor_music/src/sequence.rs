// Timed note-event sequence: the composer's output.
//
// A `Sequence` is a set of independent `Track`s sharing one tick resolution.
// Each note becomes a note-on and a matching note-off at absolute tick
// offsets. Tracks keep their events ordered by tick as they are inserted
// (events at the same tick stay in insertion order), so a phrase that runs
// long and overlaps the next one still yields a time-ordered track.
//
// This is the boundary to the outside world: midi.rs serializes it, and any
// player can consume it.

use serde::{Deserialize, Serialize};

/// Ticks in a quarter note in the reference profile.
pub const TICKS_PER_QUARTER: u32 = 8;

/// Ticks in a 4/4 bar in the reference profile.
pub const TICKS_PER_BAR: u32 = TICKS_PER_QUARTER * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteEventKind {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Absolute position in ticks.
    pub tick: u32,
    pub kind: NoteEventKind,
    /// MIDI key number (0-127).
    pub key: u8,
    pub velocity: u8,
}

/// One voice's events, ordered by tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    events: Vec<NoteEvent>,
}

impl Track {
    pub fn new() -> Self {
        Track::default()
    }

    /// Add a note-on at `start` and a note-off at `start + duration`.
    pub fn add_note(&mut self, start: u32, duration: u32, key: u8, velocity: u8) {
        self.insert(NoteEvent {
            tick: start,
            kind: NoteEventKind::On,
            key,
            velocity,
        });
        self.insert(NoteEvent {
            tick: start + duration,
            kind: NoteEventKind::Off,
            key,
            velocity,
        });
    }

    /// Insert after every event at or before the same tick.
    fn insert(&mut self, event: NoteEvent) {
        let at = self.events.partition_point(|e| e.tick <= event.tick);
        self.events.insert(at, event);
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// Number of notes (note-on events).
    pub fn note_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == NoteEventKind::On)
            .count()
    }

    /// Tick of the last event, or 0 for an empty track.
    pub fn end_tick(&self) -> u32 {
        self.events.last().map_or(0, |e| e.tick)
    }

    pub fn is_monotonic(&self) -> bool {
        self.events.windows(2).all(|w| w[0].tick <= w[1].tick)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    ticks_per_quarter: u32,
    tracks: Vec<Track>,
}

impl Sequence {
    pub fn new(ticks_per_quarter: u32) -> Self {
        Sequence {
            ticks_per_quarter,
            tracks: Vec::new(),
        }
    }

    /// A sequence with `count` empty tracks.
    pub fn with_tracks(ticks_per_quarter: u32, count: usize) -> Self {
        let mut sequence = Sequence::new(ticks_per_quarter);
        for _ in 0..count {
            sequence.create_track();
        }
        sequence
    }

    pub fn ticks_per_quarter(&self) -> u32 {
        self.ticks_per_quarter
    }

    /// Append an empty track and return its index.
    pub fn create_track(&mut self) -> usize {
        self.tracks.push(Track::new());
        self.tracks.len() - 1
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    /// Tick of the last event across all tracks.
    pub fn end_tick(&self) -> u32 {
        self.tracks.iter().map(Track::end_tick).max().unwrap_or(0)
    }
}
