// MIDI output from note-event sequences.
//
// Converts a `Sequence` into a Standard MIDI File (SMF) for playback. Output
// is SMF Format 1: a tempo track first, then one named track per voice, all
// on channel 0. Timing is metrical at the sequence's own ticks per quarter,
// so no rescaling happens; absolute event ticks become delta times.
//
// Uses the `midly` crate for MIDI writing.

use crate::error::MidiError;
use crate::sequence::{NoteEventKind, Sequence, Track};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Track names, lowest voice first.
const VOICE_NAMES: [&str; 4] = ["Bass", "Tenor", "Alto", "Soprano"];

/// Encode a sequence as SMF bytes.
pub fn encode_midi(sequence: &Sequence, tempo_bpm: u32) -> Result<Vec<u8>, MidiError> {
    let smf = sequence_to_smf(sequence, tempo_bpm)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Encode a sequence and write it to a file.
pub fn write_midi(sequence: &Sequence, tempo_bpm: u32, path: &Path) -> Result<(), MidiError> {
    let buf = encode_midi(sequence, tempo_bpm)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// Convert a sequence to an in-memory SMF.
fn sequence_to_smf(sequence: &Sequence, tempo_bpm: u32) -> Result<Smf<'static>, MidiError> {
    let resolution = u16::try_from(sequence.ticks_per_quarter())
        .ok()
        .and_then(u15::try_from)
        .filter(|r| r.as_int() > 0)
        .ok_or(MidiError::Resolution(sequence.ticks_per_quarter()))?;
    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(resolution)));

    // Track 0: tempo
    let tempo = 60_000_000u32
        .checked_div(tempo_bpm)
        .and_then(u24::try_from)
        .ok_or(MidiError::Tempo(tempo_bpm))?;
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo)),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    for (index, track) in sequence.tracks().iter().enumerate() {
        smf.tracks.push(track_events(track, VOICE_NAMES.get(index).copied())?);
    }

    Ok(smf)
}

fn track_events(track: &Track, name: Option<&'static str>) -> Result<Vec<TrackEvent<'static>>, MidiError> {
    let channel = u4::new(0);
    let mut events = Vec::with_capacity(track.events().len() + 2);

    if let Some(name) = name {
        events.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
        });
    }

    let mut last_tick = 0;
    for event in track.events() {
        let delta = event.tick - last_tick;
        last_tick = event.tick;
        let key = u7::new(event.key);
        let vel = u7::new(event.velocity);
        let message = match event.kind {
            NoteEventKind::On => MidiMessage::NoteOn { key, vel },
            NoteEventKind::Off => MidiMessage::NoteOff { key, vel },
        };
        events.push(TrackEvent {
            delta: u28::try_from(delta).ok_or(MidiError::DeltaOverflow(delta))?,
            kind: TrackEventKind::Midi { channel, message },
        });
    }

    events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    Ok(events)
}
