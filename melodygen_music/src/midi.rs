// MIDI import and export for melodies.
//
// Import reads a Standard MIDI File and takes the first track that contains
// any notes. Note-on/note-off pairs become `Note`s (a note-on with velocity
// 0 counts as a note-off), tick times convert to seconds using the first
// tempo event of track 0 (120 BPM if there is none), and velocities scale
// from 0..=127 to 0..=1.
//
// Export writes SMF Format 1: a tempo track fixed at 120 BPM and a single
// note track. Onsets and durations in seconds are doubled into quarter
// lengths, which at 120 BPM places every note back at its original time.
//
// Uses the `midly` crate. The engine never calls this module; only the CLI
// does.

use std::collections::HashMap;
use std::path::Path;

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};

use crate::error::{MelodyError, Result};
use crate::note::{Melody, Note, sort_by_onset};

/// Microseconds per quarter note assumed when a file has no tempo event.
const DEFAULT_TEMPO: u32 = 500_000;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Quarter lengths per second of melody time on export.
const QUARTERS_PER_SECOND: f64 = 2.0;

/// Read a MIDI file from disk. A file without notes is an error.
pub fn read_midi_file(path: &Path) -> Result<Melody> {
    let bytes = std::fs::read(path)?;
    let melody = read_melody(&bytes)?;
    if melody.is_empty() {
        return Err(MelodyError::NoNotes(path.display().to_string()));
    }
    Ok(melody)
}

/// Parse an in-memory SMF into a melody sorted by onset. Returns an empty
/// melody if no track has notes.
pub fn read_melody(bytes: &[u8]) -> Result<Melody> {
    let smf = Smf::parse(bytes)?;

    let tempo = smf
        .tracks
        .first()
        .and_then(|track| {
            track.iter().find_map(|event| match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
                _ => None,
            })
        })
        .unwrap_or(DEFAULT_TEMPO);

    let seconds_per_tick = match smf.header.timing {
        Timing::Metrical(tpq) => tempo as f64 / 1_000_000.0 / tpq.as_int().max(1) as f64,
        Timing::Timecode(fps, subframe) => {
            1.0 / (fps.as_f32() as f64 * subframe.max(1) as f64)
        }
    };

    for track in &smf.tracks {
        let mut notes = track_notes(track, seconds_per_tick);
        if !notes.is_empty() {
            sort_by_onset(&mut notes);
            return Ok(notes);
        }
    }
    Ok(Vec::new())
}

/// Pair note-ons with their note-offs. A repeated note-on for a sounding
/// key restarts it; unmatched note-offs and never-released notes are
/// dropped.
fn track_notes(track: &[TrackEvent<'_>], seconds_per_tick: f64) -> Melody {
    let mut active: HashMap<u8, (u64, u8)> = HashMap::new();
    let mut notes = Vec::new();
    let mut tick: u64 = 0;

    for event in track {
        tick += event.delta.as_int() as u64;
        let TrackEventKind::Midi { message, .. } = event.kind else {
            continue;
        };
        let key = match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                active.insert(key.as_int(), (tick, vel.as_int()));
                continue;
            }
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => key.as_int(),
            _ => continue,
        };
        if let Some((start, vel)) = active.remove(&key) {
            notes.push(Note {
                pitch: key as i32,
                onset: start as f64 * seconds_per_tick,
                duration: (tick - start) as f64 * seconds_per_tick,
                velocity: vel as f64 / 127.0,
            });
        }
    }
    notes
}

/// Convert a melody to MIDI and write it to a file.
pub fn write_midi(melody: &[Note], path: &Path) -> Result<()> {
    let smf = melody_to_smf(melody);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

fn seconds_to_ticks(seconds: f64) -> u32 {
    (seconds.max(0.0) * QUARTERS_PER_SECOND * TICKS_PER_QUARTER as f64).round() as u32
}

/// Convert a melody to an in-memory SMF. Pitches are clamped to 0..=127
/// and every note sounds with a velocity of at least 1.
pub fn melody_to_smf(melody: &[Note]) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let tempo_track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(DEFAULT_TEMPO))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ];
    smf.tracks.push(tempo_track);

    // Absolute-time events. At equal ticks, note-offs (false) sort before
    // note-ons (true) so a repeated pitch is released before it restarts.
    let mut events: Vec<(u32, bool, MidiMessage)> = Vec::with_capacity(melody.len() * 2);
    for note in melody {
        let key = u7::new(note.pitch.clamp(0, 127) as u8);
        let vel = u7::new((note.velocity * 127.0).clamp(1.0, 127.0) as u8);
        let start = seconds_to_ticks(note.onset);
        let end = start + seconds_to_ticks(note.duration);
        events.push((start, true, MidiMessage::NoteOn { key, vel }));
        events.push((
            end,
            false,
            MidiMessage::NoteOff {
                key,
                vel: u7::new(0),
            },
        ));
    }
    events.sort_by_key(|&(tick, is_on, _)| (tick, is_on));

    let mut track: Track<'static> = vec![TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Melody")),
    }];
    let mut last_tick = 0;
    for (tick, _, message) in events {
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        });
        last_tick = tick;
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);

    smf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(smf: &Smf<'_>) -> Vec<u8> {
        let mut buf = Vec::new();
        smf.write_std(&mut buf).unwrap();
        buf
    }

    fn note_event(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        }
    }

    #[test]
    fn test_export_then_import_preserves_timing() {
        let melody = vec![
            Note::new(60, 0.0, 0.5, 0.7),
            Note::new(64, 0.5, 0.25, 1.0),
            Note::new(67, 1.0, 1.0, 0.5),
        ];
        let smf = melody_to_smf(&melody);
        // Tempo track plus one note track.
        assert_eq!(smf.tracks.len(), 2);

        let back = read_melody(&encode(&smf)).unwrap();
        assert_eq!(back.len(), 3);
        for (a, b) in melody.iter().zip(&back) {
            assert_eq!(a.pitch, b.pitch);
            assert!((a.onset - b.onset).abs() < 1e-6);
            assert!((a.duration - b.duration).abs() < 1e-6);
            assert!((a.velocity - b.velocity).abs() < 1.0 / 127.0);
        }
    }

    #[test]
    fn test_repeated_pitch_is_released_first() {
        let melody = vec![Note::new(62, 0.0, 0.5, 0.7), Note::new(62, 0.5, 0.5, 0.7)];
        let back = read_melody(&encode(&melody_to_smf(&melody))).unwrap();
        assert_eq!(back.len(), 2);
        assert!((back[1].onset - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_import_uses_tempo_and_zero_velocity_note_off() {
        let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(480))));
        smf.tracks.push(vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(1_000_000))),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            },
        ]);
        smf.tracks.push(vec![
            note_event(480, MidiMessage::NoteOn { key: u7::new(72), vel: u7::new(127) }),
            // Note-on with velocity 0 releases the note.
            note_event(240, MidiMessage::NoteOn { key: u7::new(72), vel: u7::new(0) }),
        ]);
        let melody = read_melody(&encode(&smf)).unwrap();
        assert_eq!(melody.len(), 1);
        // 480 ticks at one second per quarter.
        assert!((melody[0].onset - 1.0).abs() < 1e-9);
        assert!((melody[0].duration - 0.5).abs() < 1e-9);
        assert_eq!(melody[0].velocity, 1.0);
    }

    #[test]
    fn test_first_track_with_notes_wins() {
        let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(480))));
        smf.tracks.push(Vec::new());
        smf.tracks.push(vec![
            note_event(0, MidiMessage::NoteOn { key: u7::new(60), vel: u7::new(64) }),
            note_event(480, MidiMessage::NoteOff { key: u7::new(60), vel: u7::new(0) }),
        ]);
        smf.tracks.push(vec![
            note_event(0, MidiMessage::NoteOn { key: u7::new(48), vel: u7::new(64) }),
            note_event(480, MidiMessage::NoteOff { key: u7::new(48), vel: u7::new(0) }),
        ]);
        let melody = read_melody(&encode(&smf)).unwrap();
        assert_eq!(melody.len(), 1);
        assert_eq!(melody[0].pitch, 60);
        // Default tempo: 480 ticks is half a second.
        assert!((melody[0].duration - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_export_clamps_pitch_and_negative_onset() {
        let melody = vec![Note::new(130, -0.1, 0.1, 0.0)];
        let back = read_melody(&encode(&melody_to_smf(&melody))).unwrap();
        assert_eq!(back[0].pitch, 127);
        assert_eq!(back[0].onset, 0.0);
        assert!(back[0].velocity > 0.0);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(read_melody(b"not a midi file"), Err(MelodyError::Midi(_))));
    }
}
