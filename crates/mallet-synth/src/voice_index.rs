//! Active voice index shared by the note tracker and instrument registry.
//!
//! Maps a key to the handles of a sounding note and knows how to release
//! them. The tracker keys by generated identity and fades linearly; the
//! registry keys by `(instrument, pitch)` and fades exponentially. Both
//! curves stay distinct [`ReleasePolicy`] variants.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use mallet_core::{GainNode, VoiceHandle};
use tracing::{debug, warn};

use crate::generator::NoteHandle;

/// Gain level a release fades to.
pub const RELEASE_FLOOR: f32 = 0.001;

/// How a released note fades out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleasePolicy {
    /// Straight-line fade to `floor` over `release` seconds, then stop the
    /// source `stop_grace` seconds later.
    Linear {
        release: f64,
        floor: f32,
        stop_grace: f64,
    },
    /// Exponential fade to `floor` over `release` seconds. The source is
    /// left to its own scheduled stop.
    Exponential { release: f64, floor: f32 },
}

impl ReleasePolicy {
    pub const LINEAR_RELEASE: f64 = 0.12;
    pub const LINEAR_STOP_GRACE: f64 = 0.05;
    pub const EXPONENTIAL_RELEASE: f64 = 0.1;

    /// 0.12 s linear fade, source stopped 0.05 s after it ends.
    pub const fn linear() -> Self {
        ReleasePolicy::Linear {
            release: Self::LINEAR_RELEASE,
            floor: RELEASE_FLOOR,
            stop_grace: Self::LINEAR_STOP_GRACE,
        }
    }

    /// 0.1 s exponential fade.
    pub const fn exponential() -> Self {
        ReleasePolicy::Exponential {
            release: Self::EXPONENTIAL_RELEASE,
            floor: RELEASE_FLOOR,
        }
    }

    pub fn release_seconds(&self) -> f64 {
        match *self {
            ReleasePolicy::Linear { release, .. } | ReleasePolicy::Exponential { release, .. } => {
                release
            }
        }
    }

    /// Same curve with a different release time.
    pub fn with_release(self, seconds: f64) -> Self {
        match self {
            ReleasePolicy::Linear {
                floor, stop_grace, ..
            } => ReleasePolicy::Linear {
                release: seconds,
                floor,
                stop_grace,
            },
            ReleasePolicy::Exponential { floor, .. } => ReleasePolicy::Exponential {
                release: seconds,
                floor,
            },
        }
    }

    /// Fade one voice starting at audio time `now`.
    ///
    /// The source stop is scheduled even when the fade fails, so a voice
    /// whose gain is gone still ends. When both fail the fade error is
    /// logged and the stop error returned.
    pub fn apply(&self, voice: &VoiceHandle, now: f64) -> mallet_core::Result<()> {
        let faded = voice
            .gain
            .as_ref()
            .map_or(Ok(()), |gain| self.fade(gain, now));
        let stopped = match (*self, &voice.source) {
            (
                ReleasePolicy::Linear {
                    release,
                    stop_grace,
                    ..
                },
                Some(source),
            ) => source.stop(now + release + stop_grace),
            _ => Ok(()),
        };
        match (faded, stopped) {
            (Err(fade), Err(stop)) => {
                warn!(error = %fade, "Failed to fade voice");
                Err(stop)
            }
            (faded, stopped) => faded.and(stopped),
        }
    }

    /// Anchor the current value at `now`, then ramp to the floor.
    fn fade(&self, gain: &GainNode, now: f64) -> mallet_core::Result<()> {
        let current = gain.value_at(now);
        gain.cancel_scheduled_values(now)?;
        gain.set_value_at_time(current, now)?;
        match *self {
            ReleasePolicy::Linear { release, floor, .. } => {
                gain.linear_ramp_to_value_at_time(floor, now + release)
            }
            ReleasePolicy::Exponential { release, floor } => {
                gain.exponential_ramp_to_value_at_time(floor, now + release)
            }
        }
    }
}

impl Default for ReleasePolicy {
    fn default() -> Self {
        Self::linear()
    }
}

/// One sounding note.
#[derive(Debug, Clone)]
pub struct ActiveNote<M> {
    pub handle: NoteHandle,
    /// Audio-clock start time.
    pub started_at: f64,
    pub meta: M,
}

impl<M> ActiveNote<M> {
    pub fn new(handle: NoteHandle, started_at: f64, meta: M) -> Self {
        Self {
            handle,
            started_at,
            meta,
        }
    }
}

/// Key to [`ActiveNote`] map with a release policy.
#[derive(Debug)]
pub struct ActiveVoiceIndex<K, M> {
    notes: HashMap<K, ActiveNote<M>>,
    policy: ReleasePolicy,
}

impl<K, M> ActiveVoiceIndex<K, M>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(policy: ReleasePolicy) -> Self {
        Self {
            notes: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    /// Returns the entry it replaced, if any. The replaced note keeps
    /// sounding until its own scheduled end.
    pub fn insert(&mut self, key: K, note: ActiveNote<M>) -> Option<ActiveNote<M>> {
        self.notes.insert(key, note)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&ActiveNote<M>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.notes.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.notes.contains_key(key)
    }

    /// Drop an entry without touching its audio. Removing twice is fine.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<ActiveNote<M>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.notes.remove(key)
    }

    /// Remove `key` and fade it with the index's policy. Returns false if
    /// the key wasn't active.
    pub fn release<Q>(&mut self, key: &Q, now: f64) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.release_with(key, self.policy, now)
    }

    pub fn release_with<Q>(&mut self, key: &Q, policy: ReleasePolicy, now: f64) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.notes.remove_entry(key) {
            Some((key, note)) => {
                release_note(&key, &note, policy, now);
                true
            }
            None => false,
        }
    }

    /// Release every entry matching `pred`. Returns how many were released.
    pub fn release_where<F>(&mut self, policy: ReleasePolicy, now: f64, mut pred: F) -> usize
    where
        F: FnMut(&K, &ActiveNote<M>) -> bool,
    {
        let keys: Vec<K> = self
            .notes
            .iter()
            .filter(|(k, n)| pred(k, n))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            if let Some(note) = self.notes.remove(key) {
                release_note(key, &note, policy, now);
            }
        }
        keys.len()
    }

    /// Release everything with the index's policy.
    pub fn release_all(&mut self, now: f64) -> usize {
        let policy = self.policy;
        self.release_where(policy, now, |_, _| true)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Active keys, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.notes.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &ActiveNote<M>)> {
        self.notes.iter()
    }
}

/// A failing voice is logged and skipped; the rest still fade.
fn release_note<K: Debug, M>(key: &K, note: &ActiveNote<M>, policy: ReleasePolicy, now: f64) {
    for (i, voice) in note.handle.voices().iter().enumerate() {
        if let Err(e) = policy.apply(voice, now) {
            warn!(key = ?key, voice = i, error = %e, "Failed to release voice");
        }
    }
    debug!(key = ?key, voices = note.handle.len(), now, "Released note");
}
