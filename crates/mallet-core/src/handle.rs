//! Envelope handles returned by sound generators.

use crate::node::{GainNode, SourceNode};

/// One sounding voice: the gain stage its envelope runs on and the source
/// that produces it. Either may be absent.
#[derive(Debug, Clone, Default)]
pub struct VoiceHandle {
    pub gain: Option<GainNode>,
    pub source: Option<SourceNode>,
}

impl VoiceHandle {
    pub fn new(gain: GainNode, source: SourceNode) -> Self {
        Self {
            gain: Some(gain),
            source: Some(source),
        }
    }

    pub fn gain_only(gain: GainNode) -> Self {
        Self {
            gain: Some(gain),
            source: None,
        }
    }

    pub fn source_only(source: SourceNode) -> Self {
        Self {
            gain: None,
            source: Some(source),
        }
    }

    /// True once the source has finished. A handle with no source never
    /// finishes on its own.
    pub fn is_finished(&self) -> bool {
        self.source.as_ref().is_some_and(SourceNode::is_finished)
    }
}
