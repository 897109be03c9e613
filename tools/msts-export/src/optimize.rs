//! Constant controller removal
//!
//! A controller whose keys all carry the same payload as its first key does
//! not animate anything and is dropped. Consumers fall back to the node's
//! rest transform for channels without a controller.

use ts_common::{AnimationClip, Controller, Keyframe};

/// How rotation keys are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEquality {
    /// Rotation only; slerp and TCB keys with the same rotation are equal
    #[default]
    Rotation,
    /// TCB keys must also match tension, continuity, bias and easing
    RotationAndShape,
}

impl KeyEquality {
    pub fn from_config(compare_tcb_shape: bool) -> Self {
        if compare_tcb_shape {
            Self::RotationAndShape
        } else {
            Self::Rotation
        }
    }

    pub fn payload_eq(self, a: &Keyframe, b: &Keyframe) -> bool {
        match (a, b) {
            (Keyframe::Linear { position: pa, .. }, Keyframe::Linear { position: pb, .. }) => {
                pa == pb
            }
            (Keyframe::Linear { .. }, _) | (_, Keyframe::Linear { .. }) => false,
            (Keyframe::Tcb(ka), Keyframe::Tcb(kb)) if self == Self::RotationAndShape => {
                ka.rotation == kb.rotation
                    && ka.tension == kb.tension
                    && ka.continuity == kb.continuity
                    && ka.bias == kb.bias
                    && ka.ease_in == kb.ease_in
                    && ka.ease_out == kb.ease_out
            }
            (Keyframe::Slerp { .. }, Keyframe::Tcb(_)) | (Keyframe::Tcb(_), Keyframe::Slerp { .. })
                if self == Self::RotationAndShape =>
            {
                false
            }
            _ => a.rotation() == b.rotation(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerOptimizer {
    equality: KeyEquality,
}

impl ControllerOptimizer {
    pub fn new(equality: KeyEquality) -> Self {
        Self { equality }
    }

    /// True when every key matches the first one (always for 0 or 1 keys)
    pub fn is_constant(&self, controller: &Controller) -> bool {
        match controller.keys().split_first() {
            Some((first, rest)) => rest.iter().all(|key| self.equality.payload_eq(first, key)),
            None => true,
        }
    }

    /// Drop constant controllers from every node. Returns how many were removed.
    pub fn optimize(&self, clip: &mut AnimationClip) -> usize {
        let mut removed = 0;
        for node in &mut clip.nodes {
            let before = node.controllers.len();
            node.controllers.retain(|c| !self.is_constant(c));
            removed += before - node.controllers.len();
        }
        removed
    }

    pub fn optimize_all(&self, clips: &mut [AnimationClip]) -> usize {
        clips.iter_mut().map(|clip| self.optimize(clip)).sum()
    }
}
