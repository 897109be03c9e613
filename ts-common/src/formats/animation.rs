//! Animation clips stored in the TSMODL container
//!
//! # Layout
//! ```text
//! frame_count i32, frame_rate i32
//! node_count i32
//!   name string
//!   controller_count i32
//!     kind u8 (0 = linear position, 1 = TCB rotation)
//!     key_count i32
//!       frame i32, kind u8 (0 = linear, 1 = slerp, 2 = TCB), payload
//! ```
//!
//! Payloads: linear 3 × f32; slerp 4 × f32 (x, y, z, w); TCB 4 × f32 followed
//! by tension, continuity, bias, ease-in and ease-out as f32.

use glam::{Quat, Vec3};

/// TCB spline rotation key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TcbKey {
    pub frame: i32,
    pub rotation: Quat,
    pub tension: f32,
    pub continuity: f32,
    pub bias: f32,
    pub ease_in: f32,
    pub ease_out: f32,
}

/// A single keyframe. Rotation controllers may mix slerp and TCB keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Keyframe {
    Linear { frame: i32, position: Vec3 },
    Slerp { frame: i32, rotation: Quat },
    Tcb(TcbKey),
}

impl Keyframe {
    pub const KIND_LINEAR: u8 = 0;
    pub const KIND_SLERP: u8 = 1;
    pub const KIND_TCB: u8 = 2;

    pub fn frame(&self) -> i32 {
        match self {
            Self::Linear { frame, .. } | Self::Slerp { frame, .. } => *frame,
            Self::Tcb(key) => key.frame,
        }
    }

    pub fn kind(&self) -> u8 {
        match self {
            Self::Linear { .. } => Self::KIND_LINEAR,
            Self::Slerp { .. } => Self::KIND_SLERP,
            Self::Tcb(_) => Self::KIND_TCB,
        }
    }

    /// Rotation carried by slerp and TCB keys
    pub fn rotation(&self) -> Option<Quat> {
        match self {
            Self::Linear { .. } => None,
            Self::Slerp { rotation, .. } => Some(*rotation),
            Self::Tcb(key) => Some(key.rotation),
        }
    }
}

/// Animation channel driving one property of a node
#[derive(Debug, Clone, PartialEq)]
pub enum Controller {
    LinearPosition(Vec<Keyframe>),
    TcbRotation(Vec<Keyframe>),
}

impl Controller {
    pub const KIND_LINEAR_POSITION: u8 = 0;
    pub const KIND_TCB_ROTATION: u8 = 1;

    pub fn kind(&self) -> u8 {
        match self {
            Self::LinearPosition(_) => Self::KIND_LINEAR_POSITION,
            Self::TcbRotation(_) => Self::KIND_TCB_ROTATION,
        }
    }

    pub fn keys(&self) -> &[Keyframe] {
        match self {
            Self::LinearPosition(keys) | Self::TcbRotation(keys) => keys,
        }
    }

    pub fn from_kind(kind: u8, keys: Vec<Keyframe>) -> Option<Self> {
        match kind {
            Self::KIND_LINEAR_POSITION => Some(Self::LinearPosition(keys)),
            Self::KIND_TCB_ROTATION => Some(Self::TcbRotation(keys)),
            _ => None,
        }
    }
}

/// Controllers targeting one hierarchy node (by name)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationNode {
    pub name: String,
    pub controllers: Vec<Controller>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationClip {
    pub frame_count: i32,
    pub frame_rate: i32,
    pub nodes: Vec<AnimationNode>,
}

impl AnimationClip {
    pub fn controller_count(&self) -> usize {
        self.nodes.iter().map(|n| n.controllers.len()).sum()
    }
}
