//! Animation transcoding
//!
//! Maps shape animation blocks 1:1 onto [`AnimationClip`]s. Controller kinds
//! other than TCB rotation become linear position controllers.

use ts_common::{AnimationClip, AnimationNode, Controller, Keyframe, TcbKey};

use crate::shape::{ShapeAnimNode, ShapeAnimation, ShapeController, ShapeKey};

pub fn transcode_animations(animations: &[ShapeAnimation]) -> Vec<AnimationClip> {
    animations.iter().map(transcode_clip).collect()
}

pub fn transcode_clip(animation: &ShapeAnimation) -> AnimationClip {
    AnimationClip {
        frame_count: animation.frame_count,
        frame_rate: animation.frame_rate,
        nodes: animation.nodes.iter().map(transcode_node).collect(),
    }
}

fn transcode_node(node: &ShapeAnimNode) -> AnimationNode {
    AnimationNode {
        name: node.name.clone(),
        controllers: node.controllers.iter().map(transcode_controller).collect(),
    }
}

pub fn transcode_controller(controller: &ShapeController) -> Controller {
    match controller {
        ShapeController::TcbRotation(keys) => Controller::TcbRotation(transcode_keys(keys)),
        ShapeController::LinearPosition(keys) => Controller::LinearPosition(transcode_keys(keys)),
        ShapeController::Other { kind, keys } => {
            tracing::debug!("Controller '{}' stored as linear position", kind);
            Controller::LinearPosition(transcode_keys(keys))
        }
    }
}

fn transcode_keys(keys: &[ShapeKey]) -> Vec<Keyframe> {
    keys.iter().map(transcode_key).collect()
}

pub fn transcode_key(key: &ShapeKey) -> Keyframe {
    match *key {
        ShapeKey::Slerp { frame, rotation } => Keyframe::Slerp { frame, rotation },
        ShapeKey::Tcb {
            frame,
            rotation,
            tension,
            continuity,
            bias,
            ease_in,
            ease_out,
        } => Keyframe::Tcb(TcbKey {
            frame,
            rotation,
            tension,
            continuity,
            bias,
            ease_in,
            ease_out,
        }),
        ShapeKey::Linear { frame, position } => Keyframe::Linear { frame, position },
    }
}
