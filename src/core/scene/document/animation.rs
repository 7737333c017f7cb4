//=========================================================================
// Document Animations
//=========================================================================
//
// Linear keyframe animations over shape geometry.
//
// `AnimationPlayer` owns the playhead and loop handling; it is shared by
// stand-alone animation scenes and by state-machine states that play an
// animation.
//
//=========================================================================

use std::sync::Arc;

use super::artboard::{ArtboardState, ShapePose};
use super::schema::{AnimationDef, LoopMode};
use crate::core::scene::view_model::ViewModelHandle;
use crate::core::scene::SceneInstance;

//=== AnimationPlayer =====================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnimationPlayer {
    index: usize,
    time: f32,
    direction: f32,
}

impl AnimationPlayer {
    pub fn new(index: usize) -> Self {
        Self { index, time: 0.0, direction: 1.0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    #[cfg(test)]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Moves the playhead. Returns false once a one-shot has finished.
    pub fn advance(&mut self, def: &AnimationDef, elapsed: f32) -> bool {
        let duration = def.duration;
        if duration <= 0.0 {
            self.time = 0.0;
            return def.loop_mode != LoopMode::OneShot;
        }

        match def.loop_mode {
            LoopMode::OneShot => {
                self.time = (self.time + elapsed).min(duration);
                self.time < duration
            }
            LoopMode::Loop => {
                self.time = (self.time + elapsed).rem_euclid(duration);
                true
            }
            LoopMode::PingPong => {
                let period = duration * 2.0;
                let travelled = if self.direction > 0.0 { self.time } else { period - self.time };
                let phase = (travelled + elapsed).rem_euclid(period);
                if phase <= duration {
                    self.time = phase;
                    self.direction = 1.0;
                } else {
                    self.time = period - phase;
                    self.direction = -1.0;
                }
                true
            }
        }
    }

    /// Writes every track at the current playhead into `pose`.
    pub fn apply(&self, def: &AnimationDef, pose: &mut [ShapePose]) {
        for track in &def.tracks {
            if let Some(shape) = pose.get_mut(track.shape) {
                shape.set(track.property, track.sample(self.time));
            }
        }
    }
}

//=== AnimationInstance ===================================================

pub(crate) struct AnimationInstance {
    artboard: Arc<ArtboardState>,
    player: AnimationPlayer,
    view_model: Option<ViewModelHandle>,
}

impl AnimationInstance {
    pub fn new(artboard: Arc<ArtboardState>, index: usize) -> Option<Self> {
        artboard.def().animations.get(index)?;
        Some(Self { artboard, player: AnimationPlayer::new(index), view_model: None })
    }
}

impl SceneInstance for AnimationInstance {
    fn name(&self) -> &str {
        &self.artboard.def().animations[self.player.index()].name
    }

    fn advance_and_apply(&mut self, elapsed: f32) -> bool {
        let def = &self.artboard.def().animations[self.player.index()];
        let running = self.player.advance(def, elapsed);
        self.player.apply(def, &mut self.artboard.pose());
        // Nothing in an animation listens for pulses; drop them so they
        // are not delivered late to a state machine activated afterwards.
        if let Some(vm) = &self.view_model {
            vm.lock().consume_triggers();
        }
        running
    }

    fn bind_view_model_instance(&mut self, view_model: ViewModelHandle) {
        self.view_model = Some(view_model);
    }

    fn bound_view_model(&self) -> Option<&ViewModelHandle> {
        self.view_model.as_ref()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::document::schema::{Document, KeyDef, ShapeProperty, TrackDef};
    use crate::core::scene::view_model::{ViewModelInstance, ViewModelProperty};

    fn def(loop_mode: LoopMode) -> AnimationDef {
        AnimationDef {
            name: "slide".into(),
            duration: 1.0,
            loop_mode,
            tracks: vec![TrackDef {
                shape: 0,
                property: ShapeProperty::X,
                keys: vec![KeyDef { time: 0.0, value: 0.0 }, KeyDef { time: 1.0, value: 10.0 }],
            }],
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn one_shot_stops_at_end() {
        let def = def(LoopMode::OneShot);
        let mut player = AnimationPlayer::new(0);
        assert!(player.advance(&def, 0.5));
        assert!(!player.advance(&def, 0.75));
        assert_eq!(player.time(), 1.0);
    }

    #[test]
    fn loop_wraps() {
        let def = def(LoopMode::Loop);
        let mut player = AnimationPlayer::new(0);
        player.advance(&def, 1.25);
        assert!(close(player.time(), 0.25));
    }

    #[test]
    fn ping_pong_reflects() {
        let def = def(LoopMode::PingPong);
        let mut player = AnimationPlayer::new(0);
        player.advance(&def, 1.25);
        assert!(close(player.time(), 0.75));
        player.advance(&def, 0.5);
        assert!(close(player.time(), 0.25));
        player.advance(&def, 0.5);
        assert!(close(player.time(), 0.25), "bounced off the start");
    }

    #[test]
    fn apply_writes_sampled_values() {
        let def = def(LoopMode::OneShot);
        let mut player = AnimationPlayer::new(0);
        player.advance(&def, 0.5);
        let mut pose = vec![ShapePose { x: 0.0, y: 0.0, width: 1.0, height: 1.0 }];
        player.apply(&def, &mut pose);
        assert_eq!(pose[0].x, 5.0);
    }

    #[test]
    fn advancing_consumes_view_model_pulses() {
        let doc: Document = serde_json::from_str(
            r#"{"artboards":[{"name":"A","width":10,"height":10,
                "shapes":[{"name":"dot","x":0,"y":0,"width":1,"height":1}],
                "animations":[{"name":"spin","duration":1,"loop":"loop","tracks":[]}]}]}"#,
        )
        .unwrap();
        doc.validate().unwrap();
        let state = Arc::new(ArtboardState::new(Arc::new(doc.artboards[0].clone())));
        let mut scene = AnimationInstance::new(state, 0).unwrap();
        let vm = ViewModelHandle::new(ViewModelInstance::new("Card", vec![ViewModelProperty::trigger("pulse")]));
        scene.bind_view_model_instance(vm.clone());

        assert!(vm.lock().fire_trigger("pulse"));
        assert_eq!(vm.lock().pending_triggers("pulse"), Some(1));
        assert!(scene.advance_and_apply(0.1));
        assert_eq!(vm.lock().pending_triggers("pulse"), Some(0));
    }
}
