use glam::{Quat, Vec3};
use std::collections::HashMap;

use super::component::{set_attributes, Attribute, Component, ComponentType};
use crate::signal::ChangeSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    /// Keyframes hold (in-tangent, value, out-tangent) triples.
    CubicSpline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
}

/// Keyframed values for one property of one entity. `output` holds one tuple
/// per keyframe, or three per keyframe for cubic splines.
#[derive(Debug, Clone)]
pub struct AnimationChannel {
    pub input: Vec<f32>,
    pub output: Vec<Vec<f32>>,
    pub interpolation: Interpolation,
    pub target: hecs::Entity,
    pub path: TargetPath,
}

impl AnimationChannel {
    pub fn end_time(&self) -> f32 {
        self.input.last().copied().unwrap_or(0.0)
    }

    fn sample_indices(&self, time: f32) -> Option<(usize, usize, f32)> {
        if self.input.is_empty() {
            return None;
        }

        if self.input.len() == 1 || time <= self.input[0] {
            return Some((0, 0, 0.0));
        }

        let last_index = self.input.len() - 1;
        if time >= self.input[last_index] {
            return Some((last_index, last_index, 0.0));
        }

        match self.input.binary_search_by(|probe| probe.total_cmp(&time)) {
            Ok(index) => Some((index, index, 0.0)),
            Err(upper) => {
                if upper == 0 || upper >= self.input.len() {
                    return None;
                }
                let lower = upper - 1;
                let span = self.input[upper] - self.input[lower];
                let factor = if span.abs() < f32::EPSILON {
                    0.0
                } else {
                    ((time - self.input[lower]) / span).clamp(0.0, 1.0)
                };
                Some((lower, upper, factor))
            }
        }
    }

    fn keyframe(&self, index: usize) -> Option<&[f32]> {
        let slot = match self.interpolation {
            Interpolation::CubicSpline => index * 3 + 1,
            _ => index,
        };
        self.output.get(slot).map(Vec::as_slice)
    }

    /// Value of the channel at `time`, clamped to the keyframe range.
    pub fn sample(&self, time: f32) -> Option<Vec<f32>> {
        let (lower, upper, factor) = self.sample_indices(time)?;
        let a = self.keyframe(lower)?;

        if lower == upper || self.interpolation == Interpolation::Step {
            return Some(a.to_vec());
        }
        let b = self.keyframe(upper)?;

        let value = match self.interpolation {
            Interpolation::CubicSpline => {
                let dt = self.input[upper] - self.input[lower];
                let out_tangent = self.output.get(lower * 3 + 2)?;
                let in_tangent = self.output.get(upper * 3)?;
                hermite(a, out_tangent, b, in_tangent, factor, dt)
            }
            _ if self.path == TargetPath::Rotation && a.len() == 4 && b.len() == 4 => {
                let qa = Quat::from_slice(a).normalize();
                let qb = Quat::from_slice(b).normalize();
                qa.slerp(qb, factor).normalize().to_array().to_vec()
            }
            _ => a.iter().zip(b).map(|(x, y)| x + (y - x) * factor).collect(),
        };
        Some(value)
    }
}

fn hermite(v0: &[f32], b0: &[f32], v1: &[f32], a1: &[f32], t: f32, dt: f32) -> Vec<f32> {
    let (t2, t3) = (t * t, t * t * t);
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    (0..v0.len().min(v1.len()))
        .map(|i| {
            let m0 = b0.get(i).copied().unwrap_or(0.0) * dt;
            let m1 = a1.get(i).copied().unwrap_or(0.0) * dt;
            h00 * v0[i] + h10 * m0 + h01 * v1[i] + h11 * m1
        })
        .collect()
}

/// Pose values sampled for one entity during a tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PoseUpdate {
    pub translation: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<Vec3>,
    pub weights: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<AnimationChannel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: 0.0,
            channels: Vec::new(),
        }
    }

    pub fn add_channel(&mut self, channel: AnimationChannel) {
        self.duration = self.duration.max(channel.end_time());
        self.channels.push(channel);
    }

    pub fn sample(&self, time: f32, updates: &mut HashMap<hecs::Entity, PoseUpdate>) {
        for channel in &self.channels {
            let Some(value) = channel.sample(time) else {
                continue;
            };
            let entry = updates.entry(channel.target).or_default();
            match channel.path {
                TargetPath::Translation if value.len() >= 3 => {
                    entry.translation = Some(Vec3::from_slice(&value))
                }
                TargetPath::Scale if value.len() >= 3 => entry.scale = Some(Vec3::from_slice(&value)),
                TargetPath::Rotation if value.len() >= 4 => {
                    entry.rotation = Some(Quat::from_slice(&value).normalize())
                }
                TargetPath::Weights => entry.weights = Some(value),
                _ => log::trace!(
                    "Channel {:?} on {:?} produced {} values, ignoring",
                    channel.path,
                    channel.target,
                    value.len()
                ),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationAttr {
    Clips(Vec<AnimationClip>),
    ActiveClip(usize),
    Time(f32),
    Speed(f32),
    Playing(bool),
    Looping(bool),
}

impl PartialEq for AnimationClip {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.duration == other.duration
            && self.channels.len() == other.channels.len()
    }
}

impl Attribute for AnimationAttr {
    fn name(&self) -> &'static str {
        match self {
            AnimationAttr::Clips(_) => "clips",
            AnimationAttr::ActiveClip(_) => "active_clip",
            AnimationAttr::Time(_) => "time",
            AnimationAttr::Speed(_) => "speed",
            AnimationAttr::Playing(_) => "playing",
            AnimationAttr::Looping(_) => "looping",
        }
    }
}

/// Playback of one clip out of a set, advanced by [`Scene::update`](super::Scene::update).
#[derive(Debug)]
pub struct Animation {
    clips: Vec<AnimationClip>,
    active_clip: usize,
    time: f32,
    speed: f32,
    playing: bool,
    looping: bool,
    pub changed: ChangeSignal,
}

impl Default for Animation {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Animation {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            active_clip: 0,
            time: 0.0,
            speed: 1.0,
            playing: true,
            looping: true,
            changed: ChangeSignal::new(),
        }
    }

    pub fn set(&mut self, attrs: impl IntoIterator<Item = AnimationAttr>) {
        set_attributes(self, attrs, Self::apply, |animation| &animation.changed);
    }

    fn apply(&mut self, attr: AnimationAttr) {
        match attr {
            AnimationAttr::Clips(clips) => self.clips = clips,
            AnimationAttr::ActiveClip(index) => {
                self.active_clip = index;
                self.time = 0.0;
            }
            AnimationAttr::Time(time) => self.time = time,
            AnimationAttr::Speed(speed) => self.speed = speed,
            AnimationAttr::Playing(playing) => self.playing = playing,
            AnimationAttr::Looping(looping) => self.looping = looping,
        }
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn active_clip(&self) -> Option<&AnimationClip> {
        self.clips.get(self.active_clip)
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Moves the playhead by `dt` seconds and returns the time to sample at.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if !self.playing {
            return self.time;
        }

        let duration = self.active_clip().map_or(0.0, |clip| clip.duration.max(0.0));
        let mut time = self.time + dt * self.speed;

        if duration > 0.0 {
            if self.looping {
                time = time.rem_euclid(duration);
            } else if time >= duration {
                time = duration;
                self.playing = false;
            } else if time < 0.0 {
                time = 0.0;
            }
        }

        self.time = time;
        time
    }

    /// Advances the playhead and samples the active clip into `updates`.
    pub fn tick(&mut self, dt: f32, updates: &mut HashMap<hecs::Entity, PoseUpdate>) {
        if self.clips.is_empty() {
            return;
        }
        let time = self.advance(dt);
        if let Some(clip) = self.active_clip() {
            clip.sample(time, updates);
        }
    }
}

impl Component for Animation {
    const TYPE: ComponentType = ComponentType::Animation;
}
