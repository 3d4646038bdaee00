//! User intent: movement, turning and locomotion styles.
//!
//! The synthesizer talks to the player through the [`Controller`] trait.
//! [`InputController`] is a ready-made implementation driven by a set of
//! held keys, which is how a game loop or a test script feeds it.
//!
//! # Styles
//!
//! Each [`Style`] (idle, walk, run, ...) carries:
//! - activation keys, optionally negated, evaluated by [`Style::query`]
//! - a base `bias` scaling the target speed
//! - conditional [`Multiplier`]s applied to that bias while their trigger holds
//! - a `transition` rate used when blending trajectory style weights

use std::collections::BTreeSet;

use nalgebra::Vector2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Condition evaluated against the current input state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Trigger {
    /// Holds while the named key is down.
    Key(String),
    /// Holds while no key at all is down.
    NoInput,
}

impl Trigger {
    /// Shorthand for [`Trigger::Key`].
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key(name.into())
    }
}

/// Activation key of a style.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleKey {
    pub trigger: Trigger,
    /// A negated key suppresses the style while it holds.
    pub negation: bool,
}

/// Scales a style's bias while its trigger is active.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Multiplier {
    pub trigger: Trigger,
    /// A negated multiplier is active while its trigger does NOT hold.
    pub negation: bool,
    pub value: f32,
}

/// A named locomotion mode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Style {
    pub name: String,
    pub keys: Vec<StyleKey>,
    pub bias: f32,
    pub transition: f32,
    pub multipliers: Vec<Multiplier>,
}

impl Style {
    /// Create a style with no keys, unit bias and a 0.25 transition rate.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            bias: 1.0,
            transition: 0.25,
            multipliers: Vec::new(),
        }
    }

    /// Add an activation key.
    #[must_use]
    pub fn with_key(mut self, trigger: Trigger) -> Self {
        self.keys.push(StyleKey {
            trigger,
            negation: false,
        });
        self
    }

    /// Add a key that suppresses the style.
    #[must_use]
    pub fn with_negated_key(mut self, trigger: Trigger) -> Self {
        self.keys.push(StyleKey {
            trigger,
            negation: true,
        });
        self
    }

    #[must_use]
    pub const fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    #[must_use]
    pub const fn with_transition(mut self, transition: f32) -> Self {
        self.transition = transition;
        self
    }

    /// Add a bias multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, trigger: Trigger, value: f32, negation: bool) -> Self {
        self.multipliers.push(Multiplier {
            trigger,
            negation,
            value,
        });
        self
    }

    /// Activation in `{0, 1}` for the current input state.
    ///
    /// Any held non-negated key activates the style; any held negated key
    /// then deactivates it. A style without keys is never active.
    pub fn query(&self, is_held: impl Fn(&Trigger) -> bool) -> f32 {
        let mut activation = 0.0;
        if self.keys.iter().any(|k| !k.negation && is_held(&k.trigger)) {
            activation = 1.0;
        }
        if self.keys.iter().any(|k| k.negation && is_held(&k.trigger)) {
            activation = 0.0;
        }
        activation
    }

    /// Effective bias under the currently active multipliers.
    ///
    /// With no active multiplier this is the base bias. Otherwise it is the
    /// minimum over active multipliers of `bias * value`, capped by the
    /// maximum single `bias * value`.
    pub fn effective_bias(&self, is_held: impl Fn(&Trigger) -> bool) -> f32 {
        let mut min: Option<f32> = None;
        let mut max: Option<f32> = None;
        for m in &self.multipliers {
            if is_held(&m.trigger) == m.negation {
                continue;
            }
            let scaled = self.bias * m.value;
            min = Some(min.map_or(scaled, |v| v.min(scaled)));
            max = Some(max.map_or(scaled, |v| v.max(scaled)));
        }
        match (min, max) {
            (Some(min), Some(max)) => min.min(max),
            _ => self.bias,
        }
    }
}

/// Source of user intent for one character.
pub trait Controller {
    /// Planar movement request; `x` is sideways, `y` is forward.
    fn query_move(&self) -> Vector2<f32>;

    /// Turn request in `[-1, 1]`.
    fn query_turn(&self) -> f32;

    /// Style definitions; their count is fixed for the controller's lifetime.
    fn styles(&self) -> &[Style];

    /// Whether `trigger` currently holds.
    fn is_active(&self, trigger: &Trigger) -> bool;

    /// Current activation of every style, written into `out`.
    fn query_style(&self, out: &mut [f32]) {
        for (o, style) in out.iter_mut().zip(self.styles()) {
            *o = style.query(|t| self.is_active(t));
        }
    }

    /// Movement bias pooled over styles, weighted by `weights`.
    fn pool_bias(&self, weights: &[f32]) -> f32 {
        weights
            .iter()
            .zip(self.styles())
            .map(|(w, style)| w * style.effective_bias(|t| self.is_active(t)))
            .sum()
    }
}

/// Key names mapped to movement and turning.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MoveBindings {
    pub forward: String,
    pub back: String,
    pub left: String,
    pub right: String,
    pub turn_left: String,
    pub turn_right: String,
}

impl Default for MoveBindings {
    fn default() -> Self {
        Self {
            forward: "W".into(),
            back: "S".into(),
            left: "A".into(),
            right: "D".into(),
            turn_left: "Q".into(),
            turn_right: "E".into(),
        }
    }
}

/// Controller driven by an explicit set of held keys.
///
/// # Example
///
/// ```
/// use phase_locomotion::{Controller, InputController, Style, Trigger};
///
/// let mut controller = InputController::new(vec![
///     Style::new("idle").with_key(Trigger::NoInput),
///     Style::new("walk").with_key(Trigger::key("W")).with_bias(1.5),
/// ]);
/// controller.press("W");
///
/// let mut style = [0.0; 2];
/// controller.query_style(&mut style);
/// assert_eq!(style, [0.0, 1.0]);
/// assert_eq!(controller.query_move().y, 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InputController {
    styles: Vec<Style>,
    bindings: MoveBindings,
    held: BTreeSet<String>,
}

impl InputController {
    pub fn new(styles: Vec<Style>) -> Self {
        Self {
            styles,
            bindings: MoveBindings::default(),
            held: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: MoveBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn press(&mut self, key: impl Into<String>) {
        self.held.insert(key.into());
    }

    pub fn release(&mut self, key: &str) {
        self.held.remove(key);
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    fn axis(&self, negative: &str, positive: &str) -> f32 {
        let mut value = 0.0;
        if self.is_held(positive) {
            value += 1.0;
        }
        if self.is_held(negative) {
            value -= 1.0;
        }
        value
    }
}

impl Controller for InputController {
    fn query_move(&self) -> Vector2<f32> {
        Vector2::new(
            self.axis(&self.bindings.left, &self.bindings.right),
            self.axis(&self.bindings.back, &self.bindings.forward),
        )
    }

    fn query_turn(&self) -> f32 {
        self.axis(&self.bindings.turn_left, &self.bindings.turn_right)
    }

    fn styles(&self) -> &[Style] {
        &self.styles
    }

    fn is_active(&self, trigger: &Trigger) -> bool {
        match trigger {
            Trigger::Key(name) => self.held.contains(name),
            Trigger::NoInput => self.held.is_empty(),
        }
    }
}
