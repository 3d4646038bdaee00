//! Joint arena and pose exchange structures.
//!
//! Joints live in a flat `Vec` and refer to each other by index only, so
//! parent/child links never form ownership cycles. The synthesizer reads
//! an immutable `&[JointPose]` snapshot of the previous frame and hands
//! back a [`PoseUpdate`]; the skeleton owner applies it with
//! [`Skeleton::apply`].

use nalgebra::{Isometry3, UnitQuaternion, Vector3};

use crate::error::{Result, SynthesisError};
use crate::math::transform::{look_rotation, DIRECTION_EPS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Global pose of one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointPose {
    pub position: Vector3<f32>,
    /// Local +Z axis in world space.
    pub forward: Vector3<f32>,
    /// Local +Y axis in world space.
    pub up: Vector3<f32>,
    /// Linear velocity in units per second.
    pub velocity: Vector3<f32>,
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            forward: Vector3::z(),
            up: Vector3::y(),
            velocity: Vector3::zeros(),
        }
    }
}

impl JointPose {
    /// Pose at `position` with identity orientation and no velocity.
    #[must_use]
    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Orientation whose +Z is `forward` and whose +Y leans toward `up`.
    #[must_use]
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        if self.forward.cross(&self.up).norm() < DIRECTION_EPS {
            return look_rotation(&self.forward);
        }
        UnitQuaternion::face_towards(&self.forward, &self.up)
    }

    #[must_use]
    pub fn transformation(&self) -> Isometry3<f32> {
        Isometry3::from_parts(self.position.into(), self.rotation())
    }
}

/// Result of one synthesis tick, applied by the skeleton owner.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseUpdate {
    /// New character root transform.
    pub root: Isometry3<f32>,
    /// New global pose per joint, indexed like the skeleton.
    pub joints: Vec<JointPose>,
}

impl PoseUpdate {
    /// Update sized for `joint_count` joints, all at the origin.
    #[must_use]
    pub fn new(joint_count: usize) -> Self {
        Self {
            root: Isometry3::identity(),
            joints: vec![JointPose::default(); joint_count],
        }
    }
}

/// One node of the joint hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joint {
    name: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl Joint {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

/// Index-addressed joint hierarchy with the current global pose of each joint.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    joints: Vec<Joint>,
    poses: Vec<JointPose>,
    root: Isometry3<f32>,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}

impl Skeleton {
    #[must_use]
    pub fn new() -> Self {
        Self {
            joints: Vec::new(),
            poses: Vec::new(),
            root: Isometry3::identity(),
        }
    }

    /// Append a joint and return its index.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not name an existing joint.
    pub fn add_joint(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        pose: JointPose,
    ) -> Result<usize> {
        let index = self.joints.len();
        if let Some(p) = parent {
            let Some(parent_joint) = self.joints.get_mut(p) else {
                return Err(SynthesisError::invalid_parameter(format!(
                    "parent joint {p} does not exist ({index} joints)"
                )));
            };
            parent_joint.children.push(index);
        }
        self.joints.push(Joint {
            name: name.into(),
            parent,
            children: Vec::new(),
        });
        self.poses.push(pose);
        Ok(index)
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[must_use]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Index of the first joint called `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Previous-frame snapshot consumed by the synthesizer.
    #[must_use]
    pub fn poses(&self) -> &[JointPose] {
        &self.poses
    }

    #[must_use]
    pub fn pose(&self, index: usize) -> Option<&JointPose> {
        self.poses.get(index)
    }

    #[must_use]
    pub const fn root(&self) -> &Isometry3<f32> {
        &self.root
    }

    pub fn set_root(&mut self, root: Isometry3<f32>) {
        self.root = root;
    }

    /// Apply a synthesizer result.
    ///
    /// # Errors
    ///
    /// Returns an error (and applies nothing) if the joint counts differ.
    pub fn apply(&mut self, update: &PoseUpdate) -> Result<()> {
        if update.joints.len() != self.poses.len() {
            return Err(SynthesisError::joint_count_mismatch(
                self.poses.len(),
                update.joints.len(),
            ));
        }
        self.poses.copy_from_slice(&update.joints);
        self.root = update.root;
        Ok(())
    }

    /// Transform of joint `index` relative to its parent, or to the
    /// character root for top-level joints.
    #[must_use]
    pub fn local_transform(&self, index: usize) -> Option<Isometry3<f32>> {
        let global = self.poses.get(index)?.transformation();
        let parent = match self.joints.get(index)?.parent {
            Some(p) => self.poses.get(p)?.transformation(),
            None => self.root,
        };
        Some(parent.inverse() * global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn chain() -> Skeleton {
        let mut s = Skeleton::new();
        let hips = s
            .add_joint("hips", None, JointPose::at(Vector3::new(0.0, 1.0, 0.0)))
            .unwrap();
        let spine = s
            .add_joint("spine", Some(hips), JointPose::at(Vector3::new(0.0, 1.5, 0.0)))
            .unwrap();
        s.add_joint("head", Some(spine), JointPose::at(Vector3::new(0.0, 1.8, 0.1)))
            .unwrap();
        s
    }

    #[test]
    fn test_hierarchy_links() {
        let s = chain();
        assert_eq!(s.joint_count(), 3);
        assert_eq!(s.joint(0).unwrap().children(), &[1]);
        assert_eq!(s.joint(2).unwrap().parent(), Some(1));
        assert_eq!(s.find("head"), Some(2));
        assert_eq!(s.find("tail"), None);
    }

    #[test]
    fn test_invalid_parent_rejected() {
        let mut s = chain();
        assert!(s.add_joint("ghost", Some(7), JointPose::default()).is_err());
        assert_eq!(s.joint_count(), 3);
    }

    #[test]
    fn test_local_transform() {
        let s = chain();
        let local = s.local_transform(2).unwrap();
        assert_relative_eq!(
            local.translation.vector,
            Vector3::new(0.0, 0.3, 0.1),
            epsilon = 1e-6
        );
        let top = s.local_transform(0).unwrap();
        assert_relative_eq!(top.translation.vector, Vector3::new(0.0, 1.0, 0.0));
        assert!(s.local_transform(9).is_none());
    }

    #[test]
    fn test_apply_update() {
        let mut s = chain();
        let mut update = PoseUpdate::new(3);
        update.joints[1].position = Vector3::new(5.0, 0.0, 0.0);
        update.root = Isometry3::translation(1.0, 0.0, 0.0);
        s.apply(&update).unwrap();
        assert_eq!(s.pose(1).unwrap().position, Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(s.root().translation.vector, Vector3::new(1.0, 0.0, 0.0));

        let wrong = PoseUpdate::new(2);
        assert!(matches!(
            s.apply(&wrong),
            Err(SynthesisError::JointCountMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_joint_rotation_axes() {
        let pose = JointPose {
            forward: Vector3::x(),
            up: Vector3::y(),
            ..JointPose::default()
        };
        let q = pose.rotation();
        assert_relative_eq!(q * Vector3::z(), Vector3::x(), epsilon = 1e-6);
        assert_relative_eq!(q * Vector3::y(), Vector3::y(), epsilon = 1e-6);
    }
}
