//! Plain 2D/3D coordinate primitives shared by every other module.
//!
//! The simulation itself only ever operates in 2D; [`Vector3`] exists solely so that the
//! mass center can be handed to a renderer that expects a 3D scene graph position.

/// A 2D point or displacement, used for particle positions, velocities and accelerations.
pub type Vector2 = glam::DVec2;

/// A 3D point, used only at the boundary with the (out of scope) rendering layer.
pub type Vector3 = glam::DVec3;

/// Lifts a [`Vector2`] into [`Vector3`] with a zero `z` component.
#[inline]
pub fn to_vector3(v: Vector2) -> Vector3 {
    Vector3::new(v.x, v.y, 0.0)
}
