//! Reference scene: a hanging wire and a beam held by kinematics, with an
//! obstacle rising into the wire.

use crate::animator::Keyframes;
use crate::commands;
use crate::config::Context;
use crate::dispatch::Session;
use crate::error::Result;
use crate::scene::Scene;
use crate::shape::Shape;
use crate::V2;

pub const WIRE_ROOT_POS: [f64; 2] = [0.0, -1.0];
pub const WIRE_LENGTH: f64 = 2.0;
pub const WIRE_NUM_SEGMENTS: usize = 4;

pub const BEAM_POS: [f64; 2] = [-4.0, 0.0];
pub const BEAM_WIDTH: f64 = 8.0;
pub const BEAM_HEIGHT: f64 = 1.0;
pub const BEAM_CELL_X: usize = 6;
pub const BEAM_CELL_Y: usize = 3;

pub const STIFFNESS: f64 = 1.0;
pub const BENDING_STIFFNESS: f64 = 0.1;
pub const ATTACHMENT_STIFFNESS: f64 = 10.0;
pub const COLLISION_STIFFNESS: f64 = 10.0;
pub const DAMPING: f64 = 0.0;
pub const ATTACHMENT_DISTANCE: f64 = 0.05;
/// Clearance between a holding kinematic and the nodes it holds, so that
/// they do not start in collision.
pub const HOLD_GAP: f64 = 0.02;
pub const PARTICLE_MASS: f64 = 0.001;

pub const GRAVITY: [f64; 2] = [0.0, -9.81];
pub const NUM_FRAME: usize = 100;
pub const FRAME_TIMESTEP: f64 = 1.0 / 24.0;
pub const NUM_SUBSTEP: u32 = 4;

pub fn reference_context() -> Context {
	Context::new(FRAME_TIMESTEP, NUM_SUBSTEP)
}

pub fn reference_scene() -> Result<Scene> {
	let mut scene = Scene::default();
	let root = V2::from(WIRE_ROOT_POS);

	let wire_shape = Shape::wire(root, root - V2::new(0.0, WIRE_LENGTH), WIRE_NUM_SEGMENTS)?;
	let wire = commands::add_dynamic(&mut scene, &wire_shape, PARTICLE_MASS)?;
	let beam_shape = Shape::beam(V2::from(BEAM_POS), BEAM_WIDTH, BEAM_HEIGHT, BEAM_CELL_X, BEAM_CELL_Y)?;
	let beam = commands::add_dynamic(&mut scene, &beam_shape, PARTICLE_MASS)?;

	// swings the wire root sideways while turning
	let handle = Keyframes::default()
		.with_key(0.0, root + V2::new(0.0, 0.25 + HOLD_GAP), 0.0)
		.with_key(2.0, root + V2::new(1.5, 0.25 + HOLD_GAP), 45.0)
		.with_key(4.0, root + V2::new(0.0, 0.25 + HOLD_GAP), 0.0);
	let handle_shape = Shape::rectangle(V2::zeros(), 0.5, 0.5)?;
	let handle = commands::add_kinematic(&mut scene, &handle_shape, Some(Box::new(handle)))?;

	let mid_y = BEAM_POS[1] + BEAM_HEIGHT * 0.5;
	let left_x = BEAM_POS[0] - 0.25 - HOLD_GAP;
	let beam_left = Shape::rectangle(V2::new(left_x, mid_y), 0.5, BEAM_HEIGHT)?;
	let beam_left = commands::add_kinematic(&mut scene, &beam_left, None)?;
	let right_x = BEAM_POS[0] + BEAM_WIDTH + 0.25 + HOLD_GAP;
	let beam_right = Shape::rectangle(V2::new(right_x, mid_y), 0.5, BEAM_HEIGHT)?;
	let beam_right = commands::add_kinematic(&mut scene, &beam_right, None)?;

	let obstacle = Keyframes::default()
		.with_key(0.0, V2::new(0.5, -5.0), 0.0)
		.with_key(3.0, V2::new(0.5, -2.5), 0.0);
	let obstacle_shape = Shape::rectangle(V2::zeros(), 2.0, 1.0)?;
	commands::add_kinematic(&mut scene, &obstacle_shape, Some(Box::new(obstacle)))?;

	commands::add_edge_constraint(&mut scene, wire, STIFFNESS, DAMPING)?;
	commands::add_wire_bending_constraint(&mut scene, wire, BENDING_STIFFNESS, DAMPING)?;
	commands::add_edge_constraint(&mut scene, beam, STIFFNESS, DAMPING)?;
	commands::add_face_constraint(&mut scene, beam, STIFFNESS, DAMPING)?;
	commands::add_kinematic_attachment(&mut scene, wire, handle, ATTACHMENT_STIFFNESS, DAMPING, ATTACHMENT_DISTANCE)?;
	commands::add_kinematic_attachment(&mut scene, beam, beam_left, ATTACHMENT_STIFFNESS, DAMPING, ATTACHMENT_DISTANCE)?;
	commands::add_kinematic_attachment(&mut scene, beam, beam_right, ATTACHMENT_STIFFNESS, DAMPING, ATTACHMENT_DISTANCE)?;
	commands::add_kinematic_collision(&mut scene, COLLISION_STIFFNESS, DAMPING)?;
	commands::add_gravity(&mut scene, V2::from(GRAVITY));
	Ok(scene)
}

/// The reference scene with its clock, ready to be served.
pub fn reference_session() -> Result<Session> {
	Ok(Session {
		scene: reference_scene()?,
		context: reference_context(),
		..Session::default()
	})
}
