//! Implicit constraint solver for 2D deformable wires and meshes driven
//! against animated rigid obstacles.
//!
//! A [`scene::Scene`] holds particles (grouped in dynamics), kinematic
//! obstacles, constraint conditions and global forces. The
//! [`solver::Solver`] advances it one substep at a time by assembling and
//! solving `(M − h·∂f/∂v − h²·∂f/∂x)·Δv = h·(f + h·∂f/∂x·v)`.

pub mod animator;
pub mod block;
pub mod cg;
pub mod commands;
pub mod condition;
pub mod config;
pub mod constraint;
pub mod demo;
pub mod dispatch;
pub mod dynamic;
pub mod error;
pub mod force;
pub mod geometry;
pub mod kinematic;
pub mod math2d;
pub mod node;
pub mod profiler;
pub mod scene;
pub mod shape;
pub mod solver;
pub mod sparse;

pub use error::{Error, Result};

pub type V2 = nalgebra::Vector2<f64>;
pub type M2 = nalgebra::Matrix2<f64>;
