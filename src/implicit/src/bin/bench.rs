use std::time::Instant;

use implicit::demo;
use implicit::profiler::Profiler;
use implicit::solver::Solver;

fn main() -> implicit::Result<()> {
	env_logger::init();
	let start = Instant::now();
	let mut scene = demo::reference_scene()?;
	let mut context = demo::reference_context();
	let mut solver = Solver::default();
	let mut profiler = Profiler::default();
	solver.initialize(&mut scene, &context)?;
	for _ in 0..demo::NUM_FRAME {
		solver.solve_frame(&mut scene, &mut context, &mut profiler)?;
	}
	log::info!(
		"{} frames, {} nodes, {} constraints",
		demo::NUM_FRAME,
		scene.num_nodes(),
		scene.num_constraints()
	);
	log::info!("step time {:.3}s", profiler.total("solve_step").as_secs_f64());
	let time = demo::NUM_FRAME as f64 * context.frame_dt;
	let duration = start.elapsed().as_micros();
	eprintln!("{:.3}%", duration as f64 / time / 1e4);
	Ok(())
}
