#![allow(non_snake_case)]
// Monodromy walkthrough for a two-state oscillator with quintic stiffness,
// after the softening-spring example of Nayfeh & Balachandran, Applied
// Nonlinear Dynamics (1995), p. 52:
//   x1' = x2
//   x2' = (-(-w0^2 x1 + a3 x1^3 + a5 x1^5) - (2 mu1 x2 + mu3 x2^3) + f)/100
// The walkthrough draws a phase portrait, extracts the monodromy matrix with
// three procedures, cross-checks them, and shows how an initial perturbation
// propagates along the trajectory.

use RustedMonodromy::Utils::plots::{plot_phase_portrait, plot_xy_series};
use RustedMonodromy::Utils::task_parser::{ScenarioTask, load_scenario};
use RustedMonodromy::numerical::demo_systems::OscillatorExample;
use RustedMonodromy::numerical::integrator::OdeIntegrator;
use RustedMonodromy::numerical::perturbation::{
    deviation, ellipse_overlay, linearized_deviation, linearized_prediction, unit_circle,
};
use RustedMonodromy::numerical::segmented::SegmentedSimulator;
use RustedMonodromy::numerical::sensitivity::{SensitivitySolver, jacobian_difference};
use RustedMonodromy::numerical::simulator::{Simulator, linspace};
use chrono::Local;
use log::info;
use nalgebra::{DMatrix, DVector};
use plotters::style::{BLUE, RED};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};
use tabled::{builder::Builder, settings::Style};

fn main() {
    // an optional scenario file overrides the canonical settings
    let task = match std::env::args().nth(1) {
        Some(path) => load_scenario(&path).expect("scenario file is not usable"),
        None => ScenarioTask::default(),
    };

    let log_option = match task.loglevel.as_deref() {
        Some("debug") => LevelFilter::Debug,
        Some("warn") => LevelFilter::Warn,
        Some("error") => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    let _ = CombinedLogger::init(vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
    info!("walkthrough started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let example = OscillatorExample::DuffingQuintic;
    let system = example.system();
    let params = DVector::from_iterator(
        system.n_params(),
        system.params.iter().map(|name| {
            *task
                .params
                .get(name)
                .unwrap_or_else(|| panic!("scenario does not define parameter '{}'", name))
        }),
    );
    let x0 = DVector::from_vec(task.x0.clone());
    let ts = linspace(task.t0, task.t_bound, task.n_samples);
    println!("oscillator parameters: {:?} = {:?}", system.params, params.as_slice());

    //////////////////////////////////////////////////////////////////////////
    // phase portrait for a family of initial conditions
    //////////////////////////////////////////////////////////////////////////
    let mut sim = Simulator::new(system.clone(), ts.clone(), task.rtol, task.atol);
    sim.set_parameters(params.clone());
    let family: Vec<DVector<f64>> = [-3.5, -3.1, -3.0, -2.0, -1.0, 0.0]
        .iter()
        .map(|&x1_0| DVector::from_vec(vec![x1_0, 0.0]))
        .collect();
    let portraits = sim
        .trajectories_for(&family)
        .expect("phase portrait simulation failed");
    plot_phase_portrait(
        "phase_portrait.png",
        "phase portrait for mu1 = 0, mu3 = 0",
        "x_1",
        "x_2",
        &portraits,
        &[],
    );
    println!("phase portrait plotted");

    //////////////////////////////////////////////////////////////////////////
    // the plain trajectory map x0 -> x(tf)
    //////////////////////////////////////////////////////////////////////////
    let mut integrator = OdeIntegrator::new(
        system.clone(),
        task.t0,
        task.t_bound,
        task.rtol,
        task.atol,
        f64::INFINITY,
        None,
    );
    integrator.set_initial_state(x0.clone());
    integrator.set_parameters(params.clone());
    let x_final = integrator.final_state().expect("nominal integration failed");
    println!("final state x({}) = {}", task.t_bound, x_final);
    integrator.print_statistics();

    //////////////////////////////////////////////////////////////////////////
    // monodromy matrix at tf: single-shot differentiation of the integrator
    //////////////////////////////////////////////////////////////////////////
    let solver = SensitivitySolver::new(system.clone(), task.rtol, task.atol);
    let (_, Ji) = solver
        .final_state_jacobian(&x0, &params, task.t0, task.t_bound)
        .expect("single-shot sensitivity run failed");
    println!("monodromy matrix at tf, single-shot:{}", Ji);

    //////////////////////////////////////////////////////////////////////////
    // monodromy matrices at every sample: batch differentiation
    //////////////////////////////////////////////////////////////////////////
    let (nominal, jacobians) = solver
        .sampled_state_jacobians(&x0, &params, &ts)
        .expect("batch sensitivity run failed");
    println!(
        "batch procedure: {} jacobians of shape {:?}",
        jacobians.len(),
        jacobians[0].shape()
    );
    for jac in jacobians.iter().rev().take(3).rev() {
        println!("{}", jac);
    }
    let Js = jacobians.last().unwrap().clone();

    let diff_batch = jacobian_difference(&Js, &Ji);
    assert!(
        diff_batch < 1e-4,
        "single-shot and batch monodromy matrices disagree: {}",
        diff_batch
    );
    info!("batch vs single-shot cross-check passed: {:.3e}", diff_batch);

    //////////////////////////////////////////////////////////////////////////
    // monodromy matrices again: segment-chained with forcing as a control
    //////////////////////////////////////////////////////////////////////////
    let coarse = linspace(task.t0, task.t_bound, task.coarse_points);
    let segmented = SegmentedSimulator::new(
        system.clone(),
        coarse,
        task.nf,
        1,
        task.rtol,
        task.atol,
    );
    let fixed_params = DVector::from_column_slice(&params.as_slice()[..params.len() - 1]);
    let run = segmented
        .evaluate(&x0, &fixed_params, None)
        .expect("segment-chained sensitivity run failed");
    println!(
        "segment-chained procedure: {} jacobians on the fine grid",
        run.jacobians.len()
    );
    for jac in run.jacobians.iter().rev().take(3).rev() {
        println!("{}", jac);
    }
    let Jcs = run.jacobians.last().unwrap().clone();

    let diff_chained = jacobian_difference(&Jcs, &Js);
    assert!(
        diff_chained < 1e-4,
        "batch and segment-chained monodromy matrices disagree: {}",
        diff_chained
    );
    info!("chained vs batch cross-check passed: {:.3e}", diff_chained);

    //////////////////////////////////////////////////////////////////////////
    // intuitive interpretation: images of a ring of unit perturbations
    //////////////////////////////////////////////////////////////////////////
    let ring = unit_circle(100);
    let mut overlays = Vec::new();
    for k in (0..task.n_samples / 5).step_by(2) {
        let scale = if k < 10 { 0.1 } else { 0.01 };
        let center = (nominal[(k, 0)], nominal[(k, 1)]);
        let color = if k < 10 { RED } else { BLUE };
        overlays.push((ellipse_overlay(&jacobians[k], &ring, scale, center), color));
    }
    plot_phase_portrait(
        "monodromy_ellipses.png",
        "images of a perturbation ring along the trajectory",
        "x_1",
        "x_2",
        &[nominal.clone()],
        &overlays,
    );
    println!("perturbation ring plotted");

    //////////////////////////////////////////////////////////////////////////
    // evolution of one concrete perturbation
    //////////////////////////////////////////////////////////////////////////
    let delta = DVector::from_vec(task.delta.clone());
    let mut perturbed_sim = Simulator::new(system.clone(), ts.clone(), task.rtol, task.atol);
    perturbed_sim.set_parameters(params.clone());
    perturbed_sim.set_initial_state(x0.clone() + delta.clone());
    perturbed_sim
        .evaluate()
        .expect("perturbed simulation failed");
    let (_, perturbed) = perturbed_sim.get_result();

    let true_dev = deviation(&perturbed, &nominal);
    let linear_dev = linearized_deviation(&jacobians, &delta);
    let as_series = |matrix: &DMatrix<f64>, col: usize| -> Vec<(f64, f64)> {
        (0..matrix.nrows()).map(|k| (ts[k], matrix[(k, col)])).collect()
    };
    plot_xy_series(
        "perturbation_evolution.png",
        "evolution of a perturbation",
        "t",
        "deviation",
        &[
            ("x_1".to_string(), as_series(&true_dev, 0)),
            ("x_2".to_string(), as_series(&true_dev, 1)),
            ("predicted(x_1)".to_string(), as_series(&linear_dev, 0)),
            ("predicted(x_2)".to_string(), as_series(&linear_dev, 1)),
        ],
    );
    println!("perturbation evolution plotted");

    //////////////////////////////////////////////////////////////////////////
    // phase portrait of nominal, perturbed and predicted trajectories
    //////////////////////////////////////////////////////////////////////////
    let predicted = linearized_prediction(&nominal, &jacobians, &delta);
    let half = task.n_samples / 2;
    let to_plane = |matrix: &DMatrix<f64>| -> Vec<(f64, f64)> {
        (0..half).map(|k| (matrix[(k, 0)], matrix[(k, 1)])).collect()
    };
    plot_xy_series(
        "phase_portrait_perturbation.png",
        "phase portrait perturbation",
        "x_1",
        "x_2",
        &[
            ("nominal".to_string(), to_plane(&nominal)),
            ("perturbed".to_string(), to_plane(&perturbed)),
            ("monodromy prediction".to_string(), to_plane(&predicted)),
        ],
    );
    println!("phase portrait perturbation plotted");

    //////////////////////////////////////////////////////////////////////////
    // summary
    //////////////////////////////////////////////////////////////////////////
    let diff_batch_str = format!("{:.3e}", diff_batch);
    let diff_chained_str = format!("{:.3e}", diff_chained);
    let mut builder = Builder::default();
    builder.push_record(["check", "norm of difference", "bound"]);
    builder.push_record(["batch vs single-shot", diff_batch_str.as_str(), "1e-4"]);
    builder.push_record(["chained vs batch", diff_chained_str.as_str(), "1e-4"]);
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    println!("{}", table);
    info!("walkthrough finished");
}
