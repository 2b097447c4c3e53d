use nalgebra::{DMatrix, DVector};
use plotters::prelude::*;

/// widen a data range a little so curves do not touch the frame; degenerate
/// ranges get a unit pad
fn padded_range(min: f64, max: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = if span < 1e-12 { 1.0 } else { 0.05 * span };
    (min - pad, max + pad)
}

/// One PNG per variable: the variable against the argument.
pub fn plots(arg: String, values: Vec<String>, t_result: DVector<f64>, y_result: DMatrix<f64>) {
    let x = t_result;
    let y = y_result;
    let (x_min, x_max) = padded_range(x.min(), x.max());
    for col in 0..y.ncols() {
        let y_col = y.column(col);
        let (y_min, y_max) = padded_range(y_col.min(), y_col.max());
        let varname = values[col].clone();
        let filename = format!("{}.png", varname);
        let root_area = BitMapBackend::new(&filename, (800, 600)).into_drawing_area();
        root_area.fill(&WHITE).unwrap();

        let mut chart = ChartBuilder::on(&root_area)
            .caption(format!("{}", varname), ("sans-serif", 50))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(30)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .unwrap();

        chart
            .configure_mesh()
            .x_desc(&arg)
            .y_desc(&varname)
            .draw()
            .unwrap();

        let series: Vec<(f64, f64)> = x.iter().zip(y_col.iter()).map(|(&x, &y)| (x, y)).collect();
        chart
            .draw_series(LineSeries::new(series, &Palette99::pick(col)))
            .unwrap()
            .label(format!(" {}", varname))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(col))
            });

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .unwrap();
    }
}

/// Phase portrait: a family of (x1, x2) trajectories drawn in black plus
/// colored overlay polylines (e.g. monodromy ellipses).
pub fn plot_phase_portrait(
    filename: &str,
    title: &str,
    xlabel: &str,
    ylabel: &str,
    curves: &[DMatrix<f64>],
    overlays: &[(Vec<(f64, f64)>, RGBColor)],
) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for curve in curves {
        assert_eq!(curve.ncols(), 2, "phase portrait needs two columns");
        x_min = x_min.min(curve.column(0).min());
        x_max = x_max.max(curve.column(0).max());
        y_min = y_min.min(curve.column(1).min());
        y_max = y_max.max(curve.column(1).max());
    }
    for (points, _) in overlays {
        for &(px, py) in points {
            x_min = x_min.min(px);
            x_max = x_max.max(px);
            y_min = y_min.min(py);
            y_max = y_max.max(py);
        }
    }
    let (x_min, x_max) = padded_range(x_min, x_max);
    let (y_min, y_max) = padded_range(y_min, y_max);

    let root_area = BitMapBackend::new(filename, (800, 600)).into_drawing_area();
    root_area.fill(&WHITE).unwrap();
    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .unwrap();
    chart
        .configure_mesh()
        .x_desc(xlabel)
        .y_desc(ylabel)
        .draw()
        .unwrap();

    for curve in curves {
        let series: Vec<(f64, f64)> = (0..curve.nrows())
            .map(|k| (curve[(k, 0)], curve[(k, 1)]))
            .collect();
        chart.draw_series(LineSeries::new(series, &BLACK)).unwrap();
    }
    for (points, color) in overlays {
        chart
            .draw_series(LineSeries::new(points.clone(), color))
            .unwrap();
    }
}

/// Labeled comparison plot of several (x, y) series on one pair of axes.
pub fn plot_xy_series(
    filename: &str,
    title: &str,
    xlabel: &str,
    ylabel: &str,
    series: &[(String, Vec<(f64, f64)>)],
) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (_, points) in series {
        for &(px, py) in points {
            x_min = x_min.min(px);
            x_max = x_max.max(px);
            y_min = y_min.min(py);
            y_max = y_max.max(py);
        }
    }
    let (x_min, x_max) = padded_range(x_min, x_max);
    let (y_min, y_max) = padded_range(y_min, y_max);

    let root_area = BitMapBackend::new(filename, (800, 600)).into_drawing_area();
    root_area.fill(&WHITE).unwrap();
    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .unwrap();
    chart
        .configure_mesh()
        .x_desc(xlabel)
        .y_desc(ylabel)
        .draw()
        .unwrap();

    for (idx, (name, points)) in series.iter().enumerate() {
        chart
            .draw_series(LineSeries::new(points.clone(), &Palette99::pick(idx)))
            .unwrap()
            .label(format!(" {}", name))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(idx))
            });
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .unwrap();
}

use gnuplot::{AxesCommon, Caption, Color, Figure};
/// gnuplot variant of the per-variable plot
pub fn plots_gnuplot(
    arg: String,
    values: Vec<String>,
    t_result: DVector<f64>,
    y_result: DMatrix<f64>,
) {
    let x = t_result;
    for col in 0..y_result.ncols() {
        let mut fg = Figure::new();
        let y_col: Vec<f64> = y_result.column(col).iter().copied().collect();
        let varname = &values[col];

        fg.axes2d()
            .set_title(varname, &[])
            .set_x_label(&arg, &[])
            .set_y_label(varname, &[])
            .lines(x.as_slice(), &y_col, &[Caption(varname), Color("blue")]);

        let filename = format!("{}.png", varname);
        fg.save_to_png(&filename, 800, 600).unwrap();
    }
}
