use crate::geotags::GeoModel;

/// X and Y coordinates of each column and each (bottom-up) row.
///
/// Both vectors ascend. Values are the model coordinates of the pixel
/// corner the tiepoint refers to; no half-pixel shift is applied.
pub fn model_xy(model: &GeoModel, width: usize, height: usize) -> (Vec<f64>, Vec<f64>) {
    let (x_origin, x_delta, y_top, y_delta) = match model {
        GeoModel::Transformed { transformation, .. } => (
            transformation[3],
            transformation[0],
            transformation[7],
            -transformation[5],
        ),
        GeoModel::Scaled {
            tiepoint,
            pixel_scale,
        } => {
            // tiepoint may reference a raster point other than (0, 0)
            let [i, j, _, x, y, _] = *tiepoint;
            (
                x - i * pixel_scale[0],
                pixel_scale[0],
                y + j * pixel_scale[1],
                pixel_scale[1],
            )
        }
    };

    let xs = (0..width).map(|i| x_origin + i as f64 * x_delta).collect();
    let mut ys = vec![0.0; height];
    for j in 0..height {
        ys[height - 1 - j] = y_top - j as f64 * y_delta;
    }
    (xs, ys)
}
