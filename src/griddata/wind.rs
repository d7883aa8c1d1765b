use super::PixelSample;

/// Number of 30 degree direction sectors of the directional wind reduction.
pub const NUM_WIND_SECTORS: usize = 12;

const TAN_15: f64 = 2. - 1.732_050_807_568_877_2;
const TAN_75: f64 = 2. + 1.732_050_807_568_877_2;

/// Sector of a pixel, indexed by `[sign(dx) + 1][k * sign(dy) + 3]` where `k` buckets
/// `|dy / dx|` against the tangents of 15, 45 and 75 degrees.
///
/// The middle row is only reached with `k == 3` (pixels straight north or south of the node);
/// its other entries mirror the vertical sectors.
const SECTORS: [[usize; 7]; 3] = [
    [3, 2, 1, 0, 11, 10, 9],
    [3, 3, 3, 0, 9, 9, 9],
    [3, 4, 5, 6, 7, 8, 9],
];

fn sign(v: f64) -> i32 {
    if v > 0. {
        1
    } else if v < 0. {
        -1
    } else {
        0
    }
}

/// Sector of the offset `(dx, dy)` from a pixel to the node.
pub(crate) fn sector(dx: f64, dy: f64) -> usize {
    let t = if dx.abs() < f64::EPSILON {
        f64::MAX
    } else {
        (dy / dx).abs()
    };
    let bucket = |ratio: f64| (ratio.floor() as i32).min(1);
    let k = bucket(t / TAN_15) + bucket(t) + bucket(t / TAN_75);
    SECTORS[(sign(dx) + 1) as usize][(k * sign(dy) + 3) as usize]
}

/// Gaussian distance weight of a pixel at squared distance `d2` (km²).
fn weight(d2: f64, sigma: f64, normalizer: f64) -> f64 {
    1. / ((0.5 * d2 / (sigma * sigma)).exp() + normalizer)
}

/// Distance weighted mean of the samples in each direction sector.
///
/// Offsets are in meters and `sigma` in kilometers. Pixels at the node itself carry no
/// direction: their weight only enlarges the denominator of every sector. Sectors without any
/// pixel get `default`.
pub(crate) fn directional_reduction(
    samples: &[PixelSample],
    sigma: f64,
    normalizer: f64,
    default: f64,
) -> [f64; NUM_WIND_SECTORS] {
    let mut sums = [0.; NUM_WIND_SECTORS];
    let mut weights = [0.; NUM_WIND_SECTORS];
    let mut near_field = 0.;

    for s in samples {
        let (dx, dy) = (-s.dx, -s.dy);
        let d2 = (dx * 0.001).powi(2) + (dy * 0.001).powi(2);
        let w = weight(d2, sigma, normalizer);
        if s.distance <= f64::EPSILON {
            near_field += w;
            continue;
        }
        let k = sector(dx, dy);
        sums[k] += w * s.value;
        weights[k] += w;
    }

    let mut result = [default; NUM_WIND_SECTORS];
    for ((r, sum), w) in result.iter_mut().zip(sums).zip(weights) {
        if w > 1e-12 {
            *r = sum / (w + near_field);
        }
    }
    result
}
