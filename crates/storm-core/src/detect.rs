//! Coarse maxima detection: strict 8-neighbour local maxima above a
//! threshold on the filtered, background-subtracted frame, mirroring the
//! original's `vigra::localMaxima` call in `wienerStormSingleFrame`.

use ndarray::Array2;

/// A coarse candidate maximum, in the original frame's pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub x: usize,
    pub y: usize,
    pub value: f32,
}

/// Scan `data` for pixels strictly greater than all eight neighbours and
/// exceeding `threshold`. Border pixels (no full neighbourhood) are never
/// candidates. A plateau — any neighbour equal to the centre — yields no
/// detection at that pixel, matching the original's strict-inequality rule.
pub fn find_coarse_maxima(data: &Array2<f32>, threshold: f32) -> Vec<Candidate> {
    let (h, w) = data.dim();
    let mut out = Vec::new();
    if h < 3 || w < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let centre = data[[y, x]];
            if centre <= threshold {
                continue;
            }
            let mut is_max = true;
            'neighbours: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dy == 0 && dx == 0 {
                        continue;
                    }
                    let ny = (y as i32 + dy) as usize;
                    let nx = (x as i32 + dx) as usize;
                    if data[[ny, nx]] >= centre {
                        is_max = false;
                        break 'neighbours;
                    }
                }
            }
            if is_max {
                out.push(Candidate { x, y, value: centre });
            }
        }
    }
    out
}
