use image::RgbImage;
use rand::Rng;
use rand::seq::index;

use crate::geometry::Rect;

/// k-means settings for dominant colour extraction.
#[derive(Debug, Clone)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iter: usize,
    /// Stop once no centre moves further than this.
    pub epsilon: f64,
    /// Independent restarts; the most compact clustering wins.
    pub attempts: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Clustering {
    pub labels: Vec<usize>,
    pub centers: Vec<[f64; 3]>,
    compactness: f64,
}

/// Dominant colour of the part of `rect` inside `frame`.
///
/// Falls back to the mean colour when the region has fewer pixels than
/// clusters. Clusters whose centre lies within `color_threshold` of any
/// `background` colour are ignored. Returns `None` for empty regions or when
/// every cluster looks like background.
pub fn dominant_color<R: Rng>(
    frame: &RgbImage,
    rect: &Rect,
    params: &KMeansParams,
    background: &[[u8; 3]],
    color_threshold: f64,
    rng: &mut R,
) -> Option<[u8; 3]> {
    let (x1, y1, x2, y2) = rect.clip_to_frame(frame.width(), frame.height())?;

    let mut pixels = Vec::with_capacity(((x2 - x1) * (y2 - y1)) as usize);
    for y in y1..y2 {
        for x in x1..x2 {
            let [r, g, b] = frame.get_pixel(x, y).0;
            pixels.push([f64::from(r), f64::from(g), f64::from(b)]);
        }
    }

    if pixels.is_empty() {
        return None;
    }
    if pixels.len() < params.k.max(1) {
        return Some(to_color(&mean(&pixels)));
    }

    let clustering = kmeans(&pixels, params, rng);

    let is_background = |c: &[f64; 3]| {
        background
            .iter()
            .any(|bg| distance(c, &bg.map(f64::from)) < color_threshold)
    };

    let mut counts = vec![0usize; clustering.centers.len()];
    for &label in &clustering.labels {
        counts[label] += 1;
    }

    let valid: Vec<usize> = (0..clustering.centers.len())
        .filter(|&i| !is_background(&clustering.centers[i]))
        .collect();
    let first = *valid.first()?;

    // max_by_key keeps the last maximum; iterate in reverse so ties go to
    // the lowest cluster index.
    let best = valid
        .iter()
        .rev()
        .copied()
        .filter(|&i| counts[i] > 0)
        .max_by_key(|&i| counts[i])
        .unwrap_or(first);

    Some(to_color(&clustering.centers[best]))
}

/// Lloyd's algorithm with random initial centres drawn from the data.
pub(crate) fn kmeans<R: Rng>(data: &[[f64; 3]], params: &KMeansParams, rng: &mut R) -> Clustering {
    let k = params.k.clamp(1, data.len().max(1));
    let mut best: Option<Clustering> = None;

    for _ in 0..params.attempts.max(1) {
        let mut centers: Vec<[f64; 3]> = index::sample(rng, data.len(), k)
            .into_iter()
            .map(|i| data[i])
            .collect();
        let mut labels = vec![0usize; data.len()];

        for _ in 0..params.max_iter.max(1) {
            for (label, p) in labels.iter_mut().zip(data) {
                *label = nearest(&centers, p);
            }

            let mut sums = vec![[0.0f64; 3]; k];
            let mut counts = vec![0usize; k];
            for (&label, p) in labels.iter().zip(data) {
                for c in 0..3 {
                    sums[label][c] += p[c];
                }
                counts[label] += 1;
            }

            let mut shift = 0.0f64;
            for i in 0..k {
                if counts[i] == 0 {
                    continue;
                }
                let updated = sums[i].map(|s| s / counts[i] as f64);
                shift = shift.max(distance(&updated, &centers[i]));
                centers[i] = updated;
            }

            if shift <= params.epsilon {
                break;
            }
        }

        for (label, p) in labels.iter_mut().zip(data) {
            *label = nearest(&centers, p);
        }
        let compactness = labels
            .iter()
            .zip(data)
            .map(|(&l, p)| distance(p, &centers[l]).powi(2))
            .sum();

        if best.as_ref().is_none_or(|b| compactness < b.compactness) {
            best = Some(Clustering {
                labels,
                centers,
                compactness,
            });
        }
    }

    best.unwrap_or(Clustering {
        labels: Vec::new(),
        centers: Vec::new(),
        compactness: 0.0,
    })
}

fn nearest(centers: &[[f64; 3]], p: &[f64; 3]) -> usize {
    centers
        .iter()
        .enumerate()
        .min_by(|a, b| distance(a.1, p).total_cmp(&distance(b.1, p)))
        .map_or(0, |(i, _)| i)
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

fn mean(pixels: &[[f64; 3]]) -> [f64; 3] {
    let n = pixels.len() as f64;
    let mut acc = [0.0; 3];
    for p in pixels {
        for c in 0..3 {
            acc[c] += p[c];
        }
    }
    acc.map(|v| v / n)
}

fn to_color(c: &[f64; 3]) -> [u8; 3] {
    c.map(|v| v.clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn params() -> KMeansParams {
        KMeansParams {
            k: 2,
            max_iter: 20,
            epsilon: 0.5,
            attempts: 3,
        }
    }

    /// 30x10 frame: left two thirds red, right third grey.
    fn frame() -> RgbImage {
        RgbImage::from_fn(30, 10, |x, _| {
            if x < 20 { Rgb([200, 20, 20]) } else { Rgb([90, 90, 90]) }
        })
    }

    #[test]
    fn test_majority_colour_wins() {
        let mut rng = StdRng::seed_from_u64(7);
        let rect = Rect::from_tlbr(0.0, 0.0, 30.0, 10.0);
        let color = dominant_color(&frame(), &rect, &params(), &[], 50.0, &mut rng);
        assert_eq!(color, Some([200, 20, 20]));
    }

    #[test]
    fn test_background_cluster_is_suppressed() {
        let mut rng = StdRng::seed_from_u64(7);
        let rect = Rect::from_tlbr(0.0, 0.0, 30.0, 10.0);
        let color = dominant_color(&frame(), &rect, &params(), &[[205, 25, 18]], 30.0, &mut rng);
        assert_eq!(color, Some([90, 90, 90]));
    }

    #[test]
    fn test_everything_is_background() {
        let mut rng = StdRng::seed_from_u64(7);
        let rect = Rect::from_tlbr(0.0, 0.0, 30.0, 10.0);
        let bg = [[200, 20, 20], [90, 90, 90]];
        assert_eq!(dominant_color(&frame(), &rect, &params(), &bg, 10.0, &mut rng), None);
    }

    #[test]
    fn test_tiny_region_uses_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        // one red pixel and one grey pixel straddling the boundary
        let rect = Rect::from_tlbr(19.0, 0.0, 21.0, 1.0);
        let p = KMeansParams { k: 3, ..params() };
        assert_eq!(dominant_color(&frame(), &rect, &p, &[], 50.0, &mut rng), Some([145, 55, 55]));
    }

    #[test]
    fn test_degenerate_box() {
        let mut rng = StdRng::seed_from_u64(7);
        let inverted = Rect::from_tlbr(10.0, 5.0, 5.0, 8.0);
        assert_eq!(dominant_color(&frame(), &inverted, &params(), &[], 50.0, &mut rng), None);
    }

    #[test]
    fn test_kmeans_separates_two_blobs() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut data = vec![[0.0, 0.0, 0.0]; 10];
        data.extend(vec![[255.0, 255.0, 255.0]; 5]);
        let c = kmeans(&data, &params(), &mut rng);
        assert_eq!(c.centers.len(), 2);
        assert_ne!(c.labels[0], c.labels[14]);
        assert!(c.labels[..10].iter().all(|&l| l == c.labels[0]));
    }
}
