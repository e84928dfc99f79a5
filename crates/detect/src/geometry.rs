/// A candidate box with a confidence score.
///
/// Coordinates are corner form (`x1 < x2`, `y1 < y2`) in whatever space the
/// detector emits — normalized `[0,1]` before scaling, pixels after.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl ScoredBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self { x1, y1, x2, y2, score }
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Intersection-over-union of two boxes; zero when they do not overlap
pub fn iou(a: &ScoredBox, b: &ScoredBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Greedy non-maximum suppression.
///
/// Sorts candidates by descending score, repeatedly keeps the best remaining
/// box and discards every other box whose IoU with it exceeds
/// `iou_threshold`. `top_k` caps the number of survivors when set.
pub fn non_max_suppression(
    mut boxes: Vec<ScoredBox>,
    iou_threshold: f32,
    top_k: Option<usize>,
) -> Vec<ScoredBox> {
    boxes.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut survivors = Vec::new();

    while !boxes.is_empty() {
        let best = boxes.remove(0);
        boxes.retain(|candidate| iou(&best, candidate) <= iou_threshold);
        survivors.push(best);

        if top_k.map(|k| survivors.len() >= k).unwrap_or(false) {
            break;
        }
    }

    survivors
}
