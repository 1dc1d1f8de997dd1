use crate::detection::{BoundingBox, Detection, Mask};
use crate::processing::pre::TransformParams;
use ndarray::{Array1, ArrayView2, ArrayViewD, Axis, s};

/// A box that passed the confidence threshold, still in model input space.
#[derive(Debug, Clone)]
struct Candidate {
    bbox: BoundingBox,
    confidence: f32,
    class_id: u32,
    anchor: usize,
}

/// Decodes YOLOv8 segmentation heads into detections with instance masks.
///
/// Expects `preds` shaped `[1, 4 + classes + masks, anchors]` (cxcywh in input
/// pixels, class scores, mask coefficients) and `protos` shaped `[1, masks, h, w]`.
pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    #[tracing::instrument(skip(self, preds, protos, transform))]
    pub fn parse_detections(
        &self,
        preds: &ArrayViewD<f32>,
        protos: &ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        if preds.ndim() != 3 || protos.ndim() != 4 {
            anyhow::bail!(
                "Unexpected output rank: preds {:?}, protos {:?}",
                preds.shape(),
                protos.shape()
            );
        }

        if preds.shape()[0] == 0 || protos.shape()[0] == 0 {
            anyhow::bail!(
                "Empty batch: preds {:?}, protos {:?}",
                preds.shape(),
                protos.shape()
            );
        }

        let num_masks = protos.shape()[1];
        let (mask_height, mask_width) = (protos.shape()[2], protos.shape()[3]);
        let channels = preds.shape()[1];

        if mask_height == 0 || mask_width == 0 {
            anyhow::bail!("Empty mask prototypes: {:?}", protos.shape());
        }

        if channels <= 4 + num_masks {
            anyhow::bail!(
                "Prediction head has {} channels, too few for 4 box values and {} mask coefficients",
                channels,
                num_masks
            );
        }
        let num_classes = channels - 4 - num_masks;

        let candidates = self.collect_candidates(preds, num_classes);
        let kept = self.non_max_suppression(candidates);

        let protos = protos
            .index_axis(Axis(0), 0)
            .into_shape_with_order((num_masks, mask_height * mask_width))?;

        let mut detections = Vec::with_capacity(kept.len());
        for candidate in kept {
            let coeffs = Array1::from_iter(
                (0..num_masks).map(|k| preds[[0, 4 + num_classes + k, candidate.anchor]]),
            );
            let mask = assemble_mask(
                &coeffs,
                &protos,
                (mask_height, mask_width),
                &candidate.bbox,
                transform,
            )?;

            detections.push(Detection {
                bbox: BoundingBox::new(
                    transform.unmap_x(candidate.bbox.x1),
                    transform.unmap_y(candidate.bbox.y1),
                    transform.unmap_x(candidate.bbox.x2),
                    transform.unmap_y(candidate.bbox.y2),
                ),
                confidence: candidate.confidence,
                class_id: candidate.class_id,
                mask: Some(mask),
            });
        }

        Ok(detections)
    }

    fn collect_candidates(&self, preds: &ArrayViewD<f32>, num_classes: usize) -> Vec<Candidate> {
        let num_anchors = preds.shape()[2];
        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            let mut confidence = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 0..num_classes {
                let score = preds[[0, 4 + c, i]];
                if score > confidence {
                    confidence = score;
                    class_id = c;
                }
            }

            if confidence < self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(
                preds[[0, 0, i]],
                preds[[0, 1, i]],
                preds[[0, 2, i]],
                preds[[0, 3, i]],
            );

            candidates.push(Candidate {
                bbox: BoundingBox::new(x1, y1, x2, y2),
                confidence,
                class_id: class_id as u32,
                anchor: i,
            });
        }

        candidates
    }

    /// Greedy per-class NMS; survivors come out in descending confidence.
    fn non_max_suppression(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut kept: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if kept.len() >= self.max_detections {
                break;
            }
            let suppressed = kept.iter().any(|k| {
                k.class_id == candidate.class_id
                    && k.bbox.iou(&candidate.bbox) > self.iou_threshold
            });
            if !suppressed {
                kept.push(candidate);
            }
        }

        kept
    }
}

/// Builds one instance mask at prototype resolution: sigmoid of the
/// coefficient/prototype product, zeroed outside the box, with the
/// letterbox padding cut away so the mask spans exactly the source image.
fn assemble_mask(
    coeffs: &Array1<f32>,
    protos: &ArrayView2<f32>,
    (mask_height, mask_width): (usize, usize),
    bbox: &BoundingBox,
    transform: &TransformParams,
) -> anyhow::Result<Mask> {
    let logits = coeffs.dot(protos);
    let mut mask = logits
        .mapv(sigmoid)
        .into_shape_with_order((mask_height, mask_width))?;

    let to_proto_x = |v: f32| v * mask_width as f32 / transform.input_width as f32;
    let to_proto_y = |v: f32| v * mask_height as f32 / transform.input_height as f32;
    let (bx1, by1) = (to_proto_x(bbox.x1), to_proto_y(bbox.y1));
    let (bx2, by2) = (to_proto_x(bbox.x2), to_proto_y(bbox.y2));

    for ((y, x), value) in mask.indexed_iter_mut() {
        let (px, py) = (x as f32, y as f32);
        if px < bx1 || px >= bx2 || py < by1 || py >= by2 {
            *value = 0.0;
        }
    }

    let left = (to_proto_x(transform.offset_x).floor() as usize).min(mask_width - 1);
    let top = (to_proto_y(transform.offset_y).floor() as usize).min(mask_height - 1);
    let right = (to_proto_x(transform.offset_x + transform.resized_width as f32).ceil() as usize)
        .clamp(left + 1, mask_width);
    let bottom = (to_proto_y(transform.offset_y + transform.resized_height as f32).ceil()
        as usize)
        .clamp(top + 1, mask_height);

    Ok(mask.slice(s![top..bottom, left..right]).to_owned())
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
