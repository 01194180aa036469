//! Frames and exposure stacks handed to the engine by the merging pipeline.

use std::fmt;

use crate::color;
use crate::error::{Error, Result};
use crate::plane::Plane;

/// Image dimensions: width, height, and number of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
    /// 1 for luminance-only frames, 3 for RGB.
    pub channels: usize,
}

impl Dimensions {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// One exposure's pixel data: a single luminance plane or R, G, B planes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    planes: Vec<Plane>,
}

impl Frame {
    pub fn gray(plane: Plane) -> Self {
        Self {
            planes: vec![plane],
        }
    }

    pub fn rgb(red: Plane, green: Plane, blue: Plane) -> Result<Self> {
        Self::from_planes(vec![red, green, blue])
    }

    /// Wrap 1 or 3 planes of identical size.
    pub fn from_planes(planes: Vec<Plane>) -> Result<Self> {
        if planes.len() != 1 && planes.len() != 3 {
            return Err(Error::UnsupportedChannelCount {
                channels: planes.len(),
            });
        }
        for (channel, plane) in planes.iter().enumerate().skip(1) {
            planes[0].ensure_same_size(plane, &format!("channel {channel}"))?;
        }
        Ok(Self { planes })
    }

    pub fn width(&self) -> usize {
        self.planes[0].width()
    }

    pub fn height(&self) -> usize {
        self.planes[0].height()
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn is_rgb(&self) -> bool {
        self.planes.len() == 3
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height(), self.channels())
    }

    pub fn plane(&self, channel: usize) -> &Plane {
        &self.planes[channel]
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut [Plane] {
        &mut self.planes
    }

    pub fn into_planes(self) -> Vec<Plane> {
        self.planes
    }

    /// Lightness at one pixel, using the formula shared by classifier and rebalancer.
    #[inline]
    pub fn lightness_at(&self, x: usize, y: usize) -> f32 {
        match self.planes.as_slice() {
            [gray] => gray.get(x, y),
            [r, g, b] => color::lightness(r.get(x, y), g.get(x, y), b.get(x, y)),
            _ => unreachable!("frames hold 1 or 3 planes"),
        }
    }

    /// Lightness plane of the whole frame.
    pub fn lightness(&self) -> Plane {
        match self.planes.as_slice() {
            [gray] => gray.clone(),
            [r, g, b] => color::lightness_plane(r, g, b),
            _ => unreachable!("frames hold 1 or 3 planes"),
        }
    }

    /// Translate every channel; see [`Plane::shifted`].
    pub fn shifted(&self, dx: i32, dy: i32) -> Frame {
        Frame {
            planes: self.planes.iter().map(|p| p.shifted(dx, dy)).collect(),
        }
    }
}

/// A frame of the bracket together with its exposure value and registration offset.
///
/// A higher `ev` means more light reached the sensor: a frame at `ev + 1`
/// is expected to be twice as bright as one at `ev`.
///
/// `offset` registers the frame onto the scene: scene pixel `(x, y)` is found at
/// `(x + dx, y + dy)` in this frame's planes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureItem {
    pub frame: Frame,
    pub ev: f32,
    pub offset: (i32, i32),
}

impl ExposureItem {
    pub fn new(frame: Frame, ev: f32) -> Self {
        Self {
            frame,
            ev,
            offset: (0, 0),
        }
    }

    pub fn with_offset(mut self, dx: i32, dy: i32) -> Self {
        self.offset = (dx, dy);
        self
    }

    /// Offset that maps this item's pixel coordinates onto `other`'s.
    pub fn relative_offset(&self, other: &ExposureItem) -> (i32, i32) {
        (other.offset.0 - self.offset.0, other.offset.1 - self.offset.1)
    }

    /// A copy of this item's frame resampled into `reference`'s pixel grid.
    pub fn aligned_to(&self, reference: &ExposureItem) -> Frame {
        let (dx, dy) = reference.relative_offset(self);
        self.frame.shifted(dx, dy)
    }

    /// Average lightness over the whole frame.
    pub fn average_lightness(&self) -> f32 {
        color::average_lightness(&self.frame)
    }
}

/// Ordered, non-empty exposure bracket with uniform dimensions.
#[derive(Debug, Clone)]
pub struct ExposureStack {
    items: Vec<ExposureItem>,
}

impl ExposureStack {
    pub fn new(items: Vec<ExposureItem>) -> Result<Self> {
        let first = items.first().ok_or(Error::EmptyStack)?;
        let expected = first.frame.dimensions();
        for (index, item) in items.iter().enumerate().skip(1) {
            let actual = item.frame.dimensions();
            if actual != expected {
                return Err(Error::DimensionMismatch {
                    what: format!("frame {index}"),
                    expected,
                    actual,
                });
            }
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ExposureItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Result<&ExposureItem> {
        self.items.get(index).ok_or(Error::FrameIndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.items[0].frame.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_item(width: usize, height: usize, value: f32, ev: f32) -> ExposureItem {
        ExposureItem::new(Frame::gray(Plane::new_filled(width, height, value)), ev)
    }

    #[test]
    fn test_from_planes_rejects_two_channels() {
        let err = Frame::from_planes(vec![Plane::zeros(2, 2), Plane::zeros(2, 2)]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedChannelCount { channels: 2 }));
    }

    #[test]
    fn test_rgb_rejects_mismatched_channels() {
        let err = Frame::rgb(Plane::zeros(4, 4), Plane::zeros(4, 4), Plane::zeros(4, 3)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_stack_rejects_mismatched_frames() {
        let err = ExposureStack::new(vec![gray_item(8, 8, 0.5, 0.0), gray_item(8, 9, 0.5, 1.0)])
            .unwrap_err();
        match err {
            Error::DimensionMismatch {
                what,
                expected,
                actual,
            } => {
                assert_eq!(what, "frame 1");
                assert_eq!(expected, Dimensions::new(8, 8, 1));
                assert_eq!(actual, Dimensions::new(8, 9, 1));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_stack_rejects_empty() {
        assert!(matches!(ExposureStack::new(Vec::new()), Err(Error::EmptyStack)));
    }

    #[test]
    fn test_get_out_of_range() {
        let stack = ExposureStack::new(vec![gray_item(4, 4, 0.5, 0.0)]).unwrap();
        assert!(matches!(
            stack.get(3),
            Err(Error::FrameIndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_aligned_to_uses_relative_offset() {
        let plane = Plane::from_fn(6, 1, |x, _| x as f32);
        let reference = ExposureItem::new(Frame::gray(Plane::zeros(6, 1)), 0.0).with_offset(1, 0);
        let donor = ExposureItem::new(Frame::gray(plane), 1.0).with_offset(3, 0);
        assert_eq!(reference.relative_offset(&donor), (2, 0));
        let aligned = donor.aligned_to(&reference);
        assert_eq!(aligned.plane(0).pixels(), &[2.0, 3.0, 4.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_rgb_lightness_uses_luma_weights() {
        let frame = Frame::rgb(
            Plane::new_filled(1, 1, 1.0),
            Plane::new_filled(1, 1, 0.0),
            Plane::new_filled(1, 1, 0.0),
        )
        .unwrap();
        assert!((frame.lightness_at(0, 0) - 0.2126).abs() < 1e-6);
        assert!((frame.lightness().get(0, 0) - 0.2126).abs() < 1e-6);
    }
}
