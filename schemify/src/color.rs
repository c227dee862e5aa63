use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use num_traits::{Num, ToPrimitive};

pub trait Channel: Copy + Clone + Num + PartialOrd<Self> + ToPrimitive {}

impl Channel for u8 {}
impl Channel for f64 {}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, derive_more::From, derive_more::Into)]
#[repr(transparent)]
pub struct Rgb<T: Channel>(pub [T; 3]);

pub type Rgb8 = Rgb<u8>;

impl<T: Channel + Default> Default for Rgb<T> {
    fn default() -> Self {
        Rgb([T::default(), T::default(), T::default()])
    }
}

impl<T: Channel> Deref for Rgb<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Channel> DerefMut for Rgb<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Channel> Rgb<T> {
    /// Component-wise `self * (1 - alpha) + other * alpha`, in double precision.
    #[inline]
    pub fn lerp(self, other: Self, alpha: f64) -> Rgb<f64> {
        let mix = |a: T, b: T| {
            let a = a.to_f64().unwrap_or_default();
            let b = b.to_f64().unwrap_or_default();
            a * (1.0 - alpha) + b * alpha
        };
        Rgb([
            mix(self[0], other[0]),
            mix(self[1], other[1]),
            mix(self[2], other[2]),
        ])
    }
}

impl Rgb<u8> {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb([r, g, b])
    }

    /// Squared Euclidean distance. Only ever compared, so the square root is skipped.
    #[inline(always)]
    pub fn distance_sq(self, other: Self) -> u32 {
        let d = |a: u8, b: u8| {
            let d = a.abs_diff(b) as u32;
            d * d
        };
        d(self[0], other[0]) + d(self[1], other[1]) + d(self[2], other[2])
    }

    /// Apparent color of a translucent layer with `alpha` coverage over `self`, rounded to the
    /// nearest integer per channel.
    #[inline]
    pub fn blend(self, overlay: Self, alpha: f64) -> Self {
        self.lerp(overlay, alpha).round_u8()
    }

    /// The base color that `overlay` at `alpha` would turn into `self`, clamped into range.
    /// An `alpha` of 1 hides the base completely, so `self` is returned unchanged.
    #[inline]
    pub fn unblend(self, overlay: Self, alpha: f64) -> Self {
        if alpha >= 1.0 {
            return self;
        }
        let base = |apparent: u8, glass: u8| (apparent as f64 - alpha * glass as f64) / (1.0 - alpha);
        Rgb([
            base(self[0], overlay[0]),
            base(self[1], overlay[1]),
            base(self[2], overlay[2]),
        ])
        .round_u8()
    }

    pub fn to_image_rgba(self, alpha: u8) -> image::Rgba<u8> {
        image::Rgba([self[0], self[1], self[2], alpha])
    }
}

impl Rgb<f64> {
    /// Round half away from zero and clamp into `0..=255`.
    #[inline]
    pub fn round_u8(self) -> Rgb<u8> {
        let c = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        Rgb([c(self[0]), c(self[1]), c(self[2])])
    }
}

impl From<u32> for Rgb<u8> {
    fn from(raw: u32) -> Self {
        Rgb([(raw >> 16) as u8, (raw >> 8) as u8, raw as u8])
    }
}

impl From<Rgb<u8>> for u32 {
    fn from(rgb: Rgb<u8>) -> Self {
        ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | (rgb[2] as u32)
    }
}

impl std::fmt::Display for Rgb<u8> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{:06x}", u32::from(*self))
    }
}

/// Parse `#rrggbb` (the leading `#` is optional).
impl FromStr for Rgb<u8> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 {
            return Err(format!("expected 6 hex digits, got {s:?}"));
        }
        let raw = u32::from_str_radix(hex, 16).map_err(|err| err.to_string())?;
        Ok(raw.into())
    }
}
