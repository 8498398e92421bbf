// Axis selectors for coordinate extraction

use serde::{Deserialize, Serialize};

/// Which value of a record an axis shows, by wavelength index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    Raw(usize),
    Snv(usize),
    Normalized(usize),
}

impl AxisKind {
    pub fn index(&self) -> usize {
        match *self {
            AxisKind::Raw(i) | AxisKind::Snv(i) | AxisKind::Normalized(i) => i,
        }
    }

    /// SNV substitute for a normalized axis; other kinds are unchanged
    pub fn fallback(self) -> Self {
        match self {
            AxisKind::Normalized(i) => AxisKind::Snv(i),
            other => other,
        }
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, AxisKind::Normalized(_))
    }

    /// Parse a column name such as `nm1050`, `nm1050_snv` or `nm1050_norm`
    pub fn parse(name: &str, wavelengths: &[u32]) -> Result<Self, String> {
        let body = name
            .strip_prefix("nm")
            .ok_or_else(|| format!("axis {:?} does not start with \"nm\"", name))?;
        let (digits, make): (&str, fn(usize) -> AxisKind) =
            if let Some(d) = body.strip_suffix("_norm") {
                (d, AxisKind::Normalized)
            } else if let Some(d) = body.strip_suffix("_snv") {
                (d, AxisKind::Snv)
            } else {
                (body, AxisKind::Raw)
            };
        let wavelength: u32 = digits
            .parse()
            .map_err(|_| format!("axis {:?} has no wavelength", name))?;
        let index = wavelengths
            .iter()
            .position(|wl| *wl == wavelength)
            .ok_or_else(|| format!("axis {:?} names an unconfigured wavelength", name))?;
        Ok(make(index))
    }

    /// Column name for this axis, or None if the index is out of range
    pub fn column_name(&self, wavelengths: &[u32]) -> Option<String> {
        let wl = wavelengths.get(self.index())?;
        Some(match self {
            AxisKind::Raw(_) => format!("nm{}", wl),
            AxisKind::Snv(_) => format!("nm{}_snv", wl),
            AxisKind::Normalized(_) => format!("nm{}_norm", wl),
        })
    }
}

/// The three axes of the scatter view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisSelection {
    pub x: AxisKind,
    pub y: AxisKind,
    pub z: AxisKind,
}

impl AxisSelection {
    pub fn new(x: AxisKind, y: AxisKind, z: AxisKind) -> Self {
        Self { x, y, z }
    }

    /// Substitute SNV for every normalized axis at once
    pub fn fallback(self) -> Self {
        Self {
            x: self.x.fallback(),
            y: self.y.fallback(),
            z: self.z.fallback(),
        }
    }

    pub fn uses_normalized(&self) -> bool {
        self.x.is_normalized() || self.y.is_normalized() || self.z.is_normalized()
    }

    pub fn axes(&self) -> [AxisKind; 3] {
        [self.x, self.y, self.z]
    }
}
