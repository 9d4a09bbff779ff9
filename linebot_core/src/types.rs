//! Value types shared across the controller.

/// What one floor sensor sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    OnLine,
    OffLine,
}

impl From<bool> for LineState {
    fn from(on: bool) -> Self {
        if on { Self::OnLine } else { Self::OffLine }
    }
}

/// Left/right line sensor pair at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineReading {
    pub left: LineState,
    pub right: LineState,
}

impl LineReading {
    pub fn new(left: bool, right: bool) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    #[inline]
    pub fn left_on(&self) -> bool {
        self.left == LineState::OnLine
    }

    #[inline]
    pub fn right_on(&self) -> bool {
        self.right == LineState::OnLine
    }

    /// Only the sensor on `side` sees the line.
    pub fn only(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left_on() && !self.right_on(),
            Side::Right => self.right_on() && !self.left_on(),
        }
    }
}

impl From<(bool, bool)> for LineReading {
    fn from((left, right): (bool, bool)) -> Self {
        Self::new(left, right)
    }
}

/// Centimetres.
pub type Distance = f32;

/// Result of one ranging attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeSample {
    Fresh(Distance),
    /// Rate limited, or no echo came back.
    NoSample,
}

impl RangeSample {
    /// Distance to act on; a missing sample reads as exactly `sentinel`.
    #[inline]
    pub fn or_sentinel(self, sentinel: Distance) -> Distance {
        match self {
            RangeSample::Fresh(d) => d,
            RangeSample::NoSample => sentinel,
        }
    }
}

/// Navigation state of the autonomous program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Forward,
    TurnLeft,
    TurnRight,
    Lost,
    BypassScan,
    BypassLeft,
    BypassRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    #[default]
    Manual,
    Autonomous,
}

impl OperatingMode {
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            OperatingMode::Manual => OperatingMode::Autonomous,
            OperatingMode::Autonomous => OperatingMode::Manual,
        }
    }

    /// Steady indicator level for this mode.
    #[inline]
    pub fn indicator_level(self) -> bool {
        self == OperatingMode::Autonomous
    }
}

/// Decoded remote button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Button {
    #[default]
    None,
    Kill,
    SaveTelemetry,
    ReportTelemetry,
    ModeToggleCandidate(u8),
}

impl Button {
    pub const KILL_CODE: u8 = 0;
    pub const SAVE_CODE: u8 = 3;
    pub const REPORT_CODE: u8 = 4;

    pub fn decode(code: Option<u8>) -> Self {
        match code {
            None => Button::None,
            Some(Self::KILL_CODE) => Button::Kill,
            Some(Self::SAVE_CODE) => Button::SaveTelemetry,
            Some(Self::REPORT_CODE) => Button::ReportTelemetry,
            Some(other) => Button::ModeToggleCandidate(other),
        }
    }
}

/// Which way a bypass goes around the obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub fn mirrored(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Per-axis maximum absolute acceleration in g.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeakG {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PeakG {
    pub fn from_array([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Fold one sample's absolute values into the running maxima.
    pub fn absorb(&mut self, g: [f64; 3]) {
        self.x = self.x.max(g[0].abs());
        self.y = self.y.max(g[1].abs());
        self.z = self.z.max(g[2].abs());
    }
}

impl std::fmt::Display for PeakG {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x={:.3} y={:.3} z={:.3}", self.x, self.y, self.z)
    }
}
