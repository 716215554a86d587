/// Time source handed to the rendering library.
///
/// A fixed clock makes date-dependent output (form scripts, timestamps in
/// annotations) reproducible; its value is seconds since the epoch, UTC.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(i64),
}

impl Clock {
    pub fn from_option(time: Option<i64>) -> Self {
        time.map_or(Clock::System, Clock::Fixed)
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}
