use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlayMode {
    #[default]
    List,
    Single,
    Random,
}

impl PlayMode {
    pub fn cycle(self) -> Self {
        match self {
            PlayMode::List => PlayMode::Single,
            PlayMode::Single => PlayMode::Random,
            PlayMode::Random => PlayMode::List,
        }
    }
}

/// Stream quality tiers recognised by the URL endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Quality {
    Standard,
    Higher,
    #[default]
    Exhigh,
    Lossless,
}

impl Quality {
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Standard => "standard",
            Quality::Higher => "higher",
            Quality::Exhigh => "exhigh",
            Quality::Lossless => "lossless",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Quality::Standard),
            "higher" => Ok(Quality::Higher),
            "exhigh" => Ok(Quality::Exhigh),
            "lossless" => Ok(Quality::Lossless),
            other => Err(format!("unknown quality level: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_mode_cycle_wraps() {
        let mode = PlayMode::default();
        assert_eq!(mode, PlayMode::List);
        assert_eq!(mode.cycle(), PlayMode::Single);
        assert_eq!(mode.cycle().cycle(), PlayMode::Random);
        assert_eq!(mode.cycle().cycle().cycle(), PlayMode::List);
    }

    #[test]
    fn test_quality_round_trips_through_str() {
        for q in [
            Quality::Standard,
            Quality::Higher,
            Quality::Exhigh,
            Quality::Lossless,
        ] {
            assert_eq!(q.as_str().parse::<Quality>(), Ok(q));
        }
        assert!("hires".parse::<Quality>().is_err());
    }
}
