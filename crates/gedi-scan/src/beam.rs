//! The eight fixed GEDI beams.

/// Beam kind, as named in the `description` attribute of each beam group
/// ("Coverage beam" / "Full power beam"); abbreviated the way users commonly
/// refer to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeamKind {
    Coverage,
    Power,
}

impl BeamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BeamKind::Coverage => "coverage",
            BeamKind::Power => "power",
        }
    }
}

impl std::fmt::Display for BeamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the eight top-level beam groups present in every GEDI granule.
///
/// Each beam is statically associated with exactly one [`BeamKind`]; the
/// association is fixed mission-wide, not read from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeamName {
    Beam0000,
    Beam0001,
    Beam0010,
    Beam0011,
    Beam0101,
    Beam0110,
    Beam1000,
    Beam1011,
}

impl BeamName {
    pub const ALL: [BeamName; 8] = [
        BeamName::Beam0000,
        BeamName::Beam0001,
        BeamName::Beam0010,
        BeamName::Beam0011,
        BeamName::Beam0101,
        BeamName::Beam0110,
        BeamName::Beam1000,
        BeamName::Beam1011,
    ];

    /// The group name as it appears in the file (uppercase).
    pub fn as_str(self) -> &'static str {
        match self {
            BeamName::Beam0000 => "BEAM0000",
            BeamName::Beam0001 => "BEAM0001",
            BeamName::Beam0010 => "BEAM0010",
            BeamName::Beam0011 => "BEAM0011",
            BeamName::Beam0101 => "BEAM0101",
            BeamName::Beam0110 => "BEAM0110",
            BeamName::Beam1000 => "BEAM1000",
            BeamName::Beam1011 => "BEAM1011",
        }
    }

    /// The statically associated beam kind.
    pub fn kind(self) -> BeamKind {
        match self {
            BeamName::Beam0000 | BeamName::Beam0001 | BeamName::Beam0010 | BeamName::Beam0011 => {
                BeamKind::Coverage
            }
            BeamName::Beam0101 | BeamName::Beam0110 | BeamName::Beam1000 | BeamName::Beam1011 => {
                BeamKind::Power
            }
        }
    }

    /// Match a group base name against the eight beam names, exactly and
    /// case-sensitively.
    pub fn from_group_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|beam| beam.as_str() == name)
    }
}

impl std::fmt::Display for BeamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_association() {
        assert_eq!(BeamName::Beam0000.kind(), BeamKind::Coverage);
        assert_eq!(BeamName::Beam0011.kind(), BeamKind::Coverage);
        assert_eq!(BeamName::Beam0101.kind(), BeamKind::Power);
        assert_eq!(BeamName::Beam1011.kind(), BeamKind::Power);
    }

    #[test]
    fn test_from_group_name_exact_match() {
        assert_eq!(
            BeamName::from_group_name("BEAM0000"),
            Some(BeamName::Beam0000)
        );
        assert_eq!(BeamName::from_group_name("beam0000"), None);
        assert_eq!(BeamName::from_group_name("BEAM0100"), None);
        assert_eq!(BeamName::from_group_name("METADATA"), None);
        assert_eq!(BeamName::from_group_name("BEAM0000 "), None);
    }

    #[test]
    fn test_coverage_and_power_split_evenly() {
        let coverage = BeamName::ALL
            .iter()
            .filter(|b| b.kind() == BeamKind::Coverage)
            .count();
        assert_eq!(coverage, 4);
    }
}
