//! The core data model: [`Port`], [`BusSignal`], [`BusDef`], and [`MatchCost`].

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::{BusMapError, BusMapResult};
use crate::lexer::words_from_name;

/// Signal direction, from the perspective of the module under analysis.
///
/// `sign(pw)`: `+1` input, `-1` output, matching the signed-width encoding
/// in the component port format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// `+1` for `In`, `-1` for `Out`, per the signed-width port encoding.
    pub fn sign(self) -> i32 {
        match self {
            Direction::In => 1,
            Direction::Out => -1,
        }
    }

    /// A signed width `pw` where `|pw|` is the width and `sign(pw)` is the
    /// direction, as the component port format encodes it.
    pub fn from_signed_width(pw: i64) -> (Option<u32>, Direction) {
        let direction = if pw >= 0 { Direction::In } else { Direction::Out };
        let width = if pw == 0 { None } else { Some(pw.unsigned_abs() as u32) };
        (width, direction)
    }

    /// Bus-def wire direction string: `"in"` maps to `In`, anything else
    /// (`"out"`, `"inout"`, ...) maps to `Out`.
    pub fn from_bus_def_str(s: &str) -> Direction {
        if s.eq_ignore_ascii_case("in") {
            Direction::In
        } else {
            Direction::Out
        }
    }
}

/// `master` or `slave` side of a bus abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverType {
    Master,
    Slave,
}

impl std::fmt::Display for DriverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverType::Master => write!(f, "master"),
            DriverType::Slave => write!(f, "slave"),
        }
    }
}

/// Whether a bus signal must be present on a conforming component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    Required,
    Optional,
}

/// A physical wire of the module under analysis.
///
/// Constructed once from input and never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub width: Option<u32>,
    pub direction: Direction,
}

impl Port {
    pub fn new(name: impl Into<String>, width: Option<u32>, direction: Direction) -> Self {
        Port { name: name.into(), width, direction }
    }

    pub fn words(&self) -> Vec<String> {
        words_from_name(&self.name)
    }
}

impl Eq for Port {}

impl PartialOrd for Port {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Port {
    // Tie-break rule (spec §5): sort ports by name.
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

/// One logical wire in a formal bus definition.
#[derive(Debug, Clone, PartialEq)]
pub struct BusSignal {
    pub name: String,
    pub width: Option<u32>,
    pub direction: Direction,
    pub presence: Presence,
    pub user_group: Option<String>,
}

impl BusSignal {
    pub fn words(&self) -> Vec<String> {
        words_from_name(&self.name)
    }
}

/// A vendor/library/name/version tag, replacing attribute-dict access to
/// raw JSON with an explicit record parsed once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BusType {
    pub vendor: String,
    pub library: String,
    pub name: String,
    pub version: String,
}

/// The collection of [`BusSignal`]s forming one side (master or slave) of a
/// bus abstraction. Built once per spec file and immutable thereafter.
#[derive(Debug, Clone)]
pub struct BusDef {
    pub bus_type: BusType,
    pub abstract_type: BusType,
    pub driver_type: DriverType,
    pub required_signals: Vec<BusSignal>,
    pub optional_signals: Vec<BusSignal>,
    /// (prefix, template signal) pairs for sideband ports that don't match
    /// any required/optional signal by name but match a declared group by
    /// prefix and direction.
    pub user_port_groups: Vec<(String, BusSignal)>,
}

impl BusDef {
    /// Construct a `BusDef`, validating the invariants from the data model:
    /// at least one required signal, and user-group prefixes that are
    /// either pairwise non-overlapping or a single anonymous group.
    pub fn new(
        bus_type: BusType,
        abstract_type: BusType,
        driver_type: DriverType,
        required_signals: Vec<BusSignal>,
        optional_signals: Vec<BusSignal>,
        user_port_groups: Vec<(String, BusSignal)>,
    ) -> BusMapResult<Self> {
        if required_signals.is_empty() {
            return Err(BusMapError::MalformedBusDef(format!(
                "bus def {}/{} ({}) has no required signals",
                abstract_type.name, driver_type, bus_type.name
            )));
        }
        validate_user_group_prefixes(&user_port_groups)?;
        Ok(BusDef {
            bus_type,
            abstract_type,
            driver_type,
            required_signals,
            optional_signals,
            user_port_groups,
        })
    }

    /// All signals, required then optional.
    pub fn all_signals(&self) -> impl Iterator<Item = &BusSignal> {
        self.required_signals.iter().chain(self.optional_signals.iter())
    }

    pub fn words_from_name(&self, name: &str) -> Vec<String> {
        words_from_name(name)
    }
}

fn validate_user_group_prefixes(groups: &[(String, BusSignal)]) -> BusMapResult<()> {
    let anonymous_count = groups.iter().filter(|(prefix, _)| prefix.is_empty()).count();
    if anonymous_count > 0 && groups.len() > 1 {
        return Err(BusMapError::AmbiguousUserGroups(
            "an anonymous user group cannot coexist with named groups".into(),
        ));
    }
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let (a, _) = &groups[i];
            let (b, _) = &groups[j];
            if a != b && (a.starts_with(b.as_str()) || b.starts_with(a.as_str())) {
                return Err(BusMapError::AmbiguousUserGroups(format!(
                    "user group prefixes `{a}` and `{b}` overlap"
                )));
            }
        }
    }
    Ok(())
}

/// The triple (name-distance, width-mismatches, direction-mismatches) with
/// fixed linear weights. A plain value type: `add`/`scale`/`zero`/
/// `normalize`/`value` are explicit methods rather than operator overloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCost {
    pub nc: f64,
    pub wc: i64,
    pub dc: i64,
}

impl MatchCost {
    pub fn new(nc: f64, wc: i64, dc: i64) -> Self {
        MatchCost { nc, wc, dc }
    }

    pub fn zero() -> Self {
        MatchCost { nc: 0.0, wc: 0, dc: 0 }
    }

    pub fn add(&self, other: &MatchCost) -> MatchCost {
        MatchCost {
            nc: self.nc + other.nc,
            wc: self.wc + other.wc,
            dc: self.dc + other.dc,
        }
    }

    /// Scale all three components by an integer count (e.g. `(0,1,1).scale(n)`
    /// for a flat per-port penalty applied `n` times).
    pub fn scale(&self, count: i64) -> MatchCost {
        MatchCost {
            nc: self.nc * count as f64,
            wc: self.wc * count,
            dc: self.dc * count,
        }
    }

    /// Divide the name-cost component by `n` (an average-per-wire name
    /// cost), leaving width/direction cumulative.
    pub fn normalize(&self, n: usize) -> MatchCost {
        if n == 0 {
            return *self;
        }
        MatchCost { nc: self.nc / n as f64, wc: self.wc, dc: self.dc }
    }

    /// `Nw*nc + Ww*wc + Dw*dc` with the weights from `cfg`.
    pub fn value(&self, cfg: &crate::config::EngineConfig) -> f64 {
        cfg.name_weight * self.nc + cfg.width_weight * self.wc as f64 + cfg.dir_weight * self.dc as f64
    }
}

/// Jaccard distance between two token sets: `1 - |A∩B| / |A∪B|`.
/// Two empty sets are defined as distance 0 (nothing to disagree on).
pub fn jaccard_distance(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        1.0 - (intersection as f64 / union as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn direction_sign_matches_signed_width_encoding() {
        let (w, d) = Direction::from_signed_width(-37);
        assert_eq!(w, Some(37));
        assert_eq!(d, Direction::Out);
        let (w, d) = Direction::from_signed_width(1);
        assert_eq!(w, Some(1));
        assert_eq!(d, Direction::In);
    }

    #[test]
    fn match_cost_value_uses_fixed_weights() {
        let cfg = EngineConfig::default();
        let mc = MatchCost::new(1.0, 2, 3);
        // 2*1.0 + 1*2 + 4*3 = 16
        assert_eq!(mc.value(&cfg), 16.0);
    }

    #[test]
    fn normalize_only_divides_name_cost() {
        let mc = MatchCost::new(4.0, 2, 2);
        let n = mc.normalize(2);
        assert_eq!(n.nc, 2.0);
        assert_eq!(n.wc, 2);
        assert_eq!(n.dc, 2);
    }

    #[test]
    fn bus_def_rejects_empty_required_signals() {
        let result = BusDef::new(
            BusType::default(),
            BusType::default(),
            DriverType::Slave,
            vec![],
            vec![],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn bus_def_rejects_overlapping_user_group_prefixes() {
        let sig = |n: &str| BusSignal {
            name: n.into(),
            width: None,
            direction: Direction::In,
            presence: Presence::Optional,
            user_group: Some(n.into()),
        };
        let required = vec![sig("awvalid")];
        let groups = vec![("ar".to_string(), sig("ar")), ("arq".to_string(), sig("arq"))];
        let result = BusDef::new(
            BusType::default(),
            BusType::default(),
            DriverType::Slave,
            required,
            vec![],
            groups,
        );
        assert!(matches!(result, Err(BusMapError::AmbiguousUserGroups(_))));
    }

    #[test]
    fn jaccard_distance_identical_sets_is_zero() {
        let a: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(jaccard_distance(&a, &a.clone()), 0.0);
    }
}
