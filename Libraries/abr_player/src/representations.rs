use crate::error::{PlayerError, PlayerResult};
use crate::mpd::Representation;

/// The quality ladder of one track, in manifest order, with the currently
/// active representation.
pub struct RepresentationSet {
    representations: Vec<Representation>,
    current: usize,
}

impl RepresentationSet {
    /// Builds the set and starts on the representation an empty throughput
    /// history would select (the highest bandwidth).
    pub fn new(representations: Vec<Representation>) -> PlayerResult<Self> {
        if representations.is_empty() {
            return Err(PlayerError::InvalidManifest(
                "adaptation set has no representations".to_string(),
            ));
        }
        let current = Self::pick(&representations, f64::NAN);
        Ok(Self {
            representations,
            current,
        })
    }

    /// Picks the best representation for an estimated throughput:
    /// without an estimate the highest bandwidth, otherwise the highest
    /// bandwidth strictly below the estimate, otherwise the lowest.
    /// Ties resolve to the earliest in manifest order.
    pub fn select_for_throughput(&self, estimate: f64) -> &Representation {
        &self.representations[Self::pick(&self.representations, estimate)]
    }

    fn pick(representations: &[Representation], estimate: f64) -> usize {
        if !estimate.is_finite() {
            return Self::extreme(representations, |a, b| a > b);
        }

        let mut best: Option<usize> = None;
        for (i, rep) in representations.iter().enumerate() {
            if (rep.bandwidth as f64) < estimate {
                let better = match best {
                    Some(b) => rep.bandwidth > representations[b].bandwidth,
                    None => true,
                };
                if better {
                    best = Some(i);
                }
            }
        }

        best.unwrap_or_else(|| Self::extreme(representations, |a, b| a < b))
    }

    fn extreme(representations: &[Representation], wins: impl Fn(u64, u64) -> bool) -> usize {
        let mut index = 0;
        for (i, rep) in representations.iter().enumerate() {
            if wins(rep.bandwidth, representations[index].bandwidth) {
                index = i;
            }
        }
        index
    }

    pub fn current(&self) -> &Representation {
        &self.representations[self.current]
    }

    /// Makes `id` the active representation. Returns false when it already
    /// was, true when the switch happened.
    pub fn switch_to(&mut self, id: &str) -> PlayerResult<bool> {
        if self.representations[self.current].id == id {
            return Ok(false);
        }
        match self.representations.iter().position(|r| r.id == id) {
            Some(index) => {
                self.current = index;
                Ok(true)
            }
            None => Err(PlayerError::InvalidManifest(format!(
                "unknown representation id: {id}"
            ))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Representation> {
        self.representations.iter()
    }

    pub fn len(&self) -> usize {
        self.representations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn rep(id: &str, bandwidth: u64) -> Representation {
        Representation {
            id: id.to_string(),
            bandwidth,
            initialization: format!("{id}/init.mp4"),
            media: format!("{id}/seg-$Number$.m4s"),
            segment_duration: 2.0,
            timescale: 1,
            start_number: 1,
            segments: vec![],
            has_template: true,
        }
    }

    fn ladder() -> Vec<Representation> {
        vec![rep("low", 1_000_000), rep("mid", 2_500_000), rep("high", 4_000_000)]
    }

    #[test]
    fn starts_on_highest_bandwidth() {
        let set = RepresentationSet::new(ladder()).unwrap();
        assert_eq!(set.current().id, "high");
    }

    #[rstest]
    #[case(f64::NAN, "high")]
    // Strictly below the estimate: 4 Mbps does not qualify at exactly 4 Mbps.
    #[case(4_000_000.0, "mid")]
    #[case(4_000_001.0, "high")]
    #[case(2_600_000.0, "mid")]
    // Below every bandwidth: fall back to the lowest.
    #[case(500_000.0, "low")]
    #[case(0.0, "low")]
    fn selects_for_throughput(#[case] estimate: f64, #[case] expected: &str) {
        let set = RepresentationSet::new(ladder()).unwrap();
        assert_eq!(set.select_for_throughput(estimate).id, expected);
    }

    #[test]
    fn equal_bandwidth_resolves_to_manifest_order() {
        let set =
            RepresentationSet::new(vec![rep("first", 2_000_000), rep("second", 2_000_000)])
                .unwrap();
        assert_eq!(set.select_for_throughput(3_000_000.0).id, "first");
        assert_eq!(set.select_for_throughput(f64::NAN).id, "first");
        assert_eq!(set.select_for_throughput(1_000_000.0).id, "first");
    }

    #[test]
    fn switch_to_is_a_noop_for_the_current_id() {
        let mut set = RepresentationSet::new(ladder()).unwrap();
        assert!(!set.switch_to("high").unwrap());
        assert!(set.switch_to("low").unwrap());
        assert_eq!(set.current().id, "low");
    }

    #[test]
    fn switch_to_unknown_id_fails() {
        let mut set = RepresentationSet::new(ladder()).unwrap();
        assert!(set.switch_to("nope").is_err());
        assert_eq!(set.current().id, "high");
    }

    #[test]
    fn empty_ladder_is_invalid() {
        assert!(RepresentationSet::new(vec![]).is_err());
    }
}
