//! `Solution`: one candidate assignment in the best-first search pool
//! (§4.3). Uses persistent (structural-sharing) collections so cloning
//! a solution to explore a branch is cheap relative to the size of the
//! whole universe.

use crate::types::Reason;
use apt_depgraph::ElementId;

/// One candidate assignment of package choices plus the soft
/// obligations it has given up on, with enough bookkeeping for the
/// search loop's ordering and tie-breaking.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Package name -> the version element currently chosen for it
    /// (either a real version or the package's `absent` variant).
    pub assignment: im::HashMap<String, ElementId>,
    /// `UnsatisfiedElement`s this solution has accepted as permanently
    /// unmet.
    pub accepted_unsatisfied: im::HashSet<ElementId>,
    /// Reasons recorded per element, when the resolver is configured to
    /// track them (`cupt::resolver::track-reasons`-equivalent). Empty
    /// when reason tracking is off.
    pub reasons: im::HashMap<ElementId, im::Vector<Reason>>,
    /// Running score: higher is preferred.
    pub score: i64,
    /// Number of actions applied to reach this solution from the
    /// initial assignment; used only to stabilise sort order.
    pub level: i64,
    /// Monotonically increasing identity; higher means newer, used to
    /// break score ties in favour of the most recently derived
    /// solution (§4.3 "ties broken by higher id").
    pub id: u64,
}

impl Solution {
    /// A fresh solution seeded from `assignment`, with no accepted
    /// unsatisfied obligations and score zero.
    #[must_use]
    pub fn seed(assignment: im::HashMap<String, ElementId>, id: u64) -> Self {
        Self {
            assignment,
            accepted_unsatisfied: im::HashSet::new(),
            reasons: im::HashMap::new(),
            score: 0,
            level: 0,
            id,
        }
    }

    /// Record `reason` against `element`, if reason tracking is
    /// enabled by the caller (controlled by whether `track` is true;
    /// kept as a parameter rather than a stored flag so solutions stay
    /// cheap to clone when tracking is off).
    pub fn record_reason(&mut self, element: ElementId, reason: Reason, track: bool) {
        if !track {
            return;
        }
        self.reasons
            .entry(element)
            .or_insert_with(im::Vector::new)
            .push_back(reason);
    }
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.id == other.id
    }
}

impl Eq for Solution {}

impl PartialOrd for Solution {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Solution {
    /// Higher score wins; ties broken by higher id (§4.3 "Pick the
    /// solution with the highest score; ties broken by higher id").
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score.cmp(&other.score).then_with(|| self.id.cmp(&other.id))
    }
}
