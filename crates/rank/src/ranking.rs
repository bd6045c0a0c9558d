use std::fmt;

use svdmap_model::Shadow;

use crate::fingerprint::Fingerprint;
use crate::knowledge_base::KnowledgeBase;

/// Jaccard similarity over the read and write sets together.
///
/// `0.0` when both sides are empty.
pub fn score(fingerprint: &Fingerprint, shadow: &Shadow) -> f64 {
	let intersection = fingerprint.read.intersection(&shadow.read).count() + fingerprint.write.intersection(&shadow.write).count();
	let union = fingerprint.read.union(&shadow.read).count() + fingerprint.write.union(&shadow.write).count();
	if union == 0 {
		return 0.0;
	}
	intersection as f64 / union as f64
}

/// Scores every shadow of `kb` against `fingerprint`.
pub fn rank(fingerprint: &Fingerprint, kb: &KnowledgeBase) -> Ranking {
	let mut entries: Vec<(String, f64)> = kb
		.shadows()
		.iter()
		.map(|shadow| (shadow.name.clone(), score(fingerprint, shadow)))
		.collect();
	// Stable, so equal scores keep knowledge-base order.
	entries.sort_by(|a, b| b.1.total_cmp(&a.1));
	tracing::debug!(entries = entries.len(), top = entries.first().map(|e| e.1), "rank.sorted");
	Ranking { entries }
}

/// Names with their scores, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
	entries: Vec<(String, f64)>,
}

/// Entries sharing one score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankGroup<'a> {
	/// 1-based; increases by one per distinct score.
	pub rank: usize,
	pub score: f64,
	/// `score` divided by the top score, `0.0` when the top score is zero.
	pub normalized: f64,
	pub names: Vec<&'a str>,
}

impl Ranking {
	pub fn entries(&self) -> &[(String, f64)] {
		&self.entries
	}

	pub fn top_score(&self) -> Option<f64> {
		self.entries.first().map(|(_, score)| *score)
	}

	pub fn groups(&self) -> Vec<RankGroup<'_>> {
		let top = self.top_score().unwrap_or(0.0);
		let mut groups: Vec<RankGroup<'_>> = Vec::new();
		for (name, score) in &self.entries {
			match groups.last_mut() {
				Some(group) if group.score == *score => group.names.push(name.as_str()),
				_ => groups.push(RankGroup {
					rank: groups.len() + 1,
					score: *score,
					normalized: if top > 0.0 { score / top } else { 0.0 },
					names: vec![name.as_str()],
				}),
			}
		}
		groups
	}
}

/// The textual ranking report.
impl fmt::Display for Ranking {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for group in self.groups() {
			writeln!(f, "Rank #{}: (score {:?}, normalized score {:?})", group.rank, group.score, group.normalized)?;
			for name in &group.names {
				writeln!(f, "\t{name}")?;
			}
			writeln!(f, "{} devices with rank #{}", group.names.len(), group.rank)?;
		}
		Ok(())
	}
}
