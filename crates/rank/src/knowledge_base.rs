use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use svdmap_model::Shadow;
use svdmap_storage::Storage;

use crate::error::Result;

/// Known device shadows, in storage order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
	shadows: Vec<Shadow>,
}

impl KnowledgeBase {
	/// Reads every entry of `storage` as a [`Shadow`].
	pub fn load(storage: &Storage) -> Result<Self> {
		let shadows = storage
			.handles()
			.iter()
			.map(|handle| storage.get_as::<Shadow>(handle))
			.collect::<svdmap_storage::Result<Vec<_>>>()?;
		tracing::debug!(shadows = shadows.len(), "rank.knowledge_base.load");
		Ok(Self { shadows })
	}

	pub fn from_shadows(shadows: Vec<Shadow>) -> Self {
		Self { shadows }
	}

	pub fn shadows(&self) -> &[Shadow] {
		&self.shadows
	}

	pub fn len(&self) -> usize {
		self.shadows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.shadows.is_empty()
	}

	/// Groups shadows with identical read and write sets.
	///
	/// Groups come in order of their first member; members keep
	/// knowledge-base order.
	pub fn equivalence_groups(&self) -> Vec<Vec<&Shadow>> {
		let mut index: BTreeMap<(&BTreeSet<u64>, &BTreeSet<u64>), usize> = BTreeMap::new();
		let mut groups: Vec<Vec<&Shadow>> = Vec::new();
		for shadow in &self.shadows {
			let slot = *index.entry((&shadow.read, &shadow.write)).or_insert_with(|| {
				groups.push(Vec::new());
				groups.len() - 1
			});
			groups[slot].push(shadow);
		}
		groups
	}

	pub fn stats(&self) -> KbStats {
		let groups = self.equivalence_groups();
		let largest = groups
			.iter()
			.fold(None::<&Vec<&Shadow>>, |best, group| match best {
				Some(best) if best.len() >= group.len() => Some(best),
				_ => Some(group),
			})
			.map(|group| group.iter().map(|shadow| shadow.name.clone()).collect())
			.unwrap_or_default();

		KbStats {
			total: self.shadows.len(),
			groups: groups.len(),
			largest,
		}
	}
}

/// Size summary of a knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KbStats {
	pub total: usize,
	/// Number of distinct `(read, write)` pairs.
	pub groups: usize,
	/// Names in the largest equivalence group; the first one on ties.
	pub largest: Vec<String>,
}

impl fmt::Display for KbStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Total shadow maps: {}", self.total)?;
		writeln!(f, "Total equivalence groups: {}", self.groups)?;
		writeln!(f, "Largest group size: {}", self.largest.len())?;
		for (i, name) in self.largest.iter().enumerate() {
			writeln!(f, "  Shadow map {i}: {name}")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tempfile::TempDir;

	use super::*;

	fn shadow(name: &str, read: &[u64], write: &[u64]) -> Shadow {
		Shadow {
			name: name.to_string(),
			read: read.iter().copied().collect(),
			write: write.iter().copied().collect(),
		}
	}

	#[test]
	fn groups_identical_address_sets() {
		let kb = KnowledgeBase::from_shadows(vec![
			shadow("a", &[0], &[4]),
			shadow("b", &[0], &[]),
			shadow("c", &[0], &[4]),
			shadow("d", &[8], &[]),
			shadow("e", &[0], &[4]),
		]);

		let names: Vec<Vec<&str>> = kb
			.equivalence_groups()
			.iter()
			.map(|group| group.iter().map(|s| s.name.as_str()).collect())
			.collect();
		assert_eq!(names, vec![vec!["a", "c", "e"], vec!["b"], vec!["d"]]);

		let stats = kb.stats();
		assert_eq!(stats.total, 5);
		assert_eq!(stats.groups, 3);
		assert_eq!(stats.largest, vec!["a", "c", "e"]);
		assert!(stats.to_string().contains("  Shadow map 2: e\n"));
	}

	#[test]
	fn largest_group_tie_keeps_first() {
		let kb = KnowledgeBase::from_shadows(vec![shadow("x", &[0], &[]), shadow("y", &[4], &[])]);
		assert_eq!(kb.stats().largest, vec!["x"]);
	}

	#[test]
	fn empty_knowledge_base_stats() {
		let stats = KnowledgeBase::default().stats();
		assert_eq!(stats, KbStats::default());
	}

	#[test]
	fn loads_shadows_from_storage() {
		let dir = TempDir::new().unwrap();
		let mut storage = Storage::open(dir.path().join("kb")).unwrap();
		storage.set("b.svd", &shadow("b.svd", &[4], &[])).unwrap();
		storage.set("a.svd", &shadow("a.svd", &[0], &[0])).unwrap();

		let kb = KnowledgeBase::load(&storage).unwrap();
		let names: Vec<_> = kb.shadows().iter().map(|s| s.name.as_str()).collect();
		assert_eq!(names, vec!["a.svd", "b.svd"]);
	}
}
