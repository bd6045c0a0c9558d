/// Execution classes used to tag pool work in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Supervises one worker process from spawn to reap.
	Unit,
	/// Inspects and signals live workers after the deadline.
	Sweep,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Unit => "unit",
			Self::Sweep => "sweep",
		}
	}
}
