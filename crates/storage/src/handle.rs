use std::path::{Component, Path, PathBuf};

use crate::error::{Result, StorageError};

/// Checks that a handle can double as a relative archive entry path.
pub(crate) fn validate(handle: &str) -> Result<()> {
	if handle.is_empty() || handle.contains('\0') {
		return Err(StorageError::InvalidHandle(handle.to_string()));
	}
	let path = Path::new(handle);
	let relative = path
		.components()
		.all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
	let named = path.components().any(|component| matches!(component, Component::Normal(_)));
	if relative && named {
		Ok(())
	} else {
		Err(StorageError::InvalidHandle(handle.to_string()))
	}
}

/// Lexically resolves `relative` against `base`.
///
/// Parent components pop, root or prefix components restart from the
/// filesystem root. No filesystem access happens, so the result can name
/// files that do not exist yet.
pub(crate) fn resolve_within(base: &Path, relative: &Path) -> PathBuf {
	let mut resolved = base.to_path_buf();
	for component in relative.components() {
		match component {
			Component::Normal(part) => resolved.push(part),
			Component::CurDir => {}
			Component::ParentDir => {
				resolved.pop();
			}
			Component::RootDir | Component::Prefix(_) => {
				resolved = PathBuf::from(component.as_os_str());
			}
		}
	}
	resolved
}
