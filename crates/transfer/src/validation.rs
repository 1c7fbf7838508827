use std::path::{Component, Path};

use crate::TransferError;

/// Validates that a file identifier can be used as a single file name
/// inside a storage directory.
///
/// Rejects:
/// - Empty identifiers
/// - Anything with more than one path component (`a/b`)
/// - Absolute paths, parent (`..`) or current (`.`) directory references
/// - Windows prefix components (`C:`, `\\server`)
pub fn validate_fid(fid: &str) -> Result<(), TransferError> {
    if fid.is_empty() {
        return Err(TransferError::InvalidFid("empty identifier".into()));
    }

    let mut components = Path::new(fid).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == fid => Ok(()),
        (Some(Component::ParentDir), _) => Err(TransferError::InvalidFid(format!(
            "parent directory traversal not allowed: {fid}"
        ))),
        (Some(Component::RootDir | Component::Prefix(_)), _) => Err(TransferError::InvalidFid(
            format!("absolute path not allowed: {fid}"),
        )),
        _ => Err(TransferError::InvalidFid(format!(
            "identifier must be a single file name: {fid}"
        ))),
    }
}
