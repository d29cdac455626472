//! Positional photo and signature selection

use super::{AssetStore, ExtractedAsset};
use crate::record::AssetAssignment;

/// Indices into the extracted asset list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetRoles {
    pub photo: Option<usize>,
    pub signature: Option<usize>,
}

/// Pick photo and signature positions for a list of `count` images.
///
/// The fourth image is the photo when there are at least four, otherwise the
/// first one. The signature is always the last image.
pub fn classify(count: usize) -> AssetRoles {
    if count == 0 {
        return AssetRoles::default();
    }

    AssetRoles {
        photo: Some(if count >= 4 { 3 } else { 0 }),
        signature: Some(count - 1),
    }
}

/// Apply [`classify`] to stored assets, moving the signature into the
/// signature directory.
pub fn assign_roles(assets: &[ExtractedAsset], store: &AssetStore) -> AssetAssignment {
    let roles = classify(assets.len());
    let mut photo = roles.photo.map(|i| assets[i].path.clone());

    let signature = roles.signature.and_then(|i| {
        let source = &assets[i].path;
        match store.relocate_signature(source) {
            Ok(target) => {
                if roles.photo == Some(i) {
                    photo = Some(target.clone());
                }
                Some(target)
            }
            Err(e) => {
                tracing::warn!(path = %source.display(), error = %e, "failed to relocate signature");
                None
            }
        }
    });

    AssetAssignment { photo, signature }
}
