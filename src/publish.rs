//! Turns stored asset paths into public URLs

use crate::error::{Error, Result};
use crate::record::{AssetRef, StructuredRecord};
use url::Url;

/// Rewrites record photo and signature paths to `<base>/photos/<file>` and
/// `<base>/signatures/<file>`
#[derive(Debug, Clone)]
pub struct AssetLinker {
    base: Url,
}

impl AssetLinker {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(|e| Error::Config {
            reason: format!("invalid public_base_url {:?}: {}", base_url, e),
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::Config {
                reason: format!("public_base_url {:?} cannot be a base", base_url),
            });
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn link(&self, mut record: StructuredRecord) -> StructuredRecord {
        record.photo = record.photo.map(|asset| self.resolve(asset, "photos"));
        record.signature = record
            .signature
            .map(|asset| self.resolve(asset, "signatures"));
        record
    }

    fn resolve(&self, asset: AssetRef, route: &str) -> AssetRef {
        let Some(file_name) = asset
            .as_path()
            .and_then(|p| p.file_name())
            .and_then(|f| f.to_str())
        else {
            return asset;
        };

        match self.base.join(&format!("{}/{}", route, file_name)) {
            Ok(url) => AssetRef::Url(url.into()),
            Err(e) => {
                tracing::warn!(file = file_name, error = %e, "failed to build asset url");
                asset
            }
        }
    }
}
